//! The tagged events a room `Session` reacts to. Every referee-bot cue in
//! the cue table has exactly one corresponding variant here; the parser's
//! job is to turn a chat line into one of these (or decide it is a user
//! command, which takes a different path — see `crate::command`).

/// A parsed referee-bot notification, already stripped of IRC framing.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    UserJoined { name: String },
    UserLeft { name: String },
    HostChanged { name: String },
    MatchStarted,
    MatchFinished,
    MatchReady,
    /// A user's manual pick, parsed from `Beatmap changed to: ...`.
    BeatmapPicked {
        title: String,
        version: String,
        url: String,
    },
    /// The bot's own AutoPick selection being echoed back, parsed from
    /// `Changed beatmap to ...`.
    BeatmapAutoSet { title: String, url: String, beatmap_id: i64 },
    SlotLine(crate::slot::SlotLine),
    PlayersCount(usize),
    RoomClosed,
}
