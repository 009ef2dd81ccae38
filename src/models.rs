use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Team scoring mode, as sent to `!mp set <team_mode> <score_mode> <size>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TeamMode {
    HeadToHead = 0,
    TagCoop = 1,
    TeamVs = 2,
    TagTeamVs = 3,
}

/// Win-condition mode, as sent to `!mp set <team_mode> <score_mode> <size>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ScoreMode {
    Score = 0,
    Accuracy = 1,
    Combo = 2,
    ScoreV2 = 3,
}

/// Ruleset, as sent in `!mp map <id> <play_mode>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PlayMode {
    Osu = 0,
    Taiko = 1,
    Catch = 2,
    Mania = 3,
}

impl PlayMode {
    /// The numeric argument the referee bot expects on the wire.
    pub fn as_wire(self) -> u8 {
        self as u8
    }
}

/// Which rotation discipline a room runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotMode {
    /// Host privilege cycles through the player queue.
    AutoHost,
    /// The bot cycles through a pre-filtered beatmap queue; no user host.
    AutoPick,
}

/// Immutable configuration for one managed room, loaded once at startup.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub name: String,
    pub password: String,
    pub team_mode: TeamMode,
    pub score_mode: ScoreMode,
    pub play_mode: PlayMode,
    pub room_size: u8,
    pub bot_mode: BotMode,
    pub min_star: f64,
    pub max_star: f64,
    pub beatmapset_filename: Option<String>,
}

/// One entry in a room's AutoPick queue, or a slot-sweep/accepted-pick record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatmapRecord {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub difficulty_rating: f64,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub download_disabled: bool,
}

/// Mutable, per-room runtime state. Owned exclusively by that room's `Session`.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub name: String,
    pub room_id: Option<String>,
    pub created: bool,
    pub connected: bool,
    pub configured: bool,
    pub users: Vec<String>,
    pub check_users: HashSet<String>,
    pub total_users: usize,
    pub current_beatmap: Option<i64>,
    pub skip_voters: HashSet<String>,
    pub beatmaps: Vec<BeatmapRecord>,
}

impl RoomState {
    pub fn new(config: &RoomConfig, beatmaps: Vec<BeatmapRecord>) -> Self {
        RoomState {
            name: config.name.trim().to_string(),
            room_id: None,
            created: false,
            connected: false,
            configured: false,
            users: Vec::new(),
            check_users: HashSet::new(),
            total_users: 0,
            current_beatmap: None,
            skip_voters: HashSet::new(),
            beatmaps,
        }
    }

    /// The current host in AutoHost mode, or `None` if the room is empty.
    pub fn current_host(&self) -> Option<&str> {
        self.users.first().map(String::as_str)
    }
}

/// Space-normalize a username the way the referee bot's chat lines require:
/// outer whitespace stripped, internal spaces turned into underscores.
pub fn normalize_username(raw: &str) -> String {
    raw.trim().replace(' ', "_")
}
