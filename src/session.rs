//! The per-room state machine: turns `Event`s and user `Command`s into
//! `RoomState` mutations plus the outbound commands they provoke.
//!
//! Everything here is synchronous except [`handle_beatmap_picked`], which
//! needs to await the HTTP fetch the policy evaluator performs. Keeping that
//! one async boundary narrow means the rest of the state machine stays easy
//! to unit test with a plain `Vec<OutboundCommand>` sink.

use std::time::Duration;

use crate::beatmap::fetcher::BeatmapFetcher;
use crate::beatmap::policy::{self, PickedBeatmap, PolicyOutcome};
use crate::command::Command;
use crate::irc::event::Event;
use crate::models::{BotMode, RoomConfig, RoomState};
use crate::outbound::{OutboundCommand, OutboundSink};

/// Advance the queue head (user or beatmap) and emit the command that makes
/// it real in the room. A no-op when the relevant queue is empty.
pub fn rotate(state: &mut RoomState, config: &RoomConfig, sink: &mut impl OutboundSink) {
    match config.bot_mode {
        BotMode::AutoHost => {
            if !state.users.is_empty() {
                state.users.rotate_left(1);
                sink.send(OutboundCommand::privmsg(
                    room_target(state),
                    format!("!mp host {}", state.users[0]),
                ));
            }
        }
        BotMode::AutoPick => {
            if !state.beatmaps.is_empty() {
                sink.send(OutboundCommand::privmsg(
                    room_target(state),
                    format!("!mp map {} {}", state.beatmaps[0].id, config.play_mode.as_wire()),
                ));
                state.beatmaps.rotate_left(1);
            }
        }
    }
    state.skip_voters.clear();
}

fn room_target(state: &RoomState) -> String {
    state.room_id.clone().unwrap_or_default()
}

fn queue_line(state: &RoomState, config: &RoomConfig) -> String {
    match config.bot_mode {
        BotMode::AutoHost => state.users.iter().take(5).cloned().collect::<Vec<_>>().join(", "),
        BotMode::AutoPick => state
            .beatmaps
            .iter()
            .take(5)
            .map(|b| format!("[https://osu.ppy.sh/b/{} {}]", b.id, b.title))
            .collect::<Vec<_>>()
            .join("  "),
    }
}

/// The four `!mp name`/`!mp password`/`!mp set`/`!mp mods` bring-up commands,
/// followed by the initial rotate that seeds a host or beatmap.
pub async fn bring_up_room(state: &mut RoomState, config: &RoomConfig, sink: &mut impl OutboundSink) {
    let target = room_target(state);
    sink.send(OutboundCommand::privmsg(&target, format!("!mp name {}", config.name)));
    sink.send(OutboundCommand::privmsg(&target, format!("!mp password {}", config.password)));
    tokio::time::sleep(Duration::from_secs(1)).await;
    sink.send(OutboundCommand::privmsg(
        &target,
        format!(
            "!mp set {} {} {}",
            config.team_mode as u8, config.score_mode as u8, config.room_size
        ),
    ));
    sink.send(OutboundCommand::privmsg(&target, "!mp mods Freemod"));
    state.configured = true;

    rotate(state, config, sink);
}

fn on_user_joined(state: &mut RoomState, config: &RoomConfig, sink: &mut impl OutboundSink, name: String) {
    let was_empty = state.users.is_empty();
    if !state.users.contains(&name) {
        state.users.push(name);
    }
    if was_empty && config.bot_mode == BotMode::AutoHost {
        rotate(state, config, sink);
    }
}

fn on_user_left(state: &mut RoomState, config: &RoomConfig, sink: &mut impl OutboundSink, name: String) {
    let is_host = config.bot_mode == BotMode::AutoHost && state.users.first() == Some(&name);
    if is_host {
        rotate(state, config, sink);
    }
    state.users.retain(|u| u != &name);
}

fn on_host_changed(state: &mut RoomState, config: &RoomConfig, sink: &mut impl OutboundSink, name: String) {
    state.skip_voters.clear();
    if config.bot_mode != BotMode::AutoHost {
        return;
    }
    if state.users.len() >= 2 && state.users[1] == name {
        state.users.rotate_left(1);
    } else if state.users.first() != Some(&name) {
        sink.send(OutboundCommand::privmsg(
            room_target(state),
            format!("!mp host {name}"),
        ));
    }
}

fn on_match_started(state: &mut RoomState, config: &RoomConfig, sink: &mut impl OutboundSink) {
    state.skip_voters.clear();
    if config.bot_mode == BotMode::AutoHost {
        rotate(state, config, sink);
    }
}

fn on_match_finished(state: &mut RoomState, config: &RoomConfig, sink: &mut impl OutboundSink) {
    let queue = queue_line(state, config);
    sink.send(OutboundCommand::privmsg(
        room_target(state),
        format!("!mp settings | Queue: {queue}"),
    ));
    if config.bot_mode == BotMode::AutoPick {
        rotate(state, config, sink);
    }
}

fn on_match_ready(state: &RoomState, sink: &mut impl OutboundSink) {
    sink.send(OutboundCommand::privmsg(room_target(state), "!mp start"));
}

fn on_room_closed(state: &mut RoomState) {
    state.users.clear();
    state.created = false;
    state.connected = false;
}

async fn on_beatmap_picked(
    state: &mut RoomState,
    config: &RoomConfig,
    fetcher: &impl BeatmapFetcher,
    sink: &mut impl OutboundSink,
    version: String,
    url: String,
) {
    let picked = PickedBeatmap { version, url };
    let outcome = policy::evaluate_pick(fetcher, &picked, config.min_star, config.max_star).await;
    match outcome {
        PolicyOutcome::Accepted(accepted) => {
            state.current_beatmap = Some(accepted.record.id);
            sink.send(OutboundCommand::privmsg(room_target(state), accepted.announcement));
        }
        PolicyOutcome::Rejected(violation) => {
            if let Some(line) = violation.reset_command(state.current_beatmap, config.play_mode) {
                sink.send(OutboundCommand::privmsg(room_target(state), line));
            }
        }
    }
}

async fn on_beatmap_auto_set(
    state: &mut RoomState,
    fetcher: &impl BeatmapFetcher,
    sink: &mut impl OutboundSink,
    title: String,
    beatmap_id: i64,
    url: String,
) {
    state.current_beatmap = Some(beatmap_id);
    if let Some(fetched_id) = policy::fetch_autoset_beatmapset_id(fetcher, &url).await {
        sink.send(OutboundCommand::privmsg(
            room_target(state),
            policy::render_auto_set_links(&title, fetched_id),
        ));
    }
}

fn on_slot_line(state: &mut RoomState, slot: crate::slot::SlotLine) {
    if !state.users.contains(&slot.username) {
        state.users.push(slot.username.clone());
    }
    state.check_users.insert(slot.username);

    if state.check_users.len() >= state.total_users {
        state.users.retain(|u| state.check_users.contains(u));
        state.check_users.clear();
    }
}

fn on_players_count(state: &mut RoomState, count: usize) {
    state.total_users = count;
}

/// Dispatch one referee-bot event against the room's state.
pub async fn handle_event(
    state: &mut RoomState,
    config: &RoomConfig,
    fetcher: &impl BeatmapFetcher,
    sink: &mut impl OutboundSink,
    event: Event,
) {
    match event {
        Event::UserJoined { name } => on_user_joined(state, config, sink, name),
        Event::UserLeft { name } => on_user_left(state, config, sink, name),
        Event::HostChanged { name } => on_host_changed(state, config, sink, name),
        Event::MatchStarted => on_match_started(state, config, sink),
        Event::MatchFinished => on_match_finished(state, config, sink),
        Event::MatchReady => on_match_ready(state, sink),
        Event::BeatmapPicked { version, url, .. } => {
            on_beatmap_picked(state, config, fetcher, sink, version, url).await
        }
        Event::BeatmapAutoSet { title, url, beatmap_id } => {
            on_beatmap_auto_set(state, fetcher, sink, title, beatmap_id, url).await
        }
        Event::SlotLine(slot) => on_slot_line(state, slot),
        Event::PlayersCount(count) => on_players_count(state, count),
        Event::RoomClosed => on_room_closed(state),
    }
}

/// Vote-skip threshold: half the room, rounded to nearest, ties rounding
/// away from zero (`f64::round`'s native behavior).
fn skip_threshold(state: &RoomState) -> usize {
    (state.users.len() as f64 / 2.0).round() as usize
}

fn on_skip(state: &mut RoomState, config: &RoomConfig, sink: &mut impl OutboundSink, sender: &str) {
    if state.skip_voters.contains(sender) {
        return;
    }
    state.skip_voters.insert(sender.to_string());

    let is_host_skip = config.bot_mode == BotMode::AutoHost && state.users.first().map(String::as_str) == Some(sender);
    let threshold = skip_threshold(state);

    if is_host_skip || state.skip_voters.len() >= threshold {
        rotate(state, config, sink);
        return;
    }

    sink.send(OutboundCommand::privmsg(
        room_target(state),
        format!("Skip voting: {} / {}", state.skip_voters.len(), threshold),
    ));
}

/// Dispatch one user chat command.
pub fn handle_command(
    state: &mut RoomState,
    config: &RoomConfig,
    sink: &mut impl OutboundSink,
    sender: &str,
    command: Command,
) {
    match command {
        Command::Start { count: None } => {
            sink.send(OutboundCommand::privmsg(room_target(state), "!mp start"));
        }
        Command::Start { count: Some(n) } => {
            sink.send(OutboundCommand::privmsg(room_target(state), format!("!mp start {n}")));
        }
        Command::Stop => {
            sink.send(OutboundCommand::privmsg(room_target(state), "!mp aborttimer"));
        }
        Command::Users => {
            sink.send(OutboundCommand::privmsg(
                room_target(state),
                format!("Users: {}", state.users.join(", ")),
            ));
        }
        Command::Queue => {
            sink.send(OutboundCommand::privmsg(
                room_target(state),
                format!("Queue: {}", queue_line(state, config)),
            ));
        }
        Command::Skip => on_skip(state, config, sink, sender),
        Command::Info => {
            if config.bot_mode == BotMode::AutoPick {
                sink.send(OutboundCommand::privmsg(
                    room_target(state),
                    format!(
                        "Stars allowed: {}-{} | Commands: !start, !stop, !queue, !skip, !info",
                        config.min_star, config.max_star
                    ),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beatmap::fetcher::test_support::CannedFetcher;
    use crate::models::{BeatmapRecord, PlayMode, ScoreMode, TeamMode};

    fn autohost_config() -> RoomConfig {
        RoomConfig {
            name: "Room".to_string(),
            password: "pw".to_string(),
            team_mode: TeamMode::HeadToHead,
            score_mode: ScoreMode::ScoreV2,
            play_mode: PlayMode::Osu,
            room_size: 16,
            bot_mode: BotMode::AutoHost,
            min_star: 0.0,
            max_star: 10.0,
            beatmapset_filename: None,
        }
    }

    fn autopick_config() -> RoomConfig {
        RoomConfig {
            bot_mode: BotMode::AutoPick,
            beatmapset_filename: Some("maps.json".to_string()),
            ..autohost_config()
        }
    }

    fn bound_state(config: &RoomConfig, beatmaps: Vec<BeatmapRecord>) -> RoomState {
        let mut state = RoomState::new(config, beatmaps);
        state.room_id = Some("#mp_1".to_string());
        state
    }

    fn map(id: i64, title: &str) -> BeatmapRecord {
        BeatmapRecord {
            id,
            title: title.to_string(),
            difficulty_rating: 4.0,
            version: "Insane".to_string(),
            status: "ranked".to_string(),
            download_disabled: false,
        }
    }

    // Scenario 1: AutoHost rotation on join.
    #[tokio::test]
    async fn first_join_in_autohost_triggers_rotate() {
        let config = autohost_config();
        let mut state = bound_state(&config, vec![]);
        let fetcher = CannedFetcher::new();
        let mut sink = Vec::new();

        handle_event(
            &mut state,
            &config,
            &fetcher,
            &mut sink,
            Event::UserJoined { name: "Alice".to_string() },
        )
        .await;

        assert_eq!(state.users, vec!["Alice".to_string()]);
        assert_eq!(sink, vec![OutboundCommand::privmsg("#mp_1", "!mp host Alice")]);
    }

    #[tokio::test]
    async fn second_join_does_not_rotate() {
        let config = autohost_config();
        let mut state = bound_state(&config, vec![]);
        state.users.push("Alice".to_string());
        let fetcher = CannedFetcher::new();
        let mut sink = Vec::new();

        handle_event(
            &mut state,
            &config,
            &fetcher,
            &mut sink,
            Event::UserJoined { name: "Bob".to_string() },
        )
        .await;

        assert_eq!(state.users, vec!["Alice".to_string(), "Bob".to_string()]);
        assert!(sink.is_empty());
    }

    // Scenario 2: queue cycling on match start / match finish.
    #[tokio::test]
    async fn match_started_rotates_autohost_queue() {
        let config = autohost_config();
        let mut state = bound_state(&config, vec![]);
        state.users = vec!["Alice".to_string(), "Bob".to_string()];
        let fetcher = CannedFetcher::new();
        let mut sink = Vec::new();

        handle_event(&mut state, &config, &fetcher, &mut sink, Event::MatchStarted).await;

        assert_eq!(state.users, vec!["Bob".to_string(), "Alice".to_string()]);
        assert_eq!(sink, vec![OutboundCommand::privmsg("#mp_1", "!mp host Bob")]);
    }

    #[tokio::test]
    async fn match_finished_rotates_autopick_queue_and_announces() {
        let config = autopick_config();
        let mut state = bound_state(&config, vec![map(1, "First"), map(2, "Second")]);
        let fetcher = CannedFetcher::new();
        let mut sink = Vec::new();

        handle_event(&mut state, &config, &fetcher, &mut sink, Event::MatchFinished).await;

        assert_eq!(state.beatmaps[0].id, 2);
        assert_eq!(state.beatmaps[1].id, 1);
        assert_eq!(sink.len(), 2);
        assert!(matches!(&sink[0], OutboundCommand::PrivMsg { body, .. } if body.starts_with("!mp settings | Queue:")));
        assert!(matches!(&sink[1], OutboundCommand::PrivMsg { body, .. } if body == "!mp map 1 0"));
    }

    // Scenario 3: vote-skip threshold.
    #[tokio::test]
    async fn skip_votes_accumulate_until_threshold() {
        let config = autohost_config();
        let mut state = bound_state(&config, vec![]);
        state.users = vec!["Alice".to_string(), "Bob".to_string(), "Carol".to_string(), "Dan".to_string()];
        let fetcher = CannedFetcher::new();
        let mut sink = Vec::new();

        handle_command(&mut state, &config, &mut sink, "Bob", Command::Skip);
        assert_eq!(sink, vec![OutboundCommand::privmsg("#mp_1", "Skip voting: 1 / 2")]);

        sink.clear();
        handle_command(&mut state, &config, &mut sink, "Carol", Command::Skip);
        assert_eq!(state.users[0], "Bob");
        assert!(sink.iter().any(|c| matches!(c, OutboundCommand::PrivMsg { body, .. } if body.starts_with("!mp host"))));
        let _ = fetcher;
    }

    #[tokio::test]
    async fn repeated_skip_from_same_sender_does_not_double_count() {
        let config = autohost_config();
        let mut state = bound_state(&config, vec![]);
        state.users = vec!["Alice".to_string(), "Bob".to_string(), "Carol".to_string(), "Dan".to_string()];
        let mut sink = Vec::new();

        handle_command(&mut state, &config, &mut sink, "Bob", Command::Skip);
        sink.clear();
        handle_command(&mut state, &config, &mut sink, "Bob", Command::Skip);

        assert!(sink.is_empty());
        assert_eq!(state.skip_voters.len(), 1);
    }

    #[tokio::test]
    async fn host_skip_rotates_unconditionally() {
        let config = autohost_config();
        let mut state = bound_state(&config, vec![]);
        state.users = vec!["Alice".to_string(), "Bob".to_string(), "Carol".to_string()];
        let mut sink = Vec::new();

        handle_command(&mut state, &config, &mut sink, "Alice", Command::Skip);

        assert_eq!(state.users[0], "Bob");
        assert_eq!(sink, vec![OutboundCommand::privmsg("#mp_1", "!mp host Bob")]);
    }

    // Scenario 4 & 5: out-of-range pick and sentinel url.
    #[tokio::test]
    async fn out_of_range_pick_resets_the_map() {
        let config = RoomConfig { min_star: 3.0, max_star: 6.0, ..autohost_config() };
        let mut state = bound_state(&config, vec![]);
        state.current_beatmap = Some(10);
        let body = r#"noise {"artist":"A","title":"T","id":1,"availability":{"download_disabled":false},"beatmaps":[{"id":2,"version":"Insane","difficulty_rating":9.0,"status":"ranked","cs":4.0,"ar":9.0,"url":"https://osu.ppy.sh/b/2"}]}"#;
        let fetcher = CannedFetcher::new().with("https://osu.ppy.sh/b/2", 200, body);
        let mut sink = Vec::new();

        handle_event(
            &mut state,
            &config,
            &fetcher,
            &mut sink,
            Event::BeatmapPicked {
                title: "T".to_string(),
                version: "Insane".to_string(),
                url: "https://osu.ppy.sh/b/2".to_string(),
            },
        )
        .await;

        assert_eq!(state.current_beatmap, Some(10));
        assert_eq!(
            sink,
            vec![OutboundCommand::privmsg(
                "#mp_1",
                "!mp map 10 0 | Rule Violation [star]: [https://osu.ppy.sh/beatmapsets/1#osu/2 Insane | 9*] High Star* Beatmap"
            )]
        );
    }

    #[tokio::test]
    async fn sentinel_url_pick_is_rejected_without_a_fetch() {
        let config = autohost_config();
        let mut state = bound_state(&config, vec![]);
        state.current_beatmap = Some(5);
        let fetcher = CannedFetcher::new();
        let mut sink = Vec::new();

        handle_event(
            &mut state,
            &config,
            &fetcher,
            &mut sink,
            Event::BeatmapPicked {
                title: "T".to_string(),
                version: "Insane".to_string(),
                url: "https://osu.ppy.sh/b/0".to_string(),
            },
        )
        .await;

        assert_eq!(
            sink,
            vec![OutboundCommand::privmsg(
                "#mp_1",
                "!mp map 5 0 | Rule Violation [NotFound]: Beatmap Not Submitted!"
            )]
        );
    }

    #[tokio::test]
    async fn auto_set_announces_links_with_fetched_id() {
        let config = autopick_config();
        let mut state = bound_state(&config, vec![]);
        let body = r#"noise {"artist":"A","title":"T","id":77,"availability":{"download_disabled":false},"beatmaps":[{"id":2,"version":"Insane","difficulty_rating":5.0,"status":"ranked","cs":4.0,"ar":9.0,"url":"https://osu.ppy.sh/b/2"}]}"#;
        let fetcher = CannedFetcher::new().with("https://osu.ppy.sh/b/5", 200, body);
        let mut sink = Vec::new();

        handle_event(
            &mut state,
            &config,
            &fetcher,
            &mut sink,
            Event::BeatmapAutoSet {
                title: "Some Song".to_string(),
                url: "https://osu.ppy.sh/b/5".to_string(),
                beatmap_id: 5,
            },
        )
        .await;

        assert_eq!(state.current_beatmap, Some(5));
        assert_eq!(
            sink,
            vec![OutboundCommand::privmsg(
                "#mp_1",
                "Links: [https://osu.ppy.sh/beatmapsets/77 Some Song] [https://beatconnect.io/b/77/ beatconnect]"
            )]
        );
    }

    #[tokio::test]
    async fn auto_set_sets_current_beatmap_but_skips_announcement_on_fetch_failure() {
        let config = autopick_config();
        let mut state = bound_state(&config, vec![]);
        let fetcher = CannedFetcher::new().with_network_failure("https://osu.ppy.sh/b/5");
        let mut sink = Vec::new();

        handle_event(
            &mut state,
            &config,
            &fetcher,
            &mut sink,
            Event::BeatmapAutoSet {
                title: "Some Song".to_string(),
                url: "https://osu.ppy.sh/b/5".to_string(),
                beatmap_id: 5,
            },
        )
        .await;

        assert_eq!(state.current_beatmap, Some(5));
        assert!(sink.is_empty());
    }

    // Scenario 6: slot sweep evicts offline users.
    #[tokio::test]
    async fn slot_sweep_evicts_users_missing_from_the_sweep() {
        let config = autohost_config();
        let mut state = bound_state(&config, vec![]);
        state.users = vec!["Alice".to_string(), "Ghost".to_string()];
        state.total_users = 1;
        let fetcher = CannedFetcher::new();
        let mut sink = Vec::new();

        let slot = crate::slot::parse_slot_line("Slot 1 Ready https://osu.ppy.sh/u/1 Alice").unwrap();
        handle_event(&mut state, &config, &fetcher, &mut sink, Event::SlotLine(slot)).await;

        assert_eq!(state.users, vec!["Alice".to_string()]);
        assert!(state.check_users.is_empty());
    }

    #[tokio::test]
    async fn room_closed_resets_lifecycle_flags() {
        let config = autohost_config();
        let mut state = bound_state(&config, vec![]);
        state.users = vec!["Alice".to_string()];
        state.created = true;
        state.connected = true;
        let fetcher = CannedFetcher::new();
        let mut sink = Vec::new();

        handle_event(&mut state, &config, &fetcher, &mut sink, Event::RoomClosed).await;

        assert!(state.users.is_empty());
        assert!(!state.created);
        assert!(!state.connected);
    }

    #[tokio::test(start_paused = true)]
    async fn bring_up_sequence_configures_then_rotates() {
        let config = autohost_config();
        let mut state = bound_state(&config, vec![]);
        state.users = vec!["Alice".to_string()];
        let mut sink = Vec::new();

        bring_up_room(&mut state, &config, &mut sink).await;

        assert!(state.configured);
        assert_eq!(sink.len(), 5);
        assert_eq!(sink[0], OutboundCommand::privmsg("#mp_1", "!mp name Room"));
        assert_eq!(sink[4], OutboundCommand::privmsg("#mp_1", "!mp host Alice"));
    }

    #[test]
    fn host_changed_to_second_in_queue_is_orderly_rotation() {
        let config = autohost_config();
        let mut state = bound_state(&config, vec![]);
        state.users = vec!["Alice".to_string(), "Bob".to_string(), "Carol".to_string()];
        let mut sink = Vec::new();

        on_host_changed(&mut state, &config, &mut sink, "Bob".to_string());

        assert_eq!(state.users, vec!["Bob".to_string(), "Carol".to_string(), "Alice".to_string()]);
        assert!(sink.is_empty());
    }

    #[test]
    fn host_changed_out_of_band_forces_reassignment() {
        let config = autohost_config();
        let mut state = bound_state(&config, vec![]);
        state.users = vec!["Alice".to_string(), "Bob".to_string(), "Carol".to_string()];
        let mut sink = Vec::new();

        on_host_changed(&mut state, &config, &mut sink, "Carol".to_string());

        assert_eq!(state.users[0], "Alice");
        assert_eq!(sink, vec![OutboundCommand::privmsg("#mp_1", "!mp host Carol")]);
    }
}
