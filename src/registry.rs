//! The set of managed rooms, keyed two ways: by configured name (stable
//! from startup) and by server-assigned `room_id` (bound once known). A
//! reconciler tick keeps each room's create/join lifecycle moving.

use std::collections::HashMap;

use crate::models::{BeatmapRecord, RoomConfig, RoomState};
use crate::outbound::{OutboundCommand, OutboundSink};

pub const REFEREE_BOT: &str = "BanchoBot";

/// One managed room: its immutable config plus its live state.
pub struct RoomEntry {
    pub config: RoomConfig,
    pub state: RoomState,
}

/// All managed rooms, indexed by name and (once assigned) by `room_id`.
pub struct RoomRegistry {
    by_name: HashMap<String, RoomEntry>,
    id_to_name: HashMap<String, String>,
}

impl RoomRegistry {
    pub fn new(rooms: Vec<(RoomConfig, Vec<BeatmapRecord>)>) -> Self {
        let mut by_name = HashMap::new();
        for (config, beatmaps) in rooms {
            let state = RoomState::new(&config, beatmaps);
            let key = state.name.clone();
            by_name.insert(key, RoomEntry { config, state });
        }
        Self {
            by_name,
            id_to_name: HashMap::new(),
        }
    }

    /// Bind a server-assigned `room_id` to the room whose configured name
    /// matches exactly (already-trimmed). Updates both indices atomically.
    /// Returns the bound room's name on success.
    pub fn bind_room_id(&mut self, name: &str, room_id: String) -> Option<&str> {
        let entry = self.by_name.get_mut(name)?;
        if entry.state.room_id.is_none() {
            entry.state.room_id = Some(room_id.clone());
        }
        self.id_to_name.insert(room_id, name.to_string());
        Some(entry.state.name.as_str())
    }

    pub fn get_by_room_id(&mut self, room_id: &str) -> Option<&mut RoomEntry> {
        let name = self.id_to_name.get(room_id)?.clone();
        self.by_name.get_mut(&name)
    }

    pub fn get_by_name(&mut self, name: &str) -> Option<&mut RoomEntry> {
        self.by_name.get_mut(name)
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut RoomEntry> {
        self.by_name.values_mut()
    }

    /// Drive every room's create/join lifecycle forward by one step,
    /// mirroring the reference implementation's polling reconciler: rooms
    /// with a bound id that aren't marked connected get re-joined; rooms
    /// that were never created get an `mp make` request.
    pub fn tick(&mut self, sink: &mut impl OutboundSink) {
        for entry in self.by_name.values_mut() {
            if entry.state.room_id.is_some() && !entry.state.connected {
                sink.send(OutboundCommand::raw(format!(
                    "JOIN {}",
                    entry.state.room_id.as_deref().unwrap_or_default()
                )));
                entry.state.connected = true;
            } else if !entry.state.created {
                sink.send(OutboundCommand::privmsg(
                    REFEREE_BOT,
                    format!("mp make {}", entry.state.name),
                ));
                entry.state.created = true;
            }
        }
    }

    /// Clear `connected` on every room after a transport-level disconnect.
    /// `created` survives — it is only reset on a confirmed room close.
    pub fn mark_all_disconnected(&mut self) {
        for entry in self.by_name.values_mut() {
            entry.state.connected = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BotMode, PlayMode, ScoreMode, TeamMode};

    fn config(name: &str) -> RoomConfig {
        RoomConfig {
            name: name.to_string(),
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

    #[test]
    fn bind_room_id_updates_both_indices() {
        let mut registry = RoomRegistry::new(vec![(config("Room A"), vec![])]);
        registry.bind_room_id("Room A", "#mp_1".to_string());

        assert!(registry.get_by_name("Room A").unwrap().state.room_id.is_some());
        assert_eq!(registry.get_by_room_id("#mp_1").unwrap().state.name, "Room A");
    }

    #[test]
    fn tick_requests_creation_for_unbound_rooms() {
        let mut registry = RoomRegistry::new(vec![(config("Room A"), vec![])]);
        let mut sink = Vec::new();

        registry.tick(&mut sink);

        assert_eq!(
            sink,
            vec![OutboundCommand::privmsg(REFEREE_BOT, "mp make Room A")]
        );
        assert!(registry.get_by_name("Room A").unwrap().state.created);
    }

    #[test]
    fn tick_joins_bound_but_disconnected_rooms() {
        let mut registry = RoomRegistry::new(vec![(config("Room A"), vec![])]);
        registry.bind_room_id("Room A", "#mp_1".to_string());
        let mut sink = Vec::new();

        registry.tick(&mut sink);

        assert_eq!(sink, vec![OutboundCommand::raw("JOIN #mp_1")]);
        assert!(registry.get_by_name("Room A").unwrap().state.connected);
    }

    #[test]
    fn tick_is_a_no_op_for_a_connected_room() {
        let mut registry = RoomRegistry::new(vec![(config("Room A"), vec![])]);
        registry.bind_room_id("Room A", "#mp_1".to_string());
        registry.get_by_name("Room A").unwrap().state.connected = true;
        let mut sink = Vec::new();

        registry.tick(&mut sink);

        assert!(sink.is_empty());
    }

    #[test]
    fn disconnect_clears_connected_but_not_created() {
        let mut registry = RoomRegistry::new(vec![(config("Room A"), vec![])]);
        registry.get_by_name("Room A").unwrap().state.created = true;
        registry.get_by_name("Room A").unwrap().state.connected = true;

        registry.mark_all_disconnected();

        let state = &registry.get_by_name("Room A").unwrap().state;
        assert!(!state.connected);
        assert!(state.created);
    }
}
