//! Routes classified lines to the room registry and, from there, to a
//! room's session logic. This is the only place that ties the parser, the
//! registry, and the session state machine together.

use crate::beatmap::fetcher::BeatmapFetcher;
use crate::command::parse_command;
use crate::irc::parser::{classify_line, parse_cue, parse_room_created, ParsedLine};
use crate::outbound::OutboundSink;
use crate::registry::{RoomRegistry, REFEREE_BOT};
use crate::session;

pub struct Dispatcher<F> {
    registry: RoomRegistry,
    fetcher: F,
}

impl<F: BeatmapFetcher> Dispatcher<F> {
    pub fn new(registry: RoomRegistry, fetcher: F) -> Self {
        Self { registry, fetcher }
    }

    pub fn tick(&mut self, sink: &mut impl OutboundSink) {
        self.registry.tick(sink);
    }

    pub fn mark_all_disconnected(&mut self) {
        self.registry.mark_all_disconnected();
    }

    /// Classify and route one complete inbound line.
    pub async fn handle_line(&mut self, line: &str, sink: &mut impl OutboundSink) {
        match classify_line(line) {
            ParsedLine::Server { raw } => {
                tracing::debug!(%raw, "server notice");
            }
            ParsedLine::Private { sender, body } => self.handle_private(&sender, &body, sink).await,
            ParsedLine::Room { sender, room_id, body } => {
                self.handle_room_message(&sender, &room_id, &body, sink).await
            }
            ParsedLine::Unknown { raw } => {
                tracing::debug!(%raw, "unrecognized line");
            }
        }
    }

    async fn handle_private(&mut self, sender: &str, body: &str, sink: &mut impl OutboundSink) {
        if sender != REFEREE_BOT {
            tracing::debug!(sender, body, "dropped private message from non-referee sender");
            return;
        }
        let Some((room_id, name)) = parse_room_created(body) else {
            return;
        };
        let Some(bound_name) = self.registry.bind_room_id(&name, room_id) else {
            tracing::debug!(name, "room created for an unconfigured room name");
            return;
        };
        let bound_name = bound_name.to_string();
        if let Some(entry) = self.registry.get_by_name(&bound_name) {
            session::bring_up_room(&mut entry.state, &entry.config, sink).await;
        }
    }

    async fn handle_room_message(
        &mut self,
        sender: &str,
        room_id: &str,
        body: &str,
        sink: &mut impl OutboundSink,
    ) {
        let Some(entry) = self.registry.get_by_room_id(room_id) else {
            tracing::debug!(room_id, "message for an unknown room");
            return;
        };

        if sender == REFEREE_BOT {
            match parse_cue(body) {
                Some(event) => {
                    session::handle_event(&mut entry.state, &entry.config, &self.fetcher, sink, event).await
                }
                None => tracing::debug!(room_id, body, "unrecognized referee cue"),
            }
            return;
        }

        if let Some(command) = parse_command(body) {
            session::handle_command(&mut entry.state, &entry.config, sink, sender, command);
        }
    }
}
