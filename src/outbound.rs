//! Outbound IRC commands produced by a `Session`, decoupled from the
//! transport that eventually writes them to the wire.

use std::fmt;

/// One outbound action a `Session` wants performed. Kept as data (not a
/// direct transport call) so session logic never touches sockets and tests
/// can assert on exactly what would have been sent.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundCommand {
    /// A raw line with no `PRIVMSG` wrapping, e.g. `JOIN #mp_123`, `PASS ...`.
    Raw(String),
    /// `PRIVMSG <target> : <body>` — the workhorse for room chat and
    /// messages to the referee bot.
    PrivMsg { target: String, body: String },
}

impl OutboundCommand {
    pub fn privmsg(target: impl Into<String>, body: impl Into<String>) -> Self {
        OutboundCommand::PrivMsg {
            target: target.into(),
            body: body.into(),
        }
    }

    pub fn raw(line: impl Into<String>) -> Self {
        OutboundCommand::Raw(line.into())
    }

    /// Render the exact line that would be written to the wire, sans
    /// terminator (the transport owns line-ending + pacing).
    pub fn to_wire_line(&self) -> String {
        match self {
            OutboundCommand::Raw(line) => line.clone(),
            OutboundCommand::PrivMsg { target, body } => format!("PRIVMSG {target} : {body}"),
        }
    }
}

impl fmt::Display for OutboundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire_line())
    }
}

/// Anything a `Session` can hand outbound commands to. A plain `Vec` is the
/// sink used by unit tests; the live dispatcher hands sessions a sink backed
/// by the paced transport writer.
pub trait OutboundSink {
    fn send(&mut self, command: OutboundCommand);
}

impl OutboundSink for Vec<OutboundCommand> {
    fn send(&mut self, command: OutboundCommand) {
        self.push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privmsg_renders_with_space_colon_space() {
        let cmd = OutboundCommand::privmsg("#mp_123", "!mp host Alice");
        assert_eq!(cmd.to_wire_line(), "PRIVMSG #mp_123 : !mp host Alice");
    }

    #[test]
    fn raw_renders_unchanged() {
        let cmd = OutboundCommand::raw("JOIN #mp_123");
        assert_eq!(cmd.to_wire_line(), "JOIN #mp_123");
    }
}
