//! User chat commands, handled whenever a room message's sender is not the
//! referee bot.

/// A recognized user command, already split from its argument (if any).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start { count: Option<u32> },
    Stop,
    Users,
    Queue,
    Skip,
    Info,
}

/// Parse one chat line as a user command. Unrecognized text (including
/// ordinary chat) returns `None` and is ignored.
pub fn parse_command(body: &str) -> Option<Command> {
    let body = body.trim();

    if body == "!start" {
        return Some(Command::Start { count: None });
    }
    if let Some(rest) = body.strip_prefix("!start") {
        let rest = rest.trim();
        if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
            return Some(Command::Start {
                count: rest.parse().ok(),
            });
        }
        return None;
    }

    match body {
        "!stop" => Some(Command::Stop),
        "!users" => Some(Command::Users),
        "!queue" => Some(Command::Queue),
        "!skip" => Some(Command::Skip),
        "!info" => Some(Command::Info),
        _ => None,
    }
}
