//! Line classification and per-cue event extraction.
//!
//! This is the canonical grammar: every cue the referee bot can emit has
//! exactly one parsing function here, tried in the order listed in
//! [`parse_cue`]. Each function either recognizes its cue and returns
//! `Some(Event)`, or returns `None` so the dispatcher tries the next one.

use std::sync::LazyLock;

use regex::Regex;

use crate::irc::event::Event;
use crate::models::normalize_username;
use crate::slot::parse_slot_line;

/// A line classified by shape, before any cue-specific parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// `:cho.ppy.sh ...` — server notices, not routed to any room.
    Server { raw: String },
    /// A `PRIVMSG` not addressed to a `#mp_*` channel.
    Private { sender: String, body: String },
    /// A `PRIVMSG` addressed to a `#mp_*` channel.
    Room {
        sender: String,
        room_id: String,
        body: String,
    },
    /// Anything that doesn't fit the three shapes above.
    Unknown { raw: String },
}

const SERVER_PREFIX: &str = ":cho.ppy.sh";

/// Classify one complete (terminator-stripped) IRC line.
pub fn classify_line(line: &str) -> ParsedLine {
    if line.starts_with(SERVER_PREFIX) {
        return ParsedLine::Server {
            raw: line.to_string(),
        };
    }

    if !line.contains("PRIVMSG") {
        return ParsedLine::Unknown {
            raw: line.to_string(),
        };
    }

    let Some(sep) = line.find(" :") else {
        return ParsedLine::Unknown {
            raw: line.to_string(),
        };
    };
    let (head, rest) = line.split_at(sep);
    let body = rest[2..].to_string();

    let Some(sender) = extract_sender(head) else {
        return ParsedLine::Unknown {
            raw: line.to_string(),
        };
    };

    if let Some(room_id) = extract_room_id(head) {
        ParsedLine::Room {
            sender,
            room_id,
            body,
        }
    } else {
        ParsedLine::Private { sender, body }
    }
}

/// `:Alice!cho@ppy.sh PRIVMSG ...` → `Alice`, normalized.
fn extract_sender(head: &str) -> Option<String> {
    let start = head.find(':')? + 1;
    let bang = head[start..].find('!')? + start;
    Some(normalize_username(&head[start..bang]))
}

/// `... PRIVMSG #mp_99211675 ...` → `#mp_99211675`.
fn extract_room_id(head: &str) -> Option<String> {
    let idx = head.find("PRIVMSG #mp_")?;
    let after = &head[idx + "PRIVMSG ".len()..];
    Some(after.trim().to_string())
}

static ROOM_CREATED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://osu\.ppy\.sh/mp/(\d+) (.*)").unwrap());

/// Parse a `Created the tournament match https://osu.ppy.sh/mp/<id> <name>`
/// private message body into `(room_id, name)`.
pub fn parse_room_created(body: &str) -> Option<(String, String)> {
    if !body.starts_with("Created the tournament match") {
        return None;
    }
    let caps = ROOM_CREATED_RE.captures(body)?;
    let id = caps.get(1)?.as_str();
    let name = caps.get(2)?.as_str().trim().to_string();
    Some((format!("#mp_{id}"), name))
}

static BEATMAP_PICKED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Beatmap.*?: (.*?) \[(.*?)\] \((.*?)\)").unwrap());

fn parse_beatmap_picked(body: &str) -> Option<Event> {
    if !body.starts_with("Beatmap changed to: ") {
        return None;
    }
    let caps = BEATMAP_PICKED_RE.captures(body)?;
    Some(Event::BeatmapPicked {
        title: caps.get(1)?.as_str().to_string(),
        version: caps.get(2)?.as_str().to_string(),
        url: caps.get(3)?.as_str().to_string(),
    })
}

fn parse_beatmap_auto_set(body: &str) -> Option<Event> {
    if !body.starts_with("Changed beatmap to ") {
        return None;
    }
    let words: Vec<&str> = body.split_whitespace().collect();
    let url = *words.get(3)?;
    let beatmap_id: i64 = url.rsplit('/').next()?.parse().ok()?;
    // Reproduces the reference implementation's `"".join(words[4:])`: the
    // title is concatenated with no separator on this one announcement path.
    let title: String = words.get(4..).unwrap_or_default().concat();
    Some(Event::BeatmapAutoSet {
        title,
        url: url.to_string(),
        beatmap_id,
    })
}

fn parse_players_count(body: &str) -> Option<Event> {
    let rest = body.strip_prefix("Players: ")?;
    let count: usize = rest.split_whitespace().last()?.parse().ok()?;
    Some(Event::PlayersCount(count))
}

/// Try every cue in the documented order, returning the first match.
pub fn parse_cue(body: &str) -> Option<Event> {
    if body == "Closed the match" {
        return Some(Event::RoomClosed);
    }
    if let Some(name) = body.strip_suffix(" became the host.") {
        return Some(Event::HostChanged {
            name: normalize_username(name),
        });
    }
    if let Some(name) = body.strip_suffix(" left the game.") {
        return Some(Event::UserLeft {
            name: normalize_username(name),
        });
    }
    if let Some(idx) = body.find("joined in slot") {
        return Some(Event::UserJoined {
            name: normalize_username(&body[..idx]),
        });
    }
    if body == "The match has started!" {
        return Some(Event::MatchStarted);
    }
    if body == "The match has finished!" {
        return Some(Event::MatchFinished);
    }
    if body == "All players are ready" {
        return Some(Event::MatchReady);
    }
    if let Some(event) = parse_beatmap_picked(body) {
        return Some(event);
    }
    if let Some(event) = parse_beatmap_auto_set(body) {
        return Some(event);
    }
    if let Some(event) = parse_players_count(body) {
        return Some(event);
    }
    if body.starts_with("Slot ") {
        return parse_slot_line(body).map(Event::SlotLine);
    }
    None
}
