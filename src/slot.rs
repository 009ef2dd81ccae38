//! Parses `Slot N ...` lines emitted by the referee bot in response to
//! `!mp settings`, used to reconcile room membership against reality.

use crate::models::normalize_username;

/// Game modifiers / privileges the referee bot reports in a slot's trailing
/// bracket. Anything outside this set means the bracket is actually part of
/// the username (some usernames legitimately contain `[...]`).
const VALID_ROLES: &[&str] = &[
    "Host",
    "TeamBlue",
    "TeamRed",
    "Hidden",
    "HardRock",
    "SuddenDeath",
    "Flashlight",
    "SpunOut",
    "NoFail",
    "Easy",
    "Relax",
    "Relax2",
];

/// One parsed `Slot` line.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotLine {
    pub slot: u32,
    pub status: String,
    pub user_id: u64,
    pub username: String,
    pub roles: Option<Vec<String>>,
}

/// Parse a `Slot N <status> <profile_url> <username>[ [roles]]` line.
/// Returns `None` if the line doesn't have enough tokens to be a slot line.
pub fn parse_slot_line(body: &str) -> Option<SlotLine> {
    let words: Vec<&str> = body.split_whitespace().collect();
    if words.len() < 4 || words[0] != "Slot" {
        return None;
    }

    let slot: u32 = words.get(1)?.parse().unwrap_or(0);

    let (status, url, user_and_roles_start) = if words.get(2) != Some(&"Ready") {
        // Multi-word status, e.g. "Not Ready".
        if words.len() < 5 {
            return None;
        }
        (format!("{} {}", words[2], words[3]), words[4], 5)
    } else {
        if words.len() < 4 {
            return None;
        }
        (words[2].to_string(), words[3], 4)
    };

    if words.len() <= user_and_roles_start {
        return None;
    }
    let user_and_roles = words[user_and_roles_start..].join(" ");

    let (username, roles) = split_username_and_roles(&user_and_roles);

    let user_id: u64 = url.rsplit('/').next().unwrap_or("0").parse().unwrap_or(0);

    Some(SlotLine {
        slot,
        status,
        user_id,
        username: normalize_username(&username),
        roles,
    })
}

/// Split `"Alice [Hidden / HardRock, Easy]"`-shaped text into the username
/// and the parsed role list, falling back to treating the whole string as
/// the username when the bracketed tail contains anything that isn't a
/// known role (some usernames legitimately end in `[...]`).
fn split_username_and_roles(user_and_roles: &str) -> (String, Option<Vec<String>>) {
    if !user_and_roles.ends_with(']') {
        return (user_and_roles.to_string(), None);
    }

    let Some(open_idx) = user_and_roles.rfind('[') else {
        return (user_and_roles.to_string(), None);
    };
    if open_idx == 0 {
        return (user_and_roles.to_string(), None);
    }

    let candidate_username = user_and_roles[..open_idx].trim_end().to_string();
    let inner = &user_and_roles[open_idx + 1..user_and_roles.len() - 1];
    let inner_compact: String = inner.chars().filter(|c| !c.is_whitespace()).collect();

    if inner_compact.is_empty() {
        return (candidate_username, None);
    }

    let mut tokens: Vec<String> = inner_compact.split('/').map(String::from).collect();
    if let Some(last) = tokens.pop() {
        tokens.extend(last.split(',').map(String::from));
    }

    if tokens.iter().all(|t| VALID_ROLES.contains(&t.as_str())) {
        (candidate_username, Some(tokens))
    } else {
        // Not a role bracket after all — it's part of the username.
        (user_and_roles.to_string(), None)
    }
}
