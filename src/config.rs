//! Startup configuration loading and validation.
//!
//! Out of scope per the design brief in spirit (the core session engine
//! never cares how a `RoomConfig` was produced), but a real binary still
//! needs a concrete loader, so this module owns the JSON schema and the
//! fatal-at-startup validation rules.

use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;
use crate::models::{BotMode, PlayMode, RoomConfig, ScoreMode, TeamMode};

/// Raw on-disk shape of the top-level config file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    username: String,
    password: String,
    rooms: Vec<RawRoomConfig>,
}

#[derive(Debug, Deserialize)]
struct RawRoomConfig {
    name: String,
    password: String,
    team_mode: u8,
    score_mode: u8,
    play_mode: u8,
    bot_mode: u8,
    min: f64,
    max: f64,
    #[serde(default = "default_room_size")]
    room_size: u8,
    #[serde(default)]
    beatmapset_filename: Option<String>,
}

fn default_room_size() -> u8 {
    16
}

/// Fully loaded and validated startup configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub rooms: Vec<RoomConfig>,
}

/// Load, parse, and validate the config file at `path`. Any failure here is
/// fatal — the caller is expected to log at `critical` and exit(1).
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let raw: RawConfig = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    let rooms = raw
        .rooms
        .into_iter()
        .map(validate_room)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Config {
        username: raw.username,
        password: raw.password,
        rooms,
    })
}

fn validate_room(raw: RawRoomConfig) -> Result<RoomConfig, ConfigError> {
    let trimmed_name = raw.name.trim().to_string();
    if trimmed_name.is_empty() {
        return Err(ConfigError::EmptyRoomName(raw.name));
    }

    let team_mode = decode_team_mode(&trimmed_name, raw.team_mode)?;
    let score_mode = decode_score_mode(&trimmed_name, raw.score_mode)?;
    let play_mode = decode_play_mode(&trimmed_name, raw.play_mode)?;
    let bot_mode = decode_bot_mode(&trimmed_name, raw.bot_mode)?;

    if bot_mode == BotMode::AutoPick && raw.beatmapset_filename.is_none() {
        return Err(ConfigError::MissingBeatmapsetFilename(trimmed_name));
    }

    Ok(RoomConfig {
        name: trimmed_name,
        password: raw.password,
        team_mode,
        score_mode,
        play_mode,
        room_size: raw.room_size,
        bot_mode,
        min_star: raw.min,
        max_star: raw.max,
        beatmapset_filename: raw.beatmapset_filename,
    })
}

fn decode_team_mode(name: &str, value: u8) -> Result<TeamMode, ConfigError> {
    match value {
        0 => Ok(TeamMode::HeadToHead),
        1 => Ok(TeamMode::TagCoop),
        2 => Ok(TeamMode::TeamVs),
        3 => Ok(TeamMode::TagTeamVs),
        other => Err(ConfigError::InvalidField {
            name: name.to_string(),
            field: "team_mode",
            value: other as i64,
        }),
    }
}

fn decode_score_mode(name: &str, value: u8) -> Result<ScoreMode, ConfigError> {
    match value {
        0 => Ok(ScoreMode::Score),
        1 => Ok(ScoreMode::Accuracy),
        2 => Ok(ScoreMode::Combo),
        3 => Ok(ScoreMode::ScoreV2),
        other => Err(ConfigError::InvalidField {
            name: name.to_string(),
            field: "score_mode",
            value: other as i64,
        }),
    }
}

fn decode_play_mode(name: &str, value: u8) -> Result<PlayMode, ConfigError> {
    match value {
        0 => Ok(PlayMode::Osu),
        1 => Ok(PlayMode::Taiko),
        2 => Ok(PlayMode::Catch),
        3 => Ok(PlayMode::Mania),
        other => Err(ConfigError::InvalidField {
            name: name.to_string(),
            field: "play_mode",
            value: other as i64,
        }),
    }
}

fn decode_bot_mode(name: &str, value: u8) -> Result<BotMode, ConfigError> {
    match value {
        0 => Ok(BotMode::AutoHost),
        1 => Ok(BotMode::AutoPick),
        other => Err(ConfigError::InvalidField {
            name: name.to_string(),
            field: "bot_mode",
            value: other as i64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile_path::TempPath {
        tempfile_path::TempPath::with_contents(contents)
    }

    /// Tiny local stand-in for a temp-file helper so this module doesn't
    /// need a dev-dependency just to exercise the loader end to end.
    mod tempfile_path {
        use std::path::{Path, PathBuf};

        pub struct TempPath(PathBuf);

        impl TempPath {
            pub fn with_contents(contents: &str) -> Self {
                let path = std::env::temp_dir().join(format!(
                    "osu-room-host-test-{}-{}.json",
                    std::process::id(),
                    contents.len()
                ));
                std::fs::write(&path, contents).unwrap();
                TempPath(path)
            }
        }

        impl Drop for TempPath {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.0);
            }
        }

        impl AsRef<Path> for TempPath {
            fn as_ref(&self) -> &Path {
                &self.0
            }
        }
    }

    const AUTOHOST_JSON: &str = r#"{
        "username": "bot",
        "password": "secret",
        "rooms": [
            {"name": "Room A", "password": "p", "team_mode": 0, "score_mode": 3, "play_mode": 0, "bot_mode": 0, "min": 0, "max": 10}
        ]
    }"#;

    #[test]
    fn loads_valid_autohost_config() {
        let tmp = write_temp(AUTOHOST_JSON);
        let config = load_config(tmp.as_ref()).unwrap();
        assert_eq!(config.username, "bot");
        assert_eq!(config.rooms.len(), 1);
        assert_eq!(config.rooms[0].name, "Room A");
        assert_eq!(config.rooms[0].room_size, 16);
    }

    #[test]
    fn autopick_room_without_filename_is_fatal() {
        let json = r#"{
            "username": "bot",
            "password": "secret",
            "rooms": [
                {"name": "Room B", "password": "p", "team_mode": 0, "score_mode": 3, "play_mode": 0, "bot_mode": 1, "min": 5, "max": 6}
            ]
        }"#;
        let tmp = write_temp(json);
        let err = load_config(tmp.as_ref()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingBeatmapsetFilename(_)));
    }

    #[test]
    fn autopick_room_with_filename_is_accepted() {
        let json = r#"{
            "username": "bot",
            "password": "secret",
            "rooms": [
                {"name": "Room C", "password": "p", "team_mode": 0, "score_mode": 3, "play_mode": 0, "bot_mode": 1, "min": 5, "max": 6, "beatmapset_filename": "maps.json"}
            ]
        }"#;
        let tmp = write_temp(json);
        let config = load_config(tmp.as_ref()).unwrap();
        assert_eq!(config.rooms[0].beatmapset_filename.as_deref(), Some("maps.json"));
    }

    #[test]
    fn blank_room_name_is_fatal() {
        let json = r#"{
            "username": "bot",
            "password": "secret",
            "rooms": [
                {"name": "   ", "password": "p", "team_mode": 0, "score_mode": 3, "play_mode": 0, "bot_mode": 0, "min": 0, "max": 10}
            ]
        }"#;
        let tmp = write_temp(json);
        let err = load_config(tmp.as_ref()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyRoomName(_)));
    }

    #[test]
    fn invalid_bot_mode_is_fatal() {
        let json = r#"{
            "username": "bot",
            "password": "secret",
            "rooms": [
                {"name": "Room D", "password": "p", "team_mode": 0, "score_mode": 3, "play_mode": 0, "bot_mode": 9, "min": 0, "max": 10}
            ]
        }"#;
        let tmp = write_temp(json);
        let err = load_config(tmp.as_ref()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { field: "bot_mode", .. }));
    }
}
