use thiserror::Error;

/// Crate-wide error type for anything that can make the bot reconnect,
/// refuse to start, or drop a single line. Beatmap policy violations are
/// deliberately NOT represented here — they are room chat, not errors
/// (see `beatmap::policy::Violation`).
#[derive(Debug, Error)]
pub enum BotError {
    #[error("transport {action} failed: {source}")]
    Transport {
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("connect to {addr} timed out")]
    ConnectTimeout { addr: String },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Fatal startup configuration problems. The process exits before the
/// event loop ever starts, so these never need to be recoverable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("room \"{0}\" is missing beatmapset_filename, which is required for bot_mode AutoPick")]
    MissingBeatmapsetFilename(String),

    #[error("room \"{0}\" has an empty name")]
    EmptyRoomName(String),

    #[error("room \"{name}\" has an invalid {field}: {value}")]
    InvalidField {
        name: String,
        field: &'static str,
        value: i64,
    },
}
