use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::Parser;

use osu_room_host::config::load_config;
use osu_room_host::{logging, run, watch_for_shutdown};

/// Automated host/referee bot for osu! multiplayer match rooms.
#[derive(Debug, Parser)]
struct Cli {
    /// Path to the room configuration file.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Directory rolling log files are written to.
    #[arg(long, default_value = "logs")]
    log_dir: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = logging::init(&cli.log_dir);

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            osu_room_host::critical!(%err, "failed to load configuration, exiting");
            return ExitCode::FAILURE;
        }
    };

    let stop = Arc::new(AtomicBool::new(false));
    tokio::spawn(watch_for_shutdown(stop.clone()));

    match run(config, stop).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            osu_room_host::critical!(%err, "bot exited with an unrecoverable error");
            ExitCode::FAILURE
        }
    }
}
