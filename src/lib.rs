//! Wiring: loads the beatmap catalogs, builds the room registry and
//! dispatcher, and drives the single read/tick/shutdown event loop.

pub mod beatmap;
pub mod command;
pub mod config;
pub mod error;
pub mod irc;
pub mod logging;
pub mod models;
pub mod outbound;
pub mod registry;
pub mod session;
pub mod slot;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::interval;

use beatmap::catalog::{BeatmapCatalogLoader, JsonFileCatalogLoader};
use beatmap::fetcher::ReqwestFetcher;
use config::Config;
use error::BotError;
use irc::dispatcher::Dispatcher;
use irc::transport::Transport;
use models::{BotMode, RoomConfig};
use outbound::OutboundCommand;
use registry::RoomRegistry;

const IRC_ADDR: &str = "irc.ppy.sh:6667";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const RECONCILE_INTERVAL: Duration = Duration::from_secs(5);

/// Build the registry's initial rooms, loading an AutoPick catalog wherever
/// a room declares one.
fn load_rooms(rooms: Vec<RoomConfig>, loader: &impl BeatmapCatalogLoader) -> RoomRegistry {
    let entries = rooms
        .into_iter()
        .map(|config| {
            let beatmaps = match (&config.bot_mode, &config.beatmapset_filename) {
                (BotMode::AutoPick, Some(path)) => {
                    match loader.load(path, config.min_star, config.max_star) {
                        Ok(records) => records,
                        Err(err) => {
                            tracing::error!(room = %config.name, %err, "failed to load beatmap catalog");
                            Vec::new()
                        }
                    }
                }
                _ => Vec::new(),
            };
            (config, beatmaps)
        })
        .collect();
    RoomRegistry::new(entries)
}

/// Run the bot until `stop` is set or an unrecoverable connect failure
/// occurs. Reconnects transparently on transient transport errors.
pub async fn run(config: Config, stop: Arc<AtomicBool>) -> Result<(), BotError> {
    let loader = JsonFileCatalogLoader;
    let registry = load_rooms(config.rooms, &loader);
    let mut dispatcher = Dispatcher::new(registry, ReqwestFetcher::new());

    let mut transport = Transport::connect(IRC_ADDR, &config.username, &config.password, CONNECT_TIMEOUT).await?;
    let mut ticker = interval(RECONCILE_INTERVAL);

    while !stop.load(Ordering::Relaxed) {
        tokio::select! {
            line = transport.read_line() => {
                match line {
                    Ok(Some(line)) => {
                        let mut outbound = Vec::new();
                        dispatcher.handle_line(&line, &mut outbound).await;
                        flush(&mut transport, outbound).await?;
                    }
                    Ok(None) => {
                        tracing::warn!("connection closed by peer, reconnecting");
                        dispatcher.mark_all_disconnected();
                        transport = Transport::connect(IRC_ADDR, &config.username, &config.password, CONNECT_TIMEOUT).await?;
                    }
                    Err(err) => {
                        tracing::warn!(%err, "transport read failed, reconnecting");
                        dispatcher.mark_all_disconnected();
                        transport = Transport::connect(IRC_ADDR, &config.username, &config.password, CONNECT_TIMEOUT).await?;
                    }
                }
            }
            _ = ticker.tick() => {
                let mut outbound = Vec::new();
                dispatcher.tick(&mut outbound);
                flush(&mut transport, outbound).await?;
            }
        }
    }

    Ok(())
}

async fn flush(
    transport: &mut Transport<tokio::net::TcpStream>,
    commands: Vec<OutboundCommand>,
) -> Result<(), BotError> {
    for command in commands {
        transport.send(&command).await?;
    }
    Ok(())
}

/// Watch for `SIGINT`/`SIGTERM` and flip `stop` once either arrives.
pub async fn watch_for_shutdown(stop: Arc<AtomicBool>) {
    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(signal) => signal,
        Err(err) => {
            tracing::error!(%err, "failed to install SIGTERM handler");
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
    stop.store(true, Ordering::Relaxed);
}
