//! Engine binary for the Granary world.
//!
//! Wires the in-memory world to its durable store and runs the background
//! jobs until interrupted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `granary-config.yaml` (or `GRANARY_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the storage backend named by `storage.dialect`
//! 4. Build the world and load the last save into it
//! 5. Run the tick loop, autosave, and daily cleanup
//! 6. On Ctrl-C, stop the loop and write a final save

mod error;
mod scheduler;

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use granary_core::Game;
use granary_core::config::{GameConfig, LoggingConfig};
use granary_db::{PersistCtx, StorageBackend, load_into};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::scheduler::Scheduler;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "granary-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any startup step or the final save fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_logging(&config.logging)?;

    run(config).await?;
    info!("granary-engine shutdown complete");
    Ok(())
}

/// Open storage, load the world, and run the scheduler until shutdown.
async fn run(config: GameConfig) -> Result<(), EngineError> {
    info!(
        world_name = config.world.name,
        seed = config.world.seed,
        tick_seconds = config.world.tick_seconds,
        dialect = ?config.storage.dialect,
        "granary-engine starting"
    );

    let backend = StorageBackend::connect(&config.storage).await?;
    info!(backend = backend.name(), "Storage backend ready");

    let game = Game::from_config(config.clone(), Utc::now())?;
    let load_ctx = PersistCtx::with_timeout(Duration::from_secs(
        config.engine.persist_timeout_secs,
    ));
    if load_into(&backend, &load_ctx, &game).await? {
        let (tick, players) = game.with_state(|s| (s.tick(), s.players.len())).await;
        info!(tick, players, "Saved world loaded");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, shutting down"),
            Err(err) => warn!(%err, "Could not listen for Ctrl-C; shutting down"),
        }
        let _ = shutdown_tx.send(true);
    });

    let scheduler = Scheduler::new(
        game,
        backend.clone(),
        config.engine.clone(),
        config.world.tick_seconds,
    );
    let finished = scheduler.run(shutdown_rx).await;
    backend.close().await;
    finished?;
    Ok(())
}

/// Load configuration from `GRANARY_CONFIG` or the default path.
///
/// A missing file means all defaults, with environment overrides applied.
fn load_config() -> Result<GameConfig, EngineError> {
    let path = std::env::var("GRANARY_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        Ok(GameConfig::from_file(&path)?)
    } else {
        Ok(GameConfig::parse("")?)
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_logging(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}
