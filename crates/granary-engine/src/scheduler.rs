//! Background jobs: the tick loop, autosave, and the daily cleanup.
//!
//! Ticks are driven off the wall clock: every poll runs whatever ticks are
//! due, so a late poll never loses a tick. Autosave clones a snapshot under
//! the world lock and writes it after the lock is released. On shutdown one
//! final save runs with its own deadline.

use std::time::Duration;

use chrono::{DateTime, Days, NaiveTime, Utc};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use granary_core::Game;
use granary_core::config::EngineConfig;
use granary_db::{DbError, PersistCtx, Repository};

/// Longest gap between two tick polls.
const MAX_POLL_SECS: u64 = 10;

/// How often the tick loop checks for due ticks.
pub fn poll_period(tick_seconds: u64) -> Duration {
    Duration::from_secs(tick_seconds.clamp(1, MAX_POLL_SECS))
}

/// The next instant strictly after `now` that falls on `hour`:00 UTC.
pub fn next_cleanup_at(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let at = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today.checked_add_days(Days::new(1)).unwrap_or(today)
    }
}

fn until(target: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    target.signed_duration_since(now).to_std().unwrap_or(Duration::ZERO)
}

/// Owns the background jobs for one world.
pub struct Scheduler<R> {
    game: Game,
    repo: R,
    engine: EngineConfig,
    tick_seconds: u64,
}

impl<R: Repository + Sync> Scheduler<R> {
    /// Create a scheduler for `game`, persisting through `repo`.
    pub const fn new(game: Game, repo: R, engine: EngineConfig, tick_seconds: u64) -> Self {
        Self {
            game,
            repo,
            engine,
            tick_seconds,
        }
    }

    fn persist_ctx(&self) -> PersistCtx {
        PersistCtx::with_timeout(Duration::from_secs(self.engine.persist_timeout_secs))
    }

    /// Snapshot the world and write it out.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails; the world is unaffected.
    pub async fn save(&self, ctx: &PersistCtx) -> Result<(), DbError> {
        let snapshot = self.game.snapshot().await;
        let tick = snapshot.meta.tick;
        self.repo.save(ctx, &snapshot).await?;
        debug!(tick, "Autosave complete");
        Ok(())
    }

    async fn tick(&self) {
        match self.game.advance(Utc::now()).await {
            Ok(0) => {}
            Ok(ran) => debug!(ran, "Ticks advanced"),
            Err(err) => warn!(%err, "Tick loop could not advance the world"),
        }
    }

    async fn cleanup(&self) {
        let report = self.game.run_daily_cleanup(Utc::now()).await;
        debug!(?report, "Daily cleanup ran");
    }

    /// Run until `shutdown` turns `true` (or its sender is dropped), then
    /// save once more.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the final save fails. Failures of periodic
    /// saves are logged and retried on the next autosave.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), DbError> {
        let mut ticks = tokio::time::interval(poll_period(self.tick_seconds));
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let autosave_every = Duration::from_secs(self.engine.autosave_secs.max(1));
        let mut autosave = tokio::time::interval_at(
            Instant::now().checked_add(autosave_every).unwrap_or_else(Instant::now),
            autosave_every,
        );
        autosave.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let hour = self.engine.cleanup_hour_utc;
        let mut cleanup_at = next_cleanup_at(Utc::now(), hour);
        info!(
            poll_secs = poll_period(self.tick_seconds).as_secs(),
            autosave_secs = autosave_every.as_secs(),
            next_cleanup = %cleanup_at,
            "Scheduler started"
        );

        loop {
            let cleanup_sleep = tokio::time::sleep(until(cleanup_at, Utc::now()));
            tokio::select! {
                _ = ticks.tick() => self.tick().await,
                _ = autosave.tick() => {
                    if let Err(err) = self.save(&self.persist_ctx()).await {
                        warn!(%err, "Autosave failed; will retry");
                    }
                }
                () = cleanup_sleep => {
                    self.cleanup().await;
                    cleanup_at = next_cleanup_at(Utc::now(), hour);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Scheduler stopping; writing final save");
        self.save(&self.persist_ctx()).await?;
        info!(tick = self.game.with_state(|s| s.tick()).await, "Final save complete");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use granary_core::config::GameConfig;
    use granary_db::{PoolConfig, SqliteRepository};

    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, minute, 0).single().unwrap()
    }

    // ---------------------------------------------------------------------
    // Timing
    // ---------------------------------------------------------------------

    #[test]
    fn cleanup_later_today() {
        assert_eq!(next_cleanup_at(at(1, 30), 4), at(4, 0));
    }

    #[test]
    fn cleanup_rolls_to_tomorrow() {
        let next = next_cleanup_at(at(4, 0), 4);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 2, 4, 0, 0).single().unwrap());
    }

    #[test]
    fn poll_never_exceeds_cap_or_drops_to_zero() {
        assert_eq!(poll_period(1_800), Duration::from_secs(MAX_POLL_SECS));
        assert_eq!(poll_period(0), Duration::from_secs(1));
        assert_eq!(poll_period(3), Duration::from_secs(3));
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    async fn memory_store() -> SqliteRepository {
        let config = PoolConfig::new("sqlite::memory:").with_max_connections(1);
        SqliteRepository::connect(&config).await.unwrap()
    }

    #[tokio::test]
    async fn shutdown_writes_a_final_save() {
        let repo = memory_store().await;
        let game = Game::from_config(GameConfig::default(), Utc::now()).unwrap();
        let _ = game.join("Mara", Utc::now()).await;
        let config = GameConfig::default();
        let scheduler = Scheduler::new(game, repo.clone(), config.engine, config.world.tick_seconds);

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        scheduler.run(rx).await.unwrap();

        let loaded = repo.load(&PersistCtx::background()).await.unwrap().unwrap();
        assert_eq!(loaded.players.len(), 1);
    }
}
