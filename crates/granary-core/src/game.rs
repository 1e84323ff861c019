//! Shared handle to the world.
//!
//! [`Game`] wraps the aggregate in one exclusive async lock. Every read and
//! mutation holds the lock for its whole duration; handlers and tick passes
//! are synchronous, so nothing awaits while the lock is held. Persistence
//! clones a snapshot under the lock and writes it after releasing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use granary_types::PlayerId;

use crate::actions::admin::{AdminCommand, run_admin};
use crate::actions::social::{self, JoinOutcome};
use crate::actions::{Action, dispatch};
use crate::cleanup::{self, CleanupReport};
use crate::config::GameConfig;
use crate::error::CoreError;
use crate::snapshot::GameSnapshot;
use crate::state::{ActionOutcome, GameState};
use crate::tick::{TickError, advance_to};

/// Cloneable handle to the one world.
#[derive(Debug, Clone)]
pub struct Game {
    state: Arc<Mutex<GameState>>,
}

impl Game {
    /// Wrap an existing aggregate.
    pub fn new(state: GameState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Build a fresh world whose tick zero starts at `epoch`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] if the configuration cannot produce a clock.
    pub fn from_config(config: GameConfig, epoch: DateTime<Utc>) -> Result<Self, CoreError> {
        Ok(Self::new(GameState::new(config, epoch)?))
    }

    /// Join the world as a new player.
    pub async fn join(&self, name: &str, now: DateTime<Utc>) -> JoinOutcome {
        let mut state = self.state.lock().await;
        catch_up(&mut state, now);
        social::join(&mut state, name, now)
    }

    /// Perform a gameplay action.
    ///
    /// Pending ticks run first. The actor's activity is recorded (which
    /// lifts a soft delete), the handler runs, and any messages queued for the actor ride along with
    /// the outcome.
    pub async fn act(&self, actor: PlayerId, action: Action, now: DateTime<Utc>) -> ActionOutcome {
        let mut state = self.state.lock().await;
        catch_up(&mut state, now);
        if let Some(player) = state
            .players
            .get_mut(&actor)
            .filter(|p| p.hard_deleted_at.is_none())
        {
            if player.soft_deleted_at.take().is_some() {
                info!(player = %actor, "Retired player returned");
            }
            player.last_seen_at = now;
        }
        let mut outcome = dispatch(&mut state, actor, action, now);
        outcome.toasts.extend(state.drain_toasts(actor));
        outcome
    }

    /// Run every tick due at `now`. Returns the number of ticks run.
    ///
    /// # Errors
    ///
    /// Returns [`TickError`] if the clock cannot advance.
    pub async fn advance(&self, now: DateTime<Utc>) -> Result<u64, TickError> {
        let mut state = self.state.lock().await;
        advance_to(&mut state, now)
    }

    /// Clone the durable world.
    pub async fn snapshot(&self) -> GameSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Replace the durable world with a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Snapshot`] if the snapshot is inconsistent; the
    /// world is left untouched.
    pub async fn restore(&self, snapshot: GameSnapshot) -> Result<(), CoreError> {
        self.state.lock().await.restore(snapshot)
    }

    /// Run the daily retention cleanup.
    pub async fn run_daily_cleanup(&self, now: DateTime<Utc>) -> CleanupReport {
        let mut state = self.state.lock().await;
        cleanup::run_daily_cleanup(&mut state, now)
    }

    /// Run an operator command. `is_privileged` comes from the caller.
    pub async fn admin(
        &self,
        is_privileged: bool,
        command: AdminCommand,
        now: DateTime<Utc>,
    ) -> ActionOutcome {
        let mut state = self.state.lock().await;
        run_admin(&mut state, is_privileged, command, now)
    }

    /// Read the world under the lock.
    pub async fn with_state<R>(&self, read: impl FnOnce(&GameState) -> R) -> R {
        let state = self.state.lock().await;
        read(&state)
    }

    /// Mutate the world under the lock.
    pub async fn with_state_mut<R>(&self, write: impl FnOnce(&mut GameState) -> R) -> R {
        let mut state = self.state.lock().await;
        write(&mut state)
    }
}

fn catch_up(state: &mut GameState, now: DateTime<Utc>) {
    if let Err(err) = advance_to(state, now) {
        warn!(%err, "Catch-up failed; acting on the current tick");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use granary_types::{ContractStatus, Stance};

    use super::*;
    use crate::actions::contracts;
    use crate::state::test_support::now;

    fn fresh_game() -> Game {
        Game::from_config(GameConfig::default(), now()).unwrap()
    }

    #[tokio::test]
    async fn join_then_act() {
        let game = fresh_game();
        let id = game.join("Mara", now()).await.player.unwrap();
        let outcome = game.act(id, Action::GatherRumor, now()).await;
        assert!(outcome.accepted);
        let rumors = game
            .with_state(|s| s.players.get(&id).map(|p| p.rumors))
            .await;
        assert_eq!(rumors, Some(1));
    }

    #[tokio::test]
    async fn acting_runs_pending_ticks() {
        let game = fresh_game();
        let id = game.join("Mara", now()).await.player.unwrap();
        let later = now() + Duration::seconds(2 * 1_800);
        let _ = game.act(id, Action::GatherRumor, later).await;
        assert_eq!(game.with_state(GameState::tick).await, 2);
        let seen = game
            .with_state(|s| s.players.get(&id).map(|p| p.last_seen_at))
            .await;
        assert_eq!(seen, Some(later));
    }

    #[tokio::test]
    async fn queued_messages_ride_along() {
        let game = fresh_game();
        let a = game.join("Mara", now()).await.player.unwrap();
        let b = game.join("Tomas", now()).await.player.unwrap();
        let letter = Action::SendDiplomatic {
            to: b,
            text: "meet at dusk".to_owned(),
        };
        assert!(game.act(a, letter, now()).await.accepted);
        let outcome = game.act(b, Action::GatherRumor, now()).await;
        assert_eq!(outcome.toasts.len(), 2);
    }

    #[tokio::test]
    async fn returning_player_lifts_soft_delete() {
        let game = fresh_game();
        let id = game.join("Mara", now()).await.player.unwrap();
        game.with_state_mut(|s| {
            s.players.get_mut(&id).unwrap().soft_deleted_at = Some(now());
        })
        .await;

        let later = now() + Duration::minutes(5);
        assert!(game.act(id, Action::GatherRumor, later).await.accepted);
        let player = game.with_state(|s| s.players[&id].clone()).await;
        assert!(player.soft_deleted_at.is_none());
        assert_eq!(player.last_seen_at, later);
    }

    #[tokio::test]
    async fn hard_deleted_player_stays_out() {
        let game = fresh_game();
        let id = game.join("Mara", now()).await.player.unwrap();
        game.with_state_mut(|s| {
            let p = s.players.get_mut(&id).unwrap();
            p.soft_deleted_at = Some(now());
            p.hard_deleted_at = Some(now());
        })
        .await;

        let later = now() + Duration::minutes(5);
        assert!(!game.act(id, Action::GatherRumor, later).await.accepted);
        let player = game.with_state(|s| s.players[&id].clone()).await;
        assert!(player.soft_deleted_at.is_some());
        assert_eq!(player.last_seen_at, now());
    }

    #[tokio::test]
    async fn snapshot_restore_through_the_handle() {
        let game = fresh_game();
        let id = game.join("Mara", now()).await.player.unwrap();
        let contract = game
            .with_state_mut(|s| contracts::issue_emergency(s, now()))
            .await;
        let accept = Action::Accept {
            contract,
            stance: Stance::Careful,
        };
        assert!(game.act(id, accept, now()).await.accepted);
        let snap = game.snapshot().await;

        let other = fresh_game();
        assert!(other.restore(snap).await.is_ok());
        let status = other
            .with_state(|s| s.contracts.get(&contract).map(|c| c.status))
            .await;
        assert_eq!(status, Some(ContractStatus::Accepted));
    }
}
