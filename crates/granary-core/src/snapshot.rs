//! Persistence boundary of the aggregate.
//!
//! A [`GameSnapshot`] is a plain, serializable copy of everything durable in
//! [`GameState`]: world metadata and scalars, policy, id counters, the
//! crisis slot, every entity collection, and the cooldown and daily-budget
//! trackers. Only open (Issued or Accepted) contracts are included.
//! Pending toasts are transient and never captured; they start empty after
//! a restore, and the random generator is reseeded from `seed ^ tick`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use granary_types::{
    BudgetKind, ChatMessage, Contract, CooldownKind, Crisis, DiplomaticMessage, Event, Evidence,
    Intercept, Loan, Obligation, Permit, Player, PlayerId, Project, Relic, Rumor, ScryReport,
    Seat, SeatKind, Subphase,
};

use crate::clock::{WorldClock, tick_of};
use crate::error::CoreError;
use crate::state::{Counters, DailyBudget, GameState, Policy, WorldScalars};

/// Bumped whenever the snapshot layout changes incompatibly.
pub const SNAPSHOT_VERSION: u32 = 1;

/// World-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldMeta {
    /// Snapshot layout version.
    pub version: u32,
    /// City name.
    pub name: String,
    /// Seed of the random generator.
    pub seed: u64,
    /// Absolute tick.
    pub tick: u64,
    /// World day of `tick`.
    pub day: u32,
    /// Half of the day of `tick`.
    pub subphase: Subphase,
    /// Wall-clock instant tick zero began.
    pub epoch: DateTime<Utc>,
    /// Grain, unrest, and timed world effects.
    pub scalars: WorldScalars,
    /// City policy.
    pub policy: Policy,
}

/// One cooldown tracker entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownEntry {
    /// Throttled player.
    pub player: PlayerId,
    /// Throttled action.
    pub kind: CooldownKind,
    /// When the action becomes available again.
    pub ready_at: DateTime<Utc>,
}

/// One daily-budget tracker entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetEntry {
    /// Budgeted player.
    pub player: PlayerId,
    /// Budgeted action.
    pub kind: BudgetKind,
    /// World day the count applies to.
    pub day: u32,
    /// Uses on that day.
    pub used: u32,
}

/// Serializable copy of the durable world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// World metadata, scalars, and policy.
    pub meta: WorldMeta,
    /// Next-id counters.
    pub counters: Counters,
    /// The crisis slot.
    pub crisis: Option<Crisis>,
    /// Players.
    pub players: Vec<Player>,
    /// Open contracts only.
    pub contracts: Vec<Contract>,
    /// Seats.
    pub seats: Vec<Seat>,
    /// Permits.
    pub permits: Vec<Permit>,
    /// Loans.
    pub loans: Vec<Loan>,
    /// Obligations.
    pub obligations: Vec<Obligation>,
    /// Rumors.
    pub rumors: Vec<Rumor>,
    /// Evidence dossiers.
    pub evidence: Vec<Evidence>,
    /// Scry reports.
    pub scry_reports: Vec<ScryReport>,
    /// Intercepts.
    pub intercepts: Vec<Intercept>,
    /// Relics.
    pub relics: Vec<Relic>,
    /// Projects.
    pub projects: Vec<Project>,
    /// Event log.
    pub events: Vec<Event>,
    /// Public chat.
    pub chat: Vec<ChatMessage>,
    /// Diplomatic letters.
    pub diplomatic: Vec<DiplomaticMessage>,
    /// Cooldown trackers.
    pub cooldowns: Vec<CooldownEntry>,
    /// Daily-budget trackers.
    pub budgets: Vec<BudgetEntry>,
}

fn values<K, V: Clone>(map: &BTreeMap<K, V>) -> Vec<V> {
    map.values().cloned().collect()
}

fn keyed<K: Ord, V>(items: Vec<V>, key: impl Fn(&V) -> K) -> BTreeMap<K, V> {
    items.into_iter().map(|v| (key(&v), v)).collect()
}

impl GameState {
    /// Capture the durable world.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            meta: WorldMeta {
                version: SNAPSHOT_VERSION,
                name: self.config.world.name.clone(),
                seed: self.seed,
                tick: self.tick(),
                day: self.day(),
                subphase: self.clock.subphase(),
                epoch: self.clock.epoch(),
                scalars: self.world.clone(),
                policy: self.policy.clone(),
            },
            counters: self.counters.clone(),
            crisis: self.crisis.clone(),
            players: values(&self.players),
            contracts: self
                .contracts
                .values()
                .filter(|c| c.status.is_open())
                .cloned()
                .collect(),
            seats: values(&self.seats),
            permits: values(&self.permits),
            loans: values(&self.loans),
            obligations: values(&self.obligations),
            rumors: values(&self.rumors),
            evidence: values(&self.evidence),
            scry_reports: values(&self.scry_reports),
            intercepts: values(&self.intercepts),
            relics: values(&self.relics),
            projects: values(&self.projects),
            events: self.events.clone(),
            chat: self.chat.clone(),
            diplomatic: self.diplomatic.clone(),
            cooldowns: self
                .cooldowns
                .iter()
                .map(|(&(player, kind), &ready_at)| CooldownEntry {
                    player,
                    kind,
                    ready_at,
                })
                .collect(),
            budgets: self
                .budgets
                .iter()
                .map(|(&(player, kind), budget)| BudgetEntry {
                    player,
                    kind,
                    day: budget.day,
                    used: budget.used,
                })
                .collect(),
        }
    }

    /// Replace the durable world with a snapshot.
    ///
    /// The snapshot is checked before anything is touched, so a rejected
    /// snapshot leaves the aggregate unchanged. Configuration is kept.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Snapshot`] if the snapshot's version is unknown
    /// or its day and subphase disagree with its tick, and
    /// [`CoreError::Clock`] if the clock cannot be rebuilt.
    pub fn restore(&mut self, snap: GameSnapshot) -> Result<(), CoreError> {
        let meta = &snap.meta;
        if meta.version != SNAPSHOT_VERSION {
            return Err(CoreError::Snapshot {
                reason: format!(
                    "snapshot version {} is not supported (expected {SNAPSHOT_VERSION})",
                    meta.version
                ),
            });
        }
        if tick_of(meta.day, meta.subphase) != meta.tick {
            return Err(CoreError::Snapshot {
                reason: format!(
                    "day {} {:?} does not match tick {}",
                    meta.day, meta.subphase, meta.tick
                ),
            });
        }
        let clock = WorldClock::from_parts(meta.tick, meta.epoch, self.config.world.tick_seconds)?;

        let tenure = self.config.institutions.tenure_ticks;
        let mut seats = keyed(snap.seats, |s| s.kind);
        for kind in SeatKind::ALL {
            seats
                .entry(kind)
                .or_insert_with(|| Seat::vacant(kind, tenure));
        }

        self.clock = clock;
        self.seed = snap.meta.seed;
        self.world = snap.meta.scalars;
        self.policy = snap.meta.policy;
        self.counters = snap.counters;
        self.crisis = snap.crisis;
        self.players = keyed(snap.players, |p| p.id);
        self.contracts = keyed(snap.contracts, |c| c.id);
        self.seats = seats;
        self.permits = keyed(snap.permits, |p| p.id);
        self.loans = keyed(snap.loans, |l| l.id);
        self.obligations = keyed(snap.obligations, |o| o.id);
        self.rumors = keyed(snap.rumors, |r| r.id);
        self.evidence = keyed(snap.evidence, |e| e.id);
        self.scry_reports = keyed(snap.scry_reports, |r| r.id);
        self.intercepts = keyed(snap.intercepts, |i| i.id);
        self.relics = keyed(snap.relics, |r| r.id);
        self.projects = keyed(snap.projects, |p| p.id);
        self.events = snap.events;
        self.chat = snap.chat;
        self.diplomatic = snap.diplomatic;
        self.cooldowns = snap
            .cooldowns
            .into_iter()
            .map(|c| ((c.player, c.kind), c.ready_at))
            .collect();
        self.budgets = snap
            .budgets
            .into_iter()
            .map(|b| {
                (
                    (b.player, b.kind),
                    DailyBudget {
                        day: b.day,
                        used: b.used,
                    },
                )
            })
            .collect();
        self.pending_toasts.clear();
        self.reseed();

        info!(
            tick = self.tick(),
            day = self.day(),
            players = self.players.len(),
            contracts = self.contracts.len(),
            "World restored from snapshot"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use granary_types::{ContractStatus, EventKind, Stance};

    use super::*;
    use crate::actions::contracts;
    use crate::state::Toast;
    use crate::state::test_support::*;

    #[test]
    fn restore_reproduces_durable_fields() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 77);
        let id = contracts::issue_emergency(&mut s, now());
        let _ = contracts::accept(&mut s, p, id, Stance::Quiet, now());
        s.log_event(EventKind::Notice, "market day", None, now());
        s.policy.tax_rate_pct = 15;
        let snap = s.snapshot();

        let mut restored = state();
        assert!(restored.restore(snap.clone()).is_ok());
        assert_eq!(restored.snapshot(), snap);
        assert_eq!(
            restored.contracts.get(&id).map(|c| c.status),
            Some(ContractStatus::Accepted)
        );
    }

    #[test]
    fn snapshot_survives_json() {
        let mut s = state();
        let _ = add_player(&mut s, "Mara", 5);
        let _ = s.take_cooldown(PlayerId::new(), CooldownKind::Scry, now());
        let snap = s.snapshot();
        let decoded = serde_json::to_string(&snap)
            .ok()
            .and_then(|json| serde_json::from_str::<GameSnapshot>(&json).ok());
        assert_eq!(decoded, Some(snap));
    }

    #[test]
    fn terminal_contracts_are_not_captured() {
        let mut s = state();
        let id = contracts::issue_emergency(&mut s, now());
        if let Some(c) = s.contracts.get_mut(&id) {
            c.status = ContractStatus::Failed;
        }
        assert!(s.snapshot().contracts.is_empty());
    }

    #[test]
    fn restore_clears_pending_toasts() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 0);
        let snap = s.snapshot();
        s.notify(p, Toast::info("stale"));
        assert!(s.restore(snap).is_ok());
        assert!(s.drain_toasts(p).is_empty());
    }

    #[test]
    fn inconsistent_day_is_rejected_without_mutation() {
        let mut s = state();
        let mut snap = s.snapshot();
        snap.meta.day = 9;
        snap.players.push(Player::new(PlayerId::new(), "Ghost", 1, now()));
        assert!(s.restore(snap).is_err());
        assert!(s.players.is_empty());
    }

    #[test]
    fn missing_seats_are_filled_vacant() {
        let mut s = state();
        let mut snap = s.snapshot();
        snap.seats.clear();
        assert!(s.restore(snap).is_ok());
        assert_eq!(s.seats.len(), SeatKind::ALL.len());
    }
}
