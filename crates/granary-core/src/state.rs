//! The world aggregate.
//!
//! [`GameState`] owns every entity collection, the world scalars, policy,
//! id counters, per-player cooldown and daily-budget trackers, and the one
//! seeded random generator every stochastic decision draws from. There are
//! no process-wide globals: handlers and tick passes receive the aggregate
//! by `&mut` reference and the [`Game`](crate::game::Game) handle serializes
//! access to it.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use granary_types::{
    BudgetKind, ChatMessage, Contract, ContractId, ContractStatus, CooldownKind, Crisis,
    DiplomaticMessage, Event, EventId, EventKind, Evidence, EvidenceId, GrainTier, Intercept,
    InterceptId, Loan, LoanId, Obligation, ObligationId, Permit, PermitId, Player, PlayerId,
    Project, ProjectId, Relic, RelicId, Rumor, RumorId, ScryReport, ScryReportId, Seat, SeatKind,
    Situation, UnrestTier, derive_situation, grain_tier, unrest_tier,
};

use crate::clock::WorldClock;
use crate::config::GameConfig;
use crate::error::CoreError;

/// Grain units in one sack.
pub const SACK_UNITS: u32 = 5;

/// Generic denial for references to records that no longer exist.
pub const UNAVAILABLE: &str = "That is no longer available.";

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Severity of a transient message shown to a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToastLevel {
    /// Neutral notice.
    Info,
    /// The action went through.
    Success,
    /// The action was refused.
    Error,
}

/// A transient message for one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    /// Severity.
    pub level: ToastLevel,
    /// Message text.
    pub text: String,
}

impl Toast {
    /// Neutral notice.
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Info,
            text: text.into(),
        }
    }

    /// Confirmation of a successful action.
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            text: text.into(),
        }
    }

    /// Refusal of an action.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            text: text.into(),
        }
    }
}

/// Result of a gameplay action. Handlers never fail; they report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Whether the action changed the world.
    pub accepted: bool,
    /// Messages for the acting player.
    pub toasts: Vec<Toast>,
}

impl ActionOutcome {
    /// An action that went through.
    pub fn accepted(toast: Toast) -> Self {
        Self {
            accepted: true,
            toasts: vec![toast],
        }
    }

    /// An action that was refused.
    pub fn denied(text: impl Into<String>) -> Self {
        Self {
            accepted: false,
            toasts: vec![Toast::error(text)],
        }
    }

    /// Refusal for a reference to a missing record.
    pub fn unavailable() -> Self {
        Self::denied(UNAVAILABLE)
    }
}

/// A refused action, carried through `?` inside handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial(pub String);

impl Denial {
    /// Refusal with a custom message.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Refusal for a reference to a missing record.
    pub fn unavailable() -> Self {
        Self(UNAVAILABLE.to_owned())
    }
}

/// What a handler returns internally before it is folded into an
/// [`ActionOutcome`].
pub type HandlerResult = Result<Toast, Denial>;

impl From<HandlerResult> for ActionOutcome {
    fn from(result: HandlerResult) -> Self {
        match result {
            Ok(toast) => Self::accepted(toast),
            Err(Denial(text)) => Self::denied(text),
        }
    }
}

// ---------------------------------------------------------------------------
// Scalars, policy, counters
// ---------------------------------------------------------------------------

/// World scalars. Tiers and situation are derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldScalars {
    /// Grain units in the city stores.
    pub grain_supply: u32,
    /// Civic unrest, 0 to 100.
    pub unrest: u8,
    /// Ticks of market restriction remaining.
    pub restricted_markets_ticks: u32,
    /// Ticks of ward network protection remaining.
    pub ward_network_ticks: u32,
    /// Consecutive ticks spent at critical grain.
    pub critical_tick_streak: u32,
}

impl WorldScalars {
    /// Grain tier of the current supply.
    pub const fn grain_tier(&self) -> GrainTier {
        grain_tier(self.grain_supply)
    }

    /// Unrest tier of the current unrest.
    pub const fn unrest_tier(&self) -> UnrestTier {
        unrest_tier(self.unrest)
    }

    /// The city's overall situation.
    pub const fn situation(&self) -> Situation {
        derive_situation(self.grain_tier(), self.unrest_tier())
    }

    /// Whether markets are currently restricted.
    pub const fn markets_restricted(&self) -> bool {
        self.restricted_markets_ticks > 0
    }

    /// Add unrest, saturating at 100.
    pub fn raise_unrest(&mut self, amount: u8) {
        self.unrest = self
            .unrest
            .saturating_add(amount)
            .min(granary_types::tiers::UNREST_MAX);
    }

    /// Remove unrest, saturating at 0.
    pub const fn lower_unrest(&mut self, amount: u8) {
        self.unrest = self.unrest.saturating_sub(amount);
    }

    /// Add grain to the city stores.
    pub const fn add_grain(&mut self, units: u32) {
        self.grain_supply = self.grain_supply.saturating_add(units);
    }

    /// Remove grain from the city stores, saturating at 0.
    pub const fn remove_grain(&mut self, units: u32) {
        self.grain_supply = self.grain_supply.saturating_sub(units);
    }
}

/// City policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Market tax, 0 to 50 percent.
    pub tax_rate_pct: u8,
    /// Whether emergency work requires a permit.
    pub permit_required: bool,
    /// Ticks of smuggling embargo remaining.
    pub embargo_ticks: u32,
}

impl Policy {
    /// Whether smuggling is currently embargoed.
    pub const fn embargo_active(&self) -> bool {
        self.embargo_ticks > 0
    }
}

/// Next-id counters for every sequentially identified collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Next contract id.
    pub next_contract_id: u64,
    /// Next permit id.
    pub next_permit_id: u64,
    /// Next loan id.
    pub next_loan_id: u64,
    /// Next obligation id.
    pub next_obligation_id: u64,
    /// Next rumor id.
    pub next_rumor_id: u64,
    /// Next evidence id.
    pub next_evidence_id: u64,
    /// Next scry report id.
    pub next_scry_id: u64,
    /// Next intercept id.
    pub next_intercept_id: u64,
    /// Next relic id.
    pub next_relic_id: u64,
    /// Next project id.
    pub next_project_id: u64,
    /// Next event id.
    pub next_event_id: u64,
    /// Next chat message id.
    pub next_chat_id: u64,
    /// Next diplomatic message id.
    pub next_diplomatic_id: u64,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            next_contract_id: 1,
            next_permit_id: 1,
            next_loan_id: 1,
            next_obligation_id: 1,
            next_rumor_id: 1,
            next_evidence_id: 1,
            next_scry_id: 1,
            next_intercept_id: 1,
            next_relic_id: 1,
            next_project_id: 1,
            next_event_id: 1,
            next_chat_id: 1,
            next_diplomatic_id: 1,
        }
    }
}

/// Hand out the counter's current value and advance it.
pub(crate) const fn bump(counter: &mut u64) -> u64 {
    let id = *counter;
    *counter = counter.saturating_add(1);
    id
}

/// Uses of a capped daily action on one world day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBudget {
    /// World day the count applies to.
    pub day: u32,
    /// Uses so far on that day.
    pub used: u32,
}

// ---------------------------------------------------------------------------
// The aggregate
// ---------------------------------------------------------------------------

/// The whole mutable world.
#[derive(Debug, Clone)]
pub struct GameState {
    /// Static configuration the world was built from.
    pub config: GameConfig,
    /// World time.
    pub clock: WorldClock,
    /// Grain, unrest, and timed world effects.
    pub world: WorldScalars,
    /// City policy.
    pub policy: Policy,
    /// Next-id counters.
    pub counters: Counters,
    /// The active crisis, if any.
    pub crisis: Option<Crisis>,
    /// Players by id.
    pub players: BTreeMap<PlayerId, Player>,
    /// Contracts by id, including terminal ones until restart or cleanup.
    pub contracts: BTreeMap<ContractId, Contract>,
    /// Seats by kind.
    pub seats: BTreeMap<SeatKind, Seat>,
    /// Permits by id.
    pub permits: BTreeMap<PermitId, Permit>,
    /// Loans by id.
    pub loans: BTreeMap<LoanId, Loan>,
    /// Obligations by id.
    pub obligations: BTreeMap<ObligationId, Obligation>,
    /// Circulating rumors.
    pub rumors: BTreeMap<RumorId, Rumor>,
    /// Evidence dossiers.
    pub evidence: BTreeMap<EvidenceId, Evidence>,
    /// Scry reports.
    pub scry_reports: BTreeMap<ScryReportId, ScryReport>,
    /// Intercepted letters.
    pub intercepts: BTreeMap<InterceptId, Intercept>,
    /// Relics in players' hands.
    pub relics: BTreeMap<RelicId, Relic>,
    /// Civic projects under construction.
    pub projects: BTreeMap<ProjectId, Project>,
    /// Event log, oldest first.
    pub events: Vec<Event>,
    /// Public chat, oldest first.
    pub chat: Vec<ChatMessage>,
    /// Diplomatic letters, oldest first.
    pub diplomatic: Vec<DiplomaticMessage>,
    /// Instant each player's throttled action becomes available again.
    pub cooldowns: BTreeMap<(PlayerId, CooldownKind), DateTime<Utc>>,
    /// Per-player daily budget usage.
    pub budgets: BTreeMap<(PlayerId, BudgetKind), DailyBudget>,
    /// Messages for players raised outside their own actions. Not persisted.
    pub pending_toasts: BTreeMap<PlayerId, Vec<Toast>>,
    /// Seed the generator was created from.
    pub seed: u64,
    /// The world's one random generator.
    pub rng: StdRng,
}

impl GameState {
    /// Build a fresh world from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Clock`] if the tick length is invalid.
    pub fn new(config: GameConfig, epoch: DateTime<Utc>) -> Result<Self, CoreError> {
        let clock = WorldClock::new(epoch, config.world.tick_seconds)?;
        let seed = config.world.seed;
        let seats = SeatKind::ALL
            .iter()
            .map(|&kind| (kind, Seat::vacant(kind, config.institutions.tenure_ticks)))
            .collect();
        Ok(Self {
            clock,
            world: WorldScalars {
                grain_supply: config.world.initial_grain,
                unrest: config.world.initial_unrest,
                restricted_markets_ticks: 0,
                ward_network_ticks: 0,
                critical_tick_streak: 0,
            },
            policy: Policy {
                tax_rate_pct: config.policy.initial_tax_pct,
                permit_required: config.policy.permit_required,
                embargo_ticks: 0,
            },
            counters: Counters::default(),
            crisis: None,
            players: BTreeMap::new(),
            contracts: BTreeMap::new(),
            seats,
            permits: BTreeMap::new(),
            loans: BTreeMap::new(),
            obligations: BTreeMap::new(),
            rumors: BTreeMap::new(),
            evidence: BTreeMap::new(),
            scry_reports: BTreeMap::new(),
            intercepts: BTreeMap::new(),
            relics: BTreeMap::new(),
            projects: BTreeMap::new(),
            events: Vec::new(),
            chat: Vec::new(),
            diplomatic: Vec::new(),
            cooldowns: BTreeMap::new(),
            budgets: BTreeMap::new(),
            pending_toasts: BTreeMap::new(),
            seed,
            rng: StdRng::seed_from_u64(seed),
            config,
        })
    }

    /// Current absolute tick.
    pub const fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Current world day.
    pub fn day(&self) -> u32 {
        self.clock.day()
    }

    /// Append an entry to the event log.
    pub fn log_event(
        &mut self,
        kind: EventKind,
        text: impl Into<String>,
        player: Option<PlayerId>,
        now: DateTime<Utc>,
    ) {
        let id = EventId(bump(&mut self.counters.next_event_id));
        let event = Event {
            id,
            tick: self.tick(),
            day: self.day(),
            kind,
            text: text.into(),
            player,
            created_at: now,
        };
        tracing::debug!(event_id = %id, kind = ?kind, text = %event.text, "Event logged");
        self.events.push(event);
    }

    /// Queue a message for a player, shown with their next action.
    pub fn notify(&mut self, player: PlayerId, toast: Toast) {
        self.pending_toasts.entry(player).or_default().push(toast);
    }

    /// Take every queued message for a player.
    pub fn drain_toasts(&mut self, player: PlayerId) -> Vec<Toast> {
        self.pending_toasts.remove(&player).unwrap_or_default()
    }

    /// Look up a live (not deleted) player.
    pub fn live_player(&self, id: PlayerId) -> Result<&Player, Denial> {
        self.players
            .get(&id)
            .filter(|p| !p.is_deleted())
            .ok_or_else(Denial::unavailable)
    }

    /// Look up a live (not deleted) player mutably.
    pub fn live_player_mut(&mut self, id: PlayerId) -> Result<&mut Player, Denial> {
        self.players
            .get_mut(&id)
            .filter(|p| !p.is_deleted())
            .ok_or_else(Denial::unavailable)
    }

    /// Whether `player` holds any seat.
    pub fn holds_any_seat(&self, player: PlayerId) -> bool {
        self.seats.values().any(|seat| seat.is_held_by(player))
    }

    /// Whether `player` holds the given seat.
    pub fn holds_seat(&self, player: PlayerId, kind: SeatKind) -> bool {
        self.seats
            .get(&kind)
            .is_some_and(|seat| seat.is_held_by(player))
    }

    /// Whether `player` holds an unexpired permit.
    pub fn has_permit(&self, player: PlayerId) -> bool {
        self.permits
            .values()
            .any(|permit| permit.holder.id == player && permit.ticks_left > 0)
    }

    /// The Accepted contract `player` currently holds, if any.
    pub fn accepted_contract_of(&self, player: PlayerId) -> Option<ContractId> {
        self.contracts
            .values()
            .find(|c| c.status == ContractStatus::Accepted && c.is_owned_by(player))
            .map(|c| c.id)
    }

    /// Check a cooldown; when it has elapsed, start it again.
    pub fn take_cooldown(
        &mut self,
        player: PlayerId,
        kind: CooldownKind,
        now: DateTime<Utc>,
    ) -> Result<(), Denial> {
        if let Some(ready_at) = self.cooldowns.get(&(player, kind)) {
            if now < *ready_at {
                let wait = ready_at.signed_duration_since(now).num_seconds().max(1);
                return Err(Denial::new(format!(
                    "You must wait {wait} more seconds before doing that again."
                )));
            }
        }
        let secs = cooldown_secs(&self.config, kind);
        let ready_at = Duration::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX))
            .and_then(|wait| now.checked_add_signed(wait))
            .unwrap_or(now);
        self.cooldowns.insert((player, kind), ready_at);
        Ok(())
    }

    /// Remaining uses of a daily budget today.
    pub fn budget_remaining(&self, player: PlayerId, kind: BudgetKind) -> u32 {
        let cap = budget_cap(&self.config, kind);
        let today = self.day();
        let used = self
            .budgets
            .get(&(player, kind))
            .filter(|b| b.day == today)
            .map_or(0, |b| b.used);
        cap.saturating_sub(used)
    }

    /// Spend one use of a daily budget.
    pub fn consume_budget(&mut self, player: PlayerId, kind: BudgetKind) -> Result<(), Denial> {
        if self.budget_remaining(player, kind) == 0 {
            return Err(Denial::new("You have used today's allowance for that."));
        }
        let today = self.day();
        let entry = self
            .budgets
            .entry((player, kind))
            .or_insert(DailyBudget { day: today, used: 0 });
        if entry.day != today {
            *entry = DailyBudget { day: today, used: 0 };
        }
        entry.used = entry.used.saturating_add(1);
        Ok(())
    }

    /// Reseed the generator for deterministic replay from the current tick.
    pub fn reseed(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed ^ self.tick());
    }
}

const fn cooldown_secs(config: &GameConfig, kind: CooldownKind) -> u64 {
    let c = &config.cooldowns;
    match kind {
        CooldownKind::GatherRumor => c.gather_rumor_secs,
        CooldownKind::Investigate => c.investigate_secs,
        CooldownKind::Scry => c.scry_secs,
        CooldownKind::Intercept => c.intercept_secs,
        CooldownKind::SearchRelic => c.search_relic_secs,
        CooldownKind::Chat => c.chat_secs,
    }
}

const fn budget_cap(config: &GameConfig, kind: BudgetKind) -> u32 {
    match kind {
        BudgetKind::PublishEvidence => config.intel.publish_daily_budget,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Builders shared by the handler and tick tests.
    #![allow(clippy::panic)]

    use super::*;

    /// A fixed wall-clock instant for deterministic tests.
    pub fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    /// A fresh world with default configuration.
    pub fn state() -> GameState {
        state_with(GameConfig::default())
    }

    /// A fresh world with the given configuration.
    pub fn state_with(config: GameConfig) -> GameState {
        match GameState::new(config, now()) {
            Ok(state) => state,
            Err(e) => panic!("test state: {e}"),
        }
    }

    /// Add a player with the given gold and return their id.
    pub fn add_player(state: &mut GameState, name: &str, gold: u64) -> PlayerId {
        let id = PlayerId::new();
        state.players.insert(id, Player::new(id, name, gold, now()));
        id
    }

    /// Borrow a player that must exist.
    pub fn player(state: &GameState, id: PlayerId) -> &Player {
        match state.players.get(&id) {
            Some(p) => p,
            None => panic!("missing player {id}"),
        }
    }

    /// Mutably borrow a player that must exist.
    pub fn player_mut(state: &mut GameState, id: PlayerId) -> &mut Player {
        match state.players.get_mut(&id) {
            Some(p) => p,
            None => panic!("missing player {id}"),
        }
    }
}
