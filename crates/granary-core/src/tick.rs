//! Tick pipeline: the fixed-order pass sequence that drives the world.
//!
//! Each tick runs these passes in order:
//!
//! 1. **Time and drift** -- advance the clock, consume grain, land the
//!    morning harvest, run timed world effects down, and drift unrest by
//!    grain tier.
//! 2. **Contracts** -- deadlines count down and roll outcomes.
//! 3. **Crisis** -- apply pressure from the active crisis or roll for one.
//! 4. **Finance** -- mark past-due debts overdue.
//! 5. **Projects** -- count construction down and complete projects.
//! 6. **Intel** -- decay rumors and expire intel records and relics.
//! 7. **Travel** -- land arriving players.
//! 8. **Institutions** -- run seat terms and elections, expire permits.
//! 9. **Inactivity** -- return contracts held by idle players.
//! 10. **Narrative** -- log tier changes and react to worsening grain.
//!
//! Every stochastic decision draws from the aggregate's one generator, so
//! the sequence is deterministic given the same state and seed.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use granary_types::{
    CrisisKind, EventKind, GrainTier, Subphase, UnrestTier, grain_transition_line,
    unrest_transition_line,
};

use crate::actions::{contracts, crisis, finance, institutions, intel, projects, travel};
use crate::clock::ClockError;
use crate::state::GameState;

/// Consecutive critical ticks after which hunger stokes extra unrest.
const CRITICAL_STREAK_THRESHOLD: u32 = 4;

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// Summary of a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick that was executed.
    pub tick: u64,
    /// World day of that tick.
    pub day: u32,
    /// Half of the day.
    pub subphase: Subphase,
    /// Grain tier after the tick.
    pub grain_tier: GrainTier,
    /// Unrest tier after the tick.
    pub unrest_tier: UnrestTier,
    /// Crisis occupying the slot after the tick.
    pub crisis: Option<CrisisKind>,
    /// Events appended during the tick.
    pub events_logged: usize,
}

/// Execute one complete tick.
pub fn run_tick(state: &mut GameState, now: DateTime<Utc>) -> Result<TickSummary, TickError> {
    let grain_before = state.world.grain_tier();
    let unrest_before = state.world.unrest_tier();
    let events_before = state.events.len();

    // --- Pass 1: time and drift ---
    let tick = state.clock.advance()?;
    world_drift(state);

    // --- Passes 2-9 ---
    contracts::tick_deadlines(state, now);
    crisis::tick_crisis(state, now);
    finance::tick_debts(state, now);
    projects::tick_projects(state, now);
    intel::tick_intel(state, now);
    travel::tick_travel(state, now);
    institutions::tick_seats(state, now);
    institutions::tick_permits(state, now);
    contracts::revert_inactive(state, now);

    // --- Pass 10: narrative ---
    narrate_tier_changes(state, grain_before, unrest_before, now);

    let summary = TickSummary {
        tick,
        day: state.day(),
        subphase: state.clock.subphase(),
        grain_tier: state.world.grain_tier(),
        unrest_tier: state.world.unrest_tier(),
        crisis: state.crisis.as_ref().map(|c| c.kind),
        events_logged: state.events.len().saturating_sub(events_before),
    };
    debug!(
        tick,
        day = summary.day,
        grain = state.world.grain_supply,
        unrest = state.world.unrest,
        crisis = ?summary.crisis,
        "Tick complete"
    );
    Ok(summary)
}

/// Run every tick due at `now`, up to the catch-up cap.
///
/// When more ticks are pending than the cap allows, the surplus is skipped
/// without running its passes so the clock lands back on schedule.
/// Returns the number of ticks actually run.
pub fn advance_to(state: &mut GameState, now: DateTime<Utc>) -> Result<u64, TickError> {
    let pending = state.clock.pending_ticks(now);
    if pending == 0 {
        return Ok(0);
    }
    let cap = u64::from(state.config.world.max_catchup_ticks);
    let to_run = pending.min(cap);
    let skipped = pending.saturating_sub(to_run);
    if skipped > 0 {
        warn!(pending, cap, skipped, "Catch-up capped; skipping ticks");
        state.clock.fast_forward(skipped);
    }
    for _ in 0..to_run {
        run_tick(state, now)?;
    }
    if to_run > 1 {
        info!(ticks = to_run, tick = state.tick(), "Caught up");
    }
    Ok(to_run)
}

fn world_drift(state: &mut GameState) {
    let consumption = state.config.world.consumption_per_tick;
    state.world.remove_grain(consumption);
    if state.clock.subphase() == Subphase::Morning {
        state.world.add_grain(state.config.world.morning_harvest);
    }

    state.policy.embargo_ticks = state.policy.embargo_ticks.saturating_sub(1);
    state.world.restricted_markets_ticks = state.world.restricted_markets_ticks.saturating_sub(1);
    state.world.ward_network_ticks = state.world.ward_network_ticks.saturating_sub(1);

    match state.world.grain_tier() {
        GrainTier::Stable => state.world.lower_unrest(1),
        GrainTier::Tight => {}
        GrainTier::Scarce => state.world.raise_unrest(1),
        GrainTier::Critical => state.world.raise_unrest(2),
    }

    if state.world.grain_tier() == GrainTier::Critical {
        state.world.critical_tick_streak = state.world.critical_tick_streak.saturating_add(1);
        if state.world.critical_tick_streak >= CRITICAL_STREAK_THRESHOLD {
            state.world.raise_unrest(1);
        }
    } else {
        state.world.critical_tick_streak = 0;
    }
}

fn narrate_tier_changes(
    state: &mut GameState,
    grain_before: GrainTier,
    unrest_before: UnrestTier,
    now: DateTime<Utc>,
) {
    let grain_after = state.world.grain_tier();
    let line = grain_transition_line(grain_before, grain_after);
    if !line.is_empty() {
        info!(from = ?grain_before, to = ?grain_after, "Grain tier changed");
        state.log_event(EventKind::TierChange, line, None, now);
        let worsened = grain_after < grain_before;
        if worsened && matches!(grain_after, GrainTier::Scarce | GrainTier::Critical) {
            contracts::issue_smuggling(state, now);
        }
    }

    let unrest_after = state.world.unrest_tier();
    let line = unrest_transition_line(unrest_before, unrest_after);
    if !line.is_empty() {
        info!(from = ?unrest_before, to = ?unrest_after, "Unrest tier changed");
        state.log_event(EventKind::TierChange, line, None, now);
    }
}
