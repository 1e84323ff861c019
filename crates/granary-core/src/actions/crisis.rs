//! The crisis engine.
//!
//! The world has one crisis slot. While it is empty, every tick walks the
//! crisis catalog in [`CrisisKind::ALL`] order and rolls each definition
//! whose trigger holds; the first hit occupies the slot. While occupied,
//! the crisis drains grain and stokes unrest until a player answers it or
//! its countdown runs out.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info};

use granary_types::{Crisis, CrisisKind, EventKind, PlayerId};

use crate::actions::contracts;
use crate::catalog::crisis_def;
use crate::state::{Denial, GameState, HandlerResult, Toast};

/// Grain lost per tick per point of severity.
const GRAIN_DRAIN_PER_SEVERITY: u32 = 4;

/// Unrest added when a crisis runs its course, per point of severity.
const FAILED_UNREST_PER_SEVERITY: u8 = 5;

/// Grain lost when a crisis runs its course, per point of severity.
const FAILED_GRAIN_PER_SEVERITY: u32 = 10;

/// Unrest relieved when a crisis is answered.
const MITIGATED_CALM: u8 = 2;

/// Put a crisis in the slot. A no-op returning `false` if one is active.
pub fn start_crisis(state: &mut GameState, kind: CrisisKind, now: DateTime<Utc>) -> bool {
    if state.crisis.is_some() {
        debug!(?kind, "Crisis slot occupied; start ignored");
        return false;
    }
    let def = crisis_def(kind);
    state.crisis = Some(Crisis {
        kind,
        severity: def.severity,
        ticks_left: def.duration_ticks,
        total_ticks: def.duration_ticks,
        started_at_tick: state.tick(),
    });
    info!(?kind, severity = def.severity, tick = state.tick(), "Crisis started");
    state.log_event(
        EventKind::Crisis,
        format!("{} strikes the city.", def.name),
        None,
        now,
    );
    contracts::issue_emergency(state, now);
    true
}

/// Pay to answer the active crisis, clearing the slot.
pub fn respond_to_crisis(state: &mut GameState, actor: PlayerId, now: DateTime<Utc>) -> HandlerResult {
    let crisis = state
        .crisis
        .as_ref()
        .ok_or_else(|| Denial::new("There is no crisis to answer."))?;
    let def = crisis_def(crisis.kind);

    let player = state.live_player_mut(actor)?;
    if player.gold < def.response_gold {
        return Err(Denial::new(format!(
            "Answering the {} takes {} gold.",
            def.name.to_lowercase(),
            def.response_gold
        )));
    }
    if player.grain < def.response_sacks {
        return Err(Denial::new(format!(
            "Answering the {} takes {} sacks of grain.",
            def.name.to_lowercase(),
            def.response_sacks
        )));
    }
    player.gold = player.gold.saturating_sub(def.response_gold);
    player.grain = player.grain.saturating_sub(def.response_sacks);
    player.adjust_rep(def.response_rep);
    let name = player.name.clone();

    state.crisis = None;
    state.world.lower_unrest(MITIGATED_CALM);
    info!(kind = ?def.kind, player = %actor, "Crisis mitigated");
    state.log_event(
        EventKind::Crisis,
        format!("{name} answers the {}. The city breathes again.", def.name.to_lowercase()),
        Some(actor),
        now,
    );
    Ok(Toast::success(format!(
        "You answer the {}. Your standing rises.",
        def.name.to_lowercase()
    )))
}

/// Resolve the active crisis as failed.
///
/// Raises unrest and drains grain in proportion to severity.
pub fn fail_crisis(state: &mut GameState, now: DateTime<Utc>) {
    let Some(crisis) = state.crisis.take() else {
        return;
    };
    let def = crisis_def(crisis.kind);
    let severity = crisis.severity;
    state
        .world
        .raise_unrest(FAILED_UNREST_PER_SEVERITY.saturating_mul(severity));
    state
        .world
        .remove_grain(FAILED_GRAIN_PER_SEVERITY.saturating_mul(u32::from(severity)));
    info!(kind = ?crisis.kind, severity, "Crisis ran its course");
    state.log_event(
        EventKind::Crisis,
        format!("The {} runs its course unanswered.", def.name.to_lowercase()),
        None,
        now,
    );
}

/// Crisis pass: apply pressure from an active crisis, or roll for a new one.
pub fn tick_crisis(state: &mut GameState, now: DateTime<Utc>) {
    if let Some(crisis) = state.crisis.as_mut() {
        let severity = crisis.severity;
        crisis.ticks_left = crisis.ticks_left.saturating_sub(1);
        let expired = crisis.ticks_left == 0;
        state
            .world
            .remove_grain(GRAIN_DRAIN_PER_SEVERITY.saturating_mul(u32::from(severity)));
        state.world.raise_unrest(severity);
        if expired {
            fail_crisis(state, now);
        }
        return;
    }

    let grain = state.world.grain_tier();
    let unrest = state.world.unrest_tier();
    for kind in CrisisKind::ALL {
        let def = crisis_def(kind);
        if !def.triggers(grain, unrest) {
            continue;
        }
        let roll: u32 = state.rng.random_range(0..100);
        if roll < def.chance_pct {
            start_crisis(state, kind, now);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use granary_types::{ContractStatus, ContractType};

    use super::*;
    use crate::state::test_support::*;

    #[test]
    fn starting_a_crisis_issues_emergency_work() {
        let mut s = state();
        assert!(start_crisis(&mut s, CrisisKind::Blight, now()));
        assert_eq!(s.crisis.as_ref().map(|c| c.kind), Some(CrisisKind::Blight));
        let emergencies = s
            .contracts
            .values()
            .filter(|c| c.kind() == ContractType::Emergency && c.status == ContractStatus::Issued)
            .count();
        assert_eq!(emergencies, 1);
    }

    #[test]
    fn starting_while_active_is_a_no_op() {
        let mut s = state();
        assert!(start_crisis(&mut s, CrisisKind::Blight, now()));
        let before = s.clone();
        assert!(!start_crisis(&mut s, CrisisKind::Plague, now()));
        assert_eq!(s.crisis, before.crisis);
        assert_eq!(s.contracts.len(), before.contracts.len());
        assert_eq!(s.events.len(), before.events.len());
    }

    #[test]
    fn failed_resolution_raises_unrest_and_drains_grain() {
        let mut s = state();
        assert!(start_crisis(&mut s, CrisisKind::BreadRiot, now()));
        let unrest = s.world.unrest;
        let grain = s.world.grain_supply;
        fail_crisis(&mut s, now());
        assert!(s.crisis.is_none());
        assert!(s.world.unrest > unrest);
        assert!(s.world.grain_supply < grain);
    }

    #[test]
    fn active_crisis_runs_out_and_fails() {
        let mut s = state();
        assert!(start_crisis(&mut s, CrisisKind::HarborFire, now()));
        let duration = crisis_def(CrisisKind::HarborFire).duration_ticks;
        for _ in 0..duration {
            tick_crisis(&mut s, now());
        }
        assert!(s.crisis.is_none());
        assert!(s.events.iter().any(|e| e.text.contains("unanswered")));
    }

    #[test]
    fn response_clears_slot_and_rewards_responder() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 100);
        assert!(start_crisis(&mut s, CrisisKind::Blight, now()));
        s.world.unrest = 20;
        assert!(respond_to_crisis(&mut s, p, now()).is_ok());
        assert!(s.crisis.is_none());
        assert_eq!(s.world.unrest, 18);
        assert_eq!(player(&s, p).gold, 60);
        assert_eq!(player(&s, p).rep, crisis_def(CrisisKind::Blight).response_rep);
    }

    #[test]
    fn response_without_means_is_refused() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 100);
        assert!(start_crisis(&mut s, CrisisKind::BreadRiot, now()));
        assert!(respond_to_crisis(&mut s, p, now()).is_err());
        assert!(s.crisis.is_some());
        assert_eq!(player(&s, p).gold, 100);
    }

    #[test]
    fn no_crisis_to_answer() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 100);
        assert!(respond_to_crisis(&mut s, p, now()).is_err());
    }

    #[test]
    fn empty_slot_eventually_fills_under_pressure() {
        let mut s = state();
        s.world.grain_supply = 10;
        s.world.unrest = 80;
        for _ in 0..200 {
            tick_crisis(&mut s, now());
            if s.crisis.is_some() {
                break;
            }
        }
        assert!(s.crisis.is_some());
    }
}
