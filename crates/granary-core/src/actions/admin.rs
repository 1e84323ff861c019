//! Operator commands.
//!
//! The caller decides who is privileged; this module only honors the
//! boolean it is handed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use granary_types::{CrisisKind, EventKind, PlayerId, SeatKind};

use crate::actions::{crisis, institutions};
use crate::state::{ActionOutcome, GameState, Toast};
use crate::tick::run_tick;

/// A privileged command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminCommand {
    /// Run one tick immediately.
    ForceTick,
    /// Put a crisis in the slot.
    StartCrisis(CrisisKind),
    /// Set the grain supply.
    SetGrain(u32),
    /// Put a player in a seat.
    GrantSeat {
        /// Seat to fill.
        seat: SeatKind,
        /// Player to install.
        player: PlayerId,
    },
}

/// Run an operator command, refusing unprivileged callers.
pub fn run_admin(
    state: &mut GameState,
    is_privileged: bool,
    command: AdminCommand,
    now: DateTime<Utc>,
) -> ActionOutcome {
    if !is_privileged {
        warn!(?command, "Unprivileged admin command refused");
        return ActionOutcome::denied("You are not permitted to do that.");
    }
    info!(?command, "Admin command");
    match command {
        AdminCommand::ForceTick => match run_tick(state, now) {
            Ok(summary) => ActionOutcome::accepted(Toast::success(format!(
                "Tick {} forced. Now day {}.",
                summary.tick, summary.day
            ))),
            Err(err) => {
                warn!(%err, "Forced tick failed");
                ActionOutcome::denied(format!("The tick could not run: {err}"))
            }
        },
        AdminCommand::StartCrisis(kind) => {
            if crisis::start_crisis(state, kind, now) {
                ActionOutcome::accepted(Toast::success(format!("{kind:?} started.")))
            } else {
                ActionOutcome::denied("A crisis is already underway.")
            }
        }
        AdminCommand::SetGrain(units) => {
            state.world.grain_supply = units;
            state.log_event(
                EventKind::Notice,
                format!("The stores are recounted: {units} units."),
                None,
                now,
            );
            ActionOutcome::accepted(Toast::success(format!("Grain set to {units}.")))
        }
        AdminCommand::GrantSeat { seat, player } => {
            institutions::install(state, seat, player, now).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::*;

    #[test]
    fn unprivileged_callers_are_refused() {
        let mut s = state();
        let before = s.world.grain_supply;
        let outcome = run_admin(&mut s, false, AdminCommand::SetGrain(0), now());
        assert!(!outcome.accepted);
        assert_eq!(s.world.grain_supply, before);
    }

    #[test]
    fn force_tick_advances_the_clock() {
        let mut s = state();
        let outcome = run_admin(&mut s, true, AdminCommand::ForceTick, now());
        assert!(outcome.accepted);
        assert_eq!(s.tick(), 1);
    }

    #[test]
    fn second_crisis_is_refused() {
        let mut s = state();
        let cmd = AdminCommand::StartCrisis(CrisisKind::Plague);
        assert!(run_admin(&mut s, true, cmd.clone(), now()).accepted);
        assert!(!run_admin(&mut s, true, cmd, now()).accepted);
    }

    #[test]
    fn grant_seat_installs_holder() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 0);
        let cmd = AdminCommand::GrantSeat {
            seat: SeatKind::HarborMaster,
            player: p,
        };
        assert!(run_admin(&mut s, true, cmd, now()).accepted);
        assert!(s.holds_seat(p, SeatKind::HarborMaster));
    }
}
