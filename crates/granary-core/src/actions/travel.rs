//! Walking between districts.

use chrono::{DateTime, Utc};
use tracing::debug;

use granary_types::{District, PlayerId, Travel};

use crate::state::{Denial, GameState, HandlerResult, Toast};

/// Set out for another district.
pub fn travel(
    state: &mut GameState,
    actor: PlayerId,
    to: District,
    _now: DateTime<Utc>,
) -> HandlerResult {
    let player = state.live_player_mut(actor)?;
    if player.travel.is_some() {
        return Err(Denial::new("You are already on the road."));
    }
    if player.location == to {
        return Err(Denial::new(format!("You are already in the {to:?}.")));
    }
    let ticks = District::travel_ticks(player.location, to);
    player.travel = Some(Travel {
        to,
        ticks_left: ticks,
    });
    debug!(player = %actor, ?to, ticks, "Travel started");
    Ok(Toast::success(format!("You set out for the {to:?}.")))
}

/// Travel pass: move walkers along and land the ones who arrive.
pub fn tick_travel(state: &mut GameState, _now: DateTime<Utc>) {
    let mut arrivals = Vec::new();
    for player in state.players.values_mut() {
        let Some(trip) = player.travel.as_mut() else {
            continue;
        };
        trip.ticks_left = trip.ticks_left.saturating_sub(1);
        if trip.ticks_left == 0 {
            let to = trip.to;
            player.location = to;
            player.travel = None;
            arrivals.push((player.id, to));
        }
    }
    for (id, to) in arrivals {
        state.notify(id, Toast::info(format!("You arrive at the {to:?}.")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::*;

    #[test]
    fn walk_to_the_docks_takes_two_ticks() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 0);
        assert!(travel(&mut s, p, District::Docks, now()).is_ok());
        tick_travel(&mut s, now());
        assert_eq!(player(&s, p).location, District::Market);
        tick_travel(&mut s, now());
        assert_eq!(player(&s, p).location, District::Docks);
        assert!(player(&s, p).travel.is_none());
        assert_eq!(s.drain_toasts(p).len(), 1);
    }

    #[test]
    fn cannot_start_a_second_trip() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 0);
        assert!(travel(&mut s, p, District::Temple, now()).is_ok());
        assert!(travel(&mut s, p, District::Palace, now()).is_err());
    }

    #[test]
    fn staying_put_is_refused() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 0);
        assert!(travel(&mut s, p, District::Market, now()).is_err());
    }
}
