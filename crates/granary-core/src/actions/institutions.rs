//! Seats, policy, permits, and bribes.
//!
//! Each seat runs a term of `tenure_ticks`. When the term ends the seat is
//! vacated and an election window opens; when the window closes the most
//! reputable active player who holds no other seat takes office. Ties go
//! to the lowest [`PlayerId`].

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use granary_types::{District, EventKind, Permit, PermitId, PlayerId, SeatKind};

use crate::config::MAX_TAX_PCT;
use crate::expiring::sweep_with;
use crate::state::{Denial, GameState, HandlerResult, Toast, bump};

/// Heat a bribe draws.
const BRIBE_HEAT: i32 = 2;

fn require_seat(state: &GameState, actor: PlayerId, kind: SeatKind) -> Result<(), Denial> {
    state.live_player(actor)?;
    if state.holds_seat(actor, kind) {
        Ok(())
    } else {
        Err(Denial::new(format!(
            "Only the {} may do that.",
            seat_title(kind).to_lowercase()
        )))
    }
}

/// Human-readable title of a seat.
pub const fn seat_title(kind: SeatKind) -> &'static str {
    match kind {
        SeatKind::HarborMaster => "Harbor Master",
        SeatKind::GrainWarden => "Grain Warden",
        SeatKind::Magistrate => "Magistrate",
    }
}

// ---------------------------------------------------------------------------
// Magistrate
// ---------------------------------------------------------------------------

/// Set the market tax rate.
pub fn set_tax_rate(
    state: &mut GameState,
    actor: PlayerId,
    pct: u8,
    now: DateTime<Utc>,
) -> HandlerResult {
    require_seat(state, actor, SeatKind::Magistrate)?;
    if pct > MAX_TAX_PCT {
        return Err(Denial::new(format!("Tax cannot exceed {MAX_TAX_PCT}%.")));
    }
    let previous = state.policy.tax_rate_pct;
    state.policy.tax_rate_pct = pct;
    info!(previous, pct, "Tax rate changed");
    state.log_event(
        EventKind::Policy,
        format!("The Magistrate sets the market tax at {pct}%."),
        Some(actor),
        now,
    );
    Ok(Toast::success(format!("Tax set to {pct}%.")))
}

/// Require or waive permits for emergency work.
pub fn set_permit_required(
    state: &mut GameState,
    actor: PlayerId,
    required: bool,
    now: DateTime<Utc>,
) -> HandlerResult {
    require_seat(state, actor, SeatKind::Magistrate)?;
    state.policy.permit_required = required;
    let text = if required {
        "Emergency work now requires a permit."
    } else {
        "Permits are no longer required for emergency work."
    };
    state.log_event(EventKind::Policy, text, Some(actor), now);
    Ok(Toast::success(text))
}

fn grant_permit(state: &mut GameState, holder: PlayerId) -> Result<PermitId, Denial> {
    let holder = state.live_player(holder)?.to_ref();
    let id = PermitId(bump(&mut state.counters.next_permit_id));
    state.permits.insert(
        id,
        Permit {
            id,
            holder,
            ticks_left: state.config.institutions.permit_ticks,
        },
    );
    Ok(id)
}

/// Issue a permit to a player free of charge.
pub fn issue_permit(
    state: &mut GameState,
    actor: PlayerId,
    holder: PlayerId,
    _now: DateTime<Utc>,
) -> HandlerResult {
    require_seat(state, actor, SeatKind::Magistrate)?;
    let id = grant_permit(state, holder)?;
    let name = state.live_player(holder)?.name.clone();
    if holder != actor {
        state.notify(holder, Toast::info("The Magistrate grants you a work permit."));
    }
    debug!(permit_id = %id, holder = %holder, "Permit issued");
    Ok(Toast::success(format!("Permit #{id} issued to {name}.")))
}

/// Buy a permit at the palace.
pub fn buy_permit(state: &mut GameState, actor: PlayerId, _now: DateTime<Utc>) -> HandlerResult {
    let price = state.config.institutions.permit_price;
    let player = state.live_player_mut(actor)?;
    if player.travel.is_some() || player.location != District::Palace {
        return Err(Denial::new("Permits are sold at the palace."));
    }
    if player.gold < price {
        return Err(Denial::new(format!("A permit costs {price} gold.")));
    }
    player.gold = player.gold.saturating_sub(price);
    let id = grant_permit(state, actor)?;
    debug!(permit_id = %id, player = %actor, price, "Permit bought");
    Ok(Toast::success(format!("You buy permit #{id} for {price} gold.")))
}

// ---------------------------------------------------------------------------
// Grain Warden and Harbor Master
// ---------------------------------------------------------------------------

/// Restrict the markets for the configured number of ticks.
pub fn restrict_markets(state: &mut GameState, actor: PlayerId, now: DateTime<Utc>) -> HandlerResult {
    require_seat(state, actor, SeatKind::GrainWarden)?;
    let ticks = state.config.institutions.restriction_ticks;
    state.world.restricted_markets_ticks = state.world.restricted_markets_ticks.max(ticks);
    state.log_event(
        EventKind::Policy,
        "The Grain Warden restricts the markets.",
        Some(actor),
        now,
    );
    Ok(Toast::success(format!("Markets restricted for {ticks} ticks.")))
}

/// Close the harbor to smugglers.
pub fn declare_embargo(state: &mut GameState, actor: PlayerId, now: DateTime<Utc>) -> HandlerResult {
    require_seat(state, actor, SeatKind::HarborMaster)?;
    let ticks = state.config.institutions.embargo_ticks;
    state.policy.embargo_ticks = state.policy.embargo_ticks.max(ticks);
    info!(ticks, "Embargo declared");
    state.log_event(
        EventKind::Policy,
        "The Harbor Master declares an embargo.",
        Some(actor),
        now,
    );
    Ok(Toast::success(format!("Embargo declared for {ticks} ticks.")))
}

/// Reopen the harbor.
pub fn lift_embargo(state: &mut GameState, actor: PlayerId, now: DateTime<Utc>) -> HandlerResult {
    require_seat(state, actor, SeatKind::HarborMaster)?;
    if !state.policy.embargo_active() {
        return Err(Denial::new("There is no embargo to lift."));
    }
    state.policy.embargo_ticks = 0;
    info!("Embargo lifted");
    state.log_event(
        EventKind::Policy,
        "The Harbor Master lifts the embargo.",
        Some(actor),
        now,
    );
    Ok(Toast::success("Embargo lifted."))
}

// ---------------------------------------------------------------------------
// Bribes
// ---------------------------------------------------------------------------

/// Pay for temporary access past permit and embargo gates.
pub fn bribe(state: &mut GameState, actor: PlayerId, _now: DateTime<Utc>) -> HandlerResult {
    let cost = state.config.institutions.bribe_cost;
    let until = state
        .tick()
        .saturating_add(state.config.institutions.bribe_ticks);
    let player = state.live_player_mut(actor)?;
    if player.gold < cost {
        return Err(Denial::new(format!("The clerks want {cost} gold.")));
    }
    player.gold = player.gold.saturating_sub(cost);
    player.bribed_until_tick = Some(until);
    player.adjust_heat(BRIBE_HEAT);
    debug!(player = %actor, until, "Bribe paid");
    Ok(Toast::success("Coins change hands. Doors open for you, for now."))
}

// ---------------------------------------------------------------------------
// Seats
// ---------------------------------------------------------------------------

/// Put `player` in a seat with a fresh term, vacating any other seat
/// they hold.
pub fn install(
    state: &mut GameState,
    kind: SeatKind,
    player: PlayerId,
    now: DateTime<Utc>,
) -> HandlerResult {
    let holder = state.live_player(player)?.to_ref();
    let tenure = state.config.institutions.tenure_ticks;
    for seat in state.seats.values_mut() {
        if seat.kind != kind && seat.is_held_by(player) {
            seat.holder = None;
        }
    }
    let name = holder.name.clone();
    let seat = state.seats.entry(kind).or_insert_with(|| granary_types::Seat::vacant(kind, tenure));
    seat.holder = Some(holder);
    seat.tenure_ticks_left = tenure;
    seat.election_window_ticks = 0;
    info!(seat = ?kind, player = %player, "Seat filled");
    state.log_event(
        EventKind::Election,
        format!("{name} takes office as {}.", seat_title(kind)),
        Some(player),
        now,
    );
    state.notify(
        player,
        Toast::success(format!("You are now {}.", seat_title(kind))),
    );
    Ok(Toast::success(format!("{name} is now {}.", seat_title(kind))))
}

/// Most reputable eligible candidate; ties go to the lowest id.
fn front_runner(state: &GameState, now: DateTime<Utc>) -> Option<PlayerId> {
    let cutoff = i64::try_from(state.config.institutions.active_window_hours)
        .ok()
        .and_then(Duration::try_hours)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    state
        .players
        .values()
        .filter(|p| !p.is_deleted() && p.last_seen_at >= cutoff)
        .filter(|p| !state.holds_any_seat(p.id))
        .max_by(|a, b| a.rep.cmp(&b.rep).then_with(|| b.id.cmp(&a.id)))
        .map(|p| p.id)
}

fn close_election(state: &mut GameState, kind: SeatKind, now: DateTime<Utc>) {
    if let Some(winner) = front_runner(state, now) {
        let _ = install(state, kind, winner, now);
        return;
    }
    let tenure = state.config.institutions.tenure_ticks;
    if let Some(seat) = state.seats.get_mut(&kind) {
        seat.holder = None;
        seat.tenure_ticks_left = tenure;
        seat.election_window_ticks = 0;
    }
    info!(seat = ?kind, "Election closed without a candidate");
    state.log_event(
        EventKind::Election,
        format!("No one stands for {}. The seat stays empty.", seat_title(kind)),
        None,
        now,
    );
}

fn open_election(state: &mut GameState, kind: SeatKind, now: DateTime<Utc>) {
    let window = state.config.institutions.election_window_ticks;
    let Some(seat) = state.seats.get_mut(&kind) else {
        return;
    };
    let outgoing = seat.holder.take();
    seat.election_window_ticks = window;
    if let Some(outgoing) = outgoing {
        state.notify(
            outgoing.id,
            Toast::info(format!("Your term as {} has ended.", seat_title(kind))),
        );
    }
    info!(seat = ?kind, window, "Election opened");
    state.log_event(
        EventKind::Election,
        format!("An election opens for {}.", seat_title(kind)),
        None,
        now,
    );
    if window == 0 {
        close_election(state, kind, now);
    }
}

/// Seat pass: run terms down, open elections, and close them.
pub fn tick_seats(state: &mut GameState, now: DateTime<Utc>) {
    for kind in SeatKind::ALL {
        let Some(seat) = state.seats.get_mut(&kind) else {
            continue;
        };
        if seat.election_open() {
            seat.election_window_ticks = seat.election_window_ticks.saturating_sub(1);
            if seat.election_window_ticks == 0 {
                close_election(state, kind, now);
            }
            continue;
        }
        seat.tenure_ticks_left = seat.tenure_ticks_left.saturating_sub(1);
        if seat.tenure_ticks_left == 0 {
            open_election(state, kind, now);
        }
    }
}

/// Permit pass: count permits down and drop the lapsed ones.
pub fn tick_permits(state: &mut GameState, _now: DateTime<Utc>) {
    sweep_with(
        state,
        |s| &mut s.permits,
        |s, permit| {
            debug!(permit_id = %permit.id, holder = %permit.holder.id, "Permit lapsed");
            s.notify(permit.holder.id, Toast::info("Your work permit has lapsed."));
        },
    );
}
