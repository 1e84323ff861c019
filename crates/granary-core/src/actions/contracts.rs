//! Contract lifecycle: posting, acceptance, delivery, cancellation, and the
//! per-tick deadline and inactivity passes.
//!
//! ```text
//! Issued --accept--> Accepted --deadline roll--> Fulfilled --deliver--> Completed
//!   |                   |    \--deadline roll--> Failed
//!   |                   |--deliver (precondition met)-------------> Completed
//!   |                   |--owner inactive--> Issued
//!   |--deadline--> expired (removed)
//!   \--cancel (issuer)--> Cancelled   (also from Accepted)
//! ```

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{debug, info};

use granary_types::{
    Contract, ContractId, ContractStatus, ContractTerms, ContractType, EventKind, PlayerId,
    SeatKind, Stance, fulfill_chance_for_tier,
};

use crate::state::{Denial, GameState, HandlerResult, SACK_UNITS, Toast, bump};

/// Base gold reward of a city-issued emergency contract.
pub const EMERGENCY_REWARD: u64 = 60;

/// Base gold reward of a smuggling contract.
pub const SMUGGLING_REWARD: u64 = 80;

/// Evidence strength a bounty asks for without a warrant.
pub const BOUNTY_EVIDENCE_REQUIRED: u32 = 4;

/// Heat a bounty target sheds when the bounty is delivered.
const BOUNTY_TARGET_HEAT_DROP: i32 = -4;

/// Reputation a bounty target loses when the bounty is delivered.
const BOUNTY_TARGET_REP_HIT: i32 = -5;

/// Reputation lost when an accepted contract fails.
const FAILURE_REP_PENALTY: i32 = -5;

/// Reputation at or above which rewards carry a bonus.
const REP_BONUS_THRESHOLD: i32 = 50;

/// Flat gold bonus for holding a rumor on delivery.
const RUMOR_BONUS_GOLD: u64 = 10;

// ---------------------------------------------------------------------------
// Reward computation
// ---------------------------------------------------------------------------

/// What a delivery pays out and costs the contractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardQuote {
    /// Gold paid.
    pub gold: u64,
    /// Reputation change.
    pub rep_delta: i32,
    /// Heat change.
    pub heat_delta: i32,
    /// Whether one rumor token is spent for the bonus.
    pub consumes_rumor: bool,
}

/// Reputation and heat a contract type carries before stance adjustments.
const fn type_deltas(kind: ContractType) -> (i32, i32) {
    match kind {
        ContractType::Emergency => (3, 0),
        ContractType::Smuggling => (-1, 3),
        ContractType::Bounty => (2, 1),
        ContractType::Supply => (2, 0),
    }
}

/// Gold a contractor pays to deliver an accepted contract early.
pub const fn delivery_cost(kind: ContractType) -> u64 {
    match kind {
        ContractType::Emergency => 20,
        ContractType::Smuggling => 15,
        ContractType::Bounty | ContractType::Supply => 0,
    }
}

fn percent_of(amount: u64, pct: u64) -> u64 {
    amount.saturating_mul(pct).checked_div(100).unwrap_or(0)
}

/// Compute a delivery's payout.
///
/// Careful is the baseline. Fast pays 25% more and draws 2 more heat;
/// Quiet pays 20% less and sheds 1 heat. Reputation of 50 or more adds
/// 10% on top. Holding at least one rumor adds a flat 10 gold and spends
/// exactly one rumor.
pub fn reward_quote(
    kind: ContractType,
    stance: Stance,
    rep: i32,
    rumors: u32,
    base: u64,
) -> RewardQuote {
    let (rep_delta, type_heat) = type_deltas(kind);
    let (gold_pct, stance_heat) = match stance {
        Stance::Careful => (100, 0),
        Stance::Fast => (125, 2),
        Stance::Quiet => (80, -1),
    };
    let mut gold = percent_of(base, gold_pct);
    if rep >= REP_BONUS_THRESHOLD {
        gold = percent_of(gold, 110);
    }
    let consumes_rumor = rumors > 0;
    if consumes_rumor {
        gold = gold.saturating_add(RUMOR_BONUS_GOLD);
    }
    RewardQuote {
        gold,
        rep_delta,
        heat_delta: type_heat.saturating_add(stance_heat),
        consumes_rumor,
    }
}

// ---------------------------------------------------------------------------
// Issuance
// ---------------------------------------------------------------------------

fn insert_contract(
    state: &mut GameState,
    terms: ContractTerms,
    deadline_ticks: u32,
    issuer: Option<PlayerId>,
    target: Option<PlayerId>,
) -> ContractId {
    let id = ContractId(bump(&mut state.counters.next_contract_id));
    let issuer = issuer.and_then(|p| state.players.get(&p)).map(granary_types::Player::to_ref);
    let target = target.and_then(|p| state.players.get(&p)).map(granary_types::Player::to_ref);
    let contract = Contract {
        id,
        terms,
        status: ContractStatus::Issued,
        deadline_ticks,
        issued_at_tick: state.tick(),
        owner: None,
        issuer,
        target,
        stance: None,
    };
    debug!(contract_id = %id, kind = ?contract.kind(), "Contract issued");
    state.contracts.insert(id, contract);
    id
}

/// Post a city-issued emergency contract.
pub fn issue_emergency(state: &mut GameState, now: DateTime<Utc>) -> ContractId {
    let deadline = state.config.contracts.emergency_deadline_ticks;
    let id = insert_contract(
        state,
        ContractTerms::Emergency {
            reward: EMERGENCY_REWARD,
        },
        deadline,
        None,
        None,
    );
    state.log_event(
        EventKind::Contract,
        "The city posts an emergency relief contract.",
        None,
        now,
    );
    id
}

/// Post a smuggling contract unless one is already open.
pub fn issue_smuggling(state: &mut GameState, now: DateTime<Utc>) -> Option<ContractId> {
    let open = state
        .contracts
        .values()
        .any(|c| c.kind() == ContractType::Smuggling && c.status.is_open());
    if open {
        return None;
    }
    let deadline = state.config.contracts.smuggling_deadline_ticks;
    let id = insert_contract(
        state,
        ContractTerms::Smuggling {
            reward: SMUGGLING_REWARD,
        },
        deadline,
        None,
        None,
    );
    state.log_event(
        EventKind::Contract,
        "Whispers at the docks: someone is paying for a grain run.",
        None,
        now,
    );
    Some(id)
}

/// Post a supply contract, escrowing the reward from the issuer.
pub fn post_supply(
    state: &mut GameState,
    actor: PlayerId,
    sacks: u32,
    reward: u64,
    now: DateTime<Utc>,
) -> HandlerResult {
    if sacks == 0 || reward == 0 {
        return Err(Denial::new("A supply contract needs sacks and a reward."));
    }
    let player = state.live_player_mut(actor)?;
    if player.gold < reward {
        return Err(Denial::new("You cannot cover that reward."));
    }
    player.gold = player.gold.saturating_sub(reward);
    let name = player.name.clone();

    let deadline = state.config.contracts.posted_deadline_ticks;
    let id = insert_contract(
        state,
        ContractTerms::Supply { sacks, reward },
        deadline,
        Some(actor),
        None,
    );
    state.log_event(
        EventKind::Contract,
        format!("{name} posts a request for {sacks} sacks of grain."),
        Some(actor),
        now,
    );
    Ok(Toast::success(format!(
        "Supply contract #{id} posted. {reward} gold held in escrow."
    )))
}

/// Post a bounty on a high-heat player, escrowing the reward.
///
/// A magistrate's bounty carries a warrant, halving the evidence needed.
pub fn post_bounty(
    state: &mut GameState,
    actor: PlayerId,
    target: PlayerId,
    reward: u64,
    now: DateTime<Utc>,
) -> HandlerResult {
    if actor == target {
        return Err(Denial::new("You cannot post a bounty on yourself."));
    }
    if reward == 0 {
        return Err(Denial::new("A bounty needs a reward."));
    }
    let threshold = state.config.contracts.bounty_heat_threshold;
    let target_player = state.live_player(target)?;
    if target_player.heat < threshold {
        return Err(Denial::new(format!(
            "{} is not wanted enough to justify a bounty.",
            target_player.name
        )));
    }
    let target_name = target_player.name.clone();
    let warrant = state.holds_seat(actor, SeatKind::Magistrate);

    let player = state.live_player_mut(actor)?;
    if player.gold < reward {
        return Err(Denial::new("You cannot cover that reward."));
    }
    player.gold = player.gold.saturating_sub(reward);

    let evidence_required = if warrant {
        BOUNTY_EVIDENCE_REQUIRED.checked_div(2).unwrap_or(1)
    } else {
        BOUNTY_EVIDENCE_REQUIRED
    };
    let deadline = state.config.contracts.posted_deadline_ticks;
    let id = insert_contract(
        state,
        ContractTerms::Bounty {
            reward,
            evidence_required,
            warrant,
        },
        deadline,
        Some(actor),
        Some(target),
    );
    let text = if warrant {
        format!("A warrant is issued for {target_name}, with a bounty attached.")
    } else {
        format!("A bounty is posted on {target_name}.")
    };
    state.log_event(EventKind::Contract, text, Some(target), now);
    Ok(Toast::success(format!("Bounty #{id} posted.")))
}

// ---------------------------------------------------------------------------
// Player actions
// ---------------------------------------------------------------------------

/// Take an Issued contract.
///
/// One Accepted contract per player. Emergency work needs a permit, a seat,
/// or bribed access while permits are required. Smuggling under embargo
/// needs the harbor master's seat or bribed access.
pub fn accept(
    state: &mut GameState,
    actor: PlayerId,
    id: ContractId,
    stance: Stance,
    now: DateTime<Utc>,
) -> HandlerResult {
    let contract = state.contracts.get(&id).ok_or_else(Denial::unavailable)?;
    if contract.status != ContractStatus::Issued {
        return Err(Denial::new("Someone else has already taken that contract."));
    }
    if contract.is_issued_by(actor) {
        return Err(Denial::new("You cannot take your own contract."));
    }
    if contract.target.as_ref().is_some_and(|t| t.id == actor) {
        return Err(Denial::new("You cannot collect a bounty on yourself."));
    }
    let kind = contract.kind();

    let player = state.live_player(actor)?;
    let bribed = player.has_bribed_access(state.tick());
    let name = player.name.clone();
    let player_ref = player.to_ref();
    if state.accepted_contract_of(actor).is_some() {
        return Err(Denial::new("You already have a contract in hand."));
    }

    match kind {
        ContractType::Emergency if state.policy.permit_required => {
            let allowed = bribed || state.has_permit(actor) || state.holds_any_seat(actor);
            if !allowed {
                return Err(Denial::new("Emergency work requires a permit."));
            }
        }
        ContractType::Smuggling if state.policy.embargo_active() => {
            let allowed = bribed || state.holds_seat(actor, SeatKind::HarborMaster);
            if !allowed {
                return Err(Denial::new("The harbor is under embargo."));
            }
        }
        _ => {}
    }

    let contract = state.contracts.get_mut(&id).ok_or_else(Denial::unavailable)?;
    contract.status = ContractStatus::Accepted;
    contract.owner = Some(player_ref);
    contract.stance = Some(stance);

    debug!(contract_id = %id, player = %actor, ?stance, "Contract accepted");
    state.log_event(
        EventKind::Contract,
        format!("{name} takes contract #{id}."),
        Some(actor),
        now,
    );
    Ok(Toast::success(format!("You take contract #{id}.")))
}

/// Deliver an owned contract for its reward.
///
/// Delivering a Completed contract again changes nothing.
pub fn deliver(
    state: &mut GameState,
    actor: PlayerId,
    id: ContractId,
    now: DateTime<Utc>,
) -> HandlerResult {
    let contract = state.contracts.get(&id).ok_or_else(Denial::unavailable)?.clone();
    if !contract.is_owned_by(actor) {
        return Err(Denial::new("That contract is not yours to deliver."));
    }
    match contract.status {
        ContractStatus::Completed => {
            return Err(Denial::new("You have already delivered that contract."));
        }
        ContractStatus::Fulfilled | ContractStatus::Accepted => {}
        ContractStatus::Issued | ContractStatus::Failed | ContractStatus::Cancelled => {
            return Err(Denial::new("That contract cannot be delivered."));
        }
    }
    let early = contract.status == ContractStatus::Accepted;
    let supply = matches!(contract.terms, ContractTerms::Supply { .. });

    // Supply always hands over its sacks, fulfilled or not.
    if early || supply {
        check_delivery_precondition(state, actor, &contract)?;
    }

    let kind = contract.kind();
    let tick = state.tick();
    let player = state.live_player_mut(actor)?;
    match contract.terms {
        ContractTerms::Supply { sacks, .. } => {
            player.grain = player.grain.saturating_sub(sacks);
        }
        ContractTerms::Emergency { .. } | ContractTerms::Smuggling { .. } if early => {
            player.gold = player.gold.saturating_sub(delivery_cost(kind));
        }
        ContractTerms::Emergency { .. }
        | ContractTerms::Smuggling { .. }
        | ContractTerms::Bounty { .. } => {}
    }
    let quote = reward_quote(
        kind,
        contract.stance.unwrap_or(Stance::Careful),
        player.rep,
        player.rumors,
        contract.terms.base_reward(),
    );
    player.gold = player.gold.saturating_add(quote.gold);
    player.adjust_rep(quote.rep_delta);
    player.adjust_heat(quote.heat_delta);
    if quote.consumes_rumor {
        player.rumors = player.rumors.saturating_sub(1);
    }
    player.completed_contracts = player.completed_contracts.saturating_add(1);
    let name = player.name.clone();

    match contract.terms {
        ContractTerms::Supply { sacks, .. } => {
            state.world.add_grain(sacks.saturating_mul(SACK_UNITS));
        }
        ContractTerms::Bounty { .. } => {
            if let Some(target) = contract.target.as_ref().and_then(|t| state.players.get_mut(&t.id))
            {
                target.adjust_heat(BOUNTY_TARGET_HEAT_DROP);
                target.adjust_rep(BOUNTY_TARGET_REP_HIT);
            }
        }
        ContractTerms::Emergency { .. } | ContractTerms::Smuggling { .. } => {}
    }

    if let Some(c) = state.contracts.get_mut(&id) {
        c.status = ContractStatus::Completed;
    }
    info!(contract_id = %id, player = %actor, gold = quote.gold, tick, "Contract delivered");
    state.log_event(
        EventKind::Contract,
        format!("{name} delivers contract #{id}."),
        Some(actor),
        now,
    );
    let bonus = if quote.consumes_rumor {
        " A rumor sweetened the deal."
    } else {
        ""
    };
    Ok(Toast::success(format!(
        "Delivered. You earn {} gold.{bonus}",
        quote.gold
    )))
}

fn check_delivery_precondition(
    state: &GameState,
    actor: PlayerId,
    contract: &Contract,
) -> Result<(), Denial> {
    let player = state.live_player(actor)?;
    match &contract.terms {
        ContractTerms::Bounty {
            evidence_required, ..
        } => {
            let target = contract.target.as_ref().ok_or_else(Denial::unavailable)?;
            let strength = evidence_strength(state, actor, target.id);
            if strength < *evidence_required {
                return Err(Denial::new(format!(
                    "You need evidence of strength {evidence_required} on {} (you hold {strength}).",
                    target.name
                )));
            }
        }
        ContractTerms::Supply { sacks, .. } => {
            if player.grain < *sacks {
                return Err(Denial::new(format!("You need {sacks} sacks on hand.")));
            }
        }
        ContractTerms::Emergency { .. } | ContractTerms::Smuggling { .. } => {
            let cost = delivery_cost(contract.kind());
            if player.gold < cost {
                return Err(Denial::new(format!("You need {cost} gold to see this through.")));
            }
        }
    }
    Ok(())
}

/// Strongest evidence `holder` has on `target`.
pub fn evidence_strength(state: &GameState, holder: PlayerId, target: PlayerId) -> u32 {
    state
        .evidence
        .values()
        .filter(|e| e.holder.id == holder && e.target.id == target)
        .map(|e| e.strength)
        .max()
        .unwrap_or(0)
}

/// Withdraw a posted contract. Issuer only; escrow is refunded in full.
pub fn cancel(
    state: &mut GameState,
    actor: PlayerId,
    id: ContractId,
    now: DateTime<Utc>,
) -> HandlerResult {
    let contract = state.contracts.get(&id).ok_or_else(Denial::unavailable)?;
    if !contract.is_issued_by(actor) {
        return Err(Denial::new("Only the issuer can cancel a contract."));
    }
    if !contract.status.is_open() {
        return Err(Denial::new("That contract can no longer be cancelled."));
    }
    let owner = contract.owner.as_ref().map(|o| o.id);
    let refund = refund_escrow(state, id);
    if let Some(c) = state.contracts.get_mut(&id) {
        c.status = ContractStatus::Cancelled;
        c.owner = None;
    }
    if let Some(owner) = owner {
        state.notify(owner, Toast::info(format!("Contract #{id} was withdrawn.")));
    }
    state.log_event(
        EventKind::Contract,
        format!("Contract #{id} is withdrawn."),
        Some(actor),
        now,
    );
    Ok(Toast::success(format!(
        "Contract #{id} cancelled. {refund} gold returned."
    )))
}

/// Return a contract's escrow to its issuer. Returns the amount refunded.
fn refund_escrow(state: &mut GameState, id: ContractId) -> u64 {
    let Some(contract) = state.contracts.get(&id) else {
        return 0;
    };
    let (Some(amount), Some(issuer)) = (contract.terms.escrow(), contract.issuer.as_ref()) else {
        return 0;
    };
    let issuer = issuer.id;
    match state.players.get_mut(&issuer) {
        Some(player) => {
            player.gold = player.gold.saturating_add(amount);
            amount
        }
        None => 0,
    }
}

// ---------------------------------------------------------------------------
// Tick passes
// ---------------------------------------------------------------------------

/// Count down every open contract and resolve those that reach zero.
///
/// An Accepted contract rolls the grain tier's fulfillment chance on the
/// world generator. An Issued contract simply expires.
pub fn tick_deadlines(state: &mut GameState, now: DateTime<Utc>) {
    let due: Vec<ContractId> = state
        .contracts
        .values_mut()
        .filter(|c| c.status.is_open())
        .filter_map(|c| {
            c.deadline_ticks = c.deadline_ticks.saturating_sub(1);
            (c.deadline_ticks == 0).then_some(c.id)
        })
        .collect();

    for id in due {
        let Some(contract) = state.contracts.get(&id) else {
            continue;
        };
        match contract.status {
            ContractStatus::Accepted => roll_outcome(state, id, now),
            ContractStatus::Issued => expire(state, id, now),
            _ => {}
        }
    }
}

fn roll_outcome(state: &mut GameState, id: ContractId, now: DateTime<Utc>) {
    let chance = fulfill_chance_for_tier(state.world.grain_tier());
    let roll: u32 = state.rng.random_range(0..100);
    let Some(contract) = state.contracts.get_mut(&id) else {
        return;
    };
    let owner = contract.owner.as_ref().map(|o| o.id);
    let kind = contract.kind();

    if roll < chance {
        contract.status = ContractStatus::Fulfilled;
        debug!(contract_id = %id, roll, chance, "Contract fulfilled");
        if let Some(owner) = owner {
            state.notify(
                owner,
                Toast::info(format!("Contract #{id} came through. Deliver it to collect.")),
            );
        }
        return;
    }

    contract.status = ContractStatus::Failed;
    debug!(contract_id = %id, roll, chance, "Contract failed");
    if let Some(player) = owner.and_then(|o| state.players.get_mut(&o)) {
        player.adjust_rep(FAILURE_REP_PENALTY);
    }
    let unrest = if kind == ContractType::Emergency { 4 } else { 2 };
    state.world.raise_unrest(unrest);
    refund_escrow(state, id);
    if let Some(owner) = owner {
        state.notify(owner, Toast::error(format!("Contract #{id} fell through.")));
    }
    state.log_event(
        EventKind::Contract,
        format!("Contract #{id} fails. The streets grumble."),
        owner,
        now,
    );
}

fn expire(state: &mut GameState, id: ContractId, now: DateTime<Utc>) {
    refund_escrow(state, id);
    state.contracts.remove(&id);
    debug!(contract_id = %id, "Contract expired untaken");
    state.log_event(
        EventKind::Contract,
        format!("Contract #{id} expires with no taker."),
        None,
        now,
    );
}

/// Return Accepted contracts whose owners have gone quiet to the board.
pub fn revert_inactive(state: &mut GameState, now: DateTime<Utc>) {
    let cutoff = i64::try_from(state.config.contracts.inactivity_minutes)
        .ok()
        .and_then(Duration::try_minutes)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let stale: Vec<ContractId> = state
        .contracts
        .values()
        .filter(|c| c.status == ContractStatus::Accepted)
        .filter(|c| {
            c.owner.as_ref().is_none_or(|o| {
                state
                    .players
                    .get(&o.id)
                    .is_none_or(|p| p.is_deleted() || p.last_seen_at < cutoff)
            })
        })
        .map(|c| c.id)
        .collect();

    for id in stale {
        let Some(contract) = state.contracts.get_mut(&id) else {
            continue;
        };
        let owner = contract.owner.take().map(|o| o.id);
        contract.stance = None;
        contract.status = ContractStatus::Issued;
        debug!(contract_id = %id, "Contract reverted for owner inactivity");
        state.log_event(
            EventKind::Contract,
            format!("Contract #{id} returns to the board."),
            owner,
            now,
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use granary_types::{Evidence, EvidenceId};

    use super::*;
    use crate::state::test_support::*;

    // -----------------------------------------------------------------------
    // Reward quotes
    // -----------------------------------------------------------------------

    #[test]
    fn careful_is_baseline() {
        let q = reward_quote(ContractType::Emergency, Stance::Careful, 0, 0, 60);
        assert_eq!(q.gold, 60);
        assert_eq!(q.heat_delta, 0);
        assert!(!q.consumes_rumor);
    }

    #[test]
    fn fast_pays_more_and_draws_heat() {
        let careful = reward_quote(ContractType::Smuggling, Stance::Careful, 0, 0, 80);
        let fast = reward_quote(ContractType::Smuggling, Stance::Fast, 0, 0, 80);
        assert_eq!(fast.gold, 100);
        assert_eq!(fast.heat_delta, careful.heat_delta.saturating_add(2));
    }

    #[test]
    fn quiet_pays_less_and_cools() {
        let quiet = reward_quote(ContractType::Smuggling, Stance::Quiet, 0, 0, 80);
        assert_eq!(quiet.gold, 64);
        assert_eq!(quiet.heat_delta, 2);
    }

    #[test]
    fn reputation_and_rumor_bonuses_stack() {
        let q = reward_quote(ContractType::Emergency, Stance::Careful, 50, 2, 60);
        assert_eq!(q.gold, 76);
        assert!(q.consumes_rumor);
    }

    // -----------------------------------------------------------------------
    // Accept
    // -----------------------------------------------------------------------

    #[test]
    fn accept_moves_issued_to_accepted() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 50);
        let id = issue_emergency(&mut s, now());
        assert!(accept(&mut s, p, id, Stance::Careful, now()).is_ok());
        let c = s.contracts.get(&id);
        assert_eq!(c.map(|c| c.status), Some(ContractStatus::Accepted));
        assert!(c.is_some_and(|c| c.is_owned_by(p)));
    }

    #[test]
    fn second_accept_on_same_contract_is_refused() {
        let mut s = state();
        let a = add_player(&mut s, "Mara", 50);
        let b = add_player(&mut s, "Tomas", 50);
        let id = issue_emergency(&mut s, now());
        assert!(accept(&mut s, a, id, Stance::Careful, now()).is_ok());
        assert!(accept(&mut s, b, id, Stance::Careful, now()).is_err());
        assert!(s.contracts.get(&id).is_some_and(|c| c.is_owned_by(a)));
    }

    #[test]
    fn one_accepted_contract_per_player() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 50);
        let first = issue_emergency(&mut s, now());
        let second = issue_emergency(&mut s, now());
        assert!(accept(&mut s, p, first, Stance::Careful, now()).is_ok());
        assert!(accept(&mut s, p, second, Stance::Careful, now()).is_err());
        assert_eq!(
            s.contracts.get(&second).map(|c| c.status),
            Some(ContractStatus::Issued)
        );
    }

    #[test]
    fn issuer_cannot_take_own_contract() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 50);
        assert!(post_supply(&mut s, p, 2, 20, now()).is_ok());
        let id = ContractId(1);
        assert!(accept(&mut s, p, id, Stance::Careful, now()).is_err());
    }

    #[test]
    fn bounty_target_cannot_accept() {
        let mut s = state();
        let issuer = add_player(&mut s, "Mara", 50);
        let target = add_player(&mut s, "Tomas", 50);
        player_mut(&mut s, target).heat = 10;
        assert!(post_bounty(&mut s, issuer, target, 20, now()).is_ok());
        assert!(accept(&mut s, target, ContractId(1), Stance::Careful, now()).is_err());
    }

    #[test]
    fn embargo_blocks_smuggling_unless_harbor_master() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 50);
        let id = issue_smuggling(&mut s, now()).unwrap();
        s.policy.embargo_ticks = 3;

        assert!(accept(&mut s, p, id, Stance::Quiet, now()).is_err());
        assert_eq!(s.contracts.get(&id).map(|c| c.status), Some(ContractStatus::Issued));

        let holder = player(&s, p).to_ref();
        if let Some(seat) = s.seats.get_mut(&SeatKind::HarborMaster) {
            seat.holder = Some(holder);
        }
        assert!(accept(&mut s, p, id, Stance::Quiet, now()).is_ok());
    }

    #[test]
    fn bribe_opens_the_embargo() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 50);
        let id = issue_smuggling(&mut s, now()).unwrap();
        s.policy.embargo_ticks = 3;
        player_mut(&mut s, p).bribed_until_tick = Some(s.tick());
        assert!(accept(&mut s, p, id, Stance::Careful, now()).is_ok());
    }

    #[test]
    fn permit_gate_on_emergency_work() {
        let mut s = state();
        s.policy.permit_required = true;
        let p = add_player(&mut s, "Mara", 50);
        let id = issue_emergency(&mut s, now());
        assert!(accept(&mut s, p, id, Stance::Careful, now()).is_err());

        s.permits.insert(
            granary_types::PermitId(1),
            granary_types::Permit {
                id: granary_types::PermitId(1),
                holder: player(&s, p).to_ref(),
                ticks_left: 3,
            },
        );
        assert!(accept(&mut s, p, id, Stance::Careful, now()).is_ok());
    }

    #[test]
    fn smuggling_is_issued_once_while_open() {
        let mut s = state();
        assert!(issue_smuggling(&mut s, now()).is_some());
        assert!(issue_smuggling(&mut s, now()).is_none());
    }

    // -----------------------------------------------------------------------
    // Deliver
    // -----------------------------------------------------------------------

    #[test]
    fn delivering_twice_changes_nothing() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 50);
        let id = issue_emergency(&mut s, now());
        assert!(accept(&mut s, p, id, Stance::Careful, now()).is_ok());
        if let Some(c) = s.contracts.get_mut(&id) {
            c.status = ContractStatus::Fulfilled;
        }
        assert!(deliver(&mut s, p, id, now()).is_ok());
        let after_first = player(&s, p).clone();
        assert_eq!(after_first.gold, 110);
        assert_eq!(after_first.completed_contracts, 1);

        let second = deliver(&mut s, p, id, now());
        assert!(second.is_err());
        let after_second = player(&s, p);
        assert_eq!(after_second.gold, after_first.gold);
        assert_eq!(after_second.rep, after_first.rep);
        assert_eq!(after_second.heat, after_first.heat);
        assert_eq!(after_second.completed_contracts, 1);
    }

    #[test]
    fn early_delivery_pays_the_type_cost() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 50);
        let id = issue_emergency(&mut s, now());
        assert!(accept(&mut s, p, id, Stance::Careful, now()).is_ok());
        assert!(deliver(&mut s, p, id, now()).is_ok());
        assert_eq!(player(&s, p).gold, 50 - 20 + 60);
    }

    #[test]
    fn early_delivery_without_cost_is_refused() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 5);
        let id = issue_emergency(&mut s, now());
        assert!(accept(&mut s, p, id, Stance::Careful, now()).is_ok());
        assert!(deliver(&mut s, p, id, now()).is_err());
        assert_eq!(s.contracts.get(&id).map(|c| c.status), Some(ContractStatus::Accepted));
    }

    #[test]
    fn supply_delivery_moves_sacks_into_the_city() {
        let mut s = state();
        let issuer = add_player(&mut s, "Mara", 50);
        let worker = add_player(&mut s, "Tomas", 0);
        assert!(post_supply(&mut s, issuer, 3, 30, now()).is_ok());
        assert_eq!(player(&s, issuer).gold, 20);

        let id = ContractId(1);
        assert!(accept(&mut s, worker, id, Stance::Careful, now()).is_ok());
        assert!(deliver(&mut s, worker, id, now()).is_err());

        player_mut(&mut s, worker).grain = 4;
        let before = s.world.grain_supply;
        assert!(deliver(&mut s, worker, id, now()).is_ok());
        assert_eq!(player(&s, worker).grain, 1);
        assert_eq!(player(&s, worker).gold, 30);
        assert_eq!(s.world.grain_supply, before + 3 * SACK_UNITS);
    }

    #[test]
    fn fulfilled_supply_still_hands_over_the_sacks() {
        let mut s = state();
        let issuer = add_player(&mut s, "Mara", 50);
        let worker = add_player(&mut s, "Tomas", 0);
        assert!(post_supply(&mut s, issuer, 3, 30, now()).is_ok());
        let id = ContractId(1);
        assert!(accept(&mut s, worker, id, Stance::Careful, now()).is_ok());
        s.contracts.get_mut(&id).unwrap().status = ContractStatus::Fulfilled;

        let before = s.world.grain_supply;
        assert!(deliver(&mut s, worker, id, now()).is_err());
        assert_eq!(s.world.grain_supply, before);
        assert_eq!(player(&s, worker).gold, 0);
        assert_eq!(s.contracts[&id].status, ContractStatus::Fulfilled);

        player_mut(&mut s, worker).grain = 3;
        assert!(deliver(&mut s, worker, id, now()).is_ok());
        assert_eq!(player(&s, worker).grain, 0);
        assert_eq!(player(&s, worker).gold, 30);
        assert_eq!(s.world.grain_supply, before + 3 * SACK_UNITS);
    }

    #[test]
    fn bounty_delivery_needs_evidence() {
        let mut s = state();
        let issuer = add_player(&mut s, "Mara", 50);
        let target = add_player(&mut s, "Tomas", 0);
        let hunter = add_player(&mut s, "Ilse", 0);
        player_mut(&mut s, target).heat = 12;
        assert!(post_bounty(&mut s, issuer, target, 40, now()).is_ok());
        let id = ContractId(1);
        assert!(accept(&mut s, hunter, id, Stance::Careful, now()).is_ok());
        assert!(deliver(&mut s, hunter, id, now()).is_err());

        let holder = player(&s, hunter).to_ref();
        let target_ref = player(&s, target).to_ref();
        s.evidence.insert(
            EvidenceId(1),
            Evidence {
                id: EvidenceId(1),
                holder,
                target: target_ref,
                strength: BOUNTY_EVIDENCE_REQUIRED,
                ticks_left: 5,
            },
        );
        assert!(deliver(&mut s, hunter, id, now()).is_ok());
        assert_eq!(player(&s, target).heat, 8);
    }

    #[test]
    fn bounty_requires_target_heat() {
        let mut s = state();
        let issuer = add_player(&mut s, "Mara", 50);
        let target = add_player(&mut s, "Tomas", 0);
        assert!(post_bounty(&mut s, issuer, target, 20, now()).is_err());
        assert_eq!(player(&s, issuer).gold, 50);
    }

    #[test]
    fn magistrate_bounty_carries_a_warrant() {
        let mut s = state();
        let issuer = add_player(&mut s, "Mara", 50);
        let target = add_player(&mut s, "Tomas", 0);
        player_mut(&mut s, target).heat = 10;
        let holder = player(&s, issuer).to_ref();
        if let Some(seat) = s.seats.get_mut(&SeatKind::Magistrate) {
            seat.holder = Some(holder);
        }
        assert!(post_bounty(&mut s, issuer, target, 20, now()).is_ok());
        let terms = s.contracts.get(&ContractId(1)).map(|c| c.terms.clone());
        assert_eq!(
            terms,
            Some(ContractTerms::Bounty {
                reward: 20,
                evidence_required: BOUNTY_EVIDENCE_REQUIRED / 2,
                warrant: true,
            })
        );
    }

    // -----------------------------------------------------------------------
    // Cancel
    // -----------------------------------------------------------------------

    #[test]
    fn cancel_refunds_supply_escrow() {
        let mut s = state();
        let issuer = add_player(&mut s, "Mara", 50);
        assert!(post_supply(&mut s, issuer, 2, 30, now()).is_ok());
        assert!(cancel(&mut s, issuer, ContractId(1), now()).is_ok());
        assert_eq!(player(&s, issuer).gold, 50);
        assert_eq!(
            s.contracts.get(&ContractId(1)).map(|c| c.status),
            Some(ContractStatus::Cancelled)
        );
    }

    #[test]
    fn only_issuer_may_cancel() {
        let mut s = state();
        let issuer = add_player(&mut s, "Mara", 50);
        let other = add_player(&mut s, "Tomas", 50);
        assert!(post_supply(&mut s, issuer, 2, 30, now()).is_ok());
        assert!(cancel(&mut s, other, ContractId(1), now()).is_err());
    }

    #[test]
    fn missing_contract_is_unavailable() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 50);
        let result = accept(&mut s, p, ContractId(99), Stance::Careful, now());
        assert_eq!(result, Err(Denial::unavailable()));
    }

    // -----------------------------------------------------------------------
    // Tick passes
    // -----------------------------------------------------------------------

    #[test]
    fn issued_contract_expires_at_deadline() {
        let mut s = state();
        let id = issue_emergency(&mut s, now());
        for _ in 0..s.config.contracts.emergency_deadline_ticks {
            tick_deadlines(&mut s, now());
        }
        assert!(!s.contracts.contains_key(&id));
    }

    #[test]
    fn accepted_contract_resolves_at_deadline() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 50);
        let id = issue_emergency(&mut s, now());
        assert!(accept(&mut s, p, id, Stance::Careful, now()).is_ok());
        for _ in 0..s.config.contracts.emergency_deadline_ticks {
            tick_deadlines(&mut s, now());
        }
        let status = s.contracts.get(&id).map(|c| c.status);
        assert!(matches!(
            status,
            Some(ContractStatus::Fulfilled | ContractStatus::Failed)
        ));
        if status == Some(ContractStatus::Failed) {
            assert_eq!(player(&s, p).rep, FAILURE_REP_PENALTY);
        }
    }

    #[test]
    fn inactive_owner_loses_contract_without_penalty() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 50);
        let id = issue_emergency(&mut s, now());
        assert!(accept(&mut s, p, id, Stance::Fast, now()).is_ok());

        let later = now() + Duration::days(2);
        revert_inactive(&mut s, later);
        let c = s.contracts.get(&id);
        assert_eq!(c.map(|c| c.status), Some(ContractStatus::Issued));
        assert!(c.is_some_and(|c| c.owner.is_none() && c.stance.is_none()));
        assert_eq!(player(&s, p).rep, 0);
    }

    #[test]
    fn active_owner_keeps_contract() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 50);
        let id = issue_emergency(&mut s, now());
        assert!(accept(&mut s, p, id, Stance::Fast, now()).is_ok());
        revert_inactive(&mut s, now() + Duration::minutes(5));
        assert_eq!(s.contracts.get(&id).map(|c| c.status), Some(ContractStatus::Accepted));
    }
}
