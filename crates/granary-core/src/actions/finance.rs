//! Loans and obligations.
//!
//! Both are debts sharing [`DebtTerms`]: a debtor, an optional creditor
//! (`None` is the city treasury), an amount and a due tick. Loans hand gold
//! to the borrower up front; obligations are bare pledges. The finance pass
//! marks past-due debts overdue exactly once, with a penalty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use granary_types::{
    DebtStatus, DebtTerms, EventKind, Loan, LoanId, Obligation, ObligationId, PlayerId,
};

use crate::state::{Denial, GameState, HandlerResult, Toast, bump};

/// Reputation lost when a debt goes overdue.
const OVERDUE_REP_PENALTY: i32 = -5;

/// Heat gained when a debt goes overdue.
const OVERDUE_HEAT: i32 = 1;

/// Unrest added per overdue debt.
const OVERDUE_UNREST: u8 = 1;

/// Reputation lost on default.
const DEFAULT_REP_PENALTY: i32 = -15;

/// Longest pledge reason kept.
const MAX_REASON_LEN: usize = 120;

/// Identifies either kind of debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebtRef {
    /// A loan.
    Loan(LoanId),
    /// An obligation.
    Obligation(ObligationId),
}

impl core::fmt::Display for DebtRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Loan(id) => write!(f, "loan #{id}"),
            Self::Obligation(id) => write!(f, "obligation #{id}"),
        }
    }
}

fn terms(state: &GameState, debt: DebtRef) -> Option<&DebtTerms> {
    match debt {
        DebtRef::Loan(id) => state.loans.get(&id).map(|l| &l.terms),
        DebtRef::Obligation(id) => state.obligations.get(&id).map(|o| &o.terms),
    }
}

fn terms_mut(state: &mut GameState, debt: DebtRef) -> Option<&mut DebtTerms> {
    match debt {
        DebtRef::Loan(id) => state.loans.get_mut(&id).map(|l| &mut l.terms),
        DebtRef::Obligation(id) => state.obligations.get_mut(&id).map(|o| &mut o.terms),
    }
}

fn with_interest(state: &GameState, principal: u64) -> u64 {
    let interest = principal
        .saturating_mul(state.config.finance.loan_interest_pct)
        .checked_div(100)
        .unwrap_or(0);
    principal.saturating_add(interest)
}

fn new_terms(
    state: &GameState,
    debtor: PlayerId,
    creditor: Option<PlayerId>,
    amount_due: u64,
    now: DateTime<Utc>,
) -> Result<DebtTerms, Denial> {
    let debtor = state.live_player(debtor)?.to_ref();
    let creditor = match creditor {
        Some(id) => Some(state.live_player(id)?.to_ref()),
        None => None,
    };
    Ok(DebtTerms {
        debtor,
        creditor,
        amount_due,
        due_tick: state.tick().saturating_add(state.config.finance.loan_term_ticks),
        status: DebtStatus::Active,
        created_at: now,
        closed_at: None,
    })
}

// ---------------------------------------------------------------------------
// Origination
// ---------------------------------------------------------------------------

/// Lend gold to another player at the configured interest.
pub fn offer_loan(
    state: &mut GameState,
    lender: PlayerId,
    borrower: PlayerId,
    amount: u64,
    now: DateTime<Utc>,
) -> HandlerResult {
    if lender == borrower {
        return Err(Denial::new("You cannot lend to yourself."));
    }
    if amount == 0 {
        return Err(Denial::new("Lend at least one gold."));
    }
    let terms = new_terms(state, borrower, Some(lender), with_interest(state, amount), now)?;
    let lender_player = state.live_player_mut(lender)?;
    if lender_player.gold < amount {
        return Err(Denial::new("You do not have that much gold."));
    }
    lender_player.gold = lender_player.gold.saturating_sub(amount);
    let lender_name = lender_player.name.clone();
    let borrower_name = terms.debtor.name.clone();
    let due = terms.amount_due;
    let borrower_player = state.live_player_mut(borrower)?;
    borrower_player.gold = borrower_player.gold.saturating_add(amount);

    let id = LoanId(bump(&mut state.counters.next_loan_id));
    state.loans.insert(
        id,
        Loan {
            id,
            principal: amount,
            terms,
        },
    );
    state.notify(
        borrower,
        Toast::info(format!("{lender_name} lends you {amount} gold. You owe {due}.")),
    );
    state.log_event(
        EventKind::Finance,
        format!("{lender_name} lends {amount} gold to {borrower_name}."),
        Some(lender),
        now,
    );
    Ok(Toast::success(format!("Loan #{id} made. {borrower_name} owes you {due}.")))
}

/// Borrow from the city treasury. One open city loan at a time.
pub fn borrow_from_city(
    state: &mut GameState,
    actor: PlayerId,
    amount: u64,
    now: DateTime<Utc>,
) -> HandlerResult {
    if amount == 0 {
        return Err(Denial::new("Borrow at least one gold."));
    }
    let max = state.config.finance.city_loan_max;
    if amount > max {
        return Err(Denial::new(format!("The treasury lends at most {max} gold.")));
    }
    let open_city_loan = state.loans.values().any(|l| {
        l.terms.debtor.id == actor && l.terms.creditor.is_none() && l.terms.status.is_open()
    });
    if open_city_loan {
        return Err(Denial::new("Settle your treasury loan first."));
    }
    let terms = new_terms(state, actor, None, with_interest(state, amount), now)?;
    let due = terms.amount_due;
    let player = state.live_player_mut(actor)?;
    player.gold = player.gold.saturating_add(amount);

    let id = LoanId(bump(&mut state.counters.next_loan_id));
    state.loans.insert(
        id,
        Loan {
            id,
            principal: amount,
            terms,
        },
    );
    debug!(loan_id = %id, player = %actor, amount, "Treasury loan made");
    Ok(Toast::success(format!(
        "The treasury lends you {amount} gold. You owe {due}."
    )))
}

/// Pledge an obligation to another player or to the city.
pub fn pledge_obligation(
    state: &mut GameState,
    actor: PlayerId,
    creditor: Option<PlayerId>,
    amount: u64,
    reason: &str,
    now: DateTime<Utc>,
) -> HandlerResult {
    if amount == 0 {
        return Err(Denial::new("Pledge at least one gold."));
    }
    if creditor == Some(actor) {
        return Err(Denial::new("You cannot owe yourself."));
    }
    let reason: String = reason.trim().chars().take(MAX_REASON_LEN).collect();
    if reason.is_empty() {
        return Err(Denial::new("Say what the pledge is for."));
    }
    let terms = new_terms(state, actor, creditor, amount, now)?;
    let debtor_name = terms.debtor.name.clone();
    let id = ObligationId(bump(&mut state.counters.next_obligation_id));
    state.obligations.insert(id, Obligation { id, reason, terms });
    if let Some(creditor) = creditor {
        state.notify(
            creditor,
            Toast::info(format!("{debtor_name} pledges you {amount} gold.")),
        );
    }
    state.log_event(
        EventKind::Finance,
        format!("{debtor_name} pledges {amount} gold."),
        Some(actor),
        now,
    );
    Ok(Toast::success(format!("Obligation #{id} recorded.")))
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

fn open_terms(state: &GameState, debt: DebtRef) -> Result<DebtTerms, Denial> {
    let terms = terms(state, debt).ok_or_else(Denial::unavailable)?;
    if !terms.status.is_open() {
        return Err(Denial::new(format!("That {debt} is already closed.")));
    }
    Ok(terms.clone())
}

fn close(state: &mut GameState, debt: DebtRef, status: DebtStatus, now: DateTime<Utc>) {
    if let Some(terms) = terms_mut(state, debt) {
        terms.status = status;
        terms.closed_at = Some(now);
    }
}

/// Pay a debt in full. Debtor only.
pub fn settle(
    state: &mut GameState,
    actor: PlayerId,
    debt: DebtRef,
    now: DateTime<Utc>,
) -> HandlerResult {
    let terms = open_terms(state, debt)?;
    if terms.debtor.id != actor {
        return Err(Denial::new("That debt is not yours to pay."));
    }
    let player = state.live_player_mut(actor)?;
    if player.gold < terms.amount_due {
        return Err(Denial::new(format!("You need {} gold.", terms.amount_due)));
    }
    player.gold = player.gold.saturating_sub(terms.amount_due);
    if let Some(creditor) = terms.creditor.as_ref().and_then(|c| state.players.get_mut(&c.id)) {
        creditor.gold = creditor.gold.saturating_add(terms.amount_due);
    }
    close(state, debt, DebtStatus::Settled, now);
    if let Some(creditor) = terms.creditor.as_ref() {
        state.notify(
            creditor.id,
            Toast::info(format!("{} settles {debt}.", terms.debtor.name)),
        );
    }
    state.log_event(
        EventKind::Finance,
        format!("{} settles {debt}.", terms.debtor.name),
        Some(actor),
        now,
    );
    Ok(Toast::success(format!("You settle {debt}.")))
}

/// Waive a debt. Creditor only; the treasury never forgives.
pub fn forgive(
    state: &mut GameState,
    actor: PlayerId,
    debt: DebtRef,
    now: DateTime<Utc>,
) -> HandlerResult {
    let terms = open_terms(state, debt)?;
    if !terms.is_creditor(actor) {
        return Err(Denial::new("Only the creditor can forgive a debt."));
    }
    close(state, debt, DebtStatus::Forgiven, now);
    state.notify(
        terms.debtor.id,
        Toast::info(format!("Your {debt} has been forgiven.")),
    );
    state.log_event(
        EventKind::Finance,
        format!("{debt} owed by {} is forgiven.", terms.debtor.name),
        Some(actor),
        now,
    );
    Ok(Toast::success(format!("You forgive {debt}.")))
}

/// Walk away from a debt. Debtor only.
///
/// Costs heavy reputation and brings a smuggling embargo down on the city.
pub fn declare_default(
    state: &mut GameState,
    actor: PlayerId,
    debt: DebtRef,
    now: DateTime<Utc>,
) -> HandlerResult {
    let terms = open_terms(state, debt)?;
    if terms.debtor.id != actor {
        return Err(Denial::new("That debt is not yours."));
    }
    state.live_player_mut(actor)?.adjust_rep(DEFAULT_REP_PENALTY);
    close(state, debt, DebtStatus::Defaulted, now);
    let sanction = state.config.finance.default_embargo_ticks;
    state.policy.embargo_ticks = state.policy.embargo_ticks.max(sanction);
    if let Some(creditor) = terms.creditor.as_ref() {
        state.notify(
            creditor.id,
            Toast::error(format!("{} defaults on {debt}.", terms.debtor.name)),
        );
    }
    info!(%debt, player = %actor, "Debt defaulted; embargo imposed");
    state.log_event(
        EventKind::Finance,
        format!(
            "{} defaults on {debt}. The harbor closes in response.",
            terms.debtor.name
        ),
        Some(actor),
        now,
    );
    Ok(Toast::info(format!("You default on {debt}.")))
}

// ---------------------------------------------------------------------------
// Tick pass
// ---------------------------------------------------------------------------

/// Mark past-due Active debts as Overdue, penalizing each debtor once.
pub fn tick_debts(state: &mut GameState, now: DateTime<Utc>) {
    let tick = state.tick();
    let overdue: Vec<DebtRef> = state
        .loans
        .values()
        .filter(|l| l.terms.status == DebtStatus::Active && tick > l.terms.due_tick)
        .map(|l| DebtRef::Loan(l.id))
        .chain(
            state
                .obligations
                .values()
                .filter(|o| o.terms.status == DebtStatus::Active && tick > o.terms.due_tick)
                .map(|o| DebtRef::Obligation(o.id)),
        )
        .collect();

    for debt in overdue {
        let Some(terms) = terms_mut(state, debt) else {
            continue;
        };
        terms.status = DebtStatus::Overdue;
        let debtor = terms.debtor.clone();
        if let Some(player) = state.players.get_mut(&debtor.id) {
            player.adjust_rep(OVERDUE_REP_PENALTY);
            player.adjust_heat(OVERDUE_HEAT);
        }
        state.world.raise_unrest(OVERDUE_UNREST);
        state.notify(debtor.id, Toast::error(format!("Your {debt} is overdue.")));
        debug!(%debt, debtor = %debtor.id, "Debt overdue");
        state.log_event(
            EventKind::Finance,
            format!("{} is overdue on {debt}.", debtor.name),
            Some(debtor.id),
            now,
        );
    }
}
