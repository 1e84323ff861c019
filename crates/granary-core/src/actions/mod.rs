//! Player actions.
//!
//! Every gameplay action is a variant of [`Action`]. [`dispatch`] routes it
//! to a synchronous handler that validates against the aggregate, mutates
//! it, and reports back as an [`ActionOutcome`]. Handlers never return
//! errors to the caller: a refusal is an outcome with an error toast.
//!
//! Each submodule also owns the tick pass for the records it manages.

pub mod admin;
pub mod contracts;
pub mod crisis;
pub mod finance;
pub mod institutions;
pub mod intel;
pub mod market;
pub mod projects;
pub mod social;
pub mod travel;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use granary_types::{ContractId, District, PlayerId, ProjectKind, Stance};

use crate::state::{ActionOutcome, GameState};

pub use finance::DebtRef;

/// A gameplay action a player can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    // Contracts
    /// Take an Issued contract.
    Accept {
        /// Contract to take.
        contract: ContractId,
        /// Delivery mode.
        stance: Stance,
    },
    /// Hand in a contract.
    Deliver {
        /// Contract to deliver.
        contract: ContractId,
    },
    /// Withdraw a contract you posted.
    Cancel {
        /// Contract to withdraw.
        contract: ContractId,
    },
    /// Post a request for grain, escrowing the reward.
    PostSupply {
        /// Sacks wanted.
        sacks: u32,
        /// Gold offered.
        reward: u64,
    },
    /// Post a bounty on a high-heat player, escrowing the reward.
    PostBounty {
        /// Player the bounty is on.
        target: PlayerId,
        /// Gold offered.
        reward: u64,
    },

    // Crisis and market
    /// Pay to answer the active crisis.
    RespondToCrisis,
    /// Buy sacks at the market.
    BuyGrain {
        /// Sacks to buy.
        sacks: u32,
    },
    /// Sell sacks at the market.
    SellGrain {
        /// Sacks to sell.
        sacks: u32,
    },

    // Finance
    /// Lend gold to another player.
    OfferLoan {
        /// Who receives the gold.
        borrower: PlayerId,
        /// Principal.
        amount: u64,
    },
    /// Borrow from the treasury.
    BorrowFromCity {
        /// Principal.
        amount: u64,
    },
    /// Pledge gold to a player or the city.
    PledgeObligation {
        /// Who is owed; `None` for the city.
        creditor: Option<PlayerId>,
        /// Gold pledged.
        amount: u64,
        /// What the pledge is for.
        reason: String,
    },
    /// Pay a debt in full.
    Settle(DebtRef),
    /// Waive a debt owed to you.
    Forgive(DebtRef),
    /// Walk away from a debt.
    Default(DebtRef),

    // Institutions
    /// Set the market tax (Magistrate).
    SetTaxRate {
        /// New rate, 0 to 50.
        pct: u8,
    },
    /// Require or waive permits (Magistrate).
    SetPermitRequired {
        /// Whether permits are required.
        required: bool,
    },
    /// Grant a permit (Magistrate).
    IssuePermit {
        /// Permit holder.
        holder: PlayerId,
    },
    /// Buy a permit at the palace.
    BuyPermit,
    /// Restrict the markets (Grain Warden).
    RestrictMarkets,
    /// Declare an embargo (Harbor Master).
    DeclareEmbargo,
    /// Lift the embargo (Harbor Master).
    LiftEmbargo,
    /// Buy temporary access past the gates.
    Bribe,

    // Intel
    /// Listen for a rumor token.
    GatherRumor,
    /// Spend a token to start a rumor.
    SpreadRumor {
        /// Who the rumor is about.
        subject: Option<PlayerId>,
        /// What is said.
        text: String,
    },
    /// Build a dossier on a player.
    Investigate {
        /// Who to investigate.
        target: PlayerId,
    },
    /// Make a dossier public.
    PublishEvidence {
        /// Whose dossier.
        target: PlayerId,
    },
    /// Scry on a player.
    Scry {
        /// Who to watch.
        target: PlayerId,
    },
    /// Copy a player's latest letter.
    Intercept {
        /// Whose letters.
        target: PlayerId,
    },
    /// Dig for a relic.
    SearchRelic,

    // Projects, travel, social
    /// Pay for a civic project.
    FundProject {
        /// Which project.
        kind: ProjectKind,
    },
    /// Walk to another district.
    Travel {
        /// Destination.
        to: District,
    },
    /// Change your display name.
    Rename {
        /// New name.
        name: String,
    },
    /// Post to public chat.
    Chat {
        /// Message.
        text: String,
    },
    /// Send a private letter.
    SendDiplomatic {
        /// Recipient.
        to: PlayerId,
        /// Letter text.
        text: String,
    },
}

/// Route an action to its handler.
pub fn dispatch(
    state: &mut GameState,
    actor: PlayerId,
    action: Action,
    now: DateTime<Utc>,
) -> ActionOutcome {
    let result = match &action {
        Action::Accept { contract, stance } => {
            contracts::accept(state, actor, *contract, *stance, now)
        }
        Action::Deliver { contract } => contracts::deliver(state, actor, *contract, now),
        Action::Cancel { contract } => contracts::cancel(state, actor, *contract, now),
        Action::PostSupply { sacks, reward } => {
            contracts::post_supply(state, actor, *sacks, *reward, now)
        }
        Action::PostBounty { target, reward } => {
            contracts::post_bounty(state, actor, *target, *reward, now)
        }
        Action::RespondToCrisis => crisis::respond_to_crisis(state, actor, now),
        Action::BuyGrain { sacks } => market::buy_grain(state, actor, *sacks, now),
        Action::SellGrain { sacks } => market::sell_grain(state, actor, *sacks, now),
        Action::OfferLoan { borrower, amount } => {
            finance::offer_loan(state, actor, *borrower, *amount, now)
        }
        Action::BorrowFromCity { amount } => finance::borrow_from_city(state, actor, *amount, now),
        Action::PledgeObligation {
            creditor,
            amount,
            reason,
        } => finance::pledge_obligation(state, actor, *creditor, *amount, reason, now),
        Action::Settle(debt) => finance::settle(state, actor, *debt, now),
        Action::Forgive(debt) => finance::forgive(state, actor, *debt, now),
        Action::Default(debt) => finance::declare_default(state, actor, *debt, now),
        Action::SetTaxRate { pct } => institutions::set_tax_rate(state, actor, *pct, now),
        Action::SetPermitRequired { required } => {
            institutions::set_permit_required(state, actor, *required, now)
        }
        Action::IssuePermit { holder } => institutions::issue_permit(state, actor, *holder, now),
        Action::BuyPermit => institutions::buy_permit(state, actor, now),
        Action::RestrictMarkets => institutions::restrict_markets(state, actor, now),
        Action::DeclareEmbargo => institutions::declare_embargo(state, actor, now),
        Action::LiftEmbargo => institutions::lift_embargo(state, actor, now),
        Action::Bribe => institutions::bribe(state, actor, now),
        Action::GatherRumor => intel::gather_rumor(state, actor, now),
        Action::SpreadRumor { subject, text } => {
            intel::spread_rumor(state, actor, *subject, text, now)
        }
        Action::Investigate { target } => intel::investigate(state, actor, *target, now),
        Action::PublishEvidence { target } => intel::publish_evidence(state, actor, *target, now),
        Action::Scry { target } => intel::scry(state, actor, *target, now),
        Action::Intercept { target } => intel::intercept(state, actor, *target, now),
        Action::SearchRelic => intel::search_relic(state, actor, now),
        Action::FundProject { kind } => projects::fund_project(state, actor, *kind, now),
        Action::Travel { to } => travel::travel(state, actor, *to, now),
        Action::Rename { name } => social::rename(state, actor, name, now),
        Action::Chat { text } => social::chat(state, actor, text, now),
        Action::SendDiplomatic { to, text } => {
            social::send_diplomatic(state, actor, *to, text, now)
        }
    };
    let outcome = ActionOutcome::from(result);
    debug!(
        player = %actor,
        action = action_name(&action),
        accepted = outcome.accepted,
        "Action handled"
    );
    outcome
}

/// Short name of an action for logs.
pub const fn action_name(action: &Action) -> &'static str {
    match action {
        Action::Accept { .. } => "accept",
        Action::Deliver { .. } => "deliver",
        Action::Cancel { .. } => "cancel",
        Action::PostSupply { .. } => "post_supply",
        Action::PostBounty { .. } => "post_bounty",
        Action::RespondToCrisis => "respond_to_crisis",
        Action::BuyGrain { .. } => "buy_grain",
        Action::SellGrain { .. } => "sell_grain",
        Action::OfferLoan { .. } => "offer_loan",
        Action::BorrowFromCity { .. } => "borrow_from_city",
        Action::PledgeObligation { .. } => "pledge_obligation",
        Action::Settle(_) => "settle",
        Action::Forgive(_) => "forgive",
        Action::Default(_) => "default",
        Action::SetTaxRate { .. } => "set_tax_rate",
        Action::SetPermitRequired { .. } => "set_permit_required",
        Action::IssuePermit { .. } => "issue_permit",
        Action::BuyPermit => "buy_permit",
        Action::RestrictMarkets => "restrict_markets",
        Action::DeclareEmbargo => "declare_embargo",
        Action::LiftEmbargo => "lift_embargo",
        Action::Bribe => "bribe",
        Action::GatherRumor => "gather_rumor",
        Action::SpreadRumor { .. } => "spread_rumor",
        Action::Investigate { .. } => "investigate",
        Action::PublishEvidence { .. } => "publish_evidence",
        Action::Scry { .. } => "scry",
        Action::Intercept { .. } => "intercept",
        Action::SearchRelic => "search_relic",
        Action::FundProject { .. } => "fund_project",
        Action::Travel { .. } => "travel",
        Action::Rename { .. } => "rename",
        Action::Chat { .. } => "chat",
        Action::SendDiplomatic { .. } => "send_diplomatic",
    }
}

#[cfg(test)]
mod tests {
    use granary_types::ContractStatus;

    use super::*;
    use crate::state::test_support::*;
    use crate::state::UNAVAILABLE;

    #[test]
    fn missing_contract_is_unavailable() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 0);
        let outcome = dispatch(
            &mut s,
            p,
            Action::Accept {
                contract: ContractId(99),
                stance: Stance::Careful,
            },
            now(),
        );
        assert!(!outcome.accepted);
        assert_eq!(outcome.toasts.first().map(|t| t.text.as_str()), Some(UNAVAILABLE));
    }

    #[test]
    fn unknown_actor_is_unavailable() {
        let mut s = state();
        let outcome = dispatch(&mut s, PlayerId::new(), Action::GatherRumor, now());
        assert!(!outcome.accepted);
    }

    #[test]
    fn dispatch_routes_to_handlers() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 500);
        let id = contracts::issue_emergency(&mut s, now());
        let outcome = dispatch(
            &mut s,
            p,
            Action::Accept {
                contract: id,
                stance: Stance::Fast,
            },
            now(),
        );
        assert!(outcome.accepted);
        assert_eq!(
            s.contracts.get(&id).map(|c| c.status),
            Some(ContractStatus::Accepted)
        );
    }
}
