//! Core entity structs for the Granary simulation.
//!
//! The world aggregate owns every value defined here. Records that point at
//! a player do so through a [`PlayerRef`]: the player's id plus the display
//! name captured when the reference was made. The name is never re-synced
//! after a rename; the id is the only link back to the owning player.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{
    ContractStatus, ContractType, CrisisKind, DebtStatus, District, EventKind, ProjectKind,
    RelicKind, SeatKind, Stance,
};
use crate::ids::{
    ChatMessageId, ContractId, DiplomaticMessageId, EventId, EvidenceId, InterceptId, LoanId,
    ObligationId, PermitId, PlayerId, ProjectId, RelicId, RumorId, ScryReportId,
};

/// Lowest reputation a player can fall to.
pub const REP_MIN: i32 = -100;

/// Highest reputation a player can reach.
pub const REP_MAX: i32 = 100;

/// Highest heat a player can accumulate.
pub const HEAT_MAX: u8 = 20;

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// Weak reference to a player: id plus the name at the time of reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    /// The referenced player.
    pub id: PlayerId,
    /// Display name captured when the reference was created.
    pub name: String,
}

/// A walk in progress between districts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Travel {
    /// Destination district.
    pub to: District,
    /// Ticks until arrival.
    pub ticks_left: u32,
}

/// A player of the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique identifier.
    pub id: PlayerId,
    /// Display name. Redacted on hard delete.
    pub name: String,
    /// Coin on hand.
    pub gold: u64,
    /// Sacks of grain on hand.
    pub grain: u32,
    /// Standing in the city, in `[-100, 100]`.
    pub rep: i32,
    /// Visibility to the watch, in `[0, 20]`.
    pub heat: u8,
    /// Rumor tokens held.
    pub rumors: u32,
    /// Current district.
    pub location: District,
    /// Walk in progress, if any.
    pub travel: Option<Travel>,
    /// Contracts delivered over the player's lifetime.
    pub completed_contracts: u32,
    /// Last tick (inclusive) on which bribed access is valid.
    pub bribed_until_tick: Option<u64>,
    /// When the player joined.
    pub created_at: DateTime<Utc>,
    /// When the player last acted.
    pub last_seen_at: DateTime<Utc>,
    /// Set when the player is soft-deleted for inactivity.
    pub soft_deleted_at: Option<DateTime<Utc>>,
    /// Set when the player's data is redacted.
    pub hard_deleted_at: Option<DateTime<Utc>>,
}

impl Player {
    /// Create a fresh player standing in the market.
    pub fn new(id: PlayerId, name: &str, gold: u64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.to_owned(),
            gold,
            grain: 0,
            rep: 0,
            heat: 0,
            rumors: 0,
            location: District::Market,
            travel: None,
            completed_contracts: 0,
            bribed_until_tick: None,
            created_at: now,
            last_seen_at: now,
            soft_deleted_at: None,
            hard_deleted_at: None,
        }
    }

    /// Snapshot a weak reference to this player.
    pub fn to_ref(&self) -> PlayerRef {
        PlayerRef {
            id: self.id,
            name: self.name.clone(),
        }
    }

    /// Whether the player has been soft- or hard-deleted.
    pub const fn is_deleted(&self) -> bool {
        self.soft_deleted_at.is_some() || self.hard_deleted_at.is_some()
    }

    /// Whether the player holds bribed access at `tick`.
    pub fn has_bribed_access(&self, tick: u64) -> bool {
        self.bribed_until_tick.is_some_and(|until| tick <= until)
    }

    /// Apply a reputation change, clamped to `[REP_MIN, REP_MAX]`.
    pub fn adjust_rep(&mut self, delta: i32) {
        self.rep = self.rep.saturating_add(delta).clamp(REP_MIN, REP_MAX);
    }

    /// Apply a heat change, clamped to `[0, HEAT_MAX]`.
    pub fn adjust_heat(&mut self, delta: i32) {
        let next = i32::from(self.heat).saturating_add(delta).clamp(0, i32::from(HEAT_MAX));
        self.heat = u8::try_from(next).unwrap_or(HEAT_MAX);
    }
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Type-specific contract terms. The variant determines the [`ContractType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractTerms {
    /// Crisis relief work paid by the city.
    Emergency {
        /// Base gold reward.
        reward: u64,
    },
    /// Grain run past the harbor paid by the smugglers.
    Smuggling {
        /// Base gold reward.
        reward: u64,
    },
    /// Bounty on a player, reward escrowed by the issuer.
    Bounty {
        /// Escrowed gold reward.
        reward: u64,
        /// Evidence strength the contractor must hold on the target.
        evidence_required: u32,
        /// Issued under a magistrate's warrant.
        warrant: bool,
    },
    /// Request for grain sacks, reward escrowed by the issuer.
    Supply {
        /// Sacks the contractor must hand over.
        sacks: u32,
        /// Escrowed gold reward.
        reward: u64,
    },
}

impl ContractTerms {
    /// The contract type these terms describe.
    pub const fn kind(&self) -> ContractType {
        match self {
            Self::Emergency { .. } => ContractType::Emergency,
            Self::Smuggling { .. } => ContractType::Smuggling,
            Self::Bounty { .. } => ContractType::Bounty,
            Self::Supply { .. } => ContractType::Supply,
        }
    }

    /// Base gold reward before stance and reputation adjustments.
    pub const fn base_reward(&self) -> u64 {
        match self {
            Self::Emergency { reward }
            | Self::Smuggling { reward }
            | Self::Bounty { reward, .. }
            | Self::Supply { reward, .. } => *reward,
        }
    }

    /// Gold held in escrow by the issuer, for player-posted contracts.
    pub const fn escrow(&self) -> Option<u64> {
        match self {
            Self::Bounty { reward, .. } | Self::Supply { reward, .. } => Some(*reward),
            Self::Emergency { .. } | Self::Smuggling { .. } => None,
        }
    }
}

/// A time-bound task players accept and deliver for reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// Unique identifier.
    pub id: ContractId,
    /// Type-specific terms.
    pub terms: ContractTerms,
    /// Lifecycle state.
    pub status: ContractStatus,
    /// Ticks until the deadline.
    pub deadline_ticks: u32,
    /// Tick the contract was posted.
    pub issued_at_tick: u64,
    /// Player currently holding the contract.
    pub owner: Option<PlayerRef>,
    /// Player who posted it; `None` for city-issued contracts.
    pub issuer: Option<PlayerRef>,
    /// Player the contract is aimed at (bounties).
    pub target: Option<PlayerRef>,
    /// Delivery mode chosen on accept.
    pub stance: Option<Stance>,
}

impl Contract {
    /// The contract's type.
    pub const fn kind(&self) -> ContractType {
        self.terms.kind()
    }

    /// Whether `player` currently owns this contract.
    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner.as_ref().is_some_and(|owner| owner.id == player)
    }

    /// Whether `player` posted this contract.
    pub fn is_issued_by(&self, player: PlayerId) -> bool {
        self.issuer.as_ref().is_some_and(|issuer| issuer.id == player)
    }
}

// ---------------------------------------------------------------------------
// Crisis and institutions
// ---------------------------------------------------------------------------

/// The active crisis occupying the singleton slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crisis {
    /// Which crisis.
    pub kind: CrisisKind,
    /// Pressure multiplier, 1 to 3.
    pub severity: u8,
    /// Ticks until it resolves as failed.
    pub ticks_left: u32,
    /// Duration it started with.
    pub total_ticks: u32,
    /// Tick it started on.
    pub started_at_tick: u64,
}

/// An institutional seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// Which seat. Also its identifier.
    pub kind: SeatKind,
    /// Current holder, if any.
    pub holder: Option<PlayerRef>,
    /// Ticks until the current term ends.
    pub tenure_ticks_left: u32,
    /// Ticks until the open election closes; zero when no election is open.
    pub election_window_ticks: u32,
}

impl Seat {
    /// A vacant seat with a fresh term on the clock.
    pub const fn vacant(kind: SeatKind, tenure_ticks: u32) -> Self {
        Self {
            kind,
            holder: None,
            tenure_ticks_left: tenure_ticks,
            election_window_ticks: 0,
        }
    }

    /// Whether an election is currently open.
    pub const fn election_open(&self) -> bool {
        self.election_window_ticks > 0
    }

    /// Whether `player` holds this seat.
    pub fn is_held_by(&self, player: PlayerId) -> bool {
        self.holder.as_ref().is_some_and(|holder| holder.id == player)
    }

    /// Name shown for the seat's occupant.
    ///
    /// Vacant seats show an NPC placeholder unless an election is open.
    pub fn display_name(&self) -> &str {
        match &self.holder {
            Some(holder) => &holder.name,
            None if self.election_open() => "(election underway)",
            None => self.kind.npc_placeholder(),
        }
    }
}

/// A permit allowing emergency work while permits are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permit {
    /// Unique identifier.
    pub id: PermitId,
    /// Player the permit was issued to.
    pub holder: PlayerRef,
    /// Ticks until it lapses.
    pub ticks_left: u32,
}

// ---------------------------------------------------------------------------
// Finance
// ---------------------------------------------------------------------------

/// Terms shared by loans and obligations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtTerms {
    /// Who owes.
    pub debtor: PlayerRef,
    /// Who is owed; `None` when the city is the creditor.
    pub creditor: Option<PlayerRef>,
    /// Gold owed.
    pub amount_due: u64,
    /// Tick the debt falls due.
    pub due_tick: u64,
    /// Lifecycle state.
    pub status: DebtStatus,
    /// When the debt was opened.
    pub created_at: DateTime<Utc>,
    /// When the debt reached a terminal state.
    pub closed_at: Option<DateTime<Utc>>,
}

impl DebtTerms {
    /// Whether `player` is the creditor.
    pub fn is_creditor(&self, player: PlayerId) -> bool {
        self.creditor.as_ref().is_some_and(|creditor| creditor.id == player)
    }
}

/// A gold loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    /// Unique identifier.
    pub id: LoanId,
    /// Gold handed to the borrower.
    pub principal: u64,
    /// Repayment terms.
    pub terms: DebtTerms,
}

/// A pledged obligation of gold, not backed by a cash advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    /// Unique identifier.
    pub id: ObligationId,
    /// What the pledge was for.
    pub reason: String,
    /// Repayment terms.
    pub terms: DebtTerms,
}

// ---------------------------------------------------------------------------
// Intel
// ---------------------------------------------------------------------------

/// A rumor circulating in the city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rumor {
    /// Unique identifier.
    pub id: RumorId,
    /// Who started it.
    pub author: PlayerRef,
    /// Who it is about.
    pub subject: Option<PlayerRef>,
    /// What is being said.
    pub text: String,
    /// How believable it is, 0 to 100.
    pub credibility: u8,
    /// How far it has travelled.
    pub spread: u8,
    /// Ticks until it is forgotten.
    pub decay_ticks: u32,
}

/// An evidence dossier one player holds on another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Unique identifier.
    pub id: EvidenceId,
    /// Who compiled it.
    pub holder: PlayerRef,
    /// Who it incriminates.
    pub target: PlayerRef,
    /// Accumulated strength.
    pub strength: u32,
    /// Ticks until it goes stale.
    pub ticks_left: u32,
}

/// A scrying vision of another player's circumstances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScryReport {
    /// Unique identifier.
    pub id: ScryReportId,
    /// Who scried.
    pub holder: PlayerRef,
    /// Who was seen.
    pub target: PlayerRef,
    /// Gold the target held at the time.
    pub gold_seen: u64,
    /// Where the target stood.
    pub location_seen: District,
    /// The target's heat at the time.
    pub heat_seen: u8,
    /// Ticks until the vision fades.
    pub ticks_left: u32,
}

/// A copy of another player's diplomatic mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intercept {
    /// Unique identifier.
    pub id: InterceptId,
    /// Who intercepted.
    pub holder: PlayerRef,
    /// Sender of the original.
    pub from: PlayerRef,
    /// Recipient of the original.
    pub to: PlayerRef,
    /// Copied text.
    pub text: String,
    /// Ticks until the copy is burned.
    pub ticks_left: u32,
}

/// A relic held by a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relic {
    /// Unique identifier.
    pub id: RelicId,
    /// Which relic.
    pub kind: RelicKind,
    /// Who found it.
    pub holder: PlayerRef,
    /// Ticks until its power fades.
    pub ticks_left: u32,
}

/// A funded civic project under construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier.
    pub id: ProjectId,
    /// Which project.
    pub kind: ProjectKind,
    /// Who paid for it.
    pub sponsor: PlayerRef,
    /// Ticks until completion.
    pub ticks_left: u32,
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// An entry in the world's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Monotonically increasing identifier.
    pub id: EventId,
    /// World tick it happened on.
    pub tick: u64,
    /// World day it happened on.
    pub day: u32,
    /// Category.
    pub kind: EventKind,
    /// Narrative text.
    pub text: String,
    /// Player most concerned, if any.
    pub player: Option<PlayerId>,
    /// Wall-clock time it was recorded.
    pub created_at: DateTime<Utc>,
}

/// A public chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Monotonically increasing identifier.
    pub id: ChatMessageId,
    /// Who said it.
    pub author: PlayerRef,
    /// What was said.
    pub text: String,
    /// Wall-clock time it was posted.
    pub created_at: DateTime<Utc>,
}

/// A private diplomatic letter between two players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiplomaticMessage {
    /// Monotonically increasing identifier.
    pub id: DiplomaticMessageId,
    /// Sender.
    pub from: PlayerRef,
    /// Recipient.
    pub to: PlayerRef,
    /// Letter text.
    pub text: String,
    /// Wall-clock time it was sent.
    pub created_at: DateTime<Utc>,
}
