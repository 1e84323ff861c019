//! Enumeration types for the Granary simulation.
//!
//! Every "kind" of contract, crisis, project, relic, and seat is a closed
//! enum with an `ALL` table so catalogs keyed by these enums can be checked
//! for exhaustiveness in tests.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Half of a world day. Each day has two ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Subphase {
    /// First tick of the day. The daily harvest lands here.
    Morning,
    /// Second tick of the day.
    Evening,
}

// ---------------------------------------------------------------------------
// Geography
// ---------------------------------------------------------------------------

/// A district of the city a player can stand in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum District {
    /// Grain exchange. Buying and selling happens here.
    Market,
    /// Harbor wharves.
    Docks,
    /// Temple quarter.
    Temple,
    /// Seat of the city's institutions.
    Palace,
}

impl District {
    /// All districts.
    pub const ALL: [Self; 4] = [Self::Market, Self::Docks, Self::Temple, Self::Palace];

    /// Number of ticks it takes to walk between two districts.
    ///
    /// Zero when `from == to`; the Docks are a longer walk from everything.
    pub const fn travel_ticks(from: Self, to: Self) -> u32 {
        match (from, to) {
            (Self::Market, Self::Market)
            | (Self::Docks, Self::Docks)
            | (Self::Temple, Self::Temple)
            | (Self::Palace, Self::Palace) => 0,
            (Self::Docks, _) | (_, Self::Docks) => 2,
            _ => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Category of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContractType {
    /// City-issued relief work during a crisis. Gated by permits.
    Emergency,
    /// Grain run past the harbor. Blocked under embargo.
    Smuggling,
    /// Player-posted bounty against a high-heat target.
    Bounty,
    /// Player-posted request for grain sacks, reward held in escrow.
    Supply,
}

/// Lifecycle state of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContractStatus {
    /// Posted and waiting for a taker.
    Issued,
    /// Held by exactly one owner.
    Accepted,
    /// Deadline roll succeeded; waiting for the owner to deliver.
    Fulfilled,
    /// Delivered and paid out.
    Completed,
    /// Deadline roll failed.
    Failed,
    /// Withdrawn by its issuer.
    Cancelled,
}

impl ContractStatus {
    /// Whether the contract is still live (and therefore persisted).
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Issued | Self::Accepted)
    }
}

/// Delivery mode chosen when accepting a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stance {
    /// Baseline reward and heat.
    Careful,
    /// More reward, more heat.
    Fast,
    /// Less reward, less heat.
    Quiet,
}

// ---------------------------------------------------------------------------
// Crises, projects, relics
// ---------------------------------------------------------------------------

/// A systemic hazard that can occupy the crisis slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CrisisKind {
    /// Crop blight when grain is already scarce.
    Blight,
    /// Bread riot when the streets are restless.
    BreadRiot,
    /// Plague in a hungry, unstable city.
    Plague,
    /// Fire in the harbor warehouses.
    HarborFire,
}

impl CrisisKind {
    /// Every crisis kind, in catalog evaluation order.
    pub const ALL: [Self; 4] = [Self::Blight, Self::BreadRiot, Self::Plague, Self::HarborFire];
}

/// A civic project players can fund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProjectKind {
    /// Network of wards that dampens rumor spread.
    WardNetwork,
    /// Sealed cellar that releases grain into the city stores.
    GrainCellar,
    /// Public festival that calms the streets.
    Festival,
}

impl ProjectKind {
    /// Every project kind.
    pub const ALL: [Self; 3] = [Self::WardNetwork, Self::GrainCellar, Self::Festival];
}

/// A relic that can be found by searching the old quarters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelicKind {
    /// Returns grain to the city when its blessing fades.
    HarvestIdol,
    /// Cools its holder's heat when it crumbles.
    QuietMask,
    /// Grants reputation to its holder when it fades.
    CrownShard,
}

impl RelicKind {
    /// Every relic kind, in catalog order.
    pub const ALL: [Self; 3] = [Self::HarvestIdol, Self::QuietMask, Self::CrownShard];
}

// ---------------------------------------------------------------------------
// Institutions
// ---------------------------------------------------------------------------

/// An institutional seat. Doubles as the seat's identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeatKind {
    /// Controls the smuggling embargo.
    HarborMaster,
    /// Controls market restrictions.
    GrainWarden,
    /// Controls tax, permits, and warrants.
    Magistrate,
}

impl SeatKind {
    /// Every seat in the city.
    pub const ALL: [Self; 3] = [Self::HarborMaster, Self::GrainWarden, Self::Magistrate];

    /// Name shown while the seat is vacant and no election is open.
    ///
    /// The placeholder carries no mechanical privilege.
    pub const fn npc_placeholder(self) -> &'static str {
        match self {
            Self::HarborMaster => "Old Captain Varro",
            Self::GrainWarden => "Steward Ilse",
            Self::Magistrate => "Acting Magistrate Dunmore",
        }
    }

    /// Stable key used in persistence rows.
    pub const fn key(self) -> &'static str {
        match self {
            Self::HarborMaster => "harbor_master",
            Self::GrainWarden => "grain_warden",
            Self::Magistrate => "magistrate",
        }
    }
}

// ---------------------------------------------------------------------------
// Finance
// ---------------------------------------------------------------------------

/// Lifecycle state shared by loans and obligations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DebtStatus {
    /// Not yet due.
    Active,
    /// Past due and already penalized once.
    Overdue,
    /// Paid in full.
    Settled,
    /// Waived by the creditor.
    Forgiven,
    /// Abandoned by the debtor.
    Defaulted,
}

impl DebtStatus {
    /// Whether the debt can still change hands.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Active | Self::Overdue)
    }
}

// ---------------------------------------------------------------------------
// Logs and trackers
// ---------------------------------------------------------------------------

/// Category of an entry in the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A grain or unrest tier changed.
    TierChange,
    /// A contract changed state.
    Contract,
    /// A crisis started or resolved.
    Crisis,
    /// An election opened or closed.
    Election,
    /// A policy toggle changed.
    Policy,
    /// A loan or obligation changed state.
    Finance,
    /// Rumors, evidence, scrying, interception.
    Intel,
    /// A civic project was funded or completed.
    Project,
    /// A relic was found or faded.
    Relic,
    /// Anything else the world announces.
    Notice,
}

/// Per-player action throttled by a tick-based cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CooldownKind {
    /// Listening for rumors in the taverns.
    GatherRumor,
    /// Building an evidence dossier.
    Investigate,
    /// Scrying on another player.
    Scry,
    /// Intercepting diplomatic mail.
    Intercept,
    /// Searching for relics.
    SearchRelic,
    /// Posting in public chat.
    Chat,
}

/// Per-player action capped by a daily budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BudgetKind {
    /// Publishing evidence against another player.
    PublishEvidence,
}
