//! Shared type definitions for the Granary world simulation.
//!
//! This crate is the single source of truth for every type used across the
//! Granary workspace. It has no runtime dependencies beyond serialization,
//! so the persistence layer can decode rows without pulling in the engine.
//!
//! # Modules
//!
//! - [`ids`] -- Player UUIDs and sequential record identifiers
//! - [`enums`] -- Closed enumerations (districts, contract types, seats, ...)
//! - [`tiers`] -- Grain and unrest tiers and the narrative derived from them
//! - [`structs`] -- Entity structs owned by the world aggregate

pub mod enums;
pub mod ids;
pub mod structs;
pub mod tiers;

// Re-export all public types at crate root for convenience.
pub use enums::{
    BudgetKind, ContractStatus, ContractType, CooldownKind, CrisisKind, DebtStatus, District,
    EventKind, ProjectKind, RelicKind, SeatKind, Stance, Subphase,
};
pub use ids::{
    ChatMessageId, ContractId, DiplomaticMessageId, EventId, EvidenceId, InterceptId, LoanId,
    ObligationId, PermitId, PlayerId, ProjectId, RelicId, RumorId, ScryReportId,
};
pub use structs::{
    ChatMessage, Contract, ContractTerms, Crisis, DebtTerms, DiplomaticMessage, Event, Evidence,
    HEAT_MAX, Intercept, Loan, Obligation, Permit, Player, PlayerRef, Project, REP_MAX, REP_MIN,
    Relic, Rumor, ScryReport, Seat, Travel,
};
pub use tiers::{
    GrainTier, Situation, UnrestTier, base_price_for_tier, derive_situation,
    fulfill_chance_for_tier, grain_tier, grain_transition_line, unrest_tier,
    unrest_transition_line,
};
