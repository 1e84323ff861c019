//! Static definition catalogs for crises, projects, and relics.
//!
//! Each catalog is an exhaustive `match` over its kind enum, so adding a
//! variant without a definition fails to compile. The tests walk each
//! kind's `ALL` table to check that every definition is well formed.

use granary_types::{CrisisKind, GrainTier, ProjectKind, RelicKind, UnrestTier};

// ---------------------------------------------------------------------------
// Crises
// ---------------------------------------------------------------------------

/// Registered definition of one crisis kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrisisDef {
    /// Which crisis.
    pub kind: CrisisKind,
    /// Display name.
    pub name: &'static str,
    /// Percent chance per tick of starting when the trigger holds.
    pub chance_pct: u32,
    /// Pressure multiplier once active.
    pub severity: u8,
    /// Ticks until it resolves as failed.
    pub duration_ticks: u32,
    /// Gold a responder must pay.
    pub response_gold: u64,
    /// Sacks of grain a responder must hand over.
    pub response_sacks: u32,
    /// Reputation granted to the responder.
    pub response_rep: i32,
}

impl CrisisDef {
    /// Whether the world's tiers allow this crisis to start.
    pub const fn triggers(&self, grain: GrainTier, unrest: UnrestTier) -> bool {
        match self.kind {
            CrisisKind::Blight => matches!(grain, GrainTier::Critical | GrainTier::Scarce),
            CrisisKind::BreadRiot => matches!(unrest, UnrestTier::Unstable | UnrestTier::Rioting),
            CrisisKind::Plague => {
                matches!(grain, GrainTier::Critical) && !matches!(unrest, UnrestTier::Calm)
            }
            CrisisKind::HarborFire => true,
        }
    }
}

/// Definition of a crisis kind.
pub const fn crisis_def(kind: CrisisKind) -> CrisisDef {
    match kind {
        CrisisKind::Blight => CrisisDef {
            kind,
            name: "Blight",
            chance_pct: 10,
            severity: 2,
            duration_ticks: 6,
            response_gold: 40,
            response_sacks: 0,
            response_rep: 5,
        },
        CrisisKind::BreadRiot => CrisisDef {
            kind,
            name: "Bread riot",
            chance_pct: 15,
            severity: 3,
            duration_ticks: 4,
            response_gold: 30,
            response_sacks: 4,
            response_rep: 6,
        },
        CrisisKind::Plague => CrisisDef {
            kind,
            name: "Plague",
            chance_pct: 8,
            severity: 3,
            duration_ticks: 8,
            response_gold: 60,
            response_sacks: 0,
            response_rep: 8,
        },
        CrisisKind::HarborFire => CrisisDef {
            kind,
            name: "Harbor fire",
            chance_pct: 2,
            severity: 1,
            duration_ticks: 4,
            response_gold: 25,
            response_sacks: 0,
            response_rep: 4,
        },
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// Registered definition of one civic project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectDef {
    /// Which project.
    pub kind: ProjectKind,
    /// Display name.
    pub name: &'static str,
    /// Gold the sponsor pays.
    pub cost: u64,
    /// Ticks until completion.
    pub build_ticks: u32,
    /// Reputation granted to the sponsor on completion.
    pub sponsor_rep: i32,
}

/// Ward network ticks granted when a ward network completes.
pub const WARD_NETWORK_TICKS: u32 = 12;

/// Grain units released when a grain cellar completes.
pub const GRAIN_CELLAR_UNITS: u32 = 60;

/// Unrest removed when a festival completes.
pub const FESTIVAL_CALM: u8 = 10;

/// Definition of a project kind.
pub const fn project_def(kind: ProjectKind) -> ProjectDef {
    match kind {
        ProjectKind::WardNetwork => ProjectDef {
            kind,
            name: "Ward network",
            cost: 80,
            build_ticks: 4,
            sponsor_rep: 4,
        },
        ProjectKind::GrainCellar => ProjectDef {
            kind,
            name: "Grain cellar",
            cost: 60,
            build_ticks: 3,
            sponsor_rep: 5,
        },
        ProjectKind::Festival => ProjectDef {
            kind,
            name: "Festival",
            cost: 50,
            build_ticks: 2,
            sponsor_rep: 3,
        },
    }
}

// ---------------------------------------------------------------------------
// Relics
// ---------------------------------------------------------------------------

/// Registered definition of one relic kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelicDef {
    /// Which relic.
    pub kind: RelicKind,
    /// Display name.
    pub name: &'static str,
    /// Relative weight when a search turns something up.
    pub weight: u32,
    /// Ticks the relic stays with its holder.
    pub duration_ticks: u32,
}

/// Grain units a harvest idol returns to the city when it fades.
pub const HARVEST_IDOL_UNITS: u32 = 30;

/// Heat a quiet mask removes when it crumbles.
pub const QUIET_MASK_COOLING: i32 = 4;

/// Reputation a crown shard grants when it fades.
pub const CROWN_SHARD_REP: i32 = 5;

/// Definition of a relic kind.
pub const fn relic_def(kind: RelicKind) -> RelicDef {
    match kind {
        RelicKind::HarvestIdol => RelicDef {
            kind,
            name: "Harvest idol",
            weight: 5,
            duration_ticks: 6,
        },
        RelicKind::QuietMask => RelicDef {
            kind,
            name: "Quiet mask",
            weight: 3,
            duration_ticks: 4,
        },
        RelicKind::CrownShard => RelicDef {
            kind,
            name: "Crown shard",
            weight: 1,
            duration_ticks: 8,
        },
    }
}

/// Pick a relic kind given a roll in `0..total_relic_weight()`.
pub fn relic_for_roll(roll: u32) -> RelicKind {
    let mut remaining = roll;
    for kind in RelicKind::ALL {
        let weight = relic_def(kind).weight;
        if remaining < weight {
            return kind;
        }
        remaining = remaining.saturating_sub(weight);
    }
    RelicKind::HarvestIdol
}

/// Sum of every relic weight.
pub fn total_relic_weight() -> u32 {
    RelicKind::ALL
        .iter()
        .map(|&kind| relic_def(kind).weight)
        .fold(0, u32::saturating_add)
}
