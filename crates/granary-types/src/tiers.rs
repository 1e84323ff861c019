//! Tier and narrative derivation.
//!
//! Pure mappings from the world's scalar resources to categorical tiers,
//! the one-line narratives shown when a tier changes, and the overall
//! [`Situation`] of the city. Nothing here stores state: the world keeps
//! only the scalars and derives tiers on demand, so a tier can never drift
//! from the value it describes.

use serde::{Deserialize, Serialize};

/// Grain supply above this value is [`GrainTier::Stable`].
pub const GRAIN_STABLE_ABOVE: u32 = 200;

/// Grain supply above this value (and at most [`GRAIN_STABLE_ABOVE`]) is [`GrainTier::Tight`].
pub const GRAIN_TIGHT_ABOVE: u32 = 100;

/// Grain supply above this value (and at most [`GRAIN_TIGHT_ABOVE`]) is [`GrainTier::Scarce`].
pub const GRAIN_SCARCE_ABOVE: u32 = 40;

/// Maximum unrest value.
pub const UNREST_MAX: u8 = 100;

/// Categorical bucket for the city's grain supply, ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GrainTier {
    /// 40 or less.
    Critical,
    /// 41 to 100.
    Scarce,
    /// 101 to 200.
    Tight,
    /// More than 200.
    Stable,
}

/// Categorical bucket for civic unrest, ordered calmest to most violent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnrestTier {
    /// 10 or less.
    Calm,
    /// 11 to 30.
    Uneasy,
    /// 31 to 60.
    Unstable,
    /// More than 60.
    Rioting,
}

/// Map a grain supply value to its tier.
pub const fn grain_tier(supply: u32) -> GrainTier {
    if supply > GRAIN_STABLE_ABOVE {
        GrainTier::Stable
    } else if supply > GRAIN_TIGHT_ABOVE {
        GrainTier::Tight
    } else if supply > GRAIN_SCARCE_ABOVE {
        GrainTier::Scarce
    } else {
        GrainTier::Critical
    }
}

/// Map an unrest value to its tier.
pub const fn unrest_tier(value: u8) -> UnrestTier {
    if value <= 10 {
        UnrestTier::Calm
    } else if value <= 30 {
        UnrestTier::Uneasy
    } else if value <= 60 {
        UnrestTier::Unstable
    } else {
        UnrestTier::Rioting
    }
}

/// Percent chance that an accepted contract is fulfilled when its deadline
/// runs out, given the grain tier at that moment.
pub const fn fulfill_chance_for_tier(tier: GrainTier) -> u32 {
    match tier {
        GrainTier::Stable => 70,
        GrainTier::Tight => 55,
        GrainTier::Scarce => 40,
        GrainTier::Critical => 25,
    }
}

/// Base market price of one sack of grain, in gold, for a grain tier.
pub const fn base_price_for_tier(tier: GrainTier) -> u64 {
    match tier {
        GrainTier::Stable => 8,
        GrainTier::Tight => 12,
        GrainTier::Scarce => 18,
        GrainTier::Critical => 28,
    }
}

/// Narrative line for a grain tier change. Empty when unchanged.
pub const fn grain_transition_line(prev: GrainTier, new: GrainTier) -> &'static str {
    match (prev, new) {
        (GrainTier::Critical, GrainTier::Critical)
        | (GrainTier::Scarce, GrainTier::Scarce)
        | (GrainTier::Tight, GrainTier::Tight)
        | (GrainTier::Stable, GrainTier::Stable) => "",
        (_, GrainTier::Stable) => "The granaries are full again; bakers light their ovens before dawn.",
        (GrainTier::Stable, GrainTier::Tight) => "Granary stewards begin counting sacks twice.",
        (_, GrainTier::Tight) => "Grain trickles back into the stores, though rations stay thin.",
        (GrainTier::Stable | GrainTier::Tight, GrainTier::Scarce) => {
            "Bread lines stretch around the market square."
        }
        (_, GrainTier::Scarce) => "A few carts of grain reach the city; the worst may be over.",
        (_, GrainTier::Critical) => "The granary floors show through. The city is starving.",
    }
}

/// Narrative line for an unrest tier change. Empty when unchanged.
pub const fn unrest_transition_line(prev: UnrestTier, new: UnrestTier) -> &'static str {
    match (prev, new) {
        (UnrestTier::Calm, UnrestTier::Calm)
        | (UnrestTier::Uneasy, UnrestTier::Uneasy)
        | (UnrestTier::Unstable, UnrestTier::Unstable)
        | (UnrestTier::Rioting, UnrestTier::Rioting) => "",
        (_, UnrestTier::Calm) => "The streets settle into their old, quiet rhythm.",
        (UnrestTier::Calm, UnrestTier::Uneasy) => "Grumbling spreads through the taverns.",
        (_, UnrestTier::Uneasy) => "Tempers cool, though the guard keeps its doubled watch.",
        (UnrestTier::Calm | UnrestTier::Uneasy, UnrestTier::Unstable) => {
            "Crowds gather at the palace gates, shouting for bread."
        }
        (_, UnrestTier::Unstable) => "The fires die down, but the crowds have not gone home.",
        (_, UnrestTier::Rioting) => "Riots break out. Shutters slam across every district.",
    }
}

/// Overall state of the city, derived from both tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Situation {
    /// Stable grain, calm streets.
    Prosperous,
    /// Stable grain, uneasy streets.
    Grumbling,
    /// Stable grain, unstable streets.
    Restless,
    /// Stable grain, rioting streets.
    Unruly,
    /// Tight grain, calm streets.
    Watchful,
    /// Tight grain, uneasy streets.
    Strained,
    /// Tight grain, unstable streets.
    Tense,
    /// Tight grain, rioting streets.
    Volatile,
    /// Scarce grain, calm streets.
    Lean,
    /// Scarce grain, uneasy streets.
    Hungry,
    /// Scarce grain, unstable streets.
    Fraying,
    /// Scarce grain, rioting streets.
    Breaking,
    /// Critical grain, calm streets.
    Grim,
    /// Critical grain, uneasy streets.
    Desperate,
    /// Critical grain, unstable streets.
    Starving,
    /// Critical grain, rioting streets.
    Collapse,
}

impl Situation {
    /// Headline shown on the city board.
    pub const fn headline(self) -> &'static str {
        match self {
            Self::Prosperous => "The city prospers.",
            Self::Grumbling => "Full bellies, sharp tongues.",
            Self::Restless => "Plenty of bread, no peace.",
            Self::Unruly => "Riots amid full granaries.",
            Self::Watchful => "The city watches its stores.",
            Self::Strained => "Thin rations, thinner patience.",
            Self::Tense => "A tense and hungry quiet.",
            Self::Volatile => "One spark from open revolt.",
            Self::Lean => "Lean days, endured in silence.",
            Self::Hungry => "Hunger gnaws at every district.",
            Self::Fraying => "The city's order is fraying.",
            Self::Breaking => "Hunger and riot feed each other.",
            Self::Grim => "Grim, starving silence.",
            Self::Desperate => "Desperation in the bread lines.",
            Self::Starving => "The city is starving and angry.",
            Self::Collapse => "Order has collapsed.",
        }
    }
}

/// Derive the city's situation from its grain and unrest tiers.
///
/// A hand-authored table over all sixteen combinations.
pub const fn derive_situation(grain: GrainTier, unrest: UnrestTier) -> Situation {
    match (grain, unrest) {
        (GrainTier::Stable, UnrestTier::Calm) => Situation::Prosperous,
        (GrainTier::Stable, UnrestTier::Uneasy) => Situation::Grumbling,
        (GrainTier::Stable, UnrestTier::Unstable) => Situation::Restless,
        (GrainTier::Stable, UnrestTier::Rioting) => Situation::Unruly,
        (GrainTier::Tight, UnrestTier::Calm) => Situation::Watchful,
        (GrainTier::Tight, UnrestTier::Uneasy) => Situation::Strained,
        (GrainTier::Tight, UnrestTier::Unstable) => Situation::Tense,
        (GrainTier::Tight, UnrestTier::Rioting) => Situation::Volatile,
        (GrainTier::Scarce, UnrestTier::Calm) => Situation::Lean,
        (GrainTier::Scarce, UnrestTier::Uneasy) => Situation::Hungry,
        (GrainTier::Scarce, UnrestTier::Unstable) => Situation::Fraying,
        (GrainTier::Scarce, UnrestTier::Rioting) => Situation::Breaking,
        (GrainTier::Critical, UnrestTier::Calm) => Situation::Grim,
        (GrainTier::Critical, UnrestTier::Uneasy) => Situation::Desperate,
        (GrainTier::Critical, UnrestTier::Unstable) => Situation::Starving,
        (GrainTier::Critical, UnrestTier::Rioting) => Situation::Collapse,
    }
}
