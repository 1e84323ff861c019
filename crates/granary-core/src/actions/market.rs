//! The grain exchange.
//!
//! Prices derive from the grain tier's base price, the tax rate, and any
//! market restriction in force. Grain moves between the city stores and
//! player stock at [`SACK_UNITS`] units per sack.

use chrono::{DateTime, Utc};
use tracing::debug;

use granary_types::{District, GrainTier, PlayerId, base_price_for_tier};

use crate::state::{Denial, GameState, HandlerResult, SACK_UNITS, Toast};

/// Buy and sell price of one sack, in gold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    /// What a player pays per sack.
    pub buy: u64,
    /// What a player receives per sack.
    pub sell: u64,
}

fn scale(amount: u64, pct: u64) -> u64 {
    amount.saturating_mul(pct).checked_div(100).unwrap_or(0)
}

/// Quote sack prices for a grain tier, tax rate, and restriction state.
///
/// Tax raises the buy price and lowers the sell price by the same percent.
/// A restriction adds another 25% to buying and takes 25% off selling.
/// Selling never pays less than 1 gold.
pub fn quote_prices(tier: GrainTier, tax_pct: u8, restricted: bool) -> PriceQuote {
    let base = base_price_for_tier(tier);
    let tax = u64::from(tax_pct);
    let mut buy = scale(base, 100_u64.saturating_add(tax));
    let mut sell = scale(base, 100_u64.saturating_sub(tax));
    if restricted {
        buy = scale(buy, 125);
        sell = scale(sell, 75);
    }
    PriceQuote {
        buy,
        sell: sell.max(1),
    }
}

/// Current prices in the world.
pub fn current_prices(state: &GameState) -> PriceQuote {
    quote_prices(
        state.world.grain_tier(),
        state.policy.tax_rate_pct,
        state.world.markets_restricted(),
    )
}

fn require_at_market(state: &GameState, actor: PlayerId) -> Result<(), Denial> {
    let player = state.live_player(actor)?;
    if player.travel.is_some() {
        return Err(Denial::new("You cannot trade while on the road."));
    }
    if player.location != District::Market {
        return Err(Denial::new("You must be at the market to trade grain."));
    }
    Ok(())
}

/// Buy sacks of grain from the city stores.
pub fn buy_grain(
    state: &mut GameState,
    actor: PlayerId,
    sacks: u32,
    _now: DateTime<Utc>,
) -> HandlerResult {
    if sacks == 0 {
        return Err(Denial::new("Buy at least one sack."));
    }
    require_at_market(state, actor)?;
    let units = sacks.saturating_mul(SACK_UNITS);
    if units > state.world.grain_supply {
        return Err(Denial::new("The stores cannot spare that much."));
    }
    let cost = current_prices(state).buy.saturating_mul(u64::from(sacks));
    let player = state.live_player_mut(actor)?;
    if player.gold < cost {
        return Err(Denial::new(format!("That costs {cost} gold.")));
    }
    player.gold = player.gold.saturating_sub(cost);
    player.grain = player.grain.saturating_add(sacks);
    state.world.remove_grain(units);
    debug!(player = %actor, sacks, cost, "Grain bought");
    Ok(Toast::success(format!("You buy {sacks} sacks for {cost} gold.")))
}

/// Sell sacks of grain into the city stores.
pub fn sell_grain(
    state: &mut GameState,
    actor: PlayerId,
    sacks: u32,
    _now: DateTime<Utc>,
) -> HandlerResult {
    if sacks == 0 {
        return Err(Denial::new("Sell at least one sack."));
    }
    require_at_market(state, actor)?;
    let earned = current_prices(state).sell.saturating_mul(u64::from(sacks));
    let player = state.live_player_mut(actor)?;
    if player.grain < sacks {
        return Err(Denial::new("You do not have that many sacks."));
    }
    player.grain = player.grain.saturating_sub(sacks);
    player.gold = player.gold.saturating_add(earned);
    state.world.add_grain(sacks.saturating_mul(SACK_UNITS));
    debug!(player = %actor, sacks, earned, "Grain sold");
    Ok(Toast::success(format!("You sell {sacks} sacks for {earned} gold.")))
}

#[cfg(test)]
mod tests {
    use granary_types::Travel;

    use super::*;
    use crate::state::test_support::*;

    #[test]
    fn untaxed_unrestricted_price_is_base() {
        let q = quote_prices(GrainTier::Stable, 0, false);
        assert_eq!(q, PriceQuote { buy: 8, sell: 8 });
    }

    #[test]
    fn tax_widens_the_spread() {
        let q = quote_prices(GrainTier::Scarce, 50, false);
        assert_eq!(q.buy, 27);
        assert_eq!(q.sell, 9);
    }

    #[test]
    fn restriction_raises_buy_and_lowers_sell() {
        let open = quote_prices(GrainTier::Critical, 10, false);
        let shut = quote_prices(GrainTier::Critical, 10, true);
        assert!(shut.buy > open.buy);
        assert!(shut.sell < open.sell);
    }

    #[test]
    fn sell_price_never_drops_below_one() {
        assert!(quote_prices(GrainTier::Stable, 50, true).sell >= 1);
    }

    #[test]
    fn buying_moves_units_out_of_the_stores() {
        let mut s = state();
        s.policy.tax_rate_pct = 0;
        let p = add_player(&mut s, "Mara", 100);
        let before = s.world.grain_supply;
        assert!(buy_grain(&mut s, p, 2, now()).is_ok());
        assert_eq!(player(&s, p).grain, 2);
        assert_eq!(player(&s, p).gold, 84);
        assert_eq!(s.world.grain_supply, before - 2 * SACK_UNITS);
    }

    #[test]
    fn selling_returns_units_to_the_stores() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 0);
        player_mut(&mut s, p).grain = 3;
        let before = s.world.grain_supply;
        assert!(sell_grain(&mut s, p, 3, now()).is_ok());
        assert_eq!(player(&s, p).grain, 0);
        assert!(player(&s, p).gold > 0);
        assert_eq!(s.world.grain_supply, before + 3 * SACK_UNITS);
    }

    #[test]
    fn trading_requires_the_market() {
        let mut s = state();
        let p = add_player(&mut s, "Mara", 100);
        player_mut(&mut s, p).location = District::Docks;
        assert!(buy_grain(&mut s, p, 1, now()).is_err());

        player_mut(&mut s, p).location = District::Market;
        player_mut(&mut s, p).travel = Some(Travel {
            to: District::Temple,
            ticks_left: 1,
        });
        assert!(buy_grain(&mut s, p, 1, now()).is_err());
    }

    #[test]
    fn cannot_buy_more_than_the_stores_hold() {
        let mut s = state();
        s.world.grain_supply = 4;
        let p = add_player(&mut s, "Mara", 1_000);
        assert!(buy_grain(&mut s, p, 1, now()).is_err());
        assert_eq!(s.world.grain_supply, 4);
    }
}
