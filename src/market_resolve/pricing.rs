use serde::{Deserialize, Serialize};

use super::markets::Outcome;
use crate::errors::{MarketError, Result};

// ============================================================================
// PRICING CONSTANTS
// ============================================================================

/// Constant-sum marginal pricing for binary markets
///
/// For a binary market (Yes/No):
/// - Price(YES) = yes_pool / (yes_pool + no_pool)
/// - Price(NO)  = no_pool  / (yes_pool + no_pool)
/// - Prices always sum to 1.0
///
/// The side with more backing is priced higher, so crowding into one outcome
/// makes it more expensive and the other side cheaper. A bet is priced at
/// the marginal price observed before the trade; a sell is priced as the
/// exact inverse of that bet, so selling straight back never returns more
/// than the bet put in.

/// Fixed-point scale for amounts, shares and prices (6 decimals)
pub const UNIT: u64 = 1_000_000;

/// Prices are quoted at the same 1e6 scale; YES + NO == PRICE_SCALE
pub const PRICE_SCALE: u64 = UNIT;

/// Basis point denominator
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Virtual value added to each side when pricing, keeps price defined
/// without adding value to the pools
pub const VIRTUAL_LIQUIDITY: u64 = UNIT;

/// Fee in asset units, rounded down
pub fn protocol_fee(amount: u64, fee_bps: u64) -> u64 {
    (amount as u128 * fee_bps as u128 / BPS_DENOMINATOR as u128) as u64
}

// ============================================================================
// POOL STATE
// ============================================================================

/// Snapshot of a market's pools, the only input the pricing functions need
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub yes_pool: u64,
    pub no_pool: u64,
    pub total_yes_shares: u64,
    pub total_no_shares: u64,
}

/// Price and share count for a prospective bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetQuote {
    pub outcome: Outcome,
    pub gross_amount: u64,
    pub fee: u64,
    pub net_amount: u64,
    pub shares: u64,
    /// Marginal price the bet is filled at (1e6 scale)
    pub price: u64,
}

/// Return for a prospective sell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellQuote {
    pub outcome: Outcome,
    pub shares: u64,
    pub gross_return: u64,
    pub fee: u64,
    pub net_return: u64,
    pub price: u64,
}

impl PoolState {
    /// No real value on either side yet
    pub fn is_unseeded(&self) -> bool {
        self.yes_pool == 0 && self.no_pool == 0
    }

    pub fn pool(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::Yes => self.yes_pool,
            Outcome::No => self.no_pool,
        }
    }

    pub fn total_shares(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::Yes => self.total_yes_shares,
            Outcome::No => self.total_no_shares,
        }
    }

    fn effective_pool(&self, outcome: Outcome) -> u128 {
        self.pool(outcome) as u128 + VIRTUAL_LIQUIDITY as u128
    }

    fn effective_total(&self) -> u128 {
        self.effective_pool(Outcome::Yes) + self.effective_pool(Outcome::No)
    }

    /// Marginal price of an outcome, 1e6 scale, always inside (0, PRICE_SCALE)
    pub fn price(&self, outcome: Outcome) -> u64 {
        let yes = if self.is_unseeded() {
            PRICE_SCALE / 2
        } else {
            let raw = self.effective_pool(Outcome::Yes) * PRICE_SCALE as u128 / self.effective_total();
            (raw as u64).clamp(1, PRICE_SCALE - 1)
        };
        match outcome {
            Outcome::Yes => yes,
            Outcome::No => PRICE_SCALE - yes,
        }
    }

    /// (price_yes, price_no), summing to exactly PRICE_SCALE
    pub fn prices(&self) -> (u64, u64) {
        (self.price(Outcome::Yes), self.price(Outcome::No))
    }

    /// Quote a bet of `gross_amount` on `outcome`
    ///
    /// fee = gross * fee_bps / 10000, net = gross - fee,
    /// shares = net / price(outcome), price taken before the trade.
    pub fn quote_bet(&self, outcome: Outcome, gross_amount: u64, fee_bps: u64) -> Result<BetQuote> {
        if gross_amount == 0 {
            return Err(MarketError::validation("bet amount must be positive"));
        }

        let fee = protocol_fee(gross_amount, fee_bps);
        let net_amount = gross_amount - fee;

        // net / (effective_pool / effective_total), kept exact until the final floor
        let shares = net_amount as u128 * self.effective_total() / self.effective_pool(outcome);
        let shares = u64::try_from(shares)
            .map_err(|_| MarketError::validation("bet amount too large"))?;

        Ok(BetQuote {
            outcome,
            gross_amount,
            fee,
            net_amount,
            shares,
            price: self.price(outcome),
        })
    }

    /// Quote selling `shares` of `outcome` back to the pool
    ///
    /// gross is the amount a bet would have to put in, at the state left
    /// after the sell, to buy exactly `shares`. With effective pools Y (this
    /// side) and T (both sides) before the sell, that is the smaller root of
    /// g·(T − g) = shares·(Y − g), rounded down. The result is also capped at
    /// the seller's pro-rata slice of that side's pool so the pool never goes
    /// negative.
    pub fn quote_sell(&self, outcome: Outcome, shares: u64, fee_bps: u64) -> Result<SellQuote> {
        if shares == 0 {
            return Err(MarketError::validation("share amount must be positive"));
        }

        let outstanding = self.total_shares(outcome);
        if shares > outstanding {
            return Err(MarketError::InsufficientShares {
                held: outstanding,
                requested: shares,
            });
        }

        let inverse = self.inverse_bet(outcome, shares)?;
        let slice = shares as u128 * self.pool(outcome) as u128 / outstanding as u128;
        let gross_return = inverse.min(slice) as u64;

        if gross_return == 0 {
            return Err(MarketError::validation("sell too small to return any value"));
        }

        let fee = protocol_fee(gross_return, fee_bps);

        Ok(SellQuote {
            outcome,
            shares,
            gross_return,
            fee,
            net_return: gross_return - fee,
            price: self.price(outcome),
        })
    }

    /// Net amount that buys `shares` of `outcome` from the post-sell state
    fn inverse_bet(&self, outcome: Outcome, shares: u64) -> Result<u128> {
        let too_large = || MarketError::validation("sell amount too large");

        let total = self.effective_total();
        let pool = self.effective_pool(outcome);
        let shares = shares as u128;

        let sum = total + shares;
        let product = shares.checked_mul(pool).and_then(|p| p.checked_mul(4)).ok_or_else(too_large)?;
        let discriminant = sum
            .checked_mul(sum)
            .and_then(|sq| sq.checked_sub(product))
            .ok_or_else(too_large)?;

        // Ceil of the root keeps the result at or below the exact value
        Ok((sum - isqrt_ceil(discriminant)) / 2)
    }
}

/// Integer square root, rounded up
fn isqrt_ceil(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let bits = 128 - n.leading_zeros();
    let mut x = 1u128 << ((bits + 1) / 2);
    loop {
        let y = (x + n / x) / 2;
        if y >= x {
            break;
        }
        x = y;
    }
    if x * x < n {
        x + 1
    } else {
        x
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn after_bet(pool: PoolState, quote: &BetQuote) -> PoolState {
        let mut next = pool;
        match quote.outcome {
            Outcome::Yes => {
                next.yes_pool += quote.net_amount;
                next.total_yes_shares += quote.shares;
            }
            Outcome::No => {
                next.no_pool += quote.net_amount;
                next.total_no_shares += quote.shares;
            }
        }
        next
    }

    #[test]
    fn test_fresh_pool_prices_even() {
        let pool = PoolState::default();
        assert_eq!(pool.prices(), (500_000, 500_000));
    }

    #[test]
    fn test_prices_sum_to_one() {
        let pools = [
            PoolState { yes_pool: 97 * UNIT, no_pool: 0, ..Default::default() },
            PoolState { yes_pool: 1, no_pool: 3, ..Default::default() },
            PoolState { yes_pool: 123_456_789, no_pool: 987_654_321, ..Default::default() },
        ];
        for pool in pools {
            let (yes, no) = pool.prices();
            assert_eq!(yes + no, PRICE_SCALE);
            assert!(yes > 0 && yes < PRICE_SCALE);
        }
    }

    #[test]
    fn test_fee_rounds_down() {
        assert_eq!(protocol_fee(100 * UNIT, 300), 3 * UNIT);
        assert_eq!(protocol_fee(33, 300), 0);
        assert_eq!(protocol_fee(34, 300), 1);
    }

    #[test]
    fn test_first_bet_fills_at_half() {
        let pool = PoolState::default();
        let quote = pool.quote_bet(Outcome::Yes, 100 * UNIT, 300).unwrap();

        assert_eq!(quote.fee, 3 * UNIT);
        assert_eq!(quote.net_amount, 97 * UNIT);
        assert_eq!(quote.shares, 194 * UNIT);
        assert_eq!(quote.price, 500_000);
    }

    #[test]
    fn test_bet_moves_price() {
        let pool = PoolState::default();
        let quote = pool.quote_bet(Outcome::Yes, 50 * UNIT, 0).unwrap();
        let next = after_bet(pool, &quote);

        // YES gets more expensive, NO cheaper
        assert!(next.price(Outcome::Yes) > pool.price(Outcome::Yes));
        assert!(next.price(Outcome::No) < pool.price(Outcome::No));

        // Same bet now buys fewer YES shares and more NO shares
        let again = next.quote_bet(Outcome::Yes, 50 * UNIT, 0).unwrap();
        let other = next.quote_bet(Outcome::No, 50 * UNIT, 0).unwrap();
        assert!(again.shares < quote.shares);
        assert!(other.shares > quote.shares);
    }

    #[test]
    fn test_zero_amounts_rejected() {
        let pool = PoolState::default();
        assert!(matches!(pool.quote_bet(Outcome::Yes, 0, 300), Err(MarketError::Validation(_))));
        assert!(matches!(pool.quote_sell(Outcome::Yes, 0, 300), Err(MarketError::Validation(_))));
    }

    #[test]
    fn test_sell_back_returns_no_more_than_paid() {
        let pool = PoolState::default();
        let gross = 100 * UNIT;
        let bet = pool.quote_bet(Outcome::Yes, gross, 300).unwrap();
        let next = after_bet(pool, &bet);

        let sell = next.quote_sell(Outcome::Yes, bet.shares, 300).unwrap();
        assert!(sell.net_return < gross);
        assert!(sell.gross_return <= next.yes_pool);
    }

    #[test]
    fn test_sell_back_without_fee_is_lossless_at_most() {
        let pool = PoolState::default();
        let bet = pool.quote_bet(Outcome::No, 10 * UNIT, 0).unwrap();
        let next = after_bet(pool, &bet);

        let sell = next.quote_sell(Outcome::No, bet.shares, 0).unwrap();
        assert!(sell.net_return <= 10 * UNIT);
        assert_eq!(sell.fee, 0);
    }

    #[test]
    fn test_sell_back_after_earlier_trades_never_profits() {
        // Earlier cheap YES holders and a heavy NO side
        let mut pool = PoolState::default();
        for (outcome, gross) in [(Outcome::Yes, 100 * UNIT), (Outcome::No, 1_000 * UNIT)] {
            let quote = pool.quote_bet(outcome, gross, 300).unwrap();
            pool = after_bet(pool, &quote);
        }

        let paid = 10 * UNIT;
        let bet = pool.quote_bet(Outcome::Yes, paid, 300).unwrap();
        let next = after_bet(pool, &bet);

        let sell = next.quote_sell(Outcome::Yes, bet.shares, 300).unwrap();
        assert!(sell.gross_return <= bet.net_amount);
        assert!(sell.net_return < paid, "net_return {} paid {}", sell.net_return, paid);
    }

    #[test]
    fn test_sell_inverts_bet_without_fee() {
        let mut pool = PoolState::default();
        let first = pool.quote_bet(Outcome::No, 250 * UNIT, 0).unwrap();
        pool = after_bet(pool, &first);

        let bet = pool.quote_bet(Outcome::Yes, 40 * UNIT, 0).unwrap();
        let next = after_bet(pool, &bet);
        let sell = next.quote_sell(Outcome::Yes, bet.shares, 0).unwrap();

        assert!(sell.gross_return <= 40 * UNIT);
        assert!(40 * UNIT - sell.gross_return <= 2);
    }

    #[test]
    fn test_extreme_imbalance_keeps_prices_inside_bounds() {
        let heavy_no = PoolState { no_pool: 1_000_000 * UNIT, ..Default::default() };
        assert_eq!(heavy_no.prices(), (1, PRICE_SCALE - 1));

        let heavy_yes = PoolState { yes_pool: u64::MAX / 2, ..Default::default() };
        assert_eq!(heavy_yes.prices(), (PRICE_SCALE - 1, 1));
    }

    #[test]
    fn test_isqrt_ceil() {
        assert_eq!(isqrt_ceil(0), 0);
        assert_eq!(isqrt_ceil(1), 1);
        assert_eq!(isqrt_ceil(2), 2);
        assert_eq!(isqrt_ceil(16), 4);
        assert_eq!(isqrt_ceil(17), 5);
        assert_eq!(isqrt_ceil(u128::MAX), 1u128 << 64);
    }

    #[test]
    fn test_sell_more_than_outstanding() {
        let pool = PoolState { yes_pool: 10 * UNIT, total_yes_shares: 20 * UNIT, ..Default::default() };
        let err = pool.quote_sell(Outcome::Yes, 21 * UNIT, 0).unwrap_err();
        assert!(matches!(err, MarketError::InsufficientShares { held, .. } if held == 20 * UNIT));
    }

    #[test]
    fn test_partial_sell_is_pro_rata_capped() {
        let pool = PoolState {
            yes_pool: 100 * UNIT,
            no_pool: 0,
            total_yes_shares: 400 * UNIT,
            total_no_shares: 0,
        };
        let sell = pool.quote_sell(Outcome::Yes, 100 * UNIT, 0).unwrap();
        // Slice is 100/400 of the yes pool
        assert_eq!(sell.gross_return, 25 * UNIT);
    }
}
