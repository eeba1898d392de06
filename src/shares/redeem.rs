// ============================================================================
// Resolution Redemption - CastBet Prediction Market Ledger
// ============================================================================
//
// After a market resolves, winning shares redeem against the whole market:
//
//   payout = held_winning_shares / winning_shares * payout_pool
//
// Both `winning_shares` and `payout_pool` are snapshotted at resolution, so
// every claimant divides the same pie regardless of claim order. Losing
// shares redeem for nothing. The claimed flag on the position is the
// double-claim guard.
//
// ============================================================================

use crate::market_resolve::markets::{Market, Outcome, Settlement};

/// Freeze the payout pie at resolution time
pub fn snapshot_settlement(market: &Market, winning: Outcome) -> Settlement {
    Settlement {
        payout_pool: market.total_pool(),
        winning_shares: market.total_shares(winning),
        paid_out: 0,
        claims: 0,
    }
}

/// Payout owed for `held` winning shares, rounded down
pub fn claim_payout(settlement: &Settlement, held: u64) -> u64 {
    if settlement.winning_shares == 0 {
        return 0;
    }
    (held as u128 * settlement.payout_pool as u128 / settlement.winning_shares as u128) as u64
}
