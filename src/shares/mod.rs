// ============================================================================
// Shares Module - CastBet Prediction Market Ledger
// ============================================================================
//
// Outcome share positions, one per (market, account).
//
// Shares are claim units on one outcome. They are issued by bets, burned by
// sells, and after resolution the winning side's shares split the market's
// remaining pools pro rata.
//
// Positions are created on first write and never deleted, so claim
// bookkeeping survives resolution.
//
// ============================================================================

pub mod redeem;

pub use redeem::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{MarketError, Result};
use crate::market_resolve::markets::{Market, MarketId, Outcome};

// ============================================================================
// POSITION
// ============================================================================

/// An account's holdings in one market
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub yes_shares: u64,
    pub no_shares: u64,

    /// One-way flag, set by a successful claim
    pub claimed: bool,

    /// Gross asset paid into this market
    #[serde(default)]
    pub total_cost: u64,

    /// Net asset received back from sells and claims
    #[serde(default)]
    pub total_proceeds: u64,

    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
}

impl Position {
    pub fn shares(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::Yes => self.yes_shares,
            Outcome::No => self.no_shares,
        }
    }

    /// Combined shares, used as voting weight
    pub fn voting_weight(&self) -> u64 {
        self.yes_shares + self.no_shares
    }

    pub fn has_shares(&self) -> bool {
        self.voting_weight() > 0
    }

    fn add_shares(&mut self, outcome: Outcome, shares: u64, cost: u64, now: u64) {
        match outcome {
            Outcome::Yes => self.yes_shares += shares,
            Outcome::No => self.no_shares += shares,
        }
        self.total_cost += cost;
        self.updated_at = now;
    }

    fn remove_shares(&mut self, outcome: Outcome, shares: u64, proceeds: u64, now: u64) {
        match outcome {
            Outcome::Yes => self.yes_shares = self.yes_shares.saturating_sub(shares),
            Outcome::No => self.no_shares = self.no_shares.saturating_sub(shares),
        }
        self.total_proceeds += proceeds;
        self.updated_at = now;
    }
}

/// Mark-to-pool valuation of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionValue {
    /// Value of the shares as a slice of each side's pool
    pub current_value: u64,
    pub total_cost: u64,
    pub total_proceeds: u64,
    /// current_value + proceeds - cost
    pub profit_loss: i128,
}

/// Value each side's shares at their slice of that side's pool
pub fn position_value(position: &Position, market: &Market) -> PositionValue {
    let slice = |shares: u64, outcome: Outcome| -> u64 {
        let outstanding = market.total_shares(outcome);
        if outstanding == 0 {
            return 0;
        }
        (shares as u128 * market.pool(outcome) as u128 / outstanding as u128) as u64
    };

    let current_value = slice(position.yes_shares, Outcome::Yes) + slice(position.no_shares, Outcome::No);
    let profit_loss =
        current_value as i128 + position.total_proceeds as i128 - position.total_cost as i128;

    PositionValue {
        current_value,
        total_cost: position.total_cost,
        total_proceeds: position.total_proceeds,
        profit_loss,
    }
}

// ============================================================================
// POSITION BOOK
// ============================================================================

/// All positions, keyed by market then account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionBook {
    positions: BTreeMap<MarketId, BTreeMap<String, Position>>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, market_id: MarketId, account: &str) -> Option<&Position> {
        self.positions.get(&market_id).and_then(|m| m.get(account))
    }

    /// Position or an empty default when the account never traded
    pub fn position(&self, market_id: MarketId, account: &str) -> Position {
        self.get(market_id, account).cloned().unwrap_or_default()
    }

    /// Upsert-on-write access
    fn entry(&mut self, market_id: MarketId, account: &str, now: u64) -> &mut Position {
        self.positions
            .entry(market_id)
            .or_default()
            .entry(account.to_string())
            .or_insert_with(|| Position {
                created_at: now,
                updated_at: now,
                ..Default::default()
            })
    }

    /// Add shares bought for `cost`
    pub fn credit_shares(
        &mut self,
        market_id: MarketId,
        account: &str,
        outcome: Outcome,
        shares: u64,
        cost: u64,
        now: u64,
    ) {
        self.entry(market_id, account, now).add_shares(outcome, shares, cost, now);
    }

    /// Shares of `outcome` held, or `InsufficientShares` when fewer than `shares`
    pub fn ensure_holds(&self, market_id: MarketId, account: &str, outcome: Outcome, shares: u64) -> Result<u64> {
        let held = self.get(market_id, account).map_or(0, |p| p.shares(outcome));
        if held < shares {
            return Err(MarketError::InsufficientShares { held, requested: shares });
        }
        Ok(held)
    }

    /// Remove shares sold for `proceeds`. Callers check the holding with
    /// `ensure_holds` before any value moves.
    pub(crate) fn debit_shares(
        &mut self,
        market_id: MarketId,
        account: &str,
        outcome: Outcome,
        shares: u64,
        proceeds: u64,
        now: u64,
    ) {
        self.entry(market_id, account, now).remove_shares(outcome, shares, proceeds, now);
    }

    /// Flip the claimed flag and record the payout
    pub(crate) fn mark_claimed(&mut self, market_id: MarketId, account: &str, payout: u64, now: u64) {
        let position = self.entry(market_id, account, now);
        position.claimed = true;
        position.total_proceeds += payout;
        position.updated_at = now;
    }
}

// ============================================================================
// TESTS
// ============================================================================
