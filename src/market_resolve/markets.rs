use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::pricing::PoolState;
use crate::errors::{MarketError, Result};

/// Maximum question length in characters
pub const MAX_QUESTION_LEN: usize = 200;

/// Maximum description length in characters
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Markets are numbered from 1 and ids are never reused
pub type MarketId = u64;

// ============================================================================
// ENUMS
// ============================================================================

/// Side of a binary market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Yes,
    No,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Yes => write!(f, "yes"),
            Outcome::No => write!(f, "no"),
        }
    }
}

/// How a market learns its outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleKind {
    /// Shareholders vote after the deadline, weighted by shares held
    SocialVote,
    /// An external feed reports the outcome; falls back to the vote tally
    Automated,
}

/// Market lifecycle status
///
/// Flow: Active → Resolved
///          ↓
///       Cancelled (creator only, before any volume)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Active,
    Resolved,
    Cancelled,
}

impl MarketStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MarketStatus::Resolved | MarketStatus::Cancelled)
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status_str = match self {
            MarketStatus::Active => "active",
            MarketStatus::Resolved => "resolved",
            MarketStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", status_str)
    }
}

// ============================================================================
// MARKET RECORD
// ============================================================================

/// External context a market was created from. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketContext {
    /// Reference hash of the originating post
    #[serde(default)]
    pub reference_hash: String,
    /// Numeric identifier of the originating author
    #[serde(default)]
    pub reference_id: u64,
    /// Channel label
    #[serde(default)]
    pub channel: String,
}

/// Vote tallies. Votes are weighted by shares held, not counted per head.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleData {
    pub yes_votes: u64,
    pub no_votes: u64,
    pub total_voters: u64,
    pub resolved_outcome: Option<Outcome>,
    pub resolved: bool,
    /// Accounts that already voted
    #[serde(default)]
    pub voters: BTreeSet<String>,
}

impl OracleData {
    pub fn has_voted(&self, account: &str) -> bool {
        self.voters.contains(account)
    }
}

/// Payout snapshot taken when the market resolves
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// yes_pool + no_pool at resolution
    pub payout_pool: u64,
    /// Outstanding shares of the winning outcome at resolution
    pub winning_shares: u64,
    /// Sum of payouts already made
    pub paid_out: u64,
    /// Number of successful claims
    pub claims: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub creator: String,
    pub question: String,
    pub description: String,
    #[serde(default)]
    pub context: MarketContext,
    pub created_at: u64,
    pub resolution_time: u64,
    pub resolved_at: Option<u64>,
    pub oracle_kind: OracleKind,
    pub status: MarketStatus,

    /// Real escrowed value backing each side
    pub yes_pool: u64,
    pub no_pool: u64,
    pub total_yes_shares: u64,
    pub total_no_shares: u64,

    /// Gross amount ever bet. Never decreases.
    pub total_volume: u64,

    pub oracle_data: OracleData,
    #[serde(default)]
    pub settlement: Option<Settlement>,
}

impl Market {
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

    /// Net value held for this market
    pub fn total_pool(&self) -> u64 {
        self.yes_pool + self.no_pool
    }

    pub fn pool_state(&self) -> PoolState {
        PoolState {
            yes_pool: self.yes_pool,
            no_pool: self.no_pool,
            total_yes_shares: self.total_yes_shares,
            total_no_shares: self.total_no_shares,
        }
    }

    pub fn is_trading_open(&self, now: u64) -> bool {
        self.status == MarketStatus::Active && now < self.resolution_time
    }

    pub fn ensure_active(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(MarketError::invalid_state(format!(
                "market {} is {}",
                self.id, self.status
            )));
        }
        Ok(())
    }

    /// Record a bet: net value joins the pool, shares are issued
    pub(crate) fn apply_bet(&mut self, outcome: Outcome, net_amount: u64, shares: u64, gross_amount: u64) {
        match outcome {
            Outcome::Yes => {
                self.yes_pool += net_amount;
                self.total_yes_shares += shares;
            }
            Outcome::No => {
                self.no_pool += net_amount;
                self.total_no_shares += shares;
            }
        }
        self.total_volume += gross_amount;
    }

    /// Record a sell: gross return leaves the pool, shares are burned
    pub(crate) fn apply_sell(&mut self, outcome: Outcome, gross_return: u64, shares: u64) {
        match outcome {
            Outcome::Yes => {
                self.yes_pool -= gross_return;
                self.total_yes_shares -= shares;
            }
            Outcome::No => {
                self.no_pool -= gross_return;
                self.total_no_shares -= shares;
            }
        }
    }

    pub(crate) fn apply_vote(&mut self, voter: &str, outcome: Outcome, weight: u64) {
        match outcome {
            Outcome::Yes => self.oracle_data.yes_votes += weight,
            Outcome::No => self.oracle_data.no_votes += weight,
        }
        self.oracle_data.total_voters += 1;
        self.oracle_data.voters.insert(voter.to_string());
    }

    /// Remove a claim payout from the pools, losing side first
    pub(crate) fn apply_payout(&mut self, winning: Outcome, payout: u64) {
        let (winning_pool, losing_pool) = match winning {
            Outcome::Yes => (&mut self.yes_pool, &mut self.no_pool),
            Outcome::No => (&mut self.no_pool, &mut self.yes_pool),
        };
        let from_losing = payout.min(*losing_pool);
        *losing_pool -= from_losing;
        *winning_pool -= payout - from_losing;

        if let Some(settlement) = self.settlement.as_mut() {
            settlement.paid_out += payout;
            settlement.claims += 1;
        }
    }
}

// ============================================================================
// MARKET STORE
// ============================================================================

/// Listing filter for markets
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketFilter {
    pub status: Option<MarketStatus>,
    pub creator: Option<String>,
}

impl MarketFilter {
    pub fn matches(&self, market: &Market) -> bool {
        self.status.map_or(true, |s| market.status == s)
            && self.creator.as_deref().map_or(true, |c| market.creator == c)
    }
}

/// Owns every market record. Markets are never deleted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketStore {
    markets: BTreeMap<MarketId, Market>,
}

impl MarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, market: Market) -> Result<()> {
        if self.markets.contains_key(&market.id) {
            return Err(MarketError::invalid_state(format!(
                "market id {} already allocated",
                market.id
            )));
        }
        self.markets.insert(market.id, market);
        Ok(())
    }

    pub fn get(&self, id: MarketId) -> Result<&Market> {
        self.markets.get(&id).ok_or(MarketError::NotFound(id))
    }

    pub fn get_mut(&mut self, id: MarketId) -> Result<&mut Market> {
        self.markets.get_mut(&id).ok_or(MarketError::NotFound(id))
    }

    pub fn list(&self, filter: &MarketFilter) -> Vec<&Market> {
        self.markets.values().filter(|m| filter.matches(m)).collect()
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Check creation inputs against length and deadline limits
pub fn validate_new_market(question: &str, description: &str, resolution_time: u64, now: u64) -> Result<()> {
    if question.trim().is_empty() {
        return Err(MarketError::validation("question must not be empty"));
    }
    let question_len = question.chars().count();
    if question_len > MAX_QUESTION_LEN {
        return Err(MarketError::validation(format!(
            "question is {} characters, maximum is {}",
            question_len, MAX_QUESTION_LEN
        )));
    }
    let description_len = description.chars().count();
    if description_len > MAX_DESCRIPTION_LEN {
        return Err(MarketError::validation(format!(
            "description is {} characters, maximum is {}",
            description_len, MAX_DESCRIPTION_LEN
        )));
    }
    if resolution_time <= now {
        return Err(MarketError::validation(format!(
            "resolution time {} is not after current time {}",
            resolution_time, now
        )));
    }
    Ok(())
}
