// ============================================================================
// Market Engine - create / bet / sell / vote / resolve / claim / cancel
// ============================================================================
//
// Every operation runs in one step:
//
//   validate → quote → move value through the ledger → commit → emit event
//
// Nothing is mutated before the ledger call succeeds, so a failure at any
// step leaves markets, positions and admin state exactly as they were.
// Callers serialize operations (one engine behind one lock).
//
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::clock::Clock;
use super::escrow::LedgerAdapter;
use super::events::{EventLog, MarketEvent};
use super::markets::{
    validate_new_market, Market, MarketContext, MarketFilter, MarketId, MarketStatus, MarketStore,
    OracleData, OracleKind, Outcome,
};
use super::oracle::OracleFeed;
use super::pricing::{BetQuote, SellQuote};
use crate::admin::AdminController;
use crate::errors::{MarketError, Result};
use crate::shares::{claim_payout, position_value, snapshot_settlement, Position, PositionBook, PositionValue};

/// Voting stays open this long after the resolution time
pub const VOTING_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Collaborators handed to every engine call
pub struct EngineContext<'a> {
    pub admin: &'a mut AdminController,
    pub ledger: &'a mut dyn LedgerAdapter,
    pub clock: &'a dyn Clock,
    pub feed: &'a dyn OracleFeed,
}

// ============================================================================
// REQUESTS / RECEIPTS
// ============================================================================

/// Inputs for a new market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMarket {
    pub question: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub context: MarketContext,
    pub resolution_time: u64,
    pub oracle_kind: OracleKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetReceipt {
    pub market_id: MarketId,
    pub outcome: Outcome,
    pub amount: u64,
    pub fee: u64,
    pub shares: u64,
    pub price: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellReceipt {
    pub market_id: MarketId,
    pub outcome: Outcome,
    pub shares: u64,
    pub gross_return: u64,
    pub fee: u64,
    pub net_return: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub market_id: MarketId,
    pub outcome: Outcome,
    pub weight: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub market_id: MarketId,
    pub outcome: Outcome,
    pub yes_votes: u64,
    pub no_votes: u64,
    pub payout_pool: u64,
    pub winning_shares: u64,
    pub resolved_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub market_id: MarketId,
    pub payout: u64,
    pub timestamp: u64,
}

// ============================================================================
// RESOLUTION POLICY
// ============================================================================

/// Outcome of the vote tally
///
/// Strictly more vote weight wins. A tie (including no votes at all) goes
/// to the side with the larger pool, and equal pools resolve No.
pub fn tally_outcome(market: &Market) -> Outcome {
    let votes = &market.oracle_data;
    if votes.yes_votes > votes.no_votes {
        Outcome::Yes
    } else if votes.no_votes > votes.yes_votes {
        Outcome::No
    } else if market.yes_pool > market.no_pool {
        Outcome::Yes
    } else {
        Outcome::No
    }
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketEngine {
    markets: MarketStore,
    positions: PositionBook,
    events: EventLog,
}

impl MarketEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new market owned by `creator`
    pub fn create_market(&mut self, ctx: &mut EngineContext<'_>, creator: &str, new: NewMarket) -> Result<MarketId> {
        ctx.admin.ensure_not_paused()?;
        let now = ctx.clock.now();

        if creator.trim().is_empty() {
            return Err(MarketError::validation("creator must not be empty"));
        }
        validate_new_market(&new.question, &new.description, new.resolution_time, now)?;

        let id = ctx.admin.allocate_market_id();
        let market = Market {
            id,
            creator: creator.to_string(),
            question: new.question,
            description: new.description,
            context: new.context,
            created_at: now,
            resolution_time: new.resolution_time,
            resolved_at: None,
            oracle_kind: new.oracle_kind,
            status: MarketStatus::Active,
            yes_pool: 0,
            no_pool: 0,
            total_yes_shares: 0,
            total_no_shares: 0,
            total_volume: 0,
            oracle_data: OracleData::default(),
            settlement: None,
        };

        let event = MarketEvent::MarketCreated {
            market_id: id,
            creator: market.creator.clone(),
            question: market.question.clone(),
            resolution_time: market.resolution_time,
            oracle_kind: market.oracle_kind,
        };
        let resolution_time = market.resolution_time;
        self.markets.insert(market)?;

        self.events.emit(event);
        info!(market_id = id, creator, resolution_time, "market created");
        Ok(id)
    }

    /// Buy `outcome` shares with `amount` of the asset
    pub fn place_bet(
        &mut self,
        ctx: &mut EngineContext<'_>,
        account: &str,
        market_id: MarketId,
        outcome: Outcome,
        amount: u64,
        min_shares: u64,
    ) -> Result<BetReceipt> {
        ctx.admin.ensure_not_paused()?;
        let now = ctx.clock.now();
        let fee_bps = ctx.admin.protocol_fee_bps();

        let market = self.markets.get_mut(market_id)?;
        market.ensure_active()?;
        if now >= market.resolution_time {
            return Err(MarketError::invalid_state(format!(
                "betting on market {} closed at {}",
                market_id, market.resolution_time
            )));
        }

        let quote = market.pool_state().quote_bet(outcome, amount, fee_bps)?;
        debug!(market_id, %outcome, amount, shares = quote.shares, price = quote.price, "bet quoted");
        if quote.shares < min_shares {
            return Err(MarketError::SlippageExceeded { minimum: min_shares, actual: quote.shares });
        }
        let fits = market.total_volume.checked_add(amount).is_some()
            && market.total_shares(outcome).checked_add(quote.shares).is_some();
        if !fits {
            return Err(MarketError::validation("bet amount too large"));
        }

        ctx.ledger.debit(account, amount)?;

        market.apply_bet(outcome, quote.net_amount, quote.shares, amount);
        self.positions.credit_shares(market_id, account, outcome, quote.shares, amount, now);
        ctx.admin.accrue_fee(quote.fee);

        self.events.emit(MarketEvent::BetPlaced {
            market_id,
            account: account.to_string(),
            outcome,
            amount,
            shares: quote.shares,
            fee: quote.fee,
            timestamp: now,
        });
        info!(market_id, account, %outcome, amount, shares = quote.shares, fee = quote.fee, "bet placed");

        Ok(BetReceipt {
            market_id,
            outcome,
            amount,
            fee: quote.fee,
            shares: quote.shares,
            price: quote.price,
            timestamp: now,
        })
    }

    /// Sell `shares` of `outcome` back into the pool
    pub fn sell_shares(
        &mut self,
        ctx: &mut EngineContext<'_>,
        account: &str,
        market_id: MarketId,
        outcome: Outcome,
        shares: u64,
        min_amount: u64,
    ) -> Result<SellReceipt> {
        ctx.admin.ensure_not_paused()?;
        let now = ctx.clock.now();
        let fee_bps = ctx.admin.protocol_fee_bps();

        let market = self.markets.get_mut(market_id)?;
        market.ensure_active()?;
        if now >= market.resolution_time {
            return Err(MarketError::invalid_state(format!(
                "trading on market {} closed at {}",
                market_id, market.resolution_time
            )));
        }

        self.positions.ensure_holds(market_id, account, outcome, shares)?;

        let quote = market.pool_state().quote_sell(outcome, shares, fee_bps)?;
        if quote.net_return < min_amount {
            return Err(MarketError::SlippageExceeded { minimum: min_amount, actual: quote.net_return });
        }

        ctx.ledger.credit(account, quote.net_return)?;

        market.apply_sell(outcome, quote.gross_return, shares);
        self.positions.debit_shares(market_id, account, outcome, shares, quote.net_return, now);
        ctx.admin.accrue_fee(quote.fee);

        self.events.emit(MarketEvent::SharesSold {
            market_id,
            account: account.to_string(),
            outcome,
            shares,
            amount: quote.net_return,
            fee: quote.fee,
            timestamp: now,
        });
        info!(market_id, account, %outcome, shares, net_return = quote.net_return, "shares sold");

        Ok(SellReceipt {
            market_id,
            outcome,
            shares,
            gross_return: quote.gross_return,
            fee: quote.fee,
            net_return: quote.net_return,
            timestamp: now,
        })
    }

    /// Cast a vote weighted by the caller's combined shares
    pub fn vote_outcome(
        &mut self,
        ctx: &mut EngineContext<'_>,
        account: &str,
        market_id: MarketId,
        outcome: Outcome,
    ) -> Result<VoteReceipt> {
        ctx.admin.ensure_not_paused()?;
        let now = ctx.clock.now();

        let market = self.markets.get_mut(market_id)?;
        market.ensure_active()?;
        if now < market.resolution_time {
            return Err(MarketError::MarketNotExpired(market_id));
        }
        if market.oracle_data.has_voted(account) {
            return Err(MarketError::AlreadyVoted(account.to_string()));
        }

        let position = self.positions.position(market_id, account);
        if !position.has_shares() {
            return Err(MarketError::Unauthorized(format!(
                "{} holds no shares in market {}",
                account, market_id
            )));
        }
        let weight = position.voting_weight();

        market.apply_vote(account, outcome, weight);

        self.events.emit(MarketEvent::VoteCast {
            market_id,
            voter: account.to_string(),
            outcome,
            weight,
            timestamp: now,
        });
        info!(market_id, account, %outcome, weight, "vote cast");

        Ok(VoteReceipt { market_id, outcome, weight, timestamp: now })
    }

    /// Finalize a market once the voting window has passed. Anyone may call.
    pub fn resolve_market(&mut self, ctx: &mut EngineContext<'_>, market_id: MarketId) -> Result<Resolution> {
        ctx.admin.ensure_not_paused()?;
        let now = ctx.clock.now();

        let market = self.markets.get_mut(market_id)?;
        market.ensure_active()?;
        if now < market.resolution_time {
            return Err(MarketError::MarketNotExpired(market_id));
        }
        let voting_ends = market.resolution_time.saturating_add(VOTING_WINDOW_SECS);
        if now < voting_ends {
            return Err(MarketError::invalid_state(format!(
                "voting on market {} is open until {}",
                market_id, voting_ends
            )));
        }

        let outcome = match market.oracle_kind {
            OracleKind::Automated => ctx.feed.report(market_id).unwrap_or_else(|| tally_outcome(market)),
            OracleKind::SocialVote => tally_outcome(market),
        };
        let settlement = snapshot_settlement(market, outcome);

        market.status = MarketStatus::Resolved;
        market.resolved_at = Some(now);
        market.oracle_data.resolved_outcome = Some(outcome);
        market.oracle_data.resolved = true;
        market.settlement = Some(settlement);

        let resolution = Resolution {
            market_id,
            outcome,
            yes_votes: market.oracle_data.yes_votes,
            no_votes: market.oracle_data.no_votes,
            payout_pool: settlement.payout_pool,
            winning_shares: settlement.winning_shares,
            resolved_at: now,
        };

        self.events.emit(MarketEvent::MarketResolved {
            market_id,
            outcome,
            yes_votes: resolution.yes_votes,
            no_votes: resolution.no_votes,
            timestamp: now,
        });
        info!(
            market_id,
            %outcome,
            yes_votes = resolution.yes_votes,
            no_votes = resolution.no_votes,
            payout_pool = settlement.payout_pool,
            "market resolved"
        );

        Ok(resolution)
    }

    /// Pay the caller's share of a resolved market
    pub fn claim_winnings(&mut self, ctx: &mut EngineContext<'_>, account: &str, market_id: MarketId) -> Result<ClaimReceipt> {
        ctx.admin.ensure_not_paused()?;
        let now = ctx.clock.now();

        let market = self.markets.get_mut(market_id)?;
        if market.status != MarketStatus::Resolved {
            return Err(MarketError::invalid_state(format!(
                "market {} is {}, not resolved",
                market_id, market.status
            )));
        }
        let (outcome, settlement) = match (market.oracle_data.resolved_outcome, market.settlement) {
            (Some(outcome), Some(settlement)) => (outcome, settlement),
            _ => {
                return Err(MarketError::invalid_state(format!(
                    "market {} has no settlement snapshot",
                    market_id
                )))
            }
        };

        let position = self.positions.get(market_id, account);
        if position.map_or(false, |p| p.claimed) {
            return Err(MarketError::AlreadyClaimed(account.to_string()));
        }
        let held = position.map_or(0, |p| p.shares(outcome));
        if held == 0 {
            return Err(MarketError::NoWinningShares(account.to_string()));
        }

        let payout = claim_payout(&settlement, held);
        if payout > 0 {
            ctx.ledger.credit(account, payout)?;
        }

        market.apply_payout(outcome, payout);
        self.positions.mark_claimed(market_id, account, payout, now);

        self.events.emit(MarketEvent::WinningsClaimed {
            market_id,
            account: account.to_string(),
            amount: payout,
            timestamp: now,
        });
        info!(market_id, account, payout, "winnings claimed");

        Ok(ClaimReceipt { market_id, payout, timestamp: now })
    }

    /// Creator withdraws a market nobody has bet on
    pub fn cancel_market(&mut self, ctx: &mut EngineContext<'_>, caller: &str, market_id: MarketId) -> Result<()> {
        ctx.admin.ensure_not_paused()?;
        let now = ctx.clock.now();

        let market = self.markets.get_mut(market_id)?;
        if market.creator != caller {
            return Err(MarketError::Unauthorized(format!(
                "only the creator may cancel market {}",
                market_id
            )));
        }
        market.ensure_active()?;
        if market.total_volume > 0 {
            return Err(MarketError::invalid_state(format!(
                "market {} already has {} volume",
                market_id, market.total_volume
            )));
        }

        market.status = MarketStatus::Cancelled;

        self.events.emit(MarketEvent::MarketCancelled { market_id, timestamp: now });
        info!(market_id, caller, "market cancelled");
        Ok(())
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn market(&self, market_id: MarketId) -> Result<&Market> {
        self.markets.get(market_id)
    }

    pub fn markets(&self, filter: &MarketFilter) -> Vec<&Market> {
        self.markets.list(filter)
    }

    /// Position of `account`, zeroed when it never traded
    pub fn position(&self, market_id: MarketId, account: &str) -> Result<Position> {
        self.markets.get(market_id)?;
        Ok(self.positions.position(market_id, account))
    }

    pub fn positions(&self) -> &PositionBook {
        &self.positions
    }

    /// (price_yes, price_no) at 1e6 scale
    pub fn prices(&self, market_id: MarketId) -> Result<(u64, u64)> {
        Ok(self.markets.get(market_id)?.pool_state().prices())
    }

    /// Preview a bet without placing it
    pub fn quote_bet(&self, admin: &AdminController, market_id: MarketId, outcome: Outcome, amount: u64) -> Result<BetQuote> {
        self.markets
            .get(market_id)?
            .pool_state()
            .quote_bet(outcome, amount, admin.protocol_fee_bps())
    }

    /// Preview a sell without executing it
    pub fn quote_sell(&self, admin: &AdminController, market_id: MarketId, outcome: Outcome, shares: u64) -> Result<SellQuote> {
        self.markets
            .get(market_id)?
            .pool_state()
            .quote_sell(outcome, shares, admin.protocol_fee_bps())
    }

    pub fn position_value(&self, market_id: MarketId, account: &str) -> Result<PositionValue> {
        let market = self.markets.get(market_id)?;
        Ok(position_value(&self.positions.position(market_id, account), market))
    }

    /// What a claim would pay right now (0 when nothing is claimable)
    pub fn claimable(&self, market_id: MarketId, account: &str) -> Result<u64> {
        let market = self.markets.get(market_id)?;
        let position = self.positions.position(market_id, account);
        match (market.oracle_data.resolved_outcome, market.settlement) {
            (Some(outcome), Some(settlement)) if !position.claimed => {
                Ok(claim_payout(&settlement, position.shares(outcome)))
            }
            _ => Ok(0),
        }
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Sum of all pools across markets
    pub fn total_pooled(&self) -> u64 {
        self.markets
            .list(&MarketFilter::default())
            .iter()
            .map(|m| m.total_pool())
            .sum()
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
