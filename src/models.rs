// HTTP request/response models for the CastBet ledger
//
// Amounts cross the wire as exact decimals in whole asset units and are
// converted to 1e6 fixed point at the boundary.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorKind, MarketError, Result};
use crate::market_resolve::engine::{NewMarket, VOTING_WINDOW_SECS};
use crate::market_resolve::markets::{Market, MarketContext, MarketId, OracleKind, Outcome};
use crate::market_resolve::pricing::UNIT;

/// Decimal places of the fixed-point representation
pub const AMOUNT_DECIMALS: u32 = 6;

// ===== FIXED POINT <-> DECIMAL =====

/// Render a 1e6-scaled integer as an exact decimal
pub fn units_to_decimal(units: u64) -> Decimal {
    Decimal::from_i128_with_scale(units as i128, AMOUNT_DECIMALS).normalize()
}

/// Parse a decimal amount into 1e6-scaled units. Rejects negatives and
/// anything finer than six decimal places.
pub fn decimal_to_units(value: Decimal) -> Result<u64> {
    if value.is_sign_negative() {
        return Err(MarketError::validation(format!("amount {} is negative", value)));
    }
    let scaled = value
        .checked_mul(Decimal::from(UNIT))
        .ok_or_else(|| MarketError::validation(format!("amount {} is too large", value)))?;
    if !scaled.fract().is_zero() {
        return Err(MarketError::validation(format!(
            "amount {} has more than {} decimal places",
            value, AMOUNT_DECIMALS
        )));
    }
    scaled
        .to_u64()
        .ok_or_else(|| MarketError::validation(format!("amount {} is too large", value)))
}

/// Raw fixed-point amount with its decimal rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Amount {
    pub raw: u64,
    pub value: Decimal,
}

impl From<u64> for Amount {
    fn from(raw: u64) -> Self {
        Self { raw, value: units_to_decimal(raw) }
    }
}

// ===== REQUESTS =====

#[derive(Debug, Deserialize)]
pub struct CreateMarketRequest {
    pub creator: String,
    pub question: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub context: MarketContext,
    pub resolution_time: u64,
    #[serde(default)]
    pub oracle_kind: Option<OracleKind>,
}

impl CreateMarketRequest {
    pub fn into_parts(self) -> (String, NewMarket) {
        let new = NewMarket {
            question: self.question,
            description: self.description,
            context: self.context,
            resolution_time: self.resolution_time,
            oracle_kind: self.oracle_kind.unwrap_or(OracleKind::SocialVote),
        };
        (self.creator, new)
    }
}

#[derive(Debug, Deserialize)]
pub struct BetRequest {
    pub account: String,
    pub outcome: Outcome,
    pub amount: Decimal,
    #[serde(default)]
    pub min_shares: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct SellRequest {
    pub account: String,
    pub outcome: Outcome,
    pub shares: Decimal,
    #[serde(default)]
    pub min_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub account: String,
    pub outcome: Outcome,
}

#[derive(Debug, Deserialize)]
pub struct AccountRequest {
    pub account: String,
}

/// Body for calls that only identify the caller
#[derive(Debug, Deserialize)]
pub struct CallerRequest {
    pub caller: String,
}

#[derive(Debug, Deserialize)]
pub struct FeeRequest {
    pub caller: String,
    pub fee_bps: u64,
}

#[derive(Debug, Deserialize)]
pub struct OwnerRequest {
    pub caller: String,
    pub new_owner: String,
}

#[derive(Debug, Deserialize)]
pub struct FaucetRequest {
    pub account: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub outcome: Outcome,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct SellQuoteQuery {
    pub outcome: Outcome,
    pub shares: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Only events after this sequence number
    #[serde(default)]
    pub since: u64,
    #[serde(default)]
    pub market_id: Option<MarketId>,
}

// ===== RESPONSES =====

/// Market record plus derived prices and deadlines
#[derive(Debug, Clone, Serialize)]
pub struct MarketView {
    #[serde(flatten)]
    pub market: Market,
    pub price_yes: u64,
    pub price_no: u64,
    pub price_yes_display: Decimal,
    pub price_no_display: Decimal,
    pub voting_ends_at: u64,
    pub trading_open: bool,
}

impl MarketView {
    pub fn new(market: &Market, now: u64) -> Self {
        let (price_yes, price_no) = market.pool_state().prices();
        Self {
            market: market.clone(),
            price_yes,
            price_no,
            price_yes_display: units_to_decimal(price_yes),
            price_no_display: units_to_decimal(price_no),
            voting_ends_at: market.resolution_time.saturating_add(VOTING_WINDOW_SECS),
            trading_open: market.is_trading_open(now),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    pub error: String,
}
