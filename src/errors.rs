// ============================================================================
// Errors - CastBet Prediction Market Ledger
// ============================================================================
//
// Every engine operation either applies fully or fails with one of these
// typed reasons. Nothing is partially applied and nothing fails silently.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::market_resolve::markets::MarketId;

/// Result alias used across the engine
pub type Result<T> = std::result::Result<T, MarketError>;

/// Coarse classification of a failure, stable for API consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    InvalidState,
    SlippageExceeded,
    InsufficientShares,
    AlreadyVoted,
    AlreadyClaimed,
    NoWinningShares,
    Unauthorized,
    FeeTooHigh,
    Paused,
    LedgerFailure,
}

/// Failures reported by the asset ledger adapter
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum LedgerError {
    #[error("account {account} holds {available}, cannot debit {requested}")]
    InsufficientBalance {
        account: String,
        available: u64,
        requested: u64,
    },

    #[error("escrow holds {available}, cannot release {requested}")]
    EscrowUnderflow { available: u64, requested: u64 },

    #[error("balance overflow on account {0}")]
    Overflow(String),
}

/// Market engine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("market {0} not found")]
    NotFound(MarketId),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("market {0} has not reached its resolution time")]
    MarketNotExpired(MarketId),

    #[error("slippage exceeded: minimum {minimum}, got {actual}")]
    SlippageExceeded { minimum: u64, actual: u64 },

    #[error("insufficient shares: hold {held}, need {requested}")]
    InsufficientShares { held: u64, requested: u64 },

    #[error("account {0} already voted on this market")]
    AlreadyVoted(String),

    #[error("account {0} already claimed on this market")]
    AlreadyClaimed(String),

    #[error("account {0} holds no winning shares")]
    NoWinningShares(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("protocol fee {requested} bps exceeds maximum {max} bps")]
    FeeTooHigh { requested: u64, max: u64 },

    #[error("protocol is paused")]
    Paused,

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl MarketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketError::Validation(_) => ErrorKind::ValidationError,
            MarketError::NotFound(_) => ErrorKind::NotFound,
            MarketError::InvalidState(_) | MarketError::MarketNotExpired(_) => ErrorKind::InvalidState,
            MarketError::SlippageExceeded { .. } => ErrorKind::SlippageExceeded,
            MarketError::InsufficientShares { .. } => ErrorKind::InsufficientShares,
            MarketError::AlreadyVoted(_) => ErrorKind::AlreadyVoted,
            MarketError::AlreadyClaimed(_) => ErrorKind::AlreadyClaimed,
            MarketError::NoWinningShares(_) => ErrorKind::NoWinningShares,
            MarketError::Unauthorized(_) => ErrorKind::Unauthorized,
            MarketError::FeeTooHigh { .. } => ErrorKind::FeeTooHigh,
            MarketError::Paused => ErrorKind::Paused,
            MarketError::Ledger(_) => ErrorKind::LedgerFailure,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        MarketError::Validation(msg.into())
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        MarketError::InvalidState(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_expired_is_an_invalid_state() {
        assert_eq!(MarketError::MarketNotExpired(7).kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_ledger_errors_convert() {
        let err: MarketError = LedgerError::Overflow("alice".into()).into();
        assert_eq!(err.kind(), ErrorKind::LedgerFailure);
        assert!(err.to_string().contains("alice"));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::SlippageExceeded).unwrap();
        assert_eq!(json, "\"slippage_exceeded\"");
    }
}
