//! CastBet prediction market ledger
//! Exports all modules for use as a library crate

pub mod admin;
pub mod app_state;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod market_resolve;
pub mod models;
pub mod routes;
pub mod shares;

pub use admin::{AdminController, MAX_PROTOCOL_FEE_BPS};
pub use app_state::{AppState, PersistError, SharedState};
pub use config::{Config, ConfigError};
pub use errors::{ErrorKind, LedgerError, MarketError, Result};
pub use market_resolve::{
    BetQuote, BetReceipt, ClaimReceipt, Clock, EngineContext, EventLog, EventRecord, InMemoryLedger,
    LedgerAdapter, ManualClock, Market, MarketContext, MarketEngine, MarketEvent, MarketFilter, MarketId,
    MarketStatus, NewMarket, NoFeed, OracleFeed, OracleKind, Outcome, PoolState, Resolution, SellQuote,
    SellReceipt, StaticFeed, SystemClock, VoteReceipt, PRICE_SCALE, UNIT, VIRTUAL_LIQUIDITY,
    VOTING_WINDOW_SECS,
};
pub use shares::{Position, PositionBook, PositionValue};
