// ============================================================================
// Market Resolve Module - Core Market & Betting Logic
// ============================================================================
//
// This module contains the core prediction market functionality:
//   - pricing: pool-ratio prices, bet and sell quotes
//   - markets: market records, the market store and creation checks
//   - escrow: ledger adapter boundary and the in-memory asset ledger
//   - clock / oracle: time and external outcome sources
//   - events: append-only lifecycle event log
//   - engine: create, bet, sell, vote, resolve, claim, cancel
//
// ============================================================================

pub mod clock;
pub mod engine;
pub mod escrow;
pub mod events;
pub mod markets;
pub mod oracle;
pub mod pricing;

pub use clock::*;
pub use engine::*;
pub use escrow::*;
pub use events::*;
pub use markets::*;
pub use oracle::*;
pub use pricing::*;
