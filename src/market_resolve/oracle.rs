//! Automated outcome feed.
//!
//! Automated markets ask the feed for a report at resolution. Without a
//! report they settle by the shareholder vote like social markets.

use std::collections::HashMap;

use super::markets::{MarketId, Outcome};

pub trait OracleFeed {
    /// Reported outcome for a market, if the feed has one
    fn report(&self, market_id: MarketId) -> Option<Outcome>;
}

/// Feed that never reports
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeed;

impl OracleFeed for NoFeed {
    fn report(&self, _market_id: MarketId) -> Option<Outcome> {
        None
    }
}

/// Fixed set of reports, loaded up front
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
    reports: HashMap<MarketId, Outcome>,
}

impl StaticFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report(mut self, market_id: MarketId, outcome: Outcome) -> Self {
        self.reports.insert(market_id, outcome);
        self
    }
}

impl OracleFeed for StaticFeed {
    fn report(&self, market_id: MarketId) -> Option<Outcome> {
        self.reports.get(&market_id).copied()
    }
}
