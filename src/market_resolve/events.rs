// ============================================================================
// Lifecycle events for external indexing
// ============================================================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::markets::{MarketId, OracleKind, Outcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    MarketCreated {
        market_id: MarketId,
        creator: String,
        question: String,
        resolution_time: u64,
        oracle_kind: OracleKind,
    },
    BetPlaced {
        market_id: MarketId,
        account: String,
        outcome: Outcome,
        amount: u64,
        shares: u64,
        fee: u64,
        timestamp: u64,
    },
    SharesSold {
        market_id: MarketId,
        account: String,
        outcome: Outcome,
        shares: u64,
        amount: u64,
        fee: u64,
        timestamp: u64,
    },
    VoteCast {
        market_id: MarketId,
        voter: String,
        outcome: Outcome,
        weight: u64,
        timestamp: u64,
    },
    MarketResolved {
        market_id: MarketId,
        outcome: Outcome,
        yes_votes: u64,
        no_votes: u64,
        timestamp: u64,
    },
    MarketCancelled {
        market_id: MarketId,
        timestamp: u64,
    },
    WinningsClaimed {
        market_id: MarketId,
        account: String,
        amount: u64,
        timestamp: u64,
    },
}

impl MarketEvent {
    pub fn market_id(&self) -> MarketId {
        match self {
            MarketEvent::MarketCreated { market_id, .. }
            | MarketEvent::BetPlaced { market_id, .. }
            | MarketEvent::SharesSold { market_id, .. }
            | MarketEvent::VoteCast { market_id, .. }
            | MarketEvent::MarketResolved { market_id, .. }
            | MarketEvent::MarketCancelled { market_id, .. }
            | MarketEvent::WinningsClaimed { market_id, .. } => *market_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MarketEvent::MarketCreated { .. } => "MarketCreated",
            MarketEvent::BetPlaced { .. } => "BetPlaced",
            MarketEvent::SharesSold { .. } => "SharesSold",
            MarketEvent::VoteCast { .. } => "VoteCast",
            MarketEvent::MarketResolved { .. } => "MarketResolved",
            MarketEvent::MarketCancelled { .. } => "MarketCancelled",
            MarketEvent::WinningsClaimed { .. } => "WinningsClaimed",
        }
    }
}

/// An emitted event with its position in the log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub id: String,
    #[serde(flatten)]
    pub event: MarketEvent,
}

/// Append-only event log. Sequence numbers start at 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: MarketEvent) -> u64 {
        let seq = self.records.len() as u64 + 1;
        tracing::debug!(seq, market_id = event.market_id(), event = event.name(), "event emitted");
        self.records.push(EventRecord {
            seq,
            id: Uuid::new_v4().to_string(),
            event,
        });
        seq
    }

    /// Records with a sequence number greater than `seq`
    pub fn since(&self, seq: u64) -> &[EventRecord] {
        let start = (seq as usize).min(self.records.len());
        &self.records[start..]
    }

    pub fn for_market(&self, market_id: MarketId) -> Vec<&EventRecord> {
        self.records
            .iter()
            .filter(|r| r.event.market_id() == market_id)
            .collect()
    }

    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_since_skips_seen_records() {
        let mut log = EventLog::new();
        log.emit(MarketEvent::MarketCancelled { market_id: 1, timestamp: 10 });
        log.emit(MarketEvent::MarketCancelled { market_id: 2, timestamp: 11 });
        log.emit(MarketEvent::MarketCancelled { market_id: 1, timestamp: 12 });

        assert_eq!(log.since(0).len(), 3);
        assert_eq!(log.since(2)[0].seq, 3);
        assert!(log.since(99).is_empty());
        assert_eq!(log.for_market(1).len(), 2);
    }

    #[test]
    fn test_record_serializes_flat() {
        let mut log = EventLog::new();
        log.emit(MarketEvent::MarketCancelled { market_id: 4, timestamp: 10 });

        let json = serde_json::to_value(log.last().unwrap()).unwrap();
        assert_eq!(json["type"], "market_cancelled");
        assert_eq!(json["market_id"], 4);
        assert_eq!(json["seq"], 1);
    }
}
