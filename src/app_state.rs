// Application state management
//
// One `AppState` behind one mutex is the global serializer: every engine
// call runs with the lock held, so operations never interleave.

use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, warn};

use crate::admin::AdminController;
use crate::config::Config;
use crate::errors::{MarketError, Result};
use crate::market_resolve::clock::{Clock, SystemClock};
use crate::market_resolve::engine::{EngineContext, MarketEngine};
use crate::market_resolve::escrow::InMemoryLedger;
use crate::market_resolve::oracle::{NoFeed, OracleFeed};
use crate::models::decimal_to_units;

pub type SharedState = Arc<Mutex<AppState>>;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state file i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file is not valid: {0}")]
    Json(#[from] serde_json::Error),
}

/// Snapshot written to disk
#[derive(Serialize, Deserialize)]
struct PersistedState {
    engine: MarketEngine,
    admin: AdminController,
    ledger: InMemoryLedger,
}

pub struct AppState {
    pub engine: MarketEngine,
    pub admin: AdminController,
    pub ledger: InMemoryLedger,
    pub clock: Arc<dyn Clock + Send + Sync>,
    pub feed: Arc<dyn OracleFeed + Send + Sync>,
    pub config: Config,
}

impl AppState {
    /// Fresh state on the system clock with no automated feed
    pub fn new(config: Config) -> Result<Self> {
        Self::with_sources(config, Arc::new(SystemClock), Arc::new(NoFeed))
    }

    pub fn with_sources(
        config: Config,
        clock: Arc<dyn Clock + Send + Sync>,
        feed: Arc<dyn OracleFeed + Send + Sync>,
    ) -> Result<Self> {
        let admin = AdminController::new(config.owner.clone(), config.protocol_fee_bps)?;
        Ok(Self {
            engine: MarketEngine::new(),
            admin,
            ledger: InMemoryLedger::new(),
            clock,
            feed,
            config,
        })
    }

    pub fn shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Run one engine operation with the full context wired in
    pub fn execute<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut MarketEngine, &mut EngineContext<'_>) -> Result<T>,
    {
        let mut ctx = EngineContext {
            admin: &mut self.admin,
            ledger: &mut self.ledger,
            clock: self.clock.as_ref(),
            feed: self.feed.as_ref(),
        };
        op(&mut self.engine, &mut ctx)
    }

    /// Mint test asset into an account, capped per request
    pub fn faucet(&mut self, account: &str, amount: u64) -> Result<u64> {
        if !self.config.faucet_enabled {
            return Err(MarketError::invalid_state("faucet is disabled"));
        }
        if account.trim().is_empty() {
            return Err(MarketError::validation("account must not be empty"));
        }
        let limit = decimal_to_units(self.config.faucet_limit)?;
        if amount == 0 || amount > limit {
            return Err(MarketError::validation(format!(
                "faucet amount must be between 1 and {} units",
                limit
            )));
        }
        let balance = self.ledger.deposit(account, amount)?;
        info!(account, amount, balance, "faucet funded account");
        Ok(balance)
    }

    pub fn save_to_disk(&self) -> std::result::Result<(), PersistError> {
        let snapshot = PersistedState {
            engine: self.engine.clone(),
            admin: self.admin.clone(),
            ledger: self.ledger.clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        let path = &self.config.state_path;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, json)?;

        info!(path = %path.display(), events = self.engine.events().len(), "state saved to disk");
        Ok(())
    }

    /// Replace engine, admin and ledger with the snapshot on disk.
    /// Returns `false` when no snapshot exists.
    pub fn load_from_disk(&mut self) -> std::result::Result<bool, PersistError> {
        let path = &self.config.state_path;
        if !path.exists() {
            return Ok(false);
        }

        let json = fs::read_to_string(path)?;
        let snapshot: PersistedState = serde_json::from_str(&json)?;

        if snapshot.admin.owner() != self.config.owner {
            warn!(
                snapshot_owner = snapshot.admin.owner(),
                configured_owner = %self.config.owner,
                "snapshot owner differs from configuration; keeping snapshot"
            );
        }

        self.engine = snapshot.engine;
        self.admin = snapshot.admin;
        self.ledger = snapshot.ledger;
        info!(path = %path.display(), events = self.engine.events().len(), "loaded persisted state");
        Ok(true)
    }
}
