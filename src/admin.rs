// ============================================================================
// Admin Controller - CastBet Prediction Market Ledger
// ============================================================================
//
// Process-wide protocol state: owner, protocol fee, pause switch, the
// market id counter and fees accrued from trading. The engine receives it
// explicitly with every call.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{MarketError, Result};
use crate::market_resolve::escrow::LedgerAdapter;
use crate::market_resolve::markets::MarketId;

/// Fee ceiling: 5%
pub const MAX_PROTOCOL_FEE_BPS: u64 = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminController {
    owner: String,
    protocol_fee_bps: u64,
    paused: bool,
    next_market_id: MarketId,
    accrued_fees: u64,
}

impl AdminController {
    pub fn new(owner: impl Into<String>, protocol_fee_bps: u64) -> Result<Self> {
        check_fee(protocol_fee_bps)?;
        Ok(Self {
            owner: owner.into(),
            protocol_fee_bps,
            paused: false,
            next_market_id: 1,
            accrued_fees: 0,
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn protocol_fee_bps(&self) -> u64 {
        self.protocol_fee_bps
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Id the next created market will receive
    pub fn next_market_id(&self) -> MarketId {
        self.next_market_id
    }

    /// Fees collected and not yet withdrawn
    pub fn accrued_fees(&self) -> u64 {
        self.accrued_fees
    }

    fn ensure_owner(&self, caller: &str, action: &str) -> Result<()> {
        if caller != self.owner {
            warn!(caller, action, "rejected admin call from non-owner");
            return Err(MarketError::Unauthorized(format!(
                "{} is not the protocol owner",
                caller
            )));
        }
        Ok(())
    }

    pub fn ensure_not_paused(&self) -> Result<()> {
        if self.paused {
            return Err(MarketError::Paused);
        }
        Ok(())
    }

    pub fn set_protocol_fee(&mut self, caller: &str, fee_bps: u64) -> Result<()> {
        self.ensure_owner(caller, "set_protocol_fee")?;
        check_fee(fee_bps)?;
        info!(old_bps = self.protocol_fee_bps, new_bps = fee_bps, "protocol fee updated");
        self.protocol_fee_bps = fee_bps;
        Ok(())
    }

    pub fn pause(&mut self, caller: &str) -> Result<()> {
        self.ensure_owner(caller, "pause")?;
        if self.paused {
            return Err(MarketError::invalid_state("protocol already paused"));
        }
        self.paused = true;
        info!(by = caller, "protocol paused");
        Ok(())
    }

    pub fn unpause(&mut self, caller: &str) -> Result<()> {
        self.ensure_owner(caller, "unpause")?;
        if !self.paused {
            return Err(MarketError::invalid_state("protocol is not paused"));
        }
        self.paused = false;
        info!(by = caller, "protocol unpaused");
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: &str, new_owner: &str) -> Result<()> {
        self.ensure_owner(caller, "transfer_ownership")?;
        if new_owner.trim().is_empty() {
            return Err(MarketError::validation("new owner must not be empty"));
        }
        info!(from = %self.owner, to = new_owner, "ownership transferred");
        self.owner = new_owner.to_string();
        Ok(())
    }

    /// Pay all accrued fees to the owner
    pub fn withdraw_fees(&mut self, caller: &str, ledger: &mut dyn LedgerAdapter) -> Result<u64> {
        self.ensure_owner(caller, "withdraw_fees")?;
        let amount = self.accrued_fees;
        if amount == 0 {
            return Err(MarketError::validation("no fees accrued"));
        }
        ledger.credit(&self.owner, amount)?;
        self.accrued_fees = 0;
        info!(owner = %self.owner, amount, "protocol fees withdrawn");
        Ok(amount)
    }

    pub(crate) fn allocate_market_id(&mut self) -> MarketId {
        let id = self.next_market_id;
        self.next_market_id += 1;
        id
    }

    pub(crate) fn accrue_fee(&mut self, fee: u64) {
        self.accrued_fees += fee;
    }
}

fn check_fee(fee_bps: u64) -> Result<()> {
    if fee_bps > MAX_PROTOCOL_FEE_BPS {
        return Err(MarketError::FeeTooHigh {
            requested: fee_bps,
            max: MAX_PROTOCOL_FEE_BPS,
        });
    }
    Ok(())
}
