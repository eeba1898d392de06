// ============================================================================
// Escrow - Ledger Adapter boundary
// ============================================================================
//
// The engine never holds balances itself. Value moves through a
// `LedgerAdapter`, which debits bettors into escrow and credits sellers,
// claimants and the protocol out of escrow. Adapters are all-or-nothing:
// a failed call changes nothing.
//
// Amounts are in the asset's smallest unit (6 decimals).
//
// ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::LedgerError;

/// Atomic value movement between accounts and the engine's escrow
pub trait LedgerAdapter {
    /// Move `amount` from `account` into escrow
    fn debit(&mut self, account: &str, amount: u64) -> Result<(), LedgerError>;

    /// Move `amount` from escrow to `account`
    fn credit(&mut self, account: &str, amount: u64) -> Result<(), LedgerError>;

    /// Spendable balance of an account
    fn balance(&self, account: &str) -> u64;
}

/// In-process stable asset ledger. Never overdraws an account or the escrow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryLedger {
    balances: BTreeMap<String, u64>,
    escrow: u64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint new asset into an account (test funding, faucet)
    pub fn deposit(&mut self, account: &str, amount: u64) -> Result<u64, LedgerError> {
        let balance = self.balances.entry(account.to_string()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(account.to_string()))?;
        Ok(*balance)
    }

    /// Value currently held in escrow by the engine
    pub fn escrow_balance(&self) -> u64 {
        self.escrow
    }
}

impl LedgerAdapter for InMemoryLedger {
    fn debit(&mut self, account: &str, amount: u64) -> Result<(), LedgerError> {
        let available = self.balance(account);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: account.to_string(),
                available,
                requested: amount,
            });
        }
        let escrow = self
            .escrow
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow("escrow".to_string()))?;

        self.balances.insert(account.to_string(), available - amount);
        self.escrow = escrow;
        Ok(())
    }

    fn credit(&mut self, account: &str, amount: u64) -> Result<(), LedgerError> {
        if self.escrow < amount {
            return Err(LedgerError::EscrowUnderflow {
                available: self.escrow,
                requested: amount,
            });
        }
        let balance = self
            .balance(account)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(account.to_string()))?;

        self.balances.insert(account.to_string(), balance);
        self.escrow -= amount;
        Ok(())
    }

    fn balance(&self, account: &str) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }
}
