//! # Bank Module — External Ledger Interfaces
//!
//! The basket engine does not own balances. Batch credits and basket tokens
//! live in an external ledger that the engine instructs through the traits
//! below. Keeping these seams narrow is what lets the engine run against a
//! chain's bank module, a database, or the [`MemoryBank`] used in tests.
//!
//! ## Architecture
//!
//! ```text
//! BatchRegistry  — read-only batch metadata
//! CreditLedger   — batch credit balances, transfers, retirement
//! TokenLedger    — fungible basket token mint / burn / supply
//! Checkpoint     — snapshot + rollback for transaction atomicity
//! Bank           — all of the above
//! ```
//!
//! All calls are synchronous, in-process state mutations.

pub mod memory;

pub use memory::{MemoryBank, Retirement};

use thiserror::Error;

use crate::credit::BatchInfo;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by a bank implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    /// The holder does not have enough of the asset.
    #[error("insufficient funds: {holder} holds {available} {asset}, requested {requested}")]
    InsufficientFunds {
        /// Account being debited.
        holder: String,
        /// Batch denom or basket token denom.
        asset: String,
        /// Current balance.
        available: u64,
        /// Amount that was requested.
        requested: u64,
    },

    /// A credit would push a balance or supply past `u64::MAX`.
    #[error("overflow crediting {amount} {asset}")]
    Overflow {
        /// Batch denom or basket token denom.
        asset: String,
        /// Amount that caused the overflow.
        amount: u64,
    },

    /// The batch is not registered.
    #[error("unknown batch: {0}")]
    UnknownBatch(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Read-only view of batch metadata.
pub trait BatchRegistry {
    /// Returns metadata for a batch denom, or `None` if it was never issued.
    fn batch(&self, denom: &str) -> Option<BatchInfo>;
}

/// Batch credit balances.
pub trait CreditLedger {
    /// Tradable (not retired) credits of `batch` held by `holder`.
    fn credit_balance(&self, holder: &str, batch: &str) -> u64;

    /// Moves tradable credits between holders.
    fn transfer_credits(
        &mut self,
        from: &str,
        to: &str,
        batch: &str,
        amount: u64,
    ) -> Result<(), BankError>;

    /// Converts tradable credits held by `holder` into retired credits.
    /// `jurisdiction` is the location the retirement is claimed in, if the
    /// holder named one.
    fn retire_credits(
        &mut self,
        holder: &str,
        batch: &str,
        amount: u64,
        jurisdiction: Option<&str>,
    ) -> Result<(), BankError>;
}

/// Fungible basket token balances.
pub trait TokenLedger {
    fn mint(&mut self, holder: &str, denom: &str, amount: u64) -> Result<(), BankError>;

    fn burn(&mut self, holder: &str, denom: &str, amount: u64) -> Result<(), BankError>;

    /// Total outstanding supply of `denom`.
    fn supply(&self, denom: &str) -> u64;

    fn token_balance(&self, holder: &str, denom: &str) -> u64;
}

/// Snapshot and restore of bank state.
///
/// The engine takes a checkpoint before every transaction and rolls back to
/// it if any step fails, so a rejected transaction leaves no trace.
pub trait Checkpoint {
    type Snapshot;

    fn checkpoint(&self) -> Self::Snapshot;

    fn rollback(&mut self, snapshot: Self::Snapshot);
}

/// Everything the basket engine needs from the outside world.
pub trait Bank: BatchRegistry + CreditLedger + TokenLedger + Checkpoint {}

impl<T> Bank for T where T: BatchRegistry + CreditLedger + TokenLedger + Checkpoint {}
