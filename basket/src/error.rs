//! Engine error type.
//!
//! Every rejected request maps to one [`BasketError`] variant carrying enough
//! context to report to an end user. The engine never retries; callers
//! decide whether to resubmit with different parameters.

use std::fmt;

use thiserror::Error;

use ecobasket_protocol::bank::BankError;
use ecobasket_protocol::storage::StoreError;

use crate::config::ConfigError;
use crate::eligibility::Ineligibility;

/// Whose supply fell short in an [`BasketError::InsufficientSupply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupplyScope {
    /// The redeemer does not hold enough basket tokens.
    Redeemer(String),
    /// The basket does not hold enough credits overall.
    Backing,
    /// The basket does not hold enough of one specific batch.
    Batch(String),
}

impl fmt::Display for SupplyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupplyScope::Redeemer(holder) => write!(f, "redeemer {}", holder),
            SupplyScope::Backing => write!(f, "basket backing"),
            SupplyScope::Batch(batch) => write!(f, "batch {}", batch),
        }
    }
}

/// Errors that can occur during basket engine operations.
#[derive(Debug, Error)]
pub enum BasketError {
    /// The batch fails the basket's acceptance criteria.
    #[error("batch {batch_denom} is not eligible for basket {basket_denom}: {reason}")]
    Ineligible {
        basket_denom: String,
        batch_denom: String,
        reason: Ineligibility,
    },

    /// The depositor lacks the batch credits they are trying to deposit.
    #[error(
        "insufficient balance: {holder} holds {available} of {batch_denom}, requested {requested}"
    )]
    InsufficientBalance {
        holder: String,
        batch_denom: String,
        available: u64,
        requested: u64,
    },

    /// The redeemer lacks basket tokens, or the basket lacks backing.
    #[error("insufficient supply in {basket_denom} ({scope}): available {available}, requested {requested}")]
    InsufficientSupply {
        basket_denom: String,
        scope: SupplyScope,
        available: u64,
        requested: u64,
    },

    /// Zero, overflowing, or unrepresentable amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("unknown basket: {0}")]
    UnknownBasket(String),

    #[error("unknown batch: {0}")]
    UnknownBatch(String),

    /// Basket backing no longer matches token supply. This is a bookkeeping
    /// bug, never bad input; the transaction is rolled back and the error
    /// propagates untouched.
    #[error("invariant violation in {basket_denom}: backing {backing}, supply {supply} ({detail})")]
    InvariantViolation {
        basket_denom: String,
        backing: u64,
        supply: u64,
        detail: String,
    },

    /// The caller is not allowed to perform this configuration change.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("basket already exists: {0}")]
    BasketExists(String),

    /// A basket definition failed validation.
    #[error("invalid basket: {0}")]
    InvalidBasket(String),

    /// A request is malformed in a way not covered by the kinds above.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("bank error: {0}")]
    Bank(#[from] BankError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl BasketError {
    /// `true` only for [`BasketError::InvariantViolation`].
    pub fn is_fatal(&self) -> bool {
        matches!(self, BasketError::InvariantViolation { .. })
    }

    /// Short, stable label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BasketError::Ineligible { .. } => "ineligible",
            BasketError::InsufficientBalance { .. } => "insufficient_balance",
            BasketError::InsufficientSupply { .. } => "insufficient_supply",
            BasketError::InvalidAmount(_) => "invalid_amount",
            BasketError::UnknownBasket(_) => "unknown_basket",
            BasketError::UnknownBatch(_) => "unknown_batch",
            BasketError::InvariantViolation { .. } => "invariant_violation",
            BasketError::Unauthorized(_) => "unauthorized",
            BasketError::BasketExists(_) => "basket_exists",
            BasketError::InvalidBasket(_) => "invalid_basket",
            BasketError::InvalidRequest(_) => "invalid_request",
            BasketError::Bank(_) => "bank",
            BasketError::Store(_) => "store",
            BasketError::Config(_) => "config",
            BasketError::Metrics(_) => "metrics",
        }
    }
}

pub type BasketResult<T> = Result<T, BasketError>;
