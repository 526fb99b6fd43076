//! # Credit Batches & Decimal Scaling
//!
//! A credit batch is one issuance of ecological credits: a single project,
//! a single monitoring period, a single credit type. Batches are
//! non-fungible with each other, which is the whole reason baskets exist.
//!
//! ## Identifier Formats
//!
//! ```text
//! credit class  C01                          <type abbreviation><2+ digits>
//! project       C01-001                      <class>-<sequence>
//! batch denom   C01-001-20210101-20220101-001
//!               <project>-<start>-<end>-<sequence>
//! ```
//!
//! ## Precision
//!
//! Batch credits are counted in integer units. A basket converts them to
//! basket-token units by multiplying by `10^exponent`. The conversion back
//! is exact or it fails: nothing in this module rounds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CREDIT_TYPE_MAX_LENGTH;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while building or parsing credit identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreditError {
    /// The credit class ID is not `<TYPE><digits>`.
    #[error("invalid credit class id: {0}")]
    InvalidClassId(String),

    /// The project ID is not `<class>-<digits>`.
    #[error("invalid project id: {0}")]
    InvalidProjectId(String),

    /// The batch period ends before it starts.
    #[error("batch end date {end} is before start date {start}")]
    InvalidDateRange {
        /// Period start.
        start: DateTime<Utc>,
        /// Period end.
        end: DateTime<Utc>,
    },
}

// ---------------------------------------------------------------------------
// BatchInfo
// ---------------------------------------------------------------------------

/// Registry metadata for a credit batch.
///
/// Owned by the batch registry, read-only to the basket engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInfo {
    /// Unique batch denom, e.g. `C01-001-20210101-20220101-001`.
    pub denom: String,
    /// Credit class the batch was issued under, e.g. `C01`.
    pub class_id: String,
    /// Project the batch was issued for, e.g. `C01-001`.
    pub project_id: String,
    /// Credit type abbreviation, e.g. `C` for carbon.
    pub credit_type: String,
    /// Start of the monitoring period (the batch vintage).
    pub start_date: DateTime<Utc>,
    /// End of the monitoring period.
    pub end_date: DateTime<Utc>,
}

impl BatchInfo {
    /// Builds batch metadata for a new issuance, deriving the class, credit
    /// type and denom from the project ID.
    ///
    /// # Errors
    ///
    /// Returns [`CreditError::InvalidProjectId`] or
    /// [`CreditError::InvalidClassId`] for malformed identifiers and
    /// [`CreditError::InvalidDateRange`] if `end_date < start_date`.
    pub fn issue(
        project_id: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        sequence: u64,
    ) -> Result<Self, CreditError> {
        let class_id = class_of_project(project_id)?;
        let credit_type = credit_type_of_class(class_id)?;

        if end_date < start_date {
            return Err(CreditError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }

        let denom = format!(
            "{}-{}-{}-{:03}",
            project_id,
            start_date.format("%Y%m%d"),
            end_date.format("%Y%m%d"),
            sequence
        );

        Ok(Self {
            denom,
            class_id: class_id.to_string(),
            project_id: project_id.to_string(),
            credit_type: credit_type.to_string(),
            start_date,
            end_date,
        })
    }
}

/// Extracts the credit type abbreviation from a class ID (`C01` -> `C`).
pub fn credit_type_of_class(class_id: &str) -> Result<&str, CreditError> {
    let split = class_id
        .find(|c: char| !c.is_ascii_uppercase())
        .unwrap_or(class_id.len());
    let (abbreviation, digits) = class_id.split_at(split);

    if abbreviation.is_empty()
        || abbreviation.len() > CREDIT_TYPE_MAX_LENGTH
        || digits.is_empty()
        || !digits.chars().all(|c| c.is_ascii_digit())
    {
        return Err(CreditError::InvalidClassId(class_id.to_string()));
    }

    Ok(abbreviation)
}

/// Extracts the class ID from a project ID (`C01-001` -> `C01`).
fn class_of_project(project_id: &str) -> Result<&str, CreditError> {
    match project_id.rsplit_once('-') {
        Some((class_id, sequence))
            if !sequence.is_empty() && sequence.chars().all(|c| c.is_ascii_digit()) =>
        {
            Ok(class_id)
        }
        _ => Err(CreditError::InvalidProjectId(project_id.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Scaling
// ---------------------------------------------------------------------------

/// Converts batch credits to basket-token units. `None` on overflow or an
/// exponent whose power does not fit in `u64`.
pub fn credits_to_tokens(credits: u64, exponent: u32) -> Option<u64> {
    credits.checked_mul(10u64.checked_pow(exponent)?)
}

/// Converts basket-token units back to batch credits.
///
/// Returns `None` unless `tokens` is an exact multiple of `10^exponent`;
/// a fractional credit cannot be handed out.
pub fn tokens_to_credits(tokens: u64, exponent: u32) -> Option<u64> {
    let factor = 10u64.checked_pow(exponent)?;
    if tokens % factor != 0 {
        return None;
    }
    Some(tokens / factor)
}
