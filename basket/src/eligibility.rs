//! # Eligibility Filter
//!
//! Decides whether a credit batch may enter a basket. Pure function of the
//! basket criteria, the batch metadata, and the current block time; no side
//! effects.
//!
//! A batch is eligible when all of the following hold:
//!
//! 1. its credit type equals the basket's credit type;
//! 2. its credit class is allowed, if the basket restricts classes;
//! 3. its start date satisfies the basket's date criteria, if any.
//!
//! Rejections say which rule failed and with what values, so the caller can
//! tell the depositor why.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use thiserror::Error;

use ecobasket_protocol::credit::BatchInfo;

use crate::basket::{BasketCriteria, DateCriteria};

/// Why a batch was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ineligibility {
    #[error("credit type {actual} does not match basket credit type {expected}")]
    CreditType { expected: String, actual: String },

    #[error("credit class {class_id} is not in the basket's allowed classes")]
    CreditClass { class_id: String },

    #[error("batch start date {start_date} is before the minimum start date {min_start_date}")]
    StartDateTooEarly {
        start_date: DateTime<Utc>,
        min_start_date: DateTime<Utc>,
    },
}

/// Checks a batch against basket criteria.
pub fn check_eligibility(
    criteria: &BasketCriteria,
    batch: &BatchInfo,
    block_time: DateTime<Utc>,
) -> Result<(), Ineligibility> {
    if batch.credit_type != criteria.credit_type {
        return Err(Ineligibility::CreditType {
            expected: criteria.credit_type.clone(),
            actual: batch.credit_type.clone(),
        });
    }

    if !criteria.allowed_classes.is_empty()
        && !criteria.allowed_classes.iter().any(|c| *c == batch.class_id)
    {
        return Err(Ineligibility::CreditClass {
            class_id: batch.class_id.clone(),
        });
    }

    if let Some(date_criteria) = &criteria.date_criteria {
        let min_start_date = min_start_date(date_criteria, block_time);
        if batch.start_date < min_start_date {
            return Err(Ineligibility::StartDateTooEarly {
                start_date: batch.start_date,
                min_start_date,
            });
        }
    }

    Ok(())
}

/// Boolean form of [`check_eligibility`].
pub fn is_eligible(criteria: &BasketCriteria, batch: &BatchInfo, block_time: DateTime<Utc>) -> bool {
    check_eligibility(criteria, batch, block_time).is_ok()
}

/// Resolves date criteria to the earliest acceptable start date.
fn min_start_date(criteria: &DateCriteria, block_time: DateTime<Utc>) -> DateTime<Utc> {
    match criteria {
        DateCriteria::MinStartDate(date) => *date,
        DateCriteria::StartDateWindow { seconds } => {
            let window = i64::try_from(*seconds)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX);
            block_time
                .checked_sub_signed(window)
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        }
        DateCriteria::YearsInThePast(years) => {
            let year = i32::try_from(*years)
                .ok()
                .and_then(|years| block_time.year().checked_sub(years));
            year.and_then(|year| Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single())
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        }
    }
}
