//! # Basket Definitions
//!
//! A basket is a named pool that accepts credit batches matching its
//! criteria and issues one fungible token in exchange. Its identity is the
//! token denom, derived once at creation:
//!
//! ```text
//! eco . <SI prefix of exponent><credit type> . <name>
//! eco.C.NCT        exponent 0, carbon
//! eco.uC.NCT       exponent 6, carbon
//! ```
//!
//! Baskets are never deleted. Tokens minted years ago must stay redeemable
//! for as long as any supply is outstanding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ecobasket_protocol::config::{
    escrow_account, exponent_prefix, BASKET_DENOM_PREFIX, BASKET_NAME_MAX_LENGTH,
    BASKET_NAME_MIN_LENGTH, CREDIT_TYPE_MAX_LENGTH, MAX_DESCRIPTION_LENGTH, MAX_FEE_BPS,
};

use crate::error::{BasketError, BasketResult};

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// How a basket decides whether a batch is too old.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateCriteria {
    /// Batch start date must be on or after this instant.
    MinStartDate(DateTime<Utc>),
    /// Batch start date must be within this many seconds before the
    /// current block time.
    StartDateWindow { seconds: u64 },
    /// Batch start year must be no more than this many years before the
    /// current block time's year.
    YearsInThePast(u32),
}

/// Acceptance criteria for deposits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketCriteria {
    /// Credit type abbreviation every batch must carry, e.g. `C`.
    pub credit_type: String,
    /// Credit classes accepted. Empty means any class of the credit type.
    pub allowed_classes: Vec<String>,
    /// Optional age restriction.
    pub date_criteria: Option<DateCriteria>,
}

impl BasketCriteria {
    /// Criteria accepting any batch of a credit type.
    pub fn credit_type(credit_type: impl Into<String>) -> Self {
        Self {
            credit_type: credit_type.into(),
            allowed_classes: Vec::new(),
            date_criteria: None,
        }
    }

    pub fn with_min_start_date(mut self, date: DateTime<Utc>) -> Self {
        self.date_criteria = Some(DateCriteria::MinStartDate(date));
        self
    }

    pub fn with_date_criteria(mut self, criteria: DateCriteria) -> Self {
        self.date_criteria = Some(criteria);
        self
    }

    pub fn with_allowed_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_classes = classes.into_iter().map(Into::into).collect();
        self
    }

    /// Validates the criteria.
    ///
    /// # Errors
    ///
    /// Returns [`BasketError::InvalidBasket`] for a malformed credit type,
    /// an empty or duplicated class ID, or a zero-length date window.
    pub fn validate(&self) -> BasketResult<()> {
        validate_credit_type(&self.credit_type)?;

        let mut seen = std::collections::BTreeSet::new();
        for class_id in &self.allowed_classes {
            if class_id.trim().is_empty() {
                return Err(BasketError::InvalidBasket("allowed class id must not be empty".into()));
            }
            if !seen.insert(class_id.as_str()) {
                return Err(BasketError::InvalidBasket(format!(
                    "duplicate allowed class id {}",
                    class_id
                )));
            }
        }

        if let Some(DateCriteria::StartDateWindow { seconds: 0 }) = self.date_criteria {
            return Err(BasketError::InvalidBasket("start date window must be positive".into()));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Basket
// ---------------------------------------------------------------------------

/// A stored basket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basket {
    /// Basket token denom; the basket's identity.
    pub denom: String,
    pub name: String,
    pub description: String,
    /// Account allowed to hand curation to someone else.
    pub curator: String,
    pub criteria: BasketCriteria,
    /// Basket tokens per batch credit = `10^exponent`.
    pub exponent: u32,
    /// Deposit fee in basis points. `None` uses the engine default.
    pub fee_bps: Option<u16>,
    /// When `false`, credits taken from the basket are always retired.
    pub disable_auto_retire: bool,
    pub created_at: DateTime<Utc>,
}

impl Basket {
    /// Fee rate in effect, given the engine-wide default.
    pub fn effective_fee_bps(&self, default_fee_bps: u16) -> u16 {
        self.fee_bps.unwrap_or(default_fee_bps)
    }

    /// Bank account holding this basket's deposited credits.
    pub fn escrow_account(&self) -> String {
        escrow_account(&self.denom)
    }
}

/// Parameters for creating a basket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBasket {
    pub name: String,
    pub description: String,
    pub curator: String,
    pub criteria: BasketCriteria,
    pub exponent: u32,
    pub fee_bps: Option<u16>,
    pub disable_auto_retire: bool,
}

impl CreateBasket {
    /// Validates every field and builds the basket record.
    pub fn into_basket(self, created_at: DateTime<Utc>) -> BasketResult<Basket> {
        validate_name(&self.name)?;
        self.criteria.validate()?;
        if self.description.len() > MAX_DESCRIPTION_LENGTH {
            return Err(BasketError::InvalidBasket(format!(
                "description exceeds {} bytes",
                MAX_DESCRIPTION_LENGTH
            )));
        }
        if self.curator.trim().is_empty() {
            return Err(BasketError::InvalidBasket("curator must not be empty".into()));
        }
        validate_fee(self.fee_bps)?;

        let denom = basket_denom(&self.name, &self.criteria.credit_type, self.exponent)?;

        Ok(Basket {
            denom,
            name: self.name,
            description: self.description,
            curator: self.curator,
            criteria: self.criteria,
            exponent: self.exponent,
            fee_bps: self.fee_bps,
            disable_auto_retire: self.disable_auto_retire,
            created_at,
        })
    }
}

/// A governance change to an existing basket. `None` fields are left as
/// they are.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketUpdate {
    pub criteria: Option<BasketCriteria>,
    /// `Some(None)` resets the basket to the engine default fee.
    pub fee_bps: Option<Option<u16>>,
    pub disable_auto_retire: Option<bool>,
}

impl BasketUpdate {
    pub fn is_empty(&self) -> bool {
        self.criteria.is_none() && self.fee_bps.is_none() && self.disable_auto_retire.is_none()
    }

    /// Validates the update and applies it to `basket`.
    ///
    /// The credit type is part of the denom and cannot change.
    pub fn apply_to(self, basket: &mut Basket) -> BasketResult<()> {
        if self.is_empty() {
            return Err(BasketError::InvalidRequest("basket update changes nothing".into()));
        }
        if let Some(criteria) = &self.criteria {
            criteria.validate()?;
            if criteria.credit_type != basket.criteria.credit_type {
                return Err(BasketError::InvalidBasket(format!(
                    "credit type of {} is fixed to {}",
                    basket.denom, basket.criteria.credit_type
                )));
            }
        }
        if let Some(fee_bps) = self.fee_bps {
            validate_fee(fee_bps)?;
        }

        if let Some(criteria) = self.criteria {
            basket.criteria = criteria;
        }
        if let Some(fee_bps) = self.fee_bps {
            basket.fee_bps = fee_bps;
        }
        if let Some(disable_auto_retire) = self.disable_auto_retire {
            basket.disable_auto_retire = disable_auto_retire;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Builds a basket denom from its parts.
pub fn basket_denom(name: &str, credit_type: &str, exponent: u32) -> BasketResult<String> {
    let prefix = exponent_prefix(exponent)
        .ok_or_else(|| BasketError::InvalidBasket(format!("unsupported exponent {}", exponent)))?;
    Ok(format!(
        "{}.{}{}.{}",
        BASKET_DENOM_PREFIX, prefix, credit_type, name
    ))
}

/// Names start with a letter, are alphanumeric, and are 3 to 8 characters.
fn validate_name(name: &str) -> BasketResult<()> {
    let len = name.chars().count();
    let starts_with_letter = name.chars().next().map_or(false, |c| c.is_ascii_alphabetic());
    if !(BASKET_NAME_MIN_LENGTH..=BASKET_NAME_MAX_LENGTH).contains(&len)
        || !starts_with_letter
        || !name.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(BasketError::InvalidBasket(format!(
            "name {:?} must start with a letter and be {}-{} alphanumeric characters",
            name, BASKET_NAME_MIN_LENGTH, BASKET_NAME_MAX_LENGTH
        )));
    }
    Ok(())
}

fn validate_credit_type(credit_type: &str) -> BasketResult<()> {
    if credit_type.is_empty()
        || credit_type.len() > CREDIT_TYPE_MAX_LENGTH
        || !credit_type.chars().all(|c| c.is_ascii_uppercase())
    {
        return Err(BasketError::InvalidBasket(format!(
            "credit type {:?} must be 1-{} uppercase letters",
            credit_type, CREDIT_TYPE_MAX_LENGTH
        )));
    }
    Ok(())
}

fn validate_fee(fee_bps: Option<u16>) -> BasketResult<()> {
    match fee_bps {
        Some(bps) if bps > MAX_FEE_BPS => Err(BasketError::InvalidBasket(format!(
            "fee {} bps exceeds {} bps",
            bps, MAX_FEE_BPS
        ))),
        _ => Ok(()),
    }
}
