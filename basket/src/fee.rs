//! # Fee Calculator
//!
//! Deposit fees are a basis-point cut of the basket tokens a deposit would
//! mint. The fee is minted to the fee collector rather than withheld from
//! backing, so a deposit always backs exactly the gross amount:
//!
//! ```text
//! gross = credits * 10^exponent
//! fee   = floor(gross * fee_bps / 10_000)
//! net   = gross - fee              (minted to the depositor)
//! supply increase = net + fee = gross = backing increase
//! ```

use serde::{Deserialize, Serialize};

use ecobasket_protocol::config::{BASIS_POINTS_DENOMINATOR, MAX_FEE_BPS};

/// Result of splitting a gross mint into depositor and collector shares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub gross: u64,
    /// Tokens minted to the depositor.
    pub net: u64,
    /// Tokens minted to the fee collector.
    pub fee: u64,
}

/// Splits `amount` basket tokens at `fee_bps`. The fee rounds down.
///
/// Rates above 10,000 bps are treated as 10,000.
pub fn compute_fee(amount: u64, fee_bps: u16) -> FeeSplit {
    let bps = u128::from(fee_bps.min(MAX_FEE_BPS));
    // amount * bps fits in u128, and the quotient never exceeds amount.
    let fee = (u128::from(amount) * bps / u128::from(BASIS_POINTS_DENOMINATOR)) as u64;
    FeeSplit {
        gross: amount,
        net: amount - fee,
        fee,
    }
}
