//! # Protocol Configuration & Constants
//!
//! Every magic number in the basket protocol lives here. Changing one of
//! these after baskets exist in state changes the meaning of stored data,
//! so treat them as frozen once a network launches.

// ---------------------------------------------------------------------------
// Denominations
// ---------------------------------------------------------------------------

/// Leading segment of every basket token denom: `eco.<prefix><type>.<name>`.
pub const BASKET_DENOM_PREFIX: &str = "eco";

/// Exponents a basket may use to scale batch credits into basket tokens,
/// paired with the SI prefix that lands in the basket denom.
///
/// Capped at 18 so that `10^exponent` always fits in a `u64`.
pub const SUPPORTED_EXPONENTS: [(u32, &str); 9] = [
    (0, ""),
    (1, "d"),
    (2, "c"),
    (3, "m"),
    (6, "u"),
    (9, "n"),
    (12, "p"),
    (15, "f"),
    (18, "a"),
];

/// Minimum basket name length.
pub const BASKET_NAME_MIN_LENGTH: usize = 3;

/// Maximum basket name length.
pub const BASKET_NAME_MAX_LENGTH: usize = 8;

/// Maximum credit type abbreviation length (e.g. "C", "BIO").
pub const CREDIT_TYPE_MAX_LENGTH: usize = 3;

/// Maximum basket description length in bytes.
pub const MAX_DESCRIPTION_LENGTH: usize = 256;

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

/// 10,000 basis points = 100%.
pub const BASIS_POINTS_DENOMINATOR: u64 = 10_000;

/// Highest fee rate a basket may charge. A 100% fee mints nothing to the
/// depositor but is still a valid (if odd) configuration.
pub const MAX_FEE_BPS: u16 = 10_000;

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Prefix of the bank account that holds a basket's deposited credits.
pub const ESCROW_ACCOUNT_PREFIX: &str = "basket-escrow/";

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Page size used when a query does not ask for one.
pub const DEFAULT_PAGE_LIMIT: u64 = 100;

/// Hard ceiling on page size, regardless of what the caller asks for.
pub const MAX_PAGE_LIMIT: u64 = 1_000;

/// Maximum number of `(batch, amount)` entries in one deposit.
pub const MAX_DEPOSIT_ENTRIES: usize = 100;

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------

/// Returns the SI prefix for a supported exponent, or `None` if the exponent
/// is not allowed.
pub fn exponent_prefix(exponent: u32) -> Option<&'static str> {
    SUPPORTED_EXPONENTS
        .iter()
        .find(|(e, _)| *e == exponent)
        .map(|(_, prefix)| *prefix)
}

/// Returns the escrow account address for a basket denom.
pub fn escrow_account(basket_denom: &str) -> String {
    format!("{}{}", ESCROW_ACCOUNT_PREFIX, basket_denom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_exponents_fit_in_u64() {
        for (exponent, _) in SUPPORTED_EXPONENTS {
            assert!(10u64.checked_pow(exponent).is_some());
        }
    }

    #[test]
    fn test_exponent_prefixes() {
        assert_eq!(exponent_prefix(0), Some(""));
        assert_eq!(exponent_prefix(6), Some("u"));
        assert_eq!(exponent_prefix(18), Some("a"));
        assert_eq!(exponent_prefix(4), None);
        assert_eq!(exponent_prefix(24), None);
    }

    #[test]
    fn test_escrow_account_is_namespaced() {
        assert_eq!(escrow_account("eco.C.NCT"), "basket-escrow/eco.C.NCT");
    }

    #[test]
    fn test_limit_constants_sanity() {
        assert!(DEFAULT_PAGE_LIMIT <= MAX_PAGE_LIMIT);
        assert!(BASKET_NAME_MIN_LENGTH <= BASKET_NAME_MAX_LENGTH);
        assert_eq!(u64::from(MAX_FEE_BPS), BASIS_POINTS_DENOMINATOR);
    }
}
