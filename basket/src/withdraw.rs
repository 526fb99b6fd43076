//! # Withdrawal Selector
//!
//! Redeems basket tokens for the underlying batch credits.
//!
//! Without an explicit batch list the engine picks on the redeemer's
//! behalf: balances are walked oldest start date first (ties broken by batch
//! denom), each batch is drained fully before moving on, and the last batch
//! taken may be partial.
//!
//! ```text
//! X (2019) 500 │█████│        redeem 700
//! Y (2021) 500 │██···│   ─►   X 500, Y 200      (Y row left at 300)
//! ```
//!
//! Credits leave the basket escrow and are either retired in the
//! redeemer's name or handed over tradable, depending on the basket's
//! auto-retire setting and the request.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ecobasket_protocol::bank::Bank;
use ecobasket_protocol::credit::tokens_to_credits;
use ecobasket_protocol::storage::KvStore;

use crate::basket::Basket;
use crate::deposit::BasketCredit;
use crate::engine::BasketEngine;
use crate::error::{BasketError, BasketResult, SupplyScope};
use crate::ledger::{BasketBalance, BasketLedger};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub redeemer: String,
    pub basket_denom: String,
    /// Basket tokens to burn.
    pub amount: u64,
    /// Batches to take, in batch-credit units. `None` lets the engine
    /// choose oldest first.
    pub batches: Option<Vec<BasketCredit>>,
    /// Retire the credits even if the basket disables auto-retire.
    pub retire_on_take: bool,
    /// Where the retirement is claimed. Blank or absent records the
    /// retirement without a location.
    pub retirement_jurisdiction: Option<String>,
}

impl WithdrawRequest {
    /// Redeem `amount` tokens with default selection and no retirement
    /// location.
    pub fn new(redeemer: impl Into<String>, basket_denom: impl Into<String>, amount: u64) -> Self {
        Self {
            redeemer: redeemer.into(),
            basket_denom: basket_denom.into(),
            amount,
            batches: None,
            retire_on_take: false,
            retirement_jurisdiction: None,
        }
    }

    pub fn with_batches(mut self, batches: Vec<BasketCredit>) -> Self {
        self.batches = Some(batches);
        self
    }

    pub fn retiring_in(mut self, jurisdiction: impl Into<String>) -> Self {
        self.retire_on_take = true;
        self.retirement_jurisdiction = Some(jurisdiction.into());
        self
    }
}

/// Outcome of a committed withdrawal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawReceipt {
    pub basket_denom: String,
    pub redeemer: String,
    pub burned: u64,
    /// Credits taken from each batch, in the order they were taken.
    pub credits: Vec<BasketCredit>,
    /// Whether the credits were retired rather than returned tradable.
    pub retired: bool,
}

/// Default selection fell short of the requested credits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shortfall {
    pub available: u64,
    pub requested: u64,
}

/// Picks credits from `balances` (already in selection order) until
/// `credits_needed` is covered.
pub fn select_credits(
    balances: &[BasketBalance],
    credits_needed: u64,
) -> Result<Vec<BasketCredit>, Shortfall> {
    let mut remaining = credits_needed;
    let mut selected = Vec::new();

    for row in balances {
        if remaining == 0 {
            break;
        }
        let take = row.balance.min(remaining);
        if take == 0 {
            continue;
        }
        selected.push(BasketCredit::new(row.batch_denom.clone(), take));
        remaining -= take;
    }

    if remaining > 0 {
        return Err(Shortfall {
            available: credits_needed - remaining,
            requested: credits_needed,
        });
    }
    Ok(selected)
}

impl<S: KvStore> BasketEngine<S> {
    /// Burns basket tokens and releases the backing credits.
    ///
    /// # Errors
    ///
    /// | Error | Cause |
    /// |-------|-------|
    /// | [`BasketError::InvalidAmount`] | zero, or not a whole number of credits; explicit batches that do not add up |
    /// | [`BasketError::UnknownBasket`] | basket does not exist |
    /// | [`BasketError::InsufficientSupply`] | redeemer holds too few tokens, or basket/batch backing is short |
    /// | [`BasketError::UnknownBatch`] | explicit batch not held by the basket |
    /// | [`BasketError::InvalidRequest`] | the same explicit batch listed twice |
    pub fn withdraw<B: Bank>(&mut self, bank: &mut B, request: WithdrawRequest) -> BasketResult<WithdrawReceipt> {
        let receipt = self.transact(bank, "withdraw", |ledger, bank, _| {
            apply_withdraw(ledger, bank, &request)
        })?;

        let metrics = self.metrics();
        metrics.withdrawals_total.inc();
        metrics.tokens_burned_total.inc_by(receipt.burned);
        metrics
            .withdrawal_batches_selected
            .observe(receipt.credits.len() as f64);

        info!(
            basket = %receipt.basket_denom,
            redeemer = %receipt.redeemer,
            burned = receipt.burned,
            batches = receipt.credits.len(),
            retired = receipt.retired,
            "withdrawal committed"
        );
        Ok(receipt)
    }
}

fn apply_withdraw<S: KvStore, B: Bank>(
    ledger: &mut BasketLedger<S>,
    bank: &mut B,
    request: &WithdrawRequest,
) -> BasketResult<WithdrawReceipt> {
    if request.amount == 0 {
        return Err(BasketError::InvalidAmount("withdrawal of zero tokens".into()));
    }

    let basket = ledger.require_basket(&request.basket_denom)?;
    let credits_needed = tokens_to_credits(request.amount, basket.exponent).ok_or_else(|| {
        BasketError::InvalidAmount(format!(
            "{} tokens is not a whole number of credits at exponent {}",
            request.amount, basket.exponent
        ))
    })?;

    let held = bank.token_balance(&request.redeemer, &basket.denom);
    if held < request.amount {
        return Err(BasketError::InsufficientSupply {
            basket_denom: basket.denom.clone(),
            scope: SupplyScope::Redeemer(request.redeemer.clone()),
            available: held,
            requested: request.amount,
        });
    }

    let retire = !basket.disable_auto_retire || request.retire_on_take;
    let jurisdiction = request
        .retirement_jurisdiction
        .as_deref()
        .map(str::trim)
        .filter(|j| !j.is_empty());

    let credits = match &request.batches {
        Some(batches) => validate_explicit(ledger, &basket, batches, credits_needed)?,
        None => {
            let balances = ledger.ordered_balances(&basket.denom)?;
            select_credits(&balances, credits_needed).map_err(|shortfall| {
                BasketError::InsufficientSupply {
                    basket_denom: basket.denom.clone(),
                    scope: SupplyScope::Backing,
                    available: shortfall.available,
                    requested: shortfall.requested,
                }
            })?
        }
    };
    debug!(basket = %basket.denom, selected = ?credits, "credits selected for withdrawal");

    bank.burn(&request.redeemer, &basket.denom, request.amount)?;

    let escrow = basket.escrow_account();
    for credit in &credits {
        ledger.decrement(&basket.denom, &credit.batch_denom, credit.amount)?;
        bank.transfer_credits(&escrow, &request.redeemer, &credit.batch_denom, credit.amount)?;
        if retire {
            bank.retire_credits(&request.redeemer, &credit.batch_denom, credit.amount, jurisdiction)?;
        }
    }

    let touched: Vec<String> = credits.iter().map(|c| c.batch_denom.clone()).collect();
    ledger.check_invariant(&basket, &*bank, &touched)?;

    Ok(WithdrawReceipt {
        basket_denom: basket.denom,
        redeemer: request.redeemer.clone(),
        burned: request.amount,
        credits,
        retired: retire,
    })
}

/// Checks a caller-chosen batch list: no zero or duplicate entries, every
/// batch held in sufficient quantity, and the total equal to the credits
/// the burned tokens represent.
fn validate_explicit<S: KvStore>(
    ledger: &BasketLedger<S>,
    basket: &Basket,
    batches: &[BasketCredit],
    credits_needed: u64,
) -> BasketResult<Vec<BasketCredit>> {
    let mut total: u64 = 0;
    for (i, credit) in batches.iter().enumerate() {
        if credit.amount == 0 {
            return Err(BasketError::InvalidAmount(format!(
                "zero amount for batch {}",
                credit.batch_denom
            )));
        }
        if batches[..i].iter().any(|c| c.batch_denom == credit.batch_denom) {
            return Err(BasketError::InvalidRequest(format!(
                "batch {} listed more than once",
                credit.batch_denom
            )));
        }

        let record = ledger
            .balance_record(&basket.denom, &credit.batch_denom)?
            .ok_or_else(|| {
                BasketError::UnknownBatch(format!(
                    "{} is not held by {}",
                    credit.batch_denom, basket.denom
                ))
            })?;
        if record.balance < credit.amount {
            return Err(BasketError::InsufficientSupply {
                basket_denom: basket.denom.clone(),
                scope: SupplyScope::Batch(credit.batch_denom.clone()),
                available: record.balance,
                requested: credit.amount,
            });
        }

        total = total
            .checked_add(credit.amount)
            .ok_or_else(|| BasketError::InvalidAmount("explicit batch total overflows".into()))?;
    }

    if total != credits_needed {
        return Err(BasketError::InvalidAmount(format!(
            "explicit batches total {} credits, burned tokens represent {}",
            total, credits_needed
        )));
    }
    Ok(batches.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(batch: &str, year: i32, balance: u64) -> BasketBalance {
        BasketBalance {
            basket_denom: "eco.C.NCT".into(),
            batch_denom: batch.into(),
            batch_start_date: Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap(),
            balance,
        }
    }

    #[test]
    fn oldest_batch_drained_first() {
        let rows = [row("X", 2019, 500), row("Y", 2021, 500)];
        assert_eq!(
            select_credits(&rows, 700).unwrap(),
            vec![BasketCredit::new("X", 500), BasketCredit::new("Y", 200)]
        );
    }

    #[test]
    fn exact_fit_stops_early() {
        let rows = [row("X", 2019, 500), row("Y", 2021, 500)];
        assert_eq!(select_credits(&rows, 500).unwrap(), vec![BasketCredit::new("X", 500)]);
    }

    #[test]
    fn shortfall_reports_what_was_there() {
        let rows = [row("X", 2019, 3), row("Y", 2021, 4)];
        assert_eq!(
            select_credits(&rows, 10),
            Err(Shortfall {
                available: 7,
                requested: 10
            })
        );
        assert_eq!(
            select_credits(&[], 1),
            Err(Shortfall {
                available: 0,
                requested: 1
            })
        );
    }

    #[test]
    fn request_builders() {
        let request = WithdrawRequest::new("bob", "eco.C.NCT", 10)
            .with_batches(vec![BasketCredit::new("X", 10)])
            .retiring_in("US-WA");
        assert!(request.retire_on_take);
        assert_eq!(request.retirement_jurisdiction.as_deref(), Some("US-WA"));
        assert_eq!(request.batches.map(|b| b.len()), Some(1));
    }
}
