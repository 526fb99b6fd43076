//! # Deposit Processor
//!
//! Turns batch credits into basket tokens.
//!
//! ```text
//! validate ─► resolve batches ─► eligibility ─► depositor balances
//!    ─► gross = Σ credits × 10^exponent ─► fee split
//!    ─► credits: depositor → escrow     ─► rows += credits
//!    ─► mint net → depositor, fee → collector
//!    ─► invariant check
//! ```
//!
//! Every check runs before the first transfer, and the whole sequence sits
//! inside one engine transaction, so a deposit either lands completely or
//! not at all.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use ecobasket_protocol::bank::Bank;
use ecobasket_protocol::credit::{credits_to_tokens, BatchInfo};
use ecobasket_protocol::storage::KvStore;

use crate::config::EngineConfig;
use crate::eligibility::check_eligibility;
use crate::engine::BasketEngine;
use crate::error::{BasketError, BasketResult};
use crate::fee::compute_fee;
use crate::ledger::BasketLedger;

/// An amount of one batch, in batch-credit units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketCredit {
    pub batch_denom: String,
    pub amount: u64,
}

impl BasketCredit {
    pub fn new(batch_denom: impl Into<String>, amount: u64) -> Self {
        Self {
            batch_denom: batch_denom.into(),
            amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub depositor: String,
    pub basket_denom: String,
    pub credits: Vec<BasketCredit>,
}

/// Outcome of a committed deposit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub basket_denom: String,
    pub depositor: String,
    /// Backing added, in token units.
    pub gross: u64,
    /// Tokens minted to the depositor.
    pub minted: u64,
    /// Tokens minted to the fee collector.
    pub fee: u64,
    /// Credits moved into the basket, duplicates merged.
    pub credits: Vec<BasketCredit>,
}

impl<S: KvStore> BasketEngine<S> {
    /// Deposits batch credits into a basket in exchange for basket tokens.
    ///
    /// `block_time` is the reference time for relative date criteria.
    ///
    /// # Errors
    ///
    /// | Error | Cause |
    /// |-------|-------|
    /// | [`BasketError::InvalidAmount`] | no credits, a zero amount, or gross token overflow |
    /// | [`BasketError::InvalidRequest`] | more entries than `max_deposit_entries` |
    /// | [`BasketError::UnknownBasket`] | basket does not exist |
    /// | [`BasketError::UnknownBatch`] | batch not in the registry |
    /// | [`BasketError::Ineligible`] | batch fails the basket criteria |
    /// | [`BasketError::InsufficientBalance`] | depositor holds too few credits |
    pub fn deposit<B: Bank>(
        &mut self,
        bank: &mut B,
        request: DepositRequest,
        block_time: DateTime<Utc>,
    ) -> BasketResult<DepositReceipt> {
        let receipt = self.transact(bank, "deposit", |ledger, bank, config| {
            apply_deposit(ledger, bank, config, &request, block_time)
        })?;

        let metrics = self.metrics();
        metrics.deposits_total.inc();
        metrics.tokens_minted_total.inc_by(receipt.gross);
        metrics.fees_collected_total.inc_by(receipt.fee);

        info!(
            basket = %receipt.basket_denom,
            depositor = %receipt.depositor,
            minted = receipt.minted,
            fee = receipt.fee,
            batches = receipt.credits.len(),
            "deposit committed"
        );
        Ok(receipt)
    }
}

fn apply_deposit<S: KvStore, B: Bank>(
    ledger: &mut BasketLedger<S>,
    bank: &mut B,
    config: &EngineConfig,
    request: &DepositRequest,
    block_time: DateTime<Utc>,
) -> BasketResult<DepositReceipt> {
    if request.credits.is_empty() {
        return Err(BasketError::InvalidAmount("deposit contains no credits".into()));
    }
    if request.credits.len() > config.max_deposit_entries {
        return Err(BasketError::InvalidRequest(format!(
            "deposit has {} entries, at most {} allowed",
            request.credits.len(),
            config.max_deposit_entries
        )));
    }

    let basket = ledger.require_basket(&request.basket_denom)?;
    let credits = merge_credits(&request.credits)?;

    let mut batches: Vec<BatchInfo> = Vec::with_capacity(credits.len());
    let mut total_credits: u64 = 0;
    for credit in &credits {
        let batch = bank
            .batch(&credit.batch_denom)
            .ok_or_else(|| BasketError::UnknownBatch(credit.batch_denom.clone()))?;

        check_eligibility(&basket.criteria, &batch, block_time).map_err(|reason| {
            BasketError::Ineligible {
                basket_denom: basket.denom.clone(),
                batch_denom: batch.denom.clone(),
                reason,
            }
        })?;

        let available = bank.credit_balance(&request.depositor, &credit.batch_denom);
        if available < credit.amount {
            return Err(BasketError::InsufficientBalance {
                holder: request.depositor.clone(),
                batch_denom: credit.batch_denom.clone(),
                available,
                requested: credit.amount,
            });
        }

        total_credits = total_credits
            .checked_add(credit.amount)
            .ok_or_else(|| BasketError::InvalidAmount("deposit total overflows".into()))?;
        batches.push(batch);
    }

    let gross = credits_to_tokens(total_credits, basket.exponent).ok_or_else(|| {
        BasketError::InvalidAmount(format!(
            "{} credits overflow token units at exponent {}",
            total_credits, basket.exponent
        ))
    })?;
    let split = compute_fee(gross, basket.effective_fee_bps(config.default_fee_bps));

    // Nothing has moved yet. Supply and backing must both absorb `gross`.
    let supply = bank.supply(&basket.denom);
    let backing = ledger.total_backing(&basket)?;
    if supply.checked_add(gross).is_none() || backing.checked_add(gross).is_none() {
        return Err(BasketError::InvalidAmount(format!(
            "depositing {} tokens overflows the supply of {} ({} outstanding)",
            gross, basket.denom, supply
        )));
    }

    let escrow = basket.escrow_account();
    for (credit, batch) in credits.iter().zip(&batches) {
        bank.transfer_credits(&request.depositor, &escrow, &credit.batch_denom, credit.amount)?;
        ledger.increment(&basket.denom, batch, credit.amount)?;
    }
    if split.net > 0 {
        bank.mint(&request.depositor, &basket.denom, split.net)?;
    }
    if split.fee > 0 {
        bank.mint(&config.fee_collector, &basket.denom, split.fee)?;
    }

    let touched: Vec<String> = credits.iter().map(|c| c.batch_denom.clone()).collect();
    ledger.check_invariant(&basket, &*bank, &touched)?;

    Ok(DepositReceipt {
        basket_denom: basket.denom,
        depositor: request.depositor.clone(),
        gross,
        minted: split.net,
        fee: split.fee,
        credits,
    })
}

/// Sums duplicate batch entries, keeping first-appearance order.
fn merge_credits(credits: &[BasketCredit]) -> BasketResult<Vec<BasketCredit>> {
    let mut merged: Vec<BasketCredit> = Vec::with_capacity(credits.len());
    let mut index: BTreeMap<&str, usize> = BTreeMap::new();

    for credit in credits {
        if credit.amount == 0 {
            return Err(BasketError::InvalidAmount(format!(
                "zero amount for batch {}",
                credit.batch_denom
            )));
        }
        match index.get(credit.batch_denom.as_str()) {
            Some(&i) => {
                merged[i].amount = merged[i].amount.checked_add(credit.amount).ok_or_else(|| {
                    BasketError::InvalidAmount(format!("amount of {} overflows", credit.batch_denom))
                })?;
            }
            None => {
                index.insert(&credit.batch_denom, merged.len());
                merged.push(credit.clone());
            }
        }
    }
    Ok(merged)
}
