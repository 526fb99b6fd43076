//! # MemoryBank — In-Memory Reference Ledger
//!
//! A complete [`Bank`](super::Bank) implementation backed by ordered maps.
//! Used by the engine's tests and by embedders that want to run the engine
//! without a chain underneath it.
//!
//! Balances are keyed `holder -> asset -> amount`. Zero balances are pruned
//! so that two banks holding the same value compare equal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{BankError, BatchRegistry, Checkpoint, CreditLedger, TokenLedger};
use crate::credit::BatchInfo;

type Balances = BTreeMap<String, BTreeMap<String, u64>>;

/// A record of credits retired through [`CreditLedger::retire_credits`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retirement {
    pub holder: String,
    pub batch_denom: String,
    pub amount: u64,
    /// Jurisdiction the retirement is claimed in, e.g. `US-WA`. `None` when
    /// the credits were retired without naming one.
    pub jurisdiction: Option<String>,
}

/// In-memory bank holding batch metadata, credit balances and token
/// balances.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBank {
    batches: BTreeMap<String, BatchInfo>,
    /// Tradable credits: holder -> batch -> amount.
    tradable: Balances,
    /// Retired credits: holder -> batch -> amount.
    retired: Balances,
    /// Basket tokens: holder -> denom -> amount.
    tokens: Balances,
    /// Outstanding supply per token denom.
    supply: BTreeMap<String, u64>,
    retirements: Vec<Retirement>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers batch metadata. Re-registering a denom replaces it.
    pub fn register_batch(&mut self, batch: BatchInfo) {
        self.batches.insert(batch.denom.clone(), batch);
    }

    /// Issues fresh tradable credits of a registered batch to `holder`.
    ///
    /// # Errors
    ///
    /// Returns [`BankError::UnknownBatch`] if the batch is not registered and
    /// [`BankError::Overflow`] if the holder's balance would overflow.
    pub fn issue_credits(&mut self, holder: &str, batch: &str, amount: u64) -> Result<(), BankError> {
        if !self.batches.contains_key(batch) {
            return Err(BankError::UnknownBatch(batch.to_string()));
        }
        add(&mut self.tradable, holder, batch, amount)
    }

    /// Retired credits of `batch` held by `holder`.
    pub fn retired_balance(&self, holder: &str, batch: &str) -> u64 {
        get(&self.retired, holder, batch)
    }

    /// Every retirement recorded so far, oldest first.
    pub fn retirements(&self) -> &[Retirement] {
        &self.retirements
    }
}

fn get(balances: &Balances, holder: &str, asset: &str) -> u64 {
    balances
        .get(holder)
        .and_then(|assets| assets.get(asset))
        .copied()
        .unwrap_or(0)
}

fn add(balances: &mut Balances, holder: &str, asset: &str, amount: u64) -> Result<(), BankError> {
    if amount == 0 {
        return Ok(());
    }
    let entry = balances
        .entry(holder.to_string())
        .or_default()
        .entry(asset.to_string())
        .or_insert(0);
    *entry = entry.checked_add(amount).ok_or_else(|| BankError::Overflow {
        asset: asset.to_string(),
        amount,
    })?;
    Ok(())
}

fn sub(balances: &mut Balances, holder: &str, asset: &str, amount: u64) -> Result<(), BankError> {
    let available = get(balances, holder, asset);
    if available < amount {
        return Err(BankError::InsufficientFunds {
            holder: holder.to_string(),
            asset: asset.to_string(),
            available,
            requested: amount,
        });
    }
    if amount == 0 {
        return Ok(());
    }

    if let Some(assets) = balances.get_mut(holder) {
        let remaining = available - amount;
        if remaining == 0 {
            assets.remove(asset);
        } else {
            assets.insert(asset.to_string(), remaining);
        }
        if assets.is_empty() {
            balances.remove(holder);
        }
    }
    Ok(())
}

impl BatchRegistry for MemoryBank {
    fn batch(&self, denom: &str) -> Option<BatchInfo> {
        self.batches.get(denom).cloned()
    }
}

impl CreditLedger for MemoryBank {
    fn credit_balance(&self, holder: &str, batch: &str) -> u64 {
        get(&self.tradable, holder, batch)
    }

    fn transfer_credits(
        &mut self,
        from: &str,
        to: &str,
        batch: &str,
        amount: u64,
    ) -> Result<(), BankError> {
        sub(&mut self.tradable, from, batch, amount)?;
        add(&mut self.tradable, to, batch, amount)
    }

    fn retire_credits(
        &mut self,
        holder: &str,
        batch: &str,
        amount: u64,
        jurisdiction: Option<&str>,
    ) -> Result<(), BankError> {
        sub(&mut self.tradable, holder, batch, amount)?;
        add(&mut self.retired, holder, batch, amount)?;
        self.retirements.push(Retirement {
            holder: holder.to_string(),
            batch_denom: batch.to_string(),
            amount,
            jurisdiction: jurisdiction.map(str::to_string),
        });
        Ok(())
    }
}

impl TokenLedger for MemoryBank {
    fn mint(&mut self, holder: &str, denom: &str, amount: u64) -> Result<(), BankError> {
        let current = self.supply.get(denom).copied().unwrap_or(0);
        let new_supply = current.checked_add(amount).ok_or_else(|| BankError::Overflow {
            asset: denom.to_string(),
            amount,
        })?;
        add(&mut self.tokens, holder, denom, amount)?;
        self.supply.insert(denom.to_string(), new_supply);
        Ok(())
    }

    fn burn(&mut self, holder: &str, denom: &str, amount: u64) -> Result<(), BankError> {
        sub(&mut self.tokens, holder, denom, amount)?;
        let remaining = self.supply(denom).saturating_sub(amount);
        if remaining == 0 {
            self.supply.remove(denom);
        } else {
            self.supply.insert(denom.to_string(), remaining);
        }
        Ok(())
    }

    fn supply(&self, denom: &str) -> u64 {
        self.supply.get(denom).copied().unwrap_or(0)
    }

    fn token_balance(&self, holder: &str, denom: &str) -> u64 {
        get(&self.tokens, holder, denom)
    }
}

impl Checkpoint for MemoryBank {
    type Snapshot = MemoryBank;

    fn checkpoint(&self) -> Self::Snapshot {
        self.clone()
    }

    fn rollback(&mut self, snapshot: Self::Snapshot) {
        *self = snapshot;
    }
}
