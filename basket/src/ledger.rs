//! # Basket Ledger
//!
//! The single owner of basket state: basket records and the
//! `(basket, batch) -> amount` balance relation. No other component writes
//! these keys.
//!
//! ## Key Layout
//!
//! | Prefix     | Key                                      | Value                    |
//! |------------|------------------------------------------|--------------------------|
//! | `basket/`  | `denom`                                  | `bincode(Basket)`        |
//! | `balance/` | `basket \0 batch`                        | `bincode(BasketBalance)` |
//! | `order/`   | `basket \0 start_date (8B BE) batch`     | `batch` (UTF-8)          |
//!
//! The `order/` index sorts a basket's batches by start date, then by batch
//! denom, which is exactly the withdrawal selection order. Start dates are
//! stored as the Unix timestamp with the sign bit flipped, big-endian, so
//! byte order matches time order even before 1970.
//!
//! ## Invariant
//!
//! For every basket, `sum(balance) * 10^exponent == token supply`, and the
//! basket's escrow account holds exactly the recorded amount of each batch.
//! [`BasketLedger::check_invariant`] verifies this after every mutating
//! transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ecobasket_protocol::bank::{CreditLedger, TokenLedger};
use ecobasket_protocol::credit::{credits_to_tokens, BatchInfo};
use ecobasket_protocol::storage::kv::decode;
use ecobasket_protocol::storage::{KvRead, KvStore, TypedKv};

use crate::basket::Basket;
use crate::error::{BasketError, BasketResult, SupplyScope};
use crate::pagination::{paginate, Page, PageRequest};

const BASKET_PREFIX: &[u8] = b"basket/";
const BALANCE_PREFIX: &[u8] = b"balance/";
const ORDER_PREFIX: &[u8] = b"order/";
const SEPARATOR: u8 = 0x00;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

fn basket_key(denom: &str) -> Vec<u8> {
    [BASKET_PREFIX, denom.as_bytes()].concat()
}

fn balance_prefix(basket_denom: &str) -> Vec<u8> {
    [BALANCE_PREFIX, basket_denom.as_bytes(), &[SEPARATOR]].concat()
}

fn balance_key(basket_denom: &str, batch_denom: &str) -> Vec<u8> {
    [balance_prefix(basket_denom).as_slice(), batch_denom.as_bytes()].concat()
}

fn order_prefix(basket_denom: &str) -> Vec<u8> {
    [ORDER_PREFIX, basket_denom.as_bytes(), &[SEPARATOR]].concat()
}

fn order_key(basket_denom: &str, start_date: DateTime<Utc>, batch_denom: &str) -> Vec<u8> {
    [
        order_prefix(basket_denom).as_slice(),
        &date_key(start_date),
        batch_denom.as_bytes(),
    ]
    .concat()
}

fn date_key(date: DateTime<Utc>) -> [u8; 8] {
    ((date.timestamp() as u64) ^ (1 << 63)).to_be_bytes()
}

// ---------------------------------------------------------------------------
// BasketBalance
// ---------------------------------------------------------------------------

/// Credits of one batch held by one basket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketBalance {
    pub basket_denom: String,
    pub batch_denom: String,
    /// Copied from the batch at first deposit; drives selection order.
    pub batch_start_date: DateTime<Utc>,
    /// Amount in batch-credit units.
    pub balance: u64,
}

// ---------------------------------------------------------------------------
// BasketLedger
// ---------------------------------------------------------------------------

/// Typed view of basket state over a key-value store.
pub struct BasketLedger<S> {
    store: S,
}

impl<S> BasketLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

impl<S: KvRead> BasketLedger<S> {
    pub fn get_basket(&self, denom: &str) -> BasketResult<Option<Basket>> {
        Ok(self.store.get_typed(&basket_key(denom))?)
    }

    /// Like [`get_basket`](Self::get_basket) but absence is an error.
    pub fn require_basket(&self, denom: &str) -> BasketResult<Basket> {
        self.get_basket(denom)?
            .ok_or_else(|| BasketError::UnknownBasket(denom.to_string()))
    }

    /// Baskets ordered by denom.
    pub fn list_baskets(&self, request: &PageRequest) -> BasketResult<Page<Basket>> {
        let entries = self.store.scan_prefix(BASKET_PREFIX)?;
        let (entries, page) = paginate(entries, BASKET_PREFIX, request);
        let items = entries
            .iter()
            .map(|(_, value)| decode(value))
            .collect::<Result<Vec<Basket>, _>>()?;
        Ok(Page { items, page })
    }

    pub fn balance_record(
        &self,
        basket_denom: &str,
        batch_denom: &str,
    ) -> BasketResult<Option<BasketBalance>> {
        Ok(self.store.get_typed(&balance_key(basket_denom, batch_denom))?)
    }

    /// Credits of `batch_denom` held by the basket; 0 if none.
    pub fn get_balance(&self, basket_denom: &str, batch_denom: &str) -> BasketResult<u64> {
        Ok(self
            .balance_record(basket_denom, batch_denom)?
            .map_or(0, |record| record.balance))
    }

    /// One page of a basket's balances, oldest start date first.
    pub fn list_balances(
        &self,
        basket_denom: &str,
        request: &PageRequest,
    ) -> BasketResult<Page<BasketBalance>> {
        let prefix = order_prefix(basket_denom);
        let entries = self.store.scan_prefix(&prefix)?;
        let (entries, page) = paginate(entries, &prefix, request);
        let items = entries
            .iter()
            .map(|(_, batch)| self.indexed_balance(basket_denom, batch))
            .collect::<BasketResult<Vec<_>>>()?;
        Ok(Page { items, page })
    }

    /// Every balance of a basket in selection order.
    pub fn ordered_balances(&self, basket_denom: &str) -> BasketResult<Vec<BasketBalance>> {
        self.store
            .scan_prefix(&order_prefix(basket_denom))?
            .iter()
            .map(|(_, batch)| self.indexed_balance(basket_denom, batch))
            .collect()
    }

    fn indexed_balance(&self, basket_denom: &str, batch: &[u8]) -> BasketResult<BasketBalance> {
        let batch_denom = String::from_utf8_lossy(batch);
        self.balance_record(basket_denom, &batch_denom)?
            .ok_or_else(|| BasketError::InvariantViolation {
                basket_denom: basket_denom.to_string(),
                backing: 0,
                supply: 0,
                detail: format!("order index references missing balance for {}", batch_denom),
            })
    }

    /// Sum of all balances in batch-credit units.
    ///
    /// Deposits refuse amounts that would push supply past `u64`, so the
    /// recorded balances of a consistent basket always fit. An overflowing
    /// sum means the stored rows are corrupt and is reported as
    /// [`BasketError::InvariantViolation`].
    pub fn total_credits(&self, basket_denom: &str) -> BasketResult<u64> {
        let mut total: u64 = 0;
        for (_, value) in self.store.scan_prefix(&balance_prefix(basket_denom))? {
            let record: BasketBalance = decode(&value)?;
            total = total
                .checked_add(record.balance)
                .ok_or_else(|| overflowed(basket_denom, "recorded balances overflow u64"))?;
        }
        Ok(total)
    }

    /// Backing in basket-token units. Overflow is an invariant violation,
    /// as for [`total_credits`](Self::total_credits).
    pub fn total_backing(&self, basket: &Basket) -> BasketResult<u64> {
        let credits = self.total_credits(&basket.denom)?;
        credits_to_tokens(credits, basket.exponent)
            .ok_or_else(|| overflowed(&basket.denom, "backing overflows token units"))
    }

    /// Verifies backing against supply, and the escrow account against the
    /// recorded balance of each batch in `touched`.
    pub fn check_invariant<B>(&self, basket: &Basket, bank: &B, touched: &[String]) -> BasketResult<()>
    where
        B: CreditLedger + TokenLedger,
    {
        let backing = self.total_backing(basket)?;
        let supply = bank.supply(&basket.denom);
        if backing != supply {
            return Err(BasketError::InvariantViolation {
                basket_denom: basket.denom.clone(),
                backing,
                supply,
                detail: "backing does not match token supply".into(),
            });
        }

        let escrow = basket.escrow_account();
        for batch_denom in touched {
            let recorded = self.get_balance(&basket.denom, batch_denom)?;
            let held = bank.credit_balance(&escrow, batch_denom);
            if recorded != held {
                return Err(BasketError::InvariantViolation {
                    basket_denom: basket.denom.clone(),
                    backing,
                    supply,
                    detail: format!(
                        "escrow holds {} of {}, ledger records {}",
                        held, batch_denom, recorded
                    ),
                });
            }
        }
        Ok(())
    }
}

impl<S: KvStore> BasketLedger<S> {
    pub fn put_basket(&mut self, basket: &Basket) -> BasketResult<()> {
        self.store.put_typed(&basket_key(&basket.denom), basket)?;
        Ok(())
    }

    /// Adds `amount` credits of `batch` to the basket. Returns the new
    /// balance.
    pub fn increment(&mut self, basket_denom: &str, batch: &BatchInfo, amount: u64) -> BasketResult<u64> {
        let key = balance_key(basket_denom, &batch.denom);
        let mut record = match self.store.get_typed::<BasketBalance>(&key)? {
            Some(record) => record,
            None => {
                self.store.set(
                    &order_key(basket_denom, batch.start_date, &batch.denom),
                    batch.denom.as_bytes(),
                )?;
                BasketBalance {
                    basket_denom: basket_denom.to_string(),
                    batch_denom: batch.denom.clone(),
                    batch_start_date: batch.start_date,
                    balance: 0,
                }
            }
        };

        record.balance = record.balance.checked_add(amount).ok_or_else(|| {
            BasketError::InvalidAmount(format!(
                "balance of {} in {} overflows",
                batch.denom, basket_denom
            ))
        })?;
        self.store.put_typed(&key, &record)?;
        Ok(record.balance)
    }

    /// Removes `amount` credits of `batch_denom` from the basket. Rows that
    /// reach zero are deleted. Returns the remaining balance.
    ///
    /// # Errors
    ///
    /// [`BasketError::UnknownBatch`] if the basket does not hold the batch,
    /// [`BasketError::InsufficientSupply`] if it holds less than `amount`.
    pub fn decrement(&mut self, basket_denom: &str, batch_denom: &str, amount: u64) -> BasketResult<u64> {
        let key = balance_key(basket_denom, batch_denom);
        let mut record = self
            .store
            .get_typed::<BasketBalance>(&key)?
            .ok_or_else(|| {
                BasketError::UnknownBatch(format!("{} is not held by {}", batch_denom, basket_denom))
            })?;

        if record.balance < amount {
            return Err(BasketError::InsufficientSupply {
                basket_denom: basket_denom.to_string(),
                scope: SupplyScope::Batch(batch_denom.to_string()),
                available: record.balance,
                requested: amount,
            });
        }

        record.balance -= amount;
        if record.balance == 0 {
            self.store.delete(&key)?;
            self.store
                .delete(&order_key(basket_denom, record.batch_start_date, batch_denom))?;
        } else {
            self.store.put_typed(&key, &record)?;
        }
        Ok(record.balance)
    }
}

/// Backing that no longer fits a `u64` is reported saturated.
fn overflowed(basket_denom: &str, detail: &str) -> BasketError {
    BasketError::InvariantViolation {
        basket_denom: basket_denom.to_string(),
        backing: u64::MAX,
        supply: 0,
        detail: detail.to_string(),
    }
}
