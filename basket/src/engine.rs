//! # Basket Engine
//!
//! Entry point for every basket operation. The engine owns the basket state
//! store, the operator configuration and the metrics registry; the bank
//! holding credits and tokens is passed into each call.
//!
//! ## Transactions
//!
//! Every mutating operation runs inside [`BasketEngine::transact`]:
//!
//! ```text
//! bank.checkpoint()
//!   └─► operation writes through CacheStore ─► invariant check
//!         ├── Ok  ─► cache.commit()                      (state persisted)
//!         └── Err ─► cache dropped, bank.rollback()      (no trace left)
//! ```
//!
//! A rejected request therefore changes neither basket state nor bank
//! balances. Operations are processed one at a time; callers that share an
//! engine across threads wrap it in a lock.

use tracing::{error, warn};

use ecobasket_protocol::bank::Bank;
use ecobasket_protocol::storage::{CacheStore, KvRead, KvStore};

use crate::config::EngineConfig;
use crate::error::{BasketError, BasketResult};
use crate::ledger::BasketLedger;
use crate::metrics::BasketMetrics;

/// The basket engine.
pub struct BasketEngine<S> {
    store: S,
    config: EngineConfig,
    metrics: BasketMetrics,
}

impl<S> BasketEngine<S> {
    /// Creates an engine over `store`.
    ///
    /// # Errors
    ///
    /// [`BasketError::Config`] if `config` does not validate,
    /// [`BasketError::Metrics`] if the metrics registry cannot be built.
    pub fn new(store: S, config: EngineConfig) -> BasketResult<Self> {
        config.validate()?;
        let metrics = BasketMetrics::new()?;
        Ok(Self {
            store,
            config,
            metrics,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &BasketMetrics {
        &self.metrics
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

impl<S: KvRead> BasketEngine<S> {
    /// Read-only view of committed state.
    pub(crate) fn ledger(&self) -> BasketLedger<&S> {
        BasketLedger::new(&self.store)
    }
}

impl<S: KvStore> BasketEngine<S> {
    /// Runs `op` atomically against the store and the bank.
    ///
    /// `op` sees a ledger over a write buffer; the buffer is committed only
    /// if `op` returns `Ok`. On any error the bank is rolled back to the
    /// checkpoint taken on entry and the rejection is counted.
    pub(crate) fn transact<B, T, F>(&mut self, bank: &mut B, name: &'static str, op: F) -> BasketResult<T>
    where
        B: Bank,
        F: FnOnce(&mut BasketLedger<CacheStore<'_, S>>, &mut B, &EngineConfig) -> BasketResult<T>,
    {
        let snapshot = bank.checkpoint();
        let mut ledger = BasketLedger::new(CacheStore::new(&mut self.store));

        let result = op(&mut ledger, bank, &self.config).and_then(|value| {
            ledger.into_store().commit()?;
            Ok(value)
        });

        result.map_err(|err| {
            bank.rollback(snapshot);
            self.record_failure(name, &err);
            err
        })
    }

    /// Like [`transact`](Self::transact) for operations that touch only
    /// basket state.
    pub(crate) fn transact_store<T, F>(&mut self, name: &'static str, op: F) -> BasketResult<T>
    where
        F: FnOnce(&mut BasketLedger<CacheStore<'_, S>>, &EngineConfig) -> BasketResult<T>,
    {
        let mut ledger = BasketLedger::new(CacheStore::new(&mut self.store));

        let result = op(&mut ledger, &self.config).and_then(|value| {
            ledger.into_store().commit()?;
            Ok(value)
        });

        result.map_err(|err| {
            self.record_failure(name, &err);
            err
        })
    }

    fn record_failure(&self, name: &'static str, err: &BasketError) {
        self.metrics.record_rejection(err.kind());
        if err.is_fatal() {
            self.metrics.invariant_violations_total.inc();
            error!(operation = name, error = %err, "invariant violated, transaction rolled back");
        } else {
            warn!(operation = name, kind = err.kind(), error = %err, "request rejected");
        }
    }
}
