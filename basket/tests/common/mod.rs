//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};

use ecobasket::{BasketCriteria, BasketEngine, CreateBasket, EngineConfig};
use ecobasket_protocol::bank::{MemoryBank, TokenLedger};
use ecobasket_protocol::credit::BatchInfo;
use ecobasket_protocol::storage::KvStore;

pub const AUTHORITY: &str = "gov";
pub const COLLECTOR: &str = "fee-collector";

pub fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// Block time used by every test unless it needs a specific one.
pub fn now() -> DateTime<Utc> {
    date(2024, 6, 1)
}

/// A one-year carbon batch starting on January 1st of `year`.
pub fn batch(project: &str, year: i32) -> BatchInfo {
    let start = date(year, 1, 1);
    BatchInfo::issue(project, start, start + Duration::days(365), 1).unwrap()
}

/// Registers `batch` and issues `amount` tradable credits of it to `holder`.
pub fn fund(bank: &mut MemoryBank, holder: &str, batch: &BatchInfo, amount: u64) {
    bank.register_batch(batch.clone());
    bank.issue_credits(holder, &batch.denom, amount).unwrap();
}

/// Carbon basket parameters; tweak fields with struct update syntax.
pub fn carbon_basket(name: &str) -> CreateBasket {
    CreateBasket {
        name: name.into(),
        description: "carbon basket".into(),
        curator: "curator".into(),
        criteria: BasketCriteria::credit_type("C"),
        exponent: 0,
        fee_bps: None,
        disable_auto_retire: true,
    }
}

/// Same as [`carbon_basket`] but retires credits on every withdrawal.
pub fn auto_retiring_basket(name: &str) -> CreateBasket {
    CreateBasket {
        disable_auto_retire: false,
        ..carbon_basket(name)
    }
}

pub fn engine_over<S: KvStore>(store: S) -> BasketEngine<S> {
    BasketEngine::new(store, EngineConfig::default()).unwrap()
}

/// Asserts the backing of `denom` equals its outstanding supply.
pub fn assert_backed<S: KvStore>(engine: &BasketEngine<S>, bank: &MemoryBank, denom: &str) {
    assert_eq!(
        engine.total_backing(denom).unwrap(),
        bank.supply(denom),
        "backing and supply of {} diverged",
        denom
    );
}
