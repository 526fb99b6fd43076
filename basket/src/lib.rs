// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ecobasket — Ecocredit Basket Engine
//!
//! Pools non-fungible credit batches into baskets and issues one fungible
//! token per basket in exchange. Any token holder can redeem for underlying
//! credits without naming a batch; the engine picks the oldest batches
//! first.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────────────────────┐
//!  DepositRequest ──►│ eligibility ─► fee ─► ledger │──► Bank (credits, tokens)
//! WithdrawRequest ──►│ selection  ───────►  ledger  │
//!                    └──────────────┬───────────────┘
//!                                   ▼
//!                          KvStore (basket state)
//! ```
//!
//! - **basket** — Basket records, criteria, creation and update parameters.
//! - **eligibility** — Which batches a basket accepts.
//! - **fee** — Basis-point deposit fee.
//! - **ledger** — Basket balances and the backing/supply invariant.
//! - **deposit** / **withdraw** — The two value-moving operations.
//! - **governance** — Authority-gated basket lifecycle.
//! - **query** — Paginated read-only views.
//! - **engine** — Ties it together; every mutation is one atomic
//!   transaction.
//!
//! ## Example
//!
//! ```no_run
//! use chrono::Utc;
//! use ecobasket::{BasketCredit, BasketCriteria, BasketEngine, CreateBasket, DepositRequest, EngineConfig};
//! use ecobasket_protocol::bank::MemoryBank;
//! use ecobasket_protocol::storage::MemStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut engine = BasketEngine::new(MemStore::new(), EngineConfig::default())?;
//! let mut bank = MemoryBank::new();
//!
//! let basket = engine.create_basket(
//!     "gov",
//!     CreateBasket {
//!         name: "NCT".into(),
//!         description: "nature carbon tonne".into(),
//!         curator: "curator".into(),
//!         criteria: BasketCriteria::credit_type("C"),
//!         exponent: 0,
//!         fee_bps: None,
//!         disable_auto_retire: false,
//!     },
//!     Utc::now(),
//! )?;
//!
//! let receipt = engine.deposit(
//!     &mut bank,
//!     DepositRequest {
//!         depositor: "alice".into(),
//!         basket_denom: basket.denom.clone(),
//!         credits: vec![BasketCredit::new("C01-001-20200101-20201231-001", 100)],
//!     },
//!     Utc::now(),
//! )?;
//! println!("minted {}", receipt.minted);
//! # Ok(())
//! # }
//! ```

pub mod basket;
pub mod config;
pub mod deposit;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod fee;
pub mod governance;
pub mod ledger;
pub mod metrics;
pub mod pagination;
pub mod query;
pub mod withdraw;

pub use basket::{Basket, BasketCriteria, BasketUpdate, CreateBasket, DateCriteria};
pub use config::{ConfigError, EngineConfig};
pub use deposit::{BasketCredit, DepositReceipt, DepositRequest};
pub use eligibility::{check_eligibility, is_eligible, Ineligibility};
pub use engine::BasketEngine;
pub use error::{BasketError, BasketResult, SupplyScope};
pub use fee::{compute_fee, FeeSplit};
pub use ledger::{BasketBalance, BasketLedger};
pub use metrics::BasketMetrics;
pub use pagination::{Page, PageRequest, PageResponse};
pub use query::BasketFee;
pub use withdraw::{select_credits, Shortfall, WithdrawReceipt, WithdrawRequest};
