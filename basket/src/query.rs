//! Read-only queries over committed basket state.
//!
//! List queries page through ordered scans. Page sizes are resolved against
//! the engine configuration: a limit of 0 means the configured default and
//! larger limits are capped at the configured maximum.

use serde::{Deserialize, Serialize};

use ecobasket_protocol::storage::KvRead;

use crate::basket::Basket;
use crate::engine::BasketEngine;
use crate::error::BasketResult;
use crate::ledger::BasketBalance;
use crate::pagination::{Page, PageRequest};

/// Fee terms of one basket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketFee {
    pub basket_denom: String,
    /// Rate applied to the next deposit.
    pub fee_bps: u16,
    /// `true` when the basket inherits the engine-wide default.
    pub is_default: bool,
    /// Account fee tokens are minted to.
    pub collector: String,
}

impl<S: KvRead> BasketEngine<S> {
    fn resolve_page(&self, request: &PageRequest) -> PageRequest {
        PageRequest {
            limit: self.config().page_limit(request.limit),
            ..request.clone()
        }
    }

    /// Looks up a basket by denom.
    pub fn basket(&self, denom: &str) -> BasketResult<Basket> {
        self.ledger().require_basket(denom)
    }

    /// All baskets, ordered by denom.
    pub fn baskets(&self, page: &PageRequest) -> BasketResult<Page<Basket>> {
        self.ledger().list_baskets(&self.resolve_page(page))
    }

    /// Credits of one batch held by a basket; 0 when the basket holds none.
    pub fn basket_balance(&self, denom: &str, batch_denom: &str) -> BasketResult<u64> {
        let ledger = self.ledger();
        ledger.require_basket(denom)?;
        ledger.get_balance(denom, batch_denom)
    }

    /// A basket's balances, oldest batch start date first.
    pub fn basket_balances(&self, denom: &str, page: &PageRequest) -> BasketResult<Page<BasketBalance>> {
        let ledger = self.ledger();
        ledger.require_basket(denom)?;
        ledger.list_balances(denom, &self.resolve_page(page))
    }

    pub fn basket_fee(&self, denom: &str) -> BasketResult<BasketFee> {
        let basket = self.basket(denom)?;
        let config = self.config();
        Ok(BasketFee {
            fee_bps: basket.effective_fee_bps(config.default_fee_bps),
            is_default: basket.fee_bps.is_none(),
            collector: config.fee_collector.clone(),
            basket_denom: basket.denom,
        })
    }

    /// Backing of a basket in token units.
    pub fn total_backing(&self, denom: &str) -> BasketResult<u64> {
        let ledger = self.ledger();
        let basket = ledger.require_basket(denom)?;
        ledger.total_backing(&basket)
    }
}
