//! # Governance
//!
//! Basket lifecycle entry points. Creating a basket and changing its
//! criteria, fee or auto-retire flag is reserved for the configured
//! authority; the curator may hand curatorship to someone else. Baskets are
//! never deleted.

use chrono::{DateTime, Utc};
use tracing::info;

use ecobasket_protocol::storage::KvStore;

use crate::basket::{Basket, BasketUpdate, CreateBasket};
use crate::config::EngineConfig;
use crate::engine::BasketEngine;
use crate::error::{BasketError, BasketResult};

fn require_authority(config: &EngineConfig, caller: &str) -> BasketResult<()> {
    if caller != config.authority {
        return Err(BasketError::Unauthorized(format!(
            "{} is not the governance authority",
            caller
        )));
    }
    Ok(())
}

impl<S: KvStore> BasketEngine<S> {
    /// Creates a basket.
    ///
    /// # Errors
    ///
    /// [`BasketError::Unauthorized`] unless `authority` is the configured
    /// authority, [`BasketError::InvalidBasket`] on a malformed definition,
    /// [`BasketError::BasketExists`] if the derived denom is taken.
    pub fn create_basket(
        &mut self,
        authority: &str,
        params: CreateBasket,
        now: DateTime<Utc>,
    ) -> BasketResult<Basket> {
        let basket = self.transact_store("create_basket", |ledger, config| {
            require_authority(config, authority)?;
            let basket = params.into_basket(now)?;
            if ledger.get_basket(&basket.denom)?.is_some() {
                return Err(BasketError::BasketExists(basket.denom));
            }
            ledger.put_basket(&basket)?;
            Ok(basket)
        })?;

        info!(basket = %basket.denom, curator = %basket.curator, "basket created");
        Ok(basket)
    }

    /// Applies a governance update to an existing basket.
    pub fn update_basket(
        &mut self,
        authority: &str,
        denom: &str,
        update: BasketUpdate,
    ) -> BasketResult<Basket> {
        let basket = self.transact_store("update_basket", |ledger, config| {
            require_authority(config, authority)?;
            let mut basket = ledger.require_basket(denom)?;
            update.apply_to(&mut basket)?;
            ledger.put_basket(&basket)?;
            Ok(basket)
        })?;

        info!(
            basket = %basket.denom,
            fee_bps = ?basket.fee_bps,
            disable_auto_retire = basket.disable_auto_retire,
            "basket updated"
        );
        Ok(basket)
    }

    /// Hands curatorship of a basket to `new_curator`. Only the current
    /// curator may do this.
    pub fn update_curator(
        &mut self,
        curator: &str,
        denom: &str,
        new_curator: &str,
    ) -> BasketResult<Basket> {
        let basket = self.transact_store("update_curator", |ledger, _| {
            let mut basket = ledger.require_basket(denom)?;
            if basket.curator != curator {
                return Err(BasketError::Unauthorized(format!(
                    "{} is not the curator of {}",
                    curator, denom
                )));
            }
            if new_curator.trim().is_empty() {
                return Err(BasketError::InvalidRequest("new curator must not be empty".into()));
            }
            basket.curator = new_curator.to_string();
            ledger.put_basket(&basket)?;
            Ok(basket)
        })?;

        info!(basket = %basket.denom, curator = %basket.curator, "curator changed");
        Ok(basket)
    }
}
