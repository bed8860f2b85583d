//! Store pricing engine: tier-adjusted quotes, purchase execution with
//! an immutable audit trail, and flat-cost reward claims.
//!
//! A purchase never trusts a client-held price: it re-quotes from the
//! user's tier at execution time, inside the same per-user critical
//! section as the balance check and debit.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::errors::EngineError;
use crate::engine::ledger;
use crate::engine::storage::GameStore;
use crate::engine::types::{
    PurchaseRecord, StoreProductRecord, Tier, PURCHASE_SCHEMA_VERSION,
};
use crate::logutil::escape_log;

/// A tier-adjusted price, computed fresh at the moment it matters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    pub base_price: i64,
    pub discount_percent: u8,
    pub final_price: i64,
}

/// Store catalog entry annotated with one user's tier discount applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricedProduct {
    pub product: StoreProductRecord,
    pub discount_percentage: u8,
    pub discounted_price: i64,
}

/// Price a product for a tier: `base x (100 - discount) / 100`, rounded
/// half-up to the currency's minor unit.
pub fn quote(base_price: i64, tier: Tier) -> Quote {
    let discount = tier.discount_percent();
    let final_price = round_half_up_pct(base_price, 100 - discount as i64);
    Quote {
        base_price,
        discount_percent: discount,
        final_price,
    }
}

/// `value * pct / 100` with ties rounded up. Prices are non-negative so
/// half-up and away-from-zero coincide.
fn round_half_up_pct(value: i64, pct: i64) -> i64 {
    (value * pct + 50) / 100
}

/// Execute a purchase: re-quote at the user's current tier, check and
/// debit the balance as one atomic unit, then append the receipt.
pub fn purchase(
    store: &GameStore,
    user_id: &str,
    product_id: &str,
    now: DateTime<Utc>,
) -> Result<PurchaseRecord, EngineError> {
    let product = store.get_product(product_id)?;

    // The receipt append lives inside the closure: if it fails, the
    // debited record is never written back, so the user is not charged
    // for a purchase that left no audit trail.
    let receipt = store.update_user(user_id, |store, user| {
        let tier = user.tier();
        let priced = quote(product.base_price, tier);
        ledger::debit(user, priced.final_price, now.date_naive())?;
        let receipt = PurchaseRecord {
            purchase_id: Uuid::new_v4().to_string(),
            user_id: user.user_id.clone(),
            product_id: product.product_id.clone(),
            product_name: product.name.clone(),
            original_price: priced.base_price,
            discount_applied: priced.discount_percent,
            final_price: priced.final_price,
            tier_at_purchase: tier,
            purchased_at: now,
            schema_version: PURCHASE_SCHEMA_VERSION,
        };
        store.append_purchase(receipt.clone())?;
        Ok(receipt)
    })?;
    info!(
        "purchase {}: user {} bought {} for {} ({}% off at {})",
        receipt.purchase_id,
        receipt.user_id,
        escape_log(&receipt.product_name),
        receipt.final_price,
        receipt.discount_applied,
        receipt.tier_at_purchase.name()
    );
    Ok(receipt)
}

/// Claim a reward: a flat debit of its cost, no tier discount. Returns
/// the updated balance.
pub fn claim_reward(
    store: &GameStore,
    user_id: &str,
    reward_id: &str,
    now: DateTime<Utc>,
) -> Result<i64, EngineError> {
    let reward = store.get_reward(reward_id)?;
    let balance = store.update_user(user_id, |_, user| {
        ledger::debit(user, reward.cost, now.date_naive())?;
        Ok(user.points)
    })?;
    info!(
        "user {} claimed reward {} for {} points",
        user_id,
        escape_log(&reward.name),
        reward.cost
    );
    Ok(balance)
}

/// Catalog listing with this user's tier discount pre-applied to every
/// product, ordered by product id.
pub fn products_for(store: &GameStore, user_id: &str) -> Result<Vec<PricedProduct>, EngineError> {
    let user = store.get_user(user_id)?;
    let tier = user.tier();
    let mut products = store.list_products()?;
    products.sort_by(|a, b| a.product_id.cmp(&b.product_id));
    Ok(products
        .into_iter()
        .map(|product| {
            let priced = quote(product.base_price, tier);
            PricedProduct {
                product,
                discount_percentage: priced.discount_percent,
                discounted_price: priced.final_price,
            }
        })
        .collect())
}
