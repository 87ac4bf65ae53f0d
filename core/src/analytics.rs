//! Analytics service: the five aggregate reports over the activity
//! ledger. All operations are independent, stateless reads against the
//! current store state; the store handle is injected by the caller and
//! nothing here mutates it.

use crate::activity::{KYC_DOCUMENT_SUBMITTED, KYC_TIER_UPGRADE, KYC_VERIFICATION_COMPLETED};
use crate::error::AnalyticsResult;
use crate::store::ActivityStore;
use rust_decimal::Decimal;
use serde::{ser::SerializeMap, Serialize, Serializer};
use std::collections::BTreeMap;

/// Merchant with the highest total successful volume. `merchant_id` is
/// `None` when the ledger holds no successful rows at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopMerchant {
    pub merchant_id: Option<String>,
    pub total_volume: Decimal,
}

/// Distinct-merchant count for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductAdoption {
    pub product: String,
    pub merchants: i64,
}

/// Product adoption list, count descending. Serializes as a
/// product → count map preserving that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductAdoptionReport(pub Vec<ProductAdoption>);

impl Serialize for ProductAdoptionReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for item in &self.0 {
            map.serialize_entry(&item.product, &item.merchants)?;
        }
        map.end()
    }
}

/// Distinct merchants at each KYC stage. The three stages are counted
/// independently: a merchant counted at a later stage need not appear
/// at an earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct KycFunnel {
    pub documents_submitted: i64,
    pub verifications_completed: i64,
    pub tier_upgrades: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRate {
    pub product: String,
    /// Percentage of resolved (SUCCESS or FAILED) events that failed,
    /// rounded to 1 decimal place.
    pub failure_rate: f64,
}

pub struct AnalyticsService<'a> {
    store: &'a ActivityStore,
}

impl<'a> AnalyticsService<'a> {
    pub fn new(store: &'a ActivityStore) -> Self {
        Self { store }
    }

    /// Merchant with the highest total successful transaction amount
    /// across all products. Volume is reported at 2 decimal places.
    pub fn top_merchant(&self) -> AnalyticsResult<TopMerchant> {
        match self.store.top_success_merchant()? {
            Some((merchant_id, total_minor)) => Ok(TopMerchant {
                merchant_id: Some(merchant_id),
                total_volume: Decimal::new(total_minor, 2),
            }),
            None => Ok(TopMerchant {
                merchant_id: None,
                total_volume: Decimal::new(0, 2),
            }),
        }
    }

    /// Unique merchants with at least one successful event per calendar
    /// month, keyed "YYYY-MM", ascending.
    pub fn monthly_active_merchants(&self) -> AnalyticsResult<BTreeMap<String, i64>> {
        Ok(self.store.monthly_active_merchants()?.into_iter().collect())
    }

    /// Unique merchant count per product, highest first.
    pub fn product_adoption(&self) -> AnalyticsResult<ProductAdoptionReport> {
        let items = self
            .store
            .merchants_per_product()?
            .into_iter()
            .map(|(product, merchants)| ProductAdoption { product, merchants })
            .collect();
        Ok(ProductAdoptionReport(items))
    }

    /// KYC conversion funnel: unique merchants at each stage, counting
    /// successful events only.
    pub fn kyc_funnel(&self) -> AnalyticsResult<KycFunnel> {
        Ok(KycFunnel {
            documents_submitted: self.store.distinct_kyc_merchants(KYC_DOCUMENT_SUBMITTED)?,
            verifications_completed: self
                .store
                .distinct_kyc_merchants(KYC_VERIFICATION_COMPLETED)?,
            tier_upgrades: self.store.distinct_kyc_merchants(KYC_TIER_UPGRADE)?,
        })
    }

    /// Failure rate per product: 100 * FAILED / (SUCCESS + FAILED),
    /// PENDING excluded, sorted by rate descending then product.
    pub fn failure_rates(&self) -> AnalyticsResult<Vec<FailureRate>> {
        let mut rates: Vec<FailureRate> = self
            .store
            .resolved_counts_per_product()?
            .into_iter()
            .map(|(product, failed, success)| {
                let resolved = failed + success;
                let rate = if resolved == 0 {
                    0.0
                } else {
                    100.0 * failed as f64 / resolved as f64
                };
                FailureRate {
                    product,
                    failure_rate: (rate * 10.0).round() / 10.0,
                }
            })
            .collect();
        rates.sort_by(|a, b| {
            b.failure_rate
                .total_cmp(&a.failure_rate)
                .then_with(|| a.product.cmp(&b.product))
        });
        Ok(rates)
    }
}
