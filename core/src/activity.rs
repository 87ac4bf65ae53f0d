//! Merchant activity event model and CSV row normalization.
//!
//! Normalization is per-row and total: a row either becomes a valid
//! [`ActivityEvent`] or is rejected, and a bad row never affects its
//! siblings. Timestamp problems are softer than the other checks — an
//! unparsable timestamp becomes `None` and the row is kept.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

pub const STATUS_SUCCESS: &str = "SUCCESS";
pub const STATUS_FAILED: &str = "FAILED";
pub const STATUS_PENDING: &str = "PENDING";

pub const PRODUCT_KYC: &str = "KYC";
pub const KYC_DOCUMENT_SUBMITTED: &str = "DOCUMENT_SUBMITTED";
pub const KYC_VERIFICATION_COMPLETED: &str = "VERIFICATION_COMPLETED";
pub const KYC_TIER_UPGRADE: &str = "TIER_UPGRADE";

/// One validated merchant activity event, ready for the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEvent {
    pub event_id: Uuid,
    pub merchant_id: String,
    pub event_timestamp: Option<DateTime<Utc>>,
    pub product: String,
    pub event_type: String,
    pub amount: Decimal,
    pub status: String,
    pub channel: Option<String>,
    pub region: Option<String>,
    pub merchant_tier: Option<String>,
}

impl ActivityEvent {
    /// Amount in minor units (cents). The store keeps integers so that
    /// SQL SUM over amounts stays exact. Saturates at the i64 range;
    /// ingestion rejects such amounts before they reach the store.
    pub fn amount_minor(&self) -> i64 {
        let rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        minor_units(&rounded)
            .and_then(|cents| i64::try_from(cents).ok())
            .unwrap_or_else(|| {
                if rounded.is_sign_negative() {
                    i64::MIN
                } else {
                    i64::MAX
                }
            })
    }

    pub fn from_minor(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }
}

/// Raw CSV row as read by the header-driven reader. Every field is
/// optional at this stage; required-field checks happen in [`normalize`].
///
/// [`normalize`]: RawActivityRow::normalize
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawActivityRow {
    pub event_id: Option<String>,
    pub merchant_id: Option<String>,
    pub event_timestamp: Option<String>,
    pub product: Option<String>,
    pub event_type: Option<String>,
    pub amount: Option<String>,
    pub status: Option<String>,
    pub channel: Option<String>,
    pub region: Option<String>,
    pub merchant_tier: Option<String>,
}

impl RawActivityRow {
    /// Validate and normalize one row. `None` means the row is rejected
    /// (counted as skipped by the pipeline, never persisted).
    pub fn normalize(self) -> Option<ActivityEvent> {
        let event_id = Uuid::parse_str(self.event_id.as_deref()?.trim()).ok()?;
        let merchant_id = required(self.merchant_id)?;
        let product = required(self.product)?;
        let event_type = required(self.event_type)?;
        let status = required(self.status)?;
        let amount = parse_amount(self.amount.as_deref())?;
        let event_timestamp = self.event_timestamp.as_deref().and_then(parse_timestamp);

        Some(ActivityEvent {
            event_id,
            merchant_id,
            event_timestamp,
            product,
            event_type,
            amount,
            status,
            channel: optional(self.channel),
            region: optional(self.region),
            merchant_tier: optional(self.merchant_tier),
        })
    }
}

fn required(value: Option<String>) -> Option<String> {
    let trimmed = value?.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Blank amounts default to 0.00; anything else must parse as a decimal
/// and is rounded to 2 fractional digits, midpoint away from zero.
/// Amounts that cannot be represented in i64 minor units are rejected.
pub fn parse_amount(raw: Option<&str>) -> Option<Decimal> {
    let raw = raw.map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Some(Decimal::new(0, 2));
    }
    let amount = Decimal::from_str(raw).ok()?;
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    i64::try_from(minor_units(&rounded)?).ok()?;
    Some(rounded)
}

/// Minor units (cents) of a decimal whose scale is at most 2.
fn minor_units(amount: &Decimal) -> Option<i128> {
    let factor = 10i128.checked_pow(2u32.saturating_sub(amount.scale()))?;
    amount.mantissa().checked_mul(factor)
}

/// Parse an ISO-8601 timestamp. A trailing `Z` is UTC; offset-less
/// values are taken as UTC. Unparsable input yields `None` — the caller
/// keeps the row either way.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}
