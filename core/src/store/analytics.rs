//! Read-only aggregation queries over the activity ledger.
//!
//! Each query is a named function against the full row set; the
//! analytics service layers presentation (rounding, defaults, response
//! shapes) on top of the raw groupings returned here.
//!
//! Timestamps are stored normalized to UTC, so the calendar month of a
//! row is simply the first seven characters of its timestamp text.

use super::ActivityStore;
use crate::activity::{PRODUCT_KYC, STATUS_FAILED, STATUS_SUCCESS};
use crate::error::AnalyticsResult;
use rusqlite::{params, OptionalExtension};

impl ActivityStore {
    /// Merchant with the largest successful volume, as (merchant_id,
    /// total in minor units). Ties break by merchant_id ascending.
    /// `None` when there are no successful rows.
    pub fn top_success_merchant(&self) -> AnalyticsResult<Option<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT merchant_id, SUM(amount_minor) AS total
             FROM merchant_activities
             WHERE status = ?1
             GROUP BY merchant_id
             ORDER BY total DESC, merchant_id ASC
             LIMIT 1",
        )?;
        let row = stmt
            .query_row(params![STATUS_SUCCESS], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .optional()?;
        Ok(row)
    }

    /// Distinct successful merchants per calendar month ("YYYY-MM"),
    /// ascending by month. Rows without a timestamp are excluded.
    pub fn monthly_active_merchants(&self) -> AnalyticsResult<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT substr(event_timestamp, 1, 7) AS month,
                    COUNT(DISTINCT merchant_id) AS merchants
             FROM merchant_activities
             WHERE status = ?1 AND event_timestamp IS NOT NULL
             GROUP BY month
             ORDER BY month ASC",
        )?;
        let rows = stmt.query_map(params![STATUS_SUCCESS], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Distinct merchants per product over all rows regardless of
    /// status, count descending, ties by product ascending.
    pub fn merchants_per_product(&self) -> AnalyticsResult<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT product, COUNT(DISTINCT merchant_id) AS merchants
             FROM merchant_activities
             GROUP BY product
             ORDER BY merchants DESC, product ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Distinct merchants with a successful KYC event of the given type.
    pub fn distinct_kyc_merchants(&self, event_type: &str) -> AnalyticsResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(DISTINCT merchant_id)
                 FROM merchant_activities
                 WHERE product = ?1 AND status = ?2 AND event_type = ?3",
                params![PRODUCT_KYC, STATUS_SUCCESS, event_type],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Per-product (failed, success) counts over resolved rows only —
    /// PENDING and any other status are excluded entirely.
    pub fn resolved_counts_per_product(&self) -> AnalyticsResult<Vec<(String, i64, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT product,
                    SUM(CASE WHEN status = ?1 THEN 1 ELSE 0 END) AS failed,
                    SUM(CASE WHEN status = ?2 THEN 1 ELSE 0 END) AS success
             FROM merchant_activities
             WHERE status IN (?1, ?2)
             GROUP BY product",
        )?;
        let rows = stmt.query_map(params![STATUS_FAILED, STATUS_SUCCESS], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
