//! Merchant activity analytics core.
//!
//! Two responsibilities: ingest dated CSV extracts of merchant activity
//! events into a SQLite ledger (idempotently, keyed by event_id), and
//! answer five fixed analytics questions over that ledger.
//!
//! The request-routing layer sits outside this crate; it opens an
//! [`store::ActivityStore`], wraps it in an
//! [`analytics::AnalyticsService`], and serializes the plain result
//! structs this crate returns.

pub mod activity;
pub mod analytics;
pub mod config;
pub mod error;
pub mod ingest;
pub mod store;

pub use error::{AnalyticsError, AnalyticsResult};
