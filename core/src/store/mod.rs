//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The ingestion pipeline and the analytics service call store methods —
//! they never execute SQL directly.

use crate::{activity::ActivityEvent, error::AnalyticsResult};
mod analytics;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

pub struct ActivityStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl ActivityStore {
    pub fn open(path: &str) -> AnalyticsResult<Self> {
        if path == ":memory:" {
            return Self::in_memory();
        }
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AnalyticsResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    /// For file-based databases, this opens the same file.
    pub fn reopen(&self) -> AnalyticsResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order. Idempotent.
    pub fn migrate(&self) -> AnalyticsResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_activities.sql"))?;
        Ok(())
    }

    // ── Ingestion ──────────────────────────────────────────────

    /// Bulk insert-if-absent keyed by event_id. Duplicate ids are
    /// silently skipped — never an update, never an error — which makes
    /// re-imports of the same extract a no-op. The whole batch commits
    /// in one transaction.
    pub fn insert_events(&self, events: &[ActivityEvent]) -> AnalyticsResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO merchant_activities (
                    event_id, merchant_id, event_timestamp, product, event_type,
                    amount_minor, status, channel, region, merchant_tier
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(event_id) DO NOTHING",
            )?;
            for event in events {
                stmt.execute(params![
                    event.event_id.to_string(),
                    event.merchant_id,
                    event.event_timestamp.map(|t| t.to_rfc3339()),
                    event.product,
                    event.event_type,
                    event.amount_minor(),
                    event.status,
                    event.channel,
                    event.region,
                    event.merchant_tier,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ── Test / summary helpers ─────────────────────────────────

    pub fn event_count(&self) -> AnalyticsResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM merchant_activities", [], |row| {
                row.get(0)
            })
            .map_err(Into::into)
    }

    /// Fetch one event by id. Only a missing row maps to `None`; any
    /// database failure propagates.
    pub fn get_event(&self, event_id: &Uuid) -> AnalyticsResult<Option<ActivityEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT merchant_id, event_timestamp, product, event_type,
                    amount_minor, status, channel, region, merchant_tier
             FROM merchant_activities WHERE event_id = ?1",
        )?;
        let event = stmt
            .query_row(params![event_id.to_string()], |row| {
                Ok(ActivityEvent {
                    event_id: *event_id,
                    merchant_id: row.get(0)?,
                    event_timestamp: row
                        .get::<_, Option<String>>(1)?
                        .and_then(|t| DateTime::parse_from_rfc3339(&t).ok())
                        .map(|t| t.with_timezone(&Utc)),
                    product: row.get(2)?,
                    event_type: row.get(3)?,
                    amount: ActivityEvent::from_minor(row.get(4)?),
                    status: row.get(5)?,
                    channel: row.get(6)?,
                    region: row.get(7)?,
                    merchant_tier: row.get(8)?,
                })
            })
            .optional()?;
        Ok(event)
    }
}
