//! Storage abstraction and the Postgres repository for schedule entries.
//!
//! The trait seam lets handler tests run against lightweight doubles while
//! production uses the Postgres repository. All schedule persistence goes
//! through this module.

use std::{future::Future, pin::Pin};

use sqlx::PgPool;
use tracing::debug;

use crate::{error::Result, models::ScheduleEntry};

/// Storage operations required to persist an accepted submission.
pub trait ScheduleStore: Send + Sync + 'static {
    /// Creates one schedule entry.
    ///
    /// Exactly one create per accepted request; no retry, no check for a
    /// pre-existing entry with the same id. The time-derived id makes
    /// collisions unlikely, and a collision surfaces as a database error.
    fn create_entry(
        &self,
        entry: ScheduleEntry,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Postgres-backed schedule store.
pub struct PgScheduleStore {
    pool: PgPool,
}

impl PgScheduleStore {
    /// Creates a new store over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ScheduleStore for PgScheduleStore {
    fn create_entry(
        &self,
        entry: ScheduleEntry,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO schedule_entries (id, partition_key, duties_json, saved_by, saved_at)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(&entry.id)
            .bind(&entry.partition_key)
            .bind(&entry.duties_json)
            .bind(&entry.saved_by)
            .bind(entry.saved_at)
            .execute(&self.pool)
            .await?;

            debug!(id = %entry.id, saved_by = %entry.saved_by, "schedule entry created");
            Ok(())
        })
    }
}
