// Cross-tick mutual exclusion.
//
// Two overlapping ticks could each observe the same staged record as a
// graduate and publish it twice, so only one tick may run at a time across
// all instances sharing the store. A Postgres advisory lock held on a
// dedicated connection for the tick's duration gives exactly that: a second
// instance sees contention and skips its tick.

use sqlx::pool::PoolConnection;
use sqlx::{Connection, PgPool, Postgres};
use tracing::warn;

use frontpage_common::StoreError;

/// Stable advisory-lock key for the curation tick.
const TICK_LOCK_KEY: i64 = 7_201_981_003;

pub struct TickLock {
    conn: PoolConnection<Postgres>,
}

impl TickLock {
    /// Try to take the tick lock. `None` means another tick holds it and
    /// this pass should be skipped, not queued.
    pub async fn try_acquire(pool: &PgPool) -> Result<Option<TickLock>, StoreError> {
        let mut conn = pool.acquire().await.map_err(StoreError::database)?;

        let (locked,): (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
            .bind(TICK_LOCK_KEY)
            .fetch_one(&mut *conn)
            .await
            .map_err(StoreError::database)?;

        if locked {
            Ok(Some(TickLock { conn }))
        } else {
            Ok(None)
        }
    }

    /// Release the lock. Advisory locks are session-scoped, so the holder
    /// must unlock on the same connection before it returns to the pool.
    pub async fn release(mut self) {
        let result = sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(TICK_LOCK_KEY)
            .execute(&mut *self.conn)
            .await;

        if let Err(err) = result {
            // The session still holds the lock; closing the connection is
            // the only safe way to shed it.
            warn!(error = %err, "Failed to release tick lock, closing connection");
            let _ = self.conn.detach().close().await;
        }
    }
}
