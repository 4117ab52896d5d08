// Postgres pending-link store.
//
// `claim` is a single DELETE ... RETURNING: the fetch and the removal are one
// atomic step, so a given message id is handed out at most once no matter how
// many notices race for it.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, warn};

use frontpage_common::{Candidate, PendingLink, StoreError};

use crate::traits::PendingLinkStore;

#[derive(Clone)]
pub struct PgPendingStore {
    pool: PgPool,
    /// Fixed expiry window applied to every registration.
    ttl: Duration,
}

impl PgPendingStore {
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }
}

#[async_trait]
impl PendingLinkStore for PgPendingStore {
    async fn register(
        &self,
        message_id: i64,
        link: &PendingLink,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_value(&link.candidate).map_err(StoreError::decode)?;
        let expires_at = now + self.ttl;

        sqlx::query(
            r#"
            INSERT INTO pending_links (message_id, payload, discussion_chat_id, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (message_id) DO UPDATE
                SET payload = EXCLUDED.payload,
                    discussion_chat_id = EXCLUDED.discussion_chat_id,
                    expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(message_id)
        .bind(&payload)
        .bind(link.discussion_chat_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::database)?;

        debug!(message_id, ttl_secs = self.ttl.num_seconds(), "Pending link registered");
        Ok(())
    }

    async fn claim(
        &self,
        message_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<PendingLink>, StoreError> {
        // Opportunistic purge keeps dead rows from accumulating; expiry
        // itself is enforced by the claim predicate below.
        sqlx::query("DELETE FROM pending_links WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(StoreError::database)?;

        let row = sqlx::query(
            r#"
            DELETE FROM pending_links
            WHERE message_id = $1 AND expires_at > $2
            RETURNING payload, discussion_chat_id
            "#,
        )
        .bind(message_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::database)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: serde_json::Value = row.try_get("payload").map_err(StoreError::database)?;
        let discussion_chat_id: Option<i64> = row
            .try_get("discussion_chat_id")
            .map_err(StoreError::database)?;

        match serde_json::from_value::<Candidate>(payload) {
            Ok(candidate) => Ok(Some(PendingLink {
                candidate,
                discussion_chat_id,
            })),
            Err(err) => {
                // The row is already gone; treat the link as lost.
                warn!(message_id, error = %err, "Undecodable pending link payload, dropping");
                Ok(None)
            }
        }
    }
}
