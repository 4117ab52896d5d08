// Postgres staging store.
//
// Three relations mirror the conceptual namespaces: per-candidate payloads,
// the staging index, and the permanent published set. Every mutation is one
// transaction so payload, index, and set membership move together; `list`
// self-heals index entries whose payload is gone.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::warn;

use frontpage_common::{Candidate, EngagementSnapshot, StagedCandidate, StoreError};

use crate::traits::StagingStore;

#[derive(Clone)]
pub struct PgStagingStore {
    pool: PgPool,
}

impl PgStagingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Drop a stale or undecodable entry from both relations.
    async fn prune(&self, id: &str) {
        for statement in [
            "DELETE FROM staged_payloads WHERE candidate_id = $1",
            "DELETE FROM staged_index WHERE candidate_id = $1",
        ] {
            if let Err(err) = sqlx::query(statement).bind(id).execute(&self.pool).await {
                warn!(candidate_id = %id, error = %err, "Failed to prune stale staged entry");
            }
        }
    }

    fn decode_row(
        &self,
        id: &str,
        payload: serde_json::Value,
        staged_at: DateTime<Utc>,
        last_checked: DateTime<Utc>,
    ) -> Option<StagedCandidate> {
        match serde_json::from_value::<Candidate>(payload) {
            Ok(candidate) => Some(StagedCandidate {
                candidate,
                staged_at,
                last_checked,
            }),
            Err(err) => {
                warn!(candidate_id = %id, error = %err, "Undecodable staged payload, dropping");
                None
            }
        }
    }
}

#[async_trait]
impl StagingStore for PgStagingStore {
    async fn stage(
        &self,
        candidate: &Candidate,
        now: DateTime<Utc>,
    ) -> Result<StagedCandidate, StoreError> {
        let payload = serde_json::to_value(candidate).map_err(StoreError::decode)?;

        let mut tx = self.pool.begin().await.map_err(StoreError::database)?;

        // On a racing re-stage the payload is refreshed but staged_at keeps
        // its original value — the staging clock never resets.
        let row = sqlx::query(
            r#"
            INSERT INTO staged_payloads (candidate_id, payload, staged_at, last_checked)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (candidate_id) DO UPDATE
                SET payload = EXCLUDED.payload,
                    last_checked = EXCLUDED.last_checked
            RETURNING staged_at, last_checked
            "#,
        )
        .bind(&candidate.id)
        .bind(&payload)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::database)?;

        sqlx::query("INSERT INTO staged_index (candidate_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(&candidate.id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::database)?;

        tx.commit().await.map_err(StoreError::database)?;

        Ok(StagedCandidate {
            candidate: candidate.clone(),
            staged_at: row.try_get("staged_at").map_err(StoreError::database)?,
            last_checked: row.try_get("last_checked").map_err(StoreError::database)?,
        })
    }

    async fn refresh(
        &self,
        id: &str,
        metrics: &EngagementSnapshot,
        now: DateTime<Utc>,
    ) -> Result<StagedCandidate, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::database)?;

        let row = sqlx::query(
            "SELECT payload, staged_at FROM staged_payloads WHERE candidate_id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(StoreError::database)?;

        let row = row.ok_or_else(|| StoreError::NotStaged(id.to_string()))?;
        let payload: serde_json::Value = row.try_get("payload").map_err(StoreError::database)?;
        let staged_at: DateTime<Utc> = row.try_get("staged_at").map_err(StoreError::database)?;

        let candidate: Candidate = serde_json::from_value(payload).map_err(StoreError::decode)?;
        let candidate = candidate.with_engagement(metrics);
        let updated = serde_json::to_value(&candidate).map_err(StoreError::decode)?;

        sqlx::query(
            "UPDATE staged_payloads SET payload = $2, last_checked = $3 WHERE candidate_id = $1",
        )
        .bind(id)
        .bind(&updated)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::database)?;

        tx.commit().await.map_err(StoreError::database)?;

        Ok(StagedCandidate {
            candidate,
            staged_at,
            last_checked: now,
        })
    }

    async fn list(&self) -> Result<Vec<StagedCandidate>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT i.candidate_id, p.payload, p.staged_at, p.last_checked
            FROM staged_index i
            LEFT JOIN staged_payloads p USING (candidate_id)
            ORDER BY p.staged_at ASC NULLS LAST
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::database)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("candidate_id").map_err(StoreError::database)?;
            let payload: Option<serde_json::Value> =
                row.try_get("payload").map_err(StoreError::database)?;

            let Some(payload) = payload else {
                // Index can drift after crashes; drop empty slots eagerly.
                self.prune(&id).await;
                continue;
            };

            let staged_at: DateTime<Utc> =
                row.try_get("staged_at").map_err(StoreError::database)?;
            let last_checked: DateTime<Utc> =
                row.try_get("last_checked").map_err(StoreError::database)?;

            match self.decode_row(&id, payload, staged_at, last_checked) {
                Some(record) => records.push(record),
                None => self.prune(&id).await,
            }
        }
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Option<StagedCandidate>, StoreError> {
        let row = sqlx::query(
            "SELECT payload, staged_at, last_checked FROM staged_payloads WHERE candidate_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::database)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: serde_json::Value = row.try_get("payload").map_err(StoreError::database)?;
        let staged_at: DateTime<Utc> = row.try_get("staged_at").map_err(StoreError::database)?;
        let last_checked: DateTime<Utc> =
            row.try_get("last_checked").map_err(StoreError::database)?;

        match self.decode_row(id, payload, staged_at, last_checked) {
            Some(record) => Ok(Some(record)),
            None => {
                self.prune(id).await;
                Ok(None)
            }
        }
    }

    async fn is_published(&self, id: &str) -> Result<bool, StoreError> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM published WHERE candidate_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::database)?;
        Ok(row.0)
    }

    async fn mark_published(&self, id: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::database)?;

        sqlx::query("DELETE FROM staged_payloads WHERE candidate_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::database)?;
        sqlx::query("DELETE FROM staged_index WHERE candidate_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::database)?;
        sqlx::query("INSERT INTO published (candidate_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::database)?;

        tx.commit().await.map_err(StoreError::database)
    }

    async fn seed_published(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO published (candidate_id)
             SELECT unnest($1::text[]) ON CONFLICT DO NOTHING",
        )
        .bind(ids)
        .execute(&self.pool)
        .await
        .map_err(StoreError::database)?;
        Ok(())
    }

    async fn forget(&self, id: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::database)?;

        sqlx::query("DELETE FROM staged_payloads WHERE candidate_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::database)?;
        sqlx::query("DELETE FROM staged_index WHERE candidate_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::database)?;

        tx.commit().await.map_err(StoreError::database)
    }
}
