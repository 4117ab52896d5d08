use sqlx::PgPool;

use frontpage_common::StoreError;

/// Apply the store schema. Idempotent; run before the first tick.
///
/// The payload/index split mirrors the store's conceptual key namespaces:
/// readers treat an index entry without a payload as a crash remnant and
/// prune it rather than erroring.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS staged_payloads (
            candidate_id TEXT PRIMARY KEY,
            payload      JSONB NOT NULL,
            staged_at    TIMESTAMPTZ NOT NULL,
            last_checked TIMESTAMPTZ NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS staged_index (
            candidate_id TEXT PRIMARY KEY
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS published (
            candidate_id TEXT PRIMARY KEY
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS pending_links (
            message_id         BIGINT PRIMARY KEY,
            payload            JSONB NOT NULL,
            discussion_chat_id BIGINT,
            expires_at         TIMESTAMPTZ NOT NULL
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(StoreError::database)?;
    }
    Ok(())
}
