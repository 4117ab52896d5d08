use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use frontpage_common::Config;
use frontpage_curator::policy::GraduationPolicy;
use frontpage_curator::publisher::TelegramChannel;
use frontpage_curator::source::HnCandidateSource;
use frontpage_curator::store::{migrate, PgPendingStore, PgStagingStore, TickLock};
use frontpage_curator::tick::{Curator, TickSettings};
use hackernews_client::HnClient;
use telegram_client::TelegramClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("frontpage=info".parse()?))
        .init();

    info!("Frontpage curator starting...");

    let config = Config::from_env();
    config.log_redacted();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    // Run migrations (idempotent)
    migrate(&pool).await?;

    let source = Arc::new(HnCandidateSource::new(HnClient::new()));
    let telegram = Arc::new(TelegramClient::new(&config.telegram_token));
    let channel = Arc::new(TelegramChannel::new(telegram, config.channel_id));
    let staging = Arc::new(PgStagingStore::new(pool.clone()));
    let pending = Arc::new(PgPendingStore::new(pool.clone(), config.pending_ttl()));

    let curator = Curator::new(
        source,
        channel,
        staging,
        pending,
        GraduationPolicy::from_config(&config),
        TickSettings {
            candidate_limit: config.candidate_limit,
            refresh_interval: config.metric_refresh(),
            discussion_id: config.discussion_id,
        },
    );

    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs(config.tick_interval_secs));

    loop {
        interval.tick().await;

        // One tick at a time across all instances sharing the store.
        match TickLock::try_acquire(&pool).await {
            Ok(Some(lock)) => {
                let report = curator.tick(Utc::now()).await;
                lock.release().await;
                if report.published > 0 || report.staged > 0 {
                    info!(
                        published = report.published,
                        staged = report.staged,
                        "Tick made progress"
                    );
                }
            }
            Ok(None) => {
                info!("Another tick holds the lock, skipping this pass");
            }
            Err(err) => {
                warn!(error = %err, "Failed to acquire tick lock");
            }
        }
    }
}
