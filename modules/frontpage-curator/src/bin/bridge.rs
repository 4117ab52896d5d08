// Long-poll worker that turns channel auto-forwards into discussion
// comments. Runs alongside the curator binary against the same store.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use frontpage_common::{Config, ForwardNotice};
use frontpage_curator::bridge::ForwardBridge;
use frontpage_curator::publisher::TelegramReplies;
use frontpage_curator::store::{migrate, PgPendingStore};
use telegram_client::{Message, TelegramClient, Update};

const POLL_TIMEOUT_SECS: u64 = 30;
const ERROR_BACKOFF_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("frontpage=info".parse()?))
        .init();

    info!("Frontpage forward bridge starting...");

    let config = Config::from_env();
    config.log_redacted();

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?;

    migrate(&pool).await?;

    let telegram = Arc::new(TelegramClient::new(&config.telegram_token));
    let pending = Arc::new(PgPendingStore::new(pool, config.pending_ttl()));
    let replies = Arc::new(TelegramReplies::new(telegram.clone()));
    let bridge = ForwardBridge::new(pending, replies, config.channel_id);

    let mut offset: Option<i64> = None;

    loop {
        let updates = match telegram.get_updates(offset, POLL_TIMEOUT_SECS).await {
            Ok(updates) => updates,
            Err(err) => {
                warn!(error = %err, "Long poll failed, backing off");
                tokio::time::sleep(std::time::Duration::from_secs(ERROR_BACKOFF_SECS)).await;
                continue;
            }
        };

        for update in updates {
            // Advance past this update whether or not it interests us;
            // re-reading it would just replay the same outcome.
            offset = Some(update.update_id + 1);

            let Some(notice) = forward_notice(&update) else {
                debug!(update_id = update.update_id, "Ignoring non-forward update");
                continue;
            };

            if let Err(err) = bridge.handle(&notice, Utc::now()).await {
                warn!(
                    origin_message_id = notice.origin_message_id,
                    error = %err,
                    "Failed to handle auto-forward"
                );
            }
        }
    }
}

/// Extract a forward notice from an update, if it is an auto-forward of a
/// channel post into a discussion group.
fn forward_notice(update: &Update) -> Option<ForwardNotice> {
    let message: &Message = update.message.as_ref()?;
    if !message.is_automatic_forward {
        return None;
    }
    let origin_message_id = message.forward_origin_message_id()?;

    Some(ForwardNotice {
        origin_message_id,
        chat_id: message.chat.id,
        thread_id: message.message_thread_id,
        reply_to_message_id: message.message_id,
        source_channel_id: message.sender_chat.as_ref().map(|chat| chat.id),
    })
}
