// Bridges a channel post to its follow-up comment. The auto-forward notice
// arrives out-of-band from the publish tick — possibly late, possibly never —
// and carries the original channel message id we keyed the pending link on.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use frontpage_common::{ForwardNotice, ReplyDestination};

use crate::traits::{PendingLinkStore, ReplyPublisher};

pub struct ForwardBridge {
    pending: Arc<dyn PendingLinkStore>,
    replies: Arc<dyn ReplyPublisher>,
    /// Channel whose forwards we act on; notices from anywhere else are noise.
    channel_id: i64,
}

impl ForwardBridge {
    pub fn new(
        pending: Arc<dyn PendingLinkStore>,
        replies: Arc<dyn ReplyPublisher>,
        channel_id: i64,
    ) -> Self {
        Self {
            pending,
            replies,
            channel_id,
        }
    }

    /// Handle one auto-forward notice. Returns whether a follow-up comment
    /// was posted.
    pub async fn handle(&self, notice: &ForwardNotice, now: DateTime<Utc>) -> Result<bool> {
        if let Some(source) = notice.source_channel_id {
            if source != self.channel_id {
                warn!(
                    source_channel_id = source,
                    expected_channel_id = self.channel_id,
                    "Auto-forward source mismatch"
                );
                return Ok(false);
            }
        }

        // Claiming removes the link, so a duplicate notice finds nothing.
        let link = match self.pending.claim(notice.origin_message_id, now).await? {
            Some(link) => link,
            None => {
                warn!(
                    origin_message_id = notice.origin_message_id,
                    "No pending link for channel post"
                );
                return Ok(false);
            }
        };

        let destination = ReplyDestination {
            chat_id: link.discussion_chat_id.unwrap_or(notice.chat_id),
            thread_id: notice.thread_id,
            // Regular discussion groups thread by replying to the forwarded copy.
            reply_to_message_id: notice.thread_id.is_none().then_some(notice.reply_to_message_id),
        };

        match self.replies.post_reply(destination, &link.candidate).await {
            Ok(()) => {
                info!(
                    origin_message_id = notice.origin_message_id,
                    chat_id = destination.chat_id,
                    candidate_id = %link.candidate.id,
                    "Posted discussion comment"
                );
                Ok(true)
            }
            Err(err) => {
                warn!(
                    origin_message_id = notice.origin_message_id,
                    candidate_id = %link.candidate.id,
                    error = %err,
                    "Failed to post comment; restoring pending link"
                );
                if let Err(restore_err) = self
                    .pending
                    .register(notice.origin_message_id, &link, now)
                    .await
                {
                    error!(
                        origin_message_id = notice.origin_message_id,
                        error = %restore_err,
                        "Failed to restore pending link after reply failure"
                    );
                }
                Ok(false)
            }
        }
    }
}
