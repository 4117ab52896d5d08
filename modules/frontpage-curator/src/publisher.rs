// ChannelPublisher / ReplyPublisher over the Telegram Bot API.
//
// Captions are deliberately plain text: markup correctness belongs to the
// formatting layer, which is out of scope here.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use frontpage_common::{Candidate, PublishError, PublishReceipt, ReplyDestination};
use telegram_client::{TelegramClient, TelegramError};

use crate::traits::{ChannelPublisher, ReplyPublisher};

fn publish_error(err: TelegramError) -> PublishError {
    match err {
        TelegramError::Network(msg) => PublishError::Transport(msg),
        TelegramError::Api { status, description } => PublishError::Api {
            status,
            message: description,
        },
        TelegramError::Malformed(msg) => PublishError::Rejected(msg),
    }
}

pub struct TelegramChannel {
    client: Arc<TelegramClient>,
    channel_id: i64,
}

impl TelegramChannel {
    pub fn new(client: Arc<TelegramClient>, channel_id: i64) -> Self {
        Self { client, channel_id }
    }
}

#[async_trait]
impl ChannelPublisher for TelegramChannel {
    async fn publish(&self, candidate: &Candidate) -> Result<PublishReceipt, PublishError> {
        let caption = headline_caption(candidate);

        // Prefer the photo card, but the channel must still receive the
        // headline when media upload fails; downstream flows rely on the
        // post existing.
        if let Some(image_url) = &candidate.image_url {
            match self
                .client
                .send_photo(self.channel_id, image_url, &caption, None)
                .await
            {
                Ok(message) => {
                    return Ok(PublishReceipt {
                        message_id: message.message_id,
                        linked_chat_id: message.chat.linked_chat_id,
                    })
                }
                Err(err) => {
                    warn!(
                        candidate_id = %candidate.id,
                        error = %err,
                        "send_photo failed, falling back to text"
                    );
                }
            }
        }

        let message = self
            .client
            .send_message(self.channel_id, &caption, None, None, false)
            .await
            .map_err(publish_error)?;

        Ok(PublishReceipt {
            message_id: message.message_id,
            linked_chat_id: message.chat.linked_chat_id,
        })
    }
}

pub struct TelegramReplies {
    client: Arc<TelegramClient>,
}

impl TelegramReplies {
    pub fn new(client: Arc<TelegramClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReplyPublisher for TelegramReplies {
    async fn post_reply(
        &self,
        destination: ReplyDestination,
        candidate: &Candidate,
    ) -> Result<(), PublishError> {
        let body = comment_body(candidate);
        self.client
            .send_message(
                destination.chat_id,
                &body,
                destination.thread_id,
                destination.reply_to_message_id,
                true,
            )
            .await
            .map_err(publish_error)?;
        Ok(())
    }
}

fn headline_caption(candidate: &Candidate) -> String {
    let mut caption = format!("{}\n{}", candidate.title, candidate.url);
    if !candidate.summary.is_empty() {
        caption.push_str(&format!("\n\n{}", candidate.summary));
    }
    caption
}

fn comment_body(candidate: &Candidate) -> String {
    let mut lines = vec![format!("Discussion: {}", candidate.discussion_url)];
    if !candidate.highlights.is_empty() {
        lines.push(String::new());
        for highlight in &candidate.highlights {
            lines.push(format!("• {highlight}"));
        }
    }
    for reference in &candidate.references {
        lines.push(format!("{}: {}", reference.label, reference.url));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontpage_common::Reference;

    fn candidate() -> Candidate {
        Candidate {
            id: "42".to_string(),
            title: "A title".to_string(),
            url: "https://example.com/post".to_string(),
            discussion_url: "https://news.ycombinator.com/item?id=42".to_string(),
            summary: "short summary".to_string(),
            image_url: None,
            highlights: vec!["first point".to_string()],
            top_comments: vec![],
            references: vec![Reference {
                label: "Docs".to_string(),
                url: "https://example.com/docs".to_string(),
            }],
            score: Some(60),
            comment_count: Some(10),
            posted_at: None,
        }
    }

    #[test]
    fn caption_carries_title_url_and_summary() {
        let caption = headline_caption(&candidate());
        assert!(caption.contains("A title"));
        assert!(caption.contains("https://example.com/post"));
        assert!(caption.contains("short summary"));
    }

    #[test]
    fn comment_body_links_discussion_and_references() {
        let body = comment_body(&candidate());
        assert!(body.starts_with("Discussion: https://news.ycombinator.com"));
        assert!(body.contains("• first point"));
        assert!(body.contains("Docs: https://example.com/docs"));
    }
}
