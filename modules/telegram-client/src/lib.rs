pub mod error;
pub mod types;

pub use error::{Result, TelegramError};
pub use types::{ApiResponse, Chat, ForwardOrigin, Message, ResponseParameters, Update};

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Minimal Telegram Bot API client with bounded retry and backoff.
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    backoff: Duration,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self::with_base_url(&format!("https://api.telegram.org/bot{token}"))
    }

    /// Allow overriding the base URL for self-hosted gateways or tests.
    pub fn with_base_url(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            // Long-poll get_updates needs headroom over the poll timeout.
            .timeout(Duration::from_secs(50))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: 3,
            backoff: Duration::from_millis(400),
        }
    }

    /// Send a text message. Returns the created message.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        thread_id: Option<i64>,
        reply_to_message_id: Option<i64>,
        disable_preview: bool,
    ) -> Result<Message> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": disable_preview,
        });
        if let Some(thread) = thread_id {
            body["message_thread_id"] = json!(thread);
        }
        if let Some(reply_to) = reply_to_message_id {
            body["reply_to_message_id"] = json!(reply_to);
        }
        self.call("sendMessage", &body).await
    }

    /// Send a photo by URL with a caption. Returns the created message.
    pub async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
        thread_id: Option<i64>,
    ) -> Result<Message> {
        let mut body = json!({
            "chat_id": chat_id,
            "photo": photo_url,
            "caption": caption,
        });
        if let Some(thread) = thread_id {
            body["message_thread_id"] = json!(thread);
        }
        self.call("sendPhoto", &body).await
    }

    /// Long-poll for updates past `offset`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let mut body = json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        self.call("getUpdates", &body).await
    }

    /// Backoff before retry `attempt`. `None` for the first attempt, and for
    /// retries where the previous attempt already waited out a 429
    /// `retry_after` window (the server's wait replaces ours, they must not
    /// stack).
    fn retry_backoff(&self, attempt: u32, rate_limit_waited: bool) -> Option<Duration> {
        if attempt == 0 || rate_limit_waited {
            return None;
        }
        Some(self.backoff * 2u32.pow(attempt - 1))
    }

    /// Perform an API call with bounded retry. Transport failures and 429s
    /// are retried with backoff; other API errors fail immediately.
    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T> {
        let url = format!("{}/{}", self.base_url, method);
        let mut last_error = TelegramError::Network("no attempts made".to_string());
        let mut rate_limit_waited = false;

        for attempt in 0..self.max_retries {
            if let Some(wait) = self.retry_backoff(attempt, rate_limit_waited) {
                debug!(method, attempt, wait_ms = wait.as_millis() as u64, "Retrying API call");
                tokio::time::sleep(wait).await;
            }
            rate_limit_waited = false;

            let resp = match self.client.post(&url).json(body).send().await {
                Ok(resp) => resp,
                Err(err) => {
                    last_error = err.into();
                    continue;
                }
            };

            let status = resp.status();
            let envelope: ApiResponse<T> = match resp.json().await {
                Ok(envelope) => envelope,
                Err(err) => {
                    last_error = TelegramError::Malformed(err.to_string());
                    continue;
                }
            };

            if envelope.ok {
                return envelope
                    .result
                    .ok_or_else(|| TelegramError::Malformed("ok response without result".into()));
            }

            let description = envelope.description.unwrap_or_default();
            if status.as_u16() == 429 {
                if let Some(retry_after) =
                    envelope.parameters.and_then(|p| p.retry_after)
                {
                    warn!(method, retry_after, "Rate limited by Telegram");
                    tokio::time::sleep(Duration::from_secs(retry_after)).await;
                    rate_limit_waited = true;
                }
                last_error = TelegramError::Api {
                    status: 429,
                    description,
                };
                continue;
            }

            return Err(TelegramError::Api {
                status: status.as_u16(),
                description,
            });
        }

        Err(last_error)
    }
}
