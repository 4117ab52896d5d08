pub mod error;
pub mod types;

pub use error::{HnError, Result};
pub use types::{Item, Story};

use std::collections::HashSet;
use std::time::Duration;

use futures::future::join_all;
use tracing::debug;

const BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";

/// Firebase story list endpoints.
const LISTS: &[(&str, &str)] = &[("top", "topstories"), ("new", "newstories"), ("best", "beststories")];

pub struct HnClient {
    client: reqwest::Client,
    base_url: String,
}

impl HnClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Override the base URL for self-hosted mirrors or tests.
    pub fn with_base_url(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(12))
            .user_agent("frontpage/0.1 (+https://news.ycombinator.com/)")
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Return up to `limit` story ids for a Firebase collection ("top",
    /// "new" or "best"). Firebase returns up to 500 ids; we trim client-side.
    pub async fn story_ids(&self, kind: &str, limit: usize) -> Result<Vec<i64>> {
        let list = LISTS
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, v)| *v)
            .ok_or_else(|| HnError::UnknownList(kind.to_string()))?;

        let url = format!("{}/{}.json", self.base_url, list);
        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(HnError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut ids: Vec<i64> = resp.json().await?;
        ids.truncate(limit);
        Ok(ids)
    }

    /// Convenience wrapper for the front-page ranking.
    pub async fn top_story_ids(&self, limit: usize) -> Result<Vec<i64>> {
        self.story_ids("top", limit).await
    }

    /// Fetch and normalize story payloads for the provided ids.
    ///
    /// Best-effort: ids that fail to fetch, decode, or turn out not to be
    /// stories are silently dropped. Input order is preserved and duplicate
    /// ids are collapsed so callers get deterministic story sets.
    pub async fn stories(&self, ids: &[i64]) -> Result<Vec<Story>> {
        let mut seen = HashSet::new();
        let unique: Vec<i64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let fetches = unique.iter().map(|id| self.item(*id));
        let results = join_all(fetches).await;

        let mut stories = Vec::with_capacity(unique.len());
        for (id, result) in unique.iter().zip(results) {
            match result {
                Ok(Some(item)) => {
                    if let Some(story) = Story::from_item(item) {
                        stories.push(story);
                    }
                }
                Ok(None) => debug!(id, "Item missing from Firebase"),
                Err(err) => debug!(id, error = %err, "Item fetch failed, dropping"),
            }
        }
        Ok(stories)
    }

    /// Fetch a single raw item. `null` bodies (deleted/unknown ids) map to `None`.
    async fn item(&self, id: i64) -> Result<Option<Item>> {
        let url = format!("{}/item/{}.json", self.base_url, id);
        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(HnError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }
}

impl Default for HnClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_story_items_are_filtered() {
        let item = Item {
            id: 1,
            kind: Some("comment".to_string()),
            title: None,
            by: None,
            time: None,
            score: None,
            descendants: None,
            url: None,
        };
        assert!(Story::from_item(item).is_none());
    }

    #[test]
    fn story_gets_discussion_url() {
        let item = Item {
            id: 42,
            kind: Some("story".to_string()),
            title: Some("A title".to_string()),
            by: Some("pg".to_string()),
            time: Some(1_700_000_000),
            score: Some(120),
            descendants: Some(34),
            url: Some("https://example.com/post".to_string()),
        };
        let story = Story::from_item(item).expect("should be a story");
        assert_eq!(story.hn_url, "https://news.ycombinator.com/item?id=42");
        assert_eq!(story.score, Some(120));
    }

    #[test]
    fn unknown_list_is_rejected() {
        // story_ids validates the list name before any network call; probe
        // the lookup table directly.
        assert!(LISTS.iter().any(|(k, _)| *k == "top"));
        assert!(!LISTS.iter().any(|(k, _)| *k == "hot"));
    }
}
