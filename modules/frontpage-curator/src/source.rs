// CandidateSource over the Hacker News Firebase API.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use frontpage_common::{Candidate, EngagementSnapshot};
use hackernews_client::{HnClient, Story};

use crate::traits::CandidateSource;

pub struct HnCandidateSource {
    client: HnClient,
}

impl HnCandidateSource {
    pub fn new(client: HnClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CandidateSource for HnCandidateSource {
    async fn ranked_ids(&self, limit: usize) -> Result<Vec<String>> {
        let ids = self.client.top_story_ids(limit).await?;
        Ok(ids.into_iter().map(|id| id.to_string()).collect())
    }

    async fn fetch_details(&self, ids: &[String]) -> Result<Vec<Candidate>> {
        let numeric = parse_ids(ids);
        let stories = self.client.stories(&numeric).await?;
        Ok(stories.into_iter().map(candidate_from_story).collect())
    }

    async fn fetch_metrics(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, EngagementSnapshot>> {
        let numeric = parse_ids(ids);
        let stories = self.client.stories(&numeric).await?;
        Ok(stories
            .into_iter()
            .map(|story| {
                (
                    story.id.to_string(),
                    EngagementSnapshot {
                        score: story.score,
                        comment_count: story.descendants,
                        posted_at: story.time.and_then(unix_to_utc),
                    },
                )
            })
            .collect())
    }
}

/// Ids that do not parse are dropped — they can never resolve upstream.
fn parse_ids(ids: &[String]) -> Vec<i64> {
    ids.iter().filter_map(|id| id.parse().ok()).collect()
}

fn unix_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

fn candidate_from_story(story: Story) -> Candidate {
    let summary = story
        .by
        .as_deref()
        .map(|by| format!("via {by} on Hacker News"))
        .unwrap_or_default();
    Candidate {
        id: story.id.to_string(),
        title: story.title.clone(),
        // Ask/Show posts have no external URL; the discussion page is the story.
        url: story.url.clone().unwrap_or_else(|| story.hn_url.clone()),
        discussion_url: story.hn_url.clone(),
        summary,
        image_url: None,
        highlights: vec![],
        top_comments: vec![],
        references: vec![],
        score: story.score,
        comment_count: story.descendants,
        posted_at: story.time.and_then(unix_to_utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_falls_back_to_discussion_page() {
        let story = Story {
            id: 42,
            title: "Ask HN: something".to_string(),
            by: Some("alice".to_string()),
            time: Some(1_700_000_000),
            score: Some(3),
            descendants: Some(1),
            url: None,
            hn_url: "https://news.ycombinator.com/item?id=42".to_string(),
        };
        let candidate = candidate_from_story(story);
        assert_eq!(candidate.url, candidate.discussion_url);
        assert_eq!(candidate.id, "42");
        assert!(candidate.posted_at.is_some());
    }

    #[test]
    fn unparsable_ids_are_dropped() {
        let ids = vec!["42".to_string(), "not-a-number".to_string()];
        assert_eq!(parse_ids(&ids), vec![42]);
    }
}
