use chrono::{DateTime, Duration, Utc};

use frontpage_common::{Candidate, Config};

/// What to do with a staged candidate right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Not ready yet; stays staged.
    Keep,
    /// Release to the channel.
    Publish(PublishReason),
    /// Consume the candidate without publishing. Only age-triggered
    /// graduations can end here.
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishReason {
    Score,
    Comments,
    Age,
}

impl std::fmt::Display for PublishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishReason::Score => write!(f, "score"),
            PublishReason::Comments => write!(f, "comments"),
            PublishReason::Age => write!(f, "age"),
        }
    }
}

/// Decides whether a staged candidate graduates, purely from its current
/// metrics and age. Metric-refresh gating is the caller's concern.
#[derive(Debug, Clone)]
pub struct GraduationPolicy {
    /// Points that qualify a candidate outright.
    pub min_score: i64,
    /// Comment count that qualifies a candidate outright.
    pub min_comments: i64,
    /// Age past which a candidate graduates regardless of engagement.
    pub max_wait: Duration,
    /// Minimum points an age-graduate needs to be published rather than dropped.
    pub age_floor_score: i64,
    /// Minimum comments an age-graduate needs to be published rather than dropped.
    pub age_floor_comments: i64,
}

impl GraduationPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_score: config.min_score,
            min_comments: config.min_comments,
            max_wait: config.max_wait(),
            age_floor_score: config.age_floor_score,
            age_floor_comments: config.age_floor_comments,
        }
    }

    pub fn decide(&self, candidate: &Candidate, now: DateTime<Utc>) -> Decision {
        let score = candidate.score.unwrap_or(0);
        let comments = candidate.comment_count.unwrap_or(0);

        if score >= self.min_score {
            return Decision::Publish(PublishReason::Score);
        }
        if comments >= self.min_comments {
            return Decision::Publish(PublishReason::Comments);
        }

        // Age is only evaluable once the source has told us when the story
        // was posted.
        let aged_out = match candidate.posted_at {
            Some(posted_at) => now.signed_duration_since(posted_at) >= self.max_wait,
            None => false,
        };
        if !aged_out {
            return Decision::Keep;
        }

        // Aging out is a safety valve, not a promotion: stale candidates
        // that never accrued minimal engagement are forgotten instead of
        // surfaced. Score- and comment-triggered graduations never discard.
        if score < self.age_floor_score && comments < self.age_floor_comments {
            Decision::Discard
        } else {
            Decision::Publish(PublishReason::Age)
        }
    }
}
