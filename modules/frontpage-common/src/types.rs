use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Candidates ---

/// A labeled link attached to a candidate (related reading, docs, threads).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub label: String,
    pub url: String,
}

/// Enriched snapshot of a story under consideration for the channel.
///
/// Everything except the trailing engagement fields is immutable once
/// enriched. `score`, `comment_count` and `posted_at` are re-observed from
/// the source over time and start out unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Stable external identifier, string-normalized.
    pub id: String,
    pub title: String,
    pub url: String,
    pub discussion_url: String,
    pub summary: String,
    pub image_url: Option<String>,
    pub highlights: Vec<String>,
    pub top_comments: Vec<String>,
    pub references: Vec<Reference>,
    pub score: Option<i64>,
    pub comment_count: Option<i64>,
    pub posted_at: Option<DateTime<Utc>>,
}

impl Candidate {
    /// Apply newer observed engagement values, leaving enrichment untouched.
    /// `None` fields in the snapshot keep the previously known value.
    pub fn with_engagement(mut self, snapshot: &EngagementSnapshot) -> Self {
        if snapshot.score.is_some() {
            self.score = snapshot.score;
        }
        if snapshot.comment_count.is_some() {
            self.comment_count = snapshot.comment_count;
        }
        if snapshot.posted_at.is_some() {
            self.posted_at = snapshot.posted_at;
        }
        self
    }
}

/// Engagement values observed from the source during a metric refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementSnapshot {
    pub score: Option<i64>,
    pub comment_count: Option<i64>,
    pub posted_at: Option<DateTime<Utc>>,
}

/// A candidate under active evaluation. Identity is `candidate.id`.
///
/// `staged_at` is set on first sight and never moves; `last_checked` is
/// bumped by every metric refresh and gates how often the source is polled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedCandidate {
    pub candidate: Candidate,
    pub staged_at: DateTime<Utc>,
    pub last_checked: DateTime<Utc>,
}

// --- Publish bridge ---

/// Snapshot persisted when a candidate is published, waiting for the
/// auto-forward that tells us where its discussion thread lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingLink {
    pub candidate: Candidate,
    pub discussion_chat_id: Option<i64>,
}

/// What the channel publisher hands back for a successful post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Channel message id — the key the auto-forward will reference.
    pub message_id: i64,
    /// Discussion chat linked to the channel, when the API reports one.
    pub linked_chat_id: Option<i64>,
}

/// Where a follow-up reply should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyDestination {
    pub chat_id: i64,
    /// Forum supergroup (Topics ON): comment via the thread.
    pub thread_id: Option<i64>,
    /// Regular discussion group: comment by replying to the forwarded copy.
    pub reply_to_message_id: Option<i64>,
}

/// Inbound notification that a channel post was auto-forwarded into the
/// discussion chat. Arrives out-of-band from the publish tick — late,
/// never, or (in theory) twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardNotice {
    /// Message id of the original channel post.
    pub origin_message_id: i64,
    /// Chat the forwarded copy landed in.
    pub chat_id: i64,
    pub thread_id: Option<i64>,
    /// Message id of the forwarded copy itself.
    pub reply_to_message_id: i64,
    /// Channel the forward came from, when the update carries it.
    pub source_channel_id: Option<i64>,
}
