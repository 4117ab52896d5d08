// Test mocks for the curation pipeline.
//
// Five mocks matching the five trait boundaries:
// - MockCandidateSource (CandidateSource) — HashMap-based id→candidate/metrics
// - MemoryStagingStore (StagingStore) — stateful in-memory index/payload split
// - MemoryPendingStore (PendingLinkStore) — in-memory links with real expiry
// - RecordingChannel (ChannelPublisher) — records publishes in order
// - RecordingReplies (ReplyPublisher) — records posted follow-ups
//
// Plus a `candidate()` fixture for constructing enriched records.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use frontpage_common::{
    Candidate, EngagementSnapshot, PendingLink, PublishError, PublishReceipt, ReplyDestination,
    StagedCandidate, StoreError,
};

use crate::traits::{
    CandidateSource, ChannelPublisher, PendingLinkStore, ReplyPublisher, StagingStore,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A fully enriched candidate with no engagement observed yet.
pub fn candidate(id: &str) -> Candidate {
    Candidate {
        id: id.to_string(),
        title: format!("Story {id}"),
        url: format!("https://example.com/{id}"),
        discussion_url: format!("https://news.ycombinator.com/item?id={id}"),
        summary: format!("via author on Hacker News ({id})"),
        image_url: None,
        highlights: Vec::new(),
        top_comments: Vec::new(),
        references: Vec::new(),
        score: None,
        comment_count: None,
        posted_at: None,
    }
}

// ---------------------------------------------------------------------------
// MockCandidateSource
// ---------------------------------------------------------------------------

/// HashMap-based candidate source. Ids without registered details are
/// silently dropped by `fetch_details`, matching the trait contract.
/// Metrics can be swapped between ticks via `set_metrics`.
pub struct MockCandidateSource {
    ranked: Mutex<Vec<String>>,
    details: HashMap<String, Candidate>,
    metrics: Mutex<HashMap<String, EngagementSnapshot>>,
    fail_ranked: AtomicBool,
    fail_metrics: AtomicBool,
}

impl MockCandidateSource {
    pub fn new() -> Self {
        Self {
            ranked: Mutex::new(Vec::new()),
            details: HashMap::new(),
            metrics: Mutex::new(HashMap::new()),
            fail_ranked: AtomicBool::new(false),
            fail_metrics: AtomicBool::new(false),
        }
    }

    pub fn with_ranked(self, ids: &[&str]) -> Self {
        *self.ranked.lock().unwrap() = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn on_details(mut self, c: Candidate) -> Self {
        self.details.insert(c.id.clone(), c);
        self
    }

    pub fn on_metrics(self, id: &str, snapshot: EngagementSnapshot) -> Self {
        self.metrics
            .lock()
            .unwrap()
            .insert(id.to_string(), snapshot);
        self
    }

    /// Make `ranked_ids` return an error for every call.
    pub fn failing_ranked(self) -> Self {
        self.fail_ranked.store(true, Ordering::SeqCst);
        self
    }

    /// Make `fetch_metrics` return an error for every call.
    pub fn failing_metrics(self) -> Self {
        self.fail_metrics.store(true, Ordering::SeqCst);
        self
    }

    /// Replace the metric snapshot for an id between ticks.
    pub fn set_metrics(&self, id: &str, snapshot: EngagementSnapshot) {
        self.metrics
            .lock()
            .unwrap()
            .insert(id.to_string(), snapshot);
    }

    /// Replace the rank listing between ticks.
    pub fn set_ranked(&self, ids: &[&str]) {
        *self.ranked.lock().unwrap() = ids.iter().map(|s| s.to_string()).collect();
    }
}

#[async_trait]
impl CandidateSource for MockCandidateSource {
    async fn ranked_ids(&self, limit: usize) -> Result<Vec<String>> {
        if self.fail_ranked.load(Ordering::SeqCst) {
            bail!("MockCandidateSource: ranked_ids failing");
        }
        let ranked = self.ranked.lock().unwrap();
        Ok(ranked.iter().take(limit).cloned().collect())
    }

    async fn fetch_details(&self, ids: &[String]) -> Result<Vec<Candidate>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.details.get(id).cloned())
            .collect())
    }

    async fn fetch_metrics(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, EngagementSnapshot>> {
        if self.fail_metrics.load(Ordering::SeqCst) {
            bail!("MockCandidateSource: fetch_metrics failing");
        }
        let metrics = self.metrics.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| metrics.get(id).map(|m| (id.clone(), *m)))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MemoryStagingStore
// ---------------------------------------------------------------------------

struct MemoryStagingInner {
    /// Full records keyed by candidate id.
    payloads: HashMap<String, StagedCandidate>,
    /// Membership index; may reference a missing payload after `drop_payload`.
    index: HashSet<String>,
    published: HashSet<String>,
}

/// Stateful in-memory staging store. Keeps an index separate from payloads
/// so tests can exercise the self-healing `list` path by dropping a payload
/// out from under the index.
pub struct MemoryStagingStore {
    inner: Mutex<MemoryStagingInner>,
}

impl MemoryStagingStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryStagingInner {
                payloads: HashMap::new(),
                index: HashSet::new(),
                published: HashSet::new(),
            }),
        }
    }

    /// Remove a payload while leaving its index entry dangling.
    pub fn drop_payload(&self, id: &str) {
        self.inner.lock().unwrap().payloads.remove(id);
    }

    // --- Assertion helpers ---

    pub fn staged_count(&self) -> usize {
        self.inner.lock().unwrap().index.len()
    }

    pub fn published_contains(&self, id: &str) -> bool {
        self.inner.lock().unwrap().published.contains(id)
    }

    pub fn staged_contains(&self, id: &str) -> bool {
        self.inner.lock().unwrap().index.contains(id)
    }
}

#[async_trait]
impl StagingStore for MemoryStagingStore {
    async fn stage(
        &self,
        candidate: &Candidate,
        now: DateTime<Utc>,
    ) -> std::result::Result<StagedCandidate, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let staged = match inner.payloads.get(&candidate.id) {
            // staged_at survives a racing re-stage; payload and check time refresh
            Some(existing) => StagedCandidate {
                candidate: candidate.clone(),
                staged_at: existing.staged_at,
                last_checked: now,
            },
            None => StagedCandidate {
                candidate: candidate.clone(),
                staged_at: now,
                last_checked: now,
            },
        };
        inner.payloads.insert(candidate.id.clone(), staged.clone());
        inner.index.insert(candidate.id.clone());
        Ok(staged)
    }

    async fn refresh(
        &self,
        id: &str,
        metrics: &EngagementSnapshot,
        now: DateTime<Utc>,
    ) -> std::result::Result<StagedCandidate, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let existing = inner
            .payloads
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotStaged(id.to_string()))?;
        let updated = StagedCandidate {
            candidate: existing.candidate.with_engagement(metrics),
            staged_at: existing.staged_at,
            last_checked: now,
        };
        inner.payloads.insert(id.to_string(), updated.clone());
        Ok(updated)
    }

    async fn list(&self) -> std::result::Result<Vec<StagedCandidate>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let ids: Vec<String> = inner.index.iter().cloned().collect();
        let mut live: BTreeMap<(DateTime<Utc>, String), StagedCandidate> = BTreeMap::new();
        for id in ids {
            match inner.payloads.get(&id) {
                Some(staged) => {
                    live.insert((staged.staged_at, id.clone()), staged.clone());
                }
                // dangling index entry: heal by pruning
                None => {
                    inner.index.remove(&id);
                }
            }
        }
        Ok(live.into_values().collect())
    }

    async fn get(&self, id: &str) -> std::result::Result<Option<StagedCandidate>, StoreError> {
        Ok(self.inner.lock().unwrap().payloads.get(id).cloned())
    }

    async fn is_published(&self, id: &str) -> std::result::Result<bool, StoreError> {
        Ok(self.inner.lock().unwrap().published.contains(id))
    }

    async fn mark_published(&self, id: &str) -> std::result::Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.payloads.remove(id);
        inner.index.remove(id);
        inner.published.insert(id.to_string());
        Ok(())
    }

    async fn seed_published(&self, ids: &[String]) -> std::result::Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        for id in ids {
            inner.published.insert(id.clone());
        }
        Ok(())
    }

    async fn forget(&self, id: &str) -> std::result::Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.payloads.remove(id);
        inner.index.remove(id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryPendingStore
// ---------------------------------------------------------------------------

/// In-memory pending-link store with real expiry arithmetic, keyed by
/// channel message id.
pub struct MemoryPendingStore {
    links: Mutex<HashMap<i64, (PendingLink, DateTime<Utc>)>>,
    ttl: Duration,
    fail_register: AtomicBool,
}

impl MemoryPendingStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            links: Mutex::new(HashMap::new()),
            ttl,
            fail_register: AtomicBool::new(false),
        }
    }

    /// Make `register` return an error for every call.
    pub fn failing_register(self) -> Self {
        self.fail_register.store(true, Ordering::SeqCst);
        self
    }

    pub fn pending_count(&self) -> usize {
        self.links.lock().unwrap().len()
    }
}

#[async_trait]
impl PendingLinkStore for MemoryPendingStore {
    async fn register(
        &self,
        message_id: i64,
        link: &PendingLink,
        now: DateTime<Utc>,
    ) -> std::result::Result<(), StoreError> {
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(StoreError::database("MemoryPendingStore: register failing"));
        }
        self.links
            .lock()
            .unwrap()
            .insert(message_id, (link.clone(), now + self.ttl));
        Ok(())
    }

    async fn claim(
        &self,
        message_id: i64,
        now: DateTime<Utc>,
    ) -> std::result::Result<Option<PendingLink>, StoreError> {
        let mut links = self.links.lock().unwrap();
        match links.remove(&message_id) {
            Some((link, expires_at)) if expires_at > now => Ok(Some(link)),
            _ => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingChannel
// ---------------------------------------------------------------------------

/// Records every published candidate id in order and hands out sequential
/// message ids starting at 1000. Ids in the failure set error instead.
pub struct RecordingChannel {
    published: Mutex<Vec<(String, i64)>>,
    next_message_id: AtomicI64,
    fail_ids: Mutex<HashSet<String>>,
    linked_chat_id: Option<i64>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            next_message_id: AtomicI64::new(1000),
            fail_ids: Mutex::new(HashSet::new()),
            linked_chat_id: None,
        }
    }

    /// Report the given linked discussion chat in every receipt.
    pub fn with_linked_chat(mut self, chat_id: i64) -> Self {
        self.linked_chat_id = Some(chat_id);
        self
    }

    /// Make publishing the given candidate id fail.
    pub fn failing_for(self, id: &str) -> Self {
        self.fail_ids.lock().unwrap().insert(id.to_string());
        self
    }

    /// Let a previously failing id succeed again.
    pub fn heal(&self, id: &str) {
        self.fail_ids.lock().unwrap().remove(id);
    }

    // --- Assertion helpers ---

    /// (candidate_id, message_id) pairs in publish order.
    pub fn published(&self) -> Vec<(String, i64)> {
        self.published.lock().unwrap().clone()
    }

    pub fn published_ids(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl ChannelPublisher for RecordingChannel {
    async fn publish(
        &self,
        candidate: &Candidate,
    ) -> std::result::Result<PublishReceipt, PublishError> {
        if self.fail_ids.lock().unwrap().contains(&candidate.id) {
            return Err(PublishError::Transport(format!(
                "RecordingChannel: publish failing for {}",
                candidate.id
            )));
        }
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.published
            .lock()
            .unwrap()
            .push((candidate.id.clone(), message_id));
        Ok(PublishReceipt {
            message_id,
            linked_chat_id: self.linked_chat_id,
        })
    }
}

// ---------------------------------------------------------------------------
// RecordingReplies
// ---------------------------------------------------------------------------

/// Records every posted follow-up destination alongside the candidate id.
pub struct RecordingReplies {
    replies: Mutex<Vec<(ReplyDestination, String)>>,
    fail: AtomicBool,
}

impl RecordingReplies {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    /// Make `post_reply` return an error for every call.
    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    /// Let replies succeed again.
    pub fn heal(&self) {
        self.fail.store(false, Ordering::SeqCst);
    }

    pub fn replies(&self) -> Vec<(ReplyDestination, String)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn reply_count(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl ReplyPublisher for RecordingReplies {
    async fn post_reply(
        &self,
        destination: ReplyDestination,
        candidate: &Candidate,
    ) -> std::result::Result<(), PublishError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PublishError::Transport(
                "RecordingReplies: post_reply failing".to_string(),
            ));
        }
        self.replies
            .lock()
            .unwrap()
            .push((destination, candidate.id.clone()));
        Ok(())
    }
}
