// Trait abstractions for the curation pipeline's dependencies.
//
// CandidateSource — the ranking/enrichment upstream, best-effort by contract.
// ChannelPublisher / ReplyPublisher — the outbound messaging side effects.
// StagingStore / PendingLinkStore — the shared durable store.
//
// These enable deterministic testing with the mocks in `testing`:
// no network, no database. `cargo test` in seconds.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use frontpage_common::{
    Candidate, EngagementSnapshot, PendingLink, PublishError, PublishReceipt, ReplyDestination,
    StagedCandidate, StoreError,
};

// ---------------------------------------------------------------------------
// CandidateSource — ranking + enrichment upstream
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Fetch up to `limit` candidate ids in rank order.
    async fn ranked_ids(&self, limit: usize) -> Result<Vec<String>>;

    /// Fetch enriched records for the given ids. Best-effort: ids the
    /// source cannot resolve are silently dropped, not errored.
    async fn fetch_details(&self, ids: &[String]) -> Result<Vec<Candidate>>;

    /// Re-observe engagement metrics for the given ids. Ids missing from
    /// the result simply keep their previously known values.
    async fn fetch_metrics(&self, ids: &[String])
        -> Result<HashMap<String, EngagementSnapshot>>;
}

// ---------------------------------------------------------------------------
// Publishers — outbound side effects
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ChannelPublisher: Send + Sync {
    /// Post the headline card to the channel. The receipt's message id is
    /// the key a later auto-forward will reference.
    async fn publish(&self, candidate: &Candidate) -> std::result::Result<PublishReceipt, PublishError>;
}

#[async_trait]
pub trait ReplyPublisher: Send + Sync {
    /// Post the follow-up comment bundle into the discussion chat.
    async fn post_reply(
        &self,
        destination: ReplyDestination,
        candidate: &Candidate,
    ) -> std::result::Result<(), PublishError>;
}

// ---------------------------------------------------------------------------
// Stores — shared durable state
// ---------------------------------------------------------------------------

#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Record a newly discovered candidate with `staged_at = now`. Callers
    /// are responsible for not staging ids that are already staged or
    /// published; the store keeps `staged_at` stable if they race anyway.
    async fn stage(
        &self,
        candidate: &Candidate,
        now: DateTime<Utc>,
    ) -> std::result::Result<StagedCandidate, StoreError>;

    /// Replace the engagement fields with newer observed values and bump
    /// `last_checked`. `staged_at` is untouched. Errors with `NotStaged`
    /// if the id is not currently staged.
    async fn refresh(
        &self,
        id: &str,
        metrics: &EngagementSnapshot,
        now: DateTime<Utc>,
    ) -> std::result::Result<StagedCandidate, StoreError>;

    /// All live staged records ordered by `staged_at` ascending. Prunes and
    /// skips any index entry whose payload is missing or undecodable.
    async fn list(&self) -> std::result::Result<Vec<StagedCandidate>, StoreError>;

    async fn get(&self, id: &str) -> std::result::Result<Option<StagedCandidate>, StoreError>;

    async fn is_published(&self, id: &str) -> std::result::Result<bool, StoreError>;

    /// Atomically remove the staged record (if present) and add the id to
    /// the published set. Idempotent.
    async fn mark_published(&self, id: &str) -> std::result::Result<(), StoreError>;

    /// Bulk-add ids to the published set without staging (bootstrap/backfill).
    async fn seed_published(&self, ids: &[String]) -> std::result::Result<(), StoreError>;

    /// Remove a staged record without marking it published; the id may be
    /// staged again later.
    async fn forget(&self, id: &str) -> std::result::Result<(), StoreError>;
}

#[async_trait]
pub trait PendingLinkStore: Send + Sync {
    /// Persist the link under the store's fixed expiry window, overwriting
    /// any prior link for the same message id.
    async fn register(
        &self,
        message_id: i64,
        link: &PendingLink,
        now: DateTime<Utc>,
    ) -> std::result::Result<(), StoreError>;

    /// Fetch and remove the link in one atomic step. Absent means never
    /// registered, already claimed, or expired; callers cannot tell which.
    async fn claim(
        &self,
        message_id: i64,
        now: DateTime<Utc>,
    ) -> std::result::Result<Option<PendingLink>, StoreError>;
}
