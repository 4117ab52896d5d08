//! End-to-end curation flow over in-memory mocks: staging, metric refresh,
//! graduation, the publish commit, and the forward bridge. No network, no
//! database.
//!
//! Run with: cargo test -p frontpage-curator --test curator_flow

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use frontpage_common::{EngagementSnapshot, ForwardNotice, PendingLink};
use frontpage_curator::bridge::ForwardBridge;
use frontpage_curator::policy::GraduationPolicy;
use frontpage_curator::testing::{
    candidate, MemoryPendingStore, MemoryStagingStore, MockCandidateSource, RecordingChannel,
    RecordingReplies,
};
use frontpage_curator::tick::{Curator, TickSettings};
use frontpage_curator::traits::{PendingLinkStore, StagingStore};

const CHANNEL_ID: i64 = -100_555;

fn policy() -> GraduationPolicy {
    GraduationPolicy {
        min_score: 50,
        min_comments: 50,
        max_wait: Duration::hours(5),
        age_floor_score: 10,
        age_floor_comments: 10,
    }
}

fn settings() -> TickSettings {
    TickSettings {
        candidate_limit: 15,
        refresh_interval: Duration::minutes(10),
        discussion_id: None,
    }
}

struct Harness {
    source: Arc<MockCandidateSource>,
    channel: Arc<RecordingChannel>,
    staging: Arc<MemoryStagingStore>,
    pending: Arc<MemoryPendingStore>,
    curator: Curator,
}

fn harness(source: MockCandidateSource, channel: RecordingChannel) -> Harness {
    let source = Arc::new(source);
    let channel = Arc::new(channel);
    let staging = Arc::new(MemoryStagingStore::new());
    let pending = Arc::new(MemoryPendingStore::new(Duration::minutes(15)));
    let curator = Curator::new(
        source.clone(),
        channel.clone(),
        staging.clone(),
        pending.clone(),
        policy(),
        settings(),
    );
    Harness {
        source,
        channel,
        staging,
        pending,
        curator,
    }
}

fn snapshot(score: i64, comments: i64, posted_at: DateTime<Utc>) -> EngagementSnapshot {
    EngagementSnapshot {
        score: Some(score),
        comment_count: Some(comments),
        posted_at: Some(posted_at),
    }
}

fn notice(origin_message_id: i64, chat_id: i64) -> ForwardNotice {
    ForwardNotice {
        origin_message_id,
        chat_id,
        thread_id: None,
        reply_to_message_id: 9000 + origin_message_id,
        source_channel_id: Some(CHANNEL_ID),
    }
}

// ---------------------------------------------------------------------------
// Staging and dedup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_candidates_are_staged_not_published() {
    let h = harness(
        MockCandidateSource::new()
            .with_ranked(&["1", "2"])
            .on_details(candidate("1"))
            .on_details(candidate("2")),
        RecordingChannel::new(),
    );

    let report = h.curator.tick(Utc::now()).await;

    assert_eq!(report.discovered, 2);
    assert_eq!(report.staged, 2);
    assert_eq!(report.published, 0);
    assert_eq!(report.kept, 2);
    assert_eq!(h.staging.staged_count(), 2);
    assert_eq!(h.channel.publish_count(), 0);
}

#[tokio::test]
async fn already_published_ids_are_never_restaged() {
    let h = harness(
        MockCandidateSource::new()
            .with_ranked(&["1"])
            .on_details(candidate("1")),
        RecordingChannel::new(),
    );
    h.staging
        .seed_published(&["1".to_string()])
        .await
        .unwrap();

    let report = h.curator.tick(Utc::now()).await;

    assert_eq!(report.staged, 0);
    assert_eq!(h.staging.staged_count(), 0);
}

#[tokio::test]
async fn staged_ids_are_not_staged_twice() {
    let now = Utc::now();
    let h = harness(
        MockCandidateSource::new()
            .with_ranked(&["1"])
            .on_details(candidate("1")),
        RecordingChannel::new(),
    );

    let first = h.curator.tick(now).await;
    let second = h.curator.tick(now + Duration::minutes(5)).await;

    assert_eq!(first.staged, 1);
    assert_eq!(second.staged, 0);
    assert_eq!(h.staging.staged_count(), 1);
}

#[tokio::test]
async fn ranked_fetch_failure_degrades_to_refresh_only() {
    let now = Utc::now();
    let h = harness(
        MockCandidateSource::new().failing_ranked(),
        RecordingChannel::new(),
    );
    h.staging.stage(&candidate("7"), now).await.unwrap();

    let report = h.curator.tick(now + Duration::minutes(1)).await;

    // The pre-staged record was still evaluated.
    assert_eq!(report.discovered, 0);
    assert_eq!(report.kept, 1);
    assert!(h.staging.staged_contains("7"));
}

// ---------------------------------------------------------------------------
// Metric refresh gating
// ---------------------------------------------------------------------------

#[tokio::test]
async fn refresh_waits_out_the_gate_interval() {
    let now = Utc::now();
    let h = harness(
        MockCandidateSource::new()
            .with_ranked(&["1"])
            .on_details(candidate("1"))
            .on_metrics("1", snapshot(3, 3, now)),
        RecordingChannel::new(),
    );

    // Staging sets last_checked = now, so an immediate second tick is gated.
    h.curator.tick(now).await;
    let gated = h.curator.tick(now + Duration::minutes(5)).await;
    let due = h.curator.tick(now + Duration::minutes(11)).await;

    assert_eq!(gated.refreshed, 0);
    assert_eq!(due.refreshed, 1);
}

#[tokio::test]
async fn refreshed_metrics_drive_graduation() {
    let now = Utc::now();
    let h = harness(
        MockCandidateSource::new()
            .with_ranked(&["1"])
            .on_details(candidate("1"))
            .on_metrics("1", snapshot(8, 4, now)),
        RecordingChannel::new(),
    );

    let first = h.curator.tick(now).await;
    assert_eq!(first.published, 0);

    // The story takes off between ticks.
    h.source.set_metrics("1", snapshot(80, 4, now));

    let second = h.curator.tick(now + Duration::minutes(11)).await;
    assert_eq!(second.refreshed, 1);
    assert_eq!(second.published, 1);
    assert_eq!(h.channel.published_ids(), vec!["1".to_string()]);
    assert!(h.staging.published_contains("1"));
    assert!(!h.staging.staged_contains("1"));
}

#[tokio::test]
async fn missing_metrics_still_bump_the_gate() {
    let now = Utc::now();
    // Source returns no metrics for the staged id.
    let h = harness(
        MockCandidateSource::new()
            .with_ranked(&["1"])
            .on_details(candidate("1")),
        RecordingChannel::new(),
    );

    h.curator.tick(now).await;
    let first_refresh = h.curator.tick(now + Duration::minutes(11)).await;
    // Gate was bumped by the empty refresh, so this one is too early again.
    let second_refresh = h.curator.tick(now + Duration::minutes(15)).await;

    assert_eq!(first_refresh.refreshed, 1);
    assert_eq!(second_refresh.refreshed, 0);
}

// ---------------------------------------------------------------------------
// Graduation commit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn graduates_publish_oldest_staging_first() {
    let now = Utc::now();
    let h = harness(MockCandidateSource::new(), RecordingChannel::new());

    // "9" staged well before "2"; both are already past the score threshold.
    h.staging
        .stage(&candidate("9").with_engagement(&snapshot(70, 0, now)), now - Duration::hours(2))
        .await
        .unwrap();
    h.staging
        .stage(&candidate("2").with_engagement(&snapshot(90, 0, now)), now - Duration::hours(1))
        .await
        .unwrap();

    let report = h.curator.tick(now).await;

    assert_eq!(report.published, 2);
    assert_eq!(
        h.channel.published_ids(),
        vec!["9".to_string(), "2".to_string()]
    );
}

#[tokio::test]
async fn publish_failure_keeps_candidate_staged_for_retry() {
    let now = Utc::now();
    let h = harness(
        MockCandidateSource::new(),
        RecordingChannel::new().failing_for("1"),
    );
    h.staging
        .stage(&candidate("1").with_engagement(&snapshot(70, 0, now)), now)
        .await
        .unwrap();

    let failed = h.curator.tick(now).await;
    assert_eq!(failed.publish_failures, 1);
    assert_eq!(failed.published, 0);
    assert!(h.staging.staged_contains("1"));
    assert!(!h.staging.published_contains("1"));

    // Next tick succeeds once the channel recovers.
    h.channel.heal("1");
    let retried = h.curator.tick(now + Duration::minutes(1)).await;
    assert_eq!(retried.published, 1);
    assert!(h.staging.published_contains("1"));
}

#[tokio::test]
async fn aged_low_engagement_candidate_is_discarded_silently() {
    let now = Utc::now();
    let h = harness(MockCandidateSource::new(), RecordingChannel::new());
    h.staging
        .stage(
            &candidate("1").with_engagement(&snapshot(3, 2, now - Duration::hours(6))),
            now - Duration::hours(6),
        )
        .await
        .unwrap();

    let report = h.curator.tick(now).await;

    assert_eq!(report.discarded, 1);
    assert_eq!(report.published, 0);
    assert_eq!(h.channel.publish_count(), 0);
    // Consumed: it can never be staged again.
    assert!(h.staging.published_contains("1"));
    assert!(!h.staging.staged_contains("1"));
}

#[tokio::test]
async fn link_store_failure_still_consumes_the_candidate() {
    let now = Utc::now();
    let source = Arc::new(MockCandidateSource::new());
    let channel = Arc::new(RecordingChannel::new());
    let staging = Arc::new(MemoryStagingStore::new());
    let pending = Arc::new(MemoryPendingStore::new(Duration::minutes(15)).failing_register());
    let curator = Curator::new(
        source,
        channel.clone(),
        staging.clone(),
        pending.clone(),
        policy(),
        settings(),
    );
    staging
        .stage(&candidate("1").with_engagement(&snapshot(70, 0, now)), now)
        .await
        .unwrap();

    let report = curator.tick(now).await;

    // The headline went out, so the candidate must not be retried even
    // though its follow-up link was lost.
    assert_eq!(report.published, 1);
    assert_eq!(channel.publish_count(), 1);
    assert!(staging.published_contains("1"));
    assert_eq!(pending.pending_count(), 0);
}

// ---------------------------------------------------------------------------
// Self-healing staged set
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dangling_index_entry_is_pruned_not_fatal() {
    let now = Utc::now();
    let h = harness(MockCandidateSource::new(), RecordingChannel::new());
    h.staging.stage(&candidate("1"), now).await.unwrap();
    h.staging
        .stage(&candidate("2").with_engagement(&snapshot(70, 0, now)), now)
        .await
        .unwrap();

    // Simulate the partial-write crash window: index entry without payload.
    h.staging.drop_payload("1");

    let report = h.curator.tick(now).await;

    // "2" still graduated; "1" was healed out of the index.
    assert_eq!(report.published, 1);
    assert!(!h.staging.staged_contains("1"));
}

// ---------------------------------------------------------------------------
// Forward bridge
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publish_then_forward_posts_exactly_one_comment() {
    let now = Utc::now();
    let h = harness(
        MockCandidateSource::new()
            .with_ranked(&["1"])
            .on_details(candidate("1"))
            .on_metrics("1", snapshot(80, 10, now)),
        RecordingChannel::new(),
    );
    let replies = Arc::new(RecordingReplies::new());
    let bridge = ForwardBridge::new(h.pending.clone(), replies.clone(), CHANNEL_ID);

    h.curator.tick(now).await;
    h.curator.tick(now + Duration::minutes(11)).await;
    let (id, message_id) = h.channel.published()[0].clone();
    assert_eq!(id, "1");

    let group_chat = -100_777;
    let first = bridge
        .handle(&notice(message_id, group_chat), now + Duration::minutes(12))
        .await
        .unwrap();
    let duplicate = bridge
        .handle(&notice(message_id, group_chat), now + Duration::minutes(12))
        .await
        .unwrap();

    assert!(first);
    assert!(!duplicate);
    let posted = replies.replies();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].0.chat_id, group_chat);
    // Non-forum group: comment threads by replying to the forwarded copy.
    assert_eq!(
        posted[0].0.reply_to_message_id,
        Some(9000 + message_id)
    );
    assert_eq!(posted[0].1, "1");
}

#[tokio::test]
async fn expired_link_is_not_claimable() {
    let now = Utc::now();
    let pending = Arc::new(MemoryPendingStore::new(Duration::minutes(15)));
    let replies = Arc::new(RecordingReplies::new());
    let bridge = ForwardBridge::new(pending.clone(), replies.clone(), CHANNEL_ID);

    let link = PendingLink {
        candidate: candidate("1"),
        discussion_chat_id: None,
    };
    pending.register(42, &link, now).await.unwrap();

    let handled = bridge
        .handle(&notice(42, -100_777), now + Duration::minutes(16))
        .await
        .unwrap();

    assert!(!handled);
    assert_eq!(replies.reply_count(), 0);
}

#[tokio::test]
async fn foreign_channel_forward_is_ignored() {
    let now = Utc::now();
    let pending = Arc::new(MemoryPendingStore::new(Duration::minutes(15)));
    let replies = Arc::new(RecordingReplies::new());
    let bridge = ForwardBridge::new(pending.clone(), replies.clone(), CHANNEL_ID);

    let link = PendingLink {
        candidate: candidate("1"),
        discussion_chat_id: None,
    };
    pending.register(42, &link, now).await.unwrap();

    let mut foreign = notice(42, -100_777);
    foreign.source_channel_id = Some(CHANNEL_ID - 1);
    let handled = bridge.handle(&foreign, now).await.unwrap();

    assert!(!handled);
    assert_eq!(replies.reply_count(), 0);
    // The link is still there for the real forward.
    assert_eq!(pending.pending_count(), 1);
}

#[tokio::test]
async fn reply_failure_restores_the_link_for_a_later_forward() {
    let now = Utc::now();
    let pending = Arc::new(MemoryPendingStore::new(Duration::minutes(15)));
    let replies = Arc::new(RecordingReplies::new().failing());
    let bridge = ForwardBridge::new(pending.clone(), replies.clone(), CHANNEL_ID);

    let link = PendingLink {
        candidate: candidate("1"),
        discussion_chat_id: None,
    };
    pending.register(42, &link, now).await.unwrap();

    let failed = bridge.handle(&notice(42, -100_777), now).await.unwrap();
    assert!(!failed);
    assert_eq!(pending.pending_count(), 1);

    replies.heal();
    let retried = bridge
        .handle(&notice(42, -100_777), now + Duration::minutes(1))
        .await
        .unwrap();
    assert!(retried);
    assert_eq!(replies.reply_count(), 1);
}

#[tokio::test]
async fn explicit_discussion_id_overrides_forward_chat() {
    let now = Utc::now();
    let source = Arc::new(MockCandidateSource::new());
    let channel = Arc::new(RecordingChannel::new());
    let staging = Arc::new(MemoryStagingStore::new());
    let pending = Arc::new(MemoryPendingStore::new(Duration::minutes(15)));
    let explicit_chat = -100_321;
    let curator = Curator::new(
        source,
        channel.clone(),
        staging.clone(),
        pending.clone(),
        policy(),
        TickSettings {
            discussion_id: Some(explicit_chat),
            ..settings()
        },
    );
    let replies = Arc::new(RecordingReplies::new());
    let bridge = ForwardBridge::new(pending.clone(), replies.clone(), CHANNEL_ID);

    staging
        .stage(&candidate("1").with_engagement(&snapshot(70, 0, now)), now)
        .await
        .unwrap();
    curator.tick(now).await;
    let (_, message_id) = channel.published()[0];

    bridge
        .handle(&notice(message_id, -100_777), now + Duration::minutes(1))
        .await
        .unwrap();

    assert_eq!(replies.replies()[0].0.chat_id, explicit_chat);
}

#[tokio::test]
async fn linked_chat_hint_from_receipt_routes_the_reply() {
    let now = Utc::now();
    let linked_chat = -100_888;
    let source = Arc::new(MockCandidateSource::new());
    let channel = Arc::new(RecordingChannel::new().with_linked_chat(linked_chat));
    let staging = Arc::new(MemoryStagingStore::new());
    let pending = Arc::new(MemoryPendingStore::new(Duration::minutes(15)));
    let curator = Curator::new(
        source,
        channel.clone(),
        staging.clone(),
        pending.clone(),
        policy(),
        settings(),
    );
    let replies = Arc::new(RecordingReplies::new());
    let bridge = ForwardBridge::new(pending.clone(), replies.clone(), CHANNEL_ID);

    staging
        .stage(&candidate("1").with_engagement(&snapshot(70, 0, now)), now)
        .await
        .unwrap();
    curator.tick(now).await;
    let (_, message_id) = channel.published()[0];

    bridge
        .handle(&notice(message_id, -100_777), now + Duration::minutes(1))
        .await
        .unwrap();

    assert_eq!(replies.replies()[0].0.chat_id, linked_chat);
}
