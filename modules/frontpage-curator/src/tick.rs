// One tick = one logical pass: pull fresh ids, ensure staging is populated,
// refresh engagement, then graduate anything that now meets policy.
//
// No error from a single candidate's processing may abort the rest of the
// tick, and the tick itself never raises past the scheduler boundary. The
// only early exit is the staged-set load: without it there is nothing sound
// to evaluate.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use frontpage_common::{PendingLink, StagedCandidate};

use crate::policy::{Decision, GraduationPolicy, PublishReason};
use crate::traits::{CandidateSource, ChannelPublisher, PendingLinkStore, StagingStore};

/// Tick-level knobs that are not graduation policy.
#[derive(Debug, Clone)]
pub struct TickSettings {
    /// How many ranked ids to pull per tick.
    pub candidate_limit: usize,
    /// Minimum time between metric refreshes for one staged record. Bounds
    /// upstream call volume independent of staged-set size.
    pub refresh_interval: Duration,
    /// Explicit discussion chat for follow-up replies; falls back to the
    /// destination hint the publisher returns.
    pub discussion_id: Option<i64>,
}

/// What one tick did. Field order mirrors the pass itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Ranked ids obtained from the source.
    pub discovered: usize,
    /// New candidates staged this tick.
    pub staged: usize,
    /// Staged records whose metrics were re-observed.
    pub refreshed: usize,
    /// Graduates released to the channel.
    pub published: usize,
    /// Age-graduates consumed without publishing.
    pub discarded: usize,
    /// Publish side effects that failed; those records stay staged.
    pub publish_failures: usize,
    /// Records evaluated and left staged.
    pub kept: usize,
}

pub struct Curator {
    source: Arc<dyn CandidateSource>,
    channel: Arc<dyn ChannelPublisher>,
    staging: Arc<dyn StagingStore>,
    pending: Arc<dyn PendingLinkStore>,
    policy: GraduationPolicy,
    settings: TickSettings,
}

impl Curator {
    pub fn new(
        source: Arc<dyn CandidateSource>,
        channel: Arc<dyn ChannelPublisher>,
        staging: Arc<dyn StagingStore>,
        pending: Arc<dyn PendingLinkStore>,
        policy: GraduationPolicy,
        settings: TickSettings,
    ) -> Self {
        Self {
            source,
            channel,
            staging,
            pending,
            policy,
            settings,
        }
    }

    /// Run one pass at `now`. Requires external mutual exclusion across
    /// ticks (see `store::lock::TickLock`): overlapping passes could each
    /// observe the same graduate and publish it twice.
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let tick_id = format!("tick-{}", Uuid::new_v4());
        let mut report = TickReport::default();

        // 1. Ranked candidate ids. A failed fetch degrades the tick to
        // refresh/graduate-only instead of aborting it.
        let ranked = match self.source.ranked_ids(self.settings.candidate_limit).await {
            Ok(ids) => ids,
            Err(err) => {
                warn!(tick_id, error = %err, "Failed to fetch ranked candidate ids");
                Vec::new()
            }
        };
        report.discovered = ranked.len();

        // 2. Full staged set. The map is this tick's working view; the
        // store remains the source of truth.
        let mut staged_map: BTreeMap<String, StagedCandidate> = match self.staging.list().await {
            Ok(records) => records
                .into_iter()
                .map(|record| (record.candidate.id.clone(), record))
                .collect(),
            Err(err) => {
                error!(tick_id, error = %err, "Failed to load staged set, ending tick");
                return report;
            }
        };

        // 3. Stage anything unseen.
        self.stage_new(&ranked, &mut staged_map, now, &tick_id, &mut report)
            .await;

        if staged_map.is_empty() {
            info!(tick_id, "No staged candidates to evaluate");
            return report;
        }

        // 4. Refresh metrics past the gate.
        self.refresh_metrics(&mut staged_map, now, &tick_id, &mut report)
            .await;

        // 5. Evaluate policy over every staged record.
        let mut graduates: Vec<(StagedCandidate, Decision)> = Vec::new();
        for record in staged_map.values() {
            match self.policy.decide(&record.candidate, now) {
                Decision::Keep => report.kept += 1,
                decision => graduates.push((record.clone(), decision)),
            }
        }

        if graduates.is_empty() {
            info!(tick_id, kept = report.kept, "No staged candidates met graduation criteria");
            return report;
        }

        // 6. Oldest staging first, so a slow accumulator is not starved by
        // a newer record that crossed a threshold faster in the same tick.
        graduates.sort_by_key(|(record, _)| record.staged_at);

        // 7. Commit graduates in order.
        for (record, decision) in graduates {
            match decision {
                Decision::Discard => {
                    let id = record.candidate.id.as_str();
                    match self.staging.mark_published(id).await {
                        Ok(()) => {
                            report.discarded += 1;
                            info!(
                                tick_id,
                                candidate_id = id,
                                score = record.candidate.score.unwrap_or(0),
                                comments = record.candidate.comment_count.unwrap_or(0),
                                "Aged candidate discarded for low engagement"
                            );
                        }
                        Err(err) => {
                            warn!(tick_id, candidate_id = id, error = %err, "Failed to discard aged candidate");
                        }
                    }
                }
                Decision::Publish(reason) => {
                    self.publish_graduate(&record, reason, now, &tick_id, &mut report)
                        .await;
                }
                Decision::Keep => unreachable!("keep outcomes are filtered above"),
            }
        }

        info!(
            tick_id,
            discovered = report.discovered,
            staged = report.staged,
            refreshed = report.refreshed,
            published = report.published,
            discarded = report.discarded,
            publish_failures = report.publish_failures,
            kept = report.kept,
            "Tick complete"
        );
        report
    }

    /// Enrich and stage ranked ids we have not seen before. Pre-checks both
    /// the in-memory staged view and the published set before spending
    /// network calls on enrichment.
    async fn stage_new(
        &self,
        ranked: &[String],
        staged_map: &mut BTreeMap<String, StagedCandidate>,
        now: DateTime<Utc>,
        tick_id: &str,
        report: &mut TickReport,
    ) {
        let mut unseen: Vec<String> = Vec::new();
        for id in ranked {
            if staged_map.contains_key(id) {
                continue;
            }
            match self.staging.is_published(id).await {
                Ok(true) => continue,
                Ok(false) => unseen.push(id.clone()),
                Err(err) => {
                    warn!(tick_id, candidate_id = %id, error = %err, "Published check failed, skipping id");
                }
            }
        }

        if unseen.is_empty() {
            return;
        }

        let candidates = match self.source.fetch_details(&unseen).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(tick_id, count = unseen.len(), error = %err, "Failed to enrich new candidates");
                return;
            }
        };

        for candidate in candidates {
            match self.staging.stage(&candidate, now).await {
                Ok(record) => {
                    staged_map.insert(record.candidate.id.clone(), record);
                    report.staged += 1;
                }
                Err(err) => {
                    warn!(tick_id, candidate_id = %candidate.id, error = %err, "Failed to stage candidate");
                }
            }
        }

        if report.staged > 0 {
            info!(tick_id, count = report.staged, "Candidates staged");
        }
    }

    /// Refresh engagement for staged records whose gate has elapsed. Records
    /// the source returned nothing for still get their `last_checked` bumped
    /// so they re-enter the queue a full interval later.
    async fn refresh_metrics(
        &self,
        staged_map: &mut BTreeMap<String, StagedCandidate>,
        now: DateTime<Utc>,
        tick_id: &str,
        report: &mut TickReport,
    ) {
        let due: Vec<String> = staged_map
            .values()
            .filter(|record| now.signed_duration_since(record.last_checked) >= self.settings.refresh_interval)
            .map(|record| record.candidate.id.clone())
            .collect();

        if due.is_empty() {
            return;
        }

        let metrics = match self.source.fetch_metrics(&due).await {
            Ok(metrics) => metrics,
            Err(err) => {
                warn!(tick_id, count = due.len(), error = %err, "Failed to refresh staged metrics");
                return;
            }
        };

        for id in &due {
            let snapshot = metrics.get(id).copied().unwrap_or_default();
            match self.staging.refresh(id, &snapshot, now).await {
                Ok(updated) => {
                    staged_map.insert(id.clone(), updated);
                    report.refreshed += 1;
                }
                Err(err) => {
                    warn!(tick_id, candidate_id = %id, error = %err, "Failed to persist refreshed metrics");
                }
            }
        }
    }

    /// The publish side effect plus its two commits. Publish success alone
    /// consumes the candidate: a lost pending link only degrades the
    /// follow-up reply, it must never cause a duplicate headline post.
    async fn publish_graduate(
        &self,
        record: &StagedCandidate,
        reason: PublishReason,
        now: DateTime<Utc>,
        tick_id: &str,
        report: &mut TickReport,
    ) {
        let candidate = &record.candidate;

        let receipt = match self.channel.publish(candidate).await {
            Ok(receipt) => receipt,
            Err(err) => {
                // Left staged; a later tick retries.
                report.publish_failures += 1;
                error!(
                    tick_id,
                    candidate_id = %candidate.id,
                    reason = %reason,
                    error = %err,
                    "Failed to publish graduated candidate"
                );
                return;
            }
        };

        let discussion_chat_id = self.settings.discussion_id.or(receipt.linked_chat_id);
        let link = PendingLink {
            candidate: candidate.clone(),
            discussion_chat_id,
        };
        let link_stored = match self.pending.register(receipt.message_id, &link, now).await {
            Ok(()) => true,
            Err(err) => {
                error!(
                    tick_id,
                    candidate_id = %candidate.id,
                    message_id = receipt.message_id,
                    error = %err,
                    "Failed to persist pending link for graduated candidate"
                );
                false
            }
        };

        match self.staging.mark_published(&candidate.id).await {
            Ok(()) => {
                report.published += 1;
                info!(
                    tick_id,
                    candidate_id = %candidate.id,
                    reason = %reason,
                    message_id = receipt.message_id,
                    link_stored,
                    score = candidate.score.unwrap_or(0),
                    comments = candidate.comment_count.unwrap_or(0),
                    "Graduated candidate published"
                );
            }
            Err(err) => {
                // The post exists but the candidate is still staged — the
                // known crash window, now visible in logs.
                error!(
                    tick_id,
                    candidate_id = %candidate.id,
                    error = %err,
                    "Failed to mark candidate as published"
                );
            }
        }
    }
}
