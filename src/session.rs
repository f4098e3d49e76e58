//! Mutation surface for one open decision.
//!
//! A session owns the undo timers, the staleness hint and the review batch
//! of the decision it was opened for. Every change is written through the
//! [`Journal`], which swaps in a whole new decision value.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::{
    clock::Clock,
    error::{SignalError, SignalResult},
    journal::Journal,
    llm::ModelClient,
    models::{
        new_id, AiAnalysis, Decision, DecisionEntry, DecisionStatus, FileItem, InputDraft,
        InputItem, ItemKind, Timestamp,
    },
    review::{candidates_from, ReviewBatch, ReviewEngine},
    soft_delete::{Expired, ItemPhase, PendingDeletion, SoftDeleteManager},
    staleness::StalenessTracker,
};

/// An item whose undo window ran out and which is now gone from the decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedItem {
    pub item_id: String,
    pub kind: ItemKind,
    pub timestamp: Timestamp,
    pub marked_stale: bool,
}

/// Result of confirming a review: the batch is committed even when the
/// follow-up analysis fails.
#[derive(Debug)]
pub struct ReviewOutcome {
    pub decision: Arc<Decision>,
    pub file_id: String,
    pub input_ids: Vec<String>,
    pub analysis_error: Option<SignalError>,
}

pub struct DecisionSession {
    decision_id: String,
    deletions: SoftDeleteManager,
    staleness: StalenessTracker,
    review: ReviewEngine,
    model: Arc<dyn ModelClient>,
    clock: Arc<dyn Clock>,
}

impl DecisionSession {
    pub fn open(
        journal: &Journal,
        decision_id: &str,
        model: Arc<dyn ModelClient>,
        clock: Arc<dyn Clock>,
        undo_window: Duration,
    ) -> SignalResult<Self> {
        let decision = journal.get(decision_id)?;
        info!(decision_id = %decision.id, "opened decision session");
        Ok(Self {
            decision_id: decision.id.clone(),
            deletions: SoftDeleteManager::new(undo_window),
            staleness: StalenessTracker::new(),
            review: ReviewEngine::new(),
            model,
            clock,
        })
    }

    pub fn decision_id(&self) -> &str {
        &self.decision_id
    }

    pub fn decision(&self, journal: &Journal) -> SignalResult<Arc<Decision>> {
        journal.get(&self.decision_id)
    }

    /// Inputs and files merged newest first.
    pub fn entries(&self, journal: &Journal) -> SignalResult<Vec<DecisionEntry>> {
        Ok(self.decision(journal)?.entries())
    }

    pub fn is_stale(&self) -> bool {
        self.staleness.is_stale()
    }

    pub async fn add_input(
        &mut self,
        journal: &mut Journal,
        draft: InputDraft,
    ) -> SignalResult<InputItem> {
        let content = draft.content.trim();
        if content.is_empty() {
            return Err(SignalError::validation("input content must not be empty"));
        }
        let item = InputItem {
            id: new_id(),
            input_type: draft.input_type,
            content: content.to_string(),
            author: draft.author,
            timestamp: self.clock.now_millis(),
            source_reference: None,
            confidence: None,
        };
        journal
            .update(&self.decision_id, |d| Ok(d.with_inputs([item.clone()])))
            .await?;
        info!(decision_id = %self.decision_id, item_id = %item.id, "input added");
        Ok(item)
    }

    pub async fn add_file(&mut self, journal: &mut Journal, file: FileItem) -> SignalResult<()> {
        let file_id = file.id.clone();
        journal
            .update(&self.decision_id, move |d| Ok(d.with_file(file)))
            .await?;
        info!(decision_id = %self.decision_id, item_id = %file_id, "file added");
        Ok(())
    }

    pub async fn set_status(
        &mut self,
        journal: &mut Journal,
        status: DecisionStatus,
    ) -> SignalResult<Arc<Decision>> {
        let updated = journal
            .update(&self.decision_id, |d| Ok(d.with_status(status)))
            .await?;
        info!(decision_id = %self.decision_id, ?status, "status changed");
        Ok(updated)
    }

    /// Stores `analysis` stamped with the current time and clears the stale hint.
    pub async fn record_analysis(
        &mut self,
        journal: &mut Journal,
        analysis: AiAnalysis,
    ) -> SignalResult<Arc<Decision>> {
        let at = self.clock.now_millis();
        let updated = journal
            .update(&self.decision_id, move |d| Ok(d.with_analysis(analysis, at)))
            .await?;
        self.staleness.on_analysis_completed();
        Ok(updated)
    }

    /// Runs a fresh synthesis. On failure the stored analysis is left as it was.
    pub async fn analyze(&mut self, journal: &mut Journal) -> SignalResult<Arc<Decision>> {
        let snapshot = self.decision(journal)?;
        let analysis = match self.model.analyze(&snapshot).await {
            Ok(analysis) => analysis,
            Err(err) => {
                warn!(decision_id = %self.decision_id, error = %err, "analysis failed");
                return Err(err);
            }
        };
        self.record_analysis(journal, analysis).await
    }

    pub fn begin_delete(&mut self, journal: &Journal, item_id: &str) -> SignalResult<bool> {
        self.require_item(journal, item_id)?;
        Ok(self.deletions.begin_confirm(item_id))
    }

    pub fn abort_delete(&mut self) -> Option<String> {
        self.deletions.abort_confirm()
    }

    /// Starts the undo window for an input or file. Returns `false` when the
    /// item was already pending.
    pub fn request_delete(&mut self, journal: &Journal, item_id: &str) -> SignalResult<bool> {
        let kind = self.require_item(journal, item_id)?;
        Ok(self.deletions.request_delete(item_id, kind))
    }

    pub fn undo_delete(&mut self, item_id: &str) -> bool {
        self.deletions.cancel(item_id)
    }

    pub fn phase(&self, item_id: &str) -> ItemPhase {
        self.deletions.phase(item_id)
    }

    pub fn pending_deletions(&self) -> Vec<PendingDeletion> {
        self.deletions.pending()
    }

    /// Waits for the next undo window to run out and removes that item.
    /// Returns `Ok(None)` when no deletion is pending.
    pub async fn settle_next(&mut self, journal: &mut Journal) -> SignalResult<Option<RemovedItem>> {
        loop {
            let Some(expired) = self.deletions.next_expired().await else {
                return Ok(None);
            };
            if let Some(removed) = self.apply_expired(journal, expired).await? {
                return Ok(Some(removed));
            }
        }
    }

    /// Removes every item whose window has already run out, without waiting.
    pub async fn settle_ready(&mut self, journal: &mut Journal) -> SignalResult<Vec<RemovedItem>> {
        let mut removed = Vec::new();
        while let Some(expired) = self.deletions.try_next_expired() {
            if let Some(item) = self.apply_expired(journal, expired).await? {
                removed.push(item);
            }
        }
        Ok(removed)
    }

    async fn apply_expired(
        &mut self,
        journal: &mut Journal,
        expired: Expired,
    ) -> SignalResult<Option<RemovedItem>> {
        let before = self.decision(journal)?;
        let (next, removed_at) = before.without_item(&expired.item_id, expired.kind);
        let Some(timestamp) = removed_at else {
            warn!(item_id = %expired.item_id, "expired item no longer present");
            return Ok(None);
        };

        if let Err(err) = journal.update(&self.decision_id, move |_| Ok(next)).await {
            warn!(
                decision_id = %self.decision_id,
                item_id = %expired.item_id,
                error = %err,
                "removal not saved; deletion re-armed"
            );
            self.deletions.rearm(expired);
            return Err(err);
        }
        let marked_stale = self
            .staleness
            .on_item_removed(timestamp, before.last_analysis_update);
        info!(
            decision_id = %self.decision_id,
            item_id = %expired.item_id,
            kind = ?expired.kind,
            stale = marked_stale,
            "item removed"
        );

        Ok(Some(RemovedItem {
            item_id: expired.item_id,
            kind: expired.kind,
            timestamp,
            marked_stale,
        }))
    }

    /// Extracts suggestions from `raw_text` and stages them for review.
    pub async fn upload(&mut self, file_name: &str, raw_text: &str) -> SignalResult<&ReviewBatch> {
        if self.review.is_open() {
            return Err(SignalError::state("review already in progress"));
        }
        if raw_text.trim().is_empty() {
            return Err(SignalError::Extraction("empty document".to_string()));
        }

        let result = match self.model.extract(file_name, raw_text).await {
            Ok(result) => result,
            Err(err) => {
                warn!(decision_id = %self.decision_id, file_name, error = %err, "extraction failed");
                return Err(err);
            }
        };
        let candidates = candidates_from(&result);
        self.review
            .stage(file_name, raw_text, result.document_summary, candidates)
    }

    pub fn review(&self) -> Option<&ReviewBatch> {
        self.review.batch()
    }

    /// Edit access to the staged batch.
    pub fn review_mut(&mut self) -> &mut ReviewEngine {
        &mut self.review
    }

    pub fn cancel_review(&mut self) -> bool {
        self.review.cancel()
    }

    /// Commits the staged batch in one update, then re-runs the analysis.
    pub async fn confirm_review(&mut self, journal: &mut Journal) -> SignalResult<ReviewOutcome> {
        // The batch stays staged until the write lands, so a failed write can be retried.
        let committed = self.review.prepare(self.clock.now_millis())?;
        let file_id = committed.file.id.clone();
        let input_ids: Vec<String> = committed.inputs.iter().map(|i| i.id.clone()).collect();

        let decision = journal
            .update(&self.decision_id, move |d| {
                Ok(d.with_file(committed.file).with_inputs(committed.inputs))
            })
            .await?;
        self.review.cancel();
        info!(
            decision_id = %self.decision_id,
            file_id = %file_id,
            inputs = input_ids.len(),
            "review committed"
        );

        let (decision, analysis_error) = match self.analyze(journal).await {
            Ok(analyzed) => (analyzed, None),
            Err(err) => (decision, Some(err)),
        };

        Ok(ReviewOutcome {
            decision,
            file_id,
            input_ids,
            analysis_error,
        })
    }

    /// Cancels every outstanding undo timer. Dropping the session does the same.
    pub fn close(&mut self) -> usize {
        self.deletions.cancel_all()
    }

    fn require_item(&self, journal: &Journal, item_id: &str) -> SignalResult<ItemKind> {
        self.decision(journal)?
            .kind_of(item_id)
            .ok_or_else(|| SignalError::not_found(format!("item {item_id}")))
    }
}
