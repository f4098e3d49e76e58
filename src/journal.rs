//! Root aggregate over every decision the user keeps.
//!
//! The whole list is serialized as one JSON blob under a fixed key and
//! rewritten on every mutation. Decisions are held behind `Arc` and replaced
//! wholesale, so a snapshot handed out earlier never changes underneath its
//! reader.

use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use tracing::info;

use crate::{
    error::{SignalError, SignalResult},
    models::{new_id, Decision, DecisionStatus, NewDecision, Timestamp},
    storage::BlobStore,
};

pub struct Journal {
    decisions: Vec<Arc<Decision>>,
    store: Arc<dyn BlobStore>,
    key: String,
}

impl Journal {
    pub async fn open(store: Arc<dyn BlobStore>, key: impl Into<String>) -> SignalResult<Self> {
        let key = key.into();
        let decisions = match store.get_blob(&key).await? {
            Some(bytes) => {
                let parsed: Vec<Decision> = serde_json::from_slice(&bytes)
                    .with_context(|| format!("stored blob {key} is not a decision list"))?;
                parsed.into_iter().map(Arc::new).collect()
            }
            None => Vec::new(),
        };
        info!(storage_key = %key, decisions = decisions.len(), "opened decision journal");
        Ok(Self {
            decisions,
            store,
            key,
        })
    }

    pub fn decisions(&self) -> &[Arc<Decision>] {
        &self.decisions
    }

    pub fn active(&self) -> impl Iterator<Item = &Arc<Decision>> {
        self.decisions.iter().filter(|d| d.status == DecisionStatus::Active)
    }

    pub fn completed(&self) -> impl Iterator<Item = &Arc<Decision>> {
        self.decisions
            .iter()
            .filter(|d| d.status == DecisionStatus::Completed)
    }

    pub fn get(&self, id: &str) -> SignalResult<Arc<Decision>> {
        self.decisions
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| SignalError::not_found(format!("decision {id}")))
    }

    pub async fn create(&mut self, draft: NewDecision, now: Timestamp) -> SignalResult<Arc<Decision>> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(SignalError::validation("title is required"));
        }
        let owner = draft.owner.trim();
        if owner.is_empty() {
            return Err(SignalError::validation("owner is required"));
        }
        let deadline = draft.deadline.trim();
        if deadline.is_empty() {
            return Err(SignalError::validation("deadline is required"));
        }
        let deadline = NaiveDate::parse_from_str(deadline, "%Y-%m-%d")
            .map_err(|_| SignalError::validation("deadline must be a date (YYYY-MM-DD)"))?;

        let decision = Arc::new(Decision {
            id: new_id(),
            title: title.to_string(),
            context: draft.context.trim().to_string(),
            owner: owner.to_string(),
            deadline,
            status: DecisionStatus::Active,
            created_at: now,
            inputs: Vec::new(),
            files: Vec::new(),
            ai_analysis: None,
            last_analysis_update: None,
        });

        let mut next = Vec::with_capacity(self.decisions.len() + 1);
        next.push(decision.clone());
        next.extend(self.decisions.iter().cloned());
        self.commit(next).await?;

        info!(decision_id = %decision.id, "created decision");
        Ok(decision)
    }

    /// Replaces a decision with the value produced by `change`.
    ///
    /// The new list is persisted before it becomes visible; a failed write
    /// leaves the journal as it was.
    pub async fn update<F>(&mut self, id: &str, change: F) -> SignalResult<Arc<Decision>>
    where
        F: FnOnce(&Decision) -> SignalResult<Decision>,
    {
        let index = self
            .decisions
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| SignalError::not_found(format!("decision {id}")))?;

        let updated = change(self.decisions[index].as_ref())?;
        if updated.id != id {
            return Err(SignalError::state("decision id cannot change"));
        }
        let updated = Arc::new(updated);

        let mut next = self.decisions.clone();
        next[index] = updated.clone();
        self.commit(next).await?;
        Ok(updated)
    }

    async fn commit(&mut self, next: Vec<Arc<Decision>>) -> SignalResult<()> {
        let snapshot: Vec<&Decision> = next.iter().map(|d| d.as_ref()).collect();
        let bytes = serde_json::to_vec(&snapshot).context("failed to serialize decisions")?;
        self.store.put_blob(&self.key, bytes).await?;
        self.decisions = next;
        Ok(())
    }
}
