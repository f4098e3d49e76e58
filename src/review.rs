//! Staging area for inputs suggested from one uploaded document.
//!
//! A batch lives from the end of extraction until the user confirms or
//! cancels it. Confirming produces a [`CommittedBatch`] that the session
//! writes into the decision in a single update.

use tracing::info;

use crate::{
    error::{SignalError, SignalResult},
    llm::ExtractionResult,
    models::{
        file_type_for, new_id, Confidence, FileItem, InputItem, InputType, Timestamp,
    },
};

/// Hard cap on the length of a machine-suggested input, in characters.
pub const MAX_SUGGESTED_CHARS: usize = 240;

pub const SUMMARY_PREFIX: &str = "[Summary] ";
pub const SUMMARY_SOURCE: &str = "Document Summary";

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub input_type: InputType,
    pub content: String,
    pub source_reference: Option<String>,
    pub confidence: Option<Confidence>,
}

impl Candidate {
    pub fn new(input_type: InputType, content: impl Into<String>) -> Self {
        Self {
            input_type,
            content: clip_chars(content.into().trim(), MAX_SUGGESTED_CHARS),
            source_reference: None,
            confidence: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewBatch {
    pub file_name: String,
    pub raw_text: String,
    pub document_summary: String,
    pub candidates: Vec<Candidate>,
}

/// Everything one confirmed review adds to a decision.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedBatch {
    pub file: FileItem,
    /// The summary note first, then one input per accepted candidate.
    pub inputs: Vec<InputItem>,
}

#[derive(Debug, Default)]
pub struct ReviewEngine {
    batch: Option<ReviewBatch>,
}

impl ReviewEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.batch.is_some()
    }

    pub fn batch(&self) -> Option<&ReviewBatch> {
        self.batch.as_ref()
    }

    pub fn stage(
        &mut self,
        file_name: impl Into<String>,
        raw_text: impl Into<String>,
        document_summary: impl Into<String>,
        candidates: Vec<Candidate>,
    ) -> SignalResult<&ReviewBatch> {
        if self.batch.is_some() {
            return Err(SignalError::state("review already in progress"));
        }
        let candidates = candidates
            .into_iter()
            .map(|mut candidate| {
                candidate.content = clip_chars(&candidate.content, MAX_SUGGESTED_CHARS);
                candidate
            })
            .collect();
        let batch = self.batch.insert(ReviewBatch {
            file_name: file_name.into(),
            raw_text: raw_text.into(),
            document_summary: document_summary.into(),
            candidates,
        });
        info!(
            file_name = %batch.file_name,
            candidates = batch.candidates.len(),
            "staged extraction review"
        );
        Ok(batch)
    }

    pub fn update_content(&mut self, index: usize, text: impl Into<String>) -> SignalResult<()> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(SignalError::validation("suggested input must not be empty"));
        }
        let length = text.chars().count();
        if length > MAX_SUGGESTED_CHARS {
            return Err(SignalError::validation(format!(
                "suggested input is {length} characters, limit is {MAX_SUGGESTED_CHARS}"
            )));
        }
        self.candidate_mut(index)?.content = text;
        Ok(())
    }

    pub fn update_type(&mut self, index: usize, input_type: InputType) -> SignalResult<()> {
        self.candidate_mut(index)?.input_type = input_type;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> SignalResult<Candidate> {
        let batch = self.open_batch_mut()?;
        if index >= batch.candidates.len() {
            return Err(out_of_range(index, batch.candidates.len()));
        }
        Ok(batch.candidates.remove(index))
    }

    /// Builds the items a confirm would append, leaving the batch staged.
    pub fn prepare(&self, now: Timestamp) -> SignalResult<CommittedBatch> {
        let batch = self
            .batch
            .as_ref()
            .ok_or_else(|| SignalError::state("no review in progress"))?;

        let author = format!("File: {}", batch.file_name);
        let file = FileItem {
            id: new_id(),
            file_name: batch.file_name.clone(),
            file_type: file_type_for(&batch.file_name),
            file_text: batch.raw_text.clone(),
            timestamp: now,
        };

        let summary = InputItem {
            id: new_id(),
            input_type: InputType::Note,
            content: format!("{SUMMARY_PREFIX}{}", batch.document_summary),
            author: author.clone(),
            timestamp: now,
            source_reference: Some(SUMMARY_SOURCE.to_string()),
            confidence: None,
        };

        let inputs = std::iter::once(summary)
            .chain(batch.candidates.iter().map(|candidate| InputItem {
                id: new_id(),
                input_type: candidate.input_type,
                content: candidate.content.clone(),
                author: author.clone(),
                timestamp: now,
                source_reference: candidate.source_reference.clone(),
                confidence: candidate.confidence,
            }))
            .collect();

        Ok(CommittedBatch { file, inputs })
    }

    /// Closes the review and builds the items to append. Fails if no review is open.
    pub fn confirm(&mut self, now: Timestamp) -> SignalResult<CommittedBatch> {
        let committed = self.prepare(now)?;
        self.batch = None;
        Ok(committed)
    }

    /// Discards the open review. Returns `false` when there was none.
    pub fn cancel(&mut self) -> bool {
        self.batch.take().is_some()
    }

    fn open_batch_mut(&mut self) -> SignalResult<&mut ReviewBatch> {
        self.batch
            .as_mut()
            .ok_or_else(|| SignalError::state("no review in progress"))
    }

    fn candidate_mut(&mut self, index: usize) -> SignalResult<&mut Candidate> {
        let batch = self.open_batch_mut()?;
        let len = batch.candidates.len();
        batch
            .candidates
            .get_mut(index)
            .ok_or_else(|| out_of_range(index, len))
    }
}

/// Coerces raw model suggestions into review candidates.
pub fn candidates_from(result: &ExtractionResult) -> Vec<Candidate> {
    result
        .inputs
        .iter()
        .filter(|suggested| !suggested.text.trim().is_empty())
        .map(|suggested| Candidate {
            input_type: suggested.input_type.parse().unwrap_or(InputType::Note),
            content: clip_chars(suggested.text.trim(), MAX_SUGGESTED_CHARS),
            source_reference: suggested
                .source_ref
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            confidence: suggested
                .confidence
                .as_deref()
                .and_then(|value| value.parse().ok()),
        })
        .collect()
}

fn out_of_range(index: usize, len: usize) -> SignalError {
    SignalError::validation(format!("candidate {index} out of range ({len} staged)"))
}

fn clip_chars(value: &str, limit: usize) -> String {
    match value.char_indices().nth(limit) {
        Some((byte_index, _)) => value[..byte_index].to_string(),
        None => value.to_string(),
    }
}
