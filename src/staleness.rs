use crate::models::Timestamp;

/// Session-level hint that the stored analysis no longer matches the inputs.
///
/// Not persisted: a fresh session starts clean, since no deletion history is kept.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StalenessTracker {
    stale: bool,
}

impl StalenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Only items the last analysis could have seen (created before it ran) invalidate it.
    pub fn on_item_removed(
        &mut self,
        item_timestamp: Timestamp,
        last_analysis_update: Option<Timestamp>,
    ) -> bool {
        if let Some(analyzed_at) = last_analysis_update {
            if item_timestamp < analyzed_at {
                self.stale = true;
            }
        }
        self.stale
    }

    pub fn on_analysis_completed(&mut self) {
        self.stale = false;
    }
}
