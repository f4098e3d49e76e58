use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Epoch milliseconds, matching the persisted blob layout.
pub type Timestamp = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Note,
    Concern,
    Evidence,
    Assumption,
    Question,
    Link,
}

impl InputType {
    pub const ALL: [InputType; 6] = [
        InputType::Note,
        InputType::Concern,
        InputType::Evidence,
        InputType::Assumption,
        InputType::Question,
        InputType::Link,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Note => "note",
            InputType::Concern => "concern",
            InputType::Evidence => "evidence",
            InputType::Assumption => "assumption",
            InputType::Question => "question",
            InputType::Link => "link",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        InputType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == normalized)
            .ok_or_else(|| format!("unknown input type: {value}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Confidence::High),
            "medium" => Ok(Confidence::Medium),
            "low" => Ok(Confidence::Low),
            _ => Err(format!("unknown confidence: {value}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputItem {
    pub id: String,
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub content: String,
    pub author: String,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileItem {
    pub id: String,
    pub file_name: String,
    pub file_type: String,
    /// Full extracted text, kept for traceability.
    pub file_text: String,
    pub timestamp: Timestamp,
}

/// Lowercased extension of `file_name`, or `"unknown"` when there is none.
pub fn file_type_for(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => "unknown".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tension {
    #[serde(default)]
    pub name_x: String,
    #[serde(default)]
    pub name_y: String,
    #[serde(default)]
    pub reason_x: String,
    #[serde(default)]
    pub reason_y: String,
    #[serde(default)]
    pub gain_if_x: String,
    #[serde(default)]
    pub gain_if_y: String,
    #[serde(default)]
    pub loss_if_x: String,
    #[serde(default)]
    pub loss_if_y: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicOption {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tradeoffs: String,
    #[serde(default)]
    pub commitment_do: Vec<String>,
    #[serde(default)]
    pub commitment_dont: Vec<String>,
    #[serde(default)]
    pub future_impact: String,
}

/// Kind of a statement the analysis pulled out of an attached file.
///
/// Parsed case-insensitively; anything unrecognized reads as `Note`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum ExtractedKind {
    Evidence,
    Assumption,
    Concern,
    #[default]
    Note,
    Question,
}

impl From<String> for ExtractedKind {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "evidence" => ExtractedKind::Evidence,
            "assumption" => ExtractedKind::Assumption,
            "concern" => ExtractedKind::Concern,
            "question" => ExtractedKind::Question,
            _ => ExtractedKind::Note,
        }
    }
}

/// Parsed case-insensitively; anything unrecognized reads as `Medium`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum ExtractedConfidence {
    High,
    #[default]
    Medium,
    Low,
}

impl From<String> for ExtractedConfidence {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => ExtractedConfidence::High,
            "low" => ExtractedConfidence::Low,
            _ => ExtractedConfidence::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedItem {
    #[serde(rename = "type", default)]
    pub kind: ExtractedKind,
    #[serde(default)]
    pub statement: String,
    #[serde(default)]
    pub source_citation: String,
    #[serde(default)]
    pub confidence: ExtractedConfidence,
}

/// Synthesis returned by the model for one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    pub situation_summary: String,
    pub why_hard: String,
    #[serde(default)]
    pub forces: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub hidden_assumptions: Vec<String>,
    #[serde(default)]
    pub unknowns: Vec<String>,
    #[serde(default)]
    pub tensions: Vec<Tension>,
    #[serde(default)]
    pub options: Vec<StrategicOption>,
    #[serde(default)]
    pub file_extractions: Vec<ExtractedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub id: String,
    pub title: String,
    pub context: String,
    pub owner: String,
    pub deadline: NaiveDate,
    pub status: DecisionStatus,
    pub created_at: Timestamp,
    #[serde(default)]
    pub inputs: Vec<InputItem>,
    #[serde(default)]
    pub files: Vec<FileItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<AiAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_analysis_update: Option<Timestamp>,
}

/// One row of the merged input/file timeline.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionEntry {
    Input(InputItem),
    File(FileItem),
}

impl DecisionEntry {
    pub fn id(&self) -> &str {
        match self {
            DecisionEntry::Input(item) => &item.id,
            DecisionEntry::File(file) => &file.id,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            DecisionEntry::Input(item) => item.timestamp,
            DecisionEntry::File(file) => file.timestamp,
        }
    }
}

/// Which collection an item id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Input,
    File,
}

impl Decision {
    pub fn find_input(&self, id: &str) -> Option<&InputItem> {
        self.inputs.iter().find(|item| item.id == id)
    }

    pub fn find_file(&self, id: &str) -> Option<&FileItem> {
        self.files.iter().find(|file| file.id == id)
    }

    pub fn kind_of(&self, id: &str) -> Option<ItemKind> {
        if self.find_input(id).is_some() {
            Some(ItemKind::Input)
        } else if self.find_file(id).is_some() {
            Some(ItemKind::File)
        } else {
            None
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DecisionStatus::Active
    }

    /// Inputs and files merged newest first. The owned sequences are left untouched.
    pub fn entries(&self) -> Vec<DecisionEntry> {
        let mut entries: Vec<DecisionEntry> = self
            .inputs
            .iter()
            .cloned()
            .map(DecisionEntry::Input)
            .chain(self.files.iter().cloned().map(DecisionEntry::File))
            .collect();
        entries.sort_by_key(|entry| Reverse(entry.timestamp()));
        entries
    }

    pub fn with_inputs(&self, items: impl IntoIterator<Item = InputItem>) -> Decision {
        let mut next = self.clone();
        next.inputs.extend(items);
        next
    }

    pub fn with_file(&self, file: FileItem) -> Decision {
        let mut next = self.clone();
        next.files.push(file);
        next
    }

    /// Returns the updated decision and the removed item's timestamp, if it existed.
    pub fn without_item(&self, id: &str, kind: ItemKind) -> (Decision, Option<Timestamp>) {
        let mut next = self.clone();
        let removed = match kind {
            ItemKind::Input => {
                let position = next.inputs.iter().position(|item| item.id == id);
                position.map(|index| next.inputs.remove(index).timestamp)
            }
            ItemKind::File => {
                let position = next.files.iter().position(|file| file.id == id);
                position.map(|index| next.files.remove(index).timestamp)
            }
        };
        (next, removed)
    }

    pub fn with_status(&self, status: DecisionStatus) -> Decision {
        let mut next = self.clone();
        next.status = status;
        next
    }

    /// `ai_analysis` and `last_analysis_update` only ever change together.
    pub fn with_analysis(&self, analysis: AiAnalysis, at: Timestamp) -> Decision {
        let mut next = self.clone();
        next.ai_analysis = Some(analysis);
        next.last_analysis_update = Some(at);
        next
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDecision {
    pub title: String,
    #[serde(default)]
    pub context: String,
    pub owner: String,
    pub deadline: String,
}

/// A hand-typed input before it is stamped with an id and timestamp.
#[derive(Debug, Clone)]
pub struct InputDraft {
    pub input_type: InputType,
    pub content: String,
    pub author: String,
}

impl InputDraft {
    pub fn new(input_type: InputType, content: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            input_type,
            content: content.into(),
            author: author.into(),
        }
    }
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
