use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::SignalResult,
    models::{AiAnalysis, Decision},
};

pub mod openai;
pub mod prompts;
pub mod proxy;

pub use openai::OpenAiClient;
pub use proxy::ProxyClient;

/// Suggestions returned by the extraction prompt, before coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub document_summary: String,
    #[serde(default)]
    pub inputs: Vec<SuggestedInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedInput {
    #[serde(rename = "type", default)]
    pub input_type: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub source_ref: Option<String>,
    #[serde(default)]
    pub confidence: Option<String>,
}

/// The two remote operations the decision core depends on.
///
/// Each call has a single outcome: no streaming, no retry.
#[async_trait]
pub trait ModelClient: Send + Sync + 'static {
    async fn extract(&self, file_name: &str, raw_text: &str) -> SignalResult<ExtractionResult>;

    async fn analyze(&self, decision: &Decision) -> SignalResult<AiAnalysis>;
}

/// Parses a JSON reply, tolerating a surrounding markdown code fence.
pub(crate) fn parse_reply<T: DeserializeOwned>(operation: &str, raw: &str) -> Result<T, String> {
    let trimmed = strip_code_fence(raw.trim());
    serde_json::from_str(trimmed).map_err(|err| {
        warn!(operation, error = %err, reply_len = raw.len(), "model reply was not valid JSON");
        format!("model returned unparseable output: {err}")
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
