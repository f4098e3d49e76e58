use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{parse_reply, prompts, ExtractionResult, ModelClient};
use crate::{
    config::AppConfig,
    error::{SignalError, SignalResult},
    models::{AiAnalysis, Decision},
};

/// Talks to an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    api_key: String,
    extract_model: String,
    analyze_model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.model_timeout)
            .build()
            .context("failed to build model HTTP client")?;
        Ok(Self {
            http,
            endpoint: format!(
                "{}/chat/completions",
                config.openai_base_url.trim_end_matches('/')
            ),
            api_key: config.openai_api_key.clone(),
            extract_model: config.extract_model.clone(),
            analyze_model: config.analyze_model.clone(),
            temperature: config.model_temperature,
        })
    }

    async fn complete_json(&self, model: &str, prompt: &str) -> Result<String, String> {
        let request = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| format!("model request failed: {err}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, model, "model request rejected");
            return Err(format!("model request failed with status {status}"));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|err| format!("malformed model response: {err}"))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| "no response from model".to_string())
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn extract(&self, file_name: &str, raw_text: &str) -> SignalResult<ExtractionResult> {
        let prompt = prompts::extraction_prompt(file_name, raw_text);
        let content = self
            .complete_json(&self.extract_model, &prompt)
            .await
            .map_err(SignalError::Extraction)?;
        let result: ExtractionResult =
            parse_reply("extract", &content).map_err(SignalError::Extraction)?;
        info!(file_name, suggestions = result.inputs.len(), "extraction completed");
        Ok(result)
    }

    async fn analyze(&self, decision: &Decision) -> SignalResult<AiAnalysis> {
        let prompt = prompts::analysis_prompt(decision);
        let content = self
            .complete_json(&self.analyze_model, &prompt)
            .await
            .map_err(SignalError::Analysis)?;
        let analysis: AiAnalysis =
            parse_reply("analyze", &content).map_err(SignalError::Analysis)?;
        info!(decision_id = %decision.id, tensions = analysis.tensions.len(), "analysis completed");
        Ok(analysis)
    }
}
