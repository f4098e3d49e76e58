use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ExtractionResult, ModelClient};
use crate::{
    config::ClientConfig,
    error::{SignalError, SignalResult},
    models::{AiAnalysis, Decision},
};

/// Reaches the model through the Signal proxy's `/api/extract` and `/api/analyze`.
pub struct ProxyClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractRequest<'a> {
    file_name: &'a str,
    raw_text: &'a str,
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    decision: &'a Decision,
}

#[derive(Deserialize)]
struct ProxyFailure {
    error: String,
    #[serde(default)]
    message: Option<String>,
}

impl ProxyClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>, http: Client) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.model_timeout)
            .build()
            .context("failed to build proxy HTTP client")?;
        Ok(Self::new(
            config.proxy_url.clone(),
            config.proxy_token.clone(),
            http,
        ))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let builder = self.http.post(format!("{}{path}", self.base_url));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

async fn read_success<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, String> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|err| format!("malformed proxy response: {err}"));
    }

    let body = response.text().await.unwrap_or_default();
    let reason = match serde_json::from_str::<ProxyFailure>(&body) {
        Ok(failure) => match failure.message {
            Some(message) => format!("{}: {message}", failure.error),
            None => failure.error,
        },
        Err(_) => format!("proxy responded with status {status}"),
    };
    warn!(%status, %reason, "proxy request failed");
    Err(reason)
}

#[async_trait]
impl ModelClient for ProxyClient {
    async fn extract(&self, file_name: &str, raw_text: &str) -> SignalResult<ExtractionResult> {
        let response = self
            .post("/api/extract")
            .json(&ExtractRequest {
                file_name,
                raw_text,
            })
            .send()
            .await
            .map_err(|err| SignalError::Extraction(format!("proxy request failed: {err}")))?;
        read_success(response).await.map_err(SignalError::Extraction)
    }

    async fn analyze(&self, decision: &Decision) -> SignalResult<AiAnalysis> {
        let response = self
            .post("/api/analyze")
            .json(&AnalyzeRequest { decision })
            .send()
            .await
            .map_err(|err| SignalError::Analysis(format!("proxy request failed: {err}")))?;
        read_success(response).await.map_err(SignalError::Analysis)
    }
}
