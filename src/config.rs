use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

pub const DEFAULT_STORAGE_KEY: &str = "signal_decisions";
pub const DEFAULT_UNDO_WINDOW_MS: u64 = 10_000;
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Settings for the model proxy server.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub extract_model: String,
    pub analyze_model: String,
    pub model_temperature: f32,
    pub model_timeout: Duration,
    pub cors_allowed_origin: Option<String>,
    pub body_limit_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let openai_api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?;
        let openai_base_url = env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        Url::parse(&openai_base_url).context("OPENAI_BASE_URL must be a valid URL")?;
        let extract_model =
            env::var("SIGNAL_EXTRACT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let analyze_model =
            env::var("SIGNAL_ANALYZE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let model_temperature = env::var("SIGNAL_MODEL_TEMPERATURE")
            .unwrap_or_else(|_| "0.7".to_string())
            .parse()
            .context("SIGNAL_MODEL_TEMPERATURE must be a number")?;
        let model_timeout = model_timeout_from_env()?;
        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();
        let body_limit_bytes = env::var("BODY_LIMIT_BYTES")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_BODY_LIMIT_BYTES);

        Ok(Self {
            server_host,
            server_port,
            openai_api_key,
            openai_base_url,
            extract_model,
            analyze_model,
            model_temperature,
            model_timeout,
            cors_allowed_origin,
            body_limit_bytes,
        })
    }

    pub fn redacted_api_key(&self) -> String {
        redact_secret(&self.openai_api_key)
    }
}

/// Settings for the journal side: local storage, undo window and the proxy it talks to.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub data_dir: PathBuf,
    pub storage_key: String,
    pub undo_window: Duration,
    pub proxy_url: String,
    pub proxy_token: Option<String>,
    pub model_timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        let data_dir = env::var("SIGNAL_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".signal"));
        let storage_key =
            env::var("SIGNAL_STORAGE_KEY").unwrap_or_else(|_| DEFAULT_STORAGE_KEY.to_string());
        let undo_window_ms: u64 = env::var("SIGNAL_UNDO_WINDOW_MS")
            .unwrap_or_else(|_| DEFAULT_UNDO_WINDOW_MS.to_string())
            .parse()
            .context("SIGNAL_UNDO_WINDOW_MS must be an integer")?;
        let proxy_url =
            env::var("SIGNAL_PROXY_URL").unwrap_or_else(|_| "http://127.0.0.1:3001".to_string());
        Url::parse(&proxy_url).context("SIGNAL_PROXY_URL must be a valid URL")?;
        let proxy_token = env::var("SIGNAL_PROXY_TOKEN").ok();
        let model_timeout = model_timeout_from_env()?;

        Ok(Self {
            data_dir,
            storage_key,
            undo_window: Duration::from_millis(undo_window_ms),
            proxy_url,
            proxy_token,
            model_timeout,
        })
    }
}

fn model_timeout_from_env() -> Result<Duration> {
    let seconds: u64 = env::var("MODEL_TIMEOUT_SECONDS")
        .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECONDS.to_string())
        .parse()
        .context("MODEL_TIMEOUT_SECONDS must be an integer")?;
    Ok(Duration::from_secs(seconds))
}

fn redact_secret(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{tail}")
}
