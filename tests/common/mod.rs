use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use http_body_util::BodyExt;
use serde::Serialize;
use signal_journal::clock::{Clock, ManualClock};
use signal_journal::config::{AppConfig, DEFAULT_BODY_LIMIT_BYTES};
use signal_journal::error::{SignalError, SignalResult};
use signal_journal::journal::Journal;
use signal_journal::llm::{ExtractionResult, ModelClient, SuggestedInput};
use signal_journal::models::{AiAnalysis, Decision, NewDecision};
use signal_journal::routes;
use signal_journal::session::DecisionSession;
use signal_journal::soft_delete::UNDO_WINDOW;
use signal_journal::state::AppState;
use signal_journal::storage::{BlobStore, MemoryBlobStore};
use tokio::sync::Mutex;
use tower::util::ServiceExt;

#[allow(dead_code)]
pub const STORAGE_KEY: &str = "signal_decisions";

/// In-memory store whose writes can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryBlobStore,
    failing: AtomicBool,
}

#[allow(dead_code)]
impl FlakyStore {
    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for FlakyStore {
    async fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get_blob(key).await
    }

    async fn put_blob(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("disk full");
        }
        self.inner.put_blob(key, bytes).await
    }
}

/// Scripted stand-in for the hosted model.
pub struct FakeModel {
    extraction: Mutex<Result<ExtractionResult, String>>,
    analysis: Mutex<Result<AiAnalysis, String>>,
    analyzed: Mutex<Vec<Decision>>,
    extract_calls: AtomicUsize,
    analyze_calls: AtomicUsize,
}

impl Default for FakeModel {
    fn default() -> Self {
        Self {
            extraction: Mutex::new(Ok(extraction("empty", &[]))),
            analysis: Mutex::new(Ok(sample_analysis("default"))),
            analyzed: Mutex::new(Vec::new()),
            extract_calls: AtomicUsize::new(0),
            analyze_calls: AtomicUsize::new(0),
        }
    }
}

#[allow(dead_code)]
impl FakeModel {
    pub async fn set_extraction(&self, result: Result<ExtractionResult, String>) {
        *self.extraction.lock().await = result;
    }

    pub async fn set_analysis(&self, result: Result<AiAnalysis, String>) {
        *self.analysis.lock().await = result;
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    pub async fn last_analyzed(&self) -> Option<Decision> {
        self.analyzed.lock().await.last().cloned()
    }
}

#[async_trait]
impl ModelClient for FakeModel {
    async fn extract(&self, _file_name: &str, _raw_text: &str) -> SignalResult<ExtractionResult> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        self.extraction
            .lock()
            .await
            .clone()
            .map_err(SignalError::Extraction)
    }

    async fn analyze(&self, decision: &Decision) -> SignalResult<AiAnalysis> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        self.analyzed.lock().await.push(decision.clone());
        self.analysis.lock().await.clone().map_err(SignalError::Analysis)
    }
}

#[allow(dead_code)]
pub fn extraction(summary: &str, inputs: &[(&str, &str)]) -> ExtractionResult {
    ExtractionResult {
        document_summary: summary.to_string(),
        inputs: inputs
            .iter()
            .map(|(ty, text)| SuggestedInput {
                input_type: ty.to_string(),
                text: text.to_string(),
                source_ref: Some("Page 1".to_string()),
                confidence: Some("medium".to_string()),
            })
            .collect(),
    }
}

#[allow(dead_code)]
pub fn sample_analysis(summary: &str) -> AiAnalysis {
    AiAnalysis {
        situation_summary: summary.to_string(),
        why_hard: "Competing priorities".to_string(),
        forces: vec!["Revenue pressure".to_string()],
        constraints: vec![],
        hidden_assumptions: vec![],
        unknowns: vec!["Enterprise churn".to_string()],
        tensions: vec![],
        options: vec![],
        file_extractions: vec![],
    }
}

#[allow(dead_code)]
pub fn test_config() -> AppConfig {
    AppConfig {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        openai_api_key: "sk-test-0000000000".to_string(),
        openai_base_url: "http://127.0.0.1:9".to_string(),
        extract_model: "test-extract".to_string(),
        analyze_model: "test-analyze".to_string(),
        model_temperature: 0.7,
        model_timeout: Duration::from_secs(5),
        cors_allowed_origin: None,
        body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
    }
}

/// Journal, session and fake model wired together around one decision.
#[allow(dead_code)]
pub struct TestDesk {
    pub journal: Journal,
    pub session: DecisionSession,
    pub model: Arc<FakeModel>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<FlakyStore>,
}

#[allow(dead_code)]
impl TestDesk {
    pub async fn new() -> Result<Self> {
        let store = Arc::new(FlakyStore::default());
        let clock = Arc::new(ManualClock::new(1_000));
        let model = Arc::new(FakeModel::default());

        let mut journal = Journal::open(store.clone(), STORAGE_KEY).await?;
        let decision = journal
            .create(
                NewDecision {
                    title: "Deprecate the legacy API in Q3?".to_string(),
                    context: "Enterprise users depend on it".to_string(),
                    owner: "Ana".to_string(),
                    deadline: "2026-12-01".to_string(),
                },
                clock.now_millis(),
            )
            .await?;

        let session = DecisionSession::open(
            &journal,
            &decision.id,
            model.clone(),
            clock.clone(),
            UNDO_WINDOW,
        )?;

        Ok(Self {
            journal,
            session,
            model,
            clock,
            store,
        })
    }

    pub fn decision(&self) -> Arc<Decision> {
        self.session
            .decision(&self.journal)
            .expect("session decision exists")
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub state: AppState,
    pub model: Arc<FakeModel>,
    router: Router,
}

#[allow(dead_code)]
impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let model = Arc::new(FakeModel::default());
        let model_for_state: Arc<dyn ModelClient> = model.clone();
        let state = AppState::new(config, model_for_state);
        let router = routes::create_router(state.clone());
        Self {
            state,
            model,
            router,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }
}

#[allow(dead_code)]
pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

/// Serves `router` on an ephemeral local port.
#[allow(dead_code)]
pub async fn spawn_server(router: Router) -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind test listener")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(addr)
}
