use std::sync::Arc;

use crate::{config::AppConfig, llm::ModelClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub model: Arc<dyn ModelClient>,
}

impl AppState {
    pub fn new(config: AppConfig, model: Arc<dyn ModelClient>) -> Self {
        Self {
            config: Arc::new(config),
            model,
        }
    }
}
