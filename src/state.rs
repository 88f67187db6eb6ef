// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{analysis::AnalysisService, config::Config, remote::BackendClient, store::ExamStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ExamStore>,
    /// Present only when `BACKEND_URL` is configured.
    pub backend: Option<BackendClient>,
    pub analysis: AnalysisService,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn ExamStore>, backend: Option<BackendClient>, config: Config) -> Self {
        let analysis = AnalysisService::new(store.clone(), backend.clone());
        Self {
            store,
            backend,
            analysis,
            config,
        }
    }
}

impl FromRef<AppState> for Arc<dyn ExamStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}
