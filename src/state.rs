use crate::db::FeedbackStore;
use crate::services::ai::CompletionBackend;
use crate::services::assessment::SafetyAssessor;
use crate::services::summary::SummaryGenerator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FeedbackStore>,
    pub assessor: Arc<SafetyAssessor>,
    pub summaries: Arc<SummaryGenerator>,
}

impl AppState {
    pub fn new(store: Arc<dyn FeedbackStore>, backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            store,
            assessor: Arc::new(SafetyAssessor::new(backend.clone())),
            summaries: Arc::new(SummaryGenerator::new(backend)),
        }
    }
}

pub type SharedState = Arc<AppState>;
