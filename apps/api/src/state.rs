use std::sync::Arc;

use crate::analysis::pipeline::ResumeAnalyzer;
use crate::config::Config;
use crate::store::AnalysisStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Analysis history. Production: `PgAnalysisStore`.
    pub store: Arc<dyn AnalysisStore>,
    pub analyzer: Arc<ResumeAnalyzer>,
    pub config: Config,
}
