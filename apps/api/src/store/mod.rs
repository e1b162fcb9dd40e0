//! Persistence for analyzed uploads.
//!
//! `AppState` holds an `Arc<dyn AnalysisStore>`; production uses
//! `PgAnalysisStore`.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::analysis::{AnalysisSummary, NewAnalysis, StoredAnalysis};

pub mod postgres;

pub use postgres::PgAnalysisStore;

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Records an analysis and returns it with its assigned id and timestamp.
    async fn insert(&self, analysis: NewAnalysis) -> Result<StoredAnalysis>;

    async fn get(&self, id: i64) -> Result<Option<StoredAnalysis>>;

    /// All analyses, newest first.
    async fn list(&self) -> Result<Vec<AnalysisSummary>>;
}
