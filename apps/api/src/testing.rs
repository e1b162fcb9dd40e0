//! Test doubles shared by unit and router tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use crate::analysis::pipeline::{AnalyzerConfig, ResumeAnalyzer};
use crate::config::Config;
use crate::llm_client::{GenerationEndpoint, LlmError};
use crate::models::analysis::{AnalysisResult, AnalysisSummary, NewAnalysis, StoredAnalysis};
use crate::state::AppState;
use crate::store::AnalysisStore;

/// Router state over test doubles. No database or network is touched.
pub fn test_state(
    endpoint: Arc<dyn GenerationEndpoint>,
    store: Arc<dyn AnalysisStore>,
    api_key: Option<&str>,
    models: &[&str],
) -> AppState {
    let config = Config {
        database_url: "postgres://unused".to_string(),
        google_api_key: api_key.map(String::from),
        gemini_api_base: "http://127.0.0.1:0".to_string(),
        gemini_models: models.iter().map(|m| m.to_string()).collect(),
        llm_timeout_secs: 5,
        max_upload_bytes: 16 * 1024 * 1024,
        port: 0,
        rust_log: "debug".to_string(),
    };
    let analyzer = ResumeAnalyzer::new(
        AnalyzerConfig {
            api_key: config.google_api_key.clone(),
            models: config.gemini_models.clone(),
        },
        endpoint,
    );

    AppState {
        store,
        analyzer: Arc::new(analyzer),
        config,
    }
}

/// What a scripted model answers with.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(&'static str),
    Api(u16, &'static str),
    AuthFailed,
    RateLimited,
    EmptyContent,
}

/// Generation endpoint with one fixed reply per model. Records every call.
/// Unscripted models answer 404 like an unknown Gemini model.
#[derive(Default)]
pub struct ScriptedEndpoint {
    replies: HashMap<String, ScriptedReply>,
    calls: Mutex<Vec<(String, String)>>,
    models: Vec<String>,
}

impl ScriptedEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, model: &str, reply: ScriptedReply) -> Self {
        self.replies.insert(model.to_string(), reply);
        self
    }

    pub fn listing(mut self, models: &[&str]) -> Self {
        self.models = models.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Models called, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(model, _)| model.clone())
            .collect()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationEndpoint for ScriptedEndpoint {
    async fn generate(&self, _api_key: &str, model: &str, prompt: &str) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), prompt.to_string()));

        match self.replies.get(model) {
            Some(ScriptedReply::Text(text)) => Ok(text.to_string()),
            Some(ScriptedReply::Api(status, message)) => Err(LlmError::Api {
                status: *status,
                message: message.to_string(),
            }),
            Some(ScriptedReply::AuthFailed) => Err(LlmError::AuthFailed {
                model: model.to_string(),
            }),
            Some(ScriptedReply::RateLimited) => Err(LlmError::RateLimited {
                model: model.to_string(),
            }),
            Some(ScriptedReply::EmptyContent) => Err(LlmError::EmptyContent),
            None => Err(LlmError::Api {
                status: 404,
                message: format!("models/{model} is not found"),
            }),
        }
    }

    async fn list_models(&self, _api_key: &str) -> Result<Vec<String>, LlmError> {
        Ok(self.models.clone())
    }
}

/// In-memory store. The analysis is kept as serialized text, like the
/// `analysis_json` column, so reads go through the same decoding path.
#[derive(Default)]
pub struct MemoryAnalysisStore {
    rows: Mutex<Vec<MemoryRow>>,
}

struct MemoryRow {
    id: i64,
    resume_filename: String,
    job_description: String,
    analysis_json: String,
    file_data: Option<Vec<u8>>,
    created_at: chrono::DateTime<Utc>,
}

impl MemoryAnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row with no stored file, as rows written before uploads were kept.
    pub fn insert_without_file(&self, filename: &str, analysis: &AnalysisResult) -> i64 {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.len() as i64 + 1;
        rows.push(MemoryRow {
            id,
            resume_filename: filename.to_string(),
            job_description: String::new(),
            analysis_json: serde_json::to_string(analysis).unwrap(),
            file_data: None,
            created_at: fixed_time(id),
        });
        id
    }
}

/// Strictly increasing timestamps so listing order is deterministic.
fn fixed_time(id: i64) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap() + Duration::seconds(id)
}

impl MemoryRow {
    fn to_stored(&self) -> Result<StoredAnalysis> {
        Ok(StoredAnalysis {
            id: self.id,
            resume_filename: self.resume_filename.clone(),
            job_description: self.job_description.clone(),
            analysis: serde_json::from_str(&self.analysis_json)?,
            file_data: self.file_data.clone(),
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl AnalysisStore for MemoryAnalysisStore {
    async fn insert(&self, analysis: NewAnalysis) -> Result<StoredAnalysis> {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.len() as i64 + 1;
        let row = MemoryRow {
            id,
            resume_filename: analysis.resume_filename,
            job_description: analysis.job_description,
            analysis_json: serde_json::to_string(&analysis.analysis)?,
            file_data: Some(analysis.file_data),
            created_at: fixed_time(id),
        };
        let stored = row.to_stored()?;
        rows.push(row);
        Ok(stored)
    }

    async fn get(&self, id: i64) -> Result<Option<StoredAnalysis>> {
        let rows = self.rows.lock().unwrap();
        rows.iter().find(|r| r.id == id).map(MemoryRow::to_stored).transpose()
    }

    async fn list(&self) -> Result<Vec<AnalysisSummary>> {
        let rows = self.rows.lock().unwrap();
        let mut summaries = rows
            .iter()
            .map(|r| -> Result<AnalysisSummary> {
                let analysis: AnalysisResult = serde_json::from_str(&r.analysis_json)?;
                Ok(AnalysisSummary {
                    id: r.id,
                    resume_filename: r.resume_filename.clone(),
                    score: analysis.score(),
                    created_at: r.created_at,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}
