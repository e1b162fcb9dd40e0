//! Model resolution pipeline: ordered model fallback with tolerant JSON extraction.
//!
//! Flow: missing key? → degraded result, no calls.
//!       for each model in priority order: generate → extract JSON object →
//!       first object wins. Any failure moves on to the next model.
//!       Nothing parsed → degraded result carrying the last error.
//!
//! Every path ends in an `AnalysisResult`; callers never handle "no result".

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::analysis::json_extract::{extract_json_object, ExtractionError};
use crate::analysis::prompt::build_analysis_prompt;
use crate::errors::AppError;
use crate::llm_client::{GenerationEndpoint, LlmError};
use crate::models::analysis::AnalysisResult;

/// Newer and faster models first; the most widely available ones last.
pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.0-flash-exp",
    "gemini-1.5-flash-latest",
    "gemini-1.5-pro-latest",
    "gemini-2.0-flash",
    "gemini-1.5-flash",
];

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub resume_text: String,
    pub job_description: String,
}

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub api_key: Option<String>,
    pub models: Vec<String>,
}

/// Why a single model attempt did not produce a result.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Endpoint(#[from] LlmError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

#[derive(Debug)]
pub enum AttemptOutcome {
    /// Raw model text that yielded the result.
    Success(String),
    Failure(AttemptError),
}

#[derive(Debug)]
pub struct ModelAttempt {
    pub model: String,
    pub outcome: AttemptOutcome,
}

impl ModelAttempt {
    /// One-line description for the request log.
    pub fn summary(&self) -> String {
        match &self.outcome {
            AttemptOutcome::Success(raw) => format!("{}: ok ({} chars)", self.model, raw.len()),
            AttemptOutcome::Failure(e) => format!("{}: failed ({e})", self.model),
        }
    }
}

/// Tagged pipeline return. Each variant carries a complete result.
#[derive(Debug)]
pub enum AnalysisOutcome {
    Completed {
        model: String,
        result: AnalysisResult,
        attempts: Vec<ModelAttempt>,
    },
    CredentialMissing {
        result: AnalysisResult,
    },
    Exhausted {
        result: AnalysisResult,
        attempts: Vec<ModelAttempt>,
    },
}

impl AnalysisOutcome {
    pub fn result(&self) -> &AnalysisResult {
        match self {
            AnalysisOutcome::Completed { result, .. }
            | AnalysisOutcome::CredentialMissing { result }
            | AnalysisOutcome::Exhausted { result, .. } => result,
        }
    }

    pub fn into_result(self) -> AnalysisResult {
        match self {
            AnalysisOutcome::Completed { result, .. }
            | AnalysisOutcome::CredentialMissing { result }
            | AnalysisOutcome::Exhausted { result, .. } => result,
        }
    }

    /// Every model tried, in call order. Empty when no call was made.
    pub fn attempts(&self) -> &[ModelAttempt] {
        match self {
            AnalysisOutcome::Completed { attempts, .. }
            | AnalysisOutcome::Exhausted { attempts, .. } => attempts,
            AnalysisOutcome::CredentialMissing { .. } => &[],
        }
    }

    /// The model whose reply was used, if any.
    pub fn model_used(&self) -> Option<&str> {
        match self {
            AnalysisOutcome::Completed { model, .. } => Some(model),
            _ => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Analyzer
// ────────────────────────────────────────────────────────────────────────────

pub struct ResumeAnalyzer {
    config: AnalyzerConfig,
    endpoint: Arc<dyn GenerationEndpoint>,
}

impl ResumeAnalyzer {
    pub fn new(config: AnalyzerConfig, endpoint: Arc<dyn GenerationEndpoint>) -> Self {
        Self { config, endpoint }
    }

    /// Runs the full analysis for one resume/job-description pair.
    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        let Some(api_key) = self.config.api_key.as_deref() else {
            warn!("No Google API key configured; skipping model calls");
            return AnalysisOutcome::CredentialMissing {
                result: AnalysisResult::missing_credential(),
            };
        };

        let prompt = build_analysis_prompt(&request.resume_text, &request.job_description);
        self.resolve(api_key, &prompt).await
    }

    /// Tries each configured model in order until one yields a JSON object.
    async fn resolve(&self, api_key: &str, prompt: &str) -> AnalysisOutcome {
        let mut attempts = Vec::with_capacity(self.config.models.len());

        for model in &self.config.models {
            info!("Trying model: {model}");
            match self.attempt(api_key, model, prompt).await {
                Ok((raw, object)) => {
                    info!("Model {model} produced an analysis");
                    attempts.push(ModelAttempt {
                        model: model.clone(),
                        outcome: AttemptOutcome::Success(raw),
                    });
                    return AnalysisOutcome::Completed {
                        model: model.clone(),
                        result: AnalysisResult::from_object(object),
                        attempts,
                    };
                }
                Err(e) => {
                    warn!("Model {model} failed: {e}");
                    attempts.push(ModelAttempt {
                        model: model.clone(),
                        outcome: AttemptOutcome::Failure(e),
                    });
                }
            }
        }

        let last_error = attempts
            .iter()
            .rev()
            .find_map(|a| match &a.outcome {
                AttemptOutcome::Failure(e) => Some(e.to_string()),
                AttemptOutcome::Success(_) => None,
            })
            .unwrap_or_else(|| "none".to_string());

        error!(
            "All {} model(s) failed. Last error: {last_error}",
            attempts.len()
        );

        AnalysisOutcome::Exhausted {
            result: AnalysisResult::exhausted(&last_error),
            attempts,
        }
    }

    async fn attempt(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
    ) -> Result<(String, Map<String, Value>), AttemptError> {
        let raw = self.endpoint.generate(api_key, model, prompt).await?;
        let object = extract_json_object(&raw)?;
        Ok((raw, object))
    }

    /// Lists the models the configured key can reach.
    pub async fn available_models(&self) -> Result<Vec<String>, AppError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            AppError::Configuration("GOOGLE_API_KEY is not configured".to_string())
        })?;

        self.endpoint
            .list_models(api_key)
            .await
            .map_err(|e| AppError::Llm(format!("Failed to list models: {e}")))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedEndpoint, ScriptedReply};
    use serde_json::json;

    fn analyzer(endpoint: Arc<ScriptedEndpoint>, models: &[&str]) -> ResumeAnalyzer {
        ResumeAnalyzer::new(
            AnalyzerConfig {
                api_key: Some("test-key".to_string()),
                models: models.iter().map(|m| m.to_string()).collect(),
            },
            endpoint,
        )
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            resume_text: "Jane Doe. Rust developer.".to_string(),
            job_description: "Senior Rust engineer".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_parseable_model_wins_and_later_models_are_not_called() {
        let endpoint = Arc::new(
            ScriptedEndpoint::new()
                .reply("m1", ScriptedReply::RateLimited)
                .reply("m2", ScriptedReply::Api(500, "backend error"))
                .reply("m3", ScriptedReply::Text("```json\n{\"score\": 77}\n```"))
                .reply("m4", ScriptedReply::Text("{\"score\": 1}")),
        );
        let outcome = analyzer(endpoint.clone(), &["m1", "m2", "m3", "m4"])
            .analyze(&request())
            .await;

        assert_eq!(outcome.model_used(), Some("m3"));
        assert_eq!(
            serde_json::to_value(outcome.result()).unwrap(),
            json!({"score": 77})
        );
        assert_eq!(endpoint.calls(), vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn test_unparseable_reply_falls_through_to_next_model() {
        let endpoint = Arc::new(
            ScriptedEndpoint::new()
                .reply("m1", ScriptedReply::Text("Sorry, I can't produce JSON today."))
                .reply("m2", ScriptedReply::Text("sure, {\"score\": 5} enjoy")),
        );
        let outcome = analyzer(endpoint.clone(), &["m1", "m2"])
            .analyze(&request())
            .await;

        let AnalysisOutcome::Completed { model, attempts, .. } = &outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(model, "m2");
        assert!(matches!(
            attempts[0].outcome,
            AttemptOutcome::Failure(AttemptError::Extraction(_))
        ));
        assert!(matches!(attempts[1].outcome, AttemptOutcome::Success(_)));
        assert_eq!(outcome.result().score(), 5);
    }

    #[tokio::test]
    async fn test_incomplete_object_is_accepted_without_default_filling() {
        let endpoint = Arc::new(
            ScriptedEndpoint::new()
                .reply("m1", ScriptedReply::Text("{\"keywords\": []}"))
                .reply("m2", ScriptedReply::Text("{\"score\": 90}")),
        );
        let outcome = analyzer(endpoint.clone(), &["m1", "m2"])
            .analyze(&request())
            .await;

        assert_eq!(
            serde_json::to_value(outcome.result()).unwrap(),
            json!({"keywords": []})
        );
        assert_eq!(endpoint.calls(), vec!["m1"]);
    }

    #[tokio::test]
    async fn test_all_models_failing_returns_degraded_result_with_last_error() {
        let endpoint = Arc::new(
            ScriptedEndpoint::new()
                .reply("m1", ScriptedReply::AuthFailed)
                .reply("m2", ScriptedReply::Api(404, "models/m2 is not found")),
        );
        let outcome = analyzer(endpoint.clone(), &["m1", "m2"])
            .analyze(&request())
            .await;

        assert!(matches!(outcome, AnalysisOutcome::Exhausted { .. }));
        assert_eq!(
            serde_json::to_value(outcome.into_result()).unwrap(),
            json!({
                "score": 0,
                "keywords": [],
                "improved_resume": {"Error": "Failed to generate resume."},
                "ats_report": "All models failed. Last error: API error (status 404): models/m2 is not found"
            })
        );
        assert_eq!(endpoint.calls(), vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn test_exhausted_outcome_records_every_attempt_in_order() {
        let endpoint = Arc::new(
            ScriptedEndpoint::new()
                .reply("m1", ScriptedReply::RateLimited)
                .reply("m2", ScriptedReply::Text("no json here")),
        );
        let outcome = analyzer(endpoint, &["m1", "m2", "m3"])
            .analyze(&request())
            .await;

        let AnalysisOutcome::Exhausted { attempts, .. } = &outcome else {
            panic!("expected exhaustion, got {outcome:?}");
        };
        let models: Vec<_> = attempts.iter().map(|a| a.model.as_str()).collect();
        assert_eq!(models, vec!["m1", "m2", "m3"]);
        assert!(matches!(
            attempts[0].outcome,
            AttemptOutcome::Failure(AttemptError::Endpoint(LlmError::RateLimited { .. }))
        ));
        assert!(matches!(
            attempts[1].outcome,
            AttemptOutcome::Failure(AttemptError::Extraction(ExtractionError::Parse(_)))
        ));
        assert_eq!(
            outcome.attempts()[2].summary(),
            "m3: failed (API error (status 404): models/m3 is not found)"
        );
        assert_eq!(
            outcome.attempts()[0].summary(),
            "m1: failed (Rate limited or quota exhausted for model m1)"
        );
    }

    #[tokio::test]
    async fn test_completed_trail_ends_with_success_summary() {
        let endpoint = Arc::new(
            ScriptedEndpoint::new()
                .reply("m1", ScriptedReply::EmptyContent)
                .reply("m2", ScriptedReply::Text("{\"score\": 40}")),
        );
        let outcome = analyzer(endpoint, &["m1", "m2"]).analyze(&request()).await;

        let summaries: Vec<_> = outcome.attempts().iter().map(ModelAttempt::summary).collect();
        assert_eq!(
            summaries,
            vec![
                "m1: failed (LLM returned empty content)".to_string(),
                "m2: ok (13 chars)".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_credential_has_no_attempts() {
        let analyzer = ResumeAnalyzer::new(
            AnalyzerConfig {
                api_key: None,
                models: vec!["m1".to_string()],
            },
            Arc::new(ScriptedEndpoint::new()),
        );
        assert!(analyzer.analyze(&request()).await.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_last_error_can_be_an_extraction_failure() {
        let endpoint = Arc::new(
            ScriptedEndpoint::new()
                .reply("m1", ScriptedReply::EmptyContent)
                .reply("m2", ScriptedReply::Text("[\"not\", \"an object\"]")),
        );
        let result = analyzer(endpoint, &["m1", "m2"])
            .analyze(&request())
            .await
            .into_result();

        assert_eq!(
            result.ats_report(),
            "All models failed. Last error: model output parsed as JSON array, expected an object"
        );
    }

    #[tokio::test]
    async fn test_missing_credential_short_circuits_without_calls() {
        let endpoint = Arc::new(
            ScriptedEndpoint::new().reply("m1", ScriptedReply::Text("{\"score\": 50}")),
        );
        let analyzer = ResumeAnalyzer::new(
            AnalyzerConfig {
                api_key: None,
                models: vec!["m1".to_string()],
            },
            endpoint.clone(),
        );

        let outcome = analyzer.analyze(&request()).await;

        assert!(matches!(outcome, AnalysisOutcome::CredentialMissing { .. }));
        assert_eq!(
            serde_json::to_value(outcome.result()).unwrap(),
            json!({
                "score": 0,
                "keywords": [],
                "improved_resume": {"Error": "API Key missing."},
                "ats_report": "System could not load Google API Key."
            })
        );
        assert_eq!(endpoint.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_model_list_is_exhausted() {
        let endpoint = Arc::new(ScriptedEndpoint::new());
        let result = analyzer(endpoint.clone(), &[])
            .analyze(&request())
            .await
            .into_result();

        assert_eq!(result.ats_report(), "All models failed. Last error: none");
        assert_eq!(endpoint.call_count(), 0);
    }

    #[tokio::test]
    async fn test_prompt_reaches_endpoint_with_both_inputs() {
        let endpoint = Arc::new(
            ScriptedEndpoint::new().reply("m1", ScriptedReply::Text("{\"score\": 10}")),
        );
        analyzer(endpoint.clone(), &["m1"]).analyze(&request()).await;

        let prompts = endpoint.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Jane Doe. Rust developer."));
        assert!(prompts[0].contains("Senior Rust engineer"));
    }

    #[tokio::test]
    async fn test_available_models_requires_key() {
        let endpoint = Arc::new(ScriptedEndpoint::new());
        let analyzer = ResumeAnalyzer::new(
            AnalyzerConfig {
                api_key: None,
                models: Vec::new(),
            },
            endpoint,
        );
        let err = analyzer.available_models().await.unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_default_models_order() {
        assert_eq!(DEFAULT_MODELS.first(), Some(&"gemini-2.5-flash"));
        assert_eq!(DEFAULT_MODELS.last(), Some(&"gemini-1.5-flash"));
        assert_eq!(DEFAULT_MODELS.len(), 6);
    }
}
