use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::analysis::extract::extract_text;
use crate::analysis::pipeline::AnalysisRequest;
use crate::analysis::upload::parse_analysis_form;
use crate::errors::AppError;
use crate::models::analysis::{AnalysisResult, AnalysisSummary, NewAnalysis};
use crate::render::{render_improved_resume_pdf, ReportDocument};
use crate::state::AppState;

#[derive(Serialize)]
pub struct CreateAnalysisResponse {
    pub id: i64,
    pub resume_filename: String,
    pub created_at: DateTime<Utc>,
    /// Absent when the result is a degraded one.
    pub model_used: Option<String>,
    pub analysis: AnalysisResult,
    pub report: ReportDocument,
}

#[derive(Serialize)]
pub struct AnalysisDetailResponse {
    pub id: i64,
    pub resume_filename: String,
    pub job_description: String,
    pub created_at: DateTime<Utc>,
    pub analysis: AnalysisResult,
    pub report: ReportDocument,
}

#[derive(Serialize)]
pub struct ModelListResponse {
    pub models: Vec<String>,
}

/// POST /api/v1/analyses
pub async fn handle_create_analysis(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<CreateAnalysisResponse>), AppError> {
    let form = parse_analysis_form(multipart).await?;
    let filename = form.resume.filename;
    info!(
        "Analyzing {filename} ({} bytes) against a {}-char job description",
        form.resume.data.len(),
        form.job_description.len()
    );

    let data = form.resume.data;
    let (data, extracted) = tokio::task::spawn_blocking(move || {
        let extracted = extract_text(&data);
        (data, extracted)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Text extraction task failed: {e}")))?;
    let resume_text = extracted.map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    let outcome = state
        .analyzer
        .analyze(&AnalysisRequest {
            resume_text,
            job_description: form.job_description.clone(),
        })
        .await;
    for attempt in outcome.attempts() {
        info!("Model attempt {}", attempt.summary());
    }
    let model_used = outcome.model_used().map(String::from);
    info!(
        "Analysis of {filename} finished with score {} (model: {})",
        outcome.result().score(),
        model_used.as_deref().unwrap_or("none")
    );

    let stored = state
        .store
        .insert(NewAnalysis {
            resume_filename: filename,
            job_description: form.job_description,
            analysis: outcome.into_result(),
            file_data: data.to_vec(),
        })
        .await?;

    let report = ReportDocument::from_result(&stored.analysis);
    Ok((
        StatusCode::CREATED,
        Json(CreateAnalysisResponse {
            id: stored.id,
            resume_filename: stored.resume_filename,
            created_at: stored.created_at,
            model_used,
            analysis: stored.analysis,
            report,
        }),
    ))
}

/// GET /api/v1/analyses
pub async fn handle_list_analyses(
    State(state): State<AppState>,
) -> Result<Json<Vec<AnalysisSummary>>, AppError> {
    Ok(Json(state.store.list().await?))
}

/// GET /api/v1/analyses/:id
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<AnalysisDetailResponse>, AppError> {
    let stored = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Analysis {id} not found")))?;

    let report = ReportDocument::from_result(&stored.analysis);
    Ok(Json(AnalysisDetailResponse {
        id: stored.id,
        resume_filename: stored.resume_filename,
        job_description: stored.job_description,
        created_at: stored.created_at,
        analysis: stored.analysis,
        report,
    }))
}

/// GET /api/v1/analyses/:id/resume
pub async fn handle_download_resume(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let stored = state.store.get(id).await?;
    let (filename, data) = stored
        .and_then(|s| s.file_data.map(|data| (s.resume_filename, data)))
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    let content_type = if filename.to_ascii_lowercase().ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    };
    Ok(attachment(content_type, &filename, data))
}

/// GET /api/v1/analyses/:id/improved-resume
pub async fn handle_download_improved_resume(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let stored = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Analysis {id} not found")))?;

    let analysis = stored.analysis;
    let pdf = tokio::task::spawn_blocking(move || render_improved_resume_pdf(&analysis))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("PDF render task failed: {e}")))??;

    let filename = format!("Improved_{}.pdf", stored.resume_filename);
    Ok(attachment("application/pdf", &filename, pdf))
}

/// GET /api/v1/models
pub async fn handle_list_models(
    State(state): State<AppState>,
) -> Result<Json<ModelListResponse>, AppError> {
    let models = state.analyzer.available_models().await?;
    Ok(Json(ModelListResponse { models }))
}

/// Expects an already sanitized filename.
fn attachment(content_type: &'static str, filename: &str, body: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{filename}\"");
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}
