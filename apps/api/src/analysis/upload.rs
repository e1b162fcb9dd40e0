use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::Bytes;

use crate::errors::AppError;

const FALLBACK_FILENAME: &str = "resume.pdf";
const MAX_FILENAME_CHARS: usize = 100;

/// The uploaded resume file.
pub struct UploadedResume {
    pub filename: String,
    pub data: Bytes,
}

/// Parsed fields of the analysis form.
pub struct AnalysisForm {
    pub resume: UploadedResume,
    pub job_description: String,
}

/// Parse the `resume` + `job_desc` multipart form.
///
/// Unknown fields are drained and ignored. The filename is sanitized before
/// it leaves this function.
pub async fn parse_analysis_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<AnalysisForm, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::Validation(e.body_text()))?;
    let mut resume: Option<(String, Bytes)> = None;
    let mut job_description: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "resume" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field.bytes().await.map_err(form_error)?;
                resume = Some((filename, data));
            }
            "job_desc" => {
                job_description = Some(field.text().await.map_err(form_error)?);
            }
            _ => {
                field.bytes().await.map_err(form_error)?;
            }
        }
    }

    let (raw_filename, data) =
        resume.ok_or_else(|| AppError::Validation("No resume file uploaded".to_string()))?;
    if raw_filename.trim().is_empty() {
        return Err(AppError::Validation("No resume file selected".to_string()));
    }

    let job_description = job_description
        .filter(|jd| !jd.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Job description is required".to_string()))?;

    Ok(AnalysisForm {
        resume: UploadedResume {
            filename: secure_filename(&raw_filename),
            data,
        },
        job_description,
    })
}

fn form_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Uploaded file exceeds the size limit".to_string())
    } else {
        AppError::Validation(format!("Failed to read form field: {}", e.body_text()))
    }
}

/// Reduce a client-supplied filename to a safe ASCII name.
///
/// Directory components are dropped, whitespace becomes `_`, anything outside
/// `[A-Za-z0-9._-]` is removed and leading dots are stripped. The result is at
/// most 100 characters and never empty.
pub fn secure_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or("");

    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some('_'),
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') => Some(c),
            _ => None,
        })
        .collect();

    let trimmed: String = cleaned
        .trim_start_matches('.')
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect();

    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed
    }
}
