use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};

use crate::models::analysis::{AnalysisResult, AnalysisSummary, NewAnalysis, StoredAnalysis};
use crate::store::AnalysisStore;

#[derive(Debug, FromRow)]
struct AnalysisRow {
    id: i64,
    resume_filename: String,
    job_description: String,
    analysis_json: String,
    file_data: Option<Vec<u8>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    id: i64,
    resume_filename: String,
    analysis_json: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AnalysisRow> for StoredAnalysis {
    type Error = anyhow::Error;

    fn try_from(row: AnalysisRow) -> Result<Self> {
        let analysis: AnalysisResult = serde_json::from_str(&row.analysis_json)
            .with_context(|| format!("Stored analysis {} is not valid JSON", row.id))?;
        Ok(StoredAnalysis {
            id: row.id,
            resume_filename: row.resume_filename,
            job_description: row.job_description,
            analysis,
            file_data: row.file_data,
            created_at: row.created_at,
        })
    }
}

/// `analyses` table store. The analysis is written as JSON text so the key
/// order of the improved resume is kept exactly.
#[derive(Clone)]
pub struct PgAnalysisStore {
    pool: PgPool,
}

impl PgAnalysisStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalysisStore for PgAnalysisStore {
    async fn insert(&self, analysis: NewAnalysis) -> Result<StoredAnalysis> {
        let analysis_json =
            serde_json::to_string(&analysis.analysis).context("Failed to serialize analysis")?;

        let (id, created_at): (i64, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO analyses (resume_filename, job_description, analysis_json, file_data)
            VALUES ($1, $2, $3, $4)
            RETURNING id, created_at
            "#,
        )
        .bind(&analysis.resume_filename)
        .bind(&analysis.job_description)
        .bind(&analysis_json)
        .bind(&analysis.file_data)
        .fetch_one(&self.pool)
        .await?;

        info!("Stored analysis {id} for {}", analysis.resume_filename);

        Ok(StoredAnalysis {
            id,
            resume_filename: analysis.resume_filename,
            job_description: analysis.job_description,
            analysis: analysis.analysis,
            file_data: Some(analysis.file_data),
            created_at,
        })
    }

    async fn get(&self, id: i64) -> Result<Option<StoredAnalysis>> {
        let row: Option<AnalysisRow> = sqlx::query_as(
            r#"
            SELECT id, resume_filename, job_description, analysis_json, file_data, created_at
            FROM analyses
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoredAnalysis::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<AnalysisSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT id, resume_filename, analysis_json, created_at
            FROM analyses
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let score = match serde_json::from_str::<AnalysisResult>(&row.analysis_json) {
                    Ok(analysis) => analysis.score(),
                    Err(e) => {
                        warn!("Analysis {} has unreadable JSON: {e}", row.id);
                        0
                    }
                };
                AnalysisSummary {
                    id: row.id,
                    resume_filename: row.resume_filename,
                    score,
                    created_at: row.created_at,
                }
            })
            .collect())
    }
}
