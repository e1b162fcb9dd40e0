use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// The JSON object returned by the model, kept verbatim.
///
/// Fields the model left out stay absent in storage; the accessors below supply
/// display defaults so callers always see a fully shaped result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult(Map<String, Value>);

/// Estimated score after applying the suggested improvements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImprovedScore {
    Score(u8),
    /// The model gave no usable number.
    NotAvailable,
}

/// The rewritten resume, either keyed by section or as one block of text.
#[derive(Debug, Clone, PartialEq)]
pub enum ImprovedResume {
    Sections(Vec<ResumeSection>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResumeSection {
    pub name: String,
    pub body: SectionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    Text(String),
    Items(Vec<String>),
}

impl AnalysisResult {
    pub fn from_object(object: Map<String, Value>) -> Self {
        Self(object)
    }

    /// Returned without calling any model when no API key is configured.
    pub fn missing_credential() -> Self {
        Self::degraded("API Key missing.", "System could not load Google API Key.")
    }

    /// Returned when every configured model failed.
    pub fn exhausted(last_error: &str) -> Self {
        Self::degraded(
            "Failed to generate resume.",
            &format!("All models failed. Last error: {last_error}"),
        )
    }

    fn degraded(resume_error: &str, report: &str) -> Self {
        let mut improved_resume = Map::new();
        improved_resume.insert("Error".to_string(), Value::String(resume_error.to_string()));

        let mut object = Map::new();
        object.insert("score".to_string(), Value::from(0));
        object.insert("keywords".to_string(), Value::Array(Vec::new()));
        object.insert("improved_resume".to_string(), Value::Object(improved_resume));
        object.insert("ats_report".to_string(), Value::String(report.to_string()));
        Self(object)
    }

    /// Original match score, 0 when missing or not a number.
    pub fn score(&self) -> u8 {
        self.0.get("score").and_then(numeric_score).unwrap_or(0)
    }

    pub fn improved_score(&self) -> ImprovedScore {
        self.0
            .get("improved_score")
            .and_then(numeric_score)
            .map(ImprovedScore::Score)
            .unwrap_or(ImprovedScore::NotAvailable)
    }

    pub fn keywords(&self) -> Vec<String> {
        match self.0.get("keywords") {
            Some(Value::Array(items)) => items.iter().map(value_text).collect(),
            _ => Vec::new(),
        }
    }

    pub fn improved_resume(&self) -> Option<ImprovedResume> {
        match self.0.get("improved_resume")? {
            Value::Null => None,
            Value::Object(sections) => Some(ImprovedResume::Sections(
                sections
                    .iter()
                    .map(|(name, body)| ResumeSection {
                        name: name.clone(),
                        body: match body {
                            Value::Array(items) => {
                                SectionBody::Items(items.iter().map(value_text).collect())
                            }
                            other => SectionBody::Text(value_text(other)),
                        },
                    })
                    .collect(),
            )),
            other => Some(ImprovedResume::Text(value_text(other))),
        }
    }

    pub fn ats_report(&self) -> String {
        match self.0.get("ats_report") {
            None | Some(Value::Null) => String::new(),
            Some(v) => value_text(v),
        }
    }
}

/// Accepts integers, floats and numeric strings; clamps into 0–100.
fn numeric_score(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(0.0, 100.0) as u8)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for ImprovedScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImprovedScore::Score(s) => write!(f, "{s}"),
            ImprovedScore::NotAvailable => f.write_str("N/A"),
        }
    }
}

impl Serialize for ImprovedScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ImprovedScore::Score(s) => serializer.serialize_u8(*s),
            ImprovedScore::NotAvailable => serializer.serialize_str("N/A"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Persistence shapes
// ────────────────────────────────────────────────────────────────────────────

/// Everything the store needs to record one analyzed upload.
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub resume_filename: String,
    pub job_description: String,
    pub analysis: AnalysisResult,
    pub file_data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct StoredAnalysis {
    pub id: i64,
    pub resume_filename: String,
    pub job_description: String,
    pub analysis: AnalysisResult,
    pub file_data: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

/// One line of the history listing.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub id: i64,
    pub resume_filename: String,
    pub score: u8,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(value: Value) -> AnalysisResult {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let r = result(json!({}));
        assert_eq!(r.score(), 0);
        assert_eq!(r.improved_score(), ImprovedScore::NotAvailable);
        assert!(r.keywords().is_empty());
        assert_eq!(r.improved_resume(), None);
        assert_eq!(r.ats_report(), "");
    }

    #[test]
    fn test_scores_accept_strings_and_floats() {
        let r = result(json!({"score": "72", "improved_score": 88.6}));
        assert_eq!(r.score(), 72);
        assert_eq!(r.improved_score(), ImprovedScore::Score(89));
    }

    #[test]
    fn test_score_is_clamped() {
        let r = result(json!({"score": 140, "improved_score": -3}));
        assert_eq!(r.score(), 100);
        assert_eq!(r.improved_score(), ImprovedScore::Score(0));
    }

    #[test]
    fn test_non_numeric_improved_score_is_not_available() {
        let r = result(json!({"improved_score": "unknown"}));
        assert_eq!(r.improved_score().to_string(), "N/A");
    }

    #[test]
    fn test_improved_resume_sections_keep_model_order() {
        let r = result(json!({
            "improved_resume": {
                "Summary": "Backend engineer",
                "Skills": ["Rust", "SQL"],
                "Certifications": null
            }
        }));
        let Some(ImprovedResume::Sections(sections)) = r.improved_resume() else {
            panic!("expected sections");
        };
        let names: Vec<_> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Summary", "Skills", "Certifications"]);
        assert_eq!(sections[0].body, SectionBody::Text("Backend engineer".into()));
        assert_eq!(
            sections[1].body,
            SectionBody::Items(vec!["Rust".into(), "SQL".into()])
        );
        assert_eq!(sections[2].body, SectionBody::Text("null".into()));
    }

    #[test]
    fn test_improved_resume_plain_string() {
        let r = result(json!({"improved_resume": "Full rewritten resume"}));
        assert_eq!(
            r.improved_resume(),
            Some(ImprovedResume::Text("Full rewritten resume".into()))
        );
    }

    #[test]
    fn test_missing_credential_shape_is_exact() {
        let value = serde_json::to_value(AnalysisResult::missing_credential()).unwrap();
        assert_eq!(
            value,
            json!({
                "score": 0,
                "keywords": [],
                "improved_resume": {"Error": "API Key missing."},
                "ats_report": "System could not load Google API Key."
            })
        );
    }

    #[test]
    fn test_exhausted_embeds_last_error() {
        let r = AnalysisResult::exhausted("quota exceeded");
        assert_eq!(r.ats_report(), "All models failed. Last error: quota exceeded");
        assert_eq!(r.score(), 0);
        assert!(serde_json::to_value(&r).unwrap().get("improved_score").is_none());
    }

    #[test]
    fn test_serialized_text_round_trip_preserves_key_order() {
        let r = result(json!({"improved_resume": {"Zeta": "z", "Alpha": "a"}}));
        let text = serde_json::to_string(&r).unwrap();
        let back: AnalysisResult = serde_json::from_str(&text).unwrap();
        assert_eq!(back, r);
        assert!(text.find("Zeta").unwrap() < text.find("Alpha").unwrap());
    }
}
