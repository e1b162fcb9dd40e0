//! Report view: the section-by-section document shown for an analysis.

use serde::Serialize;

use crate::models::analysis::{AnalysisResult, ImprovedResume, ImprovedScore, SectionBody};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub score: u8,
    pub improved_score: ImprovedScore,
    pub keywords: Vec<String>,
    pub sections: Vec<ReportSection>,
    pub ats_report: String,
}

/// One block of the improved resume. A plain-text resume has no heading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub heading: Option<String>,
    pub block: ReportBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum ReportBlock {
    Paragraph(String),
    Bullets(Vec<String>),
}

impl ReportDocument {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let sections = match result.improved_resume() {
            Some(ImprovedResume::Sections(sections)) => sections
                .into_iter()
                .map(|section| ReportSection {
                    heading: Some(section.name),
                    block: match section.body {
                        SectionBody::Text(text) => ReportBlock::Paragraph(text),
                        SectionBody::Items(items) => ReportBlock::Bullets(items),
                    },
                })
                .collect(),
            Some(ImprovedResume::Text(text)) => vec![ReportSection {
                heading: None,
                block: ReportBlock::Paragraph(text),
            }],
            None => Vec::new(),
        };

        ReportDocument {
            score: result.score(),
            improved_score: result.improved_score(),
            keywords: result.keywords(),
            sections,
            ats_report: result.ats_report(),
        }
    }
}
