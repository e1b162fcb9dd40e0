// Result rendering: the report view served as JSON and the improved-resume PDF.

pub mod font_metrics;
pub mod pdf;
pub mod report;

pub use pdf::{render_improved_resume_pdf, RenderError};
pub use report::ReportDocument;
