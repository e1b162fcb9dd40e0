//! Prompt Builder: combines resume text and a job description into one instruction.

use crate::llm_client::prompts::ATS_ANALYSIS_PROMPT_TEMPLATE;

/// Builds the ATS comparison prompt. Both inputs are embedded verbatim.
pub fn build_analysis_prompt(resume_text: &str, job_description: &str) -> String {
    fill_template(
        ATS_ANALYSIS_PROMPT_TEMPLATE,
        &[
            ("resume_text", resume_text),
            ("job_description", job_description),
        ],
    )
}

/// Replaces `{name}` placeholders in one left-to-right pass over the template.
///
/// Substituted values are never scanned again, so an input that happens to
/// contain `{job_description}` is embedded literally. Braces that do not
/// name a known placeholder are copied through.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
