// Prompt templates for the resume analysis call.
// Placeholders are substituted by `analysis::prompt::build_analysis_prompt`.

/// ATS comparison prompt. Replace `{resume_text}` and `{job_description}`.
pub const ATS_ANALYSIS_PROMPT_TEMPLATE: &str = r#"Act as an expert ATS (Applicant Tracking System) Resume Optimizer.
Analyze the following resume against the provided job description.

Resume:
{resume_text}

Job Description:
{job_description}

Provide a response in valid JSON format with the following keys:
- "score": A numeric score from 0-100 representing the ORIGINAL match score.
- "improved_score": A numeric score from 0-100 representing the Estimated Score AFTER applying the improvements.
- "keywords": A list of missing keywords.
- "improved_resume": A COMPLETE, READY-TO-USE RESUME content in dictionary format (sections as keys).
  The content MUST be tailored to match the JD and justify the 'improved_score'.
- "ats_report": A detailed analysis.

Ensure the response is purely JSON."#;
