// Resume analysis: text extraction → prompt → model resolution pipeline.
// All generation calls go through llm_client via the GenerationEndpoint trait.

pub mod extract;
pub mod handlers;
pub mod json_extract;
pub mod pipeline;
pub mod prompt;
pub mod upload;
