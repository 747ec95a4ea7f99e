//! Model Output Validation
//!
//! - `json_repair`: two-stage JSON object extraction
//! - `response`: field-level checks turning the object into an assessment

mod json_repair;
mod response;

pub use json_repair::{JsonRepairer, ParseOutcome};
pub use response::{ModelAssessment, ResponseValidator};
