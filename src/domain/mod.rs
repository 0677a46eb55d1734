//! src/domain/mod.rs

mod lead_submission;
mod required_text;

pub use lead_submission::{LeadSubmission, MissingFields};
pub use required_text::RequiredText;
