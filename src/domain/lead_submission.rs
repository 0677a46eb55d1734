//! src/domain/lead_submission.rs

use crate::domain::RequiredText;

/// A contact-form lead that passed validation. Lives for one request.
#[derive(Debug, Clone)]
pub struct LeadSubmission {
    pub first_name: RequiredText,
    pub last_name: RequiredText,
    pub company: RequiredText,
    pub email: RequiredText,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub model_code: Option<String>,
    pub source: Option<String>,
    pub page: Option<String>,
    pub variant: Option<String>,
    pub user_agent: Option<String>,
}

impl LeadSubmission {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Blank optional values are dropped rather than relayed as empty lines.
    pub fn optional(value: Option<String>) -> Option<String> {
        value.filter(|v| !v.trim().is_empty())
    }
}

/// Wire names of the required fields that were absent or blank.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Missing required fields: {}", .0.join(", "))]
pub struct MissingFields(pub Vec<&'static str>);

impl MissingFields {
    pub fn from_flags<const N: usize>(fields: [(&'static str, bool); N]) -> Self {
        Self(
            fields
                .into_iter()
                .filter_map(|(name, is_missing)| is_missing.then_some(name))
                .collect(),
        )
    }
}
