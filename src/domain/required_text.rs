//! src/domain/required_text.rs

/// A form value that must carry something other than whitespace.
/// Stored trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredText(String);

impl RequiredText {
    pub fn parse(s: Option<String>) -> Option<RequiredText> {
        let s = s?;
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == s.len() {
            Some(Self(s))
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }
}

impl AsRef<str> for RequiredText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequiredText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
