//! Stored email template format.
//!
//! A template is persisted on the lead as one text blob:
//! `Subject: <subject>` on the first line, one blank line, then the body.

use serde::{Deserialize, Serialize};

/// Prefix of the subject line.
pub const SUBJECT_PREFIX: &str = "Subject: ";

/// Separator between the subject line and the body.
const SEPARATOR: &str = "\n\n";

/// An outreach email split into subject and body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub subject: String,
    pub body: String,
}

impl EmailTemplate {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Render the storage blob.
    pub fn compose(&self) -> String {
        format!("{SUBJECT_PREFIX}{}{SEPARATOR}{}", self.subject, self.body)
    }

    /// Split a stored blob on its first blank line.
    ///
    /// A blob that does not open with `Subject: ` has no subject; the whole
    /// text is the body.
    pub fn parse(text: &str) -> Self {
        let Some(rest) = text.strip_prefix(SUBJECT_PREFIX) else {
            return Self::new("", text);
        };
        match rest.split_once(SEPARATOR) {
            Some((subject, body)) => Self::new(subject, body),
            None => match rest.split_once('\n') {
                Some((subject, body)) => Self::new(subject, body),
                None => Self::new(rest, ""),
            },
        }
    }
}

impl std::fmt::Display for EmailTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.compose())
    }
}
