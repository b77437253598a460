//! Parsing of free-form generation replies.
//!
//! Parsing is tolerant: a reply with missing or mangled markers still yields
//! a non-empty hierarchy and email body, flagged [`ReplyQuality::Degraded`].
//! Only an empty reply is an error.

use std::sync::LazyLock;

use navigator_shared::{EmailTemplate, NavigatorError, Result};
use regex::{Match, Regex};
use serde::Deserialize;

use crate::generation::{Augmentation, ReplyQuality};

pub(crate) const FALLBACK_HIERARCHY: &str = "Unable to determine hierarchy";
pub(crate) const FALLBACK_EMAIL_BODY: &str = "Unable to generate email template";
pub(crate) const FALLBACK_SUBJECT: &str = "Quick introduction";

// Markers count only at the start of a line, so prose like "reach them by
// email:" inside a section does not split it.
static HIERARCHY_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*\**[ \t]*hierarchy[ \t]*\**[ \t]*:\**").expect("valid regex")
});

static EMAIL_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*\**[ \t]*email[ \t]*\**[ \t]*:\**").expect("valid regex")
});

// Inline fallbacks for single-line replies: exact-case labels anywhere.
static HIERARCHY_INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\**Hierarchy\**:\**").expect("valid regex"));

static EMAIL_INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\**Email\**:\**").expect("valid regex"));

static SUBJECT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\**\s*subject\s*\**\s*:\**[ \t]*").expect("valid regex")
});

fn find_marker<'h>(anchored: &Regex, inline: &Regex, raw: &'h str) -> Option<Match<'h>> {
    anchored.find(raw).or_else(|| inline.find(raw))
}

/// Text after `marker`, up to `other` when that marker comes later.
fn section<'h>(raw: &'h str, marker: Match<'_>, other: Option<Match<'_>>) -> &'h str {
    let end = other
        .map(|o| o.start())
        .filter(|&start| start >= marker.end())
        .unwrap_or(raw.len());
    raw[marker.end()..end].trim()
}

/// Split a marker-form reply into hierarchy and email.
///
/// The two sections may come in either order.
pub(crate) fn parse_augmentation(raw: &str) -> Result<Augmentation> {
    if raw.trim().is_empty() {
        return Err(NavigatorError::Generation("empty reply".into()));
    }

    let hierarchy_marker = find_marker(&HIERARCHY_MARKER, &HIERARCHY_INLINE, raw);
    let email_marker = find_marker(&EMAIL_MARKER, &EMAIL_INLINE, raw);

    let hierarchy = hierarchy_marker.map(|h| section(raw, h, email_marker));
    let email_section = email_marker.map(|e| section(raw, e, hierarchy_marker));

    let mut degraded = false;

    let hierarchy = match hierarchy.filter(|h| !h.is_empty()) {
        Some(h) => h.to_string(),
        None => {
            degraded = true;
            FALLBACK_HIERARCHY.to_string()
        }
    };

    let email = match email_section.filter(|e| !e.is_empty()) {
        Some(section) => {
            let (template, clean) = split_subject(section);
            degraded |= !clean;
            template
        }
        None => {
            degraded = true;
            // No markers at all: the whole reply is the best draft we have
            let body = if hierarchy_marker.is_none() && email_marker.is_none() {
                raw.trim()
            } else {
                FALLBACK_EMAIL_BODY
            };
            EmailTemplate::new(FALLBACK_SUBJECT, body)
        }
    };

    Ok(Augmentation {
        hierarchy,
        email,
        quality: if degraded {
            ReplyQuality::Degraded
        } else {
            ReplyQuality::Clean
        },
    })
}

#[derive(Deserialize)]
struct EmailJson {
    subject: String,
    #[serde(alias = "body")]
    content: String,
}

/// Parse an email-only reply, expected as `{"subject": .., "content": ..}`.
///
/// Falls back to `Subject:` text form, then to treating the reply as the body.
pub(crate) fn parse_email_reply(raw: &str) -> Result<(EmailTemplate, ReplyQuality)> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NavigatorError::Generation("empty reply".into()));
    }

    if let Some(parsed) = extract_json_object(trimmed)
        .and_then(|json| serde_json::from_str::<EmailJson>(json).ok())
    {
        let subject = parsed.subject.trim();
        let body = parsed.content.trim();
        if !body.is_empty() {
            let quality = if subject.is_empty() {
                ReplyQuality::Degraded
            } else {
                ReplyQuality::Clean
            };
            let subject = if subject.is_empty() { FALLBACK_SUBJECT } else { subject };
            return Ok((EmailTemplate::new(subject, body), quality));
        }
    }

    let (template, _) = split_subject(trimmed);
    Ok((template, ReplyQuality::Degraded))
}

/// Split `Subject: ...` off the first line. Returns whether a subject was found.
fn split_subject(section: &str) -> (EmailTemplate, bool) {
    let (first_line, rest) = section.split_once('\n').unwrap_or((section, ""));

    if let Some(m) = SUBJECT_LINE.find(first_line) {
        let subject = first_line[m.end()..].trim().trim_end_matches('*').trim();
        let body = rest.trim();
        if !subject.is_empty() && !body.is_empty() {
            return (EmailTemplate::new(subject, body), true);
        }
        if !subject.is_empty() {
            return (EmailTemplate::new(subject, FALLBACK_EMAIL_BODY), false);
        }
        if !body.is_empty() {
            return (EmailTemplate::new(FALLBACK_SUBJECT, body), false);
        }
    }

    (EmailTemplate::new(FALLBACK_SUBJECT, section.trim()), false)
}

/// The outermost `{...}` span, tolerating prose or code fences around it.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
