//! Deterministic offline providers, selected with `providers.mode = "stub"`.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use navigator_shared::{EmailTemplate, NavigatorError, Result, StubConfig};
use tracing::{debug, warn};

use crate::contact::{ContactInfo, ContactQuery, ContactResolver};
use crate::generation::{AugmentRequest, AugmentationGenerator, EmailRequest, ReplyQuality};
use crate::reply;

fn listed(names: &[String], name: &str) -> bool {
    names.iter().any(|n| n.trim().eq_ignore_ascii_case(name.trim()))
}

/// Lowercase alphanumerics only.
fn slug(part: &str) -> String {
    part.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// ---------------------------------------------------------------------------
// Contact lookup
// ---------------------------------------------------------------------------

/// Derives `first.last@company.com` and returns the configured phone.
pub struct StubContactResolver {
    phone: String,
    fail_for: Vec<String>,
    fail_all: bool,
    calls: AtomicUsize,
}

impl StubContactResolver {
    pub fn new(config: &StubConfig) -> Self {
        Self {
            phone: config.phone.clone(),
            fail_for: config.fail_lookup_for.clone(),
            fail_all: config.fail_all_lookups,
            calls: AtomicUsize::new(0),
        }
    }

    /// Lookups attempted so far, failures included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn derive_email(query: &ContactQuery) -> Option<String> {
        let local = query
            .name
            .split_whitespace()
            .map(slug)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(".");
        if local.is_empty() {
            return None;
        }
        let domain = match slug(&query.company) {
            d if d.is_empty() => "example".to_string(),
            d => d,
        };
        Some(format!("{local}@{domain}.com"))
    }
}

impl Default for StubContactResolver {
    fn default() -> Self {
        Self::new(&StubConfig::default())
    }
}

#[async_trait]
impl ContactResolver for StubContactResolver {
    async fn resolve(&self, query: &ContactQuery) -> Result<ContactInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all || listed(&self.fail_for, &query.name) {
            return Err(NavigatorError::Lookup(format!(
                "stub lookup configured to fail for '{}'",
                query.name
            )));
        }
        debug!(name = %query.name, "stub lookup");
        Ok(ContactInfo {
            email: Self::derive_email(query),
            phone: Some(self.phone.clone()),
        })
    }

    fn name(&self) -> &str {
        "stub"
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Canned replies run through the same parser as live replies.
pub struct StubGenerator {
    fail_for: Vec<String>,
    fail_all: bool,
    forced_reply: Option<String>,
    generate_calls: AtomicUsize,
    email_calls: AtomicUsize,
}

impl StubGenerator {
    pub fn new(config: &StubConfig) -> Self {
        Self {
            fail_for: config.fail_generation_for.clone(),
            fail_all: config.fail_all_generation,
            forced_reply: None,
            generate_calls: AtomicUsize::new(0),
            email_calls: AtomicUsize::new(0),
        }
    }

    /// Answer every call with `raw` instead of the canned reply.
    pub fn with_reply(mut self, raw: impl Into<String>) -> Self {
        self.forced_reply = Some(raw.into());
        self
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn email_calls(&self) -> usize {
        self.email_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self, name: &str) -> Result<()> {
        if self.fail_all || listed(&self.fail_for, name) {
            return Err(NavigatorError::Generation(format!(
                "stub generation configured to fail for '{name}'"
            )));
        }
        Ok(())
    }

    fn canned_augmentation(request: &AugmentRequest) -> String {
        let company = request.company.as_deref().unwrap_or("your company");
        let first_name = request.name.split_whitespace().next().unwrap_or("there");
        format!(
            "Hierarchy: {level}\n\
             Email: Subject: Connecting with {company} leadership\n\
             \n\
             Hi {first_name},\n\
             \n\
             I came across your work as {title} at {company} and would value a short \
             conversation about Product Manager opportunities on your team.\n\
             \n\
             Would you be open to a 15-minute call next week?\n\
             \n\
             Best regards",
            level = hierarchy_level(request.title.as_deref()),
            title = request.title.as_deref().unwrap_or("a leader"),
        )
    }

    fn canned_email(request: &EmailRequest) -> String {
        let company = request.company.as_deref().unwrap_or("your company");
        let first_name = request.name.split_whitespace().next().unwrap_or("there");
        let mut content = format!(
            "Hi {first_name},\n\nI have been following {company} and would love to \
             hear how your team approaches product planning."
        );
        if let Some(context) = request.context.as_deref().filter(|c| !c.trim().is_empty()) {
            content.push_str(&format!("\n\n{}", context.trim()));
        }
        content.push_str("\n\nWould a short call next week work?\n\nBest regards");

        serde_json::json!({
            "subject": format!("Quick question about {company}"),
            "content": content,
        })
        .to_string()
    }
}

impl Default for StubGenerator {
    fn default() -> Self {
        Self::new(&StubConfig::default())
    }
}

/// Title keyword to a one-line hierarchy guess.
fn hierarchy_level(title: Option<&str>) -> &'static str {
    let title = title.unwrap_or_default().to_ascii_lowercase();
    let words: Vec<&str> = title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has = |keys: &[&str]| keys.iter().any(|k| words.contains(k));

    if has(&["chief", "ceo", "cto", "cpo", "founder", "cofounder"]) {
        "Executive, reports to the board"
    } else if has(&["vp", "svp", "evp"]) || title.contains("vice president") {
        "VP-level, reports to a C-level executive, manages directors"
    } else if has(&["director", "head"]) {
        "Director-level, reports to a VP, manages managers and senior ICs"
    } else if has(&["manager", "lead"]) {
        "Manager-level, reports to a director, manages individual contributors"
    } else {
        "Individual contributor, reports to a manager"
    }
}

#[async_trait]
impl AugmentationGenerator for StubGenerator {
    async fn generate(&self, request: &AugmentRequest) -> Result<crate::Augmentation> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure(&request.name)?;

        let raw = match &self.forced_reply {
            Some(raw) => raw.clone(),
            None => Self::canned_augmentation(request),
        };
        let augmentation = reply::parse_augmentation(&raw)?;
        if augmentation.quality == ReplyQuality::Degraded {
            warn!(name = %request.name, "augmentation reply missed its markers, using fallback text");
        }
        Ok(augmentation)
    }

    async fn generate_email(&self, request: &EmailRequest) -> Result<EmailTemplate> {
        self.email_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure(&request.name)?;

        let raw = match &self.forced_reply {
            Some(raw) => raw.clone(),
            None => Self::canned_email(request),
        };
        let (template, _) = reply::parse_email_reply(&raw)?;
        Ok(template)
    }

    fn name(&self) -> &str {
        "stub"
    }
}
