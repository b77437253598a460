//! Core domain types for Navigator leads and notes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder stored when an imported row carries no usable name.
pub const UNKNOWN_NAME: &str = "Unknown";

// ---------------------------------------------------------------------------
// LeadId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for lead identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub Uuid);

impl LeadId {
    /// Generate a new time-sortable lead identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for LeadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for LeadId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Proximity label carried over from the prospect's network export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionDegree {
    #[serde(rename = "1st")]
    First,
    #[serde(rename = "2nd")]
    Second,
    #[serde(rename = "3rd")]
    Third,
    #[serde(rename = "unknown")]
    Unknown,
}

impl ConnectionDegree {
    /// Lenient parse of imported text ("1st", "2", "third", "3rd+").
    /// Anything unrecognized maps to [`ConnectionDegree::Unknown`].
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "first" => return Self::First,
            "second" => return Self::Second,
            "third" => return Self::Third,
            _ => {}
        }
        match normalized.chars().next() {
            Some('1') => Self::First,
            Some('2') => Self::Second,
            Some('3') => Self::Third,
            _ => Self::Unknown,
        }
    }

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "1st",
            Self::Second => "2nd",
            Self::Third => "3rd",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ConnectionDegree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a lead is in the enrichment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentStatus {
    Pending,
    Completed,
    Failed,
}

impl EnrichmentStatus {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for EnrichmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EnrichmentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown enrichment status '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Lead
// ---------------------------------------------------------------------------

/// Profile fields supplied at creation (or by explicit edit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_degree: Option<ConnectionDegree>,
}

impl LeadProfile {
    /// A profile with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            company: None,
            location: None,
            linkedin_url: None,
            connection_degree: None,
        }
    }
}

/// The enrichment payload written together with `completed` status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedFields {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub hierarchy: String,
    pub email_template: String,
    pub enriched_at: DateTime<Utc>,
}

/// A prospect tracked through the enrichment lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_degree: Option<ConnectionDegree>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub hierarchy: Option<String>,
    pub email_template: Option<String>,
    pub enrichment_status: EnrichmentStatus,
    pub enriched_at: Option<DateTime<Utc>>,
    /// Pipeline runs that reached a terminal outcome.
    pub enrichment_attempts: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Copy of the profile fields, used as generator/resolver input.
    pub fn profile(&self) -> LeadProfile {
        LeadProfile {
            name: self.name.clone(),
            title: self.title.clone(),
            company: self.company.clone(),
            location: self.location.clone(),
            linkedin_url: self.linkedin_url.clone(),
            connection_degree: self.connection_degree,
        }
    }
}

/// Everything needed to create a lead row in one insert.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub profile: LeadProfile,
    pub status: EnrichmentStatus,
    pub enrichment: Option<EnrichedFields>,
    pub attempts: u32,
}

impl NewLead {
    /// A lead awaiting the batch runner.
    pub fn pending(profile: LeadProfile) -> Self {
        Self {
            profile,
            status: EnrichmentStatus::Pending,
            enrichment: None,
            attempts: 0,
        }
    }

    /// A lead enriched inline before its first write.
    pub fn completed(profile: LeadProfile, fields: EnrichedFields) -> Self {
        Self {
            profile,
            status: EnrichmentStatus::Completed,
            enrichment: Some(fields),
            attempts: 1,
        }
    }

    /// A lead whose inline enrichment failed; enrichment fields stay null.
    pub fn failed(profile: LeadProfile) -> Self {
        Self {
            profile,
            status: EnrichmentStatus::Failed,
            enrichment: None,
            attempts: 1,
        }
    }
}

/// Partial update applied by a single `UPDATE` statement.
///
/// Outer `None` leaves a column untouched; `Some(None)` writes NULL.
#[derive(Debug, Clone, Default)]
pub struct LeadPatch {
    pub name: Option<String>,
    pub title: Option<Option<String>>,
    pub company: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub linkedin_url: Option<Option<String>>,
    pub connection_degree: Option<Option<ConnectionDegree>>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub hierarchy: Option<Option<String>>,
    pub email_template: Option<Option<String>>,
    pub enrichment_status: Option<EnrichmentStatus>,
    pub enriched_at: Option<Option<DateTime<Utc>>>,
    pub enrichment_attempts: Option<u32>,
    pub last_attempt_at: Option<Option<DateTime<Utc>>>,
}

impl LeadPatch {
    /// Success write: all enrichment fields plus `completed` at once.
    pub fn completed(fields: EnrichedFields, attempts: u32) -> Self {
        Self {
            email: Some(fields.email),
            phone: Some(fields.phone),
            hierarchy: Some(Some(fields.hierarchy)),
            email_template: Some(Some(fields.email_template)),
            enrichment_status: Some(EnrichmentStatus::Completed),
            enriched_at: Some(Some(fields.enriched_at)),
            enrichment_attempts: Some(attempts),
            last_attempt_at: Some(Some(fields.enriched_at)),
            ..Default::default()
        }
    }

    /// Failure write: status only, prior enrichment fields untouched.
    pub fn failed(attempts: u32, at: DateTime<Utc>) -> Self {
        Self {
            enrichment_status: Some(EnrichmentStatus::Failed),
            enrichment_attempts: Some(attempts),
            last_attempt_at: Some(Some(at)),
            ..Default::default()
        }
    }

    /// Replace only the stored email template.
    pub fn email_template(template: impl Into<String>) -> Self {
        Self {
            email_template: Some(Some(template.into())),
            ..Default::default()
        }
    }

    /// Whether applying this patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.title.is_none()
            && self.company.is_none()
            && self.location.is_none()
            && self.linkedin_url.is_none()
            && self.connection_degree.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.hierarchy.is_none()
            && self.email_template.is_none()
            && self.enrichment_status.is_none()
            && self.enriched_at.is_none()
            && self.enrichment_attempts.is_none()
            && self.last_attempt_at.is_none()
    }
}

/// Filters for listing leads.
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    /// Exact company match.
    pub company: Option<String>,
    /// `Some(true)`: email present; `Some(false)`: email absent.
    pub enriched: Option<bool>,
}

/// A lead plus how many notes reference it.
#[derive(Debug, Clone, Serialize)]
pub struct LeadSummary {
    #[serde(flatten)]
    pub lead: Lead,
    pub note_count: u32,
}

/// Lead counts per enrichment status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: u32,
    pub completed: u32,
    pub failed: u32,
}

impl StatusCounts {
    pub fn total(&self) -> u32 {
        self.pending + self.completed + self.failed
    }
}

// ---------------------------------------------------------------------------
// Note
// ---------------------------------------------------------------------------

/// Free-text note attached to a lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Unique note identifier (UUID v7).
    pub id: String,
    /// Owning lead.
    pub lead_id: LeadId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_id_roundtrip() {
        let id = LeadId::new();
        let s = id.to_string();
        let parsed: LeadId = s.parse().expect("parse LeadId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn connection_degree_parsing() {
        assert_eq!(ConnectionDegree::parse("1st"), ConnectionDegree::First);
        assert_eq!(ConnectionDegree::parse(" 2nd "), ConnectionDegree::Second);
        assert_eq!(ConnectionDegree::parse("3rd+"), ConnectionDegree::Third);
        assert_eq!(ConnectionDegree::parse("Second"), ConnectionDegree::Second);
        assert_eq!(ConnectionDegree::parse("out of network"), ConnectionDegree::Unknown);
        assert_eq!(ConnectionDegree::parse(""), ConnectionDegree::Unknown);
    }

    #[test]
    fn connection_degree_serializes_as_label() {
        let json = serde_json::to_string(&ConnectionDegree::Second).unwrap();
        assert_eq!(json, r#""2nd""#);
        let parsed: ConnectionDegree = serde_json::from_str(r#""unknown""#).unwrap();
        assert_eq!(parsed, ConnectionDegree::Unknown);
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            EnrichmentStatus::Pending,
            EnrichmentStatus::Completed,
            EnrichmentStatus::Failed,
        ] {
            let parsed: EnrichmentStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("done".parse::<EnrichmentStatus>().is_err());
    }

    #[test]
    fn failed_patch_leaves_enrichment_fields_alone() {
        let patch = LeadPatch::failed(2, Utc::now());
        assert_eq!(patch.enrichment_status, Some(EnrichmentStatus::Failed));
        assert!(patch.email.is_none());
        assert!(patch.phone.is_none());
        assert!(patch.hierarchy.is_none());
        assert!(patch.email_template.is_none());
        assert!(patch.enriched_at.is_none());
    }

    #[test]
    fn completed_patch_writes_every_enrichment_field() {
        let fields = EnrichedFields {
            email: None,
            phone: Some("+1-555-0100".into()),
            hierarchy: "VP, reports to CTO".into(),
            email_template: "Subject: Hi\n\nBody".into(),
            enriched_at: Utc::now(),
        };
        let patch = LeadPatch::completed(fields, 1);
        assert_eq!(patch.email, Some(None));
        assert_eq!(patch.phone, Some(Some("+1-555-0100".into())));
        assert!(matches!(patch.hierarchy, Some(Some(_))));
        assert!(matches!(patch.email_template, Some(Some(_))));
        assert!(matches!(patch.enriched_at, Some(Some(_))));
        assert!(!patch.is_empty());
        assert!(LeadPatch::default().is_empty());
    }

    #[test]
    fn new_lead_constructors() {
        let failed = NewLead::failed(LeadProfile::named("Ada"));
        assert_eq!(failed.status, EnrichmentStatus::Failed);
        assert!(failed.enrichment.is_none());
        assert_eq!(failed.attempts, 1);

        let pending = NewLead::pending(LeadProfile::named("Ada"));
        assert_eq!(pending.attempts, 0);
    }
}
