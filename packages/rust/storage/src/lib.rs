//! libSQL storage layer for leads and notes.
//!
//! The [`Storage`] struct wraps a local libSQL database and is the record
//! store the enrichment pipeline reads from and writes back to.
//!
//! **Write rules:**
//! - every mutation is a single SQL statement, so a reader never observes a
//!   half-applied enrichment outcome
//! - [`Storage::open_readonly`] handles reject all writes

mod migrations;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database, Value, params};
use navigator_shared::{
    ConnectionDegree, EnrichmentStatus, Lead, LeadFilter, LeadId, LeadPatch, LeadSummary,
    NavigatorError, NewLead, Note, Result, StatusCounts,
};
use tracing::debug;
use uuid::Uuid;

/// Column list shared by every lead query; [`row_to_lead`] depends on this order.
const LEAD_COLUMNS: &str = "id, name, title, company, location, linkedin_url, connection_degree, \
     email, phone, hierarchy, email_template, enrichment_status, enriched_at, \
     enrichment_attempts, last_attempt_at, created_at, updated_at";

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| NavigatorError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;

        let conn = db.connect().map_err(db_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.enable_foreign_keys().await?;
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode (listing and inspection).
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;

        let conn = db.connect().map_err(db_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    async fn enable_foreign_keys(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        NavigatorError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    pub async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(NavigatorError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lead operations
    // -----------------------------------------------------------------------

    /// Create a lead in one insert, enrichment payload included.
    pub async fn insert_lead(&self, lead: &NewLead) -> Result<Lead> {
        self.check_writable()?;
        let id = LeadId::new();
        let now = timestamp(Utc::now());
        let profile = &lead.profile;
        let enrichment = lead.enrichment.as_ref();
        let last_attempt = (lead.attempts > 0).then(|| now.clone());

        self.conn
            .execute(
                "INSERT INTO leads (id, name, title, company, location, linkedin_url, connection_degree,
                                    email, phone, hierarchy, email_template, enrichment_status, enriched_at,
                                    enrichment_attempts, last_attempt_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    id.to_string(),
                    profile.name.as_str(),
                    profile.title.as_deref(),
                    profile.company.as_deref(),
                    profile.location.as_deref(),
                    profile.linkedin_url.as_deref(),
                    profile.connection_degree.map(|d| d.as_str()),
                    enrichment.and_then(|f| f.email.as_deref()),
                    enrichment.and_then(|f| f.phone.as_deref()),
                    enrichment.map(|f| f.hierarchy.as_str()),
                    enrichment.map(|f| f.email_template.as_str()),
                    lead.status.as_str(),
                    enrichment.map(|f| timestamp(f.enriched_at)),
                    i64::from(lead.attempts),
                    last_attempt,
                    now.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(db_err)?;

        debug!(lead_id = %id, status = %lead.status, "lead inserted");
        self.find_lead(&id).await
    }

    /// Get a lead by ID.
    pub async fn get_lead(&self, id: &LeadId) -> Result<Option<Lead>> {
        let sql = format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1");
        let mut rows = self
            .conn
            .query(&sql, params![id.to_string()])
            .await
            .map_err(db_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_lead(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    /// Get a lead by ID, failing with `NotFound` if absent.
    pub async fn find_lead(&self, id: &LeadId) -> Result<Lead> {
        self.get_lead(id)
            .await?
            .ok_or_else(|| NavigatorError::not_found("lead", id.to_string()))
    }

    /// Apply a partial update in one statement and return the stored row.
    pub async fn update_lead(&self, id: &LeadId, patch: &LeadPatch) -> Result<Lead> {
        self.check_writable()?;
        if patch.is_empty() {
            return self.find_lead(id).await;
        }

        let mut assignments: Vec<(&'static str, Value)> = Vec::new();
        if let Some(name) = &patch.name {
            assignments.push(("name", Value::Text(name.clone())));
        }
        if let Some(title) = &patch.title {
            assignments.push(("title", text(title.as_deref())));
        }
        if let Some(company) = &patch.company {
            assignments.push(("company", text(company.as_deref())));
        }
        if let Some(location) = &patch.location {
            assignments.push(("location", text(location.as_deref())));
        }
        if let Some(url) = &patch.linkedin_url {
            assignments.push(("linkedin_url", text(url.as_deref())));
        }
        if let Some(degree) = &patch.connection_degree {
            assignments.push(("connection_degree", text(degree.map(|d| d.as_str()))));
        }
        if let Some(email) = &patch.email {
            assignments.push(("email", text(email.as_deref())));
        }
        if let Some(phone) = &patch.phone {
            assignments.push(("phone", text(phone.as_deref())));
        }
        if let Some(hierarchy) = &patch.hierarchy {
            assignments.push(("hierarchy", text(hierarchy.as_deref())));
        }
        if let Some(template) = &patch.email_template {
            assignments.push(("email_template", text(template.as_deref())));
        }
        if let Some(status) = patch.enrichment_status {
            assignments.push(("enrichment_status", Value::Text(status.as_str().into())));
        }
        if let Some(at) = patch.enriched_at {
            assignments.push(("enriched_at", text(at.map(timestamp).as_deref())));
        }
        if let Some(attempts) = patch.enrichment_attempts {
            assignments.push(("enrichment_attempts", Value::Integer(i64::from(attempts))));
        }
        if let Some(at) = patch.last_attempt_at {
            assignments.push(("last_attempt_at", text(at.map(timestamp).as_deref())));
        }
        assignments.push(("updated_at", Value::Text(timestamp(Utc::now()))));

        let set_clause = assignments
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE leads SET {set_clause} WHERE id = ?{}",
            assignments.len() + 1
        );

        let mut values: Vec<Value> = assignments.into_iter().map(|(_, v)| v).collect();
        values.push(Value::Text(id.to_string()));

        let affected = self
            .conn
            .execute(&sql, libsql::params::Params::Positional(values))
            .await
            .map_err(db_err)?;

        if affected == 0 {
            return Err(NavigatorError::not_found("lead", id.to_string()));
        }
        self.find_lead(id).await
    }

    /// Up to `limit` pending leads, oldest first.
    pub async fn list_pending(&self, limit: u32) -> Result<Vec<Lead>> {
        let sql = format!(
            "SELECT {LEAD_COLUMNS} FROM leads
             WHERE enrichment_status = 'pending'
             ORDER BY created_at ASC, rowid ASC
             LIMIT ?1"
        );
        self.query_leads(&sql, params![i64::from(limit)]).await
    }

    /// All leads at an exact company name, oldest first.
    pub async fn list_by_company(&self, company: &str) -> Result<Vec<Lead>> {
        let sql = format!(
            "SELECT {LEAD_COLUMNS} FROM leads
             WHERE company = ?1
             ORDER BY created_at ASC, rowid ASC"
        );
        self.query_leads(&sql, params![company]).await
    }

    /// Leads matching `filter`, newest first, with note counts.
    pub async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<LeadSummary>> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(company) = &filter.company {
            values.push(Value::Text(company.clone()));
            conditions.push("company = ?1");
        }
        match filter.enriched {
            Some(true) => conditions.push("email IS NOT NULL"),
            Some(false) => conditions.push("email IS NULL"),
            None => {}
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!(
            "SELECT {LEAD_COLUMNS},
                    (SELECT COUNT(*) FROM notes n WHERE n.lead_id = leads.id) AS note_count
             FROM leads {where_clause}
             ORDER BY created_at DESC, rowid DESC"
        );

        let mut rows = self
            .conn
            .query(&sql, libsql::params::Params::Positional(values))
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            let note_count: i64 = row.get(17).map_err(db_err)?;
            results.push(LeadSummary {
                lead: row_to_lead(&row)?,
                note_count: note_count as u32,
            });
        }
        Ok(results)
    }

    /// Lead counts per enrichment status.
    pub async fn count_by_status(&self) -> Result<StatusCounts> {
        let mut rows = self
            .conn
            .query(
                "SELECT enrichment_status, COUNT(*) FROM leads GROUP BY enrichment_status",
                params![],
            )
            .await
            .map_err(db_err)?;

        let mut counts = StatusCounts::default();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            let status: String = row.get(0).map_err(db_err)?;
            let count = row.get::<i64>(1).map_err(db_err)? as u32;
            match status.parse::<EnrichmentStatus>() {
                Ok(EnrichmentStatus::Pending) => counts.pending = count,
                Ok(EnrichmentStatus::Completed) => counts.completed = count,
                Ok(EnrichmentStatus::Failed) => counts.failed = count,
                Err(e) => return Err(NavigatorError::Storage(e)),
            }
        }
        Ok(counts)
    }

    /// Delete a lead; its notes go with it.
    pub async fn delete_lead(&self, id: &LeadId) -> Result<()> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute("DELETE FROM leads WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(db_err)?;
        if affected == 0 {
            return Err(NavigatorError::not_found("lead", id.to_string()));
        }
        Ok(())
    }

    async fn query_leads(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Lead>> {
        let mut rows = self.conn.query(sql, params).await.map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_lead(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Note operations
    // -----------------------------------------------------------------------

    /// Attach a note to an existing lead.
    pub async fn insert_note(&self, lead_id: &LeadId, content: &str) -> Result<Note> {
        self.check_writable()?;
        self.find_lead(lead_id).await?;

        let id = Uuid::now_v7().to_string();
        let now = timestamp(Utc::now());
        self.conn
            .execute(
                "INSERT INTO notes (id, lead_id, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id.as_str(), lead_id.to_string(), content, now.as_str(), now.as_str()],
            )
            .await
            .map_err(db_err)?;

        self.find_note(&id).await
    }

    /// Get a note by ID, failing with `NotFound` if absent.
    pub async fn find_note(&self, note_id: &str) -> Result<Note> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, lead_id, content, created_at, updated_at FROM notes WHERE id = ?1",
                params![note_id],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await {
            Ok(Some(row)) => row_to_note(&row),
            Ok(None) => Err(NavigatorError::not_found("note", note_id)),
            Err(e) => Err(db_err(e)),
        }
    }

    /// Notes for a lead, newest first.
    pub async fn list_notes(&self, lead_id: &LeadId) -> Result<Vec<Note>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, lead_id, content, created_at, updated_at
                 FROM notes WHERE lead_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
                params![lead_id.to_string()],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_note(&row)?);
        }
        Ok(results)
    }

    /// Replace a note's content.
    pub async fn update_note(&self, note_id: &str, content: &str) -> Result<Note> {
        self.check_writable()?;
        let now = timestamp(Utc::now());
        let affected = self
            .conn
            .execute(
                "UPDATE notes SET content = ?1, updated_at = ?2 WHERE id = ?3",
                params![content, now.as_str(), note_id],
            )
            .await
            .map_err(db_err)?;
        if affected == 0 {
            return Err(NavigatorError::not_found("note", note_id));
        }
        self.find_note(note_id).await
    }

    /// Delete a note by ID.
    pub async fn delete_note(&self, note_id: &str) -> Result<()> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1", params![note_id])
            .await
            .map_err(db_err)?;
        if affected == 0 {
            return Err(NavigatorError::not_found("note", note_id));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn db_err(e: libsql::Error) -> NavigatorError {
    NavigatorError::Storage(e.to_string())
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn text(value: Option<&str>) -> Value {
    match value {
        Some(s) => Value::Text(s.to_string()),
        None => Value::Null,
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| NavigatorError::Storage(format!("invalid date '{s}': {e}")))
}

fn optional_timestamp(row: &libsql::Row, idx: i32) -> Result<Option<DateTime<Utc>>> {
    match row.get::<String>(idx).ok() {
        Some(s) => Ok(Some(parse_timestamp(&s)?)),
        None => Ok(None),
    }
}

/// Convert a database row (selected with [`LEAD_COLUMNS`]) to a [`Lead`].
fn row_to_lead(row: &libsql::Row) -> Result<Lead> {
    let id: String = row.get(0).map_err(db_err)?;
    let status: String = row.get(11).map_err(db_err)?;
    let created_at: String = row.get(15).map_err(db_err)?;
    let updated_at: String = row.get(16).map_err(db_err)?;

    Ok(Lead {
        id: id
            .parse()
            .map_err(|e| NavigatorError::Storage(format!("invalid lead id '{id}': {e}")))?,
        name: row.get::<String>(1).map_err(db_err)?,
        title: row.get::<String>(2).ok(),
        company: row.get::<String>(3).ok(),
        location: row.get::<String>(4).ok(),
        linkedin_url: row.get::<String>(5).ok(),
        connection_degree: row
            .get::<String>(6)
            .ok()
            .map(|s| ConnectionDegree::parse(&s)),
        email: row.get::<String>(7).ok(),
        phone: row.get::<String>(8).ok(),
        hierarchy: row.get::<String>(9).ok(),
        email_template: row.get::<String>(10).ok(),
        enrichment_status: status.parse().map_err(NavigatorError::Storage)?,
        enriched_at: optional_timestamp(row, 12)?,
        enrichment_attempts: row.get::<i64>(13).unwrap_or(0) as u32,
        last_attempt_at: optional_timestamp(row, 14)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn row_to_note(row: &libsql::Row) -> Result<Note> {
    let lead_id: String = row.get(1).map_err(db_err)?;
    let created_at: String = row.get(3).map_err(db_err)?;
    let updated_at: String = row.get(4).map_err(db_err)?;
    Ok(Note {
        id: row.get::<String>(0).map_err(db_err)?,
        lead_id: lead_id
            .parse()
            .map_err(|e| NavigatorError::Storage(format!("invalid lead id '{lead_id}': {e}")))?,
        content: row.get::<String>(2).map_err(db_err)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
