//! SQL migration definitions for the Navigator database.
//!
//! Migrations are applied in order on database open. Each migration records
//! its version in `schema_migrations` as its final statement.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: leads, notes",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Prospects and their enrichment state
CREATE TABLE IF NOT EXISTS leads (
    id                TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    title             TEXT,
    company           TEXT,
    location          TEXT,
    linkedin_url      TEXT,
    connection_degree TEXT,
    email             TEXT,
    phone             TEXT,
    hierarchy         TEXT,
    email_template    TEXT,
    enrichment_status TEXT NOT NULL DEFAULT 'pending'
        CHECK (enrichment_status IN ('pending', 'completed', 'failed')),
    enriched_at       TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_leads_status ON leads(enrichment_status, created_at);
CREATE INDEX IF NOT EXISTS idx_leads_company ON leads(company);

-- Free-text notes, owned by the presentation layer
CREATE TABLE IF NOT EXISTS notes (
    id         TEXT PRIMARY KEY,
    lead_id    TEXT NOT NULL REFERENCES leads(id) ON DELETE CASCADE,
    content    TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notes_lead_id ON notes(lead_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Enrichment attempt tracking",
            sql: r#"
ALTER TABLE leads ADD COLUMN enrichment_attempts INTEGER NOT NULL DEFAULT 0;
ALTER TABLE leads ADD COLUMN last_attempt_at TEXT;

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
