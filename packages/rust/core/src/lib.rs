//! Enrichment pipeline for Navigator.
//!
//! This crate ties the record store and the provider seams together into
//! the pipeline entry points: single-lead enrichment, pending batches,
//! bulk ingestion, email drafting and profile edits.

pub mod batch;
pub mod email;
pub mod enrichment;
pub mod ingest;
pub mod profile;

pub use batch::{BatchProgress, BatchResult, FailedRecord, SilentProgress, run_pending};
pub use email::{EmailDraft, draft_email, draft_email_with, save_email};
pub use enrichment::enrich_lead;
pub use ingest::{IngestResult, RawRow, ingest_rows, normalize_row};
pub use profile::{ProfileEdit, edit_profile};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use navigator_providers::{Providers, StubContactResolver, StubGenerator};
    use navigator_shared::StubConfig;
    use navigator_storage::Storage;

    /// Fresh on-disk database in the temp dir.
    pub async fn test_storage() -> Storage {
        let path = std::env::temp_dir().join(format!("nav_core_{}.db", uuid::Uuid::now_v7()));
        Storage::open(&path).await.expect("open test db")
    }

    /// Stub providers plus handles for reading their call counters.
    pub fn stub_providers(
        config: StubConfig,
    ) -> (Providers, Arc<StubContactResolver>, Arc<StubGenerator>) {
        let resolver = Arc::new(StubContactResolver::new(&config));
        let generator = Arc::new(StubGenerator::new(&config));
        let providers = Providers::new(resolver.clone(), generator.clone());
        (providers, resolver, generator)
    }
}
