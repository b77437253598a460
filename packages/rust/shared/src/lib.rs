//! Shared types, error model, and configuration for Navigator.
//!
//! This crate is the foundation depended on by all other Navigator crates.
//! It provides:
//! - [`NavigatorError`], the unified error type
//! - Domain types ([`Lead`], [`Note`], [`LeadId`], [`EnrichmentStatus`])
//! - The stored [`EmailTemplate`] format
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod template;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ContactApiConfig, DefaultsConfig, GenerationApiConfig, ProviderMode,
    ProvidersConfig, StubConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, resolve_api_key, validate_config,
};
pub use error::{NavigatorError, Result};
pub use template::EmailTemplate;
pub use types::{
    ConnectionDegree, EnrichedFields, EnrichmentStatus, Lead, LeadFilter, LeadId, LeadPatch,
    LeadProfile, LeadSummary, NewLead, Note, StatusCounts, UNKNOWN_NAME,
};
