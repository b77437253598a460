//! External provider adapters for lead enrichment.
//!
//! Two seams, each a `Send + Sync` trait object:
//! - [`ContactResolver`] finds an email address and phone number
//! - [`AugmentationGenerator`] infers hierarchy and drafts outreach email
//!
//! Live HTTP implementations and deterministic stubs are chosen once, at
//! configuration time, by [`select_providers`].

mod contact;
mod generation;
mod prompts;
mod reply;
mod stub;

use std::sync::Arc;
use std::time::Duration;

use navigator_shared::{AppConfig, NavigatorError, ProviderMode, Result};
use reqwest::Client;
use tracing::info;

pub use contact::{CiroResolver, ContactInfo, ContactQuery, ContactResolver};
pub use generation::{
    AnthropicGenerator, AugmentRequest, Augmentation, AugmentationGenerator, EmailRequest,
    ReplyQuality,
};
pub use stub::{StubContactResolver, StubGenerator};

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("Navigator/", env!("CARGO_PKG_VERSION"));

/// The provider pair the pipeline runs against.
#[derive(Clone)]
pub struct Providers {
    pub resolver: Arc<dyn ContactResolver>,
    pub generator: Arc<dyn AugmentationGenerator>,
}

impl Providers {
    pub fn new(
        resolver: Arc<dyn ContactResolver>,
        generator: Arc<dyn AugmentationGenerator>,
    ) -> Self {
        Self {
            resolver,
            generator,
        }
    }

    /// `resolver+generator` names, for logs and status output.
    pub fn describe(&self) -> String {
        format!("{}+{}", self.resolver.name(), self.generator.name())
    }
}

/// Wire providers according to `providers.mode`.
///
/// Live mode fails with a config error when an API key env var is unset.
pub fn select_providers(config: &AppConfig) -> Result<Providers> {
    let providers = match config.providers.mode {
        ProviderMode::Live => Providers::new(
            Arc::new(CiroResolver::from_config(config)?),
            Arc::new(AnthropicGenerator::from_config(config)?),
        ),
        ProviderMode::Stub => Providers::new(
            Arc::new(StubContactResolver::new(&config.stub)),
            Arc::new(StubGenerator::new(&config.stub)),
        ),
    };
    info!(providers = %providers.describe(), "providers selected");
    Ok(providers)
}

/// Build a reqwest client with the per-call timeout.
fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| NavigatorError::config(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_mode_selects_stubs() {
        let mut config = AppConfig::default();
        config.providers.mode = ProviderMode::Stub;
        let providers = select_providers(&config).expect("stub providers");
        assert_eq!(providers.describe(), "stub+stub");
    }

    #[test]
    fn live_mode_without_key_is_config_error() {
        let mut config = AppConfig::default();
        config.contact_api.api_key_env = "NAV_TEST_UNSET_CONTACT_KEY_98765".into();
        let err = select_providers(&config).err().expect("missing key must fail");
        assert!(matches!(err, NavigatorError::Config { .. }));
        assert!(err.to_string().contains("NAV_TEST_UNSET_CONTACT_KEY_98765"));
    }
}
