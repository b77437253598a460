//! Application configuration for Navigator.
//!
//! User config lives at `~/.navigator/navigator.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{NavigatorError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "navigator.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".navigator";

// ---------------------------------------------------------------------------
// Config structs (matching navigator.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Which provider implementations to wire in.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Contact lookup API settings.
    #[serde(default)]
    pub contact_api: ContactApiConfig,

    /// Generation (Anthropic Messages) API settings.
    #[serde(default)]
    pub generation_api: GenerationApiConfig,

    /// Deterministic stub provider settings.
    #[serde(default)]
    pub stub: StubConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Lead database location. A leading `~/` expands to the home directory.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// How many pending leads one batch run picks up.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: u32,

    /// Per-call timeout for outbound provider requests.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            batch_limit: default_batch_limit(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl DefaultsConfig {
    /// Resolved database path with `~/` expanded.
    pub fn database_path(&self) -> Result<PathBuf> {
        expand_home(&self.database_path)
    }
}

fn default_database_path() -> String {
    "~/.navigator/navigator.db".into()
}
fn default_batch_limit() -> u32 {
    10
}
fn default_request_timeout() -> u64 {
    30
}

/// Provider implementation selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Real HTTP providers; API keys must be present.
    #[default]
    Live,
    /// Deterministic stand-ins driven by `[stub]`.
    Stub,
}

/// `[providers]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub mode: ProviderMode,
}

/// `[contact_api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactApiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_contact_key_env")]
    pub api_key_env: String,

    /// Lookup endpoint.
    #[serde(default = "default_contact_endpoint")]
    pub endpoint: String,
}

impl Default for ContactApiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_contact_key_env(),
            endpoint: default_contact_endpoint(),
        }
    }
}

fn default_contact_key_env() -> String {
    "CIRO_API_KEY".into()
}
fn default_contact_endpoint() -> String {
    "https://api.ciro.ai/enrich".into()
}

/// `[generation_api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationApiConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_generation_key_env")]
    pub api_key_env: String,

    /// Messages endpoint.
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,

    /// Model ID.
    #[serde(default = "default_model")]
    pub model: String,

    /// Completion token cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Value of the `anthropic-version` header.
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for GenerationApiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_generation_key_env(),
            endpoint: default_generation_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
        }
    }
}

fn default_generation_key_env() -> String {
    "CLAUDE_API_KEY".into()
}
fn default_generation_endpoint() -> String {
    "https://api.anthropic.com/v1/messages".into()
}
fn default_model() -> String {
    "claude-3-opus-20240229".into()
}
fn default_max_tokens() -> u32 {
    500
}
fn default_api_version() -> String {
    "2023-06-01".into()
}

/// `[stub]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StubConfig {
    /// Phone number every successful stub lookup returns.
    #[serde(default = "default_stub_phone")]
    pub phone: String,

    /// Lead names (case-insensitive) whose lookup fails.
    #[serde(default)]
    pub fail_lookup_for: Vec<String>,

    /// Lead names (case-insensitive) whose generation fails.
    #[serde(default)]
    pub fail_generation_for: Vec<String>,

    /// Fail every lookup.
    #[serde(default)]
    pub fail_all_lookups: bool,

    /// Fail every generation call.
    #[serde(default)]
    pub fail_all_generation: bool,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            phone: default_stub_phone(),
            fail_lookup_for: Vec::new(),
            fail_generation_for: Vec::new(),
            fail_all_lookups: false,
            fail_all_generation: false,
        }
    }
}

fn default_stub_phone() -> String {
    "+1-555-0100".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.navigator/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| NavigatorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.navigator/navigator.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| NavigatorError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        NavigatorError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| NavigatorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| NavigatorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| NavigatorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject values no run could work with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.defaults.batch_limit == 0 {
        return Err(NavigatorError::config("defaults.batch_limit must be at least 1"));
    }
    if config.defaults.request_timeout_secs == 0 {
        return Err(NavigatorError::config(
            "defaults.request_timeout_secs must be at least 1",
        ));
    }
    for (key, endpoint) in [
        ("contact_api.endpoint", &config.contact_api.endpoint),
        ("generation_api.endpoint", &config.generation_api.endpoint),
    ] {
        Url::parse(endpoint)
            .map_err(|e| NavigatorError::config(format!("{key} '{endpoint}' is not a URL: {e}")))?;
    }
    Ok(())
}

/// Read an API key from the env var named in config.
pub fn resolve_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(NavigatorError::config(format!(
            "API key not found. Set the {var_name} environment variable, \
             or set `providers.mode = \"stub\"` for offline runs."
        ))),
    }
}

fn expand_home(raw: &str) -> Result<PathBuf> {
    match raw.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| NavigatorError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("database_path"));
        assert!(toml_str.contains("CIRO_API_KEY"));
        assert!(toml_str.contains("CLAUDE_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.batch_limit, 10);
        assert_eq!(parsed.providers.mode, ProviderMode::Live);
        assert_eq!(parsed.generation_api.max_tokens, 500);
    }

    #[test]
    fn config_with_stub_section() {
        let toml_str = r#"
[providers]
mode = "stub"

[stub]
fail_lookup_for = ["Grace Hopper"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.providers.mode, ProviderMode::Stub);
        assert_eq!(config.stub.fail_lookup_for, vec!["Grace Hopper".to_string()]);
        assert_eq!(config.stub.phone, "+1-555-0100");
        assert!(!config.stub.fail_all_lookups);
    }

    #[test]
    fn validation_rejects_zero_limit_and_bad_endpoint() {
        let mut config = AppConfig::default();
        assert!(validate_config(&config).is_ok());

        config.defaults.batch_limit = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.contact_api.endpoint = "not a url".into();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("contact_api.endpoint"));
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!("nav_cfg_{}.toml", uuid::Uuid::now_v7()));
        std::fs::write(&path, "[defaults]\nbatch_limit = 25\n").unwrap();
        let config = load_config_from(&path).expect("load");
        assert_eq!(config.defaults.batch_limit, 25);
        assert_eq!(config.defaults.request_timeout_secs, 30);
    }

    #[test]
    fn absolute_database_path_is_kept() {
        let defaults = DefaultsConfig {
            database_path: "/tmp/leads.db".into(),
            ..Default::default()
        };
        assert_eq!(defaults.database_path().unwrap(), PathBuf::from("/tmp/leads.db"));
    }

    #[test]
    fn api_key_resolution() {
        // Use a unique env var name to avoid interfering with other tests
        let result = resolve_api_key("NAV_TEST_NONEXISTENT_KEY_12345");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
