//! Configuration parsing and validation for omnibus.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::provider::Vendor;

/// Root configuration structure, with every credential already resolved.
///
/// Built only through [`RawConfig`], so `${VAR}` references never survive
/// into a loaded config.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub providers: Vec<ProviderConfig>,
    pub logging: LoggingConfig,
}

/// HTTP server and response behaviour.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:8090")
    pub listen: String,
    /// Bearer token required from callers. Auth is off when unset.
    pub master_key: Option<ApiKey>,
    /// Timeout applied to each upstream provider call
    pub request_timeout_secs: u64,
    /// Pause between characters of a synthetic stream
    pub char_delay_ms: u64,
    /// Model name reported in every response
    pub virtual_model: String,
    /// Models listed by GET /v1/models
    pub known_models: Vec<String>,
}

fn default_listen() -> String {
    "127.0.0.1:8090".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_char_delay_ms() -> u64 {
    10
}

fn default_virtual_model() -> String {
    "omnibus".to_string()
}

fn default_known_models() -> Vec<String> {
    vec![
        "omnibus".to_string(),
        "command-r-08-2024".to_string(),
        "jamba-mini".to_string(),
        "mistral-small-latest".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            master_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            char_delay_ms: default_char_delay_ms(),
            virtual_model: default_virtual_model(),
            known_models: default_known_models(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn char_delay(&self) -> Duration {
        Duration::from_millis(self.char_delay_ms)
    }
}

/// API key wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
///
/// The value is only reachable through `.expose_secret()`, so every place
/// a credential leaves the process can be found with a grep.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw key value.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

/// How a credential was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySource {
    /// Key was a literal string in config (no ${} references)
    Literal,
    /// Key contained ${VAR} references expanded from environment
    EnvExpanded,
    /// Key was auto-discovered from convention env var (holds var name)
    Convention(String),
    /// No key available
    None,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Literal => write!(f, "config-literal"),
            KeySource::EnvExpanded => write!(f, "env-expanded"),
            KeySource::Convention(var) => write!(f, "convention ({})", var),
            KeySource::None => write!(f, "none"),
        }
    }
}

/// Upstream provider configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Display name, used in section headers
    pub name: String,
    /// Which request/response dialect the upstream speaks
    pub vendor: Vendor,
    /// Model identifier sent upstream
    pub model: String,
    /// Full endpoint URL
    pub url: String,
    /// Bearer credential for the upstream
    pub api_key: Option<ApiKey>,
}

/// Built-in vendor set used when no `[[providers]]` are configured.
fn default_raw_providers() -> Vec<RawProviderConfig> {
    vec![
        RawProviderConfig {
            name: "Cohere".to_string(),
            vendor: Vendor::Cohere,
            model: "command-r-08-2024".to_string(),
            url: "https://api.cohere.ai/v1/chat".to_string(),
            api_key: None,
        },
        RawProviderConfig {
            name: "AI21 Labs".to_string(),
            vendor: Vendor::Ai21,
            model: "jamba-mini".to_string(),
            url: "https://api.ai21.com/studio/v1/chat/completions".to_string(),
            api_key: None,
        },
        RawProviderConfig {
            name: "Mistral".to_string(),
            vendor: Vendor::Mistral,
            model: "mistral-small-latest".to_string(),
            url: "https://api.mistral.ai/v1/chat/completions".to_string(),
            api_key: None,
        },
    ]
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level for the omnibus target when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, resolving credentials.
    ///
    /// Same as [`Config::from_file_with_env`] without the key-source report.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str(&content)
    }

    /// Parse configuration from a TOML string, resolving credentials.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse_str_with_env(content).map(|(config, _)| config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() {
            tracing::warn!("No providers configured - every answer will be empty");
        }

        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "server.request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.url.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Provider '{}' has empty URL",
                    provider.name
                )));
            }
            if !seen.insert(provider.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Provider '{}' is configured more than once",
                    provider.name
                )));
            }
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable '{var}' not set for '{owner}': {message}")]
    EnvVar {
        var: String,
        owner: String,
        message: String,
    },
}

/// Raw provider config deserialized directly from TOML.
/// api_key is `Option<String>` so it may contain `${VAR}` references not yet expanded.
#[derive(Deserialize)]
pub struct RawProviderConfig {
    name: String,
    vendor: Vendor,
    model: String,
    url: String,
    api_key: Option<String>,
}

/// Raw server section; `master_key` may still hold `${VAR}` references.
#[derive(Deserialize)]
pub struct RawServerConfig {
    #[serde(default = "default_listen")]
    listen: String,
    master_key: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "default_char_delay_ms")]
    char_delay_ms: u64,
    #[serde(default = "default_virtual_model")]
    virtual_model: String,
    #[serde(default = "default_known_models")]
    known_models: Vec<String>,
}

impl Default for RawServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            master_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            char_delay_ms: default_char_delay_ms(),
            virtual_model: default_virtual_model(),
            known_models: default_known_models(),
        }
    }
}

/// Raw configuration deserialized directly from TOML.
/// Credential values may contain `${VAR}` references not yet expanded.
#[derive(Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    server: RawServerConfig,
    #[serde(default = "default_raw_providers")]
    providers: Vec<RawProviderConfig>,
    #[serde(default)]
    logging: LoggingConfig,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            server: RawServerConfig::default(),
            providers: default_raw_providers(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Expand all `${VAR}` references in a string using a custom lookup function.
///
/// Supports multiple `${VAR}` in one string (e.g., `${SCHEME}://${HOST}/v1`).
/// Fails on first missing variable, unclosed `${`, or empty variable name.
fn expand_env_vars_with<F>(input: &str, owner: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains("${") {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let end = after.find('}').ok_or_else(|| ConfigError::EnvVar {
            var: "<unclosed>".to_string(),
            owner: owner.to_string(),
            message: format!("Unclosed '${{' in config value: {}", input),
        })?;

        let var_name = &after[..end];
        if var_name.is_empty() {
            return Err(ConfigError::EnvVar {
                var: "".to_string(),
                owner: owner.to_string(),
                message: "Empty variable name in '${}' reference".to_string(),
            });
        }

        let value = lookup(var_name).ok_or_else(|| ConfigError::EnvVar {
            var: var_name.to_string(),
            owner: owner.to_string(),
            message: format!(
                "Environment variable '{}' is not set (referenced by '{}')",
                var_name, owner
            ),
        })?;

        result.push_str(&value);
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

/// Expand all `${VAR}` references in a string using real environment variables.
fn expand_env_vars(input: &str, owner: &str) -> Result<String, ConfigError> {
    expand_env_vars_with(input, owner, |name| std::env::var(name).ok())
}

/// Environment variable consulted for the master key when the config has none.
pub const MASTER_KEY_ENV_VAR: &str = "OMNIBUS_MASTER_KEY";

/// Derive the convention-based env var name for a provider.
///
/// - "Cohere" -> "OMNIBUS_COHERE_API_KEY"
/// - "AI21 Labs" -> "OMNIBUS_AI21_LABS_API_KEY"
/// - "my-mistral" -> "OMNIBUS_MY_MISTRAL_API_KEY"
pub fn convention_env_var_name(provider_name: &str) -> String {
    let upper_snake = provider_name.to_uppercase().replace(['-', ' '], "_");
    format!("OMNIBUS_{}_API_KEY", upper_snake)
}

/// Resolve one credential: expand `${VAR}`, keep literals, else try `fallback_var`.
///
/// A value that resolves to the empty string counts as no key.
fn resolve_key(
    raw: Option<String>,
    owner: &str,
    fallback_var: &str,
) -> Result<(Option<ApiKey>, KeySource), ConfigError> {
    let resolved = resolve_key_value(raw, owner, fallback_var)?;
    Ok(match resolved {
        (Some(value), source) if !value.is_empty() => (Some(ApiKey::from(value)), source),
        _ => (None, KeySource::None),
    })
}

fn resolve_key_value(
    raw: Option<String>,
    owner: &str,
    fallback_var: &str,
) -> Result<(Option<String>, KeySource), ConfigError> {
    Ok(match raw {
        Some(ref raw_key) if raw_key.contains("${") => {
            let expanded = expand_env_vars(raw_key, owner)?;
            (Some(expanded), KeySource::EnvExpanded)
        }
        Some(raw_key) => (Some(raw_key), KeySource::Literal),
        None => match std::env::var(fallback_var) {
            Ok(value) => (Some(value), KeySource::Convention(fallback_var.to_string())),
            Err(_) => (None, KeySource::None),
        },
    })
}

impl Config {
    /// Convert raw (deserialized) config to final config with env var expansion.
    ///
    /// Returns per-provider key source information alongside the config.
    pub fn from_raw(raw: RawConfig) -> Result<(Self, Vec<(String, KeySource)>), ConfigError> {
        let mut providers = Vec::with_capacity(raw.providers.len());
        let mut key_sources = Vec::with_capacity(raw.providers.len());

        for rp in raw.providers {
            let (api_key, source) =
                resolve_key(rp.api_key, &rp.name, &convention_env_var_name(&rp.name))?;

            key_sources.push((rp.name.clone(), source));

            providers.push(ProviderConfig {
                name: rp.name,
                vendor: rp.vendor,
                model: rp.model,
                url: rp.url,
                api_key,
            });
        }

        let (master_key, _) = resolve_key(raw.server.master_key, "server", MASTER_KEY_ENV_VAR)?;

        let config = Config {
            server: ServerConfig {
                listen: raw.server.listen,
                master_key,
                request_timeout_secs: raw.server.request_timeout_secs,
                char_delay_ms: raw.server.char_delay_ms,
                virtual_model: raw.server.virtual_model,
                known_models: raw.server.known_models,
            },
            providers,
            logging: raw.logging,
        };

        Ok((config, key_sources))
    }

    /// Load configuration from a TOML file with environment variable expansion.
    ///
    /// Reads the file, parses it as `RawConfig`, resolves credentials and
    /// validates the result.
    pub fn from_file_with_env(
        path: impl AsRef<Path>,
    ) -> Result<(Self, Vec<(String, KeySource)>), ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str_with_env(&content)
    }

    /// Same as [`Config::from_file_with_env`] for an in-memory TOML document.
    pub fn parse_str_with_env(
        content: &str,
    ) -> Result<(Self, Vec<(String, KeySource)>), ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
        let (config, key_sources) = Self::from_raw(raw)?;
        config.validate()?;

        Ok((config, key_sources))
    }

    /// Built-in defaults with credentials taken from convention env vars.
    pub fn from_env_defaults() -> Result<(Self, Vec<(String, KeySource)>), ConfigError> {
        let (config, key_sources) = Self::from_raw(RawConfig::default())?;
        config.validate()?;
        Ok((config, key_sources))
    }
}
