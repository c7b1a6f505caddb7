//! Integration tests for the full Config::from_file_with_env pipeline.
//!
//! These tests exercise the end-to-end flow: TOML file -> raw parse -> env var
//! expansion -> final Config with KeySource metadata.
//!
//! Each test uses unique env var names to avoid parallel test interference.

use std::io::Write;

use omnibus::config::{Config, KeySource, MASTER_KEY_ENV_VAR};
use omnibus::provider::Vendor;

/// Write `content` to a fresh temp file and load it.
fn load(content: &str) -> Result<(Config, Vec<(String, KeySource)>), omnibus::config::ConfigError> {
    let mut file = tempfile::NamedTempFile::new().expect("create temp config");
    file.write_all(content.as_bytes()).expect("write temp config");
    Config::from_file_with_env(file.path())
}

fn source_for<'a>(key_sources: &'a [(String, KeySource)], name: &str) -> &'a KeySource {
    key_sources
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, s)| s)
        .unwrap_or_else(|| panic!("Key source for '{}' should exist", name))
}

/// ${VAR} references in api_key are expanded from the environment.
#[test]
fn test_env_expansion_resolves_var() {
    let var_name = "OMNIBUS_E2E_EXPAND_KEY";
    unsafe { std::env::set_var(var_name, "resolved-token") };

    let (config, key_sources) = load(&format!(
        r#"
[[providers]]
name = "env-test"
vendor = "cohere"
model = "command-r-08-2024"
url = "https://example.com/v1/chat"
api_key = "${{{}}}"
"#,
        var_name
    ))
    .expect("config should load");

    assert_eq!(
        config.providers[0].api_key.as_ref().unwrap().expose_secret(),
        "resolved-token"
    );
    assert_eq!(*source_for(&key_sources, "env-test"), KeySource::EnvExpanded);

    unsafe { std::env::remove_var(var_name) };
}

/// Missing env vars produce errors naming the variable and the provider.
#[test]
fn test_env_expansion_missing_var_errors() {
    let var_name = "OMNIBUS_E2E_DEFINITELY_MISSING";
    unsafe { std::env::remove_var(var_name) };

    let err = load(&format!(
        r#"
[[providers]]
name = "missing-test"
vendor = "ai21"
model = "jamba-mini"
url = "https://example.com/v1/chat/completions"
api_key = "${{{}}}"
"#,
        var_name
    ))
    .unwrap_err()
    .to_string();

    assert!(err.contains(var_name), "{}", err);
    assert!(err.contains("missing-test"), "{}", err);
}

/// Convention-based env var discovery works end-to-end.
#[test]
fn test_env_convention_discovers_key() {
    let var_name = "OMNIBUS_CONV_PROVIDER_API_KEY";
    unsafe { std::env::set_var(var_name, "convention-token") };

    let (config, key_sources) = load(
        r#"
[[providers]]
name = "conv-provider"
vendor = "mistral"
model = "mistral-small-latest"
url = "https://example.com/v1/chat/completions"
"#,
    )
    .expect("config should load");

    assert_eq!(
        config.providers[0].api_key.as_ref().unwrap().expose_secret(),
        "convention-token"
    );
    assert_eq!(
        *source_for(&key_sources, "conv-provider"),
        KeySource::Convention(var_name.to_string())
    );

    unsafe { std::env::remove_var(var_name) };
}

/// A provider with no api_key and no convention var has no credential.
#[test]
fn test_env_no_key_produces_none_source() {
    unsafe { std::env::remove_var("OMNIBUS_NOKEY_PROVIDER_API_KEY") };

    let (config, key_sources) = load(
        r#"
[[providers]]
name = "nokey-provider"
vendor = "mistral"
model = "mistral-small-latest"
url = "https://example.com/v1/chat/completions"
"#,
    )
    .expect("config should load");

    assert!(config.providers[0].api_key.is_none());
    assert_eq!(*source_for(&key_sources, "nokey-provider"), KeySource::None);
}

/// Without [[providers]] the three built-in vendors are used, in order.
#[test]
fn test_default_vendors_when_no_providers_section() {
    let (config, key_sources) = load(
        r#"
[server]
listen = "127.0.0.1:19880"
"#,
    )
    .expect("config should load");

    let vendors: Vec<Vendor> = config.providers.iter().map(|p| p.vendor).collect();
    assert_eq!(vendors, vec![Vendor::Cohere, Vendor::Ai21, Vendor::Mistral]);
    assert_eq!(key_sources.len(), 3);
    assert_eq!(config.providers[0].url, "https://api.cohere.ai/v1/chat");
}

/// The master key accepts ${VAR} references like provider keys do.
#[test]
fn test_master_key_expanded() {
    let var_name = "OMNIBUS_E2E_MASTER_SOURCE";
    unsafe { std::env::set_var(var_name, "sk-from-env") };

    let (config, _) = load(&format!(
        r#"
[server]
master_key = "${{{}}}"
"#,
        var_name
    ))
    .expect("config should load");

    assert_eq!(
        config.server.master_key.as_ref().unwrap().expose_secret(),
        "sk-from-env"
    );

    unsafe { std::env::remove_var(var_name) };
}

/// The convention variable name for the master key is stable.
#[test]
fn test_master_key_env_var_name() {
    assert_eq!(MASTER_KEY_ENV_VAR, "OMNIBUS_MASTER_KEY");
}

/// A missing file reports the path.
#[test]
fn test_missing_file_names_path() {
    let err = Config::from_file_with_env("/nonexistent/omnibus.toml")
        .unwrap_err()
        .to_string();
    assert!(err.contains("/nonexistent/omnibus.toml"), "{}", err);
}
