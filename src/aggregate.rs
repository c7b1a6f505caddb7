//! Fan-out aggregation across all configured providers.
//!
//! Every provider call is spawned onto the runtime before any of them is
//! awaited, so calls overlap and a slow provider never delays the start of
//! another. Results are merged back in declaration order, not arrival order.

use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::provider::{ProviderResult, ProviderSpec};

/// Owns the shared HTTP client and the read-only provider list.
#[derive(Debug, Clone)]
pub struct Aggregator {
    client: Client,
    providers: Arc<[ProviderSpec]>,
    timeout: Duration,
}

impl Aggregator {
    pub fn new(client: Client, providers: Vec<ProviderSpec>, timeout: Duration) -> Self {
        Self {
            client,
            providers: providers.into(),
            timeout,
        }
    }

    /// Build the client and provider list from configuration.
    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let providers = config.providers.iter().map(ProviderSpec::from).collect();

        Ok(Self::new(client, providers, config.server.request_timeout()))
    }

    pub fn providers(&self) -> &[ProviderSpec] {
        &self.providers
    }

    /// Call every provider once and collect the results in declaration order.
    ///
    /// Provider failures are values inside the returned list. `Err` only
    /// signals that a call task died unexpectedly. Spawned calls keep running
    /// even if the returned future is dropped.
    pub async fn collect(&self, prompt: &str) -> Result<Vec<ProviderResult>> {
        let prompt: Arc<str> = Arc::from(prompt);

        let handles: Vec<_> = self
            .providers
            .iter()
            .cloned()
            .map(|spec| {
                let client = self.client.clone();
                let prompt = Arc::clone(&prompt);
                let timeout = self.timeout;
                tokio::spawn(async move { spec.call(&client, &prompt, timeout).await })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| {
                joined.map_err(|e| {
                    tracing::error!(error = %e, "Provider task did not complete");
                    Error::Internal(format!("provider task failed: {}", e))
                })
            })
            .collect()
    }

    /// Call every provider and render the composite text.
    pub async fn aggregate(&self, prompt: &str) -> Result<String> {
        let results = self.collect(prompt).await?;

        let failed = results.iter().filter(|r| r.error).count();
        tracing::info!(
            providers = results.len(),
            failed,
            "Aggregation finished"
        );

        Ok(format_composite(&results))
    }
}

/// Render results as one section per provider, in the order given.
///
/// Each section starts with `--- [<name> (<model>)] ---` on its own line;
/// sections are joined with a newline.
pub fn format_composite(results: &[ProviderResult]) -> String {
    results
        .iter()
        .map(|result| {
            let header = format!("--- [{} ({})] ---\n", result.provider, result.model);
            if result.error {
                format!("{}Request failed: {}\n", header, result.content)
            } else {
                format!("{}{}", header, result.content)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
