use std::time::Duration;

use serde::Deserialize;

use crate::sync::BackoffPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_remote_base_url")]
    pub remote_base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_sync_backoff_ms")]
    pub sync_backoff_ms: u64,
    #[serde(default = "default_sync_backoff_cap_ms")]
    pub sync_backoff_cap_ms: u64,
    #[serde(default = "default_probe_url")]
    pub probe_url: String,
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
}

fn default_database_url() -> String { "verifai_inbox.db".into() }
fn default_pool_size() -> u32 { 4 }
fn default_remote_base_url() -> String { "http://localhost:8080".into() }
fn default_page_size() -> u32 { 20 }
fn default_sync_backoff_ms() -> u64 { 10_000 }
fn default_sync_backoff_cap_ms() -> u64 { 300_000 }
fn default_probe_url() -> String { "http://localhost:8080/health".into() }
fn default_probe_interval_ms() -> u64 { 15_000 }

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("VERIFAI_INBOX").separator("__"))
            .build()?;
        Ok(config.try_deserialize().unwrap_or_else(|_| Self {
            database_url: default_database_url(),
            pool_size: default_pool_size(),
            remote_base_url: default_remote_base_url(),
            page_size: default_page_size(),
            sync_backoff_ms: default_sync_backoff_ms(),
            sync_backoff_cap_ms: default_sync_backoff_cap_ms(),
            probe_url: default_probe_url(),
            probe_interval_ms: default_probe_interval_ms(),
        }))
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial: Duration::from_millis(self.sync_backoff_ms),
            max: Duration::from_millis(self.sync_backoff_cap_ms),
        }
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }
}
