use serde::Deserialize;
use std::time::Duration;

use crate::services::provider::{ProviderConfig, DEFAULT_SUBMIT_URL};
use crate::services::reconcile::PollPolicy;
use crate::services::status_map::{StatusMapError, StatusMapper};

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string for the poll queue
    pub redis_url: String,

    /// ApyHub API token. Submissions and polls fail with a configuration
    /// error while this is unset.
    #[serde(default)]
    pub apy_api_key: Option<String>,

    /// Résumé parse submission endpoint
    #[serde(default = "default_submit_url")]
    pub apy_submit_url: String,

    /// Language hint sent with every submission
    #[serde(default = "default_language")]
    pub parse_language: String,

    #[serde(default = "default_submit_timeout_secs")]
    pub submit_timeout_secs: u64,

    #[serde(default = "default_status_timeout_secs")]
    pub status_timeout_secs: u64,

    /// Background polls per job before it is marked failed
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Extra provider status entries, e.g. "ok=done,waiting=pending"
    #[serde(default)]
    pub provider_status_map: Option<String>,

    /// Jobs polled concurrently by one worker process
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Upload size limit in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// R2 bucket name
    pub r2_bucket: String,

    /// R2 access key ID (S3-compatible)
    pub r2_access_key: String,

    /// R2 secret access key (S3-compatible)
    pub r2_secret_key: String,

    /// R2 endpoint URL
    pub r2_endpoint: String,

    /// AES-256-GCM encryption key (base64-encoded, 32 bytes)
    pub encryption_key: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_submit_url() -> String {
    DEFAULT_SUBMIT_URL.to_string()
}

fn default_language() -> String {
    "English".to_string()
}

fn default_submit_timeout_secs() -> u64 {
    15
}

fn default_status_timeout_secs() -> u64 {
    10
}

fn default_poll_max_attempts() -> u32 {
    10
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_worker_concurrency() -> usize {
    8
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            api_key: self
                .apy_api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            submit_url: self.apy_submit_url.clone(),
            language: self.parse_language.clone(),
            submit_timeout: Duration::from_secs(self.submit_timeout_secs),
            status_timeout: Duration::from_secs(self.status_timeout_secs),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.poll_max_attempts.max(1),
            interval: Duration::from_secs(self.poll_interval_secs),
        }
    }

    /// Default provider vocabulary plus any configured overrides.
    pub fn status_mapper(&self) -> Result<StatusMapper, StatusMapError> {
        match &self.provider_status_map {
            Some(overrides) => StatusMapper::default().with_overrides(overrides),
            None => Ok(StatusMapper::default()),
        }
    }
}
