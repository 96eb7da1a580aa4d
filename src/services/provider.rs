use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::models::parsing::JobHandle;

pub const DEFAULT_SUBMIT_URL: &str = "https://api.apyhub.com/sharpapi/api/v1/hr/parse_resume";
const TOKEN_HEADER: &str = "apy-token";

/// Connection settings for the parsing provider, injected at construction.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub submit_url: String,
    pub language: String,
    pub submit_timeout: Duration,
    pub status_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            submit_url: DEFAULT_SUBMIT_URL.to_string(),
            language: "English".to_string(),
            submit_timeout: Duration::from_secs(15),
            status_timeout: Duration::from_secs(10),
        }
    }
}

/// Provider-reported job status, before vocabulary mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderStatus {
    pub status: String,
    pub result: Option<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider API key is not configured")]
    MissingCredentials,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed submission response: {0}")]
    MalformedResponse(String),

    #[error("Unexpected status payload: {0}")]
    Protocol(String),
}

/// External résumé parsing capability.
#[async_trait]
pub trait ParsingProvider: Send + Sync {
    /// Submit a document; returns once the provider has created a job.
    async fn submit(&self, document: &[u8], file_name: &str) -> Result<JobHandle, ProviderError>;

    /// Read the current status of a job from its status endpoint.
    async fn fetch_status(&self, status_endpoint: &str) -> Result<ProviderStatus, ProviderError>;
}

/// Client for the ApyHub SharpAPI résumé parser.
pub struct ApyHubClient {
    http: Client,
    config: ProviderConfig,
}

impl ApyHubClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let http = Client::builder().build()?;
        Ok(Self { http, config })
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key().is_ok()
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ProviderError::MissingCredentials)
    }

    fn classify(&self, err: reqwest::Error, timeout: Duration) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(timeout)
        } else {
            ProviderError::Http(err)
        }
    }
}

#[async_trait]
impl ParsingProvider for ApyHubClient {
    async fn submit(&self, document: &[u8], file_name: &str) -> Result<JobHandle, ProviderError> {
        let api_key = self.api_key()?;

        let form = Form::new()
            .part(
                "file",
                Part::bytes(document.to_vec()).file_name(file_name.to_string()),
            )
            .text("language", self.config.language.clone());

        let response = self
            .http
            .post(&self.config.submit_url)
            .header(TOKEN_HEADER, api_key)
            .multipart(form)
            .timeout(self.config.submit_timeout)
            .send()
            .await
            .map_err(|e| self.classify(e, self.config.submit_timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.classify(e, self.config.submit_timeout))?;

        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let handle = parse_submit_body(&body, &self.config.submit_url)?;
        tracing::debug!(job_id = %handle.job_id, "Provider accepted résumé");
        Ok(handle)
    }

    async fn fetch_status(&self, status_endpoint: &str) -> Result<ProviderStatus, ProviderError> {
        let api_key = self.api_key()?;

        let response = self
            .http
            .get(status_endpoint)
            .header(TOKEN_HEADER, api_key)
            .timeout(self.config.status_timeout)
            .send()
            .await
            .map_err(|e| self.classify(e, self.config.status_timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.classify(e, self.config.status_timeout))?;

        if status.is_server_error() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        parse_status_body(&body)
    }
}

#[derive(Deserialize)]
struct SubmitBody {
    job_id: Option<String>,
    status_url: Option<String>,
}

/// Extracts the job handle from a submission response.
///
/// A missing `status_url` is derived from the submit URL.
pub fn parse_submit_body(body: &str, submit_url: &str) -> Result<JobHandle, ProviderError> {
    let parsed: SubmitBody = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    let job_id = parsed
        .job_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ProviderError::MalformedResponse("missing job_id".to_string()))?;

    let status_endpoint = parsed
        .status_url
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| {
            format!("{}/job/status/{}", submit_url.trim_end_matches('/'), job_id)
        });

    Ok(JobHandle {
        job_id,
        status_endpoint,
    })
}

/// Validates and unpacks a status response.
///
/// Accepts the JSON:API shape (`data.attributes.{status,result}`) and the
/// flat shape (`{status,result}`). Anything that is not a JSON object, such
/// as an HTML error page, is a protocol error.
pub fn parse_status_body(body: &str) -> Result<ProviderStatus, ProviderError> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('<') {
        return Err(ProviderError::Protocol(
            "provider returned markup instead of JSON".to_string(),
        ));
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| ProviderError::Protocol(format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(ProviderError::Protocol("status payload is not an object".to_string()));
    }

    let attributes = value
        .pointer("/data/attributes")
        .filter(|a| a.is_object())
        .unwrap_or(&value);

    let status = attributes
        .get("status")
        .and_then(|s| s.as_str())
        .ok_or_else(|| ProviderError::Protocol("missing status field".to_string()))?
        .to_string();

    let result = match attributes.get("result") {
        None | Some(Value::Null) => None,
        Some(Value::String(encoded)) => Some(serde_json::from_str(encoded).map_err(|e| {
            ProviderError::Protocol(format!("result is not valid JSON: {e}"))
        })?),
        Some(other) => Some(other.clone()),
    };

    Ok(ProviderStatus { status, result })
}
