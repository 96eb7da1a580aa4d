use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::db::StoreError;
use crate::services::normalize::NormalizeError;
use crate::services::provider::ProviderError;
use crate::services::status_map::StatusMapError;

/// Failure classes of the parsing pipeline.
///
/// A provider-reported failure or an exhausted retry budget is not an error
/// here: it is persisted as `parse_state = failed` and reported as an outcome.
#[derive(Debug, thiserror::Error)]
pub enum ParsingError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("No parsing record for candidate {0}")]
    CandidateNotFound(Uuid),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Provider protocol error: {0}")]
    Protocol(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Status mapping error: {0}")]
    Mapping(#[from] StatusMapError),

    #[error("Inconsistent parsing record: {0}")]
    InconsistentState(String),

    #[error("Normalization failed: {0}")]
    Normalization(#[from] NormalizeError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl ParsingError {
    /// Errors after which the record is unchanged and a later retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ParsingError::Protocol(_) | ParsingError::ProviderUnavailable(_) | ParsingError::Mapping(_)
        )
    }

    /// Classifies a provider error raised while submitting a document.
    pub fn from_submit(err: ProviderError) -> Self {
        match err {
            ProviderError::MissingCredentials => ParsingError::Configuration(err.to_string()),
            other => ParsingError::Submission(other.to_string()),
        }
    }

    /// Classifies a provider error raised while polling a job.
    pub fn from_poll(err: ProviderError) -> Self {
        match err {
            ProviderError::MissingCredentials => ParsingError::Configuration(err.to_string()),
            ProviderError::Protocol(_) | ProviderError::MalformedResponse(_) => {
                ParsingError::Protocol(err.to_string())
            }
            other => ParsingError::ProviderUnavailable(other.to_string()),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ParsingError::Configuration(_) => "CONFIGURATION_ERROR",
            ParsingError::InvalidDocument(_) => "INVALID_DOCUMENT",
            ParsingError::CandidateNotFound(_) => "NOT_FOUND",
            ParsingError::Submission(_) => "SUBMISSION_FAILED",
            ParsingError::Protocol(_) => "PROVIDER_PROTOCOL_ERROR",
            ParsingError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            ParsingError::Mapping(_) => "PROVIDER_STATUS_UNMAPPED",
            ParsingError::InconsistentState(_) => "INCONSISTENT_STATE",
            ParsingError::Normalization(_) => "NORMALIZATION_FAILED",
            ParsingError::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }
}

impl IntoResponse for ParsingError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ParsingError::InvalidDocument(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ParsingError::CandidateNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Candidate {id} has no parsing record"),
            ),
            ParsingError::Submission(msg) => {
                tracing::warn!(error = %msg, "Résumé submission failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "Résumé submission failed, please retry".to_string(),
                )
            }
            ParsingError::Protocol(_)
            | ParsingError::ProviderUnavailable(_)
            | ParsingError::Mapping(_) => {
                tracing::warn!(error = %self, "Transient provider error");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Parsing provider temporarily unavailable".to_string(),
                )
            }
            ParsingError::Configuration(_)
            | ParsingError::InconsistentState(_)
            | ParsingError::Normalization(_)
            | ParsingError::Persistence(_) => {
                tracing::error!(error = %self, "Parsing pipeline error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
