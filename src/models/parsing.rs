use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::models::profile::CandidateProfile;

/// Lifecycle of a candidate's résumé parse. Stored as TEXT in `candidate_parsing`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParseState {
    NotStarted,
    Processing,
    Completed,
    Failed,
}

impl ParseState {
    /// `completed` and `failed` only change through a new submission.
    pub fn is_terminal(self) -> bool {
        matches!(self, ParseState::Completed | ParseState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Job handle returned by the parsing provider on submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: String,
    pub status_endpoint: String,
}

/// Per-candidate parsing state. Exactly one row per candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingRecord {
    pub candidate_id: Uuid,
    pub document_location: Option<String>,
    pub job_id: Option<String>,
    pub status_endpoint: Option<String>,
    pub parse_state: ParseState,
    pub raw_result: Option<serde_json::Value>,
    pub parsed_at: Option<DateTime<Utc>>,
    pub normalized_profile: Option<CandidateProfile>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ParsingRecord {
    /// A fresh record for a newly registered candidate.
    pub fn not_started(candidate_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            candidate_id,
            document_location: None,
            job_id: None,
            status_endpoint: None,
            parse_state: ParseState::NotStarted,
            raw_result: None,
            parsed_at: None,
            normalized_profile: None,
            submitted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks the record-level invariants, returning the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        let completed = self.parse_state == ParseState::Completed;

        if self.raw_result.is_some() != completed {
            return Err(format!(
                "raw_result present={} but parse_state={}",
                self.raw_result.is_some(),
                self.parse_state
            ));
        }
        if self.raw_result.is_some() != self.parsed_at.is_some() {
            return Err("parsed_at must be set together with raw_result".to_string());
        }
        if self.normalized_profile.is_some() && self.raw_result.is_none() {
            return Err("normalized_profile cached without raw_result".to_string());
        }
        if self.job_id.is_some() != self.status_endpoint.is_some() {
            return Err("job_id and status_endpoint must be set together".to_string());
        }
        if self.parse_state != ParseState::NotStarted
            && self.parse_state != ParseState::Failed
            && self.job_id.is_none()
        {
            return Err(format!("parse_state={} without a job", self.parse_state));
        }
        Ok(())
    }

    /// Whether `job_id` is the job this record currently tracks.
    pub fn tracks_job(&self, job_id: &str) -> bool {
        self.job_id.as_deref() == Some(job_id)
    }
}

/// Read-only summary of a record, without the raw provider payload.
#[derive(Debug, Serialize)]
pub struct ParsingSummary {
    pub candidate_id: Uuid,
    pub parse_state: ParseState,
    pub job_id: Option<String>,
    pub document_location: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub parsed_at: Option<DateTime<Utc>>,
    pub profile_cached: bool,
}

impl From<&ParsingRecord> for ParsingSummary {
    fn from(record: &ParsingRecord) -> Self {
        Self {
            candidate_id: record.candidate_id,
            parse_state: record.parse_state,
            job_id: record.job_id.clone(),
            document_location: record.document_location.clone(),
            submitted_at: record.submitted_at,
            parsed_at: record.parsed_at,
            profile_cached: record.normalized_profile.is_some(),
        }
    }
}
