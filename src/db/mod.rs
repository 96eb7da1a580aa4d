use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use uuid::Uuid;

use crate::models::parsing::{JobHandle, ParsingRecord};
use crate::models::profile::CandidateProfile;

pub mod queries;

pub use queries::PgParsingStore;

/// Initialize PostgreSQL connection pool
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored value could not be decoded: {0}")]
    Decode(String),

    #[error("No parsing record for candidate {0}")]
    NotFound(Uuid),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result of a compare-and-swap transition out of `processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The write happened.
    Applied,
    /// The record now tracks a different job; nothing was written.
    Superseded,
    /// The tracked job already reached a terminal state; nothing was written.
    AlreadyTerminal,
}

/// Decides why a guarded transition matched no row.
pub fn classify_missed_transition(
    current: Option<&ParsingRecord>,
    candidate_id: Uuid,
    job_id: &str,
) -> Result<TransitionOutcome, StoreError> {
    let record = current.ok_or(StoreError::NotFound(candidate_id))?;
    if !record.tracks_job(job_id) {
        Ok(TransitionOutcome::Superseded)
    } else if record.parse_state.is_terminal() {
        Ok(TransitionOutcome::AlreadyTerminal)
    } else {
        Err(StoreError::Decode(format!(
            "transition for job {job_id} matched no row while record is {}",
            record.parse_state
        )))
    }
}

/// Narrow read/write contract over per-candidate parsing records.
///
/// Every method is atomic per record. Terminal transitions are guarded by
/// the job id and `parse_state = processing`.
#[async_trait]
pub trait ParsingStore: Send + Sync {
    async fn get(&self, candidate_id: Uuid) -> Result<Option<ParsingRecord>, StoreError>;

    /// Creates the `not_started` record if absent; returns the stored record.
    async fn create(&self, candidate_id: Uuid) -> Result<ParsingRecord, StoreError>;

    /// Records a confirmed submission: job metadata, `processing`, and
    /// cleared `raw_result`/`parsed_at`/`normalized_profile`.
    async fn record_submission(
        &self,
        candidate_id: Uuid,
        document_location: &str,
        job: &JobHandle,
    ) -> Result<ParsingRecord, StoreError>;

    async fn mark_completed(
        &self,
        candidate_id: Uuid,
        job_id: &str,
        raw_result: &serde_json::Value,
        parsed_at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, StoreError>;

    async fn mark_failed(
        &self,
        candidate_id: Uuid,
        job_id: &str,
    ) -> Result<TransitionOutcome, StoreError>;

    /// Caches a profile derived from the raw result of `job_id`.
    /// Returns false when the record moved on to another job.
    async fn store_profile(
        &self,
        candidate_id: Uuid,
        job_id: &str,
        profile: &CandidateProfile,
    ) -> Result<bool, StoreError>;

    /// Records still in `processing`, oldest submission first.
    async fn list_processing(&self, limit: i64) -> Result<Vec<ParsingRecord>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parsing::ParseState;

    fn record_with(job: &str, state: ParseState) -> ParsingRecord {
        let mut record = ParsingRecord::not_started(Uuid::new_v4());
        record.job_id = Some(job.to_string());
        record.status_endpoint = Some(format!("https://provider.test/{job}"));
        record.parse_state = state;
        record
    }

    #[test]
    fn test_missed_transition_on_new_job_is_superseded() {
        let record = record_with("new", ParseState::Processing);
        let outcome = classify_missed_transition(Some(&record), record.candidate_id, "old");
        assert_eq!(outcome.unwrap(), TransitionOutcome::Superseded);
    }

    #[test]
    fn test_missed_transition_on_terminal_job() {
        let record = record_with("job", ParseState::Failed);
        let outcome = classify_missed_transition(Some(&record), record.candidate_id, "job");
        assert_eq!(outcome.unwrap(), TransitionOutcome::AlreadyTerminal);
    }

    #[test]
    fn test_missed_transition_without_record() {
        let id = Uuid::new_v4();
        assert!(matches!(
            classify_missed_transition(None, id, "job"),
            Err(StoreError::NotFound(missing)) if missing == id
        ));
    }
}
