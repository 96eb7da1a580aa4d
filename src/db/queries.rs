use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::db::{classify_missed_transition, ParsingStore, StoreError, TransitionOutcome};
use crate::models::parsing::{JobHandle, ParseState, ParsingRecord};
use crate::models::profile::CandidateProfile;

const RECORD_COLUMNS: &str = r#"
    candidate_id, document_location, job_id, status_endpoint, parse_state,
    raw_result, parsed_at, normalized_profile, submitted_at, created_at, updated_at
"#;

/// PostgreSQL-backed [`ParsingStore`] over the `candidate_parsing` table.
#[derive(Clone)]
pub struct PgParsingStore {
    pool: PgPool,
}

impl PgParsingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn record_from_row(row: &PgRow) -> Result<ParsingRecord, StoreError> {
    let state: String = row.try_get("parse_state")?;
    let parse_state = ParseState::from_str(&state)
        .map_err(|_| StoreError::Decode(format!("unknown parse_state '{state}'")))?;

    let normalized_profile = row
        .try_get::<Option<Json<CandidateProfile>>, _>("normalized_profile")?
        .map(|Json(profile)| profile);

    Ok(ParsingRecord {
        candidate_id: row.try_get("candidate_id")?,
        document_location: row.try_get("document_location")?,
        job_id: row.try_get("job_id")?,
        status_endpoint: row.try_get("status_endpoint")?,
        parse_state,
        raw_result: row.try_get("raw_result")?,
        parsed_at: row.try_get("parsed_at")?,
        normalized_profile,
        submitted_at: row.try_get("submitted_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ParsingStore for PgParsingStore {
    async fn get(&self, candidate_id: Uuid) -> Result<Option<ParsingRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM candidate_parsing WHERE candidate_id = $1"
        ))
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn create(&self, candidate_id: Uuid) -> Result<ParsingRecord, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO candidate_parsing (candidate_id, parse_state)
            VALUES ($1, 'not_started')
            ON CONFLICT (candidate_id) DO NOTHING
            "#,
        )
        .bind(candidate_id)
        .execute(&self.pool)
        .await?;

        self.get(candidate_id)
            .await?
            .ok_or(StoreError::NotFound(candidate_id))
    }

    async fn record_submission(
        &self,
        candidate_id: Uuid,
        document_location: &str,
        job: &JobHandle,
    ) -> Result<ParsingRecord, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE candidate_parsing
            SET document_location = $2,
                job_id = $3,
                status_endpoint = $4,
                parse_state = 'processing',
                raw_result = NULL,
                parsed_at = NULL,
                normalized_profile = NULL,
                submitted_at = NOW(),
                updated_at = NOW()
            WHERE candidate_id = $1
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(candidate_id)
        .bind(document_location)
        .bind(&job.job_id)
        .bind(&job.status_endpoint)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => record_from_row(&r),
            None => Err(StoreError::NotFound(candidate_id)),
        }
    }

    async fn mark_completed(
        &self,
        candidate_id: Uuid,
        job_id: &str,
        raw_result: &serde_json::Value,
        parsed_at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE candidate_parsing
            SET parse_state = 'completed',
                raw_result = $3,
                parsed_at = $4,
                normalized_profile = NULL,
                updated_at = NOW()
            WHERE candidate_id = $1
              AND job_id = $2
              AND parse_state = 'processing'
            "#,
        )
        .bind(candidate_id)
        .bind(job_id)
        .bind(raw_result)
        .bind(parsed_at)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 1 {
            return Ok(TransitionOutcome::Applied);
        }
        let current = self.get(candidate_id).await?;
        classify_missed_transition(current.as_ref(), candidate_id, job_id)
    }

    async fn mark_failed(
        &self,
        candidate_id: Uuid,
        job_id: &str,
    ) -> Result<TransitionOutcome, StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE candidate_parsing
            SET parse_state = 'failed',
                updated_at = NOW()
            WHERE candidate_id = $1
              AND job_id = $2
              AND parse_state = 'processing'
            "#,
        )
        .bind(candidate_id)
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 1 {
            return Ok(TransitionOutcome::Applied);
        }
        let current = self.get(candidate_id).await?;
        classify_missed_transition(current.as_ref(), candidate_id, job_id)
    }

    async fn store_profile(
        &self,
        candidate_id: Uuid,
        job_id: &str,
        profile: &CandidateProfile,
    ) -> Result<bool, StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE candidate_parsing
            SET normalized_profile = $3,
                updated_at = NOW()
            WHERE candidate_id = $1
              AND job_id = $2
              AND parse_state = 'completed'
              AND raw_result IS NOT NULL
            "#,
        )
        .bind(candidate_id)
        .bind(job_id)
        .bind(Json(profile))
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected() == 1)
    }

    async fn list_processing(&self, limit: i64) -> Result<Vec<ParsingRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM candidate_parsing
            WHERE parse_state = 'processing'
            ORDER BY submitted_at ASC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }
}
