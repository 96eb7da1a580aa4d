//! Reconciliation of provider job status into the parsing record.
//!
//! [`Reconciler::reconcile_record`] is the single transition function. The
//! background poller and the on-read check both go through it; terminal
//! writes are guarded by job id, so concurrent callers cannot clobber each
//! other or a newer submission.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::db::{ParsingStore, TransitionOutcome};
use crate::errors::ParsingError;
use crate::models::parsing::{ParseState, ParsingRecord};
use crate::services::provider::ParsingProvider;
use crate::services::queue::PollTask;
use crate::services::status_map::{ProviderOutcome, StatusMapper};

/// Attempt budget for background polling of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_secs(3),
        }
    }
}

/// What a reconciliation pass observed or applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Nothing has been submitted.
    NotStarted,
    /// The provider is still working on the job.
    Processing,
    Completed { job_id: String, raw_result: Value },
    Failed,
    /// The record now tracks a newer job; nothing was written.
    Superseded,
}

pub struct Reconciler {
    provider: Arc<dyn ParsingProvider>,
    store: Arc<dyn ParsingStore>,
    mapper: StatusMapper,
}

impl Reconciler {
    pub fn new(
        provider: Arc<dyn ParsingProvider>,
        store: Arc<dyn ParsingStore>,
        mapper: StatusMapper,
    ) -> Self {
        Self {
            provider,
            store,
            mapper,
        }
    }

    /// Reconcile whatever job the candidate's record currently tracks.
    pub async fn reconcile(&self, candidate_id: Uuid) -> Result<ReconcileOutcome, ParsingError> {
        let record = self.load(candidate_id).await?;
        self.reconcile_record(&record, None).await
    }

    /// Reconcile a specific job; returns `Superseded` if the record moved on.
    pub async fn reconcile_job(
        &self,
        candidate_id: Uuid,
        job_id: &str,
    ) -> Result<ReconcileOutcome, ParsingError> {
        let record = self.load(candidate_id).await?;
        self.reconcile_record(&record, Some(job_id)).await
    }

    pub async fn reconcile_record(
        &self,
        record: &ParsingRecord,
        expected_job: Option<&str>,
    ) -> Result<ReconcileOutcome, ParsingError> {
        let candidate_id = record.candidate_id;

        if let Some(job_id) = expected_job {
            if !record.tracks_job(job_id) {
                tracing::info!(%candidate_id, job_id, "Job superseded by a newer submission");
                return Ok(ReconcileOutcome::Superseded);
            }
        }

        match record.parse_state {
            ParseState::Completed => return completed_from(record),
            ParseState::Failed => return Ok(ReconcileOutcome::Failed),
            ParseState::NotStarted => return Ok(ReconcileOutcome::NotStarted),
            ParseState::Processing => {}
        }

        let (job_id, status_endpoint) =
            match (record.job_id.as_deref(), record.status_endpoint.as_deref()) {
                (Some(job_id), Some(endpoint)) => (job_id, endpoint),
                _ => {
                    return Err(ParsingError::InconsistentState(format!(
                        "candidate {candidate_id} is processing without a status endpoint"
                    )))
                }
            };

        metrics::counter!("resume_reconcile_attempts_total").increment(1);
        let started = Instant::now();
        let status = self
            .provider
            .fetch_status(status_endpoint)
            .await
            .map_err(ParsingError::from_poll)?;
        metrics::histogram!("resume_reconcile_seconds").record(started.elapsed().as_secs_f64());

        let outcome = self.mapper.map(&status.status)?;
        tracing::debug!(
            %candidate_id,
            job_id,
            provider_status = %status.status,
            outcome = %outcome,
            "Provider status checked"
        );

        match outcome {
            ProviderOutcome::Pending => Ok(ReconcileOutcome::Processing),
            ProviderOutcome::Failed => {
                let transition = self.store.mark_failed(candidate_id, job_id).await?;
                self.settle(transition, candidate_id, job_id, ReconcileOutcome::Failed)
                    .await
            }
            ProviderOutcome::Done => {
                let raw_result = status.result.ok_or_else(|| {
                    ParsingError::Protocol(format!(
                        "provider reported '{}' without a result",
                        status.status
                    ))
                })?;
                let transition = self
                    .store
                    .mark_completed(candidate_id, job_id, &raw_result, Utc::now())
                    .await?;
                let applied = ReconcileOutcome::Completed {
                    job_id: job_id.to_string(),
                    raw_result,
                };
                self.settle(transition, candidate_id, job_id, applied).await
            }
        }
    }

    /// Background trigger: poll a submitted job until it settles or the
    /// attempt budget runs out, in which case the job is marked failed.
    pub async fn poll_until_terminal(
        &self,
        task: &PollTask,
        policy: &PollPolicy,
    ) -> Result<ReconcileOutcome, ParsingError> {
        let candidate_id = task.candidate_id;

        for attempt in 1..=policy.max_attempts {
            tokio::time::sleep(policy.interval).await;

            match self.reconcile_job(candidate_id, &task.job_id).await {
                Ok(ReconcileOutcome::Processing) => {
                    tracing::debug!(%candidate_id, job_id = %task.job_id, attempt, "Job still processing");
                }
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_transient() => {
                    tracing::warn!(%candidate_id, job_id = %task.job_id, attempt, error = %e, "Transient polling error");
                }
                Err(e @ ParsingError::Persistence(_)) => {
                    tracing::error!(%candidate_id, job_id = %task.job_id, attempt, error = %e, "Failed to persist reconciliation");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(
            %candidate_id,
            job_id = %task.job_id,
            attempts = policy.max_attempts,
            "Polling budget exhausted, marking parse as failed"
        );
        let transition = self.store.mark_failed(candidate_id, &task.job_id).await?;
        self.settle(transition, candidate_id, &task.job_id, ReconcileOutcome::Failed)
            .await
    }

    async fn settle(
        &self,
        transition: TransitionOutcome,
        candidate_id: Uuid,
        job_id: &str,
        applied: ReconcileOutcome,
    ) -> Result<ReconcileOutcome, ParsingError> {
        match transition {
            TransitionOutcome::Applied => {
                match &applied {
                    ReconcileOutcome::Completed { .. } => {
                        metrics::counter!("resume_parses_completed_total").increment(1);
                        tracing::info!(%candidate_id, job_id, "Résumé parsing completed");
                    }
                    _ => {
                        metrics::counter!("resume_parses_failed_total").increment(1);
                        tracing::warn!(%candidate_id, job_id, "Résumé parsing failed");
                    }
                }
                Ok(applied)
            }
            TransitionOutcome::Superseded => {
                tracing::info!(%candidate_id, job_id, "Job superseded before its result was stored");
                Ok(ReconcileOutcome::Superseded)
            }
            TransitionOutcome::AlreadyTerminal => {
                let record = self.load(candidate_id).await?;
                match record.parse_state {
                    ParseState::Completed => completed_from(&record),
                    ParseState::Failed => Ok(ReconcileOutcome::Failed),
                    state => Err(ParsingError::InconsistentState(format!(
                        "candidate {candidate_id} reported terminal but is {state}"
                    ))),
                }
            }
        }
    }

    async fn load(&self, candidate_id: Uuid) -> Result<ParsingRecord, ParsingError> {
        self.store
            .get(candidate_id)
            .await?
            .ok_or(ParsingError::CandidateNotFound(candidate_id))
    }
}

fn completed_from(record: &ParsingRecord) -> Result<ReconcileOutcome, ParsingError> {
    match (&record.job_id, &record.raw_result) {
        (Some(job_id), Some(raw_result)) => Ok(ReconcileOutcome::Completed {
            job_id: job_id.clone(),
            raw_result: raw_result.clone(),
        }),
        _ => Err(ParsingError::InconsistentState(format!(
            "candidate {} is completed without a stored result",
            record.candidate_id
        ))),
    }
}
