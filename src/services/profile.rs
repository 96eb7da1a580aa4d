use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::db::ParsingStore;
use crate::errors::ParsingError;
use crate::models::parsing::{ParseState, ParsingRecord};
use crate::models::profile::{CandidateProfile, ProfileOutcome, ProfileSource};
use crate::services::normalize::{normalize_with, SkillSynonyms};
use crate::services::reconcile::{ReconcileOutcome, Reconciler};

/// Read path for candidate profiles.
///
/// Serves the cached profile when present, otherwise reconciles an
/// in-flight job on demand and normalizes the result into the cache.
pub struct ProfileService {
    store: Arc<dyn ParsingStore>,
    reconciler: Arc<Reconciler>,
    synonyms: SkillSynonyms,
}

impl ProfileService {
    pub fn new(
        store: Arc<dyn ParsingStore>,
        reconciler: Arc<Reconciler>,
        synonyms: SkillSynonyms,
    ) -> Self {
        Self {
            store,
            reconciler,
            synonyms,
        }
    }

    pub async fn get_profile(&self, candidate_id: Uuid) -> Result<ProfileOutcome, ParsingError> {
        let record = self
            .store
            .get(candidate_id)
            .await?
            .ok_or(ParsingError::CandidateNotFound(candidate_id))?;

        if let Some(profile) = &record.normalized_profile {
            return Ok(ProfileOutcome::Completed {
                source: ProfileSource::Cached,
                profile: profile.clone(),
            });
        }

        match record.parse_state {
            ParseState::Processing => self.reconcile_on_read(&record).await,
            ParseState::Completed => match (&record.job_id, &record.raw_result) {
                (Some(job_id), Some(raw_result)) => {
                    self.generate(candidate_id, job_id, raw_result).await
                }
                _ => Err(ParsingError::InconsistentState(format!(
                    "candidate {candidate_id} is completed without a stored result"
                ))),
            },
            ParseState::Failed => Ok(ProfileOutcome::Failed),
            ParseState::NotStarted => Ok(ProfileOutcome::NotStarted),
        }
    }

    async fn reconcile_on_read(&self, record: &ParsingRecord) -> Result<ProfileOutcome, ParsingError> {
        let candidate_id = record.candidate_id;

        let outcome = match self.reconciler.reconcile_record(record, None).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_transient() => {
                tracing::warn!(%candidate_id, error = %e, "On-read reconciliation deferred");
                return Ok(ProfileOutcome::Processing);
            }
            Err(e) => return Err(e),
        };

        match outcome {
            ReconcileOutcome::Completed { job_id, raw_result } => {
                self.generate(candidate_id, &job_id, &raw_result).await
            }
            ReconcileOutcome::Processing | ReconcileOutcome::Superseded => {
                Ok(ProfileOutcome::Processing)
            }
            ReconcileOutcome::Failed => Ok(ProfileOutcome::Failed),
            ReconcileOutcome::NotStarted => Ok(ProfileOutcome::NotStarted),
        }
    }

    /// Normalize a raw result and cache it against the job that produced it.
    async fn generate(
        &self,
        candidate_id: Uuid,
        job_id: &str,
        raw_result: &Value,
    ) -> Result<ProfileOutcome, ParsingError> {
        let profile: CandidateProfile =
            normalize_with(raw_result, &self.synonyms, Utc::now().year())?;

        match self.store.store_profile(candidate_id, job_id, &profile).await {
            Ok(true) => {
                metrics::counter!("resume_profiles_generated_total").increment(1);
                tracing::info!(
                    %candidate_id,
                    job_id,
                    skills = profile.skills.len(),
                    experience_years = profile.experience_years,
                    seniority = %profile.seniority,
                    "Candidate profile generated"
                );
            }
            Ok(false) => {
                tracing::info!(%candidate_id, job_id, "Record moved on, profile not cached");
            }
            Err(e) => {
                tracing::warn!(%candidate_id, job_id, error = %e, "Failed to cache profile");
            }
        }

        Ok(ProfileOutcome::Completed {
            source: ProfileSource::Generated,
            profile,
        })
    }
}
