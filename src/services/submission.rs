use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::db::ParsingStore;
use crate::errors::ParsingError;
use crate::services::provider::ParsingProvider;
use crate::services::queue::{PollQueue, PollTask};

/// A résumé already persisted by the document vault, ready for parsing.
#[derive(Debug, Clone, Copy)]
pub struct DocumentSubmission<'a> {
    pub candidate_id: Uuid,
    pub document: &'a [u8],
    pub file_name: &'a str,
    pub document_location: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Accepted,
}

/// Returned as soon as the provider has a job; parsing continues asynchronously.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub job_id: String,
    pub status: SubmissionStatus,
}

/// Sends résumés to the parsing provider and records the resulting job.
pub struct SubmissionService {
    provider: Arc<dyn ParsingProvider>,
    store: Arc<dyn ParsingStore>,
    queue: Arc<dyn PollQueue>,
}

impl SubmissionService {
    pub fn new(
        provider: Arc<dyn ParsingProvider>,
        store: Arc<dyn ParsingStore>,
        queue: Arc<dyn PollQueue>,
    ) -> Self {
        Self {
            provider,
            store,
            queue,
        }
    }

    /// Submit a document for parsing.
    ///
    /// The record is written only after the provider confirms a job, so any
    /// failure before that point leaves the candidate's state untouched. A
    /// new submission supersedes earlier results and in-flight polling.
    pub async fn submit_document(
        &self,
        submission: DocumentSubmission<'_>,
    ) -> Result<SubmissionReceipt, ParsingError> {
        let candidate_id = submission.candidate_id;

        if submission.document.is_empty() {
            return Err(ParsingError::InvalidDocument("document is empty".to_string()));
        }
        if submission.document_location.trim().is_empty() {
            return Err(ParsingError::InvalidDocument(
                "document has no stored location".to_string(),
            ));
        }

        if self.store.get(candidate_id).await?.is_none() {
            return Err(ParsingError::CandidateNotFound(candidate_id));
        }

        let job = match self
            .provider
            .submit(submission.document, submission.file_name)
            .await
        {
            Ok(job) => job,
            Err(e) => {
                metrics::counter!("resume_submissions_failed_total").increment(1);
                tracing::warn!(%candidate_id, error = %e, "Provider rejected résumé submission");
                return Err(ParsingError::from_submit(e));
            }
        };

        self.store
            .record_submission(candidate_id, submission.document_location, &job)
            .await?;

        metrics::counter!("resume_submissions_total").increment(1);
        tracing::info!(
            %candidate_id,
            job_id = %job.job_id,
            document = %submission.document_location,
            "Résumé submitted for parsing"
        );

        let task = PollTask {
            candidate_id,
            job_id: job.job_id.clone(),
        };
        if let Err(e) = self.queue.enqueue(&task).await {
            // The first profile read still reconciles the job.
            tracing::warn!(%candidate_id, job_id = %job.job_id, error = %e, "Failed to schedule background polling");
        }

        Ok(SubmissionReceipt {
            job_id: job.job_id,
            status: SubmissionStatus::Accepted,
        })
    }
}
