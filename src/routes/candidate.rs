use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::errors::ParsingError;
use crate::models::parsing::ParsingSummary;
use crate::models::profile::ProfileOutcome;
use crate::services::submission::{DocumentSubmission, SubmissionStatus};

const RESUME_FIELD: &str = "resume";

/// Résumé file pulled out of the multipart upload.
#[derive(Debug, Validate)]
pub struct ResumeUpload {
    #[garde(length(min = 1, max = 255))]
    pub file_name: String,

    #[garde(length(min = 1))]
    pub document: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub job_id: String,
    pub status: SubmissionStatus,
    pub message: String,
}

/// PUT /api/v1/candidates/{candidate_id} — create the candidate's parsing record.
pub async fn register_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<ParsingSummary>, ParsingError> {
    let record = state.store.create(candidate_id).await?;
    tracing::info!(%candidate_id, parse_state = %record.parse_state, "Parsing record ready");
    Ok(Json(ParsingSummary::from(&record)))
}

/// POST /api/v1/candidates/{candidate_id}/resume — upload a résumé for parsing.
pub async fn upload_resume(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ParsingError> {
    let mut upload: Option<ResumeUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ParsingError::InvalidDocument(e.to_string()))?
    {
        if field.name() == Some(RESUME_FIELD) {
            let file_name = field.file_name().unwrap_or("resume").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ParsingError::InvalidDocument(e.to_string()))?;
            upload = Some(ResumeUpload {
                file_name,
                document: data.to_vec(),
            });
        }
    }

    let upload = upload.ok_or_else(|| {
        ParsingError::InvalidDocument(format!("missing multipart field '{RESUME_FIELD}'"))
    })?;
    upload
        .validate()
        .map_err(|report| ParsingError::InvalidDocument(report.to_string()))?;
    if upload.document.len() > state.max_upload_bytes {
        return Err(ParsingError::InvalidDocument(format!(
            "document exceeds {} bytes",
            state.max_upload_bytes
        )));
    }

    if state.store.get(candidate_id).await?.is_none() {
        return Err(ParsingError::CandidateNotFound(candidate_id));
    }

    let document_location = state
        .documents
        .put(candidate_id, &upload.file_name, &upload.document)
        .await
        .map_err(|e| ParsingError::Submission(format!("could not store document: {e}")))?;

    let receipt = state
        .submissions
        .submit_document(DocumentSubmission {
            candidate_id,
            document: &upload.document,
            file_name: &upload.file_name,
            document_location: &document_location,
        })
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            job_id: receipt.job_id,
            status: receipt.status,
            message: "Résumé uploaded successfully. Parsing in progress.".to_string(),
        }),
    ))
}

/// GET /api/v1/candidates/{candidate_id}/profile — normalized profile or parse status.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<ProfileOutcome>, ParsingError> {
    let outcome = state.profiles.get_profile(candidate_id).await?;
    Ok(Json(outcome))
}

/// GET /api/v1/candidates/{candidate_id}/parsing — parsing record summary.
pub async fn get_parsing_status(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<ParsingSummary>, ParsingError> {
    let record = state
        .store
        .get(candidate_id)
        .await?
        .ok_or(ParsingError::CandidateNotFound(candidate_id))?;
    Ok(Json(ParsingSummary::from(&record)))
}
