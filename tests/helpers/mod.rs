//! Test helper utilities for E2E testing

#![allow(dead_code)]

use reqwest::multipart;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

/// Response from POST /api/v1/candidates/{id}/resume
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub job_id: String,
    pub status: String,
    pub message: String,
}

/// Response from GET /api/v1/candidates/{id}/parsing
#[derive(Debug, Deserialize)]
pub struct ParsingSummary {
    pub candidate_id: Uuid,
    pub parse_state: String,
    pub job_id: Option<String>,
    pub profile_cached: bool,
}

/// Response from GET /api/v1/candidates/{id}/profile
#[derive(Debug, Deserialize)]
pub struct ProfileResponse {
    pub status: String,
    pub source: Option<String>,
    pub profile: Option<serde_json::Value>,
}

/// Create the parsing record for a fresh candidate
pub async fn register_candidate(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<Uuid, Box<dyn std::error::Error>> {
    let candidate_id = Uuid::new_v4();
    let response = client
        .put(format!("{}/api/v1/candidates/{}", base_url, candidate_id))
        .send()
        .await?;

    if !response.status().is_success() {
        let error_text = response.text().await?;
        return Err(format!("Registration failed: {}", error_text).into());
    }
    Ok(candidate_id)
}

/// Upload a résumé as the `resume` multipart field
pub async fn upload_resume(
    client: &reqwest::Client,
    base_url: &str,
    candidate_id: Uuid,
    file_name: &str,
    document: Vec<u8>,
) -> Result<reqwest::Response, Box<dyn std::error::Error>> {
    let form = multipart::Form::new().part(
        "resume",
        multipart::Part::bytes(document)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?,
    );

    let response = client
        .post(format!("{}/api/v1/candidates/{}/resume", base_url, candidate_id))
        .multipart(form)
        .send()
        .await?;
    Ok(response)
}

pub async fn get_parsing_summary(
    client: &reqwest::Client,
    base_url: &str,
    candidate_id: Uuid,
) -> Result<ParsingSummary, Box<dyn std::error::Error>> {
    let response = client
        .get(format!("{}/api/v1/candidates/{}/parsing", base_url, candidate_id))
        .send()
        .await?;

    if !response.status().is_success() {
        let error_text = response.text().await?;
        return Err(format!("Parsing summary failed: {}", error_text).into());
    }
    Ok(response.json::<ParsingSummary>().await?)
}

/// Poll the profile endpoint until it reports completed or failed
pub async fn poll_profile(
    client: &reqwest::Client,
    base_url: &str,
    candidate_id: Uuid,
    timeout_secs: u64,
) -> Result<ProfileResponse, Box<dyn std::error::Error>> {
    let max_attempts = timeout_secs; // Poll every second

    for attempt in 0..max_attempts {
        let response = client
            .get(format!("{}/api/v1/candidates/{}/profile", base_url, candidate_id))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(format!("Profile request failed: {}", error_text).into());
        }

        let profile = response.json::<ProfileResponse>().await?;

        match profile.status.as_str() {
            "completed" | "failed" => return Ok(profile),
            "processing" => {
                if attempt % 10 == 0 && attempt > 0 {
                    println!("  ... still parsing (attempt {}/{})", attempt, max_attempts);
                }
                sleep(Duration::from_secs(1)).await;
            }
            other => {
                return Err(format!("Unexpected profile status: {}", other).into());
            }
        }
    }

    Err(format!("Parsing did not finish within {} seconds", timeout_secs).into())
}
