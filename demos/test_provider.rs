//! Example: Test ApyHub Résumé Parser Connection
//!
//! Submits a résumé to the parsing provider, polls the job until it settles,
//! and prints the normalized candidate profile.
//!
//! Usage:
//!   cargo run --example test_provider -- path/to/resume.pdf
//!
//! Prerequisites:
//!   - .env file with APY_API_KEY

use chrono::{Datelike, Utc};
use resume_intake::services::normalize::normalize;
use resume_intake::services::provider::{ApyHubClient, ParsingProvider, ProviderConfig};
use resume_intake::services::status_map::{ProviderOutcome, StatusMapper};
use std::env;
use std::time::Duration;

const MAX_POLLS: u32 = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    println!("🔧 Résumé Parser Connection Test\n");

    let path = env::args()
        .nth(1)
        .ok_or("usage: test_provider <resume-file>")?;
    let api_key = env::var("APY_API_KEY").expect("APY_API_KEY not set");
    let document = std::fs::read(&path)?;
    let file_name = std::path::Path::new(&path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("resume.pdf")
        .to_string();

    println!("📋 Configuration:");
    println!("   API Key: {}***", &api_key[..6.min(api_key.len())]);
    println!("   Document: {} ({} bytes)", file_name, document.len());
    println!();

    let client = ApyHubClient::new(ProviderConfig {
        api_key: Some(api_key),
        ..Default::default()
    })?;
    let mapper = StatusMapper::default();

    println!("⬆️  Submitting résumé...");
    let job = client.submit(&document, &file_name).await?;
    println!("✅ Job created");
    println!("   Job ID: {}", job.job_id);
    println!("   Status URL: {}\n", job.status_endpoint);

    for attempt in 1..=MAX_POLLS {
        tokio::time::sleep(Duration::from_secs(3)).await;

        let status = match client.fetch_status(&job.status_endpoint).await {
            Ok(status) => status,
            Err(e) => {
                println!("⚠️  Attempt {}: {}", attempt, e);
                continue;
            }
        };
        println!("⏳ Attempt {}: provider status '{}'", attempt, status.status);

        match mapper.map(&status.status)? {
            ProviderOutcome::Pending => continue,
            ProviderOutcome::Failed => {
                println!("❌ Provider reported failure");
                return Err("parsing failed".into());
            }
            ProviderOutcome::Done => {
                let raw = status.result.ok_or("done without a result")?;
                let profile = normalize(&raw, Utc::now().year())?;
                println!("\n✅ Parsed profile:");
                println!("{}", serde_json::to_string_pretty(&profile)?);
                return Ok(());
            }
        }
    }

    println!("❌ Job did not settle after {} polls", MAX_POLLS);
    Err("polling budget exhausted".into())
}
