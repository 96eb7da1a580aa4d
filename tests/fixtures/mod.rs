//! Provider payload fixtures shaped like ApyHub SharpAPI responses

use serde_json::{json, Value};

pub const HTML_ERROR_PAGE: &str =
    "<!DOCTYPE html><html><head><title>502 Bad Gateway</title></head><body></body></html>";

/// Parsed résumé as returned in `result` on success.
pub fn parsed_resume() -> Value {
    json!({
        "candidate_name": "Ada Example",
        "positions": [
            {
                "position_name": "Backend Engineer",
                "company_name": "Acme",
                "skills": ["Rust", "PG", "Postgres", "JS"],
                "start_date": "2015-02-01",
                "end_date": "2019-06-30"
            },
            {
                "position_name": "Staff Engineer",
                "company_name": "Globex",
                "skills": ["rust", "K8s", "NodeJS"],
                "start_date": "Jul 2019",
                "end_date": "2023"
            }
        ],
        "education_qualifications": [
            { "degree_type": "BSc", "specialization_subjects": "Computer Science" }
        ]
    })
}

pub fn submit_body(job_id: &str) -> String {
    json!({
        "job_id": job_id,
        "status_url": format!("https://provider.test/parse_resume/job/status/{job_id}")
    })
    .to_string()
}

pub fn status_body(status: &str, result: Option<Value>) -> String {
    json!({
        "data": {
            "id": "job",
            "type": "api_job_result",
            "attributes": { "status": status, "result": result }
        }
    })
    .to_string()
}

pub fn success_body() -> String {
    status_body("success", Some(parsed_resume()))
}
