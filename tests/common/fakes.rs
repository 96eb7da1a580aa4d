use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use resume_intake::db::{classify_missed_transition, ParsingStore, StoreError, TransitionOutcome};
use resume_intake::models::parsing::{JobHandle, ParseState, ParsingRecord};
use resume_intake::models::profile::CandidateProfile;
use resume_intake::services::provider::{
    parse_status_body, parse_submit_body, ParsingProvider, ProviderError, ProviderStatus,
};
use resume_intake::services::queue::{PollQueue, PollTask, QueueError};

pub const SUBMIT_URL: &str = "https://provider.test/parse_resume";

/// In-memory store with the same guarded-write semantics as `PgParsingStore`.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<Uuid, ParsingRecord>>,
    fail_writes: AtomicBool,
    pub writes: AtomicUsize,
}

impl MemoryStore {
    /// Make every subsequent write fail with `StoreError::Unavailable`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self, candidate_id: Uuid) -> Option<ParsingRecord> {
        self.records.lock().unwrap().get(&candidate_id).cloned()
    }

    /// Overwrite a record directly, bypassing the service contract.
    pub fn put(&self, record: ParsingRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.candidate_id, record);
    }

    fn begin_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn guarded_transition(
        &self,
        candidate_id: Uuid,
        job_id: &str,
        apply: impl FnOnce(&mut ParsingRecord),
    ) -> Result<TransitionOutcome, StoreError> {
        self.begin_write()?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&candidate_id)
            .ok_or(StoreError::NotFound(candidate_id))?;

        if record.tracks_job(job_id) && record.parse_state == ParseState::Processing {
            apply(record);
            record.updated_at = Utc::now();
            Ok(TransitionOutcome::Applied)
        } else {
            classify_missed_transition(Some(record), candidate_id, job_id)
        }
    }
}

#[async_trait]
impl ParsingStore for MemoryStore {
    async fn get(&self, candidate_id: Uuid) -> Result<Option<ParsingRecord>, StoreError> {
        Ok(self.snapshot(candidate_id))
    }

    async fn create(&self, candidate_id: Uuid) -> Result<ParsingRecord, StoreError> {
        self.begin_write()?;
        let mut records = self.records.lock().unwrap();
        Ok(records
            .entry(candidate_id)
            .or_insert_with(|| ParsingRecord::not_started(candidate_id))
            .clone())
    }

    async fn record_submission(
        &self,
        candidate_id: Uuid,
        document_location: &str,
        job: &JobHandle,
    ) -> Result<ParsingRecord, StoreError> {
        self.begin_write()?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&candidate_id)
            .ok_or(StoreError::NotFound(candidate_id))?;

        record.document_location = Some(document_location.to_string());
        record.job_id = Some(job.job_id.clone());
        record.status_endpoint = Some(job.status_endpoint.clone());
        record.parse_state = ParseState::Processing;
        record.raw_result = None;
        record.parsed_at = None;
        record.normalized_profile = None;
        record.submitted_at = Some(Utc::now());
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn mark_completed(
        &self,
        candidate_id: Uuid,
        job_id: &str,
        raw_result: &Value,
        parsed_at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, StoreError> {
        self.guarded_transition(candidate_id, job_id, |record| {
            record.parse_state = ParseState::Completed;
            record.raw_result = Some(raw_result.clone());
            record.parsed_at = Some(parsed_at);
            record.normalized_profile = None;
        })
    }

    async fn mark_failed(
        &self,
        candidate_id: Uuid,
        job_id: &str,
    ) -> Result<TransitionOutcome, StoreError> {
        self.guarded_transition(candidate_id, job_id, |record| {
            record.parse_state = ParseState::Failed;
        })
    }

    async fn store_profile(
        &self,
        candidate_id: Uuid,
        job_id: &str,
        profile: &CandidateProfile,
    ) -> Result<bool, StoreError> {
        self.begin_write()?;
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&candidate_id) {
            Some(record)
                if record.tracks_job(job_id)
                    && record.parse_state == ParseState::Completed
                    && record.raw_result.is_some() =>
            {
                record.normalized_profile = Some(profile.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_processing(&self, limit: i64) -> Result<Vec<ParsingRecord>, StoreError> {
        let records = self.records.lock().unwrap();
        let mut processing: Vec<_> = records
            .values()
            .filter(|r| r.parse_state == ParseState::Processing)
            .cloned()
            .collect();
        processing.sort_by_key(|r| r.submitted_at);
        processing.truncate(limit.max(0) as usize);
        Ok(processing)
    }
}

/// What the fake provider answers to a submission.
#[derive(Debug, Clone)]
pub enum SubmitReply {
    /// Raw response body, run through the real submit-body parser.
    Body(String),
    MissingCredentials,
    Timeout,
}

/// What the fake provider answers to a status check.
#[derive(Debug, Clone)]
pub enum StatusReply {
    /// Raw response body, run through the real status-body parser.
    Body(String),
    Unavailable,
}

/// Provider double that replays scripted replies in order.
pub struct ScriptedProvider {
    submit_script: Mutex<VecDeque<SubmitReply>>,
    status_script: Mutex<VecDeque<StatusReply>>,
    default_status: Mutex<StatusReply>,
    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self {
            submit_script: Mutex::new(VecDeque::new()),
            status_script: Mutex::new(VecDeque::new()),
            default_status: Mutex::new(StatusReply::Body(
                crate::fixtures::status_body("processing", None),
            )),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }
}

impl ScriptedProvider {
    pub fn push_submit(&self, reply: SubmitReply) {
        self.submit_script.lock().unwrap().push_back(reply);
    }

    pub fn push_status(&self, reply: StatusReply) {
        self.status_script.lock().unwrap().push_back(reply);
    }

    /// Reply used once the status script is exhausted.
    pub fn set_default_status(&self, reply: StatusReply) {
        *self.default_status.lock().unwrap() = reply;
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParsingProvider for ScriptedProvider {
    async fn submit(&self, document: &[u8], _file_name: &str) -> Result<JobHandle, ProviderError> {
        assert!(!document.is_empty(), "empty documents must never reach the provider");
        let call = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let reply = self
            .submit_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| SubmitReply::Body(crate::fixtures::submit_body(&format!("job-{call}"))));

        match reply {
            SubmitReply::Body(body) => parse_submit_body(&body, SUBMIT_URL),
            SubmitReply::MissingCredentials => Err(ProviderError::MissingCredentials),
            SubmitReply::Timeout => Err(ProviderError::Timeout(Duration::from_secs(15))),
        }
    }

    async fn fetch_status(&self, _status_endpoint: &str) -> Result<ProviderStatus, ProviderError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.status_script.lock().unwrap().pop_front();
        let reply = scripted.unwrap_or_else(|| self.default_status.lock().unwrap().clone());

        match reply {
            StatusReply::Body(body) => parse_status_body(&body),
            StatusReply::Unavailable => Err(ProviderError::Api {
                status: 503,
                message: "Service Unavailable".to_string(),
            }),
        }
    }
}

/// Poll queue double that records every scheduled task.
#[derive(Default)]
pub struct RecordingQueue {
    tasks: Mutex<Vec<PollTask>>,
    fail: AtomicBool,
}

impl RecordingQueue {
    pub fn tasks(&self) -> Vec<PollTask> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn fail_enqueue(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PollQueue for RecordingQueue {
    async fn enqueue(&self, task: &PollTask) -> Result<(), QueueError> {
        if self.fail.load(Ordering::SeqCst) {
            let err: serde_json::Error = serde::de::Error::custom("injected enqueue failure");
            return Err(QueueError::Serialize(err));
        }
        self.tasks.lock().unwrap().push(task.clone());
        Ok(())
    }
}
