use std::sync::Arc;

use uuid::Uuid;

use resume_intake::db::ParsingStore;
use resume_intake::errors::ParsingError;
use resume_intake::models::parsing::ParsingRecord;
use resume_intake::services::normalize::SkillSynonyms;
use resume_intake::services::profile::ProfileService;
use resume_intake::services::provider::ParsingProvider;
use resume_intake::services::queue::PollQueue;
use resume_intake::services::reconcile::Reconciler;
use resume_intake::services::status_map::StatusMapper;
use resume_intake::services::submission::{DocumentSubmission, SubmissionReceipt, SubmissionService};

use super::fakes::{MemoryStore, RecordingQueue, ScriptedProvider};

pub const RESUME_BYTES: &[u8] = b"%PDF-1.7 fake resume";

/// Submission, reconciliation, and profile services over in-memory fakes.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub provider: Arc<ScriptedProvider>,
    pub queue: Arc<RecordingQueue>,
    pub submissions: SubmissionService,
    pub reconciler: Arc<Reconciler>,
    pub profiles: ProfileService,
}

impl Default for Harness {
    fn default() -> Self {
        Self::with_mapper(StatusMapper::default())
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mapper(mapper: StatusMapper) -> Self {
        let store = Arc::new(MemoryStore::default());
        let provider = Arc::new(ScriptedProvider::default());
        let queue = Arc::new(RecordingQueue::default());

        let dyn_store: Arc<dyn ParsingStore> = store.clone();
        let dyn_provider: Arc<dyn ParsingProvider> = provider.clone();
        let dyn_queue: Arc<dyn PollQueue> = queue.clone();

        let reconciler = Arc::new(Reconciler::new(
            dyn_provider.clone(),
            dyn_store.clone(),
            mapper,
        ));

        Self {
            submissions: SubmissionService::new(dyn_provider, dyn_store.clone(), dyn_queue),
            profiles: ProfileService::new(dyn_store, reconciler.clone(), SkillSynonyms::default()),
            reconciler,
            store,
            provider,
            queue,
        }
    }

    /// Creates a `not_started` record for a fresh candidate.
    pub async fn register(&self) -> Uuid {
        let candidate_id = Uuid::new_v4();
        self.store
            .create(candidate_id)
            .await
            .expect("register candidate");
        candidate_id
    }

    pub async fn submit(&self, candidate_id: Uuid) -> Result<SubmissionReceipt, ParsingError> {
        self.submissions
            .submit_document(DocumentSubmission {
                candidate_id,
                document: RESUME_BYTES,
                file_name: "resume.pdf",
                document_location: "resumes/test/resume.pdf.enc",
            })
            .await
    }

    /// Current record, asserting the record-level invariants hold.
    pub fn record(&self, candidate_id: Uuid) -> ParsingRecord {
        let record = self
            .store
            .snapshot(candidate_id)
            .expect("record should exist");
        if let Err(violation) = record.check_invariants() {
            panic!("invariant violated for {candidate_id}: {violation}");
        }
        record
    }
}
