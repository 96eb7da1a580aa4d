use sqlx::PgPool;
use std::sync::Arc;

use crate::db::ParsingStore;
use crate::services::{
    documents::DocumentVault, profile::ProfileService, queue::JobQueue,
    submission::SubmissionService,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub store: Arc<dyn ParsingStore>,
    pub documents: Arc<DocumentVault>,
    pub queue: Arc<JobQueue>,
    pub submissions: Arc<SubmissionService>,
    pub profiles: Arc<ProfileService>,
    pub max_upload_bytes: usize,
}
