use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use resume_intake::{
    app_state::AppState,
    config::AppConfig,
    db::{self, ParsingStore, PgParsingStore},
    routes,
    services::{
        documents::{DocumentVault, VaultConfig},
        normalize::SkillSynonyms,
        profile::ProfileService,
        provider::{ApyHubClient, ParsingProvider},
        queue::{JobQueue, PollQueue},
        reconcile::Reconciler,
        submission::SubmissionService,
    },
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing resume-intake server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    metrics::describe_counter!(
        "resume_submissions_total",
        "Résumés accepted by the parsing provider"
    );
    metrics::describe_counter!(
        "resume_submissions_failed_total",
        "Résumé submissions rejected or unreachable at the provider"
    );
    metrics::describe_counter!(
        "resume_parses_completed_total",
        "Parsing jobs that reached the completed state"
    );
    metrics::describe_counter!(
        "resume_parses_failed_total",
        "Parsing jobs marked failed by the provider or by timeout"
    );
    metrics::describe_counter!(
        "resume_reconcile_attempts_total",
        "Provider status checks made by either reconciliation trigger"
    );
    metrics::describe_counter!(
        "resume_profiles_generated_total",
        "Candidate profiles normalized and cached"
    );
    metrics::describe_histogram!(
        "resume_reconcile_seconds",
        "Provider status check latency"
    );
    metrics::describe_gauge!(
        "resume_poll_queue_depth",
        "Submitted jobs waiting for a background poller"
    );

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Encrypted résumé storage
    tracing::info!("Initializing R2 document vault");
    let documents = DocumentVault::new(&VaultConfig {
        bucket: &config.r2_bucket,
        endpoint: &config.r2_endpoint,
        access_key: &config.r2_access_key,
        secret_key: &config.r2_secret_key,
        encryption_key: &config.encryption_key,
    })
    .expect("Failed to initialize document vault");

    tracing::info!("Connecting to Redis poll queue");
    let queue = Arc::new(JobQueue::new(&config.redis_url).expect("Failed to initialize poll queue"));

    let provider = ApyHubClient::new(config.provider_config())
        .expect("Failed to initialize parsing provider client");
    if !provider.has_credentials() {
        tracing::warn!("APY_API_KEY is not set; résumé submissions will be rejected");
    }
    let provider: Arc<dyn ParsingProvider> = Arc::new(provider);

    let mapper = config
        .status_mapper()
        .expect("Invalid PROVIDER_STATUS_MAP");

    let store: Arc<dyn ParsingStore> = Arc::new(PgParsingStore::new(db_pool.clone()));
    let reconciler = Arc::new(Reconciler::new(provider.clone(), store.clone(), mapper));
    let poll_queue: Arc<dyn PollQueue> = queue.clone();

    let state = AppState {
        db: db_pool,
        store: store.clone(),
        documents: Arc::new(documents),
        queue,
        submissions: Arc::new(SubmissionService::new(provider, store.clone(), poll_queue)),
        profiles: Arc::new(ProfileService::new(store, reconciler, SkillSynonyms::default())),
        max_upload_bytes: config.max_upload_bytes,
    };

    let app = routes::build_router(state, prometheus_handle);

    tracing::info!("Starting resume-intake on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
