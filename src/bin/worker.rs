use resume_intake::{
    config::AppConfig,
    db::{self, ParsingStore, PgParsingStore},
    services::{
        provider::{ApyHubClient, ParsingProvider},
        queue::{missing_tasks, JobQueue, PollQueue, PollTask},
        reconcile::{PollPolicy, ReconcileOutcome, Reconciler},
    },
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

const IDLE_POLL_INTERVAL_MS: u64 = 1000; // 1 second
const RECOVERY_BATCH: i64 = 500;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting résumé parse worker");

    let config = AppConfig::from_env().expect("Failed to load configuration");

    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    let queue = Arc::new(JobQueue::new(&config.redis_url).expect("Failed to initialize poll queue"));

    let provider: Arc<dyn ParsingProvider> = Arc::new(
        ApyHubClient::new(config.provider_config())
            .expect("Failed to initialize parsing provider client"),
    );
    let store: Arc<dyn ParsingStore> = Arc::new(PgParsingStore::new(db_pool));
    let mapper = config
        .status_mapper()
        .expect("Invalid PROVIDER_STATUS_MAP");
    let reconciler = Arc::new(Reconciler::new(provider, store.clone(), mapper));
    let policy = config.poll_policy();

    if let Err(e) = requeue_in_flight(store.as_ref(), queue.as_ref()).await {
        tracing::error!(error = %e, "Failed to recover in-flight jobs");
    }

    let permits = Arc::new(Semaphore::new(config.worker_concurrency.max(1)));

    tracing::info!(
        concurrency = config.worker_concurrency,
        max_attempts = policy.max_attempts,
        interval_secs = policy.interval.as_secs(),
        "Worker ready, starting poll loop"
    );

    loop {
        let permit = match permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };

        match queue.dequeue().await {
            Ok(Some(task)) => {
                let reconciler = reconciler.clone();
                let queue = queue.clone();
                tokio::spawn(async move {
                    run_task(&reconciler, &queue, &task, &policy).await;
                    drop(permit);
                });
            }
            Ok(None) => {
                tracing::trace!("No jobs to poll, sleeping");
                drop(permit);
                sleep(Duration::from_millis(IDLE_POLL_INTERVAL_MS)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to dequeue poll task, will retry");
                drop(permit);
                sleep(Duration::from_millis(IDLE_POLL_INTERVAL_MS)).await;
            }
        }
    }
}

/// Poll one job to a terminal state, then release it from the in-flight list.
async fn run_task(reconciler: &Reconciler, queue: &JobQueue, task: &PollTask, policy: &PollPolicy) {
    tracing::info!(
        candidate_id = %task.candidate_id,
        job_id = %task.job_id,
        "Polling parse job"
    );

    match reconciler.poll_until_terminal(task, policy).await {
        Ok(ReconcileOutcome::Completed { .. }) => {
            tracing::info!(candidate_id = %task.candidate_id, job_id = %task.job_id, "Parse job completed");
        }
        Ok(outcome) => {
            tracing::info!(
                candidate_id = %task.candidate_id,
                job_id = %task.job_id,
                outcome = ?outcome,
                "Parse job settled"
            );
        }
        Err(e) => {
            // No caller to report to; the record keeps its last persisted state
            // and the next profile read reconciles again.
            tracing::error!(
                candidate_id = %task.candidate_id,
                job_id = %task.job_id,
                error = %e,
                "Parse job polling aborted"
            );
        }
    }

    if let Err(e) = queue.complete(task).await {
        tracing::warn!(job_id = %task.job_id, error = %e, "Failed to release poll task");
    }
}

/// Recover work left behind by a previous worker run.
///
/// Stranded in-flight tasks go back onto the queue first. Then every record
/// still in `processing` gets a task unless one is already queued.
async fn requeue_in_flight(
    store: &dyn ParsingStore,
    queue: &JobQueue,
) -> Result<usize, Box<dyn std::error::Error>> {
    let recovered = queue.recover_in_flight().await?;
    if recovered > 0 {
        tracing::info!(recovered, "Returned stranded in-flight tasks to the poll queue");
    }

    let queued = queue.queued_tasks().await?;
    let candidates = store
        .list_processing(RECOVERY_BATCH)
        .await?
        .into_iter()
        .filter_map(|record| {
            record.job_id.map(|job_id| PollTask {
                candidate_id: record.candidate_id,
                job_id,
            })
        });

    let missing = missing_tasks(candidates, &queued);
    for task in &missing {
        queue.enqueue(task).await?;
    }

    if !missing.is_empty() {
        tracing::info!(requeued = missing.len(), "Re-enqueued in-flight parse jobs");
    }
    Ok(missing.len())
}
