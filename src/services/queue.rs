use std::collections::HashSet;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const QUEUE_KEY: &str = "resume_parse:poll";
const PROCESSING_KEY: &str = "resume_parse:polling";

/// Background reconciliation request for one submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PollTask {
    pub candidate_id: Uuid,
    pub job_id: String,
}

/// Hand-off point between the request path and the background poller.
#[async_trait]
pub trait PollQueue: Send + Sync {
    async fn enqueue(&self, task: &PollTask) -> Result<(), QueueError>;
}

/// Redis-backed poll queue with an in-flight list for crash visibility.
pub struct JobQueue {
    client: redis::Client,
}

impl JobQueue {
    pub fn new(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Pop the oldest task, moving it onto the in-flight list.
    pub async fn dequeue(&self) -> Result<Option<PollTask>, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let result: Option<String> = conn.rpoplpush(QUEUE_KEY, PROCESSING_KEY).await?;

        match result {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Check Redis connectivity (for health checks).
    pub async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    /// Number of tasks waiting to be polled.
    pub async fn queue_depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let depth: u64 = conn.llen(QUEUE_KEY).await?;
        Ok(depth)
    }

    /// Move tasks stranded in the in-flight list by a stopped worker back
    /// onto the dequeue end of the queue. Returns how many were moved.
    pub async fn recover_in_flight(&self) -> Result<usize, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let stranded: Vec<String> = conn.lrange(PROCESSING_KEY, 0, -1).await?;
        if stranded.is_empty() {
            return Ok(0);
        }

        redis::pipe()
            .atomic()
            .rpush(QUEUE_KEY, &stranded)
            .ignore()
            .del(PROCESSING_KEY)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;
        Ok(stranded.len())
    }

    /// Tasks currently waiting to be polled. Undecodable entries are skipped.
    pub async fn queued_tasks(&self) -> Result<Vec<PollTask>, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payloads: Vec<String> = conn.lrange(QUEUE_KEY, 0, -1).await?;
        Ok(payloads
            .iter()
            .filter_map(|payload| serde_json::from_str(payload).ok())
            .collect())
    }

    /// Drop a finished task from the in-flight list.
    pub async fn complete(&self, task: &PollTask) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(task)?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload).await?;
        Ok(())
    }
}

/// Candidates that still need a poll task, excluding any already queued.
/// Each task appears at most once in the result.
pub fn missing_tasks(
    candidates: impl IntoIterator<Item = PollTask>,
    queued: &[PollTask],
) -> Vec<PollTask> {
    let mut seen: HashSet<PollTask> = queued.iter().cloned().collect();
    candidates
        .into_iter()
        .filter(|task| seen.insert(task.clone()))
        .collect()
}

#[async_trait]
impl PollQueue for JobQueue {
    async fn enqueue(&self, task: &PollTask) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(task)?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, &payload).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
