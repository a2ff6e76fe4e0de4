use async_trait::async_trait;
use chrono::Utc;
use kandra_core::{Event, EventId, JobId};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Append-only, per-job ordered store. No update, no delete. Specified as
/// a trait so the in-memory implementation that ships here can later be
/// swapped for real persistence without touching the Emitter or the
/// Stream Endpoint.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(&self, job_id: JobId, kind: &str, payload: Value) -> Event;

    /// Events for `job_id` in ascending `(timestamp, seq)` order, optionally
    /// starting strictly after `since`.
    async fn list(&self, job_id: JobId, since: Option<EventId>) -> Vec<Event>;
}

#[derive(Default)]
pub struct InMemoryEventLog {
    by_job: Mutex<HashMap<JobId, Vec<Event>>>,
    next_seq: AtomicU64,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, job_id: JobId, kind: &str, payload: Value) -> Event {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            id: EventId::new(),
            job_id,
            kind: kind.to_string(),
            payload,
            created_at: Utc::now(),
            seq,
        };
        let mut guard = self.by_job.lock().await;
        guard.entry(job_id).or_default().push(event.clone());
        event
    }

    async fn list(&self, job_id: JobId, since: Option<EventId>) -> Vec<Event> {
        let guard = self.by_job.lock().await;
        let Some(events) = guard.get(&job_id) else {
            return Vec::new();
        };
        match since {
            None => events.clone(),
            Some(since_id) => {
                let cutoff = events.iter().position(|e| e.id == since_id).map(|i| i + 1).unwrap_or(0);
                events[cutoff..].to_vec()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_then_list_is_ordered_and_lossless() {
        let log = InMemoryEventLog::new();
        let job = JobId::new();
        for i in 0..5 {
            log.append(job, "agent_thought", serde_json::json!({"i": i})).await;
        }
        let events = log.list(job, None).await;
        assert_eq!(events.len(), 5);
        for pair in events.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
            assert!(pair[0].seq < pair[1].seq);
        }
    }

    #[tokio::test]
    async fn list_since_returns_only_the_suffix() {
        let log = InMemoryEventLog::new();
        let job = JobId::new();
        let first = log.append(job, "phase_started", Value::Null).await;
        log.append(job, "agent_thought", Value::Null).await;
        log.append(job, "phase_completed", Value::Null).await;

        let suffix = log.list(job, Some(first.id)).await;
        assert_eq!(suffix.len(), 2);
        assert_eq!(suffix[0].kind, "agent_thought");
    }

    #[tokio::test]
    async fn unknown_job_returns_empty() {
        let log = InMemoryEventLog::new();
        assert!(log.list(JobId::new(), None).await.is_empty());
    }

    #[tokio::test]
    async fn separate_jobs_do_not_see_each_others_events() {
        let log = InMemoryEventLog::new();
        let a = JobId::new();
        let b = JobId::new();
        log.append(a, "job_created", Value::Null).await;
        assert!(log.list(b, None).await.is_empty());
        assert_eq!(log.list(a, None).await.len(), 1);
    }
}
