use chrono::{DateTime, Utc};
use kandra_core::JobId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire shape for both bus-delivered and replayed events, and for the
/// Stream Endpoint's own control messages. Control messages
/// (`connected`, `pong`, `heartbeat`) omit `payload` and `timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Not part of the wire envelope (the dashboard doesn't need it); carried
    /// internally so a stream session can de-duplicate a live event against
    /// one already delivered by replay. See `run_session`'s subscribe-before-
    /// replay ordering.
    #[serde(skip)]
    pub seq: Option<u64>,
}

impl StreamMessage {
    pub fn event(job_id: JobId, kind: &str, payload: Value, timestamp: DateTime<Utc>, seq: u64) -> Self {
        Self {
            kind: kind.to_string(),
            job_id: Some(job_id),
            payload: Some(payload),
            timestamp: Some(timestamp),
            seq: Some(seq),
        }
    }

    pub fn control(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            job_id: None,
            payload: None,
            timestamp: None,
            seq: None,
        }
    }
}

pub fn topic_for_job(job_id: JobId) -> String {
    format!("job:{job_id}")
}
