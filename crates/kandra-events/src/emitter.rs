use crate::bus::EventBus;
use crate::log::EventLog;
use crate::message::{StreamMessage, topic_for_job};
use kandra_core::{Event, JobId};
use serde_json::Value;
use std::sync::Arc;

/// Dual-write helper: append to the [`EventLog`] (source of truth), then
/// publish the identical envelope to the [`EventBus`] (low-latency path).
/// A publish failure is logged and swallowed — a subscriber that joins
/// between the two steps still sees the event via replay.
pub struct Emitter {
    log: Arc<dyn EventLog>,
    bus: Arc<EventBus>,
}

impl Emitter {
    pub fn new(log: Arc<dyn EventLog>, bus: Arc<EventBus>) -> Self {
        Self { log, bus }
    }

    pub async fn emit(&self, job_id: JobId, kind: &str, payload: Value) -> Event {
        let event = self.log.append(job_id, kind, payload).await;
        let msg = StreamMessage::event(job_id, kind, event.payload.clone(), event.created_at, event.seq);
        self.bus.publish(&topic_for_job(job_id), msg).await;
        event
    }
}
