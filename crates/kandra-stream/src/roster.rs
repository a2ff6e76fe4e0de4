use kandra_core::JobId;
use kandra_events::StreamMessage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;

/// Opaque per-connection handle, used only to remove the right entry from
/// the roster on disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// Bookkeeping of live connections per job, independent of the Event Bus
/// subscription each connection also holds. Exists for server-directed
/// broadcast (e.g. an operator-triggered notice) that should reach every
/// open connection for a job without going through the event log.
#[derive(Default)]
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    connections: Mutex<HashMap<JobId, HashMap<ConnectionId, UnboundedSender<StreamMessage>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, job_id: JobId, sender: UnboundedSender<StreamMessage>) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.connections.lock().await.entry(job_id).or_default().insert(id, sender);
        id
    }

    pub async fn unregister(&self, job_id: JobId, id: ConnectionId) {
        let mut guard = self.connections.lock().await;
        if let Some(conns) = guard.get_mut(&job_id) {
            conns.remove(&id);
            if conns.is_empty() {
                guard.remove(&job_id);
            }
        }
    }

    /// Send `msg` to every open connection for `job_id`. Connections whose
    /// send fails (the client went away) are pruned here rather than on a
    /// timer — "clean up dead connections after a failed send."
    pub async fn broadcast(&self, job_id: JobId, msg: StreamMessage) {
        let mut guard = self.connections.lock().await;
        let Some(conns) = guard.get_mut(&job_id) else {
            return;
        };
        conns.retain(|_, tx| tx.send(msg.clone()).is_ok());
        if conns.is_empty() {
            guard.remove(&job_id);
        }
    }

    #[cfg(test)]
    pub async fn connection_count(&self, job_id: JobId) -> usize {
        self.connections.lock().await.get(&job_id).map(|c| c.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn register_and_unregister_track_connection_count() {
        let roster = ConnectionRegistry::new();
        let job = JobId::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = roster.register(job, tx).await;
        assert_eq!(roster.connection_count(job).await, 1);
        roster.unregister(job, id).await;
        assert_eq!(roster.connection_count(job).await, 0);
    }

    #[tokio::test]
    async fn broadcast_prunes_connections_whose_receiver_was_dropped() {
        let roster = ConnectionRegistry::new();
        let job = JobId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        roster.register(job, tx).await;
        drop(rx);

        roster.broadcast(job, StreamMessage::control("heartbeat")).await;
        assert_eq!(roster.connection_count(job).await, 0);
    }

    #[tokio::test]
    async fn separate_jobs_do_not_share_a_roster() {
        let roster = ConnectionRegistry::new();
        let a = JobId::new();
        let b = JobId::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        roster.register(a, tx).await;
        assert_eq!(roster.connection_count(b).await, 0);
    }
}
