use crate::client_message::ClientMessage;
use crate::roster::ConnectionRegistry;
use kandra_core::JobId;
use kandra_events::{EventBus, EventLog, StreamMessage, topic_for_job};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tokio_stream::StreamExt;
use tracing::debug;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(45);

/// The transport-agnostic duplex session for one client connected to one
/// job's stream: connect, replay, tail, ping/pong, heartbeat-on-silence,
/// disconnect cleanup. Runs over plain channels so it is unit-testable
/// without a real socket; an embedding HTTP layer adapts its socket of
/// choice (WebSocket, SSE) to the `outgoing`/`incoming` channels here.
pub async fn run_session(
    job_id: JobId,
    log: Arc<dyn EventLog>,
    bus: Arc<EventBus>,
    roster: Arc<ConnectionRegistry>,
    outgoing: UnboundedSender<StreamMessage>,
    mut incoming: UnboundedReceiver<ClientMessage>,
) {
    if outgoing.send(StreamMessage::control("connected")).is_err() {
        return;
    }

    // Subscribe before replaying: if an event is appended to the log and
    // published between the replay read and the subscribe call, a
    // subscribe-after-replay ordering would miss it entirely (it predates
    // our subscription on the bus, and the replay snapshot is already
    // taken). Subscribing first means the worst case is the opposite and
    // safe one: the same event shows up in both the replay and the live
    // queue, deduplicated below by `seq`.
    let mut live = bus.subscribe(&topic_for_job(job_id)).await;

    let mut last_replayed_seq = None;
    for event in log.list(job_id, None).await {
        last_replayed_seq = Some(event.seq);
        let msg = StreamMessage::event(job_id, &event.kind, event.payload, event.created_at, event.seq);
        if outgoing.send(msg).is_err() {
            return;
        }
    }

    let conn_id = roster.register(job_id, outgoing.clone()).await;

    let mut heartbeat = Box::pin(tokio::time::sleep(HEARTBEAT_INTERVAL));

    loop {
        tokio::select! {
            maybe_event = live.next() => {
                match maybe_event {
                    Some(msg) => {
                        let already_replayed = matches!((msg.seq, last_replayed_seq), (Some(s), Some(last)) if s <= last);
                        if already_replayed {
                            continue;
                        }
                        if outgoing.send(msg).is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            maybe_client = incoming.recv() => {
                match maybe_client {
                    Some(ClientMessage::Ping) => {
                        if outgoing.send(StreamMessage::control("pong")).is_err() {
                            break;
                        }
                        heartbeat.as_mut().reset(Instant::now() + HEARTBEAT_INTERVAL);
                    }
                    Some(ClientMessage::Close) | None => break,
                }
            }
            _ = &mut heartbeat => {
                if outgoing.send(StreamMessage::control("heartbeat")).is_err() {
                    break;
                }
                heartbeat.as_mut().reset(Instant::now() + HEARTBEAT_INTERVAL);
            }
        }
    }

    debug!(%job_id, "stream session ending, cleaning up roster entry");
    roster.unregister(job_id, conn_id).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use kandra_events::{Emitter, InMemoryEventLog};
    use tokio::sync::mpsc;

    async fn harness() -> (JobId, Arc<InMemoryEventLog>, Arc<EventBus>, Arc<Emitter>, Arc<ConnectionRegistry>) {
        let log = Arc::new(InMemoryEventLog::new());
        let bus = Arc::new(EventBus::new());
        let emitter = Arc::new(Emitter::new(log.clone(), bus.clone()));
        (JobId::new(), log, bus, emitter, Arc::new(ConnectionRegistry::new()))
    }

    #[tokio::test]
    async fn sends_connected_then_replays_history_in_order() {
        let (job_id, log, bus, emitter, roster) = harness().await;
        emitter.emit(job_id, "job_created", serde_json::json!({})).await;
        emitter.emit(job_id, "status_changed", serde_json::json!({"to": "planning"})).await;

        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (_in_tx, in_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_session(job_id, log, bus, roster, out_tx, in_rx));

        assert_eq!(out_rx.recv().await.unwrap().kind, "connected");
        assert_eq!(out_rx.recv().await.unwrap().kind, "job_created");
        assert_eq!(out_rx.recv().await.unwrap().kind, "status_changed");

        handle.abort();
    }

    #[tokio::test]
    async fn forwards_live_events_published_after_connect() {
        let (job_id, log, bus, emitter, roster) = harness().await;
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (_in_tx, in_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_session(job_id, log, bus, roster, out_tx, in_rx));

        assert_eq!(out_rx.recv().await.unwrap().kind, "connected");
        emitter.emit(job_id, "agent_thought", serde_json::json!({"thought": "hi"})).await;
        assert_eq!(out_rx.recv().await.unwrap().kind, "agent_thought");

        handle.abort();
    }

    #[tokio::test]
    async fn ping_is_answered_with_pong() {
        let (job_id, log, bus, _emitter, roster) = harness().await;
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_session(job_id, log, bus, roster, out_tx, in_rx));

        assert_eq!(out_rx.recv().await.unwrap().kind, "connected");
        in_tx.send(ClientMessage::Ping).unwrap();
        assert_eq!(out_rx.recv().await.unwrap().kind, "pong");

        handle.abort();
    }

    #[tokio::test]
    async fn client_close_ends_the_session_and_clears_the_roster() {
        let (job_id, log, bus, _emitter, roster) = harness().await;
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_session(job_id, log, bus, roster.clone(), out_tx, in_rx));

        assert_eq!(out_rx.recv().await.unwrap().kind, "connected");
        in_tx.send(ClientMessage::Close).unwrap();
        handle.await.unwrap();

        assert_eq!(roster.connection_count(job_id).await, 0);
    }

    #[tokio::test]
    async fn an_event_published_on_the_bus_before_replay_reads_it_is_not_duplicated() {
        // Emit before the session starts at all: it lands in both the
        // log snapshot the replay reads and (since subscribe happens
        // first in `run_session`) would also be visible on the live
        // queue were it not for the seq-based dedup.
        let (job_id, log, bus, emitter, roster) = harness().await;
        emitter.emit(job_id, "job_created", serde_json::json!({})).await;

        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (_in_tx, in_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_session(job_id, log, bus.clone(), roster, out_tx, in_rx));

        assert_eq!(out_rx.recv().await.unwrap().kind, "connected");
        assert_eq!(out_rx.recv().await.unwrap().kind, "job_created");

        // A genuinely new event after replay must still come through exactly once.
        emitter.emit(job_id, "agent_thought", serde_json::json!({})).await;
        assert_eq!(out_rx.recv().await.unwrap().kind, "agent_thought");

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn silence_triggers_a_heartbeat_after_the_interval() {
        let (job_id, log, bus, _emitter, roster) = harness().await;
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (_in_tx, in_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_session(job_id, log, bus, roster, out_tx, in_rx));

        assert_eq!(out_rx.recv().await.unwrap().kind, "connected");
        tokio::time::advance(HEARTBEAT_INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(out_rx.recv().await.unwrap().kind, "heartbeat");

        handle.abort();
    }
}
