use crate::message::StreamMessage;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Process-local topic pub/sub. Each subscriber gets its own unbounded
/// queue: fan-out is lossless per subscriber, unlike a broadcast channel
/// which drops messages for subscribers that fall behind.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<HashMap<String, Vec<UnboundedSender<StreamMessage>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `msg` onto every subscriber currently registered on `topic`.
    /// Dead (closed) senders are pruned as they're discovered.
    pub async fn publish(&self, topic: &str, msg: StreamMessage) {
        let mut guard = self.subscribers.lock().await;
        let Some(senders) = guard.get_mut(topic) else {
            return;
        };
        senders.retain(|tx| tx.send(msg.clone()).is_ok());
        if senders.is_empty() {
            guard.remove(topic);
        }
    }

    /// Register a new subscriber on `topic`, returning a stream of every
    /// message subsequently published to it.
    pub async fn subscribe(&self, topic: &str) -> UnboundedReceiverStream<StreamMessage> {
        let (tx, rx): (_, UnboundedReceiver<StreamMessage>) = mpsc::unbounded_channel();
        let mut guard = self.subscribers.lock().await;
        guard.entry(topic.to_string()).or_default().push(tx);
        UnboundedReceiverStream::new(rx)
    }

    #[cfg(test)]
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.subscribers.lock().await.get(topic).map(|v| v.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn each_subscriber_receives_every_message_in_order() {
        let bus = EventBus::new();
        let mut a = bus.subscribe("job:1").await;
        let mut b = bus.subscribe("job:1").await;

        for i in 0..50 {
            bus.publish("job:1", StreamMessage::control(&format!("m{i}"))).await;
        }

        for i in 0..50 {
            let expect = format!("m{i}");
            assert_eq!(a.next().await.unwrap().kind, expect);
            assert_eq!(b.next().await.unwrap().kind, expect);
        }
    }

    #[tokio::test]
    async fn publish_to_topic_with_no_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        bus.publish("job:none", StreamMessage::control("x")).await;
    }

    #[tokio::test]
    async fn dropping_a_subscriber_removes_it_from_the_topic() {
        let bus = EventBus::new();
        {
            let _rx = bus.subscribe("job:1").await;
            assert_eq!(bus.subscriber_count("job:1").await, 1);
        }
        bus.publish("job:1", StreamMessage::control("x")).await;
        assert_eq!(bus.subscriber_count("job:1").await, 0);
    }

    #[tokio::test]
    async fn separate_topics_do_not_cross_deliver() {
        let bus = EventBus::new();
        let mut a = bus.subscribe("job:1").await;
        bus.publish("job:2", StreamMessage::control("for-two")).await;
        bus.publish("job:1", StreamMessage::control("for-one")).await;
        assert_eq!(a.next().await.unwrap().kind, "for-one");
    }
}
