// service/live.rs
use std::collections::HashMap;

use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    RwLock,
};
use uuid::Uuid;

use crate::models::{
    chatmodels::{insert_ordered, Message},
    notificationmodel::Notification,
    taskmodel::Task,
};

pub const DEFAULT_TOPIC_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Task(Uuid),
    Chat(Uuid),
    Notifications(Uuid),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum LiveEvent {
    Task(Task),
    Message(Message),
    Notification(Notification),
}

/// In-process publish/subscribe keyed by topic. One broadcast channel per
/// topic, created on first subscribe and dropped once nobody listens.
#[derive(Debug)]
pub struct LiveHub {
    channels: RwLock<HashMap<Topic, broadcast::Sender<LiveEvent>>>,
    capacity: usize,
}

impl Default for LiveHub {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_CAPACITY)
    }
}

impl LiveHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub async fn subscribe(&self, topic: Topic) -> broadcast::Receiver<LiveEvent> {
        let mut channels = self.channels.write().await;
        channels
            .entry(topic)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Returns how many subscribers received the event. Never blocks on slow
    /// receivers; they lag instead.
    pub async fn publish(&self, topic: Topic, event: LiveEvent) -> usize {
        {
            let channels = self.channels.read().await;
            match channels.get(&topic) {
                None => return 0,
                Some(sender) => {
                    if let Ok(delivered) = sender.send(event) {
                        return delivered;
                    }
                }
            }
        }

        // Every receiver is gone.
        let mut channels = self.channels.write().await;
        if channels
            .get(&topic)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            channels.remove(&topic);
            tracing::debug!("Pruned live topic {:?}", topic);
        }
        0
    }

    /// Drops channels whose subscribers have all gone away.
    pub async fn prune(&self) -> usize {
        let mut channels = self.channels.write().await;
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        before - channels.len()
    }

    pub async fn topic_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

/// Turns a receiver into a stream. A lagging subscriber's stream ends so the
/// client can re-subscribe and start from a fresh snapshot.
pub fn event_stream(rx: broadcast::Receiver<LiveEvent>) -> impl Stream<Item = LiveEvent> {
    futures::stream::unfold(rx, |mut rx| async move {
        match rx.recv().await {
            Ok(event) => Some((event, rx)),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Live subscriber lagged by {} events, closing feed", skipped);
                None
            }
            Err(RecvError::Closed) => None,
        }
    })
}

/// Current task first, then every update published for it.
pub fn task_feed(initial: Task, rx: broadcast::Receiver<LiveEvent>) -> impl Stream<Item = Task> {
    let updates = event_stream(rx).filter_map(|event| async move {
        match event {
            LiveEvent::Task(task) => Some(task),
            _ => None,
        }
    });
    futures::stream::once(async move { initial }).chain(updates)
}

/// Full ordered message list first, then the updated list after each insert.
pub fn message_snapshots(
    initial: Vec<Message>,
    rx: broadcast::Receiver<LiveEvent>,
) -> impl Stream<Item = Vec<Message>> {
    let first = futures::stream::once({
        let initial = initial.clone();
        async move { initial }
    });

    let updates = event_stream(rx)
        .scan(initial, |messages, event| {
            let changed = match event {
                LiveEvent::Message(message) => insert_ordered(messages, message),
                _ => false,
            };
            let snapshot = changed.then(|| messages.clone());
            async move { Some(snapshot) }
        })
        .filter_map(|snapshot| async move { snapshot });

    first.chain(updates)
}

pub fn notification_feed(rx: broadcast::Receiver<LiveEvent>) -> impl Stream<Item = Notification> {
    event_stream(rx).filter_map(|event| async move {
        match event {
            LiveEvent::Notification(notification) => Some(notification),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn message(chat_id: Uuid, offset_secs: i64, text: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            chat_id,
            sender_id: Uuid::new_v4(),
            text: text.to_string(),
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_a_no_op() {
        let hub = LiveHub::default();
        let chat_id = Uuid::new_v4();
        let delivered = hub
            .publish(Topic::Chat(chat_id), LiveEvent::Message(message(chat_id, 0, "hi")))
            .await;
        assert_eq!(delivered, 0);
        assert_eq!(hub.topic_count().await, 0);
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let hub = LiveHub::default();
        let chat_a = Uuid::new_v4();
        let chat_b = Uuid::new_v4();
        let mut rx_a = hub.subscribe(Topic::Chat(chat_a)).await;
        let mut rx_b = hub.subscribe(Topic::Chat(chat_b)).await;

        hub.publish(Topic::Chat(chat_a), LiveEvent::Message(message(chat_a, 0, "for a")))
            .await;

        match rx_a.recv().await.unwrap() {
            LiveEvent::Message(m) => assert_eq!(m.text, "for a"),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(
            rx_b.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_dropped_subscribers_are_pruned() {
        let hub = LiveHub::default();
        let chat_id = Uuid::new_v4();
        let rx = hub.subscribe(Topic::Chat(chat_id)).await;
        assert_eq!(hub.topic_count().await, 1);
        drop(rx);

        let delivered = hub
            .publish(Topic::Chat(chat_id), LiveEvent::Message(message(chat_id, 0, "hi")))
            .await;
        assert_eq!(delivered, 0);
        assert_eq!(hub.topic_count().await, 0);
    }

    #[tokio::test]
    async fn test_message_snapshots_start_with_history_and_stay_ordered() {
        let hub = LiveHub::default();
        let chat_id = Uuid::new_v4();
        let first = message(chat_id, 0, "first");
        let rx = hub.subscribe(Topic::Chat(chat_id)).await;
        let mut feed = Box::pin(message_snapshots(vec![first.clone()], rx));

        let snapshot = feed.next().await.unwrap();
        assert_eq!(snapshot, vec![first.clone()]);

        let third = message(chat_id, 20, "third");
        let second = message(chat_id, 10, "second");
        hub.publish(Topic::Chat(chat_id), LiveEvent::Message(third.clone()))
            .await;
        // Already in the snapshot, so it must not produce a new item.
        hub.publish(Topic::Chat(chat_id), LiveEvent::Message(first.clone()))
            .await;
        hub.publish(Topic::Chat(chat_id), LiveEvent::Message(second.clone()))
            .await;

        let snapshot = feed.next().await.unwrap();
        assert_eq!(snapshot, vec![first.clone(), third.clone()]);
        let snapshot = feed.next().await.unwrap();
        assert_eq!(snapshot, vec![first, second, third]);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_feed_ends() {
        let hub = LiveHub::new(2);
        let chat_id = Uuid::new_v4();
        let rx = hub.subscribe(Topic::Chat(chat_id)).await;
        let mut feed = Box::pin(event_stream(rx));

        for i in 0..5 {
            hub.publish(
                Topic::Chat(chat_id),
                LiveEvent::Message(message(chat_id, i, "spam")),
            )
            .await;
        }

        assert!(feed.next().await.is_none());
    }
}
