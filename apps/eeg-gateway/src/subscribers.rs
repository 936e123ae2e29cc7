use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Per-user fan-out registry. Each connected WebSocket registers an
/// `mpsc` sender keyed by its owning user; `dispatch` delivers a message
/// to every live subscriber of one user and silently drops any sender
/// whose receiver has gone away, matching §4.4's "failed sends drop the
/// subscriber from the set" contract. One instance is shared by the
/// `/ws/eeg` raw-frame fan-out and one by the `/ws/metrics` processed
/// fan-out — both need the same "broadcast to this user's other
/// connections" shape but carry different payload types.
pub struct SubscriberRegistry<T: Clone + Send + 'static> {
    subscribers: Mutex<HashMap<Uuid, Vec<mpsc::UnboundedSender<T>>>>,
}

impl<T: Clone + Send + 'static> Default for SubscriberRegistry<T> {
    fn default() -> Self {
        SubscriberRegistry {
            subscribers: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone + Send + 'static> SubscriberRegistry<T> {
    pub fn subscribe(&self, user_id: Uuid) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .expect("subscriber registry mutex poisoned")
            .entry(user_id)
            .or_default()
            .push(tx);
        rx
    }

    /// Delivers `message` to every live subscriber of `user_id`. Entries
    /// whose receiver has dropped are pruned inline.
    pub fn dispatch(&self, user_id: Uuid, message: T) {
        let mut guard = self.subscribers.lock().expect("subscriber registry mutex poisoned");
        if let Some(senders) = guard.get_mut(&user_id) {
            senders.retain(|tx| tx.send(message.clone()).is_ok());
            if senders.is_empty() {
                guard.remove(&user_id);
            }
        }
    }

    pub fn subscriber_count(&self, user_id: Uuid) -> usize {
        self.subscribers
            .lock()
            .expect("subscriber registry mutex poisoned")
            .get(&user_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "EEG_FRAME")]
    EegFrame {
        user_id: Uuid,
        count: usize,
        data: serde_json::Value,
    },
    #[serde(rename = "PROCESSED_METRICS")]
    ProcessedMetrics {
        user_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
        metrics: MetricsPayload,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricLabelPair {
    pub value: f64,
    pub label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsPayload {
    pub focus: MetricLabelPair,
    pub stress: MetricLabelPair,
    pub wellness: MetricLabelPair,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatch_delivers_to_live_subscriber() {
        let registry: SubscriberRegistry<u32> = SubscriberRegistry::default();
        let user_id = Uuid::new_v4();
        let mut rx = registry.subscribe(user_id);
        registry.dispatch(user_id, 42);
        assert_eq!(rx.recv().await, Some(42));
    }

    #[tokio::test]
    async fn dispatch_prunes_dropped_subscribers() {
        let registry: SubscriberRegistry<u32> = SubscriberRegistry::default();
        let user_id = Uuid::new_v4();
        let rx = registry.subscribe(user_id);
        drop(rx);
        registry.dispatch(user_id, 1);
        assert_eq!(registry.subscriber_count(user_id), 0);
    }

    #[test]
    fn dispatch_to_unknown_user_is_a_no_op() {
        let registry: SubscriberRegistry<u32> = SubscriberRegistry::default();
        registry.dispatch(Uuid::new_v4(), 1);
    }
}
