use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};
use uuid::Uuid;

use crate::kernel::component::ServiceComponent;
use crate::kernel::constants;
use crate::kernel::error::Result as KernelResult;
use crate::messaging::error::{MessagingError, MessagingResult};
use crate::messaging::message::Message;

/// Type for subscription identifiers
pub type SubscriptionId = u64;

/// An owned future produced by a message handler
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = MessagingResult<()>> + Send + 'a>>;

/// Shared async message handler
pub type MessageHandler = Arc<dyn for<'a> Fn(&'a Message) -> HandlerFuture<'a> + Send + Sync>;

/// Wraps a synchronous closure as a [`MessageHandler`].
pub fn sync_handler<F>(f: F) -> MessageHandler
where
    F: Fn(&Message) -> MessagingResult<()> + Send + Sync + 'static,
{
    Arc::new(move |message| {
        let result = f(message);
        Box::pin(async move { result })
    })
}

/// Match a topic against a subscription pattern where `*` matches any run of
/// characters (including none).
fn topic_matches(pattern: &str, topic: &str) -> bool {
    fn matches(p: &[u8], t: &[u8]) -> bool {
        match p.split_first() {
            None => t.is_empty(),
            Some((b'*', rest)) => {
                (0..=t.len()).any(|skip| matches(rest, &t[skip..]))
            }
            Some((c, rest)) => t.split_first().is_some_and(|(tc, t_rest)| tc == c && matches(rest, t_rest)),
        }
    }
    matches(pattern.as_bytes(), topic.as_bytes())
}

/// Summary of one live subscription
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionInfo {
    pub id: SubscriptionId,
    pub topic: String,
    pub is_pattern: bool,
}

/// Bus-wide counters
#[derive(Debug, Clone, Serialize)]
pub struct MessagingStats {
    pub topics: usize,
    pub subscriptions: usize,
    pub pattern_subscriptions: usize,
    pub messages_published: u64,
    pub messages_delivered: u64,
    pub history_messages: usize,
}

struct Inner {
    subscriptions: HashMap<String, Vec<(SubscriptionId, MessageHandler)>>,
    patterns: Vec<(String, SubscriptionId, MessageHandler)>,
    history: HashMap<String, VecDeque<Message>>,
    history_capacity: usize,
    next_id: SubscriptionId,
    published: u64,
    delivered: u64,
}

impl Inner {
    fn new(history_capacity: usize) -> Self {
        Self {
            subscriptions: HashMap::new(),
            patterns: Vec::new(),
            history: HashMap::new(),
            history_capacity,
            next_id: 1,
            published: 0,
            delivered: 0,
        }
    }
}

/// In-process topic-based publish/subscribe bus with bounded per-topic
/// history and request/response correlation.
///
/// Fan-out is settle-all: every matching handler runs on its own task, so a
/// slow subscriber never holds up delivery to the others, and a failure or
/// panic in one handler is logged without touching the rest. Handlers run
/// outside the internal lock, so a handler may publish or reply without
/// deadlocking.
#[derive(Clone)]
pub struct MessagingService {
    name: &'static str,
    inner: Arc<Mutex<Inner>>,
}

impl fmt::Debug for MessagingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagingService").finish_non_exhaustive()
    }
}

impl Default for MessagingService {
    fn default() -> Self {
        Self::new(constants::DEFAULT_HISTORY_CAPACITY)
    }
}

impl MessagingService {
    /// Create a bus whose per-topic history holds at most `history_capacity`
    /// messages (oldest evicted first).
    pub fn new(history_capacity: usize) -> Self {
        Self {
            name: "MessagingService",
            inner: Arc::new(Mutex::new(Inner::new(history_capacity))),
        }
    }

    /// Publish `payload` on `topic`. The stamped message is recorded in the
    /// topic history even when nobody is subscribed, then delivered to every
    /// exact and pattern subscriber.
    pub async fn publish(&self, topic: &str, payload: Value) -> MessagingResult<Message> {
        let mut message = Message::stamp(topic, payload);
        self.dispatch(&mut message).await
    }

    async fn publish_with_reply(
        &self,
        topic: &str,
        payload: Value,
        reply_to: Option<String>,
        correlation_id: Option<Uuid>,
    ) -> MessagingResult<Message> {
        let mut message = Message::stamp(topic, payload);
        message.reply_to = reply_to;
        message.correlation_id = correlation_id;
        self.dispatch(&mut message).await
    }

    async fn dispatch(&self, message: &mut Message) -> MessagingResult<Message> {
        let handlers: Vec<(SubscriptionId, MessageHandler)> = {
            let mut inner = self.inner.lock().await;
            let capacity = inner.history_capacity;
            let history = inner.history.entry(message.topic.clone()).or_default();
            if history.len() >= capacity {
                history.pop_front();
            }
            history.push_back(message.clone());
            inner.published += 1;

            let mut matched = inner
                .subscriptions
                .get(&message.topic)
                .cloned()
                .unwrap_or_default();
            for (pattern, id, handler) in &inner.patterns {
                if topic_matches(pattern, &message.topic) {
                    matched.push((*id, handler.clone()));
                }
            }
            matched
        };

        // One task per handler: all start before any is awaited, and a panic
        // stays inside its task instead of unwinding into the publisher.
        let mut tasks = Vec::with_capacity(handlers.len());
        for (id, handler) in handlers {
            let message = message.clone();
            tasks.push((id, tokio::spawn(async move { handler(&message).await })));
        }

        let mut delivered = 0u64;
        for (id, task) in tasks {
            match task.await {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    log::warn!(
                        "messaging: subscriber {} failed on topic '{}': {}",
                        id,
                        message.topic,
                        e
                    );
                }
                Err(e) => {
                    log::warn!(
                        "messaging: subscriber {} panicked on topic '{}': {}",
                        id,
                        message.topic,
                        e
                    );
                }
            }
        }
        if delivered > 0 {
            self.inner.lock().await.delivered += delivered;
        }
        Ok(message.clone())
    }

    /// Register a handler for an exact topic. Topics come into existence on
    /// first subscribe or first publish.
    pub async fn subscribe(&self, topic: &str, handler: MessageHandler) -> SubscriptionId {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .subscriptions
            .entry(topic.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    /// Register a handler for every topic matching `pattern` (`*` wildcard),
    /// evaluated against topic names at publish time.
    pub async fn subscribe_pattern(&self, pattern: &str, handler: MessageHandler) -> SubscriptionId {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id;
        inner.next_id += 1;
        inner.patterns.push((pattern.to_string(), id, handler));
        id
    }

    /// Remove one subscription by id, or every subscription on the topic when
    /// `id` is `None`. History is untouched either way.
    pub async fn unsubscribe(&self, topic: &str, id: Option<SubscriptionId>) -> bool {
        let mut inner = self.inner.lock().await;
        let mut removed = false;
        if let Some(handlers) = inner.subscriptions.get_mut(topic) {
            let before = handlers.len();
            match id {
                Some(id) => handlers.retain(|(h_id, _)| *h_id != id),
                None => handlers.clear(),
            }
            removed = handlers.len() < before;
            if handlers.is_empty() {
                inner.subscriptions.remove(topic);
            }
        }
        if let Some(id) = id {
            let before = inner.patterns.len();
            inner.patterns.retain(|(p, p_id, _)| !(p == topic && *p_id == id));
            removed |= inner.patterns.len() < before;
        }
        removed
    }

    /// Publish a request and await the first reply, up to `timeout`.
    ///
    /// A unique correlation id and an ephemeral reply topic are allocated for
    /// the exchange. Exactly one resolution wins: a reply that loses the race
    /// against the timer finds the response slot already taken and is
    /// silently dropped.
    pub async fn request(
        &self,
        topic: &str,
        payload: Value,
        timeout: Duration,
    ) -> MessagingResult<Value> {
        let correlation_id = Uuid::new_v4();
        let reply_topic = format!("reply.{}", correlation_id);

        let (tx, rx) = oneshot::channel::<Value>();
        let slot = Arc::new(StdMutex::new(Some(tx)));
        let handler_slot = slot.clone();
        let handler: MessageHandler = Arc::new(move |message| {
            let payload = message.payload.clone();
            let slot = handler_slot.clone();
            Box::pin(async move {
                // First writer wins; late replies find an empty slot.
                if let Some(tx) = slot.lock().expect("reply slot poisoned").take() {
                    let _ = tx.send(payload);
                }
                Ok(())
            })
        });
        let sub_id = self.subscribe(&reply_topic, handler).await;

        self.publish_with_reply(topic, payload, Some(reply_topic.clone()), Some(correlation_id))
            .await?;

        let outcome = tokio::time::timeout(timeout, rx).await;
        // The ephemeral subscription goes away regardless of the outcome.
        self.unsubscribe(&reply_topic, Some(sub_id)).await;
        // Disarm the slot so a reply racing the unsubscribe is dropped too.
        slot.lock().expect("reply slot poisoned").take();

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(MessagingError::Canceled {
                topic: topic.to_string(),
            }),
            Err(_) => Err(MessagingError::Timeout {
                topic: topic.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Publish `payload` to the reply topic carried on `original`. Warns and
    /// does nothing when the original carried none.
    pub async fn reply(&self, original: &Message, payload: Value) -> MessagingResult<()> {
        match &original.reply_to {
            Some(reply_topic) => {
                self.publish_with_reply(reply_topic, payload, None, original.correlation_id)
                    .await?;
                Ok(())
            }
            None => {
                log::warn!(
                    "messaging: reply requested for message {} on '{}' with no reply topic",
                    original.id,
                    original.topic
                );
                Ok(())
            }
        }
    }

    /// Publish the same payload to every currently known topic.
    pub async fn broadcast(&self, payload: Value) -> MessagingResult<usize> {
        let topics = self.topics().await;
        for topic in &topics {
            self.publish(topic, payload.clone()).await?;
        }
        Ok(topics.len())
    }

    /// The most recent messages on `topic`, oldest first, at most `limit`.
    pub async fn history(&self, topic: &str, limit: Option<usize>) -> Vec<Message> {
        let inner = self.inner.lock().await;
        match inner.history.get(topic) {
            None => Vec::new(),
            Some(buffer) => {
                let take = limit.unwrap_or(buffer.len()).min(buffer.len());
                buffer.iter().skip(buffer.len() - take).cloned().collect()
            }
        }
    }

    /// Every topic known to the bus: subscribed to, or with recorded history.
    pub async fn topics(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        let mut topics: Vec<String> = inner
            .subscriptions
            .keys()
            .chain(inner.history.keys())
            .cloned()
            .collect();
        topics.sort();
        topics.dedup();
        topics
    }

    /// Number of exact subscribers on `topic`.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        let inner = self.inner.lock().await;
        inner.subscriptions.get(topic).map_or(0, Vec::len)
    }

    /// Every live subscription, exact and pattern.
    pub async fn subscriptions(&self) -> Vec<SubscriptionInfo> {
        let inner = self.inner.lock().await;
        let mut out: Vec<SubscriptionInfo> = inner
            .subscriptions
            .iter()
            .flat_map(|(topic, handlers)| {
                handlers.iter().map(|(id, _)| SubscriptionInfo {
                    id: *id,
                    topic: topic.clone(),
                    is_pattern: false,
                })
            })
            .collect();
        out.extend(inner.patterns.iter().map(|(pattern, id, _)| SubscriptionInfo {
            id: *id,
            topic: pattern.clone(),
            is_pattern: true,
        }));
        out.sort_by_key(|s| s.id);
        out
    }

    /// Bus-wide counters.
    pub async fn stats(&self) -> MessagingStats {
        let inner = self.inner.lock().await;
        MessagingStats {
            topics: inner
                .subscriptions
                .keys()
                .chain(inner.history.keys())
                .collect::<std::collections::HashSet<_>>()
                .len(),
            subscriptions: inner.subscriptions.values().map(Vec::len).sum(),
            pattern_subscriptions: inner.patterns.len(),
            messages_published: inner.published,
            messages_delivered: inner.delivered,
            history_messages: inner.history.values().map(VecDeque::len).sum(),
        }
    }

    /// Drop every subscription and all history.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.subscriptions.clear();
        inner.patterns.clear();
        inner.history.clear();
    }
}

#[async_trait]
impl ServiceComponent for MessagingService {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn initialize(&self) -> KernelResult<()> {
        Ok(())
    }

    async fn start(&self) -> KernelResult<()> {
        Ok(())
    }

    async fn stop(&self) -> KernelResult<()> {
        self.clear().await;
        Ok(())
    }
}
