//! Event Bus implementation.
//!
//! Each sender owns one bus. Handlers registered with [`EventBus::subscribe`]
//! run synchronously on the publishing thread, in publish order; async
//! consumers can poll a broadcast receiver instead.

use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{SenderEvent, SenderEventKind};
use crate::config::DEFAULT_EVENT_CAPACITY;

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = self.0.simple().to_string();
        write!(f, "sub-{}", &id[..8])
    }
}

/// Which events a handler is interested in
#[derive(Debug, Clone, Default)]
pub enum EventFilter {
    #[default]
    All,
    Kinds(Vec<SenderEventKind>),
}

impl EventFilter {
    /// Whether `event` passes this filter
    pub fn matches(&self, event: &SenderEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Kinds(kinds) => kinds.contains(&event.kind()),
        }
    }
}

type Handler = Box<dyn Fn(SenderEvent) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    filter: EventFilter,
    handler: Handler,
}

/// Event bus sizing
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Capacity of the broadcast channel used by async receivers
    pub channel_capacity: usize,
    /// Events kept for [`EventBus::history`]; 0 keeps none
    pub max_history_size: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_EVENT_CAPACITY,
            max_history_size: 0,
        }
    }
}

/// Publish/subscribe channel for sender events
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    broadcast: broadcast::Sender<SenderEvent>,
    history: Mutex<VecDeque<SenderEvent>>,
    config: EventBusConfig,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        let (broadcast, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            subscriptions: RwLock::new(Vec::new()),
            broadcast,
            history: Mutex::new(VecDeque::new()),
            config,
        }
    }

    /// Deliver `event` to every matching handler, in subscription order, then
    /// to the async receivers
    ///
    /// Returns how many handlers and receivers saw the event. Reaching nobody
    /// is not an error.
    pub fn publish(&self, event: SenderEvent) -> usize {
        self.record(&event);

        let mut delivered = 0;
        for sub in self.subscriptions.read().iter() {
            if sub.filter.matches(&event) {
                (sub.handler)(event.clone());
                delivered += 1;
            }
        }

        delivered + self.broadcast.send(event).unwrap_or(0)
    }

    /// Register a synchronous handler
    ///
    /// Handlers run on the publishing thread under a read lock and must not
    /// subscribe or unsubscribe on the same bus.
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(SenderEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::generate();
        self.subscriptions.write().push(Subscription {
            id,
            filter,
            handler: Box::new(handler),
        });
        tracing::debug!("Subscription {} added", id);
        id
    }

    /// Receiver for polling events from async code
    pub fn receiver(&self) -> broadcast::Receiver<SenderEvent> {
        self.broadcast.subscribe()
    }

    /// Remove a handler. Returns false if `id` is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|sub| sub.id != id);

        let removed = subscriptions.len() != before;
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Recorded events, oldest first
    pub fn history(&self) -> Vec<SenderEvent> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    fn record(&self, event: &SenderEvent) {
        let limit = self.config.max_history_size;
        if limit == 0 {
            return;
        }

        let mut history = self.history.lock();
        if history.len() == limit {
            history.pop_front();
        }
        history.push_back(event.clone());
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("receivers", &self.broadcast.receiver_count())
            .field("config", &self.config)
            .finish()
    }
}
