//! Event bus implementation.
//!
//! One bus is shared behind an `Arc` by the editor and the in-memory diagram,
//! so a single subscription observes every change notification. Listeners run
//! on the publishing thread; async consumers poll a broadcast receiver.

use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{DiagramEvent, EventCategory};

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0.simple())
    }
}

/// Which events a listener wants
#[derive(Debug, Clone, Default)]
pub enum EventFilter {
    #[default]
    All,
    Categories(Vec<EventCategory>),
}

impl EventFilter {
    pub fn matches(&self, event: &DiagramEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Categories(categories) => categories.contains(&event.category()),
        }
    }
}

/// Bus settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventBusConfig {
    /// Buffer of the broadcast channel behind [`EventBus::receiver`].
    pub channel_capacity: usize,
    /// Number of most recent events kept for inspection; 0 keeps none.
    pub recent_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            recent_capacity: 0,
        }
    }
}

struct Listener {
    id: SubscriptionId,
    filter: EventFilter,
    handler: Box<dyn Fn(&DiagramEvent) + Send + Sync>,
}

/// Fan-out of [`DiagramEvent`]s to listeners and async receivers
pub struct EventBus {
    sender: broadcast::Sender<DiagramEvent>,
    listeners: RwLock<Vec<Listener>>,
    recent: Mutex<VecDeque<DiagramEvent>>,
    recent_capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            listeners: RwLock::new(Vec::new()),
            recent: Mutex::new(VecDeque::with_capacity(config.recent_capacity)),
            recent_capacity: config.recent_capacity,
        }
    }

    /// Bus that keeps the last `capacity` events, see [`EventBus::recent_events`].
    pub fn recording(capacity: usize) -> Self {
        Self::with_config(EventBusConfig {
            recent_capacity: capacity,
            ..EventBusConfig::default()
        })
    }

    /// Delivers `event` and returns how many listeners and receivers got it.
    pub fn publish(&self, event: DiagramEvent) -> usize {
        tracing::trace!(category = %event.category(), "{}", event.description());

        if self.recent_capacity > 0 {
            let mut recent = self.recent.lock();
            if recent.len() == self.recent_capacity {
                recent.pop_front();
            }
            recent.push_back(event.clone());
        }

        let mut delivered = 0;
        for listener in self.listeners.read().iter() {
            if listener.filter.matches(&event) {
                (listener.handler)(&event);
                delivered += 1;
            }
        }
        // No live receiver is the common case and not an error.
        delivered + self.sender.send(event).unwrap_or(0)
    }

    /// Registers a listener. It must not subscribe or unsubscribe from
    /// inside the handler.
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(&DiagramEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(Uuid::new_v4());
        self.listeners.write().push(Listener {
            id,
            filter,
            handler: Box::new(handler),
        });
        tracing::debug!("{} subscribed", id);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|listener| listener.id != id);
        listeners.len() != before
    }

    pub fn receiver(&self) -> broadcast::Receiver<DiagramEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Oldest first.
    pub fn recent_events(&self) -> Vec<DiagramEvent> {
        self.recent.lock().iter().cloned().collect()
    }

    pub fn clear_recent(&self) {
        self.recent.lock().clear();
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
            .field("listeners", &self.subscriber_count())
            .field("recent_capacity", &self.recent_capacity)
            .finish()
    }
}
