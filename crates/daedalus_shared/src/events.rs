//! # World Event Bus
//!
//! Publish/subscribe delivery of world notifications.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   PlayerPositionChanged   ┌──────────────────┐
//! │ Player host │──────────────────────────>│                  │
//! └─────────────┘                           │    EventBus      │
//! ┌─────────────┐   BiomeRegionsUpdated     │  (per-subscriber │
//! │ BiomeLoader │──────────────────────────>│   bounded queue) │
//! └─────────────┘                           └────────┬─────────┘
//!                                                    │ drain()
//!                                           ┌────────┴─────────┐
//!                                           │  World caches    │
//!                                           └──────────────────┘
//! ```
//!
//! The event set is closed: consumers `match` on [`WorldEvent`] and the
//! compiler tells them when a new kind appears. Delivery is queued; nothing
//! runs inside `broadcast`.

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use glam::DVec3;
use parking_lot::RwLock;

use crate::coords::BiomeRegionOffset;

/// Notifications exchanged between the world and its host.
#[derive(Clone, Debug, PartialEq)]
pub enum WorldEvent {
    /// The tracked player moved. Position in world units.
    ///
    /// Consumed by: chunk and biome caches
    PlayerPositionChanged(DVec3),

    /// Region graphs or attributes changed; visuals of these offsets are stale.
    ///
    /// Emitted by: biome region loader, once per fetch
    /// Consumed by: biome region cache
    BiomeRegionsUpdated(Vec<BiomeRegionOffset>),
}

impl WorldEvent {
    /// Discriminant used for subscription filtering.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::PlayerPositionChanged(_) => EventKind::PlayerPositionChanged,
            Self::BiomeRegionsUpdated(_) => EventKind::BiomeRegionsUpdated,
        }
    }
}

/// Event discriminants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// See [`WorldEvent::PlayerPositionChanged`]
    PlayerPositionChanged,
    /// See [`WorldEvent::BiomeRegionsUpdated`]
    BiomeRegionsUpdated,
}

struct Subscriber {
    kinds: Vec<EventKind>,
    sender: Sender<WorldEvent>,
}

/// Fan-out event bus.
///
/// Cloning yields another handle to the same subscriber table. Each
/// subscriber owns a bounded queue; a full queue drops the event for that
/// subscriber only.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    capacity: usize,
}

impl EventBus {
    /// Creates a bus whose subscriber queues hold `capacity` events.
    ///
    /// Use 1024 for a typical frame loop.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            capacity: capacity.max(1),
        }
    }

    /// Registers interest in `kinds` and returns the receiving end.
    #[must_use]
    pub fn subscribe(&self, kinds: &[EventKind]) -> EventReceiver {
        let (sender, receiver) = bounded(self.capacity);
        self.subscribers.write().push(Subscriber {
            kinds: kinds.to_vec(),
            sender,
        });
        EventReceiver { receiver }
    }

    /// Delivers `event` to every interested subscriber.
    ///
    /// Returns the number of queues that accepted it. Subscribers whose
    /// receiver was dropped are pruned.
    pub fn broadcast(&self, event: &WorldEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        self.subscribers.write().retain(|subscriber| {
            if !subscriber.kinds.contains(&kind) {
                return true;
            }
            match subscriber.sender.try_send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    tracing::warn!("event queue full, dropping {:?}", kind);
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            }
        });
        delivered
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Handle for receiving events.
pub struct EventReceiver {
    receiver: Receiver<WorldEvent>,
}

impl EventReceiver {
    /// Receives all pending events (non-blocking).
    #[inline]
    pub fn drain(&self) -> Vec<WorldEvent> {
        self.receiver.try_iter().collect()
    }

    /// Receives one event (non-blocking).
    #[inline]
    pub fn try_recv(&self) -> Option<WorldEvent> {
        self.receiver.try_recv().ok()
    }

    /// Returns the number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Checks if there are pending events.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}
