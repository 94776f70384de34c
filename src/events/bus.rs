//! # Event bus for runtime lifecycle events.
//!
//! [`Bus`] wraps a [`tokio::sync::broadcast`] channel and a [`SubscriberSet`].
//! Publishing never blocks: subscribers are invoked inline on the publishing
//! thread, and the event is then offered to any broadcast receivers.
//!
//! ## Architecture
//! ```text
//! Publishers (many threads):           Consumers:
//!   main thread    ──┐
//!   io-cancel-hook ──┼──► Bus ──┬──► SubscriberSet::emit(&Event)   (inline, panic-isolated)
//!   compute worker ──┤          └──► broadcast receivers            (try_recv / recv)
//!   monitor        ──┘
//! ```
//!
//! Events are published from plain OS threads (the main thread, the hook
//! thread) as well as from inside the compute pool, and keep flowing after the
//! pool is torn down. That is why fan-out is synchronous here.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never waits on a receiver.
//! - **Bounded capacity**: broadcast receivers that lag get `RecvError::Lagged(n)`.
//! - **No persistence**: events are lost for receivers created after the send.

use std::sync::Arc;

use tokio::sync::broadcast;

use super::event::Event;
use crate::subscribers::SubscriberSet;

/// Broadcast channel plus inline subscriber fan-out.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns once subscribers returned.
/// - **Fire-and-forget**: no delivery or durability guarantees for receivers.
/// - **Cloneable**: cheap to clone (internally `Arc`-backed).
#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
    subs: Arc<SubscriberSet>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity and subscribers.
    ///
    /// The minimum capacity is 1 (clamped).
    pub fn new(capacity: usize, subs: Arc<SubscriberSet>) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx, subs }
    }

    /// Creates a bus without subscribers.
    pub fn detached(capacity: usize) -> Self {
        Self::new(capacity, Arc::new(SubscriberSet::empty()))
    }

    /// Publishes an event to all subscribers and active receivers.
    pub fn publish(&self, ev: Event) {
        self.subs.emit(&ev, self);
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    ///
    /// - Each call creates an **independent** receiver.
    /// - A receiver only gets events **sent after** it subscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Publishes without subscriber fan-out; used to report subscriber panics.
    pub(crate) fn publish_raw(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn receivers_see_events_after_subscribe() {
        let bus = Bus::detached(8);
        bus.publish(Event::new(EventKind::RootSubmitted));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::RootCompleted).with_exit_code(0));

        let ev = rx.try_recv().expect("event published after subscribe");
        assert_eq!(ev.kind, EventKind::RootCompleted);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn publish_without_receivers_is_silent() {
        let bus = Bus::detached(0);
        bus.publish(Event::new(EventKind::ResourcesReleased));
    }
}
