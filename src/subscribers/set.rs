//! # SubscriberSet: panic-isolated fan-out over multiple subscribers
//!
//! [`SubscriberSet`] distributes each [`Event`](crate::events::Event) to every
//! subscriber in registration order.
//!
//! ## What it guarantees
//! - Per-subscriber order equals publish order for a single publishing thread.
//! - A panicking subscriber does not affect the others or the publisher.
//!
//! ## Diagram
//! ```text
//!    emit(&Event)
//!        ├──► catch_unwind(S1.on_event) ──► panic? ─► SubscriberPanicked (receivers only)
//!        ├──► catch_unwind(S2.on_event)
//!        └──► catch_unwind(SN.on_event)
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::error::AppError;
use crate::events::{Bus, Event};

use super::Subscribe;

/// Composite fan-out over registered subscribers.
pub struct SubscriberSet {
    subs: Vec<Arc<dyn Subscribe>>,
}

impl SubscriberSet {
    /// Creates a new set from the given subscribers.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        Self { subs }
    }

    /// Creates a set with no subscribers.
    #[must_use]
    pub fn empty() -> Self {
        Self { subs: Vec::new() }
    }

    /// Delivers one event to all subscribers.
    ///
    /// A panic inside a subscriber is logged and re-published on `bus` as
    /// `SubscriberPanicked` (to broadcast receivers only, never back into the set).
    pub fn emit(&self, event: &Event, bus: &Bus) {
        for sub in &self.subs {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| sub.on_event(event))) {
                let info = AppError::from_panic(payload).as_message();
                tracing::warn!(subscriber = sub.name(), %info, "subscriber panicked");
                bus.publish_raw(Event::subscriber_panicked(sub.name(), info));
            }
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subs.len()
    }
}
