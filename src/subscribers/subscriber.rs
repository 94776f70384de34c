//! # Event subscriber trait.
//!
//! Provides [`Subscribe`] an extension point for plugging custom event handlers into the runtime.
//!
//! ## Rules
//! - Subscribers are called **inline** on the publishing thread, which may be the
//!   main thread, the exit-hook thread, a compute worker or the monitor thread.
//! - Handlers must be quick and must not block; hand heavy work to a channel.
//! - Panics are caught and reported as `EventKind::SubscriberPanicked`.
//!
//! ## Example
//! ```rust
//! use ioapp::{Event, EventKind, Subscribe};
//!
//! struct ExitAudit;
//!
//! impl Subscribe for ExitAudit {
//!     fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::RootCompleted) {
//!             // record ev.exit_code somewhere
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "exit-audit" }
//! }
//! ```

use crate::events::Event;

/// Event subscriber for runtime observability.
///
/// ### Implementation requirements
/// - Never block: the publisher may be the thread that is tearing the runtime down.
/// - Handle errors internally; do not panic.
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Events published from one thread arrive in order; events from different
    /// threads are ordered by [`Event::seq`].
    fn on_event(&self, event: &Event);

    /// Returns the subscriber name used in logs and panic events.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
