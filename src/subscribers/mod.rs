//! # Event subscribers for the ioapp runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   ExitHook / ShutdownSequence / RootDriver ── publish(Event) ──► Bus
//!                                                                   │
//!                                                                   ├──► SubscriberSet::emit(&Event)
//!                                                                   │         │
//!                                                                   │    ┌────┴────┬─────────┐
//!                                                                   │    ▼         ▼         ▼
//!                                                                   │  LogWriter  Metrics  Custom
//!                                                                   │
//!                                                                   └──► broadcast receivers
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
