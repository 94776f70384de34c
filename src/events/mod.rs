//! Runtime events: types and bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish runtime lifecycle events emitted by the driver, the exit hook,
//! the shutdown sequence and the unforked-host monitor.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] broadcast channel plus inline subscriber fan-out
//!
//! ## Quick reference
//! - **Publishers**: `AppRuntime`, `RootDriver` completion callback, `ExitHook`,
//!   `ShutdownSequence`, `InterruptMonitor`.
//! - **Consumers**: [`Subscribe`](crate::Subscribe) implementors and broadcast receivers.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
