//! # Events
//!
//! Stage events are synchronous: [`crate::runtime::Vm::emit`] runs every
//! matching rule, behavior and scenario handler, then hands the [`Event`]
//! to host listeners registered here, before it returns.
//!
//! ## Dispatch Order
//!
//! ```text
//! emit(name, data)
//!   ├─▶ rules on <name>
//!   ├─▶ behavior handlers on <name>
//!   ├─▶ active scenario handlers on <name>
//!   ├─▶ listeners for <name>
//!   └─▶ listeners for "*"
//! ```
//!
//! Listeners are snapshotted before each dispatch, so a listener may
//! subscribe or unsubscribe (itself included) while it runs.

pub mod listener;

pub use listener::{Event, Listener, ListenerId, ListenerRegistry, Subscription, WILDCARD};
