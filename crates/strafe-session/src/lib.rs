//! Session lifecycle and input synchronization.
//!
//! [`SessionLoader`] drives a host or client from "not in a game" to
//! "playing" (joining, creating, map changes, map-change reconnects).
//! [`CommandRouter`] moves per-tick [`UserCmd`](strafe_net::UserCmd)s between
//! clients and the host and derives hover transitions from them.

pub mod console;
pub mod content;
pub mod context;
pub mod entity;
pub mod events;
pub mod host;
pub mod loader;
pub mod router;
pub mod state;

#[cfg(test)]
mod testing;

pub use console::{ConsoleCommand, ConsoleError, parse_console_line};
pub use content::{ContentError, ContentItem, ContentProvider, GamemodeLoader};
pub use context::SessionContext;
pub use entity::{Controllable, Entity, EntityDirectory, Interactable, Motion};
pub use events::{LifecycleEvent, LifecycleObservers, SubscriptionId};
pub use host::launch_host;
pub use loader::{JoinParameters, SessionLoader, SessionSettings};
pub use router::{CommandRouter, RouterInput};
pub use state::{LoadOutcome, Role, SessionState};
