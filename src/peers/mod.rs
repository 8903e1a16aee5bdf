//! Peer tracking.
//!
//! Finds the instance group this VM belongs to, keeps the list of its members
//! current and tells subscribers when their number changes.
mod error;
mod listeners;
mod resolver;
mod tracker;

pub use error::{Error, Result};
pub use listeners::{Listener, ListenerRegistry, SubscriptionId};
pub use resolver::{find_group, resolve_group};
pub use tracker::{PeerSet, PeerTracker};
