use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::panic_message;

use super::{Error, Result};

/// Opaque handle identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(uuid::Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Callback receiving the new peer count.
pub type Listener = Arc<dyn Fn(usize) + Send + Sync>;

/// Subscribers to peer count changes.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: DashMap<SubscriptionId, Listener>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ListenerRegistry {
    /// Stores `listener` under a fresh id.
    pub fn insert(&self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.insert_with_id(id, listener);
        id
    }

    /// Stores `listener` under an id the caller already handed out.
    pub fn insert_with_id(&self, id: SubscriptionId, listener: Listener) {
        self.listeners.insert(id, listener);
    }

    /// Removes the listener with `id`. Returns whether one was registered.
    pub fn remove(&self, id: &SubscriptionId) -> bool {
        self.listeners.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Calls every registered listener with `count` and returns how many
    /// returned normally.
    ///
    /// Listeners are called from a snapshot taken up front, so they may
    /// subscribe or unsubscribe while being notified. A panicking listener is
    /// logged and does not keep the others from being called.
    pub fn notify(&self, count: usize) -> usize {
        let snapshot: Vec<(SubscriptionId, Listener)> = self
            .listeners
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        snapshot
            .into_iter()
            .filter(|(id, listener)| match Self::deliver(*id, listener, count) {
                Ok(()) => true,
                Err(err) => {
                    log::error!(target: "peer listeners", "{}", err);
                    false
                }
            })
            .count()
    }

    /// Calls a single listener, turning a panic into [`Error::Listener`].
    pub fn deliver(id: SubscriptionId, listener: &Listener, count: usize) -> Result<()> {
        std::panic::catch_unwind(AssertUnwindSafe(|| listener(count))).map_err(|payload| {
            Error::Listener {
                id,
                message: panic_message(&*payload),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<usize>>>, Listener) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let listener: Listener = {
            let seen = Arc::clone(&seen);
            Arc::new(move |count| seen.lock().unwrap().push(count))
        };
        (seen, listener)
    }

    #[test]
    fn test_insert_and_remove() {
        let registry = ListenerRegistry::default();
        let (_, listener) = recorder();

        let id = registry.insert(listener);
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(&id));
        assert!(!registry.remove(&id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let registry = ListenerRegistry::default();
        let (_, listener) = recorder();
        registry.insert(listener);

        assert!(!registry.remove(&SubscriptionId::new()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = ListenerRegistry::default();
        let (_, listener) = recorder();
        let first = registry.insert(Arc::clone(&listener));
        let second = registry.insert(listener);
        assert_ne!(first, second);
    }

    #[test]
    fn test_notify_isolates_panicking_listener() {
        let registry = ListenerRegistry::default();
        let (seen, listener) = recorder();
        registry.insert(Arc::new(|_| panic!("listener exploded")));
        registry.insert(listener);

        assert_eq!(registry.notify(4), 1);
        assert_eq!(*seen.lock().unwrap(), vec![4]);
    }

    #[test]
    fn test_deliver_reports_panic() {
        let id = SubscriptionId::new();
        let listener: Listener = Arc::new(|count| panic!("cannot handle {count}"));

        match ListenerRegistry::deliver(id, &listener, 2) {
            Err(Error::Listener { id: failed, message }) => {
                assert_eq!(failed, id);
                assert_eq!(message, "cannot handle 2");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_listener_may_unsubscribe_itself() {
        let registry = Arc::new(ListenerRegistry::default());
        let own_id = Arc::new(Mutex::new(None::<SubscriptionId>));
        let listener: Listener = {
            let registry = Arc::clone(&registry);
            let own_id = Arc::clone(&own_id);
            Arc::new(move |_| {
                if let Some(id) = own_id.lock().unwrap().take() {
                    registry.remove(&id);
                }
            })
        };
        let id = registry.insert(listener);
        *own_id.lock().unwrap() = Some(id);

        assert_eq!(registry.notify(2), 1);
        assert!(registry.is_empty());
    }
}
