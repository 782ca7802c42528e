//! State container collaborator.
//!
//! [`StateContainer`] is what a persistor attaches to: a current snapshot
//! plus change notifications. [`Store`] is a minimal implementation that
//! holds a [`Tree`] and notifies listeners on every dispatch.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::Result;
use crate::tree::Tree;

/// Called after every state transition with the new snapshot.
pub type Listener = Box<dyn FnMut(Option<&Tree>) -> Result<()> + Send>;

/// Handle returned by [`StateContainer::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Something holding a live state tree that reports changes.
pub trait StateContainer {
    /// Current snapshot, `None` when no state has been set.
    fn state(&self) -> Option<Tree>;

    /// Register a listener for state changes.
    fn subscribe(&self, listener: Listener) -> ListenerId;

    /// Remove a listener. Returns false when it was not subscribed.
    fn unsubscribe(&self, id: ListenerId) -> bool;
}

/// Minimal state container.
///
/// Listeners run synchronously inside [`Store::dispatch`] and must not
/// subscribe or unsubscribe from within a notification.
#[derive(Default)]
pub struct Store {
    state: Mutex<Option<Tree>>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
}

impl Store {
    pub fn new(initial: Option<Tree>) -> Self {
        Self {
            state: Mutex::new(initial),
            ..Default::default()
        }
    }

    /// Replace the state and notify every listener in subscription order.
    ///
    /// All listeners run even if one fails; the first error is returned.
    pub fn dispatch(&self, state: Tree) -> Result<()> {
        *self.state.lock() = Some(state);
        self.notify()
    }

    /// Edit the state in place (starting from an empty object when unset)
    /// and notify listeners.
    pub fn update(&self, edit: impl FnOnce(&mut Tree)) -> Result<()> {
        {
            let mut state = self.state.lock();
            edit(state.get_or_insert_with(Tree::object));
        }
        self.notify()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn notify(&self) -> Result<()> {
        let snapshot = self.state.lock().clone();
        let mut first_error = None;
        for (id, listener) in self.listeners.lock().iter_mut() {
            if let Err(e) = listener(snapshot.as_ref()) {
                log::error!("State listener {:?} failed: {}", id, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl StateContainer for Store {
    fn state(&self) -> Option<Tree> {
        self.state.lock().clone()
    }

    fn subscribe(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &*self.state.lock())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TattooError;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_dispatch_notifies_with_snapshot() {
        let store = Store::new(None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        store.subscribe(Box::new(move |state: Option<&Tree>| {
            sink.lock().push(state.cloned());
            Ok(())
        }));

        store.dispatch(Tree::from(json!({"a": 1}))).unwrap();
        assert_eq!(*seen.lock(), vec![Some(Tree::from(json!({"a": 1})))]);
        assert_eq!(store.state(), Some(Tree::from(json!({"a": 1}))));
    }

    #[test]
    fn test_update_starts_from_empty_object() {
        let store = Store::default();
        store.update(|state| {
            state.set("token", "t");
        })
        .unwrap();
        assert_eq!(store.state().and_then(|s| s.to_json()), Some(json!({"token": "t"})));
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let store = Store::default();
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        let id = store.subscribe(Box::new(move |_: Option<&Tree>| {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }));

        store.dispatch(Tree::object()).unwrap();
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.dispatch(Tree::object()).unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_listener_error_reaches_dispatcher() {
        let store = Store::default();
        let later = Arc::new(AtomicU64::new(0));
        let counter = later.clone();
        store.subscribe(Box::new(|_: Option<&Tree>| Err(TattooError::storage("set", "k", "full"))));
        store.subscribe(Box::new(move |_: Option<&Tree>| {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }));

        let err = store.dispatch(Tree::object()).unwrap_err();
        assert!(matches!(err, TattooError::Storage { .. }));
        // Later listeners still ran
        assert_eq!(later.load(Ordering::Relaxed), 1);
    }
}
