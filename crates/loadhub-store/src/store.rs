//! The state cell and its listener fan-out.

use std::sync::{Arc, Mutex, RwLock};

use dashmap::DashMap;
use uuid::Uuid;

use crate::subscription::SubscriptionGuard;

type Listener<S> = Box<dyn Fn(&S) + Send + Sync>;

/// A shared state cell with subscribable change notifications.
///
/// Writers notify every listener with the new state. Listeners registered
/// through [`Store::subscribe`] apply a selector and fire only when the
/// selected slice changes by value. Notification happens outside the state
/// lock, so listeners may freely read the store.
pub struct Store<S> {
    id: Uuid,
    state: RwLock<S>,
    listeners: Arc<DashMap<Uuid, Listener<S>>>,
}

impl<S> Store<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Create a store holding `initial`.
    pub fn new(initial: S) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: RwLock::new(initial),
            listeners: Arc::new(DashMap::new()),
        }
    }

    /// Identity of this store.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current state, cloned out.
    pub fn get(&self) -> S {
        self.read_lock().clone()
    }

    /// Replace the state and notify listeners.
    pub fn set(&self, next: S) {
        {
            let mut state = self.write_lock();
            *state = next;
        }
        self.notify();
    }

    /// Mutate the state in place and notify listeners.
    pub fn update(&self, mutate: impl FnOnce(&mut S)) {
        {
            let mut state = self.write_lock();
            mutate(&mut state);
        }
        self.notify();
    }

    /// Subscribe with a selector and a change callback.
    ///
    /// `selector` narrows the state to the slice the caller cares about;
    /// `on_change` fires only when that slice differs by value from the one
    /// seen at the previous notification (or at subscribe time for the
    /// first). The subscription lives until the returned guard is dropped.
    pub fn subscribe<V, Sel, F>(&self, selector: Sel, on_change: F) -> SubscriptionGuard
    where
        V: PartialEq + Send + 'static,
        Sel: Fn(&S) -> V + Send + Sync + 'static,
        F: Fn(&V) + Send + Sync + 'static,
    {
        let listener_id = Uuid::new_v4();
        // Baseline from the current state so nothing written before the
        // subscription counts as a change.
        let last_seen = Mutex::new(selector(&self.read_lock()));
        self.listeners.insert(
            listener_id,
            Box::new(move |state: &S| {
                let selected = selector(state);
                let mut last = last_seen.lock().unwrap_or_else(|e| e.into_inner());
                if *last != selected {
                    on_change(&selected);
                    *last = selected;
                }
            }),
        );
        tracing::debug!(store_id = %self.id, %listener_id, "Listener subscribed");
        let weak = Arc::downgrade(&self.listeners);
        SubscriptionGuard::new(move || {
            if let Some(listeners) = weak.upgrade() {
                listeners.remove(&listener_id);
            }
        })
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn notify(&self) {
        // Snapshot the state so listeners run without the lock held.
        let state = self.get();
        for entry in self.listeners.iter() {
            (entry.value())(&state);
        }
    }

    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, S> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, S> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl<S: std::fmt::Debug + Clone + Send + Sync + 'static> std::fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id)
            .field("state", &self.get())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
