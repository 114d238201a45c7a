//! The cached, stateful unit of one (loader, variable set) pair.

use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::oneshot;
use uuid::Uuid;

use loadhub_core::config::ClientOptions;
use loadhub_core::dehydrate::DehydratedInstance;
use loadhub_core::state::{LoadStatus, StateSnapshot};
use loadhub_core::traits::VariableLoader;
use loadhub_core::{AppError, AppResult};
use loadhub_store::Store;

use crate::client::ClientAttachment;

/// Handle to an in-flight load. Cloneable and awaitable; settles when the
/// load settles, regardless of how it settled.
pub type LoadPromise = Shared<BoxFuture<'static, ()>>;

/// One cached load: status, data/error, and the in-flight operation handle.
///
/// Created lazily by its owning [`Loader`](crate::Loader) on first reference
/// to a variable set, and never destroyed by this workspace (garbage
/// collection is an external collaborator's responsibility). The promise
/// slot holds `Some` exactly while status is pending; [`LoaderInstance::load`]
/// is the single entry point that repairs that invariant if a hydrated
/// pending state arrives without an operation behind it.
pub struct LoaderInstance<V, D, E> {
    id: Uuid,
    loader_key: String,
    variables: V,
    var_json: serde_json::Value,
    store: Arc<Store<StateSnapshot<D, E>>>,
    promise: Mutex<Option<LoadPromise>>,
    backend: Arc<dyn VariableLoader<V, D, E>>,
    max_age: Option<Duration>,
    client: OnceLock<ClientAttachment>,
}

impl<V, D, E> LoaderInstance<V, D, E>
where
    V: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        loader_key: String,
        variables: V,
        var_json: serde_json::Value,
        backend: Arc<dyn VariableLoader<V, D, E>>,
        max_age: Option<Duration>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            loader_key,
            variables,
            var_json,
            store: Arc::new(Store::new(StateSnapshot::idle())),
            promise: Mutex::new(None),
            backend,
            max_age,
            client: OnceLock::new(),
        })
    }

    /// Identity of this instance. Stable for the instance's lifetime; the
    /// binding layer keys subscriptions and refresh effects on it.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Key of the owning loader.
    pub fn loader_key(&self) -> &str {
        &self.loader_key
    }

    /// The variable set this instance caches.
    pub fn variables(&self) -> &V {
        &self.variables
    }

    /// Canonical JSON form of the variable set.
    pub fn var_json(&self) -> &serde_json::Value {
        &self.var_json
    }

    /// The instance's reactive store. Single source of truth for
    /// status/data/error; every reader of this instance observes the same
    /// value after any write.
    pub fn store(&self) -> &Arc<Store<StateSnapshot<D, E>>> {
        &self.store
    }

    /// Current state, cloned out.
    pub fn snapshot(&self) -> StateSnapshot<D, E> {
        self.store.get()
    }

    /// The in-flight promise, if a load is pending.
    pub fn promise(&self) -> Option<LoadPromise> {
        self.lock_promise().clone()
    }

    /// Freshness window for this instance: the loader-level override if set,
    /// otherwise the owning client's live default, otherwise the global
    /// default.
    pub fn effective_max_age(&self) -> Duration {
        if let Some(max_age) = self.max_age {
            return max_age;
        }
        match self.client.get() {
            Some(attachment) => attachment.options().default_max_age(),
            None => ClientOptions::default().default_max_age(),
        }
    }

    /// Trigger the load operation.
    ///
    /// Returns the existing promise when a load is already in flight, an
    /// already-settled promise when state is fresh, and otherwise
    /// transitions to pending (retaining stale data for
    /// stale-while-refetch), spawns the fetch, and returns its promise.
    pub fn load(self: &Arc<Self>) -> LoadPromise {
        let mut slot = self.lock_promise();
        if let Some(promise) = slot.as_ref() {
            return promise.clone();
        }

        let snapshot = self.store.get();
        if snapshot.is_fresh(self.effective_max_age(), Utc::now()) {
            tracing::debug!(loader_key = %self.loader_key, instance_id = %self.id, "Load skipped, data fresh");
            return futures::future::ready(()).boxed().shared();
        }

        tracing::debug!(loader_key = %self.loader_key, instance_id = %self.id, "Load started");
        let (done_tx, done_rx) = oneshot::channel::<()>();
        let promise: LoadPromise = done_rx.map(|_| ()).boxed().shared();
        // Publish the promise before the pending transition: listeners run
        // synchronously inside the store update and may re-read the promise
        // slot, so it must already be released and populated.
        *slot = Some(promise.clone());
        drop(slot);

        self.store.update(|state| state.status = LoadStatus::Pending);
        if let Some(attachment) = self.client.get() {
            attachment.store().update(|client| {
                client.active_loads += 1;
                client.is_loading = true;
            });
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let result = this.backend.load(this.variables.clone()).await;
            this.settle(result);
            let _ = done_tx.send(());
        });

        promise
    }

    /// Overwrite state from an external snapshot.
    ///
    /// Idempotent: seeding the same snapshot twice with no intervening load
    /// yields identical state. Does not touch the promise slot.
    pub fn hydrate_state(&self, snapshot: StateSnapshot<D, E>) {
        tracing::debug!(loader_key = %self.loader_key, instance_id = %self.id, status = ?snapshot.status, "Hydrating instance state");
        self.store.set(snapshot);
    }

    /// Mark the cached data invalid so the next load refetches regardless
    /// of age.
    pub fn invalidate(&self) {
        self.store.update(|state| state.invalid = true);
    }

    /// Capture the current state in its wire form.
    pub fn dehydrate(&self) -> AppResult<DehydratedInstance>
    where
        D: serde::Serialize,
        E: std::fmt::Display,
    {
        DehydratedInstance::capture(&self.loader_key, self.var_json.clone(), &self.store.get())
            .map_err(AppError::from)
    }

    pub(crate) fn attach_client(&self, attachment: ClientAttachment) {
        let _ = self.client.set(attachment);
    }

    fn settle(&self, result: Result<D, E>) {
        *self.lock_promise() = None;
        match result {
            Ok(data) => {
                tracing::debug!(loader_key = %self.loader_key, instance_id = %self.id, "Load settled with data");
                self.store.update(|state| {
                    state.status = LoadStatus::Success;
                    state.data = Some(data);
                    state.error = None;
                    state.updated_at = Some(Utc::now());
                    state.invalid = false;
                });
            }
            Err(error) => {
                tracing::warn!(loader_key = %self.loader_key, instance_id = %self.id, "Load settled with error");
                self.store.update(|state| {
                    state.status = LoadStatus::Error;
                    state.error = Some(error);
                });
            }
        }
        if let Some(attachment) = self.client.get() {
            attachment.store().update(|client| {
                client.active_loads = client.active_loads.saturating_sub(1);
                client.is_loading = client.active_loads > 0;
            });
        }
    }

    fn lock_promise(&self) -> std::sync::MutexGuard<'_, Option<LoadPromise>> {
        self.promise.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<V, D, E> std::fmt::Debug for LoaderInstance<V, D, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderInstance")
            .field("id", &self.id)
            .field("loader_key", &self.loader_key)
            .field("variables", &self.var_json)
            .finish_non_exhaustive()
    }
}
