//! The client: aggregates keyed loaders, owns the live configuration, and
//! exposes a client-level store for subtree-wide observation.

use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use serde::Serialize;

use loadhub_core::config::{ClientOptions, ClientOverrides};
use loadhub_core::dehydrate::DehydratedClient;
use loadhub_core::{AppError, AppResult};
use loadhub_store::Store;

use crate::loader::{AnyLoader, Loader};

/// Client-wide observable state: aggregation of in-flight loads across all
/// registered loaders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientState {
    /// Whether any load is in flight.
    pub is_loading: bool,
    /// Number of loads in flight.
    pub active_loads: usize,
}

/// What a registered loader shares with its owning client: a live view of
/// the client options and the client-level store.
#[derive(Clone)]
pub struct ClientAttachment {
    options: Arc<RwLock<ClientOptions>>,
    store: Arc<Store<ClientState>>,
}

impl ClientAttachment {
    /// Current client options, cloned out of the live view.
    pub fn options(&self) -> ClientOptions {
        self.options
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The client-level store.
    pub fn store(&self) -> &Arc<Store<ClientState>> {
        &self.store
    }
}

/// Aggregates loaders by key and holds configuration overridable per scope.
pub struct LoaderClient {
    options: Arc<RwLock<ClientOptions>>,
    loaders: DashMap<String, Arc<dyn AnyLoader>>,
    store: Arc<Store<ClientState>>,
}

impl LoaderClient {
    /// Create a client with the given options.
    pub fn new(options: ClientOptions) -> Arc<Self> {
        Arc::new(Self {
            options: Arc::new(RwLock::new(options)),
            loaders: DashMap::new(),
            store: Arc::new(Store::new(ClientState::default())),
        })
    }

    /// Create a client with default options.
    pub fn with_defaults() -> Arc<Self> {
        Self::new(ClientOptions::default())
    }

    /// Register a loader under its key.
    ///
    /// The loader and its existing instances are attached to this client's
    /// live options and store. One loader per key; a duplicate key is a
    /// configuration error.
    pub fn register<L: AnyLoader>(&self, loader: Arc<L>) -> AppResult<()> {
        let erased: Arc<dyn AnyLoader> = loader;
        let key = erased.key().to_string();
        if self.loaders.contains_key(&key) {
            return Err(AppError::configuration(format!(
                "A loader is already registered under key '{key}'"
            )));
        }
        erased.attach_client(self.attachment());
        tracing::info!(loader_key = %key, "Loader registered");
        self.loaders.insert(key, erased);
        Ok(())
    }

    /// Look up a registered loader without type recovery.
    pub fn loader_raw(&self, key: &str) -> AppResult<Arc<dyn AnyLoader>> {
        self.loaders
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| AppError::not_found(format!("No loader registered under key '{key}'")))
    }

    /// Look up a registered loader and recover its concrete type.
    pub fn loader<V, D, E>(&self, key: &str) -> AppResult<Arc<Loader<V, D, E>>>
    where
        V: Send + Sync + 'static,
        D: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        let erased = self.loader_raw(key)?;
        erased.as_any().downcast::<Loader<V, D, E>>().map_err(|_| {
            AppError::configuration(format!(
                "Loader '{key}' is registered with a different variable/data/error type"
            ))
        })
    }

    /// Current options, cloned out of the live view.
    pub fn options(&self) -> ClientOptions {
        self.options
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Merge overrides into the live options, last writer wins. Called by
    /// the scope provider on every provide; all mutation happens on the
    /// render thread between commits.
    pub fn merge_options(&self, overrides: &ClientOverrides) {
        self.options
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .merge(overrides);
    }

    /// The client-level store.
    pub fn store(&self) -> &Arc<Store<ClientState>> {
        &self.store
    }

    /// Number of registered loaders.
    pub fn loader_count(&self) -> usize {
        self.loaders.len()
    }

    /// Harvest every instance of every registered loader.
    pub fn dehydrate(&self) -> AppResult<DehydratedClient> {
        let mut instances = Vec::new();
        for entry in self.loaders.iter() {
            instances.extend(entry.value().dehydrate_instances()?);
        }
        tracing::debug!(count = instances.len(), "Client dehydrated");
        Ok(DehydratedClient { instances })
    }

    /// Seed instances from a harvested payload. Instances are created on
    /// their loaders as needed; unknown loader keys are an error.
    pub fn hydrate(&self, dehydrated: &DehydratedClient) -> AppResult<()> {
        for instance in &dehydrated.instances {
            let loader = self.loader_raw(&instance.loader_key)?;
            loader.hydrate_instance(instance)?;
        }
        tracing::debug!(count = dehydrated.instances.len(), "Client hydrated");
        Ok(())
    }

    fn attachment(&self) -> ClientAttachment {
        ClientAttachment {
            options: Arc::clone(&self.options),
            store: Arc::clone(&self.store),
        }
    }
}

impl std::fmt::Debug for LoaderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderClient")
            .field("options", &self.options())
            .field("loaders", &self.loaders.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::FutureExt;
    use loadhub_core::state::{LoadStatus, StateSnapshot};
    use loadhub_core::traits::FnLoader;

    use super::*;

    fn user_loader() -> Arc<Loader<u32, String, String>> {
        let backend = Arc::new(FnLoader::new(|id: u32| {
            async move { Ok::<_, String>(format!("user-{id}")) }.boxed()
        }));
        Loader::new("user", backend)
    }

    #[tokio::test]
    async fn test_register_and_typed_lookup() {
        let client = LoaderClient::with_defaults();
        client.register(user_loader()).unwrap();

        let loader = client.loader::<u32, String, String>("user").unwrap();
        assert_eq!(loader.key(), "user");
    }

    #[tokio::test]
    async fn test_duplicate_key_is_configuration_error() {
        let client = LoaderClient::with_defaults();
        client.register(user_loader()).unwrap();
        let err = client.register(user_loader()).unwrap_err();
        assert_eq!(err.kind, loadhub_core::error::ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_typed_lookup_rejects_wrong_types() {
        let client = LoaderClient::with_defaults();
        client.register(user_loader()).unwrap();
        let err = client.loader::<String, u32, String>("user").unwrap_err();
        assert_eq!(err.kind, loadhub_core::error::ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_missing_loader_is_not_found() {
        let client = LoaderClient::with_defaults();
        let err = client
            .loader_raw("missing")
            .err()
            .expect("lookup of an unregistered key fails");
        assert_eq!(err.kind, loadhub_core::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_client_store_tracks_active_loads() {
        let client = LoaderClient::with_defaults();
        let loader = user_loader();
        client.register(Arc::clone(&loader)).unwrap();

        let instance = loader.get_instance(1).unwrap();
        let promise = instance.load();
        assert!(client.store().get().is_loading);
        promise.await;
        let state = client.store().get();
        assert!(!state.is_loading);
        assert_eq!(state.active_loads, 0);
    }

    #[tokio::test]
    async fn test_registered_loader_sees_client_max_age() {
        let client = LoaderClient::new(ClientOptions {
            default_max_age_ms: 8_000,
            ..ClientOptions::default()
        });
        let loader = user_loader();
        client.register(Arc::clone(&loader)).unwrap();

        let instance = loader.get_instance(1).unwrap();
        assert_eq!(instance.effective_max_age(), Duration::from_secs(8));

        // The view is live: later merges are visible to the instance.
        client.merge_options(
            &ClientOverrides::none().max_age(Duration::from_secs(2)),
        );
        assert_eq!(instance.effective_max_age(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_dehydrate_hydrate_round_trip() {
        let client = LoaderClient::with_defaults();
        let loader = user_loader();
        client.register(Arc::clone(&loader)).unwrap();
        loader
            .get_instance(5)
            .unwrap()
            .hydrate_state(StateSnapshot::success("user-5".to_string()));

        let payload = client.dehydrate().unwrap();

        let fresh = LoaderClient::with_defaults();
        fresh.register(user_loader()).unwrap();
        fresh.hydrate(&payload).unwrap();

        let restored = fresh
            .loader::<u32, String, String>("user")
            .unwrap()
            .get_instance(5)
            .unwrap()
            .snapshot();
        assert_eq!(restored.status, LoadStatus::Success);
        assert_eq!(restored.data.as_deref(), Some("user-5"));
    }
}
