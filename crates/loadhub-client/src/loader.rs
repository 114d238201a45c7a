//! Keyed loaders and their instance registries.

use std::any::Any;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use loadhub_core::dehydrate::DehydratedInstance;
use loadhub_core::traits::VariableLoader;
use loadhub_core::{AppError, AppResult};

use crate::client::ClientAttachment;
use crate::instance::LoaderInstance;

/// Creation observer: the documented extension slot, invoked exactly once
/// per created instance. The binding layer uses it to decorate instances at
/// creation time instead of patching shared types after the fact.
pub type InstanceObserver<V, D, E> = Arc<dyn Fn(&Arc<LoaderInstance<V, D, E>>) + Send + Sync>;

/// Per-loader configuration.
pub struct LoaderOptions<V, D, E> {
    /// Freshness-window override for this loader's instances. Falls back to
    /// the owning client's default when unset.
    pub max_age: Option<Duration>,
    /// Creation observers, run once per new instance.
    pub on_create_instance: Vec<InstanceObserver<V, D, E>>,
}

impl<V, D, E> LoaderOptions<V, D, E> {
    /// Set the freshness-window override.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Register a creation observer.
    pub fn on_create(mut self, observer: InstanceObserver<V, D, E>) -> Self {
        self.on_create_instance.push(observer);
        self
    }
}

impl<V, D, E> Default for LoaderOptions<V, D, E> {
    fn default() -> Self {
        Self {
            max_age: None,
            on_create_instance: Vec::new(),
        }
    }
}

/// A keyed factory and registry of [`LoaderInstance`]s.
///
/// At most one instance exists per serialized variable set for the lifetime
/// of the loader; `get_instance` either returns the cached one or creates
/// it, runs the creation observers, and registers it.
pub struct Loader<V, D, E> {
    key: String,
    backend: Arc<dyn VariableLoader<V, D, E>>,
    instances: DashMap<String, Arc<LoaderInstance<V, D, E>>>,
    options: LoaderOptions<V, D, E>,
    attachment: OnceLock<ClientAttachment>,
}

impl<V, D, E> Loader<V, D, E>
where
    V: Clone + Serialize + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a loader with default options.
    pub fn new(key: impl Into<String>, backend: Arc<dyn VariableLoader<V, D, E>>) -> Arc<Self> {
        Self::with_options(key, backend, LoaderOptions::default())
    }

    /// Create a loader with explicit options.
    pub fn with_options(
        key: impl Into<String>,
        backend: Arc<dyn VariableLoader<V, D, E>>,
        options: LoaderOptions<V, D, E>,
    ) -> Arc<Self> {
        let key = key.into();
        tracing::debug!(loader_key = %key, "Loader created");
        Arc::new(Self {
            key,
            backend,
            instances: DashMap::new(),
            options,
            attachment: OnceLock::new(),
        })
    }

    /// Unique key of this loader.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Resolve or create the instance for a variable set.
    pub fn get_instance(&self, variables: V) -> AppResult<Arc<LoaderInstance<V, D, E>>> {
        let var_json = serde_json::to_value(&variables)?;
        let registry_key = var_json.to_string();

        if let Some(existing) = self.instances.get(&registry_key) {
            return Ok(Arc::clone(existing.value()));
        }

        let mut created = None;
        let instance = self
            .instances
            .entry(registry_key)
            .or_insert_with(|| {
                let instance = LoaderInstance::new(
                    self.key.clone(),
                    variables,
                    var_json,
                    Arc::clone(&self.backend),
                    self.options.max_age,
                );
                if let Some(attachment) = self.attachment.get() {
                    instance.attach_client(attachment.clone());
                }
                created = Some(Arc::clone(&instance));
                instance
            })
            .value()
            .clone();

        // Observers run after the registry entry is released so they may
        // touch the loader again.
        if let Some(instance) = created {
            tracing::debug!(loader_key = %self.key, instance_id = %instance.id(), "Instance created");
            for observer in &self.options.on_create_instance {
                observer(&instance);
            }
        }

        Ok(instance)
    }

    /// Number of cached instances.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Snapshot of all cached instances.
    pub fn instances(&self) -> Vec<Arc<LoaderInstance<V, D, E>>> {
        self.instances
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}

/// Type-erased loader interface so a client can aggregate heterogeneous
/// loaders and dehydrate/hydrate them uniformly. Typed access is recovered
/// through [`AnyLoader::as_any`] plus an `Arc` downcast.
pub trait AnyLoader: Send + Sync + 'static {
    /// Unique key of this loader.
    fn key(&self) -> &str;

    /// Upcast for typed recovery.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Share the owning client's live options and store with this loader
    /// and its instances.
    fn attach_client(&self, attachment: ClientAttachment);

    /// Capture every cached instance in wire form.
    fn dehydrate_instances(&self) -> AppResult<Vec<DehydratedInstance>>;

    /// Seed one instance from wire form, creating it if absent.
    fn hydrate_instance(&self, dehydrated: &DehydratedInstance) -> AppResult<()>;

    /// Number of cached instances.
    fn instance_count(&self) -> usize;
}

impl<V, D, E> AnyLoader for Loader<V, D, E>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    D: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    E: Clone + From<String> + std::fmt::Display + Send + Sync + 'static,
{
    fn key(&self) -> &str {
        &self.key
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn attach_client(&self, attachment: ClientAttachment) {
        let _ = self.attachment.set(attachment.clone());
        // Instances created before registration get the attachment too.
        for entry in self.instances.iter() {
            entry.value().attach_client(attachment.clone());
        }
    }

    fn dehydrate_instances(&self) -> AppResult<Vec<DehydratedInstance>> {
        self.instances()
            .into_iter()
            .map(|instance| instance.dehydrate())
            .collect()
    }

    fn hydrate_instance(&self, dehydrated: &DehydratedInstance) -> AppResult<()> {
        if dehydrated.loader_key != self.key {
            return Err(AppError::hydration(format!(
                "Dehydrated instance belongs to loader '{}', not '{}'",
                dehydrated.loader_key, self.key
            )));
        }
        let variables: V = serde_json::from_value(dehydrated.variables.clone())?;
        let snapshot = dehydrated.restore::<D, E>()?;
        let instance = self.get_instance(variables)?;
        instance.hydrate_state(snapshot);
        Ok(())
    }

    fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

impl<V, D, E> std::fmt::Debug for Loader<V, D, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("key", &self.key)
            .field("instances", &self.instances.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

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
    async fn test_one_instance_per_variable_set() {
        let loader = user_loader();
        let a = loader.get_instance(1).unwrap();
        let b = loader.get_instance(1).unwrap();
        let c = loader.get_instance(2).unwrap();
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert_eq!(loader.instance_count(), 2);
    }

    #[tokio::test]
    async fn test_creation_observer_runs_once() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in = Arc::clone(&seen);
        let backend = Arc::new(FnLoader::new(|id: u32| {
            async move { Ok::<_, String>(id) }.boxed()
        }));
        let loader = Loader::with_options(
            "counted",
            backend,
            LoaderOptions::default().on_create(Arc::new(move |_| {
                seen_in.fetch_add(1, Ordering::SeqCst);
            })),
        );

        loader.get_instance(1).unwrap();
        loader.get_instance(1).unwrap();
        loader.get_instance(2).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_hydrate_instance_seeds_state() {
        let loader = user_loader();
        let wire = DehydratedInstance {
            loader_key: "user".into(),
            variables: serde_json::json!(7),
            status: LoadStatus::Success,
            data: Some(serde_json::json!("user-7")),
            error: None,
            updated_at: Some(chrono::Utc::now()),
        };
        loader.hydrate_instance(&wire).unwrap();

        let instance = loader.get_instance(7).unwrap();
        let snapshot = instance.snapshot();
        assert_eq!(snapshot.status, LoadStatus::Success);
        assert_eq!(snapshot.data.as_deref(), Some("user-7"));
    }

    #[tokio::test]
    async fn test_hydrate_instance_rejects_wrong_loader() {
        let loader = user_loader();
        let wire = DehydratedInstance {
            loader_key: "post".into(),
            variables: serde_json::json!(7),
            status: LoadStatus::Idle,
            data: None,
            error: None,
            updated_at: None,
        };
        let err = loader.hydrate_instance(&wire).unwrap_err();
        assert_eq!(err.kind, loadhub_core::error::ErrorKind::Hydration);
    }

    #[tokio::test]
    async fn test_dehydrate_round_trip_through_loader() {
        let loader = user_loader();
        let instance = loader.get_instance(3).unwrap();
        instance.hydrate_state(StateSnapshot::success("user-3".to_string()));

        let wires = loader.dehydrate_instances().unwrap();
        assert_eq!(wires.len(), 1);

        let other = user_loader();
        other.hydrate_instance(&wires[0]).unwrap();
        let restored = other.get_instance(3).unwrap().snapshot();
        assert_eq!(restored.data.as_deref(), Some("user-3"));
    }
}
