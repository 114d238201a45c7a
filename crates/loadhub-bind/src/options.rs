//! Per-call hook configuration.

use std::sync::Arc;

use loadhub_client::{Loader, LoaderInstance};
use loadhub_core::state::StateSnapshot;

/// Selector narrowing which slice of instance state triggers a re-render.
/// The slice is compared by value between notifications.
pub type TrackFn<D, E> =
    Arc<dyn Fn(&StateSnapshot<D, E>) -> serde_json::Value + Send + Sync>;

/// Hydration input for one hook call: a snapshot, or a function of the
/// instance producing one.
pub enum Hydrate<V, D, E> {
    /// Seed from this snapshot.
    Snapshot(StateSnapshot<D, E>),
    /// Seed from the snapshot this function produces for the instance.
    With(Arc<dyn Fn(&LoaderInstance<V, D, E>) -> StateSnapshot<D, E> + Send + Sync>),
}

impl<V, D, E> Hydrate<V, D, E>
where
    D: Clone,
    E: Clone,
{
    pub(crate) fn resolve(&self, instance: &LoaderInstance<V, D, E>) -> StateSnapshot<D, E> {
        match self {
            Self::Snapshot(snapshot) => snapshot.clone(),
            Self::With(produce) => produce(instance),
        }
    }
}

/// Configuration of one hook call.
///
/// The canonical `strict` default is `true`: pending state blocks the
/// render. `throw_on_error` also defaults to `true`: a settled error
/// surfaces as [`RenderOutcome::Failed`](crate::RenderOutcome::Failed) for
/// an ancestor boundary rather than being handed back inside the instance.
pub struct HookOptions<V, D, E> {
    /// Whether pending state blocks the render.
    pub strict: bool,
    /// Whether a settled error suspends the render toward a boundary.
    pub throw_on_error: bool,
    /// Selector narrowing the tracked state slice. Defaults to the whole
    /// snapshot.
    pub track: Option<TrackFn<D, E>>,
    /// Snapshot to seed the instance with before status is evaluated.
    pub hydrate: Option<Hydrate<V, D, E>>,
}

impl<V, D, E> HookOptions<V, D, E> {
    /// Return the instance even while a load is pending.
    pub fn non_strict(mut self) -> Self {
        self.strict = false;
        self
    }

    /// Hand errored instances back to the caller instead of suspending.
    pub fn keep_errors(mut self) -> Self {
        self.throw_on_error = false;
        self
    }

    /// Track only the slice selected by `track`.
    pub fn track(
        mut self,
        track: impl Fn(&StateSnapshot<D, E>) -> serde_json::Value + Send + Sync + 'static,
    ) -> Self {
        self.track = Some(Arc::new(track));
        self
    }

    /// Seed the instance from `snapshot` before evaluating status.
    pub fn hydrate(mut self, snapshot: StateSnapshot<D, E>) -> Self {
        self.hydrate = Some(Hydrate::Snapshot(snapshot));
        self
    }

    /// Seed the instance from the snapshot `produce` builds for it.
    pub fn hydrate_with(
        mut self,
        produce: impl Fn(&LoaderInstance<V, D, E>) -> StateSnapshot<D, E> + Send + Sync + 'static,
    ) -> Self {
        self.hydrate = Some(Hydrate::With(Arc::new(produce)));
        self
    }
}

impl<V, D, E> Default for HookOptions<V, D, E> {
    fn default() -> Self {
        Self {
            strict: true,
            throw_on_error: true,
            track: None,
            hydrate: None,
        }
    }
}

/// How the facade resolves the target loader: by registered key on the
/// ambient client, or by direct reference bypassing the client.
pub enum LoaderRef<V, D, E> {
    /// Look up a registered loader on the ambient client.
    Key(String),
    /// Use this loader directly.
    Direct(Arc<Loader<V, D, E>>),
}

impl<V, D, E> LoaderRef<V, D, E> {
    /// Reference a registered loader by key.
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }
}

impl<V, D, E> From<Arc<Loader<V, D, E>>> for LoaderRef<V, D, E> {
    fn from(loader: Arc<Loader<V, D, E>>) -> Self {
        Self::Direct(loader)
    }
}
