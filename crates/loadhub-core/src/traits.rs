//! Loader backend trait: the boundary to the external fetch collaborator.

use async_trait::async_trait;
use futures::future::BoxFuture;

/// Trait for loader backends: the asynchronous operation behind a loader.
///
/// This workspace never awaits a backend directly from a render pass; loads
/// run on spawned tasks and the render pass only observes their promises.
/// Retry, backoff, and cancellation are the backend's own business.
#[async_trait]
pub trait VariableLoader<V, D, E>: Send + Sync + 'static {
    /// Load data for one variable set.
    async fn load(&self, variables: V) -> Result<D, E>;
}

/// Adapter turning an async closure into a [`VariableLoader`].
pub struct FnLoader<F> {
    fetch: F,
}

impl<F> FnLoader<F> {
    /// Wrap a closure returning a boxed load future.
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }
}

#[async_trait]
impl<V, D, E, F> VariableLoader<V, D, E> for FnLoader<F>
where
    V: Send + 'static,
    D: Send + 'static,
    E: Send + 'static,
    F: Fn(V) -> BoxFuture<'static, Result<D, E>> + Send + Sync + 'static,
{
    async fn load(&self, variables: V) -> Result<D, E> {
        (self.fetch)(variables).await
    }
}
