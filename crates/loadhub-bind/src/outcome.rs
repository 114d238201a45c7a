//! The three-state suspension contract returned by the hooks.

use std::sync::Arc;

use loadhub_client::{LoadPromise, LoaderInstance};

/// Result of one hook invocation.
///
/// The consumer inspects the outcome instead of catching anything: `Ready`
/// renders, `Pending` means pause this render and re-invoke once the carried
/// promise settles, `Failed` is a settled loader error for the nearest
/// boundary. A `Pending` outcome is not an error and must never be treated
/// as one.
pub enum RenderOutcome<V, D, E> {
    /// Render with this instance. Under strict options its data is settled;
    /// under non-strict options the data may still be absent.
    Ready(Arc<LoaderInstance<V, D, E>>),
    /// Suspended on an in-flight load. Await the promise, then re-render.
    Pending(LoadPromise),
    /// Suspended on a settled loader error.
    Failed(E),
}

impl<V, D, E> RenderOutcome<V, D, E>
where
    V: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Whether this render may proceed.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Whether this render suspended on an in-flight load.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// The bound instance, when ready.
    pub fn instance(&self) -> Option<&Arc<LoaderInstance<V, D, E>>> {
        match self {
            Self::Ready(instance) => Some(instance),
            _ => None,
        }
    }

    /// Settled data of the bound instance, when ready and present.
    pub fn data(&self) -> Option<D> {
        self.instance().and_then(|instance| instance.snapshot().data)
    }

    /// The in-flight promise, when pending.
    pub fn promise(&self) -> Option<LoadPromise> {
        match self {
            Self::Pending(promise) => Some(promise.clone()),
            _ => None,
        }
    }

    /// The settled error, when failed.
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }
}

impl<V, D, E: std::fmt::Debug> std::fmt::Debug for RenderOutcome<V, D, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("RenderOutcome::Ready"),
            Self::Pending(_) => f.write_str("RenderOutcome::Pending"),
            Self::Failed(error) => write!(f, "RenderOutcome::Failed({error:?})"),
        }
    }
}
