//! The instance hook: the status decision at the heart of the binding layer.

use std::sync::Arc;

use loadhub_client::LoaderInstance;
use loadhub_core::state::{LoadStatus, StateSnapshot};

use crate::options::{HookOptions, TrackFn};
use crate::outcome::RenderOutcome;
use crate::pass::RenderPass;

/// Binds a loader instance into a render pass.
///
/// Attached to [`LoaderInstance`] by this layer as a decoration, keeping
/// the client crate free of any render-side vocabulary.
pub trait UseInstance<V, D, E> {
    /// Decide, in one synchronous pass, whether the current render proceeds
    /// with this instance, suspends on its in-flight load, or surfaces its
    /// settled error; and keep the render subscribed to future changes.
    ///
    /// Evaluation order is fixed: hydrate, error short-circuit, pending
    /// block, idle kick-off, passive refresh scheduling, subscription,
    /// dehydration. Each of the first four steps may short-circuit the
    /// rest.
    fn use_instance(
        self: &Arc<Self>,
        pass: &mut RenderPass<'_>,
        opts: &HookOptions<V, D, E>,
    ) -> RenderOutcome<V, D, E>;
}

impl<V, D, E> UseInstance<V, D, E> for LoaderInstance<V, D, E>
where
    V: Clone + Send + Sync + 'static,
    D: Clone + serde::Serialize + Send + Sync + 'static,
    E: Clone + std::fmt::Display + Send + Sync + 'static,
{
    fn use_instance(
        self: &Arc<Self>,
        pass: &mut RenderPass<'_>,
        opts: &HookOptions<V, D, E>,
    ) -> RenderOutcome<V, D, E> {
        // Hydration must land before any status read, so a seeded result
        // short-circuits the refetch the status checks would otherwise
        // trigger.
        if let Some(hydrate) = &opts.hydrate {
            self.hydrate_state(hydrate.resolve(self));
        }

        let state = self.snapshot();

        if state.status == LoadStatus::Error && opts.throw_on_error {
            if let Some(error) = state.error {
                return RenderOutcome::Failed(error);
            }
        }

        if opts.strict && state.status == LoadStatus::Pending {
            // A hydrated pending state may arrive without an operation
            // behind it; load() then starts one.
            let promise = self.promise().unwrap_or_else(|| self.load());
            return RenderOutcome::Pending(promise);
        }

        if state.status == LoadStatus::Idle {
            // Never render a created-but-never-fetched instance with empty
            // data under strict options; non-strict callers get it back
            // with the load already kicked off.
            let promise = self.load();
            if opts.strict {
                return RenderOutcome::Pending(promise);
            }
        }

        let refresh_target = Arc::clone(self);
        pass.schedule_keyed(self.id(), move || {
            let _ = refresh_target.load();
        });

        let selector = tracked_selector(opts.track.clone());
        let store = Arc::clone(self.store());
        pass.bind_subscription(self.id(), move |waker| {
            store.subscribe(move |state| selector(state), move |_| waker())
        });

        // Always-invoked hook point; the pass decides whether anything is
        // harvested.
        if pass.wants_dehydrated() {
            match self.dehydrate() {
                Ok(wire) => pass.capture_dehydrated(wire),
                Err(error) => {
                    tracing::warn!(instance_id = %self.id(), %error, "Dehydration failed");
                }
            }
        }

        RenderOutcome::Ready(Arc::clone(self))
    }
}

/// Build the subscription selector: the caller's `track` narrowing, or a
/// digest of the whole snapshot.
fn tracked_selector<D, E>(
    track: Option<TrackFn<D, E>>,
) -> impl Fn(&StateSnapshot<D, E>) -> serde_json::Value + Send + Sync + 'static
where
    D: serde::Serialize + 'static,
    E: std::fmt::Display + 'static,
{
    move |state| match &track {
        Some(track) => track(state),
        None => snapshot_digest(state),
    }
}

fn snapshot_digest<D, E>(state: &StateSnapshot<D, E>) -> serde_json::Value
where
    D: serde::Serialize,
    E: std::fmt::Display,
{
    serde_json::json!({
        "status": state.status,
        "data": state
            .data
            .as_ref()
            .and_then(|data| serde_json::to_value(data).ok()),
        "error": state.error.as_ref().map(ToString::to_string),
        "updated_at": state.updated_at,
        "invalid": state.invalid,
    })
}
