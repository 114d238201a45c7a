//! Render slots and render passes.
//!
//! A [`RenderSlot`] is the durable half of one hook call site: it survives
//! across renders and owns the store subscription, the waker that requests a
//! re-render, and the identity of the last instance whose refresh effect
//! ran. A [`RenderPass`] is the transient half: one synchronous render,
//! collecting post-commit effects and optional dehydration output. Effects
//! run only at [`RenderPass::commit`], which the driver calls only for a
//! render that did not suspend.

use uuid::Uuid;

use loadhub_core::dehydrate::DehydratedInstance;
use loadhub_store::SubscriptionGuard;

use std::sync::Arc;

/// Receives harvested instance snapshots during a render pass.
pub trait DehydrateSink {
    /// Capture one instance's wire-form state.
    fn capture(&mut self, instance: DehydratedInstance);
}

impl DehydrateSink for Vec<DehydratedInstance> {
    fn capture(&mut self, instance: DehydratedInstance) {
        self.push(instance);
    }
}

impl DehydrateSink for loadhub_core::dehydrate::DehydratedClient {
    fn capture(&mut self, instance: DehydratedInstance) {
        self.instances.push(instance);
    }
}

struct BoundSubscription {
    target: Uuid,
    _guard: SubscriptionGuard,
}

/// Durable state of one hook call site across renders.
pub struct RenderSlot {
    waker: Arc<dyn Fn() + Send + Sync>,
    subscription: Option<BoundSubscription>,
    last_effect: Option<Uuid>,
}

impl RenderSlot {
    /// Create a slot whose re-renders are requested through `waker`.
    pub fn new(waker: Arc<dyn Fn() + Send + Sync>) -> Self {
        Self {
            waker,
            subscription: None,
            last_effect: None,
        }
    }

    /// A slot that ignores wake requests. Useful for one-shot renders.
    pub fn detached() -> Self {
        Self::new(Arc::new(|| {}))
    }

    /// Whether the slot currently holds a live subscription.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Drop the slot's subscription without dropping the slot.
    pub fn unbind(&mut self) {
        self.subscription = None;
        self.last_effect = None;
    }
}

type Effect = Box<dyn FnOnce() + Send>;

/// One synchronous render over a slot.
pub struct RenderPass<'a> {
    slot: &'a mut RenderSlot,
    effects: Vec<(Uuid, Effect)>,
    sink: Option<&'a mut dyn DehydrateSink>,
}

impl<'a> RenderPass<'a> {
    /// Start a render pass over `slot`.
    pub fn new(slot: &'a mut RenderSlot) -> Self {
        Self {
            slot,
            effects: Vec::new(),
            sink: None,
        }
    }

    /// Start a render pass that harvests dehydrated state into `sink`.
    pub fn with_sink(slot: &'a mut RenderSlot, sink: &'a mut dyn DehydrateSink) -> Self {
        Self {
            slot,
            effects: Vec::new(),
            sink: Some(sink),
        }
    }

    /// Queue a post-commit effect keyed by instance identity.
    ///
    /// The key deduplicates: an effect whose key already ran at the last
    /// commit of this slot, or is already queued in this pass, is dropped.
    /// The effect therefore fires once per identity change, not once per
    /// render.
    pub(crate) fn schedule_keyed(&mut self, key: Uuid, effect: impl FnOnce() + Send + 'static) {
        if self.slot.last_effect == Some(key) {
            return;
        }
        if self.effects.iter().any(|(queued, _)| *queued == key) {
            return;
        }
        self.effects.push((key, Box::new(effect)));
    }

    /// Bind the slot's subscription to `target`, building it with
    /// `subscribe` when the slot is unbound or bound elsewhere. The previous
    /// subscription, if any, is released by the replacement.
    pub(crate) fn bind_subscription(
        &mut self,
        target: Uuid,
        subscribe: impl FnOnce(Arc<dyn Fn() + Send + Sync>) -> SubscriptionGuard,
    ) {
        if let Some(bound) = &self.slot.subscription {
            if bound.target == target {
                return;
            }
        }
        let guard = subscribe(Arc::clone(&self.slot.waker));
        self.slot.subscription = Some(BoundSubscription {
            target,
            _guard: guard,
        });
    }

    /// Hand a harvested snapshot to the sink. Always invoked by the
    /// instance hook; a pass without a sink makes this a no-op.
    pub(crate) fn capture_dehydrated(&mut self, instance: DehydratedInstance) {
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.capture(instance);
        }
    }

    /// Whether this pass harvests dehydrated state.
    pub(crate) fn wants_dehydrated(&self) -> bool {
        self.sink.is_some()
    }

    /// Commit the render: run queued effects and record their keys.
    ///
    /// Must only be called for a render that did not suspend; effects may
    /// mutate shared state and so must never run during the synchronous
    /// render itself.
    pub fn commit(self) {
        for (key, effect) in self.effects {
            self.slot.last_effect = Some(key);
            effect();
        }
    }
}
