//! The loader hook: variable resolution in front of the instance hook.

use std::sync::Arc;

use serde::Serialize;

use loadhub_client::Loader;
use loadhub_core::AppResult;

use crate::instance_hook::UseInstance;
use crate::options::HookOptions;
use crate::outcome::RenderOutcome;
use crate::pass::RenderPass;

/// Binds a loader into a render pass for one variable set.
pub trait UseLoader<V, D, E> {
    /// Resolve or create the instance for `variables` and delegate to
    /// [`UseInstance::use_instance`] with `opts` forwarded unchanged. All
    /// status, suspend, and error decisions belong to the instance hook.
    fn use_loader(
        self: &Arc<Self>,
        pass: &mut RenderPass<'_>,
        variables: V,
        opts: &HookOptions<V, D, E>,
    ) -> AppResult<RenderOutcome<V, D, E>>;
}

impl<V, D, E> UseLoader<V, D, E> for Loader<V, D, E>
where
    V: Clone + Serialize + Send + Sync + 'static,
    D: Clone + Serialize + Send + Sync + 'static,
    E: Clone + std::fmt::Display + Send + Sync + 'static,
{
    fn use_loader(
        self: &Arc<Self>,
        pass: &mut RenderPass<'_>,
        variables: V,
        opts: &HookOptions<V, D, E>,
    ) -> AppResult<RenderOutcome<V, D, E>> {
        let instance = self.get_instance(variables)?;
        Ok(instance.use_instance(pass, opts))
    }
}
