//! The public hook facade.
//!
//! `use_loader` resolves its target loader by registered key on the ambient
//! client or by direct reference, then delegates to the loader hook.
//! `use_loader_client` exposes the ambient client and its store for
//! subtree-wide subscriptions. Both fail fast with a usage-contract error
//! when the render tree gives them nothing to work with; that failure is
//! structural and deliberately loud, and is carried in the `Result` so it
//! can never be mistaken for a loader's own data error.

use std::sync::Arc;

use serde::Serialize;

use loadhub_client::{ClientState, Loader, LoaderClient};
use loadhub_core::{AppError, AppResult};

use crate::context;
use crate::loader_hook::UseLoader;
use crate::options::{HookOptions, LoaderRef};
use crate::outcome::RenderOutcome;
use crate::pass::RenderPass;

/// Client-store selector for [`use_loader_client`].
pub type ClientTrackFn = Arc<dyn Fn(&ClientState) -> serde_json::Value + Send + Sync>;

/// Bind a loader into the render pass.
///
/// `LoaderRef::Key` requires an ambient client provided by an enclosing
/// [`provide`](crate::provide) scope; `LoaderRef::Direct` bypasses the
/// client entirely. Called with a key outside any scope, this raises a
/// usage-contract error before touching any loader state.
pub fn use_loader<V, D, E>(
    pass: &mut RenderPass<'_>,
    loader: LoaderRef<V, D, E>,
    variables: V,
    opts: &HookOptions<V, D, E>,
) -> AppResult<RenderOutcome<V, D, E>>
where
    V: Clone + Serialize + Send + Sync + 'static,
    D: Clone + Serialize + Send + Sync + 'static,
    E: Clone + std::fmt::Display + Send + Sync + 'static,
{
    let loader: Arc<Loader<V, D, E>> = match loader {
        LoaderRef::Direct(loader) => loader,
        LoaderRef::Key(key) => {
            let client = context::read().ok_or_else(|| {
                AppError::usage_contract(
                    "use_loader with a key must be called inside a provide() scope",
                )
            })?;
            client.loader::<V, D, E>(&key)?
        }
    };
    loader.use_loader(pass, variables, opts)
}

/// Return the ambient client and subscribe the slot to its store.
///
/// `track` narrows the client-state slice that wakes the slot; the default
/// tracks the whole client state.
pub fn use_loader_client(
    pass: &mut RenderPass<'_>,
    track: Option<ClientTrackFn>,
) -> AppResult<Arc<LoaderClient>> {
    let client = context::read().ok_or_else(|| {
        AppError::usage_contract("use_loader_client must be called inside a provide() scope")
    })?;

    let store = Arc::clone(client.store());
    let selector = move |state: &ClientState| match &track {
        Some(track) => track(state),
        None => serde_json::to_value(state).unwrap_or(serde_json::Value::Null),
    };
    let target = store.id();
    pass.bind_subscription(target, move |waker| {
        store.subscribe(selector, move |_| waker())
    });

    Ok(client)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::FutureExt;
    use loadhub_core::config::ClientOverrides;
    use loadhub_core::error::ErrorKind;
    use loadhub_core::traits::FnLoader;

    use crate::context::provide;
    use crate::pass::RenderSlot;

    use super::*;

    fn user_loader() -> Arc<Loader<u32, String, String>> {
        let backend = Arc::new(FnLoader::new(|id: u32| {
            async move { Ok::<_, String>(format!("user-{id}")) }.boxed()
        }));
        Loader::new("user", backend)
    }

    #[tokio::test]
    async fn test_key_without_scope_is_usage_contract_error() {
        let mut slot = RenderSlot::detached();
        let mut pass = RenderPass::new(&mut slot);
        let err = use_loader::<u32, String, String>(
            &mut pass,
            LoaderRef::key("user"),
            1,
            &HookOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UsageContract);
    }

    #[tokio::test]
    async fn test_direct_loader_bypasses_scope() {
        let mut slot = RenderSlot::detached();
        let mut pass = RenderPass::new(&mut slot);
        let outcome = use_loader(
            &mut pass,
            LoaderRef::from(user_loader()),
            1,
            &HookOptions::default(),
        )
        .unwrap();
        assert!(outcome.is_pending());
    }

    #[tokio::test]
    async fn test_key_resolves_on_ambient_client() {
        let client = LoaderClient::with_defaults();
        client.register(user_loader()).unwrap();
        let mut slot = RenderSlot::detached();

        let outcome = provide(&client, &ClientOverrides::none(), || {
            let mut pass = RenderPass::new(&mut slot);
            use_loader::<u32, String, String>(
                &mut pass,
                LoaderRef::key("user"),
                1,
                &HookOptions::default(),
            )
        })
        .unwrap();
        outcome.promise().expect("first render suspends").await;
    }

    #[tokio::test]
    async fn test_unknown_key_is_not_found() {
        let client = LoaderClient::with_defaults();
        let mut slot = RenderSlot::detached();
        let err = provide(&client, &ClientOverrides::none(), || {
            let mut pass = RenderPass::new(&mut slot);
            use_loader::<u32, String, String>(
                &mut pass,
                LoaderRef::key("missing"),
                1,
                &HookOptions::default(),
            )
        })
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_client_hook_requires_scope_and_subscribes() {
        let mut slot = RenderSlot::detached();
        {
            let mut pass = RenderPass::new(&mut slot);
            let err = use_loader_client(&mut pass, None).unwrap_err();
            assert_eq!(err.kind, ErrorKind::UsageContract);
        }

        let client = LoaderClient::with_defaults();
        provide(&client, &ClientOverrides::none(), || {
            let mut pass = RenderPass::new(&mut slot);
            let resolved = use_loader_client(&mut pass, None).unwrap();
            assert!(Arc::ptr_eq(&resolved, &client));
            pass.commit();
        });
        assert!(slot.is_subscribed());
        assert_eq!(client.store().listener_count(), 1);
    }

    #[tokio::test]
    async fn test_client_hook_wakes_on_load_activity() {
        let client = LoaderClient::with_defaults();
        let loader = user_loader();
        client.register(Arc::clone(&loader)).unwrap();

        let wakes = Arc::new(AtomicUsize::new(0));
        let wakes_in = Arc::clone(&wakes);
        let mut slot = RenderSlot::new(Arc::new(move || {
            wakes_in.fetch_add(1, Ordering::SeqCst);
        }));

        provide(&client, &ClientOverrides::none(), || {
            let mut pass = RenderPass::new(&mut slot);
            use_loader_client(&mut pass, None).unwrap();
            pass.commit();
        });

        let instance = loader.get_instance(1).unwrap();
        let promise = instance.load();
        assert!(wakes.load(Ordering::SeqCst) >= 1, "load start wakes the slot");
        promise.await;
    }
}
