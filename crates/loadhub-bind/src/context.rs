//! The client scope: ambient lookup of the active client for a subtree.
//!
//! A thread-local stack models the render tree's nesting: `provide` pushes
//! a client for the extent of a subtree closure and pops it on exit, panic
//! or not. `read` returns the nearest enclosing client as an `Option` so a
//! caller can raise a clear configuration error instead of dereferencing
//! nothing.

use std::cell::RefCell;
use std::sync::Arc;

use loadhub_core::config::ClientOverrides;
use loadhub_client::LoaderClient;

thread_local! {
    static SCOPE: RefCell<Vec<Arc<LoaderClient>>> = const { RefCell::new(Vec::new()) };
}

/// Make `client` the ambient client for the extent of `subtree`.
///
/// `overrides` are merged into the client's live options eagerly on every
/// call, last writer wins, mirroring a provider that re-merges on each of
/// its renders. Nested provides shadow outer ones for their extent.
pub fn provide<R>(
    client: &Arc<LoaderClient>,
    overrides: &ClientOverrides,
    subtree: impl FnOnce() -> R,
) -> R {
    client.merge_options(overrides);
    let _guard = ScopeGuard::push(Arc::clone(client));
    subtree()
}

/// The nearest enclosing provided client, if any.
pub fn read() -> Option<Arc<LoaderClient>> {
    SCOPE.with(|scope| scope.borrow().last().cloned())
}

struct ScopeGuard;

impl ScopeGuard {
    fn push(client: Arc<LoaderClient>) -> Self {
        SCOPE.with(|scope| scope.borrow_mut().push(client));
        Self
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPE.with(|scope| {
            scope.borrow_mut().pop();
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use loadhub_core::config::ClientOptions;

    use super::*;

    #[test]
    fn test_read_outside_scope_is_none() {
        assert!(read().is_none());
    }

    #[test]
    fn test_provide_scopes_and_restores() {
        let client = LoaderClient::with_defaults();
        provide(&client, &ClientOverrides::none(), || {
            assert!(read().is_some());
        });
        assert!(read().is_none());
    }

    #[test]
    fn test_nested_provide_shadows_outer() {
        let outer = LoaderClient::with_defaults();
        let inner = LoaderClient::with_defaults();
        provide(&outer, &ClientOverrides::none(), || {
            let seen_outer = read().unwrap();
            assert!(Arc::ptr_eq(&seen_outer, &outer));
            provide(&inner, &ClientOverrides::none(), || {
                assert!(Arc::ptr_eq(&read().unwrap(), &inner));
            });
            assert!(Arc::ptr_eq(&read().unwrap(), &outer));
        });
    }

    #[test]
    fn test_overrides_merge_eagerly_each_provide() {
        let client = LoaderClient::new(ClientOptions::default());
        provide(
            &client,
            &ClientOverrides::none().max_age(Duration::from_secs(5)),
            || {},
        );
        assert_eq!(client.options().default_max_age(), Duration::from_secs(5));
        provide(
            &client,
            &ClientOverrides::none().max_age(Duration::from_secs(2)),
            || {},
        );
        assert_eq!(client.options().default_max_age(), Duration::from_secs(2));
    }

    #[test]
    fn test_scope_restored_after_panic() {
        let client = LoaderClient::with_defaults();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            provide(&client, &ClientOverrides::none(), || {
                panic!("render blew up");
            })
        }));
        assert!(result.is_err());
        assert!(read().is_none());
    }
}
