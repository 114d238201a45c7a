//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use serde::{Deserialize, Serialize};

use loadhub::{FnLoader, Loader, LoaderClient, RenderSlot};

/// A user record as the canonical test payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub name: String,
}

/// Variables for the user loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserVars {
    pub id: u32,
}

/// Counts backend invocations so tests can assert fetch behavior.
pub struct FetchCounter(Arc<AtomicUsize>);

impl FetchCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Build a `user` loader whose backend resolves `{id}` to a `User` named
/// `"x"`, counting every real fetch.
pub fn user_loader() -> (Arc<Loader<UserVars, User, String>>, FetchCounter) {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in = Arc::clone(&calls);
    let backend = Arc::new(FnLoader::new(move |vars: UserVars| {
        calls_in.fetch_add(1, Ordering::SeqCst);
        async move {
            Ok::<_, String>(User {
                id: vars.id,
                name: "x".into(),
            })
        }
        .boxed()
    }));
    (Loader::new("user", backend), FetchCounter(calls))
}

/// Build a loader whose backend always fails with `message`.
pub fn failing_loader(
    key: &str,
    message: &str,
) -> Arc<Loader<UserVars, User, String>> {
    let message = message.to_string();
    let backend = Arc::new(FnLoader::new(move |_vars: UserVars| {
        let message = message.clone();
        async move { Err::<User, String>(message) }.boxed()
    }));
    Loader::new(key, backend)
}

/// A client with the `user` loader registered.
pub fn client_with_user_loader() -> (
    Arc<LoaderClient>,
    Arc<Loader<UserVars, User, String>>,
    FetchCounter,
) {
    let client = LoaderClient::with_defaults();
    let (loader, calls) = user_loader();
    client.register(Arc::clone(&loader)).expect("register user loader");
    (client, loader, calls)
}

/// A slot that counts wake requests.
pub fn counting_slot() -> (RenderSlot, Arc<AtomicUsize>) {
    let wakes = Arc::new(AtomicUsize::new(0));
    let wakes_in = Arc::clone(&wakes);
    let slot = RenderSlot::new(Arc::new(move || {
        wakes_in.fetch_add(1, Ordering::SeqCst);
    }));
    (slot, wakes)
}
