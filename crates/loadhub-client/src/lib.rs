//! # loadhub-client
//!
//! The loader/client collaborator: [`LoaderClient`] aggregates keyed
//! [`Loader`]s, each of which caches one [`LoaderInstance`] per serialized
//! variable set. Instances own the load state machine
//! (idle/pending/success/error), the shared in-flight promise, and the
//! freshness check that lets passive refreshes no-op on fresh data.

pub mod client;
pub mod instance;
pub mod loader;

pub use client::{ClientState, LoaderClient};
pub use instance::{LoadPromise, LoaderInstance};
pub use loader::{AnyLoader, Loader, LoaderOptions};
