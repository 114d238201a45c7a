//! # LoadHub
//!
//! A suspense-integrated binding layer for keyed, variable-parameterized
//! asynchronous data loaders. Loaders cache one instance per variable set;
//! a re-render-driven consumer binds instances through synchronous hooks
//! that either hand back resolved data, report an in-flight promise to
//! await, or surface a settled error. A hydration/dehydration contract
//! hands loader state across a server/client boundary without duplicate
//! fetches.
//!
//! This crate re-exports the workspace surface:
//!
//! - [`loadhub_core`]: state model, configuration, errors, backend trait
//! - [`loadhub_store`]: the reactive store primitive
//! - [`loadhub_client`]: clients, loaders, and cached instances
//! - [`loadhub_bind`]: scopes, render passes, and the hooks

pub use loadhub_bind::{
    DehydrateSink, HookOptions, Hydrate, LoaderRef, RenderOutcome, RenderPass, RenderSlot,
    UseInstance, UseLoader, provide, read, use_loader, use_loader_client,
};
pub use loadhub_client::{
    AnyLoader, ClientState, LoadPromise, Loader, LoaderClient, LoaderInstance, LoaderOptions,
};
pub use loadhub_core::config::{ClientOptions, ClientOverrides};
pub use loadhub_core::dehydrate::{DehydratedClient, DehydratedInstance};
pub use loadhub_core::state::{LoadStatus, StateSnapshot};
pub use loadhub_core::traits::{FnLoader, VariableLoader};
pub use loadhub_core::{AppError, AppResult};
