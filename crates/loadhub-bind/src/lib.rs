//! # loadhub-bind
//!
//! The binding layer between loader instances and a re-render-driven
//! consumer. A render pass calls the hooks synchronously; each call either
//! hands back a resolved instance, reports the in-flight promise to await
//! before re-rendering, or surfaces a settled error for an ancestor
//! boundary. Suspension is an explicit [`RenderOutcome`] value, never a
//! cross-cutting unwind.

pub mod context;
pub mod facade;
pub mod instance_hook;
pub mod loader_hook;
pub mod options;
pub mod outcome;
pub mod pass;

pub use context::{provide, read};
pub use facade::{ClientTrackFn, use_loader, use_loader_client};
pub use instance_hook::UseInstance;
pub use loader_hook::UseLoader;
pub use options::{HookOptions, Hydrate, LoaderRef};
pub use outcome::RenderOutcome;
pub use pass::{DehydrateSink, RenderPass, RenderSlot};
