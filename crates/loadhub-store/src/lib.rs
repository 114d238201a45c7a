//! # loadhub-store
//!
//! The reactive store primitive: a state cell whose subscribers are
//! notified through selectors with value-level deduplication, so a consumer
//! re-renders exactly when the slice it tracks changes.

pub mod store;
pub mod subscription;

pub use store::Store;
pub use subscription::SubscriptionGuard;
