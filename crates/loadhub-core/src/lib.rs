//! # loadhub-core
//!
//! Core crate for LoadHub. Contains the load state model, configuration
//! schemas, dehydrated-state payloads, the loader backend trait, and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other LoadHub crates.

pub mod config;
pub mod dehydrate;
pub mod error;
pub mod result;
pub mod state;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
pub use state::{LoadStatus, StateSnapshot};
