//! Load state model shared by instances, hooks, and dehydration payloads.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a loader instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    /// Created but never loaded.
    Idle,
    /// A load is in flight. Previously settled data, if any, is retained.
    Pending,
    /// The most recent load settled with data.
    Success,
    /// The most recent load settled with an error.
    Error,
}

/// One observable state of a loader instance.
///
/// Invariants: `Success` implies `data` is present; `Error` implies `error`
/// is present. `updated_at` records the settle time of the most recent
/// successful load and survives a stale-while-refetch `Pending` transition.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot<D, E> {
    /// Current lifecycle status.
    pub status: LoadStatus,
    /// Most recently settled data, retained while a refetch is pending.
    pub data: Option<D>,
    /// Error from the most recent failed load.
    pub error: Option<E>,
    /// Settle time of the most recent successful load.
    pub updated_at: Option<DateTime<Utc>>,
    /// Marks data that must be refetched regardless of age.
    pub invalid: bool,
}

impl<D, E> StateSnapshot<D, E> {
    /// Snapshot of a freshly created, never-loaded instance.
    pub fn idle() -> Self {
        Self {
            status: LoadStatus::Idle,
            data: None,
            error: None,
            updated_at: None,
            invalid: false,
        }
    }

    /// Snapshot of a successful load settled at `updated_at`.
    pub fn success_at(data: D, updated_at: DateTime<Utc>) -> Self {
        Self {
            status: LoadStatus::Success,
            data: Some(data),
            error: None,
            updated_at: Some(updated_at),
            invalid: false,
        }
    }

    /// Snapshot of a successful load settled now.
    pub fn success(data: D) -> Self {
        Self::success_at(data, Utc::now())
    }

    /// Snapshot of a failed load.
    pub fn failure(error: E) -> Self {
        Self {
            status: LoadStatus::Error,
            data: None,
            error: Some(error),
            updated_at: None,
            invalid: false,
        }
    }

    /// Whether this state counts as fresh under the given max age.
    ///
    /// Fresh means: settled successfully, not invalidated, and the settle
    /// time is within `max_age` of `now`.
    pub fn is_fresh(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        if self.status != LoadStatus::Success || self.invalid {
            return false;
        }
        match self.updated_at {
            Some(updated_at) => {
                let age = now.signed_duration_since(updated_at);
                age >= chrono::TimeDelta::zero()
                    && age.to_std().is_ok_and(|age| age <= max_age)
            }
            None => false,
        }
    }
}

impl<D, E> Default for StateSnapshot<D, E> {
    fn default() -> Self {
        Self::idle()
    }
}
