//! Client configuration.
//!
//! `ClientOptions` is the live configuration object shared between a client
//! and its instances. `ClientOverrides` is the partial form a scope provider
//! merges in, last writer wins, on every provide call.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Client-wide loader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOptions {
    /// Default freshness window in milliseconds. A successful load younger
    /// than this is not refetched by a passive refresh.
    #[serde(default = "default_max_age_ms")]
    pub default_max_age_ms: u64,
    /// Default garbage-collection age in milliseconds. Carried for external
    /// collectors; nothing in this workspace evicts instances.
    #[serde(default = "default_gc_max_age_ms")]
    pub default_gc_max_age_ms: u64,
}

impl ClientOptions {
    /// Effective freshness window as a [`Duration`].
    pub fn default_max_age(&self) -> Duration {
        Duration::from_millis(self.default_max_age_ms)
    }

    /// Effective garbage-collection age as a [`Duration`].
    pub fn default_gc_max_age(&self) -> Duration {
        Duration::from_millis(self.default_gc_max_age_ms)
    }

    /// Merge overrides into this configuration. Present fields win.
    pub fn merge(&mut self, overrides: &ClientOverrides) {
        if let Some(max_age) = overrides.default_max_age_ms {
            self.default_max_age_ms = max_age;
        }
        if let Some(gc_max_age) = overrides.default_gc_max_age_ms {
            self.default_gc_max_age_ms = gc_max_age;
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            default_max_age_ms: default_max_age_ms(),
            default_gc_max_age_ms: default_gc_max_age_ms(),
        }
    }
}

/// Partial client configuration applied by a scope provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOverrides {
    /// Override for [`ClientOptions::default_max_age_ms`].
    #[serde(default)]
    pub default_max_age_ms: Option<u64>,
    /// Override for [`ClientOptions::default_gc_max_age_ms`].
    #[serde(default)]
    pub default_gc_max_age_ms: Option<u64>,
}

impl ClientOverrides {
    /// Overrides that change nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the freshness-window override. Saturates at `u64::MAX` ms.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.default_max_age_ms = Some(saturating_millis(max_age));
        self
    }

    /// Set the garbage-collection-age override. Saturates at `u64::MAX` ms.
    pub fn gc_max_age(mut self, gc_max_age: Duration) -> Self {
        self.default_gc_max_age_ms = Some(saturating_millis(gc_max_age));
        self
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn default_max_age_ms() -> u64 {
    1_000
}

fn default_gc_max_age_ms() -> u64 {
    300_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.default_max_age(), Duration::from_secs(1));
        assert_eq!(options.default_gc_max_age(), Duration::from_secs(300));
    }

    #[test]
    fn test_merge_last_writer_wins() {
        let mut options = ClientOptions::default();
        options.merge(&ClientOverrides::none().max_age(Duration::from_secs(5)));
        options.merge(&ClientOverrides::none().max_age(Duration::from_secs(9)));
        assert_eq!(options.default_max_age(), Duration::from_secs(9));
        // Untouched field keeps its default.
        assert_eq!(options.default_gc_max_age_ms, 300_000);
    }

    #[test]
    fn test_overlong_override_saturates() {
        let overrides = ClientOverrides::none().max_age(Duration::MAX);
        assert_eq!(overrides.default_max_age_ms, Some(u64::MAX));
    }

    #[test]
    fn test_deserialize_with_field_defaults() {
        let options: ClientOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ClientOptions::default());
    }
}
