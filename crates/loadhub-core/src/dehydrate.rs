//! Dehydrated-state payloads for the server-to-client handoff.
//!
//! A dehydrated instance is the wire form of one loader instance's state:
//! variables and data as JSON values, errors reduced to their display
//! strings. Harvested on one side of a boundary, seeded on the other so the
//! receiving side does not immediately refetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{LoadStatus, StateSnapshot};

/// Wire form of one loader instance's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DehydratedInstance {
    /// Key of the owning loader.
    pub loader_key: String,
    /// The instance's variable set, serialized.
    pub variables: serde_json::Value,
    /// Lifecycle status at harvest time.
    pub status: LoadStatus,
    /// Settled data, serialized. Present for `Success`.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    /// Display string of the settled error. Present for `Error`.
    #[serde(default)]
    pub error: Option<String>,
    /// Settle time of the most recent successful load.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DehydratedInstance {
    /// Capture a typed snapshot into its wire form.
    pub fn capture<D, E>(
        loader_key: &str,
        variables: serde_json::Value,
        snapshot: &StateSnapshot<D, E>,
    ) -> Result<Self, serde_json::Error>
    where
        D: Serialize,
        E: std::fmt::Display,
    {
        let data = snapshot
            .data
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        Ok(Self {
            loader_key: loader_key.to_string(),
            variables,
            status: snapshot.status,
            data,
            error: snapshot.error.as_ref().map(ToString::to_string),
            updated_at: snapshot.updated_at,
        })
    }

    /// Rebuild a typed snapshot from the wire form.
    ///
    /// A harvested `Pending` demotes to `Idle`: the in-flight operation did
    /// not cross the boundary, so the receiving side must start its own.
    pub fn restore<D, E>(&self) -> Result<StateSnapshot<D, E>, serde_json::Error>
    where
        D: serde::de::DeserializeOwned,
        E: From<String>,
    {
        let data = self
            .data
            .clone()
            .map(serde_json::from_value)
            .transpose()?;
        let status = match self.status {
            LoadStatus::Pending => LoadStatus::Idle,
            other => other,
        };
        Ok(StateSnapshot {
            status,
            data,
            error: self.error.clone().map(E::from),
            updated_at: self.updated_at,
            invalid: false,
        })
    }
}

/// Wire form of a whole client: every instance of every registered loader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DehydratedClient {
    /// All harvested instances.
    pub instances: Vec<DehydratedInstance>,
}
