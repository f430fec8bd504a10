//! Cluster definitions.

use serde::{Deserialize, Serialize};

/// A target cluster instances can be allocated to. Clusters live in the
/// system namespace and are referenced through the `cluster` label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub namespace: String,
    pub name: String,
    #[serde(rename = "type")]
    pub cluster_type: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub config: serde_json::Value,
}

impl Cluster {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, cluster_type: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            cluster_type: cluster_type.into(),
            config: serde_json::Value::Null,
        }
    }
}
