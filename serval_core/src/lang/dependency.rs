//! Declared dependencies: external demands tying a user to a contract.

use serde::{Deserialize, Serialize};

use super::label::LabelSet;

/// "User U wants contract C", with optional user-supplied labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub namespace: String,
    pub id: String,
    pub user: String,
    pub contract: String,
    #[serde(default, skip_serializing_if = "LabelSet::is_empty")]
    pub labels: LabelSet,
}

impl Dependency {
    /// Namespace-qualified id, used for failure records and event
    /// correlation.
    pub fn qualified_id(&self) -> String {
        format!("{}/{}", self.namespace, self.id)
    }
}
