//! Label sets and ordered label transformations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ResolutionError;

/// A mapping from label name to string value.
///
/// Label sets are copied on write: applying operations returns a new set
/// and leaves the original untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    pub labels: BTreeMap<String, String>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(labels: BTreeMap<String, String>) -> Self {
        Self { labels }
    }

    /// Overlay `other` onto this set in place; `other` wins on conflict.
    pub fn add_labels(&mut self, other: &LabelSet) {
        for (name, value) in &other.labels {
            self.labels.insert(name.clone(), value.clone());
        }
    }

    /// Apply ordered label operations, returning the transformed set.
    ///
    /// An empty operation list is a no-op. Unknown operation kinds are a
    /// policy error.
    pub fn apply(&self, ops: &LabelOperations) -> Result<LabelSet, ResolutionError> {
        let mut result = self.clone();
        for op in &ops.ops {
            match op.kind.as_str() {
                "set" => {
                    result
                        .labels
                        .insert(op.name.clone(), op.value.clone().unwrap_or_default());
                }
                "remove" => {
                    result.labels.remove(&op.name);
                }
                other => {
                    return Err(ResolutionError::InvalidPolicy(format!(
                        "unknown label operation kind '{}'",
                        other
                    )));
                }
            }
        }
        Ok(result)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// One ordered label transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelOperation {
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl LabelOperation {
    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: "set".to_string(),
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn remove(name: impl Into<String>) -> Self {
        Self {
            kind: "remove".to_string(),
            name: name.into(),
            value: None,
        }
    }
}

/// An ordered list of label operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelOperations {
    pub ops: Vec<LabelOperation>,
}

impl LabelOperations {
    pub fn new(ops: Vec<LabelOperation>) -> Self {
        Self { ops }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
