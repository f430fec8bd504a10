//! Services and their components.

use serde::{Deserialize, Serialize};

use super::criteria::Criteria;
use super::label::LabelOperations;

/// A deployable unit: an ordered collection of components that together
/// deliver a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub owner: String,
    pub components: Vec<ServiceComponent>,
}

impl Service {
    pub fn component(&self, name: &str) -> Option<&ServiceComponent> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// A leaf of a service: either deployable code or a reference to another
/// contract (a sub-dependency). Components may also declare edges to
/// sibling components they depend on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceComponent {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Criteria>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Code>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub discovery: serde_json::Value,
    #[serde(default, skip_serializing_if = "LabelOperations::is_empty")]
    pub change_labels: LabelOperations,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl ServiceComponent {
    pub fn code(name: impl Into<String>, code: Code) -> Self {
        Self {
            name: name.into(),
            criteria: None,
            code: Some(code),
            contract: None,
            discovery: serde_json::Value::Null,
            change_labels: LabelOperations::default(),
            dependencies: Vec::new(),
        }
    }

    pub fn contract_ref(name: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            criteria: None,
            code: None,
            contract: Some(contract.into()),
            discovery: serde_json::Value::Null,
            change_labels: LabelOperations::default(),
            dependencies: Vec::new(),
        }
    }
}

/// Deployable code attached to a component. `params` is a template tree:
/// every string leaf is rendered against the contextual data at resolve
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code {
    #[serde(rename = "type")]
    pub code_type: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

impl Code {
    pub fn new(code_type: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            code_type: code_type.into(),
            params,
        }
    }
}
