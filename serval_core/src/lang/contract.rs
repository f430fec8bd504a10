//! Contracts and the contexts that realise them.

use serde::{Deserialize, Serialize};

use super::criteria::Criteria;
use super::label::LabelOperations;

/// An abstract capability declared by a namespace.
///
/// At resolve time exactly one of its contexts is chosen, in declaration
/// order, by evaluating each context's criteria against the current labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub namespace: String,
    pub name: String,
    pub contexts: Vec<Context>,
}

/// One concrete realisation of a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Criteria>,
    pub allocation: Allocation,
    #[serde(default, skip_serializing_if = "LabelOperations::is_empty")]
    pub change_labels: LabelOperations,
}

/// Where a context lands: a target service plus ordered allocation-key
/// templates that partition instances of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub service: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
}

impl Allocation {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            keys: Vec::new(),
        }
    }
}
