//! Global policy rules.

use serde::{Deserialize, Serialize};

use super::criteria::Criteria;
use super::label::LabelOperations;

/// A namespace-scoped policy directive. Rules are evaluated in declaration
/// order; every matching rule contributes its actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Criteria>,
    #[serde(default)]
    pub actions: RuleActions,
}

/// What a matching rule does.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleActions {
    /// Allow or deny the dependency being resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<Decision>,
    /// Ordered label transformations applied when the rule matches.
    #[serde(default, skip_serializing_if = "LabelOperations::is_empty")]
    pub change_labels: LabelOperations,
    /// Allow or deny external ingress for the resolved instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<Decision>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
}
