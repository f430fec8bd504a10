//! Typed resolution events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ErrorDetails;

/// Which label transformation produced a logged label set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelScope {
    Initial,
    Context,
    Rule,
    Component,
}

impl std::fmt::Display for LabelScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LabelScope::Initial => "initial",
            LabelScope::Context => "context",
            LabelScope::Rule => "rule",
            LabelScope::Component => "component",
        };
        f.write_str(s)
    }
}

/// One step of the resolution, as a sum type for structured rendering
/// downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionEvent {
    /// Resolution of a dependency (or sub-dependency) began.
    Start {
        dependency: String,
        user: String,
        contract: String,
        depth: usize,
    },
    /// Labels after a scope change.
    Label {
        scope: LabelScope,
        labels: BTreeMap<String, String>,
        secret_count: usize,
    },
    /// A context criterion was tested.
    ContextTest {
        contract: String,
        context: String,
        matched: bool,
    },
    /// A context was picked for a contract.
    ContextMatch { contract: String, context: String },
    /// A rule criterion was tested.
    RuleTest { rule: String, matched: bool },
    /// Outcome of processing a namespace's rule batch.
    RuleResult {
        namespace: String,
        contract: String,
        allowed: bool,
        ingress_blocked: bool,
        applied: Vec<String>,
    },
    /// Allocation keys were rendered for the matched context.
    Allocation {
        contract: String,
        context: String,
        keys: Vec<String>,
        resolved: Vec<String>,
    },
    /// A component's criterion evaluated to false.
    ComponentSkip { service: String, component: String },
    /// A service-level or component instance was resolved.
    ComponentResolved {
        key: String,
        service: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        component: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        contract: Option<String>,
    },
    /// A dependency failed; the failure is also recorded in the
    /// resolution output.
    Failure {
        dependency: String,
        details: ErrorDetails,
    },
    /// Resolution of a dependency finished.
    End {
        dependency: String,
        resolved: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },
}

impl ResolutionEvent {
    /// Stable kind tag, matching the serialized `kind` field.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionEvent::Start { .. } => "start",
            ResolutionEvent::Label { .. } => "label",
            ResolutionEvent::ContextTest { .. } => "context_test",
            ResolutionEvent::ContextMatch { .. } => "context_match",
            ResolutionEvent::RuleTest { .. } => "rule_test",
            ResolutionEvent::RuleResult { .. } => "rule_result",
            ResolutionEvent::Allocation { .. } => "allocation",
            ResolutionEvent::ComponentSkip { .. } => "component_skip",
            ResolutionEvent::ComponentResolved { .. } => "component_resolved",
            ResolutionEvent::Failure { .. } => "failure",
            ResolutionEvent::End { .. } => "end",
        }
    }
}
