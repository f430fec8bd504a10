//! The contextual data bag visible to expressions and templates.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::external::User;
use crate::lang::{Dependency, LabelSet, Service, ServiceComponent};

/// Tagged record passed to the evaluators. References are statically
/// named: `labels.*`, `user.*`, `user.secrets.*`, `dependency.*`, and,
/// when present, `service.*` and `component.*`.
#[derive(Debug, Clone, Copy)]
pub struct EvalData<'a> {
    pub labels: &'a LabelSet,
    pub user: &'a User,
    pub secrets: &'a BTreeMap<String, String>,
    pub dependency: &'a Dependency,
    pub service: Option<&'a Service>,
    pub component: Option<&'a ServiceComponent>,
}

impl EvalData<'_> {
    /// Render the bag as a JSON object for template evaluation and for
    /// seeding the expression scope.
    pub fn to_json(&self) -> Value {
        json!({
            "labels": self.labels.labels,
            "user": {
                "id": self.user.id,
                "name": self.user.name,
                "labels": self.user.labels.labels,
                "secrets": self.secrets,
            },
            "dependency": {
                "id": self.dependency.id,
                "namespace": self.dependency.namespace,
                "contract": self.dependency.contract,
            },
            "service": self.service.map_or_else(
                || json!({}),
                |s| json!({ "name": s.name, "namespace": s.namespace, "owner": s.owner }),
            ),
            "component": self.component.map_or_else(
                || json!({}),
                |c| json!({ "name": c.name }),
            ),
        })
    }
}
