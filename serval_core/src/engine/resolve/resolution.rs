//! The resolution output: component instances, their edge graph, and the
//! processing order.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::key::ComponentInstanceKey;
use crate::engine::rules::RuleLogEntry;
use crate::error::{Error, ErrorDetails, ResolutionError};
use crate::lang::LabelSet;

/// A resolved artifact: one component (or service-level) instance,
/// created on first reference and mutated via merge as more dependencies
/// reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInstance {
    pub key: ComponentInstanceKey,
    /// Qualified ids of every dependency whose traversal touched this
    /// instance.
    pub dependency_ids: BTreeSet<String>,
    pub calculated_labels: LabelSet,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub calculated_code_params: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub calculated_discovery: Value,
    pub edges_in: BTreeSet<String>,
    pub edges_out: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_log: Vec<RuleLogEntry>,
}

impl ComponentInstance {
    fn new(key: ComponentInstanceKey) -> Self {
        Self {
            key,
            dependency_ids: BTreeSet::new(),
            calculated_labels: LabelSet::new(),
            calculated_code_params: Value::Null,
            calculated_discovery: Value::Null,
            edges_in: BTreeSet::new(),
            edges_out: BTreeSet::new(),
            rule_log: Vec::new(),
        }
    }
}

/// Absent params (null or an empty object) are subsumed by present ones.
fn params_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Check two computed parameter trees for merge compatibility: equal, or
/// one side absent.
fn params_compatible(existing: &Value, incoming: &Value) -> bool {
    existing == incoming || params_absent(existing) || params_absent(incoming)
}

/// Merge `incoming` into `existing` under the compatibility rule; the
/// caller is expected to have checked compatibility first.
fn merge_params(existing: &mut Value, incoming: Value) {
    if params_absent(existing) && !params_absent(&incoming) {
        *existing = incoming;
    }
}

/// The full output of a resolution run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Component instances by canonical key string.
    pub instances: BTreeMap<String, ComponentInstance>,
    /// Failed dependencies (qualified id) with their failure reason.
    pub failures: BTreeMap<String, ErrorDetails>,
    /// Topological order of `instances`; every in-edge of an instance
    /// precedes it.
    pub component_processing_order: Vec<String>,
}

impl Resolution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance(&self, key: &str) -> Option<&ComponentInstance> {
        self.instances.get(key)
    }

    /// Get or create the instance for `key`.
    pub(crate) fn instance_mut(&mut self, key: &ComponentInstanceKey) -> &mut ComponentInstance {
        self.instances
            .entry(key.as_string())
            .or_insert_with(|| ComponentInstance::new(key.clone()))
    }

    pub(crate) fn attach_dependency(&mut self, key: &ComponentInstanceKey, dependency_id: &str) {
        self.instance_mut(key)
            .dependency_ids
            .insert(dependency_id.to_string());
    }

    pub(crate) fn record_labels(&mut self, key: &ComponentInstanceKey, labels: &LabelSet) {
        let instance = self.instance_mut(key);
        if instance.calculated_labels.is_empty() {
            instance.calculated_labels = labels.clone();
        }
    }

    pub(crate) fn record_rule_log(&mut self, key: &ComponentInstanceKey, log: &[RuleLogEntry]) {
        let instance = self.instance_mut(key);
        if instance.rule_log.is_empty() {
            instance.rule_log = log.to_vec();
        }
    }

    pub(crate) fn record_code_params(
        &mut self,
        key: &ComponentInstanceKey,
        params: Value,
    ) -> Result<(), ResolutionError> {
        let instance = self.instance_mut(key);
        if !params_compatible(&instance.calculated_code_params, &params) {
            return Err(ResolutionError::ParameterConflict {
                key: key.as_string(),
            });
        }
        merge_params(&mut instance.calculated_code_params, params);
        Ok(())
    }

    pub(crate) fn record_discovery_params(
        &mut self,
        key: &ComponentInstanceKey,
        params: Value,
    ) -> Result<(), ResolutionError> {
        let instance = self.instance_mut(key);
        if !params_compatible(&instance.calculated_discovery, &params) {
            return Err(ResolutionError::ParameterConflict {
                key: key.as_string(),
            });
        }
        merge_params(&mut instance.calculated_discovery, params);
        Ok(())
    }

    /// Record a directed edge: `from` precedes `to` in the processing
    /// order.
    pub(crate) fn add_edge(&mut self, from: &ComponentInstanceKey, to: &ComponentInstanceKey) {
        self.instance_mut(from).edges_out.insert(to.as_string());
        self.instance_mut(to).edges_in.insert(from.as_string());
    }

    /// Merge a per-dependency resolution into this one, atomically: if
    /// any computed params disagree, nothing is applied and the incoming
    /// resolution is discarded by the caller.
    pub(crate) fn merge(&mut self, incoming: Resolution) -> Result<(), ResolutionError> {
        for (key, inc) in &incoming.instances {
            if let Some(existing) = self.instances.get(key) {
                if !params_compatible(&existing.calculated_code_params, &inc.calculated_code_params)
                    || !params_compatible(
                        &existing.calculated_discovery,
                        &inc.calculated_discovery,
                    )
                {
                    return Err(ResolutionError::ParameterConflict { key: key.clone() });
                }
            }
        }

        for (key, inc) in incoming.instances {
            match self.instances.entry(key) {
                std::collections::btree_map::Entry::Vacant(entry) => {
                    entry.insert(inc);
                }
                std::collections::btree_map::Entry::Occupied(mut entry) => {
                    let existing = entry.get_mut();
                    existing.dependency_ids.extend(inc.dependency_ids);
                    existing.edges_in.extend(inc.edges_in);
                    existing.edges_out.extend(inc.edges_out);
                    merge_params(&mut existing.calculated_code_params, inc.calculated_code_params);
                    merge_params(&mut existing.calculated_discovery, inc.calculated_discovery);
                    // labels and rule log keep the first writer
                }
            }
        }
        self.failures.extend(incoming.failures);
        Ok(())
    }

    pub(crate) fn record_failure(&mut self, dependency_id: &str, details: ErrorDetails) {
        self.failures.insert(dependency_id.to_string(), details);
    }

    /// Compute the processing order: Kahn's algorithm over the instance
    /// edge graph. With `deterministic_ties`, ready instances are taken
    /// in lexicographic key order; otherwise in map order. A leftover
    /// node means the instance graph has a cycle, which violates an
    /// engine invariant.
    pub(crate) fn compute_processing_order(&mut self, deterministic_ties: bool) -> Result<(), Error> {
        let mut indegree: BTreeMap<&str, usize> = self
            .instances
            .iter()
            .map(|(key, instance)| (key.as_str(), instance.edges_in.len()))
            .collect();

        let mut order = Vec::with_capacity(self.instances.len());
        if deterministic_ties {
            let mut ready: BTreeSet<&str> = indegree
                .iter()
                .filter(|(_, degree)| **degree == 0)
                .map(|(key, _)| *key)
                .collect();
            while let Some(key) = ready.iter().next().copied() {
                ready.remove(key);
                order.push(key.to_string());
                if let Some(instance) = self.instances.get(key) {
                    for out in &instance.edges_out {
                        if let Some(degree) = indegree.get_mut(out.as_str()) {
                            *degree -= 1;
                            if *degree == 0 {
                                ready.insert(out.as_str());
                            }
                        }
                    }
                }
            }
        } else {
            let mut ready: VecDeque<&str> = indegree
                .iter()
                .filter(|(_, degree)| **degree == 0)
                .map(|(key, _)| *key)
                .collect();
            while let Some(key) = ready.pop_front() {
                order.push(key.to_string());
                if let Some(instance) = self.instances.get(key) {
                    for out in &instance.edges_out {
                        if let Some(degree) = indegree.get_mut(out.as_str()) {
                            *degree -= 1;
                            if *degree == 0 {
                                ready.push_back(out.as_str());
                            }
                        }
                    }
                }
            }
        }

        if order.len() != self.instances.len() {
            return Err(Error::Internal(
                "cycle in component instance graph".to_string(),
            ));
        }
        self.component_processing_order = order;
        Ok(())
    }
}
