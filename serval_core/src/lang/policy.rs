//! The immutable policy snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::cluster::Cluster;
use super::contract::Contract;
use super::dependency::Dependency;
use super::rule::Rule;
use super::service::Service;

/// Namespace that holds cluster definitions.
pub const SYSTEM_NAMESPACE: &str = "system";

/// Declarations within one namespace. Rules keep declaration order;
/// contracts, services, and clusters are looked up by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyNamespace {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contracts: BTreeMap<String, Contract>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<String, Service>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub clusters: BTreeMap<String, Cluster>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
}

/// Immutable snapshot of all declarations, built once per run and
/// read-only thereafter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub namespaces: BTreeMap<String, PolicyNamespace>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_contract(&self, namespace: &str, name: &str) -> Option<&Contract> {
        self.namespaces.get(namespace)?.contracts.get(name)
    }

    pub fn find_service(&self, namespace: &str, name: &str) -> Option<&Service> {
        self.namespaces.get(namespace)?.services.get(name)
    }

    /// Clusters are defined in the system namespace only.
    pub fn find_cluster(&self, name: &str) -> Option<&Cluster> {
        self.namespaces.get(SYSTEM_NAMESPACE)?.clusters.get(name)
    }

    /// Rules of a namespace in declaration order; empty when the
    /// namespace declares none.
    pub fn rules(&self, namespace: &str) -> &[Rule] {
        self.namespaces
            .get(namespace)
            .map(|ns| ns.rules.as_slice())
            .unwrap_or(&[])
    }

    fn namespace_mut(&mut self, name: &str) -> &mut PolicyNamespace {
        self.namespaces.entry(name.to_string()).or_default()
    }

    pub fn add_contract(&mut self, contract: Contract) {
        self.namespace_mut(&contract.namespace.clone())
            .contracts
            .insert(contract.name.clone(), contract);
    }

    pub fn add_service(&mut self, service: Service) {
        self.namespace_mut(&service.namespace.clone())
            .services
            .insert(service.name.clone(), service);
    }

    pub fn add_cluster(&mut self, cluster: Cluster) {
        self.namespace_mut(&cluster.namespace.clone())
            .clusters
            .insert(cluster.name.clone(), cluster);
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.namespace_mut(&rule.namespace.clone()).rules.push(rule);
    }

    pub fn add_dependency(&mut self, dependency: Dependency) {
        self.dependencies.push(dependency);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::contract::Allocation;
    use crate::lang::Context;

    #[test]
    fn lookups_are_namespace_scoped() {
        let mut policy = Policy::new();
        policy.add_contract(Contract {
            namespace: "main".to_string(),
            name: "web".to_string(),
            contexts: vec![Context {
                name: "prod".to_string(),
                criteria: None,
                allocation: Allocation::new("web-svc"),
                change_labels: Default::default(),
            }],
        });

        assert!(policy.find_contract("main", "web").is_some());
        assert!(policy.find_contract("other", "web").is_none());
        assert!(policy.rules("main").is_empty());
    }

    #[test]
    fn clusters_live_in_the_system_namespace() {
        let mut policy = Policy::new();
        policy.add_cluster(Cluster::new(SYSTEM_NAMESPACE, "us-east", "kubernetes"));
        assert!(policy.find_cluster("us-east").is_some());
        assert!(policy.find_cluster("us-west").is_none());
    }
}
