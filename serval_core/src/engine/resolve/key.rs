//! Canonical component-instance identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker used for the service-level instance of a service, which has no
/// component segment in its canonical key.
pub const ROOT_COMPONENT: &str = "root";

/// Canonical identity of an instantiated component.
///
/// The string form is
/// `<namespace>#<contract>#<context>[#<alloc-key>…]#<service>[#<component>]`
/// with the component segment omitted for the service-level instance.
/// The cluster resolved from the `cluster` label is recorded on the key
/// but is not part of the canonical string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentInstanceKey {
    pub namespace: String,
    pub contract: String,
    pub context: String,
    pub allocation_keys: Vec<String>,
    pub service: String,
    pub component: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster: String,
}

impl ComponentInstanceKey {
    /// Key of the service-level ("root") instance.
    pub fn service_level(
        namespace: impl Into<String>,
        contract: impl Into<String>,
        context: impl Into<String>,
        allocation_keys: Vec<String>,
        service: impl Into<String>,
        cluster: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            contract: contract.into(),
            context: context.into(),
            allocation_keys,
            service: service.into(),
            component: ROOT_COMPONENT.to_string(),
            cluster: cluster.into(),
        }
    }

    /// Key of a named component within the same service instance.
    pub fn with_component(&self, component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            ..self.clone()
        }
    }

    pub fn is_service(&self) -> bool {
        self.component == ROOT_COMPONENT
    }

    /// The canonical string form.
    pub fn as_string(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(5 + self.allocation_keys.len());
        parts.push(&self.namespace);
        parts.push(&self.contract);
        parts.push(&self.context);
        for key in &self.allocation_keys {
            parts.push(key);
        }
        parts.push(&self.service);
        if !self.is_service() {
            parts.push(&self.component);
        }
        parts.join("#")
    }
}

impl fmt::Display for ComponentInstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_level_key_omits_the_component_segment() {
        let key = ComponentInstanceKey::service_level("main", "web", "prod", vec![], "web-svc", "");
        assert!(key.is_service());
        assert_eq!(key.as_string(), "main#web#prod#web-svc");
    }

    #[test]
    fn component_key_appends_the_component_segment() {
        let key = ComponentInstanceKey::service_level("main", "web", "prod", vec![], "web-svc", "")
            .with_component("backend");
        assert!(!key.is_service());
        assert_eq!(key.as_string(), "main#web#prod#web-svc#backend");
    }

    #[test]
    fn allocation_keys_appear_in_order() {
        let key = ComponentInstanceKey::service_level(
            "main",
            "web",
            "prod",
            vec!["us-east".to_string(), "t1".to_string()],
            "web-svc",
            "",
        );
        assert_eq!(key.as_string(), "main#web#prod#us-east#t1#web-svc");
    }

    #[test]
    fn cluster_is_not_part_of_the_canonical_string() {
        let with_cluster =
            ComponentInstanceKey::service_level("main", "web", "prod", vec![], "web-svc", "us-east");
        let without =
            ComponentInstanceKey::service_level("main", "web", "prod", vec![], "web-svc", "");
        assert_eq!(with_cluster.as_string(), without.as_string());
    }

    #[test]
    fn string_form_is_reproducible_from_stored_parts() {
        let key = ComponentInstanceKey {
            namespace: "main".to_string(),
            contract: "web".to_string(),
            context: "prod".to_string(),
            allocation_keys: vec!["k1".to_string()],
            service: "web-svc".to_string(),
            component: "backend".to_string(),
            cluster: "us-east".to_string(),
        };
        let rebuilt = ComponentInstanceKey::service_level(
            key.namespace.clone(),
            key.contract.clone(),
            key.context.clone(),
            key.allocation_keys.clone(),
            key.service.clone(),
            key.cluster.clone(),
        )
        .with_component(key.component.clone());
        assert_eq!(key.as_string(), rebuilt.as_string());
    }
}
