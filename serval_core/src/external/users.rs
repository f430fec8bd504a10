//! User directory seam.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::lang::LabelSet;

/// A consumer of services, as reported by the external user directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "LabelSet::is_empty")]
    pub labels: LabelSet,
    /// Namespaces this user may consume services from; `None` means
    /// unrestricted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_namespaces: Option<Vec<String>>,
    #[serde(default)]
    pub admin: bool,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            labels: LabelSet::new(),
            allowed_namespaces: None,
            admin: false,
        }
    }

    pub fn can_consume(&self, namespace: &str) -> bool {
        if self.admin {
            return true;
        }
        match &self.allowed_namespaces {
            None => true,
            Some(namespaces) => namespaces.iter().any(|ns| ns == namespace),
        }
    }
}

/// Read access to the external user directory.
pub trait UserLoader: Send + Sync {
    fn load_user_by_id(&self, id: &str) -> Option<User>;
}

/// In-memory user directory, used by tests and embedders with a
/// pre-fetched snapshot.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserLoader {
    users: BTreeMap<String, User>,
}

impl InMemoryUserLoader {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: users.into_iter().map(|u| (u.id.clone(), u)).collect(),
        }
    }
}

impl UserLoader for InMemoryUserLoader {
    fn load_user_by_id(&self, id: &str) -> Option<User> {
        self.users.get(id).cloned()
    }
}
