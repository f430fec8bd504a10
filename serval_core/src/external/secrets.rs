//! Secret loader seam.
//!
//! Secrets never enter label sets or the event log; templates see them
//! under `user.secrets` and only their count is ever logged.

use std::collections::BTreeMap;

/// Read access to per-user secrets.
pub trait SecretLoader: Send + Sync {
    fn load_secrets_by_user_name(&self, name: &str) -> BTreeMap<String, String>;
}

/// In-memory secret store keyed by user name.
#[derive(Debug, Clone, Default)]
pub struct InMemorySecretLoader {
    secrets: BTreeMap<String, BTreeMap<String, String>>,
}

impl InMemorySecretLoader {
    pub fn new(secrets: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        Self { secrets }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl SecretLoader for InMemorySecretLoader {
    fn load_secrets_by_user_name(&self, name: &str) -> BTreeMap<String, String> {
        self.secrets.get(name).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_user_has_no_secrets() {
        let loader = InMemorySecretLoader::empty();
        assert!(loader.load_secrets_by_user_name("alice").is_empty());
    }
}
