//! External collaborator seams: user directory and secret loader.
//!
//! The engine treats both as synchronous pure lookups; latency and
//! freshness are the caller's concern. Implementations must be safe for
//! concurrent read.

pub mod secrets;
pub mod users;

use std::sync::Arc;

pub use secrets::{InMemorySecretLoader, SecretLoader};
pub use users::{InMemoryUserLoader, User, UserLoader};

/// Bundle of external data sources handed to the resolver.
#[derive(Clone)]
pub struct ExternalData {
    pub users: Arc<dyn UserLoader>,
    pub secrets: Arc<dyn SecretLoader>,
}

impl ExternalData {
    pub fn new(users: Arc<dyn UserLoader>, secrets: Arc<dyn SecretLoader>) -> Self {
        Self { users, secrets }
    }
}
