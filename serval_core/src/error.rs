//! Error types for the Serval resolution engine.
//!
//! Every error that can occur while resolving a single dependency is a
//! `ResolutionError`; those are caught at the per-dependency boundary and
//! recorded in the resolution output instead of aborting the run. Only
//! `Internal` and `Cancelled` surface to the caller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Root error type for the Serval engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("resolution cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors that fail a single dependency without affecting the others.
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("user not allowed: {0}")]
    UserNotAllowed(String),

    #[error("unable to find matching context within contract '{contract}'")]
    ContextNotMatched { contract: String },

    #[error("error while trying to match context '{context}' for contract '{contract}': {cause}")]
    ContextEvalError {
        contract: String,
        context: String,
        cause: String,
    },

    #[error("error while processing rule '{rule}' on contract '{contract}': {cause}")]
    RuleEvalError {
        rule: String,
        contract: String,
        cause: String,
    },

    #[error("rules do not allow dependency '{dependency}': processing '{contract}', tree depth {depth}")]
    DependencyNotAllowedByRules {
        dependency: String,
        contract: String,
        depth: usize,
    },

    #[error("error while resolving allocation keys for contract '{contract}', context '{context}': {cause}")]
    AllocationKeyError {
        contract: String,
        context: String,
        cause: String,
    },

    #[error("conflicting parameters for component instance '{key}'")]
    ParameterConflict { key: String },

    #[error("service cycle detected: {path:?}")]
    ServiceCycleDetected { path: Vec<String> },

    #[error("maximum resolution depth {max_depth} exceeded")]
    DepthExceeded { max_depth: usize },
}

impl ResolutionError {
    /// Stable kind tag used in failure records and event log entries.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionError::InvalidPolicy(_) => "InvalidPolicy",
            ResolutionError::UserNotAllowed(_) => "UserNotAllowed",
            ResolutionError::ContextNotMatched { .. } => "ContextNotMatched",
            ResolutionError::ContextEvalError { .. } => "ContextEvalError",
            ResolutionError::RuleEvalError { .. } => "RuleEvalError",
            ResolutionError::DependencyNotAllowedByRules { .. } => "DependencyNotAllowedByRules",
            ResolutionError::AllocationKeyError { .. } => "AllocationKeyError",
            ResolutionError::ParameterConflict { .. } => "ParameterConflict",
            ResolutionError::ServiceCycleDetected { .. } => "ServiceCycleDetected",
            ResolutionError::DepthExceeded { .. } => "DepthExceeded",
        }
    }

    /// Build the user-visible failure record for this error.
    pub fn details(&self) -> ErrorDetails {
        let mut fields = BTreeMap::new();
        match self {
            ResolutionError::ContextNotMatched { contract } => {
                fields.insert("contract".to_string(), json!(contract));
            }
            ResolutionError::ContextEvalError {
                contract,
                context,
                cause,
            } => {
                fields.insert("contract".to_string(), json!(contract));
                fields.insert("context".to_string(), json!(context));
                fields.insert("cause".to_string(), json!(cause));
            }
            ResolutionError::RuleEvalError {
                rule,
                contract,
                cause,
            } => {
                fields.insert("rule".to_string(), json!(rule));
                fields.insert("contract".to_string(), json!(contract));
                fields.insert("cause".to_string(), json!(cause));
            }
            ResolutionError::DependencyNotAllowedByRules {
                dependency,
                contract,
                depth,
            } => {
                fields.insert("dependency".to_string(), json!(dependency));
                fields.insert("contract".to_string(), json!(contract));
                fields.insert("depth".to_string(), json!(depth));
            }
            ResolutionError::AllocationKeyError {
                contract,
                context,
                cause,
            } => {
                fields.insert("contract".to_string(), json!(contract));
                fields.insert("context".to_string(), json!(context));
                fields.insert("cause".to_string(), json!(cause));
            }
            ResolutionError::ParameterConflict { key } => {
                fields.insert("key".to_string(), json!(key));
            }
            ResolutionError::ServiceCycleDetected { path } => {
                fields.insert("path".to_string(), json!(path));
            }
            ResolutionError::DepthExceeded { max_depth } => {
                fields.insert("maxDepth".to_string(), json!(max_depth));
            }
            ResolutionError::InvalidPolicy(_) | ResolutionError::UserNotAllowed(_) => {}
        }
        ErrorDetails {
            kind: self.kind().to_string(),
            message: self.to_string(),
            fields,
        }
    }
}

/// User-visible failure record, surfaced in `Resolution::failures`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub kind: String,
    pub message: String,
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Result type used throughout the Serval engine.
pub type Result<T> = std::result::Result<T, Error>;
