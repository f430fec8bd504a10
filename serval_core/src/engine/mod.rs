//! The policy resolution engine: rule evaluation and the recursive
//! traversal that turns declared dependencies into component instances.

pub mod resolve;
pub mod rules;
