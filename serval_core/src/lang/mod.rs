//! Policy language model.
//!
//! Read-only declarations consumed by the resolution engine: labels,
//! criteria, contracts and their contexts, services and their components,
//! rules, clusters, dependencies, and the immutable `Policy` snapshot
//! holding them all.

pub mod cluster;
pub mod contract;
pub mod criteria;
pub mod dependency;
pub mod label;
pub mod policy;
pub mod rule;
pub mod service;

pub use cluster::Cluster;
pub use contract::{Allocation, Context, Contract};
pub use criteria::Criteria;
pub use dependency::Dependency;
pub use label::{LabelOperation, LabelOperations, LabelSet};
pub use policy::{Policy, PolicyNamespace, SYSTEM_NAMESPACE};
pub use rule::{Decision, Rule, RuleActions};
pub use service::{Code, Service, ServiceComponent};
