//! The resolution driver: iterates dependencies, isolates failures, and
//! assembles the global resolution and event log.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use super::node::ResolutionNode;
use super::resolution::Resolution;
use crate::error::{Error, ResolutionError, Result};
use crate::eval::{ExpressionEvaluator, TemplateEvaluator};
use crate::event_log::{EventLog, ResolutionEvent};
use crate::external::ExternalData;
use crate::lang::{Dependency, Policy};

/// Engine options.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Fail expressions and templates that reference an unknown label
    /// instead of treating it as an empty string.
    pub strict_labels: bool,
    /// Hard cap on recursion depth.
    pub max_depth: usize,
    /// Break topological-order ties lexicographically by instance key.
    pub deterministic_ties: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strict_labels: false,
            max_depth: 32,
            deterministic_ties: true,
        }
    }
}

/// Cooperative cancel signal, checked between dependencies and between
/// component iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Resolves every dependency declared in the policy into component
/// instances, with per-dependency failure isolation: one dependency's
/// failure never affects another's outcome.
pub struct PolicyResolver {
    policy: Arc<Policy>,
    external: ExternalData,
    config: ResolverConfig,
    cancel: CancelToken,
    expressions: ExpressionEvaluator,
    templates: TemplateEvaluator,
}

impl PolicyResolver {
    pub fn new(policy: Arc<Policy>, external: ExternalData, config: ResolverConfig) -> Self {
        let expressions = ExpressionEvaluator::new(config.strict_labels);
        let templates = TemplateEvaluator::new(config.strict_labels);
        Self {
            policy,
            external,
            config,
            cancel: CancelToken::new(),
            expressions,
            templates,
        }
    }

    /// Token for cancelling this resolver from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub(crate) fn policy(&self) -> &Policy {
        &self.policy
    }

    pub(crate) fn external(&self) -> &ExternalData {
        &self.external
    }

    pub(crate) fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub(crate) fn expressions(&self) -> &ExpressionEvaluator {
        &self.expressions
    }

    pub(crate) fn templates(&self) -> &TemplateEvaluator {
        &self.templates
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolve all dependencies in deterministic order (namespace, then
    /// id). Successful sub-resolutions merge into the global resolution;
    /// failures are recorded and the run continues. On cancellation
    /// nothing is committed.
    pub fn resolve(&self) -> Result<(Resolution, EventLog)> {
        let mut dependencies: Vec<&Dependency> = self.policy.dependencies.iter().collect();
        dependencies.sort_by(|a, b| {
            a.namespace
                .cmp(&b.namespace)
                .then_with(|| a.id.cmp(&b.id))
        });

        info!(count = dependencies.len(), "resolving policy dependencies");

        let mut global = Resolution::new();
        let global_log = EventLog::new();

        for dependency in dependencies {
            if self.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let dependency_id = dependency.qualified_id();
            debug!(dependency = %dependency_id, "resolving dependency");
            let dependency_log = EventLog::correlated(dependency_id.as_str());

            match self.resolve_dependency(dependency, &dependency_log) {
                Ok((sub_resolution, service_key)) => {
                    match global.merge(sub_resolution) {
                        Ok(()) => {
                            dependency_log.info(
                                format!("dependency '{}' resolved", dependency_id),
                                ResolutionEvent::End {
                                    dependency: dependency_id.clone(),
                                    resolved: true,
                                    key: Some(service_key),
                                },
                            );
                        }
                        Err(conflict) => {
                            self.record_failure(
                                &mut global,
                                &dependency_log,
                                &dependency_id,
                                conflict,
                            );
                        }
                    }
                }
                Err(Error::Resolution(err)) => {
                    self.record_failure(&mut global, &dependency_log, &dependency_id, err);
                }
                Err(fatal) => return Err(fatal),
            }

            global_log.extend(&dependency_log);
        }

        global.compute_processing_order(self.config.deterministic_ties)?;
        info!(
            instances = global.instances.len(),
            failures = global.failures.len(),
            "policy resolution finished"
        );
        Ok((global, global_log))
    }

    /// Resolve one dependency into a private resolution, so a failure
    /// discards every instance its subtree created.
    fn resolve_dependency(
        &self,
        dependency: &Dependency,
        event_log: &EventLog,
    ) -> Result<(Resolution, String)> {
        let mut sub_resolution = Resolution::new();
        let mut node = ResolutionNode::root(self, event_log, dependency);
        let service_key = node.resolve(&mut sub_resolution)?;
        Ok((sub_resolution, service_key.as_string()))
    }

    fn record_failure(
        &self,
        global: &mut Resolution,
        event_log: &EventLog,
        dependency_id: &str,
        err: ResolutionError,
    ) {
        let details = err.details();
        event_log.error(
            format!("dependency '{}' failed: {}", dependency_id, details.message),
            ResolutionEvent::Failure {
                dependency: dependency_id.to_string(),
                details: details.clone(),
            },
        );
        event_log.info(
            format!("dependency '{}' not resolved", dependency_id),
            ResolutionEvent::End {
                dependency: dependency_id.to_string(),
                resolved: false,
                key: None,
            },
        );
        global.record_failure(dependency_id, details);
    }
}
