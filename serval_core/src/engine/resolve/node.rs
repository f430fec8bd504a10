//! One frame of the recursive resolution traversal.

use std::collections::BTreeMap;

use tracing::debug;

use super::key::ComponentInstanceKey;
use super::resolution::Resolution;
use super::resolver::PolicyResolver;
use crate::engine::rules::{process_rules, RuleLogEntry};
use crate::error::{Error, ResolutionError};
use crate::eval::EvalData;
use crate::event_log::{EventLog, LabelScope, ResolutionEvent};
use crate::external::User;
use crate::lang::{Context, Contract, Dependency, LabelSet, Service, ServiceComponent};

/// State owned by one traversal frame. A fresh node is created per
/// dependency at depth 0 and per contract reference below that; child
/// frames inherit the (possibly mutated) labels and the traversal path.
pub(crate) struct ResolutionNode<'a> {
    resolver: &'a PolicyResolver,
    event_log: &'a EventLog,
    dependency: &'a Dependency,
    user: Option<User>,
    secrets: Option<BTreeMap<String, String>>,
    contract_name: String,
    labels: LabelSet,
    path: Vec<String>,
    depth: usize,
}

impl<'a> ResolutionNode<'a> {
    pub(crate) fn root(
        resolver: &'a PolicyResolver,
        event_log: &'a EventLog,
        dependency: &'a Dependency,
    ) -> Self {
        Self {
            resolver,
            event_log,
            dependency,
            user: None,
            secrets: None,
            contract_name: dependency.contract.clone(),
            labels: LabelSet::new(),
            path: Vec::new(),
            depth: 0,
        }
    }

    fn child(&self, contract_name: String, labels: LabelSet) -> ResolutionNode<'a> {
        ResolutionNode {
            resolver: self.resolver,
            event_log: self.event_log,
            dependency: self.dependency,
            user: self.user.clone(),
            secrets: self.secrets.clone(),
            contract_name,
            labels,
            path: self.path.clone(),
            depth: self.depth + 1,
        }
    }

    /// Resolve the current contract into the given (per-dependency)
    /// resolution, returning the key of the service-level instance.
    pub(crate) fn resolve(&mut self, resolution: &mut Resolution) -> Result<ComponentInstanceKey, Error> {
        if self.resolver.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let max_depth = self.resolver.config().max_depth;
        if self.depth > max_depth {
            return Err(ResolutionError::DepthExceeded { max_depth }.into());
        }

        self.log_start();

        // 1. locate the contract
        let (contract_namespace, contract) = self.find_contract()?;
        debug!(contract = %contract.name, namespace = %contract_namespace, "contract found in policy");

        // 2. the user must exist and be permitted to consume from this
        // namespace
        self.ensure_user()?;
        let user_name = self.user_name();
        if !self.current_user()?.can_consume(&contract_namespace) {
            return Err(ResolutionError::UserNotAllowed(format!(
                "user '{}' not allowed to consume services in namespace '{}'",
                user_name, contract_namespace
            ))
            .into());
        }
        self.log_labels(LabelScope::Initial, None);

        // 3. rules at contract entry
        let mut rule_log = self.apply_rules(&contract_namespace)?;

        // 4. pick a context, apply its change-labels, re-run rules
        let context = self.match_context(contract)?;
        self.labels = self.labels.apply(&context.change_labels)?;
        if !context.change_labels.is_empty() {
            self.log_labels(LabelScope::Context, None);
        }
        rule_log.extend(self.apply_rules(&contract_namespace)?);

        // 5. allocation keys
        let allocation_keys = self.resolve_allocation_keys(contract, context)?;

        // 6. locate the target service
        let service = self.find_service(contract, &context.allocation.service)?;
        debug!(service = %service.name, namespace = %service.namespace, "service found in policy");

        // 7. cycle guard over the traversal path
        let path_entry = format!(
            "{}/{}:{}",
            contract.namespace, contract.name, service.name
        );
        if self.path.contains(&path_entry) {
            let mut path = self.path.clone();
            path.push(path_entry);
            return Err(ResolutionError::ServiceCycleDetected { path }.into());
        }
        self.path.push(path_entry);

        // 8. service-level instance
        let cluster = self.resolve_cluster()?;
        let service_key = ComponentInstanceKey::service_level(
            contract.namespace.clone(),
            contract.name.clone(),
            context.name.clone(),
            allocation_keys,
            service.name.clone(),
            cluster,
        );
        let dependency_id = self.dependency.qualified_id();
        resolution.attach_dependency(&service_key, &dependency_id);
        resolution.record_labels(&service_key, &self.labels);
        resolution.record_rule_log(&service_key, &rule_log);
        self.log_instance_resolved(&service_key, service, None);

        // 9. walk components in declaration order
        for component in &service.components {
            if self.resolver.is_cancelled() {
                return Err(Error::Cancelled);
            }
            self.resolve_component(resolution, service, &service_key, component, &dependency_id)?;
        }

        // 10. edges declared between sibling components
        for component in &service.components {
            let to_key = service_key.with_component(component.name.as_str());
            if resolution.instance(&to_key.as_string()).is_none() {
                continue;
            }
            for required in &component.dependencies {
                let from_key = service_key.with_component(required.as_str());
                if resolution.instance(&from_key.as_string()).is_some() {
                    resolution.add_edge(&from_key, &to_key);
                }
            }
        }

        Ok(service_key)
    }

    fn resolve_component(
        &mut self,
        resolution: &mut Resolution,
        service: &Service,
        service_key: &ComponentInstanceKey,
        component: &ServiceComponent,
        dependency_id: &str,
    ) -> Result<(), Error> {
        // component criterion: skip quietly when it evaluates to false
        let matched = match &component.criteria {
            None => true,
            Some(criteria) => criteria
                .is_match(
                    self.resolver.expressions(),
                    &self.eval_data(Some(service), Some(component))?,
                )
                .map_err(|e| {
                    ResolutionError::InvalidPolicy(format!(
                        "error while checking component criteria '{}' for service '{}': {}",
                        component.name, service.name, e
                    ))
                })?,
        };
        if !matched {
            self.event_log.info(
                format!(
                    "component criteria evaluated to 'false', excluding it from processing: service '{}', component '{}'",
                    service.name, component.name
                ),
                ResolutionEvent::ComponentSkip {
                    service: service.name.clone(),
                    component: component.name.clone(),
                },
            );
            return Ok(());
        }

        let component_labels = self.labels.apply(&component.change_labels)?;
        if !component.change_labels.is_empty() {
            self.log_labels(LabelScope::Component, Some(&component_labels));
        }

        let component_key = service_key.with_component(component.name.as_str());
        if let Some(code) = &component.code {
            let data = EvalData {
                labels: &component_labels,
                user: self.current_user()?,
                secrets: self.current_secrets()?,
                dependency: self.dependency,
                service: Some(service),
                component: Some(component),
            };
            let code_params = self
                .resolver
                .templates()
                .eval_params(&code.params, &data)
                .map_err(|e| {
                    ResolutionError::InvalidPolicy(format!(
                        "error when processing code params for service '{}', component '{}': {}",
                        service.name, component.name, e
                    ))
                })?;
            let discovery_params = self
                .resolver
                .templates()
                .eval_params(&component.discovery, &data)
                .map_err(|e| {
                    ResolutionError::InvalidPolicy(format!(
                        "error when processing discovery params for service '{}', component '{}': {}",
                        service.name, component.name, e
                    ))
                })?;

            resolution.record_code_params(&component_key, code_params)?;
            resolution.record_discovery_params(&component_key, discovery_params)?;
            resolution.attach_dependency(&component_key, dependency_id);
            resolution.record_labels(&component_key, &component_labels);
            resolution.add_edge(service_key, &component_key);
            self.log_instance_resolved(&component_key, service, Some(component));
        } else if let Some(target_contract) = &component.contract {
            let mut child = self.child(target_contract.clone(), component_labels.clone());
            let child_service_key = child.resolve(resolution)?;

            resolution.attach_dependency(&component_key, dependency_id);
            resolution.record_labels(&component_key, &component_labels);
            resolution.add_edge(service_key, &component_key);
            resolution.add_edge(&component_key, &child_service_key);
            self.log_instance_resolved(&component_key, service, Some(component));
        } else {
            self.event_log.warning(
                format!(
                    "skipping unknown component (not code and not contract): {}",
                    component.name
                ),
                ResolutionEvent::ComponentSkip {
                    service: service.name.clone(),
                    component: component.name.clone(),
                },
            );
        }
        Ok(())
    }

    /// At the root frame, load the user and their secrets and compute the
    /// initial label set: user labels overlaid with dependency labels.
    fn ensure_user(&mut self) -> Result<(), Error> {
        if self.user.is_some() {
            return Ok(());
        }
        let user = self
            .resolver
            .external()
            .users
            .load_user_by_id(&self.dependency.user)
            .ok_or_else(|| {
                ResolutionError::UserNotAllowed(format!(
                    "dependency '{}' refers to non-existing user: {}",
                    self.dependency.qualified_id(),
                    self.dependency.user
                ))
            })?;
        let secrets = self
            .resolver
            .external()
            .secrets
            .load_secrets_by_user_name(&user.name);

        self.labels = user.labels.clone();
        self.labels.add_labels(&self.dependency.labels);
        self.user = Some(user);
        self.secrets = Some(secrets);
        Ok(())
    }

    fn current_user(&self) -> Result<&User, Error> {
        self.user
            .as_ref()
            .ok_or_else(|| Error::Internal("user not loaded before evaluation".to_string()))
    }

    fn current_secrets(&self) -> Result<&BTreeMap<String, String>, Error> {
        self.secrets
            .as_ref()
            .ok_or_else(|| Error::Internal("secrets not loaded before evaluation".to_string()))
    }

    fn user_name(&self) -> String {
        self.user
            .as_ref()
            .map(|u| u.name.clone())
            .unwrap_or_else(|| self.dependency.user.clone())
    }

    fn eval_data<'b>(
        &'b self,
        service: Option<&'b Service>,
        component: Option<&'b ServiceComponent>,
    ) -> Result<EvalData<'b>, Error> {
        Ok(EvalData {
            labels: &self.labels,
            user: self.current_user()?,
            secrets: self.current_secrets()?,
            dependency: self.dependency,
            service,
            component,
        })
    }

    /// Resolve a possibly namespace-qualified reference (`ns/name`)
    /// against the current namespace.
    fn split_ref<'b>(namespace: &'b str, reference: &'b str) -> (&'b str, &'b str) {
        match reference.split_once('/') {
            Some((ns, name)) => (ns, name),
            None => (namespace, reference),
        }
    }

    fn find_contract(&self) -> Result<(String, &'a Contract), Error> {
        let (namespace, name) =
            Self::split_ref(&self.dependency.namespace, &self.contract_name);
        let contract = self
            .resolver
            .policy()
            .find_contract(namespace, name)
            .ok_or_else(|| {
                ResolutionError::InvalidPolicy(format!(
                    "dependency '{}' refers to non-existing contract: {}",
                    self.dependency.qualified_id(),
                    self.contract_name
                ))
            })?;
        Ok((namespace.to_string(), contract))
    }

    fn find_service(
        &self,
        contract: &Contract,
        reference: &str,
    ) -> Result<&'a Service, Error> {
        let (namespace, name) = Self::split_ref(&contract.namespace, reference);
        if namespace != contract.namespace {
            return Err(ResolutionError::InvalidPolicy(format!(
                "service '{}' is not in the same namespace as contract '{}/{}'",
                reference, contract.namespace, contract.name
            ))
            .into());
        }
        self.resolver
            .policy()
            .find_service(namespace, name)
            .ok_or_else(|| {
                ResolutionError::InvalidPolicy(format!(
                    "contract '{}/{}' refers to non-existing service: {}",
                    contract.namespace, contract.name, reference
                ))
                .into()
            })
    }

    /// Run the namespace's rules against the current labels, log every
    /// test, and absorb the resulting label changes.
    fn apply_rules(&mut self, namespace: &str) -> Result<Vec<RuleLogEntry>, Error> {
        let rules = self.resolver.policy().rules(namespace);
        if rules.is_empty() {
            return Ok(Vec::new());
        }

        let result = process_rules(
            rules,
            self.resolver.expressions(),
            &self.eval_data(None, None)?,
            &self.labels,
            &self.contract_name,
        )?;

        for entry in &result.log {
            self.event_log.debug(
                format!(
                    "testing if rule '{}' applies while processing contract '{}': {}",
                    entry.rule, self.contract_name, entry.matched
                ),
                ResolutionEvent::RuleTest {
                    rule: entry.rule.clone(),
                    matched: entry.matched,
                },
            );
        }
        self.event_log.debug(
            format!(
                "rules processed within namespace '{}' for contract '{}'",
                namespace, self.contract_name
            ),
            ResolutionEvent::RuleResult {
                namespace: namespace.to_string(),
                contract: self.contract_name.clone(),
                allowed: result.allowed,
                ingress_blocked: result.ingress_blocked,
                applied: result
                    .log
                    .iter()
                    .filter(|entry| entry.matched)
                    .map(|entry| entry.rule.clone())
                    .collect(),
            },
        );

        let labels_changed = result.labels != self.labels;
        self.labels = result.labels;
        if labels_changed {
            self.log_labels(LabelScope::Rule, None);
        }

        if !result.allowed {
            return Err(ResolutionError::DependencyNotAllowedByRules {
                dependency: self.dependency.qualified_id(),
                contract: self.contract_name.clone(),
                depth: self.depth,
            }
            .into());
        }
        Ok(result.log)
    }

    /// Pick the first context whose criteria match, in declaration order.
    fn match_context(&self, contract: &'a Contract) -> Result<&'a Context, Error> {
        for context in &contract.contexts {
            let matched = match &context.criteria {
                None => true,
                Some(criteria) => criteria
                    .is_match(self.resolver.expressions(), &self.eval_data(None, None)?)
                    .map_err(|e| ResolutionError::ContextEvalError {
                        contract: contract.name.clone(),
                        context: context.name.clone(),
                        cause: e.to_string(),
                    })?,
            };
            self.event_log.debug(
                format!(
                    "trying context '{}' within contract '{}': matched = {}",
                    context.name, contract.name, matched
                ),
                ResolutionEvent::ContextTest {
                    contract: contract.name.clone(),
                    context: context.name.clone(),
                    matched,
                },
            );
            if matched {
                self.event_log.info(
                    format!(
                        "found matching context within contract '{}': {}",
                        contract.name, context.name
                    ),
                    ResolutionEvent::ContextMatch {
                        contract: contract.name.clone(),
                        context: context.name.clone(),
                    },
                );
                return Ok(context);
            }
        }
        Err(ResolutionError::ContextNotMatched {
            contract: contract.name.clone(),
        }
        .into())
    }

    fn resolve_allocation_keys(
        &self,
        contract: &Contract,
        context: &Context,
    ) -> Result<Vec<String>, Error> {
        let mut resolved = Vec::with_capacity(context.allocation.keys.len());
        for template in &context.allocation.keys {
            let key = self
                .resolver
                .templates()
                .eval_text(template, &self.eval_data(None, None)?)
                .map_err(|e| ResolutionError::AllocationKeyError {
                    contract: contract.name.clone(),
                    context: context.name.clone(),
                    cause: e.to_string(),
                })?;
            resolved.push(key);
        }
        if !resolved.is_empty() {
            self.event_log.info(
                format!(
                    "allocation keys resolved for context '{}' within contract '{}': {:?}",
                    context.name, contract.name, resolved
                ),
                ResolutionEvent::Allocation {
                    contract: contract.name.clone(),
                    context: context.name.clone(),
                    keys: context.allocation.keys.clone(),
                    resolved: resolved.clone(),
                },
            );
        }
        Ok(resolved)
    }

    /// The `cluster` label, when present, must name a cluster defined in
    /// the system namespace.
    fn resolve_cluster(&self) -> Result<String, Error> {
        match self.labels.get("cluster") {
            None => Ok(String::new()),
            Some(name) => {
                if self.resolver.policy().find_cluster(name).is_none() {
                    return Err(ResolutionError::InvalidPolicy(format!(
                        "cluster 'system/{}' doesn't exist in policy",
                        name
                    ))
                    .into());
                }
                Ok(name.to_string())
            }
        }
    }

    fn log_start(&self) {
        let message = if self.depth == 0 {
            format!(
                "resolving top-level dependency '{}' ('{}' -> '{}')",
                self.dependency.qualified_id(),
                self.dependency.user,
                self.dependency.contract
            )
        } else {
            format!(
                "resolving dependency '{}' ('{}' -> '{}'): processing '{}', tree depth {}",
                self.dependency.qualified_id(),
                self.dependency.user,
                self.dependency.contract,
                self.contract_name,
                self.depth
            )
        };
        self.event_log.info(
            message,
            ResolutionEvent::Start {
                dependency: self.dependency.qualified_id(),
                user: self.dependency.user.clone(),
                contract: self.contract_name.clone(),
                depth: self.depth,
            },
        );
    }

    fn log_labels(&self, scope: LabelScope, labels: Option<&LabelSet>) {
        let labels = labels.unwrap_or(&self.labels);
        let secret_count = self.secrets.as_ref().map_or(0, |s| s.len());
        self.event_log.info(
            format!(
                "labels ({}): {} entries and {} secrets",
                scope,
                labels.len(),
                secret_count
            ),
            ResolutionEvent::Label {
                scope,
                labels: labels.labels.clone(),
                secret_count,
            },
        );
    }

    fn log_instance_resolved(
        &self,
        key: &ComponentInstanceKey,
        service: &Service,
        component: Option<&ServiceComponent>,
    ) {
        let message = match component {
            None if self.depth == 0 => format!(
                "successfully resolved dependency '{}' ('{}' -> '{}'): {}",
                self.dependency.qualified_id(),
                self.user_name(),
                self.dependency.contract,
                key
            ),
            None => format!(
                "successfully resolved service instance '{}' -> '{}': {}",
                self.user_name(),
                self.contract_name,
                key
            ),
            Some(component) => format!(
                "successfully resolved component instance '{}' -> '{}' (component '{}'): {}",
                self.user_name(),
                self.contract_name,
                component.name,
                key
            ),
        };
        self.event_log.info(
            message,
            ResolutionEvent::ComponentResolved {
                key: key.as_string(),
                service: service.name.clone(),
                component: component.map(|c| c.name.clone()),
                code_type: component
                    .and_then(|c| c.code.as_ref())
                    .map(|code| code.code_type.clone()),
                contract: component.and_then(|c| c.contract.clone()),
            },
        );
    }
}
