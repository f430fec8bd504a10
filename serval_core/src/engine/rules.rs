//! Rule evaluation over a namespace's ordered rule list.

use serde::{Deserialize, Serialize};

use crate::error::ResolutionError;
use crate::eval::{EvalData, ExpressionEvaluator};
use crate::lang::{Decision, LabelSet, Rule};

/// One rule test, kept for instance rule logs and the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleLogEntry {
    pub rule: String,
    pub matched: bool,
}

/// Aggregated outcome of processing a rule batch for the current
/// (user, contract, context, service) tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleActionResult {
    pub allowed: bool,
    pub labels: LabelSet,
    pub ingress_blocked: bool,
    pub log: Vec<RuleLogEntry>,
}

/// Evaluate rules in declaration order against the contextual data.
///
/// Every matching rule applies its label operations to the accumulating
/// label set. A `deny` dependency action short-circuits the batch with
/// `allowed = false`, keeping the label operations collected up to and
/// including that rule. An evaluation error on any rule fails the whole
/// batch.
pub fn process_rules(
    rules: &[Rule],
    evaluator: &ExpressionEvaluator,
    data: &EvalData<'_>,
    labels: &LabelSet,
    contract: &str,
) -> Result<RuleActionResult, ResolutionError> {
    let mut result = RuleActionResult {
        allowed: true,
        labels: labels.clone(),
        ingress_blocked: false,
        log: Vec::new(),
    };

    for rule in rules {
        let matched = match &rule.criteria {
            None => true,
            Some(criteria) => {
                criteria
                    .is_match(evaluator, data)
                    .map_err(|e| ResolutionError::RuleEvalError {
                        rule: rule.name.clone(),
                        contract: contract.to_string(),
                        cause: e.to_string(),
                    })?
            }
        };
        result.log.push(RuleLogEntry {
            rule: rule.name.clone(),
            matched,
        });
        if !matched {
            continue;
        }

        result.labels = result.labels.apply(&rule.actions.change_labels)?;
        if rule.actions.ingress == Some(Decision::Deny) {
            result.ingress_blocked = true;
        }
        if rule.actions.dependency == Some(Decision::Deny) {
            result.allowed = false;
            break;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::lang::{Criteria, Dependency, LabelOperation, LabelOperations, RuleActions};
    use crate::external::User;

    fn rule(name: &str, criteria: Option<Criteria>, actions: RuleActions) -> Rule {
        Rule {
            namespace: "main".to_string(),
            name: name.to_string(),
            criteria,
            actions,
        }
    }

    fn fixture() -> (User, BTreeMap<String, String>, Dependency) {
        (
            User::new("u1", "alice"),
            BTreeMap::new(),
            Dependency {
                namespace: "main".to_string(),
                id: "d1".to_string(),
                user: "u1".to_string(),
                contract: "web".to_string(),
                labels: LabelSet::new(),
            },
        )
    }

    #[test]
    fn matching_rules_apply_in_order() {
        let (user, secrets, dependency) = fixture();
        let labels = LabelSet::new();
        let data = EvalData {
            labels: &labels,
            user: &user,
            secrets: &secrets,
            dependency: &dependency,
            service: None,
            component: None,
        };
        let evaluator = ExpressionEvaluator::new(false);

        let rules = vec![
            rule(
                "first",
                None,
                RuleActions {
                    change_labels: LabelOperations::new(vec![LabelOperation::set("stage", "test")]),
                    ..RuleActions::default()
                },
            ),
            rule(
                "second",
                None,
                RuleActions {
                    change_labels: LabelOperations::new(vec![LabelOperation::set("stage", "prod")]),
                    ..RuleActions::default()
                },
            ),
        ];

        let result = process_rules(&rules, &evaluator, &data, &labels, "web").expect("process");
        assert!(result.allowed);
        assert_eq!(result.labels.get("stage"), Some("prod"));
        assert_eq!(result.log.len(), 2);
        assert!(result.log.iter().all(|entry| entry.matched));
    }

    #[test]
    fn deny_short_circuits_but_keeps_collected_ops() {
        let (user, secrets, dependency) = fixture();
        let labels = LabelSet::new();
        let data = EvalData {
            labels: &labels,
            user: &user,
            secrets: &secrets,
            dependency: &dependency,
            service: None,
            component: None,
        };
        let evaluator = ExpressionEvaluator::new(false);

        let rules = vec![
            rule(
                "tag",
                None,
                RuleActions {
                    change_labels: LabelOperations::new(vec![LabelOperation::set("seen", "yes")]),
                    ..RuleActions::default()
                },
            ),
            rule(
                "block",
                None,
                RuleActions {
                    dependency: Some(Decision::Deny),
                    ..RuleActions::default()
                },
            ),
            rule(
                "never",
                None,
                RuleActions {
                    change_labels: LabelOperations::new(vec![LabelOperation::set("late", "yes")]),
                    ..RuleActions::default()
                },
            ),
        ];

        let result = process_rules(&rules, &evaluator, &data, &labels, "web").expect("process");
        assert!(!result.allowed);
        assert_eq!(result.labels.get("seen"), Some("yes"));
        assert_eq!(result.labels.get("late"), None);
        assert_eq!(result.log.len(), 2);
    }

    #[test]
    fn non_matching_rules_contribute_nothing() {
        let (user, secrets, dependency) = fixture();
        let labels = LabelSet::new();
        let data = EvalData {
            labels: &labels,
            user: &user,
            secrets: &secrets,
            dependency: &dependency,
            service: None,
            component: None,
        };
        let evaluator = ExpressionEvaluator::new(false);

        let rules = vec![rule(
            "other-team",
            Some(Criteria::require_all(vec!["team == \"ops\""])),
            RuleActions {
                dependency: Some(Decision::Deny),
                ..RuleActions::default()
            },
        )];

        let result = process_rules(&rules, &evaluator, &data, &labels, "web").expect("process");
        assert!(result.allowed);
        assert_eq!(result.log, vec![RuleLogEntry { rule: "other-team".to_string(), matched: false }]);
    }

    #[test]
    fn evaluation_error_fails_the_batch() {
        let (user, secrets, dependency) = fixture();
        let labels = LabelSet::new();
        let data = EvalData {
            labels: &labels,
            user: &user,
            secrets: &secrets,
            dependency: &dependency,
            service: None,
            component: None,
        };
        let evaluator = ExpressionEvaluator::new(false);

        let rules = vec![rule(
            "broken",
            Some(Criteria::require_all(vec!["this is not an expression"])),
            RuleActions::default(),
        )];

        let err = process_rules(&rules, &evaluator, &data, &labels, "web")
            .expect_err("broken rule must fail the batch");
        assert!(matches!(err, ResolutionError::RuleEvalError { .. }));
    }

    #[test]
    fn ingress_deny_does_not_stop_processing() {
        let (user, secrets, dependency) = fixture();
        let labels = LabelSet::new();
        let data = EvalData {
            labels: &labels,
            user: &user,
            secrets: &secrets,
            dependency: &dependency,
            service: None,
            component: None,
        };
        let evaluator = ExpressionEvaluator::new(false);

        let rules = vec![
            rule(
                "no-ingress",
                None,
                RuleActions {
                    ingress: Some(Decision::Deny),
                    ..RuleActions::default()
                },
            ),
            rule(
                "tag",
                None,
                RuleActions {
                    change_labels: LabelOperations::new(vec![LabelOperation::set("after", "yes")]),
                    ..RuleActions::default()
                },
            ),
        ];

        let result = process_rules(&rules, &evaluator, &data, &labels, "web").expect("process");
        assert!(result.allowed);
        assert!(result.ingress_blocked);
        assert_eq!(result.labels.get("after"), Some("yes"));
    }
}
