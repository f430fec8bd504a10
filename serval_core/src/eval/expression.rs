//! Boolean criteria evaluation backed by a `rhai` engine.

use rhai::{Dynamic, Engine, Scope};

use super::data::EvalData;
use super::EvalError;

/// Evaluates boolean criteria expressions against a label set and
/// contextual data.
///
/// Labels are exposed as top-level variables and under `labels.*`; the
/// structured bags (`user`, `dependency`, `service`, `component`) shadow
/// any label with the same name. In strict mode an unknown identifier is
/// an evaluation error; otherwise it resolves to the empty string.
pub struct ExpressionEvaluator {
    engine: Engine,
}

impl ExpressionEvaluator {
    pub fn new(strict: bool) -> Self {
        let mut engine = Engine::new();
        engine.set_fail_on_invalid_map_property(strict);
        if !strict {
            engine.on_var(|name, _index, context| {
                if context.scope().contains(name) {
                    // fall through to normal scope resolution
                    Ok(None)
                } else {
                    Ok(Some(Dynamic::from(String::new())))
                }
            });
        }
        Self { engine }
    }

    pub fn eval_bool(&self, expr: &str, data: &EvalData<'_>) -> Result<bool, EvalError> {
        let mut scope = self.build_scope(data).map_err(|e| EvalError::new(expr, e))?;
        self.engine
            .eval_expression_with_scope::<bool>(&mut scope, expr)
            .map_err(|e| EvalError::new(expr, e))
    }

    fn build_scope(&self, data: &EvalData<'_>) -> Result<Scope<'static>, String> {
        let mut scope = Scope::new();
        for (name, value) in &data.labels.labels {
            scope.push(name.clone(), value.clone());
        }

        let bag = data.to_json();
        for key in ["labels", "user", "dependency", "service", "component"] {
            let value = bag.get(key).cloned().unwrap_or_default();
            let dynamic = rhai::serde::to_dynamic(&value).map_err(|e| e.to_string())?;
            scope.push_dynamic(key.to_string(), dynamic);
        }
        Ok(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::external::User;
    use crate::lang::{Dependency, LabelSet};

    fn fixture() -> (User, BTreeMap<String, String>, Dependency, LabelSet) {
        let user = User::new("u1", "alice");
        let secrets = BTreeMap::new();
        let dependency = Dependency {
            namespace: "main".to_string(),
            id: "d1".to_string(),
            user: "u1".to_string(),
            contract: "web".to_string(),
            labels: LabelSet::new(),
        };
        let labels = LabelSet::from_map(
            [("team", "dev"), ("replicas", "3")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        (user, secrets, dependency, labels)
    }

    #[test]
    fn evaluates_labels_as_variables() {
        let (user, secrets, dependency, labels) = fixture();
        let data = EvalData {
            labels: &labels,
            user: &user,
            secrets: &secrets,
            dependency: &dependency,
            service: None,
            component: None,
        };
        let evaluator = ExpressionEvaluator::new(false);

        assert!(evaluator.eval_bool("team == \"dev\"", &data).expect("eval"));
        assert!(!evaluator.eval_bool("team == \"ops\"", &data).expect("eval"));
        assert!(evaluator
            .eval_bool("labels.team == \"dev\"", &data)
            .expect("eval"));
        assert!(evaluator
            .eval_bool("user.name == \"alice\"", &data)
            .expect("eval"));
        assert!(evaluator
            .eval_bool("dependency.contract == \"web\"", &data)
            .expect("eval"));
    }

    #[test]
    fn unknown_label_is_empty_when_not_strict() {
        let (user, secrets, dependency, labels) = fixture();
        let data = EvalData {
            labels: &labels,
            user: &user,
            secrets: &secrets,
            dependency: &dependency,
            service: None,
            component: None,
        };
        let evaluator = ExpressionEvaluator::new(false);
        assert!(evaluator
            .eval_bool("missing == \"\"", &data)
            .expect("unknown identifier resolves to empty string"));
    }

    #[test]
    fn unknown_label_fails_when_strict() {
        let (user, secrets, dependency, labels) = fixture();
        let data = EvalData {
            labels: &labels,
            user: &user,
            secrets: &secrets,
            dependency: &dependency,
            service: None,
            component: None,
        };
        let evaluator = ExpressionEvaluator::new(true);
        let err = evaluator
            .eval_bool("missing == \"\"", &data)
            .expect_err("strict mode must fail on unknown identifiers");
        assert!(err.text.contains("missing"));
    }

    #[test]
    fn non_boolean_result_is_an_error() {
        let (user, secrets, dependency, labels) = fixture();
        let data = EvalData {
            labels: &labels,
            user: &user,
            secrets: &secrets,
            dependency: &dependency,
            service: None,
            component: None,
        };
        let evaluator = ExpressionEvaluator::new(false);
        assert!(evaluator.eval_bool("team", &data).is_err());
    }
}
