//! Matching criteria evaluated against labels and contextual data.

use serde::{Deserialize, Serialize};

use crate::eval::{EvalData, EvalError, ExpressionEvaluator};

/// A set of boolean expressions gating a context, component, or rule.
///
/// Matches when every `require_all` expression holds, at least one
/// `require_any` expression holds (if any are declared), and no
/// `require_none` expression holds. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require_all: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require_any: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require_none: Vec<String>,
}

impl Criteria {
    pub fn require_all(exprs: Vec<&str>) -> Self {
        Self {
            require_all: exprs.into_iter().map(String::from).collect(),
            ..Self::default()
        }
    }

    pub fn is_match(
        &self,
        evaluator: &ExpressionEvaluator,
        data: &EvalData<'_>,
    ) -> Result<bool, EvalError> {
        for expr in &self.require_all {
            if !evaluator.eval_bool(expr, data)? {
                return Ok(false);
            }
        }
        for expr in &self.require_none {
            if evaluator.eval_bool(expr, data)? {
                return Ok(false);
            }
        }
        if !self.require_any.is_empty() {
            for expr in &self.require_any {
                if evaluator.eval_bool(expr, data)? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::external::User;
    use crate::lang::{Dependency, LabelSet};

    fn fixture(pairs: &[(&str, &str)]) -> (User, BTreeMap<String, String>, Dependency, LabelSet) {
        let user = User::new("u1", "alice");
        let dependency = Dependency {
            namespace: "main".to_string(),
            id: "d1".to_string(),
            user: "u1".to_string(),
            contract: "web".to_string(),
            labels: LabelSet::new(),
        };
        let labels = LabelSet::from_map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        (user, BTreeMap::new(), dependency, labels)
    }

    #[test]
    fn empty_criteria_match() {
        let (user, secrets, dependency, labels) = fixture(&[]);
        let data = EvalData {
            labels: &labels,
            user: &user,
            secrets: &secrets,
            dependency: &dependency,
            service: None,
            component: None,
        };
        let evaluator = ExpressionEvaluator::new(false);
        assert!(Criteria::default().is_match(&evaluator, &data).expect("eval"));
    }

    #[test]
    fn require_all_any_none_combine() {
        let (user, secrets, dependency, labels) = fixture(&[("team", "dev"), ("gpu", "yes")]);
        let data = EvalData {
            labels: &labels,
            user: &user,
            secrets: &secrets,
            dependency: &dependency,
            service: None,
            component: None,
        };
        let evaluator = ExpressionEvaluator::new(false);

        let criteria = Criteria {
            require_all: vec!["team == \"dev\"".to_string()],
            require_any: vec!["gpu == \"yes\"".to_string(), "gpu == \"maybe\"".to_string()],
            require_none: vec!["team == \"ops\"".to_string()],
        };
        assert!(criteria.is_match(&evaluator, &data).expect("eval"));

        let blocked = Criteria {
            require_none: vec!["team == \"dev\"".to_string()],
            ..Criteria::default()
        };
        assert!(!blocked.is_match(&evaluator, &data).expect("eval"));

        let unmatched_any = Criteria {
            require_any: vec!["gpu == \"no\"".to_string()],
            ..Criteria::default()
        };
        assert!(!unmatched_any.is_match(&evaluator, &data).expect("eval"));
    }
}
