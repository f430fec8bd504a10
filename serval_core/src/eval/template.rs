//! String template rendering backed by `handlebars`.

use handlebars::Handlebars;
use serde_json::Value;

use super::data::EvalData;
use super::EvalError;

/// Renders string templates and template trees against the contextual
/// data bag. Strict mode makes a reference to a missing value a render
/// error instead of an empty string.
pub struct TemplateEvaluator {
    registry: Handlebars<'static>,
}

impl TemplateEvaluator {
    pub fn new(strict: bool) -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(strict);
        // rendered values are parameters and keys, not HTML
        registry.register_escape_fn(handlebars::no_escape);
        Self { registry }
    }

    /// Render one template to a string.
    pub fn eval_text(&self, template: &str, data: &EvalData<'_>) -> Result<String, EvalError> {
        self.registry
            .render_template(template, &data.to_json())
            .map_err(|e| EvalError::new(template, e))
    }

    /// Render a parameter tree: every string leaf is treated as a
    /// template; other leaves pass through unchanged.
    pub fn eval_params(&self, params: &Value, data: &EvalData<'_>) -> Result<Value, EvalError> {
        let bag = data.to_json();
        self.render_value(params, &bag)
    }

    fn render_value(&self, value: &Value, bag: &Value) -> Result<Value, EvalError> {
        match value {
            Value::String(template) => {
                let rendered = self
                    .registry
                    .render_template(template, bag)
                    .map_err(|e| EvalError::new(template, e))?;
                Ok(Value::String(rendered))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.render_value(item, bag))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut rendered = serde_json::Map::new();
                for (key, item) in map {
                    rendered.insert(key.clone(), self.render_value(item, bag)?);
                }
                Ok(Value::Object(rendered))
            }
            other => Ok(other.clone()),
        }
    }
}
