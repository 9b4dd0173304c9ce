//! Parameter templates with placeholder substitution.
//!
//! A [`ParamTemplate`] is a parameter map whose string values may reference
//! earlier results:
//!
//! | Placeholder | Resolves to |
//! |-------------|-------------|
//! | `{{prev}}` / `{{prev.a.b}}` | payload of the previous chain link (or a field of it) |
//! | `{{seed}}` / `{{seed.x}}` | the seed input of the chain |
//! | `{{topic}}` | the session topic |
//! | `{{upstream}}` / `{{upstream.step_id}}` | findings of dependency steps |
//!
//! A string that is exactly one placeholder is replaced by the referenced JSON
//! value as-is (objects stay objects). Placeholders embedded in longer text
//! are replaced by the value's string form. Unresolvable placeholders become
//! `null` (whole-value) or the empty string (embedded).

use super::entities::Parameters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Values available to placeholders during rendering.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    pub prev: Option<Value>,
    pub seed: Option<Value>,
    pub topic: Option<String>,
    /// Findings of upstream steps keyed by step id
    pub upstream: BTreeMap<String, Value>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prev(mut self, prev: Value) -> Self {
        self.prev = Some(prev);
        self
    }

    pub fn with_seed(mut self, seed: Value) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_upstream(mut self, step_id: impl Into<String>, value: Value) -> Self {
        self.upstream.insert(step_id.into(), value);
        self
    }

    fn resolve(&self, expr: &str) -> Option<Value> {
        let mut parts = expr.split('.');
        let root = parts.next()?.trim();
        let base = match root {
            "prev" => self.prev.clone()?,
            "seed" => self.seed.clone()?,
            "topic" => Value::String(self.topic.clone()?),
            "upstream" => Value::Object(
                self.upstream
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            _ => return None,
        };
        parts.try_fold(base, |value, key| lookup(&value, key.trim()))
    }
}

fn lookup(value: &Value, key: &str) -> Option<Value> {
    match value {
        Value::Object(map) => map.get(key).cloned(),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i).cloned()),
        _ => None,
    }
}

/// Parameter map whose string values may contain placeholders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamTemplate(pub Parameters);

impl ParamTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any value references a placeholder.
    pub fn has_placeholders(&self) -> bool {
        self.0.values().any(value_has_placeholder)
    }

    /// Render every value against `ctx`.
    pub fn render(&self, ctx: &TemplateContext) -> Parameters {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), render_value(v, ctx)))
            .collect()
    }
}

impl From<Parameters> for ParamTemplate {
    fn from(params: Parameters) -> Self {
        Self(params)
    }
}

fn value_has_placeholder(value: &Value) -> bool {
    match value {
        Value::String(s) => s.contains("{{"),
        Value::Array(items) => items.iter().any(value_has_placeholder),
        Value::Object(map) => map.values().any(value_has_placeholder),
        _ => false,
    }
}

fn render_value(value: &Value, ctx: &TemplateContext) -> Value {
    match value {
        Value::String(s) => render_string(s, ctx),
        Value::Array(items) => Value::Array(items.iter().map(|v| render_value(v, ctx)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_value(v, ctx)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn render_string(s: &str, ctx: &TemplateContext) -> Value {
    let trimmed = s.trim();
    if let Some(expr) = whole_placeholder(trimmed) {
        return ctx.resolve(expr).unwrap_or(Value::Null);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let expr = &after[..end];
                if let Some(v) = ctx.resolve(expr) {
                    out.push_str(&value_to_text(&v));
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Value::String(out)
}

fn whole_placeholder(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("{{")?.strip_suffix("}}")?;
    if inner.contains("{{") || inner.contains("}}") {
        return None;
    }
    Some(inner.trim())
}

/// String form used when a value is spliced into surrounding text.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
