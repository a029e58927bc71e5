//! Expression tree for composing [`Condition`] nodes.
//!
//! `Serialize` and `Deserialize` go through [`serde_json::Value`] by hand:
//! deriving them on a recursive enum nested inside settings documents blows
//! up generic monomorphization.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::condition::{Condition, Subject};

/// A boolean expression over item conditions.
///
/// JSON format:
///
/// ```json
/// { "type": "condition", "condition": { "type": "visible", "value": true } }
/// { "type": "and", "exprs": [...] }
/// { "type": "or",  "exprs": [...] }
/// { "type": "not", "expr": {...} }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Condition(Condition),
    /// All sub-expressions must match. Empty is true.
    And(Vec<Expr>),
    /// At least one sub-expression must match. Empty is false.
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Every leaf condition in the tree, depth-first.
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                Expr::Condition(cond) => out.push(cond),
                Expr::And(exprs) | Expr::Or(exprs) => stack.extend(exprs.iter().rev()),
                Expr::Not(inner) => stack.push(inner),
            }
        }
        out
    }

    /// Validate every leaf condition.
    pub fn validate(&self) -> lf_core::Result<()> {
        self.conditions().into_iter().try_for_each(Condition::validate)
    }
}

impl From<Condition> for Expr {
    fn from(cond: Condition) -> Self {
        Expr::Condition(cond)
    }
}

// ---------------------------------------------------------------------------
// Manual Serialize / Deserialize via serde_json::Value
// ---------------------------------------------------------------------------

fn expr_to_value(expr: &Expr) -> Value {
    match expr {
        Expr::Condition(cond) => json!({
            "type": "condition",
            "condition": serde_json::to_value(cond).unwrap_or(Value::Null),
        }),
        Expr::And(exprs) => json!({
            "type": "and",
            "exprs": exprs.iter().map(expr_to_value).collect::<Vec<_>>(),
        }),
        Expr::Or(exprs) => json!({
            "type": "or",
            "exprs": exprs.iter().map(expr_to_value).collect::<Vec<_>>(),
        }),
        Expr::Not(inner) => json!({
            "type": "not",
            "expr": expr_to_value(inner),
        }),
    }
}

fn children_from_value(obj: &serde_json::Map<String, Value>, tag: &str) -> Result<Vec<Expr>, String> {
    obj.get("exprs")
        .and_then(Value::as_array)
        .ok_or_else(|| format!("{tag} expr must have an \"exprs\" array"))?
        .iter()
        .map(expr_from_value)
        .collect()
}

fn expr_from_value(val: &Value) -> Result<Expr, String> {
    let obj = val.as_object().ok_or("expr must be a JSON object")?;
    let tag = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or("expr must have a \"type\" field")?;

    match tag {
        "condition" => {
            let inner = obj
                .get("condition")
                .ok_or("condition expr must have a \"condition\" field")?;
            serde_json::from_value(inner.clone())
                .map(Expr::Condition)
                .map_err(|e| format!("invalid condition: {e}"))
        }
        "and" => children_from_value(obj, tag).map(Expr::And),
        "or" => children_from_value(obj, tag).map(Expr::Or),
        "not" => {
            let inner = obj.get("expr").ok_or("not expr must have an \"expr\" field")?;
            Ok(Expr::Not(Box::new(expr_from_value(inner)?)))
        }
        other => Err(format!("unknown expr type: {other}")),
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        expr_to_value(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        expr_from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Evaluate an expression tree against an item.
pub fn evaluate(expr: &Expr, subject: &Subject<'_>) -> bool {
    match expr {
        Expr::Condition(cond) => cond.evaluate(subject),
        Expr::And(exprs) => exprs.iter().all(|e| evaluate(e, subject)),
        Expr::Or(exprs) => exprs.iter().any(|e| evaluate(e, subject)),
        Expr::Not(inner) => !evaluate(inner, subject),
    }
}
