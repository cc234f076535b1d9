//! `filterByFormula` construction.

use serde_json::Value;

use crate::error::Failure;

/// Right-hand side of a column condition.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl TryFrom<Value> for ConditionValue {
    type Error = Failure;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(ConditionValue::Text(s)),
            Value::Number(n) => Ok(ConditionValue::Number(n)),
            Value::Bool(b) => Ok(ConditionValue::Bool(b)),
            other => Err(Failure::validation(format!(
                "Unsupported condition value: {}",
                other
            ))),
        }
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// `{field}="value"`
pub fn equals(field: &str, value: &str) -> String {
    format!("{{{}}}={}", field, quote(value))
}

/// Render one condition. Booleans test the checkbox column itself.
pub fn condition(field: &str, value: &ConditionValue) -> String {
    match value {
        ConditionValue::Text(s) => equals(field, s),
        ConditionValue::Number(n) => format!("{{{}}}={}", field, n),
        ConditionValue::Bool(true) => format!("TRUE({})", quote(field)),
        ConditionValue::Bool(false) => format!("NOT(TRUE({}))", quote(field)),
    }
}

/// `AND(a, b, ...)`, or the single clause unchanged.
pub fn all_of(clauses: Vec<String>) -> String {
    join("AND", clauses)
}

/// `OR(a, b, ...)`, or the single clause unchanged.
pub fn any_of(clauses: Vec<String>) -> String {
    join("OR", clauses)
}

fn join(op: &str, mut clauses: Vec<String>) -> String {
    match clauses.len() {
        0 => "TRUE()".to_string(),
        1 => clauses.remove(0),
        _ => format!("{}({})", op, clauses.join(", ")),
    }
}
