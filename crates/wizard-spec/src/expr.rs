use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{Record, is_absent};

/// Lightweight expression AST used for `visible_if`, rule guards and reset
/// conditions. Field references are plain field ids of the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    LiteralBool { value: bool },
    Eq { field: String, value: Value },
    Ne { field: String, value: Value },
    /// The field's value is one of `values`.
    In { field: String, values: Vec<Value> },
    /// A multi-select field contains `value`.
    Includes { field: String, value: Value },
    IsSet { field: String },
    And { expressions: Vec<Expr> },
    Or { expressions: Vec<Expr> },
    Not { expression: Box<Expr> },
    Var { field: String },
}

impl Expr {
    fn get_value<'a>(record: &'a Record, field: &str) -> Option<&'a Value> {
        record.get(field).filter(|value| !value.is_null())
    }

    /// Evaluates the expression to a boolean if possible.
    ///
    /// Comparisons against a missing field are undecidable and yield `None`.
    pub fn evaluate(&self, record: &Record) -> Option<bool> {
        match self {
            Expr::LiteralBool { value } => Some(*value),
            Expr::Eq { field, value } => Self::get_value(record, field).map(|v| v == value),
            Expr::Ne { field, value } => Self::get_value(record, field).map(|v| v != value),
            Expr::In { field, values } => {
                Self::get_value(record, field).map(|v| values.contains(v))
            }
            Expr::Includes { field, value } => Self::get_value(record, field)
                .and_then(Value::as_array)
                .map(|items| items.contains(value)),
            Expr::IsSet { field } => Some(!is_absent(record.get(field))),
            Expr::And { expressions } => {
                for expr in expressions {
                    match expr.evaluate(record) {
                        Some(true) => continue,
                        Some(false) => return Some(false),
                        None => return None,
                    }
                }
                Some(true)
            }
            Expr::Or { expressions } => {
                let mut undecided = false;
                for expr in expressions {
                    match expr.evaluate(record) {
                        Some(true) => return Some(true),
                        Some(false) => {}
                        None => undecided = true,
                    }
                }
                if undecided { None } else { Some(false) }
            }
            Expr::Not { expression } => expression.evaluate(record).map(|value| !value),
            Expr::Var { field } => Self::get_value(record, field).and_then(Value::as_bool),
        }
    }

    /// Every field id the expression reads.
    pub fn reads(&self) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        self.collect_reads(&mut fields);
        fields
    }

    fn collect_reads(&self, fields: &mut BTreeSet<String>) {
        match self {
            Expr::LiteralBool { .. } => {}
            Expr::Eq { field, .. }
            | Expr::Ne { field, .. }
            | Expr::In { field, .. }
            | Expr::Includes { field, .. }
            | Expr::IsSet { field }
            | Expr::Var { field } => {
                fields.insert(field.clone());
            }
            Expr::And { expressions } | Expr::Or { expressions } => {
                for expr in expressions {
                    expr.collect_reads(fields);
                }
            }
            Expr::Not { expression } => expression.collect_reads(fields),
        }
    }
}
