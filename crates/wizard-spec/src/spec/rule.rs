use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::record::{Record, is_absent};

/// Shape of a cross-field check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// Every target must be present while `when` holds.
    RequiredWhen { when: Expr, targets: Vec<String> },
    /// Every target must be absent while `when` holds.
    AbsentWhen { when: Expr, targets: Vec<String> },
    /// `target` must hold the same value as `other`. Passes when both are
    /// absent.
    Matches { target: String, other: String },
    /// At least one target must be present; reported against all of them.
    AtLeastOne { targets: Vec<String> },
}

/// Validation rule evaluated over the whole candidate record after base
/// constraints pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CrossFieldRule {
    pub id: String,
    pub check: RuleKind,
    /// Handlebars template; `title` and `field` refer to the failing target.
    pub message: String,
}

impl CrossFieldRule {
    /// Fields the rule inspects besides its own targets.
    pub fn reads(&self) -> BTreeSet<String> {
        match &self.check {
            RuleKind::RequiredWhen { when, .. } | RuleKind::AbsentWhen { when, .. } => {
                when.reads()
            }
            RuleKind::Matches { other, .. } => BTreeSet::from([other.clone()]),
            RuleKind::AtLeastOne { .. } => BTreeSet::new(),
        }
    }

    /// Fields the rule may report issues against.
    pub fn targets(&self) -> Vec<&str> {
        match &self.check {
            RuleKind::RequiredWhen { targets, .. }
            | RuleKind::AbsentWhen { targets, .. }
            | RuleKind::AtLeastOne { targets } => targets.iter().map(String::as_str).collect(),
            RuleKind::Matches { target, .. } => vec![target.as_str()],
        }
    }

    /// Targets that violate the rule for `record`.
    pub fn failing_targets(&self, record: &Record) -> Vec<&str> {
        match &self.check {
            RuleKind::RequiredWhen { when, targets } => {
                if when.evaluate(record) != Some(true) {
                    return Vec::new();
                }
                targets
                    .iter()
                    .filter(|target| is_absent(record.get(target.as_str())))
                    .map(String::as_str)
                    .collect()
            }
            RuleKind::AbsentWhen { when, targets } => {
                if when.evaluate(record) != Some(true) {
                    return Vec::new();
                }
                targets
                    .iter()
                    .filter(|target| !is_absent(record.get(target.as_str())))
                    .map(String::as_str)
                    .collect()
            }
            RuleKind::Matches { target, other } => {
                let (left, right) = (record.get(target), record.get(other));
                let both_absent = is_absent(left) && is_absent(right);
                if both_absent || (!is_absent(left) && left == right) {
                    Vec::new()
                } else {
                    vec![target.as_str()]
                }
            }
            RuleKind::AtLeastOne { targets } => {
                if targets
                    .iter()
                    .any(|target| !is_absent(record.get(target.as_str())))
                {
                    Vec::new()
                } else {
                    targets.iter().map(String::as_str).collect()
                }
            }
        }
    }
}

/// Clears `dependents` whenever `condition` stops holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResetRule {
    pub triggers: Vec<String>,
    pub dependents: Vec<String>,
    pub condition: Expr,
}
