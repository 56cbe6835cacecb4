use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::SpecError;
use crate::message::MessageCatalog;
use crate::record::{Record, is_absent};
use crate::spec::field::{Constraint, FieldSpec, FieldType};
use crate::spec::form::FormSpec;
use crate::spec::rule::{CrossFieldRule, RuleKind};

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

/// Machine-readable reason attached to every field error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Required,
    TypeMismatch,
    Email,
    Choice,
    Pattern,
    MinLen,
    MaxLen,
    Min,
    Max,
    MinItems,
    MaxItems,
    /// Raised by a cross-field rule.
    Rule,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Required => "required",
            ErrorCode::TypeMismatch => "type_mismatch",
            ErrorCode::Email => "email",
            ErrorCode::Choice => "choice",
            ErrorCode::Pattern => "pattern",
            ErrorCode::MinLen => "min_len",
            ErrorCode::MaxLen => "max_len",
            ErrorCode::Min => "min",
            ErrorCode::Max => "max",
            ErrorCode::MinItems => "min_items",
            ErrorCode::MaxItems => "max_items",
            ErrorCode::Rule => "rule",
        }
    }
}

/// A single field failure, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub code: ErrorCode,
    pub message: String,
    /// Id of the cross-field rule that raised the error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

/// Outcome of a scoped validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: BTreeMap<String, FieldError>,
}

impl ValidationResult {
    fn from_errors(errors: BTreeMap<String, FieldError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Field id to message, the shape presentation layers display.
    pub fn messages(&self) -> BTreeMap<String, String> {
        self.errors
            .iter()
            .map(|(field, error)| (field.clone(), error.message.clone()))
            .collect()
    }
}

/// Compiled field definitions and cross-field rules.
#[derive(Debug)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    index: BTreeMap<String, usize>,
    patterns: BTreeMap<String, Regex>,
    email: Regex,
    rules: Vec<CrossFieldRule>,
    messages: MessageCatalog,
}

impl Schema {
    pub fn new(spec: &FormSpec) -> Result<Self, SpecError> {
        let mut index = BTreeMap::new();
        let mut patterns = BTreeMap::new();

        for (position, field) in spec.fields.iter().enumerate() {
            if index.insert(field.id.clone(), position).is_some() {
                return Err(SpecError::DuplicateField(field.id.clone()));
            }
            if field.kind.has_choices()
                && field.choices.as_ref().is_none_or(|choices| choices.is_empty())
            {
                return Err(SpecError::ChoicesMissing(field.id.clone()));
            }
            if let Some(pattern) = field
                .constraint
                .as_ref()
                .and_then(|constraint| constraint.pattern.as_ref())
            {
                let regex = Regex::new(pattern).map_err(|source| SpecError::InvalidPattern {
                    field: field.id.clone(),
                    source,
                })?;
                patterns.insert(field.id.clone(), regex);
            }
        }

        let mut rule_ids = BTreeSet::new();
        for rule in &spec.rules {
            if !rule_ids.insert(rule.id.as_str()) {
                return Err(SpecError::DuplicateRule(rule.id.clone()));
            }
            let referenced = rule
                .reads()
                .into_iter()
                .chain(rule.targets().into_iter().map(String::from));
            for field in referenced {
                if !index.contains_key(&field) {
                    return Err(SpecError::UnknownRuleField {
                        rule: rule.id.clone(),
                        field,
                    });
                }
            }
        }

        let email = Regex::new(EMAIL_PATTERN).map_err(|source| SpecError::InvalidPattern {
            field: "email".into(),
            source,
        })?;

        Ok(Self {
            fields: spec.fields.clone(),
            index,
            patterns,
            email,
            rules: spec.rules.clone(),
            messages: MessageCatalog::new(spec)?,
        })
    }

    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.index.get(id).map(|position| &self.fields[*position])
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn rules(&self) -> &[CrossFieldRule] {
        &self.rules
    }

    /// Whether `id` must be provided for `candidate`: either the field itself
    /// is required or a `required_when` rule targeting it currently holds.
    pub fn is_required(&self, id: &str, candidate: &Record) -> bool {
        if self.field(id).is_some_and(|field| field.required) {
            return true;
        }
        self.rules.iter().any(|rule| match &rule.check {
            RuleKind::RequiredWhen { when, targets } => {
                targets.iter().any(|target| target.as_str() == id)
                    && when.evaluate(candidate) == Some(true)
            }
            _ => false,
        })
    }

    /// Validates `candidate`, reporting errors only for fields in `scope`.
    ///
    /// Base constraints run first; cross-field rules whose targets intersect
    /// the scope then run against the whole candidate. The first error per
    /// field wins.
    pub fn validate(&self, candidate: &Record, scope: &BTreeSet<String>) -> ValidationResult {
        let mut errors = BTreeMap::new();

        for id in scope {
            let Some(field) = self.field(id) else {
                continue;
            };
            if let Some(error) = self.check_field(field, candidate.get(id)) {
                errors.insert(id.clone(), error);
            }
        }

        for rule in &self.rules {
            if !rule.targets().iter().any(|target| scope.contains(*target)) {
                continue;
            }
            for target in rule.failing_targets(candidate) {
                if !scope.contains(target) || errors.contains_key(target) {
                    continue;
                }
                let Some(field) = self.field(target) else {
                    continue;
                };
                errors.insert(
                    target.to_string(),
                    FieldError {
                        code: ErrorCode::Rule,
                        message: self.messages.rule_message(&rule.id, field),
                        rule: Some(rule.id.clone()),
                    },
                );
            }
        }

        tracing::trace!(scope = ?scope, failures = errors.len(), "scoped validation finished");
        ValidationResult::from_errors(errors)
    }

    fn check_field(&self, field: &FieldSpec, value: Option<&Value>) -> Option<FieldError> {
        let value = match value {
            Some(value) if !is_absent(Some(value)) => value,
            _ if field.required => {
                return Some(self.error(field, ErrorCode::Required, Value::Null));
            }
            _ => return None,
        };

        if !matches_type(field.kind, value) {
            return Some(self.error(field, ErrorCode::TypeMismatch, Value::Null));
        }

        if field.kind == FieldType::Email
            && let Some(text) = value.as_str()
            && !self.email.is_match(text.trim())
        {
            return Some(self.error(field, ErrorCode::Email, Value::Null));
        }

        if let Some(choices) = &field.choices
            && !within_choices(field.kind, value, choices)
        {
            return Some(self.error(
                field,
                ErrorCode::Choice,
                json!({ "choices": choices.join(", ") }),
            ));
        }

        field
            .constraint
            .as_ref()
            .and_then(|constraint| self.enforce_constraint(field, value, constraint))
    }

    fn enforce_constraint(
        &self,
        field: &FieldSpec,
        value: &Value,
        constraint: &Constraint,
    ) -> Option<FieldError> {
        if let Some(regex) = self.patterns.get(&field.id)
            && let Some(text) = value.as_str()
            && !regex.is_match(text)
        {
            return Some(self.error(field, ErrorCode::Pattern, Value::Null));
        }

        if let Some(min_len) = constraint.min_len
            && let Some(text) = value.as_str()
            && text.chars().count() < min_len
        {
            return Some(self.error(field, ErrorCode::MinLen, json!({ "min_len": min_len })));
        }

        if let Some(max_len) = constraint.max_len
            && let Some(text) = value.as_str()
            && text.chars().count() > max_len
        {
            return Some(self.error(field, ErrorCode::MaxLen, json!({ "max_len": max_len })));
        }

        if let Some(min) = constraint.min
            && let Some(number) = value.as_f64()
            && number < min
        {
            return Some(self.error(field, ErrorCode::Min, json!({ "min": number_param(min) })));
        }

        if let Some(max) = constraint.max
            && let Some(number) = value.as_f64()
            && number > max
        {
            return Some(self.error(field, ErrorCode::Max, json!({ "max": number_param(max) })));
        }

        if let Some(min_items) = constraint.min_items
            && let Some(items) = value.as_array()
            && items.len() < min_items
        {
            return Some(self.error(
                field,
                ErrorCode::MinItems,
                json!({ "min_items": min_items }),
            ));
        }

        if let Some(max_items) = constraint.max_items
            && let Some(items) = value.as_array()
            && items.len() > max_items
        {
            return Some(self.error(
                field,
                ErrorCode::MaxItems,
                json!({ "max_items": max_items }),
            ));
        }

        None
    }

    fn error(&self, field: &FieldSpec, code: ErrorCode, params: Value) -> FieldError {
        FieldError {
            code,
            message: self.messages.field_message(field, code, params),
            rule: None,
        }
    }
}

fn matches_type(kind: FieldType, value: &Value) -> bool {
    match kind {
        FieldType::Text | FieldType::Email | FieldType::Enum => value.is_string(),
        FieldType::MultiSelect => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
        FieldType::Integer => value.is_i64() || value.is_u64(),
        FieldType::Boolean => value.is_boolean(),
    }
}

fn within_choices(kind: FieldType, value: &Value, choices: &[String]) -> bool {
    let allowed = |item: &Value| {
        item.as_str()
            .is_some_and(|text| choices.iter().any(|choice| choice == text))
    };
    match kind {
        FieldType::Enum => allowed(value),
        FieldType::MultiSelect => value
            .as_array()
            .is_some_and(|items| items.iter().all(allowed)),
        _ => true,
    }
}

/// Whole numbers render without a trailing `.0` in messages.
fn number_param(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        json!(number as i64)
    } else {
        json!(number)
    }
}
