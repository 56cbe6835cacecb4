use std::fmt;

use handlebars::{Handlebars, no_escape};
use serde_json::{Map, Value};

use crate::error::SpecError;
use crate::spec::field::{FieldMessages, FieldSpec};
use crate::spec::form::FormSpec;
use crate::validate::ErrorCode;

const BASE_CODES: [ErrorCode; 11] = [
    ErrorCode::Required,
    ErrorCode::TypeMismatch,
    ErrorCode::Email,
    ErrorCode::Choice,
    ErrorCode::Pattern,
    ErrorCode::MinLen,
    ErrorCode::MaxLen,
    ErrorCode::Min,
    ErrorCode::Max,
    ErrorCode::MinItems,
    ErrorCode::MaxItems,
];

fn default_template(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::Required => "{{title}} is required",
        ErrorCode::TypeMismatch => "{{title}} has an unexpected type",
        ErrorCode::Email => "{{title}} must be a valid email address",
        ErrorCode::Choice => "{{title}} must be one of the listed options",
        ErrorCode::Pattern => "{{title}} has an invalid format",
        ErrorCode::MinLen => "{{title}} must be at least {{min_len}} characters long",
        ErrorCode::MaxLen => "{{title}} must be at most {{max_len}} characters long",
        ErrorCode::Min => "{{title}} must be at least {{min}}",
        ErrorCode::Max => "{{title}} must be at most {{max}}",
        ErrorCode::MinItems => "Select at least {{min_items}} option(s) for {{title}}",
        ErrorCode::MaxItems => "Select at most {{max_items}} option(s) for {{title}}",
        ErrorCode::Rule => "{{title}} is invalid",
    }
}

fn override_for(messages: &FieldMessages, code: ErrorCode) -> Option<&String> {
    match code {
        ErrorCode::Required => messages.required.as_ref(),
        ErrorCode::TypeMismatch => messages.type_mismatch.as_ref(),
        ErrorCode::Email => messages.email.as_ref(),
        ErrorCode::Choice => messages.choice.as_ref(),
        ErrorCode::Pattern => messages.pattern.as_ref(),
        ErrorCode::MinLen => messages.min_len.as_ref(),
        ErrorCode::MaxLen => messages.max_len.as_ref(),
        ErrorCode::Min => messages.min.as_ref(),
        ErrorCode::Max => messages.max.as_ref(),
        ErrorCode::MinItems => messages.min_items.as_ref(),
        ErrorCode::MaxItems => messages.max_items.as_ref(),
        ErrorCode::Rule => None,
    }
}

fn default_name(code: ErrorCode) -> String {
    format!("default.{}", code.as_str())
}

fn field_name(field: &str, code: ErrorCode) -> String {
    format!("field.{}.{}", field, code.as_str())
}

fn rule_name(rule: &str) -> String {
    format!("rule.{}", rule)
}

/// Compiled message templates for every field and rule of a form.
pub(crate) struct MessageCatalog {
    registry: Handlebars<'static>,
}

impl fmt::Debug for MessageCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageCatalog").finish_non_exhaustive()
    }
}

impl MessageCatalog {
    pub(crate) fn new(spec: &FormSpec) -> Result<Self, SpecError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(no_escape);

        for code in BASE_CODES {
            register(&mut registry, default_name(code), default_template(code))?;
        }
        for field in &spec.fields {
            let Some(messages) = &field.messages else {
                continue;
            };
            for code in BASE_CODES {
                if let Some(template) = override_for(messages, code) {
                    register(&mut registry, field_name(&field.id, code), template)?;
                }
            }
        }
        for rule in &spec.rules {
            register(&mut registry, rule_name(&rule.id), &rule.message)?;
        }

        Ok(Self { registry })
    }

    /// Message for a base-constraint failure of `field`.
    pub(crate) fn field_message(&self, field: &FieldSpec, code: ErrorCode, params: Value) -> String {
        let specific = field_name(&field.id, code);
        let name = if self.registry.has_template(&specific) {
            specific
        } else {
            default_name(code)
        };
        self.render(&name, field, params)
    }

    /// Message for a cross-field rule failure reported against `field`.
    pub(crate) fn rule_message(&self, rule: &str, field: &FieldSpec) -> String {
        self.render(&rule_name(rule), field, Value::Null)
    }

    fn render(&self, name: &str, field: &FieldSpec, params: Value) -> String {
        let mut data = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        data.insert("title".into(), Value::String(field.title.clone()));
        data.insert("field".into(), Value::String(field.id.clone()));

        match self.registry.render(name, &data) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(template = name, error = %err, "message template failed to render");
                format!("{} is invalid", field.title)
            }
        }
    }
}

fn register(
    registry: &mut Handlebars<'static>,
    name: String,
    template: &str,
) -> Result<(), SpecError> {
    registry
        .register_template_string(&name, template)
        .map_err(|source| SpecError::Template {
            name,
            source: Box::new(source),
        })
}
