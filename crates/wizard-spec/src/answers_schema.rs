use serde_json::{Map, Value, json};

use crate::spec::field::{FieldSpec, FieldType};
use crate::validate::Schema;

/// JSON Schema describing the answers for `fields`, typically the visible
/// fields of the current step.
pub fn generate(schema: &Schema, fields: &[String]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in fields.iter().filter_map(|id| schema.field(id)) {
        properties.insert(field.id.clone(), property(field));
        if field.required {
            required.push(Value::String(field.id.clone()));
        }
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn property(field: &FieldSpec) -> Value {
    let mut prop = Map::new();
    prop.insert("title".into(), Value::String(field.title.clone()));
    if let Some(description) = &field.description {
        prop.insert("description".into(), Value::String(description.clone()));
    }

    match field.kind {
        FieldType::Text => {
            prop.insert("type".into(), json!("string"));
        }
        FieldType::Email => {
            prop.insert("type".into(), json!("string"));
            prop.insert("format".into(), json!("email"));
        }
        FieldType::Enum => {
            prop.insert("type".into(), json!("string"));
            prop.insert("enum".into(), json!(field.choices.clone().unwrap_or_default()));
        }
        FieldType::MultiSelect => {
            prop.insert("type".into(), json!("array"));
            prop.insert("uniqueItems".into(), json!(true));
            prop.insert(
                "items".into(),
                json!({ "type": "string", "enum": field.choices.clone().unwrap_or_default() }),
            );
        }
        FieldType::Integer => {
            prop.insert("type".into(), json!("integer"));
        }
        FieldType::Boolean => {
            prop.insert("type".into(), json!("boolean"));
        }
    }

    if let Some(constraint) = &field.constraint {
        let limits = [
            ("pattern", constraint.pattern.clone().map(Value::from)),
            ("minLength", constraint.min_len.map(Value::from)),
            ("maxLength", constraint.max_len.map(Value::from)),
            ("minimum", constraint.min.map(Value::from)),
            ("maximum", constraint.max.map(Value::from)),
            ("minItems", constraint.min_items.map(Value::from)),
            ("maxItems", constraint.max_items.map(Value::from)),
        ];
        for (key, value) in limits {
            if let Some(value) = value {
                prop.insert(key.into(), value);
            }
        }
    }

    Value::Object(prop)
}
