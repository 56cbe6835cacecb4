use serde_json::{Map, Value, json};

use crate::{answers_schema, navigation::Wizard, spec::field::FieldType};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The current step needs input.
    NeedInput,
    /// The last advance was blocked by validation errors.
    Invalid,
    /// The terminal step was reached.
    Complete,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::NeedInput => "need_input",
            StepStatus::Invalid => "invalid",
            StepStatus::Complete => "complete",
        }
    }
}

/// Describes a single field of the current step.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: FieldType,
    pub required: bool,
    pub visible: bool,
    pub current_value: Option<Value>,
    pub choices: Option<Vec<String>>,
    pub error: Option<String>,
}

/// Everything a presentation layer needs to draw the current step.
#[derive(Debug, Clone)]
pub struct StepView {
    pub form_id: String,
    pub form_title: String,
    pub status: StepStatus,
    pub step: usize,
    pub content_steps: usize,
    pub label: Option<String>,
    pub message: Option<String>,
    pub fields: Vec<RenderField>,
    pub schema: Value,
}

impl StepView {
    pub fn visible(&self) -> impl Iterator<Item = &RenderField> {
        self.fields.iter().filter(|field| field.visible)
    }
}

/// Builds the view of the wizard's current step.
pub fn build_step_view(wizard: &Wizard) -> StepView {
    let visible = wizard.visible_fields();
    let step = wizard.current_step();

    let fields = wizard
        .steps()
        .fields(step)
        .iter()
        .filter_map(|id| wizard.schema().field(id))
        .map(|field| RenderField {
            id: field.id.clone(),
            title: field.title.clone(),
            description: field.description.clone(),
            kind: field.kind,
            required: wizard.is_required(&field.id),
            visible: visible.contains(&field.id),
            current_value: wizard
                .values()
                .get(&field.id)
                .filter(|value| !value.is_null())
                .cloned(),
            choices: field.choices.clone(),
            error: wizard
                .errors()
                .get(&field.id)
                .map(|error| error.message.clone()),
        })
        .collect();

    let status = if wizard.is_terminal() {
        StepStatus::Complete
    } else if wizard.errors().is_empty() {
        StepStatus::NeedInput
    } else {
        StepStatus::Invalid
    };

    StepView {
        form_id: wizard.form_id().to_string(),
        form_title: wizard.form_title().to_string(),
        status,
        step,
        content_steps: wizard.steps().content_steps(),
        label: wizard.step_label().map(String::from),
        message: if wizard.is_terminal() {
            wizard.completion_message().map(String::from)
        } else {
            None
        },
        fields,
        schema: answers_schema::generate(wizard.schema(), &visible),
    }
}

/// Render the view as a structured JSON-friendly value.
pub fn render_json_ui(view: &StepView) -> Value {
    let fields = view
        .fields
        .iter()
        .map(|field| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(field.id.clone()));
            map.insert("title".into(), Value::String(field.title.clone()));
            map.insert(
                "description".into(),
                field
                    .description
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
            map.insert("type".into(), Value::String(field.kind.as_str().to_string()));
            map.insert("required".into(), Value::Bool(field.required));
            map.insert("visible".into(), Value::Bool(field.visible));
            if let Some(current_value) = &field.current_value {
                map.insert("current_value".into(), current_value.clone());
            }
            if let Some(choices) = &field.choices {
                map.insert("choices".into(), json!(choices));
            }
            if let Some(error) = &field.error {
                map.insert("error".into(), Value::String(error.clone()));
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "form_id": view.form_id,
        "form_title": view.form_title,
        "status": view.status.as_str(),
        "step": view.step,
        "content_steps": view.content_steps,
        "label": view.label,
        "message": view.message,
        "fields": fields,
        "schema": view.schema,
    })
}

/// Render the view as human-friendly text.
pub fn render_text(view: &StepView) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {} ({})", view.form_title, view.form_id));

    if view.status == StepStatus::Complete {
        lines.push(view.label.clone().unwrap_or_else(|| "Complete".to_string()));
        if let Some(message) = &view.message {
            lines.push(message.clone());
        }
        return lines.join("\n");
    }

    let mut heading = format!("Step {}/{}", view.step, view.content_steps);
    if let Some(label) = &view.label {
        heading.push_str(&format!(": {}", label));
    }
    lines.push(heading);
    lines.push(format!("Status: {}", view.status.as_str()));

    lines.push("Visible fields:".to_string());
    for field in view.visible() {
        let mut entry = format!(" - {} ({})", field.id, field.title);
        if field.required {
            entry.push_str(" [required]");
        }
        if let Some(current_value) = &field.current_value {
            entry.push_str(&format!(" = {}", value_to_display(current_value)));
        }
        lines.push(entry);
        if let Some(error) = &field.error {
            lines.push(format!("   ! {}", error));
        }
    }

    lines.join("\n")
}

pub fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_display)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
