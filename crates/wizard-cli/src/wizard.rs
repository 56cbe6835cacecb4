use std::collections::BTreeMap;
use std::fmt::Write;

use serde_json::{Number, Value};
use wizard_spec::{
    FieldType, Record, RenderField, StepView, Submission, Timezone, render_text,
    render::value_to_display,
};

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: step headings and prompts only.
    Clean,
    /// Verbose output: status, visible fields, error details.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints step headings, prompts and outcomes for the interactive shell.
pub struct WizardPresenter {
    verbosity: Verbosity,
    header_printed: bool,
    show_answers_json: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity, show_answers_json: bool) -> Self {
        Self {
            verbosity,
            header_printed: false,
            show_answers_json,
        }
    }

    pub fn show_step(&mut self, view: &StepView) {
        if self.verbosity.is_verbose() {
            println!("{}", render_text(view));
            return;
        }
        if !self.header_printed {
            println!("Form: {}", view.form_title);
            self.header_printed = true;
        }
        let mut heading = format!("Step {}/{}", view.step, view.content_steps);
        if let Some(label) = &view.label {
            heading.push_str(": ");
            heading.push_str(label);
        }
        println!("{}", heading);
        if view.visible().next().is_none() {
            println!("No visible fields on this step; press enter to continue.");
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = prompt.title.clone();
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        if let Some(current) = &prompt.current {
            line.push_str(&format!(" [{}]", current));
        }
        println!("{}", line);
        if let Some(description) = &prompt.description {
            println!("{}", description);
        }
        if !prompt.suggestions.is_empty() {
            println!("Suggestions: {}", prompt.suggestions.join(", "));
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if self.verbosity.is_verbose()
            && let Some(debug) = &error.debug_message
        {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_field_error(&self, message: &str) {
        eprintln!("  ! {}", message);
    }

    pub fn show_blocked(&self, messages: &BTreeMap<String, String>) {
        eprintln!("Please fix the following before continuing:");
        for (field, message) in messages {
            eprintln!(" - {}: {}", field, message);
        }
    }

    pub fn show_answers(&self, record: &Record) {
        if !self.show_answers_json {
            return;
        }
        match serde_json::to_string_pretty(record) {
            Ok(pretty) => println!("{}", pretty),
            Err(err) => eprintln!("Failed to serialize answers to JSON: {}", err),
        }
    }

    pub fn show_completion(&self, view: &StepView, submission: &Submission) {
        println!("{}", view.label.as_deref().unwrap_or("Done"));
        if let Some(message) = &view.message {
            println!("{}", message);
        }
        if self.verbosity.is_verbose() {
            match submission.to_cbor() {
                Ok(bytes) => println!("Answers (CBOR hex): {}", encode_hex(&bytes)),
                Err(err) => eprintln!("Failed to serialize answers to CBOR: {}", err),
            }
        }
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub title: String,
    pub description: Option<String>,
    pub required: bool,
    pub hint: Option<String>,
    pub current: Option<String>,
    pub suggestions: Vec<String>,
}

impl PromptContext {
    pub fn new(field: &RenderField) -> Self {
        let choices = field.choices.clone().unwrap_or_default();
        Self {
            title: field.title.clone(),
            description: field.description.clone(),
            required: field.required,
            hint: hint(field.kind, &choices),
            current: field.current_value.as_ref().map(value_to_display),
            suggestions: Vec::new(),
        }
    }

    pub fn with_timezones(mut self, options: &[Timezone]) -> Self {
        self.suggestions = options
            .iter()
            .map(|zone| format!("{} (UTC{})", zone.name, zone.utc_offset))
            .collect();
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }
}

fn hint(kind: FieldType, choices: &[String]) -> Option<String> {
    match kind {
        FieldType::Boolean => Some("(yes/no, y/n, true/false)".to_string()),
        FieldType::Integer => Some("(whole number)".to_string()),
        FieldType::Email => Some("(email)".to_string()),
        FieldType::Enum if !choices.is_empty() => Some(format!("({})", choices.join("/"))),
        FieldType::MultiSelect if !choices.is_empty() => {
            Some(format!("(comma separated: {})", choices.join(", ")))
        }
        _ => None,
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

/// Turns a typed line into a value for a field of `kind`. Blank input is
/// handled by the caller.
pub fn parse_answer(
    kind: FieldType,
    choices: Option<&[String]>,
    raw: &str,
) -> Result<Value, AnswerParseError> {
    let raw = raw.trim();
    match kind {
        FieldType::Text | FieldType::Email => Ok(Value::String(raw.to_string())),
        FieldType::Boolean => parse_boolean(raw),
        FieldType::Integer => parse_integer(raw),
        FieldType::Enum => parse_choice(choices.unwrap_or_default(), raw).map(Value::String),
        FieldType::MultiSelect => raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| parse_choice(choices.unwrap_or_default(), item).map(Value::String))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
    }
}

fn parse_boolean(raw: &str) -> Result<Value, AnswerParseError> {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
        "false" | "f" | "no" | "n" | "0" => Ok(Value::Bool(false)),
        _ => Err(AnswerParseError::new(
            "Please enter yes or no.",
            Some("expected boolean (y/n/true/false)".to_string()),
        )),
    }
}

fn parse_integer(raw: &str) -> Result<Value, AnswerParseError> {
    raw.parse::<i64>()
        .map(Number::from)
        .map(Value::Number)
        .map_err(|_| {
            AnswerParseError::new(
                "Please enter a whole number.",
                Some("expected integer".to_string()),
            )
        })
}

fn parse_choice(choices: &[String], raw: &str) -> Result<String, AnswerParseError> {
    choices
        .iter()
        .find(|choice| choice.eq_ignore_ascii_case(raw))
        .cloned()
        .ok_or_else(|| {
            AnswerParseError::new(
                format!("Choose one of: {}.", choices.join(", ")),
                Some(format!("'{}' is not an allowed value", raw)),
            )
        })
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut encoded, "{:02x}", byte);
    }
    encoded
}
