use thiserror::Error;

/// Construction-time defects in a [`FormSpec`](crate::FormSpec).
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("form defines no steps")]
    NoSteps,
    #[error("field '{0}' is defined more than once")]
    DuplicateField(String),
    #[error("step {step} references unknown field '{field}'")]
    UnknownStepField { step: usize, field: String },
    #[error("field '{field}' belongs to step {first} and step {second}")]
    FieldInMultipleSteps {
        field: String,
        first: usize,
        second: usize,
    },
    #[error("field '{0}' is not owned by any step")]
    FieldWithoutStep(String),
    #[error("field '{0}' needs a non-empty choice list")]
    ChoicesMissing(String),
    #[error("field '{field}' has an invalid pattern")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid message template '{name}'")]
    Template {
        name: String,
        #[source]
        source: Box<handlebars::TemplateError>,
    },
    #[error("rule id '{0}' is used more than once")]
    DuplicateRule(String),
    #[error("rule '{rule}' references unknown field '{field}'")]
    UnknownRuleField { rule: String, field: String },
    #[error("rule '{rule}' reads '{field}' from step {read_step}, after its targets in step {target_step}")]
    RuleReadsLaterStep {
        rule: String,
        field: String,
        read_step: usize,
        target_step: usize,
    },
    #[error("reset rule {index} references unknown field '{field}'")]
    UnknownResetField { index: usize, field: String },
    #[error("reset rule {index} condition reads '{field}', which is not one of its triggers")]
    UntrackedResetInput { index: usize, field: String },
}

/// Caller contract violations. These never come out of well-formed user
/// interaction and point at an integration bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("cannot advance past the terminal step")]
    AdvanceFromTerminal,
    #[error("restart is only valid from the terminal step (current step {step})")]
    RestartBeforeTerminal { step: usize },
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("field '{field}' is not part of step {step}")]
    FieldNotOnStep { field: String, step: usize },
    #[error("fields cannot be edited on the terminal step")]
    EditAtTerminal,
    #[error("the wizard has not reached the terminal step (current step {step})")]
    NotComplete { step: usize },
}

/// Failure reported by a [`GeographyLookup`](crate::GeographyLookup).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("geography lookup unavailable: {0}")]
    Unavailable(String),
    #[error("unknown country '{0}'")]
    UnknownCountry(String),
}
