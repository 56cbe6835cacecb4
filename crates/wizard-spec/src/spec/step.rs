use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::SpecError;
use crate::spec::form::FormSpec;

/// One content page of the wizard. Its index is its 1-based position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StepSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub fields: Vec<String>,
}

/// Resolved step ownership, checked against the form's fields.
///
/// Content steps are numbered `1..=content_steps()`; the terminal step is
/// `content_steps() + 1` and owns no fields.
#[derive(Debug, Clone)]
pub struct StepTable {
    steps: Vec<StepSpec>,
    owner: BTreeMap<String, usize>,
}

impl StepTable {
    pub fn new(spec: &FormSpec) -> Result<Self, SpecError> {
        if spec.steps.is_empty() {
            return Err(SpecError::NoSteps);
        }

        let mut owner = BTreeMap::new();
        for (index, step) in spec.steps.iter().enumerate() {
            let number = index + 1;
            for field in &step.fields {
                if spec.field(field).is_none() {
                    return Err(SpecError::UnknownStepField {
                        step: number,
                        field: field.clone(),
                    });
                }
                if let Some(first) = owner.insert(field.clone(), number) {
                    return Err(SpecError::FieldInMultipleSteps {
                        field: field.clone(),
                        first,
                        second: number,
                    });
                }
            }
        }

        if let Some(orphan) = spec.fields.iter().find(|f| !owner.contains_key(&f.id)) {
            return Err(SpecError::FieldWithoutStep(orphan.id.clone()));
        }

        Ok(Self {
            steps: spec.steps.clone(),
            owner,
        })
    }

    pub fn content_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn terminal_step(&self) -> usize {
        self.steps.len() + 1
    }

    /// Fields owned by `step`, in declaration order. Empty for the terminal step.
    pub fn fields(&self, step: usize) -> &[String] {
        step.checked_sub(1)
            .and_then(|index| self.steps.get(index))
            .map(|step| step.fields.as_slice())
            .unwrap_or(&[])
    }

    pub fn label(&self, step: usize) -> Option<&str> {
        step.checked_sub(1)
            .and_then(|index| self.steps.get(index))
            .and_then(|step| step.label.as_deref())
    }

    pub fn owner_of(&self, field: &str) -> Option<usize> {
        self.owner.get(field).copied()
    }
}
