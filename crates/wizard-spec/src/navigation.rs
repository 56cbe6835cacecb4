use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::accumulator::Accumulator;
use crate::error::{SpecError, UsageError};
use crate::record::{Record, is_absent, live_record};
use crate::reset::ResetPolicy;
use crate::spec::form::{CompletionSpec, FormSpec};
use crate::spec::step::StepTable;
use crate::submission::Submission;
use crate::validate::{FieldError, Schema};
use crate::visibility::{VisibilityMode, resolve_visibility};

/// Result of a call to [`Wizard::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    /// The step passed and the wizard moved to `step`.
    Advanced { step: usize },
    /// The last content step passed; `record` is the final accumulated record.
    Completed { record: Record },
    /// Validation failed; nothing was merged and the step did not change.
    Blocked { errors: BTreeMap<String, FieldError> },
}

impl AdvanceOutcome {
    pub fn is_blocked(&self) -> bool {
        matches!(self, AdvanceOutcome::Blocked { .. })
    }

    /// Field id to message for a blocked advance, empty otherwise.
    pub fn messages(&self) -> BTreeMap<String, String> {
        match self {
            AdvanceOutcome::Blocked { errors } => errors
                .iter()
                .map(|(field, error)| (field.clone(), error.message.clone()))
                .collect(),
            _ => BTreeMap::new(),
        }
    }
}

/// Per-step navigation bookkeeping.
#[derive(Debug, Clone)]
struct NavigationState {
    current: usize,
    touched: BTreeSet<String>,
    errors: BTreeMap<String, FieldError>,
}

impl NavigationState {
    fn start() -> Self {
        Self {
            current: 1,
            touched: BTreeSet::new(),
            errors: BTreeMap::new(),
        }
    }

    fn enter(&mut self, step: usize) {
        self.current = step;
        self.touched.clear();
        self.errors.clear();
    }
}

/// Navigation controller of a multi-step form.
///
/// Owns the compiled schema, the step table, the reset policy, the
/// accumulated record and the in-progress values the user is editing. All
/// operations run to completion; hosts sharing a wizard across threads must
/// serialize access themselves.
#[derive(Debug)]
pub struct Wizard {
    form_id: String,
    form_title: String,
    form_version: String,
    completion: Option<CompletionSpec>,
    schema: Schema,
    steps: StepTable,
    resets: ResetPolicy,
    accumulator: Accumulator,
    in_progress: Record,
    state: NavigationState,
}

impl Wizard {
    pub fn new(spec: FormSpec) -> Result<Self, SpecError> {
        let schema = Schema::new(&spec)?;
        let steps = StepTable::new(&spec)?;
        let resets = ResetPolicy::new(&spec)?;
        check_rule_ordering(&schema, &steps)?;

        tracing::debug!(
            form = %spec.id,
            steps = steps.content_steps(),
            fields = spec.fields.len(),
            "wizard constructed"
        );

        Ok(Self {
            form_id: spec.id,
            form_title: spec.title,
            form_version: spec.version,
            completion: spec.completion,
            schema,
            steps,
            resets,
            accumulator: Accumulator::new(),
            in_progress: Record::new(),
            state: NavigationState::start(),
        })
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    pub fn form_title(&self) -> &str {
        &self.form_title
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn steps(&self) -> &StepTable {
        &self.steps
    }

    pub fn current_step(&self) -> usize {
        self.state.current
    }

    /// Number of steps including the terminal one.
    pub fn step_count(&self) -> usize {
        self.steps.terminal_step()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.current == self.steps.terminal_step()
    }

    pub fn step_label(&self) -> Option<&str> {
        if self.is_terminal() {
            self.completion.as_ref().and_then(|c| c.label.as_deref())
        } else {
            self.steps.label(self.state.current)
        }
    }

    pub fn completion_message(&self) -> Option<&str> {
        self.completion.as_ref().and_then(|c| c.message.as_deref())
    }

    /// Values the user has entered, including ones not yet merged.
    pub fn values(&self) -> &Record {
        &self.in_progress
    }

    pub fn accumulated(&self) -> &Record {
        self.accumulator.record()
    }

    pub fn errors(&self) -> &BTreeMap<String, FieldError> {
        &self.state.errors
    }

    pub fn touched(&self) -> &BTreeSet<String> {
        &self.state.touched
    }

    /// Accumulated record overlaid by every in-progress value. Fields of the
    /// current step without an in-progress value count as absent.
    pub fn live_view(&self) -> Record {
        live_record(
            self.accumulator.record(),
            &self.in_progress,
            self.steps.fields(self.state.current),
        )
    }

    /// Fields of the current step whose in-progress value differs from the
    /// accumulated one.
    pub fn dirty_fields(&self) -> Vec<String> {
        self.steps
            .fields(self.state.current)
            .iter()
            .filter(|field| {
                let live = self.in_progress.get(field.as_str());
                let saved = self.accumulator.get(field);
                !(is_absent(live) && is_absent(saved)) && live != saved
            })
            .cloned()
            .collect()
    }

    /// Fields of the current step that pass their `visible_if` predicate, in
    /// step order. Undecidable predicates hide the field.
    pub fn visible_fields(&self) -> Vec<String> {
        let owned = self.steps.fields(self.state.current);
        let visibility = resolve_visibility(
            &self.schema,
            owned,
            &self.candidate(),
            VisibilityMode::Hidden,
        );
        owned
            .iter()
            .filter(|field| visibility.get(*field).copied().unwrap_or(false))
            .cloned()
            .collect()
    }

    /// Whether `field` must be provided given the current values, counting
    /// `required_when` rules that hold.
    pub fn is_required(&self, field: &str) -> bool {
        self.schema.is_required(field, &self.candidate())
    }

    pub fn set_value(&mut self, field: &str, value: Value) -> Result<(), UsageError> {
        self.ensure_editable(field)?;
        self.in_progress.insert(field.to_string(), value);
        self.after_edit(field);
        Ok(())
    }

    pub fn clear_value(&mut self, field: &str) -> Result<(), UsageError> {
        self.ensure_editable(field)?;
        self.in_progress.remove(field);
        self.after_edit(field);
        Ok(())
    }

    /// Marks `field` as touched and validates it on its own.
    pub fn touch(&mut self, field: &str) -> Result<Option<FieldError>, UsageError> {
        self.ensure_editable(field)?;
        self.state.touched.insert(field.to_string());
        Ok(self.revalidate(field))
    }

    /// Validates the current step and, when it passes, merges its values and
    /// moves forward.
    pub fn advance(&mut self) -> Result<AdvanceOutcome, UsageError> {
        if self.is_terminal() {
            return Err(UsageError::AdvanceFromTerminal);
        }

        let step = self.state.current;
        let visible = self.visible_fields();
        let scope: BTreeSet<String> = visible.iter().cloned().collect();
        let result = self.schema.validate(&self.candidate(), &scope);

        if !result.valid {
            tracing::debug!(step, errors = ?result.messages(), "advance blocked");
            self.state.errors = result.errors.clone();
            return Ok(AdvanceOutcome::Blocked {
                errors: result.errors,
            });
        }

        let validated: Record = visible
            .iter()
            .filter_map(|field| {
                self.in_progress
                    .get(field)
                    .map(|value| (field.clone(), value.clone()))
            })
            .collect();
        self.accumulator
            .merge_step(self.steps.fields(step), &validated);
        self.apply_resets();

        self.state.enter(step + 1);
        tracing::debug!(from = step, to = step + 1, "advanced");

        if self.is_terminal() {
            Ok(AdvanceOutcome::Completed {
                record: self.accumulator.record().clone(),
            })
        } else {
            Ok(AdvanceOutcome::Advanced { step: step + 1 })
        }
    }

    /// Steps back without validating; values are kept. Step 1 is the floor.
    pub fn back(&mut self) {
        if self.state.current > 1 {
            let from = self.state.current;
            self.state.enter(from - 1);
            tracing::debug!(from, to = from - 1, "stepped back");
        }
    }

    /// Starts a fresh session. Only valid from the terminal step.
    pub fn restart(&mut self) -> Result<(), UsageError> {
        if !self.is_terminal() {
            return Err(UsageError::RestartBeforeTerminal {
                step: self.state.current,
            });
        }
        self.accumulator.reset();
        self.in_progress.clear();
        self.state = NavigationState::start();
        tracing::debug!(form = %self.form_id, "restarted");
        Ok(())
    }

    /// Final record packaged for a submission sink.
    pub fn submission(&self) -> Result<Submission, UsageError> {
        if !self.is_terminal() {
            return Err(UsageError::NotComplete {
                step: self.state.current,
            });
        }
        Ok(Submission {
            form_id: self.form_id.clone(),
            form_version: self.form_version.clone(),
            answers: self.accumulator.record().clone(),
        })
    }

    /// Accumulated record overlaid by the in-progress values of the current
    /// step only.
    fn candidate(&self) -> Record {
        let mut candidate = self.accumulator.record().clone();
        for field in self.steps.fields(self.state.current) {
            match self.in_progress.get(field) {
                Some(value) => candidate.insert(field.clone(), value.clone()),
                None => candidate.remove(field),
            };
        }
        candidate
    }

    fn ensure_editable(&self, field: &str) -> Result<(), UsageError> {
        if self.is_terminal() {
            return Err(UsageError::EditAtTerminal);
        }
        match self.steps.owner_of(field) {
            None => Err(UsageError::UnknownField(field.to_string())),
            Some(owner) if owner != self.state.current => Err(UsageError::FieldNotOnStep {
                field: field.to_string(),
                step: self.state.current,
            }),
            Some(_) => Ok(()),
        }
    }

    fn after_edit(&mut self, field: &str) {
        self.state.touched.insert(field.to_string());
        self.apply_resets();
        if self.state.errors.contains_key(field) {
            self.revalidate(field);
        }
    }

    fn revalidate(&mut self, field: &str) -> Option<FieldError> {
        if !self.visible_fields().iter().any(|visible| visible == field) {
            self.state.errors.remove(field);
            return None;
        }
        let scope = BTreeSet::from([field.to_string()]);
        let mut result = self.schema.validate(&self.candidate(), &scope);
        match result.errors.remove(field) {
            Some(error) => {
                self.state.errors.insert(field.to_string(), error.clone());
                Some(error)
            }
            None => {
                self.state.errors.remove(field);
                None
            }
        }
    }

    fn apply_resets(&mut self) {
        let cleared = self
            .resets
            .apply(
                &mut self.in_progress,
                &mut self.accumulator,
                self.steps.fields(self.state.current),
            );
        for field in &cleared {
            self.state.errors.remove(field);
        }
        if !cleared.is_empty() {
            tracing::debug!(?cleared, "reset policy cleared dependent fields");
        }
    }
}

/// A rule must not read a field owned by a later step than its earliest
/// target, otherwise it would depend on data the user has not reached yet.
fn check_rule_ordering(schema: &Schema, steps: &StepTable) -> Result<(), SpecError> {
    for rule in schema.rules() {
        let Some(target_step) = rule
            .targets()
            .iter()
            .filter_map(|target| steps.owner_of(target))
            .min()
        else {
            continue;
        };
        for field in rule.reads() {
            if let Some(read_step) = steps.owner_of(&field)
                && read_step > target_step
            {
                return Err(SpecError::RuleReadsLaterStep {
                    rule: rule.id.clone(),
                    field,
                    read_step,
                    target_step,
                });
            }
        }
    }
    Ok(())
}
