use crate::accumulator::Accumulator;
use crate::error::SpecError;
use crate::record::{Record, live_record};
use crate::spec::form::FormSpec;
use crate::spec::rule::ResetRule;

/// Watch-and-clear rules run after every state mutation.
#[derive(Debug, Clone, Default)]
pub struct ResetPolicy {
    rules: Vec<ResetRule>,
}

impl ResetPolicy {
    pub fn new(spec: &FormSpec) -> Result<Self, SpecError> {
        for (index, rule) in spec.resets.iter().enumerate() {
            for field in rule.triggers.iter().chain(&rule.dependents) {
                if spec.field(field).is_none() {
                    return Err(SpecError::UnknownResetField {
                        index,
                        field: field.clone(),
                    });
                }
            }
            if let Some(field) = rule
                .condition
                .reads()
                .into_iter()
                .find(|field| !rule.triggers.contains(field))
            {
                return Err(SpecError::UntrackedResetInput { index, field });
            }
        }
        Ok(Self {
            rules: spec.resets.clone(),
        })
    }

    pub fn rules(&self) -> &[ResetRule] {
        &self.rules
    }

    /// Evaluates every rule over the live view (accumulated values overlaid by
    /// in-progress edits, `editing` fields without an edit counting as absent)
    /// and clears dependents of rules whose condition does not hold. Returns
    /// the fields that lost a value.
    pub fn apply(
        &self,
        in_progress: &mut Record,
        accumulator: &mut Accumulator,
        editing: &[String],
    ) -> Vec<String> {
        let mut cleared = Vec::new();
        for rule in &self.rules {
            let live = live_record(accumulator.record(), in_progress, editing);
            if rule.condition.evaluate(&live) == Some(true) {
                continue;
            }
            for dependent in &rule.dependents {
                let dropped_live = in_progress.remove(dependent).is_some_and(|v| !v.is_null());
                let dropped_acc = accumulator.clear(dependent);
                if (dropped_live || dropped_acc) && !cleared.contains(dependent) {
                    tracing::trace!(field = %dependent, triggers = ?rule.triggers, "reset dependent field");
                    cleared.push(dependent.clone());
                }
            }
        }
        cleared
    }
}
