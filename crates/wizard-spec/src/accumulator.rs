use serde_json::Value;

use crate::record::Record;

/// Cumulative record of every value validated on a passed step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    record: Record,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.record.get(field)
    }

    /// Writes every field in `owned` from `values`. Owned fields without a
    /// value are stored as `null` so a passed step always leaves its keys
    /// behind; keys outside `owned` are untouched.
    pub fn merge_step(&mut self, owned: &[String], values: &Record) {
        for field in owned {
            let value = values.get(field).cloned().unwrap_or(Value::Null);
            self.record.insert(field.clone(), value);
        }
    }

    /// Nulls `field` if it was recorded. Returns whether a value was dropped.
    pub fn clear(&mut self, field: &str) -> bool {
        match self.record.get_mut(field) {
            Some(value) if !value.is_null() => {
                *value = Value::Null;
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.record.clear();
    }

    pub fn into_record(self) -> Record {
        self.record
    }
}
