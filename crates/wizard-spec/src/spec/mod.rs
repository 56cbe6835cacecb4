pub mod field;
pub mod form;
pub mod rule;
pub mod step;

pub use field::{Constraint, FieldMessages, FieldSpec, FieldType};
pub use form::{CompletionSpec, FormSpec};
pub use rule::{CrossFieldRule, ResetRule, RuleKind};
pub use step::{StepSpec, StepTable};
