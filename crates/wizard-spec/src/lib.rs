#![allow(missing_docs)]

pub mod accumulator;
pub mod answers_schema;
pub mod error;
pub mod expr;
pub mod geo;
mod message;
pub mod navigation;
pub mod record;
pub mod render;
pub mod reset;
pub mod spec;
pub mod submission;
pub mod validate;
pub mod visibility;

pub use accumulator::Accumulator;
pub use answers_schema::generate as answers_schema;
pub use error::{LookupError, SpecError, UsageError};
pub use expr::Expr;
pub use geo::{Country, GeographyLookup, LookupTicket, StaticGeography, Timezone, TimezoneOptions};
pub use navigation::{AdvanceOutcome, Wizard};
pub use record::{Record, is_absent};
pub use render::{RenderField, StepStatus, StepView, build_step_view, render_json_ui, render_text};
pub use reset::ResetPolicy;
pub use spec::{
    CompletionSpec, Constraint, CrossFieldRule, FieldMessages, FieldSpec, FieldType, FormSpec,
    ResetRule, RuleKind, StepSpec, StepTable,
};
pub use submission::{Submission, SubmissionSink};
pub use validate::{ErrorCode, FieldError, Schema, ValidationResult};
pub use visibility::{VisibilityMap, VisibilityMode, resolve_visibility};
