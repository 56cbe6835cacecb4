use crate::record::Record;
use crate::validate::Schema;

pub type VisibilityMap = std::collections::BTreeMap<String, bool>;

/// How to treat a `visible_if` predicate that cannot be decided yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityMode {
    Visible,
    Hidden,
}

pub fn resolve_visibility(
    schema: &Schema,
    fields: &[String],
    record: &Record,
    mode: VisibilityMode,
) -> VisibilityMap {
    let mut map = VisibilityMap::new();

    for id in fields {
        let Some(field) = schema.field(id) else {
            continue;
        };
        let visible = if let Some(expr) = &field.visible_if {
            match expr.evaluate(record) {
                Some(val) => val,
                None => mode == VisibilityMode::Visible,
            }
        } else {
            true
        };
        map.insert(id.clone(), visible);
    }

    map
}
