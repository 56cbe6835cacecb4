use serde_json::{Map, Value};

/// Field id to value. A missing key means "not provided yet".
pub type Record = Map<String, Value>;

/// Whether a value counts as not provided: missing, `null`, blank text or an
/// empty selection.
pub fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Copies every entry of `top` over `base`.
pub fn overlay(base: &Record, top: &Record) -> Record {
    let mut merged = base.clone();
    for (key, value) in top {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// `top` over `base`, with every field in `editing` that `top` lacks treated
/// as absent. Fields of the step being edited were cleared when they have no
/// in-progress value, so an older saved value must not show through.
pub fn live_record(base: &Record, top: &Record, editing: &[String]) -> Record {
    let mut live = overlay(base, top);
    for field in editing {
        if !top.contains_key(field) {
            live.remove(field);
        }
    }
    live
}
