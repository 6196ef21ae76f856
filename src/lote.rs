//! Lot/unit labels as they arrive from the contract sources.
//!
//! The unit field is a list of `{ "name": .. }` objects, the same list
//! serialized as a JSON string, or a plain string. All three collapse into a
//! single display string with any leading "Lote" dropped, since callers add
//! their own prefix.

use serde_json::Value;

pub fn extract_lot_label(raw: &Value) -> String {
    match raw {
        Value::Null => String::new(),
        Value::Array(items) => join_names(items),
        Value::String(text) => extract_lot_label_str(text),
        other => strip_lot_prefix(&other.to_string()).to_string(),
    }
}

pub fn extract_lot_label_str(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => join_names(&items),
        _ => strip_lot_prefix(text).to_string(),
    }
}

/// `Lote <unit>` when a unit is known, otherwise `Lote <contract number>`.
pub fn lot_or_contract(unit: Option<&Value>, numero_contrato: &str) -> String {
    let label = unit.map(extract_lot_label).unwrap_or_default();
    if label.is_empty() {
        format!("Lote {numero_contrato}")
    } else {
        format!("Lote {label}")
    }
}

fn join_names(items: &[Value]) -> String {
    items
        .iter()
        .map(element_name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn element_name(item: &Value) -> String {
    let named = item.get("name").and_then(|name| match name {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    });

    let text = match (named, item) {
        (Some(name), _) => name,
        (None, Value::String(text)) => text.clone(),
        (None, other) => other.to_string(),
    };

    strip_lot_prefix(&text).to_string()
}

fn strip_lot_prefix(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.get(..4) {
        Some(head) if head.eq_ignore_ascii_case("lote") => {
            let rest = &trimmed[4..];
            // A letter right after the prefix means a longer word ("Loteamento").
            if rest.starts_with(char::is_alphabetic) {
                trimmed
            } else {
                rest.trim_start_matches(|ch: char| ch.is_whitespace() || matches!(ch, ':' | '-' | '.'))
            }
        }
        _ => trimmed,
    }
}
