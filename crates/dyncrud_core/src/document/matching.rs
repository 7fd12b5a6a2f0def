//! Structural matching over document payloads.

use crate::fields::FieldMap;
use serde_json::Value as JsonValue;
use std::borrow::Cow;

/// Field through which a sub-document names its parent's key.
pub const PARENT_ID: &str = "ParentId";

/// Renders a scalar as text: strings verbatim, numbers and booleans as JSON.
///
/// Null, arrays and objects have no rendering.
#[must_use]
pub fn scalar_text(value: &JsonValue) -> Option<Cow<'_, str>> {
    match value {
        JsonValue::String(s) => Some(Cow::Borrowed(s)),
        JsonValue::Number(n) => Some(Cow::Owned(n.to_string())),
        JsonValue::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

/// Compares two scalars by their text rendering, so `"5"` equals `5`.
#[must_use]
pub fn loosely_equals(a: &JsonValue, b: &JsonValue) -> bool {
    match (scalar_text(a), scalar_text(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Returns a document's own key: the first field whose name ends in `id`,
/// ignoring ASCII case, other than [`PARENT_ID`].
#[must_use]
pub fn own_key(fields: &FieldMap) -> Option<(&str, &JsonValue)> {
    fields.iter().find(|(name, _)| {
        name.len() >= 2
            && name.is_char_boundary(name.len() - 2)
            && name[name.len() - 2..].eq_ignore_ascii_case("id")
            && !name.eq_ignore_ascii_case(PARENT_ID)
    })
}

/// Returns true if every filter names a field whose value loosely equals
/// the filter string.
pub(crate) fn matches_filters(fields: &FieldMap, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(key, expected)| {
        fields
            .get(key)
            .and_then(scalar_text)
            .is_some_and(|actual| actual == expected.as_str())
    })
}

/// Returns true if the fields name `key` as their parent.
pub(crate) fn has_parent(fields: &FieldMap, key: &JsonValue) -> bool {
    fields
        .get(PARENT_ID)
        .is_some_and(|parent| loosely_equals(parent, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use serde_json::json;

    #[test]
    fn loose_equality() {
        assert!(loosely_equals(&json!(5), &json!("5")));
        assert!(loosely_equals(&json!("abc"), &json!("abc")));
        assert!(loosely_equals(&json!(true), &json!("true")));
        assert!(!loosely_equals(&json!(5), &json!(6)));
        assert!(!loosely_equals(&json!([5]), &json!([5])));
        assert!(!loosely_equals(&JsonValue::Null, &JsonValue::Null));
    }

    #[test]
    fn own_key_skips_parent_id() {
        let map = fields! { "ParentId" => 1, "Name" => "x", "OrderId" => 2, "CustomerId" => 3 };
        assert_eq!(own_key(&map), Some(("OrderId", &json!(2))));
    }

    #[test]
    fn own_key_ignores_case_and_handles_short_names() {
        let map = fields! { "i" => 1, "ID" => 9 };
        assert_eq!(own_key(&map), Some(("ID", &json!(9))));
        assert_eq!(own_key(&fields! { "Name" => "x" }), None);
    }

    #[test]
    fn filters_use_exact_keys_and_loose_values() {
        let map = fields! { "Price" => 19.99, "Name" => "Lamp", "Tags" => ["a"] };
        let filters = |pairs: &[(&str, &str)]| -> Vec<(String, String)> {
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect()
        };

        assert!(matches_filters(&map, &filters(&[("Price", "19.99"), ("Name", "Lamp")])));
        assert!(!matches_filters(&map, &filters(&[("price", "19.99")])));
        assert!(!matches_filters(&map, &filters(&[("Name", "Lam")])));
        assert!(!matches_filters(&map, &filters(&[("Tags", "a")])));
        assert!(matches_filters(&map, &[]));
    }

    #[test]
    fn parent_detection() {
        let child = fields! { "ParentId" => "5" };
        assert!(has_parent(&child, &json!(5)));
        assert!(!has_parent(&child, &json!(50)));
        assert!(!has_parent(&fields! { "parentid" => 5 }, &json!(5)));
    }
}
