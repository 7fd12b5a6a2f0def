//! Loosely-typed field maps as supplied by callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// An ordered mapping from field name to loosely-typed value.
///
/// Insertion order is kept, which matters for the link heuristic and the
/// document own-key rule. Lookups are exact unless the method name says
/// otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(Map<String, JsonValue>);

impl FieldMap {
    /// Creates an empty field map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` is not valid JSON or not an object.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Wraps a JSON value if it is an object.
    #[must_use]
    pub fn from_json(value: JsonValue) -> Option<Self> {
        match value {
            JsonValue::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the value of a field by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.0.get(name)
    }

    /// Returns the first field whose name matches ignoring ASCII case.
    #[must_use]
    pub fn get_ignore_case(&self, name: &str) -> Option<(&str, &JsonValue)> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(key, value)| (key.as_str(), value))
    }

    /// Returns true if a field with exactly this name exists.
    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns true if a field matching the name ignoring ASCII case exists.
    #[must_use]
    pub fn contains_key_ignore_case(&self, name: &str) -> bool {
        self.get_ignore_case(name).is_some()
    }

    /// Sets a field.
    ///
    /// An existing field keeps its position; a new one is appended.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Option<JsonValue> {
        self.0.insert(name.into(), value.into())
    }

    /// Removes a field by exact name, keeping the order of the rest.
    pub fn remove(&mut self, name: &str) -> Option<JsonValue> {
        self.0.shift_remove(name)
    }

    /// Removes the first field matching the name ignoring ASCII case.
    pub fn remove_ignore_case(&mut self, name: &str) -> Option<(String, JsonValue)> {
        let key = self.get_ignore_case(name)?.0.to_string();
        self.0.shift_remove(&key).map(|value| (key, value))
    }

    /// Iterates over fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Iterates over field names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Renders the map as a JSON object value.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.0.clone())
    }

    /// Serializes the map as compact JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }

    /// Consumes the map, returning the inner JSON object.
    #[must_use]
    pub fn into_inner(self) -> Map<String, JsonValue> {
        self.0
    }
}

impl From<Map<String, JsonValue>> for FieldMap {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<JsonValue>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Builds a [`FieldMap`] from `key => value` pairs.
///
/// ```rust
/// use dyncrud_core::fields;
///
/// let map = fields! { "ProductName" => "Lamp", "Price" => 19.99 };
/// assert_eq!(map.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => { $crate::FieldMap::new() };
    ($($key:expr => $value:tt),+ $(,)?) => {{
        let mut map = $crate::FieldMap::new();
        $( map.insert($key, ::serde_json::json!($value)); )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_keeps_position_of_existing_field() {
        let mut map: FieldMap = [("A", 1), ("B", 2), ("C", 3)].into_iter().collect();
        map.insert("B", 20);
        map.insert("D", 4);
        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["A", "B", "C", "D"]);
        assert_eq!(map.get("B"), Some(&json!(20)));
    }

    #[test]
    fn case_insensitive_lookup() {
        let map = FieldMap::parse(r#"{"customerid": 5, "Name": "x"}"#).unwrap();
        assert_eq!(map.get_ignore_case("CustomerId"), Some(("customerid", &json!(5))));
        assert!(map.get("CustomerId").is_none());
        assert!(map.contains_key_ignore_case("NAME"));
    }

    #[test]
    fn remove_keeps_order() {
        let mut map = FieldMap::parse(r#"{"a": 1, "b": 2, "c": 3}"#).unwrap();
        map.remove("b");
        assert_eq!(map.to_json_string().unwrap(), r#"{"a":1,"c":3}"#);
    }

    #[test]
    fn parse_rejects_non_objects() {
        assert!(FieldMap::parse("[1, 2]").is_err());
        assert!(FieldMap::from_json(json!("text")).is_none());
    }
}
