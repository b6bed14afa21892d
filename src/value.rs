//! Dynamic value model for items flowing through a pipeline.
//!
//! Sources emit opaque values; each stage re-types them at the boundary by
//! matching on [`Value`]. Lists, records (named fields), and maps (arbitrary
//! keys) are first-class so batch transforms can select sort/group
//! discriminators at runtime.

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value as JsonValue;

/// Record value with named fields, insertion-ordered.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordValue {
    fields: Vec<(String, Value)>,
}

impl RecordValue {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn from_fields(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    /// Get a field value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Set a field, replacing an existing one with the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Map value keyed by arbitrary values, insertion-ordered.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapValue {
    entries: Vec<(Value, Value)>,
}

impl MapValue {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn from_entries(entries: Vec<(Value, Value)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(entry_key, _)| entry_key == key)
            .map(|(_, value)| value)
    }

    /// Insert an entry, replacing an existing one with an equal key.
    pub fn insert(&mut self, key: Value, value: Value) {
        match self.entries.iter_mut().find(|(entry_key, _)| *entry_key == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(Value, Value)> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An opaque value flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Record(RecordValue),
    Map(MapValue),
    /// Key/value tuple produced when a map is unpacked element-wise.
    Pair(Box<Value>, Box<Value>),
}

impl Value {
    /// Build a list from anything convertible to values.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a record from name/value pairs.
    pub fn record<I, N, T>(fields: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<Value>,
    {
        Value::Record(RecordValue::from_fields(
            fields
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        ))
    }

    /// Build a map from key/value pairs.
    pub fn map<I, K, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<Value>,
        T: Into<Value>,
    {
        Value::Map(MapValue::from_entries(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        ))
    }

    pub fn pair(key: impl Into<Value>, value: impl Into<Value>) -> Self {
        Value::Pair(Box::new(key.into()), Box::new(value.into()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the value's runtime shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Map(_) => "map",
            Value::Pair(_, _) => "pair",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordValue> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Widen to f64 when the value is numeric.
    pub fn numeric(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Convert a JSON document into a pipeline value. Objects become maps
    /// keyed by strings, arrays become lists.
    pub fn from_json(json: JsonValue) -> Value {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(value) => Value::Bool(value),
            JsonValue::Number(number) => {
                if let Some(value) = number.as_i64() {
                    Value::Int(value)
                } else {
                    Value::Float(number.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(value) => Value::String(value),
            JsonValue::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            JsonValue::Object(fields) => Value::Map(MapValue::from_entries(
                fields
                    .into_iter()
                    .map(|(key, value)| (Value::String(key), Value::from_json(value)))
                    .collect(),
            )),
        }
    }

    /// Convert back to JSON. Maps with non-string keys are rendered as
    /// arrays of `[key, value]` pairs.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(value) => JsonValue::Bool(*value),
            Value::Int(value) => JsonValue::from(*value),
            Value::Float(value) => serde_json::Number::from_f64(*value)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(value) => JsonValue::String(value.clone()),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Pair(key, value) => JsonValue::Array(vec![key.to_json(), value.to_json()]),
            Value::Record(record) => JsonValue::Object(
                record
                    .fields()
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect(),
            ),
            Value::Map(map) => {
                let all_string_keys = map
                    .entries()
                    .iter()
                    .all(|(key, _)| matches!(key, Value::String(_)));
                if all_string_keys {
                    JsonValue::Object(
                        map.entries()
                            .iter()
                            .map(|(key, value)| {
                                (key.as_str().unwrap_or_default().to_owned(), value.to_json())
                            })
                            .collect(),
                    )
                } else {
                    JsonValue::Array(
                        map.entries()
                            .iter()
                            .map(|(key, value)| {
                                JsonValue::Array(vec![key.to_json(), value.to_json()])
                            })
                            .collect(),
                    )
                }
            }
        }
    }
}

impl PartialOrd for Value {
    /// Same-kind comparison, with int/float comparing numerically.
    /// Values of unrelated kinds are incomparable.
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            (a, b) => match (a.numeric(), b.numeric()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::String(value) => write!(f, "{value}"),
            Value::Pair(key, value) => write!(f, "({key}, {value})"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<RecordValue> for Value {
    fn from(record: RecordValue) -> Self {
        Value::Record(record)
    }
}

impl From<MapValue> for Value {
    fn from(map: MapValue) -> Self {
        Value::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_widening_and_ordering() {
        assert_eq!(Value::Int(3).numeric(), Some(3.0));
        assert_eq!(Value::Float(0.5).numeric(), Some(0.5));
        assert_eq!(Value::from("x").numeric(), None);

        assert!(Value::Int(1) < Value::Int(2));
        assert!(Value::Int(1) < Value::Float(1.5));
        assert!(Value::from("abc") < Value::from("abd"));
        assert_eq!(Value::from("abc").partial_cmp(&Value::Int(1)), None);
    }

    #[test]
    fn record_field_access() {
        let mut record = RecordValue::new();
        record.set("name", "chan");
        record.set("count", 2);
        record.set("count", 3);

        assert_eq!(record.get("name"), Some(&Value::from("chan")));
        assert_eq!(record.get("count"), Some(&Value::Int(3)));
        assert_eq!(record.get("missing"), None);
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn map_insert_replaces_equal_keys() {
        let mut map = MapValue::new();
        map.insert(Value::from("a"), Value::Int(1));
        map.insert(Value::from("a"), Value::Int(2));
        map.insert(Value::Int(7), Value::from("seven"));

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&Value::from("a")), Some(&Value::Int(2)));
        assert_eq!(map.get(&Value::Int(7)), Some(&Value::from("seven")));
    }

    #[test]
    fn json_round_trip() {
        let json: JsonValue =
            serde_json::from_str(r#"{"name":"lhr","hits":3,"ratio":0.56,"tags":["a","b"]}"#)
                .expect("parse json");
        let value = Value::from_json(json.clone());

        let map = value.as_map().expect("object becomes map");
        assert_eq!(map.get(&Value::from("hits")), Some(&Value::Int(3)));
        assert_eq!(map.get(&Value::from("ratio")), Some(&Value::Float(0.56)));
        assert_eq!(value.to_json(), json);
    }
}
