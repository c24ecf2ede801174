use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// Loosely typed object as it arrives from the tracker.
pub type Record = Map<String, Value>;

/// Parse JSON text into a record.
pub fn parse_record(json: &str) -> anyhow::Result<Record> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(record) => Ok(record),
        other => Err(anyhow::anyhow!(
            "Expected a JSON object, got {}",
            kind(&other)
        )),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Permissive conversion out of an untyped value. `None` means the value
/// cannot represent `Self` and the field keeps its current value.
pub trait FromVariant: Sized {
    fn from_variant(value: &Value) -> Option<Self>;
}

impl FromVariant for String {
    fn from_variant(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl FromVariant for bool {
    fn from_variant(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|n| n != 0.0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Integral value of a float without a fractional part, e.g. `17.0`.
fn whole_number(n: &Number) -> Option<f64> {
    n.as_f64().filter(|f| f.is_finite() && f.fract() == 0.0)
}

impl FromVariant for i64 {
    fn from_variant(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                whole_number(n)
                    .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }
}

impl FromVariant for i32 {
    fn from_variant(value: &Value) -> Option<Self> {
        i64::from_variant(value).and_then(|n| i32::try_from(n).ok())
    }
}

impl FromVariant for u64 {
    fn from_variant(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().or_else(|| {
                whole_number(n)
                    .filter(|f| *f >= 0.0 && *f < u64::MAX as f64)
                    .map(|f| f as u64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(*b as u64),
            _ => None,
        }
    }
}

impl FromVariant for Vec<String> {
    fn from_variant(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => items.iter().map(String::from_variant).collect(),
            Value::String(s) => Some(vec![s.clone()]),
            _ => None,
        }
    }
}

type Setter<T> = Box<dyn Fn(&mut T, &Value) -> bool + Send + Sync>;

/// Field name to setter map for one target type.
///
/// Each model builds its table once; materialization only walks the record
/// and looks names up here, so new fields never touch this module.
pub struct FieldTable<T> {
    setters: HashMap<&'static str, Setter<T>>,
}

impl<T: 'static> FieldTable<T> {
    pub fn new() -> Self {
        Self {
            setters: HashMap::new(),
        }
    }

    pub fn scalar<V, F>(mut self, name: &'static str, set: F) -> Self
    where
        V: FromVariant,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.setters.insert(
            name,
            Box::new(move |target: &mut T, value: &Value| match V::from_variant(value) {
                Some(v) => {
                    set(target, v);
                    true
                }
                None => false,
            }),
        );
        self
    }

    /// Register the conversion of an array of records into a list of `C`.
    ///
    /// Every element becomes its own `C`. Elements that are not objects are
    /// materialized from an empty record.
    pub fn list<C, F>(mut self, name: &'static str, set: F) -> Self
    where
        C: Materialize,
        F: Fn(&mut T, Vec<C>) + Send + Sync + 'static,
    {
        self.setters.insert(
            name,
            Box::new(move |target: &mut T, value: &Value| {
                let Some(items) = value.as_array() else {
                    return false;
                };
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    list.push(match item.as_object() {
                        Some(record) => C::from_record(record),
                        None => C::default(),
                    });
                }
                set(target, list);
                true
            }),
        );
        self
    }

    /// Assign every known key of `record` onto `target`. Returns how many were assigned.
    pub fn apply(&self, target: &mut T, record: &Record) -> usize {
        let mut assigned = 0;
        for (key, value) in record {
            let Some(setter) = self.setters.get(key.as_str()) else {
                trace!("Ignoring unknown field {}", key);
                continue;
            };
            if setter(&mut *target, value) {
                assigned += 1;
            } else {
                trace!("Ignoring value of unexpected type for {}: {}", key, value);
            }
        }
        assigned
    }

    pub fn contains(&self, name: &str) -> bool {
        self.setters.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.setters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.setters.is_empty()
    }
}

impl<T: 'static> Default for FieldTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FieldTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.setters.keys().collect();
        names.sort();
        f.debug_struct("FieldTable").field("fields", &names).finish()
    }
}

/// A type that can be populated from a [`Record`].
///
/// Unknown keys are ignored and missing keys keep their `Default` value.
pub trait Materialize: Default + Sized + 'static {
    /// The type's field table, built on first use and shared afterwards.
    fn fields() -> &'static FieldTable<Self>;

    fn from_record(record: &Record) -> Self {
        let mut target = Self::default();
        Self::fields().apply(&mut target, record);
        target
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(Self::from_record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::OnceLock;

    #[derive(Debug, Default, PartialEq)]
    struct Frame {
        index: i32,
        function: String,
    }

    impl Materialize for Frame {
        fn fields() -> &'static FieldTable<Self> {
            static FIELDS: OnceLock<FieldTable<Frame>> = OnceLock::new();
            FIELDS.get_or_init(|| {
                FieldTable::<Frame>::new()
                    .scalar("index", |f, v: i32| f.index = v)
                    .scalar("function", |f, v: String| f.function = v)
            })
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Thread {
        name: String,
        crashed: bool,
        frames: Vec<Frame>,
    }

    impl Materialize for Thread {
        fn fields() -> &'static FieldTable<Self> {
            static FIELDS: OnceLock<FieldTable<Thread>> = OnceLock::new();
            FIELDS.get_or_init(|| {
                FieldTable::<Thread>::new()
                    .scalar("name", |t, v: String| t.name = v)
                    .scalar("crashed", |t, v: bool| t.crashed = v)
                    .list("frames", |t, v: Vec<Frame>| t.frames = v)
            })
        }
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_known_fields_are_assigned() {
        let frame = Frame::from_record(&record(json!({"index": 3, "function": "main"})));
        assert_eq!(
            frame,
            Frame {
                index: 3,
                function: "main".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_and_missing_keys() {
        let frame = Frame::from_record(&record(json!({"function": "main", "address": "0x1"})));
        assert_eq!(frame.index, 0);
        assert_eq!(frame.function, "main");
    }

    #[test]
    fn test_mismatched_types_keep_default() {
        let frame = Frame::from_record(&record(json!({"index": {"nested": true}, "function": null})));
        assert_eq!(frame, Frame::default());
    }

    #[test]
    fn test_permissive_scalars() {
        assert_eq!(i64::from_variant(&json!("42")), Some(42));
        assert_eq!(i32::from_variant(&json!(i64::MAX)), None);
        assert_eq!(i64::from_variant(&json!(17.0)), Some(17));
        assert_eq!(i64::from_variant(&json!(17.5)), None);
        assert_eq!(i32::from_variant(&json!(-3.0)), Some(-3));
        assert_eq!(u64::from_variant(&json!(u64::MAX)), Some(u64::MAX));
        assert_eq!(u64::from_variant(&json!(42.0)), Some(42));
        assert_eq!(u64::from_variant(&json!(-1)), None);
        assert_eq!(bool::from_variant(&json!(1)), Some(true));
        assert_eq!(bool::from_variant(&json!("false")), Some(false));
        assert_eq!(bool::from_variant(&json!("maybe")), None);
        assert_eq!(String::from_variant(&json!(7)), Some("7".to_string()));
        assert_eq!(
            Vec::<String>::from_variant(&json!(["a", "b"])),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_nested_list() {
        let thread = Thread::from_record(&record(json!({
            "name": "main",
            "crashed": true,
            "frames": [
                {"index": 0, "function": "raise"},
                {"index": 1, "function": "abort"},
                "garbage"
            ]
        })));

        assert!(thread.crashed);
        assert_eq!(thread.frames.len(), 3);
        assert_eq!(thread.frames[1].function, "abort");
        assert_eq!(thread.frames[2], Frame::default());
    }

    #[test]
    fn test_apply_counts_assignments() {
        let mut frame = Frame::default();
        let assigned = Frame::fields().apply(
            &mut frame,
            &record(json!({"index": 1, "function": [], "other": 2})),
        );
        assert_eq!(assigned, 1);
        assert!(Frame::fields().contains("function"));
        assert_eq!(Frame::fields().len(), 2);
    }

    #[test]
    fn test_parse_record() {
        let record = parse_record(r#"{"name": "kwrite"}"#).unwrap();
        assert_eq!(record.get("name"), Some(&json!("kwrite")));
        assert!(parse_record("[1, 2]").is_err());
        assert!(parse_record("{").is_err());
    }
}
