//! Script value payload exchanged between the interpreter and the bridge

use crate::shared::Shared;
use serde_json::Value as JsonValue;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Marker for host objects that scripts can hold a reference to.
pub trait ScriptObject: Any + Send + Sync {
    /// Name shown in diagnostics and textual representations
    const TYPE_NAME: &'static str;
}

/// A script-held reference to a host object.
///
/// Cloning adds a holder; the object is torn down when the last holder
/// (script variable, result slot or in-flight work item) goes away.
#[derive(Clone)]
pub struct ObjectRef {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ObjectRef {
    pub fn new<T: ScriptObject>(object: Shared<T>) -> Self {
        Self {
            inner: object.into_arc(),
            type_name: T::TYPE_NAME,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Recover a typed handle, adding a holder on success
    pub fn downcast<T: ScriptObject>(&self) -> Option<Shared<T>> {
        self.inner.clone().downcast::<T>().ok().map(Shared::from_arc)
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("type_name", &self.type_name)
            .field("holders", &Arc::strong_count(&self.inner))
            .finish()
    }
}

/// A value living on a script's value stack
#[derive(Debug, Clone, Default)]
pub enum ScriptValue {
    #[default]
    Null,
    Int(i64),
    Real(f64),
    Text(String),
    Array(Vec<ScriptValue>),
    /// Ordered name/value pairs, e.g. a fetched row
    Record(Vec<(String, ScriptValue)>),
    Object(ObjectRef),
    Error(String),
}

impl ScriptValue {
    /// Value returned by a deferred call while its context is suspended
    pub const PENDING: ScriptValue = ScriptValue::Int(0);

    pub fn object<T: ScriptObject>(object: Shared<T>) -> Self {
        ScriptValue::Object(ObjectRef::new(object))
    }

    pub fn error(message: impl Into<String>) -> Self {
        ScriptValue::Error(message.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScriptValue::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ScriptValue::Error(_))
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ScriptValue::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ScriptValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ScriptValue]> {
        match self {
            ScriptValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object<T: ScriptObject>(&self) -> Option<Shared<T>> {
        match self {
            ScriptValue::Object(obj) => obj.downcast::<T>(),
            _ => None,
        }
    }

    /// Look up a field of a record value
    pub fn field(&self, name: &str) -> Option<&ScriptValue> {
        match self {
            ScriptValue::Record(fields) => fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Convert to JSON for hosts that want to inspect results
    pub fn to_json(&self) -> JsonValue {
        match self {
            ScriptValue::Null => JsonValue::Null,
            ScriptValue::Int(i) => JsonValue::Number((*i).into()),
            ScriptValue::Real(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            ScriptValue::Text(s) => JsonValue::String(s.clone()),
            ScriptValue::Array(items) => {
                JsonValue::Array(items.iter().map(ScriptValue::to_json).collect())
            }
            ScriptValue::Record(fields) => {
                let mut map = serde_json::Map::new();
                for (name, value) in fields {
                    map.insert(name.clone(), value.to_json());
                }
                JsonValue::Object(map)
            }
            ScriptValue::Object(obj) => JsonValue::String(format!("<{}>", obj.type_name())),
            ScriptValue::Error(msg) => serde_json::json!({ "error": msg }),
        }
    }
}

impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScriptValue::Null, ScriptValue::Null) => true,
            (ScriptValue::Int(a), ScriptValue::Int(b)) => a == b,
            (ScriptValue::Real(a), ScriptValue::Real(b)) => a == b,
            (ScriptValue::Text(a), ScriptValue::Text(b)) => a == b,
            (ScriptValue::Array(a), ScriptValue::Array(b)) => a == b,
            (ScriptValue::Record(a), ScriptValue::Record(b)) => a == b,
            (ScriptValue::Object(a), ScriptValue::Object(b)) => a.ptr_eq(b),
            (ScriptValue::Error(a), ScriptValue::Error(b)) => a == b,
            _ => false,
        }
    }
}

/// Textual representation, as used when snapshotting query parameters
impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Null => f.write_str("<uninitialized object>"),
            ScriptValue::Int(i) => write!(f, "{}", i),
            ScriptValue::Real(v) => write!(f, "{}", v),
            ScriptValue::Text(s) => f.write_str(s),
            ScriptValue::Array(items) => {
                f.write_str("{ ")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(" }")
            }
            ScriptValue::Record(fields) => {
                f.write_str("struct{ ")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} = {}", name, value)?;
                }
                f.write_str(" }")
            }
            ScriptValue::Object(obj) => write!(f, "<{}>", obj.type_name()),
            ScriptValue::Error(msg) => write!(f, "error{{ errortext = \"{}\" }}", msg),
        }
    }
}

impl From<i64> for ScriptValue {
    fn from(i: i64) -> Self {
        ScriptValue::Int(i)
    }
}

impl From<f64> for ScriptValue {
    fn from(f: f64) -> Self {
        ScriptValue::Real(f)
    }
}

impl From<String> for ScriptValue {
    fn from(s: String) -> Self {
        ScriptValue::Text(s)
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        ScriptValue::Text(s.to_string())
    }
}

impl<T: Into<ScriptValue>> From<Vec<T>> for ScriptValue {
    fn from(items: Vec<T>) -> Self {
        ScriptValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ScriptValue>> From<Option<T>> for ScriptValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => ScriptValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;

    impl ScriptObject for Widget {
        const TYPE_NAME: &'static str = "Widget";
    }

    struct Gadget;

    impl ScriptObject for Gadget {
        const TYPE_NAME: &'static str = "Gadget";
    }

    #[test]
    fn test_object_downcast() {
        let value = ScriptValue::object(Shared::new(Widget));
        assert!(value.as_object::<Widget>().is_some());
        assert!(value.as_object::<Gadget>().is_none());
        assert_eq!(value.to_string(), "<Widget>");
    }

    #[test]
    fn test_object_equality_is_identity() {
        let shared = Shared::new(Widget);
        let a = ScriptValue::object(shared.clone());
        let b = ScriptValue::object(shared);
        let c = ScriptValue::object(Shared::new(Widget));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_text_representation() {
        let value = ScriptValue::from(vec![
            ScriptValue::Int(1),
            ScriptValue::from("two"),
            ScriptValue::Real(3.5),
        ]);
        assert_eq!(value.to_string(), "{ 1, two, 3.5 }");
        assert_eq!(ScriptValue::Int(-7).to_string(), "-7");
    }

    #[test]
    fn test_record_field_lookup() {
        let row = ScriptValue::Record(vec![
            ("id".to_string(), ScriptValue::Int(1)),
            ("name".to_string(), ScriptValue::from("Alice")),
        ]);
        assert_eq!(row.field("name"), Some(&ScriptValue::from("Alice")));
        assert_eq!(row.field("missing"), None);
        assert_eq!(row.to_json(), serde_json::json!({"id": 1, "name": "Alice"}));
    }
}
