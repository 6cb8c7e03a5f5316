//! SQL value types and their script-side representation

use sluice_runtime::ScriptValue;

/// A single column value of a materialized row
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(i) => Some(*i),
            SqlValue::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into the value a script sees.
    ///
    /// Blobs have no script representation of their own and surface as
    /// (lossy) text.
    pub fn into_script(self) -> ScriptValue {
        match self {
            SqlValue::Null => ScriptValue::Null,
            SqlValue::Int(i) => ScriptValue::Int(i),
            SqlValue::Float(f) => ScriptValue::Real(f),
            SqlValue::Text(s) => ScriptValue::Text(s),
            SqlValue::Blob(b) => ScriptValue::Text(String::from_utf8_lossy(&b).into_owned()),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Int(i)
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        SqlValue::Float(f)
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(b: Vec<u8>) -> Self {
        SqlValue::Blob(b)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}
