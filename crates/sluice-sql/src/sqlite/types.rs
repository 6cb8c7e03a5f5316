//! SQLite type conversion utilities

use crate::value::SqlValue;
use rusqlite::Row;
use rusqlite::types::ValueRef;

/// Convert rusqlite row value to SqlValue
pub fn from_rusqlite_value(row: &Row, index: usize) -> SqlValue {
    match row.get_ref(index) {
        Ok(ValueRef::Null) => SqlValue::Null,
        Ok(ValueRef::Integer(i)) => SqlValue::Int(i),
        Ok(ValueRef::Real(f)) => SqlValue::Float(f),
        Ok(ValueRef::Text(s)) => SqlValue::Text(String::from_utf8_lossy(s).into_owned()),
        Ok(ValueRef::Blob(b)) => SqlValue::Blob(b.to_vec()),
        Err(_) => SqlValue::Null,
    }
}
