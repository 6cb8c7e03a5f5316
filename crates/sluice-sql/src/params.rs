//! Owned snapshot of query parameters
//!
//! Parameters are copied out of interpreter memory on the interpreter thread
//! before the query is queued. Later mutation of the script's array has no
//! effect on a query already submitted.

use sluice_runtime::ScriptValue;
use std::sync::Arc;

/// Positional query parameters, bound in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QueryParams {
    /// No parameter argument was given
    #[default]
    None,
    /// Textual form of each element; `None` binds SQL `NULL`
    List(Arc<[Option<String>]>),
}

impl QueryParams {
    /// Snapshot a script argument.
    ///
    /// Returns `None` if the argument is present but is not an array.
    pub fn snapshot(arg: Option<&ScriptValue>) -> Option<Self> {
        match arg {
            None => Some(QueryParams::None),
            Some(ScriptValue::Array(items)) => Some(QueryParams::List(
                items
                    .iter()
                    .map(|item| match item {
                        ScriptValue::Null => None,
                        other => Some(other.to_string()),
                    })
                    .collect(),
            )),
            Some(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            QueryParams::None => 0,
            QueryParams::List(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> {
        let items: &[Option<String>] = match self {
            QueryParams::None => &[],
            QueryParams::List(items) => items,
        };
        items.iter().map(Option::as_deref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_argument_differs_from_empty_list() {
        assert_eq!(QueryParams::snapshot(None), Some(QueryParams::None));
        let empty = QueryParams::snapshot(Some(&ScriptValue::Array(vec![]))).unwrap();
        assert!(matches!(empty, QueryParams::List(_)));
        assert!(empty.is_empty());
    }

    #[test]
    fn test_textual_snapshot_preserves_order() {
        let arg = ScriptValue::Array(vec![
            ScriptValue::Int(42),
            ScriptValue::from("name"),
            ScriptValue::Null,
            ScriptValue::Real(1.5),
        ]);
        let params = QueryParams::snapshot(Some(&arg)).unwrap();
        let items: Vec<_> = params.iter().collect();
        assert_eq!(items, vec![Some("42"), Some("name"), None, Some("1.5")]);
    }

    #[test]
    fn test_non_array_rejected() {
        assert_eq!(QueryParams::snapshot(Some(&ScriptValue::Int(1))), None);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut items = vec![ScriptValue::Int(1)];
        let params = QueryParams::snapshot(Some(&ScriptValue::Array(items.clone()))).unwrap();
        items[0] = ScriptValue::Int(2);
        items.push(ScriptValue::Int(3));
        assert_eq!(params.iter().collect::<Vec<_>>(), vec![Some("1")]);
    }
}
