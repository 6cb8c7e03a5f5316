//! SQL error types

use thiserror::Error;

pub type SqlResult<T> = Result<T, SqlError>;

#[derive(Debug, Error)]
pub enum SqlError {
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {message}")]
    Sqlite { message: String, code: Option<i32> },

    #[error("Unknown database host '{0}'")]
    UnknownHost(String),

    #[error("Access denied for user '{0}'")]
    AccessDenied(String),

    #[error("Invalid database name '{0}'")]
    InvalidDatabase(String),

    #[error("Not connected")]
    NotConnected,

    #[error("No database selected")]
    NoDatabase,

    #[error("Connection is closed")]
    Closed,

    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(feature = "sqlite")]
impl SqlError {
    pub fn sqlite(err: rusqlite::Error) -> Self {
        SqlError::Sqlite {
            message: err.to_string(),
            code: err.sqlite_error_code().map(|c| c as i32),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for SqlError {
    fn from(err: rusqlite::Error) -> Self {
        SqlError::sqlite(err)
    }
}

impl From<serde_json::Error> for SqlError {
    fn from(err: serde_json::Error) -> Self {
        SqlError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_script_diagnostics() {
        assert_eq!(
            SqlError::UnknownHost("badhost".into()).to_string(),
            "Unknown database host 'badhost'"
        );
        assert_eq!(SqlError::NoDatabase.to_string(), "No database selected");
        assert_eq!(SqlError::Closed.to_string(), "Connection is closed");
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_from_rusqlite_keeps_code() {
        let err = SqlError::from(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(1),
            Some("near \"SELEC\": syntax error".into()),
        ));
        match err {
            SqlError::Sqlite { message, code } => {
                assert!(message.contains("syntax error"));
                assert!(code.is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
