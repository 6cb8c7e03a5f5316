//! SQLite client implementation
//!
//! A "host" is either `:memory:` or an existing directory; each database
//! selected on a directory host is the file `<host>/<name>.db`.

mod types;

use crate::client::SqlClient;
use crate::error::{SqlError, SqlResult};
use crate::params::QueryParams;
use crate::result_set::SqlResultSet;
use rusqlite::{Connection, OpenFlags, params_from_iter};
use std::path::PathBuf;
use tracing::{debug, warn};

pub const MEMORY_HOST: &str = ":memory:";

#[derive(Debug, Clone)]
enum Host {
    Memory,
    Directory(PathBuf),
}

#[derive(Debug, Clone)]
struct Credentials {
    user: String,
    password: String,
}

/// SQLite database client
#[derive(Default)]
pub struct SqliteClient {
    credentials: Option<Credentials>,
    host: Option<Host>,
    conn: Option<Connection>,
    closed: bool,
    last_error: Option<String>,
}

impl SqliteClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require this user/password pair on connect
    pub fn with_credentials(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Some(Credentials {
                user: user.into(),
                password: password.into(),
            }),
            ..Self::default()
        }
    }

    fn record<T>(&mut self, result: SqlResult<T>) -> SqlResult<T> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => self.last_error = Some(e.to_string()),
        }
        result
    }

    fn try_connect(&self, host: &str, user: &str, password: &str) -> SqlResult<Host> {
        if self.closed {
            return Err(SqlError::Closed);
        }
        let host = parse_host(host)?;
        if let Some(expected) = &self.credentials {
            if expected.user != user || expected.password != password {
                return Err(SqlError::AccessDenied(user.to_string()));
            }
        }
        Ok(host)
    }

    fn try_select_db(&self, name: &str) -> SqlResult<Connection> {
        let host = self.host.as_ref().ok_or(SqlError::NotConnected)?;
        if !is_valid_db_name(name) {
            return Err(SqlError::InvalidDatabase(name.to_string()));
        }

        let conn = match host {
            Host::Memory => Connection::open_in_memory()?,
            Host::Directory(dir) => {
                let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX;
                Connection::open_with_flags(dir.join(format!("{}.db", name)), flags)?
            }
        };
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(conn)
    }

    fn try_query(&self, sql: &str, params: &QueryParams) -> SqlResult<SqlResultSet> {
        let conn = self.conn.as_ref().ok_or(SqlError::NoDatabase)?;
        let mut stmt = conn.prepare(sql)?;

        let column_count = stmt.column_count();
        if column_count == 0 {
            let changed = stmt.execute(params_from_iter(params.iter()))?;
            return Ok(SqlResultSet::with_affected(changed as u64));
        }

        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let rows = stmt
            .query(params_from_iter(params.iter()))?
            .mapped(|row| {
                Ok((0..column_count)
                    .map(|i| types::from_rusqlite_value(row, i))
                    .collect::<Vec<_>>())
            })
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;

        Ok(SqlResultSet::with_rows(columns, rows))
    }
}

impl SqlClient for SqliteClient {
    fn connect(&mut self, host: &str, user: &str, password: &str) -> SqlResult<()> {
        let result = self.try_connect(host, user, password);
        let parsed = self.record(result)?;
        debug!(host, "SQLite host connected");
        self.host = Some(parsed);
        self.conn = None;
        Ok(())
    }

    fn select_db(&mut self, name: &str) -> SqlResult<()> {
        let result = if self.closed {
            Err(SqlError::Closed)
        } else {
            self.try_select_db(name)
        };
        let conn = self.record(result)?;
        debug!(database = name, "SQLite database selected");
        // Replacing the connection closes the previously selected database.
        self.conn = Some(conn);
        Ok(())
    }

    fn query(&mut self, sql: &str, params: &QueryParams) -> SqlResult<SqlResultSet> {
        let result = if self.closed {
            Err(SqlError::Closed)
        } else {
            self.try_query(sql, params)
        };
        self.record(result)
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                warn!(error = %e, "Failed to close SQLite connection cleanly");
            }
        }
        self.host = None;
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

fn parse_host(host: &str) -> SqlResult<Host> {
    if host == MEMORY_HOST {
        return Ok(Host::Memory);
    }
    let path = PathBuf::from(host);
    if !host.is_empty() && path.is_dir() {
        Ok(Host::Directory(path))
    } else {
        Err(SqlError::UnknownHost(host.to_string()))
    }
}

fn is_valid_db_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
