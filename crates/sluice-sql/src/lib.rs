//! sluice-sql - database functions for sluice scripts
//!
//! Registers the `sql` module: connect, select a database and run queries
//! without blocking the interpreter thread, then inspect the materialized
//! result sets synchronously.
//!
//! # Usage
//!
//! ```no_run
//! use sluice_runtime::{Interpreter, RuntimeConfig, ScriptValue};
//! use sluice_sql::{SqlConfig, SqlModule};
//! use std::time::Duration;
//!
//! let mut interp = Interpreter::new(RuntimeConfig::default()).unwrap();
//! interp.register_module(SqlModule::new(SqlConfig::from_env()).build()).unwrap();
//!
//! let ctx = interp.spawn("login.src");
//! let args = vec![":memory:".into(), "user".into(), "secret".into()];
//! interp.call(ctx, "mysql_connect", args).unwrap();
//! let conn = interp.wait_for(ctx, Duration::from_secs(5)).unwrap();
//! assert!(!conn.is_error());
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod module;
pub mod params;
pub mod result_set;
#[cfg(feature = "sqlite")]
pub mod sqlite;

mod error;
mod value;

pub use client::{ClientFactory, SqlClient, client_factory};
pub use config::SqlConfig;
pub use connection::SqlConnection;
pub use error::{SqlError, SqlResult};
pub use module::SqlModule;
pub use params::QueryParams;
pub use result_set::SqlResultSet;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteClient;
pub use value::SqlValue;
