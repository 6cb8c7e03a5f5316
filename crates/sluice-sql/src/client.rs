//! Database client abstraction
//!
//! A client is a blocking, non-reentrant connection to one database
//! server. All of its methods run on worker threads.

use crate::error::SqlResult;
use crate::params::QueryParams;
use crate::result_set::SqlResultSet;
use std::sync::Arc;

pub trait SqlClient: Send {
    fn connect(&mut self, host: &str, user: &str, password: &str) -> SqlResult<()>;

    /// Select the database subsequent queries run against
    fn select_db(&mut self, name: &str) -> SqlResult<()>;

    /// Run one statement and materialize its result
    fn query(&mut self, sql: &str, params: &QueryParams) -> SqlResult<SqlResultSet>;

    fn close(&mut self);

    fn is_closed(&self) -> bool;

    /// Diagnostic of the most recent failed operation
    fn last_error(&self) -> Option<&str>;
}

/// Creates a fresh client for every `mysql_connect`
pub type ClientFactory = Arc<dyn Fn() -> SqlResult<Box<dyn SqlClient>> + Send + Sync>;

/// Wrap a closure as a [`ClientFactory`]
pub fn client_factory<F>(f: F) -> ClientFactory
where
    F: Fn() -> SqlResult<Box<dyn SqlClient>> + Send + Sync + 'static,
{
    Arc::new(f)
}
