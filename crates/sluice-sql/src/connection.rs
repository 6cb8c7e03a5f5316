//! Script-visible connection object

use crate::client::SqlClient;
use crate::error::{SqlError, SqlResult};
use crate::params::QueryParams;
use crate::result_set::SqlResultSet;
use parking_lot::Mutex;
use sluice_runtime::ScriptObject;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// A connected client shared between the script and queued work.
///
/// The client is not reentrant, so every use goes through the lock, even
/// when several workers hold handles to the same connection. Closing never
/// waits for that lock: it runs on the interpreter thread, where a worker
/// may be holding the client for the length of a query.
pub struct SqlConnection {
    client: Mutex<Box<dyn SqlClient>>,
    close_requested: AtomicBool,
}

impl ScriptObject for SqlConnection {
    const TYPE_NAME: &'static str = "SQLConnection";
}

impl SqlConnection {
    pub fn new(client: Box<dyn SqlClient>) -> Self {
        Self {
            client: Mutex::new(client),
            close_requested: AtomicBool::new(false),
        }
    }

    pub fn select_db(&self, name: &str) -> SqlResult<()> {
        let mut client = self.client.lock();
        self.check_open(&mut client)?;
        client.select_db(name)
    }

    pub fn query(&self, sql: &str, params: &QueryParams) -> SqlResult<SqlResultSet> {
        let mut client = self.client.lock();
        self.check_open(&mut client)?;
        client.query(sql, params)
    }

    /// Close the connection without blocking. Idempotent.
    ///
    /// If a worker is using the client right now, the close is carried out
    /// by the next operation to take the lock, or when the last handle
    /// goes away.
    pub fn close(&self) {
        self.close_requested.store(true, Ordering::Release);
        match self.client.try_lock() {
            Some(mut client) => client.close(),
            None => debug!("Connection busy, close deferred"),
        }
    }

    /// Whether the script has closed this connection
    pub fn is_closed(&self) -> bool {
        self.close_requested.load(Ordering::Acquire)
    }

    fn check_open(&self, client: &mut Box<dyn SqlClient>) -> SqlResult<()> {
        if self.close_requested.load(Ordering::Acquire) && !client.is_closed() {
            client.close();
        }
        if client.is_closed() {
            return Err(SqlError::Closed);
        }
        Ok(())
    }
}

impl Drop for SqlConnection {
    fn drop(&mut self) {
        let client = self.client.get_mut();
        if !client.is_closed() {
            client.close();
        }
    }
}

impl fmt::Debug for SqlConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlConnection")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct FakeClient {
        closes: Arc<AtomicBool>,
        closed: bool,
    }

    impl SqlClient for FakeClient {
        fn connect(&mut self, _host: &str, _user: &str, _password: &str) -> SqlResult<()> {
            Ok(())
        }

        fn select_db(&mut self, _name: &str) -> SqlResult<()> {
            Ok(())
        }

        fn query(&mut self, _sql: &str, _params: &QueryParams) -> SqlResult<SqlResultSet> {
            Ok(SqlResultSet::with_affected(1))
        }

        fn close(&mut self) {
            self.closed = true;
            self.closes.store(true, Ordering::SeqCst);
        }

        fn is_closed(&self) -> bool {
            self.closed
        }

        fn last_error(&self) -> Option<&str> {
            None
        }
    }

    fn connection() -> (SqlConnection, Arc<AtomicBool>) {
        let closes = Arc::new(AtomicBool::new(false));
        let client = FakeClient {
            closes: closes.clone(),
            closed: false,
        };
        (SqlConnection::new(Box::new(client)), closes)
    }

    #[test]
    fn test_close_idle_connection() {
        let (conn, closes) = connection();
        conn.close();
        assert!(conn.is_closed());
        assert!(closes.load(Ordering::SeqCst));
        assert!(matches!(
            conn.query("SELECT 1", &QueryParams::default()),
            Err(SqlError::Closed)
        ));
    }

    #[test]
    fn test_close_while_busy_is_deferred() {
        let (conn, closes) = connection();
        {
            let _busy = conn.client.lock();
            conn.close();
            assert!(conn.is_closed());
            assert!(!closes.load(Ordering::SeqCst));
        }
        assert!(matches!(conn.select_db("main"), Err(SqlError::Closed)));
        assert!(closes.load(Ordering::SeqCst));
    }

    #[test]
    fn test_drop_closes_client() {
        let (conn, closes) = connection();
        drop(conn);
        assert!(closes.load(Ordering::SeqCst));
    }
}
