//! The `sql` script module
//!
//! Three functions talk to the database and are deferred to the work queue:
//! `mysql_connect`, `mysql_select_db` and `mysql_query`. They return the
//! pending sentinel right away; the real result lands in the caller's result
//! slot when the context is revived. The remaining functions only inspect
//! objects already in script memory and answer synchronously.

use crate::client::ClientFactory;
use crate::config::SqlConfig;
use crate::connection::SqlConnection;
use crate::params::QueryParams;
use crate::result_set::SqlResultSet;
use sluice_runtime::{Call, Deferred, Module, ScriptError, ScriptValue, Shared, function};
use tracing::{debug, warn};

pub const MODULE_NAME: &str = "sql";

/// Names of every function the module exports
pub const FUNCTIONS: [&str; 9] = [
    "mysql_connect",
    "mysql_select_db",
    "mysql_query",
    "mysql_close",
    "mysql_num_fields",
    "mysql_field_name",
    "mysql_affected_rows",
    "mysql_num_rows",
    "mysql_fetch_row",
];

/// Builder for the `sql` module
pub struct SqlModule {
    config: SqlConfig,
    factory: Option<ClientFactory>,
}

impl SqlModule {
    /// Module backed by the compiled-in SQLite client, if any
    pub fn new(config: SqlConfig) -> Self {
        Self {
            config,
            factory: default_factory(),
        }
    }

    /// Module backed by a caller-supplied client
    pub fn with_factory(config: SqlConfig, factory: ClientFactory) -> Self {
        Self {
            config,
            factory: Some(factory),
        }
    }

    pub fn is_available(&self) -> bool {
        self.config.enabled && self.factory.is_some()
    }

    /// Build the module for registration with an interpreter
    pub fn build(self) -> Module {
        let factory = match self.factory {
            Some(factory) if self.config.enabled => factory,
            _ => {
                debug!("SQL support disabled");
                return Module::new(MODULE_NAME).with_functions(
                    FUNCTIONS
                        .iter()
                        .map(|name| function(name, |_| ScriptError::Unavailable.into_value()))
                        .collect(),
                );
            }
        };

        Module::new(MODULE_NAME).with_functions(vec![
            function("mysql_connect", move |call| mysql_connect(call, &factory)),
            function("mysql_select_db", mysql_select_db),
            function("mysql_query", mysql_query),
            function("mysql_close", mysql_close),
            function("mysql_num_fields", mysql_num_fields),
            function("mysql_field_name", mysql_field_name),
            function("mysql_affected_rows", mysql_affected_rows),
            function("mysql_num_rows", mysql_num_rows),
            function("mysql_fetch_row", mysql_fetch_row),
        ])
    }
}

#[cfg(feature = "sqlite")]
fn default_factory() -> Option<ClientFactory> {
    Some(crate::client::client_factory(|| {
        Ok(Box::new(crate::sqlite::SqliteClient::new()) as Box<dyn crate::client::SqlClient>)
    }))
}

#[cfg(not(feature = "sqlite"))]
fn default_factory() -> Option<ClientFactory> {
    None
}

fn mysql_connect(call: &mut Call<'_, '_>, factory: &ClientFactory) -> ScriptValue {
    let params = call.params();
    let (Some(host), Some(user), Some(password)) =
        (params.string(0), params.string(1), params.string(2))
    else {
        return ScriptError::Parameter.into_value();
    };

    call.defer(ConnectOp {
        factory: factory.clone(),
        host: host.to_string(),
        user: user.to_string(),
        password: password.to_string(),
    })
}

fn mysql_select_db(call: &mut Call<'_, '_>) -> ScriptValue {
    let params = call.params();
    let (Some(conn), Some(name)) = (params.object::<SqlConnection>(0), params.string(1)) else {
        return ScriptError::Parameter.into_value();
    };

    call.defer(SelectDbOp {
        conn,
        name: name.to_string(),
    })
}

fn mysql_query(call: &mut Call<'_, '_>) -> ScriptValue {
    let params = call.params();
    let (Some(conn), Some(sql)) = (params.object::<SqlConnection>(0), params.string(1)) else {
        return ScriptError::Parameter.into_value();
    };
    let Some(query_params) = QueryParams::snapshot(params.value(2)) else {
        return ScriptError::Parameter.into_value();
    };

    call.defer(QueryOp {
        conn,
        sql: sql.to_string(),
        params: query_params,
    })
}

fn mysql_close(call: &mut Call<'_, '_>) -> ScriptValue {
    let Some(conn) = call.params().object::<SqlConnection>(0) else {
        return ScriptError::Parameter.into_value();
    };
    conn.close();
    ScriptValue::Int(1)
}

fn mysql_num_fields(call: &mut Call<'_, '_>) -> ScriptValue {
    with_result_set(call, |rs| ScriptValue::Int(rs.num_fields() as i64))
}

fn mysql_field_name(call: &mut Call<'_, '_>) -> ScriptValue {
    let params = call.params();
    let (Some(rs), Some(index)) = (params.object::<SqlResultSet>(0), params.int(1)) else {
        return ScriptError::Parameter.into_value();
    };
    if index == 0 {
        return ScriptError::Parameter.into_value();
    }
    let name = usize::try_from(index)
        .ok()
        .and_then(|index| rs.field_name(index));
    match name {
        Some(name) => ScriptValue::from(name),
        None => ScriptValue::error("Column does not exist"),
    }
}

fn mysql_affected_rows(call: &mut Call<'_, '_>) -> ScriptValue {
    with_result_set(call, |rs| ScriptValue::Int(rs.affected_rows() as i64))
}

fn mysql_num_rows(call: &mut Call<'_, '_>) -> ScriptValue {
    with_result_set(call, |rs| ScriptValue::Int(rs.num_rows() as i64))
}

fn mysql_fetch_row(call: &mut Call<'_, '_>) -> ScriptValue {
    with_result_set(call, |rs| {
        if !rs.has_result() {
            return ScriptValue::error("Query returned no result");
        }
        rs.fetch_row().unwrap_or_default()
    })
}

fn with_result_set(
    call: &mut Call<'_, '_>,
    f: impl FnOnce(&SqlResultSet) -> ScriptValue,
) -> ScriptValue {
    match call.params().object::<SqlResultSet>(0) {
        Some(rs) => f(&rs),
        None => ScriptError::Parameter.into_value(),
    }
}

/// Create a client and connect it
struct ConnectOp {
    factory: ClientFactory,
    host: String,
    user: String,
    password: String,
}

impl Deferred for ConnectOp {
    fn name(&self) -> &'static str {
        "mysql_connect"
    }

    fn run(self: Box<Self>) -> ScriptValue {
        let mut client = match (self.factory)() {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Failed to create SQL client");
                return ScriptError::resource("Insufficient memory").into_value();
            }
        };

        if let Err(e) = client.connect(&self.host, &self.user, &self.password) {
            debug!(host = %self.host, error = %e, "Connect failed");
            return ScriptError::operation(e).into_value();
        }

        ScriptValue::object(Shared::new(SqlConnection::new(client)))
    }
}

struct SelectDbOp {
    conn: Shared<SqlConnection>,
    name: String,
}

impl Deferred for SelectDbOp {
    fn name(&self) -> &'static str {
        "mysql_select_db"
    }

    fn run(self: Box<Self>) -> ScriptValue {
        match self.conn.select_db(&self.name) {
            Ok(()) => ScriptValue::Int(1),
            Err(e) => ScriptError::operation(e).into_value(),
        }
    }
}

struct QueryOp {
    conn: Shared<SqlConnection>,
    sql: String,
    params: QueryParams,
}

impl Deferred for QueryOp {
    fn name(&self) -> &'static str {
        "mysql_query"
    }

    fn run(self: Box<Self>) -> ScriptValue {
        match self.conn.query(&self.sql, &self.params) {
            Ok(rs) => ScriptValue::object(Shared::new(rs)),
            Err(e) => ScriptError::operation(e).into_value(),
        }
    }
}
