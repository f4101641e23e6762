// used for persistence
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{IntrospectError, Result};
use crate::settings::PersistenceMode;

/// Outcome of a batch execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecuteResult {
    pub elapsed: Duration,
}

/// Rows returned by an ad-hoc query, values already converted to JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// The SQL engine the introspection tables live in.
pub trait SqlClient {
    /// Execute a batch of statements synchronously. `disable_spinner` marks
    /// background batches the user did not ask for.
    fn execute_sync(&mut self, sql: &str, disable_spinner: bool) -> Result<ExecuteResult>;
    /// Refresh any cached view of the schema so new tables become visible.
    fn load_schema(&mut self) -> Result<()>;
    fn query(&mut self, sql: &str) -> Result<QueryRows>;
}

// ------------- SQLite -------------
pub struct SqliteClient {
    connection: Connection,
    tables: Vec<String>,
}

impl SqliteClient {
    pub fn open(mode: &PersistenceMode) -> Result<Self> {
        let connection = match mode {
            PersistenceMode::InMemory => Connection::open_in_memory()?,
            PersistenceMode::File(path) => Connection::open(path)?,
        };
        Ok(Self::new(connection))
    }
    pub fn new(connection: Connection) -> Self {
        Self { connection, tables: Vec::new() }
    }
    /// Temporary tables seen by the last [`SqlClient::load_schema`].
    pub fn tables(&self) -> &[String] {
        &self.tables
    }
}

impl SqlClient for SqliteClient {
    fn execute_sync(&mut self, sql: &str, disable_spinner: bool) -> Result<ExecuteResult> {
        let started = Instant::now();
        // one transaction per batch, so a failing statement leaves nothing behind
        let tx = self.connection.transaction()?;
        tx.execute_batch(sql)?;
        tx.commit()?;
        let elapsed = started.elapsed();
        if disable_spinner {
            debug!(ms = elapsed.as_secs_f64() * 1000.0, bytes = sql.len(), "batch executed");
        } else {
            info!(ms = elapsed.as_secs_f64() * 1000.0, bytes = sql.len(), "batch executed");
        }
        Ok(ExecuteResult { elapsed })
    }

    fn load_schema(&mut self) -> Result<()> {
        let mut statement = self
            .connection
            .prepare("select name from sqlite_temp_master where type = 'table' order by name")?;
        let names = statement.query_map([], |row| row.get::<_, String>(0))?;
        let mut tables = Vec::new();
        for name in names {
            tables.push(name?);
        }
        drop(statement);
        debug!(tables = tables.len(), "schema loaded");
        self.tables = tables;
        Ok(())
    }

    fn query(&mut self, sql: &str) -> Result<QueryRows> {
        let mut statement = self.connection.prepare(sql)?;
        if !statement.readonly() {
            return Err(IntrospectError::Persistence("only read-only statements can be queried".to_string()));
        }
        let columns: Vec<String> = statement.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();
        let mut rows = Vec::new();
        let mut cursor = statement.query([])?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(to_json(row.get_ref(i)?));
            }
            rows.push(values);
        }
        Ok(QueryRows { columns, rows })
    }
}

fn to_json(value: ValueRef) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) | ValueRef::Blob(t) => {
            serde_json::Value::String(String::from_utf8_lossy(t).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_is_atomic() {
        let mut client = SqliteClient::open(&PersistenceMode::InMemory).unwrap();
        client.execute_sync("create table t (a integer);", true).unwrap();
        let err = client
            .execute_sync("insert into t (a) values(1);\ninsert into missing (a) values(2);", true)
            .unwrap_err();
        assert!(matches!(err, IntrospectError::Persistence(_)));
        let rows = client.query("select count(*) as n from t").unwrap();
        assert_eq!(rows.rows[0][0], serde_json::json!(0));
    }

    #[test]
    fn load_schema_sees_temp_tables() {
        let mut client = SqliteClient::open(&PersistenceMode::InMemory).unwrap();
        assert!(client.tables().is_empty());
        client.execute_sync("create temp table b (x text);\ncreate temp table a (x text);", true).unwrap();
        client.load_schema().unwrap();
        assert_eq!(client.tables(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn query_rejects_writes() {
        let mut client = SqliteClient::open(&PersistenceMode::InMemory).unwrap();
        client.execute_sync("create temp table t (a integer);", true).unwrap();
        let err = client.query("delete from t").unwrap_err();
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn query_converts_values() {
        let mut client = SqliteClient::open(&PersistenceMode::InMemory).unwrap();
        let rows = client.query("select 1 as i, 1.5 as r, 'x' as t, null as n").unwrap();
        assert_eq!(rows.columns, vec!["i", "r", "t", "n"]);
        assert_eq!(rows.rows[0], vec![serde_json::json!(1), serde_json::json!(1.5), serde_json::json!("x"), serde_json::Value::Null]);
    }
}
