//! Creating and refreshing the introspection tables.
//!
//! [`create_introspection_tables`] is called once per session, when the tables
//! do not exist yet. [`update_introspection_tables`] is called whenever the
//! workspace reloads; it clears and repopulates the existing tables. Both
//! build the whole script first and hand it to the client as a single batch.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{IntrospectError, Phase, Result};
use crate::persist::SqlClient;
use crate::resource::WorkspaceResources;
use crate::settings::TableNames;
use crate::sql::{clear_all_sql, create_all_sql, insert_all_sql};

/// Cancellation signal supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);
impl CancelToken {
    pub fn new() -> Self { Self(Arc::new(AtomicBool::new(false))) }
    pub fn cancel(&self) { self.0.store(true, Ordering::SeqCst); }
    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::Relaxed) }
}

/// Full script creating and populating the tables.
pub fn create_script(resources: &WorkspaceResources, tables: &TableNames) -> Result<String> {
    Ok([create_all_sql(tables), insert_all_sql(resources, tables)?].join("\n"))
}

/// Full script clearing and repopulating existing tables.
pub fn update_script(resources: &WorkspaceResources, tables: &TableNames) -> Result<String> {
    Ok([clear_all_sql(tables), insert_all_sql(resources, tables)?].join("\n"))
}

/// Create the tables, populate them and reload the client's schema.
///
/// Cancellation cannot interrupt the batch; a token cancelled by the time the
/// batch completes turns the result into [`IntrospectError::Cancelled`].
pub fn create_introspection_tables<C: SqlClient + ?Sized>(
    resources: &WorkspaceResources,
    client: &mut C,
    tables: &TableNames,
    cancel: &CancelToken,
) -> Result<()> {
    tables.validate()?;
    let started = Instant::now();
    debug!("create introspection tables start");
    let sql = create_script(resources, tables)?;
    // true: no spinner for a batch the user did not ask for
    client
        .execute_sync(&sql, true)
        .map_err(|e| execution_failed(Phase::Create, e))?;
    client
        .load_schema()
        .map_err(|e| execution_failed(Phase::Create, e))?;
    info!(ms = started.elapsed().as_secs_f64() * 1000.0, "introspection tables created");
    if cancel.is_cancelled() {
        return Err(IntrospectError::Cancelled);
    }
    Ok(())
}

/// Clear the existing tables and repopulate them. Table shapes do not change,
/// so the schema is not reloaded.
pub fn update_introspection_tables<C: SqlClient + ?Sized>(
    resources: &WorkspaceResources,
    client: &mut C,
    tables: &TableNames,
) -> Result<()> {
    tables.validate()?;
    let started = Instant::now();
    debug!("update introspection tables start");
    let sql = update_script(resources, tables)?;
    client
        .execute_sync(&sql, true)
        .map_err(|e| execution_failed(Phase::Update, e))?;
    info!(ms = started.elapsed().as_secs_f64() * 1000.0, "introspection tables updated");
    Ok(())
}

fn execution_failed(phase: Phase, e: IntrospectError) -> IntrospectError {
    warn!(%phase, error = %e, "introspection batch failed");
    IntrospectError::Execution { phase, message: e.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::{ExecuteResult, QueryRows};
    use crate::resource::Control;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        batches: Vec<String>,
        schema_loads: usize,
        fail: bool,
        fail_schema: bool,
    }

    impl SqlClient for Recorder {
        fn execute_sync(&mut self, sql: &str, disable_spinner: bool) -> Result<ExecuteResult> {
            assert!(disable_spinner);
            self.batches.push(sql.to_string());
            if self.fail {
                return Err(IntrospectError::Persistence("connection reset".into()));
            }
            Ok(ExecuteResult { elapsed: Duration::ZERO })
        }
        fn load_schema(&mut self) -> Result<()> {
            self.schema_loads += 1;
            if self.fail_schema {
                return Err(IntrospectError::Persistence("no such table: sqlite_temp_master".into()));
            }
            Ok(())
        }
        fn query(&mut self, _sql: &str) -> Result<QueryRows> {
            Ok(QueryRows { columns: Vec::new(), rows: Vec::new() })
        }
    }

    fn resources() -> WorkspaceResources {
        let mut resources = WorkspaceResources::new();
        resources.add(Control { short_name: "c".into(), full_name: "control.c".into(), ..Default::default() });
        resources
    }

    #[test]
    fn create_runs_one_batch_and_reloads_schema() {
        let mut client = Recorder::default();
        create_introspection_tables(&resources(), &mut client, &TableNames::default(), &CancelToken::new()).unwrap();
        assert_eq!(client.batches.len(), 1);
        assert_eq!(client.schema_loads, 1);
        assert!(!client.batches[0].contains("delete from"));
    }

    #[test]
    fn update_clears_before_inserting_and_skips_schema_reload() {
        let mut client = Recorder::default();
        update_introspection_tables(&resources(), &mut client, &TableNames::default()).unwrap();
        let batch = &client.batches[0];
        assert!(!batch.contains("create temp table"));
        let last_delete = batch.rfind("delete from").unwrap();
        let first_insert = batch.find("insert into").unwrap();
        assert!(last_delete < first_insert);
        assert_eq!(client.schema_loads, 0);
    }

    #[test]
    fn cancellation_is_reported_after_success() {
        let mut client = Recorder::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = create_introspection_tables(&resources(), &mut client, &TableNames::default(), &cancel).unwrap_err();
        assert!(matches!(err, IntrospectError::Cancelled));
        // the batch still ran
        assert_eq!(client.batches.len(), 1);
        assert_eq!(client.schema_loads, 1);
    }

    #[test]
    fn execution_errors_name_the_phase() {
        let mut client = Recorder { fail: true, ..Default::default() };
        let err = create_introspection_tables(&resources(), &mut client, &TableNames::default(), &CancelToken::new()).unwrap_err();
        assert_eq!(err.to_string(), "failed to create introspection tables: Persistence error: connection reset");
        assert_eq!(client.schema_loads, 0);
        let err = update_introspection_tables(&resources(), &mut client, &TableNames::default()).unwrap_err();
        assert!(matches!(err, IntrospectError::Execution { phase: Phase::Update, .. }));
    }

    #[test]
    fn schema_reload_errors_name_the_create_phase() {
        let mut client = Recorder { fail_schema: true, ..Default::default() };
        let err = create_introspection_tables(&resources(), &mut client, &TableNames::default(), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, IntrospectError::Execution { phase: Phase::Create, .. }));
        assert!(err.to_string().starts_with("failed to create introspection tables:"));
    }

    #[test]
    fn invalid_table_names_are_rejected_before_execution() {
        let tables = TableNames { benchmark: "x; drop table y".into(), ..Default::default() };
        let mut client = Recorder::default();
        let err = create_introspection_tables(&resources(), &mut client, &tables, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, IntrospectError::Config(_)));
        let err = update_introspection_tables(&resources(), &mut client, &tables).unwrap_err();
        assert!(matches!(err, IntrospectError::Config(_)));
        assert!(client.batches.is_empty());
    }
}
