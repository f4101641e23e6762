//! SQL text for the introspection tables.
//!
//! Everything here is pure string building: `create temp table` statements
//! from the column descriptors, `delete from` statements to clear the tables
//! and `insert into` statements from live resources. Statements are
//! semicolon terminated and joined with newlines.

use std::collections::HashSet;
use std::hash::BuildHasherDefault;
use std::time::Instant;

use seahash::SeaHasher;
use tracing::debug;

use crate::column::{columns_for, values_for, Introspectable};
use crate::error::Result;
use crate::format::format_value;
use crate::resource::{
    Benchmark, Control, Mod, Query, Resource, ResourceMetadata, ResourceReference, Variable,
    WorkspaceResources,
};
use crate::settings::TableNames;

pub type NameHasher = BuildHasherDefault<SeaHasher>;

/// Column definitions (`  name  type`) for the declared columns of `T`.
pub fn column_definitions<T: Introspectable>() -> Vec<String> {
    columns_for::<T>()
        .iter()
        .map(|column| format!("  {}  {}", column.name, column.column_type))
        .collect()
}

/// `create temp table` for one resource kind: its own columns followed by the common ones.
pub fn create_table_sql<R: Resource>(table: &str, common_columns: &[String]) -> String {
    let mut definitions = column_definitions::<R>();
    definitions.extend_from_slice(common_columns);
    format!("create temp table {} (\n{}\n);", table, definitions.join(",\n"))
}

pub fn create_all_sql(tables: &TableNames) -> String {
    // columns which every table has
    let common = column_definitions::<ResourceMetadata>();
    [
        create_table_sql::<Control>(&tables.control, &common),
        create_table_sql::<Query>(&tables.query, &common),
        create_table_sql::<Benchmark>(&tables.benchmark, &common),
        create_table_sql::<Mod>(&tables.mod_, &common),
        create_table_sql::<Variable>(&tables.variable, &common),
        create_table_sql::<ResourceReference>(&tables.reference, &common),
    ]
    .join("\n")
}

pub fn clear_all_sql(tables: &TableNames) -> String {
    tables
        .all()
        .iter()
        .map(|table| format!("delete from {table};"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Column names and formatted literals for every value `item` holds.
fn column_values<T: Introspectable>(item: &T) -> Result<(Vec<&'static str>, Vec<String>)> {
    let mut columns = Vec::new();
    let mut values = Vec::new();
    for (column, value) in values_for(item) {
        values.push(format_value(&value, &column)?);
        columns.push(column.name);
    }
    Ok((columns, values))
}

/// `insert into` for one resource. Columns come in the same order as in
/// [`create_table_sql`]: the resource's own, then its metadata.
pub fn insert_sql<R: Resource>(resource: &R, table: &str) -> Result<String> {
    let (mut columns, mut values) = column_values(resource)?;
    if let Some(metadata) = resource.metadata() {
        let (metadata_columns, metadata_values) = column_values(metadata)?;
        columns.extend(metadata_columns);
        values.extend(metadata_values);
    }
    if columns.is_empty() {
        return Ok(format!("insert into {table} default values;"));
    }
    Ok(format!(
        "insert into {} ({}) values({});",
        table,
        columns.join(","),
        values.join(",")
    ))
}

// The maps hold the same resource keyed by long and short name; one insert per name.
fn insert_kind_sql<R: Resource>(
    resources: &WorkspaceResources,
    table: &str,
    statements: &mut Vec<String>,
) -> Result<()> {
    let mut added: HashSet<String, NameHasher> = HashSet::default();
    for resource in R::collection(resources).values() {
        if added.insert(resource.name()) {
            statements.push(insert_sql(resource, table)?);
        }
    }
    debug!(kind = %R::KIND, table, rows = added.len(), "generated insert statements");
    Ok(())
}

pub fn insert_all_sql(resources: &WorkspaceResources, tables: &TableNames) -> Result<String> {
    let started = Instant::now();
    let mut statements = Vec::new();
    insert_kind_sql::<Control>(resources, &tables.control, &mut statements)?;
    insert_kind_sql::<Query>(resources, &tables.query, &mut statements)?;
    insert_kind_sql::<Benchmark>(resources, &tables.benchmark, &mut statements)?;
    insert_kind_sql::<Mod>(resources, &tables.mod_, &mut statements)?;
    insert_kind_sql::<Variable>(resources, &tables.variable, &mut statements)?;
    insert_kind_sql::<ResourceReference>(resources, &tables.reference, &mut statements)?;
    debug!(
        statements = statements.len(),
        ms = started.elapsed().as_secs_f64() * 1000.0,
        "generated insert sql"
    );
    Ok(statements.join("\n"))
}
