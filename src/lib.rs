//! Introspect – expose loaded workspace resources as SQL tables.
//!
//! A workspace holds controls, queries, benchmarks, mods, variables and
//! cross-references. This crate turns them into SQL text that creates and
//! populates one temporary *introspection table* per resource kind, so the
//! loaded configuration can be inspected with ordinary SQL:
//!
//! ```sql
//! select resource_name, severity, mod_name from steampipe_control where severity = 'high';
//! ```
//!
//! ## Modules
//! * [`column`] – Column metadata: ordered, static descriptor tables mapping a
//!   record's fields to `(column name, SQL type, accessor)`.
//! * [`datatype`] – [`datatype::ColumnType`] and the self-describing
//!   [`datatype::DynamicValue`] used for variable defaults and arguments.
//! * [`format`] – Formatting runtime values into SQL literals.
//! * [`resource`] – The six resource kinds, their shared
//!   [`resource::ResourceMetadata`] and the [`resource::WorkspaceResources`] collections.
//! * [`sql`] – `create temp table`, `delete from` and `insert into` text.
//! * [`introspect`] – Creating and updating the tables through a [`persist::SqlClient`].
//! * [`persist`] – The client trait plus the SQLite implementation.
//! * [`settings`] – Table names, persistence mode and server address.
//! * [`server`] – HTTP endpoint for read-only queries over the tables.
//!
//! ## Column order
//! Column order is the declaration order of a kind's descriptor table,
//! followed by the metadata columns. It never depends on runtime values, and
//! every `insert into` lists its columns in that same order. Fields that hold
//! no value are left out of the insert; their column still exists.
//!
//! ## Quick Start
//! ```
//! use introspect::introspect::{create_introspection_tables, CancelToken};
//! use introspect::persist::{SqlClient, SqliteClient};
//! use introspect::resource::{Control, WorkspaceResources};
//! use introspect::settings::{PersistenceMode, TableNames};
//!
//! let mut resources = WorkspaceResources::new();
//! resources.add(Control {
//!     short_name: "my_check".into(),
//!     full_name: "control.my_check".into(),
//!     severity: Some("high".into()),
//!     ..Default::default()
//! });
//! let mut client = SqliteClient::open(&PersistenceMode::InMemory).unwrap();
//! let tables = TableNames::default();
//! create_introspection_tables(&resources, &mut client, &tables, &CancelToken::new()).unwrap();
//! let rows = client.query("select severity from steampipe_control").unwrap();
//! assert_eq!(rows.rows[0][0], "high");
//! ```

pub mod column;
pub mod datatype;
pub mod error;
pub mod format;
pub mod introspect;
pub mod persist;
pub mod resource;
pub mod server;
pub mod settings;
pub mod sql;

pub use error::{IntrospectError, Phase, Result};
