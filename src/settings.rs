//! Configuration: the introspection table names, where the SQL engine keeps
//! its data and where the query server listens.
//!
//! Settings are layered: built-in defaults, an optional file (format picked
//! from its extension) and `INTROSPECT_*` environment variables, e.g.
//! `INTROSPECT_TABLES__CONTROL=my_controls`.

use std::path::Path;

use config::{Config, Environment, File};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{IntrospectError, Result};
use crate::resource::ResourceKind;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// One table name per resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub control: String,
    pub query: String,
    pub benchmark: String,
    #[serde(rename = "mod")]
    pub mod_: String,
    pub variable: String,
    pub reference: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            control: "steampipe_control".to_string(),
            query: "steampipe_query".to_string(),
            benchmark: "steampipe_benchmark".to_string(),
            mod_: "steampipe_mod".to_string(),
            variable: "steampipe_variable".to_string(),
            reference: "steampipe_reference".to_string(),
        }
    }
}

impl TableNames {
    pub fn table_for(&self, kind: ResourceKind) -> &str {
        match kind {
            ResourceKind::Control => &self.control,
            ResourceKind::Query => &self.query,
            ResourceKind::Benchmark => &self.benchmark,
            ResourceKind::Mod => &self.mod_,
            ResourceKind::Variable => &self.variable,
            ResourceKind::Reference => &self.reference,
        }
    }
    /// All table names, in [`ResourceKind::ALL`] order.
    pub fn all(&self) -> Vec<&str> {
        ResourceKind::ALL.iter().map(|kind| self.table_for(*kind)).collect()
    }
    /// Table names are spliced into SQL text, so they must be plain identifiers.
    pub fn validate(&self) -> Result<()> {
        let mut seen = Vec::new();
        for kind in ResourceKind::ALL {
            let name = self.table_for(kind);
            if !IDENTIFIER.is_match(name) {
                return Err(IntrospectError::Config(format!(
                    "table name '{name}' for {kind} is not a valid identifier"
                )));
            }
            if seen.contains(&name) {
                return Err(IntrospectError::Config(format!(
                    "table name '{name}' is used for more than one resource kind"
                )));
            }
            seen.push(name);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceMode {
    #[default]
    InMemory,
    File(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "127.0.0.1:8080".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IntrospectionConfig {
    pub tables: TableNames,
    pub persistence: PersistenceMode,
    pub server: ServerConfig,
}

impl IntrospectionConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings = builder
            .add_source(Environment::with_prefix("INTROSPECT").prefix_separator("_").separator("__"))
            .build()?;
        let loaded: IntrospectionConfig = settings.try_deserialize()?;
        loaded.tables.validate()?;
        Ok(loaded)
    }
}
