use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntrospectError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("data for column {column} is of type {kind} so column type should be '{expected}' but is actually {declared}")]
    ColumnType { column: String, kind: &'static str, expected: &'static str, declared: String },
    #[error("Serialization error in column {column}: {message}")]
    Serialization { column: String, message: String },
    #[error("failed to {phase} introspection tables: {message}")]
    Execution { phase: Phase, message: String },
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Lock poisoned: {0}")]
    Lock(String),
    #[error("Workspace error: {0}")]
    Workspace(String),
}

/// Which orchestration entry point was running when execution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Create,
    Update,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Phase::Create => write!(f, "create"),
            Phase::Update => write!(f, "update"),
        }
    }
}

pub type Result<T> = std::result::Result<T, IntrospectError>;

// Helper conversions
impl From<rusqlite::Error> for IntrospectError {
    fn from(e: rusqlite::Error) -> Self { Self::Persistence(e.to_string()) }
}
impl From<config::ConfigError> for IntrospectError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<serde_json::Error> for IntrospectError {
    fn from(e: serde_json::Error) -> Self { Self::Workspace(e.to_string()) }
}
impl From<std::io::Error> for IntrospectError {
    fn from(e: std::io::Error) -> Self { Self::Workspace(e.to_string()) }
}
