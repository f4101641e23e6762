//! introspect CLI - load a workspace and expose it as introspection tables.

use clap::{Parser, Subcommand};
use introspect::introspect::{create_introspection_tables, create_script, update_script, CancelToken};
use introspect::persist::{SqlClient, SqliteClient};
use introspect::resource::WorkspaceResources;
use introspect::settings::IntrospectionConfig;
use introspect::{server, IntrospectError, Result};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "introspect")]
#[command(about = "Expose workspace resources as SQL introspection tables")]
#[command(version)]
struct Cli {
    /// Path to a configuration file (toml, yaml or json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Workspace resources as JSON
    workspace: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the generated SQL script
    Script {
        /// Print the clear-and-repopulate script instead of the create script
        #[arg(long)]
        update: bool,
    },
    /// Create the tables and run a read-only query against them
    Query {
        sql: String,
    },
    /// Create the tables and serve read-only queries over HTTP
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,
    },
}

fn load_workspace(path: &Path) -> Result<WorkspaceResources> {
    let text = std::fs::read_to_string(path)?;
    WorkspaceResources::from_json(&text)
}

fn prepare(config: &IntrospectionConfig, resources: &WorkspaceResources) -> Result<SqliteClient> {
    let mut client = SqliteClient::open(&config.persistence)?;
    create_introspection_tables(resources, &mut client, &config.tables, &CancelToken::new())?;
    Ok(client)
}

async fn run(cli: Cli) -> Result<()> {
    let config = IntrospectionConfig::load(cli.config.as_deref())?;
    let resources = load_workspace(&cli.workspace)?;
    info!(entries = resources.len(), workspace = %cli.workspace.display(), "workspace loaded");

    match cli.command {
        Commands::Script { update } => {
            let script = if update {
                update_script(&resources, &config.tables)?
            } else {
                create_script(&resources, &config.tables)?
            };
            println!("{script}");
        }
        Commands::Query { sql } => {
            let mut client = prepare(&config, &resources)?;
            let rows = client.query(&sql)?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Commands::Serve { bind } => {
            let client = prepare(&config, &resources)?;
            let bind = bind.unwrap_or(config.server.bind);
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .map_err(|e| IntrospectError::Config(format!("cannot bind {bind}: {e}")))?;
            info!(%bind, "serving introspection queries");
            axum::serve(listener, server::router(Arc::new(Mutex::new(client))))
                .await
                .map_err(|e| IntrospectError::Config(format!("server on {bind} stopped: {e}")))?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "introspect failed");
            ExitCode::FAILURE
        }
    }
}
