//! d1kit: manage and query D1 databases, remotely or against local SQLite.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use d1kit::{Backend, Config, ReplicationMode};
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "d1kit", version)]
#[command(about = "Manage and query Cloudflare D1 databases, or emulate them locally")]
struct Cli {
    /// Configuration file (default: ~/.d1kit/config.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use the local SQLite emulator instead of the remote service
    #[arg(long, global = true)]
    local: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a database
    Create {
        /// Database name
        name: String,
    },
    /// Delete a database
    Delete {
        /// Database UUID or name
        db: String,
    },
    /// Show one database
    Get {
        /// Database UUID or name
        db: String,
    },
    /// List databases
    List,
    /// Change read replication
    Update {
        /// Database UUID or name
        db: String,
        #[arg(long, value_enum)]
        replication: ReplicationArg,
    },
    /// Execute one SQL statement
    Query {
        /// Database UUID or name
        db: String,
        /// SQL text
        sql: String,
        /// Positional parameter (repeatable)
        #[arg(short, long = "param")]
        params: Vec<String>,
        /// Use the raw (columnar) endpoint
        #[arg(long)]
        raw: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ReplicationArg {
    Auto,
    Disabled,
}

impl From<ReplicationArg> for ReplicationMode {
    fn from(arg: ReplicationArg) -> Self {
        match arg {
            ReplicationArg::Auto => Self::Auto,
            ReplicationArg::Disabled => Self::Disabled,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    if cli.local {
        config.backend = Backend::Local;
    }

    if config.backend == Backend::Local
        && !matches!(cli.command, Commands::Create { .. } | Commands::List)
    {
        warn!("Local databases are tracked in memory only; a new process cannot address them");
    }

    let session = d1kit::connect(&config).context("Failed to open session")?;
    let session = session.as_ref();

    match cli.command {
        Commands::Create { name } => commands::database::create(session, &name),
        Commands::Delete { db } => commands::database::delete(session, &db),
        Commands::Get { db } => commands::database::get(session, &db),
        Commands::List => commands::database::list(session),
        Commands::Update { db, replication } => {
            commands::database::update(session, &db, replication.into())
        }
        Commands::Query {
            db,
            sql,
            params,
            raw,
        } => commands::query::execute(session, &db, &sql, &params, raw),
    }
}

/// Initialize stderr logging. `RUST_LOG` overrides the default `warn` level.
fn init_logging(format: LogFormat) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}
