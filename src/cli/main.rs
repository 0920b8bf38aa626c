//! CLI binary entry point for log-ingest

use clap::{Parser, Subcommand};
use log_ingest_sdk::cli::commands::ReportFormat;
use log_ingest_sdk::cli::commands::db::{
    DbInitArgs, DbStatusArgs, handle_db_init, handle_db_status,
};
use log_ingest_sdk::cli::commands::ingest::{IngestArgs, handle_ingest};
use log_ingest_sdk::cli::commands::query::{QueryArgs, handle_query};
use log_ingest_sdk::cli::commands::stats::{StatsArgs, handle_stats};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "log-ingest")]
#[command(about = "Parse, summarise and deduplicate-ingest log files")]
#[command(version)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print level and module statistics for a log file
    Stats {
        /// Log file to analyse
        file: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: ReportFormatArg,
    },

    /// Report on a log file and ingest it into the workspace store
    Ingest {
        /// Log file to ingest
        file: PathBuf,
        /// Workspace path (default: current directory)
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
        /// Name recorded on the ingest (default: the file name)
        #[arg(short, long)]
        name: Option<String>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: ReportFormatArg,
        /// Ingest into a throwaway in-memory store
        #[arg(long)]
        dry_run: bool,
    },

    /// Database management commands
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },

    /// Execute SQL queries against the workspace database
    ///
    /// The named queries `levels`, `modules` and `incomplete` may be used in
    /// place of SQL.
    Query {
        /// SQL query (or preset name) to execute
        sql: String,
        /// Workspace path (default: current directory)
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
        /// Output format (table, json, csv)
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

#[derive(Subcommand)]
enum DbCommands {
    /// Initialize the database for a workspace
    Init {
        /// Workspace path
        #[arg(default_value = ".")]
        workspace: PathBuf,
        /// Database backend (duckdb, postgres)
        #[arg(short, long, default_value = "duckdb")]
        backend: String,
        /// PostgreSQL connection string (required for postgres backend)
        #[arg(long)]
        connection_string: Option<String>,
    },

    /// Show stored rows and recent ingests
    Status {
        /// Workspace path
        #[arg(default_value = ".")]
        workspace: PathBuf,
        /// Number of recent ingests to list
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ReportFormatArg {
    Text,
    Json,
}

impl From<ReportFormatArg> for ReportFormat {
    fn from(format: ReportFormatArg) -> Self {
        match format {
            ReportFormatArg::Text => ReportFormat::Text,
            ReportFormatArg::Json => ReportFormat::Json,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Stats { file, format } => handle_stats(&StatsArgs {
            file,
            format: format.into(),
        }),

        Commands::Ingest {
            file,
            workspace,
            name,
            format,
            dry_run,
        } => {
            let args = IngestArgs {
                file,
                workspace,
                name,
                format: format.into(),
                dry_run,
            };
            handle_ingest(&args)
        }

        Commands::Db { command } => match command {
            DbCommands::Init {
                workspace,
                backend,
                connection_string,
            } => {
                let args = DbInitArgs {
                    workspace,
                    backend,
                    connection_string,
                };
                handle_db_init(&args)
            }
            DbCommands::Status { workspace, limit } => {
                handle_db_status(&DbStatusArgs { workspace, limit })
            }
        },

        Commands::Query {
            sql,
            workspace,
            format,
        } => {
            let args = QueryArgs {
                sql,
                workspace,
                format,
            };
            handle_query(&args)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
