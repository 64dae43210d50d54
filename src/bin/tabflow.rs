//! Command-line surface over the ingestion service
//!
//! Thin adapter only: argument parsing and JSON printing live here, every
//! decision lives in the library.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tabflow::{
    parse_delimiter, ConnectionProfile, IngestService, JobSpec, JoinSpec, Projection,
    SelectSource, ServiceConfig, SourceSpec, TargetSpec,
};

#[derive(Parser)]
#[command(name = "tabflow", about = "Move tabular data between a ClickHouse store and flat files")]
struct Cli {
    /// Directory for exported and inspected files
    #[arg(long, default_value = "uploads", global = true)]
    output_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ConnectionArgs {
    #[arg(long, default_value = "localhost")]
    host: String,

    #[arg(long, default_value_t = 8123)]
    port: u16,

    #[arg(long, default_value = "default")]
    database: String,

    #[arg(long, default_value = "default")]
    user: String,

    /// Credential token; falls back to the CLICKHOUSE_TOKEN environment variable
    #[arg(long)]
    token: Option<String>,
}

impl ConnectionArgs {
    fn profile(&self) -> ConnectionProfile {
        let token = self
            .token
            .clone()
            .or_else(|| std::env::var("CLICKHOUSE_TOKEN").ok())
            .unwrap_or_default();
        ConnectionProfile::new(&self.host, self.port, &self.database, &self.user, token)
    }
}

#[derive(Args)]
struct SourceArgs {
    /// Source table (the join anchor when --join is given)
    #[arg(long)]
    table: String,

    /// Additional join table as `table:condition`, repeatable, applied in order
    #[arg(long = "join", value_name = "TABLE:CONDITION")]
    joins: Vec<String>,

    /// Columns to transfer, comma separated (qualified `table.column` for joins)
    #[arg(long, value_delimiter = ',', required = true)]
    columns: Vec<String>,
}

impl SourceArgs {
    fn select_source(&self) -> Result<SelectSource> {
        if self.joins.is_empty() {
            return Ok(SelectSource::Table(self.table.clone()));
        }
        let mut spec = JoinSpec::new(&self.table);
        for entry in &self.joins {
            let (table, condition) = entry
                .split_once(':')
                .context("--join expects TABLE:CONDITION")?;
            spec.join(table, condition)?;
        }
        Ok(SelectSource::Join(spec))
    }

    fn projection(&self) -> Result<Projection> {
        Ok(Projection::new(self.columns.clone())?)
    }
}

#[derive(Subcommand)]
enum Command {
    /// List tables in the database
    Tables {
        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// List columns of a table, in native order
    Columns {
        #[command(flatten)]
        connection: ConnectionArgs,
        #[arg(long)]
        table: String,
    },
    /// Sample the first rows of a store source
    Preview {
        #[command(flatten)]
        connection: ConnectionArgs,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Discover a delimited file's schema, sample, and row count
    Inspect {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value = "comma")]
        delimiter: String,
    },
    /// Export a store source to a delimited file
    Export {
        #[command(flatten)]
        connection: ConnectionArgs,
        #[command(flatten)]
        source: SourceArgs,
        /// Output file name inside the output directory
        #[arg(long)]
        out: String,
        #[arg(long, default_value = "comma")]
        delimiter: String,
    },
    /// Load a delimited file into a store table
    Load {
        #[command(flatten)]
        connection: ConnectionArgs,
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value = "comma")]
        delimiter: String,
        /// Destination table, created if absent with every column text-typed
        #[arg(long)]
        target_table: String,
        /// Columns to load, comma separated (must appear in the file header)
        #[arg(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,
        #[arg(long, default_value_t = 1000)]
        batch_size: usize,
    },
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = ServiceConfig::new(&cli.output_dir);
    if let Command::Load { batch_size, .. } = &cli.command {
        config = config.with_batch_size(*batch_size);
    }
    let service = IngestService::new(config);

    match cli.command {
        Command::Tables { connection } => {
            let tables = service.discover_tables(&connection.profile()).await?;
            print_json(&tables)?;
        }
        Command::Columns { connection, table } => {
            let columns = service
                .discover_columns(&connection.profile(), &table)
                .await?;
            print_json(&columns)?;
        }
        Command::Preview { connection, source } => {
            let spec = SourceSpec::Store {
                profile: connection.profile(),
                source: source.select_source()?,
            };
            let rows = service.preview(&spec, &source.projection()?).await?;
            print_json(&rows)?;
        }
        Command::Inspect { file, delimiter } => {
            let inspection = service
                .inspect_file(&file, parse_delimiter(&delimiter)?)
                .await?;
            print_json(&inspection)?;
        }
        Command::Export {
            connection,
            source,
            out,
            delimiter,
        } => {
            let spec = JobSpec {
                source: SourceSpec::Store {
                    profile: connection.profile(),
                    source: source.select_source()?,
                },
                target: TargetSpec::File {
                    file_name: out,
                    delimiter: parse_delimiter(&delimiter)?,
                },
                projection: source.projection()?,
            };
            let result = service.run_ingestion(spec).await?;
            print_json(&result)?;
        }
        Command::Load {
            connection,
            file,
            delimiter,
            target_table,
            columns,
            batch_size: _,
        } => {
            let spec = JobSpec {
                source: SourceSpec::File {
                    path: file,
                    delimiter: parse_delimiter(&delimiter)?,
                },
                target: TargetSpec::Store {
                    profile: connection.profile(),
                    table: target_table,
                },
                projection: Projection::new(columns)?,
            };
            let result = service.run_ingestion(spec).await?;
            print_json(&result)?;
        }
    }
    Ok(())
}
