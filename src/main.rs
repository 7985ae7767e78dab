//! Timegrid CLI
//!
//! Command-line front end for the datasource pipeline: compile a panel
//! query model to SQL, run it against the backend, or ping the backend.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use timegrid::{
    parse_time_string, Config, DataQuery, Datasource, LoggingConfig, QueryModel, TimeRange,
};

#[derive(Parser)]
#[command(name = "timegrid", version, about = "Query a SQL-over-HTTP time-series backend with panel query models")]
struct Cli {
    /// Config file path (falls back to the standard locations)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a query model and execute it against the backend
    Query {
        /// Query model JSON file; reads stdin when omitted
        #[arg(long)]
        file: Option<PathBuf>,

        /// Range start, RFC 3339 or backend timestamp form (default: 6 hours ago)
        #[arg(long)]
        from: Option<String>,

        /// Range end (default: now)
        #[arg(long)]
        to: Option<String>,

        /// Print the compiled SQL instead of executing it
        #[arg(long)]
        sql_only: bool,

        /// Dashboard variable as name=value; repeatable
        #[arg(long = "var", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,
    },

    /// Ping the backend's health endpoint
    Ping,

    /// Print a commented default configuration file
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging);

    match cli.command {
        Command::Query {
            file,
            from,
            to,
            sql_only,
            vars,
        } => {
            let json = read_model(file.as_deref())?;
            let time_range = TimeRange::new(
                parse_time_flag(from.as_deref(), || Utc::now() - chrono::Duration::hours(6))?,
                parse_time_flag(to.as_deref(), Utc::now)?,
            );
            let vars = vars.into_iter().collect();

            if sql_only {
                let mut model: QueryModel = serde_json::from_value(json)?;
                model.introspect()?;
                println!("{}", model.build(&time_range, &vars)?);
                return Ok(());
            }

            let datasource = Datasource::new(&config)?.with_variables(vars);
            let frame = datasource
                .query(&DataQuery {
                    ref_id: "A".to_string(),
                    json,
                    time_range,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&frame)?);
        }

        Command::Ping => {
            let datasource = Datasource::new(&config)?;
            let health = datasource.check_health().await;
            println!("{}", serde_json::to_string_pretty(&health)?);
            if !health.ok {
                std::process::exit(1);
            }
        }

        Command::InitConfig => {
            print!("{}", timegrid::config::generate_default_config());
        }
    }

    Ok(())
}

/// Initialize tracing per the logging config; RUST_LOG wins when set
fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("timegrid={}", config.level)),
    );

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Read the query model JSON from a file or stdin
fn read_model(path: Option<&std::path::Path>) -> Result<serde_json::Value> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading query model from {path:?}"))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading query model from stdin")?;
            buf
        }
    };
    serde_json::from_str(&content).context("query model is not valid JSON")
}

/// Parse a --from/--to flag: RFC 3339 first, then the backend's own
/// timestamp layouts
fn parse_time_flag(
    flag: Option<&str>,
    default: impl FnOnce() -> DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let Some(s) = flag else {
        return Ok(default());
    };
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    parse_time_string(s).with_context(|| format!("'{s}' is not a recognized timestamp"))
}

/// Parse one name=value variable flag
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{s}'"))
}
