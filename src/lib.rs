//! # Timegrid
//!
//! Query translation and result shaping for a SQL-over-HTTP time-series
//! backend. Timegrid sits between a dashboard panel and the database:
//! it compiles the panel's structured query description into SQL, turns
//! the backend's loosely-typed JSON rows back into strongly-typed,
//! time-indexed columns, and optionally resamples them onto a regular
//! time grid with a configurable gap-fill policy.
//!
//! ## Pipeline
//!
//! ```text
//! QueryModel → introspect → build SQL → HTTP → decode → resample → Frame
//! ```
//!
//! ## Modules
//!
//! - [`query`]: the Query Model Compiler (panel JSON → SQL text)
//! - [`frame`]: columnar tables and the Result Decoder
//! - [`resample`]: bucket-grid regularization with gap filling
//! - [`timefmt`]: multi-precision timestamp and interval parsing
//! - [`client`]: HTTP client to the backend's query endpoint
//! - [`datasource`]: per-query pipeline orchestration and health checks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use timegrid::{Config, DataQuery, Datasource, TimeRange};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let datasource = Datasource::new(&config)?;
//!
//!     let query = DataQuery {
//!         ref_id: "A".to_string(),
//!         json: serde_json::json!({
//!             "table": "cpu",
//!             "select": [[
//!                 { "type": "field", "params": ["usage"] },
//!                 { "type": "avg" }
//!             ]],
//!             "groupBy": [
//!                 { "type": "time", "params": ["10 minutes"] },
//!                 { "type": "fill", "params": ["previous"] }
//!             ]
//!         }),
//!         time_range: TimeRange::last_hours(6),
//!     };
//!
//!     let frame = datasource.query(&query).await?;
//!     println!("{} rows, {} columns", frame.row_count(), frame.columns.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod datasource;
pub mod frame;
pub mod query;
pub mod resample;
pub mod timefmt;

// Re-export top-level types for convenience
pub use client::{BackendClient, ClientError, CloudApi, PrivateApi, QueryApi};

pub use config::{BackendMode, Config, ConfigError, DatasourceConfig, LoggingConfig};

pub use datasource::{DataQuery, Datasource, DatasourceError, HealthStatus};

pub use frame::{
    Column, ColumnKind, ColumnValues, DecodeError, Frame, Notice, NoticeSeverity, decode,
};

pub use query::{
    GroupByOp, OrderByTime, QueryError, QueryModel, SelectOp, substitute_variables,
};

pub use resample::{FillPolicy, ResampleError, resample};

pub use timefmt::{parse_interval_string, parse_time_string, TimeRange, TimestampLayout};
