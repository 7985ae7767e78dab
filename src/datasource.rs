//! Datasource orchestration
//!
//! Drives the per-query pipeline: deserialize the panel's query model,
//! introspect and compile it to SQL, issue the SQL against the backend,
//! decode the response into a frame, and resample when the panel asked
//! for gap filling. A batch of panel queries runs concurrently; each
//! query's chain is independent and one failure never corrupts another
//! query's result.

use std::collections::HashMap;

use futures_util::future::join_all;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::client::{BackendClient, ClientError};
use crate::config::Config;
use crate::frame::{decode, DecodeError, Frame, NoticeSeverity};
use crate::query::{QueryError, QueryModel};
use crate::resample::{resample, FillPolicy};
use crate::timefmt::{parse_interval_string, TimeRange};

/// One panel query as received from the caller
#[derive(Debug, Clone)]
pub struct DataQuery {
    /// Caller-chosen identifier echoed back with the result
    pub ref_id: String,
    /// The query model JSON
    pub json: serde_json::Value,
    /// Requested time range
    pub time_range: TimeRange,
}

/// Anything that can fail a single panel query
///
/// The variants keep the failure classes distinguishable: a rejected
/// model, a corrupt backend payload, and backend/transport trouble are
/// different conversations with the user.
#[derive(Error, Debug)]
pub enum DatasourceError {
    /// The query JSON does not deserialize into a model
    #[error("invalid query model: {0}")]
    InvalidModel(#[from] serde_json::Error),

    /// The model failed validation or compilation
    #[error("query rejected: {0}")]
    Query(#[from] QueryError),

    /// The backend's response body could not be decoded
    #[error("response decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// Transport failure or backend-side rejection
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Health-check outcome
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub ok: bool,
    pub message: String,
    /// The backend's ping detail body, when it returned JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

/// The connector: owns the backend client and runs query pipelines
pub struct Datasource {
    client: BackendClient,
    variables: HashMap<String, String>,
}

impl Datasource {
    /// Create a datasource for the configured backend
    pub fn new(config: &Config) -> Result<Self, DatasourceError> {
        Ok(Self {
            client: BackendClient::new(&config.datasource)?,
            variables: HashMap::new(),
        })
    }

    /// Set the dashboard variables substituted into raw queries
    pub fn with_variables(mut self, variables: HashMap<String, String>) -> Self {
        self.variables = variables;
        self
    }

    /// Execute a batch of panel queries concurrently
    ///
    /// Results are keyed by `ref_id`; a failed query only fails its own
    /// entry.
    pub async fn query_all(
        &self,
        queries: Vec<DataQuery>,
    ) -> HashMap<String, Result<Frame, DatasourceError>> {
        let results = join_all(queries.into_iter().map(|query| async move {
            let result = self.query(&query).await;
            (query.ref_id, result)
        }))
        .await;
        results.into_iter().collect()
    }

    /// Execute one panel query end to end
    pub async fn query(&self, query: &DataQuery) -> Result<Frame, DatasourceError> {
        let request_id = Uuid::new_v4();

        let mut model: QueryModel = serde_json::from_value(query.json.clone())?;
        model.introspect()?;
        let sql = model.build(&query.time_range, &self.variables)?;
        tracing::debug!(%request_id, ref_id = %query.ref_id, %sql, "compiled panel query");

        let body = self.client.query(&sql).await?;
        let mut frame = decode(&body)?;
        tracing::debug!(
            %request_id,
            rows = frame.row_count(),
            columns = frame.columns.len(),
            "decoded backend response"
        );

        if !frame.is_empty() {
            if let Some(directive) = model.fill() {
                let interval = model.interval().unwrap_or("");
                apply_fill(&mut frame, directive, interval, query.time_range);
            }
        }

        Ok(frame)
    }

    /// Ping the backend and report its health
    pub async fn check_health(&self) -> HealthStatus {
        match self.client.ping().await {
            Ok(body) => HealthStatus {
                ok: true,
                message: "Data source is working".to_string(),
                detail: serde_json::from_slice(&body).ok(),
            },
            Err(err) => HealthStatus {
                ok: false,
                message: format!("Ping failed: {err}"),
                detail: None,
            },
        }
    }
}

/// Resample per the panel's fill directive
///
/// A directive that fails to parse demotes to a warning notice on the
/// un-resampled frame rather than failing the query; an interval that
/// parses to zero means resampling was never meaningfully requested.
fn apply_fill(frame: &mut Frame, directive: &str, interval: &str, range: TimeRange) {
    let policy = match directive.parse::<FillPolicy>() {
        Ok(policy) => policy,
        Err(err) => {
            tracing::warn!(%err, "fill directive rejected, returning un-resampled result");
            frame.add_notice(NoticeSeverity::Warning, err.to_string());
            return;
        }
    };

    let bucket = parse_interval_string(interval);
    if bucket != chrono::Duration::zero() {
        *frame = resample(frame, bucket, range, policy);
    }
}
