//! Backend HTTP client
//!
//! Issues compiled SQL against the backend's query endpoint and pings
//! its health endpoint. The private and cloud API flavors differ in how
//! a request is shaped (SQL text body with basic auth vs JSON body with
//! an API key), so request sending sits behind the [`QueryApi`] trait.
//!
//! Transport failures are classified so callers can tell "the backend
//! rejected this query" from "the backend is unreachable" from the
//! compiler/decoder errors raised elsewhere in the pipeline.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;

use crate::config::{BackendMode, DatasourceConfig};

/// Errors from talking to the backend
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request did not complete within the configured timeout
    #[error("backend request timed out")]
    Timeout,

    /// The backend could not be reached at all
    #[error("backend unreachable: {0}")]
    Unavailable(String),

    /// Any other transport-level failure
    #[error("request failed: {0}")]
    Request(reqwest::Error),

    /// The backend answered with a non-2xx status
    #[error("backend returned status {status}: {message}")]
    Backend { status: u16, message: String },
}

impl ClientError {
    fn classify(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Unavailable(err.to_string())
        } else {
            Self::Request(err)
        }
    }
}

/// Decode the backend's error envelope into a [`ClientError::Backend`]
///
/// The backend reports errors as `{"error_code": ..,
/// "error_message": ..}` or `{"message": ..}`; anything else is carried
/// through as raw text.
fn backend_error(status: StatusCode, body: &[u8]) -> ClientError {
    let fields: HashMap<String, String> = serde_json::from_slice(body).unwrap_or_default();

    let message = if let Some(code) = fields.get("error_code") {
        format!(
            "[{code}] {}",
            fields.get("error_message").map(String::as_str).unwrap_or("")
        )
    } else if let Some(message) = fields.get("message") {
        message.clone()
    } else {
        String::from_utf8_lossy(body).into_owned()
    };

    ClientError::Backend {
        status: status.as_u16(),
        message,
    }
}

/// Shapes and sends requests for one backend API flavor
#[async_trait]
pub trait QueryApi: Send + Sync {
    /// Issue a SQL query
    async fn send_query(&self, http: &Client, sql: &str) -> Result<Response, reqwest::Error>;

    /// Issue a health-check ping
    async fn send_ping(&self, http: &Client) -> Result<Response, reqwest::Error>;
}

/// Self-hosted backend: SQL text body, connection options in the query
/// string, optional basic auth
pub struct PrivateApi {
    query_url: String,
    ping_url: String,
    basic_auth: Option<(String, String)>,
}

impl PrivateApi {
    pub fn new(config: &DatasourceConfig) -> Self {
        let base = config.base_url();
        let mut params: Vec<String> = Vec::new();
        if !config.database.is_empty() {
            params.push(format!("db={}", urlencoding::encode(&config.database)));
        }
        if !config.tenant.is_empty() {
            params.push(format!("tenant={}", urlencoding::encode(&config.tenant)));
        }
        if config.target_partitions != 0 {
            params.push(format!("target_partitions={}", config.target_partitions));
        }
        if config.use_chunked_response {
            params.push("chunked".to_string());
        }

        let mut query_url = format!("{base}/api/v1/sql");
        if !params.is_empty() {
            query_url.push('?');
            query_url.push_str(&params.join("&"));
        }

        let basic_auth = if config.use_basic_auth {
            Some((config.user.clone(), config.password.clone()))
        } else {
            None
        };

        Self {
            query_url,
            ping_url: format!("{base}/api/v1/ping"),
            basic_auth,
        }
    }

    #[cfg(test)]
    fn query_url(&self) -> &str {
        &self.query_url
    }
}

#[async_trait]
impl QueryApi for PrivateApi {
    async fn send_query(&self, http: &Client, sql: &str) -> Result<Response, reqwest::Error> {
        let mut request = http
            .post(&self.query_url)
            .header("Accept", "application/json")
            .body(sql.to_string());
        if let Some((user, password)) = &self.basic_auth {
            request = request.basic_auth(user, Some(password));
        }
        request.send().await
    }

    async fn send_ping(&self, http: &Client) -> Result<Response, reqwest::Error> {
        http.get(&self.ping_url).send().await
    }
}

/// Managed cloud backend: JSON body carrying the API key and database
pub struct CloudApi {
    query_url: String,
    ping_url: String,
    api_key: String,
    database: String,
}

impl CloudApi {
    pub fn new(config: &DatasourceConfig) -> Self {
        let base = config.base_url();
        Self {
            query_url: format!("{base}/api/v1/sql"),
            ping_url: format!(
                "{base}/api/v1/ping?apikey={}",
                urlencoding::encode(&config.api_key)
            ),
            api_key: config.api_key.clone(),
            database: config.database.clone(),
        }
    }
}

#[async_trait]
impl QueryApi for CloudApi {
    async fn send_query(&self, http: &Client, sql: &str) -> Result<Response, reqwest::Error> {
        http.post(&self.query_url)
            .header("Accept", "application/json")
            .json(&serde_json::json!({
                "apikey": self.api_key,
                "database": self.database,
                "sql": sql,
            }))
            .send()
            .await
    }

    async fn send_ping(&self, http: &Client) -> Result<Response, reqwest::Error> {
        http.get(&self.ping_url).send().await
    }
}

/// HTTP client to the backend, parameterized by API flavor
pub struct BackendClient {
    http: Client,
    api: Box<dyn QueryApi>,
}

impl BackendClient {
    /// Build a client for the configured backend
    pub fn new(config: &DatasourceConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(ClientError::Request)?;

        let api: Box<dyn QueryApi> = match config.mode {
            BackendMode::Private => Box::new(PrivateApi::new(config)),
            BackendMode::Cloud => Box::new(CloudApi::new(config)),
        };

        Ok(Self { http, api })
    }

    /// Execute a SQL query, returning the raw response body
    pub async fn query(&self, sql: &str) -> Result<Vec<u8>, ClientError> {
        let response = self
            .api
            .send_query(&self.http, sql)
            .await
            .map_err(ClientError::classify)?;

        let status = response.status();
        let body = response.bytes().await.map_err(ClientError::classify)?;
        if !status.is_success() {
            return Err(backend_error(status, &body));
        }
        Ok(body.to_vec())
    }

    /// Ping the backend, returning its health detail body
    pub async fn ping(&self) -> Result<Vec<u8>, ClientError> {
        let response = self
            .api
            .send_ping(&self.http)
            .await
            .map_err(ClientError::classify)?;

        let status = response.status();
        let body = response.bytes().await.map_err(ClientError::classify)?;
        if !status.is_success() {
            return Err(backend_error(status, &body));
        }
        Ok(body.to_vec())
    }
}
