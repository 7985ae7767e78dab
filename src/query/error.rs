//! Query model error types
//!
//! All the ways a panel query model can fail validation before any SQL
//! is sent to the backend. These are never retried; they surface to the
//! caller as a rejected query.

use thiserror::Error;

/// Errors that can occur while validating or compiling a query model
#[derive(Error, Debug)]
pub enum QueryError {
    /// A structured model has no time-kind groupBy entry
    #[error("groupBy must contain a time entry")]
    MissingTimeGroupBy,

    /// A structured model has more than one time-kind groupBy entry
    #[error("groupBy contains more than one time entry")]
    MultipleTimeGroupBy,

    /// A select pipeline does not start with a field operation
    #[error("select pipeline {pipeline} does not start with a field")]
    MissingField { pipeline: usize },

    /// A field operation appeared past the first position
    #[error("select pipeline {pipeline} has a field operation past the first position")]
    MisplacedField { pipeline: usize },

    /// An alias operation was followed by further operations
    #[error("select pipeline {pipeline} has operations after an alias")]
    MisplacedAlias { pipeline: usize },

    /// A structured model has no table name
    #[error("table name is empty")]
    EmptyTable,

    /// Build was called on a model that was never introspected
    #[error("query model was not introspected before building")]
    NotIntrospected,
}

/// Result type for query model operations
pub type QueryResult<T> = Result<T, QueryError>;
