//! Query Model Compiler
//!
//! Converts the structured query description a dashboard panel sends
//! into SQL text for the backend:
//!
//! - **Model**: the deserialized panel query with select pipelines and
//!   groupBy operations as closed sum types
//! - **Introspection**: the validation pass that extracts the time
//!   bucket interval and the fill directive from groupBy
//! - **SQL assembly**: deterministic clause emission
//! - **Templates**: `$var` / `${var}` substitution for raw queries
//!
//! # Example
//!
//! ```rust,ignore
//! let mut model: QueryModel = serde_json::from_slice(&query.json)?;
//! model.introspect()?;
//! let sql = model.build(&query.time_range, &variables)?;
//! ```

mod error;
mod model;
mod sql;
mod template;

pub use error::{QueryError, QueryResult};
pub use model::{GroupByOp, Introspection, OrderByTime, QueryModel, SelectOp};
pub use sql::DEFAULT_MAX_DATA_POINTS;
pub use template::{substitute_variables, variable_pattern};
