//! SQL clause assembly
//!
//! Turns an introspected [`QueryModel`] plus the requested time range
//! into the SQL text sent to the backend. Clause order is fixed:
//! SELECT, FROM, WHERE, GROUP BY, ORDER BY, LIMIT. Field, tag and alias
//! identifiers are double-quoted; the time bucket interval is
//! single-quoted inside the `INTERVAL` keyword; the table name is
//! emitted bare.

use std::collections::HashMap;

use crate::query::error::{QueryError, QueryResult};
use crate::query::model::{QueryModel, SelectOp};
use crate::query::template::substitute_variables;
use crate::timefmt::TimeRange;

/// Row cap applied when the panel does not supply one
pub const DEFAULT_MAX_DATA_POINTS: u64 = 1000;

/// The time-bucket expression shared by SELECT and GROUP BY
///
/// Both clauses must carry the byte-identical expression or the backend
/// rejects the grouping.
fn time_bucket_expr(interval: &str) -> String {
    format!("DATE_BIN(INTERVAL '{interval}', time, TIMESTAMP '1970-01-01T00:00:00Z')")
}

/// Fold one select pipeline into its SQL expression
///
/// The pipeline must start with a field; each aggregate wraps the
/// expression built so far; an alias, if present, must come last.
fn compile_pipeline(pipeline: &[SelectOp], index: usize) -> QueryResult<String> {
    let mut ops = pipeline.iter();
    let mut expr = match ops.next() {
        Some(SelectOp::Field(name)) => format!("\"{name}\""),
        _ => return Err(QueryError::MissingField { pipeline: index }),
    };

    let mut alias: Option<&str> = None;
    for op in ops {
        if alias.is_some() {
            return Err(QueryError::MisplacedAlias { pipeline: index });
        }
        match op {
            SelectOp::Field(_) => return Err(QueryError::MisplacedField { pipeline: index }),
            SelectOp::Aggregate(func) => expr = format!("{func}({expr})"),
            SelectOp::Alias(name) => alias = Some(name),
        }
    }

    if let Some(alias) = alias {
        expr = format!("{expr} AS \"{alias}\"");
    }
    Ok(expr)
}

impl QueryModel {
    /// Compile the model into SQL text for the given time range
    ///
    /// Raw mode returns `query_text` after variable substitution and
    /// performs no further validation. Structured mode requires a prior
    /// [`introspect`](QueryModel::introspect) call.
    pub fn build(
        &self,
        range: &TimeRange,
        variables: &HashMap<String, String>,
    ) -> QueryResult<String> {
        if self.raw_query {
            return Ok(substitute_variables(&self.query_text, variables));
        }

        let intro = self
            .introspection
            .as_ref()
            .ok_or(QueryError::NotIntrospected)?;
        if self.table.is_empty() {
            return Err(QueryError::EmptyTable);
        }

        let bucket = time_bucket_expr(&intro.interval);

        let mut select_parts = vec![format!("{bucket} AS time")];
        for (i, pipeline) in self.select.iter().enumerate() {
            select_parts.push(compile_pipeline(pipeline, i)?);
        }

        let mut where_clause = format!(
            "time >= {} AND time <= {}",
            range.from_nanos(),
            range.to_nanos()
        );
        if !self.raw_tags_expr.is_empty() {
            where_clause.push_str(" AND ");
            where_clause.push_str(&self.raw_tags_expr);
        }

        let mut group_parts = vec![bucket];
        for tag in self.group_by_tags() {
            group_parts.push(format!("\"{tag}\""));
        }

        let limit = if self.max_data_points == 0 {
            DEFAULT_MAX_DATA_POINTS
        } else {
            self.max_data_points
        };

        Ok(format!(
            "SELECT {} FROM {} WHERE {} GROUP BY {} ORDER BY time {} LIMIT {}",
            select_parts.join(", "),
            self.table,
            where_clause,
            group_parts.join(", "),
            self.order_by_time,
            limit
        ))
    }
}
