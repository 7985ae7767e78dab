//! Panel query model
//!
//! The structured description a dashboard panel sends: which table to
//! read, select pipelines of `field`/aggregate/`alias` operations,
//! groupBy entries (time bucket, tags, fill directive) and ordering.
//! On the wire every operation is a `{ "type": ..., "params": [...] }`
//! object; deserialization turns them into closed sum types so the
//! compiler never indexes into loosely-typed arrays.

use serde::Deserialize;
use serde_json::Value;

use crate::query::error::{QueryError, QueryResult};

/// One operation of a select pipeline
///
/// Any operation type other than `field` and `alias` is taken to be an
/// aggregate function name (`avg`, `sum`, `count`, ...), which the
/// backend resolves; the compiler only assembles the call syntax.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawOp")]
pub enum SelectOp {
    /// Select a column; must be the first operation of a pipeline
    Field(String),
    /// Wrap the expression built so far in an aggregate function call
    Aggregate(String),
    /// Name the output column; must be the last operation if present
    Alias(String),
}

/// One entry of the groupBy clause
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawOp")]
pub enum GroupByOp {
    /// Bucket rows by a time interval, e.g. `"10 minutes"`
    Time(String),
    /// Group by a tag column
    Tag(String),
    /// Gap-fill directive for resampling: `previous`, `null` or a number
    Fill(String),
}

/// Wire shape of a query operation
#[derive(Debug, Clone, Deserialize)]
struct RawOp {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    params: Vec<Value>,
}

impl RawOp {
    /// The first positional parameter, rendered as a string
    ///
    /// The query editor usually sends strings, but numeric parameters
    /// (a fill value of `10`, say) may arrive as JSON numbers.
    fn first_param(&self) -> Result<String, String> {
        match self.params.first() {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(other) => Err(format!(
                "operation '{}' has a non-scalar parameter: {other}",
                self.kind
            )),
            None => Err(format!("operation '{}' is missing its parameter", self.kind)),
        }
    }
}

impl TryFrom<RawOp> for SelectOp {
    type Error = String;

    fn try_from(op: RawOp) -> Result<Self, String> {
        match op.kind.as_str() {
            "field" => Ok(Self::Field(op.first_param()?)),
            "alias" => Ok(Self::Alias(op.first_param()?)),
            _ => Ok(Self::Aggregate(op.kind)),
        }
    }
}

impl TryFrom<RawOp> for GroupByOp {
    type Error = String;

    fn try_from(op: RawOp) -> Result<Self, String> {
        match op.kind.as_str() {
            "time" => Ok(Self::Time(op.first_param()?)),
            "tag" => Ok(Self::Tag(op.first_param()?)),
            "fill" => Ok(Self::Fill(op.first_param()?)),
            other => Err(format!("unrecognized groupBy type '{other}'")),
        }
    }
}

/// Sort direction of the time column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum OrderByTime {
    #[default]
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl std::fmt::Display for OrderByTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asc => write!(f, "ASC"),
            Self::Desc => write!(f, "DESC"),
        }
    }
}

/// Derived fields recorded by [`QueryModel::introspect`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Introspection {
    /// Interval string of the single time groupBy entry
    pub interval: String,
    /// Raw fill directive, if one was given
    pub fill: Option<String>,
}

/// A panel query as deserialized from the request JSON
///
/// Unknown keys (datasource metadata, refId, editor state) are ignored.
/// [`QueryModel::introspect`] must run before
/// [`QueryModel::build`](crate::query::QueryModel::build); a raw query
/// skips introspection requirements entirely.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryModel {
    /// Measurement/table to read; required unless `raw_query`
    pub table: String,
    /// Select pipelines, each an ordered list of operations
    pub select: Vec<Vec<SelectOp>>,
    /// Grouping operations in editor order
    pub group_by: Vec<GroupByOp>,
    /// Pre-rendered tag filter fragment, appended to WHERE as-is
    pub raw_tags_expr: String,
    /// Sort direction of the time column
    pub order_by_time: OrderByTime,
    /// When true, `query_text` is used verbatim after variable substitution
    pub raw_query: bool,
    /// Literal SQL for raw mode
    pub query_text: String,
    /// Row cap; zero means the 1000-row default
    pub max_data_points: u64,

    #[serde(skip)]
    pub(crate) introspection: Option<Introspection>,
}

impl QueryModel {
    /// Validate the groupBy clause and record the derived fields
    ///
    /// A structured model must have exactly one time entry and at most
    /// one fill entry; extra fill entries are ignored with a debug log.
    pub fn introspect(&mut self) -> QueryResult<()> {
        if self.raw_query {
            self.introspection = Some(Introspection::default());
            return Ok(());
        }

        let mut interval: Option<String> = None;
        let mut fill: Option<String> = None;
        for op in &self.group_by {
            match op {
                GroupByOp::Time(i) => {
                    if interval.replace(i.clone()).is_some() {
                        return Err(QueryError::MultipleTimeGroupBy);
                    }
                }
                GroupByOp::Fill(f) => {
                    if fill.is_some() {
                        tracing::debug!(directive = %f, "ignoring extra fill entry");
                    } else {
                        fill = Some(f.clone());
                    }
                }
                GroupByOp::Tag(_) => {}
            }
        }

        let interval = interval.ok_or(QueryError::MissingTimeGroupBy)?;
        self.introspection = Some(Introspection { interval, fill });
        Ok(())
    }

    /// Interval string of the time groupBy, once introspected
    pub fn interval(&self) -> Option<&str> {
        self.introspection.as_ref().map(|i| i.interval.as_str())
    }

    /// Fill directive, once introspected; `None` means no resampling
    pub fn fill(&self) -> Option<&str> {
        self.introspection.as_ref().and_then(|i| i.fill.as_deref())
    }

    /// Tag groupBy entries in their original order
    pub fn group_by_tags(&self) -> impl Iterator<Item = &str> {
        self.group_by.iter().filter_map(|op| match op {
            GroupByOp::Tag(name) => Some(name.as_str()),
            _ => None,
        })
    }
}
