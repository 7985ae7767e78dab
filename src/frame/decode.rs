//! Result Decoder
//!
//! Turns the backend's response body (a JSON array of loosely-typed row
//! objects) into a [`Frame`]. Column kinds are inferred from the first
//! typed value seen for each name; columns are emitted in order of
//! first appearance across the whole row sequence, which is
//! deterministic because object keys are kept in document order.
//!
//! Cell-level oddities (nulls, kind mismatches, nested values) degrade
//! to absent cells with a debug diagnostic; only a malformed payload or
//! an unparseable time value fails the decode as a whole.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::frame::column::{Column, ColumnKind, ColumnValues, Frame, TIME_COLUMN};
use crate::frame::error::{DecodeError, DecodeResult};
use crate::timefmt::parse_time_string;

/// Decode a backend response body into a frame
///
/// An empty body is a valid empty result. Rows missing the time column
/// keep the epoch placeholder in the time axis, mirroring the backend's
/// behavior of always emitting it.
pub fn decode(raw: &[u8]) -> DecodeResult<Frame> {
    if raw.is_empty() {
        return Ok(Frame::empty());
    }

    let rows: Vec<Map<String, Value>> = serde_json::from_slice(raw)?;
    let mut time = vec![DateTime::<Utc>::UNIX_EPOCH; rows.len()];
    let mut columns = ColumnSet::new(rows.len());

    for (row, object) in rows.iter().enumerate() {
        for (key, value) in object {
            if key == TIME_COLUMN {
                let text = value
                    .as_str()
                    .ok_or(DecodeError::TimeNotString { row })?;
                time[row] = parse_time_string(text).map_err(|source| DecodeError::Time {
                    value: text.to_string(),
                    source,
                })?;
            } else {
                columns.store(key, row, value);
            }
        }
    }

    Ok(Frame {
        time,
        columns: columns.finish(),
        notices: Vec::new(),
    })
}

/// Accumulates columns in first-seen order while decoding rows
struct ColumnSet {
    rows: usize,
    names: Vec<String>,
    index: HashMap<String, usize>,
    // None until the column has held a typed value
    cells: Vec<Option<ColumnValues>>,
}

impl ColumnSet {
    fn new(rows: usize) -> Self {
        Self {
            rows,
            names: Vec::new(),
            index: HashMap::new(),
            cells: Vec::new(),
        }
    }

    /// Record one cell value
    ///
    /// The first typed value fixes the column's kind; later values of a
    /// different kind are dropped, leaving the cell absent.
    fn store(&mut self, name: &str, row: usize, value: &Value) {
        let slot = match self.index.get(name) {
            Some(&i) => i,
            None => {
                let i = self.names.len();
                self.index.insert(name.to_string(), i);
                self.names.push(name.to_string());
                self.cells.push(None);
                i
            }
        };
        let rows = self.rows;
        let entry = &mut self.cells[slot];

        let kind = match value {
            Value::Null => return,
            Value::Number(_) => ColumnKind::Float,
            Value::String(_) => ColumnKind::Text,
            Value::Bool(_) => ColumnKind::Bool,
            Value::Array(_) | Value::Object(_) => {
                tracing::debug!(column = name, row, "unsupported cell kind, leaving absent");
                return;
            }
        };

        let column = entry.get_or_insert_with(|| ColumnValues::absent(kind, rows));
        match (column, value) {
            (ColumnValues::Float(cells), Value::Number(n)) => {
                cells[row] = n.as_f64();
            }
            (ColumnValues::Text(cells), Value::String(s)) => {
                cells[row] = Some(s.clone());
            }
            (ColumnValues::Bool(cells), Value::Bool(b)) => {
                cells[row] = Some(*b);
            }
            (column, _) => {
                tracing::debug!(
                    column = name,
                    row,
                    expected = %column.kind(),
                    "cell kind differs from column kind, leaving absent"
                );
            }
        }
    }

    /// Emit columns in first-seen order, dropping names that never held
    /// a typed value
    fn finish(self) -> Vec<Column> {
        let mut out = Vec::with_capacity(self.names.len());
        for (name, cells) in self.names.into_iter().zip(self.cells) {
            match cells {
                Some(values) => out.push(Column { name, values }),
                None => {
                    tracing::debug!(column = %name, "column never held a typed value, dropping");
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode_json(value: Value) -> Frame {
        decode(&serde_json::to_vec(&value).unwrap()).unwrap()
    }

    #[test]
    fn test_empty_body_is_empty_frame() {
        let frame = decode(b"").unwrap();
        assert!(frame.is_empty());
        assert!(frame.columns.is_empty());
    }

    #[test]
    fn test_decode_typed_columns() {
        let frame = decode_json(json!([
            { "time": "2022-10-10T00:00:00", "fa": 1.5, "state": "ok", "up": true },
            { "time": "2022-10-10T00:10:00", "fa": 2.5, "state": "warn", "up": false }
        ]));

        assert_eq!(frame.row_count(), 2);
        assert_eq!(
            frame.column("fa").map(|c| &c.values),
            Some(&ColumnValues::Float(vec![Some(1.5), Some(2.5)]))
        );
        assert_eq!(
            frame.column("state").map(|c| &c.values),
            Some(&ColumnValues::Text(vec![
                Some("ok".to_string()),
                Some("warn".to_string())
            ]))
        );
        assert_eq!(
            frame.column("up").map(|c| &c.values),
            Some(&ColumnValues::Bool(vec![Some(true), Some(false)]))
        );
    }

    #[test]
    fn test_null_cells_stay_absent() {
        let frame = decode_json(json!([
            { "time": "2022-10-10T00:00:00", "fa": 0.0 },
            { "time": "2022-10-10T00:10:00", "fa": null },
            { "time": "2022-10-10T00:20:00" }
        ]));

        let col = frame.column("fa").unwrap();
        assert_eq!(
            col.values,
            ColumnValues::Float(vec![Some(0.0), None, None])
        );
        assert!(!col.values.is_absent(0));
    }

    #[test]
    fn test_column_order_is_first_appearance() {
        let frame = decode_json(json!([
            { "time": "2022-10-10T00:00:00", "fb": 1.0 },
            { "time": "2022-10-10T00:10:00", "fa": 2.0, "fb": 3.0 }
        ]));

        let names: Vec<_> = frame.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["fb", "fa"]);
    }

    #[test]
    fn test_kind_fixed_by_first_value() {
        let frame = decode_json(json!([
            { "time": "2022-10-10T00:00:00", "fa": 1.0 },
            { "time": "2022-10-10T00:10:00", "fa": "two" },
            { "time": "2022-10-10T00:20:00", "fa": 3.0 }
        ]));

        assert_eq!(
            frame.column("fa").map(|c| &c.values),
            Some(&ColumnValues::Float(vec![Some(1.0), None, Some(3.0)]))
        );
    }

    #[test]
    fn test_null_first_column_typed_by_first_real_value() {
        let frame = decode_json(json!([
            { "time": "2022-10-10T00:00:00", "fa": null },
            { "time": "2022-10-10T00:10:00", "fa": "ok" }
        ]));

        assert_eq!(
            frame.column("fa").map(|c| &c.values),
            Some(&ColumnValues::Text(vec![None, Some("ok".to_string())]))
        );
    }

    #[test]
    fn test_all_null_column_is_dropped() {
        let frame = decode_json(json!([
            { "time": "2022-10-10T00:00:00", "fa": null, "fb": 1.0 }
        ]));
        assert!(frame.column("fa").is_none());
        assert!(frame.column("fb").is_some());
    }

    #[test]
    fn test_nested_values_stay_absent() {
        let frame = decode_json(json!([
            { "time": "2022-10-10T00:00:00", "fa": {"x": 1}, "fb": [1, 2] },
            { "time": "2022-10-10T00:10:00", "fa": 1.0, "fb": 2.0 }
        ]));

        assert_eq!(
            frame.column("fa").map(|c| &c.values),
            Some(&ColumnValues::Float(vec![None, Some(1.0)]))
        );
        assert_eq!(
            frame.column("fb").map(|c| &c.values),
            Some(&ColumnValues::Float(vec![None, Some(2.0)]))
        );
    }

    #[test]
    fn test_bad_time_aborts_decode() {
        let err = decode(
            serde_json::to_vec(&json!([
                { "time": "2022-10-10T00:00:00", "fa": 1.0 },
                { "time": "garbage", "fa": 2.0 }
            ]))
            .unwrap()
            .as_slice(),
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::Time { .. }));
    }

    #[test]
    fn test_non_string_time_is_an_error() {
        let err = decode(
            serde_json::to_vec(&json!([{ "time": 1665360000 }]))
                .unwrap()
                .as_slice(),
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::TimeNotString { row: 0 }));
    }

    #[test]
    fn test_non_array_payload_is_an_error() {
        let err = decode(br#"{"error": "nope"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_integer_numbers_decode_as_floats() {
        let frame = decode_json(json!([
            { "time": "2022-10-10T00:00:00", "fa": 3 }
        ]));
        assert_eq!(
            frame.column("fa").map(|c| &c.values),
            Some(&ColumnValues::Float(vec![Some(3.0)]))
        );
    }
}
