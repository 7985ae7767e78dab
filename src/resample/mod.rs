//! Resampler
//!
//! Regularizes an irregular or sparse frame onto a fixed-width bucket
//! grid covering the requested time range, filling empty buckets per
//! the panel's fill policy. Bucket width comes from the same interval
//! string that drove the SQL time grouping, so a backend that already
//! returned one row per bucket round-trips unchanged.

use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;

use crate::frame::{Column, ColumnValues, Frame};
use crate::timefmt::TimeRange;

/// How to populate a bucket that has no source row
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillPolicy {
    /// Carry the previous bucket's value forward
    Previous,
    /// Leave the bucket absent
    Null,
    /// Fill numeric columns with a constant; other kinds stay absent
    Value(f64),
}

/// Errors from interpreting a fill directive
#[derive(Error, Debug)]
pub enum ResampleError {
    /// The directive is neither a keyword nor a number
    #[error("fill directive '{0}' is neither a keyword nor a number")]
    BadFillDirective(String),
}

impl FromStr for FillPolicy {
    type Err = ResampleError;

    fn from_str(directive: &str) -> Result<Self, Self::Err> {
        match directive.to_lowercase().as_str() {
            "previous" => Ok(Self::Previous),
            "null" => Ok(Self::Null),
            other => other
                .parse::<f64>()
                .map(Self::Value)
                .map_err(|_| ResampleError::BadFillDirective(directive.to_string())),
        }
    }
}

/// Resample a frame onto a regular bucket grid
///
/// Bucket starts run from `range.from` in steps of `bucket`, up to and
/// including the boundary whose window contains `range.to`. A source
/// row lands in the bucket `[start, start + bucket)`; when several rows
/// land in one bucket the last one in input order wins. A zero (or
/// negative) bucket width and an empty frame are both no-ops.
pub fn resample(frame: &Frame, bucket: Duration, range: TimeRange, policy: FillPolicy) -> Frame {
    let step = match bucket.num_nanoseconds() {
        Some(step) if step > 0 => step,
        _ => return frame.clone(),
    };
    if frame.is_empty() {
        return frame.clone();
    }

    let from = range.from_nanos();
    let span = range.to_nanos().saturating_sub(from);
    if span < 0 {
        return frame.clone();
    }
    let buckets = (span + step - 1) / step + 1;
    let buckets = buckets as usize;

    // Last-write-wins mapping from bucket to source row
    let mut slots: Vec<Option<usize>> = vec![None; buckets];
    for (row, ts) in frame.time.iter().enumerate() {
        let Some(ts) = ts.timestamp_nanos_opt() else {
            continue;
        };
        let offset = ts - from;
        if offset < 0 {
            continue;
        }
        let index = (offset / step) as usize;
        if index < buckets {
            slots[index] = Some(row);
        }
    }

    let time = (0..buckets)
        .map(|i| range.from + bucket * i as i32)
        .collect();

    let columns = frame
        .columns
        .iter()
        .map(|column| Column {
            name: column.name.clone(),
            values: match &column.values {
                ColumnValues::Float(cells) => {
                    let constant = match policy {
                        FillPolicy::Value(v) => Some(v),
                        _ => None,
                    };
                    ColumnValues::Float(fill_column(cells, &slots, policy, constant))
                }
                ColumnValues::Text(cells) => {
                    ColumnValues::Text(fill_column(cells, &slots, policy, None))
                }
                ColumnValues::Bool(cells) => {
                    ColumnValues::Bool(fill_column(cells, &slots, policy, None))
                }
            },
        })
        .collect();

    Frame {
        time,
        columns,
        notices: frame.notices.clone(),
    }
}

/// Fill one column onto the bucket grid
///
/// `constant` is the constant-fill value lifted into the column's cell
/// type; `None` for kinds a constant cannot fill.
fn fill_column<T: Clone>(
    cells: &[Option<T>],
    slots: &[Option<usize>],
    policy: FillPolicy,
    constant: Option<T>,
) -> Vec<Option<T>> {
    let mut out: Vec<Option<T>> = Vec::with_capacity(slots.len());
    for slot in slots {
        let value = match slot {
            Some(row) => cells.get(*row).cloned().flatten(),
            None => match policy {
                FillPolicy::Previous => out.last().cloned().flatten(),
                FillPolicy::Null => None,
                FillPolicy::Value(_) => constant.clone(),
            },
        };
        out.push(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::decode;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn range(from_min: u32, to_min: u32) -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2022, 10, 10, 0, from_min, 0).unwrap(),
            Utc.with_ymd_and_hms(2022, 10, 10, 0, to_min, 0).unwrap(),
        )
    }

    fn sparse_frame() -> Frame {
        // Rows at :00 and :30 with a 10-minute grid give three empty buckets
        decode(
            serde_json::to_vec(&json!([
                { "time": "2022-10-10T00:00:00", "fa": 1.0, "state": "ok" },
                { "time": "2022-10-10T00:30:00", "fa": 4.0, "state": "warn" }
            ]))
            .unwrap()
            .as_slice(),
        )
        .unwrap()
    }

    #[test]
    fn test_fill_policy_parsing() {
        assert_eq!("previous".parse::<FillPolicy>().unwrap(), FillPolicy::Previous);
        assert_eq!("null".parse::<FillPolicy>().unwrap(), FillPolicy::Null);
        assert_eq!("10".parse::<FillPolicy>().unwrap(), FillPolicy::Value(10.0));
        assert_eq!("1.5".parse::<FillPolicy>().unwrap(), FillPolicy::Value(1.5));
        assert!(matches!(
            "linear".parse::<FillPolicy>(),
            Err(ResampleError::BadFillDirective(_))
        ));
    }

    #[test]
    fn test_bucket_count_covers_range() {
        let out = resample(
            &sparse_frame(),
            Duration::minutes(10),
            range(0, 45),
            FillPolicy::Null,
        );
        // ceil(45 / 10) + 1
        assert_eq!(out.row_count(), 6);
        assert_eq!(
            out.time.first().copied(),
            Some(Utc.with_ymd_and_hms(2022, 10, 10, 0, 0, 0).unwrap())
        );
        assert_eq!(
            out.time.last().copied(),
            Some(Utc.with_ymd_and_hms(2022, 10, 10, 0, 50, 0).unwrap())
        );
    }

    #[test]
    fn test_null_fill_leaves_gaps_absent() {
        let out = resample(
            &sparse_frame(),
            Duration::minutes(10),
            range(0, 30),
            FillPolicy::Null,
        );
        assert_eq!(
            out.column("fa").map(|c| &c.values),
            Some(&ColumnValues::Float(vec![
                Some(1.0),
                None,
                None,
                Some(4.0)
            ]))
        );
    }

    #[test]
    fn test_previous_fill_carries_all_kinds() {
        let out = resample(
            &sparse_frame(),
            Duration::minutes(10),
            range(0, 30),
            FillPolicy::Previous,
        );
        assert_eq!(
            out.column("fa").map(|c| &c.values),
            Some(&ColumnValues::Float(vec![
                Some(1.0),
                Some(1.0),
                Some(1.0),
                Some(4.0)
            ]))
        );
        assert_eq!(
            out.column("state").map(|c| &c.values),
            Some(&ColumnValues::Text(vec![
                Some("ok".to_string()),
                Some("ok".to_string()),
                Some("ok".to_string()),
                Some("warn".to_string())
            ]))
        );
    }

    #[test]
    fn test_constant_fill_only_touches_numeric_columns() {
        let out = resample(
            &sparse_frame(),
            Duration::minutes(10),
            range(0, 30),
            FillPolicy::Value(0.0),
        );
        assert_eq!(
            out.column("fa").map(|c| &c.values),
            Some(&ColumnValues::Float(vec![
                Some(1.0),
                Some(0.0),
                Some(0.0),
                Some(4.0)
            ]))
        );
        assert_eq!(
            out.column("state").map(|c| &c.values),
            Some(&ColumnValues::Text(vec![
                Some("ok".to_string()),
                None,
                None,
                Some("warn".to_string())
            ]))
        );
    }

    #[test]
    fn test_last_row_in_bucket_wins() {
        let frame = decode(
            serde_json::to_vec(&json!([
                { "time": "2022-10-10T00:00:01", "fa": 1.0 },
                { "time": "2022-10-10T00:00:02", "fa": 2.0 }
            ]))
            .unwrap()
            .as_slice(),
        )
        .unwrap();

        let out = resample(
            &frame,
            Duration::minutes(10),
            range(0, 10),
            FillPolicy::Null,
        );
        assert_eq!(
            out.column("fa").map(|c| &c.values),
            Some(&ColumnValues::Float(vec![Some(2.0), None]))
        );
    }

    #[test]
    fn test_rows_outside_range_ignored() {
        let frame = decode(
            serde_json::to_vec(&json!([
                { "time": "2022-10-09T23:59:00", "fa": 9.0 },
                { "time": "2022-10-10T00:05:00", "fa": 1.0 }
            ]))
            .unwrap()
            .as_slice(),
        )
        .unwrap();

        let out = resample(
            &frame,
            Duration::minutes(10),
            range(0, 10),
            FillPolicy::Null,
        );
        assert_eq!(
            out.column("fa").map(|c| &c.values),
            Some(&ColumnValues::Float(vec![Some(1.0), None]))
        );
    }

    #[test]
    fn test_zero_bucket_is_a_noop() {
        let frame = sparse_frame();
        let out = resample(&frame, Duration::zero(), range(0, 30), FillPolicy::Null);
        assert_eq!(out, frame);
    }

    #[test]
    fn test_empty_frame_is_a_noop() {
        let out = resample(
            &Frame::empty(),
            Duration::minutes(10),
            range(0, 30),
            FillPolicy::Previous,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_resampling_regular_frame_is_idempotent() {
        let regular = decode(
            serde_json::to_vec(&json!([
                { "time": "2022-10-10T00:00:00", "fa": 1.0 },
                { "time": "2022-10-10T00:10:00", "fa": 2.0 },
                { "time": "2022-10-10T00:20:00", "fa": 3.0 },
                { "time": "2022-10-10T00:30:00", "fa": 4.0 }
            ]))
            .unwrap()
            .as_slice(),
        )
        .unwrap();

        let once = resample(
            &regular,
            Duration::minutes(10),
            range(0, 30),
            FillPolicy::Null,
        );
        assert_eq!(once, regular);

        let twice = resample(&once, Duration::minutes(10), range(0, 30), FillPolicy::Null);
        assert_eq!(twice, once);
    }
}
