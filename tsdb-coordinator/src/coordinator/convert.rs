// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Row to point conversion for INTO writes

use crate::exec::{ExecutionError, ExecutionResult, Row};
use crate::storage::{Point, Value};
use log::warn;
use std::collections::BTreeMap;

const TIME_COLUMN: &str = "time";

/// Turn every tuple of `row` into a point of `measurement`
///
/// The `time` column supplies the timestamp and every other column a field.
/// Null values are skipped. Tuples that cannot become a valid point are
/// dropped; only a row without a `time` column fails as a whole.
pub fn convert_row_to_points(measurement: &str, row: &Row) -> ExecutionResult<Vec<Point>> {
    let time_index = row.column_index(TIME_COLUMN).ok_or_else(|| {
        ExecutionError::Conversion("error finding time index in result".to_string())
    })?;

    let mut points = Vec::with_capacity(row.values.len());
    for values in &row.values {
        let time = match values.get(time_index).and_then(Value::as_time) {
            Some(time) => time,
            None => {
                warn!(
                    "Dropping {} tuple without a timestamp: {:?}",
                    measurement,
                    values.get(time_index)
                );
                continue;
            }
        };

        let fields: BTreeMap<String, Value> = row
            .columns
            .iter()
            .zip(values.iter())
            .enumerate()
            .filter(|(i, (_, v))| *i != time_index && !v.is_null())
            .map(|(_, (c, v))| (c.clone(), v.clone()))
            .collect();

        match Point::new(measurement, row.tags.clone(), fields, time) {
            Ok(point) => points.push(point),
            Err(e) => warn!("Dropping {} point at {}: {}", measurement, time, e),
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FieldValue, Tags};
    use chrono::{DateTime, Utc};

    fn ts(secs: i64) -> Value {
        Value::Time(DateTime::<Utc>::from_timestamp(secs, 0).unwrap())
    }

    #[test]
    fn test_converts_tuples() {
        let mut row = Row::new("cpu", &["time", "value", "host_load"]);
        row.tags = Tags::from([("host".to_string(), "a".to_string())]);
        row.push(vec![ts(10), Value::Float(1.5), Value::Integer(3)]);
        row.push(vec![ts(20), Value::NullFloat, Value::Integer(4)]);

        let points = convert_row_to_points("cpu_copy", &row).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].measurement(), "cpu_copy");
        assert_eq!(points[0].tags()["host"], "a");
        assert_eq!(points[0].fields()["value"], FieldValue::Float(1.5));
        assert!(!points[1].fields().contains_key("value"));
        assert_eq!(points[1].fields()["host_load"], FieldValue::Integer(4));
    }

    #[test]
    fn test_missing_time_column() {
        let mut row = Row::new("cpu", &["value"]);
        row.push(vec![Value::Float(1.0)]);
        let err = convert_row_to_points("cpu", &row).unwrap_err();
        assert_eq!(err.to_string(), "error finding time index in result");
    }

    #[test]
    fn test_drops_unstorable_tuples() {
        let mut row = Row::new("cpu", &["time", "value"]);
        row.push(vec![ts(1), Value::Null]);
        row.push(vec![Value::Integer(5), Value::Float(2.0)]);
        row.push(vec![ts(3), Value::Float(3.0)]);

        let points = convert_row_to_points("cpu", &row).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].fields()["value"], FieldValue::Float(3.0));
    }
}
