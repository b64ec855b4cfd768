// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Write-path points
//!
//! A [`Point`] is one time-series sample: measurement, tag set, fields and a
//! timestamp. Points are the unit accepted by the storage gateway; rows are the
//! unit returned to clients.

use super::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Tag set, ordered by key
pub type Tags = BTreeMap<String, String>;

/// Reserved key that can be neither a field nor a tag
const TIME_KEY: &str = "time";

/// Point validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PointError {
    #[error("missing measurement")]
    MissingMeasurement,

    #[error("point without fields is unsupported")]
    MissingFields,

    #[error("invalid field or tag key '{0}'")]
    InvalidKey(String),

    #[error("{0} is an unsupported value for field {1}")]
    UnsupportedFloat(f64, String),

    #[error("unsupported value type {0} for field {1}")]
    UnsupportedValue(&'static str, String),
}

/// Typed field value stored on the write path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Unsigned(u64),
    String(String),
    Boolean(bool),
}

impl FieldValue {
    /// Convert a read-path value into a field value
    ///
    /// Nulls, times and non-finite floats have no field representation.
    pub fn from_value(field: &str, value: &Value) -> Result<Self, PointError> {
        match value {
            Value::Float(f) if !f.is_finite() => {
                Err(PointError::UnsupportedFloat(*f, field.to_string()))
            }
            Value::Float(f) => Ok(FieldValue::Float(*f)),
            Value::Integer(i) => Ok(FieldValue::Integer(*i)),
            Value::Unsigned(u) => Ok(FieldValue::Unsigned(*u)),
            Value::String(s) => Ok(FieldValue::String(s.clone())),
            Value::Boolean(b) => Ok(FieldValue::Boolean(*b)),
            other => Err(PointError::UnsupportedValue(
                other.type_name(),
                field.to_string(),
            )),
        }
    }
}

impl From<FieldValue> for Value {
    fn from(v: FieldValue) -> Self {
        match v {
            FieldValue::Float(f) => Value::Float(f),
            FieldValue::Integer(i) => Value::Integer(i),
            FieldValue::Unsigned(u) => Value::Unsigned(u),
            FieldValue::String(s) => Value::String(s),
            FieldValue::Boolean(b) => Value::Boolean(b),
        }
    }
}

/// A single time-series sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    measurement: String,
    tags: Tags,
    fields: BTreeMap<String, FieldValue>,
    time: DateTime<Utc>,
}

impl Point {
    /// Build a validated point from read-path values
    pub fn new(
        measurement: impl Into<String>,
        tags: Tags,
        fields: BTreeMap<String, Value>,
        time: DateTime<Utc>,
    ) -> Result<Self, PointError> {
        let mut typed = BTreeMap::new();
        for (key, value) in &fields {
            typed.insert(key.clone(), FieldValue::from_value(key, value)?);
        }
        Self::with_fields(measurement, tags, typed, time)
    }

    /// Build a validated point from already typed fields
    pub fn with_fields(
        measurement: impl Into<String>,
        tags: Tags,
        fields: BTreeMap<String, FieldValue>,
        time: DateTime<Utc>,
    ) -> Result<Self, PointError> {
        let measurement = measurement.into();
        if measurement.is_empty() {
            return Err(PointError::MissingMeasurement);
        }
        if fields.is_empty() {
            return Err(PointError::MissingFields);
        }
        if let Some(key) = fields
            .keys()
            .chain(tags.keys())
            .find(|k| k.is_empty() || k.as_str() == TIME_KEY)
        {
            return Err(PointError::InvalidKey(key.clone()));
        }

        Ok(Self {
            measurement,
            tags,
            fields,
            time,
        })
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Series key: measurement followed by its sorted tag pairs
    pub fn series_key(&self) -> String {
        let mut key = self.measurement.clone();
        for (k, v) in &self.tags {
            key.push(',');
            key.push_str(k);
            key.push('=');
            key.push_str(v);
        }
        key
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ", self.series_key())?;
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(k, v)| match v {
                FieldValue::Float(x) => format!("{}={}", k, x),
                FieldValue::Integer(x) => format!("{}={}i", k, x),
                FieldValue::Unsigned(x) => format!("{}={}u", k, x),
                FieldValue::String(x) => format!("{}=\"{}\"", k, x),
                FieldValue::Boolean(x) => format!("{}={}", k, x),
            })
            .collect();
        write!(
            f,
            "{} {}",
            fields.join(","),
            self.time.timestamp_nanos_opt().unwrap_or_default()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(10, 0).unwrap()
    }

    #[test]
    fn test_point_requires_fields() {
        let err = Point::new("cpu", Tags::new(), BTreeMap::new(), t0()).unwrap_err();
        assert_eq!(err, PointError::MissingFields);
    }

    #[test]
    fn test_point_rejects_nan() {
        let fields = BTreeMap::from([("v".to_string(), Value::Float(f64::NAN))]);
        assert!(matches!(
            Point::new("cpu", Tags::new(), fields, t0()),
            Err(PointError::UnsupportedFloat(..))
        ));
    }

    #[test]
    fn test_point_rejects_time_key() {
        let tags = Tags::from([("time".to_string(), "x".to_string())]);
        let fields = BTreeMap::from([("v".to_string(), Value::Integer(1))]);
        assert_eq!(
            Point::new("cpu", tags, fields, t0()).unwrap_err(),
            PointError::InvalidKey("time".to_string())
        );
    }

    #[test]
    fn test_line_protocol_display() {
        let tags = Tags::from([("host".to_string(), "a".to_string())]);
        let fields = BTreeMap::from([
            ("n".to_string(), Value::Integer(2)),
            ("v".to_string(), Value::Float(1.5)),
        ]);
        let p = Point::new("cpu", tags, fields, t0()).unwrap();
        assert_eq!(p.to_string(), "cpu,host=a n=2i,v=1.5 10000000000");
    }
}
