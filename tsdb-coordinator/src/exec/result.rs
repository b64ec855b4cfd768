// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query result types

use super::error::ExecutionError;
use crate::storage::{Tags, Value};
use serde::Serialize;
use std::fmt;

/// A named, tagged block of tuples aligned to `columns`
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Row {
    pub name: String,
    pub tags: Tags,
    pub columns: Vec<String>,
    pub values: Vec<Vec<Value>>,
    /// More tuples of the same series follow in a later row
    pub partial: bool,
}

impl Row {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Unnamed row with the given columns
    pub fn with_columns(columns: &[&str]) -> Self {
        Self::new("", columns)
    }

    pub fn push(&mut self, values: Vec<Value>) {
        self.values.push(values);
    }

    /// Index of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Warning,
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MessageLevel::Info => f.write_str("info"),
            MessageLevel::Warning => f.write_str("warning"),
        }
    }
}

/// Advisory message attached to a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub level: MessageLevel,
    pub text: String,
}

impl Message {
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            text: text.into(),
        }
    }
}

/// Warning attached when a mutating statement runs in a read-only context
pub fn read_only_warning(query: &str) -> Message {
    Message::warning(format!(
        "deprecated use of '{}' in a read only context, please use a POST request instead",
        query
    ))
}

/// One unit of output delivered through the result sink
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    /// Position of the statement within its query; set when sent
    pub statement_id: usize,
    pub series: Vec<Row>,
    pub messages: Vec<Message>,
    pub partial: bool,
    pub error: Option<ExecutionError>,
}

impl QueryResult {
    pub fn rows(series: Vec<Row>) -> Self {
        Self {
            series,
            ..Default::default()
        }
    }

    pub fn error(err: ExecutionError) -> Self {
        Self {
            error: Some(err),
            ..Default::default()
        }
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_warning_text() {
        let msg = read_only_warning("DROP DATABASE db0");
        assert_eq!(msg.level, MessageLevel::Warning);
        assert_eq!(
            msg.text,
            "deprecated use of 'DROP DATABASE db0' in a read only context, please use a POST request instead"
        );
    }

    #[test]
    fn test_row_serializes() {
        let mut row = Row::new("cpu", &["time", "value"]);
        row.push(vec![Value::Integer(1), Value::Float(0.5)]);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["name"], "cpu");
        assert_eq!(row.column_index("value"), Some(1));
    }
}
