// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cursor - lazy source of result tuples
//!
//! The planner hands the coordinator a cursor; the [`Emitter`](super::Emitter)
//! groups its tuples into rows. Tuples arrive grouped by series.

use super::error::ExecutionError;
use crate::storage::{Tags, Value};
use std::collections::VecDeque;

/// Series identity of a cursor tuple
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CursorSeries {
    pub name: String,
    pub tags: Tags,
}

impl CursorSeries {
    pub fn new(name: impl Into<String>, tags: Tags) -> Self {
        Self {
            name: name.into(),
            tags,
        }
    }
}

/// One tuple, positionally aligned to [`Cursor::columns`]
#[derive(Debug, Clone, PartialEq)]
pub struct CursorRow {
    pub series: CursorSeries,
    pub values: Vec<Value>,
}

pub trait Cursor: Send {
    /// Column names shared by every tuple
    fn columns(&self) -> &[String];

    /// Next tuple, or `None` once exhausted
    fn next_row(&mut self) -> Result<Option<CursorRow>, ExecutionError>;

    /// Release resources; safe to call more than once
    fn close(&mut self) {}
}

/// Cursor over tuples already materialised in memory
pub struct RowCursor {
    columns: Vec<String>,
    rows: VecDeque<CursorRow>,
    closed: bool,
}

impl RowCursor {
    pub fn new(columns: Vec<String>, rows: Vec<CursorRow>) -> Self {
        Self {
            columns,
            rows: rows.into(),
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Cursor for RowCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<CursorRow>, ExecutionError> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) {
        self.closed = true;
        self.rows.clear();
    }
}
