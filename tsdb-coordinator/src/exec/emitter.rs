// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Emitter - groups cursor tuples into chunked rows
//!
//! Consecutive tuples of the same series are appended to one row until the
//! chunk size is reached. A row is handed out as soon as the next tuple
//! cannot join it, so at most one row is buffered.

use super::cursor::{Cursor, CursorSeries};
use super::error::ExecutionError;
use super::result::Row;
use crate::storage::Value;

pub struct Emitter {
    cursor: Box<dyn Cursor>,
    chunk_size: usize,
    columns: Vec<String>,
    series: CursorSeries,
    row: Option<Row>,
    closed: bool,
}

impl Emitter {
    /// Chunk size 0 disables chunking
    pub fn new(cursor: Box<dyn Cursor>, chunk_size: usize) -> Self {
        let columns = cursor.columns().to_vec();
        Self {
            cursor,
            chunk_size,
            columns,
            series: CursorSeries::default(),
            row: None,
            closed: false,
        }
    }

    /// Next row and whether more rows follow it
    ///
    /// Returns `None` once the cursor is exhausted and the last row has
    /// been handed out.
    pub fn emit(&mut self) -> Result<Option<(Row, bool)>, ExecutionError> {
        loop {
            let next = match self.cursor.next_row()? {
                Some(next) => next,
                None => return Ok(self.row.take().map(|row| (row, false))),
            };

            match self.row.as_mut() {
                None => self.start_row(next.series, next.values),
                Some(row) if self.series == next.series => {
                    if self.chunk_size > 0 && row.values.len() >= self.chunk_size {
                        row.partial = true;
                        let full = self.row.take();
                        self.start_row(next.series, next.values);
                        return Ok(full.map(|row| (row, true)));
                    }
                    row.values.push(next.values);
                }
                Some(_) => {
                    let done = self.row.take();
                    self.start_row(next.series, next.values);
                    return Ok(done.map(|row| (row, true)));
                }
            }
        }
    }

    fn start_row(&mut self, series: CursorSeries, values: Vec<Value>) {
        self.row = Some(Row {
            name: series.name.clone(),
            tags: series.tags.clone(),
            columns: self.columns.clone(),
            values: vec![values],
            partial: false,
        });
        self.series = series;
    }

    /// Close the underlying cursor; safe after partial consumption or error
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.row = None;
            self.cursor.close();
        }
    }
}

impl Drop for Emitter {
    fn drop(&mut self) {
        self.close();
    }
}
