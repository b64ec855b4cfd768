// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Planner and shard-mapper seams
//!
//! The iterator engine behind SELECT lives outside this crate. The
//! coordinator prepares statements through [`QueryPlanner`] and receives a
//! [`Cursor`] it drives with an [`Emitter`](crate::exec::Emitter).

use super::trace::Span;
use crate::ast::{SelectStatement, Source, TimeRange};
use crate::exec::{Cursor, ExecutionError, FineAuthorizer, OpenAuthorizer};
use crate::storage::ShardGroup;
use parking_lot::Mutex;
use std::sync::Arc;

/// Limits and identity passed to the planner; zero limits are unlimited
#[derive(Clone)]
pub struct SelectOptions {
    pub node_id: u64,
    pub max_series_n: usize,
    pub max_point_n: usize,
    pub max_buckets_n: usize,
    pub authorizer: Arc<dyn FineAuthorizer>,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            node_id: 0,
            max_series_n: 0,
            max_point_n: 0,
            max_buckets_n: 0,
            authorizer: Arc::new(OpenAuthorizer),
        }
    }
}

impl std::fmt::Debug for SelectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("SelectOptions")
            .field("node_id", &self.node_id)
            .field("max_series_n", &self.max_series_n)
            .field("max_point_n", &self.max_point_n)
            .field("max_buckets_n", &self.max_buckets_n)
            .finish()
    }
}

/// Iterator opened during planning that must be closed after emission
pub trait AuxIterator: Send {
    fn close(&mut self);
}

/// Registry of auxiliary iterators opened by one select
#[derive(Clone, Default)]
pub struct AuxIterators {
    inner: Arc<Mutex<Vec<Box<dyn AuxIterator>>>>,
}

impl AuxIterators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, iterator: Box<dyn AuxIterator>) {
        self.inner.lock().push(iterator);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close and release every registered iterator
    pub fn close(&self) {
        let iterators = std::mem::take(&mut *self.inner.lock());
        for mut it in iterators {
            it.close();
        }
    }
}

/// Per-select instrumentation handed to the planner
#[derive(Clone, Default)]
pub struct SelectContext {
    pub span: Option<Span>,
    pub aux_iterators: Option<AuxIterators>,
}

impl SelectContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_aux_iterators(mut self, aux: AuxIterators) -> Self {
        self.aux_iterators = Some(aux);
        self
    }

    /// Child of the current span, when tracing
    pub fn start_span(&self, name: &str) -> Option<Span> {
        self.span.as_ref().map(|s| s.start_child(name))
    }
}

/// A statement that has been planned but not yet executed
pub trait PreparedStatement: Send {
    fn select(&mut self, ctx: &SelectContext) -> Result<Box<dyn Cursor>, ExecutionError>;

    /// Human-readable plan
    fn explain(&self) -> Result<String, ExecutionError>;

    fn close(&mut self);
}

pub trait QueryPlanner: Send + Sync {
    fn prepare(
        &self,
        stmt: &SelectStatement,
        mapper: &dyn ShardMapper,
        opts: &SelectOptions,
    ) -> Result<Box<dyn PreparedStatement>, ExecutionError>;

    /// Prepare and open a cursor in one step
    fn select(
        &self,
        ctx: &SelectContext,
        stmt: &SelectStatement,
        mapper: &dyn ShardMapper,
        opts: &SelectOptions,
    ) -> Result<Box<dyn Cursor>, ExecutionError> {
        let mut prepared = self.prepare(stmt, mapper, opts)?;
        let cursor = prepared.select(ctx);
        prepared.close();
        cursor
    }
}

/// Maps statement sources to the shards that hold them
pub trait ShardMapper: Send + Sync {
    fn map_shards(
        &self,
        sources: &[Source],
        range: TimeRange,
        opts: &SelectOptions,
    ) -> Result<Arc<dyn ShardGroup>, ExecutionError>;
}
