// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Write-back path for SELECT ... INTO

use crate::exec::{ExecutionError, ExecutionResult};
use crate::meta::{MetaClient, ShardGroupInfo};
use crate::storage::{Point, TsdbStore};
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Batch of points bound for one database and retention policy
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntoWriteRequest {
    pub database: String,
    pub retention_policy: String,
    pub points: Vec<Point>,
}

/// Downstream sink for INTO writes
pub trait PointsWriter: Send + Sync {
    fn write_points_into(&self, req: &IntoWriteRequest) -> ExecutionResult<()>;
}

/// Buffers INTO points so they reach the downstream writer in batches
///
/// Bound to a single target; requests for another database or retention
/// policy are rejected before anything is buffered.
pub struct BufferedPointsWriter {
    writer: Arc<dyn PointsWriter>,
    buffer: Vec<Point>,
    capacity: usize,
    database: String,
    retention_policy: String,
}

impl BufferedPointsWriter {
    pub fn new(
        writer: Arc<dyn PointsWriter>,
        database: impl Into<String>,
        retention_policy: impl Into<String>,
        capacity: usize,
    ) -> Self {
        let capacity = capacity.max(1);
        Self {
            writer,
            buffer: Vec::with_capacity(capacity),
            capacity,
            database: database.into(),
            retention_policy: retention_policy.into(),
        }
    }

    /// Append the request's points, flushing each time the buffer fills
    pub fn write_points_into(&mut self, req: &IntoWriteRequest) -> ExecutionResult<()> {
        if req.database != self.database || req.retention_policy != self.retention_policy {
            return Err(ExecutionError::WriterTargetMismatch {
                writer: format!("{}.{}", self.database, self.retention_policy),
                request: format!("{}.{}", req.database, req.retention_policy),
            });
        }

        let mut rest = req.points.as_slice();
        while !rest.is_empty() {
            let n = (self.capacity - self.buffer.len()).min(rest.len());
            self.buffer.extend_from_slice(&rest[..n]);
            rest = &rest[n..];

            if self.buffer.len() == self.capacity {
                self.flush()?;
            }
        }
        Ok(())
    }

    /// Send buffered points downstream as one batch
    pub fn flush(&mut self) -> ExecutionResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        debug!(
            "Flushing {} points into {}.{}",
            self.buffer.len(),
            self.database,
            self.retention_policy
        );
        let req = IntoWriteRequest {
            database: self.database.clone(),
            retention_policy: self.retention_policy.clone(),
            points: std::mem::take(&mut self.buffer),
        };
        let result = self.writer.write_points_into(&req);
        self.buffer = req.points;
        result?;
        self.buffer.clear();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Writes INTO points straight to the local store
///
/// Points are routed to the shard group covering their timestamp, which is
/// created through the metadata gateway when missing. Within a group the
/// series key picks the shard.
pub struct LocalPointsWriter {
    meta: Arc<dyn MetaClient>,
    store: Arc<dyn TsdbStore>,
}

impl LocalPointsWriter {
    pub fn new(meta: Arc<dyn MetaClient>, store: Arc<dyn TsdbStore>) -> Self {
        Self { meta, store }
    }

    fn shard_for(group: &ShardGroupInfo, point: &Point) -> Option<u64> {
        if group.shards.is_empty() {
            return None;
        }
        let idx = crc32fast::hash(point.series_key().as_bytes()) as usize % group.shards.len();
        Some(group.shards[idx].id)
    }
}

impl PointsWriter for LocalPointsWriter {
    fn write_points_into(&self, req: &IntoWriteRequest) -> ExecutionResult<()> {
        let db = self
            .meta
            .database(&req.database)
            .ok_or_else(|| ExecutionError::DatabaseNotFound(req.database.clone()))?;
        let rp = if req.retention_policy.is_empty() {
            db.default_retention_policy.clone()
        } else {
            req.retention_policy.clone()
        };

        let mut groups: Vec<ShardGroupInfo> = Vec::new();
        let mut by_shard: BTreeMap<u64, Vec<Point>> = BTreeMap::new();
        for point in &req.points {
            let idx = match groups.iter().position(|g| g.contains(point.time())) {
                Some(idx) => idx,
                None => {
                    let group = self.meta.create_shard_group(&db.name, &rp, point.time())?;
                    for id in group.shard_ids() {
                        self.store.create_shard(&db.name, &rp, id, true)?;
                    }
                    groups.push(group);
                    groups.len() - 1
                }
            };
            let group = &groups[idx];

            let shard = Self::shard_for(group, point).ok_or_else(|| {
                ExecutionError::Execution(format!("shard group {} has no shards", group.id))
            })?;
            by_shard.entry(shard).or_default().push(point.clone());
        }

        for (shard, points) in by_shard {
            self.store.write_to_shard(shard, &points)?;
        }
        Ok(())
    }
}
