// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage gateway traits
//!
//! [`TsdbStore`] is the local shard store as the coordinator sees it. The
//! engine's on-disk format is not visible through this interface.

use super::error::StorageResult;
use super::point::{FieldValue, Point, Tags};
use crate::ast::{Expr, RegexLiteral, Source, TimeRange};
use crate::exec::auth::FineAuthorizer;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::Arc;

/// Tag keys of one measurement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagKeys {
    pub measurement: String,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// Tag key/value pairs of one measurement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagValues {
    pub measurement: String,
    pub values: Vec<KeyValue>,
}

/// One stored sample of a series
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSample {
    pub time: DateTime<Utc>,
    pub fields: BTreeMap<String, FieldValue>,
}

/// Samples of one series in time order
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesData {
    pub measurement: String,
    pub tags: Tags,
    pub samples: Vec<SeriesSample>,
}

/// Read handle over a set of shards, used by the planner
pub trait ShardGroup: Send + Sync {
    fn shard_ids(&self) -> Vec<u64>;

    /// Measurement names present in the group, optionally filtered by regex
    fn measurement_names(&self, regex: Option<&RegexLiteral>) -> Vec<String>;

    /// Sorted field keys of a measurement
    fn field_keys(&self, measurement: &str) -> Vec<String>;

    /// Series of a measurement with samples inside `range`, ordered by
    /// series key
    fn read_series(&self, measurement: &str, range: TimeRange) -> StorageResult<Vec<SeriesData>>;
}

pub trait TsdbStore: Send + Sync {
    fn create_shard(
        &self,
        database: &str,
        retention_policy: &str,
        shard_id: u64,
        enabled: bool,
    ) -> StorageResult<()>;

    fn write_to_shard(&self, shard_id: u64, points: &[Point]) -> StorageResult<()>;

    /// Load a backup stream produced by [`TsdbStore::backup_shard`]
    fn restore_shard(&self, id: u64, reader: &mut dyn Read) -> StorageResult<()>;

    /// Write every sample at or after `since` to `writer`
    fn backup_shard(&self, id: u64, since: DateTime<Utc>, writer: &mut dyn Write)
        -> StorageResult<()>;

    fn delete_database(&self, name: &str) -> StorageResult<()>;

    fn delete_measurement(&self, database: &str, name: &str) -> StorageResult<()>;

    fn delete_retention_policy(&self, database: &str, name: &str) -> StorageResult<()>;

    /// Delete series matching the sources and condition; time bounds in the
    /// condition restrict which samples are removed
    fn delete_series(
        &self,
        database: &str,
        sources: &[Source],
        condition: Option<&Expr>,
    ) -> StorageResult<()>;

    fn delete_shard(&self, id: u64) -> StorageResult<()>;

    /// Sorted measurement names visible to `auth`
    fn measurement_names(
        &self,
        auth: &dyn FineAuthorizer,
        database: &str,
        condition: Option<&Expr>,
    ) -> StorageResult<Vec<String>>;

    /// Tag keys per measurement, both sorted
    fn tag_keys(
        &self,
        auth: &dyn FineAuthorizer,
        shard_ids: &[u64],
        condition: Option<&Expr>,
    ) -> StorageResult<Vec<TagKeys>>;

    /// Tag key/value pairs per measurement, both sorted
    fn tag_values(
        &self,
        auth: &dyn FineAuthorizer,
        shard_ids: &[u64],
        condition: Option<&Expr>,
    ) -> StorageResult<Vec<TagValues>>;

    fn series_cardinality(&self, database: &str) -> StorageResult<i64>;

    fn measurements_cardinality(&self, database: &str) -> StorageResult<i64>;

    fn shard_group(&self, ids: &[u64]) -> Arc<dyn ShardGroup>;

    /// Index memory usage in bytes, when the engine can report it
    fn index_bytes(&self) -> Option<i64> {
        None
    }
}
