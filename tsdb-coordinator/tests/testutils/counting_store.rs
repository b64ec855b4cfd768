//! Storage wrapper counting destructive operations

use chrono::{DateTime, Utc};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tsdb_coordinator::ast::{Expr, Source};
use tsdb_coordinator::exec::FineAuthorizer;
use tsdb_coordinator::storage::{
    MemoryStore, Point, ShardGroup, StorageResult, TagKeys, TagValues, TsdbStore,
};

/// [`MemoryStore`] that records how many delete calls reached it
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    deletes: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Number of `write_to_shard` calls
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn deleted(&self) {
        self.deletes.fetch_add(1, Ordering::SeqCst);
    }
}

impl TsdbStore for CountingStore {
    fn create_shard(
        &self,
        database: &str,
        retention_policy: &str,
        shard_id: u64,
        enabled: bool,
    ) -> StorageResult<()> {
        self.inner
            .create_shard(database, retention_policy, shard_id, enabled)
    }

    fn write_to_shard(&self, shard_id: u64, points: &[Point]) -> StorageResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_to_shard(shard_id, points)
    }

    fn restore_shard(&self, id: u64, reader: &mut dyn Read) -> StorageResult<()> {
        self.inner.restore_shard(id, reader)
    }

    fn backup_shard(
        &self,
        id: u64,
        since: DateTime<Utc>,
        writer: &mut dyn Write,
    ) -> StorageResult<()> {
        self.inner.backup_shard(id, since, writer)
    }

    fn delete_database(&self, name: &str) -> StorageResult<()> {
        self.deleted();
        self.inner.delete_database(name)
    }

    fn delete_measurement(&self, database: &str, name: &str) -> StorageResult<()> {
        self.deleted();
        self.inner.delete_measurement(database, name)
    }

    fn delete_retention_policy(&self, database: &str, name: &str) -> StorageResult<()> {
        self.deleted();
        self.inner.delete_retention_policy(database, name)
    }

    fn delete_series(
        &self,
        database: &str,
        sources: &[Source],
        condition: Option<&Expr>,
    ) -> StorageResult<()> {
        self.deleted();
        self.inner.delete_series(database, sources, condition)
    }

    fn delete_shard(&self, id: u64) -> StorageResult<()> {
        self.deleted();
        self.inner.delete_shard(id)
    }

    fn measurement_names(
        &self,
        auth: &dyn FineAuthorizer,
        database: &str,
        condition: Option<&Expr>,
    ) -> StorageResult<Vec<String>> {
        self.inner.measurement_names(auth, database, condition)
    }

    fn tag_keys(
        &self,
        auth: &dyn FineAuthorizer,
        shard_ids: &[u64],
        condition: Option<&Expr>,
    ) -> StorageResult<Vec<TagKeys>> {
        self.inner.tag_keys(auth, shard_ids, condition)
    }

    fn tag_values(
        &self,
        auth: &dyn FineAuthorizer,
        shard_ids: &[u64],
        condition: Option<&Expr>,
    ) -> StorageResult<Vec<TagValues>> {
        self.inner.tag_values(auth, shard_ids, condition)
    }

    fn series_cardinality(&self, database: &str) -> StorageResult<i64> {
        self.inner.series_cardinality(database)
    }

    fn measurements_cardinality(&self, database: &str) -> StorageResult<i64> {
        self.inner.measurements_cardinality(database)
    }

    fn shard_group(&self, ids: &[u64]) -> Arc<dyn ShardGroup> {
        self.inner.shard_group(ids)
    }

    fn index_bytes(&self) -> Option<i64> {
        self.inner.index_bytes()
    }
}
