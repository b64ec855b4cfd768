// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Local shard mapping

use crate::ast::{Source, TimeRange};
use crate::exec::{ExecutionError, ExecutionResult};
use crate::meta::MetaClient;
use crate::plan::{SelectOptions, ShardMapper};
use crate::storage::{ShardGroup, TsdbStore};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Maps normalized sources to shards held by the local store
pub struct LocalShardMapper {
    meta: Arc<dyn MetaClient>,
    store: Arc<dyn TsdbStore>,
}

impl LocalShardMapper {
    pub fn new(meta: Arc<dyn MetaClient>, store: Arc<dyn TsdbStore>) -> Self {
        Self { meta, store }
    }

    fn collect_shards(
        &self,
        sources: &[Source],
        range: TimeRange,
        shards: &mut BTreeSet<u64>,
    ) -> ExecutionResult<()> {
        for source in sources {
            match source {
                Source::Measurement(m) => {
                    if self.meta.database(&m.database).is_none() {
                        return Err(ExecutionError::DatabaseNotFound(m.database.clone()));
                    }
                    let groups = self.meta.shard_groups_by_time_range(
                        &m.database,
                        &m.retention_policy,
                        range.min_time(),
                        range.max_time(),
                    )?;
                    shards.extend(groups.iter().flat_map(|g| g.shard_ids()));
                }
                Source::SubQuery(stmt) => self.collect_shards(&stmt.sources, range, shards)?,
            }
        }
        Ok(())
    }
}

impl ShardMapper for LocalShardMapper {
    fn map_shards(
        &self,
        sources: &[Source],
        range: TimeRange,
        _opts: &SelectOptions,
    ) -> Result<Arc<dyn ShardGroup>, ExecutionError> {
        let mut shards = BTreeSet::new();
        self.collect_shards(sources, range, &mut shards)?;
        let ids: Vec<u64> = shards.into_iter().collect();
        Ok(self.store.shard_group(&ids))
    }
}
