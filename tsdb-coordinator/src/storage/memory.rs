// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory shard store
//!
//! Shards hold series keyed by series key; each series keeps its samples
//! ordered by nanosecond timestamp. Writes to an existing timestamp merge
//! fields into the stored sample.

use super::error::{StorageError, StorageResult};
use super::point::{FieldValue, Point, Tags};
use super::traits::{
    KeyValue, SeriesData, SeriesSample, ShardGroup, TagKeys, TagValues, TsdbStore,
};
use crate::ast::expr::{NAME_VAR, TAG_KEY_VAR};
use crate::ast::{condition_expr, Expr, RegexLiteral, Source, TimeRange};
use crate::exec::auth::FineAuthorizer;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::sync::Arc;

const CHECKSUM_LEN: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Series {
    measurement: String,
    tags: Tags,
    samples: BTreeMap<i64, BTreeMap<String, FieldValue>>,
}

impl Series {
    /// Tags plus the `_name` pseudo-tag, for condition evaluation
    fn lookup(&self) -> Tags {
        let mut tags = self.tags.clone();
        tags.insert(NAME_VAR.to_string(), self.measurement.clone());
        tags
    }

    fn matches(&self, condition: Option<&Expr>) -> bool {
        condition.map_or(true, |c| c.eval_tags(&self.lookup()))
    }
}

#[derive(Debug)]
struct Shard {
    database: String,
    retention_policy: String,
    enabled: bool,
    series: BTreeMap<String, Series>,
}

type Shards = Arc<RwLock<BTreeMap<u64, Shard>>>;

fn nanos(t: DateTime<Utc>) -> i64 {
    t.timestamp_nanos_opt().unwrap_or(if t.timestamp() < 0 {
        i64::MIN
    } else {
        i64::MAX
    })
}

fn matches_sources(series: &Series, sources: &[Source]) -> bool {
    sources.is_empty()
        || sources.iter().any(|s| match s {
            Source::Measurement(m) => match &m.regex {
                Some(re) => re.is_match(&series.measurement),
                None => m.name == series.measurement,
            },
            Source::SubQuery(_) => false,
        })
}

fn visible(auth: &dyn FineAuthorizer, database: &str, series: &Series) -> bool {
    auth.is_open() || auth.authorize_series_read(database, &series.measurement, &series.tags)
}

/// Shard store held entirely in process memory
#[derive(Default)]
pub struct MemoryStore {
    shards: Shards,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of all local shards
    pub fn shard_ids(&self) -> Vec<u64> {
        self.shards.read().keys().copied().collect()
    }

    /// Number of samples stored in a shard
    pub fn sample_count(&self, shard_id: u64) -> usize {
        self.shards.read().get(&shard_id).map_or(0, |s| {
            s.series.values().map(|series| series.samples.len()).sum()
        })
    }
}

impl TsdbStore for MemoryStore {
    fn create_shard(
        &self,
        database: &str,
        retention_policy: &str,
        shard_id: u64,
        enabled: bool,
    ) -> StorageResult<()> {
        let mut shards = self.shards.write();
        shards.entry(shard_id).or_insert_with(|| Shard {
            database: database.to_string(),
            retention_policy: retention_policy.to_string(),
            enabled,
            series: BTreeMap::new(),
        });
        Ok(())
    }

    fn write_to_shard(&self, shard_id: u64, points: &[Point]) -> StorageResult<()> {
        let mut shards = self.shards.write();
        let shard = shards
            .get_mut(&shard_id)
            .ok_or(StorageError::ShardNotFound(shard_id))?;
        if !shard.enabled {
            return Err(StorageError::ShardDisabled(shard_id));
        }

        for point in points {
            let series = shard
                .series
                .entry(point.series_key())
                .or_insert_with(|| Series {
                    measurement: point.measurement().to_string(),
                    tags: point.tags().clone(),
                    samples: BTreeMap::new(),
                });
            series
                .samples
                .entry(nanos(point.time()))
                .or_default()
                .extend(point.fields().clone());
        }
        Ok(())
    }

    fn restore_shard(&self, id: u64, reader: &mut dyn Read) -> StorageResult<()> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        if buf.len() < CHECKSUM_LEN {
            return Err(StorageError::Serialization("truncated backup".to_string()));
        }
        let (payload, trailer) = buf.split_at(buf.len() - CHECKSUM_LEN);
        let mut expected = [0u8; CHECKSUM_LEN];
        expected.copy_from_slice(trailer);
        let expected = u32::from_le_bytes(expected);
        let actual = crc32fast::hash(payload);
        if expected != actual {
            return Err(StorageError::ChecksumMismatch { expected, actual });
        }
        let restored: Vec<(String, Series)> = bincode::deserialize(payload)?;

        let mut shards = self.shards.write();
        let shard = shards.get_mut(&id).ok_or(StorageError::ShardNotFound(id))?;
        for (key, series) in restored {
            match shard.series.get_mut(&key) {
                Some(existing) => {
                    for (t, fields) in series.samples {
                        existing.samples.entry(t).or_default().extend(fields);
                    }
                }
                None => {
                    shard.series.insert(key, series);
                }
            }
        }
        log::debug!("restored shard {}", id);
        Ok(())
    }

    fn backup_shard(
        &self,
        id: u64,
        since: DateTime<Utc>,
        writer: &mut dyn Write,
    ) -> StorageResult<()> {
        let since = nanos(since);
        let snapshot: Vec<(String, Series)> = {
            let shards = self.shards.read();
            let shard = shards.get(&id).ok_or(StorageError::ShardNotFound(id))?;
            shard
                .series
                .iter()
                .map(|(key, s)| {
                    let mut s = s.clone();
                    s.samples.retain(|t, _| *t >= since);
                    (key.clone(), s)
                })
                .filter(|(_, s)| !s.samples.is_empty())
                .collect()
        };

        let payload = bincode::serialize(&snapshot)?;
        writer.write_all(&payload)?;
        writer.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
        writer.flush()?;
        Ok(())
    }

    fn delete_database(&self, name: &str) -> StorageResult<()> {
        self.shards.write().retain(|_, s| s.database != name);
        Ok(())
    }

    fn delete_measurement(&self, database: &str, name: &str) -> StorageResult<()> {
        let mut shards = self.shards.write();
        for shard in shards.values_mut().filter(|s| s.database == database) {
            shard.series.retain(|_, s| s.measurement != name);
        }
        Ok(())
    }

    fn delete_retention_policy(&self, database: &str, name: &str) -> StorageResult<()> {
        self.shards
            .write()
            .retain(|_, s| !(s.database == database && s.retention_policy == name));
        Ok(())
    }

    fn delete_series(
        &self,
        database: &str,
        sources: &[Source],
        condition: Option<&Expr>,
    ) -> StorageResult<()> {
        let (condition, range) = condition_expr(condition, Utc::now())?;
        let (min, max) = (nanos(range.min_time()), nanos(range.max_time()));

        let mut shards = self.shards.write();
        for shard in shards.values_mut().filter(|s| s.database == database) {
            shard.series.retain(|_, s| {
                if !matches_sources(s, sources) || !s.matches(condition.as_ref()) {
                    return true;
                }
                if range.is_unbounded() {
                    return false;
                }
                s.samples.retain(|t, _| *t < min || *t > max);
                !s.samples.is_empty()
            });
        }
        Ok(())
    }

    fn delete_shard(&self, id: u64) -> StorageResult<()> {
        self.shards.write().remove(&id);
        Ok(())
    }

    fn measurement_names(
        &self,
        auth: &dyn FineAuthorizer,
        database: &str,
        condition: Option<&Expr>,
    ) -> StorageResult<Vec<String>> {
        let shards = self.shards.read();
        let names: BTreeSet<String> = shards
            .values()
            .filter(|s| s.database == database)
            .flat_map(|s| s.series.values())
            .filter(|s| visible(auth, database, s) && s.matches(condition))
            .map(|s| s.measurement.clone())
            .collect();
        Ok(names.into_iter().collect())
    }

    fn tag_keys(
        &self,
        auth: &dyn FineAuthorizer,
        shard_ids: &[u64],
        condition: Option<&Expr>,
    ) -> StorageResult<Vec<TagKeys>> {
        let shards = self.shards.read();
        let mut keys: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for shard in shard_ids.iter().filter_map(|id| shards.get(id)) {
            for series in shard.series.values() {
                if !visible(auth, &shard.database, series) || !series.matches(condition) {
                    continue;
                }
                keys.entry(series.measurement.clone())
                    .or_default()
                    .extend(series.tags.keys().cloned());
            }
        }
        Ok(keys
            .into_iter()
            .map(|(measurement, keys)| TagKeys {
                measurement,
                keys: keys.into_iter().collect(),
            })
            .collect())
    }

    fn tag_values(
        &self,
        auth: &dyn FineAuthorizer,
        shard_ids: &[u64],
        condition: Option<&Expr>,
    ) -> StorageResult<Vec<TagValues>> {
        let shards = self.shards.read();
        let mut values: BTreeMap<String, BTreeSet<KeyValue>> = BTreeMap::new();
        for shard in shard_ids.iter().filter_map(|id| shards.get(id)) {
            for series in shard.series.values() {
                if !visible(auth, &shard.database, series) {
                    continue;
                }
                let mut lookup = series.lookup();
                for (key, value) in &series.tags {
                    lookup.insert(TAG_KEY_VAR.to_string(), key.clone());
                    if condition.map_or(true, |c| c.eval_tags(&lookup)) {
                        values
                            .entry(series.measurement.clone())
                            .or_default()
                            .insert(KeyValue {
                                key: key.clone(),
                                value: value.clone(),
                            });
                    }
                }
            }
        }
        Ok(values
            .into_iter()
            .map(|(measurement, values)| TagValues {
                measurement,
                values: values.into_iter().collect(),
            })
            .collect())
    }

    fn series_cardinality(&self, database: &str) -> StorageResult<i64> {
        let shards = self.shards.read();
        let keys: BTreeSet<&String> = shards
            .values()
            .filter(|s| s.database == database)
            .flat_map(|s| s.series.keys())
            .collect();
        Ok(keys.len() as i64)
    }

    fn measurements_cardinality(&self, database: &str) -> StorageResult<i64> {
        let shards = self.shards.read();
        let names: BTreeSet<&String> = shards
            .values()
            .filter(|s| s.database == database)
            .flat_map(|s| s.series.values().map(|series| &series.measurement))
            .collect();
        Ok(names.len() as i64)
    }

    fn shard_group(&self, ids: &[u64]) -> Arc<dyn ShardGroup> {
        Arc::new(MemoryShardGroup {
            shards: Arc::clone(&self.shards),
            ids: ids.to_vec(),
        })
    }

    fn index_bytes(&self) -> Option<i64> {
        let shards = self.shards.read();
        let bytes: usize = shards
            .values()
            .flat_map(|s| s.series.iter())
            .map(|(key, series)| key.len() + series.measurement.len())
            .sum();
        Some(bytes as i64)
    }
}

/// Read view over a subset of a [`MemoryStore`]'s shards
pub struct MemoryShardGroup {
    shards: Shards,
    ids: Vec<u64>,
}

impl ShardGroup for MemoryShardGroup {
    fn shard_ids(&self) -> Vec<u64> {
        self.ids.clone()
    }

    fn measurement_names(&self, regex: Option<&RegexLiteral>) -> Vec<String> {
        let shards = self.shards.read();
        let names: BTreeSet<String> = self
            .ids
            .iter()
            .filter_map(|id| shards.get(id))
            .flat_map(|s| s.series.values())
            .filter(|s| regex.map_or(true, |re| re.is_match(&s.measurement)))
            .map(|s| s.measurement.clone())
            .collect();
        names.into_iter().collect()
    }

    fn field_keys(&self, measurement: &str) -> Vec<String> {
        let shards = self.shards.read();
        let keys: BTreeSet<String> = self
            .ids
            .iter()
            .filter_map(|id| shards.get(id))
            .flat_map(|s| s.series.values())
            .filter(|s| s.measurement == measurement)
            .flat_map(|s| s.samples.values().flat_map(|f| f.keys().cloned()))
            .collect();
        keys.into_iter().collect()
    }

    fn read_series(&self, measurement: &str, range: TimeRange) -> StorageResult<Vec<SeriesData>> {
        let (min, max) = (nanos(range.min_time()), nanos(range.max_time()));
        if min > max {
            return Ok(Vec::new());
        }
        let shards = self.shards.read();

        let mut merged: BTreeMap<&String, (Tags, BTreeMap<i64, BTreeMap<String, FieldValue>>)> =
            BTreeMap::new();
        for shard in self.ids.iter().filter_map(|id| shards.get(id)) {
            for (key, series) in &shard.series {
                if series.measurement != measurement {
                    continue;
                }
                let entry = merged
                    .entry(key)
                    .or_insert_with(|| (series.tags.clone(), BTreeMap::new()));
                for (t, fields) in series.samples.range(min..=max) {
                    entry.1.entry(*t).or_default().extend(fields.clone());
                }
            }
        }

        Ok(merged
            .into_values()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(tags, samples)| SeriesData {
                measurement: measurement.to_string(),
                tags,
                samples: samples
                    .into_iter()
                    .map(|(t, fields)| SeriesSample {
                        time: DateTime::from_timestamp_nanos(t),
                        fields,
                    })
                    .collect(),
            })
            .collect())
    }
}
