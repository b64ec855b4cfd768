// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Metadata entities
//!
//! These are plain snapshot values returned by the metadata gateway. Callers
//! never mutate them in place; changes go through [`super::MetaClient`].

use crate::ast::Privilege;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Name used for the retention policy created with a database
pub const DEFAULT_RETENTION_POLICY_NAME: &str = "autogen";

/// Replica count used when none is given
pub const DEFAULT_REPLICA_N: u32 = 1;

/// Shortest finite retention duration accepted
pub const MIN_RETENTION_POLICY_DURATION: Duration = Duration::from_secs(3600);

const HOUR: Duration = Duration::from_secs(3600);
const DAY: Duration = Duration::from_secs(24 * 3600);
const WEEK: Duration = Duration::from_secs(7 * 24 * 3600);

/// Shard group duration derived from a retention duration
///
/// A zero retention duration means keep forever.
pub fn normalised_shard_duration(duration: Duration) -> Duration {
    if duration.is_zero() {
        WEEK
    } else if duration < 2 * DAY {
        HOUR
    } else if duration < 180 * DAY {
        DAY
    } else {
        WEEK
    }
}

/// Names may not be empty, contain path separators, or be `.`/`..`
pub fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.chars().any(|c| c == '/' || c == '\\' || c.is_control())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub default_retention_policy: String,
    pub retention_policies: Vec<RetentionPolicyInfo>,
    pub continuous_queries: Vec<ContinuousQueryInfo>,
}

impl DatabaseInfo {
    pub fn retention_policy(&self, name: &str) -> Option<&RetentionPolicyInfo> {
        self.retention_policies.iter().find(|rp| rp.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionPolicyInfo {
    pub name: String,
    pub replica_n: u32,
    /// Zero means infinite retention
    pub duration: Duration,
    pub shard_group_duration: Duration,
    pub shard_groups: Vec<ShardGroupInfo>,
    pub subscriptions: Vec<SubscriptionInfo>,
}

impl RetentionPolicyInfo {
    /// Live shard group whose window contains `t`
    pub fn shard_group_by_timestamp(&self, t: DateTime<Utc>) -> Option<&ShardGroupInfo> {
        self.shard_groups
            .iter()
            .find(|sg| !sg.deleted() && sg.contains(t))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardGroupInfo {
    pub id: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub shards: Vec<ShardInfo>,
}

impl ShardGroupInfo {
    pub fn deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Window test, start inclusive and end exclusive
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start_time <= t && t < self.end_time
    }

    /// True if the window intersects the inclusive range `[min, max]`
    pub fn overlaps(&self, min: DateTime<Utc>, max: DateTime<Utc>) -> bool {
        self.start_time <= max && self.end_time > min
    }

    pub fn shard_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.shards.iter().map(|s| s.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardInfo {
    pub id: u64,
    /// Node ids holding a copy of this shard
    pub owners: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub name: String,
    pub mode: String,
    pub destinations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousQueryInfo {
    pub name: String,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub hash: String,
    pub admin: bool,
    pub privileges: BTreeMap<String, Privilege>,
}

/// Requested shape of a new retention policy
///
/// Unset fields fall back to defaults when the policy is created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetentionPolicySpec {
    pub name: String,
    pub replica_n: Option<u32>,
    pub duration: Option<Duration>,
    pub shard_group_duration: Duration,
}

impl RetentionPolicySpec {
    /// Materialise the spec with defaults applied
    pub fn to_info(&self) -> RetentionPolicyInfo {
        let duration = self.duration.unwrap_or(Duration::ZERO);
        let shard_group_duration = if self.shard_group_duration.is_zero() {
            normalised_shard_duration(duration)
        } else {
            self.shard_group_duration
        };
        let name = if self.name.is_empty() {
            DEFAULT_RETENTION_POLICY_NAME.to_string()
        } else {
            self.name.clone()
        };
        RetentionPolicyInfo {
            name,
            replica_n: self.replica_n.unwrap_or(DEFAULT_REPLICA_N),
            duration,
            shard_group_duration,
            shard_groups: Vec::new(),
            subscriptions: Vec::new(),
        }
    }

    /// Whether an existing policy already satisfies this spec
    pub fn matches(&self, rp: &RetentionPolicyInfo) -> bool {
        let want = self.to_info();
        want.name == rp.name
            && want.replica_n == rp.replica_n
            && want.duration == rp.duration
            && want.shard_group_duration == rp.shard_group_duration
    }
}

/// Partial update applied by ALTER RETENTION POLICY
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetentionPolicyUpdate {
    pub name: Option<String>,
    pub duration: Option<Duration>,
    pub replica_n: Option<u32>,
    pub shard_group_duration: Option<Duration>,
}
