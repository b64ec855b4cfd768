// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Metadata gateway trait
//!
//! The coordinator reads and mutates cluster metadata only through this
//! trait. Implementations must be safe to share between concurrently running
//! statements.

use super::error::MetaResult;
use super::types::{
    DatabaseInfo, RetentionPolicyInfo, RetentionPolicySpec, RetentionPolicyUpdate,
    ShardGroupInfo, UserInfo,
};
use crate::ast::Privilege;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

pub trait MetaClient: Send + Sync {
    /// Snapshot of a database, or `None` when it does not exist
    fn database(&self, name: &str) -> Option<DatabaseInfo>;

    /// All databases ordered by name
    fn databases(&self) -> Vec<DatabaseInfo>;

    /// Create a database with the default retention policy
    ///
    /// Creating an existing database is not an error.
    fn create_database(&self, name: &str) -> MetaResult<DatabaseInfo>;

    /// Create a database whose default retention policy follows `spec`
    fn create_database_with_retention_policy(
        &self,
        name: &str,
        spec: &RetentionPolicySpec,
    ) -> MetaResult<DatabaseInfo>;

    fn drop_database(&self, name: &str) -> MetaResult<()>;

    fn create_retention_policy(
        &self,
        database: &str,
        spec: &RetentionPolicySpec,
        make_default: bool,
    ) -> MetaResult<RetentionPolicyInfo>;

    /// Look up a retention policy; `Ok(None)` when the database exists but
    /// the policy does not
    fn retention_policy(
        &self,
        database: &str,
        name: &str,
    ) -> MetaResult<Option<RetentionPolicyInfo>>;

    fn update_retention_policy(
        &self,
        database: &str,
        name: &str,
        update: &RetentionPolicyUpdate,
        make_default: bool,
    ) -> MetaResult<()>;

    fn drop_retention_policy(&self, database: &str, name: &str) -> MetaResult<()>;

    fn create_subscription(
        &self,
        database: &str,
        retention_policy: &str,
        name: &str,
        mode: &str,
        destinations: &[String],
    ) -> MetaResult<()>;

    fn drop_subscription(&self, database: &str, retention_policy: &str, name: &str)
        -> MetaResult<()>;

    fn create_user(&self, name: &str, password: &str, admin: bool) -> MetaResult<UserInfo>;

    fn update_user(&self, name: &str, password: &str) -> MetaResult<()>;

    fn drop_user(&self, name: &str) -> MetaResult<()>;

    /// All users ordered by name
    fn users(&self) -> Vec<UserInfo>;

    /// Per-database privileges of a user
    fn user_privileges(&self, name: &str) -> MetaResult<BTreeMap<String, Privilege>>;

    /// Privilege of a user on one database; `Privilege::None` when nothing
    /// has been granted
    fn user_privilege(&self, name: &str, database: &str) -> MetaResult<Privilege>;

    fn set_privilege(&self, name: &str, database: &str, privilege: Privilege) -> MetaResult<()>;

    fn set_admin_privilege(&self, name: &str, admin: bool) -> MetaResult<()>;

    fn create_continuous_query(&self, database: &str, name: &str, query: &str) -> MetaResult<()>;

    fn drop_continuous_query(&self, database: &str, name: &str) -> MetaResult<()>;

    /// Live shard groups of a retention policy overlapping `[min, max]`,
    /// ordered by start time
    fn shard_groups_by_time_range(
        &self,
        database: &str,
        retention_policy: &str,
        min: DateTime<Utc>,
        max: DateTime<Utc>,
    ) -> MetaResult<Vec<ShardGroupInfo>>;

    /// Return the shard group covering `timestamp`, creating it if needed
    fn create_shard_group(
        &self,
        database: &str,
        retention_policy: &str,
        timestamp: DateTime<Utc>,
    ) -> MetaResult<ShardGroupInfo>;

    /// Mark a shard group deleted; its shards stay listed in metadata
    fn delete_shard_group(&self, database: &str, retention_policy: &str, id: u64)
        -> MetaResult<()>;

    /// Remove a shard from every shard group that references it
    fn drop_shard(&self, id: u64) -> MetaResult<()>;
}
