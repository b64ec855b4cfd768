// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Metadata gateway: databases, retention policies, shard groups, users

pub mod client;
pub mod error;
pub mod memory;
pub mod types;

pub use client::MetaClient;
pub use error::{MetaError, MetaResult};
pub use memory::MemoryMetaClient;
pub use types::{
    valid_name, ContinuousQueryInfo, DatabaseInfo, RetentionPolicyInfo, RetentionPolicySpec,
    RetentionPolicyUpdate, ShardGroupInfo, ShardInfo, SubscriptionInfo, UserInfo,
    DEFAULT_RETENTION_POLICY_NAME,
};
