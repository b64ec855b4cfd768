// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the metadata gateway

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetaError {
    #[error("invalid name")]
    InvalidName,

    #[error("database not found: {0}")]
    DatabaseNotFound(String),

    #[error("database already exists: {0}")]
    DatabaseExists(String),

    #[error("retention policy not found: {0}")]
    RetentionPolicyNotFound(String),

    #[error("retention policy already exists: {0}")]
    RetentionPolicyExists(String),

    #[error("retention policy conflicts with an existing policy: {0}")]
    RetentionPolicyConflict(String),

    #[error("retention policy duration must be at least {0}")]
    RetentionPolicyDurationTooLow(String),

    #[error("retention policy duration must be greater than the shard duration")]
    IncompatibleDurations,

    #[error("replication factor must be greater than 0")]
    ReplicationFactorTooLow,

    #[error("subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("subscription already exists: {0}")]
    SubscriptionExists(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("user already exists: {0}")]
    UserExists(String),

    #[error("username required")]
    UsernameRequired,

    #[error("continuous query not found: {0}")]
    ContinuousQueryNotFound(String),

    #[error("continuous query already exists: {0}")]
    ContinuousQueryExists(String),

    #[error("shard not found: {0}")]
    ShardNotFound(u64),

    #[error("shard group not found: {0}")]
    ShardGroupNotFound(u64),

    #[error("meta operation failed: {0}")]
    OperationFailed(String),
}

pub type MetaResult<T> = Result<T, MetaError>;
