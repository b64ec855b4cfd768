// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the storage gateway

use super::point::PointError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("shard not found: {0}")]
    ShardNotFound(u64),

    #[error("shard is disabled: {0}")]
    ShardDisabled(u64),

    #[error("invalid point: {0}")]
    Point(#[from] PointError),

    #[error("invalid condition: {0}")]
    Condition(String),

    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<crate::ast::ConditionError> for StorageError {
    fn from(err: crate::ast::ConditionError) -> Self {
        StorageError::Condition(err.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
