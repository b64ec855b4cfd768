// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution error types

use super::context::CancelReason;
use crate::ast::ConditionError;
use crate::meta::MetaError;
use crate::storage::{PointError, StorageError};
use thiserror::Error;

/// Execution errors
///
/// Errors are `Clone` so a failed enumeration can be delivered to the client
/// inside a [`QueryResult`](super::QueryResult).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("invalid query")]
    InvalidQuery,

    #[error("database name required")]
    DatabaseNameRequired,

    #[error("invalid name")]
    InvalidName,

    #[error("invalid measurement")]
    InvalidMeasurement,

    #[error("{0} doesn't support time in WHERE clause")]
    TimeConditionNotSupported(&'static str),

    #[error("invalid time condition: {0}")]
    InvalidTimeCondition(String),

    #[error("database not found: {0}")]
    DatabaseNotFound(String),

    #[error("retention policy not found: {0}")]
    RetentionPolicyNotFound(String),

    #[error("default retention policy not set for: {0}")]
    DefaultRetentionPolicyNotSet(String),

    #[error("planning error: {0}")]
    Planning(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("query aborted")]
    QueryAborted,

    #[error("{0}")]
    Cancelled(CancelReason),

    #[error("writer for {writer} can't write into {request}")]
    WriterTargetMismatch { writer: String, request: String },

    #[error("no database in target")]
    NoDatabaseInTarget,

    #[error("{0}")]
    Conversion(String),

    #[error(transparent)]
    Meta(#[from] MetaError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("monitor error: {0}")]
    Monitor(String),

    #[error("{0}")]
    TaskManager(String),
}

impl From<ConditionError> for ExecutionError {
    fn from(err: ConditionError) -> Self {
        ExecutionError::InvalidTimeCondition(err.to_string())
    }
}

impl From<PointError> for ExecutionError {
    fn from(err: PointError) -> Self {
        ExecutionError::Conversion(err.to_string())
    }
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;
