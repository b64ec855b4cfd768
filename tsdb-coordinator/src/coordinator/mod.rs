// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement coordinator - central dispatch for statement execution
//!
//! The [`StatementExecutor`] is the single entry point: it normalizes parsed
//! statements, routes them to metadata, storage or the query planner and
//! streams results back through the execution context.

mod convert;
mod normalize;
mod points_writer;
mod select;
mod shard_mapper;
mod show;
mod statement_executor;
mod task_manager;

pub use convert::convert_row_to_points;
pub use normalize::normalize_statement;
pub use points_writer::{BufferedPointsWriter, IntoWriteRequest, LocalPointsWriter, PointsWriter};
pub use shard_mapper::LocalShardMapper;
pub use statement_executor::{StatementExecutor, StatementHandler};
pub use task_manager::{QueryGuard, QueryInfo, TaskManager, TaskStatus};
