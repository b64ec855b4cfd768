// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! TSDB Coordinator - statement execution for a distributed time-series database
//!
//! The coordinator sits between the query parser and the data plane. It takes
//! parsed statements, fills in default databases and retention policies,
//! and dispatches each statement to the metadata service, the storage engine
//! or the SELECT planner. Results stream back to the client through a bounded
//! channel held by the [`ExecutionContext`].
//!
//! # Features
//!
//! - **Statement dispatch**: DDL, user and privilege management, SHOW family
//! - **Streaming SELECT**: chunked rows, `SELECT ... INTO` write-back
//! - **EXPLAIN / EXPLAIN ANALYZE**: plan rendering and traced execution
//! - **Query management**: SHOW QUERIES, KILL QUERY, timeouts and limits
//!
//! # Usage
//!
//! ```ignore
//! let executor = StatementExecutor::new(meta, store, planner, CoordinatorConfig::default());
//! let (mut ctx, mut results, cancel) = executor.new_context("db0");
//! executor.execute_query(&mut ctx, &cancel, statements, "").await?;
//! while let Some(result) = results.recv().await {
//!     println!("{:?}", result.series);
//! }
//! ```

pub mod ast;
pub mod config;
pub mod coordinator;
pub mod exec;
pub mod meta;
pub mod monitor;
pub mod plan;
pub mod storage;

// Re-export the public API - StatementExecutor is the main entry point
pub use config::CoordinatorConfig;
pub use coordinator::{StatementExecutor, StatementHandler, TaskManager};
pub use exec::{
    CancelHandle, CancelReason, ExecutionContext, ExecutionError, ExecutionResult, Message,
    QueryResult, Row,
};
pub use meta::{MemoryMetaClient, MetaClient};
pub use storage::{MemoryStore, TsdbStore, Value};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
