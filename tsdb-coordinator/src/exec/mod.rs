// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution primitives shared by every statement handler
//!
//! - [`ExecutionContext`]: result sink, cancellation and authorization
//! - [`Emitter`]: turns a [`Cursor`] into chunked [`Row`]s
//! - [`QueryResult`]: what clients receive

pub mod auth;
pub mod context;
pub mod cursor;
pub mod emitter;
pub mod error;
pub mod result;

pub use auth::{CoarseAuthorizer, FineAuthorizer, OpenAuthorizer, UserAuthorizer};
pub use context::{CancelHandle, CancelReason, ExecutionContext};
pub use cursor::{Cursor, CursorRow, CursorSeries, RowCursor};
pub use emitter::Emitter;
pub use error::{ExecutionError, ExecutionResult};
pub use result::{read_only_warning, Message, MessageLevel, QueryResult, Row};
