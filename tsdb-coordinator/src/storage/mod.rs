// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage gateway
//!
//! This module provides:
//! - Result values and write-path points
//! - The [`TsdbStore`] and [`ShardGroup`] traits the coordinator consumes
//! - An in-memory store with checksummed shard backups

pub mod error;
pub mod memory;
pub mod point;
pub mod traits;
pub mod value;

pub use error::{StorageError, StorageResult};
pub use memory::{MemoryShardGroup, MemoryStore};
pub use point::{FieldValue, Point, PointError, Tags};
pub use traits::{
    KeyValue, SeriesData, SeriesSample, ShardGroup, TagKeys, TagValues, TsdbStore,
};
pub use value::Value;
