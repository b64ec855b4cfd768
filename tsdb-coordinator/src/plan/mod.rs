// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query planning seams and execution tracing

pub mod planner;
pub mod trace;

pub use planner::{
    AuxIterator, AuxIterators, PreparedStatement, QueryPlanner, SelectContext, SelectOptions,
    ShardMapper,
};
pub use trace::{Field, Span, Trace, TreeNode};
