//! Test utilities for coordinator integration tests
//!
//! - TestFixture: executor wired to in-memory metadata and storage
//! - ScanPlanner: minimal SELECT planner that reads raw samples from shards
//! - CountingStore: storage wrapper that counts destructive calls
//!
//! Every fixture owns its own in-memory state, so tests are independent.

#![allow(dead_code)]

pub mod counting_store;
pub mod scan_planner;
pub mod test_fixture;
