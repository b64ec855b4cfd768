// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Coordinator configuration

use crate::plan::SelectOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Coordinator configuration
///
/// Select limits of 0 mean unlimited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Maximum points a SELECT may read
    pub max_select_point_n: usize,

    /// Maximum series a SELECT may touch
    pub max_select_series_n: usize,

    /// Maximum GROUP BY time buckets a SELECT may produce
    pub max_select_buckets_n: usize,

    /// Points buffered per flush for SELECT ... INTO
    pub into_buffer_capacity: usize,

    /// Tuples per emitted row when the context does not set one
    pub default_chunk_size: usize,

    /// Queries the task manager admits at once (0 = unlimited)
    pub max_concurrent_queries: usize,

    /// Capacity of the result channel handed to clients
    pub result_buffer: usize,

    /// Kill queries that run longer than this
    #[serde(with = "optional_secs")]
    pub query_timeout: Option<Duration>,

    /// Log queries that run longer than this
    #[serde(with = "optional_secs")]
    pub log_queries_after: Option<Duration>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_select_point_n: 0,
            max_select_series_n: 0,
            max_select_buckets_n: 0,
            into_buffer_capacity: 10_000,
            default_chunk_size: 10_000,
            max_concurrent_queries: 0,
            result_buffer: 16,
            query_timeout: None,
            log_queries_after: None,
        }
    }
}

impl CoordinatorConfig {
    /// Parse from JSON; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| format!("Invalid configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.into_buffer_capacity == 0 {
            return Err("into_buffer_capacity must be > 0".to_string());
        }
        if self.result_buffer == 0 {
            return Err("result_buffer must be > 0".to_string());
        }
        if self.query_timeout == Some(Duration::ZERO) {
            return Err("query_timeout must be > 0 when set".to_string());
        }
        Ok(())
    }

    /// Planner options carrying the configured limits
    pub fn select_options(&self, node_id: u64) -> SelectOptions {
        SelectOptions {
            node_id,
            max_series_n: self.max_select_series_n,
            max_point_n: self.max_select_point_n,
            max_buckets_n: self.max_select_buckets_n,
            ..SelectOptions::default()
        }
    }
}

mod optional_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(d)?;
        secs.map(|s| {
            Duration::try_from_secs_f64(s).map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}
