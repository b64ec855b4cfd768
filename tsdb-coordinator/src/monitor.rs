// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Monitoring snapshots for SHOW STATS and SHOW DIAGNOSTICS

use crate::exec::ExecutionError;
use crate::storage::{Tags, Value};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Named, tagged set of counters
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statistic {
    pub name: String,
    pub tags: Tags,
    pub values: BTreeMap<String, Value>,
}

impl Statistic {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Value names in sorted order
    pub fn value_names(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }
}

/// Tabular diagnostics of one module
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Diagnostics {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Diagnostics {
    /// Single-row diagnostics from column/value pairs
    pub fn from_pairs(pairs: Vec<(&str, Value)>) -> Self {
        let (columns, row): (Vec<String>, Vec<Value>) =
            pairs.into_iter().map(|(c, v)| (c.to_string(), v)).unzip();
        Self {
            columns,
            rows: vec![row],
        }
    }
}

pub trait Monitor: Send + Sync {
    /// Statistics snapshot, optionally restricted to ones carrying `tags`
    fn statistics(&self, tags: Option<&Tags>) -> Result<Vec<Statistic>, ExecutionError>;

    /// Diagnostics keyed by module name
    fn diagnostics(&self) -> Result<BTreeMap<String, Diagnostics>, ExecutionError>;
}

/// Component that reports statistics to a [`SystemMonitor`]
pub trait StatisticsSource: Send + Sync {
    fn statistics(&self) -> Vec<Statistic>;
}

/// Monitor reporting process information plus registered sources
pub struct SystemMonitor {
    started: Instant,
    started_at: chrono::DateTime<chrono::Utc>,
    sources: RwLock<Vec<Arc<dyn StatisticsSource>>>,
}

impl SystemMonitor {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            started_at: chrono::Utc::now(),
            sources: RwLock::new(Vec::new()),
        }
    }

    pub fn register(&self, source: Arc<dyn StatisticsSource>) {
        self.sources.write().push(source);
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor for SystemMonitor {
    fn statistics(&self, tags: Option<&Tags>) -> Result<Vec<Statistic>, ExecutionError> {
        let uptime = self.started.elapsed();
        let mut stats = vec![Statistic::new("runtime")
            .with_value("uptimeNs", uptime.as_nanos().min(i64::MAX as u128) as i64)];
        for source in self.sources.read().iter() {
            stats.extend(source.statistics());
        }

        if let Some(tags) = tags {
            stats.retain(|s| tags.iter().all(|(k, v)| s.tags.get(k) == Some(v)));
        }
        Ok(stats)
    }

    fn diagnostics(&self) -> Result<BTreeMap<String, Diagnostics>, ExecutionError> {
        let uptime = crate::ast::format_duration(self.started.elapsed());
        Ok(BTreeMap::from([
            (
                "build".to_string(),
                Diagnostics::from_pairs(vec![
                    ("Version", Value::from(crate::VERSION)),
                    ("Crate", Value::from(crate::CRATE_NAME)),
                ]),
            ),
            (
                "system".to_string(),
                Diagnostics::from_pairs(vec![
                    ("PID", Value::from(std::process::id() as i64)),
                    ("currentTime", Value::Time(chrono::Utc::now())),
                    ("started", Value::Time(self.started_at)),
                    ("uptime", Value::from(uptime)),
                ]),
            ),
        ]))
    }
}
