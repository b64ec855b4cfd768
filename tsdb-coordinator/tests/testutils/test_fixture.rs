//! Test fixture for coordinator integration tests
//!
//! Wires a [`StatementExecutor`] to an in-memory metadata client, a counting
//! in-memory store and the scan planner. Each fixture gets a uniquely named
//! default database.

use super::counting_store::CountingStore;
use super::scan_planner::ScanPlanner;
use chrono::DateTime;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tsdb_coordinator::ast::{Expr, Field, Measurement, SelectStatement, Source, Statement};
use tsdb_coordinator::coordinator::{IntoWriteRequest, LocalPointsWriter, PointsWriter};
use tsdb_coordinator::exec::{CancelHandle, ExecutionContext, ExecutionResult, QueryResult};
use tsdb_coordinator::meta::{MemoryMetaClient, MetaClient};
use tsdb_coordinator::storage::{Point, Tags, Value};
use tsdb_coordinator::{CoordinatorConfig, StatementExecutor};

pub const NODE_ID: u64 = 1;

/// Results buffered per context; larger than any test produces
const RESULT_BUFFER: usize = 256;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct TestFixture {
    pub meta: Arc<MemoryMetaClient>,
    pub store: Arc<CountingStore>,
    pub planner: Arc<ScanPlanner>,
    pub executor: StatementExecutor,
    database: String,
}

impl TestFixture {
    /// Fixture with one empty database
    pub fn new() -> Self {
        Self::with_config(CoordinatorConfig::default())
    }

    pub fn with_config(config: CoordinatorConfig) -> Self {
        let fixture = Self::empty_with_config(config);
        fixture
            .meta
            .create_database(&fixture.database)
            .expect("Failed to create test database");
        fixture
    }

    /// Fixture whose default database has not been created
    pub fn empty() -> Self {
        Self::empty_with_config(CoordinatorConfig::default())
    }

    fn empty_with_config(config: CoordinatorConfig) -> Self {
        init_logging();

        let meta = Arc::new(MemoryMetaClient::new(NODE_ID));
        let store = Arc::new(CountingStore::new());
        let planner = Arc::new(ScanPlanner::new());
        let executor =
            StatementExecutor::new(meta.clone(), store.clone(), planner.clone(), config);

        TestFixture {
            meta,
            store,
            planner,
            executor,
            database: format!("db_{}", fastrand::u32(..)),
        }
    }

    /// Fixture with cpu data already written
    pub fn with_cpu_data() -> Self {
        let fixture = Self::new();
        fixture.insert_cpu_data();
        fixture
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Context on the fixture database with the receiving half of its sink
    pub fn context(&self) -> (ExecutionContext, mpsc::Receiver<QueryResult>, CancelHandle) {
        let (ctx, results, cancel) = ExecutionContext::channel(RESULT_BUFFER);
        (
            ctx.with_database(self.database.clone()).with_node_id(NODE_ID),
            results,
            cancel,
        )
    }

    /// Normalize and execute one statement in a fresh context
    pub async fn run(&self, stmt: Statement) -> (ExecutionResult<()>, Vec<QueryResult>) {
        let (ctx, results, _cancel) = self.context();
        self.run_in(ctx, results, stmt).await
    }

    /// Normalize and execute one statement in `ctx`, then drain its sink
    pub async fn run_in(
        &self,
        ctx: ExecutionContext,
        mut results: mpsc::Receiver<QueryResult>,
        mut stmt: Statement,
    ) -> (ExecutionResult<()>, Vec<QueryResult>) {
        let database = ctx.database.clone();
        let outcome = match self.executor.normalize_statement(&mut stmt, &database, "") {
            Ok(()) => self.executor.execute_statement(&ctx, &stmt).await,
            Err(e) => Err(e),
        };
        drop(ctx);

        let mut collected = Vec::new();
        while let Some(result) = results.recv().await {
            collected.push(result);
        }
        (outcome, collected)
    }

    /// Execute a statement that must succeed and return its results
    pub async fn run_ok(&self, stmt: Statement) -> Vec<QueryResult> {
        let text = stmt.to_string();
        let (outcome, results) = self.run(stmt).await;
        if let Err(e) = outcome {
            panic!("Statement should succeed: {}\nError: {}", text, e);
        }
        results
    }

    /// Execute a statement that must fail and return the error text
    pub async fn run_err(&self, stmt: Statement) -> String {
        let text = stmt.to_string();
        let (outcome, results) = self.run(stmt).await;
        match outcome {
            Ok(()) => panic!("Statement should fail: {}", text),
            Err(e) => {
                assert!(results.is_empty(), "failed statement produced results");
                e.to_string()
            }
        }
    }

    /// Write one point through the local points writer
    pub fn write_point(
        &self,
        measurement: &str,
        tags: &[(&str, &str)],
        fields: &[(&str, Value)],
        time_secs: i64,
    ) {
        let tags: Tags = tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let fields: BTreeMap<String, Value> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let time = DateTime::from_timestamp(time_secs, 0).expect("Invalid timestamp");
        let point = Point::new(measurement, tags, fields, time).expect("Invalid point");

        let writer = LocalPointsWriter::new(self.meta.clone(), self.store.clone());
        writer
            .write_points_into(&IntoWriteRequest {
                database: self.database.clone(),
                retention_policy: String::new(),
                points: vec![point],
            })
            .expect("Failed to write point");
    }

    /// Two cpu series (server01, server02) with three samples each at
    /// 0s, 10s and 20s, plus one mem series
    pub fn insert_cpu_data(&self) {
        for (i, host) in ["server01", "server02"].iter().enumerate() {
            for step in 0..3 {
                let value = (i * 10 + step as usize) as f64;
                self.write_point(
                    "cpu",
                    &[("host", host), ("region", "west")],
                    &[("value", Value::Float(value))],
                    step * 10,
                );
            }
        }
        self.write_point(
            "mem",
            &[("host", "server01")],
            &[("free", Value::Integer(1024))],
            0,
        );
    }

    /// Shard ids of every group in the fixture database
    pub fn shard_ids(&self) -> Vec<u64> {
        self.meta
            .database(&self.database)
            .map(|db| {
                db.retention_policies
                    .iter()
                    .flat_map(|rp| rp.shard_groups.iter())
                    .flat_map(|sg| sg.shard_ids())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// `SELECT * FROM <measurement>`
pub fn select_all(measurement: &str) -> SelectStatement {
    SelectStatement {
        fields: vec![Field::new(Expr::Wildcard)],
        sources: vec![Source::Measurement(Measurement::named(measurement))],
        ..Default::default()
    }
}

/// Every series row across results
pub fn all_rows(results: &[QueryResult]) -> Vec<&tsdb_coordinator::Row> {
    results.iter().flat_map(|r| r.series.iter()).collect()
}

/// First column of every tuple of a single-row result
pub fn first_column(result: &QueryResult) -> Vec<Value> {
    result
        .series
        .iter()
        .flat_map(|row| row.values.iter().map(|v| v[0].clone()))
        .collect()
}

pub fn strings(values: &[&str]) -> Vec<Value> {
    values.iter().map(|v| Value::from(*v)).collect()
}
