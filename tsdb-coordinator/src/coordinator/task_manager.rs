// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Running query registry
//!
//! Every query executed through [`StatementExecutor::execute_query`] is
//! attached here for its lifetime. The registry backs SHOW QUERIES and KILL
//! QUERY, enforces the concurrent query limit and arms the query timeout.
//!
//! [`StatementExecutor::execute_query`]: super::StatementExecutor::execute_query

use super::statement_executor::StatementHandler;
use crate::ast::Statement;
use crate::config::CoordinatorConfig;
use crate::exec::{
    read_only_warning, CancelHandle, CancelReason, ExecutionContext, ExecutionError,
    ExecutionResult, QueryResult, Row,
};
use crate::monitor::{Statistic, StatisticsSource};
use crate::storage::Value;
use async_trait::async_trait;
use log::{info, warn};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Killed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskStatus::Running => f.write_str("running"),
            TaskStatus::Killed => f.write_str("killed"),
        }
    }
}

/// Snapshot of one running query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryInfo {
    pub id: u64,
    pub query: String,
    pub database: String,
    pub duration: Duration,
    pub status: TaskStatus,
}

struct QueryTask {
    query: String,
    database: String,
    started: Instant,
    status: TaskStatus,
    cancel: CancelHandle,
    watchers: Vec<JoinHandle<()>>,
}

/// Detaches its query from the [`TaskManager`] on drop
pub struct QueryGuard<'a> {
    tasks: &'a TaskManager,
    qid: u64,
}

impl QueryGuard<'_> {
    pub fn id(&self) -> u64 {
        self.qid
    }
}

impl Drop for QueryGuard<'_> {
    fn drop(&mut self) {
        self.tasks.detach_query(self.qid);
    }
}

pub struct TaskManager {
    queries: RwLock<BTreeMap<u64, QueryTask>>,
    next_id: AtomicU64,
    executed: AtomicU64,
    finished: AtomicU64,
    max_concurrent_queries: usize,
    query_timeout: Option<Duration>,
    log_queries_after: Option<Duration>,
}

impl TaskManager {
    pub fn new(config: &CoordinatorConfig) -> Self {
        Self {
            queries: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            executed: AtomicU64::new(0),
            finished: AtomicU64::new(0),
            max_concurrent_queries: config.max_concurrent_queries,
            query_timeout: config.query_timeout,
            log_queries_after: config.log_queries_after,
        }
    }

    /// Register a query and return its id
    ///
    /// Killing the query or hitting the timeout signals `cancel`.
    pub fn attach_query(
        &self,
        query: &str,
        database: &str,
        cancel: CancelHandle,
    ) -> ExecutionResult<u64> {
        let mut queries = self.queries.write();
        if self.max_concurrent_queries > 0 && queries.len() >= self.max_concurrent_queries {
            return Err(ExecutionError::TaskManager(format!(
                "max-concurrent-queries limit exceeded({}, {})",
                queries.len(),
                self.max_concurrent_queries
            )));
        }

        let qid = self.next_id.fetch_add(1, Ordering::SeqCst);
        let watchers = self.spawn_watchers(qid, query, database, &cancel);
        queries.insert(
            qid,
            QueryTask {
                query: query.to_string(),
                database: database.to_string(),
                started: Instant::now(),
                status: TaskStatus::Running,
                cancel,
                watchers,
            },
        );
        self.executed.fetch_add(1, Ordering::Relaxed);
        Ok(qid)
    }

    /// Register a query that stays attached until the guard is dropped
    ///
    /// Dropping the guard covers callers that abandon the query future
    /// before it completes.
    pub fn attach_guarded(
        &self,
        query: &str,
        database: &str,
        cancel: CancelHandle,
    ) -> ExecutionResult<QueryGuard<'_>> {
        let qid = self.attach_query(query, database, cancel)?;
        Ok(QueryGuard { tasks: self, qid })
    }

    fn spawn_watchers(
        &self,
        qid: u64,
        query: &str,
        database: &str,
        cancel: &CancelHandle,
    ) -> Vec<JoinHandle<()>> {
        let mut watchers = Vec::new();
        // Timers need a runtime; outside one the query simply runs unwatched.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return watchers;
        };

        if let Some(threshold) = self.log_queries_after {
            let query = query.to_string();
            let database = database.to_string();
            watchers.push(runtime.spawn(async move {
                tokio::time::sleep(threshold).await;
                warn!(
                    "Detected slow query: {} (qid: {}, database: {}, threshold: {})",
                    query,
                    qid,
                    database,
                    pretty_duration(threshold)
                );
            }));
        }

        if let Some(timeout) = self.query_timeout {
            let cancel = cancel.clone();
            watchers.push(runtime.spawn(async move {
                tokio::time::sleep(timeout).await;
                warn!("Query {} timed out after {}", qid, pretty_duration(timeout));
                cancel.cancel(CancelReason::QueryTimeout);
            }));
        }
        watchers
    }

    /// Remove a finished query
    pub fn detach_query(&self, qid: u64) {
        if let Some(task) = self.queries.write().remove(&qid) {
            for watcher in task.watchers {
                watcher.abort();
            }
            self.finished.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn kill_query(&self, qid: u64) -> ExecutionResult<()> {
        let mut queries = self.queries.write();
        let task = queries
            .get_mut(&qid)
            .ok_or_else(|| ExecutionError::TaskManager(format!("no such query id: {}", qid)))?;

        info!("Killing query {}: {}", qid, task.query);
        task.cancel.cancel(CancelReason::QueryKilled);
        task.status = TaskStatus::Killed;
        Ok(())
    }

    /// Running queries ordered by id
    pub fn queries(&self) -> Vec<QueryInfo> {
        self.queries
            .read()
            .iter()
            .map(|(id, task)| QueryInfo {
                id: *id,
                query: task.query.clone(),
                database: task.database.clone(),
                duration: task.started.elapsed(),
                status: task.status,
            })
            .collect()
    }

    /// Kill every running query
    pub fn close(&self) {
        let mut queries = self.queries.write();
        for task in queries.values_mut() {
            task.cancel.cancel(CancelReason::QueryKilled);
            task.status = TaskStatus::Killed;
        }
    }

    fn show_queries(&self) -> Row {
        let mut row = Row::with_columns(&["qid", "query", "database", "duration", "status"]);
        for q in self.queries() {
            row.push(vec![
                Value::Unsigned(q.id),
                Value::String(q.query),
                Value::String(q.database),
                Value::String(pretty_duration(q.duration)),
                Value::String(q.status.to_string()),
            ]);
        }
        row
    }
}

#[async_trait]
impl StatementHandler for TaskManager {
    async fn execute_statement(
        &self,
        ctx: &ExecutionContext,
        stmt: &Statement,
    ) -> ExecutionResult<()> {
        match stmt {
            Statement::ShowQueries => ctx.send(QueryResult::rows(vec![self.show_queries()])).await,
            Statement::KillQuery(kill) => {
                if !kill.host.is_empty() {
                    return Err(ExecutionError::TaskManager(format!(
                        "cannot kill query on remote host: {}",
                        kill.host
                    )));
                }
                self.kill_query(kill.query_id)?;

                let mut messages = Vec::new();
                if ctx.read_only {
                    messages.push(read_only_warning(&stmt.to_string()));
                }
                ctx.send(QueryResult::default().with_messages(messages)).await
            }
            _ => Err(ExecutionError::InvalidQuery),
        }
    }
}

impl StatisticsSource for TaskManager {
    fn statistics(&self) -> Vec<Statistic> {
        vec![Statistic::new("queryExecutor")
            .with_value("queriesActive", self.queries.read().len() as i64)
            .with_value("queriesExecuted", self.executed.load(Ordering::Relaxed) as i64)
            .with_value("queriesFinished", self.finished.load(Ordering::Relaxed) as i64)]
    }
}

/// Coarse human-readable duration, e.g. `3s` or `12ms`
fn pretty_duration(d: Duration) -> String {
    if d >= Duration::from_secs(1) {
        format!("{}s", d.as_secs())
    } else if d >= Duration::from_millis(1) {
        format!("{}ms", d.as_millis())
    } else if d >= Duration::from_micros(1) {
        format!("{}µs", d.as_micros())
    } else {
        format!("{}ns", d.as_nanos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(max: usize) -> TaskManager {
        TaskManager::new(&CoordinatorConfig {
            max_concurrent_queries: max,
            ..Default::default()
        })
    }

    #[test]
    fn test_attach_kill_detach() {
        let tm = manager(0);
        let (handle, _rx) = CancelHandle::new();
        let qid = tm.attach_query("SELECT * FROM cpu", "db0", handle.clone()).unwrap();

        let queries = tm.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].status, TaskStatus::Running);

        tm.kill_query(qid).unwrap();
        assert_eq!(handle.reason(), Some(CancelReason::QueryKilled));
        assert_eq!(tm.queries()[0].status, TaskStatus::Killed);

        tm.detach_query(qid);
        assert!(tm.queries().is_empty());
        assert_eq!(
            tm.kill_query(qid),
            Err(ExecutionError::TaskManager(format!("no such query id: {}", qid)))
        );
    }

    #[test]
    fn test_concurrency_limit() {
        let tm = manager(1);
        let (h1, _r1) = CancelHandle::new();
        let (h2, _r2) = CancelHandle::new();
        let qid = tm.attach_query("q1", "db0", h1).unwrap();
        assert!(tm.attach_query("q2", "db0", h2.clone()).is_err());

        tm.detach_query(qid);
        assert!(tm.attach_query("q2", "db0", h2).is_ok());

        let stats = tm.statistics();
        assert_eq!(stats[0].values["queriesExecuted"], Value::Integer(2));
        assert_eq!(stats[0].values["queriesFinished"], Value::Integer(1));
    }

    #[test]
    fn test_guard_detaches_on_drop() {
        let tm = manager(1);
        let (handle, _rx) = CancelHandle::new();
        let guard = tm.attach_guarded("q1", "db0", handle.clone()).unwrap();
        assert_eq!(tm.queries()[0].id, guard.id());
        assert!(tm.attach_query("q2", "db0", handle.clone()).is_err());

        drop(guard);
        assert!(tm.queries().is_empty());
        assert!(tm.attach_guarded("q2", "db0", handle).is_ok());
        assert_eq!(tm.statistics()[0].values["queriesFinished"], Value::Integer(2));
    }

    #[tokio::test]
    async fn test_timeout_cancels_query() {
        let tm = TaskManager::new(&CoordinatorConfig {
            query_timeout: Some(Duration::from_millis(10)),
            ..Default::default()
        });
        let (handle, _rx) = CancelHandle::new();
        let qid = tm.attach_query("SELECT * FROM cpu", "db0", handle.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.reason(), Some(CancelReason::QueryTimeout));
        tm.detach_query(qid);
    }

    #[test]
    fn test_pretty_duration() {
        assert_eq!(pretty_duration(Duration::from_secs(3)), "3s");
        assert_eq!(pretty_duration(Duration::from_millis(12)), "12ms");
        assert_eq!(pretty_duration(Duration::from_nanos(5)), "5ns");
    }
}
