//! Whole-query execution, SHOW QUERIES and KILL QUERY tests

#[path = "testutils/mod.rs"]
mod testutils;

use testutils::test_fixture::{all_rows, select_all, TestFixture};
use tokio::sync::mpsc;
use tsdb_coordinator::ast::{KillQueryStatement, ShowRetentionPoliciesStatement, Statement};
use tsdb_coordinator::exec::{CancelHandle, CancelReason, ExecutionError, QueryResult};
use tsdb_coordinator::storage::Value;
use tsdb_coordinator::CoordinatorConfig;

async fn drain(mut results: mpsc::Receiver<QueryResult>) -> Vec<QueryResult> {
    let mut collected = Vec::new();
    while let Some(result) = results.recv().await {
        collected.push(result);
    }
    collected
}

async fn execute_query(fixture: &TestFixture, statements: Vec<Statement>) -> Vec<QueryResult> {
    let (mut ctx, results, cancel) = fixture.executor.new_context(fixture.database());
    fixture
        .executor
        .execute_query(&mut ctx, &cancel, statements, "")
        .await
        .expect("Query should deliver its results");
    drop(ctx);
    drain(results).await
}

fn kill(query_id: u64, host: &str) -> Statement {
    Statement::KillQuery(KillQueryStatement {
        query_id,
        host: host.to_string(),
    })
}

#[tokio::test]
async fn test_execute_query_numbers_statements() {
    let fixture = TestFixture::with_cpu_data();

    let results = execute_query(
        &fixture,
        vec![Statement::ShowDatabases, Statement::Select(select_all("cpu"))],
    )
    .await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].statement_id, 0);
    assert_eq!(results[1].statement_id, 1);
    assert_eq!(results[2].statement_id, 1);
    assert_eq!(all_rows(&results[1..]).len(), 2);
    assert!(fixture.executor.task_manager().queries().is_empty());
}

#[tokio::test]
async fn test_execute_query_stops_at_first_error() {
    let fixture = TestFixture::new();

    let results = execute_query(
        &fixture,
        vec![
            Statement::ShowRetentionPolicies(ShowRetentionPoliciesStatement {
                database: "nope".to_string(),
            }),
            Statement::ShowDatabases,
        ],
    )
    .await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].statement_id, 0);
    assert_eq!(
        results[0].error,
        Some(ExecutionError::DatabaseNotFound("nope".to_string()))
    );
}

#[tokio::test]
async fn test_execute_query_reports_normalize_errors() {
    let fixture = TestFixture::new();
    let mut stmt = select_all("cpu");
    stmt.sources = vec![tsdb_coordinator::ast::Source::Measurement(
        tsdb_coordinator::ast::Measurement::qualified("nowhere", "", "cpu"),
    )];

    let results = execute_query(&fixture, vec![Statement::ShowUsers, Statement::Select(stmt)]).await;
    assert_eq!(results.len(), 2);
    assert!(results[0].error.is_none());
    assert_eq!(results[1].statement_id, 1);
    assert_eq!(
        results[1].error,
        Some(ExecutionError::DatabaseNotFound("nowhere".to_string()))
    );
}

#[tokio::test]
async fn test_show_queries_lists_running_query() {
    let fixture = TestFixture::new();

    let results = execute_query(&fixture, vec![Statement::ShowQueries]).await;
    let row = &results[0].series[0];
    assert_eq!(row.columns, vec!["qid", "query", "database", "duration", "status"]);
    assert_eq!(row.values.len(), 1);
    assert_eq!(row.values[0][1], Value::from("SHOW QUERIES"));
    assert_eq!(row.values[0][2], Value::from(fixture.database()));
    assert_eq!(row.values[0][4], Value::from("running"));

    // Detached once finished.
    let results = fixture.run_ok(Statement::ShowQueries).await;
    assert!(results[0].series[0].values.is_empty());
}

#[tokio::test]
async fn test_kill_query() {
    let fixture = TestFixture::new();
    let tasks = fixture.executor.task_manager();
    let (handle, _rx) = CancelHandle::new();
    let qid = tasks
        .attach_query("SELECT * FROM cpu", fixture.database(), handle.clone())
        .unwrap();

    let results = fixture.run_ok(kill(qid, "")).await;
    assert_eq!(results.len(), 1);
    assert!(results[0].messages.is_empty());
    assert_eq!(handle.reason(), Some(CancelReason::QueryKilled));

    let results = fixture.run_ok(Statement::ShowQueries).await;
    assert_eq!(results[0].series[0].values[0][4], Value::from("killed"));

    tasks.detach_query(qid);
    let err = fixture.run_err(kill(qid, "")).await;
    assert!(err.contains("no such query id"), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_kill_query_on_remote_host() {
    let fixture = TestFixture::new();
    let (handle, _rx) = CancelHandle::new();
    let qid = fixture
        .executor
        .task_manager()
        .attach_query("SELECT * FROM cpu", fixture.database(), handle.clone())
        .unwrap();

    let err = fixture.run_err(kill(qid, "node2:8088")).await;
    assert!(err.contains("node2:8088"), "unexpected error: {}", err);
    assert_eq!(handle.reason(), None);
}

#[tokio::test]
async fn test_kill_query_read_only_warns() {
    let fixture = TestFixture::new();
    let (handle, _rx) = CancelHandle::new();
    let qid = fixture
        .executor
        .task_manager()
        .attach_query("SELECT * FROM cpu", fixture.database(), handle)
        .unwrap();

    let (ctx, rx, _cancel) = fixture.context();
    let (outcome, results) = fixture
        .run_in(ctx.with_read_only(true), rx, kill(qid, ""))
        .await;
    assert!(outcome.is_ok());
    assert_eq!(results[0].messages.len(), 1);
}

#[tokio::test]
async fn test_max_concurrent_queries() {
    let fixture = TestFixture::with_config(CoordinatorConfig {
        max_concurrent_queries: 1,
        ..Default::default()
    });
    let (handle, _rx) = CancelHandle::new();
    let qid = fixture
        .executor
        .task_manager()
        .attach_query("SELECT * FROM cpu", fixture.database(), handle)
        .unwrap();

    let results = execute_query(&fixture, vec![Statement::ShowDatabases]).await;
    assert_eq!(results.len(), 1);
    match &results[0].error {
        Some(ExecutionError::TaskManager(msg)) => {
            assert!(msg.contains("max-concurrent-queries"), "unexpected error: {}", msg)
        }
        other => panic!("expected a task manager error, got {:?}", other),
    }

    fixture.executor.task_manager().detach_query(qid);
    let results = execute_query(&fixture, vec![Statement::ShowDatabases]).await;
    assert!(results[0].error.is_none());
}

#[tokio::test]
async fn test_killed_query_stops_streaming() {
    let fixture = TestFixture::with_cpu_data();

    let (mut ctx, results, cancel) = fixture.executor.new_context(fixture.database());
    cancel.cancel(CancelReason::QueryKilled);
    let outcome = fixture
        .executor
        .execute_query(&mut ctx, &cancel, vec![Statement::Select(select_all("cpu"))], "")
        .await;
    drop(ctx);

    // The error result is not delivered once the query is cancelled.
    assert_eq!(outcome, Err(ExecutionError::Cancelled(CancelReason::QueryKilled)));
    let results = drain(results).await;
    assert!(results.is_empty());
    assert!(fixture.executor.task_manager().queries().is_empty());
}

#[tokio::test]
async fn test_abandoned_query_releases_its_slot() {
    let fixture = TestFixture::with_config(CoordinatorConfig {
        result_buffer: 1,
        max_concurrent_queries: 1,
        ..Default::default()
    });
    fixture.insert_cpu_data();

    // Nobody reads the results, so the second series blocks the query.
    let (mut ctx, _unread, cancel) = fixture.executor.new_context(fixture.database());
    let outcome = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        fixture.executor.execute_query(
            &mut ctx,
            &cancel,
            vec![Statement::Select(select_all("cpu"))],
            "",
        ),
    )
    .await;
    assert!(outcome.is_err());
    assert!(fixture.executor.task_manager().queries().is_empty());

    let results = execute_query(&fixture, vec![Statement::ShowDatabases]).await;
    assert_eq!(results.len(), 1);
    assert!(results[0].error.is_none());
}
