//! SELECT streaming, SELECT ... INTO and EXPLAIN tests

#[path = "testutils/mod.rs"]
mod testutils;

use testutils::test_fixture::{all_rows, select_all, TestFixture};
use tsdb_coordinator::ast::{ExplainStatement, Measurement, Statement, Target};
use tsdb_coordinator::exec::{CancelReason, ExecutionError};
use tsdb_coordinator::meta::MetaClient;
use tsdb_coordinator::storage::Value;
use tsdb_coordinator::CoordinatorConfig;

#[tokio::test]
async fn test_select_streams_one_row_per_series() {
    let fixture = TestFixture::with_cpu_data();

    let results = fixture.run_ok(Statement::Select(select_all("cpu"))).await;
    assert_eq!(results.len(), 2);

    let rows = all_rows(&results);
    assert_eq!(rows[0].name, "cpu");
    assert_eq!(rows[0].columns, vec!["time", "value"]);
    assert_eq!(rows[0].tags["host"], "server01");
    assert_eq!(rows[0].values.len(), 3);
    assert_eq!(rows[0].values[1][1], Value::Float(1.0));
    assert_eq!(rows[1].tags["host"], "server02");

    // More rows follow the first series, none after the last.
    assert!(results[0].partial);
    assert!(!results[1].partial);
    assert_eq!(fixture.planner.prepared(), 1);
}

#[tokio::test]
async fn test_select_chunks_rows() {
    let fixture = TestFixture::with_cpu_data();

    let (ctx, rx, _cancel) = fixture.context();
    let (outcome, results) = fixture
        .run_in(ctx.with_chunk_size(2), rx, Statement::Select(select_all("cpu")))
        .await;
    assert!(outcome.is_ok());

    let sizes: Vec<usize> = all_rows(&results).iter().map(|r| r.values.len()).collect();
    assert_eq!(sizes, vec![2, 1, 2, 1]);
    assert!(results[0].series[0].partial);
    assert!(!results[1].series[0].partial);
}

#[tokio::test]
async fn test_select_without_rows_sends_one_empty_result() {
    let fixture = TestFixture::with_cpu_data();

    let results = fixture.run_ok(Statement::Select(select_all("disk"))).await;
    assert_eq!(results.len(), 1);
    assert!(results[0].series.is_empty());
    assert!(results[0].error.is_none());
}

#[tokio::test]
async fn test_select_unknown_database_fails_before_emitting() {
    let fixture = TestFixture::new();
    let mut stmt = select_all("cpu");
    stmt.sources = vec![tsdb_coordinator::ast::Source::Measurement(
        Measurement::qualified("nowhere", "autogen", "cpu"),
    )];

    let err = fixture.run_err(Statement::Select(stmt)).await;
    assert_eq!(err, ExecutionError::DatabaseNotFound("nowhere".to_string()).to_string());
}

#[tokio::test]
async fn test_select_point_limit() {
    let fixture = TestFixture::with_config(CoordinatorConfig {
        max_select_point_n: 4,
        ..Default::default()
    });
    fixture.insert_cpu_data();

    let err = fixture.run_err(Statement::Select(select_all("cpu"))).await;
    assert!(err.contains("max-select-point"), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_select_into_writes_points() {
    let fixture = TestFixture::with_config(CoordinatorConfig {
        into_buffer_capacity: 4,
        ..Default::default()
    });
    fixture.insert_cpu_data();
    let writes_before = fixture.store.writes();

    let mut stmt = select_all("cpu");
    stmt.target = Some(Target::new(Measurement::named("cpu_copy")));
    let results = fixture.run_ok(Statement::Select(stmt)).await;

    assert_eq!(results.len(), 1);
    let row = &results[0].series[0];
    assert_eq!(row.name, "result");
    assert_eq!(row.columns, vec!["time", "written"]);
    assert_eq!(row.values[0][0].as_time().map(|t| t.timestamp()), Some(0));
    assert_eq!(row.values[0][1], Value::Integer(6));
    assert!(results[0].messages.is_empty());

    // Six points at capacity four: one full flush and one final flush.
    assert_eq!(fixture.store.writes() - writes_before, 2);

    let copied = fixture.run_ok(Statement::Select(select_all("cpu_copy"))).await;
    let rows = all_rows(&copied);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.iter().map(|r| r.values.len()).sum::<usize>(), 6);
    assert_eq!(rows[0].tags["region"], "west");
}

#[tokio::test]
async fn test_select_into_blank_name_reuses_source() {
    let fixture = TestFixture::with_cpu_data();
    fixture
        .meta
        .create_database("archive")
        .expect("Failed to create archive database");

    let mut stmt = select_all("mem");
    stmt.target = Some(Target::new(Measurement::qualified("archive", "", "")));
    let results = fixture.run_ok(Statement::Select(stmt)).await;
    assert_eq!(results[0].series[0].values[0][1], Value::Integer(1));

    let db = fixture.meta.database("archive").expect("archive exists");
    assert_eq!(db.retention_policies[0].shard_groups.len(), 1);
}

#[tokio::test]
async fn test_select_into_requires_target_database() {
    let fixture = TestFixture::with_cpu_data();

    // Executed without normalization, so the target keeps its blank database.
    let mut stmt = select_all("cpu");
    stmt.sources = vec![tsdb_coordinator::ast::Source::Measurement(
        Measurement::qualified(fixture.database(), "autogen", "cpu"),
    )];
    stmt.target = Some(Target::new(Measurement::named("cpu_copy")));

    let (ctx, mut rx, _cancel) = fixture.context();
    let outcome = fixture
        .executor
        .execute_statement(&ctx, &Statement::Select(stmt))
        .await;
    drop(ctx);

    assert_eq!(outcome, Err(ExecutionError::NoDatabaseInTarget));
    assert!(rx.recv().await.is_none());
    assert_eq!(fixture.planner.aux_closed(), 0);
}

#[tokio::test]
async fn test_select_into_read_only_warns() {
    let fixture = TestFixture::with_cpu_data();

    let mut stmt = select_all("cpu");
    stmt.target = Some(Target::new(Measurement::named("cpu_copy")));
    let (ctx, rx, _cancel) = fixture.context();
    let (outcome, results) = fixture
        .run_in(ctx.with_read_only(true), rx, Statement::Select(stmt))
        .await;

    assert!(outcome.is_ok());
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].messages.len(), 1);
    assert!(results[0].messages[0].text.contains("INTO"));
}

#[tokio::test]
async fn test_select_cancelled() {
    let fixture = TestFixture::with_cpu_data();

    let (ctx, rx, cancel) = fixture.context();
    cancel.cancel(CancelReason::QueryKilled);
    let (outcome, results) = fixture
        .run_in(ctx, rx, Statement::Select(select_all("cpu")))
        .await;

    assert_eq!(outcome, Err(ExecutionError::Cancelled(CancelReason::QueryKilled)));
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_select_after_client_hangup() {
    let fixture = TestFixture::with_cpu_data();

    let (ctx, rx, _cancel) = fixture.context();
    drop(rx);
    let mut stmt = Statement::Select(select_all("cpu"));
    fixture
        .executor
        .normalize_statement(&mut stmt, fixture.database(), "")
        .unwrap();
    let outcome = fixture.executor.execute_statement(&ctx, &stmt).await;
    assert_eq!(outcome, Err(ExecutionError::QueryAborted));
}

#[tokio::test]
async fn test_explain() {
    let fixture = TestFixture::with_cpu_data();

    let results = fixture
        .run_ok(Statement::Explain(ExplainStatement {
            statement: select_all("cpu"),
            analyze: false,
        }))
        .await;
    assert_eq!(results.len(), 1);

    let row = &results[0].series[0];
    assert_eq!(row.columns, vec!["QUERY PLAN"]);
    assert_eq!(row.values[0][0], Value::from("SCAN cpu"));
    assert_eq!(row.values.len(), 2);
}

#[tokio::test]
async fn test_explain_analyze() {
    let fixture = TestFixture::with_cpu_data();

    let results = fixture
        .run_ok(Statement::Explain(ExplainStatement {
            statement: select_all("cpu"),
            analyze: true,
        }))
        .await;
    assert_eq!(results.len(), 1);

    let row = &results[0].series[0];
    assert_eq!(row.columns, vec!["EXPLAIN ANALYZE"]);
    let lines: Vec<String> = row
        .values
        .iter()
        .filter_map(|v| v[0].as_str().map(str::to_string))
        .collect();
    assert_eq!(lines[0], ".");
    assert_eq!(lines[1], "└── select");
    for field in ["total_time", "planning_time", "execution_time", "rows: 6"] {
        assert!(
            lines.iter().any(|l| l.contains(field)),
            "missing {} in {:?}",
            field,
            lines
        );
    }
    assert_eq!(fixture.planner.aux_closed(), 1);
}

#[tokio::test]
async fn test_explain_analyze_planning_error() {
    let fixture = TestFixture::new();
    let mut stmt = select_all("cpu");
    stmt.sources = vec![tsdb_coordinator::ast::Source::Measurement(
        Measurement::qualified("nowhere", "autogen", "cpu"),
    )];

    let err = fixture
        .run_err(Statement::Explain(ExplainStatement {
            statement: stmt,
            analyze: true,
        }))
        .await;
    assert_eq!(err, ExecutionError::DatabaseNotFound("nowhere".to_string()).to_string());
}

#[tokio::test]
async fn test_explain_analyze_error_closes_aux_iterators() {
    let fixture = TestFixture::with_config(CoordinatorConfig {
        max_select_point_n: 4,
        ..Default::default()
    });
    fixture.insert_cpu_data();

    let err = fixture
        .run_err(Statement::Explain(ExplainStatement {
            statement: select_all("cpu"),
            analyze: true,
        }))
        .await;
    assert!(err.contains("max-select-point"), "unexpected error: {}", err);
    assert_eq!(fixture.planner.aux_closed(), 1);
}

#[tokio::test]
async fn test_explain_analyze_cancelled_closes_aux_iterators() {
    let fixture = TestFixture::with_cpu_data();

    let (ctx, rx, cancel) = fixture.context();
    cancel.cancel(CancelReason::QueryKilled);
    let (outcome, results) = fixture
        .run_in(
            ctx,
            rx,
            Statement::Explain(ExplainStatement {
                statement: select_all("cpu"),
                analyze: true,
            }),
        )
        .await;

    assert_eq!(outcome, Err(ExecutionError::Cancelled(CancelReason::QueryKilled)));
    assert!(results.is_empty());
    assert_eq!(fixture.planner.aux_closed(), 1);
}
