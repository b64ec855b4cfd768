// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! SELECT, SELECT ... INTO and EXPLAIN execution

use super::convert::convert_row_to_points;
use super::points_writer::{BufferedPointsWriter, IntoWriteRequest};
use super::statement_executor::StatementExecutor;
use crate::ast::{ExplainStatement, SelectStatement, Target};
use crate::exec::{
    read_only_warning, Cursor, Emitter, ExecutionContext, ExecutionError, ExecutionResult,
    QueryResult, Row,
};
use crate::plan::{AuxIterators, Field, SelectContext, SelectOptions, Trace};
use crate::storage::Value;
use chrono::DateTime;
use log::debug;
use std::time::Instant;

impl StatementExecutor {
    /// Planner options for a statement run under `ctx`
    fn select_options(&self, ctx: &ExecutionContext) -> SelectOptions {
        SelectOptions {
            authorizer: ctx.authorizer.clone(),
            ..self.config.select_options(ctx.node_id)
        }
    }

    fn chunk_size(&self, ctx: &ExecutionContext) -> usize {
        if ctx.chunk_size > 0 {
            ctx.chunk_size
        } else {
            self.config.default_chunk_size
        }
    }

    fn create_cursor(
        &self,
        sctx: &SelectContext,
        stmt: &SelectStatement,
        ctx: &ExecutionContext,
    ) -> ExecutionResult<Box<dyn Cursor>> {
        self.planner.select(
            sctx,
            stmt,
            self.shard_mapper.as_ref(),
            &self.select_options(ctx),
        )
    }

    pub(super) async fn execute_select_statement(
        &self,
        ctx: &ExecutionContext,
        stmt: &SelectStatement,
    ) -> ExecutionResult<()> {
        let cursor = self.create_cursor(&SelectContext::new(), stmt, ctx)?;
        let mut emitter = Emitter::new(cursor, self.chunk_size(ctx));

        let mut writer = stmt.target.as_ref().map(|target| {
            BufferedPointsWriter::new(
                self.points_writer.clone(),
                target.measurement.database.clone(),
                target.measurement.retention_policy.clone(),
                self.config.into_buffer_capacity,
            )
        });

        let mut written: i64 = 0;
        let mut emitted = false;
        loop {
            let (row, partial) = match emitter.emit()? {
                Some(next) => next,
                None => {
                    ctx.check_cancelled()?;
                    break;
                }
            };

            if let (Some(target), Some(writer)) = (&stmt.target, writer.as_mut()) {
                written += write_into(writer, target, &row)? as i64;
                continue;
            }

            ctx.send(QueryResult {
                series: vec![row],
                partial,
                ..Default::default()
            })
            .await?;
            emitted = true;
        }
        emitter.close();

        if let Some(mut writer) = writer {
            writer.flush()?;

            let mut row = Row::new("result", &["time", "written"]);
            row.push(vec![
                Value::Time(DateTime::from_timestamp_nanos(0)),
                Value::Integer(written),
            ]);
            let mut messages = Vec::new();
            if ctx.read_only {
                messages.push(read_only_warning(&stmt.to_string()));
            }
            return ctx
                .send(QueryResult::rows(vec![row]).with_messages(messages))
                .await;
        }

        if !emitted {
            return ctx.send(QueryResult::rows(Vec::new())).await;
        }
        Ok(())
    }

    /// Plan without executing and render the plan one line per tuple
    pub(super) fn execute_explain_statement(
        &self,
        ctx: &ExecutionContext,
        stmt: &ExplainStatement,
    ) -> ExecutionResult<Vec<Row>> {
        let opts = SelectOptions {
            max_point_n: 0,
            ..self.select_options(ctx)
        };

        let mut prepared = self
            .planner
            .prepare(&stmt.statement, self.shard_mapper.as_ref(), &opts)?;
        let plan = prepared.explain();
        prepared.close();

        let mut row = Row::with_columns(&["QUERY PLAN"]);
        for line in plan?.trim().split('\n') {
            row.push(vec![Value::from(line)]);
        }
        Ok(vec![row])
    }

    /// Run the statement under a trace and render the trace tree
    pub(super) fn execute_explain_analyze_statement(
        &self,
        ctx: &ExecutionContext,
        stmt: &ExplainStatement,
    ) -> ExecutionResult<Vec<Row>> {
        let (trace, span) = Trace::new("select");
        let aux = AuxIterators::new();
        let sctx = SelectContext::new()
            .with_span(span.clone())
            .with_aux_iterators(aux.clone());

        let start = Instant::now();
        let cursor = match self.create_cursor(&sctx, &stmt.statement, ctx) {
            Ok(cursor) => cursor,
            Err(e) => {
                aux.close();
                return Err(e);
            }
        };
        let planning_time = start.elapsed();

        let mut emitter = Emitter::new(cursor, self.chunk_size(ctx));
        let drained = drain(&mut emitter, ctx);
        emitter.close();
        // Auxiliary iterators finalize their span fields when closed.
        aux.close();
        let values = drained?;
        debug!("EXPLAIN ANALYZE read {} values", values);

        let total_time = start.elapsed();
        span.merge_fields([
            Field::duration("total_time", total_time),
            Field::duration("planning_time", planning_time),
            Field::duration("execution_time", total_time.saturating_sub(planning_time)),
        ]);
        span.finish();

        let mut row = Row::with_columns(&["EXPLAIN ANALYZE"]);
        for line in trace.tree().to_string().split('\n') {
            row.push(vec![Value::from(line)]);
        }
        Ok(vec![row])
    }
}

/// Pull every row out of `emitter`, counting the tuples
fn drain(emitter: &mut Emitter, ctx: &ExecutionContext) -> ExecutionResult<usize> {
    let mut values = 0;
    while let Some((row, _)) = emitter.emit()? {
        values += row.values.len();
    }
    ctx.check_cancelled()?;
    Ok(values)
}

/// Convert one emitted row and hand its points to the INTO writer
fn write_into(
    writer: &mut BufferedPointsWriter,
    target: &Target,
    row: &Row,
) -> ExecutionResult<usize> {
    let m = &target.measurement;
    if m.database.is_empty() {
        return Err(ExecutionError::NoDatabaseInTarget);
    }

    // A blank target name writes back into the source measurement.
    let name = if m.name.is_empty() { &row.name } else { &m.name };
    let points = convert_row_to_points(name, row)?;
    let n = points.len();

    writer.write_points_into(&IntoWriteRequest {
        database: m.database.clone(),
        retention_policy: m.retention_policy.clone(),
        points,
    })?;
    Ok(n)
}
