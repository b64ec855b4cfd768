//! Minimal SELECT planner for tests
//!
//! Projects raw samples of the FROM measurements without any aggregation.
//! Enough to drive the coordinator's streaming, INTO and EXPLAIN paths.

use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tsdb_coordinator::ast::{condition_expr, Expr, SelectStatement, Source, TimeRange};
use tsdb_coordinator::exec::{Cursor, CursorRow, CursorSeries, ExecutionError, RowCursor};
use tsdb_coordinator::plan::{
    AuxIterator, Field, PreparedStatement, QueryPlanner, SelectContext, SelectOptions,
    ShardMapper,
};
use tsdb_coordinator::storage::{ShardGroup, Value};

#[derive(Default)]
pub struct ScanPlanner {
    prepared: AtomicUsize,
    aux_closed: Arc<AtomicUsize>,
}

impl ScanPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements prepared so far
    pub fn prepared(&self) -> usize {
        self.prepared.load(Ordering::SeqCst)
    }

    /// Auxiliary iterators closed so far
    pub fn aux_closed(&self) -> usize {
        self.aux_closed.load(Ordering::SeqCst)
    }
}

impl QueryPlanner for ScanPlanner {
    fn prepare(
        &self,
        stmt: &SelectStatement,
        mapper: &dyn ShardMapper,
        opts: &SelectOptions,
    ) -> Result<Box<dyn PreparedStatement>, ExecutionError> {
        let (_, range) = condition_expr(stmt.condition.as_ref(), Utc::now())?;
        let group = mapper.map_shards(&stmt.sources, range, opts)?;
        self.prepared.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(ScanStatement {
            stmt: stmt.clone(),
            group,
            range,
            max_point_n: opts.max_point_n,
            aux_closed: Arc::clone(&self.aux_closed),
        }))
    }
}

struct ScanStatement {
    stmt: SelectStatement,
    group: Arc<dyn ShardGroup>,
    range: TimeRange,
    max_point_n: usize,
    aux_closed: Arc<AtomicUsize>,
}

impl ScanStatement {
    fn measurement_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for source in &self.stmt.sources {
            if let Source::Measurement(m) = source {
                match &m.regex {
                    Some(re) => names.extend(self.group.measurement_names(Some(re))),
                    None => names.push(m.name.clone()),
                }
            }
        }
        names
    }

    fn field_names(&self, measurements: &[String]) -> Vec<String> {
        let wildcard = self.stmt.fields.is_empty()
            || self.stmt.fields.iter().any(|f| f.expr == Expr::Wildcard);
        if wildcard {
            let keys: BTreeSet<String> = measurements
                .iter()
                .flat_map(|m| self.group.field_keys(m))
                .collect();
            return keys.into_iter().collect();
        }

        self.stmt
            .fields
            .iter()
            .filter_map(|f| match &f.expr {
                Expr::VarRef(name) if name != "time" => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

impl PreparedStatement for ScanStatement {
    fn select(&mut self, ctx: &SelectContext) -> Result<Box<dyn Cursor>, ExecutionError> {
        let span = ctx.start_span("scan");
        if let Some(aux) = &ctx.aux_iterators {
            aux.add(Box::new(CloseCounter(Arc::clone(&self.aux_closed))));
        }

        let measurements = self.measurement_names();
        let fields = self.field_names(&measurements);

        let mut rows = Vec::new();
        for name in &measurements {
            for series in self.group.read_series(name, self.range)? {
                for sample in series.samples {
                    let mut values = vec![Value::Time(sample.time)];
                    values.extend(fields.iter().map(|f| {
                        sample
                            .fields
                            .get(f)
                            .cloned()
                            .map(Value::from)
                            .unwrap_or(Value::Null)
                    }));
                    rows.push(CursorRow {
                        series: CursorSeries::new(name.clone(), series.tags.clone()),
                        values,
                    });
                }
            }
        }

        if self.max_point_n > 0 && rows.len() > self.max_point_n {
            return Err(ExecutionError::Execution(format!(
                "max-select-point limit exceeded: ({}/{})",
                rows.len(),
                self.max_point_n
            )));
        }

        if let Some(span) = span {
            span.set_label("measurements", measurements.join(","));
            span.merge_fields([Field::int("rows", rows.len() as i64)]);
            span.finish();
        }

        let mut columns = vec!["time".to_string()];
        columns.extend(fields);
        Ok(Box::new(RowCursor::new(columns, rows)))
    }

    fn explain(&self) -> Result<String, ExecutionError> {
        let mut plan = String::new();
        for name in self.measurement_names() {
            plan.push_str(&format!("SCAN {}\n", name));
        }
        plan.push_str(&format!("  shards: {:?}\n", self.group.shard_ids()));
        Ok(plan)
    }

    fn close(&mut self) {}
}

struct CloseCounter(Arc<AtomicUsize>);

impl AuxIterator for CloseCounter {
    fn close(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}
