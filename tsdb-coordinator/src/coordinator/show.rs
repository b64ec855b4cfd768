// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! SHOW statement handlers

use super::statement_executor::StatementExecutor;
use crate::ast::{
    condition_expr, format_duration, Privilege, ShowDiagnosticsStatement,
    ShowGrantsForUserStatement, ShowMeasurementCardinalityStatement, ShowMeasurementsStatement,
    ShowRetentionPoliciesStatement, ShowSeriesCardinalityStatement, ShowStatsStatement,
    ShowTagKeysStatement, ShowTagValuesStatement, TimeRange,
};
use crate::exec::{ExecutionContext, ExecutionError, ExecutionResult, QueryResult, Row};
use crate::meta::{RetentionPolicyInfo, ShardGroupInfo};
use crate::storage::Value;
use chrono::{DateTime, SecondsFormat, Utc};

fn rfc3339(t: DateTime<Utc>) -> Value {
    Value::String(t.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Expiry of a shard group: its end plus the policy's retention
fn expiry_time(rp: &RetentionPolicyInfo, sg: &ShardGroupInfo) -> Value {
    let expiry = chrono::Duration::from_std(rp.duration)
        .ok()
        .and_then(|d| sg.end_time.checked_add_signed(d))
        .unwrap_or_else(TimeRange::max_supported);
    rfc3339(expiry)
}

/// Apply OFFSET then LIMIT; zero means unset
fn paginate<T>(items: &[T], offset: usize, limit: usize) -> &[T] {
    let items = items.get(offset..).unwrap_or(&[]);
    if limit > 0 && limit < items.len() {
        &items[..limit]
    } else {
        items
    }
}

impl StatementExecutor {
    pub(super) fn execute_show_continuous_queries_statement(&self) -> Vec<Row> {
        self.meta
            .databases()
            .into_iter()
            .map(|db| {
                let mut row = Row::new(db.name, &["name", "query"]);
                for cq in db.continuous_queries {
                    row.push(vec![Value::String(cq.name), Value::String(cq.query)]);
                }
                row
            })
            .collect()
    }

    /// Databases the caller may read or write
    pub(super) fn execute_show_databases_statement(&self, ctx: &ExecutionContext) -> Vec<Row> {
        let auth = &ctx.coarse_authorizer;
        let mut row = Row::new("databases", &["name"]);
        for db in self.meta.databases() {
            if auth.authorize_database(Privilege::Read, &db.name)
                || auth.authorize_database(Privilege::Write, &db.name)
            {
                row.push(vec![Value::String(db.name)]);
            }
        }
        vec![row]
    }

    pub(super) fn execute_show_diagnostics_statement(
        &self,
        stmt: &ShowDiagnosticsStatement,
    ) -> ExecutionResult<Vec<Row>> {
        let diagnostics = self.monitor.diagnostics()?;
        Ok(diagnostics
            .into_iter()
            .filter(|(module, _)| stmt.module.is_empty() || *module == stmt.module)
            .map(|(module, diag)| Row {
                name: module,
                columns: diag.columns,
                values: diag.rows,
                ..Default::default()
            })
            .collect())
    }

    pub(super) fn execute_show_grants_for_user_statement(
        &self,
        stmt: &ShowGrantsForUserStatement,
    ) -> ExecutionResult<Vec<Row>> {
        let privileges = self.meta.user_privileges(&stmt.name)?;
        let mut row = Row::with_columns(&["database", "privilege"]);
        for (database, privilege) in privileges {
            row.push(vec![Value::String(database), Value::String(privilege.to_string())]);
        }
        Ok(vec![row])
    }

    pub(super) async fn execute_show_measurements_statement(
        &self,
        ctx: &ExecutionContext,
        stmt: &ShowMeasurementsStatement,
    ) -> ExecutionResult<()> {
        if stmt.database.is_empty() {
            return Err(ExecutionError::DatabaseNameRequired);
        }

        let condition = stmt.storage_condition();
        let names = match self.store.measurement_names(
            ctx.authorizer.as_ref(),
            &stmt.database,
            condition.as_ref(),
        ) {
            Ok(names) if !names.is_empty() => names,
            Ok(_) => return ctx.send(QueryResult::default()).await,
            Err(e) => return ctx.send(QueryResult::error(e.into())).await,
        };

        let names = paginate(&names, stmt.offset, stmt.limit);
        if names.is_empty() {
            return ctx.send(QueryResult::default()).await;
        }

        let mut row = Row::new("measurements", &["name"]);
        for name in names {
            row.push(vec![Value::String(name.clone())]);
        }
        ctx.send(QueryResult::rows(vec![row])).await
    }

    pub(super) fn execute_show_measurement_cardinality_statement(
        &self,
        stmt: &ShowMeasurementCardinalityStatement,
    ) -> ExecutionResult<Vec<Row>> {
        if stmt.database.is_empty() {
            return Err(ExecutionError::DatabaseNameRequired);
        }
        let n = self.store.measurements_cardinality(&stmt.database)?;
        Ok(vec![cardinality_row(n)])
    }

    pub(super) fn execute_show_series_cardinality_statement(
        &self,
        stmt: &ShowSeriesCardinalityStatement,
    ) -> ExecutionResult<Vec<Row>> {
        if stmt.database.is_empty() {
            return Err(ExecutionError::DatabaseNameRequired);
        }
        let n = self.store.series_cardinality(&stmt.database)?;
        Ok(vec![cardinality_row(n)])
    }

    pub(super) fn execute_show_retention_policies_statement(
        &self,
        stmt: &ShowRetentionPoliciesStatement,
    ) -> ExecutionResult<Vec<Row>> {
        if stmt.database.is_empty() {
            return Err(ExecutionError::DatabaseNameRequired);
        }
        let db = self
            .meta
            .database(&stmt.database)
            .ok_or_else(|| ExecutionError::DatabaseNotFound(stmt.database.clone()))?;

        let mut row =
            Row::with_columns(&["name", "duration", "groupDuration", "replicaN", "default"]);
        for rp in &db.retention_policies {
            row.push(vec![
                Value::String(rp.name.clone()),
                Value::String(format_duration(rp.duration)),
                Value::String(format_duration(rp.shard_group_duration)),
                Value::Integer(i64::from(rp.replica_n)),
                Value::Boolean(db.default_retention_policy == rp.name),
            ]);
        }
        Ok(vec![row])
    }

    /// One row per database; shards of deleted groups are not listed
    pub(super) fn execute_show_shards_statement(&self) -> Vec<Row> {
        self.meta
            .databases()
            .into_iter()
            .map(|db| {
                let mut row = Row::new(
                    db.name.clone(),
                    &[
                        "id",
                        "database",
                        "rp",
                        "shard_group",
                        "start_time",
                        "end_time",
                        "expiry_time",
                        "owners",
                    ],
                );
                for rp in &db.retention_policies {
                    for sg in rp.shard_groups.iter().filter(|sg| !sg.deleted()) {
                        for shard in &sg.shards {
                            let owners: Vec<String> =
                                shard.owners.iter().map(|o| o.to_string()).collect();
                            row.push(vec![
                                Value::Unsigned(shard.id),
                                Value::String(db.name.clone()),
                                Value::String(rp.name.clone()),
                                Value::Unsigned(sg.id),
                                rfc3339(sg.start_time),
                                rfc3339(sg.end_time),
                                expiry_time(rp, sg),
                                Value::String(owners.join(",")),
                            ]);
                        }
                    }
                }
                row
            })
            .collect()
    }

    pub(super) fn execute_show_shard_groups_statement(&self) -> Vec<Row> {
        let mut row = Row::new(
            "shard groups",
            &["id", "database", "rp", "start_time", "end_time", "expiry_time"],
        );
        for db in self.meta.databases() {
            for rp in &db.retention_policies {
                for sg in rp.shard_groups.iter().filter(|sg| !sg.deleted()) {
                    row.push(vec![
                        Value::Unsigned(sg.id),
                        Value::String(db.name.clone()),
                        Value::String(rp.name.clone()),
                        rfc3339(sg.start_time),
                        rfc3339(sg.end_time),
                        expiry_time(rp, sg),
                    ]);
                }
            }
        }
        vec![row]
    }

    pub(super) fn execute_show_stats_statement(
        &self,
        stmt: &ShowStatsStatement,
    ) -> ExecutionResult<Vec<Row>> {
        // Index size is costly to gather, so it is only reported on request.
        if stmt.module == "indexes" {
            if let Some(bytes) = self.store.index_bytes() {
                let mut row = Row::new("indexes", &["memoryBytes"]);
                row.push(vec![Value::Integer(bytes)]);
                return Ok(vec![row]);
            }
        }

        let stats = self.monitor.statistics(None)?;
        Ok(stats
            .into_iter()
            .filter(|stat| stmt.module.is_empty() || stat.name == stmt.module)
            .map(|stat| {
                let columns: Vec<String> = stat.value_names().cloned().collect();
                let values: Vec<Value> = stat.values.into_values().collect();
                Row {
                    name: stat.name,
                    tags: stat.tags,
                    columns,
                    values: vec![values],
                    partial: false,
                }
            })
            .collect())
    }

    /// Subscriptions grouped by database; databases without any are omitted
    pub(super) fn execute_show_subscriptions_statement(&self) -> Vec<Row> {
        self.meta
            .databases()
            .into_iter()
            .filter_map(|db| {
                let mut row = Row::new(db.name, &["rp", "name", "mode", "destinations"]);
                for rp in db.retention_policies {
                    for sub in rp.subscriptions {
                        row.push(vec![
                            Value::String(rp.name.clone()),
                            Value::String(sub.name),
                            Value::String(sub.mode),
                            Value::String(sub.destinations.join(", ")),
                        ]);
                    }
                }
                (!row.values.is_empty()).then_some(row)
            })
            .collect()
    }

    /// Shard ids of every retention policy of `database` overlapping `range`
    fn shard_ids_in_range(&self, database: &str, range: TimeRange) -> ExecutionResult<Vec<u64>> {
        let db = self
            .meta
            .database(database)
            .ok_or_else(|| ExecutionError::DatabaseNotFound(database.to_string()))?;

        let mut ids = Vec::new();
        for rp in &db.retention_policies {
            let groups = self.meta.shard_groups_by_time_range(
                database,
                &rp.name,
                range.min_time(),
                range.max_time(),
            )?;
            ids.extend(groups.iter().flat_map(|sg| sg.shard_ids()));
        }
        Ok(ids)
    }

    pub(super) async fn execute_show_tag_keys(
        &self,
        ctx: &ExecutionContext,
        stmt: &ShowTagKeysStatement,
    ) -> ExecutionResult<()> {
        if stmt.database.is_empty() {
            return Err(ExecutionError::DatabaseNameRequired);
        }
        let (rest, range) = condition_expr(stmt.condition.as_ref(), Utc::now())?;
        let shard_ids = self.shard_ids_in_range(&stmt.database, range)?;
        let condition = stmt.storage_condition(rest);

        let tag_keys =
            match self
                .store
                .tag_keys(ctx.authorizer.as_ref(), &shard_ids, condition.as_ref())
            {
                Ok(tag_keys) => tag_keys,
                Err(e) => return ctx.send(QueryResult::error(e.into())).await,
            };

        let mut emitted = false;
        for m in tag_keys {
            let keys = paginate(&m.keys, stmt.offset, stmt.limit);
            if keys.is_empty() {
                continue;
            }

            let mut row = Row::new(m.measurement.clone(), &["tagKey"]);
            for key in keys {
                row.push(vec![Value::String(key.clone())]);
            }
            ctx.send(QueryResult::rows(vec![row])).await?;
            emitted = true;
        }

        if !emitted {
            return ctx.send(QueryResult::default()).await;
        }
        Ok(())
    }

    pub(super) async fn execute_show_tag_values(
        &self,
        ctx: &ExecutionContext,
        stmt: &ShowTagValuesStatement,
    ) -> ExecutionResult<()> {
        if stmt.database.is_empty() {
            return Err(ExecutionError::DatabaseNameRequired);
        }
        let (rest, range) = condition_expr(stmt.condition.as_ref(), Utc::now())?;
        let shard_ids = self.shard_ids_in_range(&stmt.database, range)?;
        let condition = stmt.storage_condition(rest);

        let tag_values =
            match self
                .store
                .tag_values(ctx.authorizer.as_ref(), &shard_ids, condition.as_ref())
            {
                Ok(tag_values) => tag_values,
                Err(e) => return ctx.send(QueryResult::error(e.into())).await,
            };

        let mut emitted = false;
        for m in tag_values {
            let values = paginate(&m.values, stmt.offset, stmt.limit);
            if values.is_empty() {
                continue;
            }

            let mut row = Row::new(m.measurement.clone(), &["key", "value"]);
            for kv in values {
                row.push(vec![
                    Value::String(kv.key.clone()),
                    Value::String(kv.value.clone()),
                ]);
            }
            ctx.send(QueryResult::rows(vec![row])).await?;
            emitted = true;
        }

        if !emitted {
            return ctx.send(QueryResult::default()).await;
        }
        Ok(())
    }

    pub(super) fn execute_show_users_statement(&self) -> Vec<Row> {
        let mut row = Row::with_columns(&["user", "admin"]);
        for user in self.meta.users() {
            row.push(vec![Value::String(user.name), Value::Boolean(user.admin)]);
        }
        vec![row]
    }
}

fn cardinality_row(n: i64) -> Row {
    let mut row = Row::with_columns(&["cardinality estimation"]);
    row.push(vec![Value::Integer(n)]);
    row
}
