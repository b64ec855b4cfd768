// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement executor - dispatch of parsed statements
//!
//! The executor owns no data. Metadata changes go through the
//! [`MetaClient`], data changes and enumeration through the [`TsdbStore`],
//! and SELECT planning through the [`QueryPlanner`]. Results are delivered
//! through the [`ExecutionContext`] sink.

use super::normalize::normalize_statement;
use super::points_writer::{LocalPointsWriter, PointsWriter};
use super::shard_mapper::LocalShardMapper;
use super::task_manager::TaskManager;
use crate::ast::{
    has_time_expr, reduce_now, AlterRetentionPolicyStatement, CreateContinuousQueryStatement,
    CreateDatabaseStatement, CreateRetentionPolicyStatement, DeleteSeriesStatement,
    DropDatabaseStatement, DropRetentionPolicyStatement, DropSeriesStatement, Privilege,
    RevokeStatement, Statement,
};
use crate::config::CoordinatorConfig;
use crate::exec::{
    read_only_warning, CancelHandle, ExecutionContext, ExecutionError, ExecutionResult,
    QueryResult, Row,
};
use crate::meta::{valid_name, MetaClient, RetentionPolicySpec, RetentionPolicyUpdate};
use crate::monitor::{Monitor, SystemMonitor};
use crate::plan::{QueryPlanner, ShardMapper};
use crate::storage::TsdbStore;
use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Something that can execute a single statement against a context
#[async_trait]
pub trait StatementHandler: Send + Sync {
    async fn execute_statement(
        &self,
        ctx: &ExecutionContext,
        stmt: &Statement,
    ) -> ExecutionResult<()>;
}

/// Executes statements against the metadata and storage gateways
pub struct StatementExecutor {
    pub(super) meta: Arc<dyn MetaClient>,
    pub(super) store: Arc<dyn TsdbStore>,
    pub(super) planner: Arc<dyn QueryPlanner>,
    pub(super) shard_mapper: Arc<dyn ShardMapper>,
    pub(super) monitor: Arc<dyn Monitor>,
    pub(super) points_writer: Arc<dyn PointsWriter>,
    pub(super) task_manager: Arc<TaskManager>,
    pub(super) config: CoordinatorConfig,
}

impl StatementExecutor {
    /// Create an executor backed by local shards
    ///
    /// Shard mapping and INTO writes default to the local store, and the
    /// monitor reports task manager statistics.
    pub fn new(
        meta: Arc<dyn MetaClient>,
        store: Arc<dyn TsdbStore>,
        planner: Arc<dyn QueryPlanner>,
        config: CoordinatorConfig,
    ) -> Self {
        let task_manager = Arc::new(TaskManager::new(&config));
        let monitor = SystemMonitor::new();
        monitor.register(task_manager.clone());

        Self {
            shard_mapper: Arc::new(LocalShardMapper::new(meta.clone(), store.clone())),
            points_writer: Arc::new(LocalPointsWriter::new(meta.clone(), store.clone())),
            monitor: Arc::new(monitor),
            meta,
            store,
            planner,
            task_manager,
            config,
        }
    }

    pub fn with_shard_mapper(mut self, shard_mapper: Arc<dyn ShardMapper>) -> Self {
        self.shard_mapper = shard_mapper;
        self
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn Monitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_points_writer(mut self, points_writer: Arc<dyn PointsWriter>) -> Self {
        self.points_writer = points_writer;
        self
    }

    pub fn meta(&self) -> &Arc<dyn MetaClient> {
        &self.meta
    }

    pub fn store(&self) -> &Arc<dyn TsdbStore> {
        &self.store
    }

    pub fn task_manager(&self) -> &Arc<TaskManager> {
        &self.task_manager
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Fresh context for `database` with a result sink sized from the config
    pub fn new_context(
        &self,
        database: &str,
    ) -> (ExecutionContext, mpsc::Receiver<QueryResult>, CancelHandle) {
        let (ctx, results, cancel) = ExecutionContext::channel(self.config.result_buffer);
        (ctx.with_database(database), results, cancel)
    }

    /// Add the default database and retention policy to every measurement
    /// in `stmt`; `default_retention_policy` may be empty
    pub fn normalize_statement(
        &self,
        stmt: &mut Statement,
        default_database: &str,
        default_retention_policy: &str,
    ) -> ExecutionResult<()> {
        normalize_statement(
            self.meta.as_ref(),
            stmt,
            default_database,
            default_retention_policy,
        )
    }

    /// Run a whole query, one statement after another
    ///
    /// The query is registered with the task manager for its duration, so it
    /// shows up in SHOW QUERIES and can be killed through `cancel`. Each
    /// statement is normalized against the context database and executed
    /// with its index as statement id. The first failing statement is
    /// reported as an error result and ends the query. An `Err` is returned
    /// only when results can no longer be delivered.
    pub async fn execute_query(
        &self,
        ctx: &mut ExecutionContext,
        cancel: &CancelHandle,
        statements: Vec<Statement>,
        default_retention_policy: &str,
    ) -> ExecutionResult<()> {
        let text = statements
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        let _guard = match self
            .task_manager
            .attach_guarded(&text, &ctx.database, cancel.clone())
        {
            Ok(guard) => guard,
            Err(e) => return ctx.send(QueryResult::error(e)).await,
        };

        self.execute_statements(ctx, statements, default_retention_policy)
            .await
    }

    async fn execute_statements(
        &self,
        ctx: &mut ExecutionContext,
        statements: Vec<Statement>,
        default_retention_policy: &str,
    ) -> ExecutionResult<()> {
        let database = ctx.database.clone();
        for (i, mut stmt) in statements.into_iter().enumerate() {
            ctx.statement_id = i;
            let outcome = match self.normalize_statement(&mut stmt, &database, default_retention_policy)
            {
                Ok(()) => self.execute_statement(ctx, &stmt).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => {}
                Err(e @ ExecutionError::QueryAborted) => return Err(e),
                Err(e) => {
                    debug!("Statement {} failed: {}", i, e);
                    return ctx.send(QueryResult::error(e)).await;
                }
            }
        }
        Ok(())
    }

    /// Execute one normalized statement
    ///
    /// Streaming statements (SELECT, SHOW MEASUREMENTS, SHOW TAG KEYS and
    /// SHOW TAG VALUES) send their own results. Every other statement sends
    /// exactly one result when it succeeds and nothing when it fails.
    pub async fn execute_statement(
        &self,
        ctx: &ExecutionContext,
        stmt: &Statement,
    ) -> ExecutionResult<()> {
        debug!("Executing statement {}: {}", ctx.statement_id, stmt);

        let rows: Vec<Row> = match stmt {
            Statement::Select(s) => return self.execute_select_statement(ctx, s).await,
            Statement::ShowMeasurements(s) => {
                return self.execute_show_measurements_statement(ctx, s).await
            }
            Statement::ShowTagKeys(s) => return self.execute_show_tag_keys(ctx, s).await,
            Statement::ShowTagValues(s) => return self.execute_show_tag_values(ctx, s).await,
            Statement::ShowQueries | Statement::KillQuery(_) => {
                return self.task_manager.execute_statement(ctx, stmt).await
            }
            Statement::ShowSeries(_) | Statement::ShowFieldKeys(_) => {
                return Err(ExecutionError::InvalidQuery)
            }

            Statement::AlterRetentionPolicy(s) => {
                self.execute_alter_retention_policy_statement(s)?;
                Vec::new()
            }
            Statement::CreateContinuousQuery(s) => {
                self.execute_create_continuous_query_statement(s)?;
                Vec::new()
            }
            Statement::CreateDatabase(s) => {
                self.execute_create_database_statement(s)?;
                Vec::new()
            }
            Statement::CreateRetentionPolicy(s) => {
                self.execute_create_retention_policy_statement(s)?;
                Vec::new()
            }
            Statement::CreateSubscription(s) => {
                self.meta.create_subscription(
                    &s.database,
                    &s.retention_policy,
                    &s.name,
                    &s.mode,
                    &s.destinations,
                )?;
                Vec::new()
            }
            Statement::CreateUser(s) => {
                self.meta.create_user(&s.name, &s.password, s.admin)?;
                Vec::new()
            }
            Statement::DeleteSeries(s) => {
                self.execute_delete_series_statement(s, &ctx.database)?;
                Vec::new()
            }
            Statement::DropContinuousQuery(s) => {
                self.meta.drop_continuous_query(&s.database, &s.name)?;
                Vec::new()
            }
            Statement::DropDatabase(s) => {
                self.execute_drop_database_statement(s)?;
                Vec::new()
            }
            Statement::DropMeasurement(s) => {
                self.require_database(&ctx.database)?;
                self.store.delete_measurement(&ctx.database, &s.name)?;
                Vec::new()
            }
            Statement::DropSeries(s) => {
                self.execute_drop_series_statement(s, &ctx.database)?;
                Vec::new()
            }
            Statement::DropRetentionPolicy(s) => {
                self.execute_drop_retention_policy_statement(s)?;
                Vec::new()
            }
            Statement::DropShard(s) => {
                info!("Dropping shard {}", s.id);
                self.store.delete_shard(s.id)?;
                self.meta.drop_shard(s.id)?;
                Vec::new()
            }
            Statement::DropSubscription(s) => {
                self.meta
                    .drop_subscription(&s.database, &s.retention_policy, &s.name)?;
                Vec::new()
            }
            Statement::DropUser(s) => {
                self.meta.drop_user(&s.name)?;
                Vec::new()
            }
            Statement::Explain(s) if s.analyze => self.execute_explain_analyze_statement(ctx, s)?,
            Statement::Explain(s) => self.execute_explain_statement(ctx, s)?,
            Statement::Grant(s) => {
                self.meta.set_privilege(&s.user, &s.on, s.privilege)?;
                Vec::new()
            }
            Statement::GrantAdmin(s) => {
                self.meta.set_admin_privilege(&s.user, true)?;
                Vec::new()
            }
            Statement::Revoke(s) => {
                self.execute_revoke_statement(s)?;
                Vec::new()
            }
            Statement::RevokeAdmin(s) => {
                self.meta.set_admin_privilege(&s.user, false)?;
                Vec::new()
            }
            Statement::SetPasswordUser(s) => {
                self.meta.update_user(&s.name, &s.password)?;
                Vec::new()
            }
            Statement::ShowContinuousQueries => self.execute_show_continuous_queries_statement(),
            Statement::ShowDatabases => self.execute_show_databases_statement(ctx),
            Statement::ShowDiagnostics(s) => self.execute_show_diagnostics_statement(s)?,
            Statement::ShowGrantsForUser(s) => self.execute_show_grants_for_user_statement(s)?,
            Statement::ShowMeasurementCardinality(s) => {
                self.execute_show_measurement_cardinality_statement(s)?
            }
            Statement::ShowRetentionPolicies(s) => {
                self.execute_show_retention_policies_statement(s)?
            }
            Statement::ShowSeriesCardinality(s) => {
                self.execute_show_series_cardinality_statement(s)?
            }
            Statement::ShowShardGroups => self.execute_show_shard_groups_statement(),
            Statement::ShowShards => self.execute_show_shards_statement(),
            Statement::ShowStats(s) => self.execute_show_stats_statement(s)?,
            Statement::ShowSubscriptions => self.execute_show_subscriptions_statement(),
            Statement::ShowUsers => self.execute_show_users_statement(),
        };

        let mut messages = Vec::new();
        if ctx.read_only && stmt.is_mutating() {
            messages.push(read_only_warning(&stmt.to_string()));
        }
        ctx.send(QueryResult::rows(rows).with_messages(messages)).await
    }

    pub(super) fn require_database(&self, database: &str) -> ExecutionResult<()> {
        match self.meta.database(database) {
            Some(_) => Ok(()),
            None => Err(ExecutionError::DatabaseNotFound(database.to_string())),
        }
    }

    fn execute_alter_retention_policy_statement(
        &self,
        stmt: &AlterRetentionPolicyStatement,
    ) -> ExecutionResult<()> {
        let update = RetentionPolicyUpdate {
            name: None,
            duration: stmt.duration,
            replica_n: stmt.replication,
            shard_group_duration: stmt.shard_group_duration,
        };
        self.meta
            .update_retention_policy(&stmt.database, &stmt.name, &update, stmt.default)?;
        Ok(())
    }

    fn execute_create_continuous_query_statement(
        &self,
        stmt: &CreateContinuousQueryStatement,
    ) -> ExecutionResult<()> {
        // Every measurement the query reads or writes must live in an
        // existing retention policy.
        let mut source = Statement::Select(stmt.source.clone());
        source.for_each_measurement_mut::<ExecutionError>(&mut |m| {
            match self.meta.retention_policy(&m.database, &m.retention_policy)? {
                Some(_) => Ok(()),
                None => Err(ExecutionError::RetentionPolicyNotFound(format!(
                    "{}.{}",
                    m.database, m.retention_policy
                ))),
            }
        })?;

        self.meta
            .create_continuous_query(&stmt.database, &stmt.name, &stmt.to_string())?;
        Ok(())
    }

    fn execute_create_database_statement(
        &self,
        stmt: &CreateDatabaseStatement,
    ) -> ExecutionResult<()> {
        if !valid_name(&stmt.name) {
            return Err(ExecutionError::InvalidName);
        }

        if !stmt.retention_policy_create {
            self.meta.create_database(&stmt.name)?;
            return Ok(());
        }

        // A policy created alongside the database may leave its name blank.
        if !stmt.retention_policy_name.is_empty() && !valid_name(&stmt.retention_policy_name) {
            return Err(ExecutionError::InvalidName);
        }

        let spec = RetentionPolicySpec {
            name: stmt.retention_policy_name.clone(),
            replica_n: stmt.retention_policy_replication,
            duration: stmt.retention_policy_duration,
            shard_group_duration: stmt.retention_policy_shard_group_duration,
        };
        self.meta
            .create_database_with_retention_policy(&stmt.name, &spec)?;
        Ok(())
    }

    fn execute_create_retention_policy_statement(
        &self,
        stmt: &CreateRetentionPolicyStatement,
    ) -> ExecutionResult<()> {
        if !valid_name(&stmt.name) {
            return Err(ExecutionError::InvalidName);
        }

        let spec = RetentionPolicySpec {
            name: stmt.name.clone(),
            replica_n: Some(stmt.replication),
            duration: Some(stmt.duration),
            shard_group_duration: stmt.shard_group_duration,
        };
        self.meta
            .create_retention_policy(&stmt.database, &spec, stmt.default)?;
        Ok(())
    }

    fn execute_delete_series_statement(
        &self,
        stmt: &DeleteSeriesStatement,
        database: &str,
    ) -> ExecutionResult<()> {
        self.require_database(database)?;

        let now = chrono::Utc::now();
        let condition = stmt.condition.as_ref().map(|c| reduce_now(c, now));
        self.store
            .delete_series(database, &stmt.sources, condition.as_ref())?;
        Ok(())
    }

    fn execute_drop_database_statement(&self, stmt: &DropDatabaseStatement) -> ExecutionResult<()> {
        if self.meta.database(&stmt.name).is_none() {
            return Ok(());
        }

        info!("Dropping database {}", stmt.name);
        self.store.delete_database(&stmt.name)?;
        self.meta.drop_database(&stmt.name)?;
        Ok(())
    }

    fn execute_drop_series_statement(
        &self,
        stmt: &DropSeriesStatement,
        database: &str,
    ) -> ExecutionResult<()> {
        self.require_database(database)?;

        if stmt.condition.as_ref().is_some_and(has_time_expr) {
            return Err(ExecutionError::TimeConditionNotSupported("DROP SERIES"));
        }
        self.store
            .delete_series(database, &stmt.sources, stmt.condition.as_ref())?;
        Ok(())
    }

    fn execute_drop_retention_policy_statement(
        &self,
        stmt: &DropRetentionPolicyStatement,
    ) -> ExecutionResult<()> {
        let exists = self
            .meta
            .database(&stmt.database)
            .is_some_and(|db| db.retention_policy(&stmt.name).is_some());
        if !exists {
            return Ok(());
        }

        info!("Dropping retention policy {}.{}", stmt.database, stmt.name);
        self.store
            .delete_retention_policy(&stmt.database, &stmt.name)?;
        self.meta
            .drop_retention_policy(&stmt.database, &stmt.name)?;
        Ok(())
    }

    fn execute_revoke_statement(&self, stmt: &RevokeStatement) -> ExecutionResult<()> {
        let privilege = if stmt.privilege == Privilege::All {
            Privilege::None
        } else {
            self.meta
                .user_privilege(&stmt.user, &stmt.on)?
                .and_not(stmt.privilege)
        };
        self.meta.set_privilege(&stmt.user, &stmt.on, privilege)?;
        Ok(())
    }
}

#[async_trait]
impl StatementHandler for StatementExecutor {
    async fn execute_statement(
        &self,
        ctx: &ExecutionContext,
        stmt: &Statement,
    ) -> ExecutionResult<()> {
        StatementExecutor::execute_statement(self, ctx, stmt).await
    }
}
