// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement AST
//!
//! Statements arrive already parsed. Each variant of [`Statement`] carries its
//! own typed fields; `Display` renders canonical query text, which is what the
//! coordinator stores for continuous queries and quotes in warnings.

use super::duration::format_std_duration_literal;
use super::expr::{BinaryOp, Expr, RegexLiteral};
use super::privilege::Privilege;
use super::{quote_ident, quote_string};
use std::fmt;
use std::time::Duration;

/// Measurement reference in a FROM, INTO or WITH MEASUREMENT clause
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Measurement {
    pub database: String,
    pub retention_policy: String,
    pub name: String,
    pub regex: Option<RegexLiteral>,
    /// Set for INTO targets, which may leave the name blank
    pub is_target: bool,
    /// Name of a system iterator such as `_series`
    pub system_iterator: String,
}

impl Measurement {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn qualified(
        database: impl Into<String>,
        retention_policy: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            retention_policy: retention_policy.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn regex(regex: RegexLiteral) -> Self {
        Self {
            regex: Some(regex),
            ..Default::default()
        }
    }

    /// Condition on `_name` selecting this measurement during metadata
    /// enumeration
    pub(crate) fn name_condition(&self) -> Option<Expr> {
        use super::expr::NAME_VAR;
        if let Some(re) = &self.regex {
            Some(Expr::binary(
                BinaryOp::EqRegex,
                Expr::var(NAME_VAR),
                Expr::RegexLiteral(re.clone()),
            ))
        } else if !self.name.is_empty() {
            Some(Expr::binary(
                BinaryOp::Eq,
                Expr::var(NAME_VAR),
                Expr::string(self.name.clone()),
            ))
        } else {
            None
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.database.is_empty() {
            write!(f, "{}.", quote_ident(&self.database))?;
        }
        if !self.retention_policy.is_empty() {
            f.write_str(&quote_ident(&self.retention_policy))?;
        }
        if !self.database.is_empty() || !self.retention_policy.is_empty() {
            f.write_str(".")?;
        }
        if !self.system_iterator.is_empty() {
            f.write_str(&quote_ident(&self.system_iterator))
        } else if !self.name.is_empty() {
            f.write_str(&quote_ident(&self.name))
        } else if let Some(re) = &self.regex {
            write!(f, "{}", re)
        } else {
            Ok(())
        }
    }
}

/// A FROM-clause source
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Measurement(Measurement),
    SubQuery(Box<SelectStatement>),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Source::Measurement(m) => write!(f, "{}", m),
            Source::SubQuery(stmt) => write!(f, "({})", stmt),
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// `_name` condition covering every measurement source
fn sources_condition(sources: &[Source]) -> Option<Expr> {
    sources
        .iter()
        .filter_map(|s| match s {
            Source::Measurement(m) => m.name_condition(),
            Source::SubQuery(_) => None,
        })
        .reduce(|acc, e| Expr::binary(BinaryOp::Or, acc, e))
        .map(|e| Expr::Paren(Box::new(e)))
}

/// INTO clause
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub measurement: Measurement,
}

impl Target {
    pub fn new(mut measurement: Measurement) -> Self {
        measurement.is_target = true;
        Self { measurement }
    }
}

/// Projected field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl Field {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", quote_ident(alias))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    pub fields: Vec<Field>,
    pub target: Option<Target>,
    pub sources: Vec<Source>,
    pub condition: Option<Expr>,
    pub dimensions: Vec<Expr>,
    pub limit: usize,
    pub offset: usize,
    pub series_limit: usize,
    pub series_offset: usize,
}

impl SelectStatement {
    fn for_each_measurement_mut<E>(
        &mut self,
        f: &mut dyn FnMut(&mut Measurement) -> Result<(), E>,
    ) -> Result<(), E> {
        for source in &mut self.sources {
            match source {
                Source::Measurement(m) => f(m)?,
                Source::SubQuery(stmt) => stmt.for_each_measurement_mut(f)?,
            }
        }
        if let Some(target) = &mut self.target {
            f(&mut target.measurement)?;
        }
        Ok(())
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SELECT {}", join(&self.fields))?;
        if let Some(target) = &self.target {
            write!(f, " INTO {}", target.measurement)?;
        }
        if !self.sources.is_empty() {
            write!(f, " FROM {}", join(&self.sources))?;
        }
        if let Some(cond) = &self.condition {
            write!(f, " WHERE {}", cond)?;
        }
        if !self.dimensions.is_empty() {
            write!(f, " GROUP BY {}", join(&self.dimensions))?;
        }
        if self.limit > 0 {
            write!(f, " LIMIT {}", self.limit)?;
        }
        if self.offset > 0 {
            write!(f, " OFFSET {}", self.offset)?;
        }
        if self.series_limit > 0 {
            write!(f, " SLIMIT {}", self.series_limit)?;
        }
        if self.series_offset > 0 {
            write!(f, " SOFFSET {}", self.series_offset)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterRetentionPolicyStatement {
    pub name: String,
    pub database: String,
    pub duration: Option<Duration>,
    pub replication: Option<u32>,
    pub shard_group_duration: Option<Duration>,
    pub default: bool,
}

impl fmt::Display for AlterRetentionPolicyStatement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "ALTER RETENTION POLICY {} ON {}",
            quote_ident(&self.name),
            quote_ident(&self.database)
        )?;
        if let Some(d) = self.duration {
            write!(f, " DURATION {}", format_std_duration_literal(d))?;
        }
        if let Some(n) = self.replication {
            write!(f, " REPLICATION {}", n)?;
        }
        if let Some(d) = self.shard_group_duration {
            write!(f, " SHARD DURATION {}", format_std_duration_literal(d))?;
        }
        if self.default {
            f.write_str(" DEFAULT")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateContinuousQueryStatement {
    pub name: String,
    pub database: String,
    pub source: SelectStatement,
    pub resample_every: Option<Duration>,
    pub resample_for: Option<Duration>,
}

impl fmt::Display for CreateContinuousQueryStatement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "CREATE CONTINUOUS QUERY {} ON {} ",
            quote_ident(&self.name),
            quote_ident(&self.database)
        )?;
        if self.resample_every.is_some() || self.resample_for.is_some() {
            f.write_str("RESAMPLE ")?;
            if let Some(d) = self.resample_every {
                write!(f, "EVERY {} ", format_std_duration_literal(d))?;
            }
            if let Some(d) = self.resample_for {
                write!(f, "FOR {} ", format_std_duration_literal(d))?;
            }
        }
        write!(f, "BEGIN {} END", self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateDatabaseStatement {
    pub name: String,
    /// True when a WITH clause describes the default retention policy
    pub retention_policy_create: bool,
    pub retention_policy_duration: Option<Duration>,
    pub retention_policy_replication: Option<u32>,
    pub retention_policy_name: String,
    pub retention_policy_shard_group_duration: Duration,
}

impl fmt::Display for CreateDatabaseStatement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CREATE DATABASE {}", quote_ident(&self.name))?;
        if self.retention_policy_create {
            f.write_str(" WITH")?;
            if let Some(d) = self.retention_policy_duration {
                write!(f, " DURATION {}", format_std_duration_literal(d))?;
            }
            if let Some(n) = self.retention_policy_replication {
                write!(f, " REPLICATION {}", n)?;
            }
            if !self.retention_policy_shard_group_duration.is_zero() {
                write!(
                    f,
                    " SHARD DURATION {}",
                    format_std_duration_literal(self.retention_policy_shard_group_duration)
                )?;
            }
            if !self.retention_policy_name.is_empty() {
                write!(f, " NAME {}", quote_ident(&self.retention_policy_name))?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateRetentionPolicyStatement {
    pub name: String,
    pub database: String,
    pub duration: Duration,
    pub replication: u32,
    pub default: bool,
    pub shard_group_duration: Duration,
}

impl fmt::Display for CreateRetentionPolicyStatement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "CREATE RETENTION POLICY {} ON {} DURATION {} REPLICATION {}",
            quote_ident(&self.name),
            quote_ident(&self.database),
            format_std_duration_literal(self.duration),
            self.replication
        )?;
        if !self.shard_group_duration.is_zero() {
            write!(
                f,
                " SHARD DURATION {}",
                format_std_duration_literal(self.shard_group_duration)
            )?;
        }
        if self.default {
            f.write_str(" DEFAULT")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateSubscriptionStatement {
    pub name: String,
    pub database: String,
    pub retention_policy: String,
    pub destinations: Vec<String>,
    pub mode: String,
}

impl fmt::Display for CreateSubscriptionStatement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let destinations: Vec<String> = self.destinations.iter().map(|d| quote_string(d)).collect();
        write!(
            f,
            "CREATE SUBSCRIPTION {} ON {}.{} DESTINATIONS {} {}",
            quote_ident(&self.name),
            quote_ident(&self.database),
            quote_ident(&self.retention_policy),
            self.mode,
            destinations.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateUserStatement {
    pub name: String,
    pub password: String,
    pub admin: bool,
}

impl fmt::Display for CreateUserStatement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "CREATE USER {} WITH PASSWORD [REDACTED]",
            quote_ident(&self.name)
        )?;
        if self.admin {
            f.write_str(" WITH ALL PRIVILEGES")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteSeriesStatement {
    pub sources: Vec<Source>,
    pub condition: Option<Expr>,
}

impl fmt::Display for DeleteSeriesStatement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("DELETE")?;
        if !self.sources.is_empty() {
            write!(f, " FROM {}", join(&self.sources))?;
        }
        if let Some(cond) = &self.condition {
            write!(f, " WHERE {}", cond)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropContinuousQueryStatement {
    pub name: String,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropDatabaseStatement {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropMeasurementStatement {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DropSeriesStatement {
    pub sources: Vec<Source>,
    pub condition: Option<Expr>,
}

impl fmt::Display for DropSeriesStatement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("DROP SERIES")?;
        if !self.sources.is_empty() {
            write!(f, " FROM {}", join(&self.sources))?;
        }
        if let Some(cond) = &self.condition {
            write!(f, " WHERE {}", cond)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropRetentionPolicyStatement {
    pub name: String,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropShardStatement {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropSubscriptionStatement {
    pub name: String,
    pub database: String,
    pub retention_policy: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropUserStatement {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExplainStatement {
    pub statement: SelectStatement,
    pub analyze: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrantStatement {
    pub privilege: Privilege,
    pub on: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrantAdminStatement {
    pub user: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevokeStatement {
    pub privilege: Privilege,
    pub on: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevokeAdminStatement {
    pub user: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetPasswordUserStatement {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShowDiagnosticsStatement {
    /// Restrict output to one diagnostics module
    pub module: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShowGrantsForUserStatement {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShowMeasurementsStatement {
    pub database: String,
    /// WITH MEASUREMENT clause
    pub source: Option<Measurement>,
    pub condition: Option<Expr>,
    pub limit: usize,
    pub offset: usize,
}

impl ShowMeasurementsStatement {
    /// Condition passed to storage: WITH MEASUREMENT folded into WHERE
    pub(crate) fn storage_condition(&self) -> Option<Expr> {
        let by_name = self.source.as_ref().and_then(Measurement::name_condition);
        Expr::and_opt(by_name, self.condition.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShowMeasurementCardinalityStatement {
    pub database: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShowRetentionPoliciesStatement {
    pub database: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShowSeriesCardinalityStatement {
    pub database: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShowStatsStatement {
    /// Restrict output to one statistics module
    pub module: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShowTagKeysStatement {
    pub database: String,
    pub sources: Vec<Source>,
    pub condition: Option<Expr>,
    pub limit: usize,
    pub offset: usize,
}

impl ShowTagKeysStatement {
    /// Condition passed to storage: FROM folded into WHERE
    pub(crate) fn storage_condition(&self, rest: Option<Expr>) -> Option<Expr> {
        Expr::and_opt(sources_condition(&self.sources), rest)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShowTagValuesStatement {
    pub database: String,
    pub sources: Vec<Source>,
    /// Operator of the WITH KEY clause
    pub op: BinaryOp,
    /// Right-hand side of the WITH KEY clause
    pub tag_key_expr: Expr,
    pub condition: Option<Expr>,
    pub limit: usize,
    pub offset: usize,
}

impl ShowTagValuesStatement {
    /// Condition passed to storage: FROM and WITH KEY folded into WHERE
    pub(crate) fn storage_condition(&self, rest: Option<Expr>) -> Option<Expr> {
        use super::expr::TAG_KEY_VAR;
        let key = Expr::binary(self.op, Expr::var(TAG_KEY_VAR), self.tag_key_expr.clone());
        Expr::and_opt(
            Expr::and_opt(sources_condition(&self.sources), Some(key)),
            rest,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KillQueryStatement {
    pub query_id: u64,
    /// Node the query runs on; empty for the local node
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShowSeriesStatement {
    pub database: String,
    pub sources: Vec<Source>,
    pub condition: Option<Expr>,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShowFieldKeysStatement {
    pub database: String,
    pub sources: Vec<Source>,
    pub limit: usize,
    pub offset: usize,
}

/// Every statement kind the query language defines
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    AlterRetentionPolicy(AlterRetentionPolicyStatement),
    CreateContinuousQuery(CreateContinuousQueryStatement),
    CreateDatabase(CreateDatabaseStatement),
    CreateRetentionPolicy(CreateRetentionPolicyStatement),
    CreateSubscription(CreateSubscriptionStatement),
    CreateUser(CreateUserStatement),
    DeleteSeries(DeleteSeriesStatement),
    DropContinuousQuery(DropContinuousQueryStatement),
    DropDatabase(DropDatabaseStatement),
    DropMeasurement(DropMeasurementStatement),
    DropRetentionPolicy(DropRetentionPolicyStatement),
    DropSeries(DropSeriesStatement),
    DropShard(DropShardStatement),
    DropSubscription(DropSubscriptionStatement),
    DropUser(DropUserStatement),
    Explain(ExplainStatement),
    Grant(GrantStatement),
    GrantAdmin(GrantAdminStatement),
    KillQuery(KillQueryStatement),
    Revoke(RevokeStatement),
    RevokeAdmin(RevokeAdminStatement),
    Select(SelectStatement),
    SetPasswordUser(SetPasswordUserStatement),
    ShowContinuousQueries,
    ShowDatabases,
    ShowDiagnostics(ShowDiagnosticsStatement),
    ShowFieldKeys(ShowFieldKeysStatement),
    ShowGrantsForUser(ShowGrantsForUserStatement),
    ShowMeasurementCardinality(ShowMeasurementCardinalityStatement),
    ShowMeasurements(ShowMeasurementsStatement),
    ShowQueries,
    ShowRetentionPolicies(ShowRetentionPoliciesStatement),
    ShowSeries(ShowSeriesStatement),
    ShowSeriesCardinality(ShowSeriesCardinalityStatement),
    ShowShardGroups,
    ShowShards,
    ShowStats(ShowStatsStatement),
    ShowSubscriptions,
    ShowTagKeys(ShowTagKeysStatement),
    ShowTagValues(ShowTagValuesStatement),
    ShowUsers,
}

impl Statement {
    /// Visit every measurement reference, including those nested in
    /// subqueries, continuous-query bodies and explained statements
    pub fn for_each_measurement_mut<E>(
        &mut self,
        f: &mut dyn FnMut(&mut Measurement) -> Result<(), E>,
    ) -> Result<(), E> {
        let sources = match self {
            Statement::Select(stmt) => return stmt.for_each_measurement_mut(f),
            Statement::Explain(stmt) => return stmt.statement.for_each_measurement_mut(f),
            Statement::CreateContinuousQuery(stmt) => {
                return stmt.source.for_each_measurement_mut(f)
            }
            Statement::ShowMeasurements(stmt) => {
                if let Some(m) = &mut stmt.source {
                    f(m)?;
                }
                return Ok(());
            }
            Statement::DeleteSeries(stmt) => &mut stmt.sources,
            Statement::DropSeries(stmt) => &mut stmt.sources,
            Statement::ShowTagKeys(stmt) => &mut stmt.sources,
            Statement::ShowTagValues(stmt) => &mut stmt.sources,
            Statement::ShowSeries(stmt) => &mut stmt.sources,
            Statement::ShowFieldKeys(stmt) => &mut stmt.sources,
            _ => return Ok(()),
        };
        for source in sources {
            match source {
                Source::Measurement(m) => f(m)?,
                Source::SubQuery(stmt) => stmt.for_each_measurement_mut(f)?,
            }
        }
        Ok(())
    }

    /// Statements that change metadata or stored data
    pub fn is_mutating(&self) -> bool {
        match self {
            Statement::AlterRetentionPolicy(_)
            | Statement::CreateContinuousQuery(_)
            | Statement::CreateDatabase(_)
            | Statement::CreateRetentionPolicy(_)
            | Statement::CreateSubscription(_)
            | Statement::CreateUser(_)
            | Statement::DeleteSeries(_)
            | Statement::DropContinuousQuery(_)
            | Statement::DropDatabase(_)
            | Statement::DropMeasurement(_)
            | Statement::DropRetentionPolicy(_)
            | Statement::DropSeries(_)
            | Statement::DropShard(_)
            | Statement::DropSubscription(_)
            | Statement::DropUser(_)
            | Statement::Grant(_)
            | Statement::GrantAdmin(_)
            | Statement::Revoke(_)
            | Statement::RevokeAdmin(_)
            | Statement::SetPasswordUser(_) => true,
            Statement::Select(stmt) => stmt.target.is_some(),
            Statement::Explain(_)
            | Statement::KillQuery(_)
            | Statement::ShowContinuousQueries
            | Statement::ShowDatabases
            | Statement::ShowDiagnostics(_)
            | Statement::ShowFieldKeys(_)
            | Statement::ShowGrantsForUser(_)
            | Statement::ShowMeasurementCardinality(_)
            | Statement::ShowMeasurements(_)
            | Statement::ShowQueries
            | Statement::ShowRetentionPolicies(_)
            | Statement::ShowSeries(_)
            | Statement::ShowSeriesCardinality(_)
            | Statement::ShowShardGroups
            | Statement::ShowShards
            | Statement::ShowStats(_)
            | Statement::ShowSubscriptions
            | Statement::ShowTagKeys(_)
            | Statement::ShowTagValues(_)
            | Statement::ShowUsers => false,
        }
    }
}

fn write_paging(f: &mut fmt::Formatter, limit: usize, offset: usize) -> fmt::Result {
    if limit > 0 {
        write!(f, " LIMIT {}", limit)?;
    }
    if offset > 0 {
        write!(f, " OFFSET {}", offset)?;
    }
    Ok(())
}

fn write_on(f: &mut fmt::Formatter, database: &str) -> fmt::Result {
    if !database.is_empty() {
        write!(f, " ON {}", quote_ident(database))?;
    }
    Ok(())
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Statement::AlterRetentionPolicy(s) => write!(f, "{}", s),
            Statement::CreateContinuousQuery(s) => write!(f, "{}", s),
            Statement::CreateDatabase(s) => write!(f, "{}", s),
            Statement::CreateRetentionPolicy(s) => write!(f, "{}", s),
            Statement::CreateSubscription(s) => write!(f, "{}", s),
            Statement::CreateUser(s) => write!(f, "{}", s),
            Statement::DeleteSeries(s) => write!(f, "{}", s),
            Statement::DropContinuousQuery(s) => write!(
                f,
                "DROP CONTINUOUS QUERY {} ON {}",
                quote_ident(&s.name),
                quote_ident(&s.database)
            ),
            Statement::DropDatabase(s) => write!(f, "DROP DATABASE {}", quote_ident(&s.name)),
            Statement::DropMeasurement(s) => {
                write!(f, "DROP MEASUREMENT {}", quote_ident(&s.name))
            }
            Statement::DropRetentionPolicy(s) => write!(
                f,
                "DROP RETENTION POLICY {} ON {}",
                quote_ident(&s.name),
                quote_ident(&s.database)
            ),
            Statement::DropSeries(s) => write!(f, "{}", s),
            Statement::DropShard(s) => write!(f, "DROP SHARD {}", s.id),
            Statement::DropSubscription(s) => write!(
                f,
                "DROP SUBSCRIPTION {} ON {}.{}",
                quote_ident(&s.name),
                quote_ident(&s.database),
                quote_ident(&s.retention_policy)
            ),
            Statement::DropUser(s) => write!(f, "DROP USER {}", quote_ident(&s.name)),
            Statement::Explain(s) => {
                f.write_str("EXPLAIN ")?;
                if s.analyze {
                    f.write_str("ANALYZE ")?;
                }
                write!(f, "{}", s.statement)
            }
            Statement::Grant(s) => write!(
                f,
                "GRANT {} ON {} TO {}",
                s.privilege,
                quote_ident(&s.on),
                quote_ident(&s.user)
            ),
            Statement::GrantAdmin(s) => {
                write!(f, "GRANT ALL PRIVILEGES TO {}", quote_ident(&s.user))
            }
            Statement::KillQuery(s) => {
                write!(f, "KILL QUERY {}", s.query_id)?;
                if !s.host.is_empty() {
                    write!(f, " ON {}", quote_ident(&s.host))?;
                }
                Ok(())
            }
            Statement::Revoke(s) => write!(
                f,
                "REVOKE {} ON {} FROM {}",
                s.privilege,
                quote_ident(&s.on),
                quote_ident(&s.user)
            ),
            Statement::RevokeAdmin(s) => {
                write!(f, "REVOKE ALL PRIVILEGES FROM {}", quote_ident(&s.user))
            }
            Statement::Select(s) => write!(f, "{}", s),
            Statement::SetPasswordUser(s) => write!(
                f,
                "SET PASSWORD FOR {} = [REDACTED]",
                quote_ident(&s.name)
            ),
            Statement::ShowContinuousQueries => f.write_str("SHOW CONTINUOUS QUERIES"),
            Statement::ShowDatabases => f.write_str("SHOW DATABASES"),
            Statement::ShowDiagnostics(s) => {
                f.write_str("SHOW DIAGNOSTICS")?;
                if !s.module.is_empty() {
                    write!(f, " FOR {}", quote_string(&s.module))?;
                }
                Ok(())
            }
            Statement::ShowFieldKeys(s) => {
                f.write_str("SHOW FIELD KEYS")?;
                write_on(f, &s.database)?;
                if !s.sources.is_empty() {
                    write!(f, " FROM {}", join(&s.sources))?;
                }
                write_paging(f, s.limit, s.offset)
            }
            Statement::ShowGrantsForUser(s) => {
                write!(f, "SHOW GRANTS FOR {}", quote_ident(&s.name))
            }
            Statement::ShowMeasurementCardinality(s) => {
                f.write_str("SHOW MEASUREMENT CARDINALITY")?;
                write_on(f, &s.database)
            }
            Statement::ShowMeasurements(s) => {
                f.write_str("SHOW MEASUREMENTS")?;
                write_on(f, &s.database)?;
                if let Some(m) = &s.source {
                    f.write_str(" WITH MEASUREMENT ")?;
                    match &m.regex {
                        Some(re) => write!(f, "=~ {}", re)?,
                        None => write!(f, "= {}", quote_ident(&m.name))?,
                    }
                }
                if let Some(cond) = &s.condition {
                    write!(f, " WHERE {}", cond)?;
                }
                write_paging(f, s.limit, s.offset)
            }
            Statement::ShowQueries => f.write_str("SHOW QUERIES"),
            Statement::ShowRetentionPolicies(s) => {
                f.write_str("SHOW RETENTION POLICIES")?;
                write_on(f, &s.database)
            }
            Statement::ShowSeries(s) => {
                f.write_str("SHOW SERIES")?;
                write_on(f, &s.database)?;
                if !s.sources.is_empty() {
                    write!(f, " FROM {}", join(&s.sources))?;
                }
                if let Some(cond) = &s.condition {
                    write!(f, " WHERE {}", cond)?;
                }
                write_paging(f, s.limit, s.offset)
            }
            Statement::ShowSeriesCardinality(s) => {
                f.write_str("SHOW SERIES CARDINALITY")?;
                write_on(f, &s.database)
            }
            Statement::ShowShardGroups => f.write_str("SHOW SHARD GROUPS"),
            Statement::ShowShards => f.write_str("SHOW SHARDS"),
            Statement::ShowStats(s) => {
                f.write_str("SHOW STATS")?;
                if !s.module.is_empty() {
                    write!(f, " FOR {}", quote_string(&s.module))?;
                }
                Ok(())
            }
            Statement::ShowSubscriptions => f.write_str("SHOW SUBSCRIPTIONS"),
            Statement::ShowTagKeys(s) => {
                f.write_str("SHOW TAG KEYS")?;
                write_on(f, &s.database)?;
                if !s.sources.is_empty() {
                    write!(f, " FROM {}", join(&s.sources))?;
                }
                if let Some(cond) = &s.condition {
                    write!(f, " WHERE {}", cond)?;
                }
                write_paging(f, s.limit, s.offset)
            }
            Statement::ShowTagValues(s) => {
                f.write_str("SHOW TAG VALUES")?;
                write_on(f, &s.database)?;
                if !s.sources.is_empty() {
                    write!(f, " FROM {}", join(&s.sources))?;
                }
                write!(f, " WITH KEY {} {}", s.op, s.tag_key_expr)?;
                if let Some(cond) = &s.condition {
                    write!(f, " WHERE {}", cond)?;
                }
                write_paging(f, s.limit, s.offset)
            }
            Statement::ShowUsers => f.write_str("SHOW USERS"),
        }
    }
}
