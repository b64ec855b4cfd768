// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement normalization
//!
//! Fills in the default database and retention policy before execution so
//! that every measurement reference is fully qualified.

use crate::ast::{Measurement, Statement};
use crate::exec::{ExecutionError, ExecutionResult};
use crate::meta::MetaClient;

/// Qualify `stmt` with defaults; `default_retention_policy` may be empty
pub fn normalize_statement(
    meta: &dyn MetaClient,
    stmt: &mut Statement,
    default_database: &str,
    default_retention_policy: &str,
) -> ExecutionResult<()> {
    let database = match stmt {
        Statement::ShowRetentionPolicies(s) => Some(&mut s.database),
        Statement::ShowMeasurements(s) => Some(&mut s.database),
        Statement::ShowTagKeys(s) => Some(&mut s.database),
        Statement::ShowTagValues(s) => Some(&mut s.database),
        Statement::ShowMeasurementCardinality(s) => Some(&mut s.database),
        Statement::ShowSeriesCardinality(s) => Some(&mut s.database),
        _ => None,
    };
    if let Some(database) = database {
        if database.is_empty() {
            *database = default_database.to_string();
        }
    }

    // Series deletes cannot carry a database or retention policy, so their
    // sources are left as written.
    if matches!(stmt, Statement::DropSeries(_) | Statement::DeleteSeries(_)) {
        return Ok(());
    }

    stmt.for_each_measurement_mut(&mut |m| {
        normalize_measurement(meta, m, default_database, default_retention_policy)
    })
}

fn normalize_measurement(
    meta: &dyn MetaClient,
    m: &mut Measurement,
    default_database: &str,
    default_retention_policy: &str,
) -> ExecutionResult<()> {
    // INTO targets may leave the name blank to reuse the source name.
    if !m.is_target && m.name.is_empty() && m.system_iterator.is_empty() && m.regex.is_none() {
        return Err(ExecutionError::InvalidMeasurement);
    }

    if m.database.is_empty() {
        m.database = default_database.to_string();
    }
    if m.database.is_empty() {
        return Err(ExecutionError::DatabaseNameRequired);
    }

    let db = meta
        .database(&m.database)
        .ok_or_else(|| ExecutionError::DatabaseNotFound(m.database.clone()))?;

    if m.retention_policy.is_empty() {
        if !default_retention_policy.is_empty() {
            m.retention_policy = default_retention_policy.to_string();
        } else if !db.default_retention_policy.is_empty() {
            m.retention_policy = db.default_retention_policy;
        } else {
            return Err(ExecutionError::DefaultRetentionPolicyNotSet(db.name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        DropSeriesStatement, SelectStatement, ShowMeasurementsStatement, Source, Target,
    };
    use crate::meta::MemoryMetaClient;

    fn meta() -> MemoryMetaClient {
        let meta = MemoryMetaClient::new(1);
        meta.create_database("db0").unwrap();
        meta
    }

    fn select_from(m: Measurement) -> Statement {
        Statement::Select(SelectStatement {
            sources: vec![Source::Measurement(m)],
            ..Default::default()
        })
    }

    fn first_source(stmt: &Statement) -> &Measurement {
        match stmt {
            Statement::Select(s) => match &s.sources[0] {
                Source::Measurement(m) => m,
                Source::SubQuery(_) => panic!("expected measurement"),
            },
            _ => panic!("expected select"),
        }
    }

    #[test]
    fn test_fills_database_and_policy() {
        let meta = meta();
        let mut stmt = select_from(Measurement::named("cpu"));
        normalize_statement(&meta, &mut stmt, "db0", "").unwrap();
        let m = first_source(&stmt);
        assert_eq!(m.database, "db0");
        assert_eq!(m.retention_policy, "autogen");

        let mut stmt = select_from(Measurement::named("cpu"));
        normalize_statement(&meta, &mut stmt, "db0", "rp9").unwrap();
        assert_eq!(first_source(&stmt).retention_policy, "rp9");
    }

    #[test]
    fn test_measurement_errors() {
        let meta = meta();
        let mut stmt = select_from(Measurement::default());
        assert_eq!(
            normalize_statement(&meta, &mut stmt, "db0", ""),
            Err(ExecutionError::InvalidMeasurement)
        );

        let mut stmt = select_from(Measurement::named("cpu"));
        assert_eq!(
            normalize_statement(&meta, &mut stmt, "", ""),
            Err(ExecutionError::DatabaseNameRequired)
        );

        let mut stmt = select_from(Measurement::named("cpu"));
        assert_eq!(
            normalize_statement(&meta, &mut stmt, "nope", ""),
            Err(ExecutionError::DatabaseNotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_blank_target_stays_blank() {
        let meta = meta();
        let mut stmt = Statement::Select(SelectStatement {
            target: Some(Target::new(Measurement::default())),
            sources: vec![Source::Measurement(Measurement::named("cpu"))],
            ..Default::default()
        });
        normalize_statement(&meta, &mut stmt, "db0", "").unwrap();
        match &stmt {
            Statement::Select(s) => {
                let target = &s.target.as_ref().unwrap().measurement;
                assert!(target.name.is_empty());
                assert_eq!(target.database, "db0");
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_show_database_defaults_and_series_exemption() {
        let meta = meta();
        let mut stmt = Statement::ShowMeasurements(ShowMeasurementsStatement::default());
        normalize_statement(&meta, &mut stmt, "db0", "").unwrap();
        match &stmt {
            Statement::ShowMeasurements(s) => assert_eq!(s.database, "db0"),
            _ => unreachable!(),
        }

        let mut stmt = Statement::DropSeries(DropSeriesStatement {
            sources: vec![Source::Measurement(Measurement::named("cpu"))],
            condition: None,
        });
        normalize_statement(&meta, &mut stmt, "missing", "").unwrap();
        match &stmt {
            Statement::DropSeries(s) => match &s.sources[0] {
                Source::Measurement(m) => assert!(m.database.is_empty()),
                Source::SubQuery(_) => unreachable!(),
            },
            _ => unreachable!(),
        }
    }
}
