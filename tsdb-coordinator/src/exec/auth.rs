// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Authorization capabilities handed to a statement execution
//!
//! Authentication and privilege resolution happen before a statement reaches
//! the coordinator. The coordinator only asks these questions.

use crate::ast::Privilege;
use crate::storage::Tags;

/// Per-series authorization used while reading data and metadata
pub trait FineAuthorizer: Send + Sync {
    fn authorize_database(&self, privilege: Privilege, database: &str) -> bool;

    fn authorize_series_read(&self, database: &str, measurement: &str, tags: &Tags) -> bool;

    fn authorize_series_write(&self, database: &str, measurement: &str, tags: &Tags) -> bool;

    /// True when every check above would pass, letting callers skip them
    fn is_open(&self) -> bool {
        false
    }
}

/// Database-level authorization used by listings
pub trait CoarseAuthorizer: Send + Sync {
    fn authorize_database(&self, privilege: Privilege, database: &str) -> bool;
}

/// Authorizer that allows everything
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAuthorizer;

impl FineAuthorizer for OpenAuthorizer {
    fn authorize_database(&self, _privilege: Privilege, _database: &str) -> bool {
        true
    }

    fn authorize_series_read(&self, _database: &str, _measurement: &str, _tags: &Tags) -> bool {
        true
    }

    fn authorize_series_write(&self, _database: &str, _measurement: &str, _tags: &Tags) -> bool {
        true
    }

    fn is_open(&self) -> bool {
        true
    }
}

impl CoarseAuthorizer for OpenAuthorizer {
    fn authorize_database(&self, _privilege: Privilege, _database: &str) -> bool {
        true
    }
}

/// Coarse authorizer backed by a user's per-database privileges
#[derive(Debug, Clone, Default)]
pub struct UserAuthorizer {
    pub admin: bool,
    pub privileges: std::collections::BTreeMap<String, Privilege>,
}

impl CoarseAuthorizer for UserAuthorizer {
    fn authorize_database(&self, privilege: Privilege, database: &str) -> bool {
        if self.admin {
            return true;
        }
        self.privileges
            .get(database)
            .is_some_and(|granted| granted.contains(privilege))
    }
}

impl FineAuthorizer for UserAuthorizer {
    fn authorize_database(&self, privilege: Privilege, database: &str) -> bool {
        CoarseAuthorizer::authorize_database(self, privilege, database)
    }

    fn authorize_series_read(&self, database: &str, _measurement: &str, _tags: &Tags) -> bool {
        CoarseAuthorizer::authorize_database(self, Privilege::Read, database)
    }

    fn authorize_series_write(&self, database: &str, _measurement: &str, _tags: &Tags) -> bool {
        CoarseAuthorizer::authorize_database(self, Privilege::Write, database)
    }

    fn is_open(&self) -> bool {
        self.admin
    }
}
