// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory metadata gateway for single-node use and testing

use super::client::MetaClient;
use super::error::{MetaError, MetaResult};
use super::types::{
    valid_name, ContinuousQueryInfo, DatabaseInfo, RetentionPolicyInfo, RetentionPolicySpec,
    RetentionPolicyUpdate, ShardGroupInfo, ShardInfo, SubscriptionInfo, UserInfo,
    MIN_RETENTION_POLICY_DURATION,
};
use crate::ast::Privilege;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct MetaData {
    databases: BTreeMap<String, DatabaseInfo>,
    users: BTreeMap<String, UserInfo>,
    max_shard_group_id: u64,
    max_shard_id: u64,
}

impl MetaData {
    fn database_mut(&mut self, name: &str) -> MetaResult<&mut DatabaseInfo> {
        self.databases
            .get_mut(name)
            .ok_or_else(|| MetaError::DatabaseNotFound(name.to_string()))
    }

    fn retention_policy_mut(
        &mut self,
        database: &str,
        name: &str,
    ) -> MetaResult<&mut RetentionPolicyInfo> {
        self.database_mut(database)?
            .retention_policies
            .iter_mut()
            .find(|rp| rp.name == name)
            .ok_or_else(|| MetaError::RetentionPolicyNotFound(name.to_string()))
    }

    fn user_mut(&mut self, name: &str) -> MetaResult<&mut UserInfo> {
        self.users
            .get_mut(name)
            .ok_or_else(|| MetaError::UserNotFound(name.to_string()))
    }
}

/// Metadata held in process memory behind a single lock
pub struct MemoryMetaClient {
    node_id: u64,
    data: RwLock<MetaData>,
}

impl MemoryMetaClient {
    /// Create an empty store whose shards are owned by `node_id`
    pub fn new(node_id: u64) -> Self {
        Self {
            node_id,
            data: RwLock::new(MetaData::default()),
        }
    }

    /// Check a user's password
    pub fn authenticate(&self, name: &str, password: &str) -> MetaResult<UserInfo> {
        let data = self.data.read();
        let user = data
            .users
            .get(name)
            .ok_or_else(|| MetaError::UserNotFound(name.to_string()))?;
        if user.hash != hash_password(password) {
            return Err(MetaError::OperationFailed("authentication failed".to_string()));
        }
        Ok(user.clone())
    }
}

impl Default for MemoryMetaClient {
    fn default() -> Self {
        Self::new(0)
    }
}

// Placeholder digest; the in-memory gateway never persists credentials.
fn hash_password(password: &str) -> String {
    format!("hash_{:08x}", crc32fast::hash(password.as_bytes()))
}

fn validate_spec(spec: &RetentionPolicySpec) -> MetaResult<RetentionPolicyInfo> {
    let rp = spec.to_info();
    if !valid_name(&rp.name) {
        return Err(MetaError::InvalidName);
    }
    if rp.replica_n == 0 {
        return Err(MetaError::ReplicationFactorTooLow);
    }
    if !rp.duration.is_zero() {
        if rp.duration < MIN_RETENTION_POLICY_DURATION {
            return Err(MetaError::RetentionPolicyDurationTooLow(
                crate::ast::format_duration(MIN_RETENTION_POLICY_DURATION),
            ));
        }
        if rp.duration < rp.shard_group_duration {
            return Err(MetaError::IncompatibleDurations);
        }
    }
    Ok(rp)
}

fn truncate_to(t: DateTime<Utc>, window: std::time::Duration) -> MetaResult<DateTime<Utc>> {
    let width = window.as_nanos().min(i64::MAX as u128) as i64;
    if width == 0 {
        return Ok(t);
    }
    let ns = t.timestamp_nanos_opt().ok_or_else(|| {
        MetaError::OperationFailed(format!("timestamp out of range: {}", t))
    })?;
    ns.checked_sub(ns.rem_euclid(width))
        .map(DateTime::from_timestamp_nanos)
        .ok_or_else(|| {
            MetaError::OperationFailed(format!("cannot align {} to shard group duration", t))
        })
}

impl MetaClient for MemoryMetaClient {
    fn database(&self, name: &str) -> Option<DatabaseInfo> {
        self.data.read().databases.get(name).cloned()
    }

    fn databases(&self) -> Vec<DatabaseInfo> {
        self.data.read().databases.values().cloned().collect()
    }

    fn create_database(&self, name: &str) -> MetaResult<DatabaseInfo> {
        self.create_database_with_retention_policy(name, &RetentionPolicySpec::default())
    }

    fn create_database_with_retention_policy(
        &self,
        name: &str,
        spec: &RetentionPolicySpec,
    ) -> MetaResult<DatabaseInfo> {
        if !valid_name(name) {
            return Err(MetaError::InvalidName);
        }
        let rp = validate_spec(spec)?;

        let mut data = self.data.write();
        if let Some(db) = data.databases.get(name) {
            // Re-creating is idempotent only when the default policy agrees.
            let default = db.retention_policy(&db.default_retention_policy);
            return match default {
                Some(existing) if spec.matches(existing) => Ok(db.clone()),
                None => Ok(db.clone()),
                Some(_) => Err(MetaError::RetentionPolicyConflict(rp.name)),
            };
        }

        let db = DatabaseInfo {
            name: name.to_string(),
            default_retention_policy: rp.name.clone(),
            retention_policies: vec![rp],
            continuous_queries: Vec::new(),
        };
        data.databases.insert(name.to_string(), db.clone());
        Ok(db)
    }

    fn drop_database(&self, name: &str) -> MetaResult<()> {
        let mut data = self.data.write();
        data.databases.remove(name);
        for user in data.users.values_mut() {
            user.privileges.remove(name);
        }
        Ok(())
    }

    fn create_retention_policy(
        &self,
        database: &str,
        spec: &RetentionPolicySpec,
        make_default: bool,
    ) -> MetaResult<RetentionPolicyInfo> {
        let rp = validate_spec(spec)?;
        let mut data = self.data.write();
        let db = data.database_mut(database)?;

        if let Some(existing) = db.retention_policy(&rp.name) {
            if !spec.matches(existing) {
                return Err(MetaError::RetentionPolicyConflict(rp.name));
            }
            let existing = existing.clone();
            if make_default {
                db.default_retention_policy = existing.name.clone();
            }
            return Ok(existing);
        }

        if make_default {
            db.default_retention_policy = rp.name.clone();
        }
        db.retention_policies.push(rp.clone());
        Ok(rp)
    }

    fn retention_policy(
        &self,
        database: &str,
        name: &str,
    ) -> MetaResult<Option<RetentionPolicyInfo>> {
        let data = self.data.read();
        let db = data
            .databases
            .get(database)
            .ok_or_else(|| MetaError::DatabaseNotFound(database.to_string()))?;
        Ok(db.retention_policy(name).cloned())
    }

    fn update_retention_policy(
        &self,
        database: &str,
        name: &str,
        update: &RetentionPolicyUpdate,
        make_default: bool,
    ) -> MetaResult<()> {
        let mut data = self.data.write();
        let db = data.database_mut(database)?;
        let rp = db
            .retention_policies
            .iter_mut()
            .find(|rp| rp.name == name)
            .ok_or_else(|| MetaError::RetentionPolicyNotFound(name.to_string()))?;

        let mut next = rp.clone();
        if let Some(new_name) = &update.name {
            if !valid_name(new_name) {
                return Err(MetaError::InvalidName);
            }
            next.name = new_name.clone();
        }
        if let Some(d) = update.duration {
            next.duration = d;
        }
        if let Some(n) = update.replica_n {
            if n == 0 {
                return Err(MetaError::ReplicationFactorTooLow);
            }
            next.replica_n = n;
        }
        if let Some(d) = update.shard_group_duration {
            next.shard_group_duration = d;
        }
        if !next.duration.is_zero() {
            if next.duration < MIN_RETENTION_POLICY_DURATION {
                return Err(MetaError::RetentionPolicyDurationTooLow(
                    crate::ast::format_duration(MIN_RETENTION_POLICY_DURATION),
                ));
            }
            if next.duration < next.shard_group_duration {
                return Err(MetaError::IncompatibleDurations);
            }
        }

        let renamed = next.name.clone();
        *rp = next;
        if make_default || db.default_retention_policy == name {
            db.default_retention_policy = renamed;
        }
        Ok(())
    }

    fn drop_retention_policy(&self, database: &str, name: &str) -> MetaResult<()> {
        let mut data = self.data.write();
        let db = data.database_mut(database)?;
        db.retention_policies.retain(|rp| rp.name != name);
        if db.default_retention_policy == name {
            db.default_retention_policy.clear();
        }
        Ok(())
    }

    fn create_subscription(
        &self,
        database: &str,
        retention_policy: &str,
        name: &str,
        mode: &str,
        destinations: &[String],
    ) -> MetaResult<()> {
        let mut data = self.data.write();
        let rp = data.retention_policy_mut(database, retention_policy)?;
        if rp.subscriptions.iter().any(|s| s.name == name) {
            return Err(MetaError::SubscriptionExists(name.to_string()));
        }
        rp.subscriptions.push(SubscriptionInfo {
            name: name.to_string(),
            mode: mode.to_string(),
            destinations: destinations.to_vec(),
        });
        Ok(())
    }

    fn drop_subscription(
        &self,
        database: &str,
        retention_policy: &str,
        name: &str,
    ) -> MetaResult<()> {
        let mut data = self.data.write();
        let rp = data.retention_policy_mut(database, retention_policy)?;
        let before = rp.subscriptions.len();
        rp.subscriptions.retain(|s| s.name != name);
        if rp.subscriptions.len() == before {
            return Err(MetaError::SubscriptionNotFound(name.to_string()));
        }
        Ok(())
    }

    fn create_user(&self, name: &str, password: &str, admin: bool) -> MetaResult<UserInfo> {
        if name.is_empty() {
            return Err(MetaError::UsernameRequired);
        }
        let mut data = self.data.write();
        let hash = hash_password(password);
        if let Some(existing) = data.users.get(name) {
            if existing.hash != hash || existing.admin != admin {
                return Err(MetaError::UserExists(name.to_string()));
            }
            return Ok(existing.clone());
        }
        let user = UserInfo {
            name: name.to_string(),
            hash,
            admin,
            privileges: BTreeMap::new(),
        };
        data.users.insert(name.to_string(), user.clone());
        Ok(user)
    }

    fn update_user(&self, name: &str, password: &str) -> MetaResult<()> {
        self.data.write().user_mut(name)?.hash = hash_password(password);
        Ok(())
    }

    fn drop_user(&self, name: &str) -> MetaResult<()> {
        self.data
            .write()
            .users
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| MetaError::UserNotFound(name.to_string()))
    }

    fn users(&self) -> Vec<UserInfo> {
        self.data.read().users.values().cloned().collect()
    }

    fn user_privileges(&self, name: &str) -> MetaResult<BTreeMap<String, Privilege>> {
        self.data
            .read()
            .users
            .get(name)
            .map(|u| u.privileges.clone())
            .ok_or_else(|| MetaError::UserNotFound(name.to_string()))
    }

    fn user_privilege(&self, name: &str, database: &str) -> MetaResult<Privilege> {
        let data = self.data.read();
        let user = data
            .users
            .get(name)
            .ok_or_else(|| MetaError::UserNotFound(name.to_string()))?;
        Ok(user.privileges.get(database).copied().unwrap_or_default())
    }

    fn set_privilege(&self, name: &str, database: &str, privilege: Privilege) -> MetaResult<()> {
        let mut data = self.data.write();
        if !data.databases.contains_key(database) {
            return Err(MetaError::DatabaseNotFound(database.to_string()));
        }
        data.user_mut(name)?
            .privileges
            .insert(database.to_string(), privilege);
        Ok(())
    }

    fn set_admin_privilege(&self, name: &str, admin: bool) -> MetaResult<()> {
        self.data.write().user_mut(name)?.admin = admin;
        Ok(())
    }

    fn create_continuous_query(&self, database: &str, name: &str, query: &str) -> MetaResult<()> {
        let mut data = self.data.write();
        let db = data.database_mut(database)?;
        if let Some(cq) = db.continuous_queries.iter().find(|cq| cq.name == name) {
            if cq.query == query {
                return Ok(());
            }
            return Err(MetaError::ContinuousQueryExists(name.to_string()));
        }
        db.continuous_queries.push(ContinuousQueryInfo {
            name: name.to_string(),
            query: query.to_string(),
        });
        Ok(())
    }

    fn drop_continuous_query(&self, database: &str, name: &str) -> MetaResult<()> {
        let mut data = self.data.write();
        let db = data.database_mut(database)?;
        let before = db.continuous_queries.len();
        db.continuous_queries.retain(|cq| cq.name != name);
        if db.continuous_queries.len() == before {
            return Err(MetaError::ContinuousQueryNotFound(name.to_string()));
        }
        Ok(())
    }

    fn shard_groups_by_time_range(
        &self,
        database: &str,
        retention_policy: &str,
        min: DateTime<Utc>,
        max: DateTime<Utc>,
    ) -> MetaResult<Vec<ShardGroupInfo>> {
        let data = self.data.read();
        let db = data
            .databases
            .get(database)
            .ok_or_else(|| MetaError::DatabaseNotFound(database.to_string()))?;
        let rp = db
            .retention_policy(retention_policy)
            .ok_or_else(|| MetaError::RetentionPolicyNotFound(retention_policy.to_string()))?;

        let mut groups: Vec<ShardGroupInfo> = rp
            .shard_groups
            .iter()
            .filter(|sg| !sg.deleted() && sg.overlaps(min, max))
            .cloned()
            .collect();
        groups.sort_by_key(|sg| sg.start_time);
        Ok(groups)
    }

    fn create_shard_group(
        &self,
        database: &str,
        retention_policy: &str,
        timestamp: DateTime<Utc>,
    ) -> MetaResult<ShardGroupInfo> {
        let node_id = self.node_id;
        let mut data = self.data.write();
        let group_id = data.max_shard_group_id + 1;
        let shard_id = data.max_shard_id + 1;

        let rp = data.retention_policy_mut(database, retention_policy)?;
        if let Some(sg) = rp.shard_group_by_timestamp(timestamp) {
            return Ok(sg.clone());
        }

        let start_time = truncate_to(timestamp, rp.shard_group_duration)?;
        let width = ChronoDuration::from_std(rp.shard_group_duration)
            .map_err(|e| MetaError::OperationFailed(e.to_string()))?;
        let end_time = start_time
            .checked_add_signed(width)
            .unwrap_or_else(crate::ast::TimeRange::max_supported);
        let sg = ShardGroupInfo {
            id: group_id,
            start_time,
            end_time,
            deleted_at: None,
            shards: vec![ShardInfo {
                id: shard_id,
                owners: vec![node_id],
            }],
        };
        rp.shard_groups.push(sg.clone());

        data.max_shard_group_id = group_id;
        data.max_shard_id = shard_id;
        Ok(sg)
    }

    fn delete_shard_group(
        &self,
        database: &str,
        retention_policy: &str,
        id: u64,
    ) -> MetaResult<()> {
        let mut data = self.data.write();
        let rp = data.retention_policy_mut(database, retention_policy)?;
        let sg = rp
            .shard_groups
            .iter_mut()
            .find(|sg| sg.id == id)
            .ok_or(MetaError::ShardGroupNotFound(id))?;
        sg.deleted_at = Some(Utc::now());
        Ok(())
    }

    fn drop_shard(&self, id: u64) -> MetaResult<()> {
        let mut data = self.data.write();
        let mut found = false;
        for db in data.databases.values_mut() {
            for rp in &mut db.retention_policies {
                for sg in &mut rp.shard_groups {
                    let before = sg.shards.len();
                    sg.shards.retain(|s| s.id != id);
                    found |= sg.shards.len() != before;
                }
            }
        }
        if !found {
            return Err(MetaError::ShardNotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn client_with_db(name: &str) -> MemoryMetaClient {
        let client = MemoryMetaClient::new(7);
        client.create_database(name).unwrap();
        client
    }

    #[test]
    fn test_create_database_installs_default_policy() {
        let client = client_with_db("db0");
        let db = client.database("db0").unwrap();
        assert_eq!(db.default_retention_policy, "autogen");
        assert_eq!(db.retention_policies.len(), 1);
        // Re-creating is a no-op.
        assert!(client.create_database("db0").is_ok());
        assert!(matches!(client.create_database(""), Err(MetaError::InvalidName)));
    }

    #[test]
    fn test_shard_group_rejects_unrepresentable_time() {
        let client = client_with_db("db0");
        let t = Utc.with_ymd_and_hms(3000, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            client.create_shard_group("db0", "autogen", t),
            Err(MetaError::OperationFailed(_))
        ));
        assert!(client.database("db0").unwrap().retention_policies[0]
            .shard_groups
            .is_empty());

        let earliest = DateTime::from_timestamp_nanos(i64::MIN);
        assert!(matches!(
            truncate_to(earliest, Duration::from_secs(3600)),
            Err(MetaError::OperationFailed(_))
        ));
    }

    #[test]
    fn test_shard_group_lifecycle() {
        let client = client_with_db("db0");
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let sg = client.create_shard_group("db0", "autogen", t).unwrap();
        assert!(sg.contains(t));
        assert_eq!(sg.shards[0].owners, vec![7]);

        // Same window reuses the group.
        let again = client
            .create_shard_group("db0", "autogen", t + ChronoDuration::minutes(1))
            .unwrap();
        assert_eq!(again.id, sg.id);

        let found = client
            .shard_groups_by_time_range("db0", "autogen", t, t)
            .unwrap();
        assert_eq!(found.len(), 1);

        client.delete_shard_group("db0", "autogen", sg.id).unwrap();
        let found = client
            .shard_groups_by_time_range("db0", "autogen", t, t)
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_retention_policy_validation() {
        let client = client_with_db("db0");
        let spec = RetentionPolicySpec {
            name: "short".to_string(),
            duration: Some(Duration::from_secs(60)),
            ..Default::default()
        };
        assert!(matches!(
            client.create_retention_policy("db0", &spec, false),
            Err(MetaError::RetentionPolicyDurationTooLow(_))
        ));

        let spec = RetentionPolicySpec {
            name: "week".to_string(),
            duration: Some(Duration::from_secs(7 * 24 * 3600)),
            replica_n: Some(2),
            ..Default::default()
        };
        client.create_retention_policy("db0", &spec, true).unwrap();
        assert_eq!(client.database("db0").unwrap().default_retention_policy, "week");
    }

    #[test]
    fn test_privileges() {
        let client = client_with_db("db0");
        client.create_user("bob", "pw", false).unwrap();
        assert_eq!(client.user_privilege("bob", "db0").unwrap(), Privilege::None);
        client.set_privilege("bob", "db0", Privilege::All).unwrap();
        assert_eq!(client.user_privilege("bob", "db0").unwrap(), Privilege::All);
        assert!(client.authenticate("bob", "pw").is_ok());
        assert!(client.authenticate("bob", "nope").is_err());

        client.drop_database("db0").unwrap();
        assert!(client.user_privileges("bob").unwrap().is_empty());
    }
}
