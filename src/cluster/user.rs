//! User identity and per-database access control.
//!
//! Users are either cluster admins (implicit read/write on everything) or
//! database users whose access is decided by matcher lists. Password
//! verification is bcrypt, with a shared cache of last-verified plaintexts
//! so hot paths skip the hash. The cache is injected rather than global so
//! coordinators stay testable.

use crate::core::error::{StrataError, StrataResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bcrypt cost used for all password hashes.
const BCRYPT_COST: u32 = 10;

/// A series-name matcher: literal equality or full-string regex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Matcher {
    pub is_regex: bool,
    pub name: String,
}

impl Matcher {
    /// Literal matcher.
    pub fn literal(name: impl Into<String>) -> Self {
        Self {
            is_regex: false,
            name: name.into(),
        }
    }

    /// Regex matcher.
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            is_regex: true,
            name: pattern.into(),
        }
    }

    /// Test a series name. Regex matchers match the full string; a pattern
    /// that fails to compile matches nothing.
    pub fn matches(&self, name: &str) -> bool {
        if self.is_regex {
            return regex::Regex::new(&format!("^(?:{})$", self.name))
                .map(|re| re.is_match(name))
                .unwrap_or(false);
        }
        self.name == name
    }
}

/// Shared cache of last successfully verified plaintext passwords, keyed
/// by each user's cache key. Entries are invalidated on password change.
#[derive(Debug, Default)]
pub struct PasswordCache {
    entries: RwLock<HashMap<String, String>>,
}

impl PasswordCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, cache_key: &str) -> Option<String> {
        self.entries.read().get(cache_key).cloned()
    }

    fn set(&self, cache_key: &str, password: &str) {
        self.entries
            .write()
            .insert(cache_key.to_string(), password.to_string());
    }

    fn invalidate(&self, cache_key: &str) {
        self.entries.write().remove(cache_key);
    }
}

/// Database-scoped permissions for a non-admin user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbPermissions {
    pub db: String,
    pub write_to: Vec<Matcher>,
    pub read_from: Vec<Matcher>,
    pub is_admin: bool,
}

/// User variant: cluster admin or database user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UserRole {
    ClusterAdmin,
    Db(DbPermissions),
}

/// A user identity with its password hash and role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    name: String,
    hash: String,
    is_deleted: bool,
    cache_key: String,
    role: UserRole,
}

impl UserAccount {
    /// Create a cluster admin.
    pub fn cluster_admin(
        name: impl Into<String>,
        hash: impl Into<String>,
        cache_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            hash: hash.into(),
            is_deleted: false,
            cache_key: cache_key.into(),
            role: UserRole::ClusterAdmin,
        }
    }

    /// Create a database user.
    pub fn db_user(
        name: impl Into<String>,
        hash: impl Into<String>,
        cache_key: impl Into<String>,
        permissions: DbPermissions,
    ) -> Self {
        Self {
            name: name.into(),
            hash: hash.into(),
            is_deleted: false,
            cache_key: cache_key.into(),
            role: UserRole::Db(permissions),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    pub fn mark_deleted(&mut self) {
        self.is_deleted = true;
    }

    pub fn is_cluster_admin(&self) -> bool {
        matches!(self.role, UserRole::ClusterAdmin)
    }

    /// The user's database, or the empty string for cluster admins.
    pub fn db(&self) -> &str {
        match &self.role {
            UserRole::ClusterAdmin => "",
            UserRole::Db(permissions) => &permissions.db,
        }
    }

    /// True for a database user administering exactly `db`.
    pub fn is_db_admin(&self, db: &str) -> bool {
        match &self.role {
            UserRole::ClusterAdmin => false,
            UserRole::Db(permissions) => permissions.is_admin && permissions.db == db,
        }
    }

    /// True when any write matcher accepts `name`. Cluster admins may
    /// write everywhere.
    pub fn has_write_access(&self, name: &str) -> bool {
        match &self.role {
            UserRole::ClusterAdmin => true,
            UserRole::Db(permissions) => permissions.write_to.iter().any(|m| m.matches(name)),
        }
    }

    /// True when any read matcher accepts `name`. Cluster admins may read
    /// everywhere.
    pub fn has_read_access(&self, name: &str) -> bool {
        match &self.role {
            UserRole::ClusterAdmin => true,
            UserRole::Db(permissions) => permissions.read_from.iter().any(|m| m.matches(name)),
        }
    }

    /// Verify a plaintext password, consulting `cache` first. On a cache
    /// miss the bcrypt comparison runs and, if it succeeds, the plaintext
    /// is cached under this user's cache key.
    pub fn is_valid_password(&self, cache: &PasswordCache, password: &str) -> bool {
        if let Some(cached) = cache.get(&self.cache_key) {
            return password == cached;
        }
        let is_valid = bcrypt::verify(password, &self.hash).unwrap_or(false);
        if is_valid {
            cache.set(&self.cache_key, password);
        }
        is_valid
    }

    /// Replace the stored hash and drop any cached verification.
    pub fn change_password(&mut self, cache: &PasswordCache, hash: impl Into<String>) {
        self.hash = hash.into();
        cache.invalidate(&self.cache_key);
    }
}

/// Hash a plaintext password with the crate-wide bcrypt cost.
pub fn hash_password(password: &str) -> StrataResult<String> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| StrataError::PasswordHash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_user(write_to: Vec<Matcher>, read_from: Vec<Matcher>) -> UserAccount {
        UserAccount::db_user(
            "paul",
            "",
            "paul-key",
            DbPermissions {
                db: "metrics".to_string(),
                write_to,
                read_from,
                is_admin: false,
            },
        )
    }

    #[test]
    fn literal_matcher() {
        let m = Matcher::literal("cpu");
        assert!(m.matches("cpu"));
        assert!(!m.matches("cpu.load"));
    }

    #[test]
    fn regex_matcher_is_full_string() {
        let m = Matcher::regex("cpu\\..*");
        assert!(m.matches("cpu.load"));
        assert!(!m.matches("system.cpu.load"));
    }

    #[test]
    fn invalid_regex_matches_nothing() {
        let m = Matcher::regex("(unclosed");
        assert!(!m.matches("anything"));
    }

    #[test]
    fn cluster_admin_has_all_access() {
        let admin = UserAccount::cluster_admin("root", "", "root-key");
        assert!(admin.is_cluster_admin());
        assert!(admin.has_read_access("anything"));
        assert!(admin.has_write_access("anything"));
        assert_eq!(admin.db(), "");
        assert!(!admin.is_db_admin("metrics"));
    }

    #[test]
    fn db_user_access_follows_matchers() {
        let user = db_user(
            vec![Matcher::literal("cpu")],
            vec![Matcher::regex("disk\\..*")],
        );
        assert!(!user.is_cluster_admin());
        assert!(user.has_write_access("cpu"));
        assert!(!user.has_write_access("disk.free"));
        assert!(user.has_read_access("disk.free"));
        assert!(!user.has_read_access("cpu"));
    }

    #[test]
    fn db_admin_is_scoped_to_its_db() {
        let user = UserAccount::db_user(
            "ops",
            "",
            "ops-key",
            DbPermissions {
                db: "metrics".to_string(),
                write_to: Vec::new(),
                read_from: Vec::new(),
                is_admin: true,
            },
        );
        assert!(user.is_db_admin("metrics"));
        assert!(!user.is_db_admin("logs"));
    }

    #[test]
    fn password_verification_populates_cache() {
        let cache = PasswordCache::new();
        let hash = hash_password("sekrit").unwrap();
        let user = UserAccount::cluster_admin("root", hash, "root-key");

        assert!(user.is_valid_password(&cache, "sekrit"));
        // Cached now: a wrong password must still fail via the cache path.
        assert!(!user.is_valid_password(&cache, "wrong"));
        assert!(user.is_valid_password(&cache, "sekrit"));
    }

    #[test]
    fn change_password_invalidates_cache() {
        let cache = PasswordCache::new();
        let old_hash = hash_password("old-pass").unwrap();
        let mut user = UserAccount::cluster_admin("root", old_hash, "root-key");
        assert!(user.is_valid_password(&cache, "old-pass"));

        let new_hash = hash_password("new-pass").unwrap();
        user.change_password(&cache, new_hash);

        // The stale plaintext must not be accepted from the cache; the next
        // check runs a real bcrypt comparison against the new hash.
        assert!(!user.is_valid_password(&cache, "old-pass"));
        assert!(user.is_valid_password(&cache, "new-pass"));
    }
}
