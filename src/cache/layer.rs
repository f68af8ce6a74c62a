use std::sync::atomic::{AtomicBool, Ordering};

use crate::cache::RecencyCache;
use crate::types::internal::snapshot::{RoleSnapshot, UserSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub users: usize,
    pub roles: usize,
}

/// User and role snapshot caches keyed by id
///
/// Constructed once and shared through `AppData`; tests build their own.
/// The caches are not transaction-aware: a reader may observe the
/// pre-commit snapshot between a commit and the matching invalidation.
/// Read-through fills go through `fill_user` / `fill_role` with the
/// generation taken before the store read, so a snapshot loaded before an
/// invalidation is never stored after it.
/// After `destroy` every lookup misses and every insert is dropped.
pub struct CacheLayer {
    users: RecencyCache<i32, UserSnapshot>,
    roles: RecencyCache<i32, RoleSnapshot>,
    closed: AtomicBool,
}

impl CacheLayer {
    pub fn new(user_capacity: usize, role_capacity: usize) -> Self {
        Self {
            users: RecencyCache::new(user_capacity),
            roles: RecencyCache::new(role_capacity),
            closed: AtomicBool::new(false),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn get_user(&self, id: i32) -> Option<UserSnapshot> {
        if self.is_closed() {
            return None;
        }
        self.users.get(&id)
    }

    pub fn set_user(&self, snapshot: UserSnapshot) {
        if !self.is_closed() {
            self.users.set(snapshot.id(), snapshot);
        }
    }

    pub fn user_generation(&self) -> u64 {
        self.users.generation()
    }

    /// Store a snapshot read from the database after `generation` was taken
    pub fn fill_user(&self, snapshot: UserSnapshot, generation: u64) {
        if self.is_closed() {
            return;
        }
        let id = snapshot.id();
        if !self.users.fill(id, snapshot, generation) {
            tracing::debug!(user_id = id, "Skipped caching user loaded before an invalidation");
        }
    }

    pub fn invalidate_user(&self, id: i32) {
        if self.users.remove(&id).is_some() {
            tracing::debug!(user_id = id, "Invalidated cached user");
        }
    }

    pub fn invalidate_users(&self, ids: &[i32]) {
        for id in ids {
            self.invalidate_user(*id);
        }
    }

    /// Coarse invalidation used after user creation
    pub fn clear_users(&self) {
        self.users.clear();
        tracing::debug!("Cleared user cache");
    }

    pub fn get_role(&self, id: i32) -> Option<RoleSnapshot> {
        if self.is_closed() {
            return None;
        }
        self.roles.get(&id)
    }

    pub fn role_generation(&self) -> u64 {
        self.roles.generation()
    }

    pub fn fill_role(&self, snapshot: RoleSnapshot, generation: u64) {
        if self.is_closed() {
            return;
        }
        let id = snapshot.role.id;
        if !self.roles.fill(id, snapshot, generation) {
            tracing::debug!(role_id = id, "Skipped caching role loaded before an invalidation");
        }
    }

    pub fn invalidate_role(&self, id: i32) {
        if self.roles.remove(&id).is_some() {
            tracing::debug!(role_id = id, "Invalidated cached role");
        }
    }

    pub fn invalidate_roles(&self, ids: &[i32]) {
        for id in ids {
            self.invalidate_role(*id);
        }
    }

    pub fn invalidate_all(&self) {
        self.users.clear();
        self.roles.clear();
        tracing::debug!("Cleared all caches");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            users: self.users.len(),
            roles: self.roles.len(),
        }
    }

    /// End of lifecycle: drop every entry and refuse new ones
    pub fn destroy(&self) {
        self.closed.store(true, Ordering::Release);
        self.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::internal::snapshot::fixtures;

    fn role_snapshot(id: i32) -> RoleSnapshot {
        let grant = fixtures::grant(id, "auditor", &["user.read"]);
        RoleSnapshot {
            role: grant.role,
            permissions: grant.permissions,
            user_count: 0,
        }
    }

    #[test]
    fn test_user_capacity_bound() {
        let cache = CacheLayer::new(2, 1);
        for id in 1..=3 {
            cache.set_user(fixtures::snapshot(id, vec![]));
        }

        assert_eq!(cache.stats(), CacheStats { users: 2, roles: 0 });
        assert!(cache.get_user(1).is_none());
        assert!(cache.get_user(3).is_some());
    }

    #[test]
    fn test_invalidation_is_keyed() {
        let cache = CacheLayer::new(10, 10);
        cache.set_user(fixtures::snapshot(1, vec![]));
        cache.set_user(fixtures::snapshot(2, vec![]));
        cache.fill_role(role_snapshot(7), cache.role_generation());

        cache.invalidate_user(1);

        assert!(cache.get_user(1).is_none());
        assert!(cache.get_user(2).is_some());
        assert!(cache.get_role(7).is_some());

        cache.invalidate_all();
        assert_eq!(cache.stats(), CacheStats { users: 0, roles: 0 });
    }

    #[test]
    fn test_destroyed_layer_ignores_inserts() {
        let cache = CacheLayer::new(10, 10);
        cache.set_user(fixtures::snapshot(1, vec![]));

        cache.destroy();
        cache.set_user(fixtures::snapshot(2, vec![]));

        assert!(cache.get_user(1).is_none());
        assert!(cache.get_user(2).is_none());
        assert_eq!(cache.stats().users, 0);
    }

    #[test]
    fn test_fill_loses_to_concurrent_invalidation() {
        let cache = CacheLayer::new(10, 10);
        let users_before = cache.user_generation();
        let roles_before = cache.role_generation();

        // A writer commits and invalidates while the reader is loading
        cache.invalidate_user(1);
        cache.invalidate_roles(&[7]);

        cache.fill_user(fixtures::snapshot(1, vec![]), users_before);
        cache.fill_role(role_snapshot(7), roles_before);
        assert!(cache.get_user(1).is_none());
        assert!(cache.get_role(7).is_none());

        cache.fill_user(fixtures::snapshot(1, vec![]), cache.user_generation());
        cache.fill_role(role_snapshot(7), cache.role_generation());
        assert!(cache.get_user(1).is_some());
        assert!(cache.get_role(7).is_some());
    }
}
