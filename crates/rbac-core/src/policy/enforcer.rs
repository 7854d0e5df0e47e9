// ============================================================================
// RBAC Core - Policy Enforcer
// File: crates/rbac-core/src/policy/enforcer.rs
// Description: Enforcer port and the in-memory rule set implementation
// ============================================================================

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::adapter::PolicyAdapter;
use super::matcher::{key_match, MethodMatcher};
use crate::context::Ctx;
use crate::error::DomainError;

/// Policy engine port.
///
/// `load_policy` rebuilds the whole rule set from storage. The other
/// mutators edit the live set in place and report whether it changed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PolicyEnforcer: Send + Sync {
    async fn load_policy(&self, ctx: &Ctx) -> Result<PolicyStats, DomainError>;
    fn add_permission_for_role(&self, role_id: Uuid, path: &str, method: &str) -> bool;
    fn remove_permissions_for_role(&self, role_id: Uuid) -> bool;
    fn add_role_for_user(&self, user_id: Uuid, role_id: Uuid) -> bool;
    fn remove_roles_for_user(&self, user_id: Uuid) -> bool;
    fn enforce(&self, subject: Uuid, path: &str, method: &str) -> bool;
}

/// Size of a loaded rule set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyStats {
    pub roles: usize,
    pub permissions: usize,
    pub groupings: usize,
}

#[derive(Debug, Clone)]
struct PermissionRule {
    path: String,
    method: MethodMatcher,
}

/// Permission rules (role -> path, method) and groupings (user -> role).
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    permissions: HashMap<Uuid, Vec<PermissionRule>>,
    groupings: HashMap<Uuid, BTreeSet<Uuid>>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false for blank values and for a rule the role already has.
    pub fn add_permission(&mut self, role_id: Uuid, path: &str, method: &str) -> bool {
        if path.is_empty() || method.is_empty() {
            return false;
        }
        let rules = self.permissions.entry(role_id).or_default();
        if rules.iter().any(|r| r.path == path && r.method.as_str() == method) {
            return false;
        }
        rules.push(PermissionRule { path: path.to_string(), method: MethodMatcher::new(method) });
        true
    }

    pub fn remove_permissions_for_role(&mut self, role_id: Uuid) -> bool {
        self.permissions.remove(&role_id).is_some()
    }

    pub fn add_grouping(&mut self, user_id: Uuid, role_id: Uuid) -> bool {
        self.groupings.entry(user_id).or_default().insert(role_id)
    }

    pub fn remove_groupings_for_user(&mut self, user_id: Uuid) -> bool {
        self.groupings.remove(&user_id).is_some()
    }

    pub fn roles_for_user(&self, user_id: Uuid) -> Vec<Uuid> {
        self.groupings
            .get(&user_id)
            .map(|roles| roles.iter().copied().collect())
            .unwrap_or_default()
    }

    /// `(path, method)` pairs granted to the role, in insertion order.
    pub fn permissions_for_role(&self, role_id: Uuid) -> Vec<(String, String)> {
        self.permissions
            .get(&role_id)
            .map(|rules| {
                rules
                    .iter()
                    .map(|r| (r.path.clone(), r.method.as_str().to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A subject is allowed when it, or any role it is grouped into, holds
    /// a rule matching the request.
    pub fn enforce(&self, subject: Uuid, path: &str, method: &str) -> bool {
        let matches = |role_id: &Uuid| {
            self.permissions.get(role_id).is_some_and(|rules| {
                rules
                    .iter()
                    .any(|r| key_match(path, &r.path) && r.method.is_match(method))
            })
        };

        matches(&subject)
            || self
                .groupings
                .get(&subject)
                .is_some_and(|roles| roles.iter().any(matches))
    }

    pub fn stats(&self) -> PolicyStats {
        PolicyStats {
            roles: self.permissions.len(),
            permissions: self.permissions.values().map(Vec::len).sum(),
            groupings: self.groupings.values().map(BTreeSet::len).sum(),
        }
    }
}

/// Enforcer holding the rule set in memory.
///
/// A reload builds a complete new set before swapping it in, so readers
/// never observe a partially loaded policy.
pub struct MemoryEnforcer {
    adapter: Arc<dyn PolicyAdapter>,
    policy: RwLock<Arc<PolicySet>>,
    debug: bool,
}

impl MemoryEnforcer {
    pub fn new(adapter: Arc<dyn PolicyAdapter>) -> Self {
        Self {
            adapter,
            policy: RwLock::new(Arc::new(PolicySet::new())),
            debug: false,
        }
    }

    /// Log every enforcement decision at debug level.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Current rule set.
    pub fn snapshot(&self) -> Arc<PolicySet> {
        self.policy.read().clone()
    }

    fn edit<R>(&self, f: impl FnOnce(&mut PolicySet) -> R) -> R {
        let mut guard = self.policy.write();
        f(Arc::make_mut(&mut guard))
    }
}

#[async_trait]
impl PolicyEnforcer for MemoryEnforcer {
    async fn load_policy(&self, ctx: &Ctx) -> Result<PolicyStats, DomainError> {
        let start = Instant::now();
        let set = self.adapter.load_policy(ctx).await?;
        let stats = set.stats();

        *self.policy.write() = Arc::new(set);

        info!(
            trace_id = %ctx.trace_id(),
            roles = stats.roles,
            permissions = stats.permissions,
            groupings = stats.groupings,
            "Policy loaded in {:?}",
            start.elapsed()
        );
        Ok(stats)
    }

    fn add_permission_for_role(&self, role_id: Uuid, path: &str, method: &str) -> bool {
        self.edit(|set| set.add_permission(role_id, path, method))
    }

    fn remove_permissions_for_role(&self, role_id: Uuid) -> bool {
        self.edit(|set| set.remove_permissions_for_role(role_id))
    }

    fn add_role_for_user(&self, user_id: Uuid, role_id: Uuid) -> bool {
        self.edit(|set| set.add_grouping(user_id, role_id))
    }

    fn remove_roles_for_user(&self, user_id: Uuid) -> bool {
        self.edit(|set| set.remove_groupings_for_user(user_id))
    }

    fn enforce(&self, subject: Uuid, path: &str, method: &str) -> bool {
        let allowed = self.policy.read().enforce(subject, path, method);
        if self.debug {
            debug!(%subject, path, method, allowed, "Policy decision");
        }
        allowed
    }
}
