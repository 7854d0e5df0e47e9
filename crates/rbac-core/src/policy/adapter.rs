// ============================================================================
// RBAC Core - Policy Adapter
// File: crates/rbac-core/src/policy/adapter.rs
// Description: Builds the enforcer rule set from the relational model
// ============================================================================

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::enforcer::PolicySet;
use crate::context::Ctx;
use crate::domain::{MenuActionResource, Status};
use crate::error::DomainError;
use crate::repositories::{
    MenuActionResourceQueryParam, MenuQueryParam, Repositories, RoleMenuQueryParam,
    RoleQueryParam, UserQueryParam, UserRoleQueryParam,
};

/// Source of a complete rule set.
#[async_trait]
pub trait PolicyAdapter: Send + Sync {
    async fn load_policy(&self, ctx: &Ctx) -> Result<PolicySet, DomainError>;
}

/// Reads the rule set straight from the repositories.
///
/// Permission rules come from enabled roles through their grants on enabled
/// menus: every non-blank resource of a granted action becomes one
/// `(role, path, method)` rule, deduplicated per role. Groupings come from
/// the role bindings of enabled users.
pub struct RepositoryPolicyAdapter {
    repos: Repositories,
}

impl RepositoryPolicyAdapter {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    async fn load_permissions(&self, ctx: &Ctx, set: &mut PolicySet) -> Result<(), DomainError> {
        let roles = self
            .repos
            .roles
            .query(ctx, &RoleQueryParam { status: Some(Status::Enabled), ..Default::default() })
            .await?
            .data;
        if roles.is_empty() {
            return Ok(());
        }

        let enabled_menus: HashSet<Uuid> = self
            .repos
            .menus
            .query(ctx, &MenuQueryParam { status: Some(Status::Enabled), ..Default::default() })
            .await?
            .data
            .into_iter()
            .map(|m| m.id)
            .collect();

        let role_ids: Vec<Uuid> = roles.iter().map(|r| r.id).collect();
        let grants = self
            .repos
            .role_menus
            .query(ctx, &RoleMenuQueryParam { role_ids: Some(role_ids), ..Default::default() })
            .await?;

        let mut resources_by_action: HashMap<Uuid, Vec<MenuActionResource>> = HashMap::new();
        for res in self
            .repos
            .menu_action_resources
            .query(ctx, &MenuActionResourceQueryParam::default())
            .await?
        {
            resources_by_action.entry(res.action_id).or_default().push(res);
        }

        for grant in grants.iter().filter(|g| enabled_menus.contains(&g.menu_id)) {
            let Some(resources) = resources_by_action.get(&grant.action_id) else {
                continue;
            };
            for res in resources.iter().filter(|r| !r.is_blank()) {
                set.add_permission(grant.role_id, &res.path, &res.method);
            }
        }
        Ok(())
    }

    async fn load_groupings(&self, ctx: &Ctx, set: &mut PolicySet) -> Result<(), DomainError> {
        let users = self
            .repos
            .users
            .query(ctx, &UserQueryParam { status: Some(Status::Enabled), ..Default::default() })
            .await?
            .data;
        if users.is_empty() {
            return Ok(());
        }

        let user_ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
        let bindings = self
            .repos
            .user_roles
            .query(ctx, &UserRoleQueryParam { user_ids: Some(user_ids), ..Default::default() })
            .await?;

        for binding in bindings {
            set.add_grouping(binding.user_id, binding.role_id);
        }
        Ok(())
    }
}

#[async_trait]
impl PolicyAdapter for RepositoryPolicyAdapter {
    async fn load_policy(&self, ctx: &Ctx) -> Result<PolicySet, DomainError> {
        let mut set = PolicySet::new();
        self.load_permissions(ctx, &mut set).await?;
        self.load_groupings(ctx, &mut set).await?;

        debug!(trace_id = %ctx.trace_id(), "Policy rule set built from repositories");
        Ok(set)
    }
}
