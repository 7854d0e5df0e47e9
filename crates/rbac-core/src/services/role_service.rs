// ============================================================================
// RBAC Core - Role Service
// File: crates/rbac-core/src/services/role_service.rs
// Description: Role lifecycle and (menu, action) grant synchronization
// ============================================================================

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use rbac_shared::{PageResult, Pagination};

use super::diff::{diff, distinct};
use crate::context::Ctx;
use crate::domain::{Role, RoleForm, RoleMenu, Status};
use crate::error::DomainError;
use crate::policy::PolicyReloadQueue;
use crate::repositories::{
    exec_trans, exec_trans_with_lock, Repositories, RoleMenuQueryParam, RoleMenuRepository,
    RoleQueryParam, RoleRepository, TransactionManager, UserQueryParam, UserRepository,
};

/// Role service
pub struct RoleService {
    trans: Arc<dyn TransactionManager>,
    role_repo: Arc<dyn RoleRepository>,
    role_menu_repo: Arc<dyn RoleMenuRepository>,
    user_repo: Arc<dyn UserRepository>,
    reload_queue: PolicyReloadQueue,
}

impl RoleService {
    pub fn new(repos: &Repositories, reload_queue: PolicyReloadQueue) -> Self {
        Self {
            trans: repos.trans.clone(),
            role_repo: repos.roles.clone(),
            role_menu_repo: repos.role_menus.clone(),
            user_repo: repos.users.clone(),
            reload_queue,
        }
    }

    pub async fn query(&self, ctx: &Ctx, params: &RoleQueryParam) -> Result<PageResult<Role>, DomainError> {
        self.role_repo.query(ctx, params).await
    }

    /// Roles bound to a user
    pub async fn query_by_user(&self, ctx: &Ctx, user_id: Uuid) -> Result<Vec<Role>, DomainError> {
        let params = RoleQueryParam { user_id: Some(user_id), ..Default::default() };
        Ok(self.role_repo.query(ctx, &params).await?.data)
    }

    /// Role with its grants.
    pub async fn get(&self, ctx: &Ctx, id: &Uuid) -> Result<Role, DomainError> {
        let mut role = self
            .role_repo
            .get(ctx, id)
            .await?
            .ok_or(DomainError::RoleNotFound(*id))?;
        role.role_menus = self.load_role_menus(ctx, id).await?;
        Ok(role)
    }

    /// Create a role with its grants
    pub async fn create(&self, ctx: &Ctx, form: &RoleForm) -> Result<Role, DomainError> {
        info!("Creating role: {}", form.name);

        // 1. Validate input and name uniqueness
        form.validate()?;
        self.check_name(ctx, &form.name).await?;

        // 2. Build entity; grants get fresh ids, one per (menu, action)
        let mut role = Role::from_form(form, ctx.user_id());
        role.role_menus = distinct(&role.role_menus);

        // 3. Persist role and grants together
        exec_trans(self.trans.as_ref(), ctx, |tx| {
            let role = &role;
            async move {
                for grant in &role.role_menus {
                    self.role_menu_repo.create(&tx, grant).await?;
                }
                self.role_repo.create(&tx, role).await
            }
        })
        .await?;

        // 4. Grants feed permission rules
        self.reload_queue.signal(ctx);

        info!("Role created: {} ({})", role.name, role.id);
        Ok(role)
    }

    /// Update a role and apply the minimal grant changes
    pub async fn update(&self, ctx: &Ctx, id: &Uuid, form: &RoleForm) -> Result<(), DomainError> {
        info!("Updating role: {}", id);

        // 1. Validate input
        form.validate()?;

        // 2. Load current state
        let old = self
            .role_repo
            .get(ctx, id)
            .await?
            .ok_or(DomainError::RoleNotFound(*id))?;

        // 3. Name uniqueness only matters when it changes
        if old.name != form.name {
            self.check_name(ctx, &form.name).await?;
        }

        let role = old.apply_form(form, ctx.user_id());

        // 4. Diff grants against the locked stored set and write the delta
        let (added, removed) = exec_trans_with_lock(self.trans.as_ref(), ctx, |tx| {
            let role = &role;
            async move {
                self.role_repo
                    .get(&tx, &role.id)
                    .await?
                    .ok_or(DomainError::RoleNotFound(role.id))?;
                let stored = self.load_role_menus(&tx, &role.id).await?;
                let changes = diff(&stored, &role.role_menus);

                for grant in &changes.add {
                    self.role_menu_repo.create(&tx, grant).await?;
                }
                for grant in &changes.delete {
                    self.role_menu_repo.delete(&tx, &grant.id).await?;
                }

                self.role_repo.update(&tx, role).await?;
                Ok((changes.add.len(), changes.delete.len()))
            }
        })
        .await?;

        self.reload_queue.signal(ctx);

        info!("Role updated: {} ({} grants added, {} removed)", id, added, removed);
        Ok(())
    }

    /// Delete a role no user is bound to
    pub async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError> {
        info!("Deleting role: {}", id);

        // the role row stays locked from the holder check to the delete
        exec_trans_with_lock(self.trans.as_ref(), ctx, |tx| async move {
            if self.role_repo.get(&tx, id).await?.is_none() {
                return Err(DomainError::RoleNotFound(*id));
            }

            let holders = self.user_repo.query(&tx, &UserQueryParam::holding_role(*id)).await?;
            if holders.total > 0 {
                warn!("Role delete rejected: {} is held by {} users", id, holders.total);
                return Err(DomainError::RoleInUse(*id));
            }

            self.role_menu_repo.delete_by_role_id(&tx, id).await?;
            self.role_repo.delete(&tx, id).await
        })
        .await?;

        self.reload_queue.signal(ctx);

        info!("Role deleted: {}", id);
        Ok(())
    }

    /// Enable or disable a role. Setting the current status is a no-op.
    pub async fn update_status(&self, ctx: &Ctx, id: &Uuid, status: Status) -> Result<(), DomainError> {
        let role = self
            .role_repo
            .get(ctx, id)
            .await?
            .ok_or(DomainError::RoleNotFound(*id))?;
        if role.status == status {
            return Ok(());
        }

        self.role_repo.update_status(ctx, id, status).await?;
        self.reload_queue.signal(ctx);

        info!("Role {} status set to {}", id, status.as_str());
        Ok(())
    }

    async fn check_name(&self, ctx: &Ctx, name: &str) -> Result<(), DomainError> {
        let params = RoleQueryParam {
            pagination: Pagination::count_only(),
            name: Some(name.to_string()),
            ..Default::default()
        };
        if self.role_repo.query(ctx, &params).await?.total > 0 {
            warn!("Role name already exists: {}", name);
            return Err(DomainError::RoleNameAlreadyExists(name.to_string()));
        }
        Ok(())
    }

    async fn load_role_menus(&self, ctx: &Ctx, role_id: &Uuid) -> Result<Vec<RoleMenu>, DomainError> {
        self.role_menu_repo
            .query(ctx, &RoleMenuQueryParam { role_id: Some(*role_id), ..Default::default() })
            .await
    }
}
