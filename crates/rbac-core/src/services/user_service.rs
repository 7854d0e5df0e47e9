// ============================================================================
// RBAC Core - User Service
// File: crates/rbac-core/src/services/user_service.rs
// Description: User lifecycle, password hashing and role binding sync
// ============================================================================

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use rbac_security::PasswordService;
use rbac_shared::PageResult;

use super::diff::{diff, distinct};
use crate::context::Ctx;
use crate::domain::{Status, User, UserForm, UserRole};
use crate::error::DomainError;
use crate::policy::PolicyReloadQueue;
use crate::repositories::{
    exec_trans, exec_trans_with_lock, Repositories, TransactionManager, UserQueryParam,
    UserRepository, UserRoleQueryParam, UserRoleRepository,
};

/// User service
pub struct UserService {
    trans: Arc<dyn TransactionManager>,
    user_repo: Arc<dyn UserRepository>,
    user_role_repo: Arc<dyn UserRoleRepository>,
    root_user_name: String,
    reload_queue: PolicyReloadQueue,
}

impl UserService {
    pub fn new(repos: &Repositories, root_user_name: String, reload_queue: PolicyReloadQueue) -> Self {
        Self {
            trans: repos.trans.clone(),
            user_repo: repos.users.clone(),
            user_role_repo: repos.user_roles.clone(),
            root_user_name,
            reload_queue,
        }
    }

    pub async fn query(&self, ctx: &Ctx, params: &UserQueryParam) -> Result<PageResult<User>, DomainError> {
        self.user_repo.query(ctx, params).await
    }

    /// User with its role bindings.
    pub async fn get(&self, ctx: &Ctx, id: &Uuid) -> Result<User, DomainError> {
        let mut user = self
            .user_repo
            .get(ctx, id)
            .await?
            .ok_or(DomainError::UserNotFound(*id))?;
        user.user_roles = self.load_user_roles(ctx, id).await?;
        Ok(user)
    }

    /// Create a user with its role bindings
    pub async fn create(&self, ctx: &Ctx, form: &UserForm) -> Result<User, DomainError> {
        info!("Creating user: {}", form.user_name);

        // 1. Validate input and name
        form.validate()?;
        self.check_user_name(ctx, &form.user_name).await?;

        // 2. Hash password
        let password = form
            .new_password()
            .ok_or_else(|| DomainError::ValidationError("Password is required".into()))?;
        let password_hash = PasswordService::hash(password)?;

        // 3. Build entity; bindings get fresh ids, one per role
        let mut user = User::from_form(form, password_hash, ctx.user_id());
        user.user_roles = distinct(&user.user_roles);

        // 4. Persist user and bindings together
        exec_trans(self.trans.as_ref(), ctx, |tx| {
            let user = &user;
            async move {
                for binding in &user.user_roles {
                    self.user_role_repo.create(&tx, binding).await?;
                }
                self.user_repo.create(&tx, user).await
            }
        })
        .await?;

        // 5. Bindings feed grouping rules
        self.reload_queue.signal(ctx);

        info!("User created: {} ({})", user.user_name, user.id);
        Ok(user)
    }

    /// Update a user and apply the minimal binding changes.
    /// An empty password keeps the stored hash.
    pub async fn update(&self, ctx: &Ctx, id: &Uuid, form: &UserForm) -> Result<(), DomainError> {
        info!("Updating user: {}", id);

        // 1. Validate input
        form.validate()?;

        // 2. Load current state
        let old = self
            .user_repo
            .get(ctx, id)
            .await?
            .ok_or(DomainError::UserNotFound(*id))?;

        // 3. Name checks only when it changes
        if old.user_name != form.user_name {
            self.check_user_name(ctx, &form.user_name).await?;
        }

        // 4. Re-hash only when a new password was supplied
        let password_hash = match form.new_password() {
            Some(password) => PasswordService::hash(password)?,
            None => old.password.clone(),
        };

        let user = old.apply_form(form, password_hash, ctx.user_id());

        // 5. Diff bindings against the locked stored set and write the delta
        let (added, removed) = exec_trans_with_lock(self.trans.as_ref(), ctx, |tx| {
            let user = &user;
            async move {
                self.user_repo
                    .get(&tx, &user.id)
                    .await?
                    .ok_or(DomainError::UserNotFound(user.id))?;
                let stored = self.load_user_roles(&tx, &user.id).await?;
                let changes = diff(&stored, &user.user_roles);

                for binding in &changes.add {
                    self.user_role_repo.create(&tx, binding).await?;
                }
                for binding in &changes.delete {
                    self.user_role_repo.delete(&tx, &binding.id).await?;
                }

                self.user_repo.update(&tx, user).await?;
                Ok((changes.add.len(), changes.delete.len()))
            }
        })
        .await?;

        self.reload_queue.signal(ctx);

        info!("User updated: {} ({} roles added, {} removed)", id, added, removed);
        Ok(())
    }

    /// Delete a user and its role bindings
    pub async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError> {
        info!("Deleting user: {}", id);

        if self.user_repo.get(ctx, id).await?.is_none() {
            return Err(DomainError::UserNotFound(*id));
        }

        exec_trans(self.trans.as_ref(), ctx, |tx| async move {
            self.user_role_repo.delete_by_user_id(&tx, id).await?;
            self.user_repo.delete(&tx, id).await
        })
        .await?;

        self.reload_queue.signal(ctx);

        info!("User deleted: {}", id);
        Ok(())
    }

    pub async fn update_status(&self, ctx: &Ctx, id: &Uuid, status: Status) -> Result<(), DomainError> {
        if self.user_repo.get(ctx, id).await?.is_none() {
            return Err(DomainError::UserNotFound(*id));
        }

        self.user_repo.update_status(ctx, id, status).await?;
        self.reload_queue.signal(ctx);

        info!("User {} status set to {}", id, status.as_str());
        Ok(())
    }

    /// Rejects the reserved root name and names already taken.
    async fn check_user_name(&self, ctx: &Ctx, user_name: &str) -> Result<(), DomainError> {
        if user_name == self.root_user_name {
            warn!("User name is reserved: {}", user_name);
            return Err(DomainError::ReservedUserName(user_name.to_string()));
        }
        if self.user_repo.find_by_user_name(ctx, user_name).await?.is_some() {
            warn!("User name already exists: {}", user_name);
            return Err(DomainError::UserNameAlreadyExists(user_name.to_string()));
        }
        Ok(())
    }

    async fn load_user_roles(&self, ctx: &Ctx, user_id: &Uuid) -> Result<Vec<UserRole>, DomainError> {
        self.user_role_repo
            .query(ctx, &UserRoleQueryParam { user_id: Some(*user_id), ..Default::default() })
            .await
    }
}
