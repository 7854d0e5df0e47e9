//! PostgreSQL repository implementations

pub mod transaction;
pub mod menu_repo_impl;
pub mod menu_action_repo_impl;
pub mod role_repo_impl;
pub mod user_repo_impl;

use std::sync::Arc;

use sqlx::PgPool;

use rbac_core::repositories::Repositories;

pub use transaction::PgTransactionManager;
pub use menu_repo_impl::PgMenuRepository;
pub use menu_action_repo_impl::{PgMenuActionRepository, PgMenuActionResourceRepository};
pub use role_repo_impl::{PgRoleMenuRepository, PgRoleRepository};
pub use user_repo_impl::{PgUserRepository, PgUserRoleRepository};

/// Builds every repository port over one pool.
pub struct PgRepositories;

impl PgRepositories {
    pub fn build(pool: &PgPool) -> Repositories {
        Repositories {
            trans: Arc::new(PgTransactionManager::new(pool.clone())),
            menus: Arc::new(PgMenuRepository::new(pool.clone())),
            menu_actions: Arc::new(PgMenuActionRepository::new(pool.clone())),
            menu_action_resources: Arc::new(PgMenuActionResourceRepository::new(pool.clone())),
            roles: Arc::new(PgRoleRepository::new(pool.clone())),
            role_menus: Arc::new(PgRoleMenuRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            user_roles: Arc::new(PgUserRoleRepository::new(pool.clone())),
        }
    }
}
