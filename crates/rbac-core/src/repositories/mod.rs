//! Repository traits (ports)

pub mod transaction;
pub mod menu_repository;
pub mod role_repository;
pub mod user_repository;

use std::sync::Arc;

pub use transaction::{exec_trans, exec_trans_with_lock, TransactionManager};
pub use menu_repository::{
    MenuActionQueryParam, MenuActionRepository, MenuActionResourceQueryParam,
    MenuActionResourceRepository, MenuQueryParam, MenuRepository,
};
pub use role_repository::{RoleMenuQueryParam, RoleMenuRepository, RoleQueryParam, RoleRepository};
pub use user_repository::{UserQueryParam, UserRepository, UserRoleQueryParam, UserRoleRepository};

/// Every port a storage backend provides, wired once at startup.
#[derive(Clone)]
pub struct Repositories {
    pub trans: Arc<dyn TransactionManager>,
    pub menus: Arc<dyn MenuRepository>,
    pub menu_actions: Arc<dyn MenuActionRepository>,
    pub menu_action_resources: Arc<dyn MenuActionResourceRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub role_menus: Arc<dyn RoleMenuRepository>,
    pub users: Arc<dyn UserRepository>,
    pub user_roles: Arc<dyn UserRoleRepository>,
}
