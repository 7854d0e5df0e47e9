//! # RBAC Core - Domain Module
//!
//! Entities of the authorization graph: menus with their actions and
//! resources, roles with their menu grants, users with their role bindings.

pub mod status;
pub mod menu;
pub mod menu_action;
pub mod role;
pub mod user;

// Re-export all entities and enums
pub use status::{ShowStatus, Status};
pub use menu::{Menu, MenuForm, MenuSeed, MenuTree};
pub use menu_action::{MenuAction, MenuActionForm, MenuActionResource, MenuActionResourceForm};
pub use role::{Role, RoleForm, RoleMenu, RoleMenuForm};
pub use user::{User, UserForm, UserRole};
