//! Domain services

pub mod diff;
pub mod menu_service;
pub mod role_service;
pub mod user_service;

pub use diff::{diff, diff_by, distinct, AssociationDiff, AssociationKey, Matched};
pub use menu_service::MenuService;
pub use role_service::RoleService;
pub use user_service::UserService;
