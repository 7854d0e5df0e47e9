//! Role and role-menu repository traits (ports)

use async_trait::async_trait;
use uuid::Uuid;

use rbac_shared::{PageResult, Pagination};

use crate::context::Ctx;
use crate::domain::{Role, RoleMenu, Status};
use crate::error::DomainError;

#[derive(Debug, Clone, Default)]
pub struct RoleQueryParam {
    pub pagination: Pagination,
    pub ids: Option<Vec<Uuid>>,
    pub name: Option<String>,
    pub status: Option<Status>,
    /// Roles bound to this user.
    pub user_id: Option<Uuid>,
    pub query_value: Option<String>,
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn query(&self, ctx: &Ctx, params: &RoleQueryParam) -> Result<PageResult<Role>, DomainError>;
    async fn get(&self, ctx: &Ctx, id: &Uuid) -> Result<Option<Role>, DomainError>;
    async fn create(&self, ctx: &Ctx, role: &Role) -> Result<(), DomainError>;
    async fn update(&self, ctx: &Ctx, role: &Role) -> Result<(), DomainError>;
    async fn update_status(&self, ctx: &Ctx, id: &Uuid, status: Status) -> Result<(), DomainError>;
    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError>;
}

#[derive(Debug, Clone, Default)]
pub struct RoleMenuQueryParam {
    pub role_id: Option<Uuid>,
    pub role_ids: Option<Vec<Uuid>>,
}

#[async_trait]
pub trait RoleMenuRepository: Send + Sync {
    async fn query(&self, ctx: &Ctx, params: &RoleMenuQueryParam) -> Result<Vec<RoleMenu>, DomainError>;
    async fn create(&self, ctx: &Ctx, role_menu: &RoleMenu) -> Result<(), DomainError>;
    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError>;
    async fn delete_by_role_id(&self, ctx: &Ctx, role_id: &Uuid) -> Result<(), DomainError>;
}
