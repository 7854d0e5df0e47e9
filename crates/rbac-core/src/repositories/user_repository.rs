//! User and user-role repository traits (ports)

use async_trait::async_trait;
use uuid::Uuid;

use rbac_shared::{PageResult, Pagination};

use crate::context::Ctx;
use crate::domain::{Status, User, UserRole};
use crate::error::DomainError;

#[derive(Debug, Clone, Default)]
pub struct UserQueryParam {
    pub pagination: Pagination,
    pub user_name: Option<String>,
    pub status: Option<Status>,
    /// Users bound to any of these roles.
    pub role_ids: Option<Vec<Uuid>>,
    /// Case-insensitive match on user name or real name.
    pub query_value: Option<String>,
}

impl UserQueryParam {
    pub fn holding_role(role_id: Uuid) -> Self {
        Self {
            pagination: Pagination::count_only(),
            role_ids: Some(vec![role_id]),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn query(&self, ctx: &Ctx, params: &UserQueryParam) -> Result<PageResult<User>, DomainError>;
    async fn get(&self, ctx: &Ctx, id: &Uuid) -> Result<Option<User>, DomainError>;
    async fn find_by_user_name(&self, ctx: &Ctx, user_name: &str) -> Result<Option<User>, DomainError>;
    async fn create(&self, ctx: &Ctx, user: &User) -> Result<(), DomainError>;
    async fn update(&self, ctx: &Ctx, user: &User) -> Result<(), DomainError>;
    async fn update_status(&self, ctx: &Ctx, id: &Uuid, status: Status) -> Result<(), DomainError>;
    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError>;
}

#[derive(Debug, Clone, Default)]
pub struct UserRoleQueryParam {
    pub user_id: Option<Uuid>,
    pub user_ids: Option<Vec<Uuid>>,
}

#[async_trait]
pub trait UserRoleRepository: Send + Sync {
    async fn query(&self, ctx: &Ctx, params: &UserRoleQueryParam) -> Result<Vec<UserRole>, DomainError>;
    async fn create(&self, ctx: &Ctx, user_role: &UserRole) -> Result<(), DomainError>;
    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError>;
    async fn delete_by_user_id(&self, ctx: &Ctx, user_id: &Uuid) -> Result<(), DomainError>;
}
