//! Menu, menu action and action resource repository traits (ports)

use async_trait::async_trait;
use uuid::Uuid;

use rbac_shared::{PageResult, Pagination};

use crate::context::Ctx;
use crate::domain::{Menu, MenuAction, MenuActionResource, ShowStatus, Status};
use crate::error::DomainError;

/// Menu filters. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct MenuQueryParam {
    pub pagination: Pagination,
    pub ids: Option<Vec<Uuid>>,
    pub name: Option<String>,
    /// `Some(None)` selects top-level menus.
    pub parent_id: Option<Option<Uuid>>,
    /// Menus whose `parent_path` equals this prefix or lies below it.
    pub prefix_parent_path: Option<String>,
    pub status: Option<Status>,
    pub show_status: Option<ShowStatus>,
    /// Case-insensitive match on name or memo.
    pub query_value: Option<String>,
}

impl MenuQueryParam {
    pub fn siblings_named(parent_id: Option<Uuid>, name: &str) -> Self {
        Self {
            pagination: Pagination::count_only(),
            parent_id: Some(parent_id),
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn children_of(parent_id: Uuid) -> Self {
        Self {
            pagination: Pagination::count_only(),
            parent_id: Some(Some(parent_id)),
            ..Default::default()
        }
    }

    pub fn descendants_of(path: &str) -> Self {
        Self { prefix_parent_path: Some(path.to_string()), ..Default::default() }
    }
}

#[async_trait]
pub trait MenuRepository: Send + Sync {
    /// Ordered by sequence descending. With `only_count` set, `data` is empty.
    async fn query(&self, ctx: &Ctx, params: &MenuQueryParam) -> Result<PageResult<Menu>, DomainError>;
    async fn get(&self, ctx: &Ctx, id: &Uuid) -> Result<Option<Menu>, DomainError>;
    async fn create(&self, ctx: &Ctx, menu: &Menu) -> Result<(), DomainError>;
    async fn update(&self, ctx: &Ctx, menu: &Menu) -> Result<(), DomainError>;
    async fn update_parent_path(&self, ctx: &Ctx, id: &Uuid, parent_path: &str) -> Result<(), DomainError>;
    async fn update_status(&self, ctx: &Ctx, id: &Uuid, status: Status) -> Result<(), DomainError>;
    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError>;
}

#[derive(Debug, Clone, Default)]
pub struct MenuActionQueryParam {
    pub menu_id: Option<Uuid>,
    pub ids: Option<Vec<Uuid>>,
}

#[async_trait]
pub trait MenuActionRepository: Send + Sync {
    /// Actions come back without their resources.
    async fn query(&self, ctx: &Ctx, params: &MenuActionQueryParam) -> Result<Vec<MenuAction>, DomainError>;
    async fn create(&self, ctx: &Ctx, action: &MenuAction) -> Result<(), DomainError>;
    async fn update(&self, ctx: &Ctx, action: &MenuAction) -> Result<(), DomainError>;
    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError>;
    async fn delete_by_menu_id(&self, ctx: &Ctx, menu_id: &Uuid) -> Result<(), DomainError>;
}

#[derive(Debug, Clone, Default)]
pub struct MenuActionResourceQueryParam {
    /// Resources of all actions of this menu.
    pub menu_id: Option<Uuid>,
    pub action_ids: Option<Vec<Uuid>>,
}

#[async_trait]
pub trait MenuActionResourceRepository: Send + Sync {
    async fn query(
        &self,
        ctx: &Ctx,
        params: &MenuActionResourceQueryParam,
    ) -> Result<Vec<MenuActionResource>, DomainError>;
    async fn create(&self, ctx: &Ctx, resource: &MenuActionResource) -> Result<(), DomainError>;
    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError>;
    async fn delete_by_action_id(&self, ctx: &Ctx, action_id: &Uuid) -> Result<(), DomainError>;
    async fn delete_by_menu_id(&self, ctx: &Ctx, menu_id: &Uuid) -> Result<(), DomainError>;
}
