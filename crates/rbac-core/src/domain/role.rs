// ============================================================================
// RBAC Core - Role Entity
// File: crates/rbac-core/src/domain/role.rs
// Description: Role and its (menu, action) grants
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::status::Status;

/// Role entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub sequence: i32,
    pub memo: Option<String>,
    pub status: Status,

    #[serde(default)]
    pub role_menus: Vec<RoleMenu>,

    // Audit fields
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<Uuid>,
}

impl Role {
    pub fn from_form(form: &RoleForm, created_by: Option<Uuid>) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            name: form.name.clone(),
            sequence: form.sequence,
            memo: form.memo.clone(),
            status: form.status,
            role_menus: RoleMenu::from_forms(id, &form.role_menus),
            created_at: Utc::now(),
            created_by,
            modified_at: None,
            modified_by: None,
        }
    }

    /// Copy carrying the form's values; keeps identity and creation audit.
    pub fn apply_form(&self, form: &RoleForm, modified_by: Option<Uuid>) -> Self {
        Self {
            id: self.id,
            name: form.name.clone(),
            sequence: form.sequence,
            memo: form.memo.clone(),
            status: form.status,
            role_menus: RoleMenu::from_forms(self.id, &form.role_menus),
            created_at: self.created_at,
            created_by: self.created_by,
            modified_at: Some(Utc::now()),
            modified_by,
        }
    }
}

/// Grant of one action of one menu to a role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleMenu {
    pub id: Uuid,
    pub role_id: Uuid,
    pub menu_id: Uuid,
    pub action_id: Uuid,
}

impl RoleMenu {
    pub fn new(role_id: Uuid, menu_id: Uuid, action_id: Uuid) -> Self {
        Self { id: Uuid::new_v4(), role_id, menu_id, action_id }
    }

    fn from_forms(role_id: Uuid, forms: &[RoleMenuForm]) -> Vec<Self> {
        forms
            .iter()
            .map(|f| RoleMenu::new(role_id, f.menu_id, f.action_id))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoleForm {
    #[validate(length(min = 1, max = 100, message = "Role name must be between 1 and 100 characters"))]
    pub name: String,

    #[serde(default)]
    pub sequence: i32,

    #[validate(length(max = 1024))]
    pub memo: Option<String>,

    #[serde(default)]
    pub status: Status,

    #[serde(default)]
    pub role_menus: Vec<RoleMenuForm>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoleMenuForm {
    pub menu_id: Uuid,
    pub action_id: Uuid,
}
