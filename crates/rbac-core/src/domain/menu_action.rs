// ============================================================================
// RBAC Core - Menu Action & Resource Entities
// File: crates/rbac-core/src/domain/menu_action.rs
// Description: Operations exposed by a menu and the API endpoints they cover
// ============================================================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Named operation on a menu (e.g. "add", "edit"). `code` is unique per menu
/// and identifies the action across updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuAction {
    pub id: Uuid,
    pub menu_id: Uuid,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub resources: Vec<MenuActionResource>,
}

impl MenuAction {
    /// Builds a new action with fresh ids for itself and its resources.
    pub fn from_form(menu_id: Uuid, form: &MenuActionForm) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            menu_id,
            code: form.code.clone(),
            name: form.name.clone(),
            resources: form
                .resources
                .iter()
                .map(|r| MenuActionResource::from_form(id, r))
                .collect(),
        }
    }
}

/// Endpoint guarded by an action: an HTTP method and a path pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuActionResource {
    pub id: Uuid,
    pub action_id: Uuid,
    pub method: String,
    pub path: String,
}

impl MenuActionResource {
    pub fn from_form(action_id: Uuid, form: &MenuActionResourceForm) -> Self {
        Self {
            id: Uuid::new_v4(),
            action_id,
            method: form.method.trim().to_uppercase(),
            path: form.path.trim().to_string(),
        }
    }

    /// Rows with an empty method or path never become policy rules.
    pub fn is_blank(&self) -> bool {
        self.method.is_empty() || self.path.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MenuActionForm {
    #[validate(length(min = 1, max = 100, message = "Action code must be between 1 and 100 characters"))]
    pub code: String,

    #[validate(length(min = 1, max = 100, message = "Action name must be between 1 and 100 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(nested)]
    pub resources: Vec<MenuActionResourceForm>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MenuActionResourceForm {
    #[validate(length(max = 50))]
    pub method: String,

    #[validate(length(max = 255))]
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_form_links_resources_to_action() {
        let menu_id = Uuid::new_v4();
        let form = MenuActionForm {
            code: "edit".into(),
            name: "Edit".into(),
            resources: vec![MenuActionResourceForm { method: " put".into(), path: "/api/v1/menus/:id ".into() }],
        };

        let action = MenuAction::from_form(menu_id, &form);
        assert_eq!(action.menu_id, menu_id);
        assert_eq!(action.resources.len(), 1);
        assert_eq!(action.resources[0].action_id, action.id);
        assert_eq!(action.resources[0].method, "PUT");
        assert_eq!(action.resources[0].path, "/api/v1/menus/:id");
    }

    #[test]
    fn test_blank_resource() {
        let res = MenuActionResource {
            id: Uuid::new_v4(),
            action_id: Uuid::new_v4(),
            method: "GET".into(),
            path: String::new(),
        };
        assert!(res.is_blank());
    }
}
