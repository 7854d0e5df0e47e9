// ============================================================================
// RBAC Core - Menu Entity
// File: crates/rbac-core/src/domain/menu.rs
// Description: Navigation tree node with a materialized ancestor path
// ============================================================================

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use rbac_shared::utils::join_parent_path;

use super::menu_action::{MenuAction, MenuActionForm};
use super::status::{ShowStatus, Status};

/// Menu entity
///
/// `parent_path` holds the ids of all ancestors joined with `/`, root first,
/// and is empty for top-level menus. It is always derived from `parent_id`
/// and never accepted from callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub id: Uuid,
    pub name: String,
    pub sequence: i32,
    pub icon: Option<String>,
    pub router: Option<String>,
    pub parent_id: Option<Uuid>,
    pub parent_path: String,
    pub show_status: ShowStatus,
    pub status: Status,
    pub memo: Option<String>,

    #[serde(default)]
    pub actions: Vec<MenuAction>,

    // Audit fields
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<Uuid>,
}

impl Menu {
    pub fn from_form(form: &MenuForm, parent_path: String, created_by: Option<Uuid>) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            name: form.name.clone(),
            sequence: form.sequence,
            icon: form.icon.clone(),
            router: form.router.clone(),
            parent_id: form.parent_id,
            parent_path,
            show_status: form.show_status,
            status: form.status,
            memo: form.memo.clone(),
            actions: form.actions.iter().map(|a| MenuAction::from_form(id, a)).collect(),
            created_at: Utc::now(),
            created_by,
            modified_at: None,
            modified_by: None,
        }
    }

    /// Copy of this menu carrying the form's values. Identity and creation
    /// audit fields are kept from `self`.
    pub fn apply_form(&self, form: &MenuForm, parent_path: String, modified_by: Option<Uuid>) -> Self {
        Self {
            id: self.id,
            name: form.name.clone(),
            sequence: form.sequence,
            icon: form.icon.clone(),
            router: form.router.clone(),
            parent_id: form.parent_id,
            parent_path,
            show_status: form.show_status,
            status: form.status,
            memo: form.memo.clone(),
            actions: form.actions.iter().map(|a| MenuAction::from_form(self.id, a)).collect(),
            created_at: self.created_at,
            created_by: self.created_by,
            modified_at: Some(Utc::now()),
            modified_by,
        }
    }

    /// Path stored on this menu's children.
    pub fn path(&self) -> String {
        join_parent_path(&self.parent_path, &self.id)
    }
}

/// Caller-supplied menu values for create and update
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MenuForm {
    #[validate(length(min = 1, max = 100, message = "Menu name must be between 1 and 100 characters"))]
    pub name: String,

    #[serde(default)]
    pub sequence: i32,

    #[validate(length(max = 255))]
    pub icon: Option<String>,

    #[validate(length(max = 255))]
    pub router: Option<String>,

    pub parent_id: Option<Uuid>,

    #[serde(default)]
    pub show_status: ShowStatus,

    #[serde(default)]
    pub status: Status,

    #[validate(length(max = 1024))]
    pub memo: Option<String>,

    #[serde(default)]
    #[validate(nested)]
    pub actions: Vec<MenuActionForm>,
}

impl MenuForm {
    /// First action code that appears more than once, if any.
    pub fn duplicate_action_code(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.actions
            .iter()
            .map(|a| a.code.as_str())
            .find(|code| !seen.insert(*code))
    }
}

/// Node of the JSON menu seed file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuSeed {
    pub name: String,
    #[serde(default)]
    pub sequence: i32,
    pub icon: Option<String>,
    pub router: Option<String>,
    #[serde(default)]
    pub show_status: ShowStatus,
    #[serde(default)]
    pub status: Status,
    pub memo: Option<String>,
    #[serde(default)]
    pub actions: Vec<MenuActionForm>,
    #[serde(default)]
    pub children: Vec<MenuSeed>,
}

impl MenuSeed {
    pub fn to_form(&self, parent_id: Option<Uuid>) -> MenuForm {
        MenuForm {
            name: self.name.clone(),
            sequence: self.sequence,
            icon: self.icon.clone(),
            router: self.router.clone(),
            parent_id,
            show_status: self.show_status,
            status: self.status,
            memo: self.memo.clone(),
            actions: self.actions.clone(),
        }
    }

    /// Number of menus in this subtree, including the node itself.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(MenuSeed::count).sum::<usize>()
    }
}

/// Menu with its nested children, siblings ordered by descending sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuTree {
    #[serde(flatten)]
    pub menu: Menu,
    pub children: Vec<MenuTree>,
}

impl MenuTree {
    /// Nests a flat menu list. Menus whose parent is absent from the list
    /// become roots of the result.
    pub fn build(menus: Vec<Menu>) -> Vec<MenuTree> {
        let ids: HashSet<Uuid> = menus.iter().map(|m| m.id).collect();
        let mut children: HashMap<Uuid, Vec<Menu>> = HashMap::new();
        let mut roots = Vec::new();

        for menu in menus {
            match menu.parent_id {
                Some(parent_id) if ids.contains(&parent_id) => {
                    children.entry(parent_id).or_default().push(menu)
                }
                _ => roots.push(menu),
            }
        }

        Self::attach_all(roots, &mut children)
    }

    fn attach_all(menus: Vec<Menu>, children: &mut HashMap<Uuid, Vec<Menu>>) -> Vec<MenuTree> {
        let mut nodes: Vec<MenuTree> = menus
            .into_iter()
            .map(|menu| {
                let kids = children.remove(&menu.id).unwrap_or_default();
                MenuTree { children: Self::attach_all(kids, children), menu }
            })
            .collect();
        nodes.sort_by(|a, b| {
            b.menu
                .sequence
                .cmp(&a.menu.sequence)
                .then_with(|| a.menu.name.cmp(&b.menu.name))
        });
        nodes
    }

    /// Total number of menus in this subtree.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(MenuTree::len).sum::<usize>()
    }
}
