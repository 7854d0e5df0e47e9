// ============================================================================
// RBAC Core - Menu Service
// File: crates/rbac-core/src/services/menu_service.rs
// Description: Menu tree maintenance: materialized parent paths, subtree
//              moves, action/resource sync and seed loading
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use rbac_shared::utils::{is_path_within, rebase_path};
use rbac_shared::{PageResult, Pagination};

use super::diff::{diff, distinct};
use crate::context::Ctx;
use crate::domain::{Menu, MenuAction, MenuActionResource, MenuForm, MenuSeed, MenuTree, Status};
use crate::error::DomainError;
use crate::policy::PolicyReloadQueue;
use crate::repositories::{
    exec_trans, exec_trans_with_lock, MenuActionQueryParam, MenuActionRepository, MenuActionResourceQueryParam,
    MenuActionResourceRepository, MenuQueryParam, MenuRepository, Repositories, TransactionManager,
};

/// Menu service
///
/// Every menu's `parent_path` is kept equal to its parent's path (parent's
/// `parent_path` joined with the parent's id). Moving a menu rewrites the
/// paths of its whole subtree in the same transaction.
pub struct MenuService {
    trans: Arc<dyn TransactionManager>,
    menu_repo: Arc<dyn MenuRepository>,
    action_repo: Arc<dyn MenuActionRepository>,
    resource_repo: Arc<dyn MenuActionResourceRepository>,
    reload_queue: PolicyReloadQueue,
}

impl MenuService {
    pub fn new(repos: &Repositories, reload_queue: PolicyReloadQueue) -> Self {
        Self {
            trans: repos.trans.clone(),
            menu_repo: repos.menus.clone(),
            action_repo: repos.menu_actions.clone(),
            resource_repo: repos.menu_action_resources.clone(),
            reload_queue,
        }
    }

    pub async fn query(&self, ctx: &Ctx, params: &MenuQueryParam) -> Result<PageResult<Menu>, DomainError> {
        self.menu_repo.query(ctx, params).await
    }

    /// Matching menus nested by parent, ignoring pagination.
    pub async fn query_tree(&self, ctx: &Ctx, params: &MenuQueryParam) -> Result<Vec<MenuTree>, DomainError> {
        let params = MenuQueryParam { pagination: Pagination::default(), ..params.clone() };
        let menus = self.menu_repo.query(ctx, &params).await?.data;
        Ok(MenuTree::build(menus))
    }

    /// Menu with its actions and their resources.
    pub async fn get(&self, ctx: &Ctx, id: &Uuid) -> Result<Menu, DomainError> {
        let mut menu = self
            .menu_repo
            .get(ctx, id)
            .await?
            .ok_or(DomainError::MenuNotFound(*id))?;
        menu.actions = self.load_actions(ctx, id).await?;
        Ok(menu)
    }

    /// Path a new child of `parent_id` must store. Empty for top-level menus.
    pub async fn resolve_parent_path(&self, ctx: &Ctx, parent_id: Option<Uuid>) -> Result<String, DomainError> {
        let Some(parent_id) = parent_id else {
            return Ok(String::new());
        };

        let parent = self
            .menu_repo
            .get(ctx, &parent_id)
            .await?
            .ok_or(DomainError::ParentNotFound(parent_id))?;
        Ok(parent.path())
    }

    /// Create a menu with its actions and resources
    pub async fn create(&self, ctx: &Ctx, form: &MenuForm) -> Result<Menu, DomainError> {
        info!("Creating menu: {}", form.name);

        // 1. Validate input
        Self::validate_form(form)?;

        // 2. Reject duplicate sibling name
        self.check_name(ctx, form.parent_id, &form.name).await?;

        // 3. Derive the path from the parent
        let parent_path = self.resolve_parent_path(ctx, form.parent_id).await?;
        let menu = Menu::from_form(form, parent_path, ctx.user_id());

        // 4. Persist menu, actions and resources together. The parent row
        //    stays locked so it cannot be deleted underneath the new child.
        exec_trans_with_lock(self.trans.as_ref(), ctx, |tx| {
            let menu = &menu;
            async move {
                if let Some(parent_id) = menu.parent_id {
                    self.menu_repo
                        .get(&tx, &parent_id)
                        .await?
                        .ok_or(DomainError::ParentNotFound(parent_id))?;
                }
                self.create_actions(&tx, &menu.actions).await?;
                self.menu_repo.create(&tx, menu).await
            }
        })
        .await?;

        // 5. Resources may feed permission rules
        self.reload_queue.signal(ctx);

        info!("Menu created: {} ({})", menu.name, menu.id);
        Ok(menu)
    }

    /// Update a menu, moving its subtree when the parent changes
    pub async fn update(&self, ctx: &Ctx, id: &Uuid, form: &MenuForm) -> Result<(), DomainError> {
        info!("Updating menu: {}", id);

        // 1. Validate input
        Self::validate_form(form)?;
        if form.parent_id == Some(*id) {
            warn!("Menu update rejected: {} cannot be its own parent", id);
            return Err(DomainError::InvalidParent(*id));
        }

        // 2. Load current state
        let old = self
            .menu_repo
            .get(ctx, id)
            .await?
            .ok_or(DomainError::MenuNotFound(*id))?;
        let parent_changed = old.parent_id != form.parent_id;

        // 3. Resolve the new path and refuse moves into the own subtree
        let parent_path = if parent_changed {
            let path = self.resolve_parent_path(ctx, form.parent_id).await?;
            if is_path_within(&path, &old.path()) {
                warn!("Menu update rejected: new parent of {} lies in its subtree", id);
                return Err(DomainError::InvalidParent(*id));
            }
            path
        } else {
            old.parent_path.clone()
        };

        // 4. Sibling names stay unique under the target parent
        if parent_changed || old.name != form.name {
            self.check_name(ctx, form.parent_id, &form.name).await?;
        }

        let menu = old.apply_form(form, parent_path, ctx.user_id());

        // 5. Subtree paths, actions and the row itself in one transaction
        exec_trans(self.trans.as_ref(), ctx, |tx| {
            let (old, menu) = (&old, &menu);
            async move {
                if parent_changed {
                    self.rebase_descendants(&tx, &old.path(), &menu.path()).await?;
                }

                let old_actions = self.load_actions(&tx, &old.id).await?;
                self.sync_actions(&tx, &old_actions, &menu.actions).await?;

                self.menu_repo.update(&tx, menu).await
            }
        })
        .await?;

        self.reload_queue.signal(ctx);

        info!("Menu updated: {}", id);
        Ok(())
    }

    /// Delete a leaf menu together with its actions and resources
    pub async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError> {
        info!("Deleting menu: {}", id);

        // the menu row stays locked from the children check to the delete
        exec_trans_with_lock(self.trans.as_ref(), ctx, |tx| async move {
            if self.menu_repo.get(&tx, id).await?.is_none() {
                return Err(DomainError::MenuNotFound(*id));
            }

            let children = self.menu_repo.query(&tx, &MenuQueryParam::children_of(*id)).await?;
            if children.total > 0 {
                warn!("Menu delete rejected: {} still has {} children", id, children.total);
                return Err(DomainError::MenuHasChildren(*id));
            }

            self.resource_repo.delete_by_menu_id(&tx, id).await?;
            self.action_repo.delete_by_menu_id(&tx, id).await?;
            self.menu_repo.delete(&tx, id).await
        })
        .await?;

        self.reload_queue.signal(ctx);

        info!("Menu deleted: {}", id);
        Ok(())
    }

    /// Enable or disable a menu. Setting the current status is a no-op.
    pub async fn update_status(&self, ctx: &Ctx, id: &Uuid, status: Status) -> Result<(), DomainError> {
        let menu = self
            .menu_repo
            .get(ctx, id)
            .await?
            .ok_or(DomainError::MenuNotFound(*id))?;
        if menu.status == status {
            return Ok(());
        }

        self.menu_repo.update_status(ctx, id, status).await?;
        self.reload_queue.signal(ctx);

        info!("Menu {} status set to {}", id, status.as_str());
        Ok(())
    }

    /// Seed the menu tree on an empty store. Returns the number of menus
    /// created; nothing is written when any menu already exists.
    pub async fn init_data(&self, ctx: &Ctx, seeds: &[MenuSeed]) -> Result<usize, DomainError> {
        let existing = self
            .menu_repo
            .query(ctx, &MenuQueryParam { pagination: Pagination::count_only(), ..Default::default() })
            .await?
            .total;
        if existing > 0 {
            info!("Menu seed skipped: {} menus already present", existing);
            return Ok(0);
        }

        let created = exec_trans(self.trans.as_ref(), ctx, |tx| async move {
            let mut created: usize = 0;
            let mut stack: Vec<(Option<Uuid>, &MenuSeed)> = seeds.iter().rev().map(|s| (None, s)).collect();

            // parents are created before their children
            while let Some((parent_id, seed)) = stack.pop() {
                let menu = self.create(&tx, &seed.to_form(parent_id)).await?;
                created += 1;
                stack.extend(seed.children.iter().rev().map(|c| (Some(menu.id), c)));
            }
            Ok(created)
        })
        .await?;

        self.reload_queue.signal(ctx);

        info!("Menu seed loaded: {} menus", created);
        Ok(created)
    }

    fn validate_form(form: &MenuForm) -> Result<(), DomainError> {
        form.validate()?;
        if let Some(code) = form.duplicate_action_code() {
            return Err(DomainError::ValidationError(format!("Duplicate action code: {}", code)));
        }
        Ok(())
    }

    async fn check_name(&self, ctx: &Ctx, parent_id: Option<Uuid>, name: &str) -> Result<(), DomainError> {
        let result = self
            .menu_repo
            .query(ctx, &MenuQueryParam::siblings_named(parent_id, name))
            .await?;
        if result.total > 0 {
            warn!("Menu name already exists under parent {:?}: {}", parent_id, name);
            return Err(DomainError::MenuNameAlreadyExists(name.to_string()));
        }
        Ok(())
    }

    async fn load_actions(&self, ctx: &Ctx, menu_id: &Uuid) -> Result<Vec<MenuAction>, DomainError> {
        let mut actions = self
            .action_repo
            .query(ctx, &MenuActionQueryParam { menu_id: Some(*menu_id), ..Default::default() })
            .await?;

        let mut by_action: HashMap<Uuid, Vec<MenuActionResource>> = HashMap::new();
        for res in self
            .resource_repo
            .query(ctx, &MenuActionResourceQueryParam { menu_id: Some(*menu_id), ..Default::default() })
            .await?
        {
            by_action.entry(res.action_id).or_default().push(res);
        }

        for action in &mut actions {
            action.resources = by_action.remove(&action.id).unwrap_or_default();
        }
        Ok(actions)
    }

    async fn create_actions(&self, ctx: &Ctx, actions: &[MenuAction]) -> Result<(), DomainError> {
        for action in actions {
            self.action_repo.create(ctx, action).await?;
            for res in &distinct(&action.resources) {
                self.resource_repo.create(ctx, res).await?;
            }
        }
        Ok(())
    }

    /// Actions match by code; matched actions keep their id, take the new
    /// name and have their resources diffed by (method, path).
    async fn sync_actions(&self, ctx: &Ctx, old: &[MenuAction], new: &[MenuAction]) -> Result<(), DomainError> {
        let actions = diff(old, new);

        self.create_actions(ctx, &actions.add).await?;

        for action in &actions.delete {
            self.resource_repo.delete_by_action_id(ctx, &action.id).await?;
            self.action_repo.delete(ctx, &action.id).await?;
        }

        for pair in &actions.update {
            if pair.old.name != pair.new.name {
                let renamed = MenuAction { name: pair.new.name.clone(), resources: Vec::new(), ..pair.old.clone() };
                self.action_repo.update(ctx, &renamed).await?;
            }

            let resources = diff(&pair.old.resources, &pair.new.resources);
            for res in &resources.add {
                let res = MenuActionResource { action_id: pair.old.id, ..res.clone() };
                self.resource_repo.create(ctx, &res).await?;
            }
            for res in &resources.delete {
                self.resource_repo.delete(ctx, &res.id).await?;
            }
        }

        info!(
            "Menu actions synced: {} added, {} removed, {} kept",
            actions.add.len(),
            actions.delete.len(),
            actions.update.len()
        );
        Ok(())
    }

    /// Swap `old_prefix` for `new_prefix` in the path of every menu below it.
    async fn rebase_descendants(&self, ctx: &Ctx, old_prefix: &str, new_prefix: &str) -> Result<usize, DomainError> {
        let descendants = self
            .menu_repo
            .query(ctx, &MenuQueryParam::descendants_of(old_prefix))
            .await?
            .data;

        let mut moved = 0;
        for menu in &descendants {
            if let Some(path) = rebase_path(&menu.parent_path, old_prefix, new_prefix) {
                self.menu_repo.update_parent_path(ctx, &menu.id, &path).await?;
                moved += 1;
            }
        }

        info!("Rebased {} descendant menus: {} -> {}", moved, old_prefix, new_prefix);
        Ok(moved)
    }
}
