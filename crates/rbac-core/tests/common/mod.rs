//! In-memory repositories and a wired service harness for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use rbac_core::context::{Ctx, TxHandle};
use rbac_core::domain::*;
use rbac_core::error::DomainError;
use rbac_core::policy::{MemoryEnforcer, PolicyEnforcer, PolicyReloadQueue, ReloadWorker, RepositoryPolicyAdapter};
use rbac_core::repositories::*;
use rbac_core::services::{MenuService, RoleService, UserService};
use rbac_shared::{PageResult, Pagination};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Op {
    pub kind: OpKind,
    pub table: &'static str,
    pub id: Uuid,
    pub in_trans: bool,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    menus: Vec<Menu>,
    actions: Vec<MenuAction>,
    resources: Vec<MenuActionResource>,
    roles: Vec<Role>,
    role_menus: Vec<RoleMenu>,
    users: Vec<User>,
    user_roles: Vec<UserRole>,
}

/// Store whose transactions snapshot the tables on begin and restore them
/// on rollback. Every write is appended to an op log, every row read under
/// a transaction lock to a lock log.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    snapshot: Mutex<Option<Tables>>,
    ops: Mutex<Vec<Op>>,
    locks: Mutex<Vec<(&'static str, Uuid)>>,
    fail_on: Mutex<Option<(OpKind, &'static str)>>,
    next_tx: AtomicU64,
    pub begins: AtomicU64,
    pub commits: AtomicU64,
    pub rollbacks: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            trans: self.clone(),
            menus: self.clone(),
            menu_actions: self.clone(),
            menu_action_resources: self.clone(),
            roles: self.clone(),
            role_menus: self.clone(),
            users: self.clone(),
            user_roles: self.clone(),
        }
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.lock().clear();
        self.locks.lock().clear();
    }

    /// Rows of `table` read with a row lock inside a transaction.
    pub fn locked_on(&self, table: &str) -> Vec<Uuid> {
        self.locks.lock().iter().filter(|(t, _)| *t == table).map(|(_, id)| *id).collect()
    }

    fn lock_read(&self, ctx: &Ctx, table: &'static str, id: Uuid) {
        if ctx.in_trans() && ctx.trans_lock() {
            self.locks.lock().push((table, id));
        }
    }

    pub fn ops_on(&self, table: &str) -> Vec<Op> {
        self.ops.lock().iter().filter(|op| op.table == table).cloned().collect()
    }

    /// The next write of this kind on this table fails.
    pub fn fail_next(&self, kind: OpKind, table: &'static str) {
        *self.fail_on.lock() = Some((kind, table));
    }

    pub fn menu(&self, id: Uuid) -> Option<Menu> {
        self.tables.lock().menus.iter().find(|m| m.id == id).cloned()
    }

    pub fn menu_count(&self) -> usize {
        self.tables.lock().menus.len()
    }

    pub fn actions_of(&self, menu_id: Uuid) -> Vec<MenuAction> {
        self.tables.lock().actions.iter().filter(|a| a.menu_id == menu_id).cloned().collect()
    }

    pub fn resource_count(&self) -> usize {
        self.tables.lock().resources.len()
    }

    pub fn role_menus_of(&self, role_id: Uuid) -> Vec<RoleMenu> {
        self.tables.lock().role_menus.iter().filter(|rm| rm.role_id == role_id).cloned().collect()
    }

    pub fn user_roles_of(&self, user_id: Uuid) -> Vec<UserRole> {
        self.tables.lock().user_roles.iter().filter(|ur| ur.user_id == user_id).cloned().collect()
    }

    pub fn role(&self, id: Uuid) -> Option<Role> {
        self.tables.lock().roles.iter().find(|r| r.id == id).cloned()
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.tables.lock().users.iter().find(|u| u.id == id).cloned()
    }

    fn record(&self, ctx: &Ctx, kind: OpKind, table: &'static str, id: Uuid) -> Result<(), DomainError> {
        let mut fail_on = self.fail_on.lock();
        if *fail_on == Some((kind, table)) {
            *fail_on = None;
            return Err(DomainError::DatabaseError(format!("injected {:?} failure on {}", kind, table)));
        }
        self.ops.lock().push(Op { kind, table, id, in_trans: ctx.in_trans() });
        Ok(())
    }
}

fn page<T>(items: Vec<T>, p: &Pagination) -> PageResult<T> {
    let total = items.len() as i64;
    if p.only_count {
        return PageResult::count(total);
    }
    if !p.paginate {
        return PageResult::new(items, total);
    }
    let data = items
        .into_iter()
        .skip(p.offset() as usize)
        .take(p.limit() as usize)
        .collect();
    PageResult::new(data, total)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl TransactionManager for MemoryStore {
    async fn begin(&self, ctx: &Ctx) -> Result<Ctx, DomainError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        *self.snapshot.lock() = Some(self.tables.lock().clone());
        let tx_no = self.next_tx.fetch_add(1, Ordering::SeqCst);
        Ok(ctx.with_trans(TxHandle::new(tx_no)))
    }

    async fn commit(&self, _ctx: &Ctx) -> Result<(), DomainError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        *self.snapshot.lock() = None;
        Ok(())
    }

    async fn rollback(&self, _ctx: &Ctx) -> Result<(), DomainError> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        if let Some(snapshot) = self.snapshot.lock().take() {
            *self.tables.lock() = snapshot;
        }
        Ok(())
    }
}

#[async_trait]
impl MenuRepository for MemoryStore {
    async fn query(&self, _ctx: &Ctx, params: &MenuQueryParam) -> Result<PageResult<Menu>, DomainError> {
        let tables = self.tables.lock();
        let mut items: Vec<Menu> = tables
            .menus
            .iter()
            .filter(|m| params.ids.as_ref().map_or(true, |ids| ids.contains(&m.id)))
            .filter(|m| params.name.as_ref().map_or(true, |n| &m.name == n))
            .filter(|m| params.parent_id.map_or(true, |p| m.parent_id == p))
            .filter(|m| {
                params.prefix_parent_path.as_ref().map_or(true, |prefix| {
                    m.parent_path == *prefix || m.parent_path.starts_with(&format!("{}/", prefix))
                })
            })
            .filter(|m| params.status.map_or(true, |s| m.status == s))
            .filter(|m| params.show_status.map_or(true, |s| m.show_status == s))
            .filter(|m| {
                params.query_value.as_ref().map_or(true, |q| {
                    contains_ci(&m.name, q) || m.memo.as_deref().is_some_and(|memo| contains_ci(memo, q))
                })
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        Ok(page(items, &params.pagination))
    }

    async fn get(&self, ctx: &Ctx, id: &Uuid) -> Result<Option<Menu>, DomainError> {
        self.lock_read(ctx, "menus", *id);
        Ok(self.menu(*id))
    }

    async fn create(&self, ctx: &Ctx, menu: &Menu) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Insert, "menus", menu.id)?;
        let row = Menu { actions: Vec::new(), ..menu.clone() };
        self.tables.lock().menus.push(row);
        Ok(())
    }

    async fn update(&self, ctx: &Ctx, menu: &Menu) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Update, "menus", menu.id)?;
        let mut tables = self.tables.lock();
        if let Some(row) = tables.menus.iter_mut().find(|m| m.id == menu.id) {
            *row = Menu { actions: Vec::new(), ..menu.clone() };
        }
        Ok(())
    }

    async fn update_parent_path(&self, ctx: &Ctx, id: &Uuid, parent_path: &str) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Update, "menus", *id)?;
        let mut tables = self.tables.lock();
        if let Some(row) = tables.menus.iter_mut().find(|m| m.id == *id) {
            row.parent_path = parent_path.to_string();
        }
        Ok(())
    }

    async fn update_status(&self, ctx: &Ctx, id: &Uuid, status: Status) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Update, "menus", *id)?;
        let mut tables = self.tables.lock();
        if let Some(row) = tables.menus.iter_mut().find(|m| m.id == *id) {
            row.status = status;
        }
        Ok(())
    }

    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Delete, "menus", *id)?;
        self.tables.lock().menus.retain(|m| m.id != *id);
        Ok(())
    }
}

#[async_trait]
impl MenuActionRepository for MemoryStore {
    async fn query(&self, _ctx: &Ctx, params: &MenuActionQueryParam) -> Result<Vec<MenuAction>, DomainError> {
        Ok(self
            .tables
            .lock()
            .actions
            .iter()
            .filter(|a| params.menu_id.map_or(true, |id| a.menu_id == id))
            .filter(|a| params.ids.as_ref().map_or(true, |ids| ids.contains(&a.id)))
            .cloned()
            .collect())
    }

    async fn create(&self, ctx: &Ctx, action: &MenuAction) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Insert, "menu_actions", action.id)?;
        let row = MenuAction { resources: Vec::new(), ..action.clone() };
        self.tables.lock().actions.push(row);
        Ok(())
    }

    async fn update(&self, ctx: &Ctx, action: &MenuAction) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Update, "menu_actions", action.id)?;
        let mut tables = self.tables.lock();
        if let Some(row) = tables.actions.iter_mut().find(|a| a.id == action.id) {
            row.code = action.code.clone();
            row.name = action.name.clone();
        }
        Ok(())
    }

    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Delete, "menu_actions", *id)?;
        self.tables.lock().actions.retain(|a| a.id != *id);
        Ok(())
    }

    async fn delete_by_menu_id(&self, ctx: &Ctx, menu_id: &Uuid) -> Result<(), DomainError> {
        let ids: Vec<Uuid> = self.actions_of(*menu_id).iter().map(|a| a.id).collect();
        for id in &ids {
            self.record(ctx, OpKind::Delete, "menu_actions", *id)?;
        }
        self.tables.lock().actions.retain(|a| a.menu_id != *menu_id);
        Ok(())
    }
}

#[async_trait]
impl MenuActionResourceRepository for MemoryStore {
    async fn query(
        &self,
        _ctx: &Ctx,
        params: &MenuActionResourceQueryParam,
    ) -> Result<Vec<MenuActionResource>, DomainError> {
        let tables = self.tables.lock();
        let menu_actions: Option<Vec<Uuid>> = params.menu_id.map(|menu_id| {
            tables.actions.iter().filter(|a| a.menu_id == menu_id).map(|a| a.id).collect()
        });
        Ok(tables
            .resources
            .iter()
            .filter(|r| menu_actions.as_ref().map_or(true, |ids| ids.contains(&r.action_id)))
            .filter(|r| params.action_ids.as_ref().map_or(true, |ids| ids.contains(&r.action_id)))
            .cloned()
            .collect())
    }

    async fn create(&self, ctx: &Ctx, resource: &MenuActionResource) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Insert, "menu_action_resources", resource.id)?;
        self.tables.lock().resources.push(resource.clone());
        Ok(())
    }

    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Delete, "menu_action_resources", *id)?;
        self.tables.lock().resources.retain(|r| r.id != *id);
        Ok(())
    }

    async fn delete_by_action_id(&self, ctx: &Ctx, action_id: &Uuid) -> Result<(), DomainError> {
        let ids: Vec<Uuid> = {
            let tables = self.tables.lock();
            tables.resources.iter().filter(|r| r.action_id == *action_id).map(|r| r.id).collect()
        };
        for id in &ids {
            self.record(ctx, OpKind::Delete, "menu_action_resources", *id)?;
        }
        self.tables.lock().resources.retain(|r| r.action_id != *action_id);
        Ok(())
    }

    async fn delete_by_menu_id(&self, ctx: &Ctx, menu_id: &Uuid) -> Result<(), DomainError> {
        let action_ids: Vec<Uuid> = self.actions_of(*menu_id).iter().map(|a| a.id).collect();
        for action_id in &action_ids {
            MenuActionResourceRepository::delete_by_action_id(self, ctx, action_id).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn query(&self, _ctx: &Ctx, params: &RoleQueryParam) -> Result<PageResult<Role>, DomainError> {
        let tables = self.tables.lock();
        let bound: Option<Vec<Uuid>> = params.user_id.map(|user_id| {
            tables.user_roles.iter().filter(|ur| ur.user_id == user_id).map(|ur| ur.role_id).collect()
        });
        let mut items: Vec<Role> = tables
            .roles
            .iter()
            .filter(|r| params.ids.as_ref().map_or(true, |ids| ids.contains(&r.id)))
            .filter(|r| params.name.as_ref().map_or(true, |n| &r.name == n))
            .filter(|r| params.status.map_or(true, |s| r.status == s))
            .filter(|r| bound.as_ref().map_or(true, |ids| ids.contains(&r.id)))
            .filter(|r| params.query_value.as_ref().map_or(true, |q| contains_ci(&r.name, q)))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        Ok(page(items, &params.pagination))
    }

    async fn get(&self, ctx: &Ctx, id: &Uuid) -> Result<Option<Role>, DomainError> {
        self.lock_read(ctx, "roles", *id);
        Ok(self.role(*id))
    }

    async fn create(&self, ctx: &Ctx, role: &Role) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Insert, "roles", role.id)?;
        self.tables.lock().roles.push(Role { role_menus: Vec::new(), ..role.clone() });
        Ok(())
    }

    async fn update(&self, ctx: &Ctx, role: &Role) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Update, "roles", role.id)?;
        let mut tables = self.tables.lock();
        if let Some(row) = tables.roles.iter_mut().find(|r| r.id == role.id) {
            *row = Role { role_menus: Vec::new(), ..role.clone() };
        }
        Ok(())
    }

    async fn update_status(&self, ctx: &Ctx, id: &Uuid, status: Status) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Update, "roles", *id)?;
        let mut tables = self.tables.lock();
        if let Some(row) = tables.roles.iter_mut().find(|r| r.id == *id) {
            row.status = status;
        }
        Ok(())
    }

    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Delete, "roles", *id)?;
        self.tables.lock().roles.retain(|r| r.id != *id);
        Ok(())
    }
}

#[async_trait]
impl RoleMenuRepository for MemoryStore {
    async fn query(&self, _ctx: &Ctx, params: &RoleMenuQueryParam) -> Result<Vec<RoleMenu>, DomainError> {
        Ok(self
            .tables
            .lock()
            .role_menus
            .iter()
            .filter(|rm| params.role_id.map_or(true, |id| rm.role_id == id))
            .filter(|rm| params.role_ids.as_ref().map_or(true, |ids| ids.contains(&rm.role_id)))
            .cloned()
            .collect())
    }

    async fn create(&self, ctx: &Ctx, role_menu: &RoleMenu) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Insert, "role_menus", role_menu.id)?;
        self.tables.lock().role_menus.push(role_menu.clone());
        Ok(())
    }

    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Delete, "role_menus", *id)?;
        self.tables.lock().role_menus.retain(|rm| rm.id != *id);
        Ok(())
    }

    async fn delete_by_role_id(&self, ctx: &Ctx, role_id: &Uuid) -> Result<(), DomainError> {
        for rm in self.role_menus_of(*role_id) {
            self.record(ctx, OpKind::Delete, "role_menus", rm.id)?;
        }
        self.tables.lock().role_menus.retain(|rm| rm.role_id != *role_id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn query(&self, _ctx: &Ctx, params: &UserQueryParam) -> Result<PageResult<User>, DomainError> {
        let tables = self.tables.lock();
        let holders: Option<Vec<Uuid>> = params.role_ids.as_ref().map(|role_ids| {
            tables
                .user_roles
                .iter()
                .filter(|ur| role_ids.contains(&ur.role_id))
                .map(|ur| ur.user_id)
                .collect()
        });
        let items: Vec<User> = tables
            .users
            .iter()
            .filter(|u| params.user_name.as_ref().map_or(true, |n| &u.user_name == n))
            .filter(|u| params.status.map_or(true, |s| u.status == s))
            .filter(|u| holders.as_ref().map_or(true, |ids| ids.contains(&u.id)))
            .filter(|u| {
                params.query_value.as_ref().map_or(true, |q| {
                    contains_ci(&u.user_name, q) || contains_ci(&u.real_name, q)
                })
            })
            .cloned()
            .collect();
        Ok(page(items, &params.pagination))
    }

    async fn get(&self, ctx: &Ctx, id: &Uuid) -> Result<Option<User>, DomainError> {
        self.lock_read(ctx, "users", *id);
        Ok(self.user(*id))
    }

    async fn find_by_user_name(&self, _ctx: &Ctx, user_name: &str) -> Result<Option<User>, DomainError> {
        Ok(self.tables.lock().users.iter().find(|u| u.user_name == user_name).cloned())
    }

    async fn create(&self, ctx: &Ctx, user: &User) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Insert, "users", user.id)?;
        self.tables.lock().users.push(User { user_roles: Vec::new(), ..user.clone() });
        Ok(())
    }

    async fn update(&self, ctx: &Ctx, user: &User) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Update, "users", user.id)?;
        let mut tables = self.tables.lock();
        if let Some(row) = tables.users.iter_mut().find(|u| u.id == user.id) {
            *row = User { user_roles: Vec::new(), ..user.clone() };
        }
        Ok(())
    }

    async fn update_status(&self, ctx: &Ctx, id: &Uuid, status: Status) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Update, "users", *id)?;
        let mut tables = self.tables.lock();
        if let Some(row) = tables.users.iter_mut().find(|u| u.id == *id) {
            row.status = status;
        }
        Ok(())
    }

    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Delete, "users", *id)?;
        self.tables.lock().users.retain(|u| u.id != *id);
        Ok(())
    }
}

#[async_trait]
impl UserRoleRepository for MemoryStore {
    async fn query(&self, _ctx: &Ctx, params: &UserRoleQueryParam) -> Result<Vec<UserRole>, DomainError> {
        Ok(self
            .tables
            .lock()
            .user_roles
            .iter()
            .filter(|ur| params.user_id.map_or(true, |id| ur.user_id == id))
            .filter(|ur| params.user_ids.as_ref().map_or(true, |ids| ids.contains(&ur.user_id)))
            .cloned()
            .collect())
    }

    async fn create(&self, ctx: &Ctx, user_role: &UserRole) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Insert, "user_roles", user_role.id)?;
        self.tables.lock().user_roles.push(user_role.clone());
        Ok(())
    }

    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError> {
        self.record(ctx, OpKind::Delete, "user_roles", *id)?;
        self.tables.lock().user_roles.retain(|ur| ur.id != *id);
        Ok(())
    }

    async fn delete_by_user_id(&self, ctx: &Ctx, user_id: &Uuid) -> Result<(), DomainError> {
        for ur in self.user_roles_of(*user_id) {
            self.record(ctx, OpKind::Delete, "user_roles", ur.id)?;
        }
        self.tables.lock().user_roles.retain(|ur| ur.user_id != *user_id);
        Ok(())
    }
}

/// Services wired to one store, with a live reload worker and enforcer.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub queue: PolicyReloadQueue,
    worker: Option<ReloadWorker>,
    pub enforcer: Arc<MemoryEnforcer>,
    pub menus: MenuService,
    pub roles: RoleService,
    pub users: UserService,
}

impl Harness {
    /// Must be called inside a tokio runtime.
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let repos = store.repositories();
        let enforcer = Arc::new(MemoryEnforcer::new(Arc::new(RepositoryPolicyAdapter::new(repos.clone()))));
        let (queue, worker) = PolicyReloadQueue::start(enforcer.clone() as Arc<dyn PolicyEnforcer>);

        Self {
            menus: MenuService::new(&repos, queue.clone()),
            roles: RoleService::new(&repos, queue.clone()),
            users: UserService::new(&repos, "root".to_string(), queue.clone()),
            store,
            queue,
            worker: Some(worker),
            enforcer,
        }
    }

    /// Stops the worker once it has applied any pending reload.
    pub async fn drain_reloads(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown().await;
        }
    }
}

pub fn ctx() -> Ctx {
    Ctx::new()
}

pub fn menu_form(name: &str, parent_id: Option<Uuid>) -> MenuForm {
    MenuForm {
        name: name.to_string(),
        sequence: 0,
        icon: None,
        router: None,
        parent_id,
        show_status: ShowStatus::Show,
        status: Status::Enabled,
        memo: None,
        actions: vec![],
    }
}

pub fn action(code: &str, resources: &[(&str, &str)]) -> MenuActionForm {
    MenuActionForm {
        code: code.to_string(),
        name: code.to_uppercase(),
        resources: resources
            .iter()
            .map(|(method, path)| MenuActionResourceForm { method: method.to_string(), path: path.to_string() })
            .collect(),
    }
}

pub fn role_form(name: &str, grants: &[(Uuid, Uuid)]) -> RoleForm {
    RoleForm {
        name: name.to_string(),
        sequence: 0,
        memo: None,
        status: Status::Enabled,
        role_menus: grants
            .iter()
            .map(|(menu_id, action_id)| RoleMenuForm { menu_id: *menu_id, action_id: *action_id })
            .collect(),
    }
}

pub fn user_form(user_name: &str, password: Option<&str>, role_ids: &[Uuid]) -> UserForm {
    UserForm {
        user_name: user_name.to_string(),
        real_name: user_name.to_uppercase(),
        password: password.map(str::to_string),
        email: None,
        phone: None,
        status: Status::Enabled,
        role_ids: role_ids.to_vec(),
    }
}
