// ============================================================================
// RBAC Infrastructure - PostgreSQL Role Repositories
// File: crates/rbac-infrastructure/src/database/postgres/role_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{error, info};
use uuid::Uuid;

use rbac_core::context::Ctx;
use rbac_core::domain::{Role, RoleMenu, Status};
use rbac_core::error::DomainError;
use rbac_core::repositories::{RoleMenuQueryParam, RoleMenuRepository, RoleQueryParam, RoleRepository};
use rbac_shared::PageResult;

use super::transaction::{db_err, is_unique_violation, PgDb};

const ROLE_COLUMNS: &str = "id, name, sequence, memo, status, created_at, created_by, modified_at, modified_by";

pub struct PgRoleRepository {
    db: PgDb,
}

impl PgRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { db: PgDb::new(pool) }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct RoleRow {
    pub id: Uuid,
    pub name: String,
    pub sequence: i32,
    pub memo: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<Uuid>,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: row.id,
            name: row.name,
            sequence: row.sequence,
            memo: row.memo,
            status: Status::from_str(&row.status).unwrap_or_default(),
            role_menus: Vec::new(),
            created_at: row.created_at,
            created_by: row.created_by,
            modified_at: row.modified_at,
            modified_by: row.modified_by,
        }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &RoleQueryParam) {
    if let Some(ids) = &params.ids {
        qb.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
    }
    if let Some(name) = &params.name {
        qb.push(" AND name = ").push_bind(name.clone());
    }
    if let Some(status) = params.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(user_id) = params.user_id {
        qb.push(" AND id IN (SELECT role_id FROM user_roles WHERE user_id = ")
            .push_bind(user_id)
            .push(")");
    }
    if let Some(value) = &params.query_value {
        let pattern = format!("%{}%", value);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR memo ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn query(&self, ctx: &Ctx, params: &RoleQueryParam) -> Result<PageResult<Role>, DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM roles WHERE 1 = 1");
        push_filters(&mut count, params);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(conn.as_mut())
            .await
            .map_err(db_err("counting roles"))?;

        if params.pagination.only_count || total == 0 {
            return Ok(PageResult::count(total));
        }

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM roles WHERE 1 = 1", ROLE_COLUMNS));
        push_filters(&mut select, params);
        select.push(" ORDER BY sequence DESC, created_at DESC");
        if params.pagination.paginate {
            select
                .push(" LIMIT ")
                .push_bind(params.pagination.limit())
                .push(" OFFSET ")
                .push_bind(params.pagination.offset());
        }
        select.push(PgDb::lock_clause(ctx));

        let rows = select
            .build_query_as::<RoleRow>()
            .fetch_all(conn.as_mut())
            .await
            .map_err(db_err("querying roles"))?;

        Ok(PageResult::new(rows.into_iter().map(Role::from).collect(), total))
    }

    async fn get(&self, ctx: &Ctx, id: &Uuid) -> Result<Option<Role>, DomainError> {
        let mut conn = self.db.conn(ctx).await?;
        let sql = format!("SELECT {} FROM roles WHERE id = $1{}", ROLE_COLUMNS, PgDb::lock_clause(ctx));

        let row: Option<RoleRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(conn.as_mut())
            .await
            .map_err(db_err("finding role by id"))?;

        Ok(row.map(|r| r.into()))
    }

    async fn create(&self, ctx: &Ctx, role: &Role) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query(
            r#"
            INSERT INTO roles (
                id, name, sequence, memo, status,
                created_at, created_by, modified_at, modified_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(role.sequence)
        .bind(&role.memo)
        .bind(role.status.as_str())
        .bind(role.created_at)
        .bind(role.created_by)
        .bind(role.modified_at)
        .bind(role.modified_by)
        .execute(conn.as_mut())
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error creating role: {}", e);
            if is_unique_violation(&e) {
                DomainError::RoleNameAlreadyExists(role.name.clone())
            } else {
                DomainError::DatabaseError(e.to_string())
            }
        })?;

        info!("Role row inserted: {}", role.id);
        Ok(())
    }

    async fn update(&self, ctx: &Ctx, role: &Role) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query(
            r#"
            UPDATE roles
            SET
                name = $2,
                sequence = $3,
                memo = $4,
                status = $5,
                modified_at = $6,
                modified_by = $7
            WHERE id = $1
            "#,
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(role.sequence)
        .bind(&role.memo)
        .bind(role.status.as_str())
        .bind(role.modified_at)
        .bind(role.modified_by)
        .execute(conn.as_mut())
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error updating role: {}", e);
            if is_unique_violation(&e) {
                DomainError::RoleNameAlreadyExists(role.name.clone())
            } else {
                DomainError::DatabaseError(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn update_status(&self, ctx: &Ctx, id: &Uuid, status: Status) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("UPDATE roles SET status = $2, modified_at = NOW(), modified_by = $3 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .bind(ctx.user_id())
            .execute(conn.as_mut())
            .await
            .map_err(db_err("updating role status"))?;

        Ok(())
    }

    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(conn.as_mut())
            .await
            .map_err(db_err("deleting role"))?;

        Ok(())
    }
}

pub struct PgRoleMenuRepository {
    db: PgDb,
}

impl PgRoleMenuRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { db: PgDb::new(pool) }
    }
}

#[derive(Debug, FromRow)]
struct RoleMenuRow {
    pub id: Uuid,
    pub role_id: Uuid,
    pub menu_id: Uuid,
    pub action_id: Uuid,
}

impl From<RoleMenuRow> for RoleMenu {
    fn from(row: RoleMenuRow) -> Self {
        RoleMenu {
            id: row.id,
            role_id: row.role_id,
            menu_id: row.menu_id,
            action_id: row.action_id,
        }
    }
}

#[async_trait]
impl RoleMenuRepository for PgRoleMenuRepository {
    async fn query(&self, ctx: &Ctx, params: &RoleMenuQueryParam) -> Result<Vec<RoleMenu>, DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT id, role_id, menu_id, action_id FROM role_menus WHERE 1 = 1");
        if let Some(role_id) = params.role_id {
            qb.push(" AND role_id = ").push_bind(role_id);
        }
        if let Some(role_ids) = &params.role_ids {
            qb.push(" AND role_id = ANY(").push_bind(role_ids.clone()).push(")");
        }
        qb.push(PgDb::lock_clause(ctx));

        let rows = qb
            .build_query_as::<RoleMenuRow>()
            .fetch_all(conn.as_mut())
            .await
            .map_err(db_err("querying role menus"))?;

        Ok(rows.into_iter().map(RoleMenu::from).collect())
    }

    async fn create(&self, ctx: &Ctx, role_menu: &RoleMenu) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("INSERT INTO role_menus (id, role_id, menu_id, action_id) VALUES ($1, $2, $3, $4)")
            .bind(role_menu.id)
            .bind(role_menu.role_id)
            .bind(role_menu.menu_id)
            .bind(role_menu.action_id)
            .execute(conn.as_mut())
            .await
            .map_err(db_err("creating role menu"))?;

        Ok(())
    }

    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("DELETE FROM role_menus WHERE id = $1")
            .bind(id)
            .execute(conn.as_mut())
            .await
            .map_err(db_err("deleting role menu"))?;

        Ok(())
    }

    async fn delete_by_role_id(&self, ctx: &Ctx, role_id: &Uuid) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("DELETE FROM role_menus WHERE role_id = $1")
            .bind(role_id)
            .execute(conn.as_mut())
            .await
            .map_err(db_err("deleting role menus by role"))?;

        Ok(())
    }
}
