// ============================================================================
// RBAC Infrastructure - PostgreSQL Menu Repository
// File: crates/rbac-infrastructure/src/database/postgres/menu_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{error, info};
use uuid::Uuid;

use rbac_core::context::Ctx;
use rbac_core::domain::{Menu, ShowStatus, Status};
use rbac_core::error::DomainError;
use rbac_core::repositories::{MenuQueryParam, MenuRepository};
use rbac_shared::PageResult;

use super::transaction::{db_err, is_unique_violation, PgDb};

const MENU_COLUMNS: &str = "id, name, sequence, icon, router, parent_id, parent_path, \
     show_status, status, memo, created_at, created_by, modified_at, modified_by";

pub struct PgMenuRepository {
    db: PgDb,
}

impl PgMenuRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { db: PgDb::new(pool) }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct MenuRow {
    pub id: Uuid,
    pub name: String,
    pub sequence: i32,
    pub icon: Option<String>,
    pub router: Option<String>,
    pub parent_id: Option<Uuid>,
    pub parent_path: String,
    pub show_status: String,
    pub status: String,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<Uuid>,
}

impl From<MenuRow> for Menu {
    fn from(row: MenuRow) -> Self {
        Menu {
            id: row.id,
            name: row.name,
            sequence: row.sequence,
            icon: row.icon,
            router: row.router,
            parent_id: row.parent_id,
            parent_path: row.parent_path,
            show_status: ShowStatus::from_str(&row.show_status).unwrap_or_default(),
            status: Status::from_str(&row.status).unwrap_or_default(),
            memo: row.memo,
            actions: Vec::new(),
            created_at: row.created_at,
            created_by: row.created_by,
            modified_at: row.modified_at,
            modified_by: row.modified_by,
        }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &MenuQueryParam) {
    if let Some(ids) = &params.ids {
        qb.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
    }
    if let Some(name) = &params.name {
        qb.push(" AND name = ").push_bind(name.clone());
    }
    match params.parent_id {
        Some(Some(parent_id)) => {
            qb.push(" AND parent_id = ").push_bind(parent_id);
        }
        Some(None) => {
            qb.push(" AND parent_id IS NULL");
        }
        None => {}
    }
    if let Some(prefix) = &params.prefix_parent_path {
        qb.push(" AND (parent_path = ")
            .push_bind(prefix.clone())
            .push(" OR parent_path LIKE ")
            .push_bind(format!("{}/%", prefix))
            .push(")");
    }
    if let Some(status) = params.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(show_status) = params.show_status {
        qb.push(" AND show_status = ").push_bind(show_status.as_str());
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
impl MenuRepository for PgMenuRepository {
    async fn query(&self, ctx: &Ctx, params: &MenuQueryParam) -> Result<PageResult<Menu>, DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM menus WHERE 1 = 1");
        push_filters(&mut count, params);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(conn.as_mut())
            .await
            .map_err(db_err("counting menus"))?;

        if params.pagination.only_count || total == 0 {
            return Ok(PageResult::count(total));
        }

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM menus WHERE 1 = 1", MENU_COLUMNS));
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

        let rows: Vec<MenuRow> = select
            .build_query_as::<MenuRow>()
            .fetch_all(conn.as_mut())
            .await
            .map_err(db_err("querying menus"))?;

        Ok(PageResult::new(rows.into_iter().map(Menu::from).collect(), total))
    }

    async fn get(&self, ctx: &Ctx, id: &Uuid) -> Result<Option<Menu>, DomainError> {
        let mut conn = self.db.conn(ctx).await?;
        let sql = format!("SELECT {} FROM menus WHERE id = $1{}", MENU_COLUMNS, PgDb::lock_clause(ctx));

        let row: Option<MenuRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(conn.as_mut())
            .await
            .map_err(db_err("finding menu by id"))?;

        Ok(row.map(|r| r.into()))
    }

    async fn create(&self, ctx: &Ctx, menu: &Menu) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query(
            r#"
            INSERT INTO menus (
                id, name, sequence, icon, router, parent_id, parent_path,
                show_status, status, memo,
                created_at, created_by, modified_at, modified_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(menu.id)
        .bind(&menu.name)
        .bind(menu.sequence)
        .bind(&menu.icon)
        .bind(&menu.router)
        .bind(menu.parent_id)
        .bind(&menu.parent_path)
        .bind(menu.show_status.as_str())
        .bind(menu.status.as_str())
        .bind(&menu.memo)
        .bind(menu.created_at)
        .bind(menu.created_by)
        .bind(menu.modified_at)
        .bind(menu.modified_by)
        .execute(conn.as_mut())
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error creating menu: {}", e);
            if is_unique_violation(&e) {
                DomainError::MenuNameAlreadyExists(menu.name.clone())
            } else {
                DomainError::DatabaseError(e.to_string())
            }
        })?;

        info!("Menu row inserted: {}", menu.id);
        Ok(())
    }

    async fn update(&self, ctx: &Ctx, menu: &Menu) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query(
            r#"
            UPDATE menus
            SET
                name = $2,
                sequence = $3,
                icon = $4,
                router = $5,
                parent_id = $6,
                parent_path = $7,
                show_status = $8,
                status = $9,
                memo = $10,
                modified_at = $11,
                modified_by = $12
            WHERE id = $1
            "#,
        )
        .bind(menu.id)
        .bind(&menu.name)
        .bind(menu.sequence)
        .bind(&menu.icon)
        .bind(&menu.router)
        .bind(menu.parent_id)
        .bind(&menu.parent_path)
        .bind(menu.show_status.as_str())
        .bind(menu.status.as_str())
        .bind(&menu.memo)
        .bind(menu.modified_at)
        .bind(menu.modified_by)
        .execute(conn.as_mut())
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error updating menu: {}", e);
            if is_unique_violation(&e) {
                DomainError::MenuNameAlreadyExists(menu.name.clone())
            } else {
                DomainError::DatabaseError(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn update_parent_path(&self, ctx: &Ctx, id: &Uuid, parent_path: &str) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("UPDATE menus SET parent_path = $2 WHERE id = $1")
            .bind(id)
            .bind(parent_path)
            .execute(conn.as_mut())
            .await
            .map_err(db_err("updating menu parent path"))?;

        Ok(())
    }

    async fn update_status(&self, ctx: &Ctx, id: &Uuid, status: Status) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("UPDATE menus SET status = $2, modified_at = NOW(), modified_by = $3 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .bind(ctx.user_id())
            .execute(conn.as_mut())
            .await
            .map_err(db_err("updating menu status"))?;

        Ok(())
    }

    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(conn.as_mut())
            .await
            .map_err(db_err("deleting menu"))?;

        Ok(())
    }
}
