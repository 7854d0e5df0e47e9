// ============================================================================
// RBAC Infrastructure - PostgreSQL Menu Action Repositories
// File: crates/rbac-infrastructure/src/database/postgres/menu_action_repo_impl.rs
// Description: Menu actions and the (method, path) resources they guard
// ============================================================================

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::error;
use uuid::Uuid;

use rbac_core::context::Ctx;
use rbac_core::domain::{MenuAction, MenuActionResource};
use rbac_core::error::DomainError;
use rbac_core::repositories::{
    MenuActionQueryParam, MenuActionRepository, MenuActionResourceQueryParam,
    MenuActionResourceRepository,
};

use super::transaction::{db_err, is_unique_violation, PgDb};

pub struct PgMenuActionRepository {
    db: PgDb,
}

impl PgMenuActionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { db: PgDb::new(pool) }
    }
}

#[derive(Debug, FromRow)]
struct MenuActionRow {
    pub id: Uuid,
    pub menu_id: Uuid,
    pub code: String,
    pub name: String,
}

impl From<MenuActionRow> for MenuAction {
    fn from(row: MenuActionRow) -> Self {
        MenuAction {
            id: row.id,
            menu_id: row.menu_id,
            code: row.code,
            name: row.name,
            resources: Vec::new(),
        }
    }
}

#[async_trait]
impl MenuActionRepository for PgMenuActionRepository {
    async fn query(&self, ctx: &Ctx, params: &MenuActionQueryParam) -> Result<Vec<MenuAction>, DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT id, menu_id, code, name FROM menu_actions WHERE 1 = 1");
        if let Some(menu_id) = params.menu_id {
            qb.push(" AND menu_id = ").push_bind(menu_id);
        }
        if let Some(ids) = &params.ids {
            qb.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
        }
        qb.push(" ORDER BY code").push(PgDb::lock_clause(ctx));

        let rows = qb
            .build_query_as::<MenuActionRow>()
            .fetch_all(conn.as_mut())
            .await
            .map_err(db_err("querying menu actions"))?;

        Ok(rows.into_iter().map(MenuAction::from).collect())
    }

    async fn create(&self, ctx: &Ctx, action: &MenuAction) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("INSERT INTO menu_actions (id, menu_id, code, name) VALUES ($1, $2, $3, $4)")
            .bind(action.id)
            .bind(action.menu_id)
            .bind(&action.code)
            .bind(&action.name)
            .execute(conn.as_mut())
            .await
            .map_err(|e: sqlx::Error| {
                error!("Database error creating menu action: {}", e);
                if is_unique_violation(&e) {
                    DomainError::ValidationError(format!("Duplicate action code: {}", action.code))
                } else {
                    DomainError::DatabaseError(e.to_string())
                }
            })?;

        Ok(())
    }

    async fn update(&self, ctx: &Ctx, action: &MenuAction) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("UPDATE menu_actions SET code = $2, name = $3 WHERE id = $1")
            .bind(action.id)
            .bind(&action.code)
            .bind(&action.name)
            .execute(conn.as_mut())
            .await
            .map_err(db_err("updating menu action"))?;

        Ok(())
    }

    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("DELETE FROM menu_actions WHERE id = $1")
            .bind(id)
            .execute(conn.as_mut())
            .await
            .map_err(db_err("deleting menu action"))?;

        Ok(())
    }

    async fn delete_by_menu_id(&self, ctx: &Ctx, menu_id: &Uuid) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("DELETE FROM menu_actions WHERE menu_id = $1")
            .bind(menu_id)
            .execute(conn.as_mut())
            .await
            .map_err(db_err("deleting menu actions by menu"))?;

        Ok(())
    }
}

pub struct PgMenuActionResourceRepository {
    db: PgDb,
}

impl PgMenuActionResourceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { db: PgDb::new(pool) }
    }
}

#[derive(Debug, FromRow)]
struct MenuActionResourceRow {
    pub id: Uuid,
    pub action_id: Uuid,
    pub method: String,
    pub path: String,
}

impl From<MenuActionResourceRow> for MenuActionResource {
    fn from(row: MenuActionResourceRow) -> Self {
        MenuActionResource {
            id: row.id,
            action_id: row.action_id,
            method: row.method,
            path: row.path,
        }
    }
}

#[async_trait]
impl MenuActionResourceRepository for PgMenuActionResourceRepository {
    async fn query(
        &self,
        ctx: &Ctx,
        params: &MenuActionResourceQueryParam,
    ) -> Result<Vec<MenuActionResource>, DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT id, action_id, method, path FROM menu_action_resources WHERE 1 = 1",
        );
        if let Some(menu_id) = params.menu_id {
            qb.push(" AND action_id IN (SELECT id FROM menu_actions WHERE menu_id = ")
                .push_bind(menu_id)
                .push(")");
        }
        if let Some(action_ids) = &params.action_ids {
            qb.push(" AND action_id = ANY(").push_bind(action_ids.clone()).push(")");
        }
        qb.push(" ORDER BY path, method").push(PgDb::lock_clause(ctx));

        let rows = qb
            .build_query_as::<MenuActionResourceRow>()
            .fetch_all(conn.as_mut())
            .await
            .map_err(db_err("querying menu action resources"))?;

        Ok(rows.into_iter().map(MenuActionResource::from).collect())
    }

    async fn create(&self, ctx: &Ctx, resource: &MenuActionResource) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("INSERT INTO menu_action_resources (id, action_id, method, path) VALUES ($1, $2, $3, $4)")
            .bind(resource.id)
            .bind(resource.action_id)
            .bind(&resource.method)
            .bind(&resource.path)
            .execute(conn.as_mut())
            .await
            .map_err(db_err("creating menu action resource"))?;

        Ok(())
    }

    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("DELETE FROM menu_action_resources WHERE id = $1")
            .bind(id)
            .execute(conn.as_mut())
            .await
            .map_err(db_err("deleting menu action resource"))?;

        Ok(())
    }

    async fn delete_by_action_id(&self, ctx: &Ctx, action_id: &Uuid) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("DELETE FROM menu_action_resources WHERE action_id = $1")
            .bind(action_id)
            .execute(conn.as_mut())
            .await
            .map_err(db_err("deleting resources by action"))?;

        Ok(())
    }

    async fn delete_by_menu_id(&self, ctx: &Ctx, menu_id: &Uuid) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query(
            r#"
            DELETE FROM menu_action_resources
            WHERE action_id IN (SELECT id FROM menu_actions WHERE menu_id = $1)
            "#,
        )
        .bind(menu_id)
        .execute(conn.as_mut())
        .await
        .map_err(db_err("deleting resources by menu"))?;

        Ok(())
    }
}
