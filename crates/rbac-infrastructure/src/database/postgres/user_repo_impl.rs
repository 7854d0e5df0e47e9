// ============================================================================
// RBAC Infrastructure - PostgreSQL User Repositories
// File: crates/rbac-infrastructure/src/database/postgres/user_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{error, info};
use uuid::Uuid;

use rbac_core::context::Ctx;
use rbac_core::domain::{Status, User, UserRole};
use rbac_core::error::DomainError;
use rbac_core::repositories::{UserQueryParam, UserRepository, UserRoleQueryParam, UserRoleRepository};
use rbac_shared::PageResult;

use super::transaction::{db_err, is_unique_violation, PgDb};

const USER_COLUMNS: &str = "id, user_name, real_name, password, email, phone, status, \
     created_at, created_by, modified_at, modified_by";

pub struct PgUserRepository {
    db: PgDb,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { db: PgDb::new(pool) }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct UserRow {
    pub id: Uuid,
    pub user_name: String,
    pub real_name: String,
    pub password: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<Uuid>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            user_name: row.user_name,
            real_name: row.real_name,
            password: row.password,
            email: row.email,
            phone: row.phone,
            status: Status::from_str(&row.status).unwrap_or_default(),
            user_roles: Vec::new(),
            created_at: row.created_at,
            created_by: row.created_by,
            modified_at: row.modified_at,
            modified_by: row.modified_by,
        }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &UserQueryParam) {
    if let Some(user_name) = &params.user_name {
        qb.push(" AND user_name = ").push_bind(user_name.clone());
    }
    if let Some(status) = params.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(role_ids) = &params.role_ids {
        qb.push(" AND id IN (SELECT user_id FROM user_roles WHERE role_id = ANY(")
            .push_bind(role_ids.clone())
            .push("))");
    }
    if let Some(value) = &params.query_value {
        let pattern = format!("%{}%", value);
        qb.push(" AND (user_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR real_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn query(&self, ctx: &Ctx, params: &UserQueryParam) -> Result<PageResult<User>, DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE 1 = 1");
        push_filters(&mut count, params);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(conn.as_mut())
            .await
            .map_err(db_err("counting users"))?;

        if params.pagination.only_count || total == 0 {
            return Ok(PageResult::count(total));
        }

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users WHERE 1 = 1", USER_COLUMNS));
        push_filters(&mut select, params);
        select.push(" ORDER BY created_at DESC");
        if params.pagination.paginate {
            select
                .push(" LIMIT ")
                .push_bind(params.pagination.limit())
                .push(" OFFSET ")
                .push_bind(params.pagination.offset());
        }
        select.push(PgDb::lock_clause(ctx));

        let rows = select
            .build_query_as::<UserRow>()
            .fetch_all(conn.as_mut())
            .await
            .map_err(db_err("querying users"))?;

        Ok(PageResult::new(rows.into_iter().map(User::from).collect(), total))
    }

    async fn get(&self, ctx: &Ctx, id: &Uuid) -> Result<Option<User>, DomainError> {
        let mut conn = self.db.conn(ctx).await?;
        let sql = format!("SELECT {} FROM users WHERE id = $1{}", USER_COLUMNS, PgDb::lock_clause(ctx));

        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(conn.as_mut())
            .await
            .map_err(db_err("finding user by id"))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_user_name(&self, ctx: &Ctx, user_name: &str) -> Result<Option<User>, DomainError> {
        let mut conn = self.db.conn(ctx).await?;
        let sql = format!("SELECT {} FROM users WHERE user_name = $1", USER_COLUMNS);

        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(user_name)
            .fetch_optional(conn.as_mut())
            .await
            .map_err(db_err("finding user by user_name"))?;

        Ok(row.map(|r| r.into()))
    }

    async fn create(&self, ctx: &Ctx, user: &User) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, user_name, real_name, password, email, phone, status,
                created_at, created_by, modified_at, modified_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.id)
        .bind(&user.user_name)
        .bind(&user.real_name)
        .bind(&user.password)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.status.as_str())
        .bind(user.created_at)
        .bind(user.created_by)
        .bind(user.modified_at)
        .bind(user.modified_by)
        .execute(conn.as_mut())
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error creating user: {}", e);
            if is_unique_violation(&e) {
                DomainError::UserNameAlreadyExists(user.user_name.clone())
            } else {
                DomainError::DatabaseError(e.to_string())
            }
        })?;

        info!("User row inserted: {}", user.id);
        Ok(())
    }

    async fn update(&self, ctx: &Ctx, user: &User) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query(
            r#"
            UPDATE users
            SET
                user_name = $2,
                real_name = $3,
                password = $4,
                email = $5,
                phone = $6,
                status = $7,
                modified_at = $8,
                modified_by = $9
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.user_name)
        .bind(&user.real_name)
        .bind(&user.password)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.status.as_str())
        .bind(user.modified_at)
        .bind(user.modified_by)
        .execute(conn.as_mut())
        .await
        .map_err(|e: sqlx::Error| {
            error!("Database error updating user: {}", e);
            if is_unique_violation(&e) {
                DomainError::UserNameAlreadyExists(user.user_name.clone())
            } else {
                DomainError::DatabaseError(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn update_status(&self, ctx: &Ctx, id: &Uuid, status: Status) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("UPDATE users SET status = $2, modified_at = NOW(), modified_by = $3 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .bind(ctx.user_id())
            .execute(conn.as_mut())
            .await
            .map_err(db_err("updating user status"))?;

        Ok(())
    }

    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(conn.as_mut())
            .await
            .map_err(db_err("deleting user"))?;

        Ok(())
    }
}

pub struct PgUserRoleRepository {
    db: PgDb,
}

impl PgUserRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { db: PgDb::new(pool) }
    }
}

#[derive(Debug, FromRow)]
struct UserRoleRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
}

impl From<UserRoleRow> for UserRole {
    fn from(row: UserRoleRow) -> Self {
        UserRole { id: row.id, user_id: row.user_id, role_id: row.role_id }
    }
}

#[async_trait]
impl UserRoleRepository for PgUserRoleRepository {
    async fn query(&self, ctx: &Ctx, params: &UserRoleQueryParam) -> Result<Vec<UserRole>, DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT id, user_id, role_id FROM user_roles WHERE 1 = 1");
        if let Some(user_id) = params.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(user_ids) = &params.user_ids {
            qb.push(" AND user_id = ANY(").push_bind(user_ids.clone()).push(")");
        }
        qb.push(PgDb::lock_clause(ctx));

        let rows = qb
            .build_query_as::<UserRoleRow>()
            .fetch_all(conn.as_mut())
            .await
            .map_err(db_err("querying user roles"))?;

        Ok(rows.into_iter().map(UserRole::from).collect())
    }

    async fn create(&self, ctx: &Ctx, user_role: &UserRole) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("INSERT INTO user_roles (id, user_id, role_id) VALUES ($1, $2, $3)")
            .bind(user_role.id)
            .bind(user_role.user_id)
            .bind(user_role.role_id)
            .execute(conn.as_mut())
            .await
            .map_err(db_err("creating user role"))?;

        Ok(())
    }

    async fn delete(&self, ctx: &Ctx, id: &Uuid) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("DELETE FROM user_roles WHERE id = $1")
            .bind(id)
            .execute(conn.as_mut())
            .await
            .map_err(db_err("deleting user role"))?;

        Ok(())
    }

    async fn delete_by_user_id(&self, ctx: &Ctx, user_id: &Uuid) -> Result<(), DomainError> {
        let mut conn = self.db.conn(ctx).await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(conn.as_mut())
            .await
            .map_err(db_err("deleting user roles by user"))?;

        Ok(())
    }
}
