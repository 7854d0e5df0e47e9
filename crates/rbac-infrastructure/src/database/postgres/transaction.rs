// ============================================================================
// RBAC Infrastructure - PostgreSQL Transactions
// File: crates/rbac-infrastructure/src/database/postgres/transaction.rs
// Description: Transaction manager and the connection routing shared by all
//              repositories (open transaction from Ctx, otherwise the pool)
// ============================================================================

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, error};

use rbac_core::context::{Ctx, TxHandle};
use rbac_core::error::DomainError;
use rbac_core::repositories::TransactionManager;

/// Open transaction stored in a [`TxHandle`]. Taken out on commit/rollback.
struct PgTx(Mutex<Option<Transaction<'static, Postgres>>>);

/// Connection a single statement runs on.
pub(crate) enum Conn<'a> {
    Pool(PoolConnection<Postgres>),
    Tx(MappedMutexGuard<'a, Transaction<'static, Postgres>>),
}

impl Conn<'_> {
    pub(crate) fn as_mut(&mut self) -> &mut PgConnection {
        match self {
            Conn::Pool(conn) => &mut **conn,
            Conn::Tx(tx) => &mut ***tx,
        }
    }
}

/// Pool handle shared by the repositories.
#[derive(Clone)]
pub(crate) struct PgDb {
    pool: PgPool,
}

impl PgDb {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Joins the transaction carried by `ctx`, or checks out a pooled connection.
    pub(crate) async fn conn<'a>(&self, ctx: &'a Ctx) -> Result<Conn<'a>, DomainError> {
        match ctx.trans() {
            Some(handle) => {
                let tx = pg_tx(handle)?;
                let guard = tx.0.lock().await;
                MutexGuard::try_map(guard, |slot| slot.as_mut())
                    .map(Conn::Tx)
                    .map_err(|_| DomainError::TransactionError("transaction already finished".into()))
            }
            None => self
                .pool
                .acquire()
                .await
                .map(Conn::Pool)
                .map_err(db_err("acquiring connection")),
        }
    }

    /// ` FOR UPDATE` when the caller asked for row locks inside a transaction.
    pub(crate) fn lock_clause(ctx: &Ctx) -> &'static str {
        if ctx.in_trans() && ctx.trans_lock() {
            " FOR UPDATE"
        } else {
            ""
        }
    }
}

fn pg_tx(handle: &TxHandle) -> Result<&PgTx, DomainError> {
    handle
        .downcast_ref::<PgTx>()
        .ok_or_else(|| DomainError::TransactionError("transaction handle is not a PostgreSQL transaction".into()))
}

/// Logs a failed statement and converts it to a storage error.
pub(crate) fn db_err(action: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e: sqlx::Error| {
        error!("Database error {}: {}", action, e);
        DomainError::DatabaseError(e.to_string())
    }
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error().is_some_and(|db| db.is_unique_violation())
}

pub struct PgTransactionManager {
    pool: PgPool,
}

impl PgTransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn take(ctx: &Ctx) -> Result<Transaction<'static, Postgres>, DomainError> {
        let handle = ctx
            .trans()
            .ok_or_else(|| DomainError::TransactionError("no open transaction".into()))?;
        pg_tx(handle)?
            .0
            .lock()
            .await
            .take()
            .ok_or_else(|| DomainError::TransactionError("transaction already finished".into()))
    }
}

#[async_trait]
impl TransactionManager for PgTransactionManager {
    async fn begin(&self, ctx: &Ctx) -> Result<Ctx, DomainError> {
        let tx = self.pool.begin().await.map_err(|e: sqlx::Error| {
            error!(trace_id = %ctx.trace_id(), "Failed to begin transaction: {}", e);
            DomainError::TransactionError(e.to_string())
        })?;
        debug!(trace_id = %ctx.trace_id(), "Transaction started");
        Ok(ctx.with_trans(TxHandle::new(PgTx(Mutex::new(Some(tx))))))
    }

    async fn commit(&self, ctx: &Ctx) -> Result<(), DomainError> {
        Self::take(ctx).await?.commit().await.map_err(|e: sqlx::Error| {
            error!(trace_id = %ctx.trace_id(), "Failed to commit transaction: {}", e);
            DomainError::TransactionError(e.to_string())
        })?;
        debug!(trace_id = %ctx.trace_id(), "Transaction committed");
        Ok(())
    }

    async fn rollback(&self, ctx: &Ctx) -> Result<(), DomainError> {
        Self::take(ctx).await?.rollback().await.map_err(|e: sqlx::Error| {
            error!(trace_id = %ctx.trace_id(), "Failed to roll back transaction: {}", e);
            DomainError::TransactionError(e.to_string())
        })?;
        debug!(trace_id = %ctx.trace_id(), "Transaction rolled back");
        Ok(())
    }
}
