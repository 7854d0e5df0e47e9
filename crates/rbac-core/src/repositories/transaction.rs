// ============================================================================
// RBAC Core - Transaction Port
// File: crates/rbac-core/src/repositories/transaction.rs
// Description: Begin/commit/rollback port and the join-or-begin runner
// ============================================================================

use std::future::Future;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::context::Ctx;
use crate::error::DomainError;

#[async_trait]
pub trait TransactionManager: Send + Sync {
    /// Opens a transaction and returns a context carrying it.
    async fn begin(&self, ctx: &Ctx) -> Result<Ctx, DomainError>;
    async fn commit(&self, ctx: &Ctx) -> Result<(), DomainError>;
    async fn rollback(&self, ctx: &Ctx) -> Result<(), DomainError>;
}

/// Runs `f` inside a transaction.
///
/// When `ctx` already carries one, `f` joins it and the outer owner decides
/// the outcome. Otherwise a new transaction is opened, committed when `f`
/// succeeds and rolled back when it fails.
pub async fn exec_trans<T, F, Fut>(
    tm: &dyn TransactionManager,
    ctx: &Ctx,
    f: F,
) -> Result<T, DomainError>
where
    F: FnOnce(Ctx) -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    if ctx.in_trans() {
        return f(ctx.clone()).await;
    }

    let tx = tm.begin(ctx).await?;
    debug!(trace_id = %tx.trace_id(), "Transaction started");

    match f(tx.clone()).await {
        Ok(value) => {
            tm.commit(&tx).await?;
            debug!(trace_id = %tx.trace_id(), "Transaction committed");
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tm.rollback(&tx).await {
                error!(trace_id = %tx.trace_id(), "Rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

/// Same as [`exec_trans`], but reads issued inside take row locks.
pub async fn exec_trans_with_lock<T, F, Fut>(
    tm: &dyn TransactionManager,
    ctx: &Ctx,
    f: F,
) -> Result<T, DomainError>
where
    F: FnOnce(Ctx) -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    let ctx = ctx.with_trans_lock();
    exec_trans(tm, &ctx, f).await
}
