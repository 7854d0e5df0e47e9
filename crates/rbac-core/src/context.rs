// ============================================================================
// RBAC Core - Request Context
// File: crates/rbac-core/src/context.rs
// Description: Per-request context carrying trace id, actor and the ambient
//              transaction handle shared by nested repository calls
// ============================================================================

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

/// Opaque transaction handle. Only the repository layer that created it
/// knows the concrete type and downcasts it back.
#[derive(Clone)]
pub struct TxHandle(Arc<dyn Any + Send + Sync>);

impl TxHandle {
    pub fn new<T: Any + Send + Sync>(inner: T) -> Self {
        Self(Arc::new(inner))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.0).downcast_ref::<T>()
    }
}

impl fmt::Debug for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TxHandle(..)")
    }
}

/// Request context threaded through services and repositories.
///
/// Cloning is cheap. A context that carries a transaction makes every
/// repository call issued with it join that transaction.
#[derive(Debug, Clone)]
pub struct Ctx {
    trace_id: String,
    user_id: Option<Uuid>,
    trans: Option<TxHandle>,
    trans_lock: bool,
}

impl Default for Ctx {
    fn default() -> Self {
        Self::new()
    }
}

impl Ctx {
    /// Fresh context with a generated trace id and no actor.
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4().simple().to_string(),
            user_id: None,
            trans: None,
            trans_lock: false,
        }
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_trans(&self, handle: TxHandle) -> Self {
        let mut ctx = self.clone();
        ctx.trans = Some(handle);
        ctx
    }

    /// Reads issued with the returned context take row locks.
    pub fn with_trans_lock(&self) -> Self {
        let mut ctx = self.clone();
        ctx.trans_lock = true;
        ctx
    }

    /// Same trace and actor, detached from any transaction.
    pub fn detached(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            user_id: self.user_id,
            trans: None,
            trans_lock: false,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn trans(&self) -> Option<&TxHandle> {
        self.trans.as_ref()
    }

    pub fn in_trans(&self) -> bool {
        self.trans.is_some()
    }

    pub fn trans_lock(&self) -> bool {
        self.trans_lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_trans_keeps_trace() {
        let ctx = Ctx::new().with_trace_id("t-1");
        let tx = ctx.with_trans(TxHandle::new(7u64));

        assert!(!ctx.in_trans());
        assert!(tx.in_trans());
        assert_eq!(tx.trace_id(), "t-1");
        assert_eq!(tx.trans().and_then(|h| h.downcast_ref::<u64>()), Some(&7));
    }

    #[test]
    fn test_detached_drops_transaction_and_lock() {
        let user = Uuid::new_v4();
        let ctx = Ctx::new()
            .with_user_id(user)
            .with_trans(TxHandle::new(()))
            .with_trans_lock();

        let detached = ctx.detached();
        assert!(!detached.in_trans());
        assert!(!detached.trans_lock());
        assert_eq!(detached.user_id(), Some(user));
        assert_eq!(detached.trace_id(), ctx.trace_id());
    }

    #[test]
    fn test_downcast_wrong_type() {
        let handle = TxHandle::new(String::from("tx"));
        assert!(handle.downcast_ref::<u32>().is_none());
    }
}
