// ============================================================================
// RBAC Core - Policy Reload Queue
// File: crates/rbac-core/src/policy/reload_queue.rs
// Description: Single-slot coalescing queue and the background worker that
//              reloads the enforcer
// ============================================================================
//! Mutations signal the queue after their transaction commits. The queue
//! holds at most one pending request: a signal arriving while one is already
//! waiting is absorbed, because the pending reload will read the latest
//! committed state anyway. Signalling never blocks and never fails the
//! caller.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use flume::{bounded, Receiver, Sender, TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use rbac_shared::constants::POLICY_QUEUE_CAPACITY;

use super::enforcer::PolicyEnforcer;
use crate::context::Ctx;

/// Reload trigger. Carries the caller's identity for logging only.
#[derive(Debug, Clone)]
pub struct ReloadRequest {
    pub trace_id: String,
    pub requested_by: Option<Uuid>,
    pub requested_at: DateTime<Utc>,
}

impl ReloadRequest {
    fn from_ctx(ctx: &Ctx) -> Self {
        Self {
            trace_id: ctx.trace_id().to_string(),
            requested_by: ctx.user_id(),
            requested_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Policy engine switched off.
    Disabled,
    /// Issued inside an open transaction; its owner signals after commit.
    Deferred,
    Queued,
    /// A request was already pending and absorbed this one.
    Coalesced,
    /// Worker has stopped.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    Idle,
    Queued,
    Reloading,
}

#[derive(Default)]
struct Counters {
    reloading: AtomicBool,
    signals: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Handle used by mutations to request a policy reload.
#[derive(Clone)]
pub struct PolicyReloadQueue {
    enabled: bool,
    sender: Sender<ReloadRequest>,
    counters: Arc<Counters>,
}

/// Background worker owning the receiving side of the queue.
pub struct ReloadWorker {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl PolicyReloadQueue {
    /// Creates the queue and spawns its worker on the current runtime.
    pub fn start(enforcer: Arc<dyn PolicyEnforcer>) -> (Self, ReloadWorker) {
        let (sender, receiver) = bounded(POLICY_QUEUE_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let counters = Arc::new(Counters::default());

        info!("Initializing policy reload queue: capacity={}", POLICY_QUEUE_CAPACITY);

        let worker_counters = counters.clone();
        let handle = tokio::spawn(async move {
            Self::worker_loop(enforcer, receiver, shutdown_rx, worker_counters).await;
        });

        (
            Self { enabled: true, sender, counters },
            ReloadWorker { shutdown: shutdown_tx, handle },
        )
    }

    /// Queue for a deployment without a policy engine. Every signal is a no-op.
    pub fn disabled() -> Self {
        let (sender, _receiver) = bounded(POLICY_QUEUE_CAPACITY);
        Self { enabled: false, sender, counters: Arc::new(Counters::default()) }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Requests a reload without waiting for it.
    pub fn signal(&self, ctx: &Ctx) -> SignalOutcome {
        if !self.enabled {
            return SignalOutcome::Disabled;
        }
        if ctx.in_trans() {
            debug!(trace_id = %ctx.trace_id(), "Policy reload deferred to the enclosing transaction");
            return SignalOutcome::Deferred;
        }

        self.counters.signals.fetch_add(1, Ordering::Relaxed);
        match self.sender.try_send(ReloadRequest::from_ctx(ctx)) {
            Ok(()) => {
                debug!(trace_id = %ctx.trace_id(), "Policy reload queued");
                SignalOutcome::Queued
            }
            Err(TrySendError::Full(_)) => {
                debug!(trace_id = %ctx.trace_id(), "Policy reload already pending, signal coalesced");
                SignalOutcome::Coalesced
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!(trace_id = %ctx.trace_id(), "Policy reload worker is not running, signal dropped");
                SignalOutcome::Closed
            }
        }
    }

    /// Requests waiting in the slot (0 or 1).
    pub fn pending(&self) -> usize {
        self.sender.len()
    }

    /// Point-in-time view. A request being picked up by the worker may be
    /// briefly reported as `Idle`.
    pub fn state(&self) -> ReloadState {
        if self.pending() > 0 {
            ReloadState::Queued
        } else if self.counters.reloading.load(Ordering::Acquire) {
            ReloadState::Reloading
        } else {
            ReloadState::Idle
        }
    }

    /// Signals accepted while enabled, including coalesced ones.
    pub fn signal_count(&self) -> u64 {
        self.counters.signals.load(Ordering::Relaxed)
    }

    /// Reloads finished by the worker, successful or not.
    pub fn completed_reloads(&self) -> u64 {
        self.counters.completed.load(Ordering::Acquire)
    }

    pub fn failed_reloads(&self) -> u64 {
        self.counters.failed.load(Ordering::Acquire)
    }

    async fn worker_loop(
        enforcer: Arc<dyn PolicyEnforcer>,
        receiver: Receiver<ReloadRequest>,
        mut shutdown: oneshot::Receiver<()>,
        counters: Arc<Counters>,
    ) {
        info!("Policy reload worker started");

        loop {
            tokio::select! {
                request = receiver.recv_async() => match request {
                    Ok(request) => Self::reload(enforcer.as_ref(), &counters, request).await,
                    Err(_) => {
                        info!("Policy reload worker shutting down (channel closed)");
                        return;
                    }
                },
                _ = &mut shutdown => {
                    // drain the slot so a committed change is not left unapplied
                    while let Ok(request) = receiver.try_recv() {
                        Self::reload(enforcer.as_ref(), &counters, request).await;
                    }
                    info!("Policy reload worker stopped");
                    return;
                }
            }
        }
    }

    async fn reload(enforcer: &dyn PolicyEnforcer, counters: &Counters, request: ReloadRequest) {
        counters.reloading.store(true, Ordering::Release);
        let start = Instant::now();

        let mut ctx = Ctx::new().with_trace_id(request.trace_id.clone());
        if let Some(user_id) = request.requested_by {
            ctx = ctx.with_user_id(user_id);
        }

        match enforcer.load_policy(&ctx).await {
            Ok(stats) => {
                info!(
                    trace_id = %request.trace_id,
                    roles = stats.roles,
                    permissions = stats.permissions,
                    groupings = stats.groupings,
                    "Policy reloaded in {:?} (queued for {}ms)",
                    start.elapsed(),
                    (Utc::now() - request.requested_at).num_milliseconds()
                );
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::AcqRel);
                error!(trace_id = %request.trace_id, "Policy reload failed: {}", e);
            }
        }

        counters.reloading.store(false, Ordering::Release);
        counters.completed.fetch_add(1, Ordering::AcqRel);
    }

    /// Queue wired to a bare receiver, without a worker.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, Receiver<ReloadRequest>) {
        let (sender, receiver) = bounded(POLICY_QUEUE_CAPACITY);
        (Self { enabled: true, sender, counters: Arc::new(Counters::default()) }, receiver)
    }
}

impl ReloadWorker {
    /// Stops the worker after applying any pending request.
    pub async fn shutdown(self) {
        // the worker may already be gone if the channel closed
        let _ = self.shutdown.send(());
        if let Err(e) = self.handle.await {
            error!("Policy reload worker terminated abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::context::TxHandle;
    use crate::error::DomainError;
    use crate::policy::enforcer::{MockPolicyEnforcer, PolicyStats};

    async fn wait_for_completed(queue: &PolicyReloadQueue, n: u64) {
        for _ in 0..200 {
            if queue.completed_reloads() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("worker did not complete {} reloads", n);
    }

    #[test]
    fn test_disabled_queue_ignores_signals() {
        let queue = PolicyReloadQueue::disabled();
        assert_eq!(queue.signal(&Ctx::new()), SignalOutcome::Disabled);
        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.signal_count(), 0);
    }

    #[test]
    fn test_burst_coalesces_into_one_request() {
        let (queue, receiver) = PolicyReloadQueue::detached();
        let ctx = Ctx::new().with_trace_id("first");

        assert_eq!(queue.signal(&ctx), SignalOutcome::Queued);
        for _ in 0..10 {
            assert_eq!(queue.signal(&Ctx::new()), SignalOutcome::Coalesced);
        }
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.state(), ReloadState::Queued);
        assert_eq!(queue.signal_count(), 11);

        let request = receiver.try_recv().unwrap();
        assert_eq!(request.trace_id, "first");
        assert!(receiver.try_recv().is_err());

        // slot freed: the next signal queues again
        assert_eq!(queue.signal(&Ctx::new()), SignalOutcome::Queued);
    }

    #[test]
    fn test_request_carries_caller_identity_only() {
        let (queue, receiver) = PolicyReloadQueue::detached();
        let user = Uuid::new_v4();
        let ctx = Ctx::new().with_trace_id("t-9").with_user_id(user);

        queue.signal(&ctx);
        let request = receiver.try_recv().unwrap();
        assert_eq!(request.trace_id, "t-9");
        assert_eq!(request.requested_by, Some(user));
    }

    #[test]
    fn test_signal_inside_transaction_is_deferred() {
        let (queue, receiver) = PolicyReloadQueue::detached();
        let tx = Ctx::new().with_trans(TxHandle::new(()));

        assert_eq!(queue.signal(&tx), SignalOutcome::Deferred);
        assert!(receiver.try_recv().is_err());
        assert_eq!(queue.signal(&tx.detached()), SignalOutcome::Queued);
    }

    #[tokio::test]
    async fn test_worker_reloads_on_signal() {
        let mut mock = MockPolicyEnforcer::new();
        mock.expect_load_policy()
            .times(1)
            .returning(|_| Ok(PolicyStats { roles: 1, permissions: 2, groupings: 1 }));
        let enforcer = Arc::new(mock);

        let (queue, worker) = PolicyReloadQueue::start(enforcer.clone());
        assert_eq!(queue.signal(&Ctx::new()), SignalOutcome::Queued);

        wait_for_completed(&queue, 1).await;
        assert_eq!(queue.failed_reloads(), 0);
        assert_eq!(queue.state(), ReloadState::Idle);
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_worker_running() {
        let mut mock = MockPolicyEnforcer::new();
        mock.expect_load_policy()
            .times(2)
            .returning(|_| Err(DomainError::PolicyLoadError("adapter offline".into())));
        let enforcer = Arc::new(mock);

        let (queue, worker) = PolicyReloadQueue::start(enforcer.clone());
        queue.signal(&Ctx::new());
        wait_for_completed(&queue, 1).await;

        queue.signal(&Ctx::new());
        wait_for_completed(&queue, 2).await;

        assert_eq!(queue.failed_reloads(), 2);
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_drains_pending_request() {
        let mut mock = MockPolicyEnforcer::new();
        mock.expect_load_policy()
            .times(1)
            .returning(|_| Ok(PolicyStats::default()));
        let enforcer = Arc::new(mock);

        let (queue, worker) = PolicyReloadQueue::start(enforcer.clone());
        queue.signal(&Ctx::new());
        worker.shutdown().await;

        assert_eq!(queue.completed_reloads(), 1);
        assert_eq!(queue.signal(&Ctx::new()), SignalOutcome::Closed);
    }
}
