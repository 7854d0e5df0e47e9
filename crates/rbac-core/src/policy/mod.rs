//! Policy engine integration
//!
//! The relational model is the source of truth. The enforcer holds a
//! derived rule set that is rebuilt wholesale through the reload queue
//! whenever a committed change may have altered it.

pub mod adapter;
pub mod enforcer;
pub mod matcher;
pub mod reload_queue;

pub use adapter::{PolicyAdapter, RepositoryPolicyAdapter};
pub use enforcer::{MemoryEnforcer, PolicyEnforcer, PolicySet, PolicyStats};
pub use reload_queue::{PolicyReloadQueue, ReloadRequest, ReloadState, ReloadWorker, SignalOutcome};
