//! # RBAC Core
//!
//! Domain entities, repository ports, and the authorization-graph services:
//! menu tree maintenance, association diffing, and the policy reload queue
//! that keeps the enforcer in step with the relational model.

pub mod context;
pub mod domain;
pub mod error;
pub mod policy;
pub mod repositories;
pub mod services;

// Re-export domain entities
pub use context::Ctx;
pub use domain::*;
pub use error::{DomainError, ErrorKind};
