//! # RBAC Security
//!
//! Credential hashing for managed users.

pub mod password;

pub use password::{PasswordError, PasswordService};
