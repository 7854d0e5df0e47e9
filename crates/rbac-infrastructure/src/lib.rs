//! # RBAC Infrastructure
//!
//! PostgreSQL implementations of the rbac-core repository ports.

pub mod database;

pub use database::{create_pool, run_migrations, PgRepositories, PgTransactionManager};
