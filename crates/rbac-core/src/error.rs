//! Domain errors

use thiserror::Error;
use uuid::Uuid;

/// How a failure surfaces to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    /// Rejected request: detected before any write.
    Conflict,
    Internal,
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Menu not found: {0}")]
    MenuNotFound(Uuid),

    #[error("Parent menu not found: {0}")]
    ParentNotFound(Uuid),

    #[error("Role not found: {0}")]
    RoleNotFound(Uuid),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Menu name already exists under the same parent: {0}")]
    MenuNameAlreadyExists(String),

    #[error("Role name already exists: {0}")]
    RoleNameAlreadyExists(String),

    #[error("User name already exists: {0}")]
    UserNameAlreadyExists(String),

    #[error("User name is reserved: {0}")]
    ReservedUserName(String),

    #[error("Invalid parent for menu {0}: a menu cannot be placed under itself or its descendants")]
    InvalidParent(Uuid),

    #[error("Menu {0} cannot be deleted while it has children")]
    MenuHasChildren(Uuid),

    #[error("Role {0} cannot be deleted while users are assigned to it")]
    RoleInUse(Uuid),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Password hash error: {0}")]
    PasswordHashError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Policy load error: {0}")]
    PolicyLoadError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::MenuNotFound(_)
            | DomainError::ParentNotFound(_)
            | DomainError::RoleNotFound(_)
            | DomainError::UserNotFound(_) => ErrorKind::NotFound,

            DomainError::MenuNameAlreadyExists(_)
            | DomainError::RoleNameAlreadyExists(_)
            | DomainError::UserNameAlreadyExists(_)
            | DomainError::ReservedUserName(_)
            | DomainError::InvalidParent(_)
            | DomainError::MenuHasChildren(_)
            | DomainError::RoleInUse(_)
            | DomainError::ValidationError(_) => ErrorKind::Conflict,

            DomainError::PasswordHashError(_)
            | DomainError::DatabaseError(_)
            | DomainError::TransactionError(_)
            | DomainError::PolicyLoadError(_)
            | DomainError::InternalError(_) => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DomainError::ValidationError(errors.to_string())
    }
}

impl From<rbac_security::PasswordError> for DomainError {
    fn from(error: rbac_security::PasswordError) -> Self {
        match error {
            rbac_security::PasswordError::InvalidLength { .. } => {
                DomainError::ValidationError(error.to_string())
            }
            rbac_security::PasswordError::HashError(msg) => DomainError::PasswordHashError(msg),
        }
    }
}
