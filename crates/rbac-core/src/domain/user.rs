// ============================================================================
// RBAC Core - User Entity
// File: crates/rbac-core/src/domain/user.rs
// Description: Managed user account and its role bindings
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::status::Status;

/// User entity. `password` holds the Argon2 PHC string, never plaintext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
    pub real_name: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Status,

    #[serde(default)]
    pub user_roles: Vec<UserRole>,

    // Audit fields
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<Uuid>,
}

impl User {
    pub fn from_form(form: &UserForm, password_hash: String, created_by: Option<Uuid>) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            user_name: form.user_name.clone(),
            real_name: form.real_name.clone(),
            password: password_hash,
            email: form.email.clone(),
            phone: form.phone.clone(),
            status: form.status,
            user_roles: UserRole::from_role_ids(id, &form.role_ids),
            created_at: Utc::now(),
            created_by,
            modified_at: None,
            modified_by: None,
        }
    }

    /// Copy carrying the form's values; keeps identity and creation audit.
    pub fn apply_form(&self, form: &UserForm, password_hash: String, modified_by: Option<Uuid>) -> Self {
        Self {
            id: self.id,
            user_name: form.user_name.clone(),
            real_name: form.real_name.clone(),
            password: password_hash,
            email: form.email.clone(),
            phone: form.phone.clone(),
            status: form.status,
            user_roles: UserRole::from_role_ids(self.id, &form.role_ids),
            created_at: self.created_at,
            created_by: self.created_by,
            modified_at: Some(Utc::now()),
            modified_by,
        }
    }

    pub fn role_ids(&self) -> Vec<Uuid> {
        self.user_roles.iter().map(|ur| ur.role_id).collect()
    }
}

/// Binding of a user to a role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRole {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
}

impl UserRole {
    pub fn new(user_id: Uuid, role_id: Uuid) -> Self {
        Self { id: Uuid::new_v4(), user_id, role_id }
    }

    fn from_role_ids(user_id: Uuid, role_ids: &[Uuid]) -> Vec<Self> {
        role_ids.iter().map(|role_id| UserRole::new(user_id, *role_id)).collect()
    }
}

/// Caller-supplied user values. On update an absent or empty `password`
/// keeps the stored hash.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UserForm {
    #[validate(length(min = 1, max = 64, message = "User name must be between 1 and 64 characters"))]
    pub user_name: String,

    #[validate(length(min = 1, max = 64, message = "Real name must be between 1 and 64 characters"))]
    pub real_name: String,

    pub password: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 32))]
    pub phone: Option<String>,

    #[serde(default)]
    pub status: Status,

    #[serde(default)]
    pub role_ids: Vec<Uuid>,
}

impl UserForm {
    /// Plain password when one was supplied and is non-empty.
    pub fn new_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> UserForm {
        UserForm {
            user_name: "alice".into(),
            real_name: "Alice".into(),
            password: Some(String::new()),
            email: None,
            phone: None,
            status: Status::Enabled,
            role_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
        }
    }

    #[test]
    fn test_empty_password_is_not_a_new_password() {
        let mut f = form();
        assert_eq!(f.new_password(), None);
        f.password = None;
        assert_eq!(f.new_password(), None);
        f.password = Some("secret1".into());
        assert_eq!(f.new_password(), Some("secret1"));
    }

    #[test]
    fn test_from_form_binds_roles() {
        let f = form();
        let user = User::from_form(&f, "hash".into(), None);
        assert_eq!(user.role_ids(), f.role_ids);
        assert!(user.user_roles.iter().all(|ur| ur.user_id == user.id));
    }

    #[test]
    fn test_password_never_serialized() {
        let user = User::from_form(&form(), "$argon2id$secret".into(), None);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
    }
}
