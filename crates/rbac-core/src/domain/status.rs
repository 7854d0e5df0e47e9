// ============================================================================
// RBAC Core - Status Enums
// File: crates/rbac-core/src/domain/status.rs
// ============================================================================

use serde::{Deserialize, Serialize};

/// Enablement of a menu, role or user. Only enabled entities contribute
/// rules to the policy engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Enabled,
    Disabled,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Enabled => "enabled",
            Status::Disabled => "disabled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "enabled" => Some(Status::Enabled),
            "disabled" => Some(Status::Disabled),
            _ => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Status::Enabled)
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Enabled
    }
}

/// Navigation visibility of a menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowStatus {
    Show,
    Hide,
}

impl ShowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShowStatus::Show => "show",
            ShowStatus::Hide => "hide",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "show" => Some(ShowStatus::Show),
            "hide" => Some(ShowStatus::Hide),
            _ => None,
        }
    }
}

impl Default for ShowStatus {
    fn default() -> Self {
        ShowStatus::Show
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        assert_eq!(Status::from_str(Status::Disabled.as_str()), Some(Status::Disabled));
        assert_eq!(Status::from_str("ENABLED"), Some(Status::Enabled));
        assert_eq!(Status::from_str("archived"), None);
    }

    #[test]
    fn test_show_status_default() {
        assert_eq!(ShowStatus::default(), ShowStatus::Show);
        assert_eq!(ShowStatus::from_str("hide"), Some(ShowStatus::Hide));
    }
}
