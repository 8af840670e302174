//! Closed enumerations used across the document model.

use serde::{Deserialize, Serialize};

/// User role. The single authorization discriminator in the system: every
/// permission predicate is a function of this value plus ownership fields
/// on the target document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Supervisor,
    Coordinator,
    Admin,
}

impl Role {
    /// Whether this role may manage users (create with explicit role).
    pub fn can_manage_users(self) -> bool {
        matches!(self, Role::Admin | Role::Coordinator)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Supervisor => write!(f, "supervisor"),
            Role::Coordinator => write!(f, "coordinator"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    Active,
    Review,
    Completed,
}

impl Default for ProjectStatus {
    fn default() -> Self {
        Self::Planning
    }
}

/// Kind of a project message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    File,
}

impl Default for MessageKind {
    fn default() -> Self {
        Self::Text
    }
}

/// Notification severity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl Default for NotificationKind {
    fn default() -> Self {
        Self::Info
    }
}

/// Language of a chatbot query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatLanguage {
    En,
    Ar,
}

impl Default for ChatLanguage {
    fn default() -> Self {
        Self::En
    }
}
