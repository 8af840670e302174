//! Callable operations.
//!
//! Each operation follows the same contract: reject unauthenticated
//! callers (at the gateway), load the caller's user document, evaluate the
//! matching permission predicate, perform at most a handful of store
//! reads/writes, and return a reply for the response envelope.

pub mod chatbot;
pub mod files;
pub mod notifications;
pub mod projects;
pub mod users;

use capstone_core::{ApiError, Project, Result, User};

use crate::context::OpContext;
use crate::registry::OperationRegistry;
use crate::store::{collections, fetch_required, DocumentStore};

/// Default page size for list queries.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Resolve the caller's user document.
///
/// A missing document is surfaced as `permission-denied` rather than
/// `not-found`, preserving the wire behavior existing clients rely on.
pub(crate) async fn require_actor(ctx: &OpContext) -> Result<User> {
    let uid = ctx.auth.require_uid()?;
    match ctx.store().get(collections::USERS, uid).await? {
        Some(doc) => doc.decode(),
        None => Err(ApiError::PermissionDenied(
            "No user account for this identity".into(),
        )),
    }
}

pub(crate) async fn load_project(ctx: &OpContext, project_id: &str) -> Result<Project> {
    fetch_required(ctx.store(), collections::PROJECTS, project_id, "Project").await
}

pub(crate) fn encode<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))
}

/// Register every operation of the platform.
pub fn register_all(registry: &mut OperationRegistry) {
    // Users
    registry.register::<users::RegisterUser>();
    registry.register::<users::CreateUser>();
    registry.register::<users::UpdateUserRole>();
    registry.register::<users::DeleteUser>();

    // Projects
    registry.register::<projects::CreateProject>();
    registry.register::<projects::UpdateProject>();
    registry.register::<projects::DeleteProject>();
    registry.register::<projects::SendProjectMessage>();
    registry.register::<projects::UpdateMilestone>();

    // Chatbot
    registry.register::<chatbot::SendChatbotQuery>();
    registry.register::<chatbot::RateChatbotResponse>();
    registry.register::<chatbot::DeleteChatbotInteraction>();
    registry.register::<chatbot::GetChatbotHistory>();

    // Notifications
    registry.register::<notifications::SendNotification>();
    registry.register::<notifications::SendBulkNotification>();
    registry.register::<notifications::MarkNotificationRead>();
    registry.register::<notifications::MarkAllNotificationsRead>();
    registry.register::<notifications::GetUserNotifications>();

    // Files
    registry.register::<files::RequestFileUpload>();
    registry.register::<files::ConfirmFileUpload>();
    registry.register::<files::DeleteFile>();
    registry.register::<files::GetProjectFiles>();
    registry.register::<files::GetUserFiles>();
}
