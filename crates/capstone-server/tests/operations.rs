//! End-to-end operation tests over the in-memory stores.

use std::sync::Arc;

use capstone_core::config::StorageConfig;
use capstone_core::{
    AuthContext, ApiError, ChatLanguage, NotificationKind, ProjectStatus, Role, User,
};
use chrono::Utc;
use serde_json::json;

use capstone_server::blob::{BlobStore, MemoryBlobStore, UrlScope, UrlSigner};
use capstone_server::ops::{chatbot, files, notifications, projects, users};
use capstone_server::store::{collections, DocumentStore, MemoryStore};
use capstone_server::{AppState, OpContext, Operation, RequestMetadata};

fn test_state() -> Arc<AppState> {
    Arc::new(AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryBlobStore::new()),
        UrlSigner::new("test-url-secret", "http://localhost:8080"),
        StorageConfig::default(),
    ))
}

fn ctx(state: &Arc<AppState>, uid: &str) -> OpContext {
    OpContext::new(
        state.clone(),
        AuthContext::authenticated(uid, Some(format!("{}@uni.edu", uid))),
        RequestMetadata::new(),
    )
}

async fn seed_user(state: &Arc<AppState>, uid: &str, role: Role) {
    let now = Utc::now();
    let user = User {
        uid: uid.to_string(),
        email: format!("{}@uni.edu", uid),
        name: uid.to_string(),
        role,
        preferences: Default::default(),
        created_at: now,
        updated_at: now,
    };
    state
        .store
        .put(
            collections::USERS,
            uid,
            serde_json::to_value(&user).unwrap(),
        )
        .await
        .unwrap();
}

async fn seed_project(state: &Arc<AppState>, student: &str, supervisor: &str) -> String {
    seed_user(state, student, Role::Student).await;
    seed_user(state, supervisor, Role::Supervisor).await;
    let reply = projects::CreateProject::execute(
        &ctx(state, student),
        serde_json::from_value(json!({
            "title": "Graduation project",
            "supervisor_id": supervisor,
            "timeline": [
                { "title": "Proposal" },
                { "title": "Implementation" },
            ],
        }))
        .unwrap(),
    )
    .await
    .unwrap();
    reply.data.id
}

#[tokio::test]
async fn register_user_is_always_student() {
    let state = test_state();
    let reply = users::RegisterUser::execute(
        &ctx(&state, "alice"),
        serde_json::from_value(json!({ "name": "Alice" })).unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(reply.data.role, Role::Student);
    assert_eq!(reply.data.email, "alice@uni.edu");

    // Registering again for the same identity fails.
    let err = users::RegisterUser::execute(
        &ctx(&state, "alice"),
        serde_json::from_value(json!({ "name": "Alice again" })).unwrap(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::InvalidArgument(_)));
}

#[tokio::test]
async fn only_admins_and_coordinators_create_users() {
    let state = test_state();
    seed_user(&state, "student", Role::Student).await;
    seed_user(&state, "admin", Role::Admin).await;

    let args = || {
        serde_json::from_value::<users::CreateUserArgs>(json!({
            "email": "new@uni.edu",
            "name": "New User",
            "role": "supervisor",
        }))
        .unwrap()
    };

    let err = users::CreateUser::execute(&ctx(&state, "student"), args())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)));

    let reply = users::CreateUser::execute(&ctx(&state, "admin"), args())
        .await
        .unwrap();
    assert_eq!(reply.data.role, Role::Supervisor);
}

#[tokio::test]
async fn role_changes_are_admin_only() {
    let state = test_state();
    seed_user(&state, "coordinator", Role::Coordinator).await;
    seed_user(&state, "admin", Role::Admin).await;
    seed_user(&state, "target", Role::Student).await;

    let args = || {
        serde_json::from_value::<users::UpdateUserRoleArgs>(json!({
            "user_id": "target",
            "role": "supervisor",
        }))
        .unwrap()
    };

    let err = users::UpdateUserRole::execute(&ctx(&state, "coordinator"), args())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)));

    let reply = users::UpdateUserRole::execute(&ctx(&state, "admin"), args())
        .await
        .unwrap();
    assert_eq!(reply.data.role, Role::Supervisor);
}

#[tokio::test]
async fn missing_account_is_permission_denied() {
    let state = test_state();
    let err = chatbot::GetChatbotHistory::execute(
        &ctx(&state, "ghost"),
        serde_json::from_value(json!({})).unwrap(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)));
}

#[tokio::test]
async fn create_project_requires_real_supervisor() {
    let state = test_state();
    seed_user(&state, "student", Role::Student).await;
    seed_user(&state, "other-student", Role::Student).await;

    let err = projects::CreateProject::execute(
        &ctx(&state, "student"),
        serde_json::from_value(json!({
            "title": "Project",
            "supervisor_id": "other-student",
        }))
        .unwrap(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::InvalidArgument(_)));
}

#[tokio::test]
async fn milestone_updates_recompute_project_progress() {
    let state = test_state();
    let project_id = seed_project(&state, "student", "supervisor").await;

    let project = {
        let reply = projects::UpdateProject::execute(
            &ctx(&state, "student"),
            serde_json::from_value(json!({ "project_id": project_id })).unwrap(),
        )
        .await
        .unwrap();
        reply.data
    };
    assert_eq!(project.progress, 0);
    let first = project.timeline[0].id.clone();

    let reply = projects::UpdateMilestone::execute(
        &ctx(&state, "supervisor"),
        serde_json::from_value(json!({
            "project_id": project_id,
            "milestone_id": first,
            "progress": 100,
            "completed": true,
        }))
        .unwrap(),
    )
    .await
    .unwrap();

    // 100 and 0 average to 50.
    assert_eq!(reply.data.progress, 50);
    assert!(reply.data.timeline[0].completed);
    assert_eq!(reply.data.timeline[1].progress, 0);
}

#[tokio::test]
async fn milestone_progress_over_100_is_rejected() {
    let state = test_state();
    let project_id = seed_project(&state, "student", "supervisor").await;
    let project = capstone_server::store::fetch_required::<capstone_core::Project>(
        state.store.as_ref(),
        collections::PROJECTS,
        &project_id,
        "Project",
    )
    .await
    .unwrap();

    let err = projects::UpdateMilestone::execute(
        &ctx(&state, "student"),
        serde_json::from_value(json!({
            "project_id": project_id,
            "milestone_id": project.timeline[0].id,
            "progress": 101,
        }))
        .unwrap(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::InvalidArgument(_)));
}

#[tokio::test]
async fn non_members_cannot_message_a_project() {
    let state = test_state();
    let project_id = seed_project(&state, "student", "supervisor").await;
    seed_user(&state, "outsider", Role::Student).await;

    let args = |content: &str| {
        serde_json::from_value::<projects::SendProjectMessageArgs>(json!({
            "project_id": project_id.clone(),
            "content": content,
        }))
        .unwrap()
    };

    let err = projects::SendProjectMessage::execute(&ctx(&state, "outsider"), args("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)));

    let reply = projects::SendProjectMessage::execute(&ctx(&state, "supervisor"), args("hi"))
        .await
        .unwrap();
    assert!(reply.data.read_by.contains_key("supervisor"));
}

#[tokio::test]
async fn deleting_a_project_removes_its_messages() {
    let state = test_state();
    let project_id = seed_project(&state, "student", "supervisor").await;

    projects::SendProjectMessage::execute(
        &ctx(&state, "student"),
        serde_json::from_value(json!({
            "project_id": project_id,
            "content": "first draft attached",
        }))
        .unwrap(),
    )
    .await
    .unwrap();

    projects::DeleteProject::execute(
        &ctx(&state, "student"),
        serde_json::from_value(json!({ "project_id": project_id })).unwrap(),
    )
    .await
    .unwrap();

    let messages = state
        .store
        .list(
            &collections::project_messages(&project_id),
            capstone_server::store::ListQuery::new(),
        )
        .await
        .unwrap();
    assert!(messages.is_empty());
    assert!(state
        .store
        .get(collections::PROJECTS, &project_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn project_status_update_by_member() {
    let state = test_state();
    let project_id = seed_project(&state, "student", "supervisor").await;

    let reply = projects::UpdateProject::execute(
        &ctx(&state, "supervisor"),
        serde_json::from_value(json!({
            "project_id": project_id,
            "status": "active",
        }))
        .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(reply.data.status, ProjectStatus::Active);
}

#[tokio::test]
async fn chatbot_answers_by_keyword_and_language() {
    let state = test_state();
    seed_user(&state, "student", Role::Student).await;

    let ask = |query: &str, language: &str| {
        serde_json::from_value::<chatbot::SendChatbotQueryArgs>(json!({
            "query": query,
            "language": language,
        }))
        .unwrap()
    };

    let reply = chatbot::SendChatbotQuery::execute(
        &ctx(&state, "student"),
        ask("How do I create a project?", "en"),
    )
    .await
    .unwrap();
    assert!(reply.data.response.contains("project"));
    assert_eq!(reply.data.language, ChatLanguage::En);

    let reply =
        chatbot::SendChatbotQuery::execute(&ctx(&state, "student"), ask("من هو مشرف المشروع؟", "ar"))
            .await
            .unwrap();
    assert!(reply.data.response.contains("مشروع") || reply.data.response.contains("مشرف"));

    // Unmatched queries get the fallback, still persisted.
    let reply = chatbot::SendChatbotQuery::execute(
        &ctx(&state, "student"),
        ask("what is the meaning of life", "en"),
    )
    .await
    .unwrap();
    assert!(reply.data.response.contains("not sure"));

    let history = chatbot::GetChatbotHistory::execute(
        &ctx(&state, "student"),
        serde_json::from_value(json!({})).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(history.data.len(), 3);
}

#[tokio::test]
async fn only_the_creator_rates_an_interaction() {
    let state = test_state();
    seed_user(&state, "asker", Role::Student).await;
    seed_user(&state, "other", Role::Student).await;

    let interaction = chatbot::SendChatbotQuery::execute(
        &ctx(&state, "asker"),
        serde_json::from_value(json!({ "query": "milestone help" })).unwrap(),
    )
    .await
    .unwrap()
    .data;

    let rate = |rating: u8| {
        serde_json::from_value::<chatbot::RateChatbotResponseArgs>(json!({
            "interaction_id": interaction.id.clone(),
            "rating": rating,
        }))
        .unwrap()
    };

    let err = chatbot::RateChatbotResponse::execute(&ctx(&state, "other"), rate(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)));

    let err = chatbot::RateChatbotResponse::execute(&ctx(&state, "asker"), rate(6))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidArgument(_)));

    let reply = chatbot::RateChatbotResponse::execute(&ctx(&state, "asker"), rate(4))
        .await
        .unwrap();
    assert_eq!(reply.data.rating, Some(4));
}

#[tokio::test]
async fn students_cannot_send_notifications() {
    let state = test_state();
    seed_user(&state, "student", Role::Student).await;
    seed_user(&state, "supervisor", Role::Supervisor).await;

    let args = || {
        serde_json::from_value::<notifications::SendNotificationArgs>(json!({
            "user_id": "student",
            "title": "Reminder",
            "message": "Milestone due Friday",
            "kind": "warning",
        }))
        .unwrap()
    };

    let err = notifications::SendNotification::execute(&ctx(&state, "student"), args())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)));

    let reply = notifications::SendNotification::execute(&ctx(&state, "supervisor"), args())
        .await
        .unwrap();
    assert_eq!(reply.data.kind, NotificationKind::Warning);
    assert!(!reply.data.read);
}

#[tokio::test]
async fn bulk_notification_returns_created_records_and_rejects_empty() {
    let state = test_state();
    seed_user(&state, "coordinator", Role::Coordinator).await;
    seed_user(&state, "a", Role::Student).await;
    seed_user(&state, "b", Role::Student).await;
    seed_user(&state, "c", Role::Student).await;

    let err = notifications::SendBulkNotification::execute(
        &ctx(&state, "coordinator"),
        serde_json::from_value(json!({
            "user_ids": [],
            "title": "T",
            "message": "M",
        }))
        .unwrap(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::InvalidArgument(_)));

    let user_ids = ["a", "b", "c"];
    let reply = notifications::SendBulkNotification::execute(
        &ctx(&state, "coordinator"),
        serde_json::from_value(json!({
            "user_ids": user_ids,
            "title": "Defense schedule",
            "message": "Posted",
        }))
        .unwrap(),
    )
    .await
    .unwrap();

    // The reply carries the full set of created records, one per
    // recipient, with the count in the message.
    assert_eq!(reply.data.len(), user_ids.len());
    assert_eq!(reply.message.as_deref(), Some("3 notifications sent"));
    for (record, user_id) in reply.data.iter().zip(user_ids) {
        assert_eq!(record.user_id, user_id);
        assert!(!record.read);
    }

    let inbox = notifications::GetUserNotifications::execute(
        &ctx(&state, "a"),
        serde_json::from_value(json!({})).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(inbox.data.len(), 1);
}

#[tokio::test]
async fn mark_all_read_handles_empty_inbox() {
    let state = test_state();
    seed_user(&state, "student", Role::Student).await;
    seed_user(&state, "admin", Role::Admin).await;

    let reply = notifications::MarkAllNotificationsRead::execute(
        &ctx(&state, "student"),
        serde_json::from_value(json!({})).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(reply.message.as_deref(), Some("No unread notifications"));

    notifications::SendNotification::execute(
        &ctx(&state, "admin"),
        serde_json::from_value(json!({
            "user_id": "student",
            "title": "T",
            "message": "M",
        }))
        .unwrap(),
    )
    .await
    .unwrap();

    notifications::MarkAllNotificationsRead::execute(
        &ctx(&state, "student"),
        serde_json::from_value(json!({})).unwrap(),
    )
    .await
    .unwrap();

    let unread = notifications::GetUserNotifications::execute(
        &ctx(&state, "student"),
        serde_json::from_value(json!({ "unread_only": true })).unwrap(),
    )
    .await
    .unwrap();
    assert!(unread.data.is_empty());
}

#[tokio::test]
async fn only_the_recipient_marks_a_notification_read() {
    let state = test_state();
    seed_user(&state, "admin", Role::Admin).await;
    seed_user(&state, "recipient", Role::Student).await;
    seed_user(&state, "snoop", Role::Student).await;

    let notification = notifications::SendNotification::execute(
        &ctx(&state, "admin"),
        serde_json::from_value(json!({
            "user_id": "recipient",
            "title": "T",
            "message": "M",
        }))
        .unwrap(),
    )
    .await
    .unwrap()
    .data;

    let err = notifications::MarkNotificationRead::execute(
        &ctx(&state, "snoop"),
        serde_json::from_value(json!({ "notification_id": notification.id })).unwrap(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)));
}

#[tokio::test]
async fn upload_validation_happens_before_url_minting() {
    let state = test_state();
    seed_user(&state, "student", Role::Student).await;

    let request = |content_type: &str, size: u64| {
        serde_json::from_value::<files::RequestFileUploadArgs>(json!({
            "name": "thesis.pdf",
            "size": size,
            "content_type": content_type,
        }))
        .unwrap()
    };

    let err = files::RequestFileUpload::execute(
        &ctx(&state, "student"),
        request("application/x-msdownload", 1024),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::InvalidArgument(_)));

    let err = files::RequestFileUpload::execute(
        &ctx(&state, "student"),
        request("application/pdf", files::MAX_FILE_SIZE + 1),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::InvalidArgument(_)));

    // Nothing was recorded for the rejected requests.
    let mine = files::GetUserFiles::execute(
        &ctx(&state, "student"),
        serde_json::from_value(json!({})).unwrap(),
    )
    .await
    .unwrap();
    assert!(mine.data.is_empty());
}

#[tokio::test]
async fn upload_handshake_end_to_end() {
    let state = test_state();
    let project_id = seed_project(&state, "student", "supervisor").await;

    let ticket = files::RequestFileUpload::execute(
        &ctx(&state, "student"),
        serde_json::from_value(json!({
            "name": "report.pdf",
            "size": 2048,
            "content_type": "application/pdf",
            "project_id": project_id,
        }))
        .unwrap(),
    )
    .await
    .unwrap()
    .data;

    assert!(ticket.file.url.is_none());
    assert!(ticket.upload_url.contains("token="));

    // Confirming before any bytes exist fails.
    let confirm = serde_json::from_value::<files::ConfirmFileUploadArgs>(
        json!({ "file_id": ticket.file.id }),
    )
    .unwrap();
    let err = files::ConfirmFileUpload::execute(&ctx(&state, "student"), confirm)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    // Simulate the client's PUT against the blob store.
    let path = format!("files/{}/report.pdf", ticket.file.id);
    state.blobs.write(&path, b"%PDF-1.7".to_vec()).await.unwrap();

    let confirm = serde_json::from_value::<files::ConfirmFileUploadArgs>(
        json!({ "file_id": ticket.file.id }),
    )
    .unwrap();
    let confirmed = files::ConfirmFileUpload::execute(&ctx(&state, "student"), confirm)
        .await
        .unwrap()
        .data;
    assert!(confirmed.url.is_some());

    // The download URL carries a token scoped to reads of this path.
    let url = confirmed.url.unwrap();
    let token = url.split("token=").nth(1).unwrap();
    state.signer.verify(token, &path, UrlScope::Get).unwrap();
    assert!(state.signer.verify(token, &path, UrlScope::Put).is_err());

    // Members see the file among the project's files.
    let listed = files::GetProjectFiles::execute(
        &ctx(&state, "supervisor"),
        serde_json::from_value(json!({ "project_id": project_id })).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(listed.data.len(), 1);
}

#[tokio::test]
async fn file_deletion_is_uploader_or_admin() {
    let state = test_state();
    seed_user(&state, "uploader", Role::Student).await;
    seed_user(&state, "other", Role::Student).await;
    seed_user(&state, "admin", Role::Admin).await;

    let ticket = files::RequestFileUpload::execute(
        &ctx(&state, "uploader"),
        serde_json::from_value(json!({
            "name": "notes.txt",
            "size": 10,
            "content_type": "text/plain",
        }))
        .unwrap(),
    )
    .await
    .unwrap()
    .data;

    let delete_args = |id: &str| {
        serde_json::from_value::<files::DeleteFileArgs>(json!({ "file_id": id })).unwrap()
    };

    let err = files::DeleteFile::execute(&ctx(&state, "other"), delete_args(&ticket.file.id))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)));

    // Admin delete succeeds even though no bytes were ever uploaded.
    files::DeleteFile::execute(&ctx(&state, "admin"), delete_args(&ticket.file.id))
        .await
        .unwrap();
    assert!(state
        .store
        .get(collections::FILES, &ticket.file.id)
        .await
        .unwrap()
        .is_none());
}
