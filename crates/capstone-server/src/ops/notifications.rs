//! Notification operations.
//!
//! Notifications are plain documents addressed to one user; bulk sends fan
//! out as a single atomic batch so a partial send can never be observed.

use std::future::Future;
use std::pin::Pin;

use capstone_core::{policy, ApiError, Notification, NotificationKind, Result};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{encode, require_actor, DEFAULT_LIST_LIMIT};
use crate::context::OpContext;
use crate::registry::{Operation, OperationInfo, OperationKind, Reply};
use crate::store::{collections, fetch_required, DocumentStore, ListQuery, WriteOp};

fn build_notification(
    user_id: String,
    title: &str,
    message: &str,
    kind: NotificationKind,
) -> Notification {
    Notification {
        id: Uuid::new_v4().to_string(),
        user_id,
        title: title.to_string(),
        message: message.to_string(),
        kind,
        read: false,
        created_at: Utc::now(),
    }
}

/// Send a notification to one user.
pub struct SendNotification;

#[derive(Debug, Deserialize)]
pub struct SendNotificationArgs {
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub kind: NotificationKind,
}

impl Operation for SendNotification {
    type Args = SendNotificationArgs;
    type Output = Notification;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "sendNotification",
            description: Some("Send a notification to one user"),
            kind: OperationKind::Mutation,
            requires_auth: true,
        }
    }

    fn execute(
        ctx: &OpContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Reply<Self::Output>>> + Send + '_>> {
        Box::pin(async move {
            let actor = require_actor(ctx).await?;
            policy::can_send_notification(actor.role)?;

            if ctx
                .store()
                .get(collections::USERS, &args.user_id)
                .await?
                .is_none()
            {
                return Err(ApiError::NotFound(format!(
                    "User '{}' not found",
                    args.user_id
                )));
            }

            let notification =
                build_notification(args.user_id, &args.title, &args.message, args.kind);
            let body = encode(&notification)?;
            ctx.store()
                .put(collections::NOTIFICATIONS, &notification.id, body)
                .await?;

            Ok(Reply::new(notification).with_message("Notification sent"))
        })
    }
}

/// Send the same notification to many users atomically.
pub struct SendBulkNotification;

#[derive(Debug, Deserialize)]
pub struct SendBulkNotificationArgs {
    pub user_ids: Vec<String>,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub kind: NotificationKind,
}

impl Operation for SendBulkNotification {
    type Args = SendBulkNotificationArgs;
    type Output = Vec<Notification>;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "sendBulkNotification",
            description: Some("Send the same notification to many users"),
            kind: OperationKind::Mutation,
            requires_auth: true,
        }
    }

    fn execute(
        ctx: &OpContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Reply<Self::Output>>> + Send + '_>> {
        Box::pin(async move {
            let actor = require_actor(ctx).await?;
            policy::can_send_bulk_notification(actor.role)?;

            if args.user_ids.is_empty() {
                return Err(ApiError::InvalidArgument(
                    "At least one recipient is required".into(),
                ));
            }

            let mut records = Vec::with_capacity(args.user_ids.len());
            let mut writes = Vec::with_capacity(args.user_ids.len());
            for user_id in &args.user_ids {
                let notification =
                    build_notification(user_id.clone(), &args.title, &args.message, args.kind);
                writes.push(WriteOp::put(
                    collections::NOTIFICATIONS,
                    notification.id.clone(),
                    encode(&notification)?,
                ));
                records.push(notification);
            }
            let count = records.len();
            ctx.store().batch(writes).await?;

            tracing::info!(count, "Bulk notification sent");
            Ok(Reply::new(records).with_message(format!("{} notifications sent", count)))
        })
    }
}

/// Mark one of the caller's notifications as read.
pub struct MarkNotificationRead;

#[derive(Debug, Deserialize)]
pub struct MarkNotificationReadArgs {
    pub notification_id: String,
}

impl Operation for MarkNotificationRead {
    type Args = MarkNotificationReadArgs;
    type Output = Notification;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "markNotificationRead",
            description: Some("Mark one notification as read"),
            kind: OperationKind::Mutation,
            requires_auth: true,
        }
    }

    fn execute(
        ctx: &OpContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Reply<Self::Output>>> + Send + '_>> {
        Box::pin(async move {
            let actor = require_actor(ctx).await?;
            let mut notification: Notification = fetch_required(
                ctx.store(),
                collections::NOTIFICATIONS,
                &args.notification_id,
                "Notification",
            )
            .await?;

            policy::can_mark_notification_read(&actor.uid, &notification)?;

            notification.read = true;
            let body = encode(&notification)?;
            ctx.store()
                .put(collections::NOTIFICATIONS, &notification.id, body)
                .await?;

            Ok(Reply::new(notification))
        })
    }
}

/// Mark all of the caller's unread notifications as read.
pub struct MarkAllNotificationsRead;

#[derive(Debug, Deserialize)]
pub struct MarkAllNotificationsReadArgs {}

impl Operation for MarkAllNotificationsRead {
    type Args = MarkAllNotificationsReadArgs;
    type Output = Value;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "markAllNotificationsRead",
            description: Some("Mark all of the caller's notifications as read"),
            kind: OperationKind::Mutation,
            requires_auth: true,
        }
    }

    fn execute(
        ctx: &OpContext,
        _args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Reply<Self::Output>>> + Send + '_>> {
        Box::pin(async move {
            let actor = require_actor(ctx).await?;

            let query = ListQuery::new()
                .filter("user_id", Value::String(actor.uid.clone()))
                .filter("read", Value::Bool(false));
            let docs = ctx.store().list(collections::NOTIFICATIONS, query).await?;

            if docs.is_empty() {
                return Ok(Reply::new(serde_json::json!({ "count": 0 }))
                    .with_message("No unread notifications"));
            }

            let mut writes = Vec::with_capacity(docs.len());
            for doc in docs {
                let mut notification: Notification = doc.decode()?;
                notification.read = true;
                writes.push(WriteOp::put(
                    collections::NOTIFICATIONS,
                    notification.id.clone(),
                    encode(&notification)?,
                ));
            }
            let count = writes.len();
            ctx.store().batch(writes).await?;

            Ok(Reply::new(serde_json::json!({ "count": count }))
                .with_message(format!("{} notifications marked as read", count)))
        })
    }
}

/// List the caller's notifications, newest first.
pub struct GetUserNotifications;

#[derive(Debug, Deserialize)]
pub struct GetUserNotificationsArgs {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<usize>,
}

impl Operation for GetUserNotifications {
    type Args = GetUserNotificationsArgs;
    type Output = Vec<Notification>;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "getUserNotifications",
            description: Some("List the caller's notifications, newest first"),
            kind: OperationKind::Query,
            requires_auth: true,
        }
    }

    fn execute(
        ctx: &OpContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Reply<Self::Output>>> + Send + '_>> {
        Box::pin(async move {
            let actor = require_actor(ctx).await?;

            let mut query = ListQuery::new()
                .filter("user_id", Value::String(actor.uid))
                .order_desc("created_at")
                .limit(args.limit.unwrap_or(DEFAULT_LIST_LIMIT));
            if args.unread_only {
                query = query.filter("read", Value::Bool(false));
            }
            let docs = ctx
                .store()
                .list(collections::NOTIFICATIONS, query)
                .await?;

            let notifications = docs
                .into_iter()
                .map(|doc| doc.decode::<Notification>())
                .collect::<Result<Vec<_>>>()?;
            Ok(Reply::new(notifications))
        })
    }
}
