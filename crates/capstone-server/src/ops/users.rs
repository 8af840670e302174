//! User lifecycle operations.
//!
//! Accounts come into existence two ways: self-registration (role forced to
//! student) or creation by an admin/coordinator with an explicit role. Role
//! changes and deletion are admin-only; the identity record itself lives
//! with the external provider and is outside this service.

use std::future::Future;
use std::pin::Pin;

use capstone_core::{policy, ApiError, Result, Role, User};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::{encode, require_actor};
use crate::context::OpContext;
use crate::registry::{Operation, OperationInfo, OperationKind, Reply};
use crate::store::{collections, fetch_required, DocumentStore};

async fn store_user(ctx: &OpContext, user: &User) -> Result<()> {
    let body = encode(user)?;
    ctx.store().put(collections::USERS, &user.uid, body).await
}

/// Self-registration: the caller creates their own account.
pub struct RegisterUser;

#[derive(Debug, Deserialize)]
pub struct RegisterUserArgs {
    pub name: String,
    /// Falls back to the verified email on the identity token.
    pub email: Option<String>,
}

impl Operation for RegisterUser {
    type Args = RegisterUserArgs;
    type Output = User;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "registerUser",
            description: Some("Create the caller's own account with the student role"),
            kind: OperationKind::Mutation,
            requires_auth: true,
        }
    }

    fn execute(
        ctx: &OpContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Reply<Self::Output>>> + Send + '_>> {
        Box::pin(async move {
            let uid = ctx.auth.require_uid()?.to_string();

            if ctx.store().get(collections::USERS, &uid).await?.is_some() {
                return Err(ApiError::InvalidArgument(
                    "An account already exists for this identity".into(),
                ));
            }

            let email = args
                .email
                .or_else(|| ctx.auth.email().map(String::from))
                .ok_or_else(|| ApiError::InvalidArgument("An email address is required".into()))?;

            let now = Utc::now();
            let user = User {
                uid: uid.clone(),
                email,
                name: args.name,
                role: Role::Student,
                preferences: Default::default(),
                created_at: now,
                updated_at: now,
            };
            store_user(ctx, &user).await?;

            tracing::info!(uid = %uid, "User registered");
            Ok(Reply::new(user).with_message("Account created"))
        })
    }
}

/// Create a user with an explicit role (admin/coordinator only).
pub struct CreateUser;

#[derive(Debug, Deserialize)]
pub struct CreateUserArgs {
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Identity uid when known; generated otherwise.
    pub uid: Option<String>,
}

impl Operation for CreateUser {
    type Args = CreateUserArgs;
    type Output = User;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "createUser",
            description: Some("Create a user with an explicit role"),
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
            policy::can_create_user(actor.role)?;

            let uid = args.uid.unwrap_or_else(|| Uuid::new_v4().to_string());
            if ctx.store().get(collections::USERS, &uid).await?.is_some() {
                return Err(ApiError::InvalidArgument(format!(
                    "User '{}' already exists",
                    uid
                )));
            }

            let now = Utc::now();
            let user = User {
                uid: uid.clone(),
                email: args.email,
                name: args.name,
                role: args.role,
                preferences: Default::default(),
                created_at: now,
                updated_at: now,
            };
            store_user(ctx, &user).await?;

            tracing::info!(uid = %uid, role = %user.role, "User created");
            Ok(Reply::new(user).with_message("User created"))
        })
    }
}

/// Change a user's role (admin only).
pub struct UpdateUserRole;

#[derive(Debug, Deserialize)]
pub struct UpdateUserRoleArgs {
    pub user_id: String,
    pub role: Role,
}

impl Operation for UpdateUserRole {
    type Args = UpdateUserRoleArgs;
    type Output = User;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "updateUserRole",
            description: Some("Change a user's role"),
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
            policy::can_administer_users(actor.role)?;

            let mut user: User =
                fetch_required(ctx.store(), collections::USERS, &args.user_id, "User").await?;
            user.role = args.role;
            user.updated_at = Utc::now();
            store_user(ctx, &user).await?;

            tracing::info!(uid = %user.uid, role = %user.role, "User role updated");
            Ok(Reply::new(user).with_message("User role updated"))
        })
    }
}

/// Delete a user (admin only).
pub struct DeleteUser;

#[derive(Debug, Deserialize)]
pub struct DeleteUserArgs {
    pub user_id: String,
}

impl Operation for DeleteUser {
    type Args = DeleteUserArgs;
    type Output = serde_json::Value;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "deleteUser",
            description: Some("Delete a user account"),
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
            policy::can_administer_users(actor.role)?;

            // Make sure it exists so deletion of a phantom id reports
            // not-found instead of silently succeeding.
            let user: User =
                fetch_required(ctx.store(), collections::USERS, &args.user_id, "User").await?;
            ctx.store().delete(collections::USERS, &user.uid).await?;

            tracing::info!(uid = %user.uid, "User deleted");
            Ok(Reply::new(serde_json::json!({ "uid": user.uid })).with_message("User deleted"))
        })
    }
}
