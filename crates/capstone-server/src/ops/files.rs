//! File upload handshake and file metadata operations.
//!
//! Uploads are a two-step handshake: `requestFileUpload` validates the
//! declared type and size, records metadata without a URL and hands back a
//! short-lived signed PUT URL; `confirmFileUpload` checks the bytes actually
//! landed in the blob store and patches a long-lived signed GET URL into the
//! metadata. A metadata document without `url` is an abandoned upload.

use std::future::Future;
use std::pin::Pin;

use capstone_core::{policy, ApiError, FileMetadata, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{encode, load_project, require_actor, DEFAULT_LIST_LIMIT};
use crate::blob::{self, BlobStore, UrlScope};
use crate::context::OpContext;
use crate::registry::{Operation, OperationInfo, OperationKind, Reply};
use crate::store::{collections, fetch_required, DocumentStore, ListQuery};

/// Content types accepted for upload.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "image/png",
    "image/jpeg",
    "text/plain",
    "application/zip",
];

/// Maximum declared upload size in bytes.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

async fn load_file(ctx: &OpContext, id: &str) -> Result<FileMetadata> {
    fetch_required(ctx.store(), collections::FILES, id, "File").await
}

async fn store_file(ctx: &OpContext, file: &FileMetadata) -> Result<()> {
    let body = encode(file)?;
    ctx.store().put(collections::FILES, &file.id, body).await
}

async fn list_files(ctx: &OpContext, query: ListQuery) -> Result<Vec<FileMetadata>> {
    let docs = ctx.store().list(collections::FILES, query).await?;
    docs.into_iter()
        .map(|doc| doc.decode::<FileMetadata>())
        .collect()
}

/// Begin an upload: validate, record metadata, mint a signed PUT URL.
pub struct RequestFileUpload;

#[derive(Debug, Deserialize)]
pub struct RequestFileUploadArgs {
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub project_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadTicket {
    pub file: FileMetadata,
    pub upload_url: String,
}

impl Operation for RequestFileUpload {
    type Args = RequestFileUploadArgs;
    type Output = UploadTicket;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "requestFileUpload",
            description: Some("Validate an upload and mint a signed PUT URL"),
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

            if args.name.trim().is_empty() {
                return Err(ApiError::InvalidArgument("A file name is required".into()));
            }
            if !ALLOWED_CONTENT_TYPES.contains(&args.content_type.as_str()) {
                return Err(ApiError::InvalidArgument(format!(
                    "Content type '{}' is not allowed",
                    args.content_type
                )));
            }
            if args.size == 0 || args.size > MAX_FILE_SIZE {
                return Err(ApiError::InvalidArgument(format!(
                    "File size must be between 1 and {} bytes",
                    MAX_FILE_SIZE
                )));
            }

            if let Some(project_id) = &args.project_id {
                let project = load_project(ctx, project_id).await?;
                policy::can_act_on_project(&actor.uid, &project)?;
            }

            let file = FileMetadata {
                id: Uuid::new_v4().to_string(),
                name: args.name,
                size: args.size,
                content_type: args.content_type,
                uploaded_by: actor.uid,
                project_id: args.project_id,
                url: None,
                created_at: Utc::now(),
            };

            let path = blob::file_path(&file.id, &file.name);
            blob::validate_path(&path)?;
            let upload_url = ctx.state.signer.sign_url(
                &path,
                UrlScope::Put,
                ctx.state.storage.upload_ttl_secs,
            )?;

            store_file(ctx, &file).await?;

            tracing::info!(file_id = %file.id, size = file.size, "Upload requested");
            Ok(Reply::new(UploadTicket { file, upload_url }).with_message("Upload URL issued"))
        })
    }
}

/// Complete an upload: verify the bytes exist, mint the download URL.
pub struct ConfirmFileUpload;

#[derive(Debug, Deserialize)]
pub struct ConfirmFileUploadArgs {
    pub file_id: String,
}

impl Operation for ConfirmFileUpload {
    type Args = ConfirmFileUploadArgs;
    type Output = FileMetadata;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "confirmFileUpload",
            description: Some("Verify an upload landed and mint its download URL"),
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
            let mut file = load_file(ctx, &args.file_id).await?;
            policy::can_confirm_upload(&actor.uid, &file)?;

            let path = blob::file_path(&file.id, &file.name);
            if !ctx.blobs().exists(&path).await? {
                return Err(ApiError::NotFound(
                    "No uploaded object found for this file".into(),
                ));
            }

            let download_url = ctx.state.signer.sign_url(
                &path,
                UrlScope::Get,
                ctx.state.storage.download_ttl_secs,
            )?;
            file.url = Some(download_url);
            store_file(ctx, &file).await?;

            tracing::info!(file_id = %file.id, "Upload confirmed");
            Ok(Reply::new(file).with_message("Upload confirmed"))
        })
    }
}

/// Delete a file's metadata and its stored bytes.
pub struct DeleteFile;

#[derive(Debug, Deserialize)]
pub struct DeleteFileArgs {
    pub file_id: String,
}

impl Operation for DeleteFile {
    type Args = DeleteFileArgs;
    type Output = Value;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "deleteFile",
            description: Some("Delete a file and its stored bytes"),
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
            let file = load_file(ctx, &args.file_id).await?;
            policy::can_delete_file(actor.role, &actor.uid, &file)?;

            let path = blob::file_path(&file.id, &file.name);
            // Metadata is the source of truth; a missing or failing blob
            // delete must not keep the record around.
            if let Err(err) = ctx.blobs().delete(&path).await {
                tracing::warn!(file_id = %file.id, %err, "Blob delete failed");
            }
            ctx.store().delete(collections::FILES, &file.id).await?;

            tracing::info!(file_id = %file.id, "File deleted");
            Ok(Reply::new(serde_json::json!({ "id": file.id })).with_message("File deleted"))
        })
    }
}

/// List the files attached to a project.
pub struct GetProjectFiles;

#[derive(Debug, Deserialize)]
pub struct GetProjectFilesArgs {
    pub project_id: String,
    pub limit: Option<usize>,
}

impl Operation for GetProjectFiles {
    type Args = GetProjectFilesArgs;
    type Output = Vec<FileMetadata>;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "getProjectFiles",
            description: Some("List the files attached to a project"),
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
            let project = load_project(ctx, &args.project_id).await?;
            policy::can_view_project_files(actor.role, &actor.uid, &project)?;

            let query = ListQuery::new()
                .filter("project_id", Value::String(project.id))
                .order_desc("created_at")
                .limit(args.limit.unwrap_or(DEFAULT_LIST_LIMIT));
            Ok(Reply::new(list_files(ctx, query).await?))
        })
    }
}

/// List the caller's own uploads.
pub struct GetUserFiles;

#[derive(Debug, Deserialize)]
pub struct GetUserFilesArgs {
    pub limit: Option<usize>,
}

impl Operation for GetUserFiles {
    type Args = GetUserFilesArgs;
    type Output = Vec<FileMetadata>;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "getUserFiles",
            description: Some("List the caller's uploaded files"),
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

            let query = ListQuery::new()
                .filter("uploaded_by", Value::String(actor.uid))
                .order_desc("created_at")
                .limit(args.limit.unwrap_or(DEFAULT_LIST_LIMIT));
            Ok(Reply::new(list_files(ctx, query).await?))
        })
    }
}
