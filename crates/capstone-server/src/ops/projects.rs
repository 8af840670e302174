//! Project operations: lifecycle, messaging and milestone tracking.

use std::future::Future;
use std::pin::Pin;

use capstone_core::{
    apply_milestone_patch, policy, ApiError, Message, MessageKind, Milestone, MilestonePatch,
    Project, ProjectStatus, Result, Role, User,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::{encode, load_project, require_actor};
use crate::context::OpContext;
use crate::registry::{Operation, OperationInfo, OperationKind, Reply};
use crate::store::{collections, DocumentStore, ListQuery, WriteOp};

async fn store_project(ctx: &OpContext, project: &Project) -> Result<()> {
    let body = encode(project)?;
    ctx.store()
        .put(collections::PROJECTS, &project.id, body)
        .await
}

/// Milestone as supplied at project creation. Ids are always generated
/// server-side.
#[derive(Debug, Deserialize)]
pub struct MilestoneSpec {
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub progress: u8,
}

impl MilestoneSpec {
    fn into_milestone(self) -> Result<Milestone> {
        if self.progress > 100 {
            return Err(ApiError::InvalidArgument(
                "Milestone progress must be between 0 and 100".into(),
            ));
        }
        Ok(Milestone {
            id: Uuid::new_v4().to_string(),
            title: self.title,
            due_date: self.due_date,
            completed: self.completed,
            progress: self.progress,
        })
    }
}

/// Create a project owned by the calling student.
pub struct CreateProject;

#[derive(Debug, Deserialize)]
pub struct CreateProjectArgs {
    pub title: String,
    pub description: Option<String>,
    pub supervisor_id: String,
    #[serde(default)]
    pub timeline: Vec<MilestoneSpec>,
}

impl Operation for CreateProject {
    type Args = CreateProjectArgs;
    type Output = Project;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "createProject",
            description: Some("Create a project owned by the calling student"),
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
            policy::can_create_project(actor.role)?;

            if args.title.trim().is_empty() {
                return Err(ApiError::InvalidArgument("A project title is required".into()));
            }

            let supervisor: User = match ctx
                .store()
                .get(collections::USERS, &args.supervisor_id)
                .await?
            {
                Some(doc) => doc.decode()?,
                None => {
                    return Err(ApiError::InvalidArgument(format!(
                        "Supervisor '{}' does not exist",
                        args.supervisor_id
                    )))
                }
            };
            if supervisor.role != Role::Supervisor {
                return Err(ApiError::InvalidArgument(format!(
                    "User '{}' is not a supervisor",
                    supervisor.uid
                )));
            }

            let timeline: Vec<Milestone> = args
                .timeline
                .into_iter()
                .map(MilestoneSpec::into_milestone)
                .collect::<Result<_>>()?;

            let now = Utc::now();
            let project = Project {
                id: Uuid::new_v4().to_string(),
                title: args.title,
                description: args.description,
                student_id: actor.uid.clone(),
                supervisor_id: supervisor.uid,
                status: ProjectStatus::Planning,
                progress: capstone_core::aggregate_progress(&timeline),
                timeline,
                created_at: now,
                updated_at: now,
            };
            store_project(ctx, &project).await?;

            tracing::info!(project_id = %project.id, student = %actor.uid, "Project created");
            Ok(Reply::new(project).with_message("Project created"))
        })
    }
}

/// Update a project's title, description or status.
pub struct UpdateProject;

#[derive(Debug, Deserialize)]
pub struct UpdateProjectArgs {
    pub project_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
}

impl Operation for UpdateProject {
    type Args = UpdateProjectArgs;
    type Output = Project;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "updateProject",
            description: Some("Update a project's title, description or status"),
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
            let mut project = load_project(ctx, &args.project_id).await?;
            policy::can_update_project(actor.role, &actor.uid, &project)?;

            if let Some(title) = args.title {
                if title.trim().is_empty() {
                    return Err(ApiError::InvalidArgument("A project title is required".into()));
                }
                project.title = title;
            }
            if let Some(description) = args.description {
                project.description = Some(description);
            }
            if let Some(status) = args.status {
                project.status = status;
            }
            project.updated_at = Utc::now();
            store_project(ctx, &project).await?;

            tracing::info!(project_id = %project.id, "Project updated");
            Ok(Reply::new(project).with_message("Project updated"))
        })
    }
}

/// Delete a project together with its message sub-collection.
pub struct DeleteProject;

#[derive(Debug, Deserialize)]
pub struct DeleteProjectArgs {
    pub project_id: String,
}

impl Operation for DeleteProject {
    type Args = DeleteProjectArgs;
    type Output = serde_json::Value;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "deleteProject",
            description: Some("Delete a project and its messages"),
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
            let project = load_project(ctx, &args.project_id).await?;
            policy::can_delete_project(actor.role, &actor.uid, &project)?;

            let messages = collections::project_messages(&project.id);
            let docs = ctx.store().list(&messages, ListQuery::new()).await?;

            let mut writes: Vec<WriteOp> = docs
                .into_iter()
                .map(|doc| WriteOp::delete(messages.clone(), doc.id))
                .collect();
            writes.push(WriteOp::delete(collections::PROJECTS, project.id.clone()));
            ctx.store().batch(writes).await?;

            tracing::info!(project_id = %project.id, "Project deleted");
            Ok(Reply::new(serde_json::json!({ "id": project.id }))
                .with_message("Project deleted"))
        })
    }
}

/// Post a message to a project's message thread.
pub struct SendProjectMessage;

#[derive(Debug, Deserialize)]
pub struct SendProjectMessageArgs {
    pub project_id: String,
    pub content: String,
    #[serde(default)]
    pub kind: MessageKind,
}

impl Operation for SendProjectMessage {
    type Args = SendProjectMessageArgs;
    type Output = Message;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "sendProjectMessage",
            description: Some("Post a message to a project's thread"),
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
            let project = load_project(ctx, &args.project_id).await?;
            policy::can_act_on_project(&actor.uid, &project)?;

            if args.content.trim().is_empty() {
                return Err(ApiError::InvalidArgument("Message content must not be empty".into()));
            }

            let now = Utc::now();
            let mut read_by = std::collections::BTreeMap::new();
            // The sender has read their own message.
            read_by.insert(actor.uid.clone(), now);

            let message = Message {
                id: Uuid::new_v4().to_string(),
                sender_id: actor.uid,
                content: args.content,
                kind: args.kind,
                read_by,
                created_at: now,
            };
            let body = encode(&message)?;
            ctx.store()
                .put(&collections::project_messages(&project.id), &message.id, body)
                .await?;

            Ok(Reply::new(message).with_message("Message sent"))
        })
    }
}

/// Patch one milestone and recompute the project's aggregate progress.
pub struct UpdateMilestone;

#[derive(Debug, Deserialize)]
pub struct UpdateMilestoneArgs {
    pub project_id: String,
    pub milestone_id: String,
    #[serde(flatten)]
    pub patch: MilestonePatch,
}

impl Operation for UpdateMilestone {
    type Args = UpdateMilestoneArgs;
    type Output = Project;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "updateMilestone",
            description: Some("Patch one milestone and recompute project progress"),
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
            let mut project = load_project(ctx, &args.project_id).await?;
            policy::can_act_on_project(&actor.uid, &project)?;

            project.progress =
                apply_milestone_patch(&mut project.timeline, &args.milestone_id, &args.patch)?;
            project.updated_at = Utc::now();
            store_project(ctx, &project).await?;

            tracing::info!(
                project_id = %project.id,
                milestone_id = %args.milestone_id,
                progress = project.progress,
                "Milestone updated"
            );
            Ok(Reply::new(project).with_message("Milestone updated"))
        })
    }
}
