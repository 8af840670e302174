//! Chatbot operations.
//!
//! Queries are answered synchronously by the rule table in
//! `capstone_core::chatbot`; every exchange is persisted so users can rate
//! it afterwards and browse their history.

use std::future::Future;
use std::pin::Pin;

use capstone_core::{chatbot, policy, ApiError, ChatLanguage, ChatbotInteraction, Result};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{encode, require_actor, DEFAULT_LIST_LIMIT};
use crate::context::OpContext;
use crate::registry::{Operation, OperationInfo, OperationKind, Reply};
use crate::store::{collections, fetch_required, DocumentStore};

async fn load_interaction(ctx: &OpContext, id: &str) -> Result<ChatbotInteraction> {
    fetch_required(ctx.store(), collections::CHATBOT, id, "Interaction").await
}

/// Answer a query and persist the exchange.
pub struct SendChatbotQuery;

#[derive(Debug, Deserialize)]
pub struct SendChatbotQueryArgs {
    pub query: String,
    #[serde(default)]
    pub language: ChatLanguage,
    /// Opaque client context stored alongside the exchange.
    pub context: Option<Value>,
}

impl Operation for SendChatbotQuery {
    type Args = SendChatbotQueryArgs;
    type Output = ChatbotInteraction;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "sendChatbotQuery",
            description: Some("Answer a query and record the exchange"),
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

            if args.query.trim().is_empty() {
                return Err(ApiError::InvalidArgument("A query is required".into()));
            }

            let response = chatbot::respond(&args.query, args.language);
            let interaction = ChatbotInteraction {
                id: Uuid::new_v4().to_string(),
                user_id: actor.uid,
                query: args.query,
                response: response.to_string(),
                language: args.language,
                rating: None,
                feedback: None,
                context: args.context,
                created_at: Utc::now(),
            };
            let body = encode(&interaction)?;
            ctx.store()
                .put(collections::CHATBOT, &interaction.id, body)
                .await?;

            Ok(Reply::new(interaction))
        })
    }
}

/// Rate a previous chatbot response.
pub struct RateChatbotResponse;

#[derive(Debug, Deserialize)]
pub struct RateChatbotResponseArgs {
    pub interaction_id: String,
    pub rating: u8,
    pub feedback: Option<String>,
}

impl Operation for RateChatbotResponse {
    type Args = RateChatbotResponseArgs;
    type Output = ChatbotInteraction;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "rateChatbotResponse",
            description: Some("Rate a previous chatbot response"),
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
            let mut interaction = load_interaction(ctx, &args.interaction_id).await?;
            policy::can_modify_interaction(&actor.uid, &interaction)?;

            if !(1..=5).contains(&args.rating) {
                return Err(ApiError::InvalidArgument(
                    "Rating must be between 1 and 5".into(),
                ));
            }

            interaction.rating = Some(args.rating);
            if let Some(feedback) = args.feedback {
                interaction.feedback = Some(feedback);
            }
            let body = encode(&interaction)?;
            ctx.store()
                .put(collections::CHATBOT, &interaction.id, body)
                .await?;

            Ok(Reply::new(interaction).with_message("Feedback recorded"))
        })
    }
}

/// Delete one of the caller's chatbot interactions.
pub struct DeleteChatbotInteraction;

#[derive(Debug, Deserialize)]
pub struct DeleteChatbotInteractionArgs {
    pub interaction_id: String,
}

impl Operation for DeleteChatbotInteraction {
    type Args = DeleteChatbotInteractionArgs;
    type Output = Value;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "deleteChatbotInteraction",
            description: Some("Delete one chatbot interaction"),
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
            let interaction = load_interaction(ctx, &args.interaction_id).await?;
            policy::can_modify_interaction(&actor.uid, &interaction)?;

            ctx.store()
                .delete(collections::CHATBOT, &interaction.id)
                .await?;

            Ok(Reply::new(serde_json::json!({ "id": interaction.id }))
                .with_message("Interaction deleted"))
        })
    }
}

/// List the caller's chatbot history, newest first.
pub struct GetChatbotHistory;

#[derive(Debug, Deserialize)]
pub struct GetChatbotHistoryArgs {
    pub limit: Option<usize>,
}

impl Operation for GetChatbotHistory {
    type Args = GetChatbotHistoryArgs;
    type Output = Vec<ChatbotInteraction>;

    fn info() -> OperationInfo {
        OperationInfo {
            name: "getChatbotHistory",
            description: Some("List the caller's chatbot history, newest first"),
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

            let query = crate::store::ListQuery::new()
                .filter("user_id", Value::String(actor.uid))
                .order_desc("created_at")
                .limit(args.limit.unwrap_or(DEFAULT_LIST_LIMIT));
            let docs = ctx.store().list(collections::CHATBOT, query).await?;

            let history = docs
                .into_iter()
                .map(|doc| doc.decode::<ChatbotInteraction>())
                .collect::<Result<Vec<_>>>()?;
            Ok(Reply::new(history))
        })
    }
}
