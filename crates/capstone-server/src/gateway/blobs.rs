//! Direct blob upload/download endpoint.
//!
//! Clients never send file bytes through the operation layer. An upload
//! URL minted by `requestFileUpload` points here with a scoped token; the
//! handler validates the token against the exact path before touching the
//! blob store.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use capstone_core::Result;
use serde::Deserialize;

use super::response::CallResponse;
use crate::blob::{BlobStore, UrlScope};
use crate::context::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    token: String,
}

/// Axum handler for `PUT /blobs/{*path}`.
pub async fn put_blob(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Query(query): Query<TokenQuery>,
    body: Bytes,
) -> Response {
    match put_inner(&state, &path, &query.token, body).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => CallResponse::error(err.into()).into_response(),
    }
}

async fn put_inner(state: &AppState, path: &str, token: &str, body: Bytes) -> Result<()> {
    state.signer.verify(token, path, UrlScope::Put)?;
    state.blobs.write(path, body.to_vec()).await
}

/// Axum handler for `GET /blobs/{*path}`.
pub async fn get_blob(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Response {
    match get_inner(&state, &path, &query.token).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response(),
        Err(err) => CallResponse::error(err.into()).into_response(),
    }
}

async fn get_inner(state: &AppState, path: &str, token: &str) -> Result<Vec<u8>> {
    state.signer.verify(token, path, UrlScope::Get)?;
    state.blobs.read(path).await
}
