//! services/api/src/web/thoughts.rs
//!
//! CRUD handlers for the thought journal.

use crate::web::rest::{bad_request, not_found, parse_date_param, port_error, HandlerError};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ThoughtBody {
    pub content: String,
}

impl ThoughtBody {
    fn content(&self) -> Result<String, HandlerError> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(bad_request("Thought content must not be empty"));
        }
        Ok(content.to_string())
    }
}

/// List every thought, newest first.
#[utoipa::path(get, path = "/thoughts", responses((status = 200, description = "All thoughts")))]
pub async fn list_thoughts(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, HandlerError> {
    Ok(Json(state.with_stores(|s| s.thoughts.list()).await?))
}

/// Record a new thought.
#[utoipa::path(
    post,
    path = "/thoughts",
    request_body = ThoughtBody,
    responses(
        (status = 201, description = "Thought created"),
        (status = 400, description = "Empty content"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn create_thought(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ThoughtBody>,
) -> Result<impl IntoResponse, HandlerError> {
    let content = body.content()?;
    let thought = state
        .with_stores(move |s| s.thoughts.add(&content))
        .await?
        .map_err(|e| port_error("Failed to save thought", e))?;
    info!(thought_id = %thought.id, "Thought recorded");
    Ok((StatusCode::CREATED, Json(thought)))
}

#[utoipa::path(
    get,
    path = "/thoughts/{id}",
    params(("id" = String, Path, description = "Thought id")),
    responses((status = 200, description = "The thought"), (status = 404, description = "Unknown id"))
)]
pub async fn get_thought(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let key = id.clone();
    state
        .with_stores(move |s| s.thoughts.get_by_id(&key))
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Thought", &id))
}

#[utoipa::path(
    put,
    path = "/thoughts/{id}",
    params(("id" = String, Path, description = "Thought id")),
    request_body = ThoughtBody,
    responses((status = 200, description = "Updated thought"), (status = 404, description = "Unknown id"))
)]
pub async fn update_thought(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ThoughtBody>,
) -> Result<impl IntoResponse, HandlerError> {
    let content = body.content()?;
    let thought = state
        .with_stores(move |s| s.thoughts.update(&id, &content))
        .await?
        .map_err(|e| port_error("Failed to update thought", e))?;
    Ok(Json(thought))
}

/// Delete a thought and close any conversation open on it.
#[utoipa::path(
    delete,
    path = "/thoughts/{id}",
    params(("id" = String, Path, description = "Thought id")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Unknown id"))
)]
pub async fn delete_thought(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let key = id.clone();
    state
        .with_stores(move |s| s.thoughts.delete(&key))
        .await?
        .map_err(|e| port_error("Failed to delete thought", e))?;
    state.sessions.forget_thought(&id);
    Ok(StatusCode::NO_CONTENT)
}

/// Thoughts created on one calendar day.
#[utoipa::path(
    get,
    path = "/thoughts/by-date/{date}",
    params(("date" = String, Path, description = "yyyy-MM-dd")),
    responses((status = 200, description = "Thoughts of that day"), (status = 400, description = "Bad date"))
)]
pub async fn thoughts_by_date(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let date = parse_date_param(&date)?;
    Ok(Json(state.with_stores(move |s| s.thoughts.get_by_date(date)).await?))
}
