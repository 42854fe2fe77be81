//! services/api/src/web/todos.rs
//!
//! Handlers for the todo list.

use crate::web::rest::{bad_request, not_found, parse_date_param, port_error, HandlerError, ScheduleBody};
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use mind_brain_core::domain::{Bucket, NewTodo, Priority, TodoPatch};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// done | scheduled | action_list | available
    bucket: Option<String>,
}

fn parse_bucket(raw: &str) -> Result<Bucket, HandlerError> {
    match raw {
        "done" => Ok(Bucket::Done),
        "scheduled" => Ok(Bucket::Scheduled),
        "action_list" => Ok(Bucket::ActionList),
        "available" => Ok(Bucket::Available),
        other => Err(bad_request(format!("Unknown bucket '{}'", other))),
    }
}

/// List todos, optionally only one bucket of them.
#[utoipa::path(
    get,
    path = "/todos",
    params(("bucket" = Option<String>, Query, description = "done | scheduled | action_list | available")),
    responses((status = 200, description = "Todos"), (status = 400, description = "Unknown bucket"))
)]
pub async fn list_todos(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let bucket = query.bucket.as_deref().map(parse_bucket).transpose()?;
    let todos = state
        .with_stores(move |s| match bucket {
            Some(bucket) => s.todos.in_bucket(bucket),
            None => s.todos.list(),
        })
        .await?;
    Ok(Json(todos))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoRequest {
    pub content: String,
    #[serde(default)]
    pub done: bool,
    pub thought_id: Option<String>,
    pub category: Option<String>,
    #[schema(value_type = Option<String>)]
    pub priority: Option<Priority>,
    pub time_estimate: Option<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub schedule: ScheduleBody,
}

#[utoipa::path(
    post,
    path = "/todos",
    request_body = CreateTodoRequest,
    responses(
        (status = 201, description = "Todo created"),
        (status = 400, description = "Empty content or invalid schedule")
    )
)]
pub async fn create_todo(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTodoRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let content = body.content.trim();
    if content.is_empty() {
        return Err(bad_request("Todo content must not be empty"));
    }
    let new = NewTodo {
        content: content.to_string(),
        done: body.done,
        thought_id: body.thought_id.filter(|id| !id.is_empty()),
        category: body.category,
        priority: body.priority,
        time_estimate: body.time_estimate,
        schedule: body.schedule.parse().map_err(bad_request)?,
        notes: body.notes,
    };
    let todo = state
        .with_stores(move |s| s.todos.add(new))
        .await?
        .map_err(|e| port_error("Failed to save todo", e))?;
    Ok((StatusCode::CREATED, Json(todo)))
}

#[utoipa::path(
    get,
    path = "/todos/{id}",
    params(("id" = String, Path, description = "Todo id")),
    responses((status = 200, description = "The todo"), (status = 404, description = "Unknown id"))
)]
pub async fn get_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let key = id.clone();
    state
        .with_stores(move |s| s.todos.get_by_id(&key))
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Todo", &id))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoRequest {
    pub content: Option<String>,
    pub done: Option<bool>,
    pub category: Option<String>,
    #[schema(value_type = Option<String>)]
    pub priority: Option<Priority>,
    pub time_estimate: Option<String>,
    pub notes: Option<String>,
    /// Removes the schedule; ignored when a new start date is sent.
    #[serde(default)]
    pub clear_schedule: bool,
    #[serde(flatten)]
    pub schedule: ScheduleBody,
}

impl UpdateTodoRequest {
    fn into_patch(self) -> Result<TodoPatch, HandlerError> {
        let schedule = match self.schedule.parse().map_err(bad_request)? {
            Some(schedule) => Some(Some(schedule)),
            None if self.clear_schedule => Some(None),
            None => None,
        };
        Ok(TodoPatch {
            content: self.content,
            done: self.done,
            category: self.category,
            priority: self.priority,
            time_estimate: self.time_estimate,
            notes: self.notes,
            schedule,
        })
    }
}

/// Change some fields of a todo. A start date replaces the whole schedule.
#[utoipa::path(
    patch,
    path = "/todos/{id}",
    params(("id" = String, Path, description = "Todo id")),
    request_body = UpdateTodoRequest,
    responses(
        (status = 200, description = "Updated todo"),
        (status = 400, description = "Invalid schedule"),
        (status = 404, description = "Unknown id")
    )
)]
pub async fn update_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTodoRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let patch = body.into_patch()?;
    let todo = state
        .with_stores(move |s| s.todos.update(&id, patch))
        .await?
        .map_err(|e| port_error("Failed to update todo", e))?;
    Ok(Json(todo))
}

#[utoipa::path(
    delete,
    path = "/todos/{id}",
    params(("id" = String, Path, description = "Todo id")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Unknown id"))
)]
pub async fn delete_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    state
        .with_stores(move |s| s.todos.delete(&id))
        .await?
        .map_err(|e| port_error("Failed to delete todo", e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/todos/{id}/toggle",
    params(("id" = String, Path, description = "Todo id")),
    responses((status = 200, description = "Toggled todo"), (status = 404, description = "Unknown id"))
)]
pub async fn toggle_todo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let todo = state
        .with_stores(move |s| s.todos.toggle(&id))
        .await?
        .map_err(|e| port_error("Failed to toggle todo", e))?;
    Ok(Json(todo))
}

/// Todos whose schedule covers a day.
#[utoipa::path(
    get,
    path = "/todos/by-date/{date}",
    params(("date" = String, Path, description = "yyyy-MM-dd")),
    responses((status = 200, description = "Todos on that day"), (status = 400, description = "Bad date"))
)]
pub async fn todos_by_date(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let date = parse_date_param(&date)?;
    Ok(Json(state.with_stores(move |s| s.todos.get_by_date(date)).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_schedule_only_applies_without_a_new_start() {
        let request = UpdateTodoRequest { clear_schedule: true, ..Default::default() };
        assert_eq!(request.into_patch().unwrap().schedule, Some(None));

        let request = UpdateTodoRequest {
            clear_schedule: true,
            schedule: ScheduleBody { start_date: Some("2025-02-03".into()), ..Default::default() },
            ..Default::default()
        };
        assert!(matches!(request.into_patch().unwrap().schedule, Some(Some(_))));
    }

    #[test]
    fn untouched_schedule_stays_untouched() {
        assert_eq!(UpdateTodoRequest::default().into_patch().unwrap().schedule, None);
    }

    #[test]
    fn bucket_names_match_the_wire_format() {
        assert_eq!(parse_bucket("action_list").unwrap(), Bucket::ActionList);
        assert_eq!(parse_bucket("later").unwrap_err().0, StatusCode::BAD_REQUEST);
    }
}
