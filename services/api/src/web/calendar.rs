//! services/api/src/web/calendar.rs
//!
//! Calendar views and the two ways of rescheduling from them: dragging a
//! todo onto a cell, and arming an item then clicking a cell. Both gestures
//! are kept per user between requests.

use crate::web::middleware::UserId;
use crate::web::rest::{bad_request, parse_date_param, port_error, HandlerError};
use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{Local, NaiveTime};
use mind_brain_core::calendar::{self, Direction, ViewMode};
use mind_brain_core::domain::TodoPatch;
use mind_brain_core::schedule::parse_time;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

fn optional_time(raw: Option<&str>) -> Result<Option<NaiveTime>, HandlerError> {
    raw.filter(|t| !t.trim().is_empty()).map(parse_time).transpose().map_err(bad_request)
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    #[serde(default)]
    view: ViewMode,
    /// `yyyy-MM-dd`; today when absent.
    date: Option<String>,
    /// Step the anchor one period back or forward before building the view.
    nav: Option<Direction>,
}

/// Month, week or day view around a date.
#[utoipa::path(
    get,
    path = "/calendar",
    params(
        ("view" = Option<String>, Query, description = "month | week | day"),
        ("date" = Option<String>, Query, description = "Anchor date, yyyy-MM-dd"),
        ("nav" = Option<String>, Query, description = "prev | next")
    ),
    responses((status = 200, description = "Calendar view"), (status = 400, description = "Bad date"))
)]
pub async fn calendar_view(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CalendarQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let mut anchor = match query.date.as_deref() {
        Some(raw) => parse_date_param(raw)?,
        None => Local::now().date_naive(),
    };
    if let Some(direction) = query.nav {
        anchor = calendar::navigate(query.view, anchor, direction);
    }
    let todos = state.with_stores(|s| s.todos.list()).await?;
    Ok(Json(calendar::build_view(&todos, query.view, anchor)))
}

fn nothing_in_progress(what: &str) -> HandlerError {
    (StatusCode::CONFLICT, what.to_string())
}

/// The user's gesture state after a change.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureView {
    dragging: Option<String>,
    armed: Option<String>,
}

fn gesture_view(state: &AppState, user_id: &str) -> GestureView {
    state.sessions.with_calendar(user_id, |g| GestureView {
        dragging: g.drag.dragged().map(str::to_string),
        armed: g.armed.armed().map(str::to_string),
    })
}

//=========================================================================================
// Drag and Drop
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DragRequest {
    pub todo_id: String,
}

/// Pick up a todo. It stays picked up until dropped or the drag is cancelled.
#[utoipa::path(
    post,
    path = "/calendar/drag",
    request_body = DragRequest,
    responses((status = 200, description = "Gesture state"))
)]
pub async fn start_drag(
    State(state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(body): Json<DragRequest>,
) -> impl IntoResponse {
    state.sessions.with_calendar(&user_id, |g| g.drag.start(body.todo_id));
    Json(gesture_view(&state, &user_id))
}

#[utoipa::path(delete, path = "/calendar/drag", responses((status = 200, description = "Gesture state")))]
pub async fn cancel_drag(
    State(state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> impl IntoResponse {
    state.sessions.with_calendar(&user_id, |g| g.drag.cancel());
    Json(gesture_view(&state, &user_id))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DropRequest {
    /// Picks the todo up and drops it in one request; otherwise the todo
    /// picked up with `POST /calendar/drag` is dropped.
    pub todo_id: Option<String>,
    /// `yyyy-MM-dd` of the target cell.
    pub date: String,
    /// `HH:mm` of the target slot; month cells have none.
    pub time: Option<String>,
}

/// Drop a dragged todo onto a cell. The todo becomes a single-day item there.
#[utoipa::path(
    post,
    path = "/calendar/drop",
    request_body = DropRequest,
    responses(
        (status = 200, description = "Rescheduled todo"),
        (status = 400, description = "Bad date or time"),
        (status = 404, description = "Unknown todo"),
        (status = 409, description = "Nothing is being dragged")
    )
)]
pub async fn drop_todo(
    State(state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(body): Json<DropRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let date = parse_date_param(&body.date)?;
    let time = optional_time(body.time.as_deref())?;

    let dropped = state.sessions.with_calendar(&user_id, |g| {
        if let Some(todo_id) = body.todo_id.filter(|id| !id.is_empty()) {
            g.drag.start(todo_id);
        }
        g.drag.drop_on(date, time)
    });
    let (todo_id, schedule) = dropped.ok_or_else(|| nothing_in_progress("Nothing is being dragged"))?;

    let todo = state
        .with_stores(move |s| s.todos.update(&todo_id, TodoPatch::reschedule(schedule)))
        .await?
        .map_err(|e| port_error("Failed to reschedule todo", e))?;
    info!(todo_id = %todo.id, %date, "Todo dropped onto calendar");
    Ok(Json(todo))
}

//=========================================================================================
// Click to Schedule
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArmRequest {
    /// A todo or suggestion id.
    pub item_id: String,
}

/// Arm an item; the next clicked cell opens its schedule draft.
#[utoipa::path(
    post,
    path = "/calendar/arm",
    request_body = ArmRequest,
    responses((status = 200, description = "Gesture state"))
)]
pub async fn arm_item(
    State(state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(body): Json<ArmRequest>,
) -> impl IntoResponse {
    state.sessions.with_calendar(&user_id, |g| g.armed.arm(body.item_id));
    Json(gesture_view(&state, &user_id))
}

#[utoipa::path(delete, path = "/calendar/arm", responses((status = 200, description = "Gesture state")))]
pub async fn disarm_item(
    State(state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> impl IntoResponse {
    state.sessions.with_calendar(&user_id, |g| g.armed.disarm());
    Json(gesture_view(&state, &user_id))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftRequest {
    /// Arms this item first; otherwise the item armed with `POST /calendar/arm` is used.
    pub item_id: Option<String>,
    pub date: String,
    pub time: Option<String>,
}

/// Prefilled schedule dialog for an armed item clicked onto a cell.
///
/// Confirm it with `PATCH /todos/{id}` or, for a suggestion, the action-plan
/// schedule route. The item stays armed until disarmed.
#[utoipa::path(
    post,
    path = "/calendar/draft",
    request_body = DraftRequest,
    responses(
        (status = 200, description = "Schedule draft"),
        (status = 400, description = "Bad date or time"),
        (status = 409, description = "No item is armed")
    )
)]
pub async fn schedule_draft(
    State(state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(body): Json<DraftRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let date = parse_date_param(&body.date)?;
    let time = optional_time(body.time.as_deref())?;

    let draft = state.sessions.with_calendar(&user_id, |g| {
        if let Some(item_id) = body.item_id.filter(|id| !id.is_empty()) {
            g.armed.arm(item_id);
        }
        g.armed.click_cell(date, time)
    });
    draft.map(Json).ok_or_else(|| nothing_in_progress("No item is armed"))
}
