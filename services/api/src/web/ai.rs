//! services/api/src/web/ai.rs
//!
//! Handlers for everything that talks to the chat model: deep-dive turns,
//! action plans, mind maps and the raw completion proxy.

use crate::web::rest::{bad_request, not_found, port_error, HandlerError, ScheduleBody};
use crate::web::state::{AppState, LiveDeepDive};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use mind_brain_core::action_plan::{generate_action_plan, PendingActions, PlanSource};
use mind_brain_core::deep_dive::{SessionStatus, TurnOutcome};
use mind_brain_core::domain::{ActionItem, Message, Thought};
use mind_brain_core::mind_map::{self, CanvasSize, DrawCommand, MindMap, MindMapMode, Viewport};
use mind_brain_core::ports::PromptKind;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

async fn load_thought(state: &Arc<AppState>, id: &str) -> Result<Thought, HandlerError> {
    let key = id.to_string();
    state
        .with_stores(move |s| s.thoughts.get_by_id(&key))
        .await?
        .ok_or_else(|| not_found("Thought", id))
}

/// The conversation on a thought: the live session when one is open,
/// otherwise the transcript saved with the thought.
async fn conversation(state: &AppState, thought: &Thought) -> Vec<Message> {
    match state.sessions.existing_deep_dive(&thought.id) {
        Some(session) => session.lock().await.messages().to_vec(),
        None => thought.ai_conversation.clone().unwrap_or_default(),
    }
}

//=========================================================================================
// Deep Dive
//=========================================================================================

/// Hands the newest transcript to the store. Callers hold the session lock,
/// so saves land in turn order.
async fn save_transcript(state: &Arc<AppState>, id: &str, live: &LiveDeepDive) {
    let Some(messages) = live.take_unsaved() else {
        return;
    };
    let key = id.to_string();
    if let Ok(Err(e)) = state.with_stores(move |s| s.thoughts.attach_conversation(&key, &messages)).await {
        warn!(thought_id = %id, error = %e, "Failed to save deep-dive transcript");
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DeepDiveRequest {
    /// The user's next turn. Omit to just open the conversation.
    #[serde(default)]
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepDiveResponse {
    thought_id: String,
    messages: Vec<Message>,
    status: SessionStatus,
    error: Option<String>,
    outcome: Option<TurnOutcome>,
}

/// Send one turn of the guided conversation on a thought.
///
/// Chat failures do not fail the request: the user turn stays in the
/// transcript and `error` carries a message for the user.
#[utoipa::path(
    post,
    path = "/thoughts/{id}/deep-dive",
    params(("id" = String, Path, description = "Thought id")),
    request_body = DeepDiveRequest,
    responses((status = 200, description = "Visible transcript after the turn"), (status = 404, description = "Unknown thought"))
)]
pub async fn deep_dive_turn(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<DeepDiveRequest>>,
) -> Result<impl IntoResponse, HandlerError> {
    let thought = load_thought(&state, &id).await?;
    let live = state.sessions.deep_dive(&id, &thought.content, thought.ai_conversation.clone());
    let mut session = live.session.lock().await;

    let message = body.map(|Json(b)| b.message).unwrap_or_default();
    let outcome = if message.trim().is_empty() {
        None
    } else {
        Some(session.send_message(state.chat.as_ref(), &message).await)
    };
    save_transcript(&state, &id, &live).await;

    Ok(Json(DeepDiveResponse {
        thought_id: id,
        messages: session.visible_messages(),
        status: session.status(),
        error: session.error().map(str::to_string),
        outcome,
    }))
}

/// Start the conversation on a thought over.
#[utoipa::path(
    post,
    path = "/thoughts/{id}/deep-dive/reset",
    params(("id" = String, Path, description = "Thought id")),
    responses((status = 200, description = "Fresh transcript"), (status = 404, description = "Unknown thought"))
)]
pub async fn reset_deep_dive(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let thought = load_thought(&state, &id).await?;
    let live = state.sessions.deep_dive(&id, &thought.content, thought.ai_conversation.clone());
    let mut session = live.session.lock().await;
    session.reset();
    save_transcript(&state, &id, &live).await;

    Ok(Json(DeepDiveResponse {
        thought_id: id,
        messages: session.visible_messages(),
        status: session.status(),
        error: None,
        outcome: None,
    }))
}

//=========================================================================================
// Action Plans
//=========================================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    thought_id: String,
    items: Vec<ActionItem>,
    source: PlanSource,
    default_selection: Vec<String>,
}

/// Turn the thought and its conversation into up to five suggestions.
#[utoipa::path(
    post,
    path = "/thoughts/{id}/action-plan",
    params(("id" = String, Path, description = "Thought id")),
    responses((status = 200, description = "Suggested actions"), (status = 404, description = "Unknown thought"))
)]
pub async fn generate_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let thought = load_thought(&state, &id).await?;
    let messages = conversation(&state, &thought).await;
    let plan = generate_action_plan(state.chat.as_ref(), &thought.content, &messages).await;

    let (key, items) = (id.clone(), plan.items.clone());
    state
        .with_stores(move |s| s.thoughts.set_generated_actions(&key, &items))
        .await?
        .map_err(|e| port_error("Failed to save generated actions", e))?;
    let pending = PendingActions::new(id.clone(), plan.items.clone());
    let default_selection = pending.default_selection();
    state.sessions.set_pending_actions(&id, pending);
    info!(thought_id = %id, items = plan.items.len(), source = ?plan.source, "Action plan generated");

    Ok(Json(PlanResponse { thought_id: id, items: plan.items, source: plan.source, default_selection }))
}

/// The suggestions still pending for a thought, recovered from the saved
/// plan when the server has not seen it since startup.
fn pending_for(state: &AppState, thought: &Thought) -> Option<PendingActions> {
    state.sessions.pending_actions(&thought.id).or_else(|| {
        thought
            .generated_actions
            .clone()
            .map(|items| PendingActions::new(thought.id.clone(), items))
    })
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AcceptPlanRequest {
    /// Suggestion ids to turn into todos; omitted means the default selection.
    pub selected: Option<Vec<String>>,
}

/// Add the selected suggestions to the todo list.
#[utoipa::path(
    post,
    path = "/thoughts/{id}/action-plan/accept",
    params(("id" = String, Path, description = "Thought id")),
    request_body = AcceptPlanRequest,
    responses(
        (status = 201, description = "Created todos"),
        (status = 404, description = "Unknown thought or no plan yet")
    )
)]
pub async fn accept_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<AcceptPlanRequest>>,
) -> Result<impl IntoResponse, HandlerError> {
    let thought = load_thought(&state, &id).await?;
    let pending = pending_for(&state, &thought).ok_or_else(|| not_found("Action plan for thought", &id))?;
    let selected = body
        .and_then(|Json(b)| b.selected)
        .unwrap_or_else(|| pending.default_selection());

    let batch = pending.accept(&selected);
    let created = state
        .with_stores(move |s| s.todos.add_many(batch))
        .await?
        .map_err(|e| port_error("Failed to save accepted actions", e))?;
    info!(thought_id = %id, accepted = created.len(), "Suggestions accepted");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Schedule one suggestion: it becomes a todo and leaves the pending list.
///
/// The suggestion is only dropped once its todo is saved.
#[utoipa::path(
    post,
    path = "/thoughts/{id}/action-plan/{action_id}/schedule",
    params(
        ("id" = String, Path, description = "Thought id"),
        ("action_id" = String, Path, description = "Suggestion id")
    ),
    request_body = ScheduleBody,
    responses(
        (status = 201, description = "Created todo"),
        (status = 400, description = "Missing or invalid schedule"),
        (status = 404, description = "Unknown thought or suggestion")
    )
)]
pub async fn schedule_action(
    State(state): State<Arc<AppState>>,
    Path((id, action_id)): Path<(String, String)>,
    Json(body): Json<ScheduleBody>,
) -> Result<impl IntoResponse, HandlerError> {
    let schedule = body
        .parse()
        .map_err(bad_request)?
        .ok_or_else(|| bad_request("startDate is required"))?;
    let thought = load_thought(&state, &id).await?;
    let pending = pending_for(&state, &thought).ok_or_else(|| not_found("Suggestion", &action_id))?;
    let new_todo = pending
        .schedule(&action_id, schedule)
        .ok_or_else(|| not_found("Suggestion", &action_id))?;

    let todo = state
        .with_stores(move |s| s.todos.add(new_todo))
        .await?
        .map_err(|e| port_error("Failed to save scheduled action", e))?;

    let remaining = state.sessions.with_pending_actions(&id, || pending, |list| {
        list.remove(&action_id);
        list.items().to_vec()
    });
    let key = id.clone();
    if let Ok(Err(e)) = state.with_stores(move |s| s.thoughts.set_generated_actions(&key, &remaining)).await {
        warn!(thought_id = %id, error = %e, "Failed to update pending actions");
    }
    Ok((StatusCode::CREATED, Json(todo)))
}

//=========================================================================================
// Mind Map
//=========================================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMapQuery {
    #[serde(default)]
    mode: MindMapMode,
    format: Option<String>,
    zoom: Option<f64>,
    offset_x: Option<f64>,
    offset_y: Option<f64>,
    width: Option<f64>,
    height: Option<f64>,
    /// Screen point of the pointer, used to pick the hovered node.
    pointer_x: Option<f64>,
    pointer_y: Option<f64>,
}

impl MindMapQuery {
    fn check_finite(&self) -> Result<(), HandlerError> {
        let values = [self.zoom, self.offset_x, self.offset_y, self.width, self.height, self.pointer_x, self.pointer_y];
        if values.into_iter().flatten().all(f64::is_finite) {
            Ok(())
        } else {
            Err(bad_request("Mind-map view values must be finite numbers"))
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoveredNode {
    id: String,
    tooltip: String,
}

#[derive(Serialize)]
pub struct MindMapResponse {
    #[serde(flatten)]
    map: MindMap,
    hovered: Option<HoveredNode>,
    commands: Vec<DrawCommand>,
}

/// The conversation on a thought as a node graph, as JSON draw commands or SVG.
#[utoipa::path(
    get,
    path = "/thoughts/{id}/mind-map",
    params(
        ("id" = String, Path, description = "Thought id"),
        ("mode" = Option<String>, Query, description = "ai | local"),
        ("format" = Option<String>, Query, description = "json | svg")
    ),
    responses(
        (status = 200, description = "The mind map"),
        (status = 400, description = "A view value is not a finite number"),
        (status = 404, description = "Unknown thought")
    )
)]
pub async fn mind_map_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<MindMapQuery>,
) -> Result<Response, HandlerError> {
    query.check_finite()?;
    let thought = load_thought(&state, &id).await?;
    let messages = conversation(&state, &thought).await;
    let map = mind_map::build_mind_map(state.chat.as_ref(), &thought.content, &messages, query.mode).await;

    let viewport = Viewport::with(
        query.zoom.unwrap_or(1.0),
        query.offset_x.unwrap_or(0.0),
        query.offset_y.unwrap_or(0.0),
    );
    let canvas = CanvasSize::bounded(query.width, query.height);
    let hovered = match (query.pointer_x, query.pointer_y) {
        (Some(x), Some(y)) => viewport.hit_test(&map.graph, x, y),
        _ => None,
    };
    let commands = mind_map::render(&map.graph, &viewport, hovered.map(|n| n.id.as_str()), canvas);

    if query.format.as_deref() == Some("svg") {
        let svg = mind_map::to_svg(&commands, &viewport, canvas);
        return Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response());
    }

    let hovered = hovered.map(|n| HoveredNode { id: n.id.clone(), tooltip: n.tooltip().to_string() });
    Ok(Json(MindMapResponse { map, hovered, commands }).into_response())
}

//=========================================================================================
// Completion Proxy
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProxyRequest {
    /// deep-dive | action-plan | mind-map | chat
    #[serde(rename = "type")]
    #[schema(value_type = String)]
    pub kind: PromptKind,
    #[schema(value_type = Vec<Object>)]
    pub messages: Vec<Message>,
}

/// Forward a transcript to the chat model with the system prompt for its type.
///
/// The reply mirrors the chat-completions shape so existing clients can read
/// `choices[0].message.content`.
#[utoipa::path(
    post,
    path = "/ai-proxy",
    request_body = ProxyRequest,
    responses(
        (status = 200, description = "Completion in chat-completions shape"),
        (status = 400, description = "No messages"),
        (status = 502, description = "The chat service failed")
    )
)]
pub async fn ai_proxy(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ProxyRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    if body.messages.is_empty() {
        return Err(bad_request("messages must not be empty"));
    }
    match state.chat.complete(body.kind, &body.messages).await {
        Ok(Some(content)) => Ok(Json(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))),
        Ok(None) => Err((StatusCode::BAD_GATEWAY, "The chat service returned no content".to_string())),
        Err(e) => {
            error!("Chat completion failed: {:?}", e);
            Err((StatusCode::BAD_GATEWAY, format!("The chat service failed: {}", e)))
        }
    }
}
