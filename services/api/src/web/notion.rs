//! services/api/src/web/notion.rs
//!
//! Handlers for linking a Notion workspace and syncing todos with it.

use crate::web::middleware::UserId;
use crate::web::rest::{port_error, HandlerError};
use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
    Extension,
};
use chrono::{DateTime, Utc};
use mind_brain_core::domain::NotionSettings;
use mind_brain_core::notion::{
    self, CallbackParams, NotionError, OAuthStatus, SaveOutcome, AUTHORIZE_URL,
};
use mind_brain_core::ports::PortError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Maps a Notion failure to a status code and a message the user can act on.
fn notion_error(context: &str, e: NotionError) -> HandlerError {
    let status = match &e {
        NotionError::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
        NotionError::AuthorizationDenied(_)
        | NotionError::MissingCode
        | NotionError::StateMismatch
        | NotionError::MissingCredentials => StatusCode::BAD_REQUEST,
        NotionError::NotConnected | NotionError::NoDatabase => StatusCode::CONFLICT,
        NotionError::Port(PortError::Unauthorized) => StatusCode::UNAUTHORIZED,
        NotionError::Port(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
        NotionError::Port(PortError::Unexpected(_)) => StatusCode::BAD_GATEWAY,
    };
    if status.is_server_error() {
        error!("{}: {:?}", context, e);
    } else {
        warn!("{}: {}", context, e);
    }
    (status, format!("{}: {}", context, e))
}

/// What a client may see of the stored link; the token itself never leaves the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    connected: bool,
    has_token: bool,
    database_id: Option<String>,
    sync_enabled: bool,
    last_sync_at: Option<DateTime<Utc>>,
    workspace_id: Option<String>,
    workspace_name: Option<String>,
    oauth: OAuthStatus,
    can_save: bool,
}

impl SettingsView {
    fn new(settings: &NotionSettings, oauth: OAuthStatus, can_save: bool) -> Self {
        Self {
            connected: settings.is_connected(),
            has_token: settings.notion_api_token.as_deref().is_some_and(|t| !t.is_empty()),
            database_id: settings.notion_database_id.clone(),
            sync_enabled: settings.sync_enabled,
            last_sync_at: settings.last_sync_at,
            workspace_id: settings.workspace_id.clone(),
            workspace_name: settings.workspace_name.clone(),
            oauth,
            can_save,
        }
    }
}

fn view_for(state: &AppState, user_id: &str, settings: &NotionSettings) -> SettingsView {
    SettingsView::new(
        settings,
        state.sessions.oauth_status(user_id),
        state.sessions.manual_can_save(user_id),
    )
}

//=========================================================================================
// Settings
//=========================================================================================

#[utoipa::path(
    get,
    path = "/settings/notion",
    params(("x-user-id" = Option<String>, Header, description = "Acting user; guest-user when absent")),
    responses((status = 200, description = "The user's Notion link"))
)]
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> Result<impl IntoResponse, HandlerError> {
    let settings = state
        .notion_settings
        .get_settings(&user_id)
        .await
        .map_err(|e| port_error("Failed to load Notion settings", e))?
        .unwrap_or_default();
    Ok(Json(view_for(&state, &user_id, &settings)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsRequest {
    pub token: String,
    pub database_id: String,
}

/// Try a pasted API token against a database. Saving requires a passing test.
#[utoipa::path(
    post,
    path = "/settings/notion/test",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "The database is reachable"),
        (status = 400, description = "Missing token or database id"),
        (status = 401, description = "Notion rejected the token")
    )
)]
pub async fn test_connection(
    State(state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(body): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let mut setup = state.sessions.take_manual(&user_id);
    setup.set_credentials(body.token, body.database_id);
    let result = setup.test_connection(state.notion.as_ref()).await;
    state.sessions.put_manual(&user_id, setup);

    let database = result.map_err(|e| notion_error("Notion connection test failed", e))?;
    Ok(Json(json!({ "success": true, "database": database })))
}

/// Store the tested credentials and enable sync.
#[utoipa::path(
    put,
    path = "/settings/notion",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Saved"),
        (status = 409, description = "These credentials were not tested successfully")
    )
)]
pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    body: Option<Json<CredentialsRequest>>,
) -> Result<Response, HandlerError> {
    let mut setup = state.sessions.take_manual(&user_id);
    if let Some(Json(body)) = body {
        setup.set_credentials(body.token, body.database_id);
    }
    let result = setup.save(state.notion_settings.as_ref(), &user_id).await;
    state.sessions.put_manual(&user_id, setup);

    match result.map_err(|e| notion_error("Failed to save Notion settings", e))? {
        SaveOutcome::Saved(settings) => {
            info!(user_id = %user_id, "Notion settings saved");
            Ok(Json(view_for(&state, &user_id, &settings)).into_response())
        }
        SaveOutcome::NotTested => Err((
            StatusCode::CONFLICT,
            "Test the connection successfully before saving".to_string(),
        )),
    }
}

#[utoipa::path(
    post,
    path = "/settings/notion/disconnect",
    responses((status = 204, description = "Link removed"))
)]
pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> Result<impl IntoResponse, HandlerError> {
    notion::disconnect(state.notion_settings.as_ref(), &user_id)
        .await
        .map_err(|e| notion_error("Failed to disconnect Notion", e))?;
    state.sessions.forget_user_links(&user_id);
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// OAuth
//=========================================================================================

/// Redirect the browser to Notion's consent page.
#[utoipa::path(
    get,
    path = "/auth/notion/authorize",
    responses(
        (status = 303, description = "Redirect to Notion"),
        (status = 500, description = "OAuth client is not configured")
    )
)]
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> Result<impl IntoResponse, HandlerError> {
    let oauth_state = Uuid::new_v4().to_string();
    let mut flow = state.sessions.take_oauth(&user_id);
    let result = flow.begin(&state.oauth_config(), oauth_state.clone());
    state.sessions.put_oauth(&user_id, flow);

    let params = result.map_err(|e| notion_error("Cannot start Notion authorization", e))?;
    let url = reqwest::Url::parse_with_params(AUTHORIZE_URL, &params).map_err(|e| {
        error!("Failed to build the authorize URL: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to build the authorize URL".to_string())
    })?;
    state.sessions.remember_oauth_state(&oauth_state, &user_id);
    Ok(Redirect::to(url.as_str()))
}

/// Where Notion sends the browser back after consent.
#[utoipa::path(
    get,
    path = "/auth/notion/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code"),
        ("state" = Option<String>, Query, description = "State from the authorize redirect"),
        ("error" = Option<String>, Query, description = "Set when the user declined")
    ),
    responses(
        (status = 200, description = "Workspace linked"),
        (status = 400, description = "Denied, missing code or state mismatch")
    )
)]
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Extension(UserId(header_user)): Extension<UserId>,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = params
        .state
        .as_deref()
        .and_then(|s| state.sessions.claim_oauth_state(s))
        .unwrap_or(header_user);

    let mut flow = state.sessions.take_oauth(&user_id);
    let result = flow
        .complete(
            &state.oauth_config(),
            params,
            state.notion.as_ref(),
            state.notion_settings.as_ref(),
            &user_id,
        )
        .await;
    state.sessions.put_oauth(&user_id, flow);

    let outcome = result.map_err(|e| notion_error("Notion authorization failed", e))?;
    Ok(Json(json!({
        "settings": view_for(&state, &user_id, &outcome.settings),
        "databases": outcome.databases,
    })))
}

//=========================================================================================
// Sync
//=========================================================================================

/// Create a Notion page for every local todo.
#[utoipa::path(
    post,
    path = "/notion/sync/push",
    responses(
        (status = 200, description = "Per-todo results"),
        (status = 409, description = "Sync is not enabled")
    )
)]
pub async fn push(
    State(state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> Result<impl IntoResponse, HandlerError> {
    let todos = state.with_stores(|s| s.todos.list()).await?;
    let results = notion::push_todos(state.notion.as_ref(), state.notion_settings.as_ref(), &user_id, &todos)
        .await
        .map_err(|e| notion_error("Notion push failed", e))?;
    Ok(Json(results))
}

/// Import Notion rows whose content is not in the local list yet.
#[utoipa::path(
    post,
    path = "/notion/sync/pull",
    responses(
        (status = 200, description = "Imported todos"),
        (status = 409, description = "Sync is not enabled")
    )
)]
pub async fn pull(
    State(state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> Result<impl IntoResponse, HandlerError> {
    let rows = notion::pull_todos(state.notion.as_ref(), state.notion_settings.as_ref(), &user_id)
        .await
        .map_err(|e| notion_error("Notion pull failed", e))?;
    let pulled = rows.len();

    let created = state
        .with_stores(move |s| s.todos.add_many(notion::merge_pulled(&s.todos.list(), rows)))
        .await?
        .map_err(|e| port_error("Failed to save pulled todos", e))?;
    info!(user_id = %user_id, pulled, created = created.len(), "Pulled todos from Notion");
    Ok(Json(json!({ "pulled": pulled, "created": created })))
}
