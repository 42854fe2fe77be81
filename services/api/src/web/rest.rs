//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, plus the payload
//! pieces and error mapping shared by every REST handler.

use axum::http::StatusCode;
use axum::response::Json;
use mind_brain_core::ports::PortError;
use mind_brain_core::schedule::{Schedule, ScheduleError};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};

use crate::web::{ai, calendar, notion, search, thoughts, todos};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        thoughts::list_thoughts,
        thoughts::create_thought,
        thoughts::get_thought,
        thoughts::update_thought,
        thoughts::delete_thought,
        thoughts::thoughts_by_date,
        ai::deep_dive_turn,
        ai::reset_deep_dive,
        ai::generate_plan,
        ai::accept_plan,
        ai::schedule_action,
        ai::mind_map_view,
        ai::ai_proxy,
        todos::list_todos,
        todos::create_todo,
        todos::get_todo,
        todos::update_todo,
        todos::delete_todo,
        todos::toggle_todo,
        todos::todos_by_date,
        calendar::calendar_view,
        calendar::start_drag,
        calendar::cancel_drag,
        calendar::drop_todo,
        calendar::arm_item,
        calendar::disarm_item,
        calendar::schedule_draft,
        search::search,
        notion::get_settings,
        notion::test_connection,
        notion::save_settings,
        notion::disconnect,
        notion::authorize,
        notion::callback,
        notion::push,
        notion::pull,
    ),
    components(
        schemas(
            ScheduleBody,
            thoughts::ThoughtBody,
            ai::DeepDiveRequest,
            ai::AcceptPlanRequest,
            ai::ProxyRequest,
            todos::CreateTodoRequest,
            todos::UpdateTodoRequest,
            calendar::DragRequest,
            calendar::DropRequest,
            calendar::ArmRequest,
            calendar::DraftRequest,
            notion::CredentialsRequest,
        )
    ),
    tags(
        (name = "Mind-Brain API", description = "Thoughts, AI deep-dives, todos, the calendar and Notion sync.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Payload Pieces
//=========================================================================================

/// The four schedule fields as sent by clients. Empty strings count as absent.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleBody {
    /// `yyyy-MM-dd`
    pub start_date: Option<String>,
    /// `HH:mm`
    pub start_time: Option<String>,
    pub end_date: Option<String>,
    pub end_time: Option<String>,
}

impl ScheduleBody {
    /// `Ok(None)` when no start date was sent.
    pub fn parse(&self) -> Result<Option<Schedule>, ScheduleError> {
        let Some(start_date) = self.start_date.as_deref().filter(|d| !d.trim().is_empty()) else {
            return Ok(None);
        };
        Schedule::parse(
            start_date,
            self.start_time.as_deref(),
            self.end_date.as_deref(),
            self.end_time.as_deref(),
        )
        .map(Some)
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

pub type HandlerError = (StatusCode, String);

/// Maps a port failure to a status code, logging server-side failures.
pub fn port_error(context: &str, e: PortError) -> HandlerError {
    let status = match &e {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("{}: {:?}", context, e);
    } else {
        warn!("{}: {}", context, e);
    }
    (status, format!("{}: {}", context, e))
}

pub fn bad_request(message: impl std::fmt::Display) -> HandlerError {
    (StatusCode::BAD_REQUEST, message.to_string())
}

pub fn not_found(what: &str, id: &str) -> HandlerError {
    (StatusCode::NOT_FOUND, format!("{} {} not found", what, id))
}

pub fn parse_date_param(raw: &str) -> Result<chrono::NaiveDate, HandlerError> {
    mind_brain_core::schedule::parse_date(raw).map_err(bad_request)
}

/// Body of every unmatched route.
pub async fn fallback() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}
