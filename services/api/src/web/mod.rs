pub mod ai;
pub mod calendar;
pub mod middleware;
pub mod notion;
pub mod rest;
pub mod search;
pub mod state;
pub mod thoughts;
pub mod todos;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use middleware::resolve_user;
use rest::ApiDoc;
use state::AppState;

/// Every route of the service plus the Swagger UI, with the user resolved
/// for each request. CORS is left to the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        // --- Thoughts ---
        .route("/thoughts", get(thoughts::list_thoughts).post(thoughts::create_thought))
        .route(
            "/thoughts/{id}",
            get(thoughts::get_thought)
                .put(thoughts::update_thought)
                .delete(thoughts::delete_thought),
        )
        .route("/thoughts/by-date/{date}", get(thoughts::thoughts_by_date))
        // --- AI ---
        .route("/thoughts/{id}/deep-dive", post(ai::deep_dive_turn))
        .route("/thoughts/{id}/deep-dive/reset", post(ai::reset_deep_dive))
        .route("/thoughts/{id}/action-plan", post(ai::generate_plan))
        .route("/thoughts/{id}/action-plan/accept", post(ai::accept_plan))
        .route("/thoughts/{id}/action-plan/{action_id}/schedule", post(ai::schedule_action))
        .route("/thoughts/{id}/mind-map", get(ai::mind_map_view))
        .route("/ai-proxy", post(ai::ai_proxy))
        // --- Todos ---
        .route("/todos", get(todos::list_todos).post(todos::create_todo))
        .route(
            "/todos/{id}",
            get(todos::get_todo).patch(todos::update_todo).delete(todos::delete_todo),
        )
        .route("/todos/{id}/toggle", post(todos::toggle_todo))
        .route("/todos/by-date/{date}", get(todos::todos_by_date))
        // --- Calendar & Search ---
        .route("/calendar", get(calendar::calendar_view))
        .route("/calendar/drag", post(calendar::start_drag).delete(calendar::cancel_drag))
        .route("/calendar/drop", post(calendar::drop_todo))
        .route("/calendar/arm", post(calendar::arm_item).delete(calendar::disarm_item))
        .route("/calendar/draft", post(calendar::schedule_draft))
        .route("/search", get(search::search))
        // --- Notion ---
        .route("/settings/notion", get(notion::get_settings).put(notion::save_settings))
        .route("/settings/notion/test", post(notion::test_connection))
        .route("/settings/notion/disconnect", post(notion::disconnect))
        .route("/auth/notion/authorize", get(notion::authorize))
        .route("/auth/notion/callback", get(notion::callback))
        .route("/notion/sync/push", post(notion::push))
        .route("/notion/sync/pull", post(notion::pull))
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(rest::fallback)
        .layer(axum_middleware::from_fn(resolve_user))
}
