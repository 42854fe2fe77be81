//! services/api/src/web/search.rs

use crate::web::rest::HandlerError;
use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};
use mind_brain_core::domain::{Thought, Todo};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    thoughts: Vec<Thought>,
    todos: Vec<Todo>,
}

/// Case-insensitive substring search over thought and todo content.
#[utoipa::path(
    get,
    path = "/search",
    params(("q" = String, Query, description = "Text to look for")),
    responses((status = 200, description = "Matching thoughts and todos"))
)]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let needle = query.q.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(Json(SearchResults { thoughts: Vec::new(), todos: Vec::new() }));
    }
    let (thoughts, todos) = state.with_stores(|s| (s.thoughts.list(), s.todos.list())).await?;
    let matches = |text: &str| text.to_lowercase().contains(&needle);

    Ok(Json(SearchResults {
        thoughts: thoughts.into_iter().filter(|t| matches(&t.content)).collect(),
        todos: todos.into_iter().filter(|t| matches(&t.content)).collect(),
    }))
}
