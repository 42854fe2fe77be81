//! crates/mind_brain_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like storage, the chat
//! completion provider or the Notion API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Message, NotionDatabase, NotionPageLayout, NotionSettings, NotionTodo, OAuthGrant, Todo};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., storage, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage
//=========================================================================================

/// A string-keyed blob store with last-write-wins semantics, the server-side
/// stand-in for browser local storage.
pub trait KeyValueStore: Send + Sync {
    /// Returns `Ok(None)` when nothing was ever written under `key`.
    fn get(&self, key: &str) -> PortResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> PortResult<()>;
}

//=========================================================================================
// Chat Completion
//=========================================================================================

/// Which system prompt the chat proxy injects in front of the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptKind {
    DeepDive,
    ActionPlan,
    MindMap,
    /// No system prompt; the transcript is forwarded as-is.
    Chat,
}

#[async_trait]
pub trait ChatCompletionService: Send + Sync {
    /// Sends a transcript and returns the assistant's reply text.
    ///
    /// `Ok(None)` means the provider answered without any content.
    async fn complete(&self, kind: PromptKind, messages: &[Message]) -> PortResult<Option<String>>;
}

//=========================================================================================
// Notion
//=========================================================================================

#[async_trait]
pub trait NotionGateway: Send + Sync {
    /// Exchanges an OAuth authorization code for an access token.
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> PortResult<OAuthGrant>;

    /// Lists the databases shared with the integration.
    async fn search_databases(&self, token: &str) -> PortResult<Vec<NotionDatabase>>;

    /// Reads one database; used as the manual connection test.
    async fn fetch_database(&self, token: &str, database_id: &str) -> PortResult<NotionDatabase>;

    /// Reads the database schema and picks the properties a todo page fills in.
    async fn page_layout(&self, token: &str, database_id: &str) -> PortResult<NotionPageLayout>;

    /// Creates a page for `todo` and returns the new page id.
    async fn create_todo_page(
        &self,
        token: &str,
        database_id: &str,
        layout: &NotionPageLayout,
        todo: &Todo,
    ) -> PortResult<String>;

    /// Reads every row of the database as a todo.
    async fn query_todos(&self, token: &str, database_id: &str) -> PortResult<Vec<NotionTodo>>;
}

#[async_trait]
pub trait NotionSettingsRepository: Send + Sync {
    async fn get_settings(&self, user_id: &str) -> PortResult<Option<NotionSettings>>;

    async fn upsert_settings(&self, user_id: &str, settings: &NotionSettings) -> PortResult<()>;
}
