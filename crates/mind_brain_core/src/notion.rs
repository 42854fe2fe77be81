//! crates/mind_brain_core/src/notion.rs
//!
//! Linking a Notion workspace (OAuth or a manual API token) and the one-shot
//! batch sync of todos in both directions.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{NewTodo, NotionDatabase, NotionSettings, NotionTodo, Todo};
use crate::ports::{NotionGateway, NotionSettingsRepository, PortError};
use crate::schedule::Schedule;

pub const AUTHORIZE_URL: &str = "https://api.notion.com/v1/oauth/authorize";

#[derive(Debug, thiserror::Error)]
pub enum NotionError {
    #[error("Notion OAuth is not configured: missing {0}")]
    NotConfigured(&'static str),
    #[error("Authorization was denied: {0}")]
    AuthorizationDenied(String),
    #[error("The callback carried no authorization code")]
    MissingCode,
    #[error("The callback state does not match the pending authorization")]
    StateMismatch,
    #[error("An API token and a database id are both required")]
    MissingCredentials,
    #[error("Notion sync is not enabled")]
    NotConnected,
    #[error("No Notion database is selected")]
    NoDatabase,
    #[error(transparent)]
    Port(#[from] PortError),
}

//=========================================================================================
// OAuth
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct OAuthConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
}

impl OAuthConfig {
    /// Query parameters of the authorize redirect.
    pub fn authorize_params(&self, state: &str) -> Result<Vec<(&'static str, String)>, NotionError> {
        let client_id = self.client_id.clone().ok_or(NotionError::NotConfigured("client id"))?;
        if self.client_secret.is_none() {
            return Err(NotionError::NotConfigured("client secret"));
        }
        Ok(vec![
            ("client_id", client_id),
            ("response_type", "code".to_string()),
            ("owner", "user".to_string()),
            ("redirect_uri", self.redirect_uri.clone()),
            ("state", state.to_string()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum OAuthStatus {
    Disconnected,
    Connecting,
    Exchanging,
    Connected,
    Error(String),
}

/// Query parameters Notion sends back to the redirect URI.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OAuthOutcome {
    pub settings: NotionSettings,
    pub databases: Vec<NotionDatabase>,
}

/// One user's way through the authorization redirect.
#[derive(Debug, Clone)]
pub struct OAuthFlow {
    status: OAuthStatus,
    pending_state: Option<String>,
}

impl Default for OAuthFlow {
    fn default() -> Self {
        Self { status: OAuthStatus::Disconnected, pending_state: None }
    }
}

impl OAuthFlow {
    pub fn status(&self) -> &OAuthStatus {
        &self.status
    }

    /// Starts a redirect and remembers `state` for the callback.
    pub fn begin(&mut self, config: &OAuthConfig, state: String) -> Result<Vec<(&'static str, String)>, NotionError> {
        let params = config.authorize_params(&state).inspect_err(|e| {
            self.status = OAuthStatus::Error(e.to_string());
        })?;
        self.pending_state = Some(state);
        self.status = OAuthStatus::Connecting;
        Ok(params)
    }

    /// Handles the redirect back from Notion: exchanges the code, picks the
    /// first shared database and stores the link for `user_id`.
    pub async fn complete(
        &mut self,
        config: &OAuthConfig,
        params: CallbackParams,
        gateway: &dyn NotionGateway,
        settings: &dyn NotionSettingsRepository,
        user_id: &str,
    ) -> Result<OAuthOutcome, NotionError> {
        let result = self.exchange(config, params, gateway, settings, user_id).await;
        self.pending_state = None;
        self.status = match &result {
            Ok(_) => OAuthStatus::Connected,
            Err(e) => OAuthStatus::Error(e.to_string()),
        };
        result
    }

    async fn exchange(
        &mut self,
        config: &OAuthConfig,
        params: CallbackParams,
        gateway: &dyn NotionGateway,
        settings: &dyn NotionSettingsRepository,
        user_id: &str,
    ) -> Result<OAuthOutcome, NotionError> {
        if let Some(error) = params.error {
            return Err(NotionError::AuthorizationDenied(error));
        }
        let code = params.code.filter(|c| !c.is_empty()).ok_or(NotionError::MissingCode)?;
        if let Some(expected) = &self.pending_state {
            if params.state.as_deref() != Some(expected.as_str()) {
                return Err(NotionError::StateMismatch);
            }
        }
        if config.client_id.is_none() {
            return Err(NotionError::NotConfigured("client id"));
        }
        if config.client_secret.is_none() {
            return Err(NotionError::NotConfigured("client secret"));
        }

        self.status = OAuthStatus::Exchanging;
        let grant = gateway.exchange_code(&code, &config.redirect_uri).await?;
        let databases = gateway.search_databases(&grant.access_token).await.unwrap_or_else(|e| {
            warn!(error = %e, "Database search after authorization failed");
            Vec::new()
        });

        let linked = NotionSettings {
            notion_api_token: Some(grant.access_token),
            notion_database_id: databases.first().map(|db| db.id.clone()),
            sync_enabled: true,
            last_sync_at: None,
            workspace_id: grant.workspace_id,
            workspace_name: grant.workspace_name,
            bot_id: grant.bot_id,
        };
        settings.upsert_settings(user_id, &linked).await?;
        info!(user_id, databases = databases.len(), "Notion workspace linked");

        Ok(OAuthOutcome { settings: linked, databases })
    }
}

pub async fn is_connected(settings: &dyn NotionSettingsRepository, user_id: &str) -> Result<bool, NotionError> {
    Ok(settings.get_settings(user_id).await?.is_some_and(|s| s.is_connected()))
}

/// Forgets the token and target database and turns sync off.
pub async fn disconnect(settings: &dyn NotionSettingsRepository, user_id: &str) -> Result<(), NotionError> {
    let mut current = settings.get_settings(user_id).await?.unwrap_or_default();
    current.notion_api_token = None;
    current.notion_database_id = None;
    current.last_sync_at = None;
    current.sync_enabled = false;
    settings.upsert_settings(user_id, &current).await?;
    info!(user_id, "Notion workspace disconnected");
    Ok(())
}

//=========================================================================================
// Manual Setup
//=========================================================================================

#[derive(Debug, Clone)]
struct ConnectionTest {
    token: String,
    database_id: String,
    database: Option<NotionDatabase>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "settings", rename_all = "snake_case")]
pub enum SaveOutcome {
    Saved(NotionSettings),
    /// The credentials were never successfully tested; nothing was written.
    NotTested,
}

/// Setting up sync with a pasted API token. Saving is only possible after a
/// successful connection test of exactly these credentials.
#[derive(Debug, Clone, Default)]
pub struct ManualSetup {
    token: String,
    database_id: String,
    last_test: Option<ConnectionTest>,
}

impl ManualSetup {
    pub fn set_credentials(&mut self, token: impl Into<String>, database_id: impl Into<String>) {
        self.token = token.into().trim().to_string();
        self.database_id = database_id.into().trim().to_string();
        let still_valid = self
            .last_test
            .as_ref()
            .is_some_and(|t| t.token == self.token && t.database_id == self.database_id);
        if !still_valid {
            self.last_test = None;
        }
    }

    pub fn can_save(&self) -> bool {
        self.last_test.as_ref().is_some_and(|t| {
            t.database.is_some() && t.token == self.token && t.database_id == self.database_id
        })
    }

    pub async fn test_connection(&mut self, gateway: &dyn NotionGateway) -> Result<NotionDatabase, NotionError> {
        if self.token.is_empty() || self.database_id.is_empty() {
            return Err(NotionError::MissingCredentials);
        }
        let result = gateway.fetch_database(&self.token, &self.database_id).await;
        self.last_test = Some(ConnectionTest {
            token: self.token.clone(),
            database_id: self.database_id.clone(),
            database: result.as_ref().ok().cloned(),
        });
        Ok(result?)
    }

    pub async fn save(
        &self,
        settings: &dyn NotionSettingsRepository,
        user_id: &str,
    ) -> Result<SaveOutcome, NotionError> {
        if !self.can_save() {
            return Ok(SaveOutcome::NotTested);
        }
        let mut current = settings.get_settings(user_id).await?.unwrap_or_default();
        current.notion_api_token = Some(self.token.clone());
        current.notion_database_id = Some(self.database_id.clone());
        current.sync_enabled = true;
        settings.upsert_settings(user_id, &current).await?;
        Ok(SaveOutcome::Saved(current))
    }
}

//=========================================================================================
// Sync
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResult {
    pub todo_id: String,
    pub success: bool,
    pub page_id: Option<String>,
    pub error: Option<String>,
}

/// Settings, token and database of a user that is allowed to sync.
async fn sync_target(
    settings: &dyn NotionSettingsRepository,
    user_id: &str,
) -> Result<(NotionSettings, String, String), NotionError> {
    let current = settings
        .get_settings(user_id)
        .await?
        .filter(|s| s.is_connected())
        .ok_or(NotionError::NotConnected)?;
    let token = current.notion_api_token.clone().unwrap_or_default();
    let database = current
        .notion_database_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or(NotionError::NoDatabase)?;
    Ok((current, token, database))
}

async fn mark_synced(
    settings: &dyn NotionSettingsRepository,
    user_id: &str,
    mut current: NotionSettings,
) -> Result<(), NotionError> {
    current.last_sync_at = Some(Utc::now());
    settings.upsert_settings(user_id, &current).await?;
    Ok(())
}

/// Creates one page per todo. The database schema is read once up front;
/// after that a failed item does not stop the batch.
pub async fn push_todos(
    gateway: &dyn NotionGateway,
    settings: &dyn NotionSettingsRepository,
    user_id: &str,
    todos: &[Todo],
) -> Result<Vec<PushResult>, NotionError> {
    let (current, token, database) = sync_target(settings, user_id).await?;
    let layout = gateway.page_layout(&token, &database).await?;

    let mut results = Vec::with_capacity(todos.len());
    for todo in todos {
        let result = match gateway.create_todo_page(&token, &database, &layout, todo).await {
            Ok(page_id) => PushResult { todo_id: todo.id.clone(), success: true, page_id: Some(page_id), error: None },
            Err(e) => {
                warn!(todo_id = %todo.id, error = %e, "Failed to push todo to Notion");
                PushResult { todo_id: todo.id.clone(), success: false, page_id: None, error: Some(e.to_string()) }
            }
        };
        results.push(result);
    }

    mark_synced(settings, user_id, current).await?;
    info!(
        user_id,
        pushed = results.iter().filter(|r| r.success).count(),
        total = results.len(),
        "Pushed todos to Notion"
    );
    Ok(results)
}

pub async fn pull_todos(
    gateway: &dyn NotionGateway,
    settings: &dyn NotionSettingsRepository,
    user_id: &str,
) -> Result<Vec<NotionTodo>, NotionError> {
    let (current, token, database) = sync_target(settings, user_id).await?;
    let rows = gateway.query_todos(&token, &database).await?;
    mark_synced(settings, user_id, current).await?;
    Ok(rows)
}

/// The pulled rows that are new, matched by exact content against `existing`
/// and against rows earlier in the same batch.
pub fn merge_pulled(existing: &[Todo], pulled: Vec<NotionTodo>) -> Vec<NewTodo> {
    let mut seen: Vec<String> = existing.iter().map(|t| t.content.clone()).collect();
    let mut fresh = Vec::new();
    for row in pulled {
        if row.content.trim().is_empty() || seen.contains(&row.content) {
            continue;
        }
        seen.push(row.content.clone());
        let schedule = row.scheduled_date.as_deref().and_then(|date| {
            Schedule::parse(date, row.scheduled_time.as_deref(), None, None)
                .inspect_err(|e| warn!(page_id = %row.page_id, error = %e, "Ignoring unreadable Notion date"))
                .ok()
        });
        fresh.push(NewTodo { content: row.content, done: row.done, schedule, ..Default::default() });
    }
    fresh
}
