//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `NotionSettingsRepository` port from the `core` crate. It handles all
//! interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mind_brain_core::domain::NotionSettings;
use mind_brain_core::ports::{NotionSettingsRepository, PortError, PortResult};
use sqlx::{FromRow, PgPool};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `NotionSettingsRepository` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct NotionSettingsRecord {
    notion_api_token: Option<String>,
    notion_database_id: Option<String>,
    sync_enabled: bool,
    last_sync_at: Option<DateTime<Utc>>,
    workspace_id: Option<String>,
    workspace_name: Option<String>,
    bot_id: Option<String>,
}
impl NotionSettingsRecord {
    fn to_domain(self) -> NotionSettings {
        NotionSettings {
            notion_api_token: self.notion_api_token,
            notion_database_id: self.notion_database_id,
            sync_enabled: self.sync_enabled,
            last_sync_at: self.last_sync_at,
            workspace_id: self.workspace_id,
            workspace_name: self.workspace_name,
            bot_id: self.bot_id,
        }
    }
}

//=========================================================================================
// `NotionSettingsRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl NotionSettingsRepository for DbAdapter {
    async fn get_settings(&self, user_id: &str) -> PortResult<Option<NotionSettings>> {
        let record = sqlx::query_as::<_, NotionSettingsRecord>(
            "SELECT notion_api_token, notion_database_id, sync_enabled, last_sync_at, \
             workspace_id, workspace_name, bot_id \
             FROM notion_settings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.map(NotionSettingsRecord::to_domain))
    }

    async fn upsert_settings(&self, user_id: &str, settings: &NotionSettings) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO notion_settings \
             (user_id, notion_api_token, notion_database_id, sync_enabled, last_sync_at, \
              workspace_id, workspace_name, bot_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (user_id) DO UPDATE SET \
              notion_api_token = EXCLUDED.notion_api_token, \
              notion_database_id = EXCLUDED.notion_database_id, \
              sync_enabled = EXCLUDED.sync_enabled, \
              last_sync_at = EXCLUDED.last_sync_at, \
              workspace_id = EXCLUDED.workspace_id, \
              workspace_name = EXCLUDED.workspace_name, \
              bot_id = EXCLUDED.bot_id, \
              updated_at = NOW()",
        )
        .bind(user_id)
        .bind(&settings.notion_api_token)
        .bind(&settings.notion_database_id)
        .bind(settings.sync_enabled)
        .bind(settings.last_sync_at)
        .bind(&settings.workspace_id)
        .bind(&settings.workspace_name)
        .bind(&settings.bot_id)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
