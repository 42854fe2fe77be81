//! services/api/src/adapters/notion_api.rs
//!
//! `NotionGateway` over the Notion REST API with `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use mind_brain_core::domain::{NotionDatabase, NotionPageLayout, NotionTodo, OAuthGrant, Todo};
use mind_brain_core::ports::{NotionGateway, PortError, PortResult};
use mind_brain_core::schedule::{format_date, format_time};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Map, Value};
use tracing::debug;

pub const NOTION_API_BASE_URL: &str = "https://api.notion.com/v1";
pub const NOTION_API_VERSION: &str = "2022-06-28";

const DONE_CANDIDATES: &[&str] = &["Done", "Completed", "Status"];
const DATE_CANDIDATES: &[&str] = &["Date", "Due"];

pub struct NotionApiAdapter {
    client: Client,
    base_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl NotionApiAdapter {
    pub fn new(client_id: Option<String>, client_secret: Option<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(50)).build()?;
        Ok(Self { client, base_url: NOTION_API_BASE_URL.to_string(), client_id, client_secret })
    }

    fn authorized(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {token}"))
            .header("Notion-Version", NOTION_API_VERSION)
    }

    async fn fetch_database_value(&self, token: &str, database_id: &str) -> PortResult<Value> {
        let request = self.client.get(format!("{}/databases/{database_id}", self.base_url));
        send_json(self.authorized(request, token), "Notion database API").await
    }
}

/// Sends the request and decodes a successful JSON body; anything else
/// becomes an error carrying the status code and raw body.
async fn send_json(request: RequestBuilder, context: &str) -> PortResult<Value> {
    let response = request.send().await.map_err(|e| PortError::Unexpected(e.to_string()))?;
    let status = response.status();
    let body = response.text().await.map_err(|e| PortError::Unexpected(e.to_string()))?;
    if status == StatusCode::UNAUTHORIZED {
        return Err(PortError::Unauthorized);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(PortError::NotFound(format!("{context} 404: {body}")));
    }
    if !status.is_success() {
        return Err(PortError::Unexpected(format!("{context} {}: {}", status.as_u16(), body)));
    }
    serde_json::from_str(&body).map_err(|e| PortError::Unexpected(e.to_string()))
}

//=========================================================================================
// Property Helpers
//=========================================================================================

fn plain_text(value: &Value) -> String {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item.get("plain_text")
                        .and_then(Value::as_str)
                        .or_else(|| item.get("text").and_then(|t| t.get("content")).and_then(Value::as_str))
                })
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn title_property_name(schema: &Map<String, Value>) -> Option<String> {
    schema
        .iter()
        .find(|(_, p)| p.get("type").and_then(Value::as_str) == Some("title"))
        .map(|(name, _)| name.clone())
}

/// First property whose name matches a candidate (case-insensitively) and whose type is `kind`.
fn property_by_candidates<'a>(
    properties: &'a Map<String, Value>,
    candidates: &[&str],
    kind: &str,
) -> Option<(&'a String, &'a Value)> {
    candidates.iter().find_map(|candidate| {
        properties.iter().find(|(name, property)| {
            name.eq_ignore_ascii_case(candidate) && property.get("type").and_then(Value::as_str) == Some(kind)
        })
    })
}

fn database_from_value(value: &Value) -> Option<NotionDatabase> {
    let id = value.get("id").and_then(Value::as_str)?.to_string();
    let title = plain_text(value.get("title").unwrap_or(&Value::Null));
    Some(NotionDatabase {
        id,
        title: if title.trim().is_empty() { "Untitled".to_string() } else { title },
        url: value.get("url").and_then(Value::as_str).map(str::to_string),
    })
}

/// `None` when the database has no title property to write the content to.
fn layout_from_schema(schema: &Map<String, Value>) -> Option<NotionPageLayout> {
    let named = |candidates: &[&str], kind: &str| {
        property_by_candidates(schema, candidates, kind).map(|(name, _)| name.clone())
    };
    Some(NotionPageLayout {
        title_property: title_property_name(schema)?,
        done_property: named(DONE_CANDIDATES, "checkbox"),
        date_property: named(DATE_CANDIDATES, "date"),
    })
}

fn todo_properties(layout: &NotionPageLayout, todo: &Todo) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        layout.title_property.clone(),
        json!({ "title": [{ "text": { "content": todo.content } }] }),
    );
    if let Some(name) = &layout.done_property {
        properties.insert(name.clone(), json!({ "checkbox": todo.done }));
    }
    if let (Some(name), Some(schedule)) = (&layout.date_property, todo.schedule.as_ref()) {
        let start = match schedule.start_time {
            Some(time) => format!("{}T{}:00", format_date(schedule.start_date), format_time(time)),
            None => format_date(schedule.start_date),
        };
        properties.insert(name.clone(), json!({ "date": { "start": start } }));
    }
    properties
}

/// Splits a Notion date (`2025-01-02` or `2025-01-02T09:30:00.000+08:00`) into date and `HH:mm`.
fn split_notion_date(start: &str) -> (String, Option<String>) {
    match start.split_once('T') {
        Some((date, rest)) => (date.to_string(), rest.get(..5).map(str::to_string)),
        None => (start.to_string(), None),
    }
}

fn todo_from_page(page: &Value) -> Option<NotionTodo> {
    let page_id = page.get("id").and_then(Value::as_str)?.to_string();
    let properties = page.get("properties").and_then(Value::as_object)?;

    let content = properties
        .values()
        .find(|p| p.get("type").and_then(Value::as_str) == Some("title"))
        .map(|p| plain_text(p.get("title").unwrap_or(&Value::Null)))
        .unwrap_or_default();
    let done = property_by_candidates(properties, DONE_CANDIDATES, "checkbox")
        .and_then(|(_, p)| p.get("checkbox").and_then(Value::as_bool))
        .unwrap_or(false);
    let (scheduled_date, scheduled_time) = property_by_candidates(properties, DATE_CANDIDATES, "date")
        .and_then(|(_, p)| p.get("date").and_then(|d| d.get("start")).and_then(Value::as_str))
        .map(split_notion_date)
        .map_or((None, None), |(date, time)| (Some(date), time));

    Some(NotionTodo { page_id, content: content.trim().to_string(), done, scheduled_date, scheduled_time })
}

//=========================================================================================
// `NotionGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl NotionGateway for NotionApiAdapter {
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> PortResult<OAuthGrant> {
        let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret) else {
            return Err(PortError::Unexpected("Notion OAuth client is not configured".to_string()));
        };
        let request = self
            .client
            .post(format!("{}/oauth/token", self.base_url))
            .basic_auth(client_id, Some(client_secret))
            .header("Accept", "application/json")
            .json(&json!({
                "grant_type": "authorization_code",
                "code": code,
                "redirect_uri": redirect_uri,
            }));
        let value = send_json(request, "Notion OAuth token API").await?;

        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        let access_token = text("access_token")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PortError::Unexpected("Notion did not return an access token".to_string()))?;
        Ok(OAuthGrant {
            access_token,
            bot_id: text("bot_id"),
            workspace_id: text("workspace_id"),
            workspace_name: text("workspace_name"),
            workspace_icon: text("workspace_icon"),
        })
    }

    async fn search_databases(&self, token: &str) -> PortResult<Vec<NotionDatabase>> {
        let request = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&json!({ "filter": { "value": "database", "property": "object" } }));
        let value = send_json(self.authorized(request, token), "Notion search API").await?;
        Ok(value
            .get("results")
            .and_then(Value::as_array)
            .map(|results| results.iter().filter_map(database_from_value).collect())
            .unwrap_or_default())
    }

    async fn fetch_database(&self, token: &str, database_id: &str) -> PortResult<NotionDatabase> {
        let value = self.fetch_database_value(token, database_id).await?;
        database_from_value(&value)
            .ok_or_else(|| PortError::Unexpected("Notion database response missing id".to_string()))
    }

    async fn page_layout(&self, token: &str, database_id: &str) -> PortResult<NotionPageLayout> {
        let database = self.fetch_database_value(token, database_id).await?;
        let schema = database
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| PortError::Unexpected("Notion database properties not found".to_string()))?;
        let layout = layout_from_schema(schema).ok_or_else(|| {
            PortError::Unexpected("Could not find title property in target Notion database".to_string())
        })?;
        debug!(database_id, ?layout, "Resolved Notion page layout");
        Ok(layout)
    }

    async fn create_todo_page(
        &self,
        token: &str,
        database_id: &str,
        layout: &NotionPageLayout,
        todo: &Todo,
    ) -> PortResult<String> {
        let request = self.client.post(format!("{}/pages", self.base_url)).json(&json!({
            "parent": { "database_id": database_id },
            "properties": todo_properties(layout, todo),
        }));
        let page = send_json(self.authorized(request, token), "Notion pages API").await?;
        page.get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| PortError::Unexpected("Notion response missing page id".to_string()))
    }

    async fn query_todos(&self, token: &str, database_id: &str) -> PortResult<Vec<NotionTodo>> {
        let mut todos = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let body = match &cursor {
                Some(next_cursor) => json!({ "page_size": 100, "start_cursor": next_cursor }),
                None => json!({ "page_size": 100 }),
            };
            let request = self
                .client
                .post(format!("{}/databases/{database_id}/query", self.base_url))
                .json(&body);
            let value = send_json(self.authorized(request, token), "Notion query API").await?;

            if let Some(results) = value.get("results").and_then(Value::as_array) {
                todos.extend(results.iter().filter_map(todo_from_page));
            }

            let has_more = value.get("has_more").and_then(Value::as_bool).unwrap_or(false);
            cursor = value.get("next_cursor").and_then(Value::as_str).map(str::to_string);
            if !has_more || cursor.is_none() {
                break;
            }
        }

        debug!(rows = todos.len(), "Queried Notion database");
        Ok(todos)
    }
}
