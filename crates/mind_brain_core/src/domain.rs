//! crates/mind_brain_core/src/domain.rs
//!
//! Defines the core data structures for the application: thoughts, todos,
//! AI action items and conversation messages.
//!
//! The serialized shapes follow the camelCase local-storage layout that the
//! browser client reads, so these types double as the storage format.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::schedule::{Schedule, ScheduleFields, ScheduleRecord};

//=========================================================================================
// Conversation Messages
//=========================================================================================

/// The author of a single conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of an AI conversation. Insertion order is conversation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

//=========================================================================================
// Action Items
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Parses a priority label, coercing anything unknown to `Medium`.
    pub fn coerce(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
            Some("high") => Priority::High,
            Some("low") => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

/// Any JSON value is accepted; whatever is not a known label reads as `Medium`.
impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(Priority::coerce(raw.as_ref().and_then(Value::as_str)))
    }
}

//=========================================================================================
// Lenient Scalars
//=========================================================================================

/// Text of a JSON scalar. Numbers and booleans are printed; arrays, objects
/// and null have no text.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_opt_text(deserializer)?.unwrap_or_default())
}

pub(crate) fn lenient_opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?.as_ref().and_then(scalar_text))
}

pub const DEFAULT_TIME_ESTIMATE: &str = "30分鐘";
pub const DEFAULT_CATEGORY: &str = "其他";

fn default_time_estimate() -> String {
    DEFAULT_TIME_ESTIMATE.to_string()
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// An AI-suggested, not-yet-committed task.
///
/// Stored suggestions are read leniently: a stray number or an unknown
/// priority must not make the owning thought unreadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    #[serde(deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub content: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_time_estimate", deserialize_with = "lenient_text")]
    pub time_estimate: String,
    #[serde(default = "default_category", deserialize_with = "lenient_text")]
    pub category: String,
    #[serde(flatten)]
    pub schedule: ScheduleFields,
}

//=========================================================================================
// Thoughts
//=========================================================================================

/// A free-text journal entry authored by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thought {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_actions: Option<Vec<ActionItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_conversation: Option<Vec<Message>>,
}

impl Thought {
    /// When the thought was created.
    ///
    /// Older records only carry the creation timestamp inside `id`; those are
    /// recovered by parsing the id, and anything non-numeric yields `None`.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let millis = self.created_at.or_else(|| self.id.parse::<i64>().ok())?;
        Utc.timestamp_millis_opt(millis).single()
    }

    pub fn created_on(&self) -> Option<NaiveDate> {
        self.created_at().map(|ts| ts.date_naive())
    }
}

//=========================================================================================
// Todos
//=========================================================================================

/// A committed, potentially scheduled task.
///
/// In memory a todo has exactly one schedule. The serialized form carries both
/// the `start*`/`end*` fields and the legacy `scheduled*` pair; see
/// [`TodoRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TodoRecord", into = "TodoRecord")]
pub struct Todo {
    pub id: String,
    pub content: String,
    pub done: bool,
    pub thought_id: Option<String>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub time_estimate: Option<String>,
    pub schedule: Option<Schedule>,
    pub notes: Option<String>,
}

/// The fields a caller supplies when creating a todo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTodo {
    pub content: String,
    pub done: bool,
    pub thought_id: Option<String>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub time_estimate: Option<String>,
    pub schedule: Option<Schedule>,
    pub notes: Option<String>,
}

/// A partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoPatch {
    pub content: Option<String>,
    pub done: Option<bool>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub time_estimate: Option<String>,
    pub notes: Option<String>,
    /// `Some(None)` clears the schedule.
    pub schedule: Option<Option<Schedule>>,
}

impl TodoPatch {
    pub fn reschedule(schedule: Schedule) -> Self {
        Self { schedule: Some(Some(schedule)), ..Default::default() }
    }

    pub fn apply(self, todo: &mut Todo) {
        if let Some(content) = self.content {
            todo.content = content;
        }
        if let Some(done) = self.done {
            todo.done = done;
        }
        if let Some(category) = self.category {
            todo.category = Some(category);
        }
        if let Some(priority) = self.priority {
            todo.priority = Some(priority);
        }
        if let Some(estimate) = self.time_estimate {
            todo.time_estimate = Some(estimate);
        }
        if let Some(notes) = self.notes {
            todo.notes = Some(notes);
        }
        if let Some(schedule) = self.schedule {
            todo.schedule = schedule;
        }
    }
}

/// Which view list a todo belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Done,
    Scheduled,
    /// Unscheduled items that came out of a deep-dive on a thought.
    ActionList,
    Available,
}

impl Todo {
    pub fn from_new(id: String, new: NewTodo) -> Self {
        Self {
            id,
            content: new.content,
            done: new.done,
            thought_id: new.thought_id,
            category: new.category,
            priority: new.priority,
            time_estimate: new.time_estimate,
            schedule: new.schedule,
            notes: new.notes,
        }
    }

    /// The single classification every view uses.
    pub fn bucket(&self) -> Bucket {
        if self.done {
            Bucket::Done
        } else if self.schedule.is_some() {
            Bucket::Scheduled
        } else if self.thought_id.is_some() {
            Bucket::ActionList
        } else {
            Bucket::Available
        }
    }
}

/// Storage shape of a todo: optional strings in camelCase, both schedule pairs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoRecord {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_estimate: Option<String>,
    #[serde(flatten)]
    pub schedule: ScheduleRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<TodoRecord> for Todo {
    fn from(record: TodoRecord) -> Self {
        Self {
            schedule: record.schedule.to_schedule(),
            priority: record.priority.as_deref().map(|p| Priority::coerce(Some(p))),
            id: record.id,
            content: record.content,
            done: record.done,
            thought_id: record.thought_id.filter(|id| !id.is_empty()),
            category: record.category,
            time_estimate: record.time_estimate,
            notes: record.notes,
        }
    }
}

impl From<Todo> for TodoRecord {
    fn from(todo: Todo) -> Self {
        Self {
            schedule: ScheduleRecord::from_schedule(todo.schedule.as_ref()),
            priority: todo.priority.map(|p| {
                match p {
                    Priority::High => "high",
                    Priority::Medium => "medium",
                    Priority::Low => "low",
                }
                .to_string()
            }),
            id: todo.id,
            content: todo.content,
            done: todo.done,
            thought_id: todo.thought_id,
            category: todo.category,
            time_estimate: todo.time_estimate,
            notes: todo.notes,
        }
    }
}

//=========================================================================================
// Notion
//=========================================================================================

/// The signed-in user's Notion link, persisted server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotionSettings {
    pub notion_api_token: Option<String>,
    pub notion_database_id: Option<String>,
    pub sync_enabled: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub workspace_id: Option<String>,
    pub workspace_name: Option<String>,
    pub bot_id: Option<String>,
}

impl NotionSettings {
    pub fn is_connected(&self) -> bool {
        self.sync_enabled && self.notion_api_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// A Notion database the integration can see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotionDatabase {
    pub id: String,
    pub title: String,
    pub url: Option<String>,
}

/// What Notion hands back when an OAuth code is exchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthGrant {
    pub access_token: String,
    pub bot_id: Option<String>,
    pub workspace_id: Option<String>,
    pub workspace_name: Option<String>,
    pub workspace_icon: Option<String>,
}

/// Which database properties a new page fills in, resolved once per push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotionPageLayout {
    pub title_property: String,
    /// A checkbox property for the done flag.
    pub done_property: Option<String>,
    /// A date property for the schedule start.
    pub date_property: Option<String>,
}

/// A todo row read from a Notion database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotionTodo {
    pub page_id: String,
    pub content: String,
    pub done: bool,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
}
