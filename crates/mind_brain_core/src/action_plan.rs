//! crates/mind_brain_core/src/action_plan.rs
//!
//! Turns a thought and its deep-dive transcript into a short list of
//! suggested actions, and promotes accepted suggestions into todos.

use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::{
    scalar_text, ActionItem, Message, NewTodo, Priority, DEFAULT_CATEGORY, DEFAULT_TIME_ESTIMATE,
};
use crate::ports::{ChatCompletionService, PromptKind};
use crate::schedule::{Schedule, ScheduleFields};

pub const MAX_ACTIONS: usize = 5;

/// Which parsing tier produced the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    /// The reply was a JSON array as asked.
    Parsed,
    /// An array was recovered from inside surrounding prose.
    RecoveredPartial,
    /// Nothing usable came back; the fixed list was used.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionPlan {
    pub items: Vec<ActionItem>,
    pub source: PlanSource,
}

/// A suggestion as the model writes it, before validation. Scalars are kept
/// raw so a number where text was asked for does not sink the item.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAction {
    id: Option<Value>,
    content: Option<Value>,
    priority: Option<Value>,
    time_estimate: Option<Value>,
    category: Option<Value>,
    #[serde(flatten)]
    schedule: ScheduleFields,
}

impl RawAction {
    fn text(field: Option<&Value>) -> Option<String> {
        field.and_then(scalar_text).map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
    }
}

pub fn build_prompt(thought: &str, messages: &[Message]) -> String {
    let context = messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n");
    format!("思緒內容：\n{thought}\n\nAI對話記錄：\n{context}\n\n請基於以上內容生成5個個性化的行動計劃。")
}

/// Asks the model for an action plan. Never fails; see [`PlanSource`].
pub async fn generate_action_plan(
    chat: &dyn ChatCompletionService,
    thought: &str,
    messages: &[Message],
) -> ActionPlan {
    let request = [Message::user(build_prompt(thought, messages))];
    match chat.complete(PromptKind::ActionPlan, &request).await {
        Ok(Some(reply)) if !reply.trim().is_empty() => parse_action_plan(&reply),
        Ok(_) => {
            warn!("Action-plan reply had no content; using fallback plan");
            fallback_plan()
        }
        Err(e) => {
            warn!(error = %e, "Action-plan request failed; using fallback plan");
            fallback_plan()
        }
    }
}

/// Parses a model reply: the whole text as an array, then the first
/// bracketed span, then the fixed fallback list.
pub fn parse_action_plan(reply: &str) -> ActionPlan {
    let reply = reply.trim();

    let (candidates, source) = match serde_json::from_str::<Vec<Value>>(reply) {
        Ok(values) => (values, PlanSource::Parsed),
        Err(_) => match extract_array(reply) {
            Some(values) => {
                warn!("Recovered action plan from surrounding text");
                (values, PlanSource::RecoveredPartial)
            }
            None => {
                warn!("Action-plan reply was not JSON; using fallback plan");
                return fallback_plan();
            }
        },
    };

    let items = validate(candidates);
    if items.is_empty() {
        warn!("No valid actions in reply; using fallback plan");
        return fallback_plan();
    }
    info!(count = items.len(), ?source, "Action plan generated");
    ActionPlan { items, source }
}

fn extract_array(reply: &str) -> Option<Vec<Value>> {
    static ARRAY: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = ARRAY.get_or_init(|| Regex::new(r"\[[\s\S]*\]").ok()).as_ref()?;
    let span = pattern.find(reply)?;
    serde_json::from_str(span.as_str()).ok()
}

fn validate(candidates: Vec<Value>) -> Vec<ActionItem> {
    let stamp = Utc::now().timestamp_millis();
    candidates
        .into_iter()
        .filter_map(|value| serde_json::from_value::<RawAction>(value).ok())
        .filter_map(|raw| RawAction::text(raw.content.as_ref()).map(|content| (content, raw)))
        .take(MAX_ACTIONS)
        .enumerate()
        .map(|(index, (content, raw))| ActionItem {
            id: RawAction::text(raw.id.as_ref()).unwrap_or_else(|| format!("ai-{stamp}-{index}")),
            content,
            priority: Priority::coerce(raw.priority.as_ref().and_then(Value::as_str)),
            time_estimate: RawAction::text(raw.time_estimate.as_ref())
                .unwrap_or_else(|| DEFAULT_TIME_ESTIMATE.into()),
            category: RawAction::text(raw.category.as_ref()).unwrap_or_else(|| DEFAULT_CATEGORY.into()),
            schedule: raw.schedule,
        })
        .collect()
}

pub fn fallback_plan() -> ActionPlan {
    let stamp = Utc::now().timestamp_millis();
    let items = [
        ("花10分鐘寫下這個想法最困擾你的部分", Priority::High, "10分鐘", "反思"),
        ("列出三個可以立即開始的小步驟", Priority::High, "15分鐘", "規劃"),
        ("和一位信任的朋友聊聊這個想法", Priority::Medium, "30分鐘", "人際"),
        ("安排一段不受打擾的時間深入思考", Priority::Medium, "1小時", "規劃"),
        ("一週後回顧這個想法的進展", Priority::Low, "15分鐘", "反思"),
    ]
    .into_iter()
    .enumerate()
    .map(|(index, (content, priority, estimate, category))| ActionItem {
        id: format!("ai-{stamp}-{index}"),
        content: content.to_string(),
        priority,
        time_estimate: estimate.to_string(),
        category: category.to_string(),
        schedule: ScheduleFields::default(),
    })
    .collect();
    ActionPlan { items, source: PlanSource::Fallback }
}

//=========================================================================================
// Accepting Suggestions
//=========================================================================================

/// The suggestions generated for one thought that have not been scheduled yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingActions {
    thought_id: String,
    items: Vec<ActionItem>,
}

impl PendingActions {
    pub fn new(thought_id: impl Into<String>, items: Vec<ActionItem>) -> Self {
        Self { thought_id: thought_id.into(), items }
    }

    pub fn items(&self) -> &[ActionItem] {
        &self.items
    }

    /// Up to three high-priority suggestions, preselected for the user.
    pub fn default_selection(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|a| a.priority == Priority::High)
            .take(3)
            .map(|a| a.id.clone())
            .collect()
    }

    /// Builds todos for the selected suggestions. The suggestions stay pending.
    pub fn accept(&self, selected: &[String]) -> Vec<NewTodo> {
        self.items
            .iter()
            .filter(|a| selected.contains(&a.id))
            .map(|a| self.to_todo(a, a.schedule.to_schedule()))
            .collect()
    }

    /// The todo one suggestion becomes when scheduled. It stays pending
    /// until [`Self::remove`] is called.
    pub fn schedule(&self, action_id: &str, schedule: Schedule) -> Option<NewTodo> {
        let action = self.items.iter().find(|a| a.id == action_id)?;
        Some(self.to_todo(action, Some(schedule)))
    }

    /// Drops a suggestion; `false` when it was not pending.
    pub fn remove(&mut self, action_id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|a| a.id != action_id);
        self.items.len() != before
    }

    fn to_todo(&self, action: &ActionItem, schedule: Option<Schedule>) -> NewTodo {
        NewTodo {
            content: action.content.clone(),
            done: false,
            thought_id: Some(self.thought_id.clone()),
            category: Some(action.category.clone()),
            priority: Some(action.priority),
            time_estimate: Some(action.time_estimate.clone()),
            schedule,
            notes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{PortError, PortResult};
    use async_trait::async_trait;

    struct FixedReply(PortResult<Option<String>>);

    #[async_trait]
    impl ChatCompletionService for FixedReply {
        async fn complete(&self, _: PromptKind, _: &[Message]) -> PortResult<Option<String>> {
            match &self.0 {
                Ok(reply) => Ok(reply.clone()),
                Err(e) => Err(PortError::Unexpected(e.to_string())),
            }
        }
    }

    fn assert_bounded(plan: &ActionPlan) {
        assert!(!plan.items.is_empty());
        assert!(plan.items.len() <= MAX_ACTIONS);
        for item in &plan.items {
            assert!(!item.content.trim().is_empty());
            assert!(!item.id.is_empty());
        }
    }

    #[test]
    fn clean_array_is_parsed_directly() {
        let reply = r#"[{"content":"Read one chapter","priority":"high","timeEstimate":"30分鐘","category":"學習"}]"#;
        let plan = parse_action_plan(reply);
        assert_eq!(plan.source, PlanSource::Parsed);
        assert_eq!(plan.items[0].content, "Read one chapter");
        assert_eq!(plan.items[0].priority, Priority::High);
        assert!(plan.items[0].id.starts_with("ai-"));
    }

    #[test]
    fn array_inside_prose_is_recovered() {
        let reply = "Sure! Here is your plan:\n[{\"content\":\"Walk\",\"priority\":\"urgent\"}]\nGood luck.";
        let plan = parse_action_plan(reply);
        assert_eq!(plan.source, PlanSource::RecoveredPartial);
        assert_eq!(plan.items[0].priority, Priority::Medium);
        assert_eq!(plan.items[0].category, DEFAULT_CATEGORY);
    }

    #[test]
    fn numeric_fields_are_read_as_text() {
        let reply = r#"[{"content":"Walk","timeEstimate":30,"category":7,"id":12},{"content":"Read","priority":"high"}]"#;
        let plan = parse_action_plan(reply);
        assert_eq!(plan.source, PlanSource::Parsed);
        assert_eq!(plan.items.len(), 2);
        assert_eq!(plan.items[0].id, "12");
        assert_eq!(plan.items[0].time_estimate, "30");
        assert_eq!(plan.items[0].category, "7");
        assert_eq!(plan.items[1].priority, Priority::High);
        assert_eq!(plan.items[1].time_estimate, DEFAULT_TIME_ESTIMATE);
    }

    #[test]
    fn non_text_priority_and_null_fields_get_defaults() {
        let plan = parse_action_plan(r#"[{"content":"Stretch","priority":3,"category":null,"timeEstimate":[1]}]"#);
        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.items[0].priority, Priority::Medium);
        assert_eq!(plan.items[0].category, DEFAULT_CATEGORY);
        assert_eq!(plan.items[0].time_estimate, DEFAULT_TIME_ESTIMATE);
    }

    #[test]
    fn prose_without_array_falls_back() {
        let plan = parse_action_plan("I cannot help with that.");
        assert_eq!(plan.source, PlanSource::Fallback);
        assert_bounded(&plan);
    }

    #[test]
    fn invalid_items_are_dropped_and_the_list_is_capped() {
        let mut values: Vec<String> = (0..8)
            .map(|i| format!(r#"{{"id":"a{i}","content":"step {i}","priority":"low"}}"#))
            .collect();
        values.insert(0, r#"{"content":"   "}"#.to_string());
        values.insert(1, r#"{"priority":"high"}"#.to_string());
        values.insert(2, r#""not an object""#.to_string());
        let plan = parse_action_plan(&format!("[{}]", values.join(",")));

        assert_eq!(plan.items.len(), MAX_ACTIONS);
        assert_eq!(plan.items[0].id, "a0");
        assert!(plan.items.iter().all(|a| a.priority == Priority::Low));
    }

    #[test]
    fn an_array_with_nothing_valid_falls_back() {
        let plan = parse_action_plan(r#"[{"content":""}]"#);
        assert_eq!(plan.source, PlanSource::Fallback);
    }

    #[tokio::test]
    async fn upstream_failures_resolve_to_the_fallback_plan() {
        let failing = FixedReply(Err(PortError::Unexpected("timeout".into())));
        let plan = generate_action_plan(&failing, "thought", &[]).await;
        assert_eq!(plan.source, PlanSource::Fallback);
        assert_bounded(&plan);

        let empty = FixedReply(Ok(None));
        assert_eq!(generate_action_plan(&empty, "thought", &[]).await.source, PlanSource::Fallback);
    }

    #[test]
    fn prompt_embeds_thought_and_transcript() {
        let prompt = build_prompt("learn piano", &[Message::user("why?"), Message::assistant("because")]);
        assert!(prompt.contains("learn piano"));
        assert!(prompt.contains("user: why?"));
        assert!(prompt.contains("assistant: because"));
    }

    #[test]
    fn scheduling_a_suggestion_produces_a_matching_todo_and_removes_it() {
        let mut pending = PendingActions::new("t1", fallback_plan().items);
        let target = pending.items()[1].id.clone();
        let schedule = Schedule::parse("2025-07-01", Some("14:00"), Some("2025-07-02"), Some("16:30")).unwrap();

        let todo = pending.schedule(&target, schedule).unwrap();
        assert_eq!(todo.schedule, Some(schedule));
        assert_eq!(todo.thought_id.as_deref(), Some("t1"));
        assert_eq!(pending.items().len(), 5);

        assert!(pending.remove(&target));
        assert!(!pending.remove(&target));
        assert_eq!(pending.items().len(), 4);
        assert!(pending.items().iter().all(|a| a.id != target));
        assert!(pending.schedule(&target, schedule).is_none());
    }

    #[test]
    fn default_selection_takes_at_most_three_high_priority_items() {
        let mut items = fallback_plan().items;
        for item in &mut items {
            item.priority = Priority::High;
        }
        let pending = PendingActions::new("t", items);
        assert_eq!(pending.default_selection().len(), 3);
    }

    #[test]
    fn accepting_links_todos_to_the_thought() {
        let pending = PendingActions::new("t9", fallback_plan().items);
        let selected = pending.default_selection();
        let todos = pending.accept(&selected);
        assert_eq!(todos.len(), selected.len());
        assert!(todos.iter().all(|t| t.thought_id.as_deref() == Some("t9") && t.schedule.is_none()));
    }
}
