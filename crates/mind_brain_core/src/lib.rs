pub mod action_plan;
pub mod calendar;
pub mod deep_dive;
pub mod domain;
pub mod mind_map;
pub mod notion;
pub mod ports;
pub mod prompts;
pub mod schedule;
pub mod store;

pub use action_plan::{generate_action_plan, ActionPlan, PendingActions, PlanSource};
pub use deep_dive::{DeepDiveSession, SessionStatus};
pub use domain::{
    ActionItem, Bucket, Message, NewTodo, NotionDatabase, NotionSettings, NotionTodo, OAuthGrant,
    Priority, Role, Thought, Todo, TodoPatch,
};
pub use ports::{
    ChatCompletionService, KeyValueStore, NotionGateway, NotionSettingsRepository, PortError,
    PortResult, PromptKind,
};
pub use schedule::{Schedule, ScheduleError};
pub use store::{MemoryStore, ThoughtStore, TodoStore};
