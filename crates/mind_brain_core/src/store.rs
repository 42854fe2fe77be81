//! crates/mind_brain_core/src/store.rs
//!
//! The thought and todo stores.
//!
//! Each store owns one collection persisted as a single JSON array under a fixed
//! key of a [`KeyValueStore`]. Every operation loads the whole collection, works
//! on an in-memory copy and writes the whole collection back. There is no
//! versioning: the last writer wins.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{
    ActionItem, Bucket, Message, NewTodo, Thought, Todo, TodoPatch,
};
use crate::ports::{KeyValueStore, PortError, PortResult};

pub const THOUGHTS_KEY: &str = "thoughts-data";
pub const TODOS_KEY: &str = "todos-data";

//=========================================================================================
// In-Memory Storage
//=========================================================================================

/// A `KeyValueStore` that lives only as long as the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

//=========================================================================================
// Generic JSON Collection
//=========================================================================================

/// The readable records of a collection plus the raw form of those that
/// could not be decoded. The latter are written back untouched.
struct Loaded<T> {
    items: Vec<T>,
    unreadable: Vec<Value>,
}

impl<T> Loaded<T> {
    fn empty() -> Self {
        Self { items: Vec::new(), unreadable: Vec::new() }
    }
}

/// One JSON array under one key.
pub struct JsonCollection<T> {
    key: &'static str,
    storage: Arc<dyn KeyValueStore>,
    lock: Mutex<()>,
    _records: PhantomData<fn() -> T>,
}

impl<T> JsonCollection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(key: &'static str, storage: Arc<dyn KeyValueStore>) -> Self {
        Self { key, storage, lock: Mutex::new(()), _records: PhantomData }
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reads the collection from storage.
    ///
    /// Data that is not a JSON array resets the collection to empty. A single
    /// record that does not decode is set aside instead of failing the rest.
    fn read_storage(&self) -> Loaded<T> {
        let raw = match self.storage.get(self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Loaded::empty(),
            Err(e) => {
                warn!(key = self.key, error = %e, "Failed to read stored collection; starting empty");
                return Loaded::empty();
            }
        };
        let values: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(values) => values,
            Err(e) => {
                warn!(key = self.key, error = %e, "Stored collection is corrupted; starting empty");
                return Loaded::empty();
            }
        };

        let mut loaded = Loaded::empty();
        for value in values {
            match T::deserialize(&value) {
                Ok(item) => loaded.items.push(item),
                Err(e) => {
                    warn!(key = self.key, error = %e, "Skipping unreadable record");
                    loaded.unreadable.push(value);
                }
            }
        }
        loaded
    }

    fn write_storage(&self, loaded: &Loaded<T>) -> PortResult<()> {
        let to_port = |e: serde_json::Error| PortError::Unexpected(e.to_string());
        let mut values = Vec::with_capacity(loaded.items.len() + loaded.unreadable.len());
        for item in &loaded.items {
            values.push(serde_json::to_value(item).map_err(to_port)?);
        }
        values.extend(loaded.unreadable.iter().cloned());
        let raw = serde_json::to_string(&values).map_err(to_port)?;
        self.storage.set(self.key, &raw)
    }

    /// The readable records currently stored.
    pub fn load(&self) -> Vec<T> {
        let _guard = self.guard();
        self.read_storage().items
    }

    /// Load, mutate, write back, all under one lock.
    ///
    /// Nothing is written when `f` fails.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Vec<T>) -> PortResult<R>) -> PortResult<R> {
        let _guard = self.guard();
        let mut loaded = self.read_storage();
        let result = f(&mut loaded.items)?;
        self.write_storage(&loaded)?;
        Ok(result)
    }
}

/// A millisecond-timestamp id that is not yet taken in the collection.
fn next_timestamp_id<'a>(taken: impl Iterator<Item = &'a str>) -> String {
    let taken: Vec<&str> = taken.collect();
    let mut millis = Utc::now().timestamp_millis();
    loop {
        let candidate = millis.to_string();
        if !taken.contains(&candidate.as_str()) {
            return candidate;
        }
        millis += 1;
    }
}

//=========================================================================================
// Thought Store
//=========================================================================================

pub struct ThoughtStore {
    collection: JsonCollection<Thought>,
}

impl ThoughtStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { collection: JsonCollection::new(THOUGHTS_KEY, storage) }
    }

    /// All thoughts, newest first.
    pub fn list(&self) -> Vec<Thought> {
        let mut thoughts = self.collection.load();
        thoughts.sort_by_key(|t| std::cmp::Reverse(t.created_at().map(|ts| ts.timestamp_millis())));
        thoughts
    }

    pub fn get_by_id(&self, id: &str) -> Option<Thought> {
        self.collection.load().into_iter().find(|t| t.id == id)
    }

    /// Thoughts created on `date` (UTC).
    pub fn get_by_date(&self, date: NaiveDate) -> Vec<Thought> {
        self.list().into_iter().filter(|t| t.created_on() == Some(date)).collect()
    }

    pub fn add(&self, content: &str) -> PortResult<Thought> {
        self.collection.mutate(|thoughts| {
            let id = next_timestamp_id(thoughts.iter().map(|t| t.id.as_str()));
            let thought = Thought {
                created_at: id.parse().ok(),
                id,
                content: content.to_string(),
                generated_actions: None,
                ai_conversation: None,
            };
            thoughts.push(thought.clone());
            debug!(id = %thought.id, "Thought added");
            Ok(thought)
        })
    }

    pub fn update(&self, id: &str, content: &str) -> PortResult<Thought> {
        self.modify(id, |thought| thought.content = content.to_string())
    }

    pub fn delete(&self, id: &str) -> PortResult<()> {
        self.collection.mutate(|thoughts| {
            let before = thoughts.len();
            thoughts.retain(|t| t.id != id);
            if thoughts.len() == before {
                return Err(PortError::NotFound(format!("Thought {} not found", id)));
            }
            Ok(())
        })
    }

    pub fn attach_conversation(&self, id: &str, messages: &[Message]) -> PortResult<Thought> {
        self.modify(id, |thought| thought.ai_conversation = Some(messages.to_vec()))
    }

    pub fn set_generated_actions(&self, id: &str, actions: &[ActionItem]) -> PortResult<Thought> {
        self.modify(id, |thought| thought.generated_actions = Some(actions.to_vec()))
    }

    fn modify(&self, id: &str, f: impl FnOnce(&mut Thought)) -> PortResult<Thought> {
        self.collection.mutate(|thoughts| {
            let thought = thoughts
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| PortError::NotFound(format!("Thought {} not found", id)))?;
            f(thought);
            Ok(thought.clone())
        })
    }
}

//=========================================================================================
// Todo Store
//=========================================================================================

pub struct TodoStore {
    collection: JsonCollection<Todo>,
}

impl TodoStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { collection: JsonCollection::new(TODOS_KEY, storage) }
    }

    pub fn list(&self) -> Vec<Todo> {
        self.collection.load()
    }

    pub fn get_by_id(&self, id: &str) -> Option<Todo> {
        self.collection.load().into_iter().find(|t| t.id == id)
    }

    /// Todos whose schedule covers `date`.
    pub fn get_by_date(&self, date: NaiveDate) -> Vec<Todo> {
        self.collection
            .load()
            .into_iter()
            .filter(|t| t.schedule.is_some_and(|s| s.covers(date)))
            .collect()
    }

    pub fn in_bucket(&self, bucket: Bucket) -> Vec<Todo> {
        self.collection.load().into_iter().filter(|t| t.bucket() == bucket).collect()
    }

    pub fn add(&self, new: NewTodo) -> PortResult<Todo> {
        self.add_many(vec![new]).map(|mut added| added.remove(0))
    }

    /// Adds several todos in one write.
    pub fn add_many(&self, batch: Vec<NewTodo>) -> PortResult<Vec<Todo>> {
        self.collection.mutate(|todos| {
            let mut added = Vec::with_capacity(batch.len());
            for new in batch {
                let id = next_timestamp_id(todos.iter().map(|t| t.id.as_str()));
                let todo = Todo::from_new(id, new);
                todos.push(todo.clone());
                added.push(todo);
            }
            Ok(added)
        })
    }

    pub fn update(&self, id: &str, patch: TodoPatch) -> PortResult<Todo> {
        self.modify(id, |todo| patch.apply(todo))
    }

    pub fn toggle(&self, id: &str) -> PortResult<Todo> {
        self.modify(id, |todo| todo.done = !todo.done)
    }

    pub fn delete(&self, id: &str) -> PortResult<()> {
        self.collection.mutate(|todos| {
            let before = todos.len();
            todos.retain(|t| t.id != id);
            if todos.len() == before {
                return Err(PortError::NotFound(format!("Todo {} not found", id)));
            }
            Ok(())
        })
    }

    fn modify(&self, id: &str, f: impl FnOnce(&mut Todo)) -> PortResult<Todo> {
        self.collection.mutate(|todos| {
            let todo = todos
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| PortError::NotFound(format!("Todo {} not found", id)))?;
            f(todo);
            Ok(todo.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Schedule;

    fn memory() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    fn date(s: &str) -> NaiveDate {
        crate::schedule::parse_date(s).unwrap()
    }

    #[test]
    fn toggling_twice_restores_the_original_state() {
        let store = TodoStore::new(memory());
        let todo = store.add(NewTodo { content: "stretch".into(), ..Default::default() }).unwrap();
        assert!(!todo.done);
        assert!(store.toggle(&todo.id).unwrap().done);
        assert!(!store.toggle(&todo.id).unwrap().done);
        assert_eq!(store.get_by_id(&todo.id).unwrap(), todo);
    }

    #[test]
    fn deleted_todo_disappears_from_every_date_it_matched() {
        let store = TodoStore::new(memory());
        let schedule = Schedule::parse("2025-06-01", Some("09:00"), Some("2025-06-03"), Some("10:00")).unwrap();
        let todo = store
            .add(NewTodo { content: "trip".into(), schedule: Some(schedule), ..Default::default() })
            .unwrap();

        let days = ["2025-06-01", "2025-06-02", "2025-06-03"];
        for day in days {
            assert_eq!(store.get_by_date(date(day)).len(), 1, "{day}");
        }

        store.delete(&todo.id).unwrap();
        for day in days {
            assert!(store.get_by_date(date(day)).is_empty(), "{day}");
        }
    }

    #[test]
    fn corrupted_storage_resets_to_empty() {
        let storage = memory();
        storage.set(TODOS_KEY, "{not json").unwrap();
        let store = TodoStore::new(storage.clone());
        assert!(store.list().is_empty());

        store.add(NewTodo { content: "fresh".into(), ..Default::default() }).unwrap();
        let raw = storage.get(TODOS_KEY).unwrap().unwrap();
        assert!(raw.contains("fresh"));
    }

    #[test]
    fn one_odd_record_does_not_cost_the_others() {
        let storage = memory();
        let stored = r#"[
            {"id":"1","content":"keep me"},
            {"id":"2","content":"odd plan","generatedActions":[{"id":"a","content":"c","priority":"urgent","timeEstimate":30}]},
            {"id":"3"}
        ]"#;
        storage.set(THOUGHTS_KEY, stored).unwrap();
        let store = ThoughtStore::new(storage.clone());

        let loaded = store.get_by_id("2").unwrap();
        let action = &loaded.generated_actions.unwrap()[0];
        assert_eq!(action.priority, crate::domain::Priority::Medium);
        assert_eq!(action.time_estimate, "30");
        assert_eq!(action.category, crate::domain::DEFAULT_CATEGORY);
        assert_eq!(store.list().len(), 2);

        store.add("new").unwrap();
        let raw: Vec<Value> = serde_json::from_str(&storage.get(THOUGHTS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw.len(), 4);
        assert!(raw.iter().any(|v| v["content"] == "keep me"));
        assert!(raw.iter().any(|v| v["id"] == "3" && v.get("content").is_none()));
        assert_eq!(store.list().len(), 3);
    }

    #[test]
    fn updates_are_visible_to_a_second_store_on_the_same_storage() {
        let storage = memory();
        let a = TodoStore::new(storage.clone());
        let b = TodoStore::new(storage);
        let todo = a.add(NewTodo { content: "shared".into(), ..Default::default() }).unwrap();
        b.update(&todo.id, TodoPatch { content: Some("renamed".into()), ..Default::default() })
            .unwrap();
        assert_eq!(a.get_by_id(&todo.id).unwrap().content, "renamed");
    }

    #[test]
    fn unknown_ids_are_reported_as_not_found() {
        let store = TodoStore::new(memory());
        assert!(matches!(store.toggle("missing"), Err(PortError::NotFound(_))));
        assert!(matches!(store.delete("missing"), Err(PortError::NotFound(_))));
    }

    #[test]
    fn ids_stay_unique_within_a_batch() {
        let store = TodoStore::new(memory());
        let added = store
            .add_many(vec![
                NewTodo { content: "a".into(), ..Default::default() },
                NewTodo { content: "b".into(), ..Default::default() },
                NewTodo { content: "c".into(), ..Default::default() },
            ])
            .unwrap();
        let mut ids: Vec<_> = added.iter().map(|t| t.id.clone()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn thoughts_keep_their_conversation_and_actions() {
        let store = ThoughtStore::new(memory());
        let thought = store.add("I want to learn piano").unwrap();
        assert!(thought.created_at.is_some());

        let transcript = vec![Message::system("guide"), Message::user("hi"), Message::assistant("why?")];
        store.attach_conversation(&thought.id, &transcript).unwrap();

        let loaded = store.get_by_id(&thought.id).unwrap();
        assert_eq!(loaded.ai_conversation.as_deref(), Some(transcript.as_slice()));
        assert_eq!(store.get_by_date(loaded.created_on().unwrap()).len(), 1);
    }
}
