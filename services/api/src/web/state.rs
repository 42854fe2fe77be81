//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-user / per-thought
//! interactive sessions that live between requests.

use crate::config::Config;
use crate::web::rest::HandlerError;
use axum::http::StatusCode;
use mind_brain_core::action_plan::PendingActions;
use mind_brain_core::calendar::{ArmedSelection, DragState};
use mind_brain_core::deep_dive::DeepDiveSession;
use mind_brain_core::domain::Message;
use mind_brain_core::notion::{ManualSetup, OAuthConfig, OAuthFlow, OAuthStatus};
use mind_brain_core::ports::{
    ChatCompletionService, KeyValueStore, NotionGateway, NotionSettingsRepository,
};
use mind_brain_core::store::{ThoughtStore, TodoStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// How long an authorize redirect may take to come back.
pub const OAUTH_STATE_TTL: Duration = Duration::from_secs(10 * 60);
/// Idle time after which an unused deep-dive session is dropped from memory.
pub const DEEP_DIVE_IDLE: Duration = Duration::from_secs(30 * 60);

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub thoughts: ThoughtStore,
    pub todos: TodoStore,
    pub chat: Arc<dyn ChatCompletionService>,
    pub notion: Arc<dyn NotionGateway>,
    pub notion_settings: Arc<dyn NotionSettingsRepository>,
    pub sessions: Sessions,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        storage: Arc<dyn KeyValueStore>,
        chat: Arc<dyn ChatCompletionService>,
        notion: Arc<dyn NotionGateway>,
        notion_settings: Arc<dyn NotionSettingsRepository>,
    ) -> Self {
        Self {
            config,
            thoughts: ThoughtStore::new(storage.clone()),
            todos: TodoStore::new(storage),
            chat,
            notion,
            notion_settings,
            sessions: Sessions::default(),
        }
    }

    pub fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig {
            client_id: self.config.notion_client_id.clone(),
            client_secret: self.config.notion_client_secret.clone(),
            redirect_uri: self.config.notion_redirect_uri.clone(),
        }
    }

    /// Runs store work on the blocking pool. The stores do file I/O under
    /// their own locks, which must not stall the async workers.
    pub async fn with_stores<R, F>(self: &Arc<Self>, f: F) -> Result<R, HandlerError>
    where
        F: FnOnce(&AppState) -> R + Send + 'static,
        R: Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || f(&state)).await.map_err(|e| {
            error!("Store task failed: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Store task failed".to_string())
        })
    }
}

//=========================================================================================
// Sessions (State That Outlives One Request)
//=========================================================================================

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// A deep-dive conversation that one request at a time may drive.
pub type SharedDeepDive = Arc<tokio::sync::Mutex<DeepDiveSession>>;

type Transcript = Arc<Mutex<Option<Vec<Message>>>>;

/// An open deep dive plus the transcript it has not yet handed to the store.
#[derive(Clone)]
pub struct LiveDeepDive {
    pub session: SharedDeepDive,
    unsaved: Transcript,
}

impl LiveDeepDive {
    /// The newest transcript not yet saved, if the session changed since the last call.
    pub fn take_unsaved(&self) -> Option<Vec<Message>> {
        locked(&self.unsaved).take()
    }

    fn is_idle(&self) -> bool {
        Arc::strong_count(&self.session) == 1 && locked(&self.unsaved).is_none()
    }
}

struct Tracked<T> {
    value: T,
    touched: Instant,
}

/// What a user is in the middle of on the calendar.
#[derive(Debug, Default)]
pub struct CalendarGestures {
    pub drag: DragState,
    pub armed: ArmedSelection,
}

#[derive(Default)]
pub struct Sessions {
    deep_dives: Mutex<HashMap<String, Tracked<LiveDeepDive>>>,
    pending_actions: Mutex<HashMap<String, PendingActions>>,
    oauth: Mutex<HashMap<String, OAuthFlow>>,
    oauth_states: Mutex<HashMap<String, Tracked<String>>>,
    manual: Mutex<HashMap<String, ManualSetup>>,
    calendar: Mutex<HashMap<String, CalendarGestures>>,
}

impl Sessions {
    /// The live conversation for a thought, opened on first use.
    ///
    /// A new session resumes the saved transcript. Later transcript changes
    /// are parked on the handle until the caller saves them.
    pub fn deep_dive(&self, thought_id: &str, thought: &str, saved: Option<Vec<Message>>) -> LiveDeepDive {
        let now = Instant::now();
        let mut all = locked(&self.deep_dives);
        evict_idle(&mut all, now);
        let entry = all.entry(thought_id.to_string()).or_insert_with(|| {
            let unsaved: Transcript = Arc::default();
            let sink = unsaved.clone();
            let session = DeepDiveSession::new(thought, saved).with_callback(Box::new(move |messages| {
                *locked(&sink) = Some(messages.to_vec());
            }));
            let live = LiveDeepDive { session: Arc::new(tokio::sync::Mutex::new(session)), unsaved };
            Tracked { value: live, touched: now }
        });
        entry.touched = now;
        entry.value.clone()
    }

    /// The live conversation for a thought, if one is open.
    pub fn existing_deep_dive(&self, thought_id: &str) -> Option<SharedDeepDive> {
        let mut all = locked(&self.deep_dives);
        let entry = all.get_mut(thought_id)?;
        entry.touched = Instant::now();
        Some(entry.value.session.clone())
    }

    pub fn forget_thought(&self, thought_id: &str) {
        locked(&self.deep_dives).remove(thought_id);
        locked(&self.pending_actions).remove(thought_id);
    }

    pub fn set_pending_actions(&self, thought_id: &str, pending: PendingActions) {
        locked(&self.pending_actions).insert(thought_id.to_string(), pending);
    }

    pub fn pending_actions(&self, thought_id: &str) -> Option<PendingActions> {
        locked(&self.pending_actions).get(thought_id).cloned()
    }

    /// Runs `f` on the pending suggestions of a thought, opening them with `seed` when absent.
    pub fn with_pending_actions<R>(
        &self,
        thought_id: &str,
        seed: impl FnOnce() -> PendingActions,
        f: impl FnOnce(&mut PendingActions) -> R,
    ) -> R {
        let mut all = locked(&self.pending_actions);
        f(all.entry(thought_id.to_string()).or_insert_with(seed))
    }

    /// Checks the user's OAuth flow out of the registry; put it back with [`Self::put_oauth`].
    pub fn take_oauth(&self, user_id: &str) -> OAuthFlow {
        locked(&self.oauth).remove(user_id).unwrap_or_default()
    }

    pub fn put_oauth(&self, user_id: &str, flow: OAuthFlow) {
        locked(&self.oauth).insert(user_id.to_string(), flow);
    }

    /// Remembers who started the redirect carrying `state`.
    pub fn remember_oauth_state(&self, state: &str, user_id: &str) {
        self.remember_oauth_state_at(state, user_id, Instant::now());
    }

    /// The user a callback belongs to. The browser returns without our
    /// headers, so the state is the only link back. Expired states are refused.
    pub fn claim_oauth_state(&self, state: &str) -> Option<String> {
        self.claim_oauth_state_at(state, Instant::now())
    }

    fn remember_oauth_state_at(&self, state: &str, user_id: &str, now: Instant) {
        let mut states = locked(&self.oauth_states);
        states.retain(|_, pending| now.duration_since(pending.touched) < OAUTH_STATE_TTL);
        states.insert(state.to_string(), Tracked { value: user_id.to_string(), touched: now });
    }

    fn claim_oauth_state_at(&self, state: &str, now: Instant) -> Option<String> {
        let mut states = locked(&self.oauth_states);
        states.retain(|_, pending| now.duration_since(pending.touched) < OAUTH_STATE_TTL);
        states.remove(state).map(|pending| pending.value)
    }

    pub fn oauth_status(&self, user_id: &str) -> OAuthStatus {
        locked(&self.oauth)
            .get(user_id)
            .map(|flow| flow.status().clone())
            .unwrap_or(OAuthStatus::Disconnected)
    }

    pub fn manual_can_save(&self, user_id: &str) -> bool {
        locked(&self.manual).get(user_id).is_some_and(ManualSetup::can_save)
    }

    /// Drops every in-progress link attempt of a user.
    pub fn forget_user_links(&self, user_id: &str) {
        locked(&self.oauth).remove(user_id);
        locked(&self.manual).remove(user_id);
    }

    pub fn take_manual(&self, user_id: &str) -> ManualSetup {
        locked(&self.manual).remove(user_id).unwrap_or_default()
    }

    pub fn put_manual(&self, user_id: &str, setup: ManualSetup) {
        locked(&self.manual).insert(user_id.to_string(), setup);
    }

    /// Runs `f` on the user's calendar gestures. Users with nothing in
    /// progress are not kept.
    pub fn with_calendar<R>(&self, user_id: &str, f: impl FnOnce(&mut CalendarGestures) -> R) -> R {
        let mut all = locked(&self.calendar);
        let gestures = all.entry(user_id.to_string()).or_default();
        let result = f(gestures);
        if gestures.drag.dragged().is_none() && gestures.armed.armed().is_none() {
            all.remove(user_id);
        }
        result
    }
}

/// Drops deep dives nobody holds, with nothing left to save, that have sat unused too long.
fn evict_idle(all: &mut HashMap<String, Tracked<LiveDeepDive>>, now: Instant) {
    all.retain(|thought_id, entry| {
        let keep = now.duration_since(entry.touched) < DEEP_DIVE_IDLE || !entry.value.is_idle();
        if !keep {
            debug!(thought_id = %thought_id, "Closing idle deep dive");
        }
        keep
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mind_brain_core::ports::{PortResult, PromptKind};

    struct Echo;

    #[async_trait]
    impl ChatCompletionService for Echo {
        async fn complete(&self, _: PromptKind, _: &[Message]) -> PortResult<Option<String>> {
            Ok(Some("ok".into()))
        }
    }

    #[test]
    fn oauth_states_are_single_use() {
        let sessions = Sessions::default();
        sessions.remember_oauth_state("s1", "alice");
        assert_eq!(sessions.claim_oauth_state("s1").as_deref(), Some("alice"));
        assert_eq!(sessions.claim_oauth_state("s1"), None);
    }

    #[test]
    fn expired_oauth_states_are_refused_and_purged() {
        let sessions = Sessions::default();
        let start = Instant::now();
        sessions.remember_oauth_state_at("old", "alice", start);
        sessions.remember_oauth_state_at("fresh", "bob", start + OAUTH_STATE_TTL);

        let later = start + OAUTH_STATE_TTL + Duration::from_secs(1);
        assert_eq!(sessions.claim_oauth_state_at("old", later), None);
        assert_eq!(locked(&sessions.oauth_states).len(), 1);
        assert_eq!(sessions.claim_oauth_state_at("fresh", later).as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn idle_deep_dives_are_evicted_only_when_unused_and_saved() {
        let sessions = Sessions::default();
        let held = sessions.deep_dive("t1", "thought", None);
        drop(sessions.deep_dive("t2", "other", None));
        let unsaved = sessions.deep_dive("t3", "third", None);
        unsaved.session.lock().await.send_message(&Echo, "more").await;
        drop(unsaved);

        let later = Instant::now() + DEEP_DIVE_IDLE + Duration::from_secs(1);
        evict_idle(&mut locked(&sessions.deep_dives), later);

        let open = locked(&sessions.deep_dives);
        assert!(open.contains_key("t1"));
        assert!(!open.contains_key("t2"));
        assert!(open.contains_key("t3"));
        drop(held);
    }

    #[tokio::test]
    async fn transcript_changes_wait_on_the_handle() {
        let sessions = Sessions::default();
        let live = sessions.deep_dive("t1", "thought", None);
        assert_eq!(live.take_unsaved(), None);

        live.session.lock().await.send_message(&Echo, "more").await;
        let transcript = live.take_unsaved().unwrap();
        assert_eq!(transcript.last(), Some(&Message::assistant("ok")));
        assert_eq!(live.take_unsaved(), None);
    }

    #[test]
    fn calendar_gestures_are_per_user() {
        let sessions = Sessions::default();
        sessions.with_calendar("alice", |g| g.drag.start("todo-1"));
        let bobs = sessions.with_calendar("bob", |g| g.drag.dragged().map(str::to_string));
        assert_eq!(bobs, None);
        let alices = sessions.with_calendar("alice", |g| g.drag.dragged().map(str::to_string));
        assert_eq!(alices.as_deref(), Some("todo-1"));

        sessions.with_calendar("alice", |g| g.drag.cancel());
        assert!(locked(&sessions.calendar).is_empty());
    }
}
