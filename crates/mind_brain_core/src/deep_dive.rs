//! crates/mind_brain_core/src/deep_dive.rs
//!
//! The guided AI conversation anchored to a single thought.

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{Message, Role};
use crate::ports::{ChatCompletionService, PromptKind};
use crate::prompts::DEEP_DIVE_SYSTEM_PROMPT;

/// How many non-system turns are sent upstream with each request.
pub const CONTEXT_TURNS: usize = 6;

const UNAVAILABLE_ERROR: &str = "AI 服務暫時不可用，請稍後再試。";
const EMPTY_REPLY_ERROR: &str = "AI 回應格式錯誤，請稍後再試。";

/// Receives the full transcript whenever it changes and holds real turns.
pub type TranscriptCallback = Box<dyn Fn(&[Message]) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Sending,
}

/// What happened to a single `send_message` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnOutcome {
    Answered,
    Failed,
    /// Blank input.
    Ignored,
}

pub struct DeepDiveSession {
    thought: String,
    messages: Vec<Message>,
    status: SessionStatus,
    error: Option<String>,
    on_update: Option<TranscriptCallback>,
}

impl DeepDiveSession {
    /// Starts a conversation on `thought`, resuming `saved` when it holds any turns.
    pub fn new(thought: impl Into<String>, saved: Option<Vec<Message>>) -> Self {
        let thought = thought.into();
        let messages = match saved {
            Some(saved) if !saved.is_empty() => {
                debug!(turns = saved.len(), "Resuming saved deep-dive transcript");
                saved
            }
            _ => seed(&thought),
        };
        Self { thought, messages, status: SessionStatus::Idle, error: None, on_update: None }
    }

    pub fn with_callback(mut self, callback: TranscriptCallback) -> Self {
        self.on_update = Some(callback);
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The turns a user gets to see; the system prompt is hidden.
    pub fn visible_messages(&self) -> Vec<Message> {
        self.messages.iter().filter(|m| m.role != Role::System).cloned().collect()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Sends one user turn and appends the assistant's reply.
    ///
    /// Failures never propagate: they leave the user turn in place and set
    /// [`error`](Self::error).
    pub async fn send_message(&mut self, chat: &dyn ChatCompletionService, text: &str) -> TurnOutcome {
        let text = text.trim();
        if text.is_empty() {
            return TurnOutcome::Ignored;
        }

        self.error = None;
        self.push(Message::user(text));

        let payload = self.outgoing();
        let reply = {
            let _sending = InFlight::enter(&mut self.status);
            chat.complete(PromptKind::DeepDive, &payload).await
        };
        match reply {
            Ok(Some(reply)) if !reply.trim().is_empty() => {
                self.push(Message::assistant(reply));
                TurnOutcome::Answered
            }
            Ok(_) => {
                warn!("Deep-dive reply had no content");
                self.error = Some(EMPTY_REPLY_ERROR.to_string());
                TurnOutcome::Failed
            }
            Err(e) => {
                warn!(error = %e, "Deep-dive request failed");
                self.error = Some(UNAVAILABLE_ERROR.to_string());
                TurnOutcome::Failed
            }
        }
    }

    /// Discards the transcript and starts over from the original thought.
    pub fn reset(&mut self) {
        self.messages = seed(&self.thought);
        self.error = None;
        self.status = SessionStatus::Idle;
        self.notify();
    }

    /// The last few non-system turns; the proxy supplies the system prompt.
    fn outgoing(&self) -> Vec<Message> {
        let turns: Vec<Message> =
            self.messages.iter().filter(|m| m.role != Role::System).cloned().collect();
        let skip = turns.len().saturating_sub(CONTEXT_TURNS);
        turns.into_iter().skip(skip).collect()
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.notify();
    }

    fn notify(&self) {
        if self.messages.len() > 2 {
            if let Some(callback) = &self.on_update {
                callback(&self.messages);
            }
        }
    }
}

/// Holds the session in `Sending` for the length of one request. Dropping it
/// returns to `Idle`, also when the request future is cancelled mid-await.
struct InFlight<'a>(&'a mut SessionStatus);

impl<'a> InFlight<'a> {
    fn enter(status: &'a mut SessionStatus) -> Self {
        *status = SessionStatus::Sending;
        Self(status)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0 = SessionStatus::Idle;
    }
}

fn seed(thought: &str) -> Vec<Message> {
    vec![Message::system(DEEP_DIVE_SYSTEM_PROMPT), Message::user(thought)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{PortError, PortResult};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Replays canned replies and records every payload it was sent.
    struct ScriptedChat {
        replies: Mutex<Vec<PortResult<Option<String>>>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedChat {
        fn new(replies: Vec<PortResult<Option<String>>>) -> Self {
            Self { replies: Mutex::new(replies), seen: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl ChatCompletionService for ScriptedChat {
        async fn complete(&self, kind: PromptKind, messages: &[Message]) -> PortResult<Option<String>> {
            assert_eq!(kind, PromptKind::DeepDive);
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies.lock().unwrap().remove(0)
        }
    }

    #[tokio::test]
    async fn a_fresh_session_is_seeded_with_system_prompt_and_thought() {
        let session = DeepDiveSession::new("I feel stuck at work", None);
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0].role, Role::System);
        assert_eq!(session.visible_messages(), vec![Message::user("I feel stuck at work")]);
    }

    #[tokio::test]
    async fn reply_is_appended_and_reported() {
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = reported.clone();
        let chat = ScriptedChat::new(vec![Ok(Some("What does stuck mean to you?".into()))]);
        let mut session = DeepDiveSession::new("stuck", None)
            .with_callback(Box::new(move |m| sink.lock().unwrap().push(m.len())));

        let outcome = session.send_message(&chat, "I keep procrastinating").await;

        assert_eq!(outcome, TurnOutcome::Answered);
        assert_eq!(session.messages().len(), 4);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(*reported.lock().unwrap(), vec![3, 4]);
    }

    #[tokio::test]
    async fn only_the_last_six_turns_are_sent() {
        let mut saved = vec![Message::system("s")];
        for i in 0..5 {
            saved.push(Message::user(format!("u{i}")));
            saved.push(Message::assistant(format!("a{i}")));
        }
        let chat = ScriptedChat::new(vec![Ok(Some("ok".into()))]);
        let mut session = DeepDiveSession::new("t", Some(saved));

        session.send_message(&chat, "latest").await;

        let seen = chat.seen.lock().unwrap();
        let payload = &seen[0];
        assert_eq!(payload.len(), CONTEXT_TURNS);
        assert!(payload.iter().all(|m| m.role != Role::System));
        assert_eq!(payload.last().unwrap(), &Message::user("latest"));
    }

    #[tokio::test]
    async fn failures_set_an_error_and_keep_the_user_turn() {
        let chat = ScriptedChat::new(vec![
            Err(PortError::Unexpected("502".into())),
            Ok(None),
        ]);
        let mut session = DeepDiveSession::new("t", None);

        assert_eq!(session.send_message(&chat, "hello").await, TurnOutcome::Failed);
        assert_eq!(session.error(), Some(UNAVAILABLE_ERROR));
        assert_eq!(session.messages().last().unwrap(), &Message::user("hello"));

        assert_eq!(session.send_message(&chat, "again").await, TurnOutcome::Failed);
        assert_eq!(session.error(), Some(EMPTY_REPLY_ERROR));
        assert_eq!(session.messages().len(), 4);
    }

    /// Never answers.
    struct Hanging;

    #[async_trait]
    impl ChatCompletionService for Hanging {
        async fn complete(&self, _: PromptKind, _: &[Message]) -> PortResult<Option<String>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn a_cancelled_turn_leaves_the_session_usable() {
        let mut session = DeepDiveSession::new("t", None);

        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(20), session.send_message(&Hanging, "hi")).await;
        assert!(timed_out.is_err());
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.messages().last().unwrap(), &Message::user("hi"));

        let chat = ScriptedChat::new(vec![Ok(Some("welcome back".into()))]);
        assert_eq!(session.send_message(&chat, "again").await, TurnOutcome::Answered);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.messages().last().unwrap(), &Message::assistant("welcome back"));
    }

    #[tokio::test]
    async fn blank_messages_are_ignored() {
        let chat = ScriptedChat::new(vec![]);
        let mut session = DeepDiveSession::new("t", None);
        assert_eq!(session.send_message(&chat, "   ").await, TurnOutcome::Ignored);
        assert_eq!(session.messages().len(), 2);
    }

    #[tokio::test]
    async fn reset_reseeds_from_the_thought() {
        let chat = ScriptedChat::new(vec![Ok(Some("reply".into()))]);
        let mut session = DeepDiveSession::new("original", None);
        session.send_message(&chat, "more").await;

        session.reset();

        assert_eq!(session.visible_messages(), vec![Message::user("original")]);
        assert!(session.error().is_none());
    }
}
