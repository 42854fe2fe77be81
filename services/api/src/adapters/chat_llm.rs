//! services/api/src/adapters/chat_llm.rs
//!
//! The chat completion proxy: injects the system prompt for the request kind
//! and forwards the transcript to an OpenAI-compatible API.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use mind_brain_core::domain::{Message, Role};
use mind_brain_core::ports::{ChatCompletionService, PortError, PortResult, PromptKind};
use mind_brain_core::prompts::TEMPERATURE;
use tracing::debug;

pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    chat_model: String,
    mind_map_model: String,
}

impl OpenAiChatAdapter {
    pub fn new(client: Client<OpenAIConfig>, chat_model: String, mind_map_model: String) -> Self {
        Self { client, chat_model, mind_map_model }
    }

    fn model_for(&self, kind: PromptKind) -> &str {
        match kind {
            PromptKind::MindMap => &self.mind_map_model,
            _ => &self.chat_model,
        }
    }
}

fn to_request_message(message: &Message) -> PortResult<ChatCompletionRequestMessage> {
    let content = message.content.clone();
    let built = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()
            .map(ChatCompletionRequestMessage::System),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map(ChatCompletionRequestMessage::User),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()
            .map(ChatCompletionRequestMessage::Assistant),
    };
    built.map_err(|e| PortError::Unexpected(e.to_string()))
}

#[async_trait]
impl ChatCompletionService for OpenAiChatAdapter {
    async fn complete(&self, kind: PromptKind, messages: &[Message]) -> PortResult<Option<String>> {
        let mut request_messages = Vec::with_capacity(messages.len() + 1);
        if let Some(prompt) = kind.system_prompt() {
            request_messages.push(to_request_message(&Message::system(prompt))?);
        }
        for message in messages {
            request_messages.push(to_request_message(message)?);
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model_for(kind))
            .messages(request_messages)
            .max_tokens(kind.max_tokens())
            .temperature(TEMPERATURE)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        debug!(?kind, turns = messages.len(), "Forwarding chat completion");
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone()))
    }
}
