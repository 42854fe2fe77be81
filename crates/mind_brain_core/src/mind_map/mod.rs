//! crates/mind_brain_core/src/mind_map/mod.rs
//!
//! Mind-map visualization of a deep-dive conversation.
//!
//! Building a map is a pure function of the thought and its transcript
//! (plus, in AI mode, one chat completion). Drawing produces a list of
//! primitives so no real canvas is needed.

pub mod graph;
pub mod layout;
pub mod render;
pub mod summarize;
pub mod viewport;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{Message, Role};
use crate::ports::{ChatCompletionService, PromptKind};

pub use graph::{Edge, MindMapOutline, Node, NodeGraph, NodeKind};
pub use render::{render, to_svg, CanvasSize, DrawCommand};
pub use viewport::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MindMapMode {
    Ai,
    #[default]
    Local,
}

/// Where the node graph came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapSource {
    AiOutline,
    /// AI mode was asked for but the outline had to be built locally.
    LocalOutline,
    Timeline,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MindMap {
    pub source: MapSource,
    pub outline: Option<MindMapOutline>,
    pub graph: NodeGraph,
}

pub fn outline_prompt(messages: &[Message]) -> String {
    let conversation = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| format!("{}: {}", if m.role == Role::User { "用戶" } else { "AI" }, m.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"請分析以下對話內容，提取思考的邏輯流程和關鍵概念，生成心智圖結構：

對話內容：
{conversation}

請以JSON格式返回分析結果，包含：
1. mainTheme: 主要思考主題（3-8字）
2. thinkingFlow: 思考流程的各個階段
3. connections: 概念之間的關聯
4. conclusion: 思考的結論或方向

JSON格式範例：
{{
  "mainTheme": "職涯規劃",
  "thinkingFlow": [
    {{
      "phase": "現狀分析",
      "keyPoints": ["工作不滿", "技能不足"],
      "insights": ["需要改變", "學習機會"],
      "questions": ["如何開始", "時間安排"]
    }}
  ],
  "connections": [
    {{"from": "現狀分析", "to": "技能提升", "relation": "導向"}}
  ],
  "conclusion": "制定學習計畫"
}}

請只返回JSON，不要其他說明文字。"#
    )
}

async fn request_outline(chat: &dyn ChatCompletionService, messages: &[Message]) -> Option<MindMapOutline> {
    let request = [Message::user(outline_prompt(messages))];
    match chat.complete(PromptKind::MindMap, &request).await {
        Ok(Some(reply)) => {
            let outline = MindMapOutline::from_reply(&reply);
            if outline.is_none() {
                warn!("Mind-map reply was not a usable outline");
            }
            outline
        }
        Ok(None) => {
            warn!("Mind-map reply had no content");
            None
        }
        Err(e) => {
            warn!(error = %e, "Mind-map request failed");
            None
        }
    }
}

/// Builds the node graph for a thought's conversation.
///
/// AI mode needs at least two turns; with fewer, or when the model fails,
/// the outline is derived locally and laid out the same way.
pub async fn build_mind_map(
    chat: &dyn ChatCompletionService,
    thought: &str,
    messages: &[Message],
    mode: MindMapMode,
) -> MindMap {
    match mode {
        MindMapMode::Local => MindMap {
            source: MapSource::Timeline,
            outline: None,
            graph: layout::timeline(thought, messages),
        },
        MindMapMode::Ai => {
            let ai = if messages.len() >= 2 { request_outline(chat, messages).await } else { None };
            let (source, outline) = match ai {
                Some(outline) => (MapSource::AiOutline, outline),
                None => (MapSource::LocalOutline, MindMapOutline::local(thought, messages)),
            };
            MindMap { source, graph: layout::radial(&outline, thought), outline: Some(outline) }
        }
    }
}
