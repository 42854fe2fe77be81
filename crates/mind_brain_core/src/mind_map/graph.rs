//! Node/edge graph of a mind map, and the structured outline it is laid out from.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{Message, Role};

use super::summarize::extract_label;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Theme,
    Question,
    Insight,
    Conclusion,
    Connection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    /// The short label drawn under the node.
    pub text: String,
    /// The full text shown as the tooltip.
    pub full_text: String,
    pub x: f64,
    pub y: f64,
    pub level: u8,
    pub parent_id: Option<String>,
    pub kind: NodeKind,
    pub weight: Option<u8>,
}

impl Node {
    pub fn tooltip(&self) -> &str {
        if self.full_text.is_empty() {
            &self.text
        } else {
            &self.full_text
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    /// Set for cross links between phases; tree edges have none.
    pub relation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl NodeGraph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub(crate) fn push_child(&mut self, node: Node) {
        if let Some(parent) = &node.parent_id {
            self.edges.push(Edge { from: parent.clone(), to: node.id.clone(), relation: None });
        }
        self.nodes.push(node);
    }
}

//=========================================================================================
// Outline
//=========================================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowPhase {
    pub phase: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseLink {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub relation: String,
}

/// The structure of a conversation: a theme, the phases the thinking went
/// through and where it ended up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMapOutline {
    pub main_theme: String,
    #[serde(default)]
    pub thinking_flow: Vec<FlowPhase>,
    #[serde(default)]
    pub connections: Vec<PhaseLink>,
    #[serde(default)]
    pub conclusion: String,
}

impl MindMapOutline {
    /// Parses a model reply, digging the object out of surrounding prose if needed.
    pub fn from_reply(reply: &str) -> Option<Self> {
        let reply = reply.trim();
        if let Ok(outline) = serde_json::from_str::<Self>(reply) {
            return Some(outline);
        }
        static OBJECT: OnceLock<Option<Regex>> = OnceLock::new();
        let pattern = OBJECT.get_or_init(|| Regex::new(r"\{[\s\S]*\}").ok()).as_ref()?;
        serde_json::from_str(pattern.find(reply)?.as_str()).ok()
    }

    /// Builds an outline without a model: one phase per user turn, paired
    /// with the assistant turn that answered it.
    pub fn local(thought: &str, messages: &[Message]) -> Self {
        let user: Vec<&Message> =
            messages.iter().filter(|m| m.role == Role::User && m.content != thought).collect();
        let assistant: Vec<&Message> = messages.iter().filter(|m| m.role == Role::Assistant).collect();

        let thinking_flow = user
            .iter()
            .enumerate()
            .map(|(i, m)| FlowPhase {
                phase: format!("思考階段{}", i + 1),
                key_points: vec![extract_label(&m.content)],
                insights: assistant.get(i).map(|a| vec![extract_label(&a.content)]).unwrap_or_default(),
                questions: vec![extract_label(&m.content)],
            })
            .collect();

        Self {
            main_theme: extract_label(thought),
            thinking_flow,
            connections: Vec::new(),
            conclusion: assistant
                .last()
                .map(|a| extract_label(&a.content))
                .unwrap_or_else(|| "持續思考".to_string()),
        }
    }
}
