//! Positions for mind-map nodes, in world units on an 800-wide canvas.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::domain::{Message, Role};

use super::graph::{Edge, MindMapOutline, Node, NodeGraph, NodeKind};
use super::summarize::extract_label;

pub const CANVAS_WIDTH: f64 = 800.0;
const ROOT_Y: f64 = 60.0;
const PHASE_CENTER_Y: f64 = 180.0;
const PHASE_RADIUS: f64 = 200.0;
const KEY_POINT_DISTANCE: f64 = 80.0;
const KEY_POINT_SPREAD: f64 = 0.3;
const INSIGHT_DISTANCE: f64 = 100.0;
const INSIGHT_SPREAD: f64 = 0.4;
const CONCLUSION_Y: f64 = 450.0;
const TIMELINE_STEP: f64 = 120.0;
const MIN_COLUMN_WIDTH: f64 = 150.0;

fn root(text: String, thought: &str, weight: Option<u8>) -> Node {
    Node {
        id: "root".into(),
        text,
        full_text: thought.to_string(),
        x: CANVAS_WIDTH / 2.0,
        y: ROOT_Y,
        level: 0,
        parent_id: None,
        kind: NodeKind::Root,
        weight,
    }
}

/// Phases on a circle around the root, each with its key points fanned out
/// on the outside and its insights on the inside.
pub fn radial(outline: &MindMapOutline, thought: &str) -> NodeGraph {
    let center_x = CANVAS_WIDTH / 2.0;
    let mut graph = NodeGraph::default();
    graph.push_child(root(outline.main_theme.clone(), thought, Some(10)));

    let step = 2.0 * PI / outline.thinking_flow.len().max(3) as f64;
    for (i, flow) in outline.thinking_flow.iter().enumerate() {
        let angle = i as f64 * step - FRAC_PI_2;
        let phase_id = format!("phase-{i}");
        let px = center_x + PHASE_RADIUS * angle.cos();
        let py = PHASE_CENTER_Y + PHASE_RADIUS * angle.sin();

        graph.push_child(Node {
            id: phase_id.clone(),
            text: flow.phase.clone(),
            full_text: format!("階段: {}", flow.phase),
            x: px,
            y: py,
            level: 1,
            parent_id: Some("root".into()),
            kind: NodeKind::Theme,
            weight: Some(8),
        });

        let half = flow.key_points.len() as f64 / 2.0;
        for (j, point) in flow.key_points.iter().enumerate() {
            let a = angle + (j as f64 - half) * KEY_POINT_SPREAD;
            graph.push_child(Node {
                id: format!("point-{i}-{j}"),
                text: point.clone(),
                full_text: point.clone(),
                x: px + KEY_POINT_DISTANCE * a.cos(),
                y: py + KEY_POINT_DISTANCE * a.sin(),
                level: 2,
                parent_id: Some(phase_id.clone()),
                kind: NodeKind::Question,
                weight: Some(5),
            });
        }

        let half = flow.insights.len() as f64 / 2.0;
        for (j, insight) in flow.insights.iter().enumerate() {
            let a = angle + (j as f64 - half) * INSIGHT_SPREAD + PI;
            graph.push_child(Node {
                id: format!("insight-{i}-{j}"),
                text: insight.clone(),
                full_text: insight.clone(),
                x: px + INSIGHT_DISTANCE * a.cos(),
                y: py + INSIGHT_DISTANCE * a.sin(),
                level: 2,
                parent_id: Some(phase_id.clone()),
                kind: NodeKind::Insight,
                weight: Some(7),
            });
        }
    }

    if !outline.conclusion.trim().is_empty() {
        graph.push_child(Node {
            id: "conclusion".into(),
            text: outline.conclusion.clone(),
            full_text: outline.conclusion.clone(),
            x: center_x,
            y: CONCLUSION_Y,
            level: 1,
            parent_id: Some("root".into()),
            kind: NodeKind::Conclusion,
            weight: Some(9),
        });
    }

    for link in &outline.connections {
        let find = |name: &str| {
            outline
                .thinking_flow
                .iter()
                .position(|f| f.phase == name)
                .map(|i| format!("phase-{i}"))
        };
        if let (Some(from), Some(to)) = (find(&link.from), find(&link.to)) {
            graph.edges.push(Edge { from, to, relation: Some(link.relation.clone()) });
        }
    }

    graph
}

/// One column per conversation round: the user's turn above the reply it got.
pub fn timeline(thought: &str, messages: &[Message]) -> NodeGraph {
    let mut graph = NodeGraph::default();
    graph.push_child(root(extract_label(thought), thought, None));

    let user: Vec<&Message> =
        messages.iter().filter(|m| m.role == Role::User && m.content != thought).collect();
    let assistant: Vec<&Message> = messages.iter().filter(|m| m.role == Role::Assistant).collect();
    let rounds = user.len().min(assistant.len());
    if rounds == 0 {
        return graph;
    }

    let column = (CANVAS_WIDTH / rounds as f64).max(MIN_COLUMN_WIDTH);
    let start_x = (CANVAS_WIDTH - column * rounds as f64) / 2.0 + column / 2.0;

    for (i, (question, answer)) in user.iter().zip(assistant.iter()).enumerate() {
        let x = start_x + i as f64 * column;
        let topic_y = ROOT_Y + TIMELINE_STEP;
        let topic_id = format!("topic-{i}");

        graph.push_child(Node {
            id: topic_id.clone(),
            text: extract_label(&question.content),
            full_text: question.content.clone(),
            x,
            y: topic_y,
            level: 1,
            parent_id: Some("root".into()),
            kind: NodeKind::Theme,
            weight: None,
        });
        graph.push_child(Node {
            id: format!("insight-{i}"),
            text: extract_label(&answer.content),
            full_text: answer.content.clone(),
            x,
            y: topic_y + TIMELINE_STEP,
            level: 2,
            parent_id: Some(topic_id),
            kind: NodeKind::Insight,
            weight: None,
        });
    }

    graph
}
