//! Immediate-mode drawing of a mind map as a flat list of primitives.
//!
//! Every command is in world units; the viewport transform is applied once
//! by the consumer (see [`to_svg`]).

use std::f64::consts::PI;
use std::fmt::Write;

use serde::Serialize;

use super::graph::{Node, NodeGraph, NodeKind};
use super::viewport::Viewport;

const GRID_SIZE: f64 = 50.0;
const GRID_COLOR: &str = "#f1f5f9";
const EDGE_COLOR: &str = "#cbd5e1";
const HOVER_COLOR: &str = "#3b82f6";
const TEXT_COLOR: &str = "#1f2937";
const ARROW_LENGTH: f64 = 15.0;
const ARROW_ANGLE: f64 = PI / 6.0;
const LABEL_PADDING: f64 = 10.0;
/// Largest canvas edge accepted from a caller.
pub const MAX_CANVAS: f64 = 4096.0;
/// Upper bound on grid lines per axis.
const MAX_GRID_LINES: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self { width: 800.0, height: 500.0 }
    }
}

impl CanvasSize {
    /// A canvas from caller-supplied edges. Missing, non-positive or
    /// non-finite edges take the default; the rest are capped at [`MAX_CANVAS`].
    pub fn bounded(width: Option<f64>, height: Option<f64>) -> Self {
        let fallback = Self::default();
        let edge = |value: Option<f64>, default: f64| match value {
            Some(v) if v.is_finite() && v > 0.0 => v.min(MAX_CANVAS),
            _ => default,
        };
        Self { width: edge(width, fallback.width), height: edge(height, fallback.height) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DrawCommand {
    Line { x1: f64, y1: f64, x2: f64, y2: f64, color: &'static str, width: f64 },
    Curve { x1: f64, y1: f64, cx: f64, cy: f64, x2: f64, y2: f64, color: &'static str, width: f64 },
    Circle { cx: f64, cy: f64, r: f64, fill: &'static str, stroke: &'static str, stroke_width: f64 },
    Rect { x: f64, y: f64, w: f64, h: f64, fill: &'static str, stroke: &'static str, stroke_width: f64 },
    Text { x: f64, y: f64, text: String, size: f64, bold: bool, color: &'static str },
}

struct Style {
    color: &'static str,
    size: f64,
}

fn style(kind: NodeKind) -> Style {
    let (color, size) = match kind {
        NodeKind::Root => ("#8b5cf6", 18.0),
        NodeKind::Theme => ("#3b82f6", 14.0),
        NodeKind::Question => ("#10b981", 10.0),
        NodeKind::Insight => ("#f59e0b", 12.0),
        NodeKind::Conclusion => ("#ef4444", 16.0),
        NodeKind::Connection => ("#6366f1", 8.0),
    };
    Style { color, size }
}

/// Circle radius: the kind's base size adjusted by weight, grown when hovered.
pub fn node_radius(node: &Node, hovered: bool) -> f64 {
    let base = style(node.kind).size;
    let sized = match node.weight {
        Some(w) => (base + (f64::from(w) - 5.0) * 2.0).clamp(6.0, 20.0),
        None => base,
    };
    if hovered {
        sized + 4.0
    } else {
        sized
    }
}

fn font_size(kind: NodeKind) -> f64 {
    match kind {
        NodeKind::Root => 18.0,
        NodeKind::Theme => 15.0,
        _ => 12.0,
    }
}

/// Approximate advance width: full-width glyphs take the whole em.
fn text_width(text: &str, size: f64) -> f64 {
    text.chars().map(|c| if c.is_ascii() { size * 0.6 } else { size }).sum()
}

pub fn render(graph: &NodeGraph, viewport: &Viewport, hovered: Option<&str>, canvas: CanvasSize) -> Vec<DrawCommand> {
    let mut commands = grid(viewport, canvas);

    for edge in &graph.edges {
        let (Some(from), Some(to)) = (graph.node(&edge.from), graph.node(&edge.to)) else {
            continue;
        };
        let lit = hovered.is_some_and(|h| h == from.id || h == to.id);
        let (color, width) = if lit { (HOVER_COLOR, 3.0) } else { (EDGE_COLOR, 2.0) };
        commands.push(DrawCommand::Curve {
            x1: from.x,
            y1: from.y,
            cx: (from.x + to.x) / 2.0,
            cy: from.y + (to.y - from.y) * 0.3,
            x2: to.x,
            y2: to.y,
            color,
            width,
        });
        if lit {
            commands.extend(arrow_head(from.x, from.y, to.x, to.y, color, width));
        }
    }

    for node in &graph.nodes {
        let is_hovered = hovered == Some(node.id.as_str());
        let Style { color, .. } = style(node.kind);
        let r = node_radius(node, is_hovered);
        commands.push(DrawCommand::Circle {
            cx: node.x,
            cy: node.y,
            r,
            fill: color,
            stroke: if is_hovered { "#ffffff" } else { "rgba(255,255,255,0.5)" },
            stroke_width: if is_hovered { 3.0 } else { 2.0 },
        });

        let size = font_size(node.kind);
        let w = text_width(&node.text, size);
        let h = size + 6.0;
        commands.push(DrawCommand::Rect {
            x: node.x - w / 2.0 - LABEL_PADDING,
            y: node.y - h / 2.0 + r + 8.0,
            w: w + LABEL_PADDING * 2.0,
            h,
            fill: if is_hovered { "rgba(59,130,246,0.15)" } else { "rgba(255,255,255,0.95)" },
            stroke: if is_hovered { color } else { "#e2e8f0" },
            stroke_width: if is_hovered { 2.0 } else { 1.0 },
        });
        commands.push(DrawCommand::Text {
            x: node.x,
            y: node.y + r + 16.0,
            text: node.text.clone(),
            size,
            bold: node.kind == NodeKind::Root,
            color: TEXT_COLOR,
        });
    }

    commands
}

/// Grid lines covering the visible world rectangle.
fn grid(viewport: &Viewport, canvas: CanvasSize) -> Vec<DrawCommand> {
    let (left, top) = viewport.to_world(0.0, 0.0);
    let (right, bottom) = viewport.to_world(canvas.width, canvas.height);
    let line = |x1, y1, x2, y2| DrawCommand::Line { x1, y1, x2, y2, color: GRID_COLOR, width: 0.5 };

    let mut lines: Vec<DrawCommand> = grid_positions(left, right).map(|x| line(x, top, x, bottom)).collect();
    lines.extend(grid_positions(top, bottom).map(|y| line(left, y, right, y)));
    lines
}

/// Multiples of the grid size in `[from, to]`, at most [`MAX_GRID_LINES`] of them.
fn grid_positions(from: f64, to: f64) -> impl Iterator<Item = f64> {
    let first = (from / GRID_SIZE).floor();
    let span = (to / GRID_SIZE).floor() - first + 1.0;
    let count = if span.is_finite() && span > 0.0 { (span as usize).min(MAX_GRID_LINES) } else { 0 };
    (0..count).map(move |i| (first + i as f64) * GRID_SIZE)
}

fn arrow_head(fx: f64, fy: f64, tx: f64, ty: f64, color: &'static str, width: f64) -> [DrawCommand; 2] {
    let angle = (ty - fy).atan2(tx - fx);
    let wing = |offset: f64| DrawCommand::Line {
        x1: tx,
        y1: ty,
        x2: tx - ARROW_LENGTH * (angle + offset).cos(),
        y2: ty - ARROW_LENGTH * (angle + offset).sin(),
        color,
        width,
    };
    [wing(-ARROW_ANGLE), wing(ARROW_ANGLE)]
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

/// Serializes a command list as a standalone SVG document.
pub fn to_svg(commands: &[DrawCommand], viewport: &Viewport, canvas: CanvasSize) -> String {
    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}"><g transform="translate({} {}) scale({})">"#,
        canvas.width, canvas.height, canvas.width, canvas.height, viewport.offset_x, viewport.offset_y, viewport.zoom
    );
    for command in commands {
        let _ = match command {
            DrawCommand::Line { x1, y1, x2, y2, color, width } => write!(
                svg,
                r#"<line x1="{x1:.1}" y1="{y1:.1}" x2="{x2:.1}" y2="{y2:.1}" stroke="{color}" stroke-width="{width}"/>"#
            ),
            DrawCommand::Curve { x1, y1, cx, cy, x2, y2, color, width } => write!(
                svg,
                r#"<path d="M{x1:.1} {y1:.1} Q{cx:.1} {cy:.1} {x2:.1} {y2:.1}" fill="none" stroke="{color}" stroke-width="{width}"/>"#
            ),
            DrawCommand::Circle { cx, cy, r, fill, stroke, stroke_width } => write!(
                svg,
                r#"<circle cx="{cx:.1}" cy="{cy:.1}" r="{r:.1}" fill="{fill}" stroke="{stroke}" stroke-width="{stroke_width}"/>"#
            ),
            DrawCommand::Rect { x, y, w, h, fill, stroke, stroke_width } => write!(
                svg,
                r#"<rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" fill="{fill}" stroke="{stroke}" stroke-width="{stroke_width}"/>"#
            ),
            DrawCommand::Text { x, y, text, size, bold, color } => write!(
                svg,
                r#"<text x="{x:.1}" y="{y:.1}" font-size="{size}" font-weight="{}" fill="{color}" text-anchor="middle" dominant-baseline="middle">{}</text>"#,
                if *bold { "bold" } else { "normal" },
                escape(text)
            ),
        };
    }
    svg.push_str("</g></svg>");
    svg
}
