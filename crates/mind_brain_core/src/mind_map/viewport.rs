//! Pan and zoom state of the mind-map view, and pointer hit-testing.

use serde::{Deserialize, Serialize};

use super::graph::{Node, NodeGraph};

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 3.0;
/// Pan limit in screen units on either axis.
pub const MAX_OFFSET: f64 = 100_000.0;
const BUTTON_ZOOM_STEP: f64 = 1.2;
/// Pointer distance, in world units, within which a node counts as hovered.
pub const HIT_RADIUS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub zoom: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    #[serde(skip)]
    drag_origin: Option<(f64, f64)>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { zoom: 1.0, offset_x: 0.0, offset_y: 0.0, drag_origin: None }
    }
}

impl Viewport {
    /// A viewport from untrusted values: non-finite numbers fall back to the
    /// defaults and everything else is clamped.
    pub fn with(zoom: f64, offset_x: f64, offset_y: f64) -> Self {
        let zoom = if zoom.is_finite() { zoom.clamp(MIN_ZOOM, MAX_ZOOM) } else { 1.0 };
        Self { zoom, offset_x: bounded_offset(offset_x), offset_y: bounded_offset(offset_y), drag_origin: None }
    }

    pub fn begin_drag(&mut self, x: f64, y: f64) {
        self.drag_origin = Some((x, y));
    }

    /// Pans by the pointer movement since the last call. Returns `false` when
    /// no drag is in progress, in which case the caller should hit-test instead.
    pub fn drag_to(&mut self, x: f64, y: f64) -> bool {
        let Some((ox, oy)) = self.drag_origin else {
            return false;
        };
        self.offset_x = bounded_offset(self.offset_x + (x - ox));
        self.offset_y = bounded_offset(self.offset_y + (y - oy));
        self.drag_origin = Some((x, y));
        true
    }

    pub fn end_drag(&mut self) {
        self.drag_origin = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_origin.is_some()
    }

    /// Scrolling down zooms out.
    pub fn wheel(&mut self, delta_y: f64) {
        let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
        self.set_zoom(self.zoom * factor);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * BUTTON_ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / BUTTON_ZOOM_STEP);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn to_world(&self, screen_x: f64, screen_y: f64) -> (f64, f64) {
        ((screen_x - self.offset_x) / self.zoom, (screen_y - self.offset_y) / self.zoom)
    }

    /// The first node within [`HIT_RADIUS`] of a screen point.
    pub fn hit_test<'a>(&self, graph: &'a NodeGraph, screen_x: f64, screen_y: f64) -> Option<&'a Node> {
        let (x, y) = self.to_world(screen_x, screen_y);
        graph.nodes.iter().find(|n| (n.x - x).hypot(n.y - y) <= HIT_RADIUS)
    }
}

fn bounded_offset(offset: f64) -> f64 {
    if offset.is_finite() {
        offset.clamp(-MAX_OFFSET, MAX_OFFSET)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mind_map::graph::NodeKind;

    fn node(id: &str, x: f64, y: f64) -> Node {
        Node {
            id: id.into(),
            text: id.into(),
            full_text: format!("{id} in full"),
            x,
            y,
            level: 0,
            parent_id: None,
            kind: NodeKind::Root,
            weight: None,
        }
    }

    #[test]
    fn zoom_is_clamped() {
        let mut viewport = Viewport::default();
        for _ in 0..20 {
            viewport.zoom_in();
        }
        assert_eq!(viewport.zoom, MAX_ZOOM);
        for _ in 0..40 {
            viewport.wheel(1.0);
        }
        assert_eq!(viewport.zoom, MIN_ZOOM);
        viewport.reset();
        assert_eq!(viewport.zoom, 1.0);
    }

    #[test]
    fn untrusted_values_are_made_finite_and_bounded() {
        let viewport = Viewport::with(f64::NAN, f64::INFINITY, f64::NEG_INFINITY);
        assert_eq!((viewport.zoom, viewport.offset_x, viewport.offset_y), (1.0, 0.0, 0.0));

        let far = Viewport::with(100.0, 1e300, -1e300);
        assert_eq!((far.zoom, far.offset_x, far.offset_y), (MAX_ZOOM, MAX_OFFSET, -MAX_OFFSET));
    }

    #[test]
    fn dragging_pans_by_pointer_delta() {
        let mut viewport = Viewport::default();
        assert!(!viewport.drag_to(10.0, 10.0));
        viewport.begin_drag(100.0, 100.0);
        assert!(viewport.drag_to(130.0, 90.0));
        assert!(viewport.drag_to(140.0, 90.0));
        viewport.end_drag();
        assert_eq!((viewport.offset_x, viewport.offset_y), (40.0, -10.0));
    }

    #[test]
    fn hit_testing_works_in_world_coordinates() {
        let graph = NodeGraph { nodes: vec![node("a", 100.0, 100.0), node("b", 110.0, 100.0)], edges: vec![] };
        let viewport = Viewport::with(2.0, 50.0, 0.0);

        let hovered = viewport.hit_test(&graph, 250.0, 200.0).unwrap();
        assert_eq!(hovered.id, "a");
        assert_eq!(hovered.tooltip(), "a in full");
        assert!(viewport.hit_test(&graph, 600.0, 600.0).is_none());
    }
}
