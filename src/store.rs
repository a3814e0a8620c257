//! Box data model and the authoritative in-memory box collection.
//!
//! The store holds annotation boxes in display-space coordinates (at the
//! reference scale active when they were committed) together with the single
//! "active" box that is eligible for move/resize/label changes. All mutation
//! goes through the store's API; callers never edit a returned box in place.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::geometry::{Point, Rect};

/// Unique identifier for an annotation box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoxId(pub u64);

impl std::fmt::Display for BoxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Generator for session-unique box ids: a monotonic counter seeded with a
/// session-start timestamp salt so ids from different sessions never collide.
#[derive(Debug, Clone)]
pub struct BoxIdGen {
    next: u64,
}

impl BoxIdGen {
    pub fn new() -> Self {
        let salt = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self { next: salt << 20 }
    }

    /// Generator starting at a fixed value, for deterministic tests.
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    pub fn next_id(&mut self) -> BoxId {
        let id = BoxId(self.next);
        self.next += 1;
        id
    }
}

impl Default for BoxIdGen {
    fn default() -> Self {
        Self::new()
    }
}

/// A single annotation box: two opposite corners in display space plus a
/// label tag.
///
/// Corners are stored in the order the user drew them; `start` is not
/// required to be above/left of `end`. Normalization happens at read time
/// via [`AnnotationBox::rect`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationBox {
    /// Unique identifier, assigned on creation and never reused.
    pub id: BoxId,
    /// First corner (the drag anchor).
    pub start: Point,
    /// Opposite corner.
    pub end: Point,
    /// Classification label. May be empty only transiently; an unlabeled box
    /// is never export-valid.
    pub label: String,
    /// True only while the box is an unconfirmed review candidate.
    #[serde(default)]
    pub is_preview: bool,
}

impl AnnotationBox {
    pub fn new(id: BoxId, start: Point, end: Point, label: impl Into<String>) -> Self {
        Self {
            id,
            start,
            end,
            label: label.into(),
            is_preview: false,
        }
    }

    pub fn preview(mut self) -> Self {
        self.is_preview = true;
        self
    }

    /// The normalized display-space rectangle. Does not mutate stored corner
    /// order.
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.start, self.end)
    }

    /// Width and height of the box, regardless of corner order.
    pub fn size(&self) -> (f32, f32) {
        ((self.end.x - self.start.x).abs(), (self.end.y - self.start.y).abs())
    }

    /// Whether the box qualifies for export: at least `min_size` in both
    /// axes, non-empty label, and not an unconfirmed preview.
    pub fn is_valid(&self, min_size: f32) -> bool {
        let (w, h) = self.size();
        w >= min_size && h >= min_size && !self.label.is_empty() && !self.is_preview
    }
}

/// A partial update merged into an existing box by [`BoxStore::update`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoxPatch {
    pub start: Option<Point>,
    pub end: Option<Point>,
    pub label: Option<String>,
    pub is_preview: Option<bool>,
}

impl BoxPatch {
    /// Patch that replaces both corners.
    pub fn corners(start: Point, end: Point) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        }
    }

    /// Patch that replaces the label.
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    /// Patch that sets or clears the preview flag.
    pub fn preview(is_preview: bool) -> Self {
        Self {
            is_preview: Some(is_preview),
            ..Default::default()
        }
    }
}

/// One of the eight resize handles of the active box: four corners plus four
/// edge midpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl HandleKind {
    pub fn all() -> &'static [HandleKind] {
        &[
            HandleKind::TopLeft,
            HandleKind::Top,
            HandleKind::TopRight,
            HandleKind::Right,
            HandleKind::BottomRight,
            HandleKind::Bottom,
            HandleKind::BottomLeft,
            HandleKind::Left,
        ]
    }

    /// The handle's center point on a normalized rectangle.
    pub fn position(&self, rect: Rect) -> Point {
        let cx = rect.x + rect.width / 2.0;
        let cy = rect.y + rect.height / 2.0;
        let (x1, y1) = (rect.x, rect.y);
        let (x2, y2) = (rect.x + rect.width, rect.y + rect.height);
        match self {
            HandleKind::TopLeft => Point::new(x1, y1),
            HandleKind::Top => Point::new(cx, y1),
            HandleKind::TopRight => Point::new(x2, y1),
            HandleKind::Right => Point::new(x2, cy),
            HandleKind::BottomRight => Point::new(x2, y2),
            HandleKind::Bottom => Point::new(cx, y2),
            HandleKind::BottomLeft => Point::new(x1, y2),
            HandleKind::Left => Point::new(x1, cy),
        }
    }
}

/// Result of a hit test against the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hit {
    /// A resize handle of the active box.
    Handle(BoxId, HandleKind),
    /// The body of a box (topmost wins).
    Body(BoxId),
    /// Nothing under the point.
    Empty,
}

/// The authoritative collection of annotation boxes.
///
/// Boxes are kept in insertion order, which doubles as z-order: the last
/// added box is topmost and wins hit-test ties.
#[derive(Debug, Clone, Default)]
pub struct BoxStore {
    boxes: Vec<AnnotationBox>,
    active: Option<BoxId>,
}

impl BoxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a box. Silently ignored if the id is already present; the
    /// caller is responsible for generating unique ids.
    pub fn add(&mut self, b: AnnotationBox) -> bool {
        if self.boxes.iter().any(|existing| existing.id == b.id) {
            log::debug!("ignored add of duplicate box {}", b.id);
            return false;
        }
        self.boxes.push(b);
        true
    }

    /// Remove a box by id, returning it. No-op if absent. Clears the active
    /// box if it was the one removed.
    pub fn remove(&mut self, id: BoxId) -> Option<AnnotationBox> {
        let idx = self.boxes.iter().position(|b| b.id == id)?;
        if self.active == Some(id) {
            self.active = None;
        }
        Some(self.boxes.remove(idx))
    }

    /// Merge a patch into an existing box. No-op if absent.
    pub fn update(&mut self, id: BoxId, patch: BoxPatch) -> bool {
        let Some(b) = self.boxes.iter_mut().find(|b| b.id == id) else {
            return false;
        };
        if let Some(start) = patch.start {
            b.start = start;
        }
        if let Some(end) = patch.end {
            b.end = end;
        }
        if let Some(label) = patch.label {
            b.label = label;
        }
        if let Some(is_preview) = patch.is_preview {
            b.is_preview = is_preview;
        }
        true
    }

    /// Put a box back with its exact prior state: overwrite if the id exists,
    /// insert otherwise. Used by undo/redo and review rollback.
    pub fn restore(&mut self, b: AnnotationBox) {
        if let Some(existing) = self.boxes.iter_mut().find(|e| e.id == b.id) {
            *existing = b;
        } else {
            self.boxes.push(b);
        }
    }

    pub fn get(&self, id: BoxId) -> Option<&AnnotationBox> {
        self.boxes.iter().find(|b| b.id == id)
    }

    /// All boxes in insertion (z) order.
    pub fn iter(&self) -> impl Iterator<Item = &AnnotationBox> {
        self.boxes.iter()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Remove all boxes and clear the active box.
    pub fn clear(&mut self) -> Vec<AnnotationBox> {
        self.active = None;
        std::mem::take(&mut self.boxes)
    }

    /// Set the active (editable) box. `None` deselects.
    pub fn set_active(&mut self, id: Option<BoxId>) {
        match id {
            Some(id) if self.get(id).is_none() => {
                log::debug!("ignored set_active for unknown box {id}");
            }
            other => self.active = other,
        }
    }

    pub fn active_id(&self) -> Option<BoxId> {
        self.active
    }

    pub fn active(&self) -> Option<&AnnotationBox> {
        self.active.and_then(|id| self.get(id))
    }

    /// Snapshot of the full box set, for review-session rollback.
    pub fn snapshot(&self) -> Vec<AnnotationBox> {
        self.boxes.clone()
    }

    /// Replace the full box set with a snapshot taken earlier.
    pub fn restore_snapshot(&mut self, snapshot: Vec<AnnotationBox>) {
        self.boxes = snapshot;
        if let Some(id) = self.active {
            if self.get(id).is_none() {
                self.active = None;
            }
        }
    }

    /// Find what is under a display-space point.
    ///
    /// Handle zones of the active box are tested before box bodies. Zones are
    /// squares of `handle_size` display pixels regardless of zoom, centered
    /// on the active box's normalized rectangle corners and edge midpoints.
    /// For bodies, the topmost (last added) box wins.
    pub fn hit_test(&self, point: Point, handle_size: f32) -> Hit {
        if let Some(active) = self.active() {
            let rect = active.rect();
            let half = handle_size / 2.0;
            for &handle in HandleKind::all() {
                let center = handle.position(rect);
                if (point.x - center.x).abs() <= half && (point.y - center.y).abs() <= half {
                    return Hit::Handle(active.id, handle);
                }
            }
        }
        for b in self.boxes.iter().rev() {
            if b.rect().contains(point) {
                return Hit::Body(b.id);
            }
        }
        Hit::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_box(id: u64, x1: f32, y1: f32, x2: f32, y2: f32) -> AnnotationBox {
        AnnotationBox::new(BoxId(id), Point::new(x1, y1), Point::new(x2, y2), "thing")
    }

    #[test]
    fn test_add_and_duplicate() {
        let mut store = BoxStore::new();
        assert!(store.add(make_box(1, 0.0, 0.0, 50.0, 50.0)));
        assert!(!store.add(make_box(1, 10.0, 10.0, 20.0, 20.0)));
        assert_eq!(store.len(), 1);
        // Original box untouched
        assert_eq!(store.get(BoxId(1)).unwrap().end, Point::new(50.0, 50.0));
    }

    #[test]
    fn test_remove_clears_active() {
        let mut store = BoxStore::new();
        store.add(make_box(1, 0.0, 0.0, 50.0, 50.0));
        store.set_active(Some(BoxId(1)));
        assert!(store.active().is_some());

        let removed = store.remove(BoxId(1)).unwrap();
        assert_eq!(removed.id, BoxId(1));
        assert!(store.active().is_none());
        assert!(store.remove(BoxId(1)).is_none());
    }

    #[test]
    fn test_update_merges_patch() {
        let mut store = BoxStore::new();
        store.add(make_box(1, 0.0, 0.0, 50.0, 50.0));

        assert!(store.update(BoxId(1), BoxPatch::label("fabric")));
        let b = store.get(BoxId(1)).unwrap();
        assert_eq!(b.label, "fabric");
        assert_eq!(b.start, Point::new(0.0, 0.0)); // untouched

        assert!(!store.update(BoxId(99), BoxPatch::label("nope")));
    }

    #[test]
    fn test_hit_test_topmost_wins() {
        let mut store = BoxStore::new();
        store.add(make_box(1, 0.0, 0.0, 100.0, 100.0));
        store.add(make_box(2, 50.0, 50.0, 150.0, 150.0));

        // Overlap region belongs to the later box
        assert_eq!(store.hit_test(Point::new(75.0, 75.0), 8.0), Hit::Body(BoxId(2)));
        assert_eq!(store.hit_test(Point::new(10.0, 10.0), 8.0), Hit::Body(BoxId(1)));
        assert_eq!(store.hit_test(Point::new(300.0, 300.0), 8.0), Hit::Empty);
    }

    #[test]
    fn test_handles_only_on_active_box() {
        let mut store = BoxStore::new();
        store.add(make_box(1, 10.0, 10.0, 100.0, 100.0));

        // Corner point: without an active box this is just a body hit
        assert_eq!(store.hit_test(Point::new(10.0, 10.0), 8.0), Hit::Body(BoxId(1)));

        store.set_active(Some(BoxId(1)));
        assert_eq!(
            store.hit_test(Point::new(10.0, 10.0), 8.0),
            Hit::Handle(BoxId(1), HandleKind::TopLeft)
        );
        assert_eq!(
            store.hit_test(Point::new(55.0, 100.0), 8.0),
            Hit::Handle(BoxId(1), HandleKind::Bottom)
        );
    }

    #[test]
    fn test_handles_use_normalized_rect() {
        let mut store = BoxStore::new();
        // Corners stored "backwards"
        store.add(make_box(1, 100.0, 100.0, 10.0, 10.0));
        store.set_active(Some(BoxId(1)));
        assert_eq!(
            store.hit_test(Point::new(10.0, 10.0), 8.0),
            Hit::Handle(BoxId(1), HandleKind::TopLeft)
        );
    }

    #[test]
    fn test_clear() {
        let mut store = BoxStore::new();
        store.add(make_box(1, 0.0, 0.0, 50.0, 50.0));
        store.add(make_box(2, 0.0, 0.0, 50.0, 50.0));
        store.set_active(Some(BoxId(2)));

        let cleared = store.clear();
        assert_eq!(cleared.len(), 2);
        assert!(store.is_empty());
        assert!(store.active().is_none());
    }

    #[test]
    fn test_set_active_unknown_is_noop() {
        let mut store = BoxStore::new();
        store.add(make_box(1, 0.0, 0.0, 50.0, 50.0));
        store.set_active(Some(BoxId(1)));
        store.set_active(Some(BoxId(42)));
        assert_eq!(store.active_id(), Some(BoxId(1)));
    }

    #[test]
    fn test_validity_rule() {
        let mut b = make_box(1, 0.0, 0.0, 50.0, 50.0);
        assert!(b.is_valid(10.0));

        b.label.clear();
        assert!(!b.is_valid(10.0));

        b.label = "fabric".into();
        b.end = Point::new(5.0, 50.0); // too narrow
        assert!(!b.is_valid(10.0));

        b.end = Point::new(-50.0, -50.0); // swapped corners still measure
        assert!(b.is_valid(10.0));

        b.is_preview = true;
        assert!(!b.is_valid(10.0));
    }

    #[test]
    fn test_id_gen_monotonic() {
        let mut id_gen = BoxIdGen::starting_at(7);
        let a = id_gen.next_id();
        let b = id_gen.next_id();
        assert_eq!(a, BoxId(7));
        assert_eq!(b, BoxId(8));
    }
}
