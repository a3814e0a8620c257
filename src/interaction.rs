//! Pointer-driven interaction state machine.
//!
//! Decides, per pointer event, whether the user is drawing a new box,
//! dragging an existing one, or resizing via a handle, and turns pointer
//! deltas into store mutations. History is recorded once per gesture at
//! release, as a single before/after pair, never per intermediate frame.
//!
//! Single-pointer only: a pointer-down while a gesture is in progress is
//! ignored.

use crate::config::EditorConfig;
use crate::geometry::{Point, Rect};
use crate::history::{HistoryEntry, HistoryManager};
use crate::store::{AnnotationBox, BoxId, BoxIdGen, BoxPatch, BoxStore, HandleKind, Hit};

/// Keys the editor core reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Delete,
    Z,
    Y,
}

/// A key press with modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub ctrl: bool,
    pub shift: bool,
    /// Cmd on macOS; treated the same as ctrl.
    pub command: bool,
}

impl KeyInput {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
            command: false,
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    fn primary(&self) -> bool {
        self.ctrl || self.command
    }
}

/// The gesture currently in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Idle,
    /// Dragging out a new box. The draft lives on the controller, not in the
    /// store, until pointer-up.
    Drawing,
    /// Dragging a whole box by its body.
    Moving {
        id: BoxId,
        last: Point,
        before: AnnotationBox,
    },
    /// Dragging one handle of the active box; the opposing corner/edge stays
    /// fixed.
    Resizing {
        id: BoxId,
        handle: HandleKind,
        anchor: Rect,
        before: AnnotationBox,
    },
}

/// The pointer-event state machine.
///
/// Owns no boxes: every mutation lands in the [`BoxStore`] passed per call,
/// and each finished gesture is recorded through the [`HistoryManager`].
#[derive(Debug, Clone)]
pub struct InteractionController {
    gesture: Gesture,
    draft: Option<AnnotationBox>,
    /// Canvas bounds in display space, for clamping. Unbounded until set.
    canvas_w: f32,
    canvas_h: f32,
    /// Label assigned to newly drawn boxes (the host's class selector).
    current_label: String,
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            gesture: Gesture::Idle,
            draft: None,
            canvas_w: f32::INFINITY,
            canvas_h: f32::INFINITY,
            current_label: String::new(),
        }
    }

    /// Set the display-space canvas bounds used for clamping drags.
    pub fn set_canvas_size(&mut self, width: f32, height: f32) {
        self.canvas_w = width;
        self.canvas_h = height;
    }

    /// Set the label given to newly drawn boxes.
    pub fn set_current_label(&mut self, label: impl Into<String>) {
        self.current_label = label.into();
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// The in-progress box while drawing, for rendering. Not yet in the
    /// store.
    pub fn draft(&self) -> Option<&AnnotationBox> {
        self.draft.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.gesture, Gesture::Idle)
    }

    /// Pointer pressed at a display-space point.
    pub fn pointer_down(
        &mut self,
        point: Point,
        store: &mut BoxStore,
        id_gen: &mut BoxIdGen,
        config: &EditorConfig,
    ) {
        if !self.is_idle() {
            return;
        }
        let point = point.clamped(self.canvas_w, self.canvas_h);
        match store.hit_test(point, config.handle_size) {
            Hit::Handle(id, handle) => {
                // hit_test only reports handles for the active box
                let Some(b) = store.get(id) else { return };
                self.gesture = Gesture::Resizing {
                    id,
                    handle,
                    anchor: b.rect(),
                    before: b.clone(),
                };
            }
            Hit::Body(id) => {
                store.set_active(Some(id));
                let Some(b) = store.get(id) else { return };
                self.gesture = Gesture::Moving {
                    id,
                    last: point,
                    before: b.clone(),
                };
            }
            Hit::Empty => {
                store.set_active(None);
                self.draft = Some(AnnotationBox::new(
                    id_gen.next_id(),
                    point,
                    point,
                    self.current_label.clone(),
                ));
                self.gesture = Gesture::Drawing;
            }
        }
    }

    /// Pointer moved to a display-space point.
    pub fn pointer_move(&mut self, point: Point, store: &mut BoxStore) {
        let point = point.clamped(self.canvas_w, self.canvas_h);
        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Drawing => {
                if let Some(draft) = self.draft.as_mut() {
                    draft.end = point;
                }
            }
            Gesture::Moving { id, last, .. } => {
                let id = *id;
                let Some(b) = store.get(id) else { return };
                let rect = b.rect();
                // Clamp the delta so the box stays fully inside the canvas
                let dx = (point.x - last.x)
                    .clamp(-rect.x, (self.canvas_w - rect.width - rect.x).max(-rect.x));
                let dy = (point.y - last.y)
                    .clamp(-rect.y, (self.canvas_h - rect.height - rect.y).max(-rect.y));
                let (start, end) = (b.start, b.end);
                store.update(
                    id,
                    BoxPatch::corners(
                        Point::new(start.x + dx, start.y + dy),
                        Point::new(end.x + dx, end.y + dy),
                    ),
                );
                *last = Point::new(last.x + dx, last.y + dy);
            }
            Gesture::Resizing { id, handle, anchor, .. } => {
                let (start, end) = resize_corners(*anchor, *handle, point);
                store.update(*id, BoxPatch::corners(start, end));
            }
        }
    }

    /// Pointer released. Commits the gesture: a drawn box is added (or
    /// discarded if under the minimum size), a move/resize becomes a single
    /// history entry.
    pub fn pointer_up(
        &mut self,
        store: &mut BoxStore,
        history: &mut HistoryManager,
        config: &EditorConfig,
    ) {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        match gesture {
            Gesture::Idle => {}
            Gesture::Drawing => {
                let Some(draft) = self.draft.take() else { return };
                let (w, h) = draft.size();
                if w < config.min_box_size || h < config.min_box_size {
                    log::debug!("discarded sub-minimum draw ({w:.1}x{h:.1})");
                    return;
                }
                let id = draft.id;
                store.add(draft.clone());
                store.set_active(Some(id));
                history.record(HistoryEntry::Add(draft));
            }
            Gesture::Moving { id, before, .. } | Gesture::Resizing { id, before, .. } => {
                let Some(after) = store.get(id).cloned() else { return };
                if after == before {
                    return;
                }
                // Edits to an unconfirmed review candidate are not
                // historized; the confirm commit captures the final state.
                if before.is_preview {
                    return;
                }
                history.record(HistoryEntry::Update { before, after });
            }
        }
    }

    /// Delete the active box, recording the removal. No gesture transition.
    pub fn delete_active(&mut self, store: &mut BoxStore, history: &mut HistoryManager) {
        let Some(id) = store.active_id() else { return };
        if let Some(removed) = store.remove(id) {
            if !removed.is_preview {
                history.record(HistoryEntry::Remove(removed));
            }
        }
    }

    /// Handle a key press: Delete removes the active box, Ctrl/Cmd+Z undoes,
    /// Ctrl/Cmd+Shift+Z or Ctrl/Cmd+Y redoes. Everything else is a no-op.
    pub fn handle_key(
        &mut self,
        input: KeyInput,
        store: &mut BoxStore,
        history: &mut HistoryManager,
    ) {
        match input.key {
            Key::Delete => self.delete_active(store, history),
            Key::Z if input.primary() && input.shift => {
                history.redo(store);
            }
            Key::Z if input.primary() => {
                history.undo(store);
            }
            Key::Y if input.primary() => {
                history.redo(store);
            }
            _ => {}
        }
    }

    /// Abandon any in-progress gesture without committing anything.
    pub fn cancel_gesture(&mut self) {
        self.gesture = Gesture::Idle;
        self.draft = None;
    }
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

/// Corner positions after dragging `handle` of the normalized `anchor` rect
/// to `point`. Corner handles move both axes; edge handles move one. The
/// dragged corner may cross the fixed one, leaving swapped corners that
/// normalize at read time.
fn resize_corners(anchor: Rect, handle: HandleKind, point: Point) -> (Point, Point) {
    let (x1, y1) = (anchor.x, anchor.y);
    let (x2, y2) = (anchor.x + anchor.width, anchor.y + anchor.height);
    match handle {
        HandleKind::TopLeft => (Point::new(x2, y2), point),
        HandleKind::TopRight => (Point::new(x1, y2), point),
        HandleKind::BottomRight => (Point::new(x1, y1), point),
        HandleKind::BottomLeft => (Point::new(x2, y1), point),
        HandleKind::Top => (Point::new(x1, point.y), Point::new(x2, y2)),
        HandleKind::Bottom => (Point::new(x1, y1), Point::new(x2, point.y)),
        HandleKind::Left => (Point::new(point.x, y1), Point::new(x2, y2)),
        HandleKind::Right => (Point::new(x1, y1), Point::new(point.x, y2)),
    }
}
