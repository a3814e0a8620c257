//! The annotation editor facade.
//!
//! Owns the box store, history, interaction controller, view transform and
//! the optional review session, and exposes the operations the host UI wires
//! to its toolbar, canvas events and save actions. Rendering is a pure read
//! of [`AnnotationEditor::boxes`] / [`AnnotationEditor::draft_box`] after
//! each call; the editor never schedules anything itself.

use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::geometry::Point;
use crate::history::{HistoryEntry, HistoryManager};
use crate::interaction::{InteractionController, KeyInput};
use crate::review::{Candidate, ReviewSession, ReviewSource};
use crate::store::{AnnotationBox, BoxId, BoxIdGen, BoxPatch, BoxStore};
use crate::transform::ViewTransform;

/// A persisted label in image-pixel space: top-left corner plus size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelLabel {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub class_id: u32,
    pub class_name: String,
}

/// A candidate box from the object-detection backend, in image-pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelDetection {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub class_name: String,
}

/// The top-level annotation editor.
pub struct AnnotationEditor {
    store: BoxStore,
    history: HistoryManager,
    controller: InteractionController,
    review: Option<ReviewSession>,
    transform: ViewTransform,
    id_gen: BoxIdGen,
    config: EditorConfig,
    /// Ordered class names; index = class id. Grows on demand when an
    /// unknown label is exported or loaded.
    classes: Vec<String>,
}

impl AnnotationEditor {
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        Self {
            store: BoxStore::new(),
            history: HistoryManager::new(config.max_history),
            controller: InteractionController::new(),
            review: None,
            transform: ViewTransform::identity(),
            id_gen: BoxIdGen::new(),
            config,
            classes: Vec::new(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    // ========================================================================
    // View setup
    // ========================================================================

    /// Prepare the editor for a freshly loaded image: compute the fit scale
    /// for the container, size the canvas, and drop all per-image state
    /// (boxes, history, any open review).
    pub fn load_image(&mut self, container_w: f32, container_h: f32, image_w: f32, image_h: f32) {
        self.transform = ViewTransform::fit(container_w, container_h, image_w, image_h);
        let scale = self.transform.scale();
        self.controller.set_canvas_size(image_w * scale, image_h * scale);
        self.store.clear();
        self.history.clear();
        self.review = None;
        self.controller.cancel_gesture();
        log::debug!(
            "loaded {image_w}x{image_h} image at base scale {:.3}",
            self.transform.base_scale
        );
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    /// Change the zoom level, re-projecting every stored box so the store
    /// keeps holding coordinates in the current display space. Not meant to
    /// be called mid-gesture.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.set_view_transform(self.transform.with_zoom(zoom));
    }

    fn set_view_transform(&mut self, new: ViewTransform) {
        let old = self.transform;
        if new == old {
            return;
        }
        let reproject = |p: Point| new.to_display(old.to_image_pixel(p));
        let patches: Vec<(BoxId, BoxPatch)> = self
            .store
            .iter()
            .map(|b| (b.id, BoxPatch::corners(reproject(b.start), reproject(b.end))))
            .collect();
        for (id, patch) in patches {
            self.store.update(id, patch);
        }
        self.transform = new;
    }

    // ========================================================================
    // Classes
    // ========================================================================

    /// Replace the class list. Index = class id.
    pub fn set_classes(&mut self, classes: Vec<String>) {
        self.classes = classes;
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Select the class assigned to newly drawn boxes.
    pub fn set_current_class(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.ensure_class(&name);
        self.controller.set_current_label(name);
    }

    /// Resolve a class name to its id, registering it if unknown (the same
    /// on-the-fly category creation used when importing label files without
    /// a class list).
    fn ensure_class(&mut self, name: &str) -> u32 {
        if let Some(idx) = self.classes.iter().position(|c| c == name) {
            return idx as u32;
        }
        self.classes.push(name.to_string());
        log::debug!("registered class '{name}'");
        (self.classes.len() - 1) as u32
    }

    // ========================================================================
    // Load / export
    // ========================================================================

    /// Bulk-load existing labels for the current image, converting them from
    /// image-pixel space into display space. Called once per image, before
    /// any interaction; the loaded boxes are not undoable.
    pub fn load_initial(&mut self, labels: &[PixelLabel]) {
        for label in labels {
            self.ensure_class(&label.class_name);
            let start = self.transform.to_display(Point::new(label.x, label.y));
            let end = self
                .transform
                .to_display(Point::new(label.x + label.width, label.y + label.height));
            let id = self.id_gen.next_id();
            self.store
                .add(AnnotationBox::new(id, start, end, &label.class_name));
        }
        log::debug!("loaded {} initial labels", labels.len());
    }

    /// Export every valid box (minimum size in both axes, non-empty label,
    /// not a preview) back into image-pixel space.
    pub fn export_valid(&mut self) -> Vec<PixelLabel> {
        let min_size = self.config.min_box_size;
        let transform = self.transform;
        let valid: Vec<AnnotationBox> = self
            .store
            .iter()
            .filter(|b| b.is_valid(min_size))
            .cloned()
            .collect();

        valid
            .into_iter()
            .map(|b| {
                let rect = b.rect();
                let top_left = transform.to_image_pixel(rect.top_left());
                let bottom_right = transform.to_image_pixel(rect.bottom_right());
                let class_id = self.ensure_class(&b.label);
                PixelLabel {
                    x: top_left.x,
                    y: top_left.y,
                    width: bottom_right.x - top_left.x,
                    height: bottom_right.y - top_left.y,
                    class_id,
                    class_name: b.label,
                }
            })
            .collect()
    }

    // ========================================================================
    // Box CRUD and history (toolbar wiring)
    // ========================================================================

    /// Add a box directly, in display-space coordinates. Undoable.
    pub fn add_box(&mut self, start: Point, end: Point, label: impl Into<String>) -> BoxId {
        let id = self.id_gen.next_id();
        let b = AnnotationBox::new(id, start, end, label);
        self.store.add(b.clone());
        self.history.record(HistoryEntry::Add(b));
        id
    }

    /// Remove a box. Undoable. No-op for unknown ids.
    pub fn remove_box(&mut self, id: BoxId) {
        if let Some(removed) = self.store.remove(id) {
            if !removed.is_preview {
                self.history.record(HistoryEntry::Remove(removed));
            }
        }
    }

    /// Patch a box (label change, programmatic reshape). Undoable, except
    /// for unconfirmed preview boxes whose final state is captured at
    /// confirm time instead.
    pub fn update_box(&mut self, id: BoxId, patch: BoxPatch) {
        let Some(before) = self.store.get(id).cloned() else {
            return;
        };
        self.store.update(id, patch);
        let Some(after) = self.store.get(id).cloned() else {
            return;
        };
        if after != before && !before.is_preview {
            self.history.record(HistoryEntry::Update { before, after });
        }
    }

    /// Remove every box. Each removal is recorded so undo restores them.
    pub fn clear_boxes(&mut self) {
        for b in self.store.clear() {
            if !b.is_preview {
                self.history.record(HistoryEntry::Remove(b));
            }
        }
    }

    pub fn set_active_box(&mut self, id: Option<BoxId>) {
        self.store.set_active(id);
    }

    pub fn undo(&mut self) -> Option<HistoryEntry> {
        self.history.undo(&mut self.store)
    }

    pub fn redo(&mut self) -> Option<HistoryEntry> {
        self.history.redo(&mut self.store)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ========================================================================
    // Pointer and keyboard events
    // ========================================================================

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.controller.pointer_down(
            Point::new(x, y),
            &mut self.store,
            &mut self.id_gen,
            &self.config,
        );
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.controller.pointer_move(Point::new(x, y), &mut self.store);
    }

    pub fn pointer_up(&mut self) {
        self.controller
            .pointer_up(&mut self.store, &mut self.history, &self.config);
    }

    pub fn key(&mut self, input: KeyInput) {
        self.controller
            .handle_key(input, &mut self.store, &mut self.history);
    }

    // ========================================================================
    // Review workflow
    // ========================================================================

    /// Stage detector output for stepwise review. Replaces (cancels) any
    /// session already open. Returns false for an empty candidate list.
    pub fn start_auto_label_review(&mut self, detections: Vec<PixelDetection>) -> bool {
        self.cancel_review();
        let candidates: Vec<Candidate> = detections
            .into_iter()
            .map(|d| {
                let start = self.transform.to_display(Point::new(d.x, d.y));
                let end = self
                    .transform
                    .to_display(Point::new(d.x + d.width, d.y + d.height));
                Candidate::new(d.class_name, start, end)
            })
            .collect();
        self.review = ReviewSession::start(
            candidates,
            ReviewSource::Detection,
            &mut self.store,
            &self.history,
            &mut self.id_gen,
        );
        self.review.is_some()
    }

    /// Step through the boxes already committed for this image. Cancel of
    /// such a session just closes it; nothing is rolled back.
    pub fn start_existing_review(&mut self) -> bool {
        self.cancel_review();
        let candidates: Vec<Candidate> = self
            .store
            .iter()
            .map(|b| Candidate::existing(b.id, b.label.clone(), b.start, b.end))
            .collect();
        self.review = ReviewSession::start(
            candidates,
            ReviewSource::Existing,
            &mut self.store,
            &self.history,
            &mut self.id_gen,
        );
        self.review.is_some()
    }

    pub fn review_active(&self) -> bool {
        self.review.is_some()
    }

    /// (current index, queue length) of the open session.
    pub fn review_progress(&self) -> Option<(usize, usize)> {
        self.review.as_ref().map(|s| (s.cursor(), s.queue_len()))
    }

    /// Accept the current candidate and move on.
    pub fn review_confirm(&mut self) {
        if let Some(session) = self.review.as_mut() {
            if !session.confirm(&mut self.store, &mut self.history, &mut self.id_gen) {
                self.review = None;
            }
        }
    }

    /// Discard the current candidate and move on.
    pub fn review_skip(&mut self) {
        if let Some(session) = self.review.as_mut() {
            if !session.skip(&mut self.store, &self.config, &mut self.id_gen) {
                self.review = None;
            }
        }
    }

    /// Step back to the previous candidate.
    pub fn review_previous(&mut self) {
        if let Some(session) = self.review.as_mut() {
            session.previous(&mut self.store, &self.config, &mut self.id_gen);
        }
    }

    /// Abort the open session, rolling back a fresh-detection review.
    pub fn cancel_review(&mut self) {
        if let Some(mut session) = self.review.take() {
            session.cancel(&mut self.store, &mut self.history, &self.config);
        }
    }

    // ========================================================================
    // Render reads
    // ========================================================================

    /// All committed and preview boxes in z-order.
    pub fn boxes(&self) -> impl Iterator<Item = &AnnotationBox> {
        self.store.iter()
    }

    pub fn active_box(&self) -> Option<&AnnotationBox> {
        self.store.active()
    }

    /// The box being dragged out right now, if any. Not in the store yet.
    pub fn draft_box(&self) -> Option<&AnnotationBox> {
        self.controller.draft()
    }

    pub fn store(&self) -> &BoxStore {
        &self.store
    }
}

impl Default for AnnotationEditor {
    fn default() -> Self {
        Self::new()
    }
}
