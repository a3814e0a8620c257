//! Stepwise review of candidate boxes.
//!
//! A review session stages a batch of candidates (auto-detected boxes, or the
//! image's existing labels) and surfaces them one at a time as the active,
//! editable box. A candidate lives in the store with `is_preview = true`
//! until it is confirmed; skip removes it without residue, and cancelling a
//! fresh-detection session rolls the store back to its pre-session snapshot.
//!
//! Navigation churn is never historized. Only a confirmed detection becomes
//! an undo-tracked entry, recorded at confirm time so undo after the session
//! behaves like any other add.

use crate::config::EditorConfig;
use crate::geometry::Point;
use crate::history::{HistoryEntry, HistoryManager};
use crate::store::{AnnotationBox, BoxId, BoxIdGen, BoxPatch, BoxStore};

/// Where a session's candidates came from. Only fresh detections support
/// full rollback on cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewSource {
    /// Candidates from the object-detection backend; not yet in the store.
    Detection,
    /// Re-review of boxes already committed to the store.
    Existing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandidateStatus {
    Pending,
    Confirmed,
    Skipped,
}

/// How to retire the current preview when leaving it unconfirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retire {
    /// Delete the box from the store.
    Remove,
    /// Keep the box, clearing its preview flag (existing labels only).
    Release,
}

/// One queued candidate box, in display-space coordinates.
#[derive(Debug, Clone)]
pub struct Candidate {
    label: String,
    start: Point,
    end: Point,
    /// Store id once injected (or the pre-existing id for `Existing`).
    box_id: Option<BoxId>,
    status: CandidateStatus,
}

impl Candidate {
    /// A fresh detection candidate, not yet in the store.
    pub fn new(label: impl Into<String>, start: Point, end: Point) -> Self {
        Self {
            label: label.into(),
            start,
            end,
            box_id: None,
            status: CandidateStatus::Pending,
        }
    }

    /// A candidate re-derived from a box already in the store.
    pub fn existing(id: BoxId, label: impl Into<String>, start: Point, end: Point) -> Self {
        Self {
            label: label.into(),
            start,
            end,
            box_id: Some(id),
            status: CandidateStatus::Pending,
        }
    }
}

/// A review session in progress.
///
/// Invariant: at most one preview box exists in the store at any time;
/// stepping retires the current preview before injecting the next.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    queue: Vec<Candidate>,
    cursor: usize,
    source: ReviewSource,
    /// Pre-session store contents, kept only for `Detection` sessions.
    snapshot: Option<Vec<AnnotationBox>>,
    /// Undo depth at session start; cancel truncates back to it.
    history_mark: usize,
}

impl ReviewSession {
    /// Begin a session. Returns `None` for an empty candidate list. The
    /// first candidate is injected as the preview/active box immediately.
    pub fn start(
        candidates: Vec<Candidate>,
        source: ReviewSource,
        store: &mut BoxStore,
        history: &HistoryManager,
        id_gen: &mut BoxIdGen,
    ) -> Option<Self> {
        if candidates.is_empty() {
            return None;
        }
        let snapshot = match source {
            ReviewSource::Detection => Some(store.snapshot()),
            ReviewSource::Existing => None,
        };
        let mut session = Self {
            queue: candidates,
            cursor: 0,
            source,
            snapshot,
            history_mark: history.depth(),
        };
        log::debug!(
            "review: started with {} candidates ({source:?})",
            session.queue.len()
        );
        session.inject_current(store, id_gen);
        Some(session)
    }

    pub fn source(&self) -> ReviewSource {
        self.source
    }

    /// Index of the candidate currently under review.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue still has a candidate under the cursor. All session
    /// methods are silent no-ops once it runs out.
    fn is_exhausted(&self) -> bool {
        self.cursor >= self.queue.len()
    }

    /// Accept the current candidate: its live (possibly user-edited) box
    /// loses the preview flag and, for fresh detections, becomes an
    /// undo-tracked add. Returns `false` once the queue is exhausted and the
    /// session is over.
    pub fn confirm(
        &mut self,
        store: &mut BoxStore,
        history: &mut HistoryManager,
        id_gen: &mut BoxIdGen,
    ) -> bool {
        if self.is_exhausted() {
            return false;
        }
        let candidate = &mut self.queue[self.cursor];
        if candidate.status == CandidateStatus::Pending {
            if let Some(id) = candidate.box_id {
                store.update(id, BoxPatch::preview(false));
                candidate.status = CandidateStatus::Confirmed;
                if self.source == ReviewSource::Detection {
                    if let Some(b) = store.get(id) {
                        history.record(HistoryEntry::Add(b.clone()));
                    }
                }
                log::debug!("review: confirmed candidate {} ({id})", self.cursor);
            }
        }
        self.advance(store, id_gen)
    }

    /// Reject the current candidate: its preview box is removed without a
    /// trace. Returns `false` once the session is over.
    pub fn skip(
        &mut self,
        store: &mut BoxStore,
        config: &EditorConfig,
        id_gen: &mut BoxIdGen,
    ) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.stash_current(store, config, CandidateStatus::Skipped, Retire::Remove);
        log::debug!("review: skipped candidate {}", self.cursor);
        self.advance(store, id_gen)
    }

    /// Step back to the previous queue index. A confirmed candidate re-opens
    /// as the active box without being re-added; a skipped or pending one is
    /// re-injected as a preview. No-op at the front of the queue.
    pub fn previous(
        &mut self,
        store: &mut BoxStore,
        config: &EditorConfig,
        id_gen: &mut BoxIdGen,
    ) -> bool {
        if self.cursor == 0 {
            return false;
        }
        if !self.is_exhausted() {
            self.stash_current(store, config, CandidateStatus::Pending, Retire::Release);
        }
        self.cursor -= 1;
        self.inject_current(store, id_gen);
        true
    }

    /// End the session. A `Detection` session restores the exact pre-session
    /// store snapshot (confirmed-so-far candidates are discarded along with
    /// their history entries); an `Existing` session just closes.
    pub fn cancel(
        &mut self,
        store: &mut BoxStore,
        history: &mut HistoryManager,
        config: &EditorConfig,
    ) {
        if self.cursor < self.queue.len() {
            self.stash_current(store, config, CandidateStatus::Pending, Retire::Release);
        }
        match self.source {
            ReviewSource::Detection => {
                if let Some(snapshot) = self.snapshot.take() {
                    store.restore_snapshot(snapshot);
                }
                history.truncate_to(self.history_mark);
                log::debug!("review: cancelled, store rolled back");
            }
            ReviewSource::Existing => {
                log::debug!("review: closed");
            }
        }
        store.set_active(None);
    }

    /// Put the current candidate's box into the store as the single preview
    /// (or just activate it, if already confirmed).
    fn inject_current(&mut self, store: &mut BoxStore, id_gen: &mut BoxIdGen) {
        let source = self.source;
        let candidate = &mut self.queue[self.cursor];
        match candidate.status {
            CandidateStatus::Confirmed => {
                // Re-opens as active without re-adding
                store.set_active(candidate.box_id);
            }
            CandidateStatus::Pending | CandidateStatus::Skipped => {
                let id = *candidate.box_id.get_or_insert_with(|| id_gen.next_id());
                if source == ReviewSource::Existing && store.get(id).is_some() {
                    store.update(id, BoxPatch::preview(true));
                } else {
                    store.add(
                        AnnotationBox::new(id, candidate.start, candidate.end, &candidate.label)
                            .preview(),
                    );
                }
                candidate.status = CandidateStatus::Pending;
                store.set_active(Some(id));
            }
        }
    }

    /// Remove or release the current preview box before moving on, leaving
    /// the candidate in the given status. Live edits survive into the queue
    /// entry unless the config says to discard them.
    ///
    /// A fresh-detection preview is never committed, so it is always removed.
    /// An existing-label preview belongs to the committed set: `Release`
    /// keeps the box and only clears its preview flag.
    fn stash_current(
        &mut self,
        store: &mut BoxStore,
        config: &EditorConfig,
        status: CandidateStatus,
        retire: Retire,
    ) {
        let candidate = &mut self.queue[self.cursor];
        if candidate.status != CandidateStatus::Pending {
            // Confirmed boxes stay committed; just drop focus
            store.set_active(None);
            return;
        }
        let Some(id) = candidate.box_id else { return };
        if let Some(live) = store.get(id) {
            if !config.discard_preview_edits_on_skip {
                candidate.start = live.start;
                candidate.end = live.end;
                candidate.label = live.label.clone();
            }
        }
        let retire = match self.source {
            ReviewSource::Detection => Retire::Remove,
            ReviewSource::Existing => retire,
        };
        match retire {
            Retire::Remove => {
                store.remove(id);
            }
            Retire::Release => {
                // Unconfirmed edits are reverted unless configured to stick
                if config.discard_preview_edits_on_skip {
                    store.update(
                        id,
                        BoxPatch {
                            start: Some(candidate.start),
                            end: Some(candidate.end),
                            label: Some(candidate.label.clone()),
                            is_preview: Some(false),
                        },
                    );
                } else {
                    store.update(id, BoxPatch::preview(false));
                }
                store.set_active(None);
            }
        }
        candidate.status = status;
    }

    /// Move to the next candidate; returns `false` when the queue is done.
    fn advance(&mut self, store: &mut BoxStore, id_gen: &mut BoxIdGen) -> bool {
        self.cursor += 1;
        if self.cursor < self.queue.len() {
            self.inject_current(store, id_gen);
            true
        } else {
            log::debug!("review: queue exhausted");
            store.set_active(None);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preview_count(store: &BoxStore) -> usize {
        store.iter().filter(|b| b.is_preview).count()
    }

    fn two_candidates() -> Vec<Candidate> {
        vec![
            Candidate::new("bolt", Point::new(10.0, 10.0), Point::new(60.0, 60.0)),
            Candidate::new("roll", Point::new(100.0, 100.0), Point::new(180.0, 160.0)),
        ]
    }

    struct Rig {
        store: BoxStore,
        history: HistoryManager,
        id_gen: BoxIdGen,
        config: EditorConfig,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                store: BoxStore::new(),
                history: HistoryManager::new(100),
                id_gen: BoxIdGen::starting_at(100),
                config: EditorConfig::default(),
            }
        }

        fn start(&mut self, candidates: Vec<Candidate>, source: ReviewSource) -> ReviewSession {
            ReviewSession::start(
                candidates,
                source,
                &mut self.store,
                &self.history,
                &mut self.id_gen,
            )
            .unwrap()
        }
    }

    #[test]
    fn test_empty_queue_no_session() {
        let mut rig = Rig::new();
        let session = ReviewSession::start(
            Vec::new(),
            ReviewSource::Detection,
            &mut rig.store,
            &rig.history,
            &mut rig.id_gen,
        );
        assert!(session.is_none());
        assert!(rig.store.is_empty());
    }

    #[test]
    fn test_start_injects_single_preview() {
        let mut rig = Rig::new();
        let session = rig.start(two_candidates(), ReviewSource::Detection);

        assert_eq!(rig.store.len(), 1);
        assert_eq!(preview_count(&rig.store), 1);
        let active = rig.store.active().unwrap();
        assert!(active.is_preview);
        assert_eq!(active.label, "bolt");
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn test_confirm_commits_and_advances() {
        let mut rig = Rig::new();
        let mut session = rig.start(two_candidates(), ReviewSource::Detection);

        let first_id = rig.store.active_id().unwrap();
        assert!(session.confirm(&mut rig.store, &mut rig.history, &mut rig.id_gen));

        // First candidate committed, second injected as the only preview
        let first = rig.store.get(first_id).unwrap();
        assert!(!first.is_preview);
        assert_eq!(preview_count(&rig.store), 1);
        assert_eq!(rig.store.len(), 2);
        assert!(rig.history.can_undo());

        // Confirming the last candidate ends the session
        assert!(!session.confirm(&mut rig.store, &mut rig.history, &mut rig.id_gen));
        assert_eq!(preview_count(&rig.store), 0);
        assert_eq!(rig.store.len(), 2);
    }

    #[test]
    fn test_skip_removes_without_residue() {
        let mut rig = Rig::new();
        let mut session = rig.start(two_candidates(), ReviewSource::Detection);

        let first_id = rig.store.active_id().unwrap();
        assert!(session.skip(&mut rig.store, &rig.config, &mut rig.id_gen));

        assert!(rig.store.get(first_id).is_none());
        assert_eq!(preview_count(&rig.store), 1);
        assert!(!rig.history.can_undo());

        assert!(!session.skip(&mut rig.store, &rig.config, &mut rig.id_gen));
        assert!(rig.store.is_empty());
    }

    #[test]
    fn test_single_preview_invariant_while_stepping() {
        let mut rig = Rig::new();
        let candidates = vec![
            Candidate::new("a", Point::new(0.0, 0.0), Point::new(20.0, 20.0)),
            Candidate::new("b", Point::new(30.0, 30.0), Point::new(60.0, 60.0)),
            Candidate::new("c", Point::new(70.0, 70.0), Point::new(99.0, 99.0)),
        ];
        let mut session = rig.start(candidates, ReviewSource::Detection);

        assert_eq!(preview_count(&rig.store), 1);
        session.confirm(&mut rig.store, &mut rig.history, &mut rig.id_gen);
        assert_eq!(preview_count(&rig.store), 1);
        session.skip(&mut rig.store, &rig.config, &mut rig.id_gen);
        assert_eq!(preview_count(&rig.store), 1);
        session.confirm(&mut rig.store, &mut rig.history, &mut rig.id_gen);
        assert_eq!(preview_count(&rig.store), 0);
    }

    #[test]
    fn test_cancel_restores_detection_snapshot() {
        let mut rig = Rig::new();
        // Pre-existing committed boxes A and B
        let a = AnnotationBox::new(BoxId(1), Point::new(0.0, 0.0), Point::new(50.0, 50.0), "a");
        let b = AnnotationBox::new(BoxId(2), Point::new(60.0, 0.0), Point::new(120.0, 50.0), "b");
        rig.store.add(a.clone());
        rig.store.add(b.clone());

        let mut session = rig.start(two_candidates(), ReviewSource::Detection);
        // Confirm one candidate, then cancel the whole session
        session.confirm(&mut rig.store, &mut rig.history, &mut rig.id_gen);
        assert_eq!(rig.store.len(), 4);
        assert!(rig.history.can_undo());

        session.cancel(&mut rig.store, &mut rig.history, &rig.config);
        assert_eq!(rig.store.len(), 2);
        assert_eq!(rig.store.get(BoxId(1)), Some(&a));
        assert_eq!(rig.store.get(BoxId(2)), Some(&b));
        // The confirmed candidate's history entry went with it
        assert!(!rig.history.can_undo());
    }

    #[test]
    fn test_cancel_existing_is_plain_close() {
        let mut rig = Rig::new();
        let a = AnnotationBox::new(BoxId(1), Point::new(0.0, 0.0), Point::new(50.0, 50.0), "a");
        rig.store.add(a.clone());

        let candidates = vec![Candidate::existing(
            BoxId(1),
            "a",
            Point::new(0.0, 0.0),
            Point::new(50.0, 50.0),
        )];
        let mut session = rig.start(candidates, ReviewSource::Existing);
        assert!(rig.store.get(BoxId(1)).unwrap().is_preview);

        session.cancel(&mut rig.store, &mut rig.history, &rig.config);
        // The committed box survives with its preview flag cleared
        assert_eq!(rig.store.len(), 1);
        assert_eq!(preview_count(&rig.store), 0);
        assert!(!rig.store.get(BoxId(1)).unwrap().is_preview);
    }

    #[test]
    fn test_existing_review_skip_deletes_box() {
        let mut rig = Rig::new();
        let a = AnnotationBox::new(BoxId(1), Point::new(0.0, 0.0), Point::new(50.0, 50.0), "a");
        rig.store.add(a);

        let candidates = vec![Candidate::existing(
            BoxId(1),
            "a",
            Point::new(0.0, 0.0),
            Point::new(50.0, 50.0),
        )];
        let mut session = rig.start(candidates, ReviewSource::Existing);
        assert!(!session.skip(&mut rig.store, &rig.config, &mut rig.id_gen));
        assert!(rig.store.is_empty());
    }

    #[test]
    fn test_previous_reopens_confirmed_without_readding() {
        let mut rig = Rig::new();
        let mut session = rig.start(two_candidates(), ReviewSource::Detection);

        let first_id = rig.store.active_id().unwrap();
        session.confirm(&mut rig.store, &mut rig.history, &mut rig.id_gen);
        assert_eq!(session.cursor(), 1);

        assert!(session.previous(&mut rig.store, &rig.config, &mut rig.id_gen));
        assert_eq!(session.cursor(), 0);
        assert_eq!(rig.store.active_id(), Some(first_id));
        // Confirmed box stays committed, second candidate's preview retired
        assert_eq!(rig.store.len(), 1);
        assert_eq!(preview_count(&rig.store), 0);
    }

    #[test]
    fn test_calls_after_queue_exhausted_are_noops() {
        let mut rig = Rig::new();
        let candidates = vec![Candidate::new(
            "bolt",
            Point::new(10.0, 10.0),
            Point::new(60.0, 60.0),
        )];
        let mut session = rig.start(candidates, ReviewSource::Detection);

        assert!(!session.confirm(&mut rig.store, &mut rig.history, &mut rig.id_gen));

        // Driving the ended session further must not disturb anything
        assert!(!session.confirm(&mut rig.store, &mut rig.history, &mut rig.id_gen));
        assert!(!session.skip(&mut rig.store, &rig.config, &mut rig.id_gen));
        assert_eq!(rig.store.len(), 1);
        assert_eq!(rig.history.depth(), 1);

        // Stepping back re-opens the last candidate as active
        assert!(session.previous(&mut rig.store, &rig.config, &mut rig.id_gen));
        assert!(rig.store.active().is_some());
    }

    #[test]
    fn test_previous_at_front_is_noop() {
        let mut rig = Rig::new();
        let mut session = rig.start(two_candidates(), ReviewSource::Detection);
        assert!(!session.previous(&mut rig.store, &rig.config, &mut rig.id_gen));
        assert_eq!(session.cursor(), 0);
        assert_eq!(preview_count(&rig.store), 1);
    }

    #[test]
    fn test_skip_discards_edits_by_default() {
        let mut rig = Rig::new();
        let mut session = rig.start(two_candidates(), ReviewSource::Detection);

        // Simulate a live edit of the preview box
        let id = rig.store.active_id().unwrap();
        rig.store.update(
            id,
            BoxPatch::corners(Point::new(0.0, 0.0), Point::new(300.0, 300.0)),
        );
        session.skip(&mut rig.store, &rig.config, &mut rig.id_gen);

        // Step back: the candidate reappears with its original geometry
        session.previous(&mut rig.store, &rig.config, &mut rig.id_gen);
        let reinjected = rig.store.active().unwrap();
        assert_eq!(reinjected.start, Point::new(10.0, 10.0));
        assert_eq!(reinjected.end, Point::new(60.0, 60.0));
    }

    #[test]
    fn test_skip_keeps_edits_when_configured() {
        let mut rig = Rig::new();
        rig.config.discard_preview_edits_on_skip = false;
        let mut session = rig.start(two_candidates(), ReviewSource::Detection);

        let id = rig.store.active_id().unwrap();
        rig.store.update(
            id,
            BoxPatch::corners(Point::new(0.0, 0.0), Point::new(300.0, 300.0)),
        );
        session.skip(&mut rig.store, &rig.config, &mut rig.id_gen);

        session.previous(&mut rig.store, &rig.config, &mut rig.id_gen);
        let reinjected = rig.store.active().unwrap();
        assert_eq!(reinjected.end, Point::new(300.0, 300.0));
    }

    #[test]
    fn test_confirm_captures_live_edits() {
        let mut rig = Rig::new();
        let mut session = rig.start(two_candidates(), ReviewSource::Detection);

        let id = rig.store.active_id().unwrap();
        rig.store.update(id, BoxPatch::label("velvet"));
        session.confirm(&mut rig.store, &mut rig.history, &mut rig.id_gen);

        assert_eq!(rig.store.get(id).unwrap().label, "velvet");
        // The history entry carries the edited state
        let entry = rig.history.undo(&mut rig.store).unwrap();
        assert!(matches!(entry, HistoryEntry::Add(b) if b.label == "velvet"));
    }
}
