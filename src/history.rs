//! Linear undo/redo history for box mutations.
//!
//! Each undoable action is recorded as a [`HistoryEntry`] that carries enough
//! state to reverse itself. Undo pops an entry, applies its inverse to the
//! store, and moves it to the redo stack; redo re-applies it and moves it
//! back. Recording a new entry clears the redo stack (branching histories are
//! not supported).

use crate::store::{AnnotationBox, BoxStore};

/// One reversible mutation of the box store.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEntry {
    /// A box was added; undo removes it.
    Add(AnnotationBox),
    /// A box was removed; undo puts it back.
    Remove(AnnotationBox),
    /// A box changed; both states are kept so the edit replays either way.
    Update {
        before: AnnotationBox,
        after: AnnotationBox,
    },
}

impl HistoryEntry {
    /// Human-readable description, for logs and host-side menu labels.
    pub fn description(&self) -> &'static str {
        match self {
            HistoryEntry::Add(_) => "Add box",
            HistoryEntry::Remove(_) => "Delete box",
            HistoryEntry::Update { .. } => "Move/resize box",
        }
    }
}

/// The undo/redo stacks.
///
/// The undo stack is bounded by `max_history` for memory; once the bound is
/// hit the oldest entry is dropped, so the furthest reachable past moves
/// forward. Correctness never depends on the bound.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_history: usize,
}

impl HistoryManager {
    pub fn new(max_history: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_history,
        }
    }

    /// Record a committed mutation. Clears the redo stack.
    pub fn record(&mut self, entry: HistoryEntry) {
        log::debug!("history: recorded '{}'", entry.description());
        self.undo_stack.push(entry);
        self.redo_stack.clear();
        while self.undo_stack.len() > self.max_history {
            self.undo_stack.remove(0);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Undo the most recent entry against the store. Returns the entry, or
    /// `None` if there is nothing to undo.
    pub fn undo(&mut self, store: &mut BoxStore) -> Option<HistoryEntry> {
        let entry = self.undo_stack.pop()?;
        log::debug!("history: undo '{}'", entry.description());
        match &entry {
            HistoryEntry::Add(b) => {
                store.remove(b.id);
            }
            HistoryEntry::Remove(b) => {
                store.restore(b.clone());
            }
            HistoryEntry::Update { before, .. } => {
                store.restore(before.clone());
            }
        }
        self.redo_stack.push(entry.clone());
        Some(entry)
    }

    /// Re-apply the most recently undone entry. Returns the entry, or `None`
    /// if there is nothing to redo.
    pub fn redo(&mut self, store: &mut BoxStore) -> Option<HistoryEntry> {
        let entry = self.redo_stack.pop()?;
        log::debug!("history: redo '{}'", entry.description());
        match &entry {
            HistoryEntry::Add(b) => {
                store.restore(b.clone());
            }
            HistoryEntry::Remove(b) => {
                store.remove(b.id);
            }
            HistoryEntry::Update { after, .. } => {
                store.restore(after.clone());
            }
        }
        self.undo_stack.push(entry.clone());
        Some(entry)
    }

    /// Current undo depth. Review sessions mark this at start so a cancelled
    /// session can drop entries recorded while it ran.
    pub fn depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Drop every entry recorded after the given depth, plus the redo stack.
    pub fn truncate_to(&mut self, depth: usize) {
        if self.undo_stack.len() > depth {
            self.undo_stack.truncate(depth);
        }
        self.redo_stack.clear();
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(crate::config::EditorConfig::default().max_history)
    }
}
