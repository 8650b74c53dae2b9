use crate::drawable::DrawableKind;
use crate::error::{EditorError, EditorResult};
use crate::snapshot::Snapshot;
use crate::util::time;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// The closed set of actions a history entry can record.
///
/// `Undo` and `Redo` are part of the set for labeling purposes; performing
/// them moves the pointer and never appends an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionKind {
    /// A tool committed a drawable (draw or select-move) on a layer
    ToolCommit { layer_id: Uuid, drawable_id: usize },
    /// The eraser tombstoned one drawable
    Erase { layer_id: Uuid, drawable_id: usize },
    /// The select tool repositioned a drawable; both geometries are kept
    /// so pointer moves across the entry flip it either way
    Move {
        layer_id: Uuid,
        drawable_id: usize,
        from: DrawableKind,
        to: DrawableKind,
    },
    LayerAdd { layer_id: Uuid },
    /// All visible drawables of a layer were tombstoned
    LayerClear { layer_id: Uuid, drawable_ids: Vec<usize> },
    LayerDelete { layer_id: Uuid },
    LayerRename { layer_id: Uuid },
    LayerOpacity { layer_id: Uuid },
    LayerHide { layer_id: Uuid },
    LayerReorder { layer_id: Uuid },
    ActiveChange { layer_id: Uuid },
    Undo,
    Redo,
}

/// One immutable point in a project's history: a sequential id (equal to
/// its stack index), a timestamp, the action that produced it and the
/// per-layer snapshot set captured at that point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: usize,
    pub timestamp: u64,
    pub action: ActionKind,
    /// Encoded raster per layer; a missing layer id means "cleared"
    pub snapshots: HashMap<Uuid, Snapshot>,
}

/// A project's append-only history log plus the pointer marking the
/// currently-displayed state.
///
/// Invariants: `entries[i].id == i`, and when the log is non-empty
/// `pointer < entries.len()`. Entries past the pointer are the redo-able
/// future and are truncated whenever a new entry is appended.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    entries: Vec<HistoryEntry>,
    pointer: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full ordered log, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry the pointer currently designates.
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.pointer)
    }

    /// The index the next appended entry will receive.
    pub fn next_index(&self) -> usize {
        if self.entries.is_empty() {
            0
        } else {
            self.pointer + 1
        }
    }

    /// Append a new entry after the pointer, discarding any redo tail
    /// first. A fresh action after undoing invalidates every
    /// previously-redoable state.
    pub fn append(
        &mut self,
        action: ActionKind,
        snapshots: HashMap<Uuid, Snapshot>,
    ) -> &HistoryEntry {
        let index = if self.entries.is_empty() {
            0
        } else {
            let next = self.pointer + 1;
            if self.entries.len() > next {
                self.entries.truncate(next);
            }
            next
        };
        self.entries.push(HistoryEntry {
            id: index,
            timestamp: time::timestamp_secs(),
            action,
            snapshots,
        });
        self.pointer = index;
        &self.entries[index]
    }

    /// Move the pointer one step back (clamped at 0) and return the entry
    /// to restore from. An explicitly negative hint is a caller bug and is
    /// rejected; a hint past the pointer clamps to the pointer itself, so
    /// undo never moves forward. Undo at pointer 0 is idempotent and
    /// re-returns entry 0.
    pub fn undo(&mut self, hint: Option<i64>) -> EditorResult<Option<&HistoryEntry>> {
        if let Some(h) = hint {
            if h < 0 {
                return Err(EditorError::PointerOutOfRange(h));
            }
        }
        if self.entries.is_empty() {
            return Ok(None);
        }
        let target = match hint {
            Some(h) => (h as usize).min(self.pointer),
            None => self.pointer.saturating_sub(1),
        };
        self.pointer = target;
        Ok(Some(&self.entries[target]))
    }

    /// Advance the pointer if an entry exists past it; otherwise a no-op.
    pub fn redo(&mut self, hint: Option<i64>) -> Option<&HistoryEntry> {
        let target = match hint {
            Some(h) if h >= 0 => h as usize,
            Some(_) => return None,
            None => self.pointer + 1,
        };
        if self.entries.is_empty() || target >= self.entries.len() || target <= self.pointer {
            return None;
        }
        self.pointer = target;
        Some(&self.entries[target])
    }

    pub fn is_undo_active(&self) -> bool {
        self.pointer > 0
    }

    pub fn is_redo_active(&self) -> bool {
        !self.entries.is_empty() && self.pointer < self.entries.len() - 1
    }
}
