//! Snapshot history: a ring-buffered undo/redo log.
//!
//! Each entry is the full serialized scene plus the background color,
//! captured after a logical user action. The log keeps at most
//! [`HISTORY_CAP`] entries; recording past the cap drops the oldest entry
//! without moving the cursor, so it keeps addressing the newest state and
//! retained entries are never corrupted.
//!
//! `record`, `undo`, and `redo` are the only mutators. Undoing past the
//! start or redoing past the end is a no-op, not an error.

use underlay_core::doc::SceneDocument;
use underlay_core::error::SnapshotError;
use underlay_core::model::Color;
use underlay_core::store::SceneStore;

/// Maximum retained history depth.
pub const HISTORY_CAP: usize = 20;

#[derive(Debug, Clone)]
struct HistoryEntry {
    /// JSON-encoded `SceneDocument`.
    scene: String,
    background: Color,
}

/// The undo/redo log. Cursor always points at the entry matching the
/// store's current state; `None` means nothing recorded yet.
#[derive(Debug, Default)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
    cursor: Option<usize>,
}

impl HistoryLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.is_some_and(|c| c + 1 < self.entries.len())
    }

    /// Serialize the store and append at the cursor, discarding any stale
    /// redo tail first.
    ///
    /// # Errors
    /// `SnapshotError` if the scene cannot be serialized; the log is
    /// unchanged in that case.
    pub fn record(&mut self, store: &SceneStore) -> Result<(), SnapshotError> {
        let scene = SceneDocument::from_store(store).to_json()?;

        let keep = self.cursor.map_or(0, |c| c + 1);
        self.entries.truncate(keep);
        self.entries.push(HistoryEntry {
            scene,
            background: store.background,
        });

        if self.entries.len() > HISTORY_CAP {
            // Drop the oldest instead of advancing the cursor: it keeps
            // addressing the newest (just-recorded) state.
            self.entries.remove(0);
        } else {
            self.cursor = Some(keep);
        }
        Ok(())
    }

    /// Step back one entry and restore it into `store`. No-op (returns
    /// false) at the start of history.
    pub fn undo(&mut self, store: &mut SceneStore) -> bool {
        let Some(cursor) = self.cursor else {
            return false;
        };
        if cursor == 0 {
            return false;
        }
        if self.restore_at(cursor - 1, store) {
            self.cursor = Some(cursor - 1);
            true
        } else {
            false
        }
    }

    /// Step forward one entry and restore it. No-op at the end.
    pub fn redo(&mut self, store: &mut SceneStore) -> bool {
        let Some(cursor) = self.cursor else {
            return false;
        };
        if cursor + 1 >= self.entries.len() {
            return false;
        }
        if self.restore_at(cursor + 1, store) {
            self.cursor = Some(cursor + 1);
            true
        } else {
            false
        }
    }

    /// Restore an entry through the serialization bridge. The bridge
    /// re-establishes pairings and the layering invariant; a decode
    /// failure leaves the store untouched.
    fn restore_at(&self, index: usize, store: &mut SceneStore) -> bool {
        let entry = &self.entries[index];
        match SceneDocument::from_json(&entry.scene) {
            Ok(doc) => {
                *store = doc.restore();
                store.background = entry.background;
                true
            }
            Err(err) => {
                log::warn!("history entry {index} failed to decode: {err}");
                false
            }
        }
    }
}
