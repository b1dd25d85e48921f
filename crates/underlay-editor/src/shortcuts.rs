//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. Platform
//! aware: on macOS `meta` is ⌘, elsewhere `ctrl` serves the same role.

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Edit ──
    Undo,
    Redo,
    /// Remove the selected layer.
    Delete,
    /// Wipe the whole scene (⌘Delete).
    ClearAll,

    // ── Z-order ──
    LayerUp,
    LayerDown,

    // ── UI ──
    Deselect,
    /// Export the 16:9 thumbnail preset (host-owned).
    ExportThumbnail,
}

/// Resolves key events into shortcut actions.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(
        key: &str,
        ctrl: bool,
        shift: bool,
        _alt: bool,
        meta: bool,
    ) -> Option<ShortcutAction> {
        let cmd = ctrl || meta;

        match key {
            "z" | "Z" if cmd && shift => Some(ShortcutAction::Redo),
            "z" | "Z" if cmd => Some(ShortcutAction::Undo),
            "y" | "Y" if cmd => Some(ShortcutAction::Redo),

            "Delete" | "Backspace" if cmd => Some(ShortcutAction::ClearAll),
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),

            "]" if cmd => Some(ShortcutAction::LayerUp),
            "[" if cmd => Some(ShortcutAction::LayerDown),

            "e" | "E" if cmd && shift => Some(ShortcutAction::ExportThumbnail),

            "Escape" => Some(ShortcutAction::Deselect),

            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_redo_chords() {
        // Ctrl+Z / Cmd+Z
        assert_eq!(
            ShortcutMap::resolve("z", true, false, false, false),
            Some(ShortcutAction::Undo)
        );
        assert_eq!(
            ShortcutMap::resolve("z", false, false, false, true),
            Some(ShortcutAction::Undo)
        );
        // Ctrl+Shift+Z and Ctrl+Y both redo
        assert_eq!(
            ShortcutMap::resolve("z", true, true, false, false),
            Some(ShortcutAction::Redo)
        );
        assert_eq!(
            ShortcutMap::resolve("Z", true, true, false, false),
            Some(ShortcutAction::Redo)
        );
        assert_eq!(
            ShortcutMap::resolve("y", true, false, false, false),
            Some(ShortcutAction::Redo)
        );
    }

    #[test]
    fn bare_z_is_unbound() {
        assert_eq!(ShortcutMap::resolve("z", false, false, false, false), None);
    }

    #[test]
    fn delete_vs_clear_all() {
        assert_eq!(
            ShortcutMap::resolve("Delete", false, false, false, false),
            Some(ShortcutAction::Delete)
        );
        assert_eq!(
            ShortcutMap::resolve("Backspace", false, true, false, false),
            Some(ShortcutAction::Delete)
        );
        assert_eq!(
            ShortcutMap::resolve("Delete", false, false, false, true),
            Some(ShortcutAction::ClearAll)
        );
    }

    #[test]
    fn layer_order_chords() {
        assert_eq!(
            ShortcutMap::resolve("]", true, false, false, false),
            Some(ShortcutAction::LayerUp)
        );
        assert_eq!(
            ShortcutMap::resolve("[", false, false, false, true),
            Some(ShortcutAction::LayerDown)
        );
        assert_eq!(ShortcutMap::resolve("]", false, false, false, false), None);
    }
}
