//! Overlay sync engine.
//!
//! Keeps a subject overlay's transform identical to its paired group,
//! field for field, whenever the group is manipulated:
//!
//! - **Discrete events** (move, scale, rotate, commit) trigger a
//!   synchronous sync pass.
//! - **During a drag**, an explicit gesture state machine
//!   (`Idle → Dragging(node) → Idle`) scopes a per-frame re-sync loop to
//!   the pointer-down…pointer-up window. The host calls `frame_tick` at
//!   display cadence; once the gesture leaves `Dragging` — pointer-up, the
//!   group losing active status, or the group being disposed — ticks are
//!   no-ops and the loop can never fire against a stale node.
//!
//! Every sync pass ends by restoring canonical z-order, so the layering
//! invariant is never observably broken between frames. A re-entrancy
//! guard collapses overlapping passes: restoring z-order can make the
//! host emit further transform-changed notifications for the same group,
//! and those must not start a second pass mid-copy.

use std::collections::HashSet;
use underlay_core::id::NodeId;
use underlay_core::model::{Role, SceneNode};
use underlay_core::store::SceneStore;

/// Discrete transform-changing notifications from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformEvent {
    Moving,
    Scaling,
    Rotating,
    /// Gesture committed (pointer released after a manipulation).
    Modified,
}

/// Gesture lifecycle for the continuous sync loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Dragging { node: NodeId },
}

/// The sync engine. One per editing session.
#[derive(Debug, Default)]
pub struct SyncEngine {
    /// Groups with a sync pass currently in flight.
    syncing: HashSet<NodeId>,
    gesture: Gesture,
}

impl SyncEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Dragging { .. })
    }

    /// One sync pass: copy the group's transform onto its overlay, then
    /// restore canonical z-order. Idempotent; returns true if a pass ran.
    pub fn sync_pair(&mut self, store: &mut SceneStore, group: NodeId) -> bool {
        if store.node(group).map(SceneNode::role) != Some(Role::ImageGroup) {
            return false;
        }
        let Some(overlay) = store.pairing_of(group) else {
            return false;
        };
        if !self.syncing.insert(group) {
            // A pass for this group is already running further up the
            // stack; let it finish rather than interleaving.
            return false;
        }

        if let Some(transform) = store.node(group).map(|n| n.transform)
            && let Some(overlay_node) = store.node_mut(overlay)
        {
            overlay_node.transform = transform;
        }
        store.restore_layer_order();

        self.syncing.remove(&group);
        true
    }

    /// Store-wide reconciliation: force a sync pass for every pairing.
    /// Used after structural operations (undo/redo restore, text add)
    /// that bypass the gesture-triggered path.
    pub fn sync_all(&mut self, store: &mut SceneStore) {
        let groups: Vec<NodeId> = store.pairings().iter().map(|p| p.group).collect();
        for group in groups {
            self.sync_pair(store, group);
        }
    }

    /// A discrete transform-changing event on `node`. Paired groups sync
    /// synchronously; everything else is ignored.
    pub fn on_transform(&mut self, store: &mut SceneStore, node: NodeId, _event: TransformEvent) {
        if store.node(node).map(SceneNode::role) == Some(Role::ImageGroup)
            && store.pairing_of(node).is_some()
        {
            self.sync_pair(store, node);
        }
    }

    /// Pointer pressed. Enters `Dragging` — starting the per-frame loop —
    /// only when the hit is a paired group that is the active object.
    pub fn pointer_down(&mut self, store: &SceneStore, hit: Option<NodeId>) {
        self.gesture = match hit {
            Some(node)
                if store.node(node).map(SceneNode::role) == Some(Role::ImageGroup)
                    && store.pairing_of(node).is_some()
                    && store.selected() == Some(node) =>
            {
                Gesture::Dragging { node }
            }
            _ => Gesture::Idle,
        };
    }

    /// One animation-frame tick of the continuous loop. No-op unless a
    /// drag is in progress; cancels itself if the group stopped being the
    /// active object or was disposed. Returns true if a sync pass ran.
    pub fn frame_tick(&mut self, store: &mut SceneStore) -> bool {
        let Gesture::Dragging { node } = self.gesture else {
            return false;
        };
        if !store.contains(node) || store.selected() != Some(node) {
            self.gesture = Gesture::Idle;
            return false;
        }
        self.sync_pair(store, node)
    }

    /// Pointer released: one final sync, then the loop stops.
    pub fn pointer_up(&mut self, store: &mut SceneStore) {
        if let Gesture::Dragging { node } = self.gesture
            && store.contains(node)
        {
            self.sync_pair(store, node);
        }
        self.gesture = Gesture::Idle;
    }

    /// Disposal hook: a node is about to be removed. Cancels the loop if
    /// it was the drag target, so no pending tick fires against it.
    pub fn cancel_for(&mut self, node: NodeId) {
        if self.gesture == (Gesture::Dragging { node }) {
            log::debug!("canceling drag loop for disposed node {node}");
            self.gesture = Gesture::Idle;
        }
    }
}
