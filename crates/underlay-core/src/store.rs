//! The scene store: the single source of truth for what is drawn.
//!
//! Top-level nodes live in an explicit paint-order list (index 0 painted
//! first, i.e. visually at the bottom). Composite members — the images
//! inside an `ImageGroup` or `SubjectOverlay` — are graph children of
//! their container and never appear in the paint order themselves.
//!
//! The store also owns the group↔overlay pairing index. Pairings are not
//! back-pointers on the nodes: keeping the table here avoids cyclic
//! ownership and lets snapshots serialize it alongside the node list.
//!
//! ## Layering invariant
//!
//! For any composite present, paint order must satisfy
//! `image_group < every text < subject_overlay`. Every structural
//! mutation re-asserts this before returning; a detected violation is
//! self-healed by re-running the canonical ordering, never surfaced.

use crate::id::NodeId;
use crate::model::{Color, ImageSlot, NodeKind, Role, SceneNode};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use smallvec::SmallVec;
use std::collections::HashMap;

/// One group↔overlay association. Both halves share a joint lifecycle:
/// removing the group removes the overlay; removing the overlay unlinks
/// the pairing so no stale half survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    pub group: NodeId,
    pub overlay: NodeId,
}

/// Display-oriented projection of one top-level layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerInfo {
    pub id: NodeId,
    pub label: String,
    pub role: Role,
    pub locked: bool,
    pub interactive: bool,
}

/// The scene store. See the module docs for the ordering model.
#[derive(Debug, Clone)]
pub struct SceneStore {
    graph: StableDiGraph<SceneNode, ()>,
    id_index: HashMap<NodeId, NodeIndex>,
    /// Top-level paint order, bottom first.
    order: Vec<NodeIndex>,
    pairings: Vec<Pairing>,
    active: Option<NodeId>,
    pub background: Color,
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            id_index: HashMap::new(),
            order: Vec::new(),
            pairings: Vec::new(),
            active: None,
            background: Color::rgba(0.94, 0.94, 0.94, 1.0),
        }
    }

    // ─── Node access ─────────────────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.id_index
            .get(&id)
            .copied()
            .map(|idx| &mut self.graph[idx])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.id_index.contains_key(&id)
    }

    /// Number of top-level layers.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // ─── Structure ───────────────────────────────────────────────────────

    /// Add a top-level node at the top of the paint order.
    pub fn add(&mut self, node: SceneNode) -> NodeId {
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        self.order.push(idx);
        id
    }

    /// Add a member inside a container (group or overlay). Members do not
    /// participate in the top-level paint order.
    pub fn add_member(&mut self, container: NodeId, node: SceneNode) -> Option<NodeId> {
        let parent_idx = self.id_index.get(&container).copied()?;
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.graph.add_edge(parent_idx, idx, ());
        self.id_index.insert(id, idx);
        Some(id)
    }

    /// Members of a container, in insertion order.
    pub fn members(&self, container: NodeId) -> SmallVec<[NodeId; 2]> {
        let Some(idx) = self.id_index.get(&container).copied() else {
            return SmallVec::new();
        };
        let mut children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .collect();
        children.sort();
        children.iter().map(|c| self.graph[*c].id).collect()
    }

    /// The container a member belongs to, if any.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.id_index.get(&id).copied()?;
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
            .map(|p| self.graph[p].id)
    }

    /// Remove a node. Pairing lifecycle: removing a paired group removes
    /// its overlay too; removing a paired overlay unlinks the pairing so
    /// the group keeps working as a plain movable unit.
    pub fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        if !self.contains(id) {
            return None;
        }

        // Joint lifecycle before the node itself disappears.
        match self.node(id).map(SceneNode::role) {
            Some(Role::ImageGroup) => {
                if let Some(overlay) = self.unpair(id) {
                    let _ = self.remove_single(overlay);
                }
            }
            Some(Role::SubjectOverlay) => {
                let _ = self.unpair(id);
            }
            _ => {}
        }

        self.remove_single(id)
    }

    /// Remove one node and its members, keeping every index synchronized.
    fn remove_single(&mut self, id: NodeId) -> Option<SceneNode> {
        let members = self.members(id);
        let idx = self.id_index.remove(&id)?;

        for member in members {
            if let Some(midx) = self.id_index.remove(&member) {
                self.graph.remove_node(midx);
            }
        }

        self.order.retain(|&i| i != idx);
        if self.active == Some(id) {
            self.active = None;
        }
        self.graph.remove_node(idx)
    }

    /// Remove every top-level plain image (a composite replaces a bare
    /// upload, it does not stack on top of one). Text and composite nodes
    /// are left untouched.
    pub fn clear_plain_images(&mut self) -> usize {
        let plain: Vec<NodeId> = self
            .top_level()
            .filter(|n| matches!(n.kind, NodeKind::Image { slot: ImageSlot::Plain, .. }))
            .map(|n| n.id)
            .collect();
        let count = plain.len();
        for id in plain {
            let _ = self.remove_single(id);
        }
        count
    }

    /// Drop everything: nodes, pairings, selection.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.id_index.clear();
        self.order.clear();
        self.pairings.clear();
        self.active = None;
    }

    // ─── Paint order ─────────────────────────────────────────────────────

    /// Top-level ids, bottom first.
    pub fn paint_order(&self) -> Vec<NodeId> {
        self.order.iter().map(|idx| self.graph[*idx].id).collect()
    }

    /// Index of a top-level node in the paint order.
    pub fn position_of(&self, id: NodeId) -> Option<usize> {
        let idx = self.id_index.get(&id).copied()?;
        self.order.iter().position(|&i| i == idx)
    }

    /// Top-level nodes in paint order.
    pub fn top_level(&self) -> impl Iterator<Item = &SceneNode> {
        self.order.iter().map(|idx| &self.graph[*idx])
    }

    /// Move a layer one step backward (swap with previous). Returns true
    /// if the paint order changed.
    pub fn send_backward(&mut self, id: NodeId) -> bool {
        match self.position_of(id) {
            Some(pos) if pos > 0 => {
                self.order.swap(pos, pos - 1);
                true
            }
            _ => false,
        }
    }

    /// Move a layer one step forward (swap with next). Returns true if
    /// the paint order changed.
    pub fn bring_forward(&mut self, id: NodeId) -> bool {
        match self.position_of(id) {
            Some(pos) if pos + 1 < self.order.len() => {
                self.order.swap(pos, pos + 1);
                true
            }
            _ => false,
        }
    }

    /// Move a layer to the bottom of the paint order.
    pub fn send_to_back(&mut self, id: NodeId) -> bool {
        match self.position_of(id) {
            Some(0) | None => false,
            Some(pos) => {
                let idx = self.order.remove(pos);
                self.order.insert(0, idx);
                true
            }
        }
    }

    /// Move a layer to the top of the paint order.
    pub fn bring_to_front(&mut self, id: NodeId) -> bool {
        match self.position_of(id) {
            Some(pos) if pos + 1 < self.order.len() => {
                let idx = self.order.remove(pos);
                self.order.push(idx);
                true
            }
            _ => false,
        }
    }

    // ─── Role-aware layer ops ────────────────────────────────────────────

    /// Move a layer up one step, clamped by role: the overlay stays on
    /// top, the group stays at the bottom, text moves freely between.
    /// The layering invariant holds when this returns.
    pub fn move_up(&mut self, id: NodeId) -> bool {
        let Some(role) = self.node(id).map(SceneNode::role) else {
            return false;
        };
        let before = self.order.clone();

        match role {
            Role::SubjectOverlay => {
                self.bring_to_front(id);
            }
            Role::Text => {
                self.bring_forward(id);
                let overlays: Vec<NodeId> = self.pairings.iter().map(|p| p.overlay).collect();
                for overlay in overlays {
                    self.bring_to_front(overlay);
                }
            }
            Role::ImageGroup | Role::None => {
                self.bring_forward(id);
                self.restore_layer_order();
            }
        }

        self.enforce_layering();
        self.order != before
    }

    /// Move a layer down one step, with the same role clamping as
    /// [`move_up`](Self::move_up).
    pub fn move_down(&mut self, id: NodeId) -> bool {
        let Some(role) = self.node(id).map(SceneNode::role) else {
            return false;
        };
        let before = self.order.clone();

        match role {
            Role::ImageGroup => {
                self.send_to_back(id);
            }
            Role::Text => {
                self.send_backward(id);
                let groups: Vec<NodeId> = self.pairings.iter().map(|p| p.group).collect();
                for group in groups {
                    self.send_to_back(group);
                }
            }
            Role::SubjectOverlay | Role::None => {
                self.send_backward(id);
                self.restore_layer_order();
            }
        }

        self.enforce_layering();
        self.order != before
    }

    // ─── Layering invariant ──────────────────────────────────────────────

    /// Check the invariant: for every pairing, all text layers paint
    /// strictly between the group and its overlay.
    pub fn layering_ok(&self) -> bool {
        for pairing in &self.pairings {
            let (Some(g), Some(o)) = (self.position_of(pairing.group), self.position_of(pairing.overlay))
            else {
                // Half of a pairing is gone: that is a pairing bug, not a
                // layering one, but refuse to call the order consistent.
                return false;
            };
            if g >= o {
                return false;
            }
            for node in self.top_level() {
                if node.role() == Role::Text {
                    let Some(t) = self.position_of(node.id) else {
                        return false;
                    };
                    if t <= g || t >= o {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Re-apply the canonical order: groups to the back, each text raised
    /// one step, overlays fully to the front. This is the exact procedure
    /// the sync engine runs after every transform copy. Without a
    /// composite there is no canonical order to impose.
    pub fn restore_layer_order(&mut self) {
        if self.pairings.is_empty() {
            return;
        }
        let groups: Vec<NodeId> = self.pairings.iter().map(|p| p.group).collect();
        let overlays: Vec<NodeId> = self.pairings.iter().map(|p| p.overlay).collect();
        let texts: Vec<NodeId> = self
            .top_level()
            .filter(|n| n.role() == Role::Text)
            .map(|n| n.id)
            .collect();

        for group in groups {
            self.send_to_back(group);
        }
        for text in texts {
            self.bring_forward(text);
        }
        for overlay in overlays {
            self.bring_to_front(overlay);
        }
    }

    /// Self-heal: if the invariant is broken, restore canonical order.
    /// Returns true if a repair was needed.
    pub fn enforce_layering(&mut self) -> bool {
        if self.layering_ok() {
            return false;
        }
        log::warn!("layering invariant violated; restoring canonical order");
        self.restore_layer_order();
        debug_assert!(self.layering_ok());
        true
    }

    // ─── Pairing index ───────────────────────────────────────────────────

    /// Associate a group with its subject overlay. Any previous pairing
    /// involving either node is dropped first.
    pub fn pair(&mut self, group: NodeId, overlay: NodeId) {
        self.pairings
            .retain(|p| p.group != group && p.overlay != overlay);
        self.pairings.push(Pairing { group, overlay });
    }

    /// Drop the pairing involving `id` (either half). Returns the partner.
    pub fn unpair(&mut self, id: NodeId) -> Option<NodeId> {
        let pos = self
            .pairings
            .iter()
            .position(|p| p.group == id || p.overlay == id)?;
        let pairing = self.pairings.remove(pos);
        Some(if pairing.group == id {
            pairing.overlay
        } else {
            pairing.group
        })
    }

    /// The pairing partner of `id`, if it is half of a composite.
    pub fn pairing_of(&self, id: NodeId) -> Option<NodeId> {
        self.pairings.iter().find_map(|p| {
            if p.group == id {
                Some(p.overlay)
            } else if p.overlay == id {
                Some(p.group)
            } else {
                None
            }
        })
    }

    pub fn pairings(&self) -> &[Pairing] {
        &self.pairings
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Make a layer the active selection. Only groups and text are
    /// directly selectable; an overlay (or an image inside a composite)
    /// redirects to its group. Returns false, leaving the selection
    /// unchanged, when there is nothing sensible to select.
    pub fn select_node(&mut self, id: NodeId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        match node.role() {
            Role::ImageGroup | Role::Text => {
                self.active = Some(id);
                true
            }
            Role::SubjectOverlay => match self.pairing_of(id) {
                Some(partner) => {
                    self.active = Some(partner);
                    true
                }
                None => false,
            },
            Role::None => {
                // Legacy path: a member image redirects to its group.
                match self.parent_of(id) {
                    Some(parent)
                        if self.node(parent).map(SceneNode::role) == Some(Role::ImageGroup) =>
                    {
                        self.active = Some(parent);
                        true
                    }
                    _ => false,
                }
            }
        }
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.active
    }

    pub fn clear_selection(&mut self) {
        self.active = None;
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// First top-level node with the given role, in paint order.
    pub fn find_role(&self, role: Role) -> Option<NodeId> {
        self.top_level().find(|n| n.role() == role).map(|n| n.id)
    }

    /// All top-level text layers, in paint order.
    pub fn text_nodes(&self) -> Vec<NodeId> {
        self.top_level()
            .filter(|n| n.role() == Role::Text)
            .map(|n| n.id)
            .collect()
    }

    /// First image occupying `slot`, searching members as well as
    /// top-level nodes. Drives the auto-scale reference lookup.
    pub fn image_in_slot(&self, slot: ImageSlot) -> Option<NodeId> {
        self.graph
            .node_indices()
            .map(|idx| &self.graph[idx])
            .find(|n| matches!(&n.kind, NodeKind::Image { slot: s, .. } if *s == slot))
            .map(|n| n.id)
    }

    /// Any image anywhere in the scene (estimator fallback).
    pub fn any_image(&self) -> Option<NodeId> {
        self.graph
            .node_indices()
            .map(|idx| &self.graph[idx])
            .find(|n| matches!(n.kind, NodeKind::Image { .. }))
            .map(|n| n.id)
    }

    /// Display projection of the top-level layers, bottom first.
    pub fn layer_summary(&self) -> Vec<LayerInfo> {
        self.top_level()
            .map(|n| {
                let role = n.role();
                LayerInfo {
                    id: n.id,
                    label: n.label.clone(),
                    role,
                    locked: n.is_locked(),
                    interactive: matches!(role, Role::ImageGroup | Role::Text),
                }
            })
            .collect()
    }
}
