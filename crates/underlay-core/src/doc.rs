//! Serialization bridge: `SceneStore` ⇄ portable document.
//!
//! The document is an ordered list of node records (paint order, members
//! nested) plus the pairing table and background color. History entries
//! and raster export both consume this representation; it must round-trip
//! without losing role tags or pairing links, and restoration re-asserts
//! the layering invariant so a tampered or stale document can never load
//! into an inconsistent store.

use crate::error::SnapshotError;
use crate::id::NodeId;
use crate::model::{Color, NodeKind, SceneNode, Transform};
use crate::store::SceneStore;
use serde::{Deserialize, Serialize};

/// One serialized renderable. The role tag travels inside `kind` — it is
/// the enum variant, so it cannot be dropped by a partial write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub kind: NodeKind,
    pub transform: Transform,
    pub selectable: bool,
    pub evented: bool,
    pub label: String,
    /// Composite members (images inside a group/overlay), in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<NodeRecord>,
}

/// Serialized half of the pairing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingRecord {
    pub group: NodeId,
    pub overlay: NodeId,
}

/// The complete portable scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub background: Color,
    /// Top-level nodes in paint order, bottom first.
    pub nodes: Vec<NodeRecord>,
    pub pairings: Vec<PairingRecord>,
}

impl SceneDocument {
    /// Snapshot a store. Pure read — the store is untouched.
    #[must_use]
    pub fn from_store(store: &SceneStore) -> Self {
        let nodes = store
            .paint_order()
            .into_iter()
            .filter_map(|id| record_of(store, id))
            .collect();

        let pairings = store
            .pairings()
            .iter()
            .map(|p| PairingRecord {
                group: p.group,
                overlay: p.overlay,
            })
            .collect();

        Self {
            background: store.background,
            nodes,
            pairings,
        }
    }

    /// Rebuild a store from this document.
    ///
    /// Pairings are re-established from the table (entries whose nodes did
    /// not survive are dropped) and the layering invariant is re-asserted,
    /// so the result is always consistent even for documents written by
    /// older or buggy producers.
    #[must_use]
    pub fn restore(&self) -> SceneStore {
        let mut store = SceneStore::new();
        store.background = self.background;

        for record in &self.nodes {
            let id = store.add(node_of(record));
            for member in &record.members {
                store.add_member(id, node_of(member));
            }
        }

        for pairing in &self.pairings {
            if store.contains(pairing.group) && store.contains(pairing.overlay) {
                store.pair(pairing.group, pairing.overlay);
            } else {
                log::warn!(
                    "dropping pairing {} ↔ {}: node missing from document",
                    pairing.group,
                    pairing.overlay
                );
            }
        }

        store.enforce_layering();
        store
    }

    /// Encode as JSON.
    ///
    /// # Errors
    /// `SnapshotError` if encoding fails.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON.
    ///
    /// # Errors
    /// `SnapshotError` if the input is not a valid scene document.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn record_of(store: &SceneStore, id: NodeId) -> Option<NodeRecord> {
    let node = store.node(id)?;
    let members = store
        .members(id)
        .into_iter()
        .filter_map(|m| record_of(store, m))
        .collect();
    Some(NodeRecord {
        id: node.id,
        kind: node.kind.clone(),
        transform: node.transform,
        selectable: node.selectable,
        evented: node.evented,
        label: node.label.clone(),
        members,
    })
}

fn node_of(record: &NodeRecord) -> SceneNode {
    SceneNode {
        id: record.id,
        kind: record.kind.clone(),
        transform: record.transform,
        selectable: record.selectable,
        evented: record.evented,
        label: record.label.clone(),
    }
}
