//! Error taxonomy for the compositing engine.
//!
//! Asset and segmentation failures are caught at the operation boundary
//! and surfaced to the caller; the scene store is never left half-mutated
//! by a failed operation. Layering/pairing inconsistencies are not errors
//! at all — the store self-heals them (see `SceneStore::enforce_layering`).

use thiserror::Error;

/// An image resource could not be loaded or decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("image `{url}` not found")]
    Missing { url: String },

    #[error("failed to decode image `{url}`: {reason}")]
    Decode { url: String, reason: String },
}

/// The external background-segmentation call failed. The message is
/// user-visible; the prior composited state is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("background segmentation failed: {0}")]
pub struct SegmentationError(pub String);

/// A scene snapshot could not be serialized or restored.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot encode/decode failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Raster export failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("nothing to export: the scene is empty")]
    EmptyScene,

    #[error("raster backend failure: {0}")]
    Backend(String),
}
