pub mod assets;
pub mod doc;
pub mod error;
pub mod estimator;
pub mod frame;
pub mod id;
pub mod model;
pub mod store;

pub use doc::SceneDocument;
pub use error::{AssetError, ExportError, SegmentationError, SnapshotError};
pub use frame::{FrameRect, Viewport, frame_rect};
pub use id::NodeId;
pub use model::*;
pub use store::{LayerInfo, Pairing, SceneStore};
