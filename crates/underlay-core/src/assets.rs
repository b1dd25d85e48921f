//! Capability interfaces for the engine's external collaborators.
//!
//! The engine never decodes pixels, runs segmentation models, or encodes
//! rasters itself — those live behind the traits here, so the compositing
//! logic stays deterministic and testable with in-memory fakes.

use crate::doc::SceneDocument;
use crate::error::{AssetError, ExportError, SegmentationError};
use crate::frame::FrameRect;
use crate::model::ImageRef;

/// Raster output encodings supported by export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
}

/// Decodes an image resource and reports its natural pixel size.
pub trait ImageProvider {
    /// # Errors
    /// `AssetError` if the resource is missing or cannot be decoded.
    fn load(&self, url: &str) -> Result<ImageRef, AssetError>;
}

/// The external background-segmentation algorithm: given an image, return
/// a new image with the background pixels made transparent.
///
/// The call is awaited asynchronously by the host; from the engine's point
/// of view only the eventual `Result` matters. Staleness of a late result
/// is the caller's concern — the `Session` tracks an image generation and
/// discards results for superseded images.
pub trait Segmenter {
    /// # Errors
    /// `SegmentationError` with a user-facing message. The scene is left
    /// unchanged on failure.
    fn remove_background(&self, image: &ImageRef) -> Result<ImageRef, SegmentationError>;
}

/// Renders a scene document to an encoded raster.
pub trait Rasterizer {
    /// `region` of `None` means the full canvas. The thumbnail preset
    /// passes the 16:9 frame rect and expects 1280×720 output.
    ///
    /// # Errors
    /// `ExportError` if the backend cannot produce the raster.
    fn render(
        &self,
        doc: &SceneDocument,
        region: Option<FrameRect>,
        format: ImageFormat,
        quality: f32,
    ) -> Result<Vec<u8>, ExportError>;
}
