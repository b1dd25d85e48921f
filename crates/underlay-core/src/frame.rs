//! Canvas viewport and the 16:9 export crop frame.
//!
//! The frame is derived, never stored: given the canvas dimensions it is
//! recomputed on demand, so resizing the canvas can never leave a stale
//! crop rectangle behind.

use serde::{Deserialize, Serialize};

/// Target aspect ratio of the export frame (16:9 thumbnail).
pub const FRAME_ASPECT: f32 = 16.0 / 9.0;

/// Fraction of the constraining canvas dimension the frame occupies.
const FRAME_FIT: f32 = 0.8;

/// Default pixel size of the exported thumbnail preset.
pub const THUMB_WIDTH: u32 = 1280;
pub const THUMB_HEIGHT: u32 = 720;

/// The canvas dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 540.0,
        }
    }
}

impl Viewport {
    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// A crop rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Compute the centered 16:9 export frame for a canvas.
///
/// The constraining dimension (whichever makes the canvas "too tall" or
/// "too wide" relative to 16:9) contributes 80% of its extent; the other
/// dimension follows from the aspect ratio.
pub fn frame_rect(viewport: Viewport) -> FrameRect {
    let canvas_aspect = viewport.width / viewport.height;

    let (width, height) = if canvas_aspect > FRAME_ASPECT {
        // Canvas is wider than 16:9 — height constrains the frame.
        let h = viewport.height * FRAME_FIT;
        (h * FRAME_ASPECT, h)
    } else {
        // Canvas is taller (or exactly 16:9) — width constrains.
        let w = viewport.width * FRAME_FIT;
        (w, w / FRAME_ASPECT)
    };

    FrameRect {
        left: (viewport.width - width) / 2.0,
        top: (viewport.height - height) / 2.0,
        width,
        height,
    }
}
