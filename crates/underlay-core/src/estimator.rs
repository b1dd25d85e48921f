//! Auto-scale estimator for decorative text.
//!
//! Derives a font size from how much of the canvas the reference image
//! actually covers, so text reads well against both tiny and full-bleed
//! subjects. Pure functions of the current scene state — no side effects,
//! deterministic, safe to call per keystroke.

use crate::frame::Viewport;
use crate::model::{ImageSlot, NodeKind};
use crate::store::SceneStore;

/// Final size bounds in px: readable at the low end, sane at the high end.
pub const MIN_FONT_SIZE: u32 = 24;
pub const MAX_FONT_SIZE: u32 = 120;

/// Footprint ratio: sqrt(rendered image area / canvas area).
///
/// The square root keeps the ratio linear in the image's edge length
/// rather than its area, which tracks perceived size much better.
pub fn footprint_ratio(rendered_width: f32, rendered_height: f32, viewport: Viewport) -> f32 {
    ((rendered_width * rendered_height) / viewport.area()).sqrt()
}

/// Piecewise scale factor as a function of footprint ratio `r`:
///
/// - `r < 0.3` — small image, keep text proportionally small (0.6–0.8)
/// - `0.3 ≤ r < 0.7` — medium image, scale through normal (0.8–1.2)
/// - `r ≥ 0.7` — large image, bigger text but capped (1.2–1.8 pre-clamp)
///
/// When the leftover background space `1 − r` drops under 0.3 the factor
/// is reduced by 0.7×, then everything clamps to [0.4, 2.0].
pub fn scale_factor(ratio: f32) -> f32 {
    let mut factor = if ratio < 0.3 {
        0.6 + ratio * 0.7
    } else if ratio < 0.7 {
        0.8 + (ratio - 0.3) * 1.0
    } else {
        1.2 + (ratio - 0.7) * 2.0
    };

    if (1.0 - ratio) < 0.3 {
        factor *= 0.7;
    }

    factor.clamp(0.4, 2.0)
}

/// Scale `base_size` by the footprint factor, rounded and clamped to
/// [`MIN_FONT_SIZE`, `MAX_FONT_SIZE`].
pub fn estimate_font_size(base_size: f32, ratio: f32) -> u32 {
    let size = (base_size * scale_factor(ratio)).round() as i64;
    size.clamp(MIN_FONT_SIZE as i64, MAX_FONT_SIZE as i64) as u32
}

/// Footprint ratio of the scene's reference image: the subject cut-out if
/// present, else the background, else any placed image. `None` means the
/// scene has no image at all and the estimator should be a no-op.
pub fn reference_footprint_ratio(store: &SceneStore, viewport: Viewport) -> Option<f32> {
    let reference = store
        .image_in_slot(ImageSlot::Subject)
        .or_else(|| store.image_in_slot(ImageSlot::Background))
        .or_else(|| store.any_image())?;

    let node = store.node(reference)?;
    let NodeKind::Image { image, .. } = &node.kind else {
        return None;
    };
    let (w, h) = image.rendered_size(&node.transform);
    Some(footprint_ratio(w, h, viewport))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeId;
    use crate::model::{ImageRef, SceneNode, Transform};

    #[test]
    fn medium_image_keeps_base_size() {
        // r = 0.5 → factor = 0.8 + 1.0 × 0.2 = 1.0, background space 0.5
        // leaves the secondary reduction inactive.
        assert_eq!(estimate_font_size(40.0, 0.5), 40);
    }

    #[test]
    fn factor_is_monotone_within_each_region() {
        let regions: [(f32, f32); 3] = [(0.0, 0.29), (0.3, 0.69), (0.7, 1.0)];
        for (lo, hi) in regions {
            let mut prev = scale_factor(lo);
            let mut r = lo;
            while r < hi {
                r += 0.01;
                let f = scale_factor(r);
                assert!(
                    f >= prev - f32::EPSILON,
                    "factor decreased within a region at r={r}: {prev} -> {f}"
                );
                prev = f;
            }
        }
    }

    #[test]
    fn crowded_canvas_reduces_factor() {
        // r = 0.8: raw factor 1.4, background space 0.2 → × 0.7 = 0.98.
        assert!((scale_factor(0.8) - 0.98).abs() < 1e-6);
        // r = 0.7 exactly: background space is 0.3, no reduction.
        assert!((scale_factor(0.7) - 1.2).abs() < 1e-6);
    }

    #[test]
    fn factor_and_size_clamp() {
        assert!(scale_factor(0.0) >= 0.4);
        assert!(scale_factor(1.0) <= 2.0);
        assert_eq!(estimate_font_size(10.0, 0.0), MIN_FONT_SIZE);
        assert_eq!(estimate_font_size(500.0, 1.0), MAX_FONT_SIZE);
    }

    #[test]
    fn reference_prefers_subject_over_background() {
        let mut store = SceneStore::new();
        let viewport = Viewport::default();

        // Background covers the whole canvas; subject covers a quarter.
        let group = store.add(SceneNode::new(NodeId::with_prefix("group"), NodeKind::ImageGroup));
        store.add_member(
            group,
            SceneNode::new(
                NodeId::with_prefix("image"),
                NodeKind::Image {
                    image: ImageRef {
                        source: "bg.png".into(),
                        width: 960,
                        height: 540,
                    },
                    slot: ImageSlot::Background,
                },
            ),
        );
        store.add_member(
            group,
            SceneNode::new(
                NodeId::with_prefix("image"),
                NodeKind::Image {
                    image: ImageRef {
                        source: "subject.png".into(),
                        width: 480,
                        height: 270,
                    },
                    slot: ImageSlot::Subject,
                },
            ),
        );

        let r = reference_footprint_ratio(&store, viewport).unwrap();
        assert!((r - 0.5).abs() < 1e-6, "subject footprint expected, got {r}");
    }

    #[test]
    fn reference_falls_back_to_any_image() {
        let mut store = SceneStore::new();
        let viewport = Viewport::default();
        assert_eq!(reference_footprint_ratio(&store, viewport), None);

        store.add(
            SceneNode::new(
                NodeId::with_prefix("image"),
                NodeKind::Image {
                    image: ImageRef {
                        source: "plain.png".into(),
                        width: 960,
                        height: 540,
                    },
                    slot: ImageSlot::Plain,
                },
            )
            .with_transform(Transform::default().scaled(0.5)),
        );

        let r = reference_footprint_ratio(&store, viewport).unwrap();
        assert!((r - 0.5).abs() < 1e-6);
    }
}
