//! Composite builder: turns a background photo, a subject cut-out, and a
//! text spec into the three-layer structure that produces the
//! text-behind-subject illusion.
//!
//! The layers, bottom to top:
//!
//! 1. `ImageGroup` — background + subject as internal members; the group
//!    itself is the only selectable, movable unit.
//! 2. `Text` — fully independent and interactive.
//! 3. `SubjectOverlay` — a non-interactive duplicate of the subject whose
//!    transform mirrors the group's, so the subject repaints above the
//!    text wherever the group goes.
//!
//! Building a composite replaces a bare uploaded image; it never stacks
//! on top of one. Pre-existing text layers survive.

use underlay_core::assets::ImageProvider;
use underlay_core::error::AssetError;
use underlay_core::frame::Viewport;
use underlay_core::id::NodeId;
use underlay_core::model::{ImageRef, ImageSlot, NodeKind, SceneNode, TextSpec, Transform};
use underlay_core::store::SceneStore;

/// The three nodes a build produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeHandles {
    pub group: NodeId,
    pub text: NodeId,
    pub overlay: NodeId,
}

/// Scale that fits an image inside the canvas without upscaling.
pub fn fit_scale(image: &ImageRef, viewport: Viewport) -> f32 {
    let sx = viewport.width / image.width as f32;
    let sy = viewport.height / image.height as f32;
    sx.min(sy).min(1.0)
}

/// Centered placement for an image at `scale`.
pub fn fit_center(image: &ImageRef, viewport: Viewport) -> Transform {
    let scale = fit_scale(image, viewport);
    let t = Transform::default().scaled(scale);
    let (w, h) = image.rendered_size(&t);
    Transform {
        left: (viewport.width - w) / 2.0,
        top: (viewport.height - h) / 2.0,
        ..t
    }
}

/// Build the composite and wire the group↔overlay pairing.
///
/// With `prior` given, both images take the replaced single image's
/// scale/rotation at zeroed local offsets, and the group lands at the
/// prior position — the scene keeps its on-canvas placement across the
/// rebuild. Without it, both images are fit to the canvas and centered.
///
/// # Errors
/// `AssetError` if either image fails to load. The store is untouched on
/// failure — both loads happen before the first mutation.
pub fn build_text_behind_composite(
    store: &mut SceneStore,
    provider: &dyn ImageProvider,
    background_url: &str,
    subject_url: &str,
    spec: TextSpec,
    prior: Option<Transform>,
    viewport: Viewport,
) -> Result<CompositeHandles, AssetError> {
    let background = provider.load(background_url)?;
    let subject = provider.load(subject_url)?;

    // A composite replaces the bare upload it was built from.
    store.clear_plain_images();

    // Local member transforms (relative to the enclosing group) and the
    // group's canvas position.
    let (background_local, subject_local, group_origin) = match prior {
        Some(state) => {
            let local = Transform {
                left: 0.0,
                top: 0.0,
                scale_x: state.scale_x,
                scale_y: state.scale_y,
                angle: state.angle,
                ..Transform::default()
            };
            (local, local, (state.left, state.top))
        }
        None => {
            let bg_local = Transform::default().scaled(fit_scale(&background, viewport));
            let subject_local = Transform::default().scaled(fit_scale(&subject, viewport));
            let (w, h) = background.rendered_size(&bg_local);
            let origin = (
                (viewport.width - w) / 2.0,
                (viewport.height - h) / 2.0,
            );
            (bg_local, subject_local, origin)
        }
    };

    // 1. The rigid background + subject unit.
    let group = store.add(
        SceneNode::new(NodeId::with_prefix("group"), NodeKind::ImageGroup)
            .with_transform(Transform::at(group_origin.0, group_origin.1)),
    );
    store.add_member(
        group,
        SceneNode::new(
            NodeId::with_prefix("image"),
            NodeKind::Image {
                image: background,
                slot: ImageSlot::Background,
            },
        )
        .with_transform(background_local)
        .non_interactive(),
    );
    store.add_member(
        group,
        SceneNode::new(
            NodeId::with_prefix("image"),
            NodeKind::Image {
                image: subject.clone(),
                slot: ImageSlot::Subject,
            },
        )
        .with_transform(subject_local)
        .non_interactive(),
    );

    // 2. Independent text. Defaults to the lower third, where it is least
    // likely to sit on top of the subject.
    let text_position = Transform::at(
        spec.left.unwrap_or(viewport.width / 2.0),
        spec.top.unwrap_or(viewport.height * 0.75),
    );
    let text = store.add(
        SceneNode::new(NodeId::with_prefix("text"), NodeKind::Text { spec })
            .with_transform(text_position),
    );

    // 3. The overlay duplicate of the subject. Same member transform as
    // the subject inside the group; the overlay node itself starts exactly
    // at the group's transform and the sync engine keeps it there.
    let group_transform = store
        .node(group)
        .map(|n| n.transform)
        .unwrap_or_default();
    let overlay = store.add(
        SceneNode::new(NodeId::with_prefix("overlay"), NodeKind::SubjectOverlay)
            .with_transform(group_transform)
            .non_interactive(),
    );
    store.add_member(
        overlay,
        SceneNode::new(
            NodeId::with_prefix("image"),
            NodeKind::Image {
                image: subject,
                slot: ImageSlot::Subject,
            },
        )
        .with_transform(subject_local)
        .non_interactive(),
    );

    store.pair(group, overlay);
    store.restore_layer_order();
    debug_assert!(store.layering_ok());

    Ok(CompositeHandles {
        group,
        text,
        overlay,
    })
}
