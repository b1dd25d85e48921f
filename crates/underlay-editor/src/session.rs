//! The editing session: the imperative API a host UI drives.
//!
//! Wires the store, composite builder, sync engine, and history together
//! so every user-level operation leaves the scene consistent: mutations
//! go through here, overlay sync runs before anything observes the
//! result, and a history entry is captured after each logical action.
//!
//! Single-threaded by design. The only long-running external work is
//! background segmentation; the session hands out a generation-stamped
//! ticket when it starts and discards results whose generation was
//! superseded by later edits, so a slow segmentation can never clobber a
//! newer image.

use crate::composite::{CompositeHandles, build_text_behind_composite, fit_center};
use crate::history::HistoryLog;
use crate::shortcuts::ShortcutAction;
use crate::sync::{SyncEngine, TransformEvent};
use underlay_core::assets::{ImageFormat, ImageProvider, Rasterizer, Segmenter};
use underlay_core::doc::SceneDocument;
use underlay_core::error::{AssetError, ExportError, SegmentationError};
use underlay_core::estimator::{estimate_font_size, reference_footprint_ratio};
use underlay_core::frame::{Viewport, frame_rect};
use underlay_core::id::NodeId;
use underlay_core::model::{ImageRef, ImageSlot, NodeKind, SceneNode, TextSpec, Transform};
use underlay_core::store::{LayerInfo, SceneStore};

/// Proof that a segmentation request was issued for the current image.
/// Results presented with an outdated ticket are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentationTicket {
    generation: u64,
}

/// An interactive editing session over one scene.
#[derive(Debug, Default)]
pub struct Session {
    pub store: SceneStore,
    history: HistoryLog,
    sync: SyncEngine,
    viewport: Viewport,
    /// The uploaded source image (composite background).
    original: Option<ImageRef>,
    /// The segmented cut-out, once background removal succeeded.
    segmented: Option<ImageRef>,
    /// Bumped whenever the source image changes; stamps tickets.
    generation: u64,
    /// Scale new text by the subject's rendered footprint.
    pub auto_scale: bool,
}

impl Session {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            auto_scale: true,
            ..Self::default()
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    // ─── Images & segmentation ───────────────────────────────────────────

    /// Place an uploaded image, fit to the canvas and centered. Replaces
    /// any previous bare upload and invalidates pending segmentations.
    ///
    /// # Errors
    /// `AssetError` if the image cannot be decoded; the scene is unchanged.
    pub fn upload_image(
        &mut self,
        provider: &dyn ImageProvider,
        url: &str,
    ) -> Result<NodeId, AssetError> {
        let image = provider.load(url)?;

        self.store.clear_plain_images();
        let transform = fit_center(&image, self.viewport);
        let id = self.store.add(
            SceneNode::new(
                NodeId::with_prefix("image"),
                NodeKind::Image {
                    image: image.clone(),
                    slot: ImageSlot::Plain,
                },
            )
            .with_transform(transform),
        );

        self.original = Some(image);
        self.segmented = None;
        self.generation += 1;
        self.record();
        Ok(id)
    }

    /// Start a background-removal request for the current image. The host
    /// awaits the external call and reports back via
    /// [`apply_segmentation`](Self::apply_segmentation). `None` if no
    /// image has been uploaded.
    pub fn begin_segmentation(&self) -> Option<SegmentationTicket> {
        self.original.as_ref()?;
        Some(SegmentationTicket {
            generation: self.generation,
        })
    }

    /// Apply a finished segmentation. Returns `Ok(false)` when the result
    /// is stale (the image changed while the call was in flight) — the
    /// scene is untouched. A failed segmentation propagates its error and
    /// also leaves the scene untouched.
    ///
    /// # Errors
    /// The `SegmentationError` carried by `result`, surfaced to the user.
    pub fn apply_segmentation(
        &mut self,
        ticket: SegmentationTicket,
        result: Result<ImageRef, SegmentationError>,
    ) -> Result<bool, SegmentationError> {
        if ticket.generation != self.generation {
            log::debug!("discarding stale segmentation result");
            return Ok(false);
        }
        let segmented = result?;

        // Swap the cut-out in for the bare upload, keeping its placement.
        let transform = self
            .current_image_transform()
            .unwrap_or_else(|| fit_center(&segmented, self.viewport));
        self.store.clear_plain_images();
        self.store.add(
            SceneNode::new(
                NodeId::with_prefix("image"),
                NodeKind::Image {
                    image: segmented.clone(),
                    slot: ImageSlot::Plain,
                },
            )
            .with_transform(transform),
        );

        self.segmented = Some(segmented);
        self.record();
        Ok(true)
    }

    /// Convenience for hosts that run segmentation synchronously: issue a
    /// ticket, call the segmenter, and apply the result in one step.
    /// Asynchronous hosts drive [`begin_segmentation`](Self::begin_segmentation)
    /// and [`apply_segmentation`](Self::apply_segmentation) themselves.
    ///
    /// # Errors
    /// The segmenter's `SegmentationError`; the scene stays unchanged.
    pub fn remove_background(
        &mut self,
        segmenter: &dyn Segmenter,
    ) -> Result<bool, SegmentationError> {
        let (Some(ticket), Some(image)) = (self.begin_segmentation(), self.original.clone())
        else {
            return Ok(false);
        };
        let result = segmenter.remove_background(&image);
        self.apply_segmentation(ticket, result)
    }

    /// Transform of the single on-canvas image, if one is placed.
    fn current_image_transform(&self) -> Option<Transform> {
        self.store
            .top_level()
            .find(|n| matches!(n.kind, NodeKind::Image { slot: ImageSlot::Plain, .. }))
            .map(|n| n.transform)
    }

    // ─── Text ────────────────────────────────────────────────────────────

    /// Add a text layer. The first text after segmentation builds the
    /// full text-behind composite; before segmentation — and once a
    /// composite already exists — it places an independent text node,
    /// which the layering pass tucks between group and overlay.
    ///
    /// With `auto_scale` on, the requested size is adjusted by the
    /// footprint estimator before the composite is built.
    ///
    /// # Errors
    /// `AssetError` if the composite images fail to reload; the scene is
    /// unchanged in that case.
    pub fn add_text(
        &mut self,
        provider: &dyn ImageProvider,
        mut spec: TextSpec,
    ) -> Result<NodeId, AssetError> {
        let sources = match (&self.original, &self.segmented) {
            (Some(original), Some(segmented)) if self.store.pairings().is_empty() => {
                Some((original.source.clone(), segmented.source.clone()))
            }
            _ => None,
        };

        let id = if let Some((background_url, subject_url)) = sources {
            if self.auto_scale
                && let Some(ratio) = reference_footprint_ratio(&self.store, self.viewport)
            {
                spec.size = estimate_font_size(spec.size, ratio) as f32;
            }

            let prior = self.current_image_transform();
            let CompositeHandles { text, .. } = build_text_behind_composite(
                &mut self.store,
                provider,
                &background_url,
                &subject_url,
                spec,
                prior,
                self.viewport,
            )?;
            self.sync.sync_all(&mut self.store);
            text
        } else {
            let position = Transform::at(spec.left.unwrap_or(100.0), spec.top.unwrap_or(100.0));
            let id = self.store.add(
                SceneNode::new(NodeId::with_prefix("text"), NodeKind::Text { spec })
                    .with_transform(position),
            );
            // The new layer lands on top of everything; with a composite
            // present it belongs under the overlay.
            self.sync.sync_all(&mut self.store);
            id
        };

        self.record();
        Ok(id)
    }

    // ─── Layers ──────────────────────────────────────────────────────────

    pub fn layer_summary(&self) -> Vec<LayerInfo> {
        self.store.layer_summary()
    }

    pub fn move_layer_up(&mut self, id: NodeId) -> bool {
        self.store.move_up(id)
    }

    pub fn move_layer_down(&mut self, id: NodeId) -> bool {
        self.store.move_down(id)
    }

    /// Remove a layer (and, for a paired group, its overlay). Any drag
    /// loop targeting the removed nodes is canceled first so no pending
    /// tick fires against a disposed node.
    pub fn remove_layer(&mut self, id: NodeId) -> bool {
        self.sync.cancel_for(id);
        if let Some(partner) = self.store.pairing_of(id) {
            self.sync.cancel_for(partner);
        }
        let removed = self.store.remove(id).is_some();
        if removed {
            self.record();
        }
        removed
    }

    pub fn select_layer(&mut self, id: NodeId) -> bool {
        self.store.select_node(id)
    }

    pub fn clear_selection(&mut self) {
        self.store.clear_selection();
    }

    // ─── Interaction ─────────────────────────────────────────────────────

    /// Pointer pressed over `hit` (None = empty canvas). Updates the
    /// selection and, for a paired group, starts the per-frame sync loop.
    pub fn pointer_down(&mut self, hit: Option<NodeId>) {
        match hit {
            Some(id) => {
                self.store.select_node(id);
            }
            None => self.store.clear_selection(),
        }
        self.sync.pointer_down(&self.store, hit);
    }

    /// Drag the active layer by a canvas-space delta.
    pub fn drag_by(&mut self, dx: f32, dy: f32) {
        let Some(active) = self.store.selected() else {
            return;
        };
        if let Some(node) = self.store.node_mut(active) {
            node.transform.translate(dx, dy);
        }
        self.sync
            .on_transform(&mut self.store, active, TransformEvent::Moving);
    }

    /// Replace a node's transform wholesale (scale/rotate handles).
    pub fn apply_transform(&mut self, id: NodeId, transform: Transform, event: TransformEvent) {
        if let Some(node) = self.store.node_mut(id) {
            node.transform = transform;
            self.sync.on_transform(&mut self.store, id, event);
        }
    }

    /// One animation-frame tick of the drag sync loop.
    pub fn frame_tick(&mut self) -> bool {
        self.sync.frame_tick(&mut self.store)
    }

    /// Pointer released: final sync, loop stops.
    pub fn pointer_up(&mut self) {
        self.sync.pointer_up(&mut self.store);
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Capture the current scene. Called automatically after logical
    /// actions; failures are logged, never fatal to the edit itself.
    fn record(&mut self) {
        if let Err(err) = self.history.record(&self.store) {
            log::warn!("failed to record history entry: {err}");
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Undo one step. Restoration re-establishes pairings and layering
    /// through the bridge; a full overlay sync runs afterwards because
    /// the restore bypassed the gesture-triggered path.
    pub fn undo(&mut self) -> bool {
        if self.history.undo(&mut self.store) {
            self.sync.sync_all(&mut self.store);
            true
        } else {
            false
        }
    }

    /// Redo one step.
    pub fn redo(&mut self) -> bool {
        if self.history.redo(&mut self.store) {
            self.sync.sync_all(&mut self.store);
            true
        } else {
            false
        }
    }

    // ─── Export ──────────────────────────────────────────────────────────

    /// Render the full canvas.
    ///
    /// # Errors
    /// `ExportError::EmptyScene` with nothing placed, or the backend's
    /// failure.
    pub fn export_full(
        &self,
        rasterizer: &dyn Rasterizer,
        format: ImageFormat,
        quality: f32,
    ) -> Result<Vec<u8>, ExportError> {
        if self.store.is_empty() {
            return Err(ExportError::EmptyScene);
        }
        rasterizer.render(&SceneDocument::from_store(&self.store), None, format, quality)
    }

    /// Render the 16:9 thumbnail preset: the centered frame crop, scaled
    /// to 1280×720 by the backend.
    ///
    /// # Errors
    /// As [`export_full`](Self::export_full).
    pub fn export_thumbnail(
        &self,
        rasterizer: &dyn Rasterizer,
        format: ImageFormat,
        quality: f32,
    ) -> Result<Vec<u8>, ExportError> {
        if self.store.is_empty() {
            return Err(ExportError::EmptyScene);
        }
        rasterizer.render(
            &SceneDocument::from_store(&self.store),
            Some(frame_rect(self.viewport)),
            format,
            quality,
        )
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Wipe the scene. Pending segmentations are invalidated and any drag
    /// loop dies with its target.
    pub fn clear(&mut self) {
        self.sync = SyncEngine::new();
        self.store.clear();
        self.original = None;
        self.segmented = None;
        self.generation += 1;
    }

    /// Apply a resolved keyboard shortcut. Returns true when the action
    /// changed anything. Export is host-owned (it needs a rasterizer) and
    /// reports false here.
    pub fn apply_shortcut(&mut self, action: ShortcutAction) -> bool {
        match action {
            ShortcutAction::Undo => self.undo(),
            ShortcutAction::Redo => self.redo(),
            ShortcutAction::Delete => match self.store.selected() {
                Some(id) => self.remove_layer(id),
                None => false,
            },
            ShortcutAction::ClearAll => {
                let had_content = !self.store.is_empty();
                self.clear();
                had_content
            }
            ShortcutAction::LayerUp => match self.store.selected() {
                Some(id) => self.move_layer_up(id),
                None => false,
            },
            ShortcutAction::LayerDown => match self.store.selected() {
                Some(id) => self.move_layer_down(id),
                None => false,
            },
            ShortcutAction::Deselect => {
                let had_selection = self.store.selected().is_some();
                self.clear_selection();
                had_selection
            }
            ShortcutAction::ExportThumbnail => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory provider with per-url dimensions.
    struct MapProvider(HashMap<String, (u32, u32)>);

    impl MapProvider {
        fn with(entries: &[(&str, u32, u32)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(url, w, h)| ((*url).to_string(), (*w, *h)))
                    .collect(),
            )
        }
    }

    impl ImageProvider for MapProvider {
        fn load(&self, url: &str) -> Result<ImageRef, AssetError> {
            match self.0.get(url) {
                Some(&(width, height)) => Ok(ImageRef {
                    source: url.into(),
                    width,
                    height,
                }),
                None => Err(AssetError::Missing { url: url.into() }),
            }
        }
    }

    fn provider() -> MapProvider {
        MapProvider::with(&[
            ("photo.png", 960, 540),
            ("cutout.png", 960, 540),
            ("small.png", 480, 270),
        ])
    }

    #[test]
    fn upload_fits_and_centers() {
        let mut session = Session::new(Viewport::default());
        let id = session.upload_image(&provider(), "small.png").unwrap();
        let t = session.store.node(id).unwrap().transform;
        assert_eq!(t.scale_x, 1.0); // no upscaling
        assert_eq!(t.left, 240.0);
        assert_eq!(t.top, 135.0);
        assert_eq!(session.history_len(), 1);
    }

    #[test]
    fn oversized_upload_scales_down() {
        let mut session = Session::new(Viewport::default());
        let provider = MapProvider::with(&[("big.png", 1920, 1080)]);
        let id = session.upload_image(&provider, "big.png").unwrap();
        let t = session.store.node(id).unwrap().transform;
        assert_eq!(t.scale_x, 0.5);
        assert_eq!(t.left, 0.0);
    }

    #[test]
    fn segmentation_preserves_placement() {
        let mut session = Session::new(Viewport::default());
        let provider = provider();
        let id = session.upload_image(&provider, "small.png").unwrap();
        session.store.node_mut(id).unwrap().transform.translate(60.0, -20.0);

        let ticket = session.begin_segmentation().unwrap();
        let cutout = ImageRef {
            source: "cutout.png".into(),
            width: 480,
            height: 270,
        };
        assert_eq!(session.apply_segmentation(ticket, Ok(cutout)), Ok(true));

        let t = session.current_image_transform().unwrap();
        assert_eq!(t.left, 300.0);
        assert_eq!(t.top, 115.0);
    }

    #[test]
    fn stale_segmentation_is_discarded() {
        let mut session = Session::new(Viewport::default());
        let provider = provider();
        session.upload_image(&provider, "small.png").unwrap();
        let ticket = session.begin_segmentation().unwrap();

        // A second upload supersedes the first before the result lands.
        session.upload_image(&provider, "photo.png").unwrap();

        let cutout = ImageRef {
            source: "cutout.png".into(),
            width: 480,
            height: 270,
        };
        assert_eq!(session.apply_segmentation(ticket, Ok(cutout)), Ok(false));
        // The newer upload is untouched.
        assert_eq!(
            session.current_image_transform(),
            Some(Transform::default())
        );
    }

    #[test]
    fn failed_segmentation_leaves_scene_unchanged() {
        let mut session = Session::new(Viewport::default());
        let provider = provider();
        session.upload_image(&provider, "photo.png").unwrap();
        let before = session.store.paint_order();

        let ticket = session.begin_segmentation().unwrap();
        let err = session
            .apply_segmentation(ticket, Err(SegmentationError("model crashed".into())));
        assert!(err.is_err());
        assert_eq!(session.store.paint_order(), before);
    }

    #[test]
    fn add_text_before_segmentation_is_plain() {
        let mut session = Session::new(Viewport::default());
        let provider = provider();
        session.upload_image(&provider, "photo.png").unwrap();
        let id = session.add_text(&provider, TextSpec::new("hello")).unwrap();

        assert!(session.store.pairings().is_empty());
        assert_eq!(
            session.store.node(id).unwrap().transform,
            Transform::at(100.0, 100.0)
        );
    }

    #[test]
    fn add_text_after_segmentation_builds_composite() {
        let mut session = Session::new(Viewport::default());
        let provider = provider();
        session.upload_image(&provider, "photo.png").unwrap();
        let ticket = session.begin_segmentation().unwrap();
        session
            .apply_segmentation(ticket, Ok(provider.load("cutout.png").unwrap()))
            .unwrap();

        session.add_text(&provider, TextSpec::new("hello")).unwrap();
        assert_eq!(session.store.pairings().len(), 1);
        assert!(session.store.layering_ok());
    }

    #[test]
    fn auto_scale_adjusts_font_size() {
        let mut session = Session::new(Viewport::default());
        let provider = provider();
        session.upload_image(&provider, "photo.png").unwrap();
        let ticket = session.begin_segmentation().unwrap();
        // The cut-out covers the whole canvas: ratio 1.0 → factor
        // (1.2 + 0.6) × 0.7 = 1.26 → 40 × 1.26 ≈ 50.
        session
            .apply_segmentation(ticket, Ok(provider.load("cutout.png").unwrap()))
            .unwrap();

        let id = session
            .add_text(
                &provider,
                TextSpec {
                    size: 40.0,
                    ..TextSpec::new("hello")
                },
            )
            .unwrap();
        let NodeKind::Text { spec } = &session.store.node(id).unwrap().kind else {
            panic!("expected text node");
        };
        assert_eq!(spec.size, 50.0);
    }

    #[test]
    fn auto_scale_off_keeps_requested_size() {
        let mut session = Session::new(Viewport::default());
        session.auto_scale = false;
        let provider = provider();
        session.upload_image(&provider, "photo.png").unwrap();
        let ticket = session.begin_segmentation().unwrap();
        session
            .apply_segmentation(ticket, Ok(provider.load("cutout.png").unwrap()))
            .unwrap();

        let id = session
            .add_text(
                &provider,
                TextSpec {
                    size: 40.0,
                    ..TextSpec::new("hello")
                },
            )
            .unwrap();
        let NodeKind::Text { spec } = &session.store.node(id).unwrap().kind else {
            panic!("expected text node");
        };
        assert_eq!(spec.size, 40.0);
    }

    /// Strips nothing, just re-labels the source with a `_cutout` suffix.
    struct SuffixSegmenter;

    impl Segmenter for SuffixSegmenter {
        fn remove_background(&self, image: &ImageRef) -> Result<ImageRef, SegmentationError> {
            Ok(ImageRef {
                source: format!("{}_cutout", image.source),
                ..image.clone()
            })
        }
    }

    /// Records the requested region and returns a marker payload.
    struct ProbeRasterizer;

    impl Rasterizer for ProbeRasterizer {
        fn render(
            &self,
            doc: &underlay_core::doc::SceneDocument,
            region: Option<underlay_core::frame::FrameRect>,
            _format: ImageFormat,
            _quality: f32,
        ) -> Result<Vec<u8>, underlay_core::error::ExportError> {
            assert!(!doc.nodes.is_empty());
            Ok(match region {
                Some(_) => b"cropped".to_vec(),
                None => b"full".to_vec(),
            })
        }
    }

    #[test]
    fn synchronous_segmentation_helper() {
        let mut session = Session::new(Viewport::default());
        let provider = provider();

        // Nothing uploaded yet: nothing to segment.
        assert_eq!(session.remove_background(&SuffixSegmenter), Ok(false));

        session.upload_image(&provider, "photo.png").unwrap();
        assert_eq!(session.remove_background(&SuffixSegmenter), Ok(true));
        assert_eq!(
            session.current_image_transform(),
            Some(Transform::default())
        );
        // The next text add now builds the composite.
        let extended = MapProvider::with(&[
            ("photo.png", 960, 540),
            ("photo.png_cutout", 960, 540),
        ]);
        session.add_text(&extended, TextSpec::new("behind")).unwrap();
        assert_eq!(session.store.pairings().len(), 1);
    }

    #[test]
    fn export_uses_the_frame_preset() {
        let mut session = Session::new(Viewport::default());
        assert_eq!(
            session.export_full(&ProbeRasterizer, ImageFormat::Png, 1.0),
            Err(underlay_core::error::ExportError::EmptyScene)
        );

        session.upload_image(&provider(), "photo.png").unwrap();
        assert_eq!(
            session
                .export_full(&ProbeRasterizer, ImageFormat::Png, 1.0)
                .unwrap(),
            b"full".to_vec()
        );
        assert_eq!(
            session
                .export_thumbnail(&ProbeRasterizer, ImageFormat::Jpeg, 0.9)
                .unwrap(),
            b"cropped".to_vec()
        );
    }

    #[test]
    fn shortcut_dispatch() {
        let mut session = Session::new(Viewport::default());
        let provider = provider();
        session.upload_image(&provider, "photo.png").unwrap();
        let text = session.add_text(&provider, TextSpec::new("bye")).unwrap();

        session.select_layer(text);
        assert!(session.apply_shortcut(ShortcutAction::Delete));
        assert!(!session.store.contains(text));

        assert!(session.apply_shortcut(ShortcutAction::Undo));
        assert!(session.store.contains(text));

        assert!(session.apply_shortcut(ShortcutAction::ClearAll));
        assert!(session.store.is_empty());
    }
}
