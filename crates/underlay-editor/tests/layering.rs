//! Integration tests: the layering invariant (underlay-editor ↔ underlay-core).
//!
//! For any composite present, every text layer must paint strictly
//! between the image group and its subject overlay — after every add,
//! remove, move, undo, and redo.

use underlay_core::assets::ImageProvider;
use underlay_core::error::AssetError;
use underlay_core::frame::Viewport;
use underlay_core::model::{ImageRef, Role, TextSpec};
use underlay_editor::session::Session;

const VIEWPORT: Viewport = Viewport {
    width: 960.0,
    height: 540.0,
};

/// Every URL decodes as a canvas-sized image.
struct CanvasSizedProvider;

impl ImageProvider for CanvasSizedProvider {
    fn load(&self, url: &str) -> Result<ImageRef, AssetError> {
        Ok(ImageRef {
            source: url.into(),
            width: 960,
            height: 540,
        })
    }
}

/// Upload, segment, and build a composite with one text layer.
fn composite_session() -> Session {
    let provider = CanvasSizedProvider;
    let mut session = Session::new(VIEWPORT);
    session.upload_image(&provider, "photo.png").unwrap();
    let ticket = session.begin_segmentation().unwrap();
    session
        .apply_segmentation(ticket, Ok(provider.load("cutout.png").unwrap()))
        .unwrap();
    session.add_text(&provider, TextSpec::new("headline")).unwrap();
    session
}

// ─── Scenario: fresh composite ──────────────────────────────────────────

#[test]
fn fresh_composite_places_at_scale_one_and_holds_invariant() {
    let session = composite_session();
    let store = &session.store;

    let group = store.find_role(Role::ImageGroup).unwrap();
    let group_node = store.node(group).unwrap();
    assert_eq!(group_node.transform.left, 0.0);
    assert_eq!(group_node.transform.top, 0.0);
    for member in store.members(group) {
        assert_eq!(store.node(member).unwrap().transform.scale_x, 1.0);
    }

    assert!(store.layering_ok());
    // Bottom to top: group, text, overlay.
    let order = store.paint_order();
    assert_eq!(store.node(order[0]).unwrap().role(), Role::ImageGroup);
    assert_eq!(store.node(order[1]).unwrap().role(), Role::Text);
    assert_eq!(
        store.node(*order.last().unwrap()).unwrap().role(),
        Role::SubjectOverlay
    );
}

// ─── Scenario: group removal takes the overlay with it ──────────────────

#[test]
fn removing_group_also_removes_overlay() {
    let mut session = composite_session();
    let group = session.store.find_role(Role::ImageGroup).unwrap();
    let overlay = session.store.find_role(Role::SubjectOverlay).unwrap();

    assert!(session.remove_layer(group));
    assert!(!session.store.contains(group));
    assert!(!session.store.contains(overlay));
    assert!(session.store.pairings().is_empty());
}

// ─── Invariant across mutation sequences ────────────────────────────────

#[test]
fn invariant_holds_after_every_operation() {
    let provider = CanvasSizedProvider;
    let mut session = composite_session();
    let second_text = session
        .add_text(&provider, TextSpec::new("second line"))
        .unwrap();
    assert!(session.store.layering_ok());

    let group = session.store.find_role(Role::ImageGroup).unwrap();
    let overlay = session.store.find_role(Role::SubjectOverlay).unwrap();

    // A stubborn user mashes the layer buttons.
    for _ in 0..3 {
        session.move_layer_up(group);
        assert!(session.store.layering_ok(), "after group up");
        session.move_layer_up(second_text);
        assert!(session.store.layering_ok(), "after text up");
        session.move_layer_down(overlay);
        assert!(session.store.layering_ok(), "after overlay down");
        session.move_layer_down(second_text);
        assert!(session.store.layering_ok(), "after text down");
    }

    // Structural churn.
    session.remove_layer(second_text);
    assert!(session.store.layering_ok(), "after remove");
    session.undo();
    assert!(session.store.layering_ok(), "after undo");
    session.redo();
    assert!(session.store.layering_ok(), "after redo");
}

#[test]
fn overlay_stays_clamped_to_top() {
    let mut session = composite_session();
    let overlay = session.store.find_role(Role::SubjectOverlay).unwrap();
    let top = session.store.len() - 1;

    session.move_layer_down(overlay);
    assert_eq!(session.store.position_of(overlay), Some(top));
    session.move_layer_up(overlay);
    assert_eq!(session.store.position_of(overlay), Some(top));
}

#[test]
fn group_stays_clamped_to_bottom() {
    let mut session = composite_session();
    let group = session.store.find_role(Role::ImageGroup).unwrap();

    session.move_layer_up(group);
    assert_eq!(session.store.position_of(group), Some(0));
    session.move_layer_down(group);
    assert_eq!(session.store.position_of(group), Some(0));
}

#[test]
fn composite_build_keeps_pre_existing_text() {
    // Text added before segmentation is independent content; building the
    // composite replaces the bare image only.
    let provider = CanvasSizedProvider;
    let mut session = Session::new(VIEWPORT);
    session.upload_image(&provider, "photo.png").unwrap();
    let early_text = session
        .add_text(&provider, TextSpec::new("added early"))
        .unwrap();

    let ticket = session.begin_segmentation().unwrap();
    session
        .apply_segmentation(ticket, Ok(provider.load("cutout.png").unwrap()))
        .unwrap();
    session.add_text(&provider, TextSpec::new("behind")).unwrap();

    assert!(session.store.contains(early_text), "early text layer lost");
    // Both texts sit inside the sandwich now.
    assert!(session.store.layering_ok());
    assert_eq!(session.store.text_nodes().len(), 2);
}
