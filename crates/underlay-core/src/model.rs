//! Core data model for the text-behind-subject composite.
//!
//! A scene is a flat, painter-ordered list of renderable nodes. Three of
//! the node kinds form the composite that produces the illusion: an
//! `ImageGroup` (background photo + cut-out subject moving as one rigid
//! unit), any number of independent `Text` nodes, and a `SubjectOverlay`
//! (a non-interactive duplicate of the subject painted above the text).
//! Roles are encoded in the variant itself — there is no stringly-typed
//! role field to forget to check.

use crate::id::NodeId;
use serde::{Deserialize, Serialize};

// ─── Color ───────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Helper to parse a single hex digit.
fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);

    /// Parse a hex color string: `#RGB`, `#RRGGBB`, `#RRGGBBAA`.
    /// The string may optionally start with `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();

        match bytes.len() {
            3 => {
                let r = hex_val(bytes[0])?;
                let g = hex_val(bytes[1])?;
                let b = hex_val(bytes[2])?;
                Some(Self::rgba(
                    (r * 17) as f32 / 255.0,
                    (g * 17) as f32 / 255.0,
                    (b * 17) as f32 / 255.0,
                    1.0,
                ))
            }
            6 => {
                let r = hex_val(bytes[0])? << 4 | hex_val(bytes[1])?;
                let g = hex_val(bytes[2])? << 4 | hex_val(bytes[3])?;
                let b = hex_val(bytes[4])? << 4 | hex_val(bytes[5])?;
                Some(Self::rgba(
                    r as f32 / 255.0,
                    g as f32 / 255.0,
                    b as f32 / 255.0,
                    1.0,
                ))
            }
            8 => {
                let r = hex_val(bytes[0])? << 4 | hex_val(bytes[1])?;
                let g = hex_val(bytes[2])? << 4 | hex_val(bytes[3])?;
                let b = hex_val(bytes[4])? << 4 | hex_val(bytes[5])?;
                let a = hex_val(bytes[6])? << 4 | hex_val(bytes[7])?;
                Some(Self::rgba(
                    r as f32 / 255.0,
                    g as f32 / 255.0,
                    b as f32 / 255.0,
                    a as f32 / 255.0,
                ))
            }
            _ => None,
        }
    }

    /// Emit as a hex string, shortest valid form.
    pub fn to_hex(&self) -> String {
        let r = (self.r * 255.0).round() as u8;
        let g = (self.g * 255.0).round() as u8;
        let b = (self.b * 255.0).round() as u8;
        let a = (self.a * 255.0).round() as u8;
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

// ─── Transform snapshot ──────────────────────────────────────────────────

/// Plain value capturing the full placement of a renderable.
///
/// This is the unit the sync engine copies field-for-field from a paired
/// group to its overlay, and what history snapshots persist. `left`/`top`
/// are canvas coordinates of the node origin; `angle` is degrees clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub left: f32,
    pub top: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub angle: f32,
    pub skew_x: f32,
    pub skew_y: f32,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            skew_x: 0.0,
            skew_y: 0.0,
            flip_x: false,
            flip_y: false,
        }
    }
}

impl Transform {
    /// Identity transform at a given position.
    pub fn at(left: f32, top: f32) -> Self {
        Self {
            left,
            top,
            ..Self::default()
        }
    }

    /// Uniform scale, keeping everything else.
    #[must_use]
    pub fn scaled(mut self, scale: f32) -> Self {
        self.scale_x = scale;
        self.scale_y = scale;
        self
    }

    /// Translate in place by a canvas-space delta.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.left += dx;
        self.top += dy;
    }
}

// ─── Shadow / text styling ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    pub offset_x: f32,
    pub offset_y: f32,
    pub blur: f32,
    pub color: Color,
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// How a node's pixels combine with what is already painted below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Difference,
}

/// Everything needed to render one decorative text layer.
///
/// `left`/`top`, when set, override the builder's default lower-third
/// placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpec {
    pub content: String,
    pub font_family: String,
    /// CSS-style weight, 100..900.
    pub font_weight: u16,
    /// Font size in px. Subject to the auto-scale estimator when enabled.
    pub size: f32,
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: f32,
    pub shadow: Option<Shadow>,
    pub opacity: f32,
    pub blend: BlendMode,
    pub align: TextAlign,
    /// Optional blur radius applied to the rendered glyphs.
    pub blur: f32,
    pub left: Option<f32>,
    pub top: Option<f32>,
}

impl Default for TextSpec {
    fn default() -> Self {
        Self {
            content: String::new(),
            font_family: "Arial".into(),
            font_weight: 700,
            size: 60.0,
            fill: Color::rgba(1.0, 0.0, 0.0, 1.0),
            stroke: Color::WHITE,
            stroke_width: 3.0,
            shadow: None,
            opacity: 1.0,
            blend: BlendMode::Normal,
            align: TextAlign::Center,
            blur: 0.0,
            left: None,
            top: None,
        }
    }
}

impl TextSpec {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

// ─── Images ──────────────────────────────────────────────────────────────

/// A decoded raster image: its source locator plus natural pixel size.
/// Decoding itself lives behind the `ImageProvider` capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub source: String,
    pub width: u32,
    pub height: u32,
}

impl ImageRef {
    /// Rendered footprint under a transform (ignores rotation).
    pub fn rendered_size(&self, t: &Transform) -> (f32, f32) {
        (self.width as f32 * t.scale_x, self.height as f32 * t.scale_y)
    }
}

/// Which slot a placed image fills.
///
/// `Background` and `Subject` only occur on members inside an `ImageGroup`
/// or `SubjectOverlay`; a `Plain` image is a bare upload that has not been
/// composited yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSlot {
    Plain,
    Background,
    Subject,
}

// ─── Scene nodes ─────────────────────────────────────────────────────────

/// Display role of a node, derived from its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    ImageGroup,
    Text,
    SubjectOverlay,
    None,
}

/// The closed set of node kinds. Composite members (the images inside a
/// group or overlay) are stored as graph children of their container, so
/// the variants themselves stay small.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// A placed raster image.
    Image { image: ImageRef, slot: ImageSlot },

    /// Background + subject moving as one rigid, selectable unit.
    ImageGroup,

    /// Independent decorative text.
    Text { spec: TextSpec },

    /// Non-interactive duplicate of the subject, painted above all text.
    SubjectOverlay,
}

/// A single renderable in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub transform: Transform,
    /// Whether the node can become the active selection.
    pub selectable: bool,
    /// Whether the node receives pointer events.
    pub evented: bool,
    /// Human-readable layer-panel label.
    pub label: String,
}

impl SceneNode {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        let label = match &kind {
            NodeKind::Image { slot, .. } => match slot {
                ImageSlot::Plain => "Image".to_string(),
                ImageSlot::Background => "Background Image".to_string(),
                ImageSlot::Subject => "Subject (Foreground)".to_string(),
            },
            NodeKind::ImageGroup => "Background + Subject".to_string(),
            NodeKind::Text { spec } => text_label(&spec.content),
            NodeKind::SubjectOverlay => "Subject Overlay".to_string(),
        };
        Self {
            id,
            kind,
            transform: Transform::default(),
            selectable: true,
            evented: true,
            label,
        }
    }

    /// Mark the node as a pure visual effect: not selectable, no events.
    #[must_use]
    pub fn non_interactive(mut self) -> Self {
        self.selectable = false;
        self.evented = false;
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn role(&self) -> Role {
        match self.kind {
            NodeKind::ImageGroup => Role::ImageGroup,
            NodeKind::Text { .. } => Role::Text,
            NodeKind::SubjectOverlay => Role::SubjectOverlay,
            NodeKind::Image { .. } => Role::None,
        }
    }

    /// Locked = cannot be manipulated from the layer panel.
    pub fn is_locked(&self) -> bool {
        !self.selectable || !self.evented
    }
}

/// Layer-panel label for a text node: content truncated to 15 chars.
pub fn text_label(content: &str) -> String {
    let prefix: String = content.chars().take(15).collect();
    if content.chars().count() > 15 {
        format!("Text: {prefix}…")
    } else {
        format!("Text: {prefix}")
    }
}
