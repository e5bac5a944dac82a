//! Sticker transform model.
//!
//! A sticker's placement lives in stage-relative units: position in percent of the stage,
//! a uniform scale factor and an unbounded rotation in degrees. Everything that draws or
//! hit-tests a sticker goes through [`placement`], so the live preview, hit testing and
//! the captured photo can never disagree about where a sticker is.

use crate::types::{Point, StageSize};

/// Positions stay inside this percentage band so a sticker can never leave the stage.
pub const POSITION_MIN: f32 = 2.0;
pub const POSITION_MAX: f32 = 98.0;

pub const SCALE_MIN: f32 = 0.4;
pub const SCALE_MAX: f32 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Horizontal position, percent of stage width.
    pub x: f32,
    /// Vertical position, percent of stage height.
    pub y: f32,
    pub scale: f32,
    /// Degrees, clockwise on screen. Accumulates without wraparound.
    pub rotation: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 50.0,
            y: 50.0,
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

impl Transform {
    /// Same transform with position and scale pulled back into their valid ranges.
    pub fn clamped(self) -> Self {
        let (x, y) = clamp_position(self.x, self.y);
        Self {
            x,
            y,
            scale: clamp_scale(self.scale),
            rotation: self.rotation,
        }
    }

    /// Stage pixel position of the sticker anchor.
    pub fn anchor(&self, stage: StageSize) -> Point {
        let (px, py) = project(self, stage.width, stage.height);
        Point::new(px, py)
    }

    /// Move the anchor to a stage pixel position (clamped).
    pub fn with_anchor(self, anchor: Point, stage: StageSize) -> Self {
        let (x, y) = unproject(anchor.x, anchor.y, stage.width, stage.height);
        let (x, y) = clamp_position(x, y);
        Self { x, y, ..self }
    }
}

pub fn clamp_position(x: f32, y: f32) -> (f32, f32) {
    (
        x.clamp(POSITION_MIN, POSITION_MAX),
        y.clamp(POSITION_MIN, POSITION_MAX),
    )
}

pub fn clamp_scale(scale: f32) -> f32 {
    scale.clamp(SCALE_MIN, SCALE_MAX)
}

/// Normalized position → stage pixels.
pub fn project(model: &Transform, stage_width: f32, stage_height: f32) -> (f32, f32) {
    (
        model.x / 100.0 * stage_width,
        model.y / 100.0 * stage_height,
    )
}

/// Stage pixels → normalized position (not clamped).
pub fn unproject(px: f32, py: f32, stage_width: f32, stage_height: f32) -> (f32, f32) {
    if stage_width <= 0.0 || stage_height <= 0.0 {
        return (50.0, 50.0);
    }
    (px / stage_width * 100.0, py / stage_height * 100.0)
}

/// Where and how a sticker sits on a stage of a given size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub anchor: Point,
    pub radians: f32,
}

impl Placement {
    /// Anchor translation followed by rotation about the anchor.
    pub fn to_affine(self) -> tiny_skia::Transform {
        let (sin, cos) = self.radians.sin_cos();
        tiny_skia::Transform::from_row(cos, sin, -sin, cos, self.anchor.x, self.anchor.y)
    }

    /// Stage point expressed in the sticker's own unrotated frame (anchor at origin).
    pub fn to_local(self, point: Point) -> Point {
        let d = point - self.anchor;
        let (sin, cos) = self.radians.sin_cos();
        Point::new(d.x * cos + d.y * sin, -d.x * sin + d.y * cos)
    }
}

pub fn placement(model: &Transform, stage: StageSize) -> Placement {
    Placement {
        anchor: model.anchor(stage),
        radians: model.rotation.to_radians(),
    }
}

/// Glyph size rule: `base_px × scale`, with `base_px` defined at `reference_width`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphSizing {
    pub base_px: f32,
    pub reference_width: f32,
}

impl Default for GlyphSizing {
    fn default() -> Self {
        Self {
            base_px: 80.0,
            reference_width: 1080.0,
        }
    }
}

impl GlyphSizing {
    pub fn glyph_px(&self, scale: f32, stage: StageSize) -> f32 {
        if self.reference_width <= 0.0 {
            return self.base_px * scale;
        }
        self.base_px * scale * stage.width / self.reference_width
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StickerId(pub u64);

#[derive(Clone, Debug)]
pub struct Sticker {
    id: StickerId,
    glyph: String,
    pub transform: Transform,
}

impl Sticker {
    pub fn id(&self) -> StickerId {
        self.id
    }

    pub fn glyph(&self) -> &str {
        &self.glyph
    }
}

/// Every sticker of the session, in creation order (which is also draw order).
#[derive(Debug, Default)]
pub struct StickerBoard {
    stickers: Vec<Sticker>,
    next_id: u64,
}

impl StickerBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// New sticker at the default transform, on top of everything else.
    pub fn add(&mut self, glyph: impl Into<String>) -> StickerId {
        let id = StickerId(self.next_id);
        self.next_id += 1;
        self.stickers.push(Sticker {
            id,
            glyph: glyph.into(),
            transform: Transform::default(),
        });
        id
    }

    pub fn get(&self, id: StickerId) -> Option<&Sticker> {
        self.stickers.iter().find(|s| s.id == id)
    }

    pub fn transform(&self, id: StickerId) -> Option<Transform> {
        self.get(id).map(|s| s.transform)
    }

    /// Commit a whole transform in one write. Returns false for unknown ids.
    pub fn set_transform(&mut self, id: StickerId, transform: Transform) -> bool {
        match self.stickers.iter_mut().find(|s| s.id == id) {
            Some(sticker) => {
                sticker.transform = transform.clamped();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: StickerId) -> bool {
        let before = self.stickers.len();
        self.stickers.retain(|s| s.id != id);
        self.stickers.len() != before
    }

    /// Drop every sticker; returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let n = self.stickers.len();
        self.stickers.clear();
        n
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sticker> {
        self.stickers.iter()
    }

    pub fn len(&self) -> usize {
        self.stickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stickers.is_empty()
    }

    /// Topmost sticker whose glyph square contains `point`.
    pub fn hit_test(
        &self,
        point: Point,
        stage: StageSize,
        sizing: GlyphSizing,
    ) -> Option<StickerId> {
        self.stickers.iter().rev().find_map(|s| {
            let half = sizing.glyph_px(s.transform.scale, stage) / 2.0;
            let local = placement(&s.transform, stage).to_local(point);
            (local.x.abs() <= half && local.y.abs() <= half).then_some(s.id)
        })
    }
}
