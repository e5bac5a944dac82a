//! Flattens camera frame, overlay and stickers into one image.
//!
//! The same [`Compositor::render_pixmap`] call produces the live preview (at stage size)
//! and the captured photo (at output size). Sticker placement comes from
//! [`crate::transform::placement`], so both agree pixel for pixel up to resolution.

use std::path::Path;

use image::{RgbImage, RgbaImage};
use log::trace;
use tiny_skia::{Color, ColorU8, FilterQuality, Pixmap, PixmapPaint, Transform as Affine};

use crate::error::{Error, Result};
use crate::glyph::GlyphRasterizer;
use crate::transform::{GlyphSizing, StickerBoard, placement};
use crate::types::{Facing, StageSize};

/// A camera frame together with the camera it came from.
#[derive(Clone, Copy)]
pub struct CameraFrame<'a> {
    pub image: &'a RgbImage,
    pub facing: Facing,
}

/// Source rectangle (frame pixels) that fills the output after a center crop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Crop away whichever frame dimension is relatively wider. Never pads.
pub fn crop_rect(frame_w: f32, frame_h: f32, out_w: f32, out_h: f32) -> CropRect {
    let target_ratio = out_w / out_h;
    let frame_ratio = frame_w / frame_h;
    if frame_ratio > target_ratio {
        let width = frame_h * target_ratio;
        CropRect {
            x: (frame_w - width) / 2.0,
            y: 0.0,
            width,
            height: frame_h,
        }
    } else {
        let height = frame_w / target_ratio;
        CropRect {
            x: 0.0,
            y: (frame_h - height) / 2.0,
            width: frame_w,
            height,
        }
    }
}

/// Affine that maps `crop` onto a `out_w × out_h` canvas, mirrored for front cameras.
pub fn frame_affine(crop: CropRect, out_w: f32, out_h: f32, mirrored: bool) -> Affine {
    let sx = out_w / crop.width;
    let sy = out_h / crop.height;
    if mirrored {
        Affine::from_row(-sx, 0.0, 0.0, sy, out_w + crop.x * sx, -crop.y * sy)
    } else {
        Affine::from_row(sx, 0.0, 0.0, sy, -crop.x * sx, -crop.y * sy)
    }
}

/// Uniform scale-to-fit, centered. Returns (x, y, scale).
pub fn fit_centered(w: f32, h: f32, out_w: f32, out_h: f32) -> (f32, f32, f32) {
    let scale = (out_w / w).min(out_h / h);
    ((out_w - w * scale) / 2.0, (out_h - h * scale) / 2.0, scale)
}

/// The static overlay graphic, converted once to premultiplied pixels.
pub struct Overlay {
    pixmap: Pixmap,
}

impl Overlay {
    pub fn from_image(img: &RgbaImage) -> Result<Self> {
        let (w, h) = img.dimensions();
        let mut pixmap = Pixmap::new(w, h)
            .ok_or_else(|| Error::Render(format!("overlay has no pixels ({w}x{h})")))?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(img.pixels()) {
            *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
        }
        Ok(Self { pixmap })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let img = image::open(path)
            .map_err(|source| Error::OverlayLoad {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        Self::from_image(&img)
    }

    /// Natural size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }
}

fn frame_pixmap(img: &RgbImage) -> Result<Pixmap> {
    let (w, h) = img.dimensions();
    let mut pixmap =
        Pixmap::new(w, h).ok_or_else(|| Error::CameraFrame(format!("empty frame ({w}x{h})")))?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(img.pixels()) {
        *dst = ColorU8::from_rgba(src[0], src[1], src[2], 0xFF).premultiply();
    }
    Ok(pixmap)
}

/// Premultiplied pixmap → straight-alpha RGBA image.
pub fn to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut out = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    out
}

pub struct Compositor<G> {
    glyphs: G,
    sizing: GlyphSizing,
}

impl<G: GlyphRasterizer> Compositor<G> {
    pub fn new(glyphs: G, sizing: GlyphSizing) -> Self {
        Self { glyphs, sizing }
    }

    pub fn sizing(&self) -> GlyphSizing {
        self.sizing
    }

    /// Flattened RGBA image of everything at `out_w × out_h`.
    pub fn render(
        &self,
        frame: Option<CameraFrame<'_>>,
        overlay: Option<&Overlay>,
        stickers: &StickerBoard,
        out_w: u32,
        out_h: u32,
    ) -> Result<RgbaImage> {
        let canvas = self.render_pixmap(frame, overlay, stickers, out_w, out_h)?;
        Ok(to_rgba_image(&canvas))
    }

    /// Same as [`Compositor::render`] but keeps the premultiplied canvas, so the preview
    /// can draw selection outlines on top before presenting.
    pub fn render_pixmap(
        &self,
        frame: Option<CameraFrame<'_>>,
        overlay: Option<&Overlay>,
        stickers: &StickerBoard,
        out_w: u32,
        out_h: u32,
    ) -> Result<Pixmap> {
        let mut canvas = Pixmap::new(out_w, out_h)
            .ok_or_else(|| Error::Render(format!("empty output ({out_w}x{out_h})")))?;
        canvas.fill(Color::BLACK);
        let (w, h) = (out_w as f32, out_h as f32);
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };

        /* 1+2) Camera frame: center-crop to the output ratio, mirror front camera. */
        if let Some(frame) = frame {
            let src = frame_pixmap(frame.image)?;
            let crop = crop_rect(src.width() as f32, src.height() as f32, w, h);
            let affine = frame_affine(crop, w, h, frame.facing.is_mirrored());
            canvas.draw_pixmap(0, 0, src.as_ref(), &paint, affine, None);
        }

        /* 3) Overlay: largest uniform fit, centered. */
        if let Some(overlay) = overlay {
            let (ow, oh) = overlay.size();
            let (x, y, scale) = fit_centered(ow as f32, oh as f32, w, h);
            let affine = Affine::from_row(scale, 0.0, 0.0, scale, x, y);
            canvas.draw_pixmap(0, 0, overlay.pixmap.as_ref(), &paint, affine, None);
        }

        /* 4) Stickers in creation order, each centered on its own anchor. */
        let stage = StageSize::new(w, h);
        for sticker in stickers.iter() {
            let px = self.sizing.glyph_px(sticker.transform.scale, stage);
            let Some(bitmap) = self.glyphs.rasterize(sticker.glyph(), px) else {
                trace!("sticker {:?} has nothing to draw at {px}px", sticker.id());
                continue;
            };
            let affine = placement(&sticker.transform, stage).to_affine().pre_translate(
                -(bitmap.width() as f32) / 2.0,
                -(bitmap.height() as f32) / 2.0,
            );
            canvas.draw_pixmap(0, 0, bitmap.as_ref(), &paint, affine, None);
        }

        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::testing::SquareGlyphs;
    use crate::transform::Transform;

    fn compositor() -> Compositor<SquareGlyphs> {
        Compositor::new(SquareGlyphs, GlyphSizing::default())
    }

    fn is_red(p: &image::Rgba<u8>) -> bool {
        p[0] > 200 && p[1] < 50 && p[2] < 50
    }

    fn is_blue(p: &image::Rgba<u8>) -> bool {
        p[0] < 50 && p[1] < 50 && p[2] > 200
    }

    fn is_green(p: &image::Rgba<u8>) -> bool {
        p[0] < 50 && p[1] > 200 && p[2] < 50
    }

    /// Landscape frame: left half red, right half blue.
    fn split_frame() -> RgbImage {
        RgbImage::from_fn(192, 108, |x, _| {
            if x < 96 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        })
    }

    #[test]
    fn crop_of_landscape_frame_into_portrait_output() {
        let crop = crop_rect(1920.0, 1080.0, 1080.0, 1920.0);
        // tr = 1080/1920, vr = 1920/1080 > tr → width = 1080 * tr
        assert_eq!(crop.width, 1080.0 * (1080.0 / 1920.0));
        assert_eq!(crop.width, 607.5);
        assert_eq!(crop.x, (1920.0 - 607.5) / 2.0);
        assert_eq!((crop.y, crop.height), (0.0, 1080.0));
    }

    #[test]
    fn crop_of_tall_frame_trims_height() {
        let crop = crop_rect(1000.0, 3000.0, 1080.0, 1920.0);
        let height = 1000.0 / (1080.0 / 1920.0);
        assert_eq!(crop.width, 1000.0);
        assert!((crop.height - height).abs() < 1e-3);
        assert!((crop.y - (3000.0 - height) / 2.0).abs() < 1e-3);
    }

    #[test]
    fn mirrored_affine_flips_crop_edges() {
        let crop = crop_rect(1920.0, 1080.0, 1080.0, 1920.0);
        let affine = frame_affine(crop, 1080.0, 1920.0, true);
        let mut pts = [
            tiny_skia::Point::from_xy(crop.x, 0.0),
            tiny_skia::Point::from_xy(crop.x + crop.width, 1080.0),
        ];
        affine.map_points(&mut pts);
        assert!((pts[0].x - 1080.0).abs() < 1e-2);
        assert!(pts[1].x.abs() < 1e-2);
        assert!((pts[1].y - 1920.0).abs() < 1e-2);
    }

    #[test]
    fn fit_centered_letterboxes_overlay() {
        assert_eq!(fit_centered(10.0, 10.0, 108.0, 192.0), (0.0, 42.0, 10.8));
        assert_eq!(fit_centered(1080.0, 1920.0, 1080.0, 1920.0), (0.0, 0.0, 1.0));
    }

    #[test]
    fn front_camera_is_mirrored() {
        let frame = split_frame();
        let board = StickerBoard::new();
        let img = compositor()
            .render(
                Some(CameraFrame {
                    image: &frame,
                    facing: Facing::User,
                }),
                None,
                &board,
                108,
                192,
            )
            .unwrap();
        assert_eq!(img.dimensions(), (108, 192));
        assert!(is_blue(img.get_pixel(10, 96)));
        assert!(is_red(img.get_pixel(98, 96)));
    }

    #[test]
    fn rear_camera_is_not_mirrored() {
        let frame = split_frame();
        let board = StickerBoard::new();
        let img = compositor()
            .render(
                Some(CameraFrame {
                    image: &frame,
                    facing: Facing::Environment,
                }),
                None,
                &board,
                108,
                192,
            )
            .unwrap();
        assert!(is_red(img.get_pixel(10, 96)));
        assert!(is_blue(img.get_pixel(98, 96)));
    }

    #[test]
    fn missing_frame_leaves_black_background() {
        let board = StickerBoard::new();
        let img = compositor().render(None, None, &board, 20, 30).unwrap();
        assert_eq!(*img.get_pixel(5, 5), image::Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn overlay_fits_and_centers() {
        let overlay =
            Overlay::from_image(&RgbaImage::from_pixel(10, 10, image::Rgba([0, 255, 0, 255])))
                .unwrap();
        let board = StickerBoard::new();
        let img = compositor()
            .render(None, Some(&overlay), &board, 108, 192)
            .unwrap();
        assert!(is_green(img.get_pixel(54, 96)));
        assert!(is_green(img.get_pixel(2, 50)));
        assert_eq!(*img.get_pixel(54, 10), image::Rgba([0, 0, 0, 255]));
        assert_eq!(*img.get_pixel(54, 180), image::Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn transparent_overlay_keeps_camera_visible() {
        let frame = split_frame();
        let overlay = Overlay::from_image(&RgbaImage::new(10, 10)).unwrap();
        let board = StickerBoard::new();
        let img = compositor()
            .render(
                Some(CameraFrame {
                    image: &frame,
                    facing: Facing::Environment,
                }),
                Some(&overlay),
                &board,
                108,
                192,
            )
            .unwrap();
        assert!(is_red(img.get_pixel(10, 96)));
    }

    #[test]
    fn later_stickers_draw_on_top() {
        let mut board = StickerBoard::new();
        board.add("R");
        board.add("B");
        let img = compositor().render(None, None, &board, 216, 384).unwrap();
        assert!(is_blue(img.get_pixel(108, 192)));

        let mut board = StickerBoard::new();
        board.add("B");
        board.add("R");
        let img = compositor().render(None, None, &board, 216, 384).unwrap();
        assert!(is_red(img.get_pixel(108, 192)));
    }

    #[test]
    fn sticker_size_follows_scale() {
        let mut board = StickerBoard::new();
        let id = board.add("R");
        // 216px wide output → 16px glyph at scale 1.
        let img = compositor().render(None, None, &board, 216, 384).unwrap();
        assert!(is_red(img.get_pixel(108 + 6, 192)));
        assert!(!is_red(img.get_pixel(108 + 10, 192)));

        board.set_transform(
            id,
            Transform {
                scale: 2.0,
                ..Transform::default()
            },
        );
        let img = compositor().render(None, None, &board, 216, 384).unwrap();
        assert!(is_red(img.get_pixel(108 + 10, 192)));
    }

    #[test]
    fn sticker_rotates_about_its_anchor() {
        let mut board = StickerBoard::new();
        let id = board.add("R");
        let img = compositor().render(None, None, &board, 216, 384).unwrap();
        assert!(is_red(img.get_pixel(114, 198)));
        assert!(!is_red(img.get_pixel(108, 182)));

        board.set_transform(
            id,
            Transform {
                rotation: 45.0,
                ..Transform::default()
            },
        );
        let img = compositor().render(None, None, &board, 216, 384).unwrap();
        assert!(!is_red(img.get_pixel(114, 198)));
        assert!(is_red(img.get_pixel(108, 182)));
    }

    #[test]
    fn sticker_position_uses_projection() {
        let mut board = StickerBoard::new();
        let id = board.add("R");
        board.set_transform(
            id,
            Transform {
                x: 25.0,
                y: 75.0,
                ..Transform::default()
            },
        );
        let img = compositor().render(None, None, &board, 216, 384).unwrap();
        assert!(is_red(img.get_pixel(54, 288)));
        assert!(!is_red(img.get_pixel(108, 192)));
    }

    #[test]
    fn empty_output_is_an_error() {
        let board = StickerBoard::new();
        assert!(matches!(
            compositor().render(None, None, &board, 0, 10),
            Err(Error::Render(_))
        ));
    }
}
