// Sticker glyph rasterization.
// Visual: turns "🔥" at 80px into a small transparent bitmap with the glyph drawn in it,
// sized so its center is the sticker anchor (text centered both ways).

use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, PxScale, ScaleFont, point};
use log::{info, warn};
use tiny_skia::{ColorU8, Pixmap};

use crate::error::{Error, Result};

/// Anything that can turn a glyph string into a premultiplied bitmap at a pixel size.
pub trait GlyphRasterizer {
    /// `None` when nothing drawable comes out (empty string, size too small).
    fn rasterize(&self, glyph: &str, px: f32) -> Option<Pixmap>;
}

/// Fonts tried in order when no font is configured. Outline fonts only: bitmap-only
/// colour emoji fonts have no outlines to fill.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/noto/NotoEmoji-Regular.ttf",
    "/usr/share/fonts/noto/NotoEmoji-Regular.ttf",
    "/usr/share/fonts/truetype/ancient-scripts/Symbola_hint.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    "C:\\Windows\\Fonts\\seguiemj.ttf",
    "C:\\Windows\\Fonts\\seguisym.ttf",
];

/// Outline-font glyph renderer backed by ab_glyph.
pub struct FontGlyphs {
    font: FontVec,
    color: [u8; 3],
}

impl FontGlyphs {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| Error::FontLoad(format!("{}: {e}", path.display())))?;
        let font = FontVec::try_from_vec(data)
            .map_err(|e| Error::FontLoad(format!("{}: {e}", path.display())))?;
        info!("sticker font: {}", path.display());
        Ok(Self {
            font,
            color: [0xFF, 0xFF, 0xFF],
        })
    }

    /// Fill colour for glyph outlines (white by default).
    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = color;
        self
    }

    /// Use `explicit` when given, otherwise the first system font that loads.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        for candidate in FONT_CANDIDATES.iter().map(PathBuf::from) {
            if !candidate.exists() {
                continue;
            }
            match Self::from_file(&candidate) {
                Ok(glyphs) => return Ok(glyphs),
                Err(e) => warn!("{e}"),
            }
        }
        Err(Error::FontLoad(
            "no usable font found; pass --font <path to .ttf/.otf>".into(),
        ))
    }
}

impl GlyphRasterizer for FontGlyphs {
    fn rasterize(&self, glyph: &str, px: f32) -> Option<Pixmap> {
        if glyph.is_empty() || px < 1.0 {
            return None;
        }
        let scaled = self.font.as_scaled(PxScale::from(px));

        // 1) Lay the glyphs out on one baseline, left to right.
        let mut caret = 0.0_f32;
        let mut prev = None;
        let mut laid_out = Vec::new();
        for ch in glyph.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(p) = prev {
                caret += scaled.kern(p, id);
            }
            laid_out.push(id.with_scale_and_position(px, point(caret, scaled.ascent())));
            caret += scaled.h_advance(id);
            prev = Some(id);
        }

        // 2) Box = advance width × line height, so "middle" sits at the box center.
        let width = caret.ceil().max(1.0) as u32;
        let height = (scaled.ascent() - scaled.descent()).ceil().max(1.0) as u32;
        let mut pixmap = Pixmap::new(width, height)?;

        // 3) Fill coverage; overlapping glyph edges keep the stronger coverage.
        let [r, g, b] = self.color;
        let stride = width as i32;
        let pixels = pixmap.pixels_mut();
        for g_item in laid_out {
            let Some(outlined) = self.font.outline_glyph(g_item) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|x, y, coverage| {
                let px_x = bounds.min.x as i32 + x as i32;
                let px_y = bounds.min.y as i32 + y as i32;
                if px_x < 0 || px_y < 0 || px_x >= stride || px_y >= height as i32 {
                    return;
                }
                let idx = (px_y * stride + px_x) as usize;
                let alpha = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
                if alpha > pixels[idx].alpha() {
                    pixels[idx] = ColorU8::from_rgba(r, g, b, alpha).premultiply();
                }
            });
        }
        Some(pixmap)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_explicit_font_is_a_font_error() {
        let err = FontGlyphs::discover(Some(Path::new("/definitely/not/here.ttf")))
            .err()
            .unwrap();
        assert!(matches!(err, Error::FontLoad(_)));
        assert!(err.to_string().contains("here.ttf"));
    }

    #[test]
    fn garbage_font_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(matches!(
            FontGlyphs::from_file(&path),
            Err(Error::FontLoad(_))
        ));
    }
}
