//! Command-line / environment configuration.

use std::path::PathBuf;

use clap::Parser;

use crate::input::CaptureScope;
use crate::transform::GlyphSizing;
use crate::types::Facing;

/// Put emoji stickers on your camera feed and save the result as a photo.
#[derive(Debug, Clone, Parser)]
#[command(name = "sticker-booth", version, about)]
pub struct Config {
    /// Device index of the front (selfie) camera.
    #[arg(long, env = "STICKER_BOOTH_USER_CAMERA", default_value_t = 0)]
    pub user_camera: u32,

    /// Device index of the rear camera.
    #[arg(long, env = "STICKER_BOOTH_ENVIRONMENT_CAMERA", default_value_t = 1)]
    pub environment_camera: u32,

    /// Camera to start with.
    #[arg(long, value_enum, env = "STICKER_BOOTH_FACING", default_value_t = Facing::User)]
    pub facing: Facing,

    /// Requested camera resolution (the device may pick the closest it supports).
    #[arg(long, default_value_t = 1280)]
    pub camera_width: u32,
    #[arg(long, default_value_t = 720)]
    pub camera_height: u32,

    /// Window (stage) size in pixels.
    #[arg(long, default_value_t = 540)]
    pub stage_width: u32,
    #[arg(long, default_value_t = 960)]
    pub stage_height: u32,

    /// Resolution of the saved photo.
    #[arg(long, default_value_t = 1080)]
    pub output_width: u32,
    #[arg(long, default_value_t = 1920)]
    pub output_height: u32,

    /// Static overlay image drawn over the camera feed.
    #[arg(long, env = "STICKER_BOOTH_OVERLAY")]
    pub overlay: Option<PathBuf>,

    /// Outline font for sticker glyphs (a system font is used when omitted).
    #[arg(long, env = "STICKER_BOOTH_FONT")]
    pub font: Option<PathBuf>,

    /// Sticker glyph size in pixels at scale 1, measured on the saved photo.
    #[arg(long, default_value_t = 80.0)]
    pub glyph_size: f32,

    /// Fill colour of sticker glyphs as RRGGBB. Glyphs are drawn as single-colour
    /// outlines, so colour emoji come out as silhouettes in this colour.
    #[arg(
        long,
        env = "STICKER_BOOTH_GLYPH_COLOR",
        default_value = "ffffff",
        value_parser = parse_rgb
    )]
    pub glyph_color: [u8; 3],

    /// Stickers offered on keys 1-9, comma separated (drawn in --glyph-color).
    #[arg(
        long,
        env = "STICKER_BOOTH_PALETTE",
        value_delimiter = ',',
        default_value = "😀,😎,🔥,❤️,⭐,🎉,👍,🌈,🐱"
    )]
    pub palette: Vec<String>,

    /// Which contacts the stage captures.
    #[arg(
        long,
        value_enum,
        env = "STICKER_BOOTH_CAPTURE_SCOPE",
        default_value_t = CaptureScope::Sticker
    )]
    pub capture_scope: CaptureScope,

    /// Where photos are saved (defaults to the pictures directory).
    #[arg(long, env = "STICKER_BOOTH_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
}

impl Config {
    pub fn glyph_sizing(&self) -> GlyphSizing {
        GlyphSizing {
            base_px: self.glyph_size,
            reference_width: self.output_width as f32,
        }
    }

    pub fn output_size(&self) -> (u32, u32) {
        (self.output_width, self.output_height)
    }

    pub fn stage_size(&self) -> (usize, usize) {
        (self.stage_width as usize, self.stage_height as usize)
    }
}

/// `RRGGBB` or `#RRGGBB` → `[r, g, b]`.
fn parse_rgb(s: &str) -> Result<[u8; 3], String> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(format!("expected RRGGBB, got {s:?}"));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("{s:?}: {e}"))
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}
