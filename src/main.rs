// What you SEE:
// • The camera fills the window (cropped, never stretched; the selfie camera is mirrored).
// • Keys 1-9 drop a sticker in the middle; it gets a dashed outline while selected.
// • Left mouse drags a sticker. Shift + left mouse pinches it around its center
//   (a yellow cross marks the pinned second finger).
// • DEL removes the selected sticker, C clears them all, F flips the camera.
// • SPACE saves a photo. ESC quits.

use std::time::{Duration, Instant};

use clap::Parser;
use log::{error, info, warn};

use sticker_booth::camera::{CameraRig, CameraStatus, NokhwaBackend};
use sticker_booth::compositor::{Compositor, Overlay, to_rgba_image};
use sticker_booth::config::Config;
use sticker_booth::draw::{Command, Drawer, draw_crosshair, draw_selection, draw_text_5x7};
use sticker_booth::error::Error;
use sticker_booth::export;
use sticker_booth::glyph::FontGlyphs;
use sticker_booth::input::MouseAdapter;
use sticker_booth::session::Session;
use sticker_booth::types::FrameBuffer;

const HUD_COLOR: u32 = 0x00FF_FFFF;
const CONTACT_COLOR: u32 = 0x00FF_CC33;
const TOAST_TIME: Duration = Duration::from_secs(2);

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    run(Config::parse()).inspect_err(|e| error!("{e}"))
}

fn run(config: Config) -> Result<(), Error> {
    /* --- Assets ---
       Visual: sticker font and the optional frame/border drawn over the video. */
    let glyphs = FontGlyphs::discover(config.font.as_deref())?.with_color(config.glyph_color);
    let overlay = config.overlay.as_deref().map(Overlay::load).transpose()?;
    let output_dir = export::output_dir(config.output_dir.as_deref());

    /* --- Camera + session ---
       Visual: nothing yet; a missing camera just leaves the stage black. */
    let backend = NokhwaBackend {
        user_index: config.user_camera,
        environment_index: config.environment_camera,
        width: config.camera_width,
        height: config.camera_height,
    };
    let mut session = Session::new(
        CameraRig::new(backend, config.facing),
        Compositor::new(glyphs, config.glyph_sizing()),
        overlay,
        config.capture_scope,
        config.output_size(),
    );
    if let Err(e) = session.init() {
        warn!("{e}");
    }

    /* --- Window ---
       Visual: a portrait window; its size is the stage size. */
    let (stage_w, stage_h) = config.stage_size();
    let mut drawer = Drawer::new("Sticker Booth", stage_w, stage_h)?;
    let mut mouse = MouseAdapter::new();

    /* --- HUD ---
       Visual: status line at the top, a short toast after saving. */
    let mut toast: Option<(String, Instant)> = None;

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        /* 1) Fresh camera frame (blocks until the device delivers one). */
        session.poll_frame();

        /* 2) Pointer → contacts → gestures. */
        let stage = drawer.stage();
        for event in mouse.update(drawer.mouse_state()) {
            session.handle(event, stage);
        }

        /* 3) Keys. */
        for command in drawer.commands() {
            match command {
                Command::AddSticker(slot) => match config.palette.get(slot) {
                    Some(glyph) => {
                        session.add_sticker(glyph);
                    }
                    None => info!("palette slot {} is empty", slot + 1),
                },
                Command::DeleteSelected => {
                    session.delete_selected();
                }
                Command::ClearAll => {
                    session.clear_all();
                }
                Command::FlipCamera => {
                    if let Err(e) = session.flip_camera() {
                        warn!("{e}");
                    }
                }
                Command::Capture => {
                    let message = match session
                        .capture()
                        .and_then(|photo| export::save_png(&photo, &output_dir))
                    {
                        Ok(path) => format!("SAVED {}", file_label(&path)),
                        Err(e) => {
                            error!("capture failed: {e}");
                            "SAVE FAILED".to_string()
                        }
                    };
                    toast = Some((message, Instant::now()));
                }
            }
        }

        /* 4) Compose the preview at window size.
           Visual: same picture the photo will have, just smaller. */
        if stage.is_empty() {
            drawer.pump(); // minimized: keep the window responsive
            continue;
        }
        let (w, h) = (stage.width as u32, stage.height as u32);
        let mut canvas = session.preview(w, h)?;
        if let Some(sticker) = session.selected().and_then(|id| session.board().get(id)) {
            draw_selection(&mut canvas, sticker, stage, session.compositor().sizing());
        }
        let mut screen = FrameBuffer::from_rgba(&to_rgba_image(&canvas));

        /* 5) Contacts: mark the pinned pinch finger so the pivot is visible. */
        if mouse.is_pinching() {
            for (_, p) in session.gestures().live_contacts() {
                draw_crosshair(&mut screen, p.x as i32, p.y as i32, 8, CONTACT_COLOR);
            }
        }

        /* 6) HUD text. */
        let status = match session.camera_status() {
            CameraStatus::Live { .. } => format!("LIVE {}", session.facing()),
            CameraStatus::Stopped => "CAMERA OFF".to_string(),
            CameraStatus::Unavailable(_) => format!("NO {} CAMERA", session.facing()),
        };
        let hud = format!("{status} | STICKERS: {}", session.board().len());
        draw_text_5x7(&mut screen, 8, 8, &hud, HUD_COLOR);
        let footer_y = screen.height as i32 - 16;
        draw_text_5x7(
            &mut screen,
            8,
            footer_y,
            "1-9 ADD  DEL  C CLEAR  F FLIP  SPACE SAVE",
            HUD_COLOR,
        );
        if toast.as_ref().is_some_and(|(_, at)| at.elapsed() >= TOAST_TIME) {
            toast = None;
        }
        if let Some((message, _)) = &toast {
            draw_text_5x7(&mut screen, 8, 20, message, HUD_COLOR);
        }

        /* 7) Show it. */
        drawer.present(&screen)?;
    }

    session.teardown();
    Ok(())
}

fn file_label(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
