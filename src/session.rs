//! Session controller: owns every piece of mutable state of one booth session.
//!
//! Lifecycle is `init()` (camera on) → active → `teardown()` (camera off, gestures
//! dropped). The window loop feeds it frames and contact events; it never touches the
//! window itself.

use image::{RgbImage, RgbaImage};
use log::{debug, info, warn};
use tiny_skia::Pixmap;

use crate::camera::{CameraBackend, CameraRig, CameraStatus};
use crate::compositor::{CameraFrame, Compositor, Overlay};
use crate::error::Result;
use crate::gesture::GestureRecognizer;
use crate::glyph::GlyphRasterizer;
use crate::input::{CaptureScope, ContactEvent, Disposition};
use crate::selection::Selection;
use crate::transform::{StickerBoard, StickerId};
use crate::types::{ContactId, Facing, Point, StageSize};

/// A virtual contact that mirrors another through a fixed pivot.
#[derive(Clone, Copy, Debug)]
struct Pinned {
    contact: ContactId,
    of: ContactId,
    pivot: Point,
}

pub struct Session<B, G> {
    board: StickerBoard,
    gestures: GestureRecognizer,
    selection: Selection,
    camera: CameraRig<B>,
    compositor: Compositor<G>,
    overlay: Option<Overlay>,
    scope: CaptureScope,
    output: (u32, u32),
    last_frame: Option<RgbImage>,
    pinned: Vec<Pinned>,
}

impl<B: CameraBackend, G: GlyphRasterizer> Session<B, G> {
    pub fn new(
        camera: CameraRig<B>,
        compositor: Compositor<G>,
        overlay: Option<Overlay>,
        scope: CaptureScope,
        output: (u32, u32),
    ) -> Self {
        Self {
            board: StickerBoard::new(),
            gestures: GestureRecognizer::new(),
            selection: Selection::new(),
            camera,
            compositor,
            overlay,
            scope,
            output,
            last_frame: None,
            pinned: Vec::new(),
        }
    }

    /// Start the camera. A missing device is reported but leaves the session usable.
    pub fn init(&mut self) -> Result<()> {
        info!("session start ({} camera)", self.camera.facing());
        self.camera.start()
    }

    pub fn teardown(&mut self) {
        self.camera.stop();
        self.gestures.reset();
        self.pinned.clear();
        self.last_frame = None;
        info!("session ended with {} sticker(s)", self.board.len());
    }

    /* ------------------------------ camera ------------------------------ */

    /// Pull the next camera frame. Returns true when a new frame arrived; a failed fetch
    /// keeps the previous frame on screen.
    pub fn poll_frame(&mut self) -> bool {
        match self.camera.frame() {
            Some(Ok(frame)) => {
                self.last_frame = Some(frame);
                true
            }
            Some(Err(e)) => {
                warn!("{e}");
                false
            }
            None => false,
        }
    }

    /// Close the current camera and open the other one. Failure is surfaced through
    /// [`Session::camera_status`]; flipping again is the only retry.
    pub fn flip_camera(&mut self) -> Result<()> {
        self.last_frame = None;
        self.camera.flip()
    }

    pub fn facing(&self) -> Facing {
        self.camera.facing()
    }

    pub fn camera_status(&self) -> &CameraStatus {
        self.camera.status()
    }

    /* ----------------------------- stickers ----------------------------- */

    /// New sticker at the stage center, selected.
    pub fn add_sticker(&mut self, glyph: &str) -> StickerId {
        let id = self.board.add(glyph);
        debug!("sticker {id:?} added: {glyph}");
        self.selection.select(Some(id));
        id
    }

    pub fn select(&mut self, id: Option<StickerId>) {
        self.selection.select(id);
    }

    pub fn delete_selected(&mut self) -> Option<StickerId> {
        let removed = self
            .selection
            .delete_selected(&mut self.board, &mut self.gestures);
        if let Some(id) = removed {
            debug!("sticker {id:?} deleted");
        }
        removed
    }

    pub fn clear_all(&mut self) -> usize {
        let n = self.selection.clear_all(&mut self.board, &mut self.gestures);
        self.pinned.clear();
        if n > 0 {
            debug!("cleared {n} sticker(s)");
        }
        n
    }

    pub fn board(&self) -> &StickerBoard {
        &self.board
    }

    pub fn selected(&self) -> Option<StickerId> {
        self.selection.selected()
    }

    pub fn gestures(&self) -> &GestureRecognizer {
        &self.gestures
    }

    /* ------------------------------ input ------------------------------- */

    pub fn handle(&mut self, event: ContactEvent, stage: StageSize) -> Disposition {
        match event {
            ContactEvent::Start { contact, point } => self.contact_start(contact, point, stage),
            ContactEvent::Move { contact, point } => self.contact_move(contact, point, stage),
            ContactEvent::End { contact } => self.contact_end(contact, stage),
            ContactEvent::Mirror { contact, of } => self.contact_mirror(contact, of, stage),
        }
    }

    /// Contact-down: selects the sticker under it (before any drag/pinch is known) and
    /// hands the contact to that sticker's gesture. Empty stage clears the selection.
    pub fn contact_start(
        &mut self,
        contact: ContactId,
        point: Point,
        stage: StageSize,
    ) -> Disposition {
        let hit = self.board.hit_test(point, stage, self.compositor.sizing());
        if let Some(id) = hit {
            self.selection.select(Some(id));
            self.gestures.on_contact_start(&self.board, stage, id, contact, point);
            return Disposition::Consumed;
        }

        match self.scope {
            CaptureScope::Stage => {
                if let Some(id) = self.gestures.sole_dragging_sticker() {
                    self.gestures.on_contact_start(&self.board, stage, id, contact, point);
                } else {
                    self.selection.select(None);
                }
                Disposition::Consumed
            }
            CaptureScope::Sticker => {
                self.selection.select(None);
                Disposition::PassThrough
            }
        }
    }

    pub fn contact_move(
        &mut self,
        contact: ContactId,
        point: Point,
        stage: StageSize,
    ) -> Disposition {
        if self.gestures.owner(contact).is_none() {
            return self.uncaptured();
        }
        match self.pinned.iter().find(|pin| pin.of == contact).copied() {
            // The pinned contact follows in the same step, so the midpoint stays on the pivot.
            Some(pin) => {
                let mirrored = point.mirrored_through(pin.pivot);
                self.gestures.on_contacts_move(
                    &mut self.board,
                    stage,
                    &[(pin.contact, mirrored), (contact, point)],
                );
            }
            None => {
                self.gestures.on_contact_move(&mut self.board, stage, contact, point);
            }
        }
        Disposition::Consumed
    }

    pub fn contact_end(&mut self, contact: ContactId, stage: StageSize) -> Disposition {
        self.pinned.retain(|pin| pin.contact != contact && pin.of != contact);
        match self.gestures.on_contact_end(&self.board, stage, contact) {
            Some(_) => Disposition::Consumed,
            None => self.uncaptured(),
        }
    }

    /// Start `contact` on the sticker `of` drives, mirrored through its anchor. Until
    /// either ends, `contact` keeps mirroring `of` through that anchor, so the sticker
    /// scales and rotates in place.
    pub fn contact_mirror(
        &mut self,
        contact: ContactId,
        of: ContactId,
        stage: StageSize,
    ) -> Disposition {
        let (Some(id), Some(point)) = (self.gestures.owner(of), self.gestures.contact_point(of))
        else {
            return self.uncaptured();
        };
        let Some(transform) = self.board.transform(id) else {
            return self.uncaptured();
        };
        let pivot = transform.anchor(stage);
        let mirrored = point.mirrored_through(pivot);
        if self.gestures.on_contact_start(&self.board, stage, id, contact, mirrored) {
            self.pinned.push(Pinned { contact, of, pivot });
        }
        Disposition::Consumed
    }

    fn uncaptured(&self) -> Disposition {
        match self.scope {
            CaptureScope::Stage => Disposition::Consumed,
            CaptureScope::Sticker => Disposition::PassThrough,
        }
    }

    /* ----------------------------- rendering ---------------------------- */

    fn camera_frame(&self) -> Option<CameraFrame<'_>> {
        self.last_frame.as_ref().map(|image| CameraFrame {
            image,
            facing: self.camera.facing(),
        })
    }

    /// Live preview at stage size, through the same compositor as the photo.
    pub fn preview(&self, width: u32, height: u32) -> Result<Pixmap> {
        self.compositor.render_pixmap(
            self.camera_frame(),
            self.overlay.as_ref(),
            &self.board,
            width,
            height,
        )
    }

    /// The photo: everything flattened at the fixed output resolution.
    pub fn capture(&self) -> Result<RgbaImage> {
        let (w, h) = self.output;
        info!("capturing {w}x{h} with {} sticker(s)", self.board.len());
        self.compositor.render(
            self.camera_frame(),
            self.overlay.as_ref(),
            &self.board,
            w,
            h,
        )
    }

    pub fn compositor(&self) -> &Compositor<G> {
        &self.compositor
    }
}
