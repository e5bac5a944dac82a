// Camera collaborator: opens the camera for a facing mode and hands out RGB frames.
// Visual expectation: when the session asks for a frame you get the image the chosen
// camera sees right now; flipping closes one device and opens the other.

use image::RgbImage;
use log::{info, warn};

use crate::error::{Error, Result};
use crate::types::Facing;

// Bring in nokhwa types for camera control.
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};

/// A live stream of frames from one opened device.
pub trait FrameSource {
    /// Next frame (blocks until the device delivers one).
    fn next_frame(&mut self) -> Result<RgbImage>;

    /// Resolution the device actually delivers.
    fn resolution(&self) -> (u32, u32);
}

/// Opens a frame source for a facing mode.
pub trait CameraBackend {
    fn open(&self, facing: Facing) -> Result<Box<dyn FrameSource>>;
}

// A small wrapper around nokhwa::Camera so the session stays device-agnostic.
pub struct CameraCapture {
    cam: Camera,
    width: u32,
    height: u32,
}

impl CameraCapture {
    /// Try to open camera `index` at a target resolution (falls back if not exact).
    /// On success nothing is shown yet; we just hold an open stream.
    pub fn new(index: u32, width: u32, height: u32) -> Result<Self> {
        // 1) Choose the device.
        let idx = CameraIndex::Index(index);

        let fmt = CameraFormat::new(
            Resolution::new(width, height),
            FrameFormat::MJPEG, // most webcams only reach HD as MJPEG
            30,                 // target FPS
        );

        // 2) Ask for RGB frames, closest to our request.
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        // 3) Create the camera (this fails if no device exists or access is denied).
        let mut cam = Camera::new(idx, req)
            .map_err(|e| Error::CameraInit(format!("Create camera {index}: {e}")))?;

        // 4) Start streaming frames from the camera.
        cam.open_stream()
            .map_err(|e| Error::CameraInit(format!("Open stream {index}: {e}")))?;

        // 5) The actual stream might choose a slightly different resolution.
        let actual = cam.resolution();

        Ok(Self {
            cam,
            width: actual.width(),
            height: actual.height(),
        })
    }
}

impl FrameSource for CameraCapture {
    fn next_frame(&mut self) -> Result<RgbImage> {
        // Pull a frame (blocks until one is ready), then decode to RGB.
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;

        frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        if let Err(e) = self.cam.stop_stream() {
            warn!("stopping camera stream: {e}");
        }
    }
}

/// nokhwa backend: one device index per facing mode.
pub struct NokhwaBackend {
    pub user_index: u32,
    pub environment_index: u32,
    pub width: u32,
    pub height: u32,
}

impl CameraBackend for NokhwaBackend {
    fn open(&self, facing: Facing) -> Result<Box<dyn FrameSource>> {
        let index = match facing {
            Facing::User => self.user_index,
            Facing::Environment => self.environment_index,
        };
        let cam = CameraCapture::new(index, self.width, self.height)?;
        Ok(Box::new(cam))
    }
}

/// What the HUD shows about the camera.
#[derive(Clone, Debug, PartialEq)]
pub enum CameraStatus {
    Stopped,
    Live { width: u32, height: u32 },
    /// Opening failed for this facing; stays so until the user flips again.
    Unavailable(String),
}

/// Owns the active device and its facing mode.
pub struct CameraRig<B> {
    backend: B,
    facing: Facing,
    source: Option<Box<dyn FrameSource>>,
    status: CameraStatus,
}

impl<B: CameraBackend> CameraRig<B> {
    pub fn new(backend: B, facing: Facing) -> Self {
        Self {
            backend,
            facing,
            source: None,
            status: CameraStatus::Stopped,
        }
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn status(&self) -> &CameraStatus {
        &self.status
    }

    /// (Re)open the device for the current facing. A failure is recorded, not retried.
    pub fn start(&mut self) -> Result<()> {
        self.stop();
        match self.backend.open(self.facing) {
            Ok(source) => {
                let (width, height) = source.resolution();
                info!("{} camera live at {width}x{height}", self.facing);
                self.status = CameraStatus::Live { width, height };
                self.source = Some(source);
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("{} camera unavailable: {reason}", self.facing);
                self.status = CameraStatus::Unavailable(reason.clone());
                Err(Error::DeviceUnavailable {
                    facing: self.facing,
                    reason,
                })
            }
        }
    }

    /// Close the current device and open the other facing.
    pub fn flip(&mut self) -> Result<()> {
        self.facing = self.facing.flipped();
        self.start()
    }

    pub fn stop(&mut self) {
        if self.source.take().is_some() {
            info!("{} camera stopped", self.facing);
        }
        if !matches!(self.status, CameraStatus::Unavailable(_)) {
            self.status = CameraStatus::Stopped;
        }
    }

    /// Next frame of the active device; `None` when no device is open.
    pub fn frame(&mut self) -> Option<Result<RgbImage>> {
        self.source.as_mut().map(|s| s.next_frame())
    }
}
