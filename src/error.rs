// One error type for the whole booth.
// Every variant states *where* things went wrong.
use std::path::PathBuf;

use thiserror::Error;

use crate::types::Facing;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Window init error: {0}")]
    WindowInit(String), // Creating the window failed

    #[error("Window update error: {0}")]
    WindowUpdate(String), // Pushing the preview buffer failed

    #[error("Camera init error: {0}")]
    CameraInit(String), // Opening/starting the camera failed

    #[error("Camera frame error: {0}")]
    CameraFrame(String), // Grabbing/decoding a frame failed

    #[error("No {facing} camera available: {reason}")]
    DeviceUnavailable { facing: Facing, reason: String },

    #[error("Overlay load error ({path}): {source}")]
    OverlayLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Font load error: {0}")]
    FontLoad(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Image encode error: {0}")]
    Encode(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
