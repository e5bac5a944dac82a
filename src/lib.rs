//! Sticker booth: a live camera preview you decorate with emoji stickers, then save
//! as a photo.
//!
//! Stickers are moved with one contact and scaled/rotated with two. The saved photo
//! is rendered by the same compositor as the preview, at a fixed output resolution.

pub mod camera;
pub mod compositor;
pub mod config;
pub mod draw;
pub mod error;
pub mod export;
pub mod gesture;
pub mod glyph;
pub mod input;
pub mod selection;
pub mod session;
pub mod transform;
pub mod types;

pub use error::{Error, Result};
