//! Webcam Frame Types
//!
//! Decoded RGB frames as delivered to the behavior analyzer:
//! - Raw RGB24 frame container with structural validation
//! - JPEG decoding for frames arriving over the HTTP boundary

pub mod frame;

pub use frame::{decode_jpeg, VideoFrame};

use thiserror::Error;

/// Frame error types
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Frame has zero width or height ({width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("Pixel buffer holds {actual} bytes, expected {expected} for RGB24")]
    BufferSize { expected: usize, actual: usize },

    #[error("Failed to decode frame: {0}")]
    Decode(String),
}
