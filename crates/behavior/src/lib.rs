//! Candidate Behavior Analysis
//!
//! Per-frame webcam analysis for remote interview proctoring:
//! - Face presence classification (none / exactly one / several)
//! - Gaze-away heuristic from projected eye spacing
//! - Head-movement accumulation
//! - Session-level behavior reporting

pub mod analysis;
pub mod config;
pub mod detector;
pub mod landmarks;
pub mod report;
pub mod state;

pub use analysis::{BehaviorAnalyzer, FrameAnalysis, FrameClass};
pub use config::BehaviorConfig;
pub use detector::{FaceMeshDetector, ScriptedProvider};
pub use landmarks::{Landmark, LandmarkProvider, LandmarkSet};
pub use report::BehaviorReport;
pub use state::BehaviorState;

use thiserror::Error;
use video_frame::FrameError;

/// Behavior analysis error types
#[derive(Error, Debug)]
pub enum BehaviorError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Landmark index {0} missing from set")]
    LandmarkMissing(usize),

    #[error("Invalid frame: {0}")]
    InvalidFrame(#[from] FrameError),
}
