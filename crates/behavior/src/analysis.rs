//! Frame classification and behavior signal extraction

use crate::config::BehaviorConfig;
use crate::detector::FaceMeshDetector;
use crate::landmarks::{
    LandmarkProvider, LandmarkSet, CHIN, LEFT_EYE_OUTER, NOSE_TIP, RIGHT_EYE_OUTER,
};
use crate::report::BehaviorReport;
use crate::state::BehaviorState;
use crate::BehaviorError;
use serde::{Deserialize, Serialize};
use tracing::warn;
use video_frame::VideoFrame;

/// Per-frame scene classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameClass {
    NoFace,
    MultipleFaces,
    SingleFace,
}

/// Result of analyzing one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Scene classification for this frame
    pub classification: FrameClass,
    /// Number of faces the provider reported
    pub face_count: usize,
    /// Gaze-away heuristic fired (single-face frames only)
    pub looking_away: bool,
    /// Head-movement scalar added to the session accumulator
    pub head_movement: f32,
}

impl FrameAnalysis {
    fn no_face() -> Self {
        Self {
            classification: FrameClass::NoFace,
            face_count: 0,
            looking_away: false,
            head_movement: 0.0,
        }
    }

    fn multiple_faces(face_count: usize) -> Self {
        Self {
            classification: FrameClass::MultipleFaces,
            face_count,
            looking_away: false,
            head_movement: 0.0,
        }
    }

    fn single_face(looking_away: bool, head_movement: f32) -> Self {
        Self {
            classification: FrameClass::SingleFace,
            face_count: 1,
            looking_away,
            head_movement,
        }
    }
}

/// Per-session frame analyzer.
///
/// Owns the session's [`BehaviorState`] and landmark provider. `analyze`
/// takes `&mut self`, so calls against one session are serialized by the
/// borrow system, and the provider instance is never shared across sessions.
pub struct BehaviorAnalyzer {
    config: BehaviorConfig,
    provider: Box<dyn LandmarkProvider + Send>,
    state: BehaviorState,
}

impl BehaviorAnalyzer {
    /// Create an analyzer backed by the ONNX face mesh detector
    pub fn new(config: BehaviorConfig) -> Result<Self, BehaviorError> {
        let provider = Box::new(FaceMeshDetector::new(&config)?);
        Ok(Self::with_provider(config, provider))
    }

    /// Create an analyzer with an injected landmark provider
    pub fn with_provider(
        config: BehaviorConfig,
        provider: Box<dyn LandmarkProvider + Send>,
    ) -> Self {
        Self {
            config,
            provider,
            state: BehaviorState::new(),
        }
    }

    /// Analyze a single frame and fold the outcome into the session state.
    ///
    /// Malformed frames are rejected before any counter is touched; every
    /// frame that reaches the provider counts toward `frames_analyzed`,
    /// including frames the provider fails on (those are tracked in their
    /// own counter, never folded into `no_face_frames`).
    pub fn analyze(&mut self, frame: &VideoFrame) -> Result<FrameAnalysis, BehaviorError> {
        frame.validate()?;

        self.state.frames_analyzed += 1;

        let faces = match self.provider.detect(frame) {
            Ok(faces) => faces,
            Err(err) => {
                self.state.detector_failure_frames += 1;
                warn!("Landmark detection failed on frame {}: {}", frame.sequence, err);
                return Err(err);
            }
        };

        if faces.is_empty() {
            self.state.no_face_frames += 1;
            return Ok(FrameAnalysis::no_face());
        }

        if faces.len() > 1 {
            self.state.multiple_faces_frames += 1;
            return Ok(FrameAnalysis::multiple_faces(faces.len()));
        }

        // Exactly one face: derive both signals before mutating anything, so
        // a contract-violating landmark set cannot leave a partial update.
        let landmarks = &faces[0];
        let (looking_away, head_movement) =
            match frame_signals(landmarks, self.config.gaze_away_threshold) {
                Ok(signals) => signals,
                Err(err) => {
                    self.state.detector_failure_frames += 1;
                    warn!("Landmark set unusable on frame {}: {}", frame.sequence, err);
                    return Err(err);
                }
            };

        if looking_away {
            self.state.look_away_frames += 1;
        }
        self.state.head_movement_accumulator += head_movement as f64;

        Ok(FrameAnalysis::single_face(looking_away, head_movement))
    }

    /// Read-only view of the session aggregate
    pub fn state(&self) -> &BehaviorState {
        &self.state
    }

    /// Generate a report from the current state snapshot
    pub fn report(&self) -> BehaviorReport {
        BehaviorReport::generate(&self.state)
    }
}

fn frame_signals(
    landmarks: &LandmarkSet,
    gaze_threshold: f32,
) -> Result<(bool, f32), BehaviorError> {
    Ok((
        is_looking_away(landmarks, gaze_threshold)?,
        head_movement(landmarks)?,
    ))
}

/// Gaze-away heuristic from projected inter-eye distance.
///
/// As the head yaws away from the camera, the eye corners' apparent
/// horizontal separation shrinks, so a separation below the threshold is
/// read as looking away. This is a coarse proxy, not gaze estimation: it
/// misreads large lateral translation as aversion and cannot see
/// vertical-only aversion.
fn is_looking_away(landmarks: &LandmarkSet, threshold: f32) -> Result<bool, BehaviorError> {
    let left_eye = landmarks.point(LEFT_EYE_OUTER)?;
    let right_eye = landmarks.point(RIGHT_EYE_OUTER)?;

    Ok((left_eye.x - right_eye.x).abs() < threshold)
}

/// Head-movement scalar for one frame: the projected nose-to-chin distance.
///
/// Summed across the session, this tracks in-frame face elongation rather
/// than frame-to-frame motion. The formula is kept as-is deliberately; see
/// DESIGN.md before changing it.
fn head_movement(landmarks: &LandmarkSet) -> Result<f32, BehaviorError> {
    let nose_tip = landmarks.point(NOSE_TIP)?;
    let chin = landmarks.point(CHIN)?;

    Ok((nose_tip.y - chin.y).abs())
}
