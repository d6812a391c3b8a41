//! Session behavior state tracking

use chrono::{DateTime, Utc};

/// Mutable per-session aggregate, owned by exactly one analyzer.
///
/// Counters only ever increase; nothing resets or decrements them. A new
/// session requires a fresh state.
#[derive(Debug, Clone)]
pub struct BehaviorState {
    pub(crate) frames_analyzed: u64,
    pub(crate) no_face_frames: u64,
    pub(crate) multiple_faces_frames: u64,
    pub(crate) look_away_frames: u64,
    pub(crate) detector_failure_frames: u64,
    pub(crate) head_movement_accumulator: f64,
    pub(crate) started_at: DateTime<Utc>,
}

impl BehaviorState {
    /// Zero all counters and stamp the session start time
    pub fn new() -> Self {
        Self {
            frames_analyzed: 0,
            no_face_frames: 0,
            multiple_faces_frames: 0,
            look_away_frames: 0,
            detector_failure_frames: 0,
            head_movement_accumulator: 0.0,
            started_at: Utc::now(),
        }
    }

    /// Frames processed by the analyzer
    pub fn frames_analyzed(&self) -> u64 {
        self.frames_analyzed
    }

    /// Frames where no face was found
    pub fn no_face_frames(&self) -> u64 {
        self.no_face_frames
    }

    /// Frames where more than one face was found
    pub fn multiple_faces_frames(&self) -> u64 {
        self.multiple_faces_frames
    }

    /// Single-face frames where the gaze-away heuristic fired
    pub fn look_away_frames(&self) -> u64 {
        self.look_away_frames
    }

    /// Frames lost to landmark provider failures
    pub fn detector_failure_frames(&self) -> u64 {
        self.detector_failure_frames
    }

    /// Running sum of the per-frame head-movement scalar
    pub fn head_movement_accumulator(&self) -> f64 {
        self.head_movement_accumulator
    }

    /// Session start time
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Frames with exactly one face, derived from the stored counters
    pub fn single_face_frames(&self) -> u64 {
        self.frames_analyzed
            - self.no_face_frames
            - self.multiple_faces_frames
            - self.detector_failure_frames
    }
}

impl Default for BehaviorState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_zeroed() {
        let state = BehaviorState::new();
        assert_eq!(state.frames_analyzed(), 0);
        assert_eq!(state.no_face_frames(), 0);
        assert_eq!(state.multiple_faces_frames(), 0);
        assert_eq!(state.look_away_frames(), 0);
        assert_eq!(state.detector_failure_frames(), 0);
        assert_eq!(state.head_movement_accumulator(), 0.0);
        assert!(state.started_at() <= Utc::now());
    }

    #[test]
    fn test_single_face_frames_is_derived() {
        let state = BehaviorState {
            frames_analyzed: 10,
            no_face_frames: 2,
            multiple_faces_frames: 1,
            look_away_frames: 4,
            detector_failure_frames: 1,
            head_movement_accumulator: 0.0,
            started_at: Utc::now(),
        };
        assert_eq!(state.single_face_frames(), 6);
    }
}
