//! Session behavior report generation

use crate::state::BehaviorState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Look-away fraction above which a session is flagged for review
pub const LOOK_AWAY_FLAG_RATIO: f64 = 0.3;

/// Session-level behavior summary.
///
/// An immutable snapshot; generating a report does not touch the state it
/// was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorReport {
    /// Whole seconds elapsed since session start
    pub duration_seconds: i64,
    /// Frames processed by the analyzer
    pub frames_analyzed: u64,
    /// Fraction of frames with no face, rounded to 3 decimals
    pub no_face_ratio: f64,
    /// Fraction of frames with several faces, rounded to 3 decimals
    pub multiple_faces_ratio: f64,
    /// Fraction of frames flagged looking-away, rounded to 3 decimals
    pub look_away_ratio: f64,
    /// Accumulated head-movement scalar, rounded to 2 decimals
    pub head_movement_score: f64,
    /// Frames lost to landmark provider failures
    pub detector_failure_frames: u64,
    /// True when look-away frames exceed [`LOOK_AWAY_FLAG_RATIO`] of the total
    pub behavior_flag: bool,
}

impl BehaviorReport {
    /// Generate a report as of the current wall-clock time
    pub fn generate(state: &BehaviorState) -> Self {
        Self::generate_at(state, Utc::now())
    }

    /// Generate a report as of `now`. Pure: identical inputs produce
    /// identical reports.
    pub fn generate_at(state: &BehaviorState, now: DateTime<Utc>) -> Self {
        // Ratio floor only; a zero-frame session still yields a fully
        // defined report with all ratios at 0.0.
        let total_frames = state.frames_analyzed.max(1) as f64;

        Self {
            duration_seconds: (now - state.started_at).num_seconds().max(0),
            frames_analyzed: state.frames_analyzed,
            no_face_ratio: round_to(state.no_face_frames as f64 / total_frames, 3),
            multiple_faces_ratio: round_to(state.multiple_faces_frames as f64 / total_frames, 3),
            look_away_ratio: round_to(state.look_away_frames as f64 / total_frames, 3),
            head_movement_score: round_to(state.head_movement_accumulator, 2),
            detector_failure_frames: state.detector_failure_frames,
            // Strict: a session at exactly the threshold is not flagged
            behavior_flag: state.look_away_frames as f64 > LOOK_AWAY_FLAG_RATIO * total_frames,
        }
    }
}

fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn state_with(
        frames_analyzed: u64,
        no_face_frames: u64,
        multiple_faces_frames: u64,
        look_away_frames: u64,
        head_movement_accumulator: f64,
    ) -> BehaviorState {
        BehaviorState {
            frames_analyzed,
            no_face_frames,
            multiple_faces_frames,
            look_away_frames,
            detector_failure_frames: 0,
            head_movement_accumulator,
            started_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_session_report() {
        let state = BehaviorState::new();
        let report = BehaviorReport::generate(&state);

        assert_eq!(report.frames_analyzed, 0);
        assert_eq!(report.no_face_ratio, 0.0);
        assert_eq!(report.multiple_faces_ratio, 0.0);
        assert_eq!(report.look_away_ratio, 0.0);
        assert_eq!(report.head_movement_score, 0.0);
        assert!(!report.behavior_flag);
        assert!(report.duration_seconds >= 0);
    }

    #[test]
    fn test_idempotent_for_fixed_instant() {
        let state = state_with(10, 2, 1, 4, 0.73);
        let now = state.started_at + Duration::seconds(42);

        let first = BehaviorReport::generate_at(&state, now);
        let second = BehaviorReport::generate_at(&state, now);
        assert_eq!(first, second);
    }

    #[test]
    fn test_duration_floors_to_whole_seconds() {
        let state = BehaviorState::new();

        let now = state.started_at + Duration::milliseconds(5500);
        assert_eq!(BehaviorReport::generate_at(&state, now).duration_seconds, 5);

        // A clock stepping backwards never yields a negative duration
        let before = state.started_at - Duration::seconds(3);
        assert_eq!(BehaviorReport::generate_at(&state, before).duration_seconds, 0);
    }

    #[test]
    fn test_ratio_rounding() {
        let state = state_with(3, 1, 0, 2, 0.123);
        let report = BehaviorReport::generate(&state);

        assert_eq!(report.no_face_ratio, 0.333);
        assert_eq!(report.look_away_ratio, 0.667);
        assert_eq!(report.head_movement_score, 0.12);
    }

    #[test]
    fn test_flag_threshold_is_strict() {
        let at_threshold = state_with(10, 0, 0, 3, 0.0);
        assert!(!BehaviorReport::generate(&at_threshold).behavior_flag);

        let over_threshold = state_with(10, 0, 0, 4, 0.0);
        assert!(BehaviorReport::generate(&over_threshold).behavior_flag);
    }
}
