//! Behavior analyzer configuration

use serde::{Deserialize, Serialize};

/// Analyzer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Inter-eye x-distance below which a frame counts as looking away
    pub gaze_away_threshold: f32,

    /// Minimum face presence score accepted from the mesh model
    pub min_face_confidence: f32,

    /// Face mesh model path (synthetic detector output when unset)
    pub model_path: Option<String>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            gaze_away_threshold: 0.03,
            min_face_confidence: 0.5,
            model_path: None,
        }
    }
}

impl BehaviorConfig {
    /// Create strict config (flags mild aversion)
    pub fn strict() -> Self {
        Self {
            gaze_away_threshold: 0.05,
            ..Default::default()
        }
    }

    /// Create lenient config (flags only strong aversion)
    pub fn lenient() -> Self {
        Self {
            gaze_away_threshold: 0.02,
            ..Default::default()
        }
    }
}
