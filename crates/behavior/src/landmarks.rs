//! Facial landmark sets and the provider capability

use crate::BehaviorError;
use serde::{Deserialize, Serialize};
use video_frame::VideoFrame;

/// Points in a full face-mesh landmark set
pub const MESH_POINT_COUNT: usize = 468;

/// Left-eye outer corner (face-mesh canonical index)
pub const LEFT_EYE_OUTER: usize = 33;
/// Right-eye outer corner
pub const RIGHT_EYE_OUTER: usize = 263;
/// Nose tip
pub const NOSE_TIP: usize = 1;
/// Chin
pub const CHIN: usize = 152;

/// One facial keypoint, normalized to [0,1] of frame width/height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

/// Per-face collection of keypoints addressed by canonical mesh index.
///
/// The indexing scheme must be stable across calls for the whole session;
/// the analyzer relies on [`LEFT_EYE_OUTER`], [`RIGHT_EYE_OUTER`],
/// [`NOSE_TIP`] and [`CHIN`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    /// Wrap a vector of keypoints in mesh index order
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    /// Look up a keypoint by canonical index
    pub fn point(&self, index: usize) -> Result<Landmark, BehaviorError> {
        self.points
            .get(index)
            .copied()
            .ok_or(BehaviorError::LandmarkMissing(index))
    }

    /// Number of keypoints in the set
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Build a frontal face centered in the frame.
    ///
    /// `eye_span` is the horizontal eye-corner separation, `face_span` the
    /// nose-to-chin drop, both normalized. Non-canonical points sit at the
    /// frame center. Used by the modelless detector path and scripted tests.
    pub fn synthetic_face(eye_span: f32, face_span: f32) -> Self {
        let mut points = vec![Landmark { x: 0.5, y: 0.5 }; MESH_POINT_COUNT];
        points[LEFT_EYE_OUTER] = Landmark {
            x: 0.5 - eye_span / 2.0,
            y: 0.38,
        };
        points[RIGHT_EYE_OUTER] = Landmark {
            x: 0.5 + eye_span / 2.0,
            y: 0.38,
        };
        points[NOSE_TIP] = Landmark { x: 0.5, y: 0.5 };
        points[CHIN] = Landmark {
            x: 0.5,
            y: 0.5 + face_span,
        };
        Self { points }
    }
}

/// Capability the analyzer calls to obtain per-face landmark sets.
///
/// `detect` takes `&mut self`: implementations are commonly backed by
/// non-reentrant inference runtimes, so a provider instance must never be
/// invoked concurrently. Each session constructs its own provider.
pub trait LandmarkProvider {
    /// Return zero or more landmark sets for the faces in `frame`
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<LandmarkSet>, BehaviorError>;
}

impl<P: LandmarkProvider + ?Sized> LandmarkProvider for Box<P> {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<LandmarkSet>, BehaviorError> {
        (**self).detect(frame)
    }
}
