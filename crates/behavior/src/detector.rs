//! Face mesh landmark detection

use crate::landmarks::{LandmarkProvider, Landmark, LandmarkSet, MESH_POINT_COUNT};
use crate::{BehaviorConfig, BehaviorError};
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::collections::VecDeque;
use tracing::{error, info, warn};
use video_frame::VideoFrame;

/// Square input edge expected by the face mesh model
const MESH_INPUT_SIZE: u32 = 192;

/// Face mesh detector backed by an ONNX runtime session.
///
/// Without a configured model the detector yields a deterministic frontal
/// face so the rest of the pipeline stays exercisable on machines without
/// the model weights.
pub struct FaceMeshDetector {
    min_confidence: f32,
    session: Option<Session>,
}

impl FaceMeshDetector {
    pub fn new(config: &BehaviorConfig) -> Result<Self, BehaviorError> {
        let session = match &config.model_path {
            Some(path) => {
                info!("Loading face mesh model from {}", path);
                let session = Session::builder()
                    .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
                    .and_then(|b| b.commit_from_file(path))
                    .map_err(|e| {
                        error!("Failed to load face mesh model: {}", e);
                        BehaviorError::ModelLoad(e.to_string())
                    })?;
                Some(session)
            }
            None => {
                warn!("No face mesh model configured. Using synthetic detector output.");
                None
            }
        };

        Ok(Self {
            min_confidence: config.min_face_confidence,
            session,
        })
    }

    fn run_mesh(&self, session: &Session, frame: &VideoFrame) -> Result<Vec<LandmarkSet>, BehaviorError> {
        // 1. Preprocess: resize to the model's square input
        let img = image::ImageBuffer::<image::Rgb<u8>, _>::from_raw(
            frame.width,
            frame.height,
            frame.data.as_slice(),
        )
        .ok_or_else(|| {
            BehaviorError::ImageProcessing("pixel buffer does not match frame dimensions".into())
        })?;

        let resized = image::imageops::resize(
            &img,
            MESH_INPUT_SIZE,
            MESH_INPUT_SIZE,
            image::imageops::FilterType::Triangle,
        );

        // 2. Normalize to [0,1] and build the NCHW tensor
        let side = MESH_INPUT_SIZE as usize;
        let mut input = Array4::<f32>::zeros((1, 3, side, side));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        // 3. Inference
        let outputs = session
            .run(ort::inputs![input].map_err(|e| BehaviorError::Inference(e.to_string()))?)
            .map_err(|e| BehaviorError::Inference(e.to_string()))?;

        // 4. Post-process: output 1 is the face presence score, output 0 the
        // mesh points as (x, y, z) in input-pixel coordinates
        let score = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| BehaviorError::Inference(e.to_string()))?
            .iter()
            .copied()
            .next()
            .unwrap_or(0.0);

        if score < self.min_confidence {
            return Ok(Vec::new());
        }

        let coords = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| BehaviorError::Inference(e.to_string()))?
            .iter()
            .copied()
            .collect::<Vec<f32>>();

        let scale = MESH_INPUT_SIZE as f32;
        let points = coords
            .chunks(3)
            .take(MESH_POINT_COUNT)
            .map(|xyz| Landmark {
                x: xyz[0] / scale,
                y: xyz[1] / scale,
            })
            .collect();

        Ok(vec![LandmarkSet::new(points)])
    }
}

impl LandmarkProvider for FaceMeshDetector {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<LandmarkSet>, BehaviorError> {
        match &self.session {
            Some(session) => self.run_mesh(session, frame),
            // Synthetic frontal face when no model is configured
            None => Ok(vec![LandmarkSet::synthetic_face(0.16, 0.12)]),
        }
    }
}

/// Deterministic landmark provider for tests and offline replay.
///
/// Yields one scripted detection result per call, then an empty scene once
/// the script is exhausted.
pub struct ScriptedProvider {
    script: VecDeque<Vec<LandmarkSet>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Vec<LandmarkSet>>) -> Self {
        Self {
            script: script.into(),
        }
    }

    /// Scripted results not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl LandmarkProvider for ScriptedProvider {
    fn detect(&mut self, _frame: &VideoFrame) -> Result<Vec<LandmarkSet>, BehaviorError> {
        Ok(self.script.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> VideoFrame {
        VideoFrame::new(vec![0; 4 * 4 * 3], 4, 4, 0, 0)
    }

    #[test]
    fn test_modelless_detector_yields_one_face() {
        let mut detector = FaceMeshDetector::new(&BehaviorConfig::default()).unwrap();
        let faces = detector.detect(&frame()).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].len(), MESH_POINT_COUNT);
    }

    #[test]
    fn test_scripted_provider_plays_in_order() {
        let mut provider = ScriptedProvider::new(vec![
            vec![],
            vec![LandmarkSet::synthetic_face(0.16, 0.12)],
        ]);

        assert!(provider.detect(&frame()).unwrap().is_empty());
        assert_eq!(provider.detect(&frame()).unwrap().len(), 1);
        assert_eq!(provider.remaining(), 0);
        // Exhausted scripts read as empty scenes
        assert!(provider.detect(&frame()).unwrap().is_empty());
    }
}
