//! Hand landmarks and the normalisation contract shared by training and
//! inference.
//!
//! Landmark extraction itself (the hand-pose estimator) is external; it is
//! represented by the [`HandDetector`] trait.
use serde::{Deserialize, Serialize};

use crate::error::{AslError, Result};

/// Number of tracked points per detected hand.
pub const NUM_HAND_LANDMARKS: usize = 21;

/// Length of the flattened feature vector produced by the default normaliser.
pub const FEATURE_LEN: usize = NUM_HAND_LANDMARKS * 3;

pub const WRIST: usize = 0;
pub const MIDDLE_MCP: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    fn sub(&self, other: &Landmark) -> Landmark {
        Landmark::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// The 21 landmarks of one detected hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<[f32; 3]>", into = "Vec<[f32; 3]>")]
pub struct HandLandmarks {
    points: Vec<Landmark>,
}

impl HandLandmarks {
    pub fn new(points: Vec<Landmark>) -> Result<Self> {
        if points.len() != NUM_HAND_LANDMARKS {
            return Err(AslError::InvalidLandmarks(format!(
                "expected {} landmarks, got {}",
                NUM_HAND_LANDMARKS,
                points.len()
            )));
        }
        if points
            .iter()
            .any(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            return Err(AslError::InvalidLandmarks(
                "landmark coordinates must be finite".to_string(),
            ));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }
}

impl TryFrom<Vec<[f32; 3]>> for HandLandmarks {
    type Error = AslError;

    fn try_from(raw: Vec<[f32; 3]>) -> Result<Self> {
        HandLandmarks::new(raw.into_iter().map(|[x, y, z]| Landmark::new(x, y, z)).collect())
    }
}

impl From<HandLandmarks> for Vec<[f32; 3]> {
    fn from(hand: HandLandmarks) -> Self {
        hand.points.iter().map(|p| [p.x, p.y, p.z]).collect()
    }
}

/// Turns raw keypoints into the feature vector a classifier consumes. The
/// same implementation must be used to build training data and at inference.
pub trait LandmarkNormalizer: Send + Sync {
    fn normalize(&self, hand: &HandLandmarks) -> Vec<f32>;

    fn feature_len(&self) -> usize {
        FEATURE_LEN
    }
}

/// Centre on the wrist, scale by the wrist to middle-finger MCP distance,
/// flatten row-major to 63 values.
#[derive(Debug, Clone, Copy, Default)]
pub struct WristScaleNormalizer;

impl LandmarkNormalizer for WristScaleNormalizer {
    fn normalize(&self, hand: &HandLandmarks) -> Vec<f32> {
        let wrist = hand.points[WRIST];
        let centered: Vec<Landmark> = hand.points.iter().map(|p| p.sub(&wrist)).collect();

        let scale = centered[MIDDLE_MCP].norm();
        let scale = if scale > 0.0 { scale } else { 1.0 };

        centered
            .iter()
            .flat_map(|p| [p.x / scale, p.y / scale, p.z / scale])
            .collect()
    }
}

/// External hand-pose estimator. `Ok(None)` means no hand was detected.
pub trait HandDetector {
    type Input: ?Sized;

    fn detect(&self, input: &Self::Input) -> anyhow::Result<Option<HandLandmarks>>;
}
