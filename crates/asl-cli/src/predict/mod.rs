pub mod input;

use std::sync::Arc;

use anyhow::Result;

use asl_classifiers::landmarks::HandLandmarks;
use asl_classifiers::registry::ModelRegistry;
use asl_classifiers::router::{FailureResponse, PredictionResult, PredictionRouter};

use input::{read_landmarks, PredictConfig};

/// Bootstrap the registry and route one landmark file. The outer error
/// covers unreadable input; the inner one is the response a server would
/// send back.
pub fn run_prediction(
    config: &PredictConfig,
) -> Result<std::result::Result<PredictionResult, FailureResponse>> {
    let hand = match read_landmarks(&config.landmarks_file)?
        .map(HandLandmarks::try_from)
        .transpose()
    {
        Ok(hand) => hand,
        Err(e) => return Ok(Err(FailureResponse::from(e))),
    };
    let registry = ModelRegistry::bootstrap(&config.registry);
    let router = PredictionRouter::new(Arc::new(registry));
    Ok(router.respond(hand.as_ref(), config.model_key.as_deref()))
}
