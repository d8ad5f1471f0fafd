//! asl-classifiers: letter-range specialised classifiers for ASL hand signs.
//!
//! A labelled landmark dataset is split into contiguous letter ranges, one
//! random-forest classifier is trained per range (plus a general one), and
//! inference requests are routed to the matching specialised model with a
//! fallback to the general model.
//!
//! Hand-pose estimation and image decoding live outside this crate; they
//! plug in through [`landmarks::HandDetector`] and
//! [`landmarks::LandmarkNormalizer`].
pub mod config;
pub mod data_handling;
pub mod error;
pub mod io;
pub mod labels;
pub mod landmarks;
pub mod letter_range;
pub mod models;
pub mod registry;
pub mod router;
pub mod stats;
pub mod training;

pub use error::{AslError, Result};
