//! Readers and writers for labelled landmark datasets.
pub mod dataset;

pub use dataset::{read_dataset, read_dataset_csv, read_dataset_json, write_dataset_json};
