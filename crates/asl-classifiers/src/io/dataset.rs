//! Dataset files.
//!
//! JSON datasets carry three entries: `X` (N x D feature matrix), `y`
//! (N label indices) and `label_mapping` (letter -> index). CSV/TSV datasets
//! have a `label` column with the letter token and one column per feature;
//! indices are assigned to the sorted distinct tokens.
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data_handling::{FeatureMatrix, LabeledDataset};
use crate::labels::LabelMapping;

#[derive(Serialize, Deserialize)]
struct DatasetFile {
    #[serde(rename = "X")]
    x: Vec<Vec<f32>>,
    y: Vec<usize>,
    label_mapping: LabelMapping,
}

/// Read a dataset, picking the format from the file extension.
pub fn read_dataset<P: AsRef<Path>>(path: P) -> Result<LabeledDataset> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    match ext.as_deref() {
        Some("json") => read_dataset_json(path),
        Some("csv") => read_dataset_csv(path, b','),
        Some("tsv") => read_dataset_csv(path, b'\t'),
        _ => bail!(
            "Dataset must have a .json, .csv or .tsv extension: {}",
            path.display()
        ),
    }
}

pub fn read_dataset_json<P: AsRef<Path>>(path: P) -> Result<LabeledDataset> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open dataset: {}", path.display()))?;
    let raw: DatasetFile = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse dataset: {}", path.display()))?;

    let features = FeatureMatrix::from_rows(raw.x)?;
    let dataset = LabeledDataset::new(features, raw.y, raw.label_mapping)?;
    log::info!("Loaded {} samples from {}", dataset.len(), path.display());
    Ok(dataset)
}

pub fn read_dataset_csv<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<LabeledDataset> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open dataset: {}", path.display()))?;

    let headers = reader
        .headers()
        .context("Failed to read dataset header row")?
        .clone();
    let label_idx = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("label"))
        .ok_or_else(|| anyhow!("Missing 'label' column in {}", path.display()))?;

    let mut tokens = Vec::new();
    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read record {}", line + 1))?;
        let mut row = Vec::with_capacity(record.len().saturating_sub(1));
        for (col, field) in record.iter().enumerate() {
            if col == label_idx {
                continue;
            }
            let value: f32 = field.trim().parse().with_context(|| {
                format!(
                    "Invalid value '{}' in column '{}' of record {}",
                    field,
                    headers.get(col).unwrap_or("?"),
                    line + 1
                )
            })?;
            row.push(value);
        }
        tokens.push(record.get(label_idx).unwrap_or_default().trim().to_string());
        rows.push(row);
    }

    let label_mapping = LabelMapping::from_tokens(tokens.iter().cloned())?;
    let labels = tokens
        .iter()
        .map(|t| {
            label_mapping
                .index_of(t)
                .ok_or_else(|| anyhow!("Unmapped label '{}'", t))
        })
        .collect::<Result<Vec<usize>>>()?;

    let dataset = LabeledDataset::new(FeatureMatrix::from_rows(rows)?, labels, label_mapping)?;
    log::info!("Loaded {} samples from {}", dataset.len(), path.display());
    Ok(dataset)
}

pub fn write_dataset_json<P: AsRef<Path>>(path: P, dataset: &LabeledDataset) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create dataset file: {}", path.display()))?;
    let raw = DatasetFile {
        x: dataset.features.to_rows(),
        y: dataset.labels.clone(),
        label_mapping: dataset.label_mapping.clone(),
    };
    serde_json::to_writer(BufWriter::new(file), &raw)
        .with_context(|| format!("Failed to write dataset: {}", path.display()))?;
    Ok(())
}
