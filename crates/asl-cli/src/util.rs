use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use asl_classifiers::config::RegistryConfig;

/// Check that a dataset path exists and has an extension we can read.
pub fn validate_dataset_file(path: &str) -> Result<()> {
    let pb = PathBuf::from(path);

    let ext = pb
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    match ext.as_deref() {
        Some("json") | Some("csv") | Some("tsv") => {}
        _ => anyhow::bail!("Dataset must have a .json, .csv or .tsv extension: {}", path),
    }

    if !pb.exists() {
        anyhow::bail!("File does not exist: {}", path);
    }

    Ok(())
}

/// Registry layout from a JSON file, or the default layout under `data/`.
pub fn load_registry_config<P: AsRef<Path>>(path: Option<P>) -> Result<RegistryConfig> {
    let path = match path {
        Some(path) => path,
        None => return Ok(RegistryConfig::default()),
    };
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read registry config: {}", path.as_ref().display()))?;
    let config: RegistryConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse registry config: {}", path.as_ref().display()))?;
    Ok(config)
}
