//! Run configuration loading.

use anyhow::{Context, Result};
use jc_pipeline::PipelineConfig;
use std::path::Path;

/// Read a pipeline configuration. `.json` files are parsed as JSON, anything
/// else as YAML. The result is validated before it is returned.
pub fn read_pipeline_config(path: &Path) -> Result<PipelineConfig> {
    let bytes = std::fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let cfg: PipelineConfig = if ext == "json" {
        serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?
    } else {
        serde_yaml_ng::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?
    };
    cfg.validate().with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
