//! TOML configuration for pipeline runs.
//!
//! ```toml
//! [pipeline]
//! rank = 10
//! singular_tol = 1e-10
//! order = "magnitude"
//!
//! [fields]
//! time = "time_whole"
//! components = ["vals_nod_var1", "vals_nod_var2"]
//! ```

use std::path::Path;

use anyhow::Context;
use exodus_dmd::{FieldNames, PipelineConfig};
use serde::Deserialize;

/// Top-level job configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub pipeline: PipelineConfig,
    pub fields: FieldNames,
}

pub fn load_config(path: &Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: JobConfig =
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

/// Config file (or defaults) with command-line overrides applied.
pub fn resolve(path: Option<&Path>, rank: Option<usize>) -> anyhow::Result<JobConfig> {
    let mut job = match path {
        Some(p) => load_config(p)?,
        None => JobConfig::default(),
    };
    if let Some(r) = rank {
        job.pipeline.rank = r;
    }
    Ok(job)
}
