//! netCDF-backed reader for Exodus II files.

use std::path::{Path, PathBuf};

use crate::source::{FieldArray, FieldSource};
use crate::types::PipelineError;

/// An open Exodus II file.
pub struct ExodusFile {
    path: PathBuf,
    file: netcdf::File,
}

impl ExodusFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref().to_path_buf();
        let file = netcdf::open(&path)
            .map_err(|e| PipelineError::Source(format!("{}: {e}", path.display())))?;
        Ok(Self { path, file })
    }
}

impl FieldSource for ExodusFile {
    fn read_field(&self, name: &str) -> Result<FieldArray, PipelineError> {
        let var = self
            .file
            .variable(name)
            .ok_or_else(|| {
                PipelineError::MissingField(format!("{name} in {}", self.path.display()))
            })?;
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let data = var
            .get_values::<f64, _>(..)
            .map_err(|e| {
                PipelineError::Source(format!("{}: reading `{name}`: {e}", self.path.display()))
            })?;
        tracing::debug!(name, ?shape, "read Exodus variable");
        FieldArray::new(shape, data)
    }
}
