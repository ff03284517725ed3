//! On-disk result archives.
//!
//! Archives are bincode-encoded [`DmdArchive`] values. Floats are stored as
//! raw IEEE-754 doubles, so a save/load round trip is bit-identical.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineOutput;
use crate::types::{PipelineError, C64};

/// Tag written at the start of every archive.
pub const ARCHIVE_MAGIC: &str = "exodus-dmd";
/// Current archive layout version.
pub const ARCHIVE_VERSION: u32 = 1;
/// File extension used by [`archive_path`].
pub const ARCHIVE_EXTENSION: &str = "dmd";

/// Dense row-major array with an explicit shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArray<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

impl<T: Copy> StoredArray<T> {
    pub fn vector(values: &[T]) -> Self {
        Self {
            shape: vec![values.len()],
            data: values.to_vec(),
        }
    }

    /// Pack `rows` (each of length `cols`) row-major.
    pub fn from_rows(rows: &[Vec<T>], cols: usize) -> Result<Self, PipelineError> {
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(PipelineError::ShapeMismatch(format!(
                    "row {i} has {} columns, expected {cols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            shape: vec![rows.len(), cols],
            data,
        })
    }

    /// Unpack a 2-D array back into rows.
    pub fn to_rows(&self) -> Result<Vec<Vec<T>>, PipelineError> {
        match self.shape.as_slice() {
            [_, 0] => Ok(vec![Vec::new(); self.shape[0]]),
            [_, cols] => Ok(self.data.chunks(*cols).map(<[T]>::to_vec).collect()),
            other => Err(PipelineError::ShapeMismatch(format!(
                "expected a 2-D array, got shape {other:?}"
            ))),
        }
    }
}

/// Persisted result set of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmdArchive {
    pub magic: String,
    pub version: u32,
    pub rank: usize,
    pub times: StoredArray<f64>,
    pub transformed_timeseries: StoredArray<C64>,
    pub time_derivatives: StoredArray<C64>,
    pub dmd_modes: StoredArray<C64>,
    pub dmd_eigs: StoredArray<C64>,
}

impl DmdArchive {
    pub fn from_output(output: &PipelineOutput) -> Result<Self, PipelineError> {
        let rank = output.rank;
        Ok(Self {
            magic: ARCHIVE_MAGIC.to_string(),
            version: ARCHIVE_VERSION,
            rank,
            times: StoredArray::vector(&output.times),
            transformed_timeseries: StoredArray::from_rows(
                &output.transformed_timeseries,
                rank.saturating_sub(1),
            )?,
            time_derivatives: StoredArray::from_rows(&output.time_derivatives, rank)?,
            dmd_modes: StoredArray::from_rows(&output.dmd_modes, rank)?,
            dmd_eigs: StoredArray::vector(&output.dmd_eigs),
        })
    }

    fn check_header(&self) -> Result<(), PipelineError> {
        if self.magic != ARCHIVE_MAGIC {
            return Err(PipelineError::Format(format!(
                "unexpected tag `{}`",
                self.magic
            )));
        }
        if self.version != ARCHIVE_VERSION {
            return Err(PipelineError::Format(format!(
                "version {} is not supported (expected {ARCHIVE_VERSION})",
                self.version
            )));
        }
        Ok(())
    }
}

/// `<output>_rank_<rank>.dmd`
pub fn archive_path(output: &Path, rank: usize) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(format!("_rank_{rank}.{ARCHIVE_EXTENSION}"));
    PathBuf::from(name)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}

fn serde_error(err: impl ToString) -> PipelineError {
    PipelineError::Serialization(err.to_string())
}

/// Write an archive atomically: encode into a sibling temporary file, sync,
/// then rename over `path`.
pub fn save_archive(archive: &DmdArchive, path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    let written = write_archive(archive, &tmp)
        .and_then(|()| fs::rename(&tmp, path).map_err(PipelineError::from));
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    } else {
        tracing::info!(path = %path.display(), rank = archive.rank, "saved archive");
    }
    written
}

fn write_archive(archive: &DmdArchive, path: &Path) -> Result<(), PipelineError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, archive).map_err(serde_error)?;
    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

/// Read an archive written by [`save_archive`].
pub fn load_archive(path: &Path) -> Result<DmdArchive, PipelineError> {
    let file = File::open(path)?;
    let archive: DmdArchive =
        bincode::deserialize_from(BufReader::new(file)).map_err(serde_error)?;
    archive.check_header()?;
    Ok(archive)
}
