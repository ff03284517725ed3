//! CSV export of real-valued nodal fields for external plotting.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::types::PipelineError;

/// Named scalar field with one value per node.
#[derive(Debug, Clone)]
pub struct NodalField {
    pub name: String,
    pub values: Vec<f64>,
}

impl NodalField {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Write `x,y,<field>...` with one row per node.
pub fn write_field_csv(
    path: &Path,
    coords: &[[f64; 2]],
    fields: &[NodalField],
) -> Result<(), PipelineError> {
    for field in fields {
        if field.values.len() != coords.len() {
            return Err(PipelineError::ShapeMismatch(format!(
                "field `{}` has {} values for {} nodes",
                field.name,
                field.values.len(),
                coords.len()
            )));
        }
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "# exodus-dmd {}", env!("CARGO_PKG_VERSION"))?;
    write!(file, "x,y")?;
    for field in fields {
        write!(file, ",{}", field.name)?;
    }
    writeln!(file)?;

    for (node, [x, y]) in coords.iter().enumerate() {
        write!(file, "{x:.10e},{y:.10e}")?;
        for field in fields {
            write!(file, ",{:.10e}", field.values[node])?;
        }
        writeln!(file)?;
    }
    file.flush()?;
    tracing::info!(path = %path.display(), nodes = coords.len(), fields = fields.len(), "wrote field CSV");
    Ok(())
}
