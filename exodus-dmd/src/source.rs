//! Readers for simulation output.
//!
//! Variable names follow the Exodus II conventions: `time_whole` holds the
//! sample times, `vals_nod_var<N>` the nodal variables and `coordx`/`coordy`
//! the node coordinates.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::field::VelocityField;
use crate::types::PipelineError;

/// Dense row-major array read from a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldArray {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl FieldArray {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self, PipelineError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(PipelineError::ShapeMismatch(format!(
                "shape {shape:?} needs {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }
}

/// Access to named arrays and node coordinates of one simulation output.
pub trait FieldSource {
    /// Read a whole variable.
    fn read_field(&self, name: &str) -> Result<FieldArray, PipelineError>;

    /// Node coordinates (x, y), one pair per node.
    fn read_coordinates(&self) -> Result<Vec<[f64; 2]>, PipelineError> {
        let x = self.read_field("coordx")?;
        let y = self.read_field("coordy")?;
        if x.data.len() != y.data.len() {
            return Err(PipelineError::ShapeMismatch(format!(
                "coordx has {} entries, coordy has {}",
                x.data.len(),
                y.data.len()
            )));
        }
        Ok(x.data.iter().zip(&y.data).map(|(&x, &y)| [x, y]).collect())
    }
}

/// Variable names used to assemble a velocity field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub time: String,
    pub components: Vec<String>,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            time: "time_whole".into(),
            components: vec!["vals_nod_var1".into(), "vals_nod_var2".into()],
        }
    }
}

/// Read sample times and velocity components and stack them into a field.
///
/// Components of shape `(num_times, num_nodes)` are stacked along a trailing
/// component axis. A 1-D component is a single snapshot of `num_nodes` values.
pub fn load_velocity_field<S: FieldSource + ?Sized>(
    source: &S,
    names: &FieldNames,
) -> Result<VelocityField, PipelineError> {
    if names.components.is_empty() {
        return Err(PipelineError::ShapeMismatch(
            "no velocity components requested".into(),
        ));
    }
    let times = source.read_field(&names.time)?;
    if times.ndim() > 1 {
        return Err(PipelineError::ShapeMismatch(format!(
            "`{}` must be 1-D, got shape {:?}",
            names.time, times.shape
        )));
    }

    let mut components = Vec::with_capacity(names.components.len());
    let mut layout: Option<(usize, usize)> = None;
    for name in &names.components {
        let arr = source.read_field(name)?;
        let dims = match arr.shape.as_slice() {
            [nodes] => (1, *nodes),
            [t, nodes] => (*t, *nodes),
            other => {
                return Err(PipelineError::ShapeMismatch(format!(
                    "`{name}` has shape {other:?}, expected (times, nodes) or (nodes,)"
                )))
            }
        };
        match layout {
            Some(prev) if prev != dims => {
                return Err(PipelineError::ShapeMismatch(format!(
                    "`{name}` has shape {dims:?}, previous components have {prev:?}"
                )))
            }
            _ => layout = Some(dims),
        }
        components.push(arr.data);
    }

    let (num_times, num_nodes) = layout.unwrap_or((0, 0));
    // A single-snapshot field keeps the final sample time
    let times = if num_times == 1 && times.data.len() > 1 {
        times.data[times.data.len() - 1..].to_vec()
    } else {
        times.data
    };
    if times.len() != num_times {
        return Err(PipelineError::ShapeMismatch(format!(
            "`{}` has {} entries but velocity components have {num_times} time samples",
            names.time,
            times.len()
        )));
    }

    tracing::info!(
        times = num_times,
        nodes = num_nodes,
        components = components.len(),
        "loaded velocity field"
    );
    VelocityField::from_components(times, num_nodes, &components)
}

/// Named arrays held in memory, loadable from a JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemorySource {
    pub fields: HashMap<String, FieldArray>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a variable.
    pub fn insert(&mut self, name: impl Into<String>, array: FieldArray) {
        self.fields.insert(name.into(), array);
    }

    /// Load `{"fields": {"name": {"shape": [...], "data": [...]}}}`.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let file = File::open(path.as_ref())?;
        let source: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| PipelineError::Source(e.to_string()))?;
        for (name, arr) in &source.fields {
            let expected: usize = arr.shape.iter().product();
            if expected != arr.data.len() {
                return Err(PipelineError::ShapeMismatch(format!(
                    "`{name}`: shape {:?} needs {expected} values, got {}",
                    arr.shape,
                    arr.data.len()
                )));
            }
        }
        Ok(source)
    }
}

impl FieldSource for InMemorySource {
    fn read_field(&self, name: &str) -> Result<FieldArray, PipelineError> {
        self.fields
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::MissingField(name.to_string()))
    }
}
