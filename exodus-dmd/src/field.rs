//! Nodal velocity fields and their flattening into snapshot matrices.
//!
//! A field is stored `(time, node, component)` with components varying
//! fastest. The same layout fixes the row of each `(node, component)` pair in
//! the snapshot matrix, see [`snapshot_row`].

use faer::Mat;

use crate::types::{DmdResult, PipelineError};

/// Row of the snapshot matrix holding `component` of `node`.
///
/// Components vary fastest: node 0 occupies rows `0..num_components`, node 1
/// the next `num_components` rows, and so on.
#[inline]
pub fn snapshot_row(node: usize, component: usize, num_components: usize) -> usize {
    node * num_components + component
}

/// Time-resolved nodal vector field.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityField {
    times: Vec<f64>,
    num_nodes: usize,
    num_components: usize,
    /// Row-major `(time, node, component)` values.
    data: Vec<f64>,
}

impl VelocityField {
    /// Build a field from row-major `(time, node, component)` data.
    pub fn new(
        times: Vec<f64>,
        num_nodes: usize,
        num_components: usize,
        data: Vec<f64>,
    ) -> Result<Self, PipelineError> {
        let expected = times.len() * num_nodes * num_components;
        if data.len() != expected {
            return Err(PipelineError::ShapeMismatch(format!(
                "field holds {} values, expected {} ({} times × {num_nodes} nodes × {num_components} components)",
                data.len(),
                expected,
                times.len()
            )));
        }
        if num_nodes == 0 || num_components == 0 {
            return Err(PipelineError::ShapeMismatch(
                "field needs at least one node and one component".into(),
            ));
        }
        Ok(Self {
            times,
            num_nodes,
            num_components,
            data,
        })
    }

    /// Stack per-component `(time, node)` arrays along a trailing component axis.
    pub fn from_components(
        times: Vec<f64>,
        num_nodes: usize,
        components: &[Vec<f64>],
    ) -> Result<Self, PipelineError> {
        let num_times = times.len();
        let num_components = components.len();
        for (c, comp) in components.iter().enumerate() {
            if comp.len() != num_times * num_nodes {
                return Err(PipelineError::ShapeMismatch(format!(
                    "component {c} holds {} values, expected {num_times} × {num_nodes}",
                    comp.len()
                )));
            }
        }

        let mut data = vec![0.0; num_times * num_nodes * num_components];
        for t in 0..num_times {
            for node in 0..num_nodes {
                for (c, comp) in components.iter().enumerate() {
                    let row = snapshot_row(node, c, num_components);
                    data[t * num_nodes * num_components + row] = comp[t * num_nodes + node];
                }
            }
        }
        Self::new(times, num_nodes, num_components, data)
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn num_times(&self) -> usize {
        self.times.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    /// Flattened state dimension `num_nodes × num_components`.
    pub fn state_dim(&self) -> usize {
        self.num_nodes * self.num_components
    }

    /// Value of `component` at `node` in snapshot `t`.
    pub fn value(&self, t: usize, node: usize, component: usize) -> f64 {
        self.data[t * self.state_dim() + snapshot_row(node, component, self.num_components)]
    }

    /// Snapshot matrix (state_dim × num_times); column t is snapshot t.
    pub fn to_snapshot_matrix(&self) -> Mat<f64> {
        let m = self.state_dim();
        Mat::from_fn(m, self.num_times(), |row, t| self.data[t * m + row])
    }

    /// Per-node speed ‖u‖₂ at snapshot `t`.
    pub fn velocity_magnitude(&self, t: usize) -> Vec<f64> {
        (0..self.num_nodes)
            .map(|node| {
                (0..self.num_components)
                    .map(|c| self.value(t, node, c).powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .collect()
    }

    /// One component at snapshot `t` across all nodes.
    pub fn component_field(&self, t: usize, component: usize) -> Vec<f64> {
        (0..self.num_nodes)
            .map(|node| self.value(t, node, component))
            .collect()
    }
}

/// Real part of `component` of mode `mode`, one value per node.
///
/// Inverse of the flattening done by [`VelocityField::to_snapshot_matrix`].
pub fn mode_real_field(
    result: &DmdResult,
    mode: usize,
    component: usize,
    num_components: usize,
) -> Result<Vec<f64>, PipelineError> {
    if mode >= result.rank {
        return Err(PipelineError::ShapeMismatch(format!(
            "mode {mode} out of range for rank {}",
            result.rank
        )));
    }
    if component >= num_components || result.n_vars() % num_components != 0 {
        return Err(PipelineError::ShapeMismatch(format!(
            "component {component} incompatible with {num_components} components over {} state rows",
            result.n_vars()
        )));
    }
    let num_nodes = result.n_vars() / num_components;
    Ok((0..num_nodes)
        .map(|node| result.modes[snapshot_row(node, component, num_components)][mode].re)
        .collect())
}
