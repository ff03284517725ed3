//! # exodus-dmd
//!
//! Dynamic Mode Decomposition of nodal velocity fields from Exodus CFD output.
//!
//! - **DMD engine** ([`compute_dmd`]): truncated-SVD DMD returning paired
//!   eigenvalues and projected modes
//! - **Pipeline** ([`run_pipeline`]): snapshot reshaping, modal projection and
//!   finite-difference time derivatives
//! - **Sources** ([`FieldSource`], [`InMemorySource`], `ExodusFile` with the
//!   `exodus` feature): named arrays and node coordinates
//! - **Archives** ([`save_archive`], [`load_archive`]): atomic, bit-exact result
//!   persistence
//! - **Export** ([`write_field_csv`]): real-valued nodal fields for plotting
//!
//! ## Quick Start
//!
//! ```rust
//! use exodus_dmd::{compute_dmd, DmdConfig};
//!
//! let n = 100;
//! let mut data = faer::Mat::<f64>::zeros(2, n);
//! for j in 0..n {
//!     let t = j as f64 * 0.1;
//!     data[(0, j)] = t.sin();
//!     data[(1, j)] = t.cos();
//! }
//!
//! let result = compute_dmd(&data, &DmdConfig::with_rank(2)).unwrap();
//! assert_eq!(result.eigenvalues.len(), 2);
//! ```
//!
//! ## References
//!
//! - Schmid (2010), *J. Fluid Mech.*, 656, 5-28
//! - Kutz et al. (2016), *Dynamic Mode Decomposition*, SIAM

pub mod types;

pub mod analysis;
pub mod archive;
pub mod dmd;
#[cfg(feature = "exodus")]
pub mod exodus;
pub mod export;
pub mod field;
pub mod pipeline;
pub mod source;
pub mod utils;

pub use analysis::{
    advance_snapshot, dmd_spectrum, eigenvalue_spectrum, mode_amplitudes, one_step_error,
};
pub use archive::{archive_path, load_archive, save_archive, DmdArchive, StoredArray};
pub use dmd::compute_dmd;
#[cfg(feature = "exodus")]
pub use exodus::ExodusFile;
pub use export::{write_field_csv, NodalField};
pub use field::{mode_real_field, snapshot_row, VelocityField};
pub use pipeline::{
    project_snapshots, run_pipeline, time_derivatives, time_steps, PipelineConfig,
    PipelineOutput, DEFAULT_RANK, MIN_SNAPSHOTS,
};
pub use source::{load_velocity_field, FieldArray, FieldNames, FieldSource, InMemorySource};
pub use types::{
    DmdConfig, DmdError, DmdResult, EigenOrder, ModeInfo, PipelineError, Stability, C64,
    DEFAULT_SINGULAR_TOL,
};
