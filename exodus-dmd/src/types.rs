use faer::Mat;
use serde::{Deserialize, Serialize};

/// Relative tolerance below which a retained singular value counts as zero.
///
/// A singular value `s` is rejected when `s <= DEFAULT_SINGULAR_TOL * s_max`.
pub const DEFAULT_SINGULAR_TOL: f64 = 1e-10;

/// Error types for DMD operations.
#[derive(Debug, thiserror::Error)]
pub enum DmdError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("SVD computation failed: {0}")]
    SvdFailed(String),

    #[error("eigendecomposition failed: {0}")]
    EigenFailed(String),

    #[error("linear solve failed: {0}")]
    SolveFailed(String),

    #[error("numerical error: {0}")]
    NumericalError(String),
}

impl DmdError {
    /// Whether the error stems from ill-conditioned numerics rather than bad input.
    pub fn is_numerical(&self) -> bool {
        !matches!(self, DmdError::InvalidInput(_))
    }
}

/// Errors raised while preparing data, running the pipeline, or persisting results.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dmd(#[from] DmdError),

    #[error("need at least {required} snapshots, got {found}")]
    InsufficientSnapshots { required: usize, found: usize },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("missing field `{0}`")]
    MissingField(String),

    #[error("field source error: {0}")]
    Source(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unrecognised archive: {0}")]
    Format(String),
}

/// Order in which eigenpairs are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EigenOrder {
    /// Descending |λ|, ties broken by descending Im λ.
    #[default]
    Magnitude,
    /// Whatever order the eigensolver produced. Not guaranteed to be stable
    /// across solver versions.
    Solver,
}

/// Configuration for DMD computation.
#[derive(Debug, Clone)]
pub struct DmdConfig {
    /// Truncation rank. None keeps every singular direction of X₁.
    pub rank: Option<usize>,
    /// Relative zero threshold for retained singular values.
    pub singular_tol: f64,
    /// Ordering of the returned eigenpairs.
    pub order: EigenOrder,
}

impl Default for DmdConfig {
    fn default() -> Self {
        Self {
            rank: None,
            singular_tol: DEFAULT_SINGULAR_TOL,
            order: EigenOrder::Magnitude,
        }
    }
}

impl DmdConfig {
    /// Configuration truncating to `rank` with default tolerance and ordering.
    pub fn with_rank(rank: usize) -> Self {
        Self {
            rank: Some(rank),
            ..Default::default()
        }
    }
}

/// Components of the truncated SVD.
#[derive(Debug, Clone)]
pub struct SvdComponents {
    /// Left singular vectors (m × r).
    pub u: Mat<f64>,
    /// Singular values (r), descending.
    pub s: Vec<f64>,
    /// Right singular vectors (n-1 × r), columns are right singular vectors.
    pub v: Mat<f64>,
}

/// Complex number type (re, im).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct C64 {
    pub re: f64,
    pub im: f64,
}

impl C64 {
    /// Create a new complex number.
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Magnitude |z| = sqrt(re² + im²).
    pub fn norm(&self) -> f64 {
        self.re.hypot(self.im)
    }

    /// Squared magnitude re² + im².
    pub fn norm_sqr(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    /// Phase angle atan2(im, re).
    pub fn arg(&self) -> f64 {
        self.im.atan2(self.re)
    }

    /// Complex conjugate (re, -im).
    pub fn conj(&self) -> Self {
        Self {
            re: self.re,
            im: -self.im,
        }
    }

    /// The zero complex number (0 + 0i).
    pub fn zero() -> Self {
        Self { re: 0.0, im: 0.0 }
    }
}

impl std::ops::Add for C64 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            re: self.re + rhs.re,
            im: self.im + rhs.im,
        }
    }
}

impl std::ops::AddAssign for C64 {
    fn add_assign(&mut self, rhs: Self) {
        self.re += rhs.re;
        self.im += rhs.im;
    }
}

impl std::ops::Sub for C64 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            re: self.re - rhs.re,
            im: self.im - rhs.im,
        }
    }
}

impl std::ops::Mul for C64 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self {
            re: self.re * rhs.re - self.im * rhs.im,
            im: self.re * rhs.im + self.im * rhs.re,
        }
    }
}

impl std::ops::Mul<f64> for C64 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self {
            re: self.re * rhs,
            im: self.im * rhs,
        }
    }
}

impl std::ops::Div for C64 {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        let denom = rhs.norm_sqr();
        Self {
            re: (self.re * rhs.re + self.im * rhs.im) / denom,
            im: (self.im * rhs.re - self.re * rhs.im) / denom,
        }
    }
}

impl std::ops::Div<f64> for C64 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self {
            re: self.re / rhs,
            im: self.im / rhs,
        }
    }
}

/// Result of a DMD computation.
#[derive(Debug, Clone)]
pub struct DmdResult {
    /// DMD modes Φ (m × r), row-major: `modes[i][j]` is mode j at state row i.
    pub modes: Vec<Vec<C64>>,
    /// Eigenvalues λ (r). `eigenvalues[j]` belongs to mode column j.
    pub eigenvalues: Vec<C64>,
    /// Truncation rank used.
    pub rank: usize,
    /// Rank asked for by the caller, before clamping.
    pub requested_rank: Option<usize>,
    /// Truncated SVD components of X₁.
    pub svd: SvdComponents,
    /// Reduced DMD matrix Ã (r × r).
    pub a_tilde: Mat<f64>,
    /// Data dimensions (state_dim, n_snapshots).
    pub data_dim: (usize, usize),
}

impl DmdResult {
    /// Get mode column j.
    pub fn mode(&self, j: usize) -> Vec<C64> {
        self.modes.iter().map(|row| row[j]).collect()
    }

    /// Number of state variables.
    pub fn n_vars(&self) -> usize {
        self.data_dim.0
    }

    /// Whether the requested rank had to be clamped.
    pub fn was_clamped(&self) -> bool {
        matches!(self.requested_rank, Some(r) if r > self.rank)
    }
}

/// Information about a single DMD mode.
#[derive(Debug, Clone)]
pub struct ModeInfo {
    /// Mode index.
    pub index: usize,
    /// Complex eigenvalue.
    pub eigenvalue: C64,
    /// Eigenvalue magnitude |λ|.
    pub magnitude: f64,
    /// Eigenvalue phase angle (radians).
    pub phase: f64,
    /// Oscillation frequency (cycles per unit time).
    pub frequency: f64,
    /// Growth rate (log|λ|/dt).
    pub growth_rate: f64,
    /// Stability classification.
    pub stability: Stability,
}

/// Stability classification of a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    Decaying,
    Neutral,
    Growing,
}

impl std::fmt::Display for Stability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stability::Decaying => write!(f, "decaying"),
            Stability::Neutral => write!(f, "neutral"),
            Stability::Growing => write!(f, "growing"),
        }
    }
}
