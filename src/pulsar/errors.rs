//! Errors for pulsar data containers (TOA arrays, flags, design matrix).
//!
//! This module defines [`PulsarError`], raised when an external collaborator
//! hands over TOA data that violates the container invariants, together with
//! the [`PulsarResult`] alias. Errors implement `Display`/`Error` and convert
//! to `PyErr` for PyO3 when the `python-bindings` feature is enabled.
//!
//! ## Conventions
//! - **Indices are 0-based** (match Rust/NumPy).
//! - TOAs, uncertainties, residuals and radio frequencies must be **finite**;
//!   uncertainties must additionally be **strictly positive**.
//! - Every per-TOA array (including each flag column) must have the same
//!   length `N` as the TOA array.
#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};

/// Result alias for pulsar-data construction paths that may produce
/// [`PulsarError`].
pub type PulsarResult<T> = Result<T, PulsarError>;

/// Validation errors for [`PulsarData`](crate::pulsar::data::PulsarData).
#[derive(Debug, Clone, PartialEq)]
pub enum PulsarError {
    // ---- TOA arrays ----
    /// The TOA array is empty.
    EmptyToas,

    /// Pulsar name is empty.
    EmptyName,

    /// A per-TOA array has a length different from the TOA array.
    LengthMismatch { field: &'static str, expected: usize, actual: usize },

    /// A per-TOA value is NaN/±inf.
    NonFiniteValue { field: &'static str, index: usize, value: f64 },

    /// A TOA uncertainty is ≤ 0.
    NonPositiveError { index: usize, value: f64 },

    // ---- Flags ----
    /// A flag column has a length different from the TOA array.
    FlagLengthMismatch { flag: String, expected: usize, actual: usize },

    // ---- Design matrix ----
    /// Design-matrix row count disagrees with the TOA count.
    DesignRowMismatch { expected: usize, actual: usize },

    /// Number of fit-parameter labels disagrees with the design-matrix columns.
    FitParamMismatch { expected: usize, actual: usize },

    /// A design-matrix entry is NaN/±inf.
    NonFiniteDesign { row: usize, col: usize, value: f64 },
}

impl std::error::Error for PulsarError {}

impl std::fmt::Display for PulsarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- TOA arrays ----
            PulsarError::EmptyToas => {
                write!(f, "TOA array is empty.")
            }
            PulsarError::EmptyName => {
                write!(f, "Pulsar name must not be empty.")
            }
            PulsarError::LengthMismatch { field, expected, actual } => {
                write!(f, "Length of `{field}` must equal the TOA count: expected {expected}, got {actual}")
            }
            PulsarError::NonFiniteValue { field, index, value } => {
                write!(f, "Value of `{field}` at index {index} is non-finite: {value}")
            }
            PulsarError::NonPositiveError { index, value } => {
                write!(f, "TOA uncertainty at index {index} must be > 0; got: {value}")
            }
            // ---- Flags ----
            PulsarError::FlagLengthMismatch { flag, expected, actual } => {
                write!(
                    f,
                    "Flag column `{flag}` must have one entry per TOA: expected {expected}, got {actual}"
                )
            }
            // ---- Design matrix ----
            PulsarError::DesignRowMismatch { expected, actual } => {
                write!(
                    f,
                    "Design matrix must have one row per TOA: expected {expected}, got {actual}"
                )
            }
            PulsarError::FitParamMismatch { expected, actual } => {
                write!(
                    f,
                    "Fit parameter labels must match design-matrix columns: expected {expected}, got {actual}"
                )
            }
            PulsarError::NonFiniteDesign { row, col, value } => {
                write!(f, "Design matrix entry ({row}, {col}) is non-finite: {value}")
            }
        }
    }
}

/// Convert a [`PulsarError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<PulsarError> for PyErr {
    fn from(err: PulsarError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
