//! Errors for signal construction, combination, and evaluation.
//!
//! This module defines [`SignalError`], the error type shared by the basis
//! generators, prior models, selections, signals and the signal collection,
//! together with the [`SignalResult`] alias and an [`ErrorKind`]
//! classification. Errors implement `Display`/`Error` and convert to `PyErr`
//! for PyO3 when the `python-bindings` feature is enabled.
//!
//! ## Conventions
//! - **Configuration** errors are raised when a signal is bound to a pulsar
//!   or when signals are combined; malformed models never reach query time.
//! - **Parameter** and **dimension** errors are raised at query time and are
//!   never retried internally.
//! - A zero entry in a prior vector is not an error; taking its reciprocal
//!   in `phiinv` is the caller's responsibility.
use crate::pulsar::errors::PulsarError;
use statrs::distribution::{NormalError, UniformError};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};

/// Crate-wide result alias for signal operations that may produce
/// [`SignalError`].
pub type SignalResult<T> = Result<T, SignalError>;

/// Coarse classification of a [`SignalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Ill-formed model definition; raised at construction.
    Configuration,
    /// A query omitted a required named parameter.
    ParameterMissing,
    /// A basis row count disagrees with the TOA set it should cover.
    DimensionMismatch,
}

/// Unified error type for the signal engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalError {
    // ---- Data ----
    /// Pulsar data violated its container contract.
    InvalidPulsar(PulsarError),

    /// A basis generator was handed an empty TOA array.
    EmptyToas,

    // ---- Basis generators ----
    /// Number of Fourier components must be > 0.
    InvalidComponents { components: usize },

    /// Fourier time span must be finite and > 0.
    InvalidTspan { tspan: f64 },

    /// Quantization window must be finite and > 0.
    InvalidQuantizationWindow { dt: f64 },

    /// Minimum TOAs per epoch must be ≥ 1.
    InvalidMinToas { min_toas: usize },

    /// A design-matrix column has zero L2 norm and cannot be normalized.
    DegenerateDesignColumn { index: usize, label: String },

    /// A signal produced a basis with no columns.
    EmptyBasis { signal: String },

    // ---- Priors / parameters ----
    /// Prior distribution parameters rejected by `statrs`.
    InvalidPrior { reason: String },

    /// Timing-model variance must be finite and > 0.
    InvalidVariance { value: f64 },

    /// Vector parameter length disagrees with the number of modes it feeds.
    VectorLengthMismatch { name: String, expected: usize, actual: usize },

    /// Two non-mergeable signals declare the same parameter without an alias.
    ParameterCollision { name: String, first: String, second: String },

    /// Two signals share a parameter name but declare different priors for it.
    ConflictingPrior { name: String, first: String, second: String },

    /// A parameter value supplied at query time is NaN/±inf.
    NonFiniteParameter { name: String, value: f64 },

    // ---- Collection ----
    /// A collection was built from an empty signal list.
    EmptyCollection,

    /// A flag-based selection left no TOA in any partition.
    EmptySelection { selection: String },

    /// Signals bound to different pulsars cannot be combined.
    MixedPulsars { first: String, second: String },

    // ---- Query ----
    /// A query omitted a required parameter.
    ParameterMissing { name: String },

    /// A basis has the wrong number of rows for the TOAs it covers.
    DimensionMismatch { signal: String, expected: usize, actual: usize },
}

impl SignalError {
    /// Classify the error into one of the three engine error kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SignalError::ParameterMissing { .. } | SignalError::NonFiniteParameter { .. } => {
                ErrorKind::ParameterMissing
            }
            SignalError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            _ => ErrorKind::Configuration,
        }
    }
}

impl std::error::Error for SignalError {}

impl std::fmt::Display for SignalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Data ----
            SignalError::InvalidPulsar(err) => {
                write!(f, "Invalid pulsar data: {err}")
            }
            SignalError::EmptyToas => {
                write!(f, "Basis generator received an empty TOA array.")
            }
            // ---- Basis generators ----
            SignalError::InvalidComponents { components } => {
                write!(f, "Number of Fourier components must be > 0; got: {components}")
            }
            SignalError::InvalidTspan { tspan } => {
                write!(f, "Fourier time span must be finite and > 0; got: {tspan}")
            }
            SignalError::InvalidQuantizationWindow { dt } => {
                write!(f, "Quantization window must be finite and > 0; got: {dt}")
            }
            SignalError::InvalidMinToas { min_toas } => {
                write!(f, "Minimum TOAs per epoch must be >= 1; got: {min_toas}")
            }
            SignalError::DegenerateDesignColumn { index, label } => {
                write!(f, "Design matrix column {index} ({label}) has zero norm.")
            }
            SignalError::EmptyBasis { signal } => {
                write!(f, "Signal `{signal}` produced a basis with zero columns.")
            }
            // ---- Priors / parameters ----
            SignalError::InvalidPrior { reason } => {
                write!(f, "Invalid parameter prior: {reason}")
            }
            SignalError::InvalidVariance { value } => {
                write!(f, "Prior variance must be finite and > 0; got: {value}")
            }
            SignalError::VectorLengthMismatch { name, expected, actual } => {
                write!(
                    f,
                    "Vector parameter `{name}` length mismatch: expected {expected}, got {actual}"
                )
            }
            SignalError::ParameterCollision { name, first, second } => {
                write!(
                    f,
                    "Parameter `{name}` is declared by both `{first}` and `{second}` without an explicit alias."
                )
            }
            SignalError::ConflictingPrior { name, first, second } => {
                write!(
                    f,
                    "Parameter `{name}` has different priors in `{first}` and `{second}`."
                )
            }
            SignalError::NonFiniteParameter { name, value } => {
                write!(f, "Parameter `{name}` must be finite; got: {value}")
            }
            // ---- Collection ----
            SignalError::EmptyCollection => {
                write!(f, "Signal collection requires at least one signal.")
            }
            SignalError::EmptySelection { selection } => {
                write!(f, "Selection `{selection}` does not cover any TOA.")
            }
            SignalError::MixedPulsars { first, second } => {
                write!(
                    f,
                    "Signals `{first}` and `{second}` are bound to different pulsars."
                )
            }
            // ---- Query ----
            SignalError::ParameterMissing { name } => {
                write!(f, "Required parameter `{name}` is missing.")
            }
            SignalError::DimensionMismatch { signal, expected, actual } => {
                write!(
                    f,
                    "Basis of signal `{signal}` has {actual} rows; expected {expected}."
                )
            }
        }
    }
}

/// Convert a [`SignalError`] into a Python `ValueError` with the error message.
///
/// This is used at the Rust↔Python boundary to surface domain errors cleanly.
#[cfg(feature = "python-bindings")]
impl std::convert::From<SignalError> for PyErr {
    fn from(err: SignalError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

impl From<PulsarError> for SignalError {
    fn from(err: PulsarError) -> SignalError {
        SignalError::InvalidPulsar(err)
    }
}

impl From<UniformError> for SignalError {
    fn from(err: UniformError) -> SignalError {
        SignalError::InvalidPrior { reason: err.to_string() }
    }
}

impl From<NormalError> for SignalError {
    fn from(err: NormalError) -> SignalError {
        SignalError::InvalidPrior { reason: err.to_string() }
    }
}
