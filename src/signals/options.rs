//! Signal options — configuration for the basis generators and flat priors.
//!
//! Purpose
//! -------
//! Collect the tuning knobs of the three basis generators in one place so
//! signal definitions carry explicit, validated configuration instead of
//! ad-hoc arguments.
//!
//! Key behaviors
//! -------------
//! - [`QuantizationOptions`]: epoch window `dt` and minimum epoch size for
//!   the quantization (ECORR) basis.
//! - [`FourierOptions`]: number of sinusoid pairs and optional explicit time
//!   span for the Fourier basis.
//! - [`TimingModelOptions`]: column normalization and flat-prior variance for
//!   the timing-model basis.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every option struct is validated by its `new` constructor; `Default`
//!   values are valid by construction.
//! - Fields are public, so consumers re-check a struct literal with
//!   `validate` before using it.
//! - A `FourierOptions::tspan` of `None` means "derive from the TOAs the
//!   signal acts on" and is resolved at binding time.
//!
//! Testing notes
//! -------------
//! - Unit tests check the documented defaults and each rejection branch.
use crate::signals::errors::{SignalError, SignalResult};

/// Default epoch window in seconds.
pub const DEFAULT_QUANTIZATION_DT: f64 = 1.0;

/// Default flat-prior variance for timing-model columns.
pub const DEFAULT_TIMING_MODEL_VARIANCE: f64 = 1e40;

/// QuantizationOptions — epoch grouping for the quantization basis.
///
/// Fields
/// ------
/// - `dt`: a new epoch starts wherever consecutive sorted TOAs are more than
///   `dt` seconds apart. Default [`DEFAULT_QUANTIZATION_DT`].
/// - `min_toas`: epochs with fewer members are dropped. Default `1`, so
///   every formed epoch (single-TOA epochs included) gets a column. Set it
///   to `2` to drop isolated TOAs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizationOptions {
    pub dt: f64,
    pub min_toas: usize,
}

impl QuantizationOptions {
    /// Errors
    /// ------
    /// - `SignalError::InvalidQuantizationWindow` if `dt` is not finite and > 0.
    /// - `SignalError::InvalidMinToas` if `min_toas == 0`.
    pub fn new(dt: f64, min_toas: usize) -> SignalResult<Self> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SignalError::InvalidQuantizationWindow { dt });
        }
        if min_toas == 0 {
            return Err(SignalError::InvalidMinToas { min_toas });
        }
        Ok(QuantizationOptions { dt, min_toas })
    }

    /// Re-check a value built from its public fields.
    ///
    /// Errors
    /// ------
    /// - As in [`QuantizationOptions::new`].
    pub fn validate(&self) -> SignalResult<()> {
        QuantizationOptions::new(self.dt, self.min_toas).map(|_| ())
    }
}

impl Default for QuantizationOptions {
    fn default() -> Self {
        QuantizationOptions { dt: DEFAULT_QUANTIZATION_DT, min_toas: 1 }
    }
}

/// FourierOptions — harmonic content of the Fourier basis.
///
/// Fields
/// ------
/// - `components`: number of sine/cosine pairs `M` (basis has `2M` columns).
/// - `tspan`: explicit span `T` in seconds; `None` derives it from the data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FourierOptions {
    pub components: usize,
    pub tspan: Option<f64>,
}

impl FourierOptions {
    /// Errors
    /// ------
    /// - `SignalError::InvalidComponents` if `components == 0`.
    /// - `SignalError::InvalidTspan` if an explicit `tspan` is not finite and > 0.
    pub fn new(components: usize, tspan: Option<f64>) -> SignalResult<Self> {
        if components == 0 {
            return Err(SignalError::InvalidComponents { components });
        }
        if let Some(t) = tspan {
            if !t.is_finite() || t <= 0.0 {
                return Err(SignalError::InvalidTspan { tspan: t });
            }
        }
        Ok(FourierOptions { components, tspan })
    }

    /// Re-check a value built from its public fields.
    pub fn validate(&self) -> SignalResult<()> {
        FourierOptions::new(self.components, self.tspan).map(|_| ())
    }
}

/// TimingModelOptions — normalization and prior of the timing-model basis.
///
/// Fields
/// ------
/// - `normalize`: divide each design-matrix column by its L2 norm. Default
///   `true`.
/// - `variance`: constant prior variance per column, effectively flat.
///   Default [`DEFAULT_TIMING_MODEL_VARIANCE`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingModelOptions {
    pub normalize: bool,
    pub variance: f64,
}

impl TimingModelOptions {
    /// Errors
    /// ------
    /// - `SignalError::InvalidVariance` if `variance` is not finite and > 0.
    pub fn new(normalize: bool, variance: f64) -> SignalResult<Self> {
        if !variance.is_finite() || variance <= 0.0 {
            return Err(SignalError::InvalidVariance { value: variance });
        }
        Ok(TimingModelOptions { normalize, variance })
    }

    pub fn validate(&self) -> SignalResult<()> {
        TimingModelOptions::new(self.normalize, self.variance).map(|_| ())
    }
}

impl Default for TimingModelOptions {
    fn default() -> Self {
        TimingModelOptions { normalize: true, variance: DEFAULT_TIMING_MODEL_VARIANCE }
    }
}
