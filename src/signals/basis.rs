//! Basis generators — quantization, Fourier, and timing-model bases.
//!
//! Purpose
//! -------
//! Map TOA arrays (and, for the timing model, the design matrix) to basis
//! matrices plus per-column labels. These are pure functions: the same input
//! always yields the same matrix bit for bit.
//!
//! Key behaviors
//! -------------
//! - [`create_quantization_matrix`]: `N × E` epoch indicator matrix for
//!   correlated white noise.
//! - [`create_fourier_design_matrix`]: `N × 2M` sine/cosine basis at
//!   harmonics `k / T`, `k = 1..M`.
//! - [`normalize_design_matrix`]: timing-model derivatives with each column
//!   scaled to unit L2 norm.
//!
//! Invariants & assumptions
//! ------------------------
//! - Row `i` of every returned matrix corresponds to `toas[i]` of the input;
//!   generators never reorder rows.
//! - Fourier columns come in `(sin, cos)` pairs ordered by harmonic number, so
//!   a basis with `M₁ < M₂` components over the same span is exactly the
//!   leading `2M₁` columns of the `M₂` basis.
//! - Quantization columns are ordered by epoch time.
//!
//! Conventions
//! -----------
//! - Times are in seconds; frequencies in Hz.
//! - Generators may return a basis with zero columns (e.g. every epoch
//!   dropped by `min_toas`); rejecting that is the binding layer's job.
use crate::signals::{
    errors::{SignalError, SignalResult},
    options::QuantizationOptions,
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use std::f64::consts::PI;

/// Per-column metadata attached to a [`Basis`].
#[derive(Debug, Clone, PartialEq)]
pub enum BasisLabels {
    /// Fourier frequency of each column in Hz (each harmonic appears twice).
    Frequencies(Array1<f64>),
    /// Mean TOA of each epoch in seconds.
    EpochTimes(Array1<f64>),
    /// Fit-parameter name of each timing-model column.
    FitParams(Vec<String>),
}

impl BasisLabels {
    pub fn len(&self) -> usize {
        match self {
            BasisLabels::Frequencies(f) => f.len(),
            BasisLabels::EpochTimes(t) => t.len(),
            BasisLabels::FitParams(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Basis — a basis matrix together with its column labels.
///
/// Invariants
/// ----------
/// - `labels.len() == matrix.ncols()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Basis {
    pub matrix: Array2<f64>,
    pub labels: BasisLabels,
}

impl Basis {
    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.matrix.ncols()
    }

    /// Column frequencies, for Fourier bases.
    pub fn frequencies(&self) -> Option<&Array1<f64>> {
        match &self.labels {
            BasisLabels::Frequencies(f) => Some(f),
            _ => None,
        }
    }
}

/// Observing span `max(toas) - min(toas)` in seconds; `0.0` for empty input.
pub fn span(toas: ArrayView1<f64>) -> f64 {
    if toas.is_empty() {
        return 0.0;
    }
    let (lo, hi) = toas
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| (lo.min(t), hi.max(t)));
    hi - lo
}

/// Build the epoch indicator (quantization) matrix.
///
/// Parameters
/// ----------
/// - `toas`: `ArrayView1<f64>`
///   Arrival times in seconds, in any order.
/// - `opts`: `&QuantizationOptions`
///   Epoch window `dt` and minimum epoch size `min_toas`.
///
/// Returns
/// -------
/// `SignalResult<Basis>`
///   `N × E` matrix with `U[i, j] = 1` iff TOA `i` belongs to epoch `j`,
///   labelled with the epoch mean times.
///
/// Errors
/// ------
/// - `SignalError::EmptyToas` if `toas` is empty.
/// - `SignalError::InvalidQuantizationWindow` / `InvalidMinToas` if `opts`
///   fails [`QuantizationOptions::validate`].
///
/// Notes
/// -----
/// - TOAs are sorted (stable) before grouping; a new epoch starts wherever
///   the gap between consecutive sorted TOAs exceeds `dt`.
/// - Epochs with fewer than `min_toas` members are dropped, so their TOAs get
///   an all-zero row.
pub fn create_quantization_matrix(
    toas: ArrayView1<f64>, opts: &QuantizationOptions,
) -> SignalResult<Basis> {
    opts.validate()?;
    let n = toas.len();
    if n == 0 {
        return Err(SignalError::EmptyToas);
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| toas[a].total_cmp(&toas[b]));

    let mut epochs: Vec<Vec<usize>> = Vec::new();
    let mut current = vec![order[0]];
    for pair in order.windows(2) {
        if toas[pair[1]] - toas[pair[0]] > opts.dt {
            epochs.push(std::mem::take(&mut current));
        }
        current.push(pair[1]);
    }
    epochs.push(current);
    epochs.retain(|members| members.len() >= opts.min_toas);

    let mut matrix = Array2::<f64>::zeros((n, epochs.len()));
    let mut epoch_times = Array1::<f64>::zeros(epochs.len());
    for (j, members) in epochs.iter().enumerate() {
        let mut total = 0.0;
        for &i in members {
            matrix[[i, j]] = 1.0;
            total += toas[i];
        }
        epoch_times[j] = total / members.len() as f64;
    }

    Ok(Basis { matrix, labels: BasisLabels::EpochTimes(epoch_times) })
}

/// Build the Fourier red-noise design matrix.
///
/// Parameters
/// ----------
/// - `toas`: `ArrayView1<f64>`
///   Arrival times in seconds.
/// - `components`: `usize`
///   Number of sine/cosine pairs `M`.
/// - `tspan`: `Option<f64>`
///   Span `T` setting the fundamental frequency `1/T`; `None` uses
///   [`span`] of `toas`.
///
/// Returns
/// -------
/// `SignalResult<Basis>`
///   `N × 2M` matrix with column `2k` = `sin(2π f_k t)` and column `2k + 1` =
///   `cos(2π f_k t)`, `f_k = (k + 1) / T`, labelled with the duplicated
///   frequencies.
///
/// Errors
/// ------
/// - `SignalError::EmptyToas` if `toas` is empty.
/// - `SignalError::InvalidComponents` if `components == 0`.
/// - `SignalError::InvalidTspan` if the effective span is not finite and > 0.
pub fn create_fourier_design_matrix(
    toas: ArrayView1<f64>, components: usize, tspan: Option<f64>,
) -> SignalResult<Basis> {
    if toas.is_empty() {
        return Err(SignalError::EmptyToas);
    }
    if components == 0 {
        return Err(SignalError::InvalidComponents { components });
    }
    let tspan = tspan.unwrap_or_else(|| span(toas));
    if !tspan.is_finite() || tspan <= 0.0 {
        return Err(SignalError::InvalidTspan { tspan });
    }

    let mut matrix = Array2::<f64>::zeros((toas.len(), 2 * components));
    let mut freqs = Array1::<f64>::zeros(2 * components);
    for k in 0..components {
        let f = (k + 1) as f64 / tspan;
        freqs[2 * k] = f;
        freqs[2 * k + 1] = f;
        for (i, &t) in toas.iter().enumerate() {
            let phase = 2.0 * PI * f * t;
            matrix[[i, 2 * k]] = phase.sin();
            matrix[[i, 2 * k + 1]] = phase.cos();
        }
    }

    Ok(Basis { matrix, labels: BasisLabels::Frequencies(freqs) })
}

/// Scale each design-matrix column to unit L2 norm.
///
/// Parameters
/// ----------
/// - `design`: `ArrayView2<f64>`
///   `N × P` timing-model design matrix (or a row subset of it).
/// - `fitpars`: `&[String]`
///   Column labels, `P` entries.
/// - `normalize`: `bool`
///   When `false` the matrix is returned unscaled.
///
/// Errors
/// ------
/// - `SignalError::DegenerateDesignColumn` if a column has zero norm and
///   `normalize` is set.
pub fn normalize_design_matrix(
    design: ArrayView2<f64>, fitpars: &[String], normalize: bool,
) -> SignalResult<Basis> {
    let labels = BasisLabels::FitParams(fitpars.to_vec());
    if !normalize {
        return Ok(Basis { matrix: design.to_owned(), labels });
    }

    let norms = design.map_axis(Axis(0), |col| col.dot(&col).sqrt());
    if let Some(index) = norms.iter().position(|&nrm| nrm == 0.0) {
        let label = fitpars.get(index).cloned().unwrap_or_default();
        return Err(SignalError::DegenerateDesignColumn { index, label });
    }

    Ok(Basis { matrix: &design / &norms, labels })
}
