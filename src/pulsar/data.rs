//! Pulsar data container consumed by the signal engine.
//!
//! Purpose
//! -------
//! Provide a small, validated, immutable container for everything the noise
//! signals read from a pulsar: arrival times, uncertainties, residuals, radio
//! frequencies, per-TOA flags and the timing-model design matrix. Parsing of
//! timing files and derivative computation happen upstream; this module only
//! checks the collaborator contract and derives backend labels.
//!
//! Key behaviors
//! -------------
//! - [`PulsarData::new`] enforces shape and finiteness invariants so signals
//!   can index the arrays without re-validating.
//! - Backend labels are derived once per TOA from the `group`, `f`, `fe` and
//!   `be` flags (see [`PulsarData::backend_flags`]).
//!
//! Invariants & assumptions
//! ------------------------
//! - `toas.len() == N > 0`; `toaerrs`, `residuals` and `freqs` have length
//!   `N`; every flag column has `N` entries.
//! - All numeric arrays are finite; `toaerrs` are strictly positive.
//! - `design_matrix` is `N × P` and `fitpars.len() == P`.
//! - The container is never mutated after construction; signals share it via
//!   `Arc<PulsarData>`.
//!
//! Conventions
//! -----------
//! - TOAs and uncertainties are in seconds, radio frequencies in MHz.
//! - Missing flag values are stored as empty strings.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the happy path, each rejection branch and the backend
//!   label derivation rule.
use crate::{
    pulsar::errors::{PulsarError, PulsarResult},
    signals::basis::span,
};
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;

/// Flags consulted, in order, when deriving a TOA's backend label.
const BACKEND_FLAG_PRIORITY: [&str; 2] = ["group", "f"];

/// Label used when no backend-identifying flag is present on a TOA.
pub const UNKNOWN_BACKEND: &str = "unknown";

/// PulsarData — validated TOA set and timing-model design matrix.
///
/// Purpose
/// -------
/// Represent one pulsar's observational data as handed over by the external
/// timing package. Signals hold an `Arc<PulsarData>` and read from it; they
/// never copy or mutate it.
///
/// Fields
/// ------
/// - `name`: pulsar name, used as the prefix of parameter names.
/// - `toas`: arrival times in seconds.
/// - `toaerrs`: arrival-time uncertainties in seconds.
/// - `residuals`: timing residuals in seconds.
/// - `freqs`: observing radio frequencies in MHz.
/// - `flags`: flag name → per-TOA values.
/// - `backend_flags`: derived per-TOA backend label.
/// - `design_matrix`: `N × P` timing-model derivatives.
/// - `fitpars`: labels of the `P` design-matrix columns.
#[derive(Debug, Clone, PartialEq)]
pub struct PulsarData {
    name: String,
    toas: Array1<f64>,
    toaerrs: Array1<f64>,
    residuals: Array1<f64>,
    freqs: Array1<f64>,
    flags: BTreeMap<String, Vec<String>>,
    backend_flags: Vec<String>,
    design_matrix: Array2<f64>,
    fitpars: Vec<String>,
}

impl PulsarData {
    /// Construct a validated [`PulsarData`].
    ///
    /// Parameters
    /// ----------
    /// - `name`: non-empty pulsar name.
    /// - `toas`, `toaerrs`, `residuals`, `freqs`: per-TOA arrays of equal
    ///   length `N > 0`.
    /// - `flags`: flag columns, each of length `N`.
    /// - `design_matrix`: `N × P` design matrix.
    /// - `fitpars`: `P` column labels.
    ///
    /// Errors
    /// ------
    /// - `PulsarError::EmptyName`, `PulsarError::EmptyToas`
    /// - `PulsarError::LengthMismatch` / `FlagLengthMismatch` when a per-TOA
    ///   array is not of length `N`.
    /// - `PulsarError::NonFiniteValue` for the first NaN/±inf entry found.
    /// - `PulsarError::NonPositiveError` for a non-positive uncertainty.
    /// - `PulsarError::DesignRowMismatch`, `FitParamMismatch`,
    ///   `NonFiniteDesign` for design-matrix problems.
    ///
    /// Panics
    /// ------
    /// - Never panics.
    pub fn new(
        name: impl Into<String>, toas: Array1<f64>, toaerrs: Array1<f64>, residuals: Array1<f64>,
        freqs: Array1<f64>, flags: BTreeMap<String, Vec<String>>, design_matrix: Array2<f64>,
        fitpars: Vec<String>,
    ) -> PulsarResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(PulsarError::EmptyName);
        }
        let n = toas.len();
        if n == 0 {
            return Err(PulsarError::EmptyToas);
        }

        check_finite("toas", &toas)?;
        for (field, arr) in [("toaerrs", &toaerrs), ("residuals", &residuals), ("freqs", &freqs)] {
            if arr.len() != n {
                return Err(PulsarError::LengthMismatch { field, expected: n, actual: arr.len() });
            }
            check_finite(field, arr)?;
        }
        if let Some((index, &value)) = toaerrs.iter().enumerate().find(|&(_, &v)| v <= 0.0) {
            return Err(PulsarError::NonPositiveError { index, value });
        }

        for (flag, values) in &flags {
            if values.len() != n {
                return Err(PulsarError::FlagLengthMismatch {
                    flag: flag.clone(),
                    expected: n,
                    actual: values.len(),
                });
            }
        }

        if design_matrix.nrows() != n {
            return Err(PulsarError::DesignRowMismatch { expected: n, actual: design_matrix.nrows() });
        }
        if fitpars.len() != design_matrix.ncols() {
            return Err(PulsarError::FitParamMismatch {
                expected: design_matrix.ncols(),
                actual: fitpars.len(),
            });
        }
        if let Some(((row, col), &value)) = design_matrix.indexed_iter().find(|(_, v)| !v.is_finite())
        {
            return Err(PulsarError::NonFiniteDesign { row, col, value });
        }

        let backend_flags = derive_backend_flags(&flags, n);

        Ok(PulsarData {
            name,
            toas,
            toaerrs,
            residuals,
            freqs,
            flags,
            backend_flags,
            design_matrix,
            fitpars,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of TOAs `N`.
    pub fn ntoas(&self) -> usize {
        self.toas.len()
    }

    pub fn toas(&self) -> &Array1<f64> {
        &self.toas
    }

    pub fn toaerrs(&self) -> &Array1<f64> {
        &self.toaerrs
    }

    pub fn residuals(&self) -> &Array1<f64> {
        &self.residuals
    }

    pub fn freqs(&self) -> &Array1<f64> {
        &self.freqs
    }

    pub fn flags(&self) -> &BTreeMap<String, Vec<String>> {
        &self.flags
    }

    /// Per-TOA values of flag `name`, if the flag is present on any TOA.
    pub fn flag(&self, name: &str) -> Option<&[String]> {
        self.flags.get(name).map(Vec::as_slice)
    }

    /// Derived per-TOA backend labels.
    ///
    /// For each TOA the label is the first non-empty value of the `group` and
    /// `f` flags; failing that `"{fe}_{be}"` when both are non-empty;
    /// otherwise [`UNKNOWN_BACKEND`].
    pub fn backend_flags(&self) -> &[String] {
        &self.backend_flags
    }

    pub fn design_matrix(&self) -> &Array2<f64> {
        &self.design_matrix
    }

    pub fn fitpars(&self) -> &[String] {
        &self.fitpars
    }

    /// Total observing span `max(toas) - min(toas)` in seconds.
    pub fn tspan(&self) -> f64 {
        span(self.toas.view())
    }
}

fn check_finite(field: &'static str, arr: &Array1<f64>) -> PulsarResult<()> {
    match arr.iter().enumerate().find(|&(_, v)| !v.is_finite()) {
        Some((index, &value)) => Err(PulsarError::NonFiniteValue { field, index, value }),
        None => Ok(()),
    }
}

fn derive_backend_flags(flags: &BTreeMap<String, Vec<String>>, n: usize) -> Vec<String> {
    let value_at = |flag: &str, i: usize| -> Option<&str> {
        flags.get(flag).map(|col| col[i].as_str()).filter(|v| !v.is_empty())
    };

    (0..n)
        .map(|i| {
            if let Some(label) = BACKEND_FLAG_PRIORITY.iter().find_map(|flag| value_at(flag, i)) {
                return label.to_string();
            }
            match (value_at("fe", i), value_at("be", i)) {
                (Some(fe), Some(be)) => format!("{fe}_{be}"),
                _ => UNKNOWN_BACKEND.to_string(),
            }
        })
        .collect()
}
