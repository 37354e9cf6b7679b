//! Prior models — spectral densities and constant variances per basis column.
//!
//! Purpose
//! -------
//! Turn basis metadata plus resolved hyperparameter values into a prior
//! variance for every basis column.
//!
//! Key behaviors
//! -------------
//! - [`powerlaw`]: red-noise power spectral density
//!   `A² / (12π²) · f_yr^(γ−3) · f^(−γ)`.
//! - [`Spectrum`]: user-facing spectral model of a Fourier signal (power law
//!   or free spectrum) with its parameter declarations.
//! - [`PriorModel`]: the bound, parameter-free evaluation rule a signal uses
//!   on every query.
//!
//! Invariants & assumptions
//! ------------------------
//! - Fourier priors multiply the PSD by the fundamental frequency `f_1 = 1/T`
//!   (the first frequency label), converting density into per-mode variance;
//!   the sine and cosine columns of a mode get the identical value.
//! - `values` passed to [`PriorModel::evaluate`] are ordered exactly as the
//!   signal's parameter list.
use crate::signals::{
    basis::Basis,
    errors::{SignalError, SignalResult},
    parameter::ParamSpec,
};
use ndarray::{Array1, ArrayView1};
use std::f64::consts::PI;

/// Seconds per Julian year.
pub const YEAR_SECONDS: f64 = 365.25 * 86400.0;

/// Reference frequency `1 / yr` in Hz.
pub const FYR: f64 = 1.0 / YEAR_SECONDS;

/// Power-law power spectral density evaluated at `f`.
///
/// Parameters
/// ----------
/// - `f`: frequencies in Hz (strictly positive).
/// - `log10_a`: log10 of the strain amplitude `A`.
/// - `gamma`: spectral index.
///
/// Returns
/// -------
/// `A² / 12 / π² · f_yr^(γ−3) · f^(−γ)` for each entry of `f`.
pub fn powerlaw(f: ArrayView1<f64>, log10_a: f64, gamma: f64) -> Array1<f64> {
    let amp2 = 10f64.powf(log10_a).powi(2);
    let norm = amp2 / 12.0 / (PI * PI) * FYR.powf(gamma - 3.0);
    f.mapv(|fk| norm * fk.powf(-gamma))
}

/// Spectrum — spectral model of a Fourier signal.
#[derive(Debug, Clone, PartialEq)]
pub enum Spectrum {
    /// Power law in `log10_A` and `gamma`.
    PowerLaw { log10_a: ParamSpec, gamma: ParamSpec },
    /// Independent `log10_rho` per mode; phi = `10^(2ρ_k)` for both columns.
    /// `log10_rho` must be a vector parameter with one entry per component.
    FreeSpectrum { log10_rho: ParamSpec },
}

impl Spectrum {
    pub fn powerlaw(log10_a: ParamSpec, gamma: ParamSpec) -> Self {
        Spectrum::PowerLaw { log10_a, gamma }
    }

    pub fn free_spectrum(log10_rho: ParamSpec) -> Self {
        Spectrum::FreeSpectrum { log10_rho }
    }
}

/// PriorModel — bound evaluation rule for a signal's prior vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriorModel {
    /// `10^(2·values[0])` for every column.
    ConstantVariance,
    /// `powerlaw(f, values[0], values[1]) · f_1`.
    PowerLaw,
    /// `10^(2·values[k])` for both columns of mode `k`.
    FreeSpectrum,
    /// The given variance for every column; no parameters.
    Improper(f64),
}

impl PriorModel {
    /// Number of parameter values consumed for a basis with `ncols` columns.
    pub fn required_values(&self, ncols: usize) -> usize {
        match self {
            PriorModel::ConstantVariance => 1,
            PriorModel::PowerLaw => 2,
            PriorModel::FreeSpectrum => ncols / 2,
            PriorModel::Improper(_) => 0,
        }
    }

    /// Evaluate the prior vector for `basis` at the resolved `values`.
    ///
    /// Errors
    /// ------
    /// - `SignalError::VectorLengthMismatch` if `values` does not hold
    ///   [`PriorModel::required_values`] entries.
    /// - `SignalError::InvalidPrior` if a spectral prior is paired with a
    ///   basis that has no frequency labels.
    pub fn evaluate(&self, basis: &Basis, values: &[f64]) -> SignalResult<Array1<f64>> {
        let ncols = basis.ncols();
        let expected = self.required_values(ncols);
        if values.len() != expected {
            return Err(SignalError::VectorLengthMismatch {
                name: "prior values".to_string(),
                expected,
                actual: values.len(),
            });
        }

        let phi = match self {
            PriorModel::ConstantVariance => Array1::from_elem(ncols, 10f64.powf(2.0 * values[0])),
            PriorModel::PowerLaw => {
                let freqs = basis.frequencies().ok_or_else(|| SignalError::InvalidPrior {
                    reason: "power-law prior requires a Fourier basis".to_string(),
                })?;
                powerlaw(freqs.view(), values[0], values[1]) * freqs[0]
            }
            PriorModel::FreeSpectrum => {
                if basis.frequencies().is_none() {
                    return Err(SignalError::InvalidPrior {
                        reason: "free-spectrum prior requires a Fourier basis".to_string(),
                    });
                }
                Array1::from_shape_fn(ncols, |k| 10f64.powf(2.0 * values[k / 2]))
            }
            PriorModel::Improper(variance) => Array1::from_elem(ncols, *variance),
        };
        Ok(phi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::basis::create_fourier_design_matrix;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Check the power law against a hand evaluation at f = 1/yr, where the
    // f_yr factor cancels to f_yr^(-3).
    fn powerlaw_matches_closed_form_at_fyr() {
        let psd = powerlaw(array![FYR].view(), -14.0, 13.0 / 3.0);

        let expected = 1e-28 / (12.0 * PI * PI) * FYR.powi(-3);
        assert_relative_eq!(psd[0], expected, max_relative = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Verify each prior model over a small Fourier basis.
    //
    // Expect
    // ------
    // - Power law: PSD(f) · f_1 with equal sine/cosine entries.
    // - Free spectrum: 10^(2ρ_k) repeated per mode.
    // - Constant / improper: replicated value.
    fn prior_models_evaluate_per_column() {
        let toas = array![0.0, 10.0, 25.0, 40.0];
        let basis = create_fourier_design_matrix(toas.view(), 2, None).unwrap();
        let freqs = basis.frequencies().unwrap().clone();

        let pl = PriorModel::PowerLaw.evaluate(&basis, &[-14.5, 4.33]).unwrap();
        assert_eq!(pl, powerlaw(freqs.view(), -14.5, 4.33) * freqs[0]);
        assert_eq!(pl[0], pl[1]);
        assert_eq!(pl[2], pl[3]);

        let free = PriorModel::FreeSpectrum.evaluate(&basis, &[-7.0, -8.0]).unwrap();
        let (r0, r1) = (10f64.powf(2.0 * -7.0), 10f64.powf(2.0 * -8.0));
        assert_eq!(free, array![r0, r0, r1, r1]);

        let ecorr = PriorModel::ConstantVariance.evaluate(&basis, &[-6.4]).unwrap();
        assert!(ecorr.iter().all(|&v| v == 10f64.powf(2.0 * -6.4)));

        let flat = PriorModel::Improper(1e40).evaluate(&basis, &[]).unwrap();
        assert_eq!(flat, Array1::from_elem(4, 1e40));

        assert!(matches!(
            PriorModel::PowerLaw.evaluate(&basis, &[-14.0]).unwrap_err(),
            SignalError::VectorLengthMismatch { expected: 2, actual: 1, .. }
        ));
    }
}
