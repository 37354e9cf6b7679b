//! pta_noise — pulsar-timing noise signals and basis combination, with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that exposes
//! the noise-model engine to Python via the `_pta_noise` extension module.
//! When the `python-bindings` feature is enabled, this module defines the
//! Python-facing classes and submodules used by the `pta_noise` package.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules (`pulsar` and `signals`) as the public
//!   crate surface.
//! - Define `#[pyclass]` wrappers (`Pulsar`, `SignalDef`, `NoiseModel`) and
//!   the `#[pymodule]` initializer for the `_pta_noise` Python extension.
//! - Create and register the `signals` submodule under `pta_noise` so that
//!   dot-notation imports work as expected.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work lives in the inner Rust modules; this file performs
//!   only FFI glue, input conversion, and error mapping.
//! - On successful conversion from Python objects to Rust types, the
//!   invariants documented in `pulsar` and `signals` are assumed to hold.
//!
//! Conventions
//! -----------
//! - Matrices are returned to Python as row-major `list[list[float]]`,
//!   vectors as `list[float]`; parameter mappings are `dict[str, float]`.
//! - Errors from core Rust code are converted to `ValueError` at the PyO3
//!   boundary.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code depends on [`pulsar`] and [`signals`] directly and can
//!   ignore the items guarded by the `python-bindings` feature.
//! - The Python packaging layer imports `_pta_noise` and wraps its classes in
//!   user-facing APIs; timing-file parsing stays on the Python side.

pub mod pulsar;
pub mod signals;
pub mod utils;

#[cfg(feature = "python-bindings")]
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    pulsar::data::PulsarData,
    signals::{
        collection::SignalCollection,
        options::{FourierOptions, QuantizationOptions, TimingModelOptions},
        parameter::ParamSpec,
        signal::SignalSpec,
        spectrum::Spectrum,
    },
    utils::{
        extract_f64_matrix, extract_f64_vector, extract_param_spec, extract_selection,
        matrix_to_rows,
    },
};

/// Pulsar — Python-facing wrapper around validated [`PulsarData`].
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `Pulsar(name, toas, toaerrs, freqs, design_matrix, fitpars, flags=None, residuals=None)`:
/// - `toas`, `toaerrs`, `freqs`: 1-D array-likes of length `N` (seconds,
///   seconds, MHz).
/// - `design_matrix`: `N × P` array-like; `fitpars` its `P` column labels.
/// - `flags`: `dict[str, list[str]]` with `N` values per flag.
/// - `residuals`: defaults to zeros.
///
/// Notes
/// -----
/// - The data are copied once into an `Arc` and shared by every model built
///   from this object.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "pta_noise.signals")]
pub struct Pulsar {
    inner: Arc<PulsarData>,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl Pulsar {
    #[new]
    #[pyo3(
        signature = (name, toas, toaerrs, freqs, design_matrix, fitpars, flags = None, residuals = None),
        text_signature = "(name, toas, toaerrs, freqs, design_matrix, fitpars, /, flags=None, residuals=None)"
    )]
    pub fn new<'py>(
        py: Python<'py>, name: String, toas: &Bound<'py, PyAny>, toaerrs: &Bound<'py, PyAny>,
        freqs: &Bound<'py, PyAny>, design_matrix: &Bound<'py, PyAny>, fitpars: Vec<String>,
        flags: Option<BTreeMap<String, Vec<String>>>, residuals: Option<&Bound<'py, PyAny>>,
    ) -> PyResult<Self> {
        let toas = extract_f64_vector(py, toas, "toas")?;
        let toaerrs = extract_f64_vector(py, toaerrs, "toaerrs")?;
        let freqs = extract_f64_vector(py, freqs, "freqs")?;
        let design = extract_f64_matrix(design_matrix, "design_matrix")?;
        let residuals = match residuals {
            Some(obj) => extract_f64_vector(py, obj, "residuals")?,
            None => ndarray::Array1::zeros(toas.len()),
        };
        let data = PulsarData::new(
            name,
            toas,
            toaerrs,
            residuals,
            freqs,
            flags.unwrap_or_default(),
            design,
            fitpars,
        )?;
        Ok(Pulsar { inner: Arc::new(data) })
    }

    #[getter]
    pub fn name(&self) -> String {
        self.inner.name().to_string()
    }

    #[getter]
    pub fn ntoas(&self) -> usize {
        self.inner.ntoas()
    }

    #[getter]
    pub fn toas(&self) -> Vec<f64> {
        self.inner.toas().to_vec()
    }

    #[getter]
    pub fn toaerrs(&self) -> Vec<f64> {
        self.inner.toaerrs().to_vec()
    }

    #[getter]
    pub fn residuals(&self) -> Vec<f64> {
        self.inner.residuals().to_vec()
    }

    #[getter]
    pub fn freqs(&self) -> Vec<f64> {
        self.inner.freqs().to_vec()
    }

    #[getter]
    pub fn backend_flags(&self) -> Vec<String> {
        self.inner.backend_flags().to_vec()
    }

    #[getter]
    pub fn fitpars(&self) -> Vec<String> {
        self.inner.fitpars().to_vec()
    }

    #[getter]
    pub fn tspan(&self) -> f64 {
        self.inner.tspan()
    }

    /// Values of flag `name`, or `None` if the flag is absent.
    pub fn flag(&self, name: &str) -> Option<Vec<String>> {
        self.inner.flag(name).map(<[String]>::to_vec)
    }

    pub fn __repr__(&self) -> String {
        format!("Pulsar(name={:?}, ntoas={})", self.inner.name(), self.inner.ntoas())
    }
}

/// SignalDef — Python-facing wrapper around an unbound [`SignalSpec`].
///
/// Built through the static constructors `ecorr`, `red_noise`,
/// `free_spectrum` and `timing_model`. Priors are given as a float
/// (constant) or a tuple `('uniform' | 'normal', a, b)`. Passing `common`
/// names the parameters `"{common}_{base}"` and shares them across pulsars.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "pta_noise.signals")]
#[derive(Clone)]
pub struct SignalDef {
    inner: SignalSpec,
}

#[cfg(feature = "python-bindings")]
impl SignalDef {
    fn finish(
        spec: SignalSpec, selection: Option<&str>, flag: Option<&str>, name: Option<String>,
    ) -> PyResult<Self> {
        let mut spec = spec.with_selection(extract_selection(selection, flag)?);
        if let Some(name) = name {
            spec = spec.with_name(name);
        }
        Ok(SignalDef { inner: spec })
    }
}

#[cfg(feature = "python-bindings")]
fn common_alias(common: Option<&str>, base: &str) -> Option<String> {
    common.map(|prefix| format!("{prefix}_{base}"))
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl SignalDef {
    #[staticmethod]
    #[pyo3(
        signature = (log10_ecorr = None, dt = 1.0, min_toas = 1, selection = None, flag = None, common = None, name = None),
        text_signature = "(log10_ecorr=None, dt=1.0, min_toas=1, selection=None, flag=None, common=None, name=None)"
    )]
    pub fn ecorr(
        log10_ecorr: Option<&Bound<'_, PyAny>>, dt: f64, min_toas: usize, selection: Option<&str>,
        flag: Option<&str>, common: Option<&str>, name: Option<String>,
    ) -> PyResult<Self> {
        let alias = common_alias(common, "log10_ecorr");
        let prior = extract_param_spec(log10_ecorr, ParamSpec::uniform(-8.5, -5.0)?, alias.as_deref())?;
        let spec = SignalSpec::ecorr(prior, QuantizationOptions::new(dt, min_toas)?)?;
        SignalDef::finish(spec, selection, flag, name)
    }

    #[staticmethod]
    #[pyo3(
        signature = (components = 30, tspan = None, log10_A = None, gamma = None, selection = None, flag = None, common = None, name = None),
        text_signature = "(components=30, tspan=None, log10_A=None, gamma=None, selection=None, flag=None, common=None, name=None)"
    )]
    #[allow(non_snake_case)]
    pub fn red_noise(
        components: usize, tspan: Option<f64>, log10_A: Option<&Bound<'_, PyAny>>,
        gamma: Option<&Bound<'_, PyAny>>, selection: Option<&str>, flag: Option<&str>,
        common: Option<&str>, name: Option<String>,
    ) -> PyResult<Self> {
        let log10_a = extract_param_spec(
            log10_A,
            ParamSpec::uniform(-18.0, -12.0)?,
            common_alias(common, "log10_A").as_deref(),
        )?;
        let gamma = extract_param_spec(
            gamma,
            ParamSpec::uniform(1.0, 7.0)?,
            common_alias(common, "gamma").as_deref(),
        )?;
        let spec = SignalSpec::fourier(
            Spectrum::powerlaw(log10_a, gamma),
            FourierOptions::new(components, tspan)?,
        )?;
        SignalDef::finish(spec, selection, flag, name)
    }

    #[staticmethod]
    #[pyo3(
        signature = (components = 30, tspan = None, log10_rho = None, selection = None, flag = None, common = None, name = None),
        text_signature = "(components=30, tspan=None, log10_rho=None, selection=None, flag=None, common=None, name=None)"
    )]
    pub fn free_spectrum(
        components: usize, tspan: Option<f64>, log10_rho: Option<&Bound<'_, PyAny>>,
        selection: Option<&str>, flag: Option<&str>, common: Option<&str>, name: Option<String>,
    ) -> PyResult<Self> {
        let rho = extract_param_spec(
            log10_rho,
            ParamSpec::uniform(-10.0, -4.0)?,
            common_alias(common, "log10_rho").as_deref(),
        )?
        .vector(components);
        let spec = SignalSpec::fourier(
            Spectrum::free_spectrum(rho),
            FourierOptions::new(components, tspan)?,
        )?;
        SignalDef::finish(spec, selection, flag, name)
    }

    #[staticmethod]
    #[pyo3(
        signature = (normalize = true, variance = 1e40, selection = None, flag = None, name = None),
        text_signature = "(normalize=True, variance=1e40, selection=None, flag=None, name=None)"
    )]
    pub fn timing_model(
        normalize: bool, variance: f64, selection: Option<&str>, flag: Option<&str>,
        name: Option<String>,
    ) -> PyResult<Self> {
        let spec = SignalSpec::timing_model_with(TimingModelOptions::new(normalize, variance)?)?;
        SignalDef::finish(spec, selection, flag, name)
    }

    #[getter]
    pub fn name(&self) -> String {
        self.inner.name().to_string()
    }

    pub fn __repr__(&self) -> String {
        format!("SignalDef(name={:?}, selection={})", self.inner.name(), self.inner.selection().name())
    }
}

/// NoiseModel — the combined signals of one pulsar, exposed to Python.
///
/// Constructed via `NoiseModel(pulsar, signals)` where `signals` is a list of
/// `SignalDef`. Wraps a [`SignalCollection`]; its caches use interior
/// mutability, so the class is `unsendable`.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "pta_noise.signals", unsendable)]
pub struct NoiseModel {
    inner: SignalCollection,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl NoiseModel {
    #[new]
    #[pyo3(text_signature = "(pulsar, signals, /)")]
    pub fn new(pulsar: PyRef<'_, Pulsar>, signals: Vec<PyRef<'_, SignalDef>>) -> PyResult<Self> {
        let specs: Vec<SignalSpec> = signals.iter().map(|s| s.inner.clone()).collect();
        let inner = SignalCollection::from_specs(&pulsar.inner, &specs)?;
        Ok(NoiseModel { inner })
    }

    /// Combined basis as row-major `list[list[float]]`.
    pub fn basis(&self) -> Vec<Vec<f64>> {
        matrix_to_rows(self.inner.basis())
    }

    #[getter]
    pub fn basis_shape(&self) -> (usize, usize) {
        self.inner.basis_shape()
    }

    pub fn phi(&self, params: HashMap<String, f64>) -> PyResult<Vec<f64>> {
        Ok(self.inner.phi(&params)?.to_vec())
    }

    pub fn phiinv(&self, params: HashMap<String, f64>) -> PyResult<Vec<f64>> {
        Ok(self.inner.phiinv(&params)?.to_vec())
    }

    pub fn ln_prior(&self, params: HashMap<String, f64>) -> PyResult<f64> {
        Ok(self.inner.ln_prior(&params)?)
    }

    #[getter]
    pub fn param_names(&self) -> Vec<String> {
        self.inner.param_names().into_iter().map(str::to_string).collect()
    }

    #[getter]
    pub fn free_param_names(&self) -> Vec<String> {
        self.inner.free_param_names().into_iter().map(str::to_string).collect()
    }

    #[getter]
    pub fn signal_names(&self) -> Vec<String> {
        self.inner.signals().iter().map(|s| s.name().to_string()).collect()
    }

    #[getter]
    pub fn nblocks(&self) -> usize {
        self.inner.nblocks()
    }

    /// `(start, stop)` columns of signal `i`, or `None` if out of range.
    pub fn signal_columns(&self, i: usize) -> Option<(usize, usize)> {
        self.inner.signal_columns(i).map(|r| (r.start, r.end))
    }
}

/// _pta_noise — PyO3 module initializer for the Python extension.
///
/// Key behaviors
/// -------------
/// - Create the `signals` submodule and attach it to `_pta_noise`.
/// - Register it in `sys.modules` as `pta_noise.signals` so it is importable
///   via a dotted path from Python.
///
/// Errors
/// ------
/// - `PyErr`
///   If creating the submodule or manipulating `sys.modules` fails.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _pta_noise<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let signals_mod = PyModule::new(_py, "signals")?;
    signals_module(_py, m, &signals_mod)?;

    // Manually add the submodule into sys.modules to allow for dot notation.
    _py.import("sys")?.getattr("modules")?.set_item("pta_noise.signals", signals_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn signals_module<'py>(
    _py: Python, pta_noise: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<Pulsar>()?;
    m.add_class::<SignalDef>()?;
    m.add_class::<NoiseModel>()?;
    pta_noise.add_submodule(m)?;
    Ok(())
}
