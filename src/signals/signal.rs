//! Signals — unbound definitions and their per-pulsar, per-partition instances.
//!
//! Purpose
//! -------
//! Declare noise processes once ([`SignalSpec`]) and bind them to a pulsar,
//! producing one [`Signal`] per selection partition. A bound signal owns its
//! subset basis (built once) and evaluates its prior vector on demand from
//! the external parameter mapping.
//!
//! Key behaviors
//! -------------
//! - [`SignalSpec::ecorr_basis`], [`SignalSpec::fourier_basis`] and
//!   [`SignalSpec::timing_model`] build the three signal families; options
//!   and selections are attached with builder methods.
//! - [`SignalSpec::bind`] partitions the TOAs, runs the basis generator on
//!   each partition's subset, and names parameters after pulsar and
//!   partition.
//! - [`Signal::phi`] resolves the consumed parameters, serves a cached vector
//!   when the values are bit-identical to the previous query, and otherwise
//!   re-evaluates the prior model.
//! - [`ModelSpec`] collects definitions in declaration order; `a + b + c` is
//!   sugar for building one.
//!
//! Invariants & assumptions
//! ------------------------
//! - A signal's basis rows are the TOAs of its partition, in pulsar order.
//! - The [`BasisSignature`] captures everything the basis depends on besides
//!   the TOA subset; two signals with equal signatures and equal supports
//!   produce bases where the narrower is the leading block of the wider.
//! - Configuration is immutable after binding; the phi cache is keyed only by
//!   parameter values.
//!
//! Conventions
//! -----------
//! - Default base names: `log10_ecorr`, `log10_A`, `gamma`, `log10_rho`.
//! - Signal names render as `"{pulsar}_{name}[_{partition}]"`.
use crate::{
    pulsar::data::PulsarData,
    signals::{
        basis::{
            Basis, create_fourier_design_matrix, create_quantization_matrix,
            normalize_design_matrix, span,
        },
        collection::SignalCollection,
        errors::{SignalError, SignalResult},
        options::{FourierOptions, QuantizationOptions, TimingModelOptions},
        parameter::{ParamKey, ParamSource, ParamSpec, Parameter, resolve_all},
        selection::{Partition, Selection},
        spectrum::{PriorModel, Spectrum},
    },
};
use ndarray::{Array1, Array2, Axis};
use std::{
    cell::{Cell, RefCell},
    ops::Add,
    sync::Arc,
};

/// SignalKind — basis family together with its prior declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalKind {
    /// Epoch-correlated white noise on the quantization basis.
    Ecorr { log10_ecorr: ParamSpec, options: QuantizationOptions },
    /// Red noise on the Fourier basis.
    Fourier { spectrum: Spectrum, options: FourierOptions },
    /// Timing-model marginalization with an effectively flat prior.
    TimingModel { options: TimingModelOptions },
}

/// SignalSpec — an unbound signal definition.
///
/// Fields
/// ------
/// - `name`: short name used in signal names, logs and errors.
/// - `kind`: [`SignalKind`].
/// - `selection`: how the signal is replicated across TOA subsets.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSpec {
    name: String,
    kind: SignalKind,
    selection: Selection,
}

impl SignalSpec {
    /// ECORR signal with default [`QuantizationOptions`].
    ///
    /// Errors
    /// ------
    /// - `SignalError::VectorLengthMismatch` if `log10_ecorr` is a vector.
    pub fn ecorr_basis(log10_ecorr: ParamSpec) -> SignalResult<Self> {
        SignalSpec::ecorr(log10_ecorr, QuantizationOptions::default())
    }

    /// ECORR signal with explicit epoch options.
    ///
    /// Errors
    /// ------
    /// - `SignalError::VectorLengthMismatch` if `log10_ecorr` is a vector.
    /// - `SignalError::InvalidQuantizationWindow` / `InvalidMinToas` if
    ///   `options` fails [`QuantizationOptions::validate`].
    pub fn ecorr(log10_ecorr: ParamSpec, options: QuantizationOptions) -> SignalResult<Self> {
        options.validate()?;
        require_scalar(&log10_ecorr, "log10_ecorr")?;
        Ok(SignalSpec {
            name: "basis_ecorr".to_string(),
            kind: SignalKind::Ecorr { log10_ecorr, options },
            selection: Selection::NoSelection,
        })
    }

    /// Fourier red-noise signal with `components` modes and a span derived
    /// from the TOAs it acts on.
    pub fn fourier_basis(spectrum: Spectrum, components: usize) -> SignalResult<Self> {
        SignalSpec::fourier(spectrum, FourierOptions::new(components, None)?)
    }

    /// Fourier red-noise signal with explicit options.
    ///
    /// Errors
    /// ------
    /// - `SignalError::InvalidComponents` / `InvalidTspan` if `options` fails
    ///   [`FourierOptions::validate`].
    /// - `SignalError::VectorLengthMismatch` if a power-law parameter is a
    ///   vector, or a free-spectrum `log10_rho` does not have one entry per
    ///   component.
    pub fn fourier(spectrum: Spectrum, options: FourierOptions) -> SignalResult<Self> {
        options.validate()?;
        match &spectrum {
            Spectrum::PowerLaw { log10_a, gamma } => {
                require_scalar(log10_a, "log10_A")?;
                require_scalar(gamma, "gamma")?;
            }
            Spectrum::FreeSpectrum { log10_rho } => {
                let actual = log10_rho.size().unwrap_or(1);
                if actual != options.components {
                    return Err(SignalError::VectorLengthMismatch {
                        name: "log10_rho".to_string(),
                        expected: options.components,
                        actual,
                    });
                }
            }
        }
        Ok(SignalSpec {
            name: "red_noise".to_string(),
            kind: SignalKind::Fourier { spectrum, options },
            selection: Selection::NoSelection,
        })
    }

    /// Timing-model signal with default options.
    pub fn timing_model() -> Self {
        SignalSpec {
            name: "linear_timing_model".to_string(),
            kind: SignalKind::TimingModel { options: TimingModelOptions::default() },
            selection: Selection::NoSelection,
        }
    }

    /// Timing-model signal with explicit options.
    ///
    /// Errors
    /// ------
    /// - `SignalError::InvalidVariance` if `options` fails
    ///   [`TimingModelOptions::validate`].
    pub fn timing_model_with(options: TimingModelOptions) -> SignalResult<Self> {
        options.validate()?;
        Ok(SignalSpec { kind: SignalKind::TimingModel { options }, ..SignalSpec::timing_model() })
    }

    /// Replace the default short name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replicate the signal per partition of `selection`.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Fix the Fourier span instead of deriving it; no effect on other kinds.
    ///
    /// Errors
    /// ------
    /// - `SignalError::InvalidTspan` if `tspan` is not finite and > 0.
    pub fn with_tspan(mut self, tspan: f64) -> SignalResult<Self> {
        if let SignalKind::Fourier { options, .. } = &mut self.kind {
            *options = FourierOptions::new(options.components, Some(tspan))?;
        }
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &SignalKind {
        &self.kind
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Bind the definition to a pulsar.
    ///
    /// Returns
    /// -------
    /// One [`Signal`] per partition of the selection, in partition order.
    ///
    /// Errors
    /// ------
    /// - `SignalError::EmptySelection` if the selection covers no TOA.
    /// - `SignalError::EmptyBasis` if a partition yields zero basis columns.
    /// - Any basis generator error (e.g. `InvalidTspan` for a single-TOA
    ///   partition with a derived span).
    pub fn bind(&self, psr: &Arc<PulsarData>) -> SignalResult<Vec<Signal>> {
        self.selection
            .partitions(psr)?
            .into_iter()
            .map(|partition| self.bind_partition(psr, partition))
            .collect()
    }

    fn bind_partition(&self, psr: &Arc<PulsarData>, partition: Partition) -> SignalResult<Signal> {
        let name = match partition.label() {
            Some(label) => format!("{}_{}_{}", psr.name(), self.name, label),
            None => format!("{}_{}", psr.name(), self.name),
        };
        let toas = psr.toas().select(Axis(0), partition.indices());
        let pname = psr.name();
        let plabel = partition.label();

        let (basis, signature, prior, parameters) = match &self.kind {
            SignalKind::Ecorr { log10_ecorr, options } => {
                let basis = create_quantization_matrix(toas.view(), options)?;
                let signature = BasisSignature::Quantization {
                    dt_bits: options.dt.to_bits(),
                    min_toas: options.min_toas,
                };
                let params = log10_ecorr.bind("log10_ecorr", pname, plabel);
                (basis, signature, PriorModel::ConstantVariance, params)
            }
            SignalKind::Fourier { spectrum, options } => {
                let tspan = options.tspan.unwrap_or_else(|| span(toas.view()));
                let basis =
                    create_fourier_design_matrix(toas.view(), options.components, Some(tspan))?;
                let signature = BasisSignature::Fourier { tspan_bits: tspan.to_bits() };
                let (prior, params) = match spectrum {
                    Spectrum::PowerLaw { log10_a, gamma } => {
                        let mut params = log10_a.bind("log10_A", pname, plabel);
                        params.extend(gamma.bind("gamma", pname, plabel));
                        (PriorModel::PowerLaw, params)
                    }
                    Spectrum::FreeSpectrum { log10_rho } => {
                        (PriorModel::FreeSpectrum, log10_rho.bind("log10_rho", pname, plabel))
                    }
                };
                (basis, signature, prior, params)
            }
            SignalKind::TimingModel { options } => {
                let design = psr.design_matrix().select(Axis(0), partition.indices());
                let basis = normalize_design_matrix(design.view(), psr.fitpars(), options.normalize)?;
                let signature = BasisSignature::TimingModel { normalize: options.normalize };
                (basis, signature, PriorModel::Improper(options.variance), Vec::new())
            }
        };

        Signal::new(name, Arc::clone(psr), partition, signature, basis, prior, parameters)
    }
}

fn require_scalar(spec: &ParamSpec, base: &str) -> SignalResult<()> {
    match spec.size() {
        None => Ok(()),
        Some(actual) => Err(SignalError::VectorLengthMismatch {
            name: base.to_string(),
            expected: 1,
            actual,
        }),
    }
}

/// BasisSignature — the configuration a basis depends on besides its TOAs.
///
/// Floating-point settings are stored as bit patterns so equality is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasisSignature {
    Quantization { dt_bits: u64, min_toas: usize },
    Fourier { tspan_bits: u64 },
    TimingModel { normalize: bool },
}

/// Signal — a definition bound to one pulsar and one partition.
///
/// Fields
/// ------
/// - `basis`: `partition.len() × K` subset basis with column labels.
/// - `prior`: evaluation rule for the prior vector.
/// - `parameters`: consumed parameters, in the order `prior` expects them.
/// - `cache`: last `(key, phi)` pair; reused only for a bit-identical key.
///
/// Notes
/// -----
/// - Interior mutability makes `Signal` `Send` but not `Sync`.
#[derive(Debug, Clone)]
pub struct Signal {
    name: String,
    psr: Arc<PulsarData>,
    partition: Partition,
    signature: BasisSignature,
    basis: Basis,
    prior: PriorModel,
    parameters: Vec<Parameter>,
    cache: RefCell<Option<(ParamKey, Array1<f64>)>>,
    evaluations: Cell<usize>,
}

impl Signal {
    /// Assemble a signal from already-built parts.
    ///
    /// The row count of `basis` is not checked here; combining the signal
    /// into a [`SignalCollection`] does that.
    ///
    /// Errors
    /// ------
    /// - `SignalError::EmptyBasis` if `basis` has no columns.
    /// - `SignalError::InvalidPrior` if a spectral prior is paired with a
    ///   basis that has no frequency labels.
    /// - `SignalError::VectorLengthMismatch` if `parameters` does not match
    ///   the count `prior` consumes.
    pub fn new(
        name: String, psr: Arc<PulsarData>, partition: Partition, signature: BasisSignature,
        basis: Basis, prior: PriorModel, parameters: Vec<Parameter>,
    ) -> SignalResult<Self> {
        let ncols = basis.ncols();
        if ncols == 0 {
            return Err(SignalError::EmptyBasis { signal: name });
        }
        let expected = prior.required_values(ncols);
        if matches!(prior, PriorModel::PowerLaw | PriorModel::FreeSpectrum)
            && basis.frequencies().is_none()
        {
            return Err(SignalError::InvalidPrior {
                reason: format!("signal `{name}` has a spectral prior without a Fourier basis"),
            });
        }
        if parameters.len() != expected {
            return Err(SignalError::VectorLengthMismatch {
                name,
                expected,
                actual: parameters.len(),
            });
        }

        Ok(Signal {
            name,
            psr,
            partition,
            signature,
            basis,
            prior,
            parameters,
            cache: RefCell::new(None),
            evaluations: Cell::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pulsar(&self) -> &Arc<PulsarData> {
        &self.psr
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn signature(&self) -> BasisSignature {
        self.signature
    }

    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    pub fn prior_model(&self) -> PriorModel {
        self.prior
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.parameters.iter().map(Parameter::name).collect()
    }

    /// Number of basis columns.
    pub fn ncols(&self) -> usize {
        self.basis.ncols()
    }

    /// `(rows, columns)` of the subset basis.
    pub fn basis_shape(&self) -> (usize, usize) {
        self.basis.matrix.dim()
    }

    /// Whether `other` can share a column block with `self`.
    pub fn is_mergeable_with(&self, other: &Signal) -> bool {
        self.signature == other.signature && self.partition.same_support(&other.partition)
    }

    /// Basis expanded to every TOA of the pulsar; rows outside the partition
    /// are zero.
    pub fn expanded_basis(&self) -> Array2<f64> {
        let mut full = Array2::<f64>::zeros((self.partition.ntoas(), self.ncols()));
        for (row, &i) in self.partition.indices().iter().enumerate() {
            full.row_mut(i).assign(&self.basis.matrix.row(row));
        }
        full
    }

    /// Cache key over the values of the consumed parameters.
    ///
    /// Errors
    /// ------
    /// - `SignalError::ParameterMissing` / `NonFiniteParameter` from lookup.
    pub fn param_key<P: ParamSource + ?Sized>(&self, params: &P) -> SignalResult<ParamKey> {
        Ok(ParamKey::from_values(&resolve_all(&self.parameters, params)?))
    }

    /// Prior variance of each basis column.
    ///
    /// Errors
    /// ------
    /// - `SignalError::ParameterMissing` if a consumed parameter is absent.
    /// - `SignalError::NonFiniteParameter` if a supplied value is NaN/±inf.
    ///
    /// Notes
    /// -----
    /// - Returns the cached vector when every consumed value is bitwise equal
    ///   to the previous query's.
    pub fn phi<P: ParamSource + ?Sized>(&self, params: &P) -> SignalResult<Array1<f64>> {
        let values = resolve_all(&self.parameters, params)?;
        let key = ParamKey::from_values(&values);

        if let Some((cached_key, cached)) = self.cache.borrow().as_ref() {
            if *cached_key == key {
                log::trace!("phi cache hit for signal `{}`", self.name);
                return Ok(cached.clone());
            }
        }

        log::trace!("phi cache miss for signal `{}`", self.name);
        let phi = self.prior.evaluate(&self.basis, &values)?;
        self.evaluations.set(self.evaluations.get() + 1);
        *self.cache.borrow_mut() = Some((key, phi.clone()));
        Ok(phi)
    }

    /// Elementwise reciprocal of [`Signal::phi`].
    pub fn phiinv<P: ParamSource + ?Sized>(&self, params: &P) -> SignalResult<Array1<f64>> {
        Ok(self.phi(params)?.mapv(|p| 1.0 / p))
    }

    /// How many times the prior model has been evaluated (cache misses).
    pub fn phi_evaluations(&self) -> usize {
        self.evaluations.get()
    }
}

/// ModelSpec — an ordered list of signal definitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelSpec {
    specs: Vec<SignalSpec>,
}

impl ModelSpec {
    pub fn new() -> Self {
        ModelSpec::default()
    }

    pub fn push(&mut self, spec: SignalSpec) {
        self.specs.push(spec);
    }

    pub fn specs(&self) -> &[SignalSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Bind every definition to `psr` and combine the results.
    ///
    /// Errors
    /// ------
    /// - Any binding error from [`SignalSpec::bind`].
    /// - Any combination error from [`SignalCollection::combine`].
    pub fn bind(&self, psr: &Arc<PulsarData>) -> SignalResult<SignalCollection> {
        let mut signals = Vec::new();
        for spec in &self.specs {
            signals.extend(spec.bind(psr)?);
        }
        SignalCollection::combine(signals)
    }
}

impl From<SignalSpec> for ModelSpec {
    fn from(spec: SignalSpec) -> Self {
        ModelSpec { specs: vec![spec] }
    }
}

impl Add for SignalSpec {
    type Output = ModelSpec;

    fn add(self, rhs: SignalSpec) -> ModelSpec {
        ModelSpec { specs: vec![self, rhs] }
    }
}

impl Add<SignalSpec> for ModelSpec {
    type Output = ModelSpec;

    fn add(mut self, rhs: SignalSpec) -> ModelSpec {
        self.specs.push(rhs);
        self
    }
}

impl Add for ModelSpec {
    type Output = ModelSpec;

    fn add(mut self, rhs: ModelSpec) -> ModelSpec {
        self.specs.extend(rhs.specs);
        self
    }
}
