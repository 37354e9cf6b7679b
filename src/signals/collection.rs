//! Signal collection — merging and stacking signals into one basis and prior.
//!
//! Purpose
//! -------
//! Combine an ordered list of bound [`Signal`]s for one pulsar into a single
//! `N × K` basis matrix and a length-`K` prior vector aligned to its columns.
//! Signals built over identical basis support share one column block; all
//! others get independent blocks appended in declaration order.
//!
//! Key behaviors
//! -------------
//! - [`SignalCollection::combine`] validates the signals, assigns each one to
//!   a block, lays the blocks out contiguously, and builds the combined basis
//!   once. Partition replicas are zero-expanded to the full TOA height.
//! - [`SignalCollection::phi`] starts from zeros and adds each member's phi
//!   into the leading entries of its block, in declaration order; coincident
//!   frequencies therefore sum and excess columns keep the wider member's
//!   values.
//! - [`SignalCollection::phiinv`] is the elementwise reciprocal of `phi`.
//! - Per-signal caches skip unchanged blocks; the collection additionally
//!   caches the last combined vector under the concatenated parameter key.
//!
//! Invariants & assumptions
//! ------------------------
//! - Two signals share a block iff their [`BasisSignature`]s are equal and
//!   they act on the same TOA index set. The widest member's basis
//!   represents the block; ties keep the earlier member.
//! - Block positions never move after construction, so
//!   [`SignalCollection::signal_columns`] is stable across queries.
//! - A flat parameter name may appear in two different blocks only if every
//!   declaration of it is an explicit alias.
//! - Every signal is bound to the same pulsar (same `Arc<PulsarData>`) and
//!   covers its TOA count `N`.
//! - Every declaration of a shared parameter name carries the same prior.
//!
//! Conventions
//! -----------
//! - Configuration and dimension errors surface from `combine`; parameter
//!   errors surface from `phi` / `phiinv` / `ln_prior`.
//! - Reciprocals of zero prior entries are not guarded against.
//!
//! Downstream usage
//! ----------------
//! - Build through [`SignalCollection::combine`], [`SignalCollection::from_specs`]
//!   or `ModelSpec::bind`, then query `basis()` once and `phi` / `phiinv` per
//!   likelihood evaluation.
//!
//! [`BasisSignature`]: crate::signals::signal::BasisSignature
use crate::{
    pulsar::data::PulsarData,
    signals::{
        errors::{SignalError, SignalResult},
        parameter::{ParamKey, ParamSource, Parameter},
        signal::{Signal, SignalSpec},
    },
};
use ndarray::{Array1, Array2, s};
use std::{cell::RefCell, collections::HashMap, ops::Range, sync::Arc};

/// A column block shared by one or more mergeable signals.
#[derive(Debug, Clone)]
struct Block {
    /// Index of the widest member; its basis fills the block.
    representative: usize,
    /// Member signal indices in declaration order.
    members: Vec<usize>,
    columns: Range<usize>,
}

/// SignalCollection — the combined noise model of one pulsar.
///
/// Fields
/// ------
/// - `signals`: bound signals in declaration order.
/// - `blocks`: column blocks in layout order.
/// - `signal_block`: block index of each signal.
/// - `basis`: combined `N × K` basis, built once.
/// - `parameters`: distinct parameters in first-declaration order.
/// - `cache`: last combined `(key, phi)` pair.
#[derive(Debug, Clone)]
pub struct SignalCollection {
    ntoas: usize,
    signals: Vec<Signal>,
    blocks: Vec<Block>,
    signal_block: Vec<usize>,
    basis: Array2<f64>,
    parameters: Vec<Parameter>,
    cache: RefCell<Option<(ParamKey, Array1<f64>)>>,
}

impl SignalCollection {
    /// Combine bound signals into one model.
    ///
    /// Parameters
    /// ----------
    /// - `signals`: `Vec<Signal>`
    ///   Signals for a single pulsar, in declaration order.
    ///
    /// Returns
    /// -------
    /// `SignalResult<SignalCollection>`
    ///
    /// Errors
    /// ------
    /// - `SignalError::EmptyCollection` if `signals` is empty.
    /// - `SignalError::EmptyBasis` if a signal has no columns.
    /// - `SignalError::DimensionMismatch` if a basis row count differs from
    ///   its partition size, or signals disagree on the pulsar TOA count.
    /// - `SignalError::MixedPulsars` if the signals are bound to different
    ///   [`PulsarData`] instances.
    /// - `SignalError::ParameterCollision` if a non-aliased parameter name is
    ///   used by signals in different blocks.
    /// - `SignalError::ConflictingPrior` if a shared parameter name carries
    ///   different priors.
    pub fn combine(signals: Vec<Signal>) -> SignalResult<Self> {
        let first = match signals.first() {
            Some(first) => first,
            None => return Err(SignalError::EmptyCollection),
        };
        let ntoas = first.partition().ntoas();
        for sig in &signals {
            validate_signal(sig, first)?;
        }

        // ---- Block assignment ----
        let mut blocks: Vec<Block> = Vec::new();
        let mut signal_block = Vec::with_capacity(signals.len());
        for (i, sig) in signals.iter().enumerate() {
            let found = blocks
                .iter()
                .position(|block| signals[block.representative].is_mergeable_with(sig));
            match found {
                Some(b) => {
                    let block = &mut blocks[b];
                    log::debug!(
                        "merging signal `{}` into block {b} (representative `{}`)",
                        sig.name(),
                        signals[block.representative].name()
                    );
                    block.members.push(i);
                    if sig.ncols() > signals[block.representative].ncols() {
                        block.representative = i;
                    }
                    signal_block.push(b);
                }
                None => {
                    log::debug!("stacking signal `{}` as block {}", sig.name(), blocks.len());
                    signal_block.push(blocks.len());
                    blocks.push(Block { representative: i, members: vec![i], columns: 0..0 });
                }
            }
        }

        // ---- Layout ----
        let mut offset = 0;
        for block in blocks.iter_mut() {
            let width = signals[block.representative].ncols();
            block.columns = offset..offset + width;
            offset += width;
        }

        let mut basis = Array2::<f64>::zeros((ntoas, offset));
        for block in &blocks {
            let rep = &signals[block.representative];
            let mut target = basis.slice_mut(s![.., block.columns.clone()]);
            for (row, &i) in rep.partition().indices().iter().enumerate() {
                target.row_mut(i).assign(&rep.basis().matrix.row(row));
            }
        }

        let parameters = collect_parameters(&signals, &signal_block)?;

        log::debug!(
            "combined {} signals into {} blocks ({} x {} basis, {} parameters)",
            signals.len(),
            blocks.len(),
            ntoas,
            offset,
            parameters.len()
        );

        Ok(SignalCollection {
            ntoas,
            signals,
            blocks,
            signal_block,
            basis,
            parameters,
            cache: RefCell::new(None),
        })
    }

    /// Bind each definition to `psr` and combine the results.
    ///
    /// Errors
    /// ------
    /// - Any error from `SignalSpec::bind` or [`SignalCollection::combine`].
    pub fn from_specs(psr: &Arc<PulsarData>, specs: &[SignalSpec]) -> SignalResult<Self> {
        let mut signals = Vec::new();
        for spec in specs {
            signals.extend(spec.bind(psr)?);
        }
        SignalCollection::combine(signals)
    }

    pub fn ntoas(&self) -> usize {
        self.ntoas
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Number of signals (partition replicas counted individually).
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Number of column blocks after merging.
    pub fn nblocks(&self) -> usize {
        self.blocks.len()
    }

    /// Combined `N × K` basis. Independent of parameter values.
    pub fn basis(&self) -> &Array2<f64> {
        &self.basis
    }

    pub fn basis_shape(&self) -> (usize, usize) {
        self.basis.dim()
    }

    /// Columns of block `b`, or `None` if out of range.
    pub fn block_columns(&self, b: usize) -> Option<Range<usize>> {
        self.blocks.get(b).map(|block| block.columns.clone())
    }

    /// Columns that signal `i` contributes to.
    ///
    /// For a merged signal narrower than its block this is the leading part
    /// of the block. Returns `None` if `i` is out of range.
    pub fn signal_columns(&self, i: usize) -> Option<Range<usize>> {
        let sig = self.signals.get(i)?;
        let start = self.blocks[self.signal_block[i]].columns.start;
        Some(start..start + sig.ncols())
    }

    /// Distinct parameters in first-declaration order.
    pub fn params(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.parameters.iter().map(Parameter::name).collect()
    }

    /// Names of parameters the caller must supply (constants excluded).
    pub fn free_param_names(&self) -> Vec<&str> {
        self.parameters.iter().filter(|p| p.is_free()).map(Parameter::name).collect()
    }

    /// Combined prior vector aligned to [`SignalCollection::basis`].
    ///
    /// Errors
    /// ------
    /// - `SignalError::ParameterMissing` if a consumed parameter is absent.
    /// - `SignalError::NonFiniteParameter` if a supplied value is NaN/±inf.
    pub fn phi<P: ParamSource + ?Sized>(&self, params: &P) -> SignalResult<Array1<f64>> {
        let mut key = ParamKey::default();
        for sig in &self.signals {
            key.extend(&sig.param_key(params)?);
        }
        if let Some((cached_key, cached)) = self.cache.borrow().as_ref() {
            if *cached_key == key {
                log::trace!("combined phi cache hit");
                return Ok(cached.clone());
            }
        }

        let mut phi = Array1::<f64>::zeros(self.basis.ncols());
        for block in &self.blocks {
            for &m in &block.members {
                let member = self.signals[m].phi(params)?;
                let start = block.columns.start;
                let mut slot = phi.slice_mut(s![start..start + member.len()]);
                slot += &member;
            }
        }

        *self.cache.borrow_mut() = Some((key, phi.clone()));
        Ok(phi)
    }

    /// Elementwise reciprocal of [`SignalCollection::phi`].
    pub fn phiinv<P: ParamSource + ?Sized>(&self, params: &P) -> SignalResult<Array1<f64>> {
        Ok(self.phi(params)?.mapv(|p| 1.0 / p))
    }

    /// Sum of the prior log-densities of every distinct parameter.
    ///
    /// Errors
    /// ------
    /// - Lookup errors as in [`SignalCollection::phi`].
    pub fn ln_prior<P: ParamSource + ?Sized>(&self, params: &P) -> SignalResult<f64> {
        let mut total = 0.0;
        for p in &self.parameters {
            total += p.prior().ln_pdf(p.resolve(params)?);
        }
        Ok(total)
    }
}

fn validate_signal(sig: &Signal, first: &Signal) -> SignalResult<()> {
    if sig.ncols() == 0 {
        return Err(SignalError::EmptyBasis { signal: sig.name().to_string() });
    }
    let partition = sig.partition();
    let ntoas = first.partition().ntoas();
    if partition.ntoas() != ntoas {
        return Err(SignalError::DimensionMismatch {
            signal: sig.name().to_string(),
            expected: ntoas,
            actual: partition.ntoas(),
        });
    }
    if !Arc::ptr_eq(sig.pulsar(), first.pulsar()) {
        return Err(SignalError::MixedPulsars {
            first: first.name().to_string(),
            second: sig.name().to_string(),
        });
    }
    if sig.basis().nrows() != partition.len() {
        return Err(SignalError::DimensionMismatch {
            signal: sig.name().to_string(),
            expected: partition.len(),
            actual: sig.basis().nrows(),
        });
    }
    Ok(())
}

/// Deduplicate parameters and reject names shared across blocks without an
/// alias on every declaration, or shared with different priors.
fn collect_parameters(signals: &[Signal], signal_block: &[usize]) -> SignalResult<Vec<Parameter>> {
    // name -> (block, all declarations aliased, first declaring signal, slot in `parameters`)
    let mut seen: HashMap<String, (usize, bool, usize, usize)> = HashMap::new();
    let mut parameters: Vec<Parameter> = Vec::new();

    for (i, sig) in signals.iter().enumerate() {
        let block = signal_block[i];
        for p in sig.parameters() {
            match seen.get_mut(p.name()) {
                Some((first_block, all_aliased, first, slot)) => {
                    *all_aliased &= p.is_aliased();
                    if *first_block != block && !*all_aliased {
                        return Err(SignalError::ParameterCollision {
                            name: p.name().to_string(),
                            first: signals[*first].name().to_string(),
                            second: sig.name().to_string(),
                        });
                    }
                    if parameters[*slot].prior() != p.prior() {
                        return Err(SignalError::ConflictingPrior {
                            name: p.name().to_string(),
                            first: signals[*first].name().to_string(),
                            second: sig.name().to_string(),
                        });
                    }
                }
                None => {
                    seen.insert(p.name().to_string(), (block, p.is_aliased(), i, parameters.len()));
                    parameters.push(p.clone());
                }
            }
        }
    }
    Ok(parameters)
}
