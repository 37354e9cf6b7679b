//! Named hyperparameters — declarations, structured identities, and lookup.
//!
//! Purpose
//! -------
//! Describe the hyperparameters a signal consumes, give each a structured
//! identity ([`ParamId`]) and a flat, globally unique name, and resolve their
//! values from the external parameter mapping on every query.
//!
//! Key behaviors
//! -------------
//! - [`ParamSpec`] is the unbound declaration: a prior (`Uniform`, `Normal`
//!   or `Constant`), an optional vector length, and an optional explicit
//!   alias that shares the parameter across signals and pulsars.
//! - [`ParamSpec::bind`] turns a declaration into concrete [`Parameter`]s for
//!   one pulsar and partition.
//! - [`ParamSource`] is the seam to the inference layer; it is implemented
//!   for the usual string-keyed maps.
//! - [`ParamKey`] is the typed cache key built from resolved values.
//!
//! Invariants & assumptions
//! ------------------------
//! - Flat names follow `"{pulsar}_{base}[_{partition}][_{index}]"`; aliased
//!   parameters use `"{alias}[_{index}]"` and ignore pulsar and partition.
//! - `Constant` parameters are never looked up and are not free.
//! - Resolved values must be finite; NaN/±inf are rejected at query time.
//!
//! Conventions
//! -----------
//! - Vector parameters are expanded to one scalar [`Parameter`] per element,
//!   indexed from 0.
use crate::signals::errors::{SignalError, SignalResult};
use statrs::distribution::{Continuous, Normal, Uniform};
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    hash::BuildHasher,
};

/// ParamSource — the external mapping from parameter name to value.
///
/// Implemented for `HashMap<String, f64>`, `HashMap<&str, f64>` and
/// `BTreeMap<String, f64>`; inference layers with their own storage can
/// implement it directly.
pub trait ParamSource {
    /// Value of parameter `name`, or `None` if it is absent.
    fn get_param(&self, name: &str) -> Option<f64>;
}

impl<S: BuildHasher> ParamSource for HashMap<String, f64, S> {
    fn get_param(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl<S: BuildHasher> ParamSource for HashMap<&str, f64, S> {
    fn get_param(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl ParamSource for BTreeMap<String, f64> {
    fn get_param(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

/// Prior distribution of a single hyperparameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamPrior {
    Uniform(Uniform),
    Normal(Normal),
    /// Fixed value; never looked up.
    Constant(f64),
}

impl ParamPrior {
    /// Log prior density at `value`. `Constant` priors contribute `0.0`.
    pub fn ln_pdf(&self, value: f64) -> f64 {
        match self {
            ParamPrior::Uniform(dist) => dist.ln_pdf(value),
            ParamPrior::Normal(dist) => dist.ln_pdf(value),
            ParamPrior::Constant(_) => 0.0,
        }
    }
}

/// ParamSpec — unbound hyperparameter declaration.
///
/// Fields
/// ------
/// - `prior`: [`ParamPrior`] shared by every element.
/// - `size`: `Some(n)` for a vector parameter of `n` elements.
/// - `alias`: explicit flat name; aliased parameters are intentionally shared
///   between signals (and pulsars) and are exempt from collision checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    prior: ParamPrior,
    size: Option<usize>,
    alias: Option<String>,
}

impl ParamSpec {
    /// Uniform prior on `[pmin, pmax]`.
    ///
    /// Errors
    /// ------
    /// - `SignalError::InvalidPrior` if `statrs` rejects the bounds.
    pub fn uniform(pmin: f64, pmax: f64) -> SignalResult<Self> {
        Ok(ParamSpec::from_prior(ParamPrior::Uniform(Uniform::new(pmin, pmax)?)))
    }

    /// Normal prior with mean `mu` and standard deviation `sigma`.
    ///
    /// Errors
    /// ------
    /// - `SignalError::InvalidPrior` if `statrs` rejects the parameters.
    pub fn normal(mu: f64, sigma: f64) -> SignalResult<Self> {
        Ok(ParamSpec::from_prior(ParamPrior::Normal(Normal::new(mu, sigma)?)))
    }

    /// Fixed value that is never looked up.
    pub fn constant(value: f64) -> Self {
        ParamSpec::from_prior(ParamPrior::Constant(value))
    }

    fn from_prior(prior: ParamPrior) -> Self {
        ParamSpec { prior, size: None, alias: None }
    }

    /// Give the parameter an explicit shared name.
    pub fn named(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Turn the declaration into a vector parameter of `size` elements.
    pub fn vector(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn prior(&self) -> &ParamPrior {
        &self.prior
    }

    pub fn size(&self) -> Option<usize> {
        self.size
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Bind the declaration to a pulsar and partition.
    ///
    /// Parameters
    /// ----------
    /// - `base`: base name used when no alias is set (e.g. `"log10_A"`).
    /// - `pulsar`: pulsar name prefix.
    /// - `partition`: partition label suffix, if the signal is replicated.
    ///
    /// Returns
    /// -------
    /// One [`Parameter`] for a scalar declaration, `size` parameters for a
    /// vector declaration, in index order.
    pub fn bind(&self, base: &str, pulsar: &str, partition: Option<&str>) -> Vec<Parameter> {
        let make = |index: Option<usize>| {
            let id = match &self.alias {
                Some(alias) => ParamId {
                    scope: ParamScope::Common,
                    base: alias.clone(),
                    partition: None,
                    index,
                },
                None => ParamId {
                    scope: ParamScope::Pulsar(pulsar.to_string()),
                    base: base.to_string(),
                    partition: partition.map(str::to_string),
                    index,
                },
            };
            Parameter::new(id, self.prior, self.alias.is_some())
        };

        match self.size {
            None => vec![make(None)],
            Some(n) => (0..n).map(|i| make(Some(i))).collect(),
        }
    }
}

/// Owner of a parameter name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamScope {
    /// Specific to one pulsar.
    Pulsar(String),
    /// Shared across pulsars through an explicit alias.
    Common,
}

/// ParamId — structured parameter identity (scope × base × partition × index).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId {
    pub scope: ParamScope,
    pub base: String,
    pub partition: Option<String>,
    pub index: Option<usize>,
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let ParamScope::Pulsar(pulsar) = &self.scope {
            write!(f, "{pulsar}_")?;
        }
        write!(f, "{}", self.base)?;
        if let Some(partition) = &self.partition {
            write!(f, "_{partition}")?;
        }
        if let Some(index) = self.index {
            write!(f, "_{index}")?;
        }
        Ok(())
    }
}

/// Parameter — a bound scalar hyperparameter.
///
/// The flat `name` is rendered once from `id` at binding time and used for
/// every lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    id: ParamId,
    name: String,
    prior: ParamPrior,
    aliased: bool,
}

impl Parameter {
    pub fn new(id: ParamId, prior: ParamPrior, aliased: bool) -> Self {
        let name = id.to_string();
        Parameter { id, name, prior, aliased }
    }

    pub fn id(&self) -> &ParamId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prior(&self) -> &ParamPrior {
        &self.prior
    }

    /// Whether the name was set through an explicit alias.
    pub fn is_aliased(&self) -> bool {
        self.aliased
    }

    /// Whether the value must be supplied by the caller.
    pub fn is_free(&self) -> bool {
        !matches!(self.prior, ParamPrior::Constant(_))
    }

    /// Resolve the current value.
    ///
    /// Errors
    /// ------
    /// - `SignalError::ParameterMissing` if a free parameter is absent.
    /// - `SignalError::NonFiniteParameter` if the supplied value is NaN/±inf.
    pub fn resolve<P: ParamSource + ?Sized>(&self, params: &P) -> SignalResult<f64> {
        let value = match self.prior {
            ParamPrior::Constant(value) => value,
            _ => params
                .get_param(&self.name)
                .ok_or_else(|| SignalError::ParameterMissing { name: self.name.clone() })?,
        };
        if !value.is_finite() {
            return Err(SignalError::NonFiniteParameter { name: self.name.clone(), value });
        }
        Ok(value)
    }
}

/// Resolve every parameter in order.
pub fn resolve_all<P: ParamSource + ?Sized>(
    parameters: &[Parameter], params: &P,
) -> SignalResult<Vec<f64>> {
    parameters.iter().map(|p| p.resolve(params)).collect()
}

/// ParamKey — typed cache key over the bit patterns of resolved values.
///
/// Two keys are equal iff every value is bitwise identical, so cached
/// outputs are reused only for bit-identical inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ParamKey(Vec<u64>);

impl ParamKey {
    pub fn from_values(values: &[f64]) -> Self {
        ParamKey(values.iter().map(|v| v.to_bits()).collect())
    }

    /// Append another key, for keys spanning several signals.
    pub fn extend(&mut self, other: &ParamKey) {
        self.0.extend_from_slice(&other.0);
    }
}
