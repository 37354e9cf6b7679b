//! Selections — splitting the TOA set into disjoint, labelled partitions.
//!
//! Purpose
//! -------
//! Replicate a signal independently per observing system (backend, frontend,
//! band, or any flag) by partitioning the TOA indices on a per-TOA flag
//! value.
//!
//! Key behaviors
//! -------------
//! - [`Selection::partitions`] returns one [`Partition`] per distinct flag
//!   value, in sorted value order, each holding the TOA indices that carry
//!   that value.
//! - [`Selection::NoSelection`] yields a single unlabelled partition over
//!   every TOA.
//!
//! Invariants & assumptions
//! ------------------------
//! - Partitions from one selection are pairwise disjoint; together they cover
//!   every TOA with a non-empty flag value exactly once.
//! - Indices inside a partition are strictly increasing, so subsets keep the
//!   pulsar's row order.
//! - A value present on zero TOAs never produces a partition.
use crate::{
    pulsar::data::PulsarData,
    signals::errors::{SignalError, SignalResult},
};
use ndarray::Array1;
use std::{collections::BTreeMap, sync::Arc};

/// Selection — how a signal is replicated across TOA subsets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// One replica over every TOA.
    #[default]
    NoSelection,
    /// One replica per derived backend label.
    ByBackend,
    /// One replica per value of the `fe` flag.
    ByFrontend,
    /// One replica per value of the `B` flag.
    ByBand,
    /// One replica per value of an arbitrary flag.
    ByFlag(String),
}

impl Selection {
    /// Human-readable name used in logs and errors.
    pub fn name(&self) -> String {
        match self {
            Selection::NoSelection => "no_selection".to_string(),
            Selection::ByBackend => "by_backend".to_string(),
            Selection::ByFrontend => "by_frontend".to_string(),
            Selection::ByBand => "by_band".to_string(),
            Selection::ByFlag(flag) => format!("by_flag({flag})"),
        }
    }

    /// Partition the TOAs of `psr`.
    ///
    /// Returns
    /// -------
    /// `SignalResult<Vec<Partition>>`
    ///   Partitions sorted by label; a single unlabelled partition for
    ///   [`Selection::NoSelection`].
    ///
    /// Errors
    /// ------
    /// - `SignalError::EmptySelection` if the selecting flag is absent or
    ///   empty on every TOA.
    pub fn partitions(&self, psr: &PulsarData) -> SignalResult<Vec<Partition>> {
        let n = psr.ntoas();
        let values: &[String] = match self {
            Selection::NoSelection => {
                return Ok(vec![Partition::new(None, (0..n).collect(), n)]);
            }
            Selection::ByBackend => psr.backend_flags(),
            Selection::ByFrontend => psr.flag("fe").unwrap_or_default(),
            Selection::ByBand => psr.flag("B").unwrap_or_default(),
            Selection::ByFlag(flag) => psr.flag(flag).unwrap_or_default(),
        };

        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, value) in values.iter().enumerate() {
            if !value.is_empty() {
                groups.entry(value.as_str()).or_default().push(i);
            }
        }
        if groups.is_empty() {
            return Err(SignalError::EmptySelection { selection: self.name() });
        }

        Ok(groups
            .into_iter()
            .map(|(label, indices)| Partition::new(Some(label.to_string()), indices, n))
            .collect())
    }
}

/// Partition — a labelled subset of TOA indices.
///
/// Fields
/// ------
/// - `label`: flag value, `None` for the unselected partition.
/// - `indices`: strictly increasing TOA indices, shared cheaply between the
///   replicas' signal and the collection.
/// - `ntoas`: size of the full TOA set the indices refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    label: Option<String>,
    indices: Arc<[usize]>,
    ntoas: usize,
}

impl Partition {
    pub fn new(label: Option<String>, indices: Vec<usize>, ntoas: usize) -> Self {
        Partition { label, indices: indices.into(), ntoas }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of TOAs in the partition.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Size of the full TOA set.
    pub fn ntoas(&self) -> usize {
        self.ntoas
    }

    /// Whether the partition covers every TOA.
    pub fn is_full(&self) -> bool {
        self.indices.len() == self.ntoas
    }

    /// Same TOA subset as `other`, regardless of label.
    pub fn same_support(&self, other: &Partition) -> bool {
        self.ntoas == other.ntoas && self.indices == other.indices
    }

    /// Boolean mask over the full TOA set.
    pub fn mask(&self) -> Array1<bool> {
        let mut mask = Array1::from_elem(self.ntoas, false);
        for &i in self.indices.iter() {
            mask[i] = true;
        }
        mask
    }
}
