//! pulsar — validated pulsar data handed to the signal engine.
//!
//! Purpose
//! -------
//! Hold the immutable per-pulsar arrays (TOAs, uncertainties, residuals,
//! radio frequencies, flags, design matrix) that the noise signals are bound
//! to. Reading timing files and computing derivatives is left to external
//! packages; this module only validates and stores their output.
//!
//! Key behaviors
//! -------------
//! - [`PulsarData`] enforces the collaborator contract (shared length `N`,
//!   finite values, design matrix shape) at construction time.
//! - [`PulsarError`] / [`PulsarResult`] report contract violations.
//!
//! Downstream usage
//! ----------------
//! - Wrap a [`PulsarData`] in an `Arc` and bind signal definitions to it via
//!   `SignalSpec::bind`; many signals and collections can share one pulsar.

pub mod data;
pub mod errors;

pub use self::data::{PulsarData, UNKNOWN_BACKEND};
pub use self::errors::{PulsarError, PulsarResult};
