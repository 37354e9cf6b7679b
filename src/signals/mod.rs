//! signals — basis generators, priors, and the signal composition engine.
//!
//! Purpose
//! -------
//! Model a pulsar's timing noise as a sum of Gaussian processes, each
//! expressed as a basis matrix plus a prior variance per basis column, and
//! combine any number of such signals into one basis and one prior vector.
//!
//! Key behaviors
//! -------------
//! - [`basis`]: pure generators for the quantization (ECORR), Fourier and
//!   timing-model bases.
//! - [`spectrum`]: power-law and free-spectrum priors plus constant and flat
//!   variances.
//! - [`parameter`]: parameter declarations, structured identities, the
//!   [`ParamSource`] lookup seam and typed cache keys.
//! - [`selection`]: partitioning of TOAs by backend or flag.
//! - [`signal`]: unbound [`SignalSpec`] definitions and bound [`Signal`]s.
//! - [`collection`]: [`SignalCollection`], the merge-or-stack combiner.
//! - [`options`], [`errors`]: configuration structs and the shared error
//!   type.
//!
//! Downstream usage
//! ----------------
//! ```ignore
//! let psr = Arc::new(PulsarData::new(/* ... */)?);
//! let model = SignalSpec::timing_model()
//!     + SignalSpec::fourier_basis(Spectrum::powerlaw(log10_a, gamma), 30)?
//!     + SignalSpec::ecorr_basis(log10_ecorr)?.with_selection(Selection::ByBackend);
//! let collection = model.bind(&psr)?;
//! let t = collection.basis();
//! let phiinv = collection.phiinv(&params)?;
//! ```

pub mod basis;
pub mod collection;
pub mod errors;
pub mod options;
pub mod parameter;
pub mod selection;
pub mod signal;
pub mod spectrum;

pub use self::collection::SignalCollection;
pub use self::errors::{ErrorKind, SignalError, SignalResult};
pub use self::options::{FourierOptions, QuantizationOptions, TimingModelOptions};
pub use self::parameter::{ParamId, ParamKey, ParamPrior, ParamScope, ParamSource, ParamSpec, Parameter};
pub use self::selection::{Partition, Selection};
pub use self::signal::{BasisSignature, ModelSpec, Signal, SignalKind, SignalSpec};
pub use self::spectrum::{PriorModel, Spectrum};
