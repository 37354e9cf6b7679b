//! Integration tests for signal binding and basis combination.
//!
//! Purpose
//! -------
//! - Validate the end-to-end noise-model pipeline: from validated pulsar
//!   data, through signal definitions and selections, to the combined basis
//!   and prior vectors consumed by a likelihood.
//! - Exercise a realistic multi-backend data set (epochs of several TOAs,
//!   irregular cadence, a three-column design matrix) rather than toy inputs
//!   only.
//!
//! Coverage
//! --------
//! - `pulsar::data`:
//!   - `PulsarData` construction and backend labels derived from `fe`/`be`.
//! - `signals::signal` / `signals::selection`:
//!   - ECORR, power-law, free-spectrum and timing-model signals, with and
//!     without a backend selection.
//! - `signals::collection`:
//!   - Merge rule over identical spans, stacking over different spans, triple
//!     combination, derived versus explicit spans, and `phi`/`phiinv`
//!     agreement.
//!
//! Exclusions
//! ----------
//! - Basis generator edge cases (unsorted input, `min_toas`, degenerate
//!   columns); these are covered by unit tests.
//! - Python bindings; those are exercised from the Python package.
use ndarray::{Array1, Array2, Axis, concatenate, s};
use pta_noise::{
    pulsar::data::PulsarData,
    signals::{
        ErrorKind, ParamSpec, Selection, SignalCollection, SignalSpec, Spectrum,
        basis::create_quantization_matrix, options::QuantizationOptions, spectrum::powerlaw,
    },
};
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

const PSR: &str = "J1909-3744";
const N_EPOCHS: usize = 20;
const TOAS_PER_EPOCH: usize = 3;

/// Purpose
/// -------
/// Build a synthetic pulsar with `N_EPOCHS` epochs of `TOAS_PER_EPOCH` TOAs
/// each, alternating between two observing systems.
///
/// Layout
/// ------
/// - Epoch `e` starts at `4.8e9 + 4e6·e + 1e4·e²` seconds; TOAs inside an
///   epoch are 0.2 s apart, so the default 1 s window groups them.
/// - Even epochs: `fe = "430"`, `be = "ASP"`, `B = "430"`.
///   Odd epochs: `fe = "L-wide"`, `be = "PUPPI"`, `B = "1400"`.
///   No `group`/`f` flags, so backends derive as `"{fe}_{be}"`.
/// - Design matrix columns `[1, x, x²]` with `x = (t − t₀) / 1e8`.
///
/// Invariants
/// ----------
/// - Construction never fails for these inputs; a failure is treated as a
///   test configuration error.
fn make_pulsar() -> Arc<PulsarData> {
    let n = N_EPOCHS * TOAS_PER_EPOCH;
    let toas = Array1::from_shape_fn(n, |i| {
        let e = (i / TOAS_PER_EPOCH) as f64;
        let k = (i % TOAS_PER_EPOCH) as f64;
        4.8e9 + 4.0e6 * e + 1.0e4 * e * e + 0.2 * k
    });

    let per_epoch = |even: &str, odd: &str| -> Vec<String> {
        (0..n)
            .map(|i| if (i / TOAS_PER_EPOCH) % 2 == 0 { even } else { odd }.to_string())
            .collect()
    };
    let mut flags = BTreeMap::new();
    flags.insert("fe".to_string(), per_epoch("430", "L-wide"));
    flags.insert("be".to_string(), per_epoch("ASP", "PUPPI"));
    flags.insert("B".to_string(), per_epoch("430", "1400"));

    let freqs = Array1::from_shape_fn(n, |i| if (i / TOAS_PER_EPOCH) % 2 == 0 { 430.0 } else { 1400.0 });
    let t0 = toas[0];
    let design = Array2::from_shape_fn((n, 3), |(i, j)| ((toas[i] - t0) / 1.0e8).powi(j as i32));

    let psr = PulsarData::new(
        PSR,
        toas,
        Array1::from_elem(n, 5.0e-7),
        Array1::zeros(n),
        freqs,
        flags,
        design,
        vec!["Offset".to_string(), "F0".to_string(), "F1".to_string()],
    )
    .expect("PulsarData::new should accept the synthetic data set");
    Arc::new(psr)
}

fn params(entries: &[(String, f64)]) -> HashMap<String, f64> {
    entries.iter().cloned().collect()
}

fn key(base: &str) -> String {
    format!("{PSR}_{base}")
}

fn powerlaw_spectrum() -> Spectrum {
    Spectrum::powerlaw(
        ParamSpec::uniform(-20.0, -11.0).expect("valid bounds"),
        ParamSpec::uniform(0.0, 7.0).expect("valid bounds"),
    )
}

#[test]
// Purpose
// -------
// A single unpartitioned ECORR signal reproduces the reference epoch
// indicator matrix and phi = 10^(2p) per epoch, including a negative value.
//
// Expect
// ------
// - Basis column e is 1 exactly on the TOAs of epoch e.
// - phi entries equal 10^(-12.8) for p = -6.4; phiinv is their reciprocal.
fn ecorr_signal_matches_reference_epochs() {
    let psr = make_pulsar();
    let spec = SignalSpec::ecorr_basis(ParamSpec::uniform(-8.5, -5.0).unwrap()).unwrap();
    let model = SignalCollection::from_specs(&psr, &[spec]).unwrap();

    let reference = Array2::from_shape_fn((psr.ntoas(), N_EPOCHS), |(i, e)| {
        if i / TOAS_PER_EPOCH == e { 1.0 } else { 0.0 }
    });
    assert_eq!(model.basis(), &reference);

    let direct = create_quantization_matrix(psr.toas().view(), &QuantizationOptions::default()).unwrap();
    assert_eq!(direct.matrix, reference);

    let p = params(&[(key("log10_ecorr"), -6.4)]);
    let phi = model.phi(&p).unwrap();
    assert_eq!(phi, Array1::from_elem(N_EPOCHS, 10f64.powf(2.0 * -6.4)));
    approx::assert_relative_eq!(phi[0], 10f64.powf(-12.8), max_relative = 1e-14);
    assert_eq!(model.phiinv(&p).unwrap(), phi.mapv(|v| 1.0 / v));
}

#[test]
// Purpose
// -------
// A single Fourier signal with M = 30 has 60 columns and
// phi[k] = PowerLaw(f_k) · (1/T) with T the derived span.
fn fourier_signal_has_sixty_columns_and_powerlaw_prior() {
    let psr = make_pulsar();
    let spec = SignalSpec::fourier_basis(powerlaw_spectrum(), 30).unwrap();
    let model = SignalCollection::from_specs(&psr, &[spec]).unwrap();

    assert_eq!(model.basis_shape(), (psr.ntoas(), 60));

    let (log10_a, gamma) = (-14.3, 3.9);
    let p = params(&[(key("log10_A"), log10_a), (key("gamma"), gamma)]);
    let phi = model.phi(&p).unwrap();
    let t = psr.tspan();
    for k in 0..30 {
        let f = (k + 1) as f64 / t;
        let expected = powerlaw(Array1::from_elem(1, f).view(), log10_a, gamma)[0] * (1.0 / t);
        assert_eq!(phi[2 * k], expected);
        assert_eq!(phi[2 * k + 1], expected);
    }
    assert_eq!(model.phiinv(&p).unwrap(), phi.mapv(|v| 1.0 / v));
}

#[test]
// Purpose
// -------
// Partition replicas of an ECORR signal split the unpartitioned epochs:
// column counts add up and the masks are disjoint and exhaustive.
fn backend_partitions_split_columns_and_cover_every_toa() {
    let psr = make_pulsar();
    let log10_ecorr = ParamSpec::uniform(-8.5, -5.0).unwrap();
    let full = SignalSpec::ecorr_basis(log10_ecorr.clone()).unwrap().bind(&psr).unwrap();
    let split = SignalSpec::ecorr_basis(log10_ecorr)
        .unwrap()
        .with_selection(Selection::ByBackend)
        .bind(&psr)
        .unwrap();

    let labels: Vec<_> = split.iter().map(|s| s.partition().label().unwrap().to_string()).collect();
    assert_eq!(labels, ["430_ASP", "L-wide_PUPPI"]);
    let replica_cols: usize = split.iter().map(|s| s.ncols()).sum();
    assert_eq!(replica_cols, full[0].ncols());

    let mut coverage = Array1::<usize>::zeros(psr.ntoas());
    for sig in &split {
        coverage += &sig.partition().mask().mapv(usize::from);
    }
    assert!(coverage.iter().all(|&c| c == 1));

    let model = SignalCollection::combine(split).unwrap();
    let mut p = HashMap::new();
    p.insert(key("log10_ecorr_430_ASP"), -6.0);
    p.insert(key("log10_ecorr_L-wide_PUPPI"), -7.0);
    let phi = model.phi(&p).unwrap();
    assert_eq!(phi.len(), N_EPOCHS);
    assert_eq!(model.basis().sum_axis(Axis(1)), Array1::from_elem(psr.ntoas(), 1.0));
}

#[test]
// Purpose
// -------
// Merge rule over an identical span: (30, 20) components give a 60-column
// block whose first 40 entries are p1[:40] + p2 and the rest p1[40:].
fn same_span_fourier_signals_add_overlapping_priors() {
    let psr = make_pulsar();
    let t = 1.1 * psr.tspan();
    let rn1 = SignalSpec::fourier_basis(powerlaw_spectrum(), 30).unwrap().with_tspan(t).unwrap();
    let rn2 = SignalSpec::fourier_basis(
        Spectrum::powerlaw(
            ParamSpec::uniform(-20.0, -11.0).unwrap().named("gw_log10_A"),
            ParamSpec::constant(13.0 / 3.0).named("gw_gamma"),
        ),
        20,
    )
    .unwrap()
    .with_tspan(t)
    .unwrap();

    let model = (rn1 + rn2).bind(&psr).unwrap();

    assert_eq!(model.nblocks(), 1);
    assert_eq!(model.basis_shape(), (psr.ntoas(), 60));
    let p = params(&[(key("log10_A"), -14.0), (key("gamma"), 4.0), ("gw_log10_A".to_string(), -14.7)]);
    let p1 = model.signals()[0].phi(&p).unwrap();
    let p2 = model.signals()[1].phi(&p).unwrap();
    let phi = model.phi(&p).unwrap();

    let head = &p1.slice(s![..40]) + &p2;
    assert_eq!(phi.slice(s![..40]), head);
    assert_eq!(phi.slice(s![40..]), p1.slice(s![40..]));
    assert_eq!(model.free_param_names(), [key("log10_A"), key("gamma"), "gw_log10_A".to_string()]);
}

#[test]
// Purpose
// -------
// Different spans stack: column count is the exact sum and the prior vector
// is the exact concatenation.
fn different_span_fourier_signals_concatenate() {
    let psr = make_pulsar();
    let t = psr.tspan();
    let rn = SignalSpec::fourier_basis(powerlaw_spectrum(), 30).unwrap();
    let gw = SignalSpec::fourier_basis(
        Spectrum::powerlaw(
            ParamSpec::uniform(-18.0, -14.0).unwrap().named("gw_log10_A"),
            ParamSpec::uniform(0.0, 7.0).unwrap().named("gw_gamma"),
        ),
        20,
    )
    .unwrap()
    .with_tspan(2.0 * t)
    .unwrap();

    let model = (rn + gw).bind(&psr).unwrap();

    assert_eq!(model.nblocks(), 2);
    assert_eq!(model.basis_shape(), (psr.ntoas(), 100));
    let p = params(&[
        (key("log10_A"), -14.0),
        (key("gamma"), 4.0),
        ("gw_log10_A".to_string(), -15.0),
        ("gw_gamma".to_string(), 13.0 / 3.0),
    ]);
    let p1 = model.signals()[0].phi(&p).unwrap();
    let p2 = model.signals()[1].phi(&p).unwrap();
    let expected = concatenate(Axis(0), &[p1.view(), p2.view()]).unwrap();
    assert_eq!(model.phi(&p).unwrap(), expected);
}

#[test]
// Purpose
// -------
// Epoch + Fourier + timing model: E + 60 + P columns, prior vector is the
// concatenation in declaration order, and the timing block is unit-norm.
fn triple_combination_stacks_in_declaration_order() {
    let psr = make_pulsar();
    let model = (SignalSpec::ecorr_basis(ParamSpec::uniform(-8.5, -5.0).unwrap()).unwrap()
        + SignalSpec::fourier_basis(powerlaw_spectrum(), 30).unwrap()
        + SignalSpec::timing_model())
    .bind(&psr)
    .unwrap();

    assert_eq!(model.basis_shape(), (psr.ntoas(), N_EPOCHS + 60 + 3));
    assert_eq!(model.signal_columns(0), Some(0..N_EPOCHS));
    assert_eq!(model.signal_columns(1), Some(N_EPOCHS..N_EPOCHS + 60));
    assert_eq!(model.signal_columns(2), Some(N_EPOCHS + 60..N_EPOCHS + 63));

    let p = params(&[(key("log10_ecorr"), -6.4), (key("log10_A"), -14.0), (key("gamma"), 4.33)]);
    let parts: Vec<Array1<f64>> = model.signals().iter().map(|s| s.phi(&p).unwrap()).collect();
    let views: Vec<_> = parts.iter().map(|a| a.view()).collect();
    let expected = concatenate(Axis(0), &views).unwrap();
    let phi = model.phi(&p).unwrap();
    assert_eq!(phi, expected);
    assert_eq!(model.phiinv(&p).unwrap(), phi.mapv(|v| 1.0 / v));

    let tm = model.basis().slice(s![.., N_EPOCHS + 60..]);
    for col in tm.columns() {
        approx::assert_relative_eq!(col.dot(&col), 1.0, epsilon = 1e-12);
    }

    let missing = model.phi(&HashMap::<String, f64>::new()).unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::ParameterMissing);
}

#[test]
// Purpose
// -------
// Derived spans on different partitions never merge, while an explicit
// span equal to the derived span on the same TOA set does.
fn derived_and_explicit_spans_merge_only_on_identical_support() {
    let psr = make_pulsar();

    let per_backend = SignalSpec::fourier_basis(powerlaw_spectrum(), 10)
        .unwrap()
        .with_selection(Selection::ByBackend);
    let split = SignalCollection::from_specs(&psr, &[per_backend]).unwrap();
    assert_eq!(split.nblocks(), 2);
    assert_eq!(
        split.param_names(),
        [key("log10_A_430_ASP"), key("gamma_430_ASP"), key("log10_A_L-wide_PUPPI"), key("gamma_L-wide_PUPPI")]
    );

    let derived = SignalSpec::fourier_basis(powerlaw_spectrum(), 10).unwrap();
    let explicit = SignalSpec::fourier_basis(
        Spectrum::free_spectrum(ParamSpec::uniform(-10.0, -4.0).unwrap().vector(5)),
        5,
    )
    .unwrap()
    .with_tspan(psr.tspan())
    .unwrap();
    let merged = SignalCollection::from_specs(&psr, &[derived, explicit]).unwrap();
    assert_eq!(merged.nblocks(), 1);
    assert_eq!(merged.basis_shape(), (psr.ntoas(), 20));

    let mut p = params(&[(key("log10_A"), -14.0), (key("gamma"), 4.0)]);
    for k in 0..5 {
        p.insert(key(&format!("log10_rho_{k}")), -7.0 - k as f64);
    }
    let pl = merged.signals()[0].phi(&p).unwrap();
    let phi = merged.phi(&p).unwrap();
    for k in 0..5 {
        let rho = 10f64.powf(2.0 * (-7.0 - k as f64));
        assert_eq!(phi[2 * k], pl[2 * k] + rho);
        assert_eq!(phi[2 * k + 1], pl[2 * k + 1] + rho);
    }
    assert_eq!(phi.slice(s![10..]), pl.slice(s![10..]));
}

#[test]
// Purpose
// -------
// Equal spans are not enough to merge: per-backend replicas and a common
// signal at the same T act on different TOA sets and must stack.
//
// Given
// -----
// - A backend-selected power law with 30 components at T = Tmax.
// - A common power law with 20 components, once at an explicit T = Tmax and
//   once with T derived from the full data set (bitwise equal to Tmax).
//
// Expect
// ------
// - Three blocks and an N × (2·60 + 40) basis.
// - The common signal's phi is the tail of the combined phi and its basis
//   fills every row of the last 40 columns.
// - Each backend block is zero outside its own TOAs.
fn identical_span_on_different_support_is_stacked() {
    let psr = make_pulsar();
    let tmax = psr.tspan();

    let per_backend = SignalSpec::fourier_basis(powerlaw_spectrum(), 30)
        .unwrap()
        .with_tspan(tmax)
        .unwrap()
        .with_selection(Selection::ByBackend);
    let common_explicit = SignalSpec::fourier_basis(powerlaw_spectrum(), 20)
        .unwrap()
        .with_tspan(tmax)
        .unwrap()
        .with_name("common_red_noise");
    let common_derived = SignalSpec::fourier_basis(powerlaw_spectrum(), 20)
        .unwrap()
        .with_name("common_red_noise");

    let p = params(&[
        (key("log10_A_430_ASP"), -14.2),
        (key("gamma_430_ASP"), 3.1),
        (key("log10_A_L-wide_PUPPI"), -13.8),
        (key("gamma_L-wide_PUPPI"), 4.4),
        (key("log10_A"), -14.5),
        (key("gamma"), 13.0 / 3.0),
    ]);

    for common in [common_explicit, common_derived] {
        let model = SignalCollection::from_specs(&psr, &[per_backend.clone(), common]).unwrap();

        assert_eq!(model.nblocks(), 3);
        assert_eq!(model.basis_shape(), (psr.ntoas(), 2 * 60 + 40));
        assert_eq!(model.signal_columns(2), Some(120..160));

        let phi = model.phi(&p).unwrap();
        let tail = model.signals()[2].phi(&p).unwrap();
        assert_eq!(phi.slice(s![120..]), tail);
        assert_eq!(model.phiinv(&p).unwrap(), phi.mapv(|v| 1.0 / v));

        let common_cols = model.basis().slice(s![.., 120..]);
        assert_eq!(common_cols, model.signals()[2].expanded_basis());
        assert!(common_cols.rows().into_iter().all(|row| row.iter().any(|&v| v != 0.0)));

        let asp = model.basis().slice(s![.., 0..60]);
        for (i, row) in asp.rows().into_iter().enumerate() {
            let odd_epoch = (i / TOAS_PER_EPOCH) % 2 == 1;
            assert_eq!(odd_epoch, row.iter().all(|&v| v == 0.0));
        }
    }
}
