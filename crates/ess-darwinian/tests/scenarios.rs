//! End-to-end scenarios for the stability engine
//!
//! - Rigid vs flexible institutions (ESS vs reform-viable CSS)
//! - Fixed-point start converging at t = 0
//! - Degenerate landscapes surfacing as errors
//! - Zero marginal fitness at a converged equilibrium
//! - Maximum principle and convergent stability of a converged ESS
//! - Hessian symmetry and stencil accuracy properties

use ess_common::config::{EssConfig, SolverSettings};
use ess_common::{AccuracyLevel, EssError, LandscapeError, StabilityKind, Trait};
use ess_darwinian::fitness::stencil;
use ess_darwinian::lockin::ReformViability;
use ess_darwinian::{
    DerivativeEstimator, FitnessLandscape, LandscapeParameters, LockInModel, PopulationDynamics,
    StabilitySolver,
};
use proptest::prelude::*;

fn landscape(lock_in: f64) -> FitnessLandscape {
    FitnessLandscape::new(LandscapeParameters::from_lock_in(lock_in).unwrap()).unwrap()
}

fn solver(lock_in: f64, t_max: f64) -> StabilitySolver {
    let settings = SolverSettings {
        t_max,
        ..SolverSettings::default()
    };
    StabilitySolver::new(landscape(lock_in), settings)
}

fn short_config() -> EssConfig {
    let mut config = EssConfig::default();
    config.solver.t_max = 300.0;
    config
}

#[test]
fn test_rigid_institution_settles_in_ess() {
    let assessment = LockInModel::from_config(0.87, &short_config())
        .unwrap()
        .assess()
        .unwrap();

    let eq = &assessment.equilibrium;
    assert_eq!(eq.stability_kind, StabilityKind::Ess);
    let curvature = eq.hessian_eigenvalues[0];
    // −r(1/σ_k² − 1/σ_α²) with σ_k = 0.52
    let expected = -0.25 * (1.0 / (0.52 * 0.52) - 0.25);
    assert!(curvature < 0.0);
    assert!((curvature - expected).abs() < 1e-3, "{} vs {}", curvature, expected);
    assert_eq!(assessment.reform_viability, ReformViability::Low);
}

#[test]
fn test_flexible_institution_is_reform_viable() {
    let assessment = LockInModel::from_config(0.24, &short_config())
        .unwrap()
        .assess()
        .unwrap();
    assert!(assessment.fitness_at_reference > 0.0);
    assert!((assessment.fitness_at_reference - 0.0423).abs() < 1e-3);
    assert_eq!(assessment.reform_viability, ReformViability::High);
}

#[test]
fn test_fixed_point_start_converges_immediately() {
    let result = solver(0.5, 100.0)
        .solve(&[Trait::scalar(0.0)], Some(&[10.0]))
        .unwrap();
    assert!(result.converged);
    assert_eq!(result.convergence_time, 0.0);
}

#[test]
fn test_zero_capacity_raises_degenerate_landscape() {
    let params = LandscapeParameters::from_lock_in(0.5)
        .unwrap()
        .with_max_carrying_capacity(0.0);
    let g = FitnessLandscape::new(params).unwrap();

    let dynamics = PopulationDynamics::new(&g, 0.1).unwrap();
    let population = ess_common::Population::uniform(vec![Trait::scalar(0.4)]).unwrap();
    assert!(matches!(
        dynamics.evolve(&population, 10.0, 0.1),
        Err(EssError::Landscape(LandscapeError::DegenerateLandscape { .. }))
    ));

    let solver = StabilitySolver::new(g, SolverSettings::default());
    assert!(matches!(
        solver.solve(&[Trait::scalar(0.4)], None),
        Err(EssError::Landscape(LandscapeError::DegenerateLandscape { .. }))
    ));
}

#[test]
fn test_fitness_vanishes_at_converged_equilibrium() {
    let result = solver(0.87, 1500.0)
        .solve(&[Trait::scalar(0.3)], None)
        .unwrap();
    assert!(result.converged);
    assert!(result.convergence_time > 0.0);
    assert!(result.max_abs_fitness() < 1e-6, "fitness {:?}", result.fitness);
    assert!(result.primary_trait().value().abs() < 1e-3);
    assert_eq!(result.stability_kind, StabilityKind::Ess);
}

#[test]
fn test_converged_ess_is_landscape_maximum_and_attracting() {
    let mut settings = SolverSettings {
        t_max: 1500.0,
        ..SolverSettings::default()
    };
    settings.maximum_principle.enabled = true;
    settings.convergence_check.enabled = true;
    let result = StabilitySolver::new(landscape(0.87), settings)
        .solve(&[Trait::scalar(0.3)], None)
        .unwrap();

    assert_eq!(result.stability_kind, StabilityKind::Ess);
    let peak = result.maximum_principle.as_ref().unwrap();
    assert!(peak.holds(), "{:?}", peak);
    assert!(peak.peak_fitness.abs() < 1e-3);
    let cs = result.convergent_stability.unwrap();
    assert!(cs.convergent_stable);
    assert_eq!(cs.returned, cs.trials);
}

#[test]
fn test_vector_ess_peaks_on_every_axis() {
    let mut settings = SolverSettings {
        t_max: 200.0,
        ..SolverSettings::default()
    };
    settings.maximum_principle.enabled = true;
    settings.maximum_principle.grid_points = 101;
    let origin = Trait::from_components(vec![0.0, 0.0]).unwrap();
    let result = StabilitySolver::new(landscape(0.87), settings)
        .solve(&[origin], None)
        .unwrap();

    let peak = result.maximum_principle.unwrap();
    assert!(peak.holds());
    assert_eq!(peak.peak_trait.dim(), 2);
    assert!(peak.peak_trait.norm_squared() < 1e-12);
}

#[test]
fn test_vector_traits_classify_through_hessian() {
    let origin = Trait::from_components(vec![0.0, 0.0, 0.0]).unwrap();

    let rigid = solver(0.87, 200.0).solve(&[origin.clone()], None).unwrap();
    assert_eq!(rigid.stability_kind, StabilityKind::Ess);
    assert_eq!(rigid.hessian_eigenvalues.len(), 3);
    assert!(rigid.invasion_resistance > 0.8);

    let flexible = solver(0.24, 200.0).solve(&[origin], None).unwrap();
    assert_eq!(flexible.stability_kind, StabilityKind::Css);
    assert_eq!(flexible.invasion_resistance, 0.0);
}

#[test]
fn test_fast_mutation_still_runs() {
    // σ²/r = 4 breaks timescale separation; only a warning is emitted
    let settings = SolverSettings {
        mutation_scale: 1.0,
        t_max: 20.0,
        ..SolverSettings::default()
    };
    let solver = StabilitySolver::new(landscape(0.5), settings);
    assert!(solver.solve(&[Trait::scalar(0.0)], None).is_ok());
}

#[test]
fn test_low_accuracy_still_classifies_strong_selection() {
    let settings = SolverSettings {
        t_max: 200.0,
        accuracy: AccuracyLevel::Low,
        ..SolverSettings::default()
    };
    let solver = StabilitySolver::new(landscape(0.87), settings);
    let result = solver.solve(&[Trait::scalar(0.0)], None).unwrap();
    assert_eq!(result.stability_kind, StabilityKind::Ess);
}

fn trait_strategy(dim: usize) -> impl Strategy<Value = Trait> {
    prop::collection::vec(-1.0f64..1.0, dim).prop_map(|c| Trait::from_components(c).unwrap())
}

proptest! {
    #[test]
    fn prop_hessian_is_exactly_symmetric(
        lock_in in 0.0f64..0.9,
        (v, residents) in (2usize..5).prop_flat_map(|dim| {
            (trait_strategy(dim), prop::collection::vec(trait_strategy(dim), 1..4))
        }),
        density in 0.0f64..100.0,
        high in any::<bool>(),
    ) {
        let g = landscape(lock_in);
        let estimator = DerivativeEstimator::new(&g);
        let densities = vec![density; residents.len()];
        let level = if high { AccuracyLevel::High } else { AccuracyLevel::Low };
        let h = estimator.hessian(&v, &residents, &densities, level).unwrap();
        for i in 0..v.dim() {
            for j in 0..v.dim() {
                prop_assert_eq!(h[(i, j)].to_bits(), h[(j, i)].to_bits());
            }
        }
    }

    #[test]
    fn prop_five_point_never_worse_than_three_point(
        a in -8i32..8,
        b in -8i32..8,
        k in 14i32..21,
    ) {
        // f = a·x² + b·x⁴, f''(0) = 2a; power-of-two steps keep samples exact
        let h = 2f64.powi(-k);
        let (a, b) = (a as f64, b as f64);
        let f = |x: f64| -> ess_common::Result<f64> { Ok(a * x * x + b * x * x * x * x) };
        let exact = 2.0 * a;
        let high = stencil::second_five_point(f, 0.0, h).unwrap();
        let low = stencil::second_three_point(f, 0.0, h).unwrap();
        prop_assert!((high - exact).abs() <= (low - exact).abs());
    }
}
