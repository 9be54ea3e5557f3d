//! Stability Solver - drive the dynamics to rest and classify the equilibrium
//!
//! Evolving → Converged | NotConverged → Classified. A run that never meets the
//! convergence threshold is still returned, flagged `converged = false` and
//! classified Unknown.

use std::sync::Arc;

use ess_common::config::SolverSettings;
use ess_common::{
    EquilibriumResult, EssError, LandscapeError, Population, Result, StabilityKind, Trait,
    EXTINCTION_DENSITY,
};
use tracing::{debug, info, instrument, warn};

use super::checks;
use crate::dynamics::{PopulationDynamics, Trajectory};
use crate::fitness::{DerivativeEstimator, FitnessLandscape};
use crate::telemetry::SolverMetrics;

/// Runs the coupled dynamics and classifies where they settle
#[derive(Debug, Clone)]
pub struct StabilitySolver {
    landscape: FitnessLandscape,
    settings: SolverSettings,
    metrics: Option<Arc<SolverMetrics>>,
}

impl StabilitySolver {
    pub fn new(landscape: FitnessLandscape, settings: SolverSettings) -> Self {
        Self {
            landscape,
            settings,
            metrics: None,
        }
    }

    /// Attach caller-owned metrics
    pub fn with_metrics(mut self, metrics: Arc<SolverMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn landscape(&self) -> &FitnessLandscape {
        &self.landscape
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Solve with the configured horizon and threshold
    ///
    /// `initial_densities` defaults to `1/n` for each of the `n` residents.
    pub fn solve(
        &self,
        initial_traits: &[Trait],
        initial_densities: Option<&[f64]>,
    ) -> Result<EquilibriumResult> {
        self.solve_until(
            initial_traits,
            initial_densities,
            self.settings.t_max,
            self.settings.convergence_threshold,
        )
    }

    /// Solve with an explicit horizon and convergence threshold
    #[instrument(
        skip(self, initial_traits, initial_densities),
        fields(residents = initial_traits.len(), lock_in = self.landscape.params().lock_in_index())
    )]
    pub fn solve_until(
        &self,
        initial_traits: &[Trait],
        initial_densities: Option<&[f64]>,
        t_max: f64,
        convergence_threshold: f64,
    ) -> Result<EquilibriumResult> {
        let result = self.run(initial_traits, initial_densities, t_max, convergence_threshold);

        if let Some(metrics) = &self.metrics {
            match &result {
                Ok((equilibrium, steps)) => metrics.observe_solve(
                    equilibrium.stability_kind,
                    equilibrium.converged,
                    *steps,
                ),
                Err(EssError::Landscape(LandscapeError::DegenerateLandscape { .. })) => {
                    metrics.degenerate_landscapes_total.inc()
                }
                Err(_) => {}
            }
        }

        result.map(|(equilibrium, _)| equilibrium)
    }

    fn run(
        &self,
        initial_traits: &[Trait],
        initial_densities: Option<&[f64]>,
        t_max: f64,
        threshold: f64,
    ) -> Result<(EquilibriumResult, usize)> {
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(LandscapeError::InvalidParameter {
                name: "convergence_threshold",
                value: threshold,
            }
            .into());
        }

        let population = match initial_densities {
            Some(densities) => Population::new(initial_traits.to_vec(), densities.to_vec())?,
            None => Population::uniform(initial_traits.to_vec())?,
        };

        let dynamics = PopulationDynamics::new(&self.landscape, self.settings.mutation_scale)?;
        let trajectory = dynamics.evolve(&population, t_max, self.settings.dt)?;
        let steps = trajectory.steps();

        let convergence = first_converged_index(&trajectory, threshold);
        let (converged, convergence_time) = match convergence {
            Some(i) => (true, trajectory.time_points[i]),
            None => {
                warn!(t_max, threshold, "Trait dynamics did not converge");
                (false, trajectory.final_time())
            }
        };

        let traits = trajectory.final_traits().to_vec();
        let densities = trajectory.final_densities().to_vec();

        let fitness = traits
            .iter()
            .map(|u| self.landscape.fitness(u, &traits, &densities))
            .collect::<Result<Vec<_>>>()?;

        let alive: Vec<&Trait> = traits
            .iter()
            .zip(&densities)
            .filter(|(_, x)| **x > EXTINCTION_DENSITY)
            .map(|(u, _)| u)
            .collect();

        let (classified, eigenvalues) = self.classify(&alive, &traits, &densities, threshold)?;

        let maximum_principle = if self.settings.maximum_principle.enabled && !alive.is_empty() {
            let check = checks::maximum_principle(
                &self.landscape,
                &alive,
                &traits,
                &densities,
                &self.settings.maximum_principle,
            )?;
            info!(
                holds = check.holds(),
                peak_fitness = check.peak_fitness,
                "Maximum principle checked"
            );
            Some(check)
        } else {
            None
        };

        let convergent_stability =
            if self.settings.convergence_check.enabled && converged && !alive.is_empty() {
                let check = checks::convergent_stability(
                    &dynamics,
                    &traits,
                    &densities,
                    t_max,
                    self.settings.dt,
                    threshold,
                    &self.settings.convergence_check,
                )?;
                info!(
                    returned = check.returned,
                    trials = check.trials,
                    "Convergent stability checked"
                );
                Some(check)
            } else {
                None
            };

        let stability_kind = match (converged, &convergent_stability) {
            (false, _) => StabilityKind::Unknown,
            (true, Some(check)) if !check.convergent_stable => StabilityKind::Repellor,
            (true, _) => classified,
        };

        let invasion_resistance = match stability_kind {
            StabilityKind::Ess => eigenvalues
                .iter()
                .copied()
                .fold(f64::INFINITY, f64::min)
                .abs(),
            _ => 0.0,
        };

        info!(
            kind = %stability_kind,
            converged,
            convergence_time,
            steps,
            "Equilibrium classified"
        );

        Ok((
            EquilibriumResult {
                traits,
                densities,
                fitness,
                stability_kind,
                hessian_eigenvalues: eigenvalues,
                convergence_time,
                converged,
                invasion_resistance,
                maximum_principle,
                convergent_stability,
            },
            steps,
        ))
    }

    /// Classify the final state over the living residents
    ///
    /// A lone scalar resident uses its curvature. Several scalar residents pool
    /// their curvatures like a spectrum, so opposite signs read as a saddle.
    /// Vector traits pool the eigenvalues of every resident's Hessian.
    fn classify(
        &self,
        alive: &[&Trait],
        traits: &[Trait],
        densities: &[f64],
        threshold: f64,
    ) -> Result<(StabilityKind, Vec<f64>)> {
        let estimator = DerivativeEstimator::new(&self.landscape);
        let level = self.settings.accuracy;

        if alive.is_empty() {
            debug!("No living residents to classify");
            return Ok((StabilityKind::Unknown, Vec::new()));
        }

        if alive[0].is_scalar() {
            let curvatures = alive
                .iter()
                .map(|u| estimator.curvature(u, traits, densities, level))
                .collect::<Result<Vec<_>>>()?;
            let kind = if curvatures.len() == 1 {
                StabilityKind::from_curvatures(&curvatures, threshold)
            } else {
                StabilityKind::from_eigenvalues(&curvatures, threshold)
            };
            Ok((kind, curvatures))
        } else {
            let mut eigenvalues = Vec::with_capacity(alive.len() * alive[0].dim());
            for u in alive {
                eigenvalues.extend(estimator.hessian_eigenvalues(u, traits, densities, level)?);
            }
            let kind = StabilityKind::from_eigenvalues(&eigenvalues, threshold);
            Ok((kind, eigenvalues))
        }
    }
}

/// First sample index whose step-to-step trait displacement is below `threshold`
pub(crate) fn first_converged_index(trajectory: &Trajectory, threshold: f64) -> Option<usize> {
    (0..trajectory.steps()).find(|&i| trajectory.trait_displacement(i) < threshold)
}
