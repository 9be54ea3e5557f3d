//! Coupled ecological and evolutionary dynamics
//!
//! ```text
//! dX_i/dt = X_i · G(U_i, U, X)           (ecological, fast)
//! dU_i/dt = σ² · ∂G/∂v (U_i, U, X)       (evolutionary, slow)
//! ```
//!
//! Both rules are integrated together over the state `[X_1..X_n, U_1..U_n]`
//! (trait components flattened in resident order).

use ess_common::{EssError, IntegrationError, LandscapeError, Population, Result, Trait};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::integrator::{DynamicalSystem, Rk4};
use crate::fitness::{DerivativeEstimator, FitnessLandscape};

/// σ²/r above which the fast/slow reading of the dynamics is questionable
pub const TIMESCALE_SEPARATION_LIMIT: f64 = 0.1;

/// Upper bound on integration steps for one run
pub const MAX_INTEGRATION_STEPS: usize = 10_000_000;

/// Sampled trajectory of one `evolve()` run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    /// Sample times, starting at 0 and ending exactly at t_max
    pub time_points: Vec<f64>,
    /// Resident traits at each sample
    pub traits: Vec<Vec<Trait>>,
    /// Resident densities at each sample
    pub densities: Vec<Vec<f64>>,
}

impl Trajectory {
    /// Number of integration steps taken
    pub fn steps(&self) -> usize {
        self.time_points.len().saturating_sub(1)
    }

    /// Time of the last sample
    pub fn final_time(&self) -> f64 {
        self.time_points.last().copied().unwrap_or(0.0)
    }

    /// Traits at the last sample
    pub fn final_traits(&self) -> &[Trait] {
        self.traits.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Densities at the last sample
    pub fn final_densities(&self) -> &[f64] {
        self.densities.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Euclidean norm of the trait change between samples `i` and `i + 1`
    pub fn trait_displacement(&self, i: usize) -> f64 {
        self.traits[i]
            .iter()
            .zip(&self.traits[i + 1])
            .map(|(a, b)| a.distance_squared(b))
            .sum::<f64>()
            .sqrt()
    }
}

/// Population and trait dynamics over a fitness landscape
#[derive(Debug, Clone)]
pub struct PopulationDynamics<'a> {
    landscape: &'a FitnessLandscape,
    mutation_scale: f64,
    max_steps: usize,
}

impl<'a> PopulationDynamics<'a> {
    /// Create dynamics with mutational scale σ
    ///
    /// Warns (never fails) when σ² is not small against the growth rate.
    pub fn new(landscape: &'a FitnessLandscape, mutation_scale: f64) -> Result<Self> {
        if !(mutation_scale.is_finite() && mutation_scale >= 0.0) {
            return Err(LandscapeError::InvalidParameter {
                name: "mutation_scale",
                value: mutation_scale,
            }
            .into());
        }

        let growth_rate = landscape.params().growth_rate();
        let ratio = mutation_scale * mutation_scale / growth_rate.abs();
        if ratio > TIMESCALE_SEPARATION_LIMIT {
            warn!(
                mutation_scale,
                growth_rate,
                ratio,
                limit = TIMESCALE_SEPARATION_LIMIT,
                "Evolutionary rate is not small against ecological relaxation"
            );
        }

        Ok(Self {
            landscape,
            mutation_scale,
            max_steps: MAX_INTEGRATION_STEPS,
        })
    }

    /// Lower the step cap
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.min(MAX_INTEGRATION_STEPS);
        self
    }

    pub fn mutation_scale(&self) -> f64 {
        self.mutation_scale
    }

    /// Integrate from `initial` to `t_max` with step `dt`
    ///
    /// The last step is shortened so the run ends exactly at `t_max`.
    #[instrument(skip(self, initial), fields(residents = initial.len(), dim = initial.trait_dim()))]
    pub fn evolve(&self, initial: &Population, t_max: f64, dt: f64) -> Result<Trajectory> {
        if !(t_max.is_finite() && dt.is_finite() && t_max > 0.0 && dt > 0.0) {
            return Err(IntegrationError::InvalidHorizon { t_max, dt }.into());
        }
        let steps = step_count(t_max, dt);
        if steps > self.max_steps {
            return Err(IntegrationError::TooManySteps {
                requested: steps,
                max: self.max_steps,
            }
            .into());
        }

        let system = CoupledSystem {
            estimator: DerivativeEstimator::new(self.landscape),
            variance: self.mutation_scale * self.mutation_scale,
            residents: initial.len(),
            trait_dim: initial.trait_dim(),
        };

        let mut state = system.pack(initial);
        let mut rk4 = Rk4::new(system.dim());

        let mut trajectory = Trajectory {
            time_points: Vec::with_capacity(steps + 1),
            traits: Vec::with_capacity(steps + 1),
            densities: Vec::with_capacity(steps + 1),
        };
        trajectory.time_points.push(0.0);
        trajectory.traits.push(initial.traits().to_vec());
        trajectory.densities.push(initial.densities().to_vec());

        let mut t = 0.0;
        for step in 0..steps {
            let next = if step + 1 == steps {
                t_max
            } else {
                (step + 1) as f64 * dt
            };
            // An overflowing growth rate is a blown-up state, not a landscape fault
            rk4.step(&system, &mut state, next - t, t, step)
                .map_err(|err| match err {
                    EssError::Landscape(LandscapeError::NonFiniteFitness { .. }) => {
                        IntegrationError::IntegrationDiverged { time: t, step }.into()
                    }
                    other => other,
                })?;
            t = next;

            let (traits, densities) = system.unpack(&state)?;
            trajectory.time_points.push(t);
            trajectory.traits.push(traits);
            trajectory.densities.push(densities);
        }

        debug!(steps, t_final = t, "Integration finished");
        Ok(trajectory)
    }
}

/// Number of steps of size at most `dt` that cover `[0, t_max]`
fn step_count(t_max: f64, dt: f64) -> usize {
    let ratio = t_max / dt;
    let rounded = ratio.round();
    // 5000 / 0.1 lands a hair away from 50000; don't add a sliver step for it
    let steps = if (ratio - rounded).abs() <= 1e-9 * rounded.max(1.0) {
        rounded
    } else {
        ratio.ceil()
    };
    if steps >= usize::MAX as f64 {
        usize::MAX
    } else {
        (steps as usize).max(1)
    }
}

/// ODE right-hand side over the packed state
struct CoupledSystem<'a> {
    estimator: DerivativeEstimator<'a>,
    variance: f64,
    residents: usize,
    trait_dim: usize,
}

impl CoupledSystem<'_> {
    fn pack(&self, population: &Population) -> Vec<f64> {
        let mut state = Vec::with_capacity(self.dim());
        state.extend_from_slice(population.densities());
        for t in population.traits() {
            state.extend_from_slice(t.components());
        }
        state
    }

    fn unpack(&self, state: &[f64]) -> Result<(Vec<Trait>, Vec<f64>)> {
        let (densities, flat) = state.split_at(self.residents);
        let traits = flat
            .chunks(self.trait_dim)
            .map(|c| Trait::from_components(c.to_vec()))
            .collect::<Result<Vec<_>>>()?;
        Ok((traits, densities.to_vec()))
    }

    fn landscape(&self) -> &FitnessLandscape {
        self.estimator.landscape()
    }
}

impl DynamicalSystem for CoupledSystem<'_> {
    fn dim(&self) -> usize {
        self.residents * (1 + self.trait_dim)
    }

    fn derivative(&self, state: &[f64], out: &mut [f64]) -> Result<()> {
        let (traits, densities) = self.unpack(state)?;
        let (d_density, d_trait) = out.split_at_mut(self.residents);

        for (i, u) in traits.iter().enumerate() {
            let g = self.landscape().fitness(u, &traits, &densities)?;
            d_density[i] = densities[i] * g;

            let gradient = self.estimator.gradient(u, &traits, &densities)?;
            let slot = &mut d_trait[i * self.trait_dim..(i + 1) * self.trait_dim];
            for (s, g) in slot.iter_mut().zip(gradient) {
                *s = self.variance * g;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::LandscapeParameters;

    fn landscape(lock_in: f64) -> FitnessLandscape {
        FitnessLandscape::new(LandscapeParameters::from_lock_in(lock_in).unwrap()).unwrap()
    }

    #[test]
    fn test_step_count() {
        assert_eq!(step_count(5000.0, 0.1), 50_000);
        assert_eq!(step_count(1.0, 0.3), 4);
        assert_eq!(step_count(0.05, 0.1), 1);
    }

    #[test]
    fn test_trajectory_ends_at_horizon() {
        let g = landscape(0.5);
        let dynamics = PopulationDynamics::new(&g, 0.1).unwrap();
        let pop = Population::uniform(vec![Trait::scalar(0.2)]).unwrap();
        let traj = dynamics.evolve(&pop, 1.0, 0.3).unwrap();
        assert_eq!(traj.time_points.len(), 5);
        assert_eq!(traj.final_time(), 1.0);
        assert!((traj.time_points[3] - 0.9).abs() < 1e-12);
        assert_eq!(traj.steps(), 4);
    }

    #[test]
    fn test_density_grows_towards_capacity() {
        let g = landscape(0.5);
        let dynamics = PopulationDynamics::new(&g, 0.0).unwrap();
        let pop = Population::uniform(vec![Trait::scalar(0.0)]).unwrap();
        let traj = dynamics.evolve(&pop, 100.0, 0.1).unwrap();
        let x = traj.final_densities()[0];
        assert!((x - 100.0).abs() < 1e-3, "density {}", x);
        assert_eq!(traj.final_traits()[0], Trait::scalar(0.0));
    }

    #[test]
    fn test_trait_climbs_towards_niche_center() {
        let g = landscape(0.5);
        let dynamics = PopulationDynamics::new(&g, 0.1).unwrap();
        let pop = Population::new(vec![Trait::scalar(1.0)], vec![50.0]).unwrap();
        let traj = dynamics.evolve(&pop, 50.0, 0.1).unwrap();
        let u = traj.final_traits()[0].value();
        assert!(u < 1.0 && u > 0.0, "trait {}", u);
    }

    #[test]
    fn test_zero_capacity_raises_degenerate_landscape() {
        let params = LandscapeParameters::from_lock_in(0.5)
            .unwrap()
            .with_max_carrying_capacity(0.0);
        let g = FitnessLandscape::new(params).unwrap();
        let dynamics = PopulationDynamics::new(&g, 0.1).unwrap();
        let pop = Population::uniform(vec![Trait::scalar(0.0)]).unwrap();
        let err = dynamics.evolve(&pop, 10.0, 0.1).unwrap_err();
        assert!(matches!(
            err,
            EssError::Landscape(LandscapeError::DegenerateLandscape { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_horizon_and_step_cap() {
        let g = landscape(0.5);
        let dynamics = PopulationDynamics::new(&g, 0.1).unwrap();
        let pop = Population::uniform(vec![Trait::scalar(0.0)]).unwrap();
        assert!(matches!(
            dynamics.evolve(&pop, 0.0, 0.1),
            Err(EssError::Integration(IntegrationError::InvalidHorizon { .. }))
        ));
        assert!(matches!(
            dynamics.evolve(&pop, 10.0, f64::NAN),
            Err(EssError::Integration(IntegrationError::InvalidHorizon { .. }))
        ));
        let capped = dynamics.with_max_steps(10);
        assert!(matches!(
            capped.evolve(&pop, 10.0, 0.1),
            Err(EssError::Integration(IntegrationError::TooManySteps {
                requested: 100,
                max: 10
            }))
        ));
    }

    #[test]
    fn test_negative_mutation_scale_rejected() {
        let g = landscape(0.5);
        assert!(PopulationDynamics::new(&g, -0.1).is_err());
    }

    #[test]
    fn test_explosive_growth_diverges() {
        let params = LandscapeParameters::from_lock_in(0.5)
            .unwrap()
            .with_growth_rate(1e3);
        let g = FitnessLandscape::new(params).unwrap();
        let dynamics = PopulationDynamics::new(&g, 0.0).unwrap();
        // Far above capacity: G ≈ −r·X/K drives the density through zero and beyond
        let pop = Population::new(vec![Trait::scalar(0.0)], vec![1e6]).unwrap();
        let err = dynamics.evolve(&pop, 10.0, 0.1).unwrap_err();
        assert!(matches!(
            err,
            EssError::Integration(IntegrationError::IntegrationDiverged { .. })
        ));
    }
}
