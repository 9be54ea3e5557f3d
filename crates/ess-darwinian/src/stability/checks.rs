//! Post-classification checks
//!
//! - Maximum principle: every living resident sits on the global maximum of
//!   G(v, U*, X*) and that maximum is zero.
//! - Convergent stability: the dynamics return to the candidate from nearby
//!   starts. Perturbations are drawn from one seeded `StdRng`, so a given seed
//!   always produces the same trials.

use ess_common::config::{ConvergenceCheckSettings, MaximumPrincipleSettings};
use ess_common::{
    ConvergentStabilityCheck, EssError, IntegrationError, LandscapeError, MaximumPrincipleCheck,
    Population, Result, Trait,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::solver::first_converged_index;
use crate::dynamics::PopulationDynamics;
use crate::fitness::FitnessLandscape;

/// Scan G along every trait axis through each living resident
///
/// Each axis spans the residents' extent on that axis plus a margin of
/// `max(span / 2, min_margin)` on both sides, sampled at `grid_points`
/// evenly spaced values.
pub fn maximum_principle(
    landscape: &FitnessLandscape,
    alive: &[&Trait],
    traits: &[Trait],
    densities: &[f64],
    settings: &MaximumPrincipleSettings,
) -> Result<MaximumPrincipleCheck> {
    let first = alive.first().ok_or_else(|| {
        EssError::Internal("maximum principle needs a living resident".to_string())
    })?;
    let n = settings.grid_points.max(2);

    let mut peak_trait = (*first).clone();
    let mut peak_fitness = f64::NEG_INFINITY;
    let mut residents_at_peak = true;

    for axis in 0..first.dim() {
        let (lo, hi) = alive.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), u| {
            let c = u.components()[axis];
            (lo.min(c), hi.max(c))
        });
        let margin = ((hi - lo) * 0.5).max(settings.min_margin);
        let (start, end) = (lo - margin, hi + margin);

        for resident in alive {
            let own = resident.components()[axis];
            let mut line_peak = (own, f64::NEG_INFINITY);
            for k in 0..n {
                let v = start + (end - start) * k as f64 / (n - 1) as f64;
                let mutant = resident.shifted(axis, v - own);
                let g = landscape.fitness(&mutant, traits, densities)?;
                if g > line_peak.1 {
                    line_peak = (v, g);
                }
                if g > peak_fitness {
                    peak_fitness = g;
                    peak_trait = mutant;
                }
            }
            if (line_peak.0 - own).abs() > settings.location_tolerance {
                debug!(axis, resident = own, peak = line_peak.0, "Scan peaks away from resident");
                residents_at_peak = false;
            }
        }
    }

    Ok(MaximumPrincipleCheck {
        peak_trait,
        peak_fitness,
        residents_at_peak,
        fitness_near_zero: peak_fitness.abs() < settings.fitness_tolerance,
    })
}

/// Re-solve from `trials` perturbed copies of the candidate traits
///
/// A trial returns when it converges and every trait component ends within
/// `absolute_tolerance + relative_tolerance × |candidate|`. A trial that
/// diverges counts as not returning.
pub fn convergent_stability(
    dynamics: &PopulationDynamics<'_>,
    traits: &[Trait],
    densities: &[f64],
    t_max: f64,
    dt: f64,
    threshold: f64,
    settings: &ConvergenceCheckSettings,
) -> Result<ConvergentStabilityCheck> {
    let p = settings.perturbation;
    if !(p.is_finite() && p >= 0.0) {
        return Err(LandscapeError::InvalidParameter {
            name: "perturbation",
            value: p,
        }
        .into());
    }
    let mut rng = StdRng::seed_from_u64(settings.random_seed);
    let mut returned = 0;

    for trial in 0..settings.trials {
        let start = traits
            .iter()
            .map(|u| {
                let components = u
                    .components()
                    .iter()
                    .map(|c| c + rng.gen_range(-p..=p))
                    .collect();
                Trait::from_components(components)
            })
            .collect::<Result<Vec<_>>>()?;
        let population = Population::new(start, densities.to_vec())?;

        let trajectory = match dynamics.evolve(&population, t_max, dt) {
            Ok(trajectory) => trajectory,
            Err(EssError::Integration(IntegrationError::IntegrationDiverged { time, .. })) => {
                debug!(trial, time, "Perturbed trial diverged");
                continue;
            }
            Err(e) => return Err(e),
        };

        let settled = first_converged_index(&trajectory, threshold).is_some();
        let close = trajectory
            .final_traits()
            .iter()
            .zip(traits)
            .flat_map(|(a, b)| a.components().iter().zip(b.components()))
            .all(|(a, b)| {
                (a - b).abs() <= settings.absolute_tolerance + settings.relative_tolerance * b.abs()
            });
        debug!(trial, settled, close, "Perturbed trial finished");
        if settled && close {
            returned += 1;
        }
    }

    let required = settings.required_fraction * settings.trials as f64;
    Ok(ConvergentStabilityCheck {
        trials: settings.trials,
        returned,
        convergent_stable: settings.trials > 0 && returned as f64 >= required,
    })
}
