//! Lotka-Volterra G-function with trait-dependent carrying capacity
//!
//! ```text
//! K(v)    = K_max · exp(−|v|² / (2σ_k²))
//! a(v, u) = exp(−|v − u − β|² / (2σ_α²))
//! G(v, U, X) = r · (K(v) − Σ_j a(v, U_j)·X_j) / K(v)
//! ```
//!
//! The niche width is not set directly: σ_k = σ_max · (1 − L) for lock-in
//! index L, so rigid institutions occupy a narrow niche.

use ess_common::config::LandscapeSettings;
use ess_common::{LandscapeError, Result, Trait};
use serde::{Deserialize, Serialize};

/// G-function parameters, immutable for one solver run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandscapeParameters {
    growth_rate: f64,
    max_carrying_capacity: f64,
    max_niche_width: f64,
    lock_in_index: f64,
    competition_width: f64,
    asymmetry: f64,
}

impl Default for LandscapeParameters {
    fn default() -> Self {
        // σ_max = 4 at L = 0.5 gives the reference σ_k = 2
        Self::from_settings(0.5, &LandscapeSettings::default())
    }
}

impl LandscapeParameters {
    /// Parameters for a lock-in index with default constants
    pub fn from_lock_in(lock_in_index: f64) -> Result<Self> {
        Self::from_lock_in_with(lock_in_index, &LandscapeSettings::default())
    }

    /// Parameters for a lock-in index with configured constants
    pub fn from_lock_in_with(lock_in_index: f64, settings: &LandscapeSettings) -> Result<Self> {
        if !(0.0..=1.0).contains(&lock_in_index) {
            return Err(LandscapeError::InvalidParameter {
                name: "lock_in_index",
                value: lock_in_index,
            }
            .into());
        }
        let params = Self::from_settings(lock_in_index, settings);
        params.validate()?;
        Ok(params)
    }

    fn from_settings(lock_in_index: f64, settings: &LandscapeSettings) -> Self {
        Self {
            growth_rate: settings.growth_rate,
            max_carrying_capacity: settings.max_carrying_capacity,
            max_niche_width: settings.max_niche_width,
            lock_in_index,
            competition_width: settings.competition_width,
            asymmetry: settings.asymmetry,
        }
    }

    /// Override the growth rate r
    pub fn with_growth_rate(mut self, growth_rate: f64) -> Self {
        self.growth_rate = growth_rate;
        self
    }

    /// Override K_max (zero is accepted and surfaces as a degenerate landscape)
    pub fn with_max_carrying_capacity(mut self, max_carrying_capacity: f64) -> Self {
        self.max_carrying_capacity = max_carrying_capacity;
        self
    }

    /// Override the competition width σ_α
    pub fn with_competition_width(mut self, competition_width: f64) -> Self {
        self.competition_width = competition_width;
        self
    }

    /// Override the asymmetry β
    pub fn with_asymmetry(mut self, asymmetry: f64) -> Self {
        self.asymmetry = asymmetry;
        self
    }

    /// Check every constant is finite and in range
    pub fn validate(&self) -> Result<()> {
        let checks: [(&'static str, f64, bool); 5] = [
            ("growth_rate", self.growth_rate, self.growth_rate.is_finite()),
            (
                "max_carrying_capacity",
                self.max_carrying_capacity,
                self.max_carrying_capacity.is_finite() && self.max_carrying_capacity >= 0.0,
            ),
            (
                "max_niche_width",
                self.max_niche_width,
                self.max_niche_width.is_finite() && self.max_niche_width >= 0.0,
            ),
            (
                "competition_width",
                self.competition_width,
                self.competition_width.is_finite() && self.competition_width > 0.0,
            ),
            ("asymmetry", self.asymmetry, self.asymmetry.is_finite()),
        ];
        for (name, value, ok) in checks {
            if !ok {
                return Err(LandscapeError::InvalidParameter { name, value }.into());
            }
        }
        Ok(())
    }

    #[inline]
    pub fn growth_rate(&self) -> f64 {
        self.growth_rate
    }

    #[inline]
    pub fn max_carrying_capacity(&self) -> f64 {
        self.max_carrying_capacity
    }

    #[inline]
    pub fn lock_in_index(&self) -> f64 {
        self.lock_in_index
    }

    /// Derived niche width σ_k = σ_max · (1 − L)
    #[inline]
    pub fn niche_width(&self) -> f64 {
        self.max_niche_width * (1.0 - self.lock_in_index)
    }

    #[inline]
    pub fn competition_width(&self) -> f64 {
        self.competition_width
    }

    #[inline]
    pub fn asymmetry(&self) -> f64 {
        self.asymmetry
    }
}

/// Fitness-generating function
///
/// Pure and deterministic; safe to probe at arbitrary off-grid traits.
#[derive(Debug, Clone)]
pub struct FitnessLandscape {
    params: LandscapeParameters,
}

impl FitnessLandscape {
    pub fn new(params: LandscapeParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &LandscapeParameters {
        &self.params
    }

    /// Carrying capacity K(v)
    pub fn carrying_capacity(&self, v: &Trait) -> f64 {
        let sigma_k = self.params.niche_width();
        self.params.max_carrying_capacity * (-v.norm_squared() / (2.0 * sigma_k * sigma_k)).exp()
    }

    /// Competition coefficient a(v, u) in (0, 1]
    pub fn competition(&self, v: &Trait, u: &Trait) -> f64 {
        let beta = self.params.asymmetry;
        let sigma_a = self.params.competition_width;
        let dist: f64 = v
            .components()
            .iter()
            .zip(u.components())
            .map(|(vi, ui)| {
                let d = vi - ui - beta;
                d * d
            })
            .sum();
        (-dist / (2.0 * sigma_a * sigma_a)).exp()
    }

    /// Per-capita growth rate G(v, U, X) of trait `v` among residents
    pub fn fitness(&self, v: &Trait, traits: &[Trait], densities: &[f64]) -> Result<f64> {
        if traits.len() != densities.len() {
            return Err(LandscapeError::ResidentMismatch {
                traits: traits.len(),
                densities: densities.len(),
            }
            .into());
        }
        if let Some(u) = traits.iter().find(|u| u.dim() != v.dim()) {
            return Err(LandscapeError::DimensionMismatch {
                expected: v.dim(),
                actual: u.dim(),
            }
            .into());
        }

        let k = self.carrying_capacity(v);
        if !(k > 0.0 && k.is_finite()) {
            return Err(LandscapeError::DegenerateLandscape {
                trait_value: v.components().to_vec(),
                carrying_capacity: k,
            }
            .into());
        }

        let crowding: f64 = traits
            .iter()
            .zip(densities)
            .map(|(u, x)| self.competition(v, u) * x)
            .sum();

        let g = self.params.growth_rate * (k - crowding) / k;
        if !g.is_finite() {
            return Err(LandscapeError::NonFiniteFitness {
                trait_value: v.components().to_vec(),
            }
            .into());
        }
        Ok(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ess_common::EssError;

    fn landscape(lock_in: f64) -> FitnessLandscape {
        FitnessLandscape::new(LandscapeParameters::from_lock_in(lock_in).unwrap()).unwrap()
    }

    #[test]
    fn test_niche_width_shrinks_with_lock_in() {
        let low = LandscapeParameters::from_lock_in(0.24).unwrap();
        let high = LandscapeParameters::from_lock_in(0.87).unwrap();
        assert!((low.niche_width() - 3.04).abs() < 1e-12);
        assert!((high.niche_width() - 0.52).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_out_of_range_lock_in() {
        assert!(LandscapeParameters::from_lock_in(-0.1).is_err());
        assert!(LandscapeParameters::from_lock_in(1.5).is_err());
    }

    #[test]
    fn test_carrying_capacity_peak() {
        let g = landscape(0.5);
        assert_eq!(g.carrying_capacity(&Trait::scalar(0.0)), 100.0);
        assert!(g.carrying_capacity(&Trait::scalar(1.0)) < 100.0);
    }

    #[test]
    fn test_competition_symmetric_without_asymmetry() {
        let g = landscape(0.5);
        let a = Trait::scalar(0.3);
        let b = Trait::scalar(-0.4);
        assert_eq!(g.competition(&a, &b), g.competition(&b, &a));
        assert_eq!(g.competition(&a, &a), 1.0);
    }

    #[test]
    fn test_fitness_zero_at_carrying_capacity() {
        let g = landscape(0.5);
        let u = Trait::scalar(0.0);
        let fitness = g.fitness(&u, &[u.clone()], &[100.0]).unwrap();
        assert_eq!(fitness, 0.0);
    }

    #[test]
    fn test_fitness_positive_below_capacity() {
        let g = landscape(0.5);
        let u = Trait::scalar(0.0);
        let fitness = g.fitness(&u, &[u.clone()], &[1.0]).unwrap();
        assert!((fitness - 0.25 * 0.99).abs() < 1e-12);
    }

    #[test]
    fn test_zero_capacity_is_degenerate() {
        let params = LandscapeParameters::from_lock_in(0.5)
            .unwrap()
            .with_max_carrying_capacity(0.0);
        let g = FitnessLandscape::new(params).unwrap();
        let u = Trait::scalar(0.0);
        let err = g.fitness(&u, &[u.clone()], &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            EssError::Landscape(LandscapeError::DegenerateLandscape { .. })
        ));
    }

    #[test]
    fn test_full_lock_in_is_degenerate() {
        let g = landscape(1.0);
        let u = Trait::scalar(0.0);
        assert!(g.fitness(&u, &[u.clone()], &[1.0]).is_err());
    }

    #[test]
    fn test_vector_trait_reduces_to_norm() {
        let g = landscape(0.5);
        let v = Trait::from_components(vec![0.6, 0.8]).unwrap();
        let s = Trait::scalar(1.0);
        assert!((g.carrying_capacity(&v) - g.carrying_capacity(&s)).abs() < 1e-12);
    }
}
