//! Population - ordered (trait, density) pairs for one simulation run
//!
//! The number of residents is fixed for the lifetime of a run: no speciation or
//! extinction events are modeled, although residents may decline towards zero.

use serde::{Deserialize, Serialize};

use super::strategy::Trait;
use crate::error::{IntegrationError, LandscapeError, Result};

/// Resident population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Population {
    traits: Vec<Trait>,
    densities: Vec<f64>,
}

impl Population {
    /// Create a population, validating shape and finiteness
    pub fn new(traits: Vec<Trait>, densities: Vec<f64>) -> Result<Self> {
        if traits.is_empty() {
            return Err(IntegrationError::EmptyPopulation.into());
        }
        if traits.len() != densities.len() {
            return Err(IntegrationError::LengthMismatch {
                traits: traits.len(),
                densities: densities.len(),
            }
            .into());
        }
        let dim = traits[0].dim();
        if let Some(other) = traits.iter().find(|t| t.dim() != dim) {
            return Err(LandscapeError::DimensionMismatch {
                expected: dim,
                actual: other.dim(),
            }
            .into());
        }
        if let Some(bad) = traits
            .iter()
            .flat_map(|t| t.components())
            .find(|c| !c.is_finite())
        {
            return Err(LandscapeError::InvalidParameter {
                name: "trait_component",
                value: *bad,
            }
            .into());
        }
        if let Some((index, value)) = densities
            .iter()
            .enumerate()
            .find(|(_, d)| !d.is_finite())
        {
            return Err(IntegrationError::NonFiniteDensity {
                index,
                value: *value,
            }
            .into());
        }
        Ok(Self { traits, densities })
    }

    /// Create a population with uniform densities `1/n`
    pub fn uniform(traits: Vec<Trait>) -> Result<Self> {
        let n = traits.len().max(1);
        let densities = vec![1.0 / n as f64; traits.len()];
        Self::new(traits, densities)
    }

    /// Number of residents
    #[inline]
    pub fn len(&self) -> usize {
        self.traits.len()
    }

    /// Always false for a validated population
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    /// Trait dimension shared by all residents
    #[inline]
    pub fn trait_dim(&self) -> usize {
        self.traits[0].dim()
    }

    /// Resident traits
    #[inline]
    pub fn traits(&self) -> &[Trait] {
        &self.traits
    }

    /// Resident densities
    #[inline]
    pub fn densities(&self) -> &[f64] {
        &self.densities
    }

    /// Consume into `(traits, densities)`
    pub fn into_parts(self) -> (Vec<Trait>, Vec<f64>) {
        (self.traits, self.densities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EssError;

    #[test]
    fn test_uniform_densities() {
        let pop = Population::uniform(vec![Trait::scalar(0.0), Trait::scalar(1.0)]).unwrap();
        assert_eq!(pop.densities(), &[0.5, 0.5]);
        assert_eq!(pop.trait_dim(), 1);
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let err = Population::new(vec![Trait::scalar(0.0)], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            EssError::Integration(IntegrationError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_mixed_dimensions() {
        let err = Population::new(
            vec![
                Trait::scalar(0.0),
                Trait::from_components(vec![0.0, 1.0]).unwrap(),
            ],
            vec![1.0, 1.0],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EssError::Landscape(LandscapeError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_and_infinite() {
        assert!(Population::uniform(vec![]).is_err());
        assert!(Population::new(vec![Trait::scalar(0.0)], vec![f64::INFINITY]).is_err());
    }

    #[test]
    fn test_rejects_non_finite_trait() {
        let err = Population::uniform(vec![Trait::scalar(0.0), Trait::scalar(f64::NAN)]).unwrap_err();
        assert!(matches!(
            err,
            EssError::Landscape(LandscapeError::InvalidParameter {
                name: "trait_component",
                ..
            })
        ));
        assert!(Population::uniform(vec![Trait::scalar(f64::INFINITY)]).is_err());
    }
}
