//! Trait - continuous strategy value carried by a resident
//!
//! A trait is a non-empty vector of finite reals. One-dimensional traits are the
//! common case (institutional rigidity on a single axis); higher dimensions switch
//! stability classification from the curvature test to the Hessian test.
//!
//! Traits are immutable: evolutionary updates build a new value instead of
//! mutating the old one.

use serde::{Deserialize, Serialize};

use crate::error::{LandscapeError, Result};

/// Continuous strategy value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Trait(Vec<f64>);

impl Trait {
    /// Create a one-dimensional trait
    ///
    /// Unchecked: a non-finite value is rejected once the trait enters a
    /// [`Population`](crate::Population). Use [`Trait::from_components`] to
    /// validate up front.
    pub fn scalar(value: f64) -> Self {
        Self(vec![value])
    }

    /// Create a trait from its components
    ///
    /// Fails when the vector is empty or holds a non-finite component.
    pub fn from_components(components: Vec<f64>) -> Result<Self> {
        if components.is_empty() {
            return Err(LandscapeError::DimensionMismatch {
                expected: 1,
                actual: 0,
            }
            .into());
        }
        if let Some(bad) = components.iter().find(|c| !c.is_finite()) {
            return Err(LandscapeError::InvalidParameter {
                name: "trait_component",
                value: *bad,
            }
            .into());
        }
        Ok(Self(components))
    }

    /// Number of trait dimensions
    #[inline]
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    /// True for one-dimensional traits
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.0.len() == 1
    }

    /// Trait components
    #[inline]
    pub fn components(&self) -> &[f64] {
        &self.0
    }

    /// First component (the value of a scalar trait)
    #[inline]
    pub fn value(&self) -> f64 {
        self.0[0]
    }

    /// Squared Euclidean norm
    pub fn norm_squared(&self) -> f64 {
        self.0.iter().map(|c| c * c).sum()
    }

    /// New trait with `delta` added to component `axis`
    pub fn shifted(&self, axis: usize, delta: f64) -> Self {
        let mut components = self.0.clone();
        components[axis] += delta;
        Self(components)
    }

    /// New trait with `di` added to `axis_i` and `dj` added to `axis_j`
    pub fn shifted2(&self, axis_i: usize, di: f64, axis_j: usize, dj: f64) -> Self {
        let mut components = self.0.clone();
        components[axis_i] += di;
        components[axis_j] += dj;
        Self(components)
    }

    /// Euclidean distance to another trait of the same dimension
    pub fn distance_squared(&self, other: &Trait) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

impl From<f64> for Trait {
    fn from(value: f64) -> Self {
        Self::scalar(value)
    }
}

impl TryFrom<Vec<f64>> for Trait {
    type Error = crate::error::EssError;

    fn try_from(components: Vec<f64>) -> Result<Self> {
        Self::from_components(components)
    }
}

impl From<Trait> for Vec<f64> {
    fn from(value: Trait) -> Self {
        value.0
    }
}

/// Finite-difference accuracy order
///
/// `High` is the 5-point O(h⁴) stencil and is required wherever a stability
/// decision depends on the sign of curvature; `Low` is the 3-point O(h²) stencil.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyLevel {
    /// 3-point stencil, h = 1e-6
    Low,
    /// 5-point stencil, h = 1e-5
    #[default]
    High,
}
