//! Selection gradient, curvature, and Hessian of the G-function
//!
//! All derivatives are taken with respect to the probe trait `v` while the
//! resident traits and densities stay fixed. Classification decisions use
//! [`AccuracyLevel::High`]: near weak selection the truncation error of the
//! 3-point stencil is large enough to flip the sign of the curvature.

use ess_common::{AccuracyLevel, LandscapeError, Result, Trait};
use nalgebra::{DMatrix, SymmetricEigen};

use super::landscape::FitnessLandscape;
use super::stencil::{self, GRADIENT_STEP};

/// Finite-difference derivatives over a fitness landscape
#[derive(Debug, Clone, Copy)]
pub struct DerivativeEstimator<'a> {
    landscape: &'a FitnessLandscape,
}

impl<'a> DerivativeEstimator<'a> {
    pub fn new(landscape: &'a FitnessLandscape) -> Self {
        Self { landscape }
    }

    pub fn landscape(&self) -> &'a FitnessLandscape {
        self.landscape
    }

    /// G evaluated with component `axis` of `v` moved to `value`
    fn along(
        &self,
        v: &Trait,
        axis: usize,
        value: f64,
        traits: &[Trait],
        densities: &[f64],
    ) -> Result<f64> {
        let probe = v.shifted(axis, value - v.components()[axis]);
        self.landscape.fitness(&probe, traits, densities)
    }

    /// Partial derivative ∂G/∂v_axis by central difference
    pub fn partial(
        &self,
        v: &Trait,
        axis: usize,
        traits: &[Trait],
        densities: &[f64],
    ) -> Result<f64> {
        let x = v.components()[axis];
        stencil::first_central(
            |s| self.along(v, axis, s, traits, densities),
            x,
            GRADIENT_STEP,
        )
    }

    /// Selection gradient: one partial per trait dimension
    pub fn gradient(&self, v: &Trait, traits: &[Trait], densities: &[f64]) -> Result<Vec<f64>> {
        (0..v.dim())
            .map(|axis| self.partial(v, axis, traits, densities))
            .collect()
    }

    /// Curvature ∂²G/∂v² of a scalar trait
    pub fn curvature(
        &self,
        v: &Trait,
        traits: &[Trait],
        densities: &[f64],
        level: AccuracyLevel,
    ) -> Result<f64> {
        if !v.is_scalar() {
            return Err(LandscapeError::DimensionMismatch {
                expected: 1,
                actual: v.dim(),
            }
            .into());
        }
        self.axis_curvature(v, 0, traits, densities, level)
    }

    fn axis_curvature(
        &self,
        v: &Trait,
        axis: usize,
        traits: &[Trait],
        densities: &[f64],
        level: AccuracyLevel,
    ) -> Result<f64> {
        let x = v.components()[axis];
        stencil::second(
            |s| self.along(v, axis, s, traits, densities),
            x,
            stencil::default_step(level),
            level,
        )
    }

    /// Hessian of G with respect to `v`
    ///
    /// Diagonal entries use the 1-D stencil of `level` per dimension. Mixed
    /// partials use the 4-point scheme and are computed once for `i < j`, then
    /// mirrored, so `H[(i, j)] == H[(j, i)]` holds bit for bit.
    pub fn hessian(
        &self,
        v: &Trait,
        traits: &[Trait],
        densities: &[f64],
        level: AccuracyLevel,
    ) -> Result<DMatrix<f64>> {
        let n = v.dim();
        let h = stencil::default_step(level);
        let mut hessian = DMatrix::zeros(n, n);

        for i in 0..n {
            hessian[(i, i)] = self.axis_curvature(v, i, traits, densities, level)?;

            for j in (i + 1)..n {
                let xi = v.components()[i];
                let xj = v.components()[j];
                let mixed = stencil::mixed_four_point(
                    |si, sj| {
                        let probe = v.shifted2(i, si - xi, j, sj - xj);
                        self.landscape.fitness(&probe, traits, densities)
                    },
                    xi,
                    xj,
                    h,
                )?;
                hessian[(i, j)] = mixed;
                hessian[(j, i)] = mixed;
            }
        }

        Ok(hessian)
    }

    /// Eigenvalues of the (symmetric) Hessian, ascending
    pub fn hessian_eigenvalues(
        &self,
        v: &Trait,
        traits: &[Trait],
        densities: &[f64],
        level: AccuracyLevel,
    ) -> Result<Vec<f64>> {
        let hessian = self.hessian(v, traits, densities, level)?;
        Ok(symmetric_eigenvalues(hessian))
    }
}

/// Real spectrum of a symmetric matrix, sorted ascending
pub fn symmetric_eigenvalues(matrix: DMatrix<f64>) -> Vec<f64> {
    if matrix.nrows() == 1 {
        return vec![matrix[(0, 0)]];
    }
    let eigen = SymmetricEigen::new(matrix);
    let mut values: Vec<f64> = eigen.eigenvalues.iter().copied().collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}
