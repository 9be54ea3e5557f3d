//! BootstrapFit - calibrated renewal coefficient with resampling intervals

use serde::{Deserialize, Serialize};

use super::resource::ResourceParameters;

/// Parametric curve fitted by the calibrator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationModel {
    /// observed ≈ a · (1 − predictor)²
    #[default]
    QuadraticComplement,
}

impl CalibrationModel {
    /// Regressor for one predictor value
    #[inline]
    pub fn regressor(&self, predictor: f64) -> f64 {
        match self {
            CalibrationModel::QuadraticComplement => {
                let complement = 1.0 - predictor;
                complement * complement
            }
        }
    }

    /// Human-readable formula for a fitted coefficient
    pub fn formula(&self, coefficient: f64) -> String {
        match self {
            CalibrationModel::QuadraticComplement => {
                format!("rho(L) = {:.4} * (1 - L)^2", coefficient)
            }
        }
    }
}

/// Two-sided interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Output of one `calibrate()` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapFit {
    /// Model that was fitted
    pub model: CalibrationModel,
    /// Least-squares coefficient on the full data set
    pub fitted_coefficient: f64,
    /// Percentile interval of the bootstrap coefficients
    pub coefficient_ci: ConfidenceInterval,
    /// Point-estimate prediction for each original case
    pub predictions: Vec<f64>,
    /// Percentile interval of each case's bootstrap predictions
    pub prediction_cis: Vec<ConfidenceInterval>,
    /// observed − predicted for each case
    pub residuals: Vec<f64>,
    /// Mean |predicted − observed|
    pub mean_absolute_error: f64,
    /// Coefficient of determination of the point estimate
    pub r_squared: f64,
    /// Refit coefficient of every resample, in iteration order
    pub bootstrap_coefficients: Vec<f64>,
    /// Resamples drawn
    pub n_bootstrap: usize,
    /// Seed that reproduces this fit
    pub random_seed: u64,
    /// Confidence level of the reported intervals
    pub confidence_level: f64,
}

impl BootstrapFit {
    /// Formula string for reports
    pub fn formula(&self) -> String {
        self.model.formula(self.fitted_coefficient)
    }

    /// Resource sub-model with ρ_max set to the fitted coefficient
    pub fn resource_parameters(&self) -> ResourceParameters {
        ResourceParameters::with_max_renewal_rate(self.fitted_coefficient)
    }
}
