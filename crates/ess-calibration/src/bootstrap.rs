//! Bootstrap Calibrator - fit ρ(L) = a·(1 − L)² with resampling intervals
//!
//! ## Algorithm
//!
//! 1. Point estimate: `a = Σ(X·y) / Σ(X²)` with `X = (1 − L)²`
//! 2. `n_bootstrap` resamples of the case indices with replacement, each refit
//! 3. Percentile intervals for `a` and for every case's prediction
//!
//! Iteration `i` owns a generator seeded from `(random_seed, i)` and writes one
//! output slot, so the result is identical for any worker count.

use ess_common::config::CalibrationSettings;
use ess_common::{
    BootstrapFit, CalibrationError, CalibrationModel, ConfidenceInterval, Result,
    DEFAULT_N_BOOTSTRAP, DEFAULT_RANDOM_SEED,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::stats;

/// Hard cap on resampling iterations
pub const MAX_BOOTSTRAP_ITERATIONS: usize = 1_000_000;

/// Redraws allowed for a resample with Σ(X²) = 0
pub const MAX_RESAMPLE_ATTEMPTS: usize = 64;

/// Fewest cases a fit accepts
pub const MIN_CASES: usize = 2;

/// One empirical (lock-in index, observed renewal rate) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCase {
    pub name: String,
    /// Lock-in index
    pub predictor: f64,
    /// Observed renewal rate
    pub observed: f64,
}

impl CalibrationCase {
    pub fn new(name: impl Into<String>, predictor: f64, observed: f64) -> Self {
        Self {
            name: name.into(),
            predictor,
            observed,
        }
    }
}

/// Seeded, parallel bootstrap fit
#[derive(Debug, Clone)]
pub struct BootstrapCalibrator {
    n_bootstrap: usize,
    random_seed: u64,
    confidence_level: f64,
    workers: Option<usize>,
    model: CalibrationModel,
}

impl Default for BootstrapCalibrator {
    fn default() -> Self {
        Self {
            n_bootstrap: DEFAULT_N_BOOTSTRAP,
            random_seed: DEFAULT_RANDOM_SEED,
            confidence_level: 0.95,
            workers: None,
            model: CalibrationModel::default(),
        }
    }
}

impl BootstrapCalibrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &CalibrationSettings) -> Self {
        Self {
            n_bootstrap: settings.n_bootstrap,
            random_seed: settings.random_seed,
            confidence_level: settings.confidence_level,
            workers: settings.workers,
            model: CalibrationModel::default(),
        }
    }

    pub fn with_iterations(mut self, n_bootstrap: usize) -> Self {
        self.n_bootstrap = n_bootstrap;
        self
    }

    pub fn with_seed(mut self, random_seed: u64) -> Self {
        self.random_seed = random_seed;
        self
    }

    pub fn with_confidence_level(mut self, confidence_level: f64) -> Self {
        self.confidence_level = confidence_level;
        self
    }

    /// Run on a dedicated pool of `workers` threads instead of the global pool
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_model(mut self, model: CalibrationModel) -> Self {
        self.model = model;
        self
    }

    fn validate(&self, cases: &[CalibrationCase]) -> Result<()> {
        if self.n_bootstrap == 0 || self.n_bootstrap > MAX_BOOTSTRAP_ITERATIONS {
            return Err(CalibrationError::InvalidIterations {
                requested: self.n_bootstrap,
                max: MAX_BOOTSTRAP_ITERATIONS,
            }
            .into());
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(CalibrationError::InvalidConfidenceLevel(self.confidence_level).into());
        }
        if cases.len() < MIN_CASES {
            return Err(CalibrationError::InsufficientData(format!(
                "need at least {} cases, got {}",
                MIN_CASES,
                cases.len()
            ))
            .into());
        }
        if let Some(bad) = cases
            .iter()
            .find(|c| !(c.predictor.is_finite() && c.observed.is_finite()))
        {
            return Err(CalibrationError::InsufficientData(format!(
                "non-finite value in case {}",
                bad.name
            ))
            .into());
        }
        Ok(())
    }

    /// Fit the model and bootstrap its intervals
    #[instrument(skip(self, cases), fields(cases = cases.len(), n_bootstrap = self.n_bootstrap, seed = self.random_seed))]
    pub fn calibrate(&self, cases: &[CalibrationCase]) -> Result<BootstrapFit> {
        self.validate(cases)?;

        let x: Vec<f64> = cases.iter().map(|c| self.model.regressor(c.predictor)).collect();
        let y: Vec<f64> = cases.iter().map(|c| c.observed).collect();
        let n = cases.len();

        let fitted = stats::through_origin_slope(&x, &y, 0..n).ok_or_else(|| {
            CalibrationError::InsufficientData("all regressors are zero".to_string())
        })?;

        let bootstrap_coefficients = self.resample_all(&x, &y)?;
        debug!(draws = bootstrap_coefficients.len(), "Bootstrap resampling finished");

        let (q_low, q_high) = self.quantiles();
        let sorted = stats::sorted(&bootstrap_coefficients);
        let coefficient_ci = ConfidenceInterval::new(
            stats::percentile_linear(&sorted, q_low),
            stats::percentile_linear(&sorted, q_high),
        );

        let prediction_cis = x
            .iter()
            .map(|xj| {
                let preds: Vec<f64> = bootstrap_coefficients.iter().map(|a| a * xj).collect();
                let preds = stats::sorted(&preds);
                ConfidenceInterval::new(
                    stats::percentile_linear(&preds, q_low),
                    stats::percentile_linear(&preds, q_high),
                )
            })
            .collect();

        let predictions: Vec<f64> = x.iter().map(|xj| fitted * xj).collect();
        let residuals = y.iter().zip(&predictions).map(|(o, p)| o - p).collect();
        let mean_absolute_error = stats::mean_absolute_error(&predictions, &y);
        let r_squared = stats::r_squared(&predictions, &y);

        info!(
            coefficient = fitted,
            ci_lower = coefficient_ci.lower,
            ci_upper = coefficient_ci.upper,
            r_squared,
            "Calibration complete"
        );

        Ok(BootstrapFit {
            model: self.model,
            fitted_coefficient: fitted,
            coefficient_ci,
            predictions,
            prediction_cis,
            residuals,
            mean_absolute_error,
            r_squared,
            bootstrap_coefficients,
            n_bootstrap: self.n_bootstrap,
            random_seed: self.random_seed,
            confidence_level: self.confidence_level,
        })
    }

    fn quantiles(&self) -> (f64, f64) {
        let alpha = 1.0 - self.confidence_level;
        (alpha / 2.0, 1.0 - alpha / 2.0)
    }

    /// Refit coefficient of every iteration, in iteration order
    fn resample_all(&self, x: &[f64], y: &[f64]) -> Result<Vec<f64>> {
        let seed = self.random_seed;
        let run = || {
            (0..self.n_bootstrap)
                .into_par_iter()
                .map(|i| resample_once(x, y, seed, i))
                .collect::<Result<Vec<f64>>>()
        };

        match self.workers {
            Some(workers) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|e| CalibrationError::WorkerPool(e.to_string()))?;
                pool.install(run)
            }
            None => run(),
        }
    }
}

/// One bootstrap iteration; redraws degenerate resamples from the same stream
fn resample_once(x: &[f64], y: &[f64], seed: u64, iteration: usize) -> Result<f64> {
    let n = x.len();
    let mut rng = StdRng::seed_from_u64(iteration_seed(seed, iteration as u64));
    let mut indices = vec![0usize; n];

    for _ in 0..MAX_RESAMPLE_ATTEMPTS {
        for slot in indices.iter_mut() {
            *slot = rng.gen_range(0..n);
        }
        if let Some(a) = stats::through_origin_slope(x, y, indices.iter().copied()) {
            return Ok(a);
        }
    }

    Err(CalibrationError::InsufficientData(format!(
        "bootstrap iteration {} drew only zero regressors in {} attempts",
        iteration, MAX_RESAMPLE_ATTEMPTS
    ))
    .into())
}

/// SplitMix64 finalizer over (seed, iteration)
fn iteration_seed(seed: u64, iteration: u64) -> u64 {
    let mut z = seed.wrapping_add(iteration.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
