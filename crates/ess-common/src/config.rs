//! Solver configuration
//!
//! Settings are layered: compiled defaults, then an optional config file, then
//! `ESS__`-prefixed environment variables (`ESS__SOLVER__T_MAX=200`).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EssError, Result};
use crate::types::resource::DEFAULT_MAX_RENEWAL_RATE;
use crate::types::strategy::AccuracyLevel;

/// Environment variable naming an optional config file
pub const CONFIG_PATH_ENV: &str = "ESS_CONFIG";

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EssConfig {
    /// Dynamics and classification settings
    pub solver: SolverSettings,
    /// Fitness landscape constants
    pub landscape: LandscapeSettings,
    /// Resource renewal sub-model
    pub resource: ResourceSettings,
    /// Bootstrap calibration settings
    pub calibration: CalibrationSettings,
}

impl EssConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let file = path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok());

        let mut builder = config::Config::builder();
        if let Some(ref file) = file {
            debug!(path = %file, "Loading configuration file");
            builder = builder.add_source(config::File::with_name(file).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("ESS")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: EssConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings that would make a run meaningless or unbounded
    pub fn validate(&self) -> Result<()> {
        let s = &self.solver;
        if !(s.t_max.is_finite() && s.t_max > 0.0) {
            return Err(EssError::Config(format!("solver.t_max must be positive, got {}", s.t_max)));
        }
        if !(s.dt.is_finite() && s.dt > 0.0 && s.dt <= s.t_max) {
            return Err(EssError::Config(format!(
                "solver.dt must lie in (0, t_max], got {}",
                s.dt
            )));
        }
        if !(s.mutation_scale.is_finite() && s.mutation_scale >= 0.0) {
            return Err(EssError::Config(format!(
                "solver.mutation_scale must be non-negative, got {}",
                s.mutation_scale
            )));
        }
        if !(s.convergence_threshold.is_finite() && s.convergence_threshold >= 0.0) {
            return Err(EssError::Config(format!(
                "solver.convergence_threshold must be non-negative, got {}",
                s.convergence_threshold
            )));
        }
        let m = &s.maximum_principle;
        if m.enabled {
            if m.grid_points < 2 {
                return Err(EssError::Config(format!(
                    "solver.maximum_principle.grid_points must be at least 2, got {}",
                    m.grid_points
                )));
            }
            let tolerances = [m.min_margin, m.location_tolerance, m.fitness_tolerance];
            if !tolerances.iter().all(|t| t.is_finite() && *t >= 0.0) {
                return Err(EssError::Config(
                    "solver.maximum_principle margins and tolerances must be non-negative"
                        .to_string(),
                ));
            }
        }
        let cc = &s.convergence_check;
        if cc.enabled {
            if cc.trials == 0 {
                return Err(EssError::Config(
                    "solver.convergence_check.trials must be positive".to_string(),
                ));
            }
            let tolerances = [cc.perturbation, cc.relative_tolerance, cc.absolute_tolerance];
            if !tolerances.iter().all(|t| t.is_finite() && *t >= 0.0) {
                return Err(EssError::Config(
                    "solver.convergence_check perturbation and tolerances must be non-negative"
                        .to_string(),
                ));
            }
            if !(cc.required_fraction > 0.0 && cc.required_fraction <= 1.0) {
                return Err(EssError::Config(format!(
                    "solver.convergence_check.required_fraction must lie in (0, 1], got {}",
                    cc.required_fraction
                )));
            }
        }
        let c = &self.calibration;
        if c.n_bootstrap == 0 {
            return Err(EssError::Config("calibration.n_bootstrap must be positive".to_string()));
        }
        if !(c.confidence_level > 0.0 && c.confidence_level < 1.0) {
            return Err(EssError::Config(format!(
                "calibration.confidence_level must lie in (0, 1), got {}",
                c.confidence_level
            )));
        }
        if c.workers == Some(0) {
            return Err(EssError::Config("calibration.workers must be positive".to_string()));
        }
        Ok(())
    }
}

/// Population dynamics and stability classification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Mutational variance scale σ (trait speed is σ² × gradient)
    pub mutation_scale: f64,
    /// Displacement threshold for convergence, reused as the curvature dead band
    pub convergence_threshold: f64,
    /// Hard cap on the integration horizon
    pub t_max: f64,
    /// Integration step
    pub dt: f64,
    /// Stencil used for classification
    pub accuracy: AccuracyLevel,
    /// Adaptive-landscape scan after classification (off by default)
    pub maximum_principle: MaximumPrincipleSettings,
    /// Perturbed re-solves after classification (off by default)
    pub convergence_check: ConvergenceCheckSettings,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            mutation_scale: crate::DEFAULT_MUTATION_SCALE,
            convergence_threshold: crate::DEFAULT_CONVERGENCE_THRESHOLD,
            t_max: crate::DEFAULT_T_MAX,
            dt: crate::DEFAULT_DT,
            accuracy: AccuracyLevel::High,
            maximum_principle: MaximumPrincipleSettings::default(),
            convergence_check: ConvergenceCheckSettings::default(),
        }
    }
}

/// Scan of G(v, U*, X*) around the residents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaximumPrincipleSettings {
    pub enabled: bool,
    /// Samples per scan line
    pub grid_points: usize,
    /// Smallest half-width added beyond the residents' span on each axis
    pub min_margin: f64,
    /// Distance from a resident within which a scan peak counts as the resident
    pub location_tolerance: f64,
    /// Largest |G| accepted at the peak
    pub fitness_tolerance: f64,
}

impl Default for MaximumPrincipleSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            grid_points: 200,
            min_margin: 2.0,
            location_tolerance: 0.1,
            fitness_tolerance: 0.1,
        }
    }
}

/// Re-solves from perturbed starts to test convergent stability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceCheckSettings {
    pub enabled: bool,
    pub trials: usize,
    /// Half-width of the uniform perturbation added to each trait component
    pub perturbation: f64,
    /// Relative part of the return tolerance
    pub relative_tolerance: f64,
    /// Absolute part of the return tolerance
    pub absolute_tolerance: f64,
    /// Fraction of trials that must return
    pub required_fraction: f64,
    pub random_seed: u64,
}

impl Default for ConvergenceCheckSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            trials: 5,
            perturbation: 0.1,
            relative_tolerance: 0.05,
            absolute_tolerance: 1e-2,
            required_fraction: 0.8,
            random_seed: crate::DEFAULT_RANDOM_SEED,
        }
    }
}

/// Fitness landscape constants (niche width is derived from the lock-in index)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LandscapeSettings {
    /// Intrinsic growth rate r
    pub growth_rate: f64,
    /// Peak carrying capacity K_max
    pub max_carrying_capacity: f64,
    /// Niche width at lock-in 0 (σ_max)
    pub max_niche_width: f64,
    /// Competition kernel width σ_α
    pub competition_width: f64,
    /// Competition asymmetry β
    pub asymmetry: f64,
}

impl Default for LandscapeSettings {
    fn default() -> Self {
        Self {
            growth_rate: 0.25,
            max_carrying_capacity: 100.0,
            max_niche_width: 4.0,
            competition_width: 2.0,
            asymmetry: 0.0,
        }
    }
}

/// Resource renewal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSettings {
    /// Maximum renewal rate ρ_max
    pub max_renewal_rate: f64,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            max_renewal_rate: DEFAULT_MAX_RENEWAL_RATE,
        }
    }
}

impl From<&ResourceSettings> for crate::ResourceParameters {
    fn from(settings: &ResourceSettings) -> Self {
        Self {
            max_renewal_rate: settings.max_renewal_rate,
        }
    }
}

/// Bootstrap calibration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSettings {
    /// Resamples to draw
    pub n_bootstrap: usize,
    /// Seed for reproducible resampling
    pub random_seed: u64,
    /// Two-sided interval level
    pub confidence_level: f64,
    /// Dedicated worker threads (None uses the global rayon pool)
    pub workers: Option<usize>,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            n_bootstrap: crate::DEFAULT_N_BOOTSTRAP,
            random_seed: crate::DEFAULT_RANDOM_SEED,
            confidence_level: 0.95,
            workers: None,
        }
    }
}
