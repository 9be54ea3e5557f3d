//! # ESS Common
//!
//! Shared records, errors, and configuration for the evolutionary stability solver.
//!
//! ## Core Types
//!
//! - [`Trait`]: continuous strategy value (scalar or vector)
//! - [`Population`]: ordered `(trait, density)` pairs for one simulation run
//! - [`EquilibriumResult`]: classified equilibrium produced by a single solve
//! - [`BootstrapFit`]: calibrated renewal coefficient with bootstrap intervals
//! - [`ResourceParameters`]: renewal sub-model consumed by the lock-in model
//!
//! ## Configuration
//!
//! - [`config::EssConfig`]: layered defaults, file, and `ESS__` environment settings

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{CalibrationError, EssError, IntegrationError, LandscapeError, Result};
pub use types::{
    bootstrap::{BootstrapFit, CalibrationModel, ConfidenceInterval},
    equilibrium::{
        ConvergentStabilityCheck, EquilibriumResult, MaximumPrincipleCheck, StabilityKind,
    },
    population::Population,
    resource::ResourceParameters,
    strategy::{AccuracyLevel, Trait},
};

/// ESS version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default mutational variance scale (sigma)
pub const DEFAULT_MUTATION_SCALE: f64 = 0.1;

/// Default step-to-step displacement below which a run counts as converged
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 1e-6;

/// Default integration horizon
pub const DEFAULT_T_MAX: f64 = 5000.0;

/// Default integration step
pub const DEFAULT_DT: f64 = 0.1;

/// Default number of bootstrap resamples
pub const DEFAULT_N_BOOTSTRAP: usize = 1000;

/// Default bootstrap seed
pub const DEFAULT_RANDOM_SEED: u64 = 42;

/// Residents at or below this density are treated as extinct
pub const EXTINCTION_DENSITY: f64 = 1e-10;

/// Reference optimum used when assessing reform viability (golden ratio)
pub const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;
