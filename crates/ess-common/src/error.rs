//! Error types for the ESS solver
//!
//! Provides a unified error type and domain-specific error variants

use thiserror::Error;

/// Result type alias using EssError
pub type Result<T> = std::result::Result<T, EssError>;

/// Unified error type for ESS operations
#[derive(Debug, Error)]
pub enum EssError {
    // Fitness landscape errors
    #[error("Landscape error: {0}")]
    Landscape(#[from] LandscapeError),

    // ODE integration errors
    #[error("Integration error: {0}")]
    Integration(#[from] IntegrationError),

    // Bootstrap calibration errors
    #[error("Calibration error: {0}")]
    Calibration(#[from] CalibrationError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Fitness landscape and derivative errors
#[derive(Debug, Error)]
pub enum LandscapeError {
    #[error("Degenerate landscape: carrying capacity {carrying_capacity} at trait {trait_value:?}")]
    DegenerateLandscape {
        trait_value: Vec<f64>,
        carrying_capacity: f64,
    },

    #[error("Fitness is not finite at trait {trait_value:?}")]
    NonFiniteFitness { trait_value: Vec<f64> },

    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("Trait dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Resident traits ({traits}) and densities ({densities}) differ in length")]
    ResidentMismatch { traits: usize, densities: usize },
}

/// Population dynamics integration errors
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("Integration diverged at t={time} (step {step})")]
    IntegrationDiverged { time: f64, step: usize },

    #[error("Invalid horizon: t_max={t_max}, dt={dt}")]
    InvalidHorizon { t_max: f64, dt: f64 },

    #[error("Too many integration steps: {requested} > {max}")]
    TooManySteps { requested: usize, max: usize },

    #[error("Population must contain at least one resident")]
    EmptyPopulation,

    #[error("Population traits ({traits}) and densities ({densities}) differ in length")]
    LengthMismatch { traits: usize, densities: usize },

    #[error("Non-finite initial density {value} for resident {index}")]
    NonFiniteDensity { index: usize, value: f64 },
}

/// Bootstrap calibration errors
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid bootstrap iterations: {requested} (allowed 1..={max})")]
    InvalidIterations { requested: usize, max: usize },

    #[error("Confidence level must lie in (0, 1), got {0}")]
    InvalidConfidenceLevel(f64),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl From<config::ConfigError> for EssError {
    fn from(err: config::ConfigError) -> Self {
        EssError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EssError::Landscape(LandscapeError::DegenerateLandscape {
            trait_value: vec![0.5],
            carrying_capacity: 0.0,
        });
        assert!(err.to_string().contains("carrying capacity 0"));
    }

    #[test]
    fn test_integration_error() {
        let err = IntegrationError::IntegrationDiverged { time: 1.5, step: 15 };
        assert!(err.to_string().contains("t=1.5"));
        assert!(err.to_string().contains("step 15"));
    }

    #[test]
    fn test_from_conversions() {
        let err: EssError = CalibrationError::InsufficientData("one case".to_string()).into();
        assert!(matches!(
            err,
            EssError::Calibration(CalibrationError::InsufficientData(_))
        ));

        let err: EssError = config::ConfigError::NotFound("solver.t_max".to_string()).into();
        assert!(matches!(err, EssError::Config(_)));
        assert!(err.to_string().contains("solver.t_max"));
    }
}
