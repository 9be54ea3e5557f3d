//! Fitness-generating function and its finite-difference derivatives

pub mod derivatives;
pub mod landscape;
pub mod stencil;

pub use self::derivatives::DerivativeEstimator;
pub use self::landscape::{FitnessLandscape, LandscapeParameters};
