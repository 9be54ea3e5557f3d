//! # Darwinian
//!
//! Evolutionary stability engine: fitness landscape, coupled population/trait
//! dynamics, and ESS/CSS classification of where the dynamics settle.
//!
//! ## G-function
//!
//! ```text
//! G(v, U, X) = r × (K(v) − Σ a(v, U_j)·X_j) / K(v)
//! ```
//!
//! Where:
//! - K: Gaussian carrying capacity, width σ_k = σ_max × (1 − L)
//! - a: Gaussian competition kernel, width σ_α
//! - L: Lock-in index (0-1)
//!
//! ## Classification
//!
//! Curvature (scalar traits) or Hessian eigenvalues (vector traits) at the
//! equilibrium: all negative is an ESS, all positive a CSS (branching point),
//! mixed signs a repellor. Several scalar residents pool their curvatures the
//! same way.
//!
//! Two opt-in checks follow classification: a scan of the adaptive landscape
//! (maximum principle) and seeded re-solves from perturbed starts (convergent
//! stability). A candidate the perturbed runs do not return to is a repellor.

pub mod dynamics;
pub mod fitness;
pub mod lockin;
pub mod stability;
pub mod telemetry;

pub use dynamics::{PopulationDynamics, Trajectory};
pub use fitness::{DerivativeEstimator, FitnessLandscape, LandscapeParameters};
pub use lockin::{CaseAnalyzer, InstitutionalCase, LockInAssessment, LockInModel};
pub use stability::StabilitySolver;
pub use telemetry::SolverMetrics;
