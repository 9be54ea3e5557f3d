//! # Calibration
//!
//! Bootstrap calibration of the resource renewal curve against observed cases.
//!
//! ## Model
//!
//! ```text
//! ρ(L) = a × (1 − L)²
//! ```
//!
//! The fitted `a` becomes ρ_max of the lock-in model's resource sub-model
//! (see [`ess_common::BootstrapFit::resource_parameters`]).
//!
//! ## Reproducibility
//!
//! Identical inputs and `random_seed` give bit-for-bit identical fits, whatever
//! the number of worker threads.

pub mod bootstrap;
pub mod stats;

pub use bootstrap::{BootstrapCalibrator, CalibrationCase, MAX_BOOTSTRAP_ITERATIONS};
