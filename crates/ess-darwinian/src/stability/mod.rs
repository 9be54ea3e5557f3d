//! Equilibrium search and ESS/CSS classification

pub mod checks;
pub mod solver;

pub use self::solver::StabilitySolver;
