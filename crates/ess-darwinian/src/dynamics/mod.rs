//! Coupled population/trait dynamics and the ODE integrator behind them

pub mod integrator;
pub mod population;

pub use self::integrator::{DynamicalSystem, Rk4};
pub use self::population::{PopulationDynamics, Trajectory, TIMESCALE_SEPARATION_LIMIT};
