//! Core record types for the ESS solver

pub mod bootstrap;
pub mod equilibrium;
pub mod population;
pub mod resource;
pub mod strategy;
