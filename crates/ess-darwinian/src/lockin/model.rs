//! Lock-in model - institutional rigidity mapped onto the ESS landscape
//!
//! ## Composition
//!
//! ```text
//! σ_k       = σ_max · (1 − L)                  niche width
//! ρ(L)      = ρ_max · (1 − L)²                 resource renewal
//! advantage = (MES_cosmetic / MES_genuine) · (1 − ρ/ρ_max)
//! ```
//!
//! One solve from trait 0, then the G-function is read at a reference optimum
//! (the golden ratio by default) to judge whether reform can invade.

use std::sync::Arc;

use ess_common::config::EssConfig;
use ess_common::{
    EquilibriumResult, LandscapeError, ResourceParameters, Result, Trait, GOLDEN_RATIO,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::fitness::{FitnessLandscape, LandscapeParameters};
use crate::stability::StabilitySolver;
use crate::telemetry::SolverMetrics;

/// Renewal below this fraction of ρ_max is severe depletion
pub const CRITICAL_RENEWAL_FRACTION: f64 = 0.1;

/// Lock-in above which the equilibrium is read as a parasitic ESS
pub const PARASITIC_LOCK_IN_THRESHOLD: f64 = 0.75;

/// Compliance strategy an institution can adopt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStrategy {
    /// Highly visible, cheap reform
    Cosmetic,
    /// Less visible, costly reform
    Genuine,
}

impl ComplianceStrategy {
    /// Manipulation effectiveness score: perceived compliance per unit of resource
    pub fn manipulation_effectiveness(&self) -> f64 {
        match self {
            ComplianceStrategy::Cosmetic => 3.0,
            ComplianceStrategy::Genuine => 1.0,
        }
    }
}

/// Can a reform trait invade the equilibrium?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReformViability {
    High,
    Low,
}

/// Severity of resource depletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepletionSeverity {
    Severe,
    Moderate,
}

/// Character of the lock-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockInType {
    /// Cosmetic compliance dominates a rigid equilibrium
    #[serde(rename = "parasitic_ess")]
    Parasitic,
    Moderate,
}

/// Output of [`LockInModel::assess`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInAssessment {
    pub lock_in_index: f64,
    /// Classified equilibrium of the single-resident solve
    pub equilibrium: EquilibriumResult,
    /// Trait the fitness was probed at
    pub reference_trait: f64,
    /// G(reference, U*, X*)
    pub fitness_at_reference: f64,
    pub reform_viability: ReformViability,
    /// ρ(L)
    pub renewal_rate: f64,
    pub depletion_severity: DepletionSeverity,
    pub parasitic_advantage: f64,
    pub lock_in_type: LockInType,
}

/// Maps a lock-in index to a landscape, a solver and a resource sub-model
#[derive(Debug, Clone)]
pub struct LockInModel {
    lock_in_index: f64,
    resource: ResourceParameters,
    solver: StabilitySolver,
    reference_trait: f64,
}

impl LockInModel {
    /// Model with default landscape, solver and resource constants
    pub fn new(lock_in_index: f64) -> Result<Self> {
        Self::from_config(lock_in_index, &EssConfig::default())
    }

    /// Model with configured constants
    pub fn from_config(lock_in_index: f64, config: &EssConfig) -> Result<Self> {
        let params = LandscapeParameters::from_lock_in_with(lock_in_index, &config.landscape)?;
        let landscape = FitnessLandscape::new(params)?;
        Ok(Self {
            lock_in_index,
            resource: ResourceParameters::from(&config.resource),
            solver: StabilitySolver::new(landscape, config.solver.clone()),
            reference_trait: GOLDEN_RATIO,
        })
    }

    /// Replace the resource sub-model (e.g. with a calibrated ρ_max)
    pub fn with_resource(mut self, resource: ResourceParameters) -> Self {
        self.resource = resource;
        self
    }

    /// Probe fitness at another reference optimum
    pub fn with_reference_trait(mut self, reference_trait: f64) -> Result<Self> {
        if !reference_trait.is_finite() {
            return Err(LandscapeError::InvalidParameter {
                name: "reference_trait",
                value: reference_trait,
            }
            .into());
        }
        self.reference_trait = reference_trait;
        Ok(self)
    }

    pub fn with_metrics(mut self, metrics: Arc<SolverMetrics>) -> Self {
        self.solver = self.solver.with_metrics(metrics);
        self
    }

    pub fn lock_in_index(&self) -> f64 {
        self.lock_in_index
    }

    pub fn resource(&self) -> &ResourceParameters {
        &self.resource
    }

    pub fn solver(&self) -> &StabilitySolver {
        &self.solver
    }

    /// ρ(L)
    pub fn renewal_rate(&self) -> f64 {
        self.resource.renewal_rate(self.lock_in_index)
    }

    /// Fitness edge of cosmetic over genuine compliance; positive means cosmetic dominates
    pub fn parasitic_advantage(&self) -> f64 {
        let ratio = ComplianceStrategy::Cosmetic.manipulation_effectiveness()
            / ComplianceStrategy::Genuine.manipulation_effectiveness();
        ratio * (1.0 - self.resource.renewal_fraction(self.lock_in_index))
    }

    pub fn depletion_severity(&self) -> DepletionSeverity {
        let critical = CRITICAL_RENEWAL_FRACTION * self.resource.max_renewal_rate;
        if self.renewal_rate() < critical {
            DepletionSeverity::Severe
        } else {
            DepletionSeverity::Moderate
        }
    }

    pub fn lock_in_type(&self) -> LockInType {
        if self.lock_in_index > PARASITIC_LOCK_IN_THRESHOLD {
            LockInType::Parasitic
        } else {
            LockInType::Moderate
        }
    }

    /// Solve from trait 0 and judge reform at the reference trait
    ///
    /// # Errors
    ///
    /// `DegenerateLandscape` when K(reference) underflows to zero, even if the
    /// solve itself succeeded. With the default constants and φ this happens
    /// from a lock-in index of about 0.99; at 0.98 the fitness is still finite,
    /// around -1e88.
    #[instrument(skip(self), fields(lock_in = self.lock_in_index))]
    pub fn assess(&self) -> Result<LockInAssessment> {
        let equilibrium = self.solver.solve(&[Trait::scalar(0.0)], None)?;

        let reference = Trait::scalar(self.reference_trait);
        let fitness_at_reference = self.solver.landscape().fitness(
            &reference,
            &equilibrium.traits,
            &equilibrium.densities,
        )?;

        let reform_viability = if fitness_at_reference < 0.0 {
            ReformViability::Low
        } else {
            ReformViability::High
        };

        let assessment = LockInAssessment {
            lock_in_index: self.lock_in_index,
            reference_trait: self.reference_trait,
            fitness_at_reference,
            reform_viability,
            renewal_rate: self.renewal_rate(),
            depletion_severity: self.depletion_severity(),
            parasitic_advantage: self.parasitic_advantage(),
            lock_in_type: self.lock_in_type(),
            equilibrium,
        };

        info!(
            kind = %assessment.equilibrium.stability_kind,
            fitness_at_reference,
            viability = ?assessment.reform_viability,
            "Lock-in assessed"
        );
        Ok(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ess_common::{EssError, StabilityKind};

    fn config() -> EssConfig {
        let mut config = EssConfig::default();
        config.solver.t_max = 300.0;
        config
    }

    #[test]
    fn test_rigid_case_is_parasitic_ess() {
        let assessment = LockInModel::from_config(0.87, &config())
            .unwrap()
            .assess()
            .unwrap();
        assert_eq!(assessment.equilibrium.stability_kind, StabilityKind::Ess);
        assert!(assessment.fitness_at_reference < 0.0);
        assert_eq!(assessment.reform_viability, ReformViability::Low);
        assert_eq!(assessment.depletion_severity, DepletionSeverity::Severe);
        assert_eq!(assessment.lock_in_type, LockInType::Parasitic);
        assert!((assessment.renewal_rate - 0.5 * 0.13 * 0.13).abs() < 1e-12);
        assert!((assessment.parasitic_advantage - 3.0 * (1.0 - 0.0169)).abs() < 1e-12);
    }

    #[test]
    fn test_flexible_case_is_reform_viable() {
        let assessment = LockInModel::from_config(0.24, &config())
            .unwrap()
            .assess()
            .unwrap();
        assert_eq!(assessment.equilibrium.stability_kind, StabilityKind::Css);
        assert!(assessment.fitness_at_reference > 0.0);
        assert_eq!(assessment.reform_viability, ReformViability::High);
        assert_eq!(assessment.depletion_severity, DepletionSeverity::Moderate);
        assert_eq!(assessment.lock_in_type, LockInType::Moderate);
    }

    #[test]
    fn test_calibrated_resource_changes_renewal() {
        let model = LockInModel::new(0.5)
            .unwrap()
            .with_resource(ResourceParameters::with_max_renewal_rate(0.4));
        assert!((model.renewal_rate() - 0.1).abs() < 1e-12);
        assert!((model.parasitic_advantage() - 2.25).abs() < 1e-12);
    }

    #[test]
    fn test_zero_max_renewal_keeps_full_advantage() {
        let model = LockInModel::new(0.3)
            .unwrap()
            .with_resource(ResourceParameters::with_max_renewal_rate(0.0));
        assert_eq!(model.parasitic_advantage(), 3.0);
    }

    #[test]
    fn test_extreme_lock_in_is_degenerate() {
        let err = LockInModel::from_config(0.99, &config())
            .unwrap()
            .assess()
            .unwrap_err();
        assert!(matches!(
            err,
            EssError::Landscape(LandscapeError::DegenerateLandscape { .. })
        ));
        assert!(LockInModel::from_config(1.0, &config())
            .unwrap()
            .assess()
            .is_err());
    }

    #[test]
    fn test_near_total_lock_in_still_assesses() {
        let assessment = LockInModel::from_config(0.98, &config())
            .unwrap()
            .assess()
            .unwrap();
        assert_eq!(assessment.equilibrium.stability_kind, StabilityKind::Ess);
        assert!(assessment.fitness_at_reference.is_finite());
        assert!(assessment.fitness_at_reference < -1e80);
        assert_eq!(assessment.reform_viability, ReformViability::Low);
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        assert!(LockInModel::new(1.2).is_err());
    }

    #[test]
    fn test_serialized_labels() {
        let json = serde_json::to_string(&LockInType::Parasitic).unwrap();
        assert_eq!(json, "\"parasitic_ess\"");
        let json = serde_json::to_string(&ReformViability::High).unwrap();
        assert_eq!(json, "\"HIGH\"");
    }
}
