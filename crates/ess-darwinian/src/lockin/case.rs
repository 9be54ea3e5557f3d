//! Institutional case analysis
//!
//! Places an observed heredity/variation ratio relative to the golden-ratio
//! optimum and pairs the zone with the lock-in assessment of the case.

use std::sync::Arc;

use ess_common::config::EssConfig;
use ess_common::{ResourceParameters, Result, GOLDEN_RATIO};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::model::{LockInAssessment, LockInModel};
use crate::telemetry::SolverMetrics;

/// Distance to φ below which a case sits in the Goldilocks zone
pub const GOLDILOCKS_RADIUS: f64 = 0.5;

/// Distance to φ above which a case is locked in
pub const LOCK_IN_DISTANCE: f64 = 2.0;

/// Zone of a heredity/variation ratio around the optimum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstitutionalZone {
    Goldilocks,
    Intermediate,
    LockIn,
}

impl InstitutionalZone {
    pub fn from_distance(distance: f64) -> Self {
        if distance < GOLDILOCKS_RADIUS {
            InstitutionalZone::Goldilocks
        } else if distance > LOCK_IN_DISTANCE {
            InstitutionalZone::LockIn
        } else {
            InstitutionalZone::Intermediate
        }
    }

    /// Reform success historically observed in the zone
    pub fn expected_success(&self) -> ExpectedSuccess {
        match self {
            InstitutionalZone::Goldilocks => ExpectedSuccess::High,
            InstitutionalZone::Intermediate => ExpectedSuccess::Moderate,
            InstitutionalZone::LockIn => ExpectedSuccess::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpectedSuccess {
    High,
    Moderate,
    Low,
}

/// Observed institution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionalCase {
    pub name: String,
    /// Heredity/variation ratio
    pub heredity_variation_ratio: f64,
    /// Lock-in index in [0, 1]
    pub lock_in_index: f64,
}

impl InstitutionalCase {
    pub fn new(name: impl Into<String>, heredity_variation_ratio: f64, lock_in_index: f64) -> Self {
        Self {
            name: name.into(),
            heredity_variation_ratio,
            lock_in_index,
        }
    }

    /// |ratio − φ|
    pub fn distance_to_optimum(&self) -> f64 {
        (self.heredity_variation_ratio - GOLDEN_RATIO).abs()
    }

    pub fn zone(&self) -> InstitutionalZone {
        InstitutionalZone::from_distance(self.distance_to_optimum())
    }
}

/// Zone plus lock-in assessment for one case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseAssessment {
    pub name: String,
    pub heredity_variation_ratio: f64,
    pub distance_to_optimum: f64,
    pub zone: InstitutionalZone,
    pub expected_success: ExpectedSuccess,
    pub assessment: LockInAssessment,
}

/// Runs lock-in assessments for a batch of cases with shared settings
#[derive(Debug, Clone)]
pub struct CaseAnalyzer {
    config: EssConfig,
    resource: ResourceParameters,
    metrics: Option<Arc<SolverMetrics>>,
}

impl CaseAnalyzer {
    pub fn new(config: EssConfig) -> Self {
        let resource = ResourceParameters::from(&config.resource);
        Self {
            config,
            resource,
            metrics: None,
        }
    }

    /// Use a calibrated resource sub-model for every case
    pub fn with_resource(mut self, resource: ResourceParameters) -> Self {
        self.resource = resource;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<SolverMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[instrument(skip(self, case), fields(case = %case.name))]
    pub fn analyze(&self, case: &InstitutionalCase) -> Result<CaseAssessment> {
        let mut model = LockInModel::from_config(case.lock_in_index, &self.config)?
            .with_resource(self.resource);
        if let Some(metrics) = &self.metrics {
            model = model.with_metrics(metrics.clone());
        }

        let zone = case.zone();
        Ok(CaseAssessment {
            name: case.name.clone(),
            heredity_variation_ratio: case.heredity_variation_ratio,
            distance_to_optimum: case.distance_to_optimum(),
            zone,
            expected_success: zone.expected_success(),
            assessment: model.assess()?,
        })
    }
}
