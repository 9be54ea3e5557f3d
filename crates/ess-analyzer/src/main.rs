//! ESS Analyzer Binary
//!
//! Calibrates the renewal curve, then assesses every institutional case
//! against the calibrated resource model. Logs go to stderr; the JSON report
//! goes to stdout.
//!
//! ```text
//! ess-analyzer [cases.json]
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::Encoder;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ess_calibration::{BootstrapCalibrator, CalibrationCase};
use ess_common::config::EssConfig;
use ess_common::{BootstrapFit, VERSION};
use ess_darwinian::lockin::CaseAssessment;
use ess_darwinian::{CaseAnalyzer, InstitutionalCase, SolverMetrics};

/// Analyzer input file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnalysisInput {
    /// (lock-in, observed renewal) pairs for calibration
    calibration: Vec<CalibrationCase>,
    /// Institutions to assess
    cases: Vec<InstitutionalCase>,
}

impl Default for AnalysisInput {
    fn default() -> Self {
        Self {
            calibration: vec![
                CalibrationCase::new("Chile", 0.24, 0.289),
                CalibrationCase::new("Brazil", 0.78, 0.024),
                CalibrationCase::new("Argentina", 0.87, 0.009),
            ],
            cases: vec![
                InstitutionalCase::new("Chile", 1.476, 0.24),
                InstitutionalCase::new("Brazil", 2.0, 0.78),
                InstitutionalCase::new("Argentina", 4.12, 0.87),
            ],
        }
    }
}

#[derive(Debug, Serialize)]
struct CaseFailure {
    name: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct AnalysisReport {
    version: &'static str,
    calibration: BootstrapFit,
    formula: String,
    cases: Vec<CaseAssessment>,
    failures: Vec<CaseFailure>,
}

fn load_input(path: Option<&str>) -> Result<AnalysisInput> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read input file {}", path))?;
            serde_json::from_str(&raw).with_context(|| format!("Invalid input file {}", path))
        }
        None => Ok(AnalysisInput::default()),
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting ESS analyzer v{}", VERSION);

    // Load configuration
    let config = EssConfig::load(None)?;
    debug!("Loaded configuration: {:?}", config);

    let input_path = std::env::args().nth(1);
    let input = load_input(input_path.as_deref())?;
    info!(
        calibration_cases = input.calibration.len(),
        institutions = input.cases.len(),
        "Input loaded"
    );

    // Metrics
    let registry = prometheus::Registry::new();
    let metrics = Arc::new(SolverMetrics::new()?);
    metrics.register(&registry)?;

    // Calibrate ρ_max
    let fit = BootstrapCalibrator::from_settings(&config.calibration).calibrate(&input.calibration)?;
    info!("Calibrated {}", fit.formula());

    // Assess cases against the calibrated resource model
    let analyzer = CaseAnalyzer::new(config)
        .with_resource(fit.resource_parameters())
        .with_metrics(metrics.clone());

    let mut cases = Vec::with_capacity(input.cases.len());
    let mut failures = Vec::new();
    for case in &input.cases {
        match analyzer.analyze(case) {
            Ok(assessment) => {
                info!(
                    case = %case.name,
                    zone = ?assessment.zone,
                    kind = %assessment.assessment.equilibrium.stability_kind,
                    "Case assessed"
                );
                cases.push(assessment);
            }
            Err(e) => {
                error!(case = %case.name, "Case failed: {}", e);
                failures.push(CaseFailure {
                    name: case.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let mut buffer = Vec::new();
    prometheus::TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    debug!("Solver metrics:\n{}", String::from_utf8_lossy(&buffer));

    let report = AnalysisReport {
        version: VERSION,
        formula: fit.formula(),
        calibration: fit,
        cases,
        failures,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_input_document() {
        let raw = r#"{
            "calibration": [
                {"name": "Chile", "predictor": 0.24, "observed": 0.289},
                {"name": "Brazil", "predictor": 0.78, "observed": 0.024}
            ],
            "cases": [
                {"name": "Singapore", "heredity_variation_ratio": 1.62, "lock_in_index": 0.25}
            ]
        }"#;
        let input: AnalysisInput = serde_json::from_str(raw).unwrap();
        assert_eq!(input.calibration.len(), 2);
        assert_eq!(input.cases[0].name, "Singapore");
        assert_eq!(input.cases[0].lock_in_index, 0.25);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_input(Some("/nonexistent/ess-cases.json")).is_err());
        assert_eq!(load_input(None).unwrap().cases.len(), 3);
    }
}
