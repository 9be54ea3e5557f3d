//! EquilibriumResult - classified outcome of one stability solve
//!
//! Created once per `solve()` call, fully populated before return, read-only
//! afterwards. Consumed by report and plotting collaborators as plain data.

use serde::{Deserialize, Serialize};

use super::strategy::Trait;

/// Classification of an evolutionary singular strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StabilityKind {
    /// Fitness peak: invasion resistant
    Ess,
    /// Fitness valley: convergent but open to invasion (branching point)
    Css,
    /// Saddle: the dynamics move away from it
    Repellor,
    /// Marginal, mixed, or unconverged
    Unknown,
}

impl StabilityKind {
    /// Classify from scalar curvatures
    ///
    /// All strictly below `-threshold` is ESS, all strictly above `+threshold`
    /// is CSS. Anything else, including values exactly at the threshold, is
    /// Unknown. This is the single-resident rule; several residents pool their
    /// curvatures through [`StabilityKind::from_eigenvalues`].
    pub fn from_curvatures(curvatures: &[f64], threshold: f64) -> Self {
        if curvatures.is_empty() {
            return StabilityKind::Unknown;
        }
        if curvatures.iter().all(|c| *c < -threshold) {
            StabilityKind::Ess
        } else if curvatures.iter().all(|c| *c > threshold) {
            StabilityKind::Css
        } else {
            StabilityKind::Unknown
        }
    }

    /// Classify from Hessian eigenvalues
    ///
    /// Same rule as [`StabilityKind::from_curvatures`], plus Repellor when the
    /// spectrum holds eigenvalues clearly on both sides of zero.
    pub fn from_eigenvalues(eigenvalues: &[f64], threshold: f64) -> Self {
        match Self::from_curvatures(eigenvalues, threshold) {
            StabilityKind::Unknown => {
                let any_negative = eigenvalues.iter().any(|e| *e < -threshold);
                let any_positive = eigenvalues.iter().any(|e| *e > threshold);
                if any_negative && any_positive {
                    StabilityKind::Repellor
                } else {
                    StabilityKind::Unknown
                }
            }
            kind => kind,
        }
    }

    /// Stable label used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            StabilityKind::Ess => "ESS",
            StabilityKind::Css => "CSS",
            StabilityKind::Repellor => "REPELLOR",
            StabilityKind::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for StabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of ESS analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquilibriumResult {
    /// Resident traits at the final state
    pub traits: Vec<Trait>,
    /// Resident densities at the final state
    pub densities: Vec<f64>,
    /// Fitness of each resident at the final state (≈ 0 at a true equilibrium)
    pub fitness: Vec<f64>,
    /// Classification
    pub stability_kind: StabilityKind,
    /// Curvatures (scalar traits) or pooled Hessian eigenvalues (vector traits)
    pub hessian_eigenvalues: Vec<f64>,
    /// First time at which the trait displacement fell below the threshold
    pub convergence_time: f64,
    /// False when no step met the convergence threshold before t_max
    pub converged: bool,
    /// |min eigenvalue| for an ESS, 0 otherwise
    pub invasion_resistance: f64,
    /// Adaptive-landscape scan around the residents, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_principle: Option<MaximumPrincipleCheck>,
    /// Perturbed re-solves, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convergent_stability: Option<ConvergentStabilityCheck>,
}

/// Scan of G(v, U*, X*) along each trait axis through every living resident
///
/// Residents of an ESS coalition sit on the global maximum of the adaptive
/// landscape, and that maximum is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaximumPrincipleCheck {
    /// Scanned trait with the highest fitness
    pub peak_trait: Trait,
    /// Fitness at `peak_trait`
    pub peak_fitness: f64,
    /// Every scan line peaks within tolerance of the resident it passes through
    pub residents_at_peak: bool,
    /// `|peak_fitness|` below the fitness tolerance
    pub fitness_near_zero: bool,
}

impl MaximumPrincipleCheck {
    pub fn holds(&self) -> bool {
        self.residents_at_peak && self.fitness_near_zero
    }
}

/// Re-solves from seeded perturbations of the candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergentStabilityCheck {
    pub trials: usize,
    /// Trials that converged back onto the candidate
    pub returned: usize,
    /// `returned` reached the required fraction of `trials`
    pub convergent_stable: bool,
}

impl EquilibriumResult {
    /// Location of the first resident (the equilibrium of a single-resident run)
    pub fn primary_trait(&self) -> &Trait {
        &self.traits[0]
    }

    /// True when the equilibrium resists invasion by nearby mutants
    pub fn is_invasion_resistant(&self) -> bool {
        self.stability_kind == StabilityKind::Ess
    }

    /// Largest absolute resident fitness
    pub fn max_abs_fitness(&self) -> f64 {
        self.fitness.iter().fold(0.0_f64, |acc, g| acc.max(g.abs()))
    }
}
