//! Institutional lock-in on top of the ESS solver

pub mod case;
pub mod model;

pub use self::case::{
    CaseAnalyzer, CaseAssessment, ExpectedSuccess, InstitutionalCase, InstitutionalZone,
};
pub use self::model::{
    ComplianceStrategy, DepletionSeverity, LockInAssessment, LockInModel, LockInType,
    ReformViability,
};
