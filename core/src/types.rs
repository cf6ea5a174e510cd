//! Shared primitive types used across the entire generator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable, unique identifier for any generated entity.
pub type EntityId = String;

/// The canonical run identifier.
pub type RunId = String;

/// Entity kinds whose identifiers are tracked across stores.
/// Later phases draw foreign keys for these kinds from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Department,
    Employee,
    TrainingProgram,
    Customer,
    Account,
    Campaign,
    Interaction,
    LoanApplication,
    Loan,
    Policy,
    Claim,
    MonitoringRule,
    AmlCheck,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Department => "department",
            Self::Employee => "employee",
            Self::TrainingProgram => "training_program",
            Self::Customer => "customer",
            Self::Account => "account",
            Self::Campaign => "campaign",
            Self::Interaction => "interaction",
            Self::LoanApplication => "loan_application",
            Self::Loan => "loan",
            Self::Policy => "policy",
            Self::Claim => "claim",
            Self::MonitoringRule => "monitoring_rule",
            Self::AmlCheck => "aml_check",
        }
    }

    /// Prefix of generated identifiers, e.g. `EMP-3F09A1C2B7D4`.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Department => "DEPT",
            Self::Employee => "EMP",
            Self::TrainingProgram => "PROG",
            Self::Customer => "CUST",
            Self::Account => "ACC",
            Self::Campaign => "CMP",
            Self::Interaction => "INT",
            Self::LoanApplication => "LAPP",
            Self::Loan => "LOAN",
            Self::Policy => "POL",
            Self::Claim => "CLM",
            Self::MonitoringRule => "RULE",
            Self::AmlCheck => "AML",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
