//! The six backing stores and their tables.
//!
//! RULE: `tables()` lists each store's tables in dependency order.
//! Inserts follow that order; clears walk it in reverse.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreName {
    Employees,
    Customer,
    Accounts,
    Loans,
    Insurance,
    Compliance,
}

impl StoreName {
    pub const ALL: [StoreName; 6] = [
        StoreName::Employees,
        StoreName::Customer,
        StoreName::Accounts,
        StoreName::Loans,
        StoreName::Insurance,
        StoreName::Compliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employees => "employees",
            Self::Customer => "customer",
            Self::Accounts => "accounts",
            Self::Loans => "loans",
            Self::Insurance => "insurance",
            Self::Compliance => "compliance",
        }
    }

    pub fn tables(&self) -> &'static [&'static str] {
        match self {
            Self::Employees => &["departments", "employees", "training_programs"],
            Self::Customer => &["customer_profiles", "campaigns", "interactions"],
            Self::Accounts => &["customers", "accounts", "account_relationships", "transactions"],
            Self::Loans => &[
                "loan_applications",
                "loans",
                "collateral",
                "repayment_schedules",
                "loan_guarantors",
                "risk_assessments",
            ],
            Self::Insurance => &["policies", "claims"],
            Self::Compliance => &["monitoring_rules", "aml_checks", "sar_filings"],
        }
    }

    /// Schema applied by `Store::migrate`.
    pub fn schema(&self) -> &'static str {
        match self {
            Self::Employees => include_str!("../../../migrations/employees.sql"),
            Self::Customer => include_str!("../../../migrations/customer.sql"),
            Self::Accounts => include_str!("../../../migrations/accounts.sql"),
            Self::Loans => include_str!("../../../migrations/loans.sql"),
            Self::Insurance => include_str!("../../../migrations/insurance.sql"),
            Self::Compliance => include_str!("../../../migrations/compliance.sql"),
        }
    }
}

impl fmt::Display for StoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
