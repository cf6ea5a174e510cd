//! Generator configuration: scale, tunables and every distribution table.
//!
//! `GenConfig::base()` is the built-in baseline (scale 1.0).
//! `GenConfig::load()` layers a JSON file over it; any field the file
//! omits keeps its baseline value.
//!
//! RULE: `validate()` runs before any phase. A malformed table is a
//! configuration error, never a mid-run surprise.

use crate::{
    distribution::{validate_ratio, Range, WeightedTable},
    error::{GenError, GenResult},
    scale::ScaleConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Scale entity names.
pub mod entity {
    pub const DEPARTMENTS: &str = "departments";
    pub const EMPLOYEES: &str = "employees";
    pub const TRAINING_PROGRAMS: &str = "training_programs";
    pub const BRANCHES: &str = "branches";
    pub const CUSTOMERS: &str = "customers";
    pub const CAMPAIGNS: &str = "campaigns";
    pub const MONITORING_RULES: &str = "monitoring_rules";
}

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_BATCH_SIZE: usize = 1_000;
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

fn table(pairs: &[(&str, f64)]) -> WeightedTable<String> {
    WeightedTable::new(pairs.iter().map(|(label, w)| (label.to_string(), *w)))
}

fn ranges(pairs: &[(&str, f64, f64)]) -> BTreeMap<String, Range> {
    pairs
        .iter()
        .map(|(label, lo, hi)| (label.to_string(), Range::new(*lo, *hi)))
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ── Workforce ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentSpec {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSpec {
    pub category: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkforceConfig {
    pub departments: Vec<DepartmentSpec>,
    pub roles: WeightedTable<String>,
    /// Role → department code.
    pub role_departments: BTreeMap<String, String>,
    pub salaries: BTreeMap<String, Range>,
    pub fallback_salary: Range,
    pub department_budget: Range,
    pub hire_window_days: i64,
    pub terminated_ratio: f64,
    pub managed_ratio: f64,
    pub training_programs: Vec<ProgramSpec>,
    pub program_hours: Vec<i64>,
    pub certification_ratio: f64,
    pub corporate_email_domain: String,
}

impl Default for WorkforceConfig {
    fn default() -> Self {
        let departments = [
            ("retail_banking", "Retail Banking"),
            ("lending", "Lending"),
            ("insurance", "Insurance"),
            ("compliance", "Compliance & Risk"),
            ("operations", "Operations"),
            ("customer_service", "Customer Service"),
            ("risk", "Risk Management"),
            ("it", "Information Technology"),
            ("hr", "Human Resources"),
            ("finance", "Finance"),
            ("audit", "Internal Audit"),
            ("marketing", "Marketing"),
        ]
        .iter()
        .map(|(code, name)| DepartmentSpec { code: code.to_string(), name: name.to_string() })
        .collect();

        let role_departments = [
            ("customer_service_rep", "customer_service"),
            ("loan_officer", "lending"),
            ("insurance_agent", "insurance"),
            ("compliance_officer", "compliance"),
            ("branch_manager", "retail_banking"),
            ("risk_analyst", "risk"),
            ("it_specialist", "it"),
            ("hr_specialist", "hr"),
            ("marketing_specialist", "marketing"),
        ]
        .iter()
        .map(|(r, d)| (r.to_string(), d.to_string()))
        .collect();

        let training_programs = [
            ("compliance", "AML Training"),
            ("compliance", "KYC Procedures"),
            ("compliance", "Regulatory Updates"),
            ("compliance", "Ethics Training"),
            ("product", "Loan Products Overview"),
            ("product", "Insurance Fundamentals"),
            ("product", "Investment Products"),
            ("customer_service", "Customer Communication"),
            ("customer_service", "Conflict Resolution"),
            ("customer_service", "Sales Techniques"),
            ("technical", "Core Banking System"),
            ("technical", "CRM Software"),
            ("technical", "Data Analytics"),
            ("leadership", "Team Management"),
            ("leadership", "Performance Reviews"),
            ("leadership", "Strategic Planning"),
        ]
        .iter()
        .map(|(c, n)| ProgramSpec { category: c.to_string(), name: n.to_string() })
        .collect();

        Self {
            departments,
            roles: table(&[
                ("customer_service_rep", 0.40),
                ("loan_officer", 0.20),
                ("insurance_agent", 0.15),
                ("compliance_officer", 0.10),
                ("branch_manager", 0.05),
                ("risk_analyst", 0.03),
                ("it_specialist", 0.03),
                ("hr_specialist", 0.02),
                ("marketing_specialist", 0.02),
            ]),
            role_departments,
            salaries: ranges(&[
                ("customer_service_rep", 35_000.0, 55_000.0),
                ("loan_officer", 50_000.0, 80_000.0),
                ("insurance_agent", 45_000.0, 75_000.0),
                ("compliance_officer", 60_000.0, 95_000.0),
                ("branch_manager", 70_000.0, 120_000.0),
                ("risk_analyst", 65_000.0, 100_000.0),
                ("it_specialist", 70_000.0, 110_000.0),
                ("hr_specialist", 55_000.0, 85_000.0),
                ("marketing_specialist", 60_000.0, 90_000.0),
            ]),
            fallback_salary: Range::new(40_000.0, 70_000.0),
            department_budget: Range::new(500_000.0, 5_000_000.0),
            hire_window_days: 3_650,
            terminated_ratio: 0.05,
            managed_ratio: 0.70,
            training_programs,
            program_hours: vec![2, 4, 8, 16, 24, 40],
            certification_ratio: 0.30,
            corporate_email_domain: "demobank.example".into(),
        }
    }
}

// ── Customer master ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerConfig {
    pub segments: WeightedTable<String>,
    pub statuses: WeightedTable<String>,
    pub kyc_statuses: WeightedTable<String>,
    pub risk_ratings: WeightedTable<String>,
    pub age_mean: f64,
    pub age_std_dev: f64,
    pub min_age: i64,
    pub max_age: i64,
    pub history_days: i64,
    pub assigned_agent_ratio: f64,
}

impl Default for CustomerConfig {
    fn default() -> Self {
        Self {
            segments: table(&[
                ("retail", 0.60),
                ("premium", 0.25),
                ("corporate", 0.10),
                ("private_banking", 0.05),
            ]),
            statuses: table(&[("active", 0.90), ("dormant", 0.07), ("closed", 0.03)]),
            kyc_statuses: table(&[("verified", 0.85), ("pending", 0.10), ("expired", 0.05)]),
            risk_ratings: table(&[("low", 0.70), ("medium", 0.25), ("high", 0.05)]),
            age_mean: 42.0,
            age_std_dev: 15.0,
            min_age: 18,
            max_age: 85,
            history_days: 7 * 365,
            assigned_agent_ratio: 0.80,
        }
    }
}

// ── Banking ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BankingConfig {
    pub participation: f64,
    pub second_account_ratio: f64,
    pub account_types: WeightedTable<String>,
    pub statuses: WeightedTable<String>,
    pub opening_balances: BTreeMap<String, Range>,
    pub open_window_days: i64,
    pub home_currency: String,
    pub home_currency_ratio: f64,
    pub foreign_currencies: Vec<String>,
    pub relationship_types: WeightedTable<String>,
    pub min_transactions: u32,
    pub max_transactions: u32,
    pub transaction_types: WeightedTable<String>,
    pub transaction_amounts: BTreeMap<String, Range>,
    pub processed_by_ratio: f64,
}

impl Default for BankingConfig {
    fn default() -> Self {
        Self {
            participation: 0.75,
            second_account_ratio: 0.25,
            account_types: table(&[
                ("checking", 0.50),
                ("savings", 0.30),
                ("money_market", 0.15),
                ("cd", 0.05),
            ]),
            statuses: table(&[("active", 0.92), ("frozen", 0.05), ("closed", 0.03)]),
            opening_balances: ranges(&[
                ("checking", 50.0, 25_000.0),
                ("savings", 100.0, 100_000.0),
                ("money_market", 10_000.0, 500_000.0),
                ("cd", 5_000.0, 200_000.0),
            ]),
            open_window_days: 365,
            home_currency: "USD".into(),
            home_currency_ratio: 0.95,
            foreign_currencies: strings(&["EUR", "GBP", "CAD"]),
            relationship_types: table(&[
                ("overdraft_protection", 0.50),
                ("linked_savings", 0.30),
                ("sweep", 0.20),
            ]),
            min_transactions: 5,
            max_transactions: 25,
            transaction_types: table(&[
                ("deposit", 0.35),
                ("withdrawal", 0.25),
                ("payment", 0.20),
                ("transfer", 0.15),
                ("fee", 0.05),
            ]),
            transaction_amounts: ranges(&[
                ("deposit", 20.0, 5_000.0),
                ("withdrawal", 20.0, 2_000.0),
                ("payment", 10.0, 1_500.0),
                ("transfer", 50.0, 5_000.0),
                ("fee", 1.0, 50.0),
            ]),
            processed_by_ratio: 0.30,
        }
    }
}

// ── Engagement ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSpec {
    pub name: String,
    pub campaign_type: String,
    pub channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    pub campaigns: Vec<CampaignSpec>,
    pub campaign_budget: Range,
    pub campaign_window_days: i64,
    pub participation: f64,
    pub second_interaction_ratio: f64,
    pub channels: WeightedTable<String>,
    pub outcomes: WeightedTable<String>,
    pub topics: Vec<String>,
    pub campaign_link_ratio: f64,
    pub interaction_window_days: i64,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        let campaigns = [
            ("Spring Savings Boost", "acquisition", "email"),
            ("Home Loan Rate Drop", "cross_sell", "direct_mail"),
            ("Premium Card Upgrade", "cross_sell", "phone"),
            ("Win-Back Dormant Accounts", "retention", "email"),
            ("Small Business Kickstart", "acquisition", "branch"),
            ("Protect Your Family", "cross_sell", "email"),
            ("Digital Banking Launch", "engagement", "social"),
            ("Year-End Investment Review", "retention", "phone"),
        ]
        .iter()
        .map(|(n, t, c)| CampaignSpec {
            name: n.to_string(),
            campaign_type: t.to_string(),
            channel: c.to_string(),
        })
        .collect();

        Self {
            campaigns,
            campaign_budget: Range::new(10_000.0, 250_000.0),
            campaign_window_days: 365,
            participation: 0.60,
            second_interaction_ratio: 0.30,
            channels: table(&[("email", 0.40), ("phone", 0.30), ("branch", 0.20), ("chat", 0.10)]),
            outcomes: table(&[("resolved", 0.70), ("follow_up", 0.20), ("escalated", 0.10)]),
            topics: strings(&[
                "account_inquiry",
                "card_issue",
                "loan_question",
                "fee_dispute",
                "address_change",
                "product_information",
                "online_banking_help",
            ]),
            campaign_link_ratio: 0.50,
            interaction_window_days: 730,
        }
    }
}

// ── Lending ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanParams {
    pub amount: Range,
    pub interest: Range,
    pub term_months: Vec<i64>,
    /// Collateral kinds accepted; empty for unsecured products.
    #[serde(default)]
    pub collateral: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LendingConfig {
    pub participation: f64,
    pub second_application_ratio: f64,
    pub loan_types: WeightedTable<String>,
    pub params: BTreeMap<String, LoanParams>,
    pub application_statuses: WeightedTable<String>,
    pub loan_statuses: WeightedTable<String>,
    pub application_window_days: i64,
    pub min_decision_days: i64,
    pub max_decision_days: i64,
    pub max_disbursement_days: i64,
    pub approved_fraction: Range,
    pub rejection_reasons: Vec<String>,
    pub collateral_ratio: f64,
    pub appraisal_value_fraction: Range,
    pub guarantor_ratio: f64,
    pub second_guarantor_ratio: f64,
    pub guarantee_fraction: Range,
    pub guarantor_relationships: Vec<String>,
    pub reassessment_ratio: f64,
}

impl Default for LendingConfig {
    fn default() -> Self {
        let params = |amount: (f64, f64), interest: (f64, f64), terms: &[i64], collateral: &[&str]| {
            LoanParams {
                amount: Range::new(amount.0, amount.1),
                interest: Range::new(interest.0, interest.1),
                term_months: terms.to_vec(),
                collateral: strings(collateral),
            }
        };
        let mut by_type = BTreeMap::new();
        by_type.insert(
            "mortgage".to_string(),
            params((100_000.0, 800_000.0), (0.0325, 0.0675), &[180, 240, 300, 360], &["property", "real_estate"]),
        );
        by_type.insert(
            "personal".to_string(),
            params((5_000.0, 75_000.0), (0.0599, 0.1799), &[12, 24, 36, 48, 60], &[]),
        );
        by_type.insert(
            "auto".to_string(),
            params((15_000.0, 80_000.0), (0.0399, 0.0899), &[36, 48, 60, 72], &["vehicle"]),
        );
        by_type.insert(
            "business".to_string(),
            params((25_000.0, 500_000.0), (0.0499, 0.1299), &[36, 60, 84, 120], &["equipment", "property", "inventory"]),
        );
        by_type.insert(
            "education".to_string(),
            params((5_000.0, 100_000.0), (0.0425, 0.0875), &[60, 84, 120, 180], &[]),
        );

        Self {
            participation: 0.35,
            second_application_ratio: 0.20,
            loan_types: table(&[
                ("mortgage", 0.35),
                ("personal", 0.30),
                ("auto", 0.20),
                ("business", 0.10),
                ("education", 0.05),
            ]),
            params: by_type,
            application_statuses: table(&[
                ("approved", 0.65),
                ("pending", 0.10),
                ("rejected", 0.20),
                ("withdrawn", 0.05),
            ]),
            loan_statuses: table(&[
                ("active", 0.75),
                ("paid_off", 0.20),
                ("defaulted", 0.03),
                ("restructured", 0.02),
            ]),
            application_window_days: 730,
            min_decision_days: 1,
            max_decision_days: 30,
            max_disbursement_days: 14,
            approved_fraction: Range::new(0.80, 1.00),
            rejection_reasons: strings(&[
                "Insufficient credit history",
                "Low credit score",
                "High debt-to-income ratio",
                "Incomplete documentation",
                "Unstable employment history",
                "Insufficient collateral value",
            ]),
            collateral_ratio: 0.80,
            appraisal_value_fraction: Range::new(1.10, 1.50),
            guarantor_ratio: 0.25,
            second_guarantor_ratio: 0.30,
            guarantee_fraction: Range::new(0.50, 1.00),
            guarantor_relationships: strings(&[
                "spouse",
                "parent",
                "sibling",
                "business_partner",
                "family_member",
                "friend",
                "co-signer",
            ]),
            reassessment_ratio: 0.40,
        }
    }
}

// ── Insurance ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyParams {
    pub annual_premium: Range,
    pub coverage: Range,
    pub term_months: i64,
    pub claim_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsuranceConfig {
    pub participation: f64,
    pub second_policy_ratio: f64,
    pub policy_types: WeightedTable<String>,
    pub statuses: WeightedTable<String>,
    pub params: BTreeMap<String, PolicyParams>,
    pub policy_window_days: i64,
    pub claim_ratio: f64,
    pub second_claim_ratio: f64,
    pub claim_statuses: WeightedTable<String>,
    pub claim_fraction: Range,
}

impl Default for InsuranceConfig {
    fn default() -> Self {
        let params = |premium: (f64, f64), coverage: (f64, f64), term_months: i64, claims: &[&str]| {
            PolicyParams {
                annual_premium: Range::new(premium.0, premium.1),
                coverage: Range::new(coverage.0, coverage.1),
                term_months,
                claim_types: strings(claims),
            }
        };
        let mut by_type = BTreeMap::new();
        by_type.insert(
            "auto".to_string(),
            params((600.0, 2_400.0), (25_000.0, 100_000.0), 12, &["collision", "theft", "glass"]),
        );
        by_type.insert(
            "life".to_string(),
            params((300.0, 3_000.0), (100_000.0, 1_000_000.0), 240, &["death_benefit"]),
        );
        by_type.insert(
            "home".to_string(),
            params((800.0, 3_500.0), (150_000.0, 800_000.0), 12, &["fire", "water_damage", "theft", "storm"]),
        );
        by_type.insert(
            "health".to_string(),
            params((2_000.0, 9_000.0), (50_000.0, 500_000.0), 12, &["hospitalization", "outpatient", "prescription"]),
        );

        Self {
            participation: 0.30,
            second_policy_ratio: 0.15,
            policy_types: table(&[("auto", 0.30), ("life", 0.30), ("home", 0.25), ("health", 0.15)]),
            statuses: table(&[("active", 0.80), ("lapsed", 0.12), ("cancelled", 0.08)]),
            params: by_type,
            policy_window_days: 5 * 365,
            claim_ratio: 0.20,
            second_claim_ratio: 0.10,
            claim_statuses: table(&[
                ("approved", 0.55),
                ("pending", 0.20),
                ("denied", 0.15),
                ("under_review", 0.10),
            ]),
            claim_fraction: Range::new(0.01, 0.40),
        }
    }
}

// ── Compliance ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub category: String,
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    pub rules: Vec<RuleSpec>,
    pub check_results: WeightedTable<String>,
    pub max_check_delay_days: i64,
    pub sar_ratio: f64,
    pub sar_statuses: WeightedTable<String>,
    pub max_filing_delay_days: i64,
    pub suspicious_amount: Range,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        let rules = [
            ("Large Cash Deposit", "cash", 10_000.0),
            ("Structuring Pattern", "cash", 9_000.0),
            ("Rapid Fund Movement", "velocity", 5.0),
            ("High-Risk Jurisdiction Wire", "geography", 1.0),
            ("Dormant Account Reactivation", "behavior", 180.0),
            ("Unusual ATM Activity", "velocity", 10.0),
            ("Round Amount Transfers", "pattern", 5_000.0),
            ("Sanctions Name Match", "sanctions", 0.85),
            ("Politically Exposed Person", "sanctions", 1.0),
            ("Cross-Border Layering", "pattern", 3.0),
        ]
        .iter()
        .map(|(n, c, t)| RuleSpec { name: n.to_string(), category: c.to_string(), threshold: *t })
        .collect();

        Self {
            rules,
            check_results: table(&[("clear", 0.92), ("review", 0.06), ("flagged", 0.02)]),
            max_check_delay_days: 30,
            sar_ratio: 0.50,
            sar_statuses: table(&[("filed", 0.70), ("draft", 0.20), ("closed", 0.10)]),
            max_filing_delay_days: 30,
            suspicious_amount: Range::new(10_000.0, 250_000.0),
        }
    }
}

// ── Top level ─────────────────────────────────────────────────────

/// Baseline entity table: counts at scale 1.0.
fn base_scale(factor: f64) -> ScaleConfig {
    ScaleConfig::new(factor)
        .fixed(entity::DEPARTMENTS, 12)
        .linear(entity::EMPLOYEES, 150)
        .fixed(entity::TRAINING_PROGRAMS, 16)
        .fixed(entity::BRANCHES, 20)
        .linear(entity::CUSTOMERS, 1_200)
        .fixed(entity::CAMPAIGNS, 8)
        .fixed(entity::MONITORING_RULES, 10)
}

impl Default for ScaleConfig {
    fn default() -> Self {
        base_scale(1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenConfig {
    pub seed: u64,
    pub scale: ScaleConfig,
    pub batch_size: usize,
    pub retry_budget: u32,
    pub unique_attempt_multiplier: usize,
    pub workforce: WorkforceConfig,
    pub customers: CustomerConfig,
    pub banking: BankingConfig,
    pub engagement: EngagementConfig,
    pub lending: LendingConfig,
    pub insurance: InsuranceConfig,
    pub compliance: ComplianceConfig,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self::base()
    }
}

impl GenConfig {
    /// Built-in baseline at scale 1.0.
    pub fn base() -> Self {
        Self {
            seed: DEFAULT_SEED,
            scale: base_scale(1.0),
            batch_size: DEFAULT_BATCH_SIZE,
            retry_budget: DEFAULT_RETRY_BUDGET,
            unique_attempt_multiplier: crate::unique::DEFAULT_ATTEMPT_MULTIPLIER,
            workforce: WorkforceConfig::default(),
            customers: CustomerConfig::default(),
            banking: BankingConfig::default(),
            engagement: EngagementConfig::default(),
            lending: LendingConfig::default(),
            insurance: InsuranceConfig::default(),
            compliance: ComplianceConfig::default(),
        }
    }

    /// Baseline scaled down for fast tests: 15 employees, 60 customers.
    pub fn default_test() -> Self {
        Self::base().with_scale(0.05).with_override(entity::EMPLOYEES, 15)
    }

    /// Read a JSON overlay from `path`. The result is validated.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: GenConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {}: {e}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_scale(mut self, factor: f64) -> Self {
        self.scale.factor = factor;
        self
    }

    pub fn with_override(mut self, entity: &str, count: i64) -> Self {
        self.scale = self.scale.with_override(entity, count);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Every configuration-time check, run before the first phase.
    pub fn validate(&self) -> GenResult<()> {
        if self.batch_size == 0 {
            return Err(GenError::Config("batch_size must be > 0".into()));
        }
        if self.retry_budget == 0 {
            return Err(GenError::Config("retry_budget must be >= 1".into()));
        }
        if self.unique_attempt_multiplier == 0 {
            return Err(GenError::Config("unique_attempt_multiplier must be >= 1".into()));
        }
        self.scale.resolve()?;

        let w = &self.workforce;
        w.roles.validate("workforce.roles")?;
        w.fallback_salary.validate("workforce.fallback_salary")?;
        w.department_budget.validate("workforce.department_budget")?;
        for (role, range) in &w.salaries {
            range.validate(&format!("workforce.salaries.{role}"))?;
        }
        validate_ratio("workforce.terminated_ratio", w.terminated_ratio)?;
        validate_ratio("workforce.managed_ratio", w.managed_ratio)?;
        validate_ratio("workforce.certification_ratio", w.certification_ratio)?;
        non_empty("workforce.program_hours", w.program_hours.len())?;
        non_negative("workforce.hire_window_days", w.hire_window_days)?;

        let c = &self.customers;
        c.segments.validate("customers.segments")?;
        c.statuses.validate("customers.statuses")?;
        c.kyc_statuses.validate("customers.kyc_statuses")?;
        c.risk_ratings.validate("customers.risk_ratings")?;
        validate_ratio("customers.assigned_agent_ratio", c.assigned_agent_ratio)?;
        if c.min_age > c.max_age || c.min_age < 0 {
            return Err(GenError::Config(format!(
                "customers age bounds invalid: [{}, {}]",
                c.min_age, c.max_age
            )));
        }
        non_negative("customers.history_days", c.history_days)?;

        let b = &self.banking;
        validate_ratio("banking.participation", b.participation)?;
        validate_ratio("banking.second_account_ratio", b.second_account_ratio)?;
        validate_ratio("banking.home_currency_ratio", b.home_currency_ratio)?;
        validate_ratio("banking.processed_by_ratio", b.processed_by_ratio)?;
        b.account_types.validate("banking.account_types")?;
        b.statuses.validate("banking.statuses")?;
        b.relationship_types.validate("banking.relationship_types")?;
        b.transaction_types.validate("banking.transaction_types")?;
        covered("banking.opening_balances", b.account_types.labels(), &b.opening_balances)?;
        covered("banking.transaction_amounts", b.transaction_types.labels(), &b.transaction_amounts)?;
        for (label, range) in b.opening_balances.iter().chain(&b.transaction_amounts) {
            range.validate(label)?;
        }
        if b.min_transactions > b.max_transactions {
            return Err(GenError::Config(format!(
                "banking transactions per account invalid: [{}, {}]",
                b.min_transactions, b.max_transactions
            )));
        }
        non_empty("banking.foreign_currencies", b.foreign_currencies.len())?;

        let e = &self.engagement;
        validate_ratio("engagement.participation", e.participation)?;
        validate_ratio("engagement.second_interaction_ratio", e.second_interaction_ratio)?;
        validate_ratio("engagement.campaign_link_ratio", e.campaign_link_ratio)?;
        e.channels.validate("engagement.channels")?;
        e.outcomes.validate("engagement.outcomes")?;
        e.campaign_budget.validate("engagement.campaign_budget")?;
        non_empty("engagement.topics", e.topics.len())?;

        let l = &self.lending;
        validate_ratio("lending.participation", l.participation)?;
        validate_ratio("lending.second_application_ratio", l.second_application_ratio)?;
        validate_ratio("lending.collateral_ratio", l.collateral_ratio)?;
        validate_ratio("lending.guarantor_ratio", l.guarantor_ratio)?;
        validate_ratio("lending.second_guarantor_ratio", l.second_guarantor_ratio)?;
        validate_ratio("lending.reassessment_ratio", l.reassessment_ratio)?;
        l.loan_types.validate("lending.loan_types")?;
        l.application_statuses.validate("lending.application_statuses")?;
        l.loan_statuses.validate("lending.loan_statuses")?;
        covered("lending.params", l.loan_types.labels(), &l.params)?;
        for (loan_type, p) in &l.params {
            p.amount.validate(&format!("lending.params.{loan_type}.amount"))?;
            p.interest.validate(&format!("lending.params.{loan_type}.interest"))?;
            non_empty(&format!("lending.params.{loan_type}.term_months"), p.term_months.len())?;
            if p.term_months.iter().any(|t| *t <= 0) {
                return Err(GenError::Config(format!(
                    "lending.params.{loan_type}.term_months must be positive"
                )));
            }
        }
        if l.min_decision_days > l.max_decision_days {
            return Err(GenError::Config("lending decision window is empty".into()));
        }
        l.approved_fraction.validate("lending.approved_fraction")?;
        l.appraisal_value_fraction.validate("lending.appraisal_value_fraction")?;
        l.guarantee_fraction.validate("lending.guarantee_fraction")?;
        non_empty("lending.rejection_reasons", l.rejection_reasons.len())?;
        non_empty("lending.guarantor_relationships", l.guarantor_relationships.len())?;

        let i = &self.insurance;
        validate_ratio("insurance.participation", i.participation)?;
        validate_ratio("insurance.second_policy_ratio", i.second_policy_ratio)?;
        validate_ratio("insurance.claim_ratio", i.claim_ratio)?;
        validate_ratio("insurance.second_claim_ratio", i.second_claim_ratio)?;
        i.policy_types.validate("insurance.policy_types")?;
        i.statuses.validate("insurance.statuses")?;
        i.claim_statuses.validate("insurance.claim_statuses")?;
        i.claim_fraction.validate("insurance.claim_fraction")?;
        covered("insurance.params", i.policy_types.labels(), &i.params)?;
        for (policy_type, p) in &i.params {
            p.annual_premium.validate(&format!("insurance.params.{policy_type}.annual_premium"))?;
            p.coverage.validate(&format!("insurance.params.{policy_type}.coverage"))?;
            non_empty(&format!("insurance.params.{policy_type}.claim_types"), p.claim_types.len())?;
        }

        let k = &self.compliance;
        k.check_results.validate("compliance.check_results")?;
        k.sar_statuses.validate("compliance.sar_statuses")?;
        validate_ratio("compliance.sar_ratio", k.sar_ratio)?;
        k.suspicious_amount.validate("compliance.suspicious_amount")?;

        Ok(())
    }
}

fn non_empty(name: &str, len: usize) -> GenResult<()> {
    if len == 0 {
        return Err(GenError::Config(format!("'{name}' must not be empty")));
    }
    Ok(())
}

fn non_negative(name: &str, value: i64) -> GenResult<()> {
    if value < 0 {
        return Err(GenError::Config(format!("'{name}' must be >= 0, got {value}")));
    }
    Ok(())
}

/// Every label of a distribution table needs its parameter entry.
fn covered<'a, V>(
    name: &str,
    labels: impl Iterator<Item = &'a String>,
    params: &BTreeMap<String, V>,
) -> GenResult<()> {
    for label in labels {
        if !params.contains_key(label) {
            return Err(GenError::Config(format!("'{name}' has no entry for '{label}'")));
        }
    }
    Ok(())
}

/// File locations of the six backing stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorePaths {
    pub employees: PathBuf,
    pub customer: PathBuf,
    pub accounts: PathBuf,
    pub loans: PathBuf,
    pub insurance: PathBuf,
    pub compliance: PathBuf,
}

impl StorePaths {
    /// One `<store>.db` file per store inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            employees: dir.join("employees.db"),
            customer: dir.join("customer.db"),
            accounts: dir.join("accounts.db"),
            loans: dir.join("loans.db"),
            insurance: dir.join("insurance.db"),
            compliance: dir.join("compliance.db"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_config_is_valid() {
        GenConfig::base().validate().unwrap();
        GenConfig::default_test().validate().unwrap();
    }

    #[test]
    fn malformed_table_fails_before_any_phase() {
        let mut config = GenConfig::base();
        config.banking.account_types = table(&[("checking", 0.5), ("savings", 0.3)]);
        assert!(matches!(config.validate(), Err(GenError::Distribution { .. })));
    }

    #[test]
    fn table_label_without_parameters_is_rejected() {
        let mut config = GenConfig::base();
        config.lending.params.remove("auto");
        assert!(matches!(config.validate(), Err(GenError::Config(_))));
    }

    #[test]
    fn json_overlay_keeps_unmentioned_fields() {
        let overlay = r#"{ "seed": 7, "scale": { "factor": 0.5 }, "banking": { "participation": 0.5 } }"#;
        let config: GenConfig = serde_json::from_str(overlay).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.scale.factor, 0.5);
        assert_eq!(config.scale.entities.len(), 7);
        assert_eq!(config.banking.participation, 0.5);
        assert_eq!(config.banking.second_account_ratio, 0.25);
        assert_eq!(config.lending.params.len(), 5);
        config.validate().unwrap();
    }

    #[test]
    fn load_names_the_file_it_cannot_use() {
        let path = std::env::temp_dir().join(format!("demobank-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ \"seed\": ").unwrap();
        let err = GenConfig::load(&path).unwrap_err().to_string();
        std::fs::remove_file(&path).unwrap();
        assert!(err.starts_with("Cannot parse"), "{err}");
        assert!(err.contains("demobank-bad-"), "{err}");

        let missing = std::env::temp_dir().join("demobank-no-such-config.json");
        assert!(GenConfig::load(&missing).unwrap_err().to_string().starts_with("Cannot read"));
    }

    #[test]
    fn store_paths_share_one_directory() {
        let paths = StorePaths::in_dir("/tmp/demo");
        assert_eq!(paths.loans, PathBuf::from("/tmp/demo/loans.db"));
        assert_eq!(paths.compliance, PathBuf::from("/tmp/demo/compliance.db"));
    }
}
