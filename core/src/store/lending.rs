use super::batch::{date, flag, int, opt_date, opt_real, opt_text, real, text, Record};
use super::schema::StoreName;
use crate::lending_phase::{
    CollateralRecord, GuarantorRecord, LoanApplicationRecord, LoanRecord, RepaymentRecord,
    RiskAssessmentRecord,
};
use rusqlite::types::Value;

impl Record for LoanApplicationRecord {
    const STORE: StoreName = StoreName::Loans;
    const TABLE: &'static str = "loan_applications";
    const COLUMNS: &'static [&'static str] = &[
        "application_id",
        "customer_id",
        "loan_type",
        "requested_amount",
        "application_date",
        "status",
        "officer_id",
        "decision_date",
        "approved_amount",
        "rejection_reason",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.application_id),
            text(&self.customer_id),
            text(&self.loan_type),
            real(self.requested_amount),
            date(self.applied_at.date()),
            text(&self.status),
            text(&self.officer_id),
            opt_date(self.decided_at.map(|t| t.date())),
            opt_real(self.approved_amount),
            opt_text(self.rejection_reason.as_deref()),
        ]
    }
}

impl Record for LoanRecord {
    const STORE: StoreName = StoreName::Loans;
    const TABLE: &'static str = "loans";
    const COLUMNS: &'static [&'static str] = &[
        "loan_id",
        "application_id",
        "loan_number",
        "customer_id",
        "linked_account_id",
        "loan_type",
        "principal_amount",
        "interest_rate",
        "term_months",
        "disbursement_date",
        "maturity_date",
        "loan_status",
        "outstanding_balance",
        "default_status",
        "approved_by",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.loan_id),
            text(&self.application_id),
            text(&self.loan_number),
            text(&self.customer_id),
            opt_text(self.linked_account_id.as_deref()),
            text(&self.loan_type),
            real(self.principal_amount),
            real(self.interest_rate),
            int(self.term_months),
            date(self.disbursed_at.date()),
            date(self.maturity_date),
            text(&self.loan_status),
            real(self.outstanding_balance),
            flag(self.default_status),
            text(&self.approved_by),
        ]
    }
}

impl Record for CollateralRecord {
    const STORE: StoreName = StoreName::Loans;
    const TABLE: &'static str = "collateral";
    const COLUMNS: &'static [&'static str] = &[
        "collateral_id",
        "loan_id",
        "collateral_type",
        "description",
        "appraised_value",
        "appraisal_date",
        "ltv_ratio",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.collateral_id),
            text(&self.loan_id),
            text(&self.collateral_type),
            text(&self.description),
            real(self.appraised_value),
            date(self.appraisal_date),
            real(self.ltv_ratio),
        ]
    }
}

impl Record for RepaymentRecord {
    const STORE: StoreName = StoreName::Loans;
    const TABLE: &'static str = "repayment_schedules";
    const COLUMNS: &'static [&'static str] = &[
        "loan_id",
        "installment_number",
        "due_date",
        "principal_amount",
        "interest_amount",
        "total_amount",
        "payment_date",
        "payment_status",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.loan_id),
            int(self.installment_number),
            date(self.due_date),
            real(self.principal_amount),
            real(self.interest_amount),
            real(self.total_amount),
            opt_date(self.payment_date),
            text(&self.payment_status),
        ]
    }
}

// guarantor_id is assigned by SQLite.
impl Record for GuarantorRecord {
    const STORE: StoreName = StoreName::Loans;
    const TABLE: &'static str = "loan_guarantors";
    const COLUMNS: &'static [&'static str] =
        &["loan_id", "guarantor_name", "relationship", "contact_info", "guarantee_amount"];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.loan_id),
            text(&self.guarantor_name),
            text(&self.relationship),
            text(&self.contact_info),
            real(self.guarantee_amount),
        ]
    }
}

impl Record for RiskAssessmentRecord {
    const STORE: StoreName = StoreName::Loans;
    const TABLE: &'static str = "risk_assessments";
    const COLUMNS: &'static [&'static str] = &[
        "loan_id",
        "application_id",
        "assessment_date",
        "risk_score",
        "pd_probability",
        "credit_grade",
        "assessed_by",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            opt_text(self.loan_id.as_deref()),
            opt_text(self.application_id.as_deref()),
            date(self.assessment_date),
            int(self.risk_score),
            real(self.pd_probability),
            text(&self.credit_grade),
            text(&self.assessed_by),
        ]
    }
}
