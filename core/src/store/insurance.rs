use super::batch::{date, opt_real, real, text, Record};
use super::schema::StoreName;
use crate::insurance_phase::{ClaimRecord, PolicyRecord};
use rusqlite::types::Value;

impl Record for PolicyRecord {
    const STORE: StoreName = StoreName::Insurance;
    const TABLE: &'static str = "policies";
    const COLUMNS: &'static [&'static str] = &[
        "policy_id",
        "policy_number",
        "customer_id",
        "agent_id",
        "policy_type",
        "status",
        "coverage_amount",
        "annual_premium",
        "start_date",
        "end_date",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.policy_id),
            text(&self.policy_number),
            text(&self.customer_id),
            text(&self.agent_id),
            text(&self.policy_type),
            text(&self.status),
            real(self.coverage_amount),
            real(self.annual_premium),
            date(self.started_at.date()),
            date(self.end_date),
        ]
    }
}

impl Record for ClaimRecord {
    const STORE: StoreName = StoreName::Insurance;
    const TABLE: &'static str = "claims";
    const COLUMNS: &'static [&'static str] = &[
        "claim_id",
        "policy_id",
        "claim_type",
        "claim_amount",
        "claim_date",
        "status",
        "settled_amount",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.claim_id),
            text(&self.policy_id),
            text(&self.claim_type),
            real(self.claim_amount),
            date(self.claimed_at.date()),
            text(&self.status),
            opt_real(self.settled_amount),
        ]
    }
}
