use super::batch::{date, flag, opt_text, real, text, Record};
use super::schema::StoreName;
use crate::compliance_phase::{AmlCheckRecord, MonitoringRuleRecord, SarFilingRecord};
use rusqlite::types::Value;

impl Record for MonitoringRuleRecord {
    const STORE: StoreName = StoreName::Compliance;
    const TABLE: &'static str = "monitoring_rules";
    const COLUMNS: &'static [&'static str] = &["rule_id", "rule_name", "category", "threshold", "active"];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.rule_id),
            text(&self.rule_name),
            text(&self.category),
            real(self.threshold),
            flag(self.active),
        ]
    }
}

impl Record for AmlCheckRecord {
    const STORE: StoreName = StoreName::Compliance;
    const TABLE: &'static str = "aml_checks";
    const COLUMNS: &'static [&'static str] = &[
        "check_id",
        "customer_id",
        "check_type",
        "result",
        "score",
        "rule_id",
        "checked_by",
        "check_date",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.check_id),
            text(&self.customer_id),
            text(&self.check_type),
            text(&self.result),
            real(self.score),
            opt_text(self.rule_id.as_deref()),
            text(&self.checked_by),
            date(self.checked_at.date()),
        ]
    }
}

impl Record for SarFilingRecord {
    const STORE: StoreName = StoreName::Compliance;
    const TABLE: &'static str = "sar_filings";
    const COLUMNS: &'static [&'static str] = &[
        "sar_id",
        "check_id",
        "customer_id",
        "filing_date",
        "status",
        "suspicious_amount",
        "narrative",
        "filed_by",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.sar_id),
            text(&self.check_id),
            text(&self.customer_id),
            date(self.filed_at.date()),
            text(&self.status),
            real(self.suspicious_amount),
            text(&self.narrative),
            text(&self.filed_by),
        ]
    }
}
