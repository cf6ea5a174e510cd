use super::batch::{date, opt_text, real, text, timestamp, Record};
use super::schema::StoreName;
use crate::customer_phase::CustomerProfileRecord;
use crate::engagement_phase::{CampaignRecord, InteractionRecord};
use rusqlite::types::Value;

impl Record for CustomerProfileRecord {
    const STORE: StoreName = StoreName::Customer;
    const TABLE: &'static str = "customer_profiles";
    const COLUMNS: &'static [&'static str] = &[
        "customer_id",
        "full_name",
        "email",
        "phone",
        "address",
        "city",
        "country",
        "customer_segment",
        "customer_status",
        "onboarding_date",
        "assigned_agent_id",
        "kyc_status",
        "risk_rating",
        "created_at",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.customer_id),
            text(&self.full_name),
            text(&self.email),
            text(&self.phone),
            text(&self.address),
            text(&self.city),
            text(&self.country),
            text(&self.customer_segment),
            text(&self.customer_status),
            date(self.onboarding_date),
            opt_text(self.assigned_agent_id.as_deref()),
            text(&self.kyc_status),
            text(&self.risk_rating),
            timestamp(self.created_at),
        ]
    }
}

impl Record for CampaignRecord {
    const STORE: StoreName = StoreName::Customer;
    const TABLE: &'static str = "campaigns";
    const COLUMNS: &'static [&'static str] =
        &["campaign_id", "campaign_name", "campaign_type", "channel", "start_date", "end_date", "budget"];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.campaign_id),
            text(&self.campaign_name),
            text(&self.campaign_type),
            text(&self.channel),
            date(self.start_date),
            date(self.end_date),
            real(self.budget),
        ]
    }
}

impl Record for InteractionRecord {
    const STORE: StoreName = StoreName::Customer;
    const TABLE: &'static str = "interactions";
    const COLUMNS: &'static [&'static str] = &[
        "interaction_id",
        "customer_id",
        "employee_id",
        "campaign_id",
        "channel",
        "topic",
        "outcome",
        "interaction_date",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.interaction_id),
            text(&self.customer_id),
            text(&self.employee_id),
            opt_text(self.campaign_id.as_deref()),
            text(&self.channel),
            text(&self.topic),
            text(&self.outcome),
            timestamp(self.interaction_at),
        ]
    }
}
