use super::batch::{date, opt_text, real, text, timestamp, Record};
use super::schema::StoreName;
use crate::banking_phase::{AccountRecord, AccountRelationshipRecord, TransactionRecord};
use crate::customer_phase::CustomerRecord;
use rusqlite::types::Value;

impl Record for CustomerRecord {
    const STORE: StoreName = StoreName::Accounts;
    const TABLE: &'static str = "customers";
    const COLUMNS: &'static [&'static str] =
        &["customer_id", "first_name", "last_name", "date_of_birth", "email", "phone", "created_at"];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.customer_id),
            text(&self.first_name),
            text(&self.last_name),
            date(self.date_of_birth),
            text(&self.email),
            text(&self.phone),
            timestamp(self.created_at),
        ]
    }
}

impl Record for AccountRecord {
    const STORE: StoreName = StoreName::Accounts;
    const TABLE: &'static str = "accounts";
    const COLUMNS: &'static [&'static str] = &[
        "account_id",
        "account_number",
        "customer_id",
        "account_type",
        "balance",
        "currency",
        "status",
        "opened_date",
        "created_at",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.account_id),
            text(&self.account_number),
            text(&self.customer_id),
            text(&self.account_type),
            real(self.balance),
            text(&self.currency),
            text(&self.status),
            date(self.opened_date),
            timestamp(self.created_at),
        ]
    }
}

impl Record for AccountRelationshipRecord {
    const STORE: StoreName = StoreName::Accounts;
    const TABLE: &'static str = "account_relationships";
    const COLUMNS: &'static [&'static str] =
        &["account_id", "related_account_id", "relationship_type", "established_at"];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.account_id),
            text(&self.related_account_id),
            text(&self.relationship_type),
            timestamp(self.established_at),
        ]
    }
}

impl Record for TransactionRecord {
    const STORE: StoreName = StoreName::Accounts;
    const TABLE: &'static str = "transactions";
    const COLUMNS: &'static [&'static str] = &[
        "transaction_id",
        "account_id",
        "transaction_type",
        "amount",
        "balance_after",
        "counterparty_account_id",
        "processed_by",
        "description",
        "transaction_date",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            text(&self.transaction_id),
            text(&self.account_id),
            text(&self.transaction_type),
            real(self.amount),
            real(self.balance_after),
            opt_text(self.counterparty_account_id.as_deref()),
            opt_text(self.processed_by.as_deref()),
            text(&self.description),
            timestamp(self.transaction_at),
        ]
    }
}
