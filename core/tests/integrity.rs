//! A full run at test scale: every cross-store reference resolves and
//! every occurrence date respects its upstream date and "now".

use chrono::{NaiveDate, NaiveDateTime};
use demobank_core::{GenConfig, Orchestrator, RunReport, StoreName, StoreSet};
use std::collections::{HashMap, HashSet};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(12, 0, 0).unwrap()
}

fn seeded() -> (RunReport, StoreSet) {
    let mut orch = Orchestrator::new(GenConfig::default_test(), StoreSet::in_memory().unwrap())
        .unwrap()
        .with_now(now());
    let report = orch.run().unwrap();
    assert!(report.is_completed(), "run aborted: {:?}", report.failed_phase());
    (report, orch.into_sink())
}

fn ids(stores: &StoreSet, store: StoreName, table: &str, column: &str) -> HashSet<String> {
    stores.store(store).column_values(table, column).unwrap().into_iter().collect()
}

fn scalar(stores: &StoreSet, store: StoreName, sql: &str) -> i64 {
    stores.store(store).connection().query_row(sql, [], |r| r.get(0)).unwrap()
}

fn assert_subset(child: &HashSet<String>, parent: &HashSet<String>, what: &str) {
    let dangling: Vec<_> = child.difference(parent).take(3).collect();
    assert!(dangling.is_empty(), "{what}: dangling references {dangling:?}");
}

#[test]
fn every_foreign_key_resolves_across_stores() {
    let (report, stores) = seeded();
    use StoreName::*;

    let employees = ids(&stores, Employees, "employees", "employee_id");
    let customers = ids(&stores, Accounts, "customers", "customer_id");
    let accounts = ids(&stores, Accounts, "accounts", "account_id");
    assert_eq!(employees.len(), 15);
    assert_eq!(customers.len(), 60);
    assert_eq!(report.stats.customers, 60);

    assert_eq!(ids(&stores, Customer, "customer_profiles", "customer_id"), customers);
    assert_subset(&ids(&stores, Customer, "customer_profiles", "assigned_agent_id"), &employees, "profile agent");
    assert_subset(&ids(&stores, Customer, "interactions", "employee_id"), &employees, "interaction employee");
    assert_subset(&ids(&stores, Accounts, "accounts", "customer_id"), &customers, "account holder");
    assert_subset(&ids(&stores, Accounts, "transactions", "processed_by"), &employees, "transaction clerk");

    assert_subset(&ids(&stores, Loans, "loan_applications", "customer_id"), &customers, "applicant");
    assert_subset(&ids(&stores, Loans, "loan_applications", "officer_id"), &employees, "loan officer");
    assert_subset(&ids(&stores, Loans, "loans", "linked_account_id"), &accounts, "linked account");
    assert_subset(&ids(&stores, Loans, "loans", "approved_by"), &employees, "approver");
    assert_subset(&ids(&stores, Loans, "risk_assessments", "assessed_by"), &employees, "assessor");

    assert_subset(&ids(&stores, Insurance, "policies", "customer_id"), &customers, "policy holder");
    assert_subset(&ids(&stores, Insurance, "policies", "agent_id"), &employees, "agent");

    assert_eq!(ids(&stores, Compliance, "aml_checks", "customer_id"), customers);
    assert_eq!(stores.count(Compliance, "aml_checks").unwrap(), 60);
    assert_subset(&ids(&stores, Compliance, "aml_checks", "checked_by"), &employees, "checker");
    assert_subset(&ids(&stores, Compliance, "sar_filings", "filed_by"), &employees, "filer");
}

#[test]
fn approved_applications_and_loans_pair_up() {
    let (_, stores) = seeded();
    let approved = scalar(&stores, StoreName::Loans, "SELECT COUNT(*) FROM loan_applications WHERE status = 'approved'");
    assert_eq!(stores.count(StoreName::Loans, "loans").unwrap() as i64, approved);
    let mismatched = scalar(
        &stores,
        StoreName::Loans,
        "SELECT COUNT(*) FROM loans l JOIN loan_applications a USING (application_id)
         WHERE l.customer_id <> a.customer_id OR l.loan_type <> a.loan_type
            OR l.principal_amount <> a.approved_amount",
    );
    assert_eq!(mismatched, 0);

    // A linked account belongs to the borrower.
    let holder: HashMap<String, String> = {
        let conn = stores.store(StoreName::Accounts).connection();
        let mut stmt = conn.prepare("SELECT account_id, customer_id FROM accounts").unwrap();
        let pairs: HashMap<String, String> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        pairs
    };
    let conn = stores.store(StoreName::Loans).connection();
    let mut stmt = conn
        .prepare("SELECT linked_account_id, customer_id FROM loans WHERE linked_account_id IS NOT NULL")
        .unwrap();
    let links: Vec<(String, String)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    for (account, customer) in links {
        assert_eq!(holder[&account], customer);
    }
}

#[test]
fn occurrence_dates_follow_their_upstream_and_never_pass_now() {
    let (_, stores) = seeded();
    let now_ts = now().format("%Y-%m-%d %H:%M:%S").to_string();
    let today = now().date().format("%Y-%m-%d").to_string();
    use StoreName::*;

    let checks: &[(StoreName, String)] = &[
        (Employees, format!("SELECT COUNT(*) FROM employees WHERE hire_date > '{today}'")),
        (Employees, "SELECT COUNT(*) FROM employees WHERE termination_date < hire_date".into()),
        (Accounts, "SELECT COUNT(*) FROM accounts a JOIN customers c USING (customer_id) WHERE a.created_at < c.created_at".into()),
        (Accounts, "SELECT COUNT(*) FROM transactions t JOIN accounts a USING (account_id) WHERE t.transaction_date <= a.created_at".into()),
        (Accounts, format!("SELECT COUNT(*) FROM transactions WHERE transaction_date > '{now_ts}'")),
        (Customer, "SELECT COUNT(*) FROM interactions i JOIN customer_profiles p USING (customer_id) WHERE i.interaction_date < p.created_at".into()),
        (Customer, "SELECT COUNT(*) FROM interactions i JOIN campaigns c USING (campaign_id) WHERE substr(i.interaction_date, 1, 10) < c.start_date".into()),
        (Customer, "SELECT COUNT(*) FROM interactions i JOIN campaigns c USING (campaign_id) WHERE substr(i.interaction_date, 1, 10) > c.end_date".into()),
        (Loans, "SELECT COUNT(*) FROM loans l JOIN loan_applications a USING (application_id) WHERE l.disbursement_date < a.application_date".into()),
        (Loans, format!("SELECT COUNT(*) FROM loans WHERE disbursement_date > '{today}'")),
        (Loans, format!("SELECT COUNT(*) FROM repayment_schedules WHERE payment_date > '{today}'")),
        (Insurance, "SELECT COUNT(*) FROM claims c JOIN policies p USING (policy_id) WHERE c.claim_date < p.start_date".into()),
        (Insurance, format!("SELECT COUNT(*) FROM claims WHERE claim_date > '{today}'")),
        (Compliance, "SELECT COUNT(*) FROM sar_filings s JOIN aml_checks c USING (check_id) WHERE s.filing_date < c.check_date".into()),
        (Compliance, format!("SELECT COUNT(*) FROM aml_checks WHERE check_date > '{today}'")),
    ];
    for (store, sql) in checks {
        assert_eq!(scalar(&stores, *store, sql), 0, "violations in {store}: {sql}");
    }

    // Applications come after the applicant exists (two stores apart).
    let created: HashMap<String, String> = {
        let conn = stores.store(Accounts).connection();
        let mut stmt = conn.prepare("SELECT customer_id, substr(created_at, 1, 10) FROM customers").unwrap();
        let rows: HashMap<String, String> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        rows
    };
    let conn = stores.store(Loans).connection();
    let mut stmt = conn.prepare("SELECT customer_id, application_date FROM loan_applications").unwrap();
    let applications: Vec<(String, String)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    for (customer, applied) in applications {
        assert!(applied >= created[&customer], "{customer} applied {applied} before {}", created[&customer]);
    }
}

#[test]
fn stored_balance_is_the_last_running_balance() {
    let (_, stores) = seeded();
    let drift = scalar(
        &stores,
        StoreName::Accounts,
        "SELECT COUNT(*) FROM accounts a
         WHERE a.balance <> (SELECT t.balance_after FROM transactions t
                             WHERE t.account_id = a.account_id
                             ORDER BY t.transaction_date DESC LIMIT 1)",
    );
    assert_eq!(drift, 0);
    let overdrawn = scalar(&stores, StoreName::Accounts, "SELECT COUNT(*) FROM transactions WHERE balance_after < 0");
    assert_eq!(overdrawn, 0);
}

#[test]
fn report_lists_every_table() {
    let (report, _) = seeded();
    assert_eq!(report.phases.len(), 7);
    assert_eq!(report.table_counts.len(), 21);
    let inserted: usize = report.phases.iter().map(|p| p.rows()).sum();
    let counted: u64 = report.table_counts.iter().map(|t| t.rows).sum();
    assert_eq!(inserted as u64, counted);
}
