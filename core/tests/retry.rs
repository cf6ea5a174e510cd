//! Retry-with-rollback: failed attempts leave nothing behind.

use chrono::{NaiveDate, NaiveDateTime};
use demobank_core::{
    compliance_phase::MonitoringRuleRecord,
    phase::PhaseOutput,
    store::{RecordSink, TableCount},
    workforce_phase::DepartmentRecord,
    GenConfig, GenError, GenResult, Orchestrator, PhaseState, RunStatus, StoreName, StoreSet,
};
use std::collections::{BTreeMap, HashSet};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(12, 0, 0).unwrap()
}

enum Fault {
    /// Re-append the phase's first table so the store rejects it.
    DuplicateRows,
    /// A non-retryable failure before anything is written.
    Broken,
}

/// Sink that sabotages the first `failures` writes of one phase.
struct FlakySink {
    inner: StoreSet,
    phase: &'static str,
    failures: u32,
    fault: Fault,
}

impl FlakySink {
    fn new(phase: &'static str, failures: u32, fault: Fault) -> Self {
        Self {
            inner: StoreSet::in_memory().unwrap(),
            phase,
            failures,
            fault,
        }
    }
}

impl RecordSink for FlakySink {
    fn write_phase(
        &mut self,
        phase: &str,
        output: &PhaseOutput,
        batch_size: usize,
    ) -> GenResult<BTreeMap<String, usize>> {
        if phase != self.phase || self.failures == 0 {
            return self.inner.write_phase(phase, output, batch_size);
        }
        self.failures -= 1;
        match self.fault {
            Fault::DuplicateRows => {
                let mut poisoned = PhaseOutput::new();
                for batch in output.batches() {
                    poisoned.push_batch(batch.clone());
                }
                poisoned.push_batch(output.batches()[0].clone());
                self.inner.write_phase(phase, &poisoned, batch_size)
            }
            Fault::Broken => Err(GenError::Config("store offline".into())),
        }
    }

    fn clear(&mut self) -> GenResult<()> {
        self.inner.clear()
    }

    fn table_counts(&self) -> GenResult<Vec<TableCount>> {
        self.inner.table_counts()
    }
}

fn orchestrator(sink: FlakySink) -> Orchestrator<FlakySink> {
    Orchestrator::new(GenConfig::default_test(), sink).unwrap().with_now(now())
}

#[test]
fn third_attempt_commits_exactly_one_set_of_records() {
    // customer_master writes to two stores; the duplicate hits the first
    // after the second has already received its rows.
    let mut orch = orchestrator(FlakySink::new("customer_master", 2, Fault::DuplicateRows));
    let report = orch.run().unwrap();
    assert!(report.is_completed());

    let phase = report.phase("customer_master").unwrap();
    assert_eq!(phase.state, PhaseState::Succeeded);
    assert_eq!(phase.attempts, 3);
    assert_eq!(phase.failures.len(), 2);
    for failure in &phase.failures {
        assert_eq!(failure.kind, "constraint_violation");
        assert!(failure.reset_domains.contains(&"email".to_string()));
    }

    let stores = &orch.sink().inner;
    assert_eq!(stores.count(StoreName::Accounts, "customers").unwrap(), 60);
    assert_eq!(stores.count(StoreName::Customer, "customer_profiles").unwrap(), 60);

    // Emails issued by attempts 1 and 2 are gone from the ledger.
    let mut stored: HashSet<String> = HashSet::new();
    stored.extend(stores.store(StoreName::Employees).column_values("employees", "email").unwrap());
    stored.extend(stores.store(StoreName::Accounts).column_values("customers", "email").unwrap());
    let issued: HashSet<String> = orch.ledger().values("email").iter().cloned().collect();
    assert_eq!(orch.ledger().issued_count("email"), 15 + 60);
    assert_eq!(issued, stored);
}

#[test]
fn exhausted_budget_aborts_and_keeps_earlier_phases() {
    let mut orch = orchestrator(FlakySink::new("banking", 99, Fault::DuplicateRows));
    let report = orch.run().unwrap();
    assert_eq!(report.status, RunStatus::Aborted);

    let failed = report.failed_phase().unwrap();
    assert_eq!(failed.phase, "banking");
    assert_eq!(failed.attempts, 3);
    assert_eq!(failed.last_failure().unwrap().subject.as_deref(), Some("accounts.accounts"));

    for later in ["engagement", "lending", "insurance", "compliance"] {
        assert_eq!(report.phase(later).unwrap().state, PhaseState::Pending);
    }
    let stores = &orch.sink().inner;
    assert_eq!(stores.count(StoreName::Employees, "employees").unwrap(), 15);
    assert_eq!(stores.count(StoreName::Accounts, "customers").unwrap(), 60);
    assert_eq!(stores.count(StoreName::Accounts, "accounts").unwrap(), 0);
    assert_eq!(stores.count(StoreName::Accounts, "transactions").unwrap(), 0);
    assert_eq!(report.stats.accounts, 0);
    assert_eq!(orch.ledger().issued_count("account_number"), 0);
}

#[test]
fn non_retryable_failure_is_fatal_on_first_attempt() {
    let mut orch = orchestrator(FlakySink::new("workforce", 1, Fault::Broken));
    let report = orch.run().unwrap();
    let failed = report.failed_phase().unwrap();
    assert_eq!(failed.phase, "workforce");
    assert_eq!(failed.attempts, 1);
    assert_eq!(failed.last_failure().unwrap().kind, "config");
    assert!(orch.registry().is_empty());
}

#[test]
fn failed_write_rolls_back_every_store_it_touched() {
    let mut stores = StoreSet::in_memory().unwrap();
    let department = DepartmentRecord {
        department_id: "DEPT-1".into(),
        code: "OPS".into(),
        department_name: "Operations".into(),
        department_head_id: None,
        budget: 1_000_000.0,
    };
    let rule = |name: &str| MonitoringRuleRecord {
        rule_id: "RULE-1".into(),
        rule_name: name.into(),
        category: "structuring".into(),
        threshold: 10_000.0,
        active: true,
    };

    let mut output = PhaseOutput::new();
    output.push(&[department]);
    output.push(&[rule("Cash structuring"), rule("Rapid movement")]);

    let err = stores.write_phase("test", &output, 1).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(stores.count(StoreName::Employees, "departments").unwrap(), 0);
    assert_eq!(stores.count(StoreName::Compliance, "monitoring_rules").unwrap(), 0);
}
