//! The orchestrator: the only place a run is sequenced, retried or aborted.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. workforce         departments, employees, training programs
//!   2. customer_master   customers (accounts store) + CRM profiles
//!   3. banking           accounts, relationships, transactions
//!   4. engagement        campaigns, interactions
//!   5. lending           applications, loans and their servicing records
//!   6. insurance         policies, claims
//!   7. compliance        monitoring rules, AML checks, SAR filings
//!
//! RULES:
//!   - Phases run strictly one after another.
//!   - A phase's identifiers enter the registry only after its writes commit.
//!   - Only the orchestrator retries. Generators and stores never do.
//!   - A failed attempt leaves nothing behind: its writes roll back and
//!     the ledger values it issued are forgotten.

use crate::{
    banking_phase::BankingPhase,
    compliance_phase::CompliancePhase,
    config::{entity, GenConfig},
    customer_phase::CustomerMasterPhase,
    engagement_phase::EngagementPhase,
    error::{GenError, GenResult},
    insurance_phase::InsurancePhase,
    lending_phase::LendingPhase,
    phase::{Phase, PhaseContext},
    registry::{IdentifierRegistry, RegistryStats},
    rng::RngBank,
    scale::ResolvedCounts,
    store::{RecordSink, TableCount},
    types::{EntityKind, RunId},
    unique::UniquenessLedger,
    workforce_phase::WorkforcePhase,
};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    Pending,
    Running,
    Succeeded,
    FailedRetryable,
    FailedFatal,
}

/// Why one attempt of a phase failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseFailure {
    pub attempt: u32,
    pub kind: &'static str,
    /// Domain, constraint or entity the error names.
    pub subject: Option<String>,
    pub message: String,
    /// Ledger domains unwound after the attempt.
    pub reset_domains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseResult {
    pub phase: &'static str,
    pub state: PhaseState,
    pub attempts: u32,
    /// Rows committed per `store.table`. Empty unless succeeded.
    pub inserted: BTreeMap<String, usize>,
    pub failures: Vec<PhaseFailure>,
}

impl PhaseResult {
    fn pending(phase: &'static str) -> Self {
        Self {
            phase,
            state: PhaseState::Pending,
            attempts: 0,
            inserted: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.inserted.values().sum()
    }

    pub fn last_failure(&self) -> Option<&PhaseFailure> {
        self.failures.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Aborted,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub seed: u64,
    pub scale: f64,
    pub now: NaiveDateTime,
    pub status: RunStatus,
    pub phases: Vec<PhaseResult>,
    pub table_counts: Vec<TableCount>,
    pub stats: RegistryStats,
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// The phase that aborted the run, if any.
    pub fn failed_phase(&self) -> Option<&PhaseResult> {
        self.phases.iter().find(|p| p.state == PhaseState::FailedFatal)
    }

    pub fn phase(&self, name: &str) -> Option<&PhaseResult> {
        self.phases.iter().find(|p| p.phase == name)
    }
}

/// The seven phases, in execution order.
pub fn standard_phases() -> Vec<Box<dyn Phase>> {
    vec![
        Box::new(WorkforcePhase),
        Box::new(CustomerMasterPhase),
        Box::new(BankingPhase),
        Box::new(EngagementPhase),
        Box::new(LendingPhase),
        Box::new(InsurancePhase),
        Box::new(CompliancePhase),
    ]
}

/// Every kind a phase reads must be produced by it or an earlier phase.
fn check_order(phases: &[Box<dyn Phase>]) -> GenResult<()> {
    let mut produced: BTreeSet<EntityKind> = BTreeSet::new();
    let mut names = BTreeSet::new();
    for phase in phases {
        if !names.insert(phase.name()) {
            return Err(GenError::Config(format!("phase '{}' registered twice", phase.name())));
        }
        produced.extend(phase.produces().iter().copied());
        if let Some(kind) = phase.reads().iter().find(|k| !produced.contains(k)) {
            return Err(GenError::Config(format!(
                "phase '{}' reads {kind} before any phase produces it",
                phase.name()
            )));
        }
    }
    Ok(())
}

/// Scale entity that sizes the population of `kind`, for kinds sized
/// directly by the scale table.
fn sizing_entity(kind: EntityKind) -> Option<&'static str> {
    match kind {
        EntityKind::Department => Some(entity::DEPARTMENTS),
        EntityKind::Employee => Some(entity::EMPLOYEES),
        EntityKind::TrainingProgram => Some(entity::TRAINING_PROGRAMS),
        EntityKind::Customer => Some(entity::CUSTOMERS),
        EntityKind::Campaign => Some(entity::CAMPAIGNS),
        EntityKind::MonitoringRule => Some(entity::MONITORING_RULES),
        _ => None,
    }
}

/// A kind some phase draws foreign keys from must resolve to at least
/// one entity, so an undersized run is refused before anything is written.
fn check_populations(phases: &[Box<dyn Phase>], counts: &ResolvedCounts) -> GenResult<()> {
    for phase in phases {
        for &kind in phase.reads() {
            let Some(name) = sizing_entity(kind) else { continue };
            if counts.get(name)? == 0 {
                return Err(GenError::Config(format!(
                    "phase '{}' reads {kind} but '{name}' resolves to 0 at this scale",
                    phase.name()
                )));
            }
        }
    }
    Ok(())
}

pub struct Orchestrator<S: RecordSink> {
    run_id: RunId,
    config: GenConfig,
    counts: ResolvedCounts,
    sink: S,
    phases: Vec<Box<dyn Phase>>,
    registry: IdentifierRegistry,
    ledger: UniquenessLedger,
    rng_bank: RngBank,
    now: NaiveDateTime,
}

impl<S: RecordSink> Orchestrator<S> {
    /// Validates `config` and wires the standard phases.
    /// Configuration errors surface here, before any phase runs.
    pub fn new(config: GenConfig, sink: S) -> GenResult<Self> {
        config.validate()?;
        let counts = config.scale.resolve()?;
        let phases = standard_phases();
        check_order(&phases)?;
        check_populations(&phases, &counts)?;
        Ok(Self {
            run_id: Uuid::new_v4().to_string(),
            rng_bank: RngBank::new(config.seed),
            ledger: UniquenessLedger::new(config.unique_attempt_multiplier),
            registry: IdentifierRegistry::new(),
            now: chrono::Local::now().naive_local(),
            counts,
            config,
            sink,
            phases,
        })
    }

    /// Replace the phase list. The order is validated again.
    pub fn with_phases(mut self, phases: Vec<Box<dyn Phase>>) -> GenResult<Self> {
        check_order(&phases)?;
        check_populations(&phases, &self.counts)?;
        self.phases = phases;
        Ok(self)
    }

    /// Pin "now" so runs are reproducible.
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    /// Execute every phase in order. Stops at the first fatal phase;
    /// phases committed before it stay committed.
    pub fn run(&mut self) -> GenResult<RunReport> {
        log::info!(
            "run {}: seed {} scale {} ({} phases)",
            self.run_id,
            self.config.seed,
            self.config.scale.factor,
            self.phases.len()
        );
        let mut results: Vec<PhaseResult> = self.phases.iter().map(|p| PhaseResult::pending(p.name())).collect();
        let mut status = RunStatus::Completed;

        for (index, slot) in results.iter_mut().enumerate() {
            *slot = self.run_phase(index);
            if slot.state == PhaseState::FailedFatal {
                status = RunStatus::Aborted;
                log::error!(
                    "run {}: aborted in phase {} after {} attempt(s)",
                    self.run_id,
                    slot.phase,
                    slot.attempts
                );
                break;
            }
        }

        if status == RunStatus::Completed {
            log::info!("run {}: completed", self.run_id);
        }
        Ok(RunReport {
            run_id: self.run_id.clone(),
            seed: self.config.seed,
            scale: self.config.scale.factor,
            now: self.now,
            status,
            phases: results,
            table_counts: self.sink.table_counts()?,
            stats: self.registry.stats(),
        })
    }

    /// PENDING → RUNNING → {SUCCEEDED, FAILED_RETRYABLE → RUNNING, FAILED_FATAL}.
    fn run_phase(&mut self, index: usize) -> PhaseResult {
        let phase = &*self.phases[index];
        let budget = self.config.retry_budget;
        let mut result = PhaseResult::pending(phase.name());

        for attempt in 1..=budget {
            result.state = PhaseState::Running;
            result.attempts = attempt;
            log::info!("phase {}: attempt {attempt}/{budget}", phase.name());

            let mark = self.ledger.checkpoint();
            let outcome = attempt_phase(
                phase,
                attempt,
                &self.config,
                &self.counts,
                self.now,
                &self.rng_bank,
                &self.registry,
                &mut self.ledger,
                &mut self.sink,
            )
            .and_then(|(inserted, staged)| {
                let registered = self.registry.absorb(staged)?;
                Ok((inserted, registered))
            });

            match outcome {
                Ok((inserted, registered)) => {
                    log::info!(
                        "phase {}: succeeded, {} rows, {registered} identifiers",
                        phase.name(),
                        inserted.values().sum::<usize>()
                    );
                    result.state = PhaseState::Succeeded;
                    result.inserted = inserted;
                    return result;
                }
                Err(err) => {
                    let reset_domains = self.ledger.rollback_to(&mark);
                    result.failures.push(PhaseFailure {
                        attempt,
                        kind: err.kind(),
                        subject: err.subject(),
                        message: err.to_string(),
                        reset_domains,
                    });
                    if err.is_retryable() && attempt < budget {
                        result.state = PhaseState::FailedRetryable;
                        log::warn!("phase {}: attempt {attempt} failed, retrying: {err}", phase.name());
                        continue;
                    }
                    result.state = PhaseState::FailedFatal;
                    log::error!("phase {}: attempt {attempt} failed: {err}", phase.name());
                    return result;
                }
            }
        }
        result
    }

    /// Truncate every store and forget everything generated so far.
    pub fn clear(&mut self) -> GenResult<()> {
        self.sink.clear()?;
        self.registry.clear();
        self.ledger.clear();
        log::info!("run {}: stores cleared, registry and ledger reset", self.run_id);
        Ok(())
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn config(&self) -> &GenConfig {
        &self.config
    }

    pub fn counts(&self) -> &ResolvedCounts {
        &self.counts
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn phase_names(&self) -> Vec<&'static str> {
        self.phases.iter().map(|p| p.name()).collect()
    }

    pub fn registry(&self) -> &IdentifierRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &UniquenessLedger {
        &self.ledger
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

/// One attempt: synthesise, then write. Returns rows inserted and the
/// identifiers staged for the registry.
#[allow(clippy::too_many_arguments)]
fn attempt_phase<S: RecordSink>(
    phase: &dyn Phase,
    attempt: u32,
    config: &GenConfig,
    counts: &ResolvedCounts,
    now: NaiveDateTime,
    rng_bank: &RngBank,
    registry: &IdentifierRegistry,
    ledger: &mut UniquenessLedger,
    sink: &mut S,
) -> GenResult<(BTreeMap<String, usize>, IdentifierRegistry)> {
    let rng = rng_bank.for_phase(phase.slot(), attempt);
    let mut ctx = PhaseContext::new(config, counts, now, attempt, rng, registry, ledger);
    let output = phase.generate(&mut ctx)?;
    let staged = ctx.into_staged();
    log::debug!("phase {}: {} rows staged", phase.name(), output.total_rows());
    let inserted = sink.write_phase(phase.name(), &output, config.batch_size)?;
    Ok((inserted, staged))
}
