//! Lending: applications, loans and everything hanging off a loan.
//!
//! RULE: every approved application becomes exactly one loan for the
//! same customer and loan type, with principal = approved amount.
//! Pending, rejected and withdrawn applications never produce a loan.
//!
//! Occurrence dates chain: customer created ≤ applied ≤ decided ≤
//! disbursed ≤ now. Maturity and instalment due dates are contractual
//! and may lie in the future; payment dates never do.

use crate::{
    config::{GenConfig, LendingConfig, LoanParams},
    distribution::{between, clamp_chronology, offset_after, participants, repeaters, round2, round4},
    error::{GenError, GenResult},
    name_generator::NameGenerator,
    phase::{pick_id_or, pool, pool_ids, Phase, PhaseContext, PhaseOutput},
    registry::{tags, TagFilter, CUSTOMER, ROLE, STATUS, TYPE},
    rng::{GenRng, PhaseSlot},
    types::{EntityId, EntityKind},
};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;

/// Days per instalment period.
pub const PERIOD_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct LoanApplicationRecord {
    pub application_id: EntityId,
    pub customer_id: EntityId,
    pub loan_type: String,
    pub requested_amount: f64,
    pub applied_at: NaiveDateTime,
    pub status: String,
    pub officer_id: EntityId,
    pub decided_at: Option<NaiveDateTime>,
    pub approved_amount: Option<f64>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoanRecord {
    pub loan_id: EntityId,
    pub application_id: EntityId,
    pub loan_number: String,
    pub customer_id: EntityId,
    pub linked_account_id: Option<EntityId>,
    pub loan_type: String,
    pub principal_amount: f64,
    pub interest_rate: f64,
    pub term_months: i64,
    pub disbursed_at: NaiveDateTime,
    pub maturity_date: NaiveDate,
    pub loan_status: String,
    pub outstanding_balance: f64,
    pub default_status: bool,
    pub approved_by: EntityId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollateralRecord {
    pub collateral_id: String,
    pub loan_id: EntityId,
    pub collateral_type: String,
    pub description: String,
    pub appraised_value: f64,
    pub appraisal_date: NaiveDate,
    pub ltv_ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepaymentRecord {
    pub loan_id: EntityId,
    pub installment_number: i64,
    pub due_date: NaiveDate,
    pub principal_amount: f64,
    pub interest_amount: f64,
    pub total_amount: f64,
    pub payment_date: Option<NaiveDate>,
    pub payment_status: String, // paid | late | missed | pending
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuarantorRecord {
    pub loan_id: EntityId,
    pub guarantor_name: String,
    pub relationship: String,
    pub contact_info: String,
    pub guarantee_amount: f64,
}

/// Exactly one of `loan_id` / `application_id` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessmentRecord {
    pub loan_id: Option<EntityId>,
    pub application_id: Option<EntityId>,
    pub assessment_date: NaiveDate,
    pub risk_score: i64,
    pub pd_probability: f64,
    pub credit_grade: String,
    pub assessed_by: EntityId,
}

#[derive(Debug, Default)]
pub struct Lending {
    pub applications: Vec<LoanApplicationRecord>,
    pub loans: Vec<LoanRecord>,
    pub collateral: Vec<CollateralRecord>,
    pub schedules: Vec<RepaymentRecord>,
    pub guarantors: Vec<GuarantorRecord>,
    pub assessments: Vec<RiskAssessmentRecord>,
}

/// One instalment of an amortised schedule, before payment status.
#[derive(Debug, Clone, PartialEq)]
pub struct Installment {
    pub number: i64,
    pub principal: f64,
    pub interest: f64,
    pub total: f64,
}

/// Level-payment amortisation. The last instalment absorbs rounding so
/// principal portions sum to `principal`.
pub fn amortize(principal: f64, annual_rate: f64, term_months: i64) -> Vec<Installment> {
    let monthly_rate = annual_rate / 12.0;
    let payment = if monthly_rate.abs() < f64::EPSILON {
        principal / term_months as f64
    } else {
        let growth = (1.0 + monthly_rate).powi(term_months as i32);
        principal * monthly_rate * growth / (growth - 1.0)
    };

    let mut remaining = principal;
    (1..=term_months)
        .map(|number| {
            let interest = round2(remaining * monthly_rate);
            let principal_part = if number == term_months {
                round2(remaining)
            } else {
                round2(payment - interest)
            };
            remaining -= principal_part;
            Installment {
                number,
                principal: principal_part,
                interest,
                total: round2(principal_part + interest),
            }
        })
        .collect()
}

/// Balance still owed, by loan status.
fn outstanding(status: &str, principal: f64, term_months: i64, months_elapsed: i64, rng: &mut GenRng) -> f64 {
    match status {
        "paid_off" => 0.0,
        "defaulted" => round2(principal * rng.uniform(0.40, 0.90)),
        _ => {
            let progress = (months_elapsed as f64 / term_months as f64).min(1.0);
            round2(principal * (1.0 - progress * rng.uniform(0.70, 0.95)))
        }
    }
}

/// Score, probability of default and grade at application time.
fn score_application(rng: &mut GenRng) -> (i64, f64, &'static str) {
    let score = rng.range_i64(550, 850);
    let (pd, grades): ((f64, f64), &[&'static str]) = if score >= 750 {
        ((0.01, 0.05), &["AAA", "AA", "A"])
    } else if score >= 650 {
        ((0.05, 0.15), &["BBB", "BB"])
    } else {
        ((0.15, 0.35), &["B", "CCC", "CC", "C"])
    };
    (score, round4(rng.uniform(pd.0, pd.1)), *rng.pick(grades))
}

/// Periodic reassessment, driven by how the loan has performed.
fn score_loan(status: &str, rng: &mut GenRng) -> (i64, f64, &'static str) {
    let (score, pd, grades): ((i64, i64), (f64, f64), &[&'static str]) = match status {
        "defaulted" => ((300, 550), (0.50, 0.95), &["CCC", "CC", "C"]),
        "paid_off" => ((700, 850), (0.01, 0.05), &["AAA", "AA", "A"]),
        _ => ((600, 800), (0.05, 0.20), &["BBB", "BB", "B"]),
    };
    (
        rng.range_i64(score.0, score.1),
        round4(rng.uniform(pd.0, pd.1)),
        *rng.pick(grades),
    )
}

fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

pub struct LendingPhase;

struct Staff {
    officers: Vec<EntityId>,
    assessors: Vec<EntityId>,
    active: Vec<EntityId>,
}

impl LendingPhase {
    pub fn build(&self, ctx: &mut PhaseContext<'_>) -> GenResult<Lending> {
        let config: &GenConfig = ctx.config;
        let cfg = &config.lending;

        let active = TagFilter::any().with(STATUS, "active");
        let staff = Staff {
            officers: pool_ids(&ctx.registry, EntityKind::Employee, &active.clone().with(ROLE, "loan_officer")),
            assessors: pool_ids(&ctx.registry, EntityKind::Employee, &active.clone().with(ROLE, "compliance_officer")),
            active: pool_ids(&ctx.registry, EntityKind::Employee, &active),
        };
        let mut accounts_of: HashMap<EntityId, Vec<EntityId>> = HashMap::new();
        for entry in ctx.registry.matching(EntityKind::Account, &active) {
            if let Some(owner) = entry.tags.get(CUSTOMER) {
                accounts_of.entry(owner.clone()).or_default().push(entry.id.clone());
            }
        }

        let mut lending = Lending {
            applications: self.applications(ctx, cfg, &staff)?,
            ..Lending::default()
        };
        for application in &lending.applications {
            if application.status == "approved" {
                let loan = self.loan(ctx, cfg, application, &accounts_of)?;
                lending.loans.push(loan);
            }
        }
        self.collateral(ctx, cfg, &mut lending)?;
        self.schedules(ctx, &mut lending);
        self.guarantors(ctx, cfg, &mut lending)?;
        self.assessments(ctx, cfg, &staff, &mut lending)?;

        for a in &lending.applications {
            ctx.registry.register_at(
                EntityKind::LoanApplication,
                a.application_id.clone(),
                tags([(CUSTOMER, a.customer_id.as_str()), (STATUS, a.status.as_str())]),
                a.applied_at,
            )?;
        }
        for l in &lending.loans {
            ctx.registry.register_at(
                EntityKind::Loan,
                l.loan_id.clone(),
                tags([
                    (CUSTOMER, l.customer_id.as_str()),
                    (TYPE, l.loan_type.as_str()),
                    (STATUS, l.loan_status.as_str()),
                ]),
                l.disbursed_at,
            )?;
        }
        log::debug!(
            "lending: {} applications, {} loans, {} instalments",
            lending.applications.len(),
            lending.loans.len(),
            lending.schedules.len()
        );
        Ok(lending)
    }

    fn applications(
        &self,
        ctx: &mut PhaseContext<'_>,
        cfg: &LendingConfig,
        staff: &Staff,
    ) -> GenResult<Vec<LoanApplicationRecord>> {
        let now = ctx.now;
        let customers = pool(&ctx.registry, EntityKind::Customer, &TagFilter::any());
        let applicants = participants(&customers, cfg.participation, &mut ctx.rng)?;
        let twice = repeaters(&applicants, cfg.second_application_ratio, &mut ctx.rng)?;

        let mut out = Vec::with_capacity(applicants.len() + twice.len());
        for (customer_id, since) in applicants.iter().chain(twice.iter()) {
            let since = since.ok_or_else(|| {
                GenError::Config(format!("customer '{customer_id}' has no creation date"))
            })?;
            let loan_type = cfg.loan_types.sample(&mut ctx.rng);
            let params = params_for(cfg, &loan_type)?;
            let requested_amount = round2(params.amount.uniform(&mut ctx.rng));

            let from = since.max(now - Duration::days(cfg.application_window_days));
            let applied_at = between(from, cfg.application_window_days, now, &mut ctx.rng);
            let status = cfg.application_statuses.sample(&mut ctx.rng);

            let decided = matches!(status.as_str(), "approved" | "rejected");
            let decided_at = decided.then(|| {
                offset_after(applied_at, cfg.min_decision_days, cfg.max_decision_days, now, &mut ctx.rng)
            });
            let approved_amount = (status == "approved")
                .then(|| round2(requested_amount * cfg.approved_fraction.uniform(&mut ctx.rng)));
            let rejection_reason =
                (status == "rejected").then(|| ctx.rng.pick(&cfg.rejection_reasons).clone());

            out.push(LoanApplicationRecord {
                application_id: ctx.new_id(EntityKind::LoanApplication)?,
                customer_id: customer_id.clone(),
                officer_id: pick_id_or(&staff.officers, &staff.active, EntityKind::Employee, &mut ctx.rng)?,
                loan_type,
                requested_amount,
                applied_at,
                status,
                decided_at,
                approved_amount,
                rejection_reason,
            });
        }
        Ok(out)
    }

    fn loan(
        &self,
        ctx: &mut PhaseContext<'_>,
        cfg: &LendingConfig,
        application: &LoanApplicationRecord,
        accounts_of: &HashMap<EntityId, Vec<EntityId>>,
    ) -> GenResult<LoanRecord> {
        let now = ctx.now;
        let params = params_for(cfg, &application.loan_type)?;
        let (Some(decided_at), Some(principal)) = (application.decided_at, application.approved_amount) else {
            return Err(GenError::Config(format!(
                "approved application '{}' lacks a decision",
                application.application_id
            )));
        };

        let term_months = *ctx.rng.pick(&params.term_months);
        let disbursed_at = offset_after(decided_at, 0, cfg.max_disbursement_days, now, &mut ctx.rng);
        let loan_status = cfg.loan_statuses.sample(&mut ctx.rng);
        let months_elapsed = (now - disbursed_at).num_days() / PERIOD_DAYS;
        let linked_account_id = accounts_of
            .get(&application.customer_id)
            .filter(|accounts| !accounts.is_empty())
            .map(|accounts| ctx.rng.pick(accounts).clone());

        Ok(LoanRecord {
            loan_id: ctx.new_id(EntityKind::Loan)?,
            application_id: application.application_id.clone(),
            loan_number: ctx.unique("loan_number", |rng| format!("LN{}", NameGenerator::digits(rng, 10)))?,
            customer_id: application.customer_id.clone(),
            linked_account_id,
            loan_type: application.loan_type.clone(),
            principal_amount: principal,
            interest_rate: round4(params.interest.uniform(&mut ctx.rng)),
            term_months,
            disbursed_at,
            maturity_date: add_days(disbursed_at.date(), term_months * PERIOD_DAYS),
            outstanding_balance: outstanding(&loan_status, principal, term_months, months_elapsed, &mut ctx.rng),
            default_status: loan_status == "defaulted",
            loan_status,
            approved_by: application.officer_id.clone(),
        })
    }

    fn collateral(&self, ctx: &mut PhaseContext<'_>, cfg: &LendingConfig, lending: &mut Lending) -> GenResult<()> {
        let applied: HashMap<&str, NaiveDateTime> = lending
            .applications
            .iter()
            .map(|a| (a.application_id.as_str(), a.applied_at))
            .collect();
        for loan in &lending.loans {
            let params = params_for(cfg, &loan.loan_type)?;
            if params.collateral.is_empty() || !ctx.rng.chance(cfg.collateral_ratio) {
                continue;
            }
            let collateral_type = ctx.rng.pick(&params.collateral).clone();
            let appraised_value = round2(loan.principal_amount * cfg.appraisal_value_fraction.uniform(&mut ctx.rng));
            // Appraised a week to a month before disbursement, never before the application.
            let applied_at = applied.get(loan.application_id.as_str()).copied().unwrap_or(loan.disbursed_at);
            let appraised_at = clamp_chronology(
                loan.disbursed_at - Duration::days(ctx.rng.range_i64(7, 30)),
                applied_at,
                loan.disbursed_at,
            );
            let description = match collateral_type.as_str() {
                "property" => NameGenerator::street_address(&mut ctx.rng),
                "real_estate" => format!("Commercial property at {}", NameGenerator::street_address(&mut ctx.rng)),
                "vehicle" => NameGenerator::vehicle(&mut ctx.rng, ctx.now.year()),
                "equipment" => "Business equipment".to_string(),
                "inventory" => "Business inventory and stock".to_string(),
                _ => "Collateral asset".to_string(),
            };
            lending.collateral.push(CollateralRecord {
                collateral_id: ctx.new_code("COL", "collateral_id")?,
                loan_id: loan.loan_id.clone(),
                collateral_type,
                description,
                appraised_value,
                appraisal_date: appraised_at.date(),
                ltv_ratio: round4(loan.principal_amount / appraised_value),
            });
        }
        Ok(())
    }

    /// Monthly instalments. Past-due instalments get a payment status by
    /// loan status; payment dates are clamped to today.
    fn schedules(&self, ctx: &mut PhaseContext<'_>, lending: &mut Lending) {
        let today = ctx.now.date();
        for loan in &lending.loans {
            let disbursed = loan.disbursed_at.date();
            for inst in amortize(loan.principal_amount, loan.interest_rate, loan.term_months) {
                let due_date = add_days(disbursed, inst.number * PERIOD_DAYS);
                let (payment_status, offset) = if due_date >= today {
                    ("pending", None)
                } else {
                    let rng = &mut ctx.rng;
                    match loan.loan_status.as_str() {
                        "paid_off" => ("paid", Some(rng.range_i64(-5, 5))),
                        "defaulted" if rng.chance(0.50) => ("missed", None),
                        "defaulted" => ("late", Some(rng.range_i64(5, 30))),
                        _ if rng.chance(0.95) => ("paid", Some(rng.range_i64(-3, 3))),
                        _ => ("late", Some(rng.range_i64(5, 15))),
                    }
                };
                let payment_date = offset.map(|days| add_days(due_date, days).clamp(disbursed, today));
                lending.schedules.push(RepaymentRecord {
                    loan_id: loan.loan_id.clone(),
                    installment_number: inst.number,
                    due_date,
                    principal_amount: inst.principal,
                    interest_amount: inst.interest,
                    total_amount: inst.total,
                    payment_date,
                    payment_status: payment_status.to_string(),
                });
            }
        }
    }

    fn guarantors(&self, ctx: &mut PhaseContext<'_>, cfg: &LendingConfig, lending: &mut Lending) -> GenResult<()> {
        let indices: Vec<usize> = (0..lending.loans.len()).collect();
        let guaranteed = participants(&indices, cfg.guarantor_ratio, &mut ctx.rng)?;
        let doubled = repeaters(&guaranteed, cfg.second_guarantor_ratio, &mut ctx.rng)?;
        for &i in guaranteed.iter().chain(doubled.iter()) {
            let loan = &lending.loans[i];
            let person = NameGenerator::person(&mut ctx.rng);
            let email = NameGenerator::personal_email(&mut ctx.rng, person.first_name, person.last_name);
            let phone = NameGenerator::phone(&mut ctx.rng);
            lending.guarantors.push(GuarantorRecord {
                loan_id: loan.loan_id.clone(),
                guarantor_name: person.full_name(),
                relationship: ctx.rng.pick(&cfg.guarantor_relationships).clone(),
                contact_info: format!("{email}, {phone}"),
                guarantee_amount: round2(loan.principal_amount * cfg.guarantee_fraction.uniform(&mut ctx.rng)),
            });
        }
        Ok(())
    }

    fn assessments(
        &self,
        ctx: &mut PhaseContext<'_>,
        cfg: &LendingConfig,
        staff: &Staff,
        lending: &mut Lending,
    ) -> GenResult<()> {
        let now = ctx.now;
        for application in &lending.applications {
            let (risk_score, pd_probability, grade) = score_application(&mut ctx.rng);
            lending.assessments.push(RiskAssessmentRecord {
                loan_id: None,
                application_id: Some(application.application_id.clone()),
                assessment_date: application.applied_at.date(),
                risk_score,
                pd_probability,
                credit_grade: grade.to_string(),
                assessed_by: pick_id_or(&staff.assessors, &staff.active, EntityKind::Employee, &mut ctx.rng)?,
            });
        }

        let indices: Vec<usize> = (0..lending.loans.len()).collect();
        for i in participants(&indices, cfg.reassessment_ratio, &mut ctx.rng)? {
            let loan = &lending.loans[i];
            let assessed_at = offset_after(loan.disbursed_at, 180, 730, now, &mut ctx.rng);
            let (risk_score, pd_probability, grade) = score_loan(&loan.loan_status, &mut ctx.rng);
            lending.assessments.push(RiskAssessmentRecord {
                loan_id: Some(loan.loan_id.clone()),
                application_id: None,
                assessment_date: assessed_at.date(),
                risk_score,
                pd_probability,
                credit_grade: grade.to_string(),
                assessed_by: pick_id_or(&staff.assessors, &staff.active, EntityKind::Employee, &mut ctx.rng)?,
            });
        }
        Ok(())
    }
}

fn params_for<'c>(cfg: &'c LendingConfig, loan_type: &str) -> GenResult<&'c LoanParams> {
    cfg.params
        .get(loan_type)
        .ok_or_else(|| GenError::Config(format!("no loan parameters for '{loan_type}'")))
}

impl Phase for LendingPhase {
    fn name(&self) -> &'static str {
        "lending"
    }

    fn slot(&self) -> PhaseSlot {
        PhaseSlot::Lending
    }

    fn reads(&self) -> &'static [EntityKind] {
        &[EntityKind::Customer, EntityKind::Account, EntityKind::Employee]
    }

    fn produces(&self) -> &'static [EntityKind] {
        &[EntityKind::LoanApplication, EntityKind::Loan]
    }

    fn generate(&self, ctx: &mut PhaseContext<'_>) -> GenResult<PhaseOutput> {
        let lending = self.build(ctx)?;
        let mut out = PhaseOutput::new();
        out.push(&lending.applications);
        out.push(&lending.loans);
        out.push(&lending.collateral);
        out.push(&lending.schedules);
        out.push(&lending.guarantors);
        out.push(&lending.assessments);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        banking_phase::BankingPhase, customer_phase::CustomerMasterPhase, phase::testing,
        registry::IdentifierRegistry, unique::UniquenessLedger, workforce_phase::WorkforcePhase,
    };

    fn lending(config: &GenConfig) -> (Lending, IdentifierRegistry) {
        let mut registry = IdentifierRegistry::new();
        let mut ledger = UniquenessLedger::default();
        testing::run(config, &mut registry, &mut ledger, PhaseSlot::Workforce, |ctx| WorkforcePhase.build(ctx));
        testing::run(config, &mut registry, &mut ledger, PhaseSlot::CustomerMaster, |ctx| {
            CustomerMasterPhase.build(ctx)
        });
        testing::run(config, &mut registry, &mut ledger, PhaseSlot::Banking, |ctx| BankingPhase.build(ctx));
        let lending = testing::run(config, &mut registry, &mut ledger, PhaseSlot::Lending, |ctx| {
            LendingPhase.build(ctx)
        });
        (lending, registry)
    }

    #[test]
    fn amortised_principal_sums_to_the_loan() {
        let schedule = amortize(12_000.0, 0.06, 24);
        assert_eq!(schedule.len(), 24);
        let principal: f64 = schedule.iter().map(|i| i.principal).sum();
        assert!((principal - 12_000.0).abs() < 0.01, "principal sums to {principal}");
        assert!(schedule.windows(2).all(|w| w[0].interest >= w[1].interest));

        let interest_free = amortize(1_200.0, 0.0, 12);
        assert!(interest_free.iter().all(|i| i.interest == 0.0 && (i.total - 100.0).abs() < 0.01));
    }

    #[test]
    fn every_approved_application_becomes_exactly_one_loan() {
        let config = GenConfig::base().with_scale(0.25);
        let (l, registry) = lending(&config);

        let approved: Vec<&LoanApplicationRecord> =
            l.applications.iter().filter(|a| a.status == "approved").collect();
        assert_eq!(approved.len(), l.loans.len());
        for a in &approved {
            let loans: Vec<&LoanRecord> = l.loans.iter().filter(|x| x.application_id == a.application_id).collect();
            assert_eq!(loans.len(), 1);
            let loan = loans[0];
            assert_eq!(loan.customer_id, a.customer_id);
            assert_eq!(loan.loan_type, a.loan_type);
            assert_eq!(Some(loan.principal_amount), a.approved_amount);
            assert!(a.approved_amount.unwrap() <= a.requested_amount);

            let since = registry.get(EntityKind::Customer, &a.customer_id).unwrap().since.unwrap();
            let decided = a.decided_at.unwrap();
            assert!(since <= a.applied_at && a.applied_at <= decided);
            assert!(decided <= loan.disbursed_at && loan.disbursed_at <= testing::now());
            if let Some(account) = &loan.linked_account_id {
                let tags = registry.tags(EntityKind::Account, account).unwrap();
                assert_eq!(tags[CUSTOMER], a.customer_id);
            }
        }
        for a in l.applications.iter().filter(|a| a.status != "approved") {
            assert!(a.approved_amount.is_none());
            assert_eq!(a.rejection_reason.is_some(), a.status == "rejected");
        }
    }

    #[test]
    fn dependent_records_respect_their_loan() {
        let (l, _) = lending(&GenConfig::base().with_scale(0.25));
        let today = testing::now().date();
        for c in &l.collateral {
            let loan = l.loans.iter().find(|x| x.loan_id == c.loan_id).unwrap();
            assert!(c.appraisal_date <= loan.disbursed_at.date());
            assert!(c.ltv_ratio < 1.0);
        }
        for r in &l.schedules {
            if let Some(paid) = r.payment_date {
                assert!(paid <= today, "payment dated {paid} after today");
            }
            if r.due_date >= today {
                assert_eq!(r.payment_status, "pending");
            }
        }
        for a in &l.assessments {
            assert!(a.loan_id.is_some() != a.application_id.is_some());
            assert!(a.assessment_date <= today);
        }
        assert_eq!(
            l.assessments.iter().filter(|a| a.application_id.is_some()).count(),
            l.applications.len()
        );
    }
}
