//! Compliance: monitoring rules, onboarding AML checks, SAR filings.

use crate::{
    config::{entity, GenConfig},
    distribution::{offset_after, participants, round2, round4},
    error::{GenError, GenResult},
    phase::{pick_id_or, pool, pool_ids, take_fixed, Phase, PhaseContext, PhaseOutput},
    registry::{tags, TagFilter, CUSTOMER, ROLE, STATUS, TYPE},
    rng::PhaseSlot,
    types::{EntityId, EntityKind},
};
use chrono::NaiveDateTime;

pub const ONBOARDING_CHECK: &str = "onboarding";

#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringRuleRecord {
    pub rule_id: EntityId,
    pub rule_name: String,
    pub category: String,
    pub threshold: f64,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmlCheckRecord {
    pub check_id: EntityId,
    pub customer_id: EntityId,
    pub check_type: String,
    pub result: String, // clear | review | flagged
    pub score: f64,
    /// Rule that raised the alert; none for clear results.
    pub rule_id: Option<EntityId>,
    pub checked_by: EntityId,
    pub checked_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SarFilingRecord {
    pub sar_id: String,
    pub check_id: EntityId,
    pub customer_id: EntityId,
    pub filed_at: NaiveDateTime,
    pub status: String,
    pub suspicious_amount: f64,
    pub narrative: String,
    pub filed_by: EntityId,
}

#[derive(Debug, Default)]
pub struct Compliance {
    pub rules: Vec<MonitoringRuleRecord>,
    pub checks: Vec<AmlCheckRecord>,
    pub filings: Vec<SarFilingRecord>,
}

/// Risk score band for a check result.
fn score_band(result: &str) -> (f64, f64) {
    match result {
        "flagged" => (0.70, 1.00),
        "review" => (0.30, 0.70),
        _ => (0.00, 0.30),
    }
}

pub struct CompliancePhase;

impl CompliancePhase {
    pub fn build(&self, ctx: &mut PhaseContext<'_>) -> GenResult<Compliance> {
        let config: &GenConfig = ctx.config;
        let cfg = &config.compliance;
        let now = ctx.now;

        let n = ctx.count(entity::MONITORING_RULES)?;
        let mut rules = Vec::with_capacity(n);
        for spec in take_fixed(entity::MONITORING_RULES, &cfg.rules, n)? {
            rules.push(MonitoringRuleRecord {
                rule_id: ctx.new_id(EntityKind::MonitoringRule)?,
                rule_name: spec.name.clone(),
                category: spec.category.clone(),
                threshold: spec.threshold,
                active: true,
            });
        }

        let active = TagFilter::any().with(STATUS, "active");
        let officers = pool_ids(&ctx.registry, EntityKind::Employee, &active.clone().with(ROLE, "compliance_officer"));
        let staff = pool_ids(&ctx.registry, EntityKind::Employee, &active);

        let customers = pool(&ctx.registry, EntityKind::Customer, &TagFilter::any());
        let mut checks = Vec::with_capacity(customers.len());
        for (customer_id, since) in &customers {
            let since = since.ok_or_else(|| {
                GenError::Config(format!("customer '{customer_id}' has no creation date"))
            })?;
            let result = cfg.check_results.sample(&mut ctx.rng);
            let (lo, hi) = score_band(&result);
            let rule_id = if result != "clear" && !rules.is_empty() {
                Some(ctx.rng.pick(&rules).rule_id.clone())
            } else {
                None
            };
            checks.push(AmlCheckRecord {
                check_id: ctx.new_id(EntityKind::AmlCheck)?,
                customer_id: customer_id.clone(),
                check_type: ONBOARDING_CHECK.to_string(),
                score: round4(ctx.rng.uniform(lo, hi)),
                result,
                rule_id,
                checked_by: pick_id_or(&officers, &staff, EntityKind::Employee, &mut ctx.rng)?,
                checked_at: offset_after(since, 0, cfg.max_check_delay_days, now, &mut ctx.rng),
            });
        }

        let flagged: Vec<usize> = checks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.result == "flagged")
            .map(|(i, _)| i)
            .collect();
        let mut filings = Vec::new();
        for i in participants(&flagged, cfg.sar_ratio, &mut ctx.rng)? {
            let check = &checks[i];
            let suspicious_amount = round2(cfg.suspicious_amount.uniform(&mut ctx.rng));
            let rule = check
                .rule_id
                .as_deref()
                .and_then(|id| rules.iter().find(|r| r.rule_id == id))
                .map_or("manual review", |r| r.rule_name.as_str());
            filings.push(SarFilingRecord {
                sar_id: ctx.new_code("SAR", "sar_id")?,
                check_id: check.check_id.clone(),
                customer_id: check.customer_id.clone(),
                filed_at: offset_after(check.checked_at, 0, cfg.max_filing_delay_days, now, &mut ctx.rng),
                status: cfg.sar_statuses.sample(&mut ctx.rng),
                narrative: format!(
                    "Activity totalling {suspicious_amount:.2} flagged by {rule} during onboarding screening."
                ),
                suspicious_amount,
                filed_by: pick_id_or(&officers, &staff, EntityKind::Employee, &mut ctx.rng)?,
            });
        }

        for r in &rules {
            ctx.registry
                .register(EntityKind::MonitoringRule, r.rule_id.clone(), tags([(TYPE, r.category.as_str())]))?;
        }
        for c in &checks {
            ctx.registry.register_at(
                EntityKind::AmlCheck,
                c.check_id.clone(),
                tags([(CUSTOMER, c.customer_id.as_str()), (STATUS, c.result.as_str())]),
                c.checked_at,
            )?;
        }
        log::debug!(
            "compliance: {} checks, {} flagged, {} SAR filings",
            checks.len(),
            flagged.len(),
            filings.len()
        );
        Ok(Compliance { rules, checks, filings })
    }
}

impl Phase for CompliancePhase {
    fn name(&self) -> &'static str {
        "compliance"
    }

    fn slot(&self) -> PhaseSlot {
        PhaseSlot::Compliance
    }

    fn reads(&self) -> &'static [EntityKind] {
        &[EntityKind::Customer, EntityKind::Employee]
    }

    fn produces(&self) -> &'static [EntityKind] {
        &[EntityKind::MonitoringRule, EntityKind::AmlCheck]
    }

    fn generate(&self, ctx: &mut PhaseContext<'_>) -> GenResult<PhaseOutput> {
        let compliance = self.build(ctx)?;
        let mut out = PhaseOutput::new();
        out.push(&compliance.rules);
        out.push(&compliance.checks);
        out.push(&compliance.filings);
        Ok(out)
    }
}
