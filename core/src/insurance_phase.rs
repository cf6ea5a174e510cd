//! Insurance: policies sold by agents, and claims against them.

use crate::{
    config::{GenConfig, InsuranceConfig, PolicyParams},
    distribution::{between, participants, repeaters, round2},
    error::{GenError, GenResult},
    name_generator::NameGenerator,
    phase::{pick_id_or, pool, pool_ids, Phase, PhaseContext, PhaseOutput},
    registry::{tags, TagFilter, CUSTOMER, ROLE, STATUS, TYPE},
    rng::PhaseSlot,
    types::{EntityId, EntityKind},
};
use chrono::{Duration, NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyRecord {
    pub policy_id: EntityId,
    pub policy_number: String,
    pub customer_id: EntityId,
    pub agent_id: EntityId,
    pub policy_type: String,
    pub status: String,
    pub coverage_amount: f64,
    pub annual_premium: f64,
    pub started_at: NaiveDateTime,
    /// End of the contractual term; may lie in the future.
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimRecord {
    pub claim_id: EntityId,
    pub policy_id: EntityId,
    pub claim_type: String,
    pub claim_amount: f64,
    pub claimed_at: NaiveDateTime,
    pub status: String,
    pub settled_amount: Option<f64>,
}

#[derive(Debug, Default)]
pub struct Insurance {
    pub policies: Vec<PolicyRecord>,
    pub claims: Vec<ClaimRecord>,
}

pub struct InsurancePhase;

impl InsurancePhase {
    pub fn build(&self, ctx: &mut PhaseContext<'_>) -> GenResult<Insurance> {
        let config: &GenConfig = ctx.config;
        let cfg = &config.insurance;
        let now = ctx.now;

        let active = TagFilter::any().with(STATUS, "active");
        let agents = pool_ids(&ctx.registry, EntityKind::Employee, &active.clone().with(ROLE, "insurance_agent"));
        let staff = pool_ids(&ctx.registry, EntityKind::Employee, &active);

        let customers = pool(&ctx.registry, EntityKind::Customer, &TagFilter::any());
        let insured = participants(&customers, cfg.participation, &mut ctx.rng)?;
        let second = repeaters(&insured, cfg.second_policy_ratio, &mut ctx.rng)?;

        let mut policies = Vec::with_capacity(insured.len() + second.len());
        for (customer_id, since) in insured.iter().chain(second.iter()) {
            let since = since.ok_or_else(|| {
                GenError::Config(format!("customer '{customer_id}' has no creation date"))
            })?;
            let policy_type = cfg.policy_types.sample(&mut ctx.rng);
            let params = params_for(cfg, &policy_type)?;
            let from = since.max(now - Duration::days(cfg.policy_window_days));
            let started_at = between(from, cfg.policy_window_days, now, &mut ctx.rng);

            policies.push(PolicyRecord {
                policy_id: ctx.new_id(EntityKind::Policy)?,
                policy_number: ctx.unique("policy_number", |rng| format!("PN{}", NameGenerator::digits(rng, 10)))?,
                customer_id: customer_id.clone(),
                agent_id: pick_id_or(&agents, &staff, EntityKind::Employee, &mut ctx.rng)?,
                status: cfg.statuses.sample(&mut ctx.rng),
                coverage_amount: round2(params.coverage.uniform(&mut ctx.rng)),
                annual_premium: round2(params.annual_premium.uniform(&mut ctx.rng)),
                started_at,
                end_date: started_at.date() + Duration::days(params.term_months * 30),
                policy_type,
            });
        }

        let claims = self.claims(ctx, cfg, &policies)?;

        for p in &policies {
            ctx.registry.register_at(
                EntityKind::Policy,
                p.policy_id.clone(),
                tags([
                    (CUSTOMER, p.customer_id.as_str()),
                    (TYPE, p.policy_type.as_str()),
                    (STATUS, p.status.as_str()),
                ]),
                p.started_at,
            )?;
        }
        for c in &claims {
            ctx.registry.register_at(
                EntityKind::Claim,
                c.claim_id.clone(),
                tags([(STATUS, c.status.as_str())]),
                c.claimed_at,
            )?;
        }
        Ok(Insurance { policies, claims })
    }

    /// Claims fall inside the policy window and never after now.
    fn claims(&self, ctx: &mut PhaseContext<'_>, cfg: &InsuranceConfig, policies: &[PolicyRecord]) -> GenResult<Vec<ClaimRecord>> {
        let now = ctx.now;
        let indices: Vec<usize> = (0..policies.len()).collect();
        let claimed = participants(&indices, cfg.claim_ratio, &mut ctx.rng)?;
        let again = repeaters(&claimed, cfg.second_claim_ratio, &mut ctx.rng)?;

        let mut out = Vec::with_capacity(claimed.len() + again.len());
        for &i in claimed.iter().chain(again.iter()) {
            let policy = &policies[i];
            let params = params_for(cfg, &policy.policy_type)?;
            let window = (policy.end_date - policy.started_at.date()).num_days();
            let claimed_at = between(policy.started_at, window, now, &mut ctx.rng);
            let claim_amount = round2(policy.coverage_amount * cfg.claim_fraction.uniform(&mut ctx.rng));
            let status = cfg.claim_statuses.sample(&mut ctx.rng);
            let settled_amount = (status == "approved")
                .then(|| round2(claim_amount * ctx.rng.uniform(0.70, 1.00)));
            out.push(ClaimRecord {
                claim_id: ctx.new_id(EntityKind::Claim)?,
                policy_id: policy.policy_id.clone(),
                claim_type: ctx.rng.pick(&params.claim_types).clone(),
                claim_amount,
                claimed_at,
                status,
                settled_amount,
            });
        }
        Ok(out)
    }
}

fn params_for<'c>(cfg: &'c InsuranceConfig, policy_type: &str) -> GenResult<&'c PolicyParams> {
    cfg.params
        .get(policy_type)
        .ok_or_else(|| GenError::Config(format!("no policy parameters for '{policy_type}'")))
}

impl Phase for InsurancePhase {
    fn name(&self) -> &'static str {
        "insurance"
    }

    fn slot(&self) -> PhaseSlot {
        PhaseSlot::Insurance
    }

    fn reads(&self) -> &'static [EntityKind] {
        &[EntityKind::Customer, EntityKind::Employee]
    }

    fn produces(&self) -> &'static [EntityKind] {
        &[EntityKind::Policy, EntityKind::Claim]
    }

    fn generate(&self, ctx: &mut PhaseContext<'_>) -> GenResult<PhaseOutput> {
        let insurance = self.build(ctx)?;
        let mut out = PhaseOutput::new();
        out.push(&insurance.policies);
        out.push(&insurance.claims);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        customer_phase::CustomerMasterPhase, phase::testing, registry::IdentifierRegistry,
        unique::UniquenessLedger, workforce_phase::WorkforcePhase,
    };

    #[test]
    fn claims_stay_inside_their_policy_window() {
        let config = GenConfig::base().with_scale(0.25);
        let mut registry = IdentifierRegistry::new();
        let mut ledger = UniquenessLedger::default();
        testing::run(&config, &mut registry, &mut ledger, PhaseSlot::Workforce, |ctx| WorkforcePhase.build(ctx));
        testing::run(&config, &mut registry, &mut ledger, PhaseSlot::CustomerMaster, |ctx| {
            CustomerMasterPhase.build(ctx)
        });
        let ins = testing::run(&config, &mut registry, &mut ledger, PhaseSlot::Insurance, |ctx| {
            InsurancePhase.build(ctx)
        });

        // 300 customers: 90 insured, 14 with a second policy.
        assert_eq!(ins.policies.len(), 90 + 14);
        for p in &ins.policies {
            let role = &registry.tags(EntityKind::Employee, &p.agent_id).unwrap()[ROLE];
            assert_eq!(role, "insurance_agent");
        }
        for c in &ins.claims {
            let policy = ins.policies.iter().find(|p| p.policy_id == c.policy_id).unwrap();
            assert!(c.claimed_at >= policy.started_at);
            assert!(c.claimed_at.date() <= policy.end_date);
            assert!(c.claimed_at <= testing::now());
            assert!(c.claim_amount <= policy.coverage_amount);
            assert_eq!(c.settled_amount.is_some(), c.status == "approved");
        }
    }
}
