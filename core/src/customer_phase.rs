//! Customer master: one identity per customer, written twice.
//!
//! The accounts store keeps the core banking row (`customers`), the
//! customer store keeps the CRM profile. Both carry the same id, email
//! and phone, so the two stores agree without sharing a transaction.

use crate::{
    config::{entity, GenConfig},
    distribution::within_last_days,
    error::GenResult,
    name_generator::NameGenerator,
    phase::{pool_ids, Phase, PhaseContext, PhaseOutput},
    registry::{tags, TagFilter, RISK, SEGMENT, STATUS},
    rng::PhaseSlot,
    types::{EntityId, EntityKind},
};
use chrono::{Duration, NaiveDate, NaiveDateTime};

pub const COUNTRY: &str = "USA";

/// Core banking identity, stored in `accounts.customers`.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    pub customer_id: EntityId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub email: String,
    pub phone: String,
    pub created_at: NaiveDateTime,
}

/// CRM profile, stored in `customer.customer_profiles`.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerProfileRecord {
    pub customer_id: EntityId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub customer_segment: String,
    pub customer_status: String,
    pub onboarding_date: NaiveDate,
    pub assigned_agent_id: Option<EntityId>,
    pub kyc_status: String,
    pub risk_rating: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Default)]
pub struct CustomerMaster {
    pub customers: Vec<CustomerRecord>,
    pub profiles: Vec<CustomerProfileRecord>,
}

pub struct CustomerMasterPhase;

impl CustomerMasterPhase {
    pub fn build(&self, ctx: &mut PhaseContext<'_>) -> GenResult<CustomerMaster> {
        let config: &GenConfig = ctx.config;
        let cfg = &config.customers;
        let n = ctx.count(entity::CUSTOMERS)?;
        let now = ctx.now;
        let agents = pool_ids(&ctx.registry, EntityKind::Employee, &TagFilter::any().with(STATUS, "active"));

        let mut master = CustomerMaster {
            customers: Vec::with_capacity(n),
            profiles: Vec::with_capacity(n),
        };
        for _ in 0..n {
            let person = NameGenerator::person(&mut ctx.rng);
            let (first, last) = (person.first_name, person.last_name);
            let email = ctx.unique("email", |rng| NameGenerator::personal_email(rng, first, last))?;
            let phone = ctx.unique("phone", NameGenerator::phone)?;
            let customer_id = ctx.new_id(EntityKind::Customer)?;

            let age = ctx.rng.gauss(cfg.age_mean, cfg.age_std_dev).round() as i64;
            let age = age.clamp(cfg.min_age, cfg.max_age);
            let date_of_birth =
                now.date() - Duration::days(age * 365 + ctx.rng.range_i64(0, 364));
            let created_at = within_last_days(now, cfg.history_days, &mut ctx.rng);

            let segment = cfg.segments.sample(&mut ctx.rng);
            let status = cfg.statuses.sample(&mut ctx.rng);
            let kyc_status = cfg.kyc_statuses.sample(&mut ctx.rng);
            let risk_rating = cfg.risk_ratings.sample(&mut ctx.rng);
            let assigned_agent_id = if !agents.is_empty() && ctx.rng.chance(cfg.assigned_agent_ratio) {
                Some(ctx.rng.pick(&agents).clone())
            } else {
                None
            };

            ctx.registry.register_at(
                EntityKind::Customer,
                customer_id.clone(),
                tags([
                    (SEGMENT, segment.as_str()),
                    (STATUS, status.as_str()),
                    (RISK, risk_rating.as_str()),
                ]),
                created_at,
            )?;

            master.profiles.push(CustomerProfileRecord {
                customer_id: customer_id.clone(),
                full_name: person.full_name(),
                email: email.clone(),
                phone: phone.clone(),
                address: person.address(),
                city: person.city.to_string(),
                country: COUNTRY.to_string(),
                customer_segment: segment,
                customer_status: status,
                onboarding_date: created_at.date(),
                assigned_agent_id,
                kyc_status,
                risk_rating,
                created_at,
            });
            master.customers.push(CustomerRecord {
                customer_id,
                first_name: first.to_string(),
                last_name: last.to_string(),
                date_of_birth,
                email,
                phone,
                created_at,
            });
        }
        Ok(master)
    }
}

impl Phase for CustomerMasterPhase {
    fn name(&self) -> &'static str {
        "customer_master"
    }

    fn slot(&self) -> PhaseSlot {
        PhaseSlot::CustomerMaster
    }

    fn reads(&self) -> &'static [EntityKind] {
        &[EntityKind::Employee]
    }

    fn produces(&self) -> &'static [EntityKind] {
        &[EntityKind::Customer]
    }

    fn generate(&self, ctx: &mut PhaseContext<'_>) -> GenResult<PhaseOutput> {
        let master = self.build(ctx)?;
        let mut out = PhaseOutput::new();
        out.push(&master.customers);
        out.push(&master.profiles);
        Ok(out)
    }
}
