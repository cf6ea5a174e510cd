//! Engagement: marketing campaigns and customer interactions.

use crate::{
    config::{entity, GenConfig},
    distribution::{between, participants, repeaters, round2, start_of_day, within_last_days},
    error::{GenError, GenResult},
    phase::{pick_id_or, pool, pool_ids, take_fixed, Phase, PhaseContext, PhaseOutput},
    registry::{tags, TagFilter, CUSTOMER, ROLE, STATUS, TYPE},
    rng::PhaseSlot,
    types::{EntityId, EntityKind},
};
use chrono::{Duration, NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, PartialEq)]
pub struct CampaignRecord {
    pub campaign_id: EntityId,
    pub campaign_name: String,
    pub campaign_type: String,
    pub channel: String,
    pub start_date: NaiveDate,
    /// Scheduled; may lie in the future.
    pub end_date: NaiveDate,
    pub budget: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionRecord {
    pub interaction_id: EntityId,
    pub customer_id: EntityId,
    pub employee_id: EntityId,
    pub campaign_id: Option<EntityId>,
    pub channel: String,
    pub topic: String,
    pub outcome: String,
    pub interaction_at: NaiveDateTime,
}

#[derive(Debug, Default)]
pub struct Engagement {
    pub campaigns: Vec<CampaignRecord>,
    pub interactions: Vec<InteractionRecord>,
}

pub struct EngagementPhase;

impl EngagementPhase {
    pub fn build(&self, ctx: &mut PhaseContext<'_>) -> GenResult<Engagement> {
        let config: &GenConfig = ctx.config;
        let cfg = &config.engagement;
        let now = ctx.now;

        let n = ctx.count(entity::CAMPAIGNS)?;
        let mut campaigns = Vec::with_capacity(n);
        for spec in take_fixed(entity::CAMPAIGNS, &cfg.campaigns, n)? {
            let start = within_last_days(now, cfg.campaign_window_days, &mut ctx.rng).date();
            campaigns.push(CampaignRecord {
                campaign_id: ctx.new_id(EntityKind::Campaign)?,
                campaign_name: spec.name.clone(),
                campaign_type: spec.campaign_type.clone(),
                channel: spec.channel.clone(),
                start_date: start,
                end_date: start + Duration::days(ctx.rng.range_i64(30, 120)),
                budget: round2(cfg.campaign_budget.uniform(&mut ctx.rng)),
            });
        }

        let reps = pool_ids(
            &ctx.registry,
            EntityKind::Employee,
            &TagFilter::any().with(ROLE, "customer_service_rep").with(STATUS, "active"),
        );
        let staff = pool_ids(&ctx.registry, EntityKind::Employee, &TagFilter::any().with(STATUS, "active"));

        let customers = pool(&ctx.registry, EntityKind::Customer, &TagFilter::any());
        let engaged = participants(&customers, cfg.participation, &mut ctx.rng)?;
        let again = repeaters(&engaged, cfg.second_interaction_ratio, &mut ctx.rng)?;

        let mut interactions = Vec::with_capacity(engaged.len() + again.len());
        for (customer_id, since) in engaged.iter().chain(again.iter()) {
            let since = since.ok_or_else(|| {
                GenError::Config(format!("customer '{customer_id}' has no creation date"))
            })?;
            let from = since.max(now - Duration::days(cfg.interaction_window_days));
            let interaction_at = between(from, cfg.interaction_window_days, now, &mut ctx.rng);

            // Only campaigns running on the day of contact.
            let day = interaction_at.date();
            let running: Vec<&CampaignRecord> = campaigns
                .iter()
                .filter(|c| c.start_date <= day && day <= c.end_date)
                .collect();
            let campaign_id = if !running.is_empty() && ctx.rng.chance(cfg.campaign_link_ratio) {
                Some(ctx.rng.pick(&running).campaign_id.clone())
            } else {
                None
            };

            interactions.push(InteractionRecord {
                interaction_id: ctx.new_id(EntityKind::Interaction)?,
                customer_id: customer_id.clone(),
                employee_id: pick_id_or(&reps, &staff, EntityKind::Employee, &mut ctx.rng)?,
                campaign_id,
                channel: cfg.channels.sample(&mut ctx.rng),
                topic: ctx.rng.pick(&cfg.topics).clone(),
                outcome: cfg.outcomes.sample(&mut ctx.rng),
                interaction_at,
            });
        }

        for c in &campaigns {
            ctx.registry.register_at(
                EntityKind::Campaign,
                c.campaign_id.clone(),
                tags([(TYPE, c.campaign_type.as_str())]),
                start_of_day(c.start_date),
            )?;
        }
        for i in &interactions {
            ctx.registry.register_at(
                EntityKind::Interaction,
                i.interaction_id.clone(),
                tags([(CUSTOMER, i.customer_id.as_str())]),
                i.interaction_at,
            )?;
        }
        Ok(Engagement { campaigns, interactions })
    }
}

impl Phase for EngagementPhase {
    fn name(&self) -> &'static str {
        "engagement"
    }

    fn slot(&self) -> PhaseSlot {
        PhaseSlot::Engagement
    }

    fn reads(&self) -> &'static [EntityKind] {
        &[EntityKind::Customer, EntityKind::Employee]
    }

    fn produces(&self) -> &'static [EntityKind] {
        &[EntityKind::Campaign, EntityKind::Interaction]
    }

    fn generate(&self, ctx: &mut PhaseContext<'_>) -> GenResult<PhaseOutput> {
        let engagement = self.build(ctx)?;
        let mut out = PhaseOutput::new();
        out.push(&engagement.campaigns);
        out.push(&engagement.interactions);
        Ok(out)
    }
}
