//! Phase trait and the per-attempt context handed to it.
//!
//! RULE: Every generation stage implements Phase.
//! A phase reads upstream identifiers from the registry, draws all
//! randomness from `ctx.rng`, and returns records. It performs no I/O;
//! the orchestrator decides what gets written and when.
//! Execution order is fixed and documented in orchestrator.rs.

use crate::{
    config::GenConfig,
    error::{GenError, GenResult},
    registry::{IdentifierRegistry, StagedRegistry, TagFilter},
    rng::{GenRng, PhaseSlot},
    scale::ResolvedCounts,
    store::{Record, TableBatch},
    types::{EntityId, EntityKind},
    unique::UniquenessLedger,
};
use chrono::NaiveDateTime;
use uuid::Uuid;

/// Hex digits kept from a generated UUID in identifiers.
pub const ID_HEX_LEN: usize = 12;

/// The contract every phase must fulfill.
pub trait Phase {
    /// Unique stable name, used in logs and run reports.
    fn name(&self) -> &'static str;

    /// Stable RNG slot for this phase.
    fn slot(&self) -> PhaseSlot;

    /// Entity kinds this phase draws foreign keys from.
    fn reads(&self) -> &'static [EntityKind];

    /// Entity kinds this phase registers.
    fn produces(&self) -> &'static [EntityKind];

    /// Synthesise one attempt's records.
    fn generate(&self, ctx: &mut PhaseContext<'_>) -> GenResult<PhaseOutput>;
}

/// Records of one phase attempt, in insert order.
#[derive(Debug, Default)]
pub struct PhaseOutput {
    batches: Vec<TableBatch>,
}

impl PhaseOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a table's rows. Push parents before children.
    pub fn push<R: Record>(&mut self, records: &[R]) {
        if !records.is_empty() {
            self.batches.push(TableBatch::of(records));
        }
    }

    pub fn push_batch(&mut self, batch: TableBatch) {
        if !batch.is_empty() {
            self.batches.push(batch);
        }
    }

    pub fn batches(&self) -> &[TableBatch] {
        &self.batches
    }

    pub fn total_rows(&self) -> usize {
        self.batches.iter().map(TableBatch::len).sum()
    }
}

/// Everything a phase attempt may touch.
pub struct PhaseContext<'a> {
    pub config: &'a GenConfig,
    pub counts: &'a ResolvedCounts,
    /// Upper bound for every occurrence date in this run.
    pub now: NaiveDateTime,
    pub attempt: u32,
    pub rng: GenRng,
    pub registry: StagedRegistry<'a>,
    ledger: &'a mut UniquenessLedger,
}

impl<'a> PhaseContext<'a> {
    pub fn new(
        config: &'a GenConfig,
        counts: &'a ResolvedCounts,
        now: NaiveDateTime,
        attempt: u32,
        rng: GenRng,
        registry: &'a IdentifierRegistry,
        ledger: &'a mut UniquenessLedger,
    ) -> Self {
        Self {
            config,
            counts,
            now,
            attempt,
            rng,
            registry: StagedRegistry::new(registry),
            ledger,
        }
    }

    /// Resolved target count for a scale entity.
    pub fn count(&self, entity: &str) -> GenResult<usize> {
        Ok(self.counts.get(entity)? as usize)
    }

    /// Fresh identifier for `kind`, never issued before in this run.
    pub fn new_id(&mut self, kind: EntityKind) -> GenResult<EntityId> {
        self.new_code(kind.id_prefix(), &format!("id:{kind}"))
    }

    /// `PREFIX-XXXXXXXXXXXX`, unique within `domain`.
    pub fn new_code(&mut self, prefix: &str, domain: &str) -> GenResult<String> {
        let rng = &mut self.rng;
        self.ledger.unique_one(domain, || {
            let uuid = Uuid::from_u64_pair(rng.next_u64(), rng.next_u64());
            let hex = uuid.simple().to_string().to_uppercase();
            format!("{prefix}-{}", &hex[..ID_HEX_LEN])
        })
    }

    /// One value from `candidate` that is new to `domain`.
    pub fn unique<F>(&mut self, domain: &str, mut candidate: F) -> GenResult<String>
    where
        F: FnMut(&mut GenRng) -> String,
    {
        let rng = &mut self.rng;
        self.ledger.unique_one(domain, || candidate(rng))
    }

    /// `count` values from `candidate`, all new to `domain`.
    pub fn unique_many<F>(&mut self, domain: &str, count: usize, mut candidate: F) -> GenResult<Vec<String>>
    where
        F: FnMut(&mut GenRng) -> String,
    {
        let rng = &mut self.rng;
        self.ledger.generate_unique(domain, count, || candidate(rng))
    }

    pub fn ledger(&self) -> &UniquenessLedger {
        &*self.ledger
    }

    /// Identifiers this attempt staged, for the orchestrator to absorb.
    pub fn into_staged(self) -> IdentifierRegistry {
        self.registry.into_staged()
    }
}

/// An upstream entry's creation moment, or a Config error naming it.
pub fn required_since(
    registry: &StagedRegistry<'_>,
    kind: EntityKind,
    id: &str,
) -> GenResult<NaiveDateTime> {
    registry
        .get(kind, id)
        .and_then(|e| e.since)
        .ok_or_else(|| GenError::Config(format!("{kind} '{id}' has no creation date")))
}

/// The first `n` entries of a fixed catalogue, or a Config error when
/// the scale asks for more than the catalogue holds.
pub fn take_fixed<'c, T>(entity: &str, catalogue: &'c [T], n: usize) -> GenResult<&'c [T]> {
    catalogue.get(..n).ok_or_else(|| {
        GenError::Config(format!(
            "{entity}: {n} requested but only {} configured",
            catalogue.len()
        ))
    })
}

/// Owned `(id, since)` pairs for every entry of `kind` matching `filter`.
/// Taken once per phase so the pool outlives borrows of the context.
pub fn pool(registry: &StagedRegistry<'_>, kind: EntityKind, filter: &TagFilter) -> Vec<(EntityId, Option<NaiveDateTime>)> {
    registry
        .matching(kind, filter)
        .into_iter()
        .map(|e| (e.id.clone(), e.since))
        .collect()
}

/// Ids only; see `pool`.
pub fn pool_ids(registry: &StagedRegistry<'_>, kind: EntityKind, filter: &TagFilter) -> Vec<EntityId> {
    registry
        .matching(kind, filter)
        .into_iter()
        .map(|e| e.id.clone())
        .collect()
}

/// One id from a non-empty pool.
pub fn pick_id(pool: &[EntityId], kind: EntityKind, rng: &mut GenRng) -> GenResult<EntityId> {
    if pool.is_empty() {
        return Err(GenError::InsufficientPopulation {
            entity: kind.to_string(),
            requested: 1,
            available: 0,
        });
    }
    Ok(rng.pick(pool).clone())
}

/// Same as `pick_id`, falling back to `fallback` when `pool` is empty.
pub fn pick_id_or(
    pool: &[EntityId],
    fallback: &[EntityId],
    kind: EntityKind,
    rng: &mut GenRng,
) -> GenResult<EntityId> {
    if pool.is_empty() {
        pick_id(fallback, kind, rng)
    } else {
        pick_id(pool, kind, rng)
    }
}
