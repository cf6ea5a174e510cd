//! Identifier registry: the cross-store ledger of "what exists".
//!
//! RULE: every foreign key placed in a generated record is drawn from
//! here, so it always names an entity created earlier in the run.
//!
//! Entries are append-only for the life of a run. Each entry carries a
//! small tag set (role, status, owning customer, ...) fixed at creation;
//! tag lookups go through a per-kind posting index.
//!
//! A phase never writes the run registry directly. It stages new
//! identifiers in a `StagedRegistry`; the orchestrator folds the stage
//! into the run registry only after the phase's writes commit.

use crate::{
    error::{GenError, GenResult},
    rng::GenRng,
    types::{EntityId, EntityKind},
};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub const ROLE: &str = "role";
pub const STATUS: &str = "status";
pub const CUSTOMER: &str = "customer";
pub const TYPE: &str = "type";
pub const SEGMENT: &str = "segment";
pub const RISK: &str = "risk";
pub const DEPARTMENT: &str = "department";

pub type Tags = BTreeMap<&'static str, String>;

/// Build a tag set from `(key, value)` pairs.
pub fn tags<const N: usize>(pairs: [(&'static str, &str); N]) -> Tags {
    pairs.into_iter().map(|(k, v)| (k, v.to_string())).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: EntityId,
    pub tags: Tags,
    /// Creation moment, for entities that have one. Dependent records
    /// are dated no earlier than this.
    pub since: Option<NaiveDateTime>,
}

/// Conjunction of `key = value` tests. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagFilter {
    terms: Vec<(&'static str, String)>,
}

impl TagFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.terms.push((key, value.into()));
        self
    }

    pub fn matches(&self, tags: &Tags) -> bool {
        self.terms
            .iter()
            .all(|(k, v)| tags.get(k).is_some_and(|t| t == v))
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// What to do when a sample asks for more than exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplePolicy {
    /// Fail with `InsufficientPopulation`.
    Strict,
    /// Return the whole (shuffled) population instead.
    BestEffort,
}

#[derive(Debug, Default)]
struct Population {
    entries: Vec<Entry>,
    by_id: HashMap<EntityId, usize>,
    by_tag: HashMap<(&'static str, String), Vec<usize>>,
}

impl Population {
    fn push(&mut self, id: EntityId, tags: Tags, since: Option<NaiveDateTime>) {
        let idx = self.entries.len();
        for (k, v) in &tags {
            self.by_tag.entry((*k, v.clone())).or_default().push(idx);
        }
        self.by_id.insert(id.clone(), idx);
        self.entries.push(Entry { id, tags, since });
    }

    fn matching(&self, filter: &TagFilter) -> Vec<&Entry> {
        if filter.is_empty() {
            return self.entries.iter().collect();
        }
        // Walk the shortest posting list, check the remaining terms.
        let shortest = filter
            .terms
            .iter()
            .map(|(k, v)| self.by_tag.get(&(*k, v.clone())).map_or(&[][..], |p| p.as_slice()))
            .min_by_key(|p| p.len())
            .unwrap_or(&[]);
        shortest
            .iter()
            .map(|&i| &self.entries[i])
            .filter(|e| filter.matches(&e.tags))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct IdentifierRegistry {
    populations: BTreeMap<EntityKind, Population>,
}

impl IdentifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one identifier. Registering an id twice for the same kind
    /// is a generator bug and always fails.
    pub fn register(&mut self, kind: EntityKind, id: impl Into<EntityId>, tags: Tags) -> GenResult<()> {
        self.insert(kind, id.into(), tags, None)
    }

    /// `register` for entities with a creation moment.
    pub fn register_at(
        &mut self,
        kind: EntityKind,
        id: impl Into<EntityId>,
        tags: Tags,
        since: NaiveDateTime,
    ) -> GenResult<()> {
        self.insert(kind, id.into(), tags, Some(since))
    }

    fn insert(
        &mut self,
        kind: EntityKind,
        id: EntityId,
        tags: Tags,
        since: Option<NaiveDateTime>,
    ) -> GenResult<()> {
        let population = self.populations.entry(kind).or_default();
        if population.by_id.contains_key(&id) {
            return Err(GenError::DuplicateIdentifier {
                entity: kind.to_string(),
                id,
            });
        }
        population.push(id, tags, since);
        Ok(())
    }

    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        self.populations
            .get(&kind)
            .is_some_and(|p| p.by_id.contains_key(id))
    }

    pub fn get(&self, kind: EntityKind, id: &str) -> Option<&Entry> {
        let population = self.populations.get(&kind)?;
        population.by_id.get(id).map(|&i| &population.entries[i])
    }

    pub fn tags(&self, kind: EntityKind, id: &str) -> Option<&Tags> {
        self.get(kind, id).map(|e| &e.tags)
    }

    /// Full scan in registration order.
    pub fn entries(&self, kind: EntityKind) -> &[Entry] {
        self.populations
            .get(&kind)
            .map_or(&[][..], |p| p.entries.as_slice())
    }

    pub fn matching(&self, kind: EntityKind, filter: &TagFilter) -> Vec<&Entry> {
        self.populations
            .get(&kind)
            .map_or_else(Vec::new, |p| p.matching(filter))
    }

    pub fn count(&self, kind: EntityKind, filter: &TagFilter) -> usize {
        self.matching(kind, filter).len()
    }

    /// `k` distinct identifiers matching `filter`, without replacement.
    pub fn sample(
        &self,
        kind: EntityKind,
        k: usize,
        filter: &TagFilter,
        policy: SamplePolicy,
        rng: &mut GenRng,
    ) -> GenResult<Vec<EntityId>> {
        let pool: Vec<&str> = self
            .matching(kind, filter)
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();
        sample_pool(kind, &pool, k, policy, rng)
    }

    pub fn stats(&self) -> RegistryStats {
        let employees = |role: &str| self.count(EntityKind::Employee, &TagFilter::any().with(ROLE, role));
        RegistryStats {
            employees: self.entries(EntityKind::Employee).len(),
            loan_officers: employees("loan_officer"),
            insurance_agents: employees("insurance_agent"),
            compliance_officers: employees("compliance_officer"),
            customers: self.entries(EntityKind::Customer).len(),
            accounts: self.entries(EntityKind::Account).len(),
            loans: self.entries(EntityKind::Loan).len(),
            policies: self.entries(EntityKind::Policy).len(),
        }
    }

    /// Fold a committed stage into the run registry.
    pub fn absorb(&mut self, staged: IdentifierRegistry) -> GenResult<usize> {
        let mut added = 0;
        for (kind, population) in staged.populations {
            for entry in population.entries {
                self.insert(kind, entry.id, entry.tags, entry.since)?;
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn clear(&mut self) {
        self.populations.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.populations.values().all(|p| p.entries.is_empty())
    }
}

fn sample_pool(
    kind: EntityKind,
    pool: &[&str],
    k: usize,
    policy: SamplePolicy,
    rng: &mut GenRng,
) -> GenResult<Vec<EntityId>> {
    let k = match policy {
        _ if k <= pool.len() => k,
        SamplePolicy::BestEffort => pool.len(),
        SamplePolicy::Strict => {
            return Err(GenError::InsufficientPopulation {
                entity: kind.to_string(),
                requested: k,
                available: pool.len(),
            })
        }
    };
    Ok(rng
        .sample_indices(pool.len(), k)
        .into_iter()
        .map(|i| pool[i].to_string())
        .collect())
}

/// Read-through view over the run registry plus identifiers created
/// by the phase attempt in progress.
pub struct StagedRegistry<'a> {
    base: &'a IdentifierRegistry,
    staged: IdentifierRegistry,
}

impl<'a> StagedRegistry<'a> {
    pub fn new(base: &'a IdentifierRegistry) -> Self {
        Self {
            base,
            staged: IdentifierRegistry::new(),
        }
    }

    pub fn register(&mut self, kind: EntityKind, id: impl Into<EntityId>, tags: Tags) -> GenResult<()> {
        let id = id.into();
        self.check_base(kind, &id)?;
        self.staged.register(kind, id, tags)
    }

    pub fn register_at(
        &mut self,
        kind: EntityKind,
        id: impl Into<EntityId>,
        tags: Tags,
        since: NaiveDateTime,
    ) -> GenResult<()> {
        let id = id.into();
        self.check_base(kind, &id)?;
        self.staged.register_at(kind, id, tags, since)
    }

    fn check_base(&self, kind: EntityKind, id: &str) -> GenResult<()> {
        if self.base.contains(kind, id) {
            return Err(GenError::DuplicateIdentifier {
                entity: kind.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        self.base.contains(kind, id) || self.staged.contains(kind, id)
    }

    pub fn get(&self, kind: EntityKind, id: &str) -> Option<&Entry> {
        self.base.get(kind, id).or_else(|| self.staged.get(kind, id))
    }

    pub fn tags(&self, kind: EntityKind, id: &str) -> Option<&Tags> {
        self.get(kind, id).map(|e| &e.tags)
    }

    pub fn matching(&self, kind: EntityKind, filter: &TagFilter) -> Vec<&Entry> {
        let mut out = self.base.matching(kind, filter);
        out.extend(self.staged.matching(kind, filter));
        out
    }

    pub fn count(&self, kind: EntityKind, filter: &TagFilter) -> usize {
        self.base.count(kind, filter) + self.staged.count(kind, filter)
    }

    pub fn sample(
        &self,
        kind: EntityKind,
        k: usize,
        filter: &TagFilter,
        policy: SamplePolicy,
        rng: &mut GenRng,
    ) -> GenResult<Vec<EntityId>> {
        let pool: Vec<&str> = self
            .matching(kind, filter)
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();
        sample_pool(kind, &pool, k, policy, rng)
    }

    pub fn into_staged(self) -> IdentifierRegistry {
        self.staged
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub employees: usize,
    pub loan_officers: usize,
    pub insurance_agents: usize,
    pub compliance_officers: usize,
    pub customers: usize,
    pub accounts: usize,
    pub loans: usize,
    pub policies: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn staffed() -> IdentifierRegistry {
        let mut reg = IdentifierRegistry::new();
        for i in 0..10 {
            let role = if i < 3 { "loan_officer" } else { "teller" };
            reg.register(
                EntityKind::Employee,
                format!("EMP-{i}"),
                tags([(ROLE, role), (STATUS, "active")]),
            )
            .unwrap();
        }
        reg
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut reg = staffed();
        let err = reg
            .register(EntityKind::Employee, "EMP-4", Tags::new())
            .unwrap_err();
        assert!(matches!(err, GenError::DuplicateIdentifier { .. }));
        // Same id under another kind is fine.
        reg.register(EntityKind::Customer, "EMP-4", Tags::new()).unwrap();
    }

    #[test]
    fn filtered_count_and_sample() {
        let reg = staffed();
        let officers = TagFilter::any().with(ROLE, "loan_officer");
        assert_eq!(reg.count(EntityKind::Employee, &officers), 3);
        assert_eq!(reg.count(EntityKind::Employee, &TagFilter::any()), 10);

        let mut rng = GenRng::new(1);
        let picked = reg
            .sample(EntityKind::Employee, 3, &officers, SamplePolicy::Strict, &mut rng)
            .unwrap();
        let set: HashSet<_> = picked.iter().cloned().collect();
        assert_eq!(set.len(), 3);
        assert!(set.iter().all(|id| ["EMP-0", "EMP-1", "EMP-2"].contains(&id.as_str())));
    }

    #[test]
    fn oversized_sample_follows_policy() {
        let reg = staffed();
        let officers = TagFilter::any().with(ROLE, "loan_officer");
        let mut rng = GenRng::new(2);
        let err = reg
            .sample(EntityKind::Employee, 5, &officers, SamplePolicy::Strict, &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            GenError::InsufficientPopulation { requested: 5, available: 3, .. }
        ));
        let all = reg
            .sample(EntityKind::Employee, 5, &officers, SamplePolicy::BestEffort, &mut rng)
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn stage_sees_base_and_absorbs_on_commit() {
        let mut reg = staffed();
        let staged = {
            let mut stage = StagedRegistry::new(&reg);
            stage
                .register(EntityKind::Employee, "EMP-10", tags([(ROLE, "loan_officer")]))
                .unwrap();
            assert!(stage.register(EntityKind::Employee, "EMP-0", Tags::new()).is_err());
            assert_eq!(
                stage.count(EntityKind::Employee, &TagFilter::any().with(ROLE, "loan_officer")),
                4
            );
            stage.into_staged()
        };
        assert!(!reg.contains(EntityKind::Employee, "EMP-10"));
        assert_eq!(reg.absorb(staged).unwrap(), 1);
        assert!(reg.contains(EntityKind::Employee, "EMP-10"));
        assert_eq!(reg.stats().loan_officers, 4);
    }
}
