//! Scale resolver: one scale factor in, concrete per-entity counts out.
//!
//! `fixed` entities keep their base count at every scale.
//! `linear` entities resolve to `round(base_count × factor)`, floor 0.
//! An explicit override replaces the resolved value and skips scaling.

use crate::error::{GenError, GenResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleKind {
    Fixed,
    Linear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityScale {
    pub base_count: u64,
    pub kind: ScaleKind,
}

/// Fields missing from a config file fall back to the baseline entity
/// table (see `config::GenConfig::base`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    pub factor: f64,
    pub entities: BTreeMap<String, EntityScale>,
    /// Signed so that a negative value in a config file is reported,
    /// not silently wrapped.
    pub overrides: BTreeMap<String, i64>,
}

impl ScaleConfig {
    pub fn new(factor: f64) -> Self {
        Self {
            factor,
            entities: BTreeMap::new(),
            overrides: BTreeMap::new(),
        }
    }

    pub fn fixed(mut self, entity: &str, base_count: u64) -> Self {
        self.entities.insert(
            entity.to_string(),
            EntityScale { base_count, kind: ScaleKind::Fixed },
        );
        self
    }

    pub fn linear(mut self, entity: &str, base_count: u64) -> Self {
        self.entities.insert(
            entity.to_string(),
            EntityScale { base_count, kind: ScaleKind::Linear },
        );
        self
    }

    pub fn with_override(mut self, entity: &str, count: i64) -> Self {
        self.overrides.insert(entity.to_string(), count);
        self
    }

    /// Resolve every entity to its concrete target count.
    pub fn resolve(&self) -> GenResult<ResolvedCounts> {
        if !(self.factor.is_finite() && self.factor > 0.0) {
            return Err(GenError::Config(format!(
                "scale factor must be > 0, got {}",
                self.factor
            )));
        }

        for (entity, count) in &self.overrides {
            if *count < 0 {
                return Err(GenError::Config(format!(
                    "override for '{entity}' must be >= 0, got {count}"
                )));
            }
            if !self.entities.contains_key(entity) {
                return Err(GenError::Config(format!(
                    "override names unknown entity '{entity}'"
                )));
            }
        }

        let counts = self
            .entities
            .iter()
            .map(|(entity, scale)| {
                let resolved = match self.overrides.get(entity) {
                    Some(count) => *count as u64,
                    None => scaled_count(scale, self.factor),
                };
                (entity.clone(), resolved)
            })
            .collect();

        Ok(ResolvedCounts { counts })
    }
}

fn scaled_count(scale: &EntityScale, factor: f64) -> u64 {
    match scale.kind {
        ScaleKind::Fixed => scale.base_count,
        ScaleKind::Linear => (scale.base_count as f64 * factor).round().max(0.0) as u64,
    }
}

/// Output of the resolver. Computed once per run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCounts {
    counts: BTreeMap<String, u64>,
}

impl ResolvedCounts {
    pub fn get(&self, entity: &str) -> GenResult<u64> {
        self.counts
            .get(entity)
            .copied()
            .ok_or_else(|| GenError::Config(format!("no scale entry for '{entity}'")))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.counts.iter()
    }
}
