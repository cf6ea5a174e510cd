//! Shared sampling primitives used by every domain generator.
//!
//! RULE: every "type/status/channel mix" goes through WeightedTable.
//! Domain modules never hand-roll a cumulative walk.

use crate::{
    error::{GenError, GenResult},
    rng::GenRng,
};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Tolerance for weights summing to 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedEntry<T> {
    pub label: T,
    pub weight: f64,
}

/// A categorical distribution: labels with probabilities summing to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightedTable<T> {
    entries: Vec<WeightedEntry<T>>,
}

impl<T: Clone> WeightedTable<T> {
    pub fn new(pairs: impl IntoIterator<Item = (T, f64)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(label, weight)| WeightedEntry { label, weight })
                .collect(),
        }
    }

    /// Configuration-time check. `name` identifies the table in the error.
    pub fn validate(&self, name: &str) -> GenResult<()> {
        let fail = |reason: String| GenError::Distribution {
            table: name.to_string(),
            reason,
        };
        if self.entries.is_empty() {
            return Err(fail("table has no entries".into()));
        }
        if let Some(bad) = self
            .entries
            .iter()
            .find(|e| !e.weight.is_finite() || e.weight < 0.0)
        {
            return Err(fail(format!("invalid weight {}", bad.weight)));
        }
        let total: f64 = self.entries.iter().map(|e| e.weight).sum();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(fail(format!("weights sum to {total}, expected 1.0")));
        }
        Ok(())
    }

    /// Draw u in [0,1) and return the first label whose cumulative
    /// weight exceeds it.
    pub fn sample(&self, rng: &mut GenRng) -> T {
        let roll = rng.next_f64();
        let mut cumulative = 0.0;
        for entry in &self.entries {
            cumulative += entry.weight;
            if roll < cumulative {
                return entry.label.clone();
            }
        }
        // Float tail: cumulative may land a hair under 1.0.
        self.entries[self.entries.len() - 1].label.clone()
    }

    /// Exactly `n` labels whose counts match the weights as closely as
    /// integers allow (largest remainder), in shuffled order.
    pub fn apportion(&self, n: usize, rng: &mut GenRng) -> Vec<T> {
        let quotas: Vec<f64> = self.entries.iter().map(|e| e.weight * n as f64).collect();
        let mut counts: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();
        let assigned: usize = counts.iter().sum();

        let mut by_remainder: Vec<usize> = (0..self.entries.len()).collect();
        by_remainder.sort_by(|&a, &b| {
            let ra = quotas[a] - quotas[a].floor();
            let rb = quotas[b] - quotas[b].floor();
            rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
        });
        for &idx in by_remainder.iter().take(n.saturating_sub(assigned)) {
            counts[idx] += 1;
        }

        let mut labels = Vec::with_capacity(n);
        for (entry, count) in self.entries.iter().zip(counts) {
            labels.extend(std::iter::repeat(entry.label.clone()).take(count));
        }
        rng.shuffle(&mut labels);
        labels
    }

    pub fn labels(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.label)
    }

    pub fn weights(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|e| e.weight)
    }
}

/// Closed numeric range for amounts, rates and durations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn validate(&self, name: &str) -> GenResult<()> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min > self.max {
            return Err(GenError::Config(format!(
                "range '{name}' is invalid: [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn uniform(&self, rng: &mut GenRng) -> f64 {
        rng.uniform(self.min, self.max)
    }

    /// Triangular draw peaking at `mode_frac` of the way through the range.
    pub fn triangular(&self, mode_frac: f64, rng: &mut GenRng) -> f64 {
        let mode = self.min + (self.max - self.min) * mode_frac.clamp(0.0, 1.0);
        rng.triangular(self.min, mode, self.max)
    }
}

/// Round to cents.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Round to four decimal places (rates, probabilities).
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

pub fn validate_ratio(name: &str, ratio: f64) -> GenResult<()> {
    if !(0.0..=1.0).contains(&ratio) {
        return Err(GenError::Config(format!(
            "ratio '{name}' must be within [0, 1], got {ratio}"
        )));
    }
    Ok(())
}

/// Participation: exactly `round(ratio × len)` distinct members of
/// `population`, sampled without replacement.
pub fn participants<T: Clone>(population: &[T], ratio: f64, rng: &mut GenRng) -> GenResult<Vec<T>> {
    validate_ratio("participation", ratio)?;
    Ok(draw_share(population, ratio, rng))
}

/// Multiplicity: the subset of already-selected participants that
/// receives a second downstream record. Same sampling rule, applied
/// to the participant list rather than the full population.
pub fn repeaters<T: Clone>(participants_: &[T], ratio: f64, rng: &mut GenRng) -> GenResult<Vec<T>> {
    validate_ratio("multiplicity", ratio)?;
    Ok(draw_share(participants_, ratio, rng))
}

fn draw_share<T: Clone>(items: &[T], ratio: f64, rng: &mut GenRng) -> Vec<T> {
    let k = (((items.len() as f64) * ratio).round() as usize).min(items.len());
    rng.sample_indices(items.len(), k)
        .into_iter()
        .map(|i| items[i].clone())
        .collect()
}

// ── Chronology ────────────────────────────────────────────────────
//
// Every occurrence date derived from an upstream date lands in
// [upstream, now]. Offsets that would overshoot are clamped to now.

/// A moment uniformly within the last `days` days before `now`.
pub fn within_last_days(now: NaiveDateTime, days: i64, rng: &mut GenRng) -> NaiveDateTime {
    let span = (days.max(0) * 86_400) as u64;
    if span == 0 {
        return now;
    }
    now - Duration::seconds(rng.next_u64_below(span) as i64)
}

/// `upstream` plus a uniform offset of `min_days..=max_days` days,
/// clamped into `[upstream, now]`.
pub fn offset_after(
    upstream: NaiveDateTime,
    min_days: i64,
    max_days: i64,
    now: NaiveDateTime,
    rng: &mut GenRng,
) -> NaiveDateTime {
    debug_assert!(upstream <= now, "upstream {upstream} is after now {now}");
    let days = rng.range_i64(min_days.max(0), max_days.max(min_days.max(0)));
    let seconds = rng.next_u64_below(86_400) as i64;
    clamp_chronology(upstream + Duration::days(days) + Duration::seconds(seconds), upstream, now)
}

/// A uniform moment in `[upstream, min(upstream + max_days, now)]`.
pub fn between(
    upstream: NaiveDateTime,
    max_days: i64,
    now: NaiveDateTime,
    rng: &mut GenRng,
) -> NaiveDateTime {
    let upper = (upstream + Duration::days(max_days.max(0))).min(now);
    let span = (upper - upstream).num_seconds();
    if span <= 0 {
        return upstream;
    }
    upstream + Duration::seconds(rng.next_u64_below(span as u64 + 1) as i64)
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn clamp_chronology(
    candidate: NaiveDateTime,
    upstream: NaiveDateTime,
    now: NaiveDateTime,
) -> NaiveDateTime {
    candidate.max(upstream).min(now.max(upstream))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mix() -> WeightedTable<&'static str> {
        WeightedTable::new([("a", 0.40), ("b", 0.30), ("c", 0.20), ("d", 0.10)])
    }

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn weights_must_sum_to_one() {
        assert!(mix().validate("mix").is_ok());
        let short = WeightedTable::new([("a", 0.5), ("b", 0.3)]);
        assert!(matches!(
            short.validate("short"),
            Err(GenError::Distribution { .. })
        ));
        let negative = WeightedTable::new([("a", 1.5), ("b", -0.5)]);
        assert!(negative.validate("negative").is_err());
        let empty: WeightedTable<&str> = WeightedTable::new([]);
        assert!(empty.validate("empty").is_err());
    }

    #[test]
    fn sampling_converges_to_weights_chi_square() {
        let table = mix();
        let mut rng = GenRng::new(2024);
        let draws = 10_000;
        let mut observed = [0usize; 4];
        for _ in 0..draws {
            let idx = match table.sample(&mut rng) {
                "a" => 0,
                "b" => 1,
                "c" => 2,
                _ => 3,
            };
            observed[idx] += 1;
        }
        let chi2: f64 = observed
            .iter()
            .zip(table.weights())
            .map(|(&o, w)| {
                let expected = w * draws as f64;
                (o as f64 - expected).powi(2) / expected
            })
            .sum();
        // df = 3, p = 0.001 critical value.
        assert!(chi2 < 16.27, "chi-square {chi2:.2} too large: {observed:?}");
    }

    #[test]
    fn apportion_hits_exact_total() {
        let mut rng = GenRng::new(5);
        for n in [0, 1, 7, 15, 150, 151] {
            let labels = mix().apportion(n, &mut rng);
            assert_eq!(labels.len(), n);
        }
        let labels = mix().apportion(100, &mut rng);
        assert_eq!(labels.iter().filter(|l| **l == "a").count(), 40);
        assert_eq!(labels.iter().filter(|l| **l == "d").count(), 10);
    }

    #[test]
    fn participation_then_multiplicity_from_1200() {
        let population: Vec<u32> = (0..1_200).collect();
        let mut rng = GenRng::new(77);
        let chosen = participants(&population, 0.40, &mut rng).unwrap();
        assert_eq!(chosen.len(), 480);
        let unique: std::collections::HashSet<_> = chosen.iter().collect();
        assert_eq!(unique.len(), 480);

        let seconds = repeaters(&chosen, 0.25, &mut rng).unwrap();
        assert_eq!(seconds.len(), 120);
        let chosen_set: std::collections::HashSet<_> = chosen.iter().collect();
        assert!(seconds.iter().all(|s| chosen_set.contains(s)));
        let unique_seconds: std::collections::HashSet<_> = seconds.iter().collect();
        assert_eq!(unique_seconds.len(), 120);
    }

    #[test]
    fn ratio_above_one_is_rejected() {
        let mut rng = GenRng::new(1);
        assert!(participants(&[1, 2, 3], 1.5, &mut rng).is_err());
        assert!(repeaters(&[1, 2, 3], 1.5, &mut rng).is_err());
    }

    #[test]
    fn participation_and_multiplicity_draw_alike() {
        // Half of three rounds up for both; the same stream draws the same members.
        let items = [10, 20, 30];
        let a = participants(&items, 0.5, &mut GenRng::new(9)).unwrap();
        let b = repeaters(&items, 0.5, &mut GenRng::new(9)).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a, b);
        assert_eq!(repeaters(&items, 1.0, &mut GenRng::new(9)).unwrap().len(), 3);
    }

    #[test]
    fn offsets_never_precede_upstream_nor_pass_now() {
        let mut rng = GenRng::new(3);
        let now = at(2025, 6, 1);
        let upstream = at(2025, 5, 20);
        for _ in 0..500 {
            let d = offset_after(upstream, 1, 365, now, &mut rng);
            assert!(d >= upstream && d <= now);
            let b = between(upstream, 30, now, &mut rng);
            assert!(b >= upstream && b <= now);
        }
    }
}
