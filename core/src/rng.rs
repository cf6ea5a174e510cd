//! Deterministic random number generation.
//!
//! RULE: No generator may call any platform RNG.
//! All randomness flows through GenRng instances derived
//! from the run seed, a stable phase slot and the attempt number.
//!
//!   - Adding a new phase never changes existing phases' streams.
//!   - A retried attempt gets a fresh stream, so it does not replay
//!     the draw that just collided.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use std::collections::HashSet;

/// A named, deterministic RNG for a single phase attempt.
pub struct GenRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl GenRng {
    pub fn new(seed: u64) -> Self {
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        use rand::RngCore;
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::Rng;
        assert!(n > 0, "n must be > 0");
        self.inner.gen_range(0..n)
    }

    /// Roll an integer in [lo, hi] inclusive.
    pub fn range_i64(&mut self, lo: i64, hi: i64) -> i64 {
        use rand::Rng;
        assert!(lo <= hi, "empty range {lo}..={hi}");
        self.inner.gen_range(lo..=hi)
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform float in [lo, hi).
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Triangular distribution over [lo, hi] peaking at `mode`.
    pub fn triangular(&mut self, lo: f64, mode: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        let u = self.next_f64();
        let cut = (mode - lo) / (hi - lo);
        if u < cut {
            lo + (u * (hi - lo) * (mode - lo)).sqrt()
        } else {
            hi - ((1.0 - u) * (hi - lo) * (hi - mode)).sqrt()
        }
    }

    /// Normal draw via Box-Muller.
    pub fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-12);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Pick one element of a non-empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.next_u64_below(items.len() as u64) as usize]
    }

    /// In-place Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_u64_below(i as u64 + 1) as usize;
            items.swap(i, j);
        }
    }

    /// `k` distinct indices from `0..n`, without replacement.
    /// Partial Fisher-Yates; caller guarantees `k <= n`.
    pub fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        assert!(k <= n, "cannot sample {k} of {n}");
        let mut pool: Vec<usize> = (0..n).collect();
        for i in 0..k {
            let j = i + self.next_u64_below((n - i) as u64) as usize;
            pool.swap(i, j);
        }
        pool.truncate(k);
        pool
    }

    /// `k` distinct values from `0..span`, sorted ascending.
    /// Used for timestamp offsets where `span` can be far larger than `k`.
    pub fn sorted_distinct_below(&mut self, span: u64, k: usize) -> Vec<u64> {
        let k = k.min(span as usize);
        let mut seen = HashSet::with_capacity(k);
        while seen.len() < k {
            seen.insert(self.next_u64_below(span));
        }
        let mut out: Vec<u64> = seen.into_iter().collect();
        out.sort_unstable();
        out
    }
}

/// All phase RNGs for a single run, indexed by stable slot.
pub struct RngBank {
    seed: u64,
}

impl RngBank {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Stream for one attempt of one phase. Attempt numbers start at 1.
    pub fn for_phase(&self, slot: PhaseSlot, attempt: u32) -> GenRng {
        let derived = self.seed
            ^ (slot as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
            ^ (attempt as u64).wrapping_mul(0xc2b2_ae3d_27d4_eb4f);
        GenRng::new(derived).with_name(slot.name())
    }
}

/// Stable phase slot assignments.
/// NEVER reorder or remove entries, only append.
/// Reordering changes every phase's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum PhaseSlot {
    Workforce = 0,
    CustomerMaster = 1,
    Banking = 2,
    Engagement = 3,
    Lending = 4,
    Insurance = 5,
    Compliance = 6,
}

impl PhaseSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Workforce => "workforce",
            Self::CustomerMaster => "customer_master",
            Self::Banking => "banking",
            Self::Engagement => "engagement",
            Self::Lending => "lending",
            Self::Insurance => "insurance",
            Self::Compliance => "compliance",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_slot_and_attempt_replays_the_stream() {
        let bank = RngBank::new(42);
        let mut a = bank.for_phase(PhaseSlot::Banking, 1);
        let mut b = bank.for_phase(PhaseSlot::Banking, 1);
        for _ in 0..32 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn retry_attempt_draws_a_fresh_stream() {
        let bank = RngBank::new(42);
        let first: Vec<u64> = {
            let mut r = bank.for_phase(PhaseSlot::Lending, 1);
            (0..8).map(|_| r.next_u64()).collect()
        };
        let second: Vec<u64> = {
            let mut r = bank.for_phase(PhaseSlot::Lending, 2);
            (0..8).map(|_| r.next_u64()).collect()
        };
        assert_ne!(first, second);
    }

    #[test]
    fn sample_indices_are_distinct_and_in_range() {
        let mut rng = GenRng::new(7);
        let picked = rng.sample_indices(100, 40);
        let set: HashSet<_> = picked.iter().copied().collect();
        assert_eq!(picked.len(), 40);
        assert_eq!(set.len(), 40);
        assert!(picked.iter().all(|&i| i < 100));
    }

    #[test]
    fn triangular_stays_in_bounds() {
        let mut rng = GenRng::new(9);
        for _ in 0..1_000 {
            let x = rng.triangular(10.0, 20.0, 50.0);
            assert!((10.0..=50.0).contains(&x));
        }
    }

    #[test]
    fn sorted_distinct_offsets_are_strictly_increasing() {
        let mut rng = GenRng::new(11);
        let offsets = rng.sorted_distinct_below(1_000, 50);
        assert_eq!(offsets.len(), 50);
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    }
}
