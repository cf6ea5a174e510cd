//! Uniqueness ledger and the unique value generator built on it.
//!
//! The ledger remembers every value issued per domain ("email",
//! "phone", "account_number", ...) for the current run. Values are kept
//! in issue order so that a failed phase attempt can be unwound back
//! to a checkpoint without touching values issued before it.

use crate::error::{GenError, GenResult};
use std::collections::{BTreeMap, HashSet};

/// Draw budget per requested value.
pub const DEFAULT_ATTEMPT_MULTIPLIER: usize = 20;

#[derive(Debug, Default)]
struct DomainLedger {
    issued: HashSet<String>,
    order: Vec<String>,
}

#[derive(Debug)]
pub struct UniquenessLedger {
    domains: BTreeMap<String, DomainLedger>,
    attempt_multiplier: usize,
}

/// Per-domain issue counts at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerMark {
    lengths: BTreeMap<String, usize>,
}

impl Default for UniquenessLedger {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPT_MULTIPLIER)
    }
}

impl UniquenessLedger {
    pub fn new(attempt_multiplier: usize) -> Self {
        Self {
            domains: BTreeMap::new(),
            attempt_multiplier: attempt_multiplier.max(1),
        }
    }

    /// Produce `count` values never issued before in `domain`.
    ///
    /// Draws from `candidate` until enough fresh values are found or
    /// `count × multiplier` draws are spent. On exhaustion the values
    /// accepted so far stay recorded; the orchestrator unwinds them
    /// through `rollback_to` when it retries the phase.
    pub fn generate_unique<F>(
        &mut self,
        domain: &str,
        count: usize,
        mut candidate: F,
    ) -> GenResult<Vec<String>>
    where
        F: FnMut() -> String,
    {
        let budget = count.saturating_mul(self.attempt_multiplier);
        let ledger = self.domains.entry(domain.to_string()).or_default();
        let mut out = Vec::with_capacity(count);
        let mut draws = 0usize;

        while out.len() < count {
            if draws >= budget {
                return Err(GenError::Exhaustion {
                    domain: domain.to_string(),
                    requested: count,
                    produced: out.len(),
                    attempts: draws,
                });
            }
            draws += 1;
            let value = candidate();
            if ledger.issued.insert(value.clone()) {
                ledger.order.push(value.clone());
                out.push(value);
            }
        }
        Ok(out)
    }

    /// Single-value convenience over `generate_unique`.
    pub fn unique_one<F>(&mut self, domain: &str, candidate: F) -> GenResult<String>
    where
        F: FnMut() -> String,
    {
        let mut values = self.generate_unique(domain, 1, candidate)?;
        Ok(values.remove(0))
    }

    /// Record a value that was produced elsewhere. Returns false when
    /// it was already issued.
    pub fn claim(&mut self, domain: &str, value: &str) -> bool {
        let ledger = self.domains.entry(domain.to_string()).or_default();
        let fresh = ledger.issued.insert(value.to_string());
        if fresh {
            ledger.order.push(value.to_string());
        }
        fresh
    }

    pub fn contains(&self, domain: &str, value: &str) -> bool {
        self.domains
            .get(domain)
            .is_some_and(|d| d.issued.contains(value))
    }

    pub fn issued_count(&self, domain: &str) -> usize {
        self.domains.get(domain).map_or(0, |d| d.order.len())
    }

    pub fn values(&self, domain: &str) -> &[String] {
        self.domains.get(domain).map_or(&[][..], |d| d.order.as_slice())
    }

    pub fn checkpoint(&self) -> LedgerMark {
        LedgerMark {
            lengths: self
                .domains
                .iter()
                .map(|(name, d)| (name.clone(), d.order.len()))
                .collect(),
        }
    }

    /// Forget every value issued after `mark`. Only domains that grew
    /// since the mark are touched. Returns the domains that were reset.
    pub fn rollback_to(&mut self, mark: &LedgerMark) -> Vec<String> {
        let mut reset = Vec::new();
        for (name, ledger) in self.domains.iter_mut() {
            let keep = mark.lengths.get(name).copied().unwrap_or(0);
            if ledger.order.len() > keep {
                for value in ledger.order.drain(keep..) {
                    ledger.issued.remove(&value);
                }
                reset.push(name.clone());
            }
        }
        self.domains.retain(|_, d| !d.order.is_empty());
        reset
    }

    pub fn clear(&mut self) {
        self.domains.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_values_are_distinct() {
        let mut ledger = UniquenessLedger::default();
        let mut n = 0u64;
        let values = ledger
            .generate_unique("code", 50, || {
                n += 1;
                format!("C{}", n % 75)
            })
            .unwrap();
        let set: HashSet<_> = values.iter().collect();
        assert_eq!(values.len(), 50);
        assert_eq!(set.len(), 50);
    }

    #[test]
    fn repeated_calls_never_reissue_within_a_run() {
        let mut ledger = UniquenessLedger::default();
        let mut n = 0u64;
        let mut all = Vec::new();
        for _ in 0..5 {
            all.extend(
                ledger
                    .generate_unique("code", 10, || {
                        n += 1;
                        format!("C{}", n % 60)
                    })
                    .unwrap(),
            );
        }
        let set: HashSet<_> = all.iter().collect();
        assert_eq!(set.len(), all.len());
    }

    #[test]
    fn exhaustion_names_domain_and_shortfall() {
        let mut ledger = UniquenessLedger::new(20);
        let mut flip = false;
        let err = ledger
            .generate_unique("coin", 3, || {
                flip = !flip;
                if flip { "heads".into() } else { "tails".into() }
            })
            .unwrap_err();
        match err {
            GenError::Exhaustion { domain, requested, produced, attempts } => {
                assert_eq!(domain, "coin");
                assert_eq!(requested, 3);
                assert_eq!(produced, 2);
                assert_eq!(attempts, 60);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rollback_forgets_only_values_after_the_mark() {
        let mut ledger = UniquenessLedger::default();
        assert!(ledger.claim("email", "a@x"));
        assert!(ledger.claim("phone", "1"));
        let mark = ledger.checkpoint();
        assert!(ledger.claim("email", "b@x"));
        assert!(ledger.claim("account_number", "99"));

        let reset = ledger.rollback_to(&mark);
        assert_eq!(reset, vec!["account_number".to_string(), "email".to_string()]);
        assert!(ledger.contains("email", "a@x"));
        assert!(!ledger.contains("email", "b@x"));
        assert!(ledger.contains("phone", "1"));
        assert_eq!(ledger.issued_count("account_number"), 0);

        // After a reset the value may be issued again.
        assert!(ledger.claim("email", "b@x"));
    }
}
