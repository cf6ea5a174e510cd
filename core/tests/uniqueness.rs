//! Uniqueness ledger: distinct values within a run, bounded draws.

use demobank_core::{rng::GenRng, GenError, UniquenessLedger};
use std::collections::HashSet;

#[test]
fn repeated_generation_never_repeats_a_value() {
    let mut ledger = UniquenessLedger::default();
    let mut rng = GenRng::new(11);
    let mut seen = HashSet::new();
    for _ in 0..5 {
        let batch = ledger
            .generate_unique("phone", 200, || format!("555-{:04}", rng.next_u64_below(10_000)))
            .unwrap();
        assert_eq!(batch.len(), 200);
        for value in batch {
            assert!(seen.insert(value), "value issued twice");
        }
    }
    assert_eq!(ledger.issued_count("phone"), 1000);
}

#[test]
fn exhaustion_names_the_domain_and_shortfall() {
    let mut ledger = UniquenessLedger::new(20);
    let mut rng = GenRng::new(3);
    let err = ledger
        .generate_unique("branch_code", 20, || format!("BR{}", rng.next_u64_below(5)))
        .unwrap_err();
    match err {
        GenError::Exhaustion { domain, requested, produced, attempts } => {
            assert_eq!(domain, "branch_code");
            assert_eq!(requested, 20);
            assert_eq!(produced, 5);
            assert_eq!(attempts, 400);
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
}
