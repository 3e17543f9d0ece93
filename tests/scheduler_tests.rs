use std::collections::HashSet;

use swarm_quarry::error::SwarmError;
use swarm_quarry::scheduler::grid::{generate_shafts, is_shaft_cell};
use swarm_quarry::scheduler::{ShaftStatus, Swarm};

/// Coordinates of every shaft, whichever set it is in.
fn all_coords(swarm: &Swarm) -> Vec<(u32, u32)> {
    swarm
        .pending()
        .chain(swarm.claimed())
        .chain(swarm.done())
        .map(|s| (s.x, s.z))
        .collect()
}

fn assert_partition(swarm: &Swarm, total: usize) {
    assert_eq!(swarm.total_shafts(), total);
    let coords = all_coords(swarm);
    let unique: HashSet<_> = coords.iter().copied().collect();
    assert_eq!(unique.len(), coords.len(), "a shaft is in two sets");
    assert!(swarm.pending().all(|s| s.status() == ShaftStatus::Pending));
    assert!(swarm
        .claimed()
        .iter()
        .all(|s| s.status() == ShaftStatus::Claimed && s.claimed_by.is_some()));
    assert!(swarm
        .done()
        .iter()
        .all(|s| s.status() == ShaftStatus::Done && s.claimed_by.is_some()));
    assert!(swarm.validate().is_ok());
}

#[test]
fn test_grid_size_matches_filtered_cells() {
    for (w, h) in [(0, 0), (1, 4), (5, 5), (10, 3), (32, 32)] {
        let expected = (0..=w)
            .flat_map(|x| (0..=h).map(move |z| (x, z)))
            .filter(|&(x, z)| is_shaft_cell(x, z))
            .count();
        assert_eq!(generate_shafts(w, h).len(), expected, "{}x{}", w, h);
        assert_eq!(Swarm::new(w, h, "a").pending_count(), expected);
    }
}

#[test]
fn test_scenario_create_claim_finish_twice() {
    let mut swarm = Swarm::new(5, 5, "10.0.0.1");
    assert_eq!(swarm.pending_count(), generate_shafts(5, 5).len());

    let outcome = swarm.claim("t1").unwrap();
    assert_eq!((outcome.shaft.x, outcome.shaft.z), (0, 0));
    assert!(!outcome.done);

    let shaft = swarm.finish(outcome.shaft.x, outcome.shaft.z).unwrap();
    assert_eq!(shaft.status(), ShaftStatus::Done);

    let err = swarm.finish(outcome.shaft.x, outcome.shaft.z).unwrap_err();
    assert!(matches!(err, SwarmError::ShaftNotFound { x: 0, z: 0 }));
    assert_eq!(swarm.done().len(), 1);
}

#[test]
fn test_claims_are_exhaustive_and_distinct() {
    let mut swarm = Swarm::new(12, 9, "a");
    let total = swarm.pending_count();
    let expected: Vec<_> = generate_shafts(12, 9).iter().map(|s| (s.x, s.z)).collect();

    let mut claimed = Vec::new();
    for i in 0..total {
        let outcome = swarm.claim(&format!("t{}", i % 4)).unwrap();
        assert_eq!(outcome.done, i == total - 1);
        claimed.push((outcome.shaft.x, outcome.shaft.z));
    }

    // FIFO: claims come out in generation order
    assert_eq!(claimed, expected);
    assert!(matches!(
        swarm.claim("late"),
        Err(SwarmError::NoRemainingShafts)
    ));
    assert_partition(&swarm, total);
}

#[test]
fn test_last_shaft_reports_done() {
    let mut swarm = Swarm::new(0, 0, "a");
    assert_eq!(swarm.pending_count(), 1);

    let outcome = swarm.claim("t1").unwrap();
    assert!(outcome.done);
    assert!(matches!(swarm.claim("t2"), Err(SwarmError::NoRemainingShafts)));

    // Claims being exhausted does not mean the swarm is finished
    assert!(!swarm.info("q").complete);
    swarm.finish(0, 0).unwrap();
    assert!(swarm.info("q").complete);
}

#[test]
fn test_finish_picks_exact_coordinates() {
    let mut swarm = Swarm::new(5, 5, "a");
    let first = swarm.claim("t1").unwrap().shaft;
    let second = swarm.claim("t2").unwrap().shaft;
    let third = swarm.claim("t3").unwrap().shaft;

    let finished = swarm.finish(second.x, second.z).unwrap();
    assert_eq!(finished.claimed_by.as_deref(), Some("t2"));

    let remaining: Vec<_> = swarm.claimed().iter().map(|s| (s.x, s.z)).collect();
    assert_eq!(remaining, vec![(first.x, first.z), (third.x, third.z)]);

    // swapped coordinates are a different shaft
    assert!(swarm.finish(first.z + 100, first.x).is_err());
}

#[test]
fn test_partition_holds_over_mixed_operations() {
    let mut swarm = Swarm::new(25, 25, "a");
    let total = swarm.total_shafts();

    // Simple LCG so the sequence is reproducible
    let mut seed: u64 = 0x5eed;
    let mut next = || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (seed >> 33) as usize
    };

    for step in 0..500 {
        if next() % 3 != 0 {
            let _ = swarm.claim(&format!("t{}", step % 7));
        } else if !swarm.claimed().is_empty() {
            let pick = next() % swarm.claimed().len();
            let shaft = swarm.claimed()[pick].clone();
            swarm.finish(shaft.x, shaft.z).unwrap();
        } else {
            assert!(swarm.finish(0, 1).is_err());
        }
        assert_partition(&swarm, total);
    }
}

#[test]
fn test_claim_stamps_worker_and_time() {
    let mut swarm = Swarm::new(5, 5, "a");
    let before = chrono::Utc::now() - chrono::Duration::seconds(1);
    let shaft = swarm.claim("turtle-42").unwrap().shaft;

    assert_eq!(shaft.claimed_by.as_deref(), Some("turtle-42"));
    assert!(shaft.claimed_time.unwrap() >= before);
    assert!(shaft.completed_time.is_none());
    assert_eq!(swarm.claimed()[0], shaft);
}
