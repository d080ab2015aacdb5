use mc3_engine::ladder::{rank_order, HeatLadder, HEAT_FLOOR};
use proptest::prelude::*;

#[test]
fn high_rates_widen_and_low_rates_shrink_their_gaps() {
    let mut ladder = HeatLadder::from_delta(4, 0.2, 0.23);
    for _ in 0..10 {
        ladder.record_attempt(0, 1, true);
    }
    for _ in 0..10 {
        ladder.record_attempt(1, 2, false);
    }
    ladder.record_attempt(2, 3, true);
    ladder.record_attempt(3, 2, true);

    let heats = ladder.heats().to_vec();
    let widened = (heats[0] - heats[1]) * 2.0;
    let shrunk = (heats[1] - heats[2]) / 2.0;
    let kept = heats[2] - heats[3];

    let tuned = ladder.tuned_heats();
    assert_eq!(tuned[0], 1.0);
    assert!((tuned[1] - (1.0 - widened)).abs() < 1e-12);
    assert!((tuned[2] - (1.0 - widened - shrunk)).abs() < 1e-12);
    assert!((tuned[3] - (1.0 - widened - shrunk - kept)).abs() < 1e-12);
}

#[test]
fn quiet_epochs_leave_the_ladder_alone() {
    let ladder = HeatLadder::from_delta(5, 0.15, 0.23);
    let tuned = ladder.tuned_heats();
    for (chain, heat) in ladder.heats().iter().enumerate() {
        assert!((tuned[chain] - heat).abs() < 1e-12);
    }
}

#[test]
fn two_attempts_are_too_few_to_move_a_gap() {
    let mut ladder = HeatLadder::from_delta(3, 0.2, 0.23);
    ladder.record_attempt(0, 1, true);
    ladder.record_attempt(1, 0, true);
    let tuned = ladder.tuned_heats();
    for (chain, heat) in ladder.heats().iter().enumerate() {
        assert!((tuned[chain] - heat).abs() < 1e-12);
    }
}

#[test]
fn crossing_the_floor_reinterpolates_geometrically() {
    let mut ladder = HeatLadder::from_heats(vec![1.0, 0.5, 0.25], 0.23).unwrap();
    for _ in 0..10 {
        ladder.record_attempt(0, 1, true);
    }
    let tuned = ladder.tuned_heats();
    assert_eq!(tuned[0], 1.0);
    assert!((tuned[1] - 0.1).abs() < 1e-12, "mid heat {}", tuned[1]);
    assert!((tuned[2] - HEAT_FLOOR).abs() < 1e-12, "floor heat {}", tuned[2]);
}

#[test]
fn two_chain_floor_crossings_land_exactly_on_the_floor() {
    let mut ladder = HeatLadder::from_heats(vec![1.0, 0.2], 0.23).unwrap();
    for _ in 0..10 {
        ladder.record_attempt(0, 1, true);
    }
    let tuned = ladder.tuned_heats();
    assert_eq!(tuned[0], 1.0);
    assert!((tuned[1] - HEAT_FLOOR).abs() < 1e-12);
}

#[test]
fn tuned_heats_are_indexed_by_chain_not_rank() {
    let mut ladder = HeatLadder::from_delta(3, 0.2, 0.23);
    let swapped = vec![ladder.heat_of(1), ladder.heat_of(0), ladder.heat_of(2)];
    ladder.apply_heats(swapped).unwrap();
    assert_eq!(ladder.cold_chain(), 1);
    let tuned = ladder.tuned_heats();
    assert_eq!(tuned[1], 1.0);
    assert!(tuned[0] > tuned[2]);
}

#[test]
fn tune_applies_the_proposal_and_opens_a_fresh_epoch() {
    let mut ladder = HeatLadder::from_delta(4, 0.2, 0.23);
    for _ in 0..20 {
        ladder.record_attempt(0, 1, true);
        ladder.record_attempt(1, 2, false);
    }
    let expected = ladder.tuned_heats();
    ladder.tune();
    assert_eq!(ladder.heats(), expected.as_slice());
    assert_eq!(ladder.statistics().total_attempted(), 0);
    assert_eq!(ladder.statistics().total_accepted(), 0);
}

#[test]
fn statistics_combine_both_directions_of_a_pair() {
    let mut ladder = HeatLadder::from_delta(3, 0.2, 0.23);
    ladder.record_attempt(0, 1, true);
    ladder.record_attempt(1, 0, false);
    ladder.record_attempt(1, 0, true);
    let stats = ladder.statistics();
    assert_eq!(stats.attempted_between(0, 1), 3);
    assert_eq!(stats.accepted_between(1, 0), 2);
    assert_eq!(stats.total_attempted(), 3);
    assert_eq!(stats.total_accepted(), 2);
}

proptest! {
    #[test]
    fn tuned_ladders_stay_positive_ordered_and_cold_anchored(
        chains in 2usize..7,
        delta in 0.05f64..1.5,
        counts in proptest::collection::vec((0u64..40, 0u64..40), 6),
    ) {
        let mut ladder = HeatLadder::from_delta(chains, delta, 0.23);
        for (rank, &(attempts, accepts)) in counts.iter().take(chains - 1).enumerate() {
            let accepts = accepts.min(attempts);
            for i in 0..attempts {
                ladder.record_attempt(rank, rank + 1, i < accepts);
            }
        }
        let tuned = ladder.tuned_heats();
        let order = rank_order(&tuned);
        prop_assert_eq!(tuned[order[0]], 1.0);
        for pair in order.windows(2) {
            prop_assert!(tuned[pair[0]] > tuned[pair[1]]);
        }
        for &heat in &tuned {
            prop_assert!(heat >= HEAT_FLOOR - 1e-12);
        }
    }
}
