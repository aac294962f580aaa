use std::time::Duration;

use crate::Bitmap;
use crate::parallel::{self, CancelToken, Cancelled};

fn random_values(len: usize, limit: u32) -> Vec<u32> {
    (0..len).map(|_| fastrand::u32(..limit)).collect()
}

fn sequential_and(bitmaps: &[&Bitmap]) -> Bitmap {
    let mut acc = bitmaps[0].clone();
    for &bitmap in &bitmaps[1..] {
        acc = acc.and(bitmap);
    }
    acc
}

fn sequential_or(bitmaps: &[&Bitmap]) -> Bitmap {
    let mut acc = bitmaps[0].clone();
    for &bitmap in &bitmaps[1..] {
        acc = acc.or(bitmap);
    }
    acc
}

fn assert_keys_strictly_increasing(bitmap: &Bitmap) {
    for index in 1..bitmap.bucket_count() {
        assert!(
            bitmap.key_at(index - 1) < bitmap.key_at(index),
            "keys out of order at index {index}"
        );
    }
}

#[test]
fn test_zero_inputs_yield_an_empty_bitmap() {
    assert!(parallel::par_and(4, &[]).is_empty());
    assert!(parallel::par_or(4, &[]).is_empty());
}

#[test]
fn test_single_input_yields_an_independent_copy() {
    let source = Bitmap::of(&[1, 2, 100_000]);
    let copy = parallel::par_or(4, &[&source]);
    assert_eq!(copy, source);
    drop(source);
    assert_eq!(copy.iter().collect::<Vec<_>>(), vec![1, 2, 100_000]);
}

#[test]
fn test_par_and_matches_sequential_fold() {
    fastrand::seed(570193482);
    // A shared stripe keeps the four-way intersection non-trivial.
    let stripe: Vec<u32> = (0..200_000u32).step_by(97).collect();
    for round in 0..8 {
        let inputs: Vec<Bitmap> = (0..4)
            .map(|_| {
                let mut values = random_values(20_000, 200_000);
                values.extend_from_slice(&stripe);
                Bitmap::of(&values)
            })
            .collect();
        let refs: Vec<&Bitmap> = inputs.iter().collect();

        let expected = sequential_and(&refs);
        let actual = parallel::par_and(3, &refs);
        assert!(actual.cardinality() >= stripe.len() as u64);
        assert_eq!(actual, expected, "round {round}");
        assert_keys_strictly_increasing(&actual);
    }
}

#[test]
fn test_par_or_matches_sequential_fold() {
    fastrand::seed(826451097);
    for round in 0..8 {
        let mut inputs: Vec<Bitmap> = (0..5)
            .map(|_| Bitmap::of(&random_values(5_000, 1_500_000)))
            .collect();
        if round % 2 == 0 {
            inputs.push(Bitmap::new());
        }
        let refs: Vec<&Bitmap> = inputs.iter().collect();

        let expected = sequential_or(&refs);
        let actual = parallel::par_or(4, &refs);
        assert_eq!(actual, expected, "round {round}");
        assert_keys_strictly_increasing(&actual);
    }
}

#[test]
fn test_aggregation_is_permutation_independent() {
    fastrand::seed(372905816);
    let a = Bitmap::of(&random_values(2_000, 300_000));
    let b = Bitmap::of(&random_values(2_000, 300_000));
    let c = Bitmap::of(&random_values(2_000, 300_000));

    let or_forward = parallel::par_or(2, &[&a, &b, &c]);
    let or_backward = parallel::par_or(2, &[&c, &b, &a]);
    assert_eq!(or_forward, or_backward);

    let and_forward = parallel::par_and(2, &[&a, &b, &c]);
    let and_backward = parallel::par_and(2, &[&c, &b, &a]);
    assert_eq!(and_forward, and_backward);
}

#[test]
fn test_par_and_of_key_disjoint_inputs_is_empty() {
    let low = Bitmap::of(&[1, 2, 3]);
    let high = Bitmap::of(&[(8u32 << 16) | 1]);
    assert!(parallel::par_and(4, &[&low, &high]).is_empty());
}

#[test]
fn test_par_or_with_an_empty_input_equals_the_other() {
    let populated = Bitmap::of(&[5, 9, (2u32 << 16) | 44]);
    let empty = Bitmap::new();
    assert_eq!(parallel::par_or(4, &[&populated, &empty]), populated);
    assert_eq!(parallel::par_or(4, &[&empty, &populated]), populated);
}

#[test]
fn test_intersection_scenarios() {
    let a = Bitmap::of(&[1, 2]);
    let b = Bitmap::of(&[1]);
    let result = parallel::par_and(2, &[&a, &b]);
    assert_eq!(result.iter().collect::<Vec<_>>(), vec![1]);

    let c = Bitmap::of(&[1, 2]);
    let d = Bitmap::of(&[1, 2 + 65536]);
    let result = parallel::par_and(2, &[&c, &d]);
    assert_eq!(result.bucket_count(), 1);
    assert_eq!(result.iter().collect::<Vec<_>>(), vec![1]);
}

#[test]
fn test_union_scenario_spanning_two_keys() {
    let a = Bitmap::of(&[1, 2 + 65536]);
    let b = Bitmap::of(&[1, 10 + 65536]);
    let result = parallel::par_or(2, &[&a, &b]);
    assert_eq!(result.bucket_count(), 2);
    assert_eq!(
        result.iter().collect::<Vec<_>>(),
        vec![1, 2 + 65536, 10 + 65536]
    );
}

#[test]
fn test_many_dispatched_groups_flow_through_bounded_queues() {
    // Far more key groups than either queue holds, on few workers.
    let values: Vec<u32> = (0..2_000u32).map(|key| key << 16).collect();
    let a = Bitmap::of(&values);
    let b = Bitmap::of(&values);
    let result = parallel::par_and(2, &[&a, &b]);
    assert_eq!(result.bucket_count(), 2_000);
    assert_eq!(result, a);
}

#[test]
fn test_many_forwarded_groups_flow_through_the_result_queue() {
    let evens: Vec<u32> = (0..1_000u32).map(|key| (key * 2) << 16).collect();
    let odds: Vec<u32> = (0..1_000u32).map(|key| (key * 2 + 1) << 16).collect();
    let a = Bitmap::of(&evens);
    let b = Bitmap::of(&odds);
    let result = parallel::par_or(3, &[&a, &b]);
    assert_eq!(result.bucket_count(), 2_000);
    assert_eq!(result, a.or(&b));
}

#[test]
fn test_pre_cancelled_token_aborts() {
    let a = Bitmap::of(&[1]);
    let b = Bitmap::of(&[2]);
    let token = CancelToken::new();
    token.cancel();
    assert_eq!(parallel::try_par_or(2, &token, &[&a, &b]), Err(Cancelled));
    assert_eq!(parallel::try_par_and(2, &token, &[&a, &b]), Err(Cancelled));
}

#[test]
fn test_live_token_matches_plain_entry_points() {
    fastrand::seed(651298374);
    let a = Bitmap::of(&random_values(3_000, 400_000));
    let b = Bitmap::of(&random_values(3_000, 400_000));
    let token = CancelToken::new();

    let guarded = parallel::try_par_or(2, &token, &[&a, &b]).unwrap();
    assert_eq!(guarded, parallel::par_or(2, &[&a, &b]));

    let guarded = parallel::try_par_and(2, &token, &[&a, &b]).unwrap();
    assert_eq!(guarded, parallel::par_and(2, &[&a, &b]));
}

#[test]
fn test_expired_deadline_cancels() {
    let token = CancelToken::with_deadline(Duration::ZERO);
    let a = Bitmap::of(&[1]);
    let b = Bitmap::of(&[2]);
    assert_eq!(parallel::try_par_and(2, &token, &[&a, &b]), Err(Cancelled));
}

#[test]
fn test_parallelism_level_does_not_change_the_result() {
    fastrand::seed(109284756);
    let inputs: Vec<Bitmap> = (0..6)
        .map(|_| Bitmap::of(&random_values(2_500, 700_000)))
        .collect();
    let refs: Vec<&Bitmap> = inputs.iter().collect();

    let single = parallel::par_or(1, &refs);
    let eight = parallel::par_or(8, &refs);
    let auto = parallel::par_or(0, &refs);
    assert_eq!(single, eight);
    assert_eq!(single, auto);

    let single = parallel::par_and(1, &refs);
    let auto = parallel::par_and(0, &refs);
    assert_eq!(single, auto);
}
