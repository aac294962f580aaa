use crate::Bitmap;
use crate::parallel::{AggregateOp, predict_bucket_count};

fn keyed_bitmap(keys: &[u16], pos: u16) -> Bitmap {
    let values: Vec<u32> = keys
        .iter()
        .map(|&key| ((key as u32) << 16) | pos as u32)
        .collect();
    Bitmap::of(&values)
}

fn random_keys(limit: u16) -> Vec<u16> {
    (0..fastrand::usize(1..200))
        .map(|_| fastrand::u16(..limit))
        .collect()
}

#[test]
fn test_prediction_concrete_scenarios() {
    let a = Bitmap::of(&[1, 2]);
    let b = Bitmap::of(&[1]);
    assert_eq!(predict_bucket_count(&a, &b, AggregateOp::And), 1);
    assert_eq!(predict_bucket_count(&a, &b, AggregateOp::Or), 1);

    let c = Bitmap::of(&[1, 2 + 65536]);
    let d = Bitmap::of(&[1, 10 + 65536]);
    // Both keys are shared, so AND predicts two candidates even though the
    // key-1 payloads are disjoint and the actual result has one bucket.
    assert_eq!(predict_bucket_count(&c, &d, AggregateOp::And), 2);
    assert_eq!(c.and(&d).bucket_count(), 1);
    assert_eq!(predict_bucket_count(&c, &d, AggregateOp::Or), 2);
}

#[test]
fn test_and_not_prediction_counts_left_buckets() {
    let left = Bitmap::of(&[1, 65536 + 5, 3 * 65536 + 9]);
    let right = Bitmap::of(&[65536 + 5]);
    assert_eq!(predict_bucket_count(&left, &right, AggregateOp::AndNot), 3);
    // The key-1 bucket is fully erased, so the candidate count overshoots.
    assert_eq!(left.and_not(&right).bucket_count(), 2);
}

#[test]
fn test_and_prediction_exact_when_payloads_cannot_vanish() {
    fastrand::seed(734905182);
    for round in 0..20 {
        // Every bucket holds position 0, so shared keys always intersect.
        let left = keyed_bitmap(&random_keys(1_000), 0);
        let right = keyed_bitmap(&random_keys(1_000), 0);
        let predicted = predict_bucket_count(&left, &right, AggregateOp::And);
        assert_eq!(predicted, left.and(&right).bucket_count(), "round {round}");
    }
}

#[test]
fn test_and_not_prediction_exact_when_payloads_cannot_vanish() {
    fastrand::seed(365820917);
    for round in 0..20 {
        // Right-hand payloads never touch position 0, so no left bucket is
        // ever erased.
        let left = keyed_bitmap(&random_keys(1_000), 0);
        let right = keyed_bitmap(&random_keys(1_000), 1);
        let predicted = predict_bucket_count(&left, &right, AggregateOp::AndNot);
        assert_eq!(
            predicted,
            left.and_not(&right).bucket_count(),
            "round {round}"
        );
    }
}

#[test]
fn test_or_prediction_is_always_exact() {
    fastrand::seed(481203675);
    for round in 0..20 {
        let left = Bitmap::of(&(0..600).map(|_| fastrand::u32(..2_000_000)).collect::<Vec<_>>());
        let right = Bitmap::of(&(0..600).map(|_| fastrand::u32(..2_000_000)).collect::<Vec<_>>());
        let predicted = predict_bucket_count(&left, &right, AggregateOp::Or);
        assert_eq!(predicted, left.or(&right).bucket_count(), "round {round}");
    }
}

#[test]
fn test_prediction_empty_edges() {
    let empty = Bitmap::new();
    let some = Bitmap::of(&[1, 70_000]);
    for op in [AggregateOp::And, AggregateOp::AndNot, AggregateOp::Or] {
        assert_eq!(predict_bucket_count(&empty, &empty, op), 0);
    }
    assert_eq!(predict_bucket_count(&empty, &some, AggregateOp::And), 0);
    assert_eq!(predict_bucket_count(&some, &empty, AggregateOp::And), 0);
    assert_eq!(predict_bucket_count(&empty, &some, AggregateOp::AndNot), 0);
    assert_eq!(predict_bucket_count(&some, &empty, AggregateOp::AndNot), 2);
    assert_eq!(predict_bucket_count(&empty, &some, AggregateOp::Or), 2);
    assert_eq!(predict_bucket_count(&some, &empty, AggregateOp::Or), 2);
}
