//! Parallel n-ary Boolean aggregation over bitmaps.
//!
//! One aggregation call runs a three-stage pipeline inside a single
//! `std::thread::scope`:
//!
//! 1. The calling thread merges the input key sequences through a cursor
//!    heap and routes each key group. Intersection groups missing an input
//!    are dropped, union groups of one bucket are forwarded untouched, and
//!    everything else goes to a bounded task queue.
//! 2. Worker threads fold each dispatched group down to one bucket.
//! 3. A reassembly thread parks out-of-order results in a slot table and
//!    emits the final bitmap in ascending key order.
//!
//! Slots are assigned during the key merge, before any worker finishes, so
//! no stage ever has to sort results.

mod cancel;
mod cursor;
mod group_pool;
mod heap;
mod queue;
mod reassembly;

pub use cancel::{CancelToken, Cancelled};

use std::cmp::Ordering;
use std::panic;
use std::thread;

use crate::bitmap::Bitmap;
use crate::bucket::Bucket;

use cursor::PartitionCursor;
use group_pool::GroupPool;
use heap::MergeHeap;
use queue::{Receiver, Sender};
use reassembly::{ReassemblyMsg, SlotResult};

/// Bound on key groups awaiting a worker; the merge producer blocks here
/// when workers fall behind.
const TASK_QUEUE_CAPACITY: usize = 128;

/// Bound on merged buckets awaiting reassembly.
const RESULT_QUEUE_CAPACITY: usize = 32;

/// Boolean operator applied across aggregation inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    /// Intersection across every input.
    And,
    /// Difference: values of the left input absent from the right.
    AndNot,
    /// Union across every input.
    Or,
}

/// Unions the inputs into a new bitmap using up to `parallelism` worker
/// threads; zero selects one worker per available core.
pub fn par_or(parallelism: usize, bitmaps: &[&Bitmap]) -> Bitmap {
    match aggregate(AggregateOp::Or, parallelism, bitmaps, None) {
        Ok(bitmap) => bitmap,
        Err(Cancelled) => unreachable!("no cancellation token in play"),
    }
}

/// Intersects the inputs into a new bitmap using up to `parallelism` worker
/// threads; zero selects one worker per available core.
pub fn par_and(parallelism: usize, bitmaps: &[&Bitmap]) -> Bitmap {
    match aggregate(AggregateOp::And, parallelism, bitmaps, None) {
        Ok(bitmap) => bitmap,
        Err(Cancelled) => unreachable!("no cancellation token in play"),
    }
}

/// Cancellable [`par_or`]: returns [`Cancelled`] once `cancel` fires, and
/// discards any partial result.
pub fn try_par_or(
    parallelism: usize,
    cancel: &CancelToken,
    bitmaps: &[&Bitmap],
) -> Result<Bitmap, Cancelled> {
    aggregate(AggregateOp::Or, parallelism, bitmaps, Some(cancel))
}

/// Cancellable [`par_and`]: returns [`Cancelled`] once `cancel` fires, and
/// discards any partial result.
pub fn try_par_and(
    parallelism: usize,
    cancel: &CancelToken,
    bitmaps: &[&Bitmap],
) -> Result<Bitmap, Cancelled> {
    aggregate(AggregateOp::And, parallelism, bitmaps, Some(cancel))
}

/// Predicts how many buckets a pairwise aggregation would produce, from the
/// key sequences alone.
///
/// The prediction counts candidate buckets. For OR it is always exact; for
/// AND and AND-NOT it is exact whenever no candidate's payload vanishes,
/// and an upper bound otherwise. AND-NOT candidates are exactly the
/// left-hand buckets: left-only keys pass through unchanged and shared keys
/// yield a difference.
pub fn predict_bucket_count(left: &Bitmap, right: &Bitmap, op: AggregateOp) -> usize {
    match op {
        AggregateOp::And => {
            let Some(mut lhs) = PartitionCursor::new(left) else {
                return 0;
            };
            let Some(mut rhs) = PartitionCursor::new(right) else {
                return 0;
            };
            let mut count = 0;
            loop {
                match lhs.key().cmp(&rhs.key()) {
                    Ordering::Equal => {
                        count += 1;
                        if !lhs.advance() || !rhs.advance() {
                            break;
                        }
                    }
                    Ordering::Less => {
                        if !lhs.seek(rhs.key()) {
                            break;
                        }
                    }
                    Ordering::Greater => {
                        if !rhs.seek(lhs.key()) {
                            break;
                        }
                    }
                }
            }
            count
        }
        AggregateOp::AndNot => left.bucket_count(),
        AggregateOp::Or => {
            let mut count = 0;
            let mut i = 0;
            let mut j = 0;
            while i < left.bucket_count() && j < right.bucket_count() {
                match left.key_at(i).cmp(&right.key_at(j)) {
                    Ordering::Equal => {
                        i += 1;
                        j += 1;
                    }
                    Ordering::Less => i += 1,
                    Ordering::Greater => j += 1,
                }
                count += 1;
            }
            count + (left.bucket_count() - i) + (right.bucket_count() - j)
        }
    }
}

fn worker_count(parallelism: usize) -> usize {
    if parallelism == 0 {
        thread::available_parallelism().map(|n| n.get()).unwrap_or(8)
    } else {
        parallelism
    }
}

/// A key group checked out to a worker. The slot pins the group's place in
/// the output key order before its merged bucket exists.
struct GroupTask<'a> {
    slot: usize,
    key: u16,
    group: Vec<&'a Bucket>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupRoute {
    /// Hand the group to a worker for merging.
    Dispatch,
    /// Send the lone bucket straight to reassembly, no merge needed.
    Forward,
    /// The group cannot contribute to the result.
    Drop,
}

/// Routing policy for a key group of `group_len` buckets drawn from
/// `input_count` inputs.
fn route_group(op: AggregateOp, group_len: usize, input_count: usize) -> GroupRoute {
    match op {
        AggregateOp::And => {
            if group_len == input_count {
                GroupRoute::Dispatch
            } else {
                GroupRoute::Drop
            }
        }
        AggregateOp::Or => {
            if group_len == 1 {
                GroupRoute::Forward
            } else {
                GroupRoute::Dispatch
            }
        }
        AggregateOp::AndNot => unreachable!("and-not groups are never routed"),
    }
}

fn aggregate(
    op: AggregateOp,
    parallelism: usize,
    bitmaps: &[&Bitmap],
    cancel: Option<&CancelToken>,
) -> Result<Bitmap, Cancelled> {
    if cancel.is_some_and(CancelToken::is_cancelled) {
        return Err(Cancelled);
    }
    match bitmaps {
        [] => return Ok(Bitmap::new()),
        &[single] => return Ok(single.clone()),
        _ => {}
    }

    let workers = worker_count(parallelism);
    let pool = GroupPool::new(bitmaps.len());
    let (task_tx, task_rx) = queue::bounded(TASK_QUEUE_CAPACITY);
    let (result_tx, result_rx) = queue::bounded(RESULT_QUEUE_CAPACITY);

    let outcome = thread::scope(|scope| {
        let coordinator = thread::Builder::new()
            .name("bitmap-reassembly".into())
            .spawn_scoped(scope, move || reassembly::collect(result_rx, cancel))
            .expect("spawn reassembly thread");

        for index in 0..workers {
            let tasks = task_rx.clone();
            let results = result_tx.clone();
            let pool = &pool;
            thread::Builder::new()
                .name(format!("bitmap-merge-{index}"))
                .spawn_scoped(scope, move || worker_loop(op, tasks, results, pool))
                .expect("spawn worker thread");
        }
        drop(task_rx);

        drive_merge(op, bitmaps, &pool, &task_tx, &result_tx, cancel);
        drop(task_tx);
        drop(result_tx);

        match coordinator.join() {
            Ok(outcome) => outcome,
            Err(payload) => panic::resume_unwind(payload),
        }
    });
    outcome.ok_or(Cancelled)
}

/// Runs the key merge on the calling thread, routing each group until the
/// heap drains or `cancel` fires.
///
/// On the normal path the handed-out slot count is announced on the result
/// queue once routing ends. On cancellation no total is announced; the
/// coordinator observes the eventual disconnect and abandons its table.
fn drive_merge<'a>(
    op: AggregateOp,
    bitmaps: &[&'a Bitmap],
    pool: &GroupPool<'a>,
    tasks: &Sender<GroupTask<'a>>,
    results: &Sender<ReassemblyMsg>,
    cancel: Option<&CancelToken>,
) {
    let input_count = bitmaps.len();
    let mut heap = MergeHeap::new(bitmaps);
    let mut slot = 0;
    loop {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return;
        }
        let mut group = pool.checkout();
        let Some(key) = heap.next_group(&mut group) else {
            pool.recycle(group);
            break;
        };
        match route_group(op, group.len(), input_count) {
            GroupRoute::Dispatch => {
                tasks
                    .send(GroupTask { slot, key, group })
                    .expect("task queue disconnected before dispatch completed");
                slot += 1;
            }
            GroupRoute::Forward => {
                let bucket = group[0].clone();
                pool.recycle(group);
                results
                    .send(ReassemblyMsg::Result(SlotResult {
                        slot,
                        key,
                        bucket: Some(bucket),
                    }))
                    .expect("result queue disconnected before dispatch completed");
                slot += 1;
            }
            GroupRoute::Drop => pool.recycle(group),
        }
    }
    results
        .send(ReassemblyMsg::ExpectedTotal(slot))
        .expect("result queue disconnected before dispatch completed");
}

/// Worker body: folds dispatched groups until the task queue disconnects.
fn worker_loop<'a>(
    op: AggregateOp,
    tasks: Receiver<GroupTask<'a>>,
    results: Sender<ReassemblyMsg>,
    pool: &GroupPool<'a>,
) {
    while let Ok(task) = tasks.recv() {
        let bucket = match op {
            AggregateOp::And => and_fold(&task.group),
            AggregateOp::Or => Some(or_fold(&task.group)),
            AggregateOp::AndNot => unreachable!("and-not groups are never dispatched"),
        };
        pool.recycle(task.group);
        let message = ReassemblyMsg::Result(SlotResult {
            slot: task.slot,
            key: task.key,
            bucket,
        });
        if results.send(message).is_err() {
            // Reassembly died; its panic propagates at scope join.
            return;
        }
    }
}

/// Intersects a full group down to one bucket; `None` when it empties.
fn and_fold(group: &[&Bucket]) -> Option<Bucket> {
    debug_assert!(group.len() >= 2, "dispatched group holds {} buckets", group.len());
    let mut acc = group[0].intersect(group[1]);
    for &bucket in &group[2..] {
        if acc.cardinality() == 0 {
            return None;
        }
        acc.intersect_with(bucket);
    }
    if acc.cardinality() == 0 {
        None
    } else {
        Some(acc.compact())
    }
}

/// Unions a group into a dense accumulator, then compacts once at the end.
fn or_fold(group: &[&Bucket]) -> Bucket {
    debug_assert!(group.len() >= 2, "dispatched group holds {} buckets", group.len());
    let mut acc = group[0].to_dense();
    for &bucket in &group[1..] {
        acc.lazy_union_with(bucket);
    }
    acc.into_compact()
}
