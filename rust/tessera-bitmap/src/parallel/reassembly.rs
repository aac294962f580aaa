//! Slot-addressed reassembly of worker results into one ordered bitmap.

use crate::bitmap::Bitmap;
use crate::bucket::Bucket;

use super::cancel::CancelToken;
use super::queue::Receiver;

/// One worker's verdict for a slot: the merged bucket, or `None` when the
/// group folded down to nothing and the slot stays out of the result.
#[derive(Debug)]
pub struct SlotResult {
    pub slot: usize,
    pub key: u16,
    pub bucket: Option<Bucket>,
}

/// Traffic on the result queue. Workers send `Result`; the dispatcher sends
/// a single `ExpectedTotal` once it knows how many slots were handed out.
#[derive(Debug)]
pub enum ReassemblyMsg {
    Result(SlotResult),
    ExpectedTotal(usize),
}

#[derive(Debug)]
enum SlotEntry {
    Pending,
    Absent,
    Ready { key: u16, bucket: Bucket },
}

/// Drains the result queue until every handed-out slot has reported, then
/// walks the slot table in order and appends the surviving buckets.
///
/// Slots arrive out of order, so results are parked in a table indexed by
/// slot until both completion conditions hold: the expected total is known
/// and that many results have landed. Returns `None` only when the queue
/// disconnects under an observed cancellation; any other early disconnect
/// is a protocol violation and panics.
pub fn collect(results: Receiver<ReassemblyMsg>, cancel: Option<&CancelToken>) -> Option<Bitmap> {
    let mut table: Vec<SlotEntry> = Vec::new();
    let mut received = 0usize;
    let mut expected: Option<usize> = None;

    loop {
        match results.recv() {
            Ok(ReassemblyMsg::Result(result)) => {
                let slot = result.slot;
                if slot >= table.len() {
                    table.resize_with(slot + 1, || SlotEntry::Pending);
                }
                if !matches!(table[slot], SlotEntry::Pending) {
                    panic!("slot {slot} written twice");
                }
                table[slot] = match result.bucket {
                    Some(bucket) => SlotEntry::Ready {
                        key: result.key,
                        bucket,
                    },
                    None => SlotEntry::Absent,
                };
                received += 1;
                if expected == Some(received) {
                    return Some(emit(table, received));
                }
            }
            Ok(ReassemblyMsg::ExpectedTotal(total)) => {
                if expected.is_some() {
                    panic!("expected slot count signaled twice");
                }
                if received > total {
                    panic!("received {received} results for {total} slots");
                }
                expected = Some(total);
                if received == total {
                    return Some(emit(table, received));
                }
            }
            Err(_) => {
                if cancel.is_some_and(CancelToken::is_cancelled) {
                    return None;
                }
                panic!("result queue disconnected before reassembly completed");
            }
        }
    }
}

fn emit(table: Vec<SlotEntry>, total: usize) -> Bitmap {
    assert_eq!(
        table.len(),
        total,
        "slot table holds {} entries for {} slots",
        table.len(),
        total
    );
    let mut bitmap = Bitmap::new();
    for (slot, entry) in table.into_iter().enumerate() {
        match entry {
            SlotEntry::Pending => panic!("slot {slot} still pending at completion"),
            SlotEntry::Absent => {}
            SlotEntry::Ready { key, bucket } => bitmap.push_bucket(key, bucket),
        }
    }
    bitmap
}
