//! Blocking bounded MPMC channel wiring the aggregation pipeline together.
//!
//! A full queue blocks senders: on the task queue this is the backpressure
//! keeping merge discovery from racing ahead of the workers, and on the
//! result queue it is harmless because the reassembly coordinator drains
//! concurrently. Endpoints are reference counted; dropping the last `Sender`
//! disconnects receivers once the queue drains, and dropping the last
//! `Receiver` fails subsequent sends, so a panicking thread unwinds its peers
//! instead of deadlocking them.

use std::collections::VecDeque;
use std::sync::mpsc::{RecvError, SendError};
use std::sync::{Arc, Condvar, Mutex};

/// Creates a channel holding at most `capacity` queued items.
pub fn bounded<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    assert_ne!(capacity, 0, "queue capacity must be non-zero");
    let shared = Arc::new(Shared {
        state: Mutex::new(QueueState {
            items: VecDeque::new(),
            capacity,
            senders: 1,
            receivers: 1,
        }),
        not_empty: Condvar::new(),
        not_full: Condvar::new(),
    });
    (
        Sender {
            shared: shared.clone(),
        },
        Receiver { shared },
    )
}

struct Shared<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

struct QueueState<T> {
    items: VecDeque<T>,
    capacity: usize,
    senders: usize,
    receivers: usize,
}

impl<T> QueueState<T> {
    fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }
}

/// Producing endpoint; cloneable across threads.
pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Sender<T> {
    /// Enqueues `item`, blocking while the queue is full.
    ///
    /// Returns the item inside [`SendError`] when every receiver is gone.
    pub fn send(&self, item: T) -> Result<(), SendError<T>> {
        let mut state = self.shared.state.lock().unwrap();
        while state.is_full() && state.receivers != 0 {
            state = self.shared.not_full.wait(state).unwrap();
        }
        if state.receivers == 0 {
            return Err(SendError(item));
        }
        state.items.push_back(item);
        drop(state);
        self.shared.not_empty.notify_one();
        Ok(())
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Sender<T> {
        self.shared.state.lock().unwrap().senders += 1;
        Sender {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock().unwrap();
        state.senders -= 1;
        let disconnected = state.senders == 0;
        drop(state);
        if disconnected {
            // Wake receivers parked on an empty queue so they observe it.
            self.shared.not_empty.notify_all();
        }
    }
}

/// Consuming endpoint; cloneable across threads.
pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Receiver<T> {
    /// Dequeues the next item, blocking while the queue is empty.
    ///
    /// Remaining items are still delivered after the senders disconnect;
    /// [`RecvError`] follows once the queue is drained.
    pub fn recv(&self) -> Result<T, RecvError> {
        let mut state = self.shared.state.lock().unwrap();
        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.shared.not_full.notify_one();
                return Ok(item);
            }
            if state.senders == 0 {
                return Err(RecvError);
            }
            state = self.shared.not_empty.wait(state).unwrap();
        }
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Receiver<T> {
        self.shared.state.lock().unwrap().receivers += 1;
        Receiver {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock().unwrap();
        state.receivers -= 1;
        let disconnected = state.receivers == 0;
        drop(state);
        if disconnected {
            // Wake senders parked on a full queue so they observe it.
            self.shared.not_full.notify_all();
        }
    }
}
