use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Lifecycle of a work item. Transitions only run forward, and `Started` to
/// `Completed` is performed by exactly the worker that claimed the item.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WorkStatus {
    NotStarted,
    Started,
    Completed,
}

/// One queued unit of work together with its lifecycle status.
struct Work<T> {
    payload: T,
    status: WorkStatus,
}

struct QueueState<T> {
    pending: VecDeque<Work<T>>,
    /// Submitted items that have not finished yet, claimed or not.
    outstanding: usize,
}

/// Shared work pile: producers submit opaque items, workers claim them one
/// at a time until the queue drains. All access funnels through one mutex;
/// the condvar wakes dispatchers waiting for the outstanding count to
/// reach zero.
pub struct WorkQueue<T> {
    state: Mutex<QueueState<T>>,
    all_done: Condvar,
}

impl<T> WorkQueue<T> {
    pub fn new() -> WorkQueue<T> {
        WorkQueue {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                outstanding: 0,
            }),
            all_done: Condvar::new(),
        }
    }

    pub fn submit(&self, payload: T) {
        let mut state = self.state.lock().expect("Poisoned lock!");
        state.pending.push_back(Work {
            payload,
            status: WorkStatus::NotStarted,
        });
        state.outstanding += 1;
    }

    /// Pops the next queued item, marking it `Started` for the caller.
    /// `None` when nothing is queued (other workers may still be busy).
    pub fn try_claim(&self) -> Option<ClaimedWork<'_, T>> {
        let work = {
            let mut state = self.state.lock().expect("Poisoned lock!");
            state.pending.pop_front()?
        };
        debug_assert!(work.status == WorkStatus::NotStarted);
        Some(ClaimedWork {
            queue: self,
            payload: work.payload,
            status: WorkStatus::Started,
        })
    }

    /// Number of submitted items that have not completed yet.
    pub fn poll_outstanding(&self) -> usize {
        self.state.lock().expect("Poisoned lock!").outstanding
    }

    /// Blocks until every submitted item has completed.
    pub fn wait_idle(&self) {
        let mut state = self.state.lock().expect("Poisoned lock!");
        while state.outstanding > 0 {
            state = self.all_done.wait(state).expect("Poisoned lock!");
        }
    }

    fn finish_one(&self) {
        let mut state = self.state.lock().expect("Poisoned lock!");
        state.outstanding -= 1;
        if state.outstanding == 0 {
            self.all_done.notify_all();
        }
    }
}

/// A claimed item. Call [`ClaimedWork::complete`] when done; dropping
/// without completing (a panicking worker) still releases the outstanding
/// count so the dispatcher cannot deadlock.
pub struct ClaimedWork<'q, T> {
    queue: &'q WorkQueue<T>,
    payload: T,
    status: WorkStatus,
}

impl<T> ClaimedWork<'_, T> {
    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn status(&self) -> WorkStatus {
        self.status
    }

    pub fn complete(mut self) {
        self.status = WorkStatus::Completed;
        // Drop releases the outstanding count
    }
}

impl<T> Drop for ClaimedWork<'_, T> {
    fn drop(&mut self) {
        self.queue.finish_one();
    }
}
