//! Delayed job worker: one named thread, one deadline heap.
//!
//! Jobs run serially in deadline order. The thread sleeps on a condvar until
//! the earliest deadline (monotonic `Instant`) or until a new job arrives;
//! there is no polling. Cancellation is cancel-if-not-started.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const DONE: u8 = 2;
const CANCELLED: u8 = 3;

/// Handle to a scheduled job.
#[derive(Clone, Debug)]
pub struct TaskHandle(Arc<AtomicU8>);

impl TaskHandle {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(PENDING)))
    }

    fn cancelled() -> Self {
        Self(Arc::new(AtomicU8::new(CANCELLED)))
    }

    /// Cancel if the job has not started. Returns whether it was cancelled.
    pub fn cancel(&self) -> bool {
        self.0
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Still waiting for its deadline.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire) == PENDING
    }

    /// Finished or cancelled.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self.0.load(Ordering::Acquire), DONE | CANCELLED)
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire) == CANCELLED
    }

    fn start(&self) -> bool {
        self.0
            .compare_exchange(PENDING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn finish(&self) {
        self.0.store(DONE, Ordering::Release);
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Entry {
    at: Instant,
    seq: u64,
    handle: TaskHandle,
    job: Job,
}

// Min-heap on (at, seq).
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other.at.cmp(&self.at).then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}
impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}
impl Eq for Entry {}

#[derive(Default)]
struct Queue {
    heap: BinaryHeap<Entry>,
    seq: u64,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    cvar: Condvar,
}

pub struct ScheduledWorker {
    name: String,
    shared: Arc<Shared>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ScheduledWorker {
    /// Spawn the worker thread.
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            cvar: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let thread_name = name.to_string();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(&worker_shared, &thread_name))?;
        Ok(Self {
            name: name.to_string(),
            shared,
            thread: Mutex::new(Some(thread)),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `job` once `delay` has elapsed. After shutdown the returned handle
    /// is already cancelled and the job is dropped.
    pub fn schedule<F>(&self, delay: Duration, job: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let mut q = self.shared.queue.lock();
        if q.shutdown {
            return TaskHandle::cancelled();
        }
        let handle = TaskHandle::new();
        q.seq += 1;
        let seq = q.seq;
        q.heap.push(Entry {
            at: Instant::now() + delay,
            seq,
            handle: handle.clone(),
            job: Box::new(job),
        });
        drop(q);
        self.shared.cvar.notify_one();
        handle
    }

    /// Jobs still waiting for their deadline.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared
            .queue
            .lock()
            .heap
            .iter()
            .filter(|e| !e.handle.is_done())
            .count()
    }

    /// Stop the thread. Queued jobs are abandoned (their handles report
    /// cancelled); a job already running is allowed to finish.
    pub fn shutdown(&self) {
        {
            let mut q = self.shared.queue.lock();
            q.shutdown = true;
            for e in q.heap.drain() {
                e.handle.cancel();
            }
        }
        self.shared.cvar.notify_all();
        let Some(thread) = self.thread.lock().take() else {
            return;
        };
        // a job calling shutdown on its own worker must not join itself
        if thread.thread().id() == thread::current().id() {
            return;
        }
        if thread.join().is_err() {
            tracing::warn!(target: "jobs", worker = %self.name, "worker thread panicked");
        }
    }
}

impl Drop for ScheduledWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(shared: &Shared, name: &str) {
    loop {
        let entry = {
            let mut q = shared.queue.lock();
            loop {
                if q.shutdown {
                    return;
                }
                match q.heap.peek().map(|e| e.at) {
                    None => shared.cvar.wait(&mut q),
                    Some(at) if at <= Instant::now() => break,
                    Some(at) => {
                        let _ = shared.cvar.wait_until(&mut q, at);
                    }
                }
            }
            q.heap.pop()
        };
        let Some(entry) = entry else { continue };
        if !entry.handle.start() {
            continue;
        }
        if panic::catch_unwind(AssertUnwindSafe(entry.job)).is_err() {
            tracing::error!(target: "jobs", worker = name, "scheduled job panicked");
        }
        entry.handle.finish();
    }
}
