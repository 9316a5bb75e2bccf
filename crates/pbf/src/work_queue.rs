//! Persistent worker pool with a single-producer parallel-for queue.
//!
//! The producer fills the queue once per frame and then [`drain`]s it,
//! running items itself alongside the workers. Claiming an item is the only
//! step that takes the lock; items run outside it and bump an atomic
//! completion counter. The producer spins on that counter for the tail of the
//! batch instead of waiting on a second condition variable.
//!
//! [`drain`]: WorkQueue::drain

use std::any::Any;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::physics::MAX_THREAD_COUNT;

/// A unit of work submitted to a [`WorkQueue`].
///
/// Implemented for every `FnOnce() + Send` closure; solver phases with more
/// state implement it on their own job types.
pub trait Job: Send {
    fn run(self: Box<Self>);
}

impl<F: FnOnce() + Send> Job for F {
    fn run(self: Box<Self>) {
        (*self)()
    }
}

struct QueueState {
    items: Vec<Option<Box<dyn Job>>>,
    /// Claim cursor: items before it have been handed out.
    next: usize,
    shutdown: bool,
}

impl QueueState {
    fn claim(&mut self) -> Option<Box<dyn Job>> {
        while self.next < self.items.len() {
            let job = self.items[self.next].take();
            self.next += 1;
            if job.is_some() {
                return job;
            }
        }
        None
    }
}

struct Shared {
    state: Mutex<QueueState>,
    wake: Condvar,
    completed: AtomicUsize,
}

impl Shared {
    // Jobs never run under the lock and a panicking job aborts, so the mutex
    // cannot be poisoned by user code.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims and runs one item. Returns false when nothing was claimable.
    fn run_one(&self) -> bool {
        let job = self.lock().claim();
        match job {
            Some(job) => {
                execute(job);
                self.completed.fetch_add(1, Ordering::Release);
                true
            }
            None => false,
        }
    }
}

fn execute(job: Box<dyn Job>) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || job.run())) {
        log::error!("Work item panicked: {}", panic_message(&*payload));
        std::process::abort();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut state = shared.lock();
            loop {
                if let Some(job) = state.claim() {
                    break job;
                }
                if state.shutdown {
                    return;
                }
                // Checked and waited under the same lock: a drain that
                // broadcasts after our check cannot be missed.
                state = shared.wake.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
        };
        execute(job);
        shared.completed.fetch_add(1, Ordering::Release);
    }
}

/// Fixed pool of worker threads fed by one producer.
///
/// Create one per process and pass it to every phase that needs it.
/// Dropping the queue stops and joins the workers.
pub struct WorkQueue {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkQueue {
    /// One worker per CPU, minus the producer's.
    pub fn new() -> std::io::Result<Self> {
        Self::with_workers(num_cpus::get().saturating_sub(1))
    }

    /// Spawns `count` workers, clamped to `1..MAX_THREAD_COUNT`.
    pub fn with_workers(count: usize) -> std::io::Result<Self> {
        let count = count.clamp(1, MAX_THREAD_COUNT - 1);
        log::info!("Spawning {} worker threads", count);

        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                items: Vec::new(),
                next: 0,
                shutdown: false,
            }),
            wake: Condvar::new(),
            completed: AtomicUsize::new(0),
        });

        let mut queue = Self {
            shared,
            workers: Vec::with_capacity(count),
        };
        for i in 0..count {
            let shared = Arc::clone(&queue.shared);
            let handle = thread::Builder::new()
                .name(format!("pbf-worker-{}", i))
                .spawn(move || worker_loop(shared))?;
            queue.workers.push(handle);
        }
        Ok(queue)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Items submitted since the last reset.
    pub fn len(&self) -> usize {
        self.shared.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items finished since the last reset.
    pub fn completed(&self) -> usize {
        self.shared.completed.load(Ordering::Acquire)
    }

    /// Empties the queue and zeroes the counters.
    ///
    /// Unclaimed items are dropped without running. Items already claimed by
    /// a worker are waited for.
    pub fn reset(&mut self) {
        let claimed = {
            let mut state = self.shared.lock();
            let claimed = state.next;
            state.items.clear();
            state.next = 0;
            claimed
        };
        while self.shared.completed.load(Ordering::Acquire) < claimed {
            std::hint::spin_loop();
        }
        self.shared.completed.store(0, Ordering::Release);
    }

    /// Appends an item. It has run by the time the next
    /// [`drain`](Self::drain) returns, possibly earlier.
    pub fn submit(&mut self, job: impl Job + 'static) {
        self.push(Box::new(job));
    }

    fn push(&mut self, job: Box<dyn Job>) {
        self.shared.lock().items.push(Some(job));
    }

    /// Runs every submitted item to completion.
    ///
    /// Wakes the workers, helps out until nothing is left to claim, then
    /// spins until the completion counter catches up. Returns immediately on
    /// an empty queue.
    pub fn drain(&mut self) {
        let submitted = self.shared.lock().items.len();
        if submitted == 0 {
            return;
        }

        self.shared.wake.notify_all();
        while self.shared.run_one() {}

        while self.shared.completed.load(Ordering::Acquire) < submitted {
            std::hint::spin_loop();
        }
        log::trace!("Drained {} work items", submitted);
    }

    /// Resets the queue, lets `build` submit jobs that may borrow from the
    /// caller, and drains before returning.
    ///
    /// ```
    /// use pbf::WorkQueue;
    ///
    /// let mut queue = WorkQueue::with_workers(2).unwrap();
    /// let mut data = vec![1u32; 1000];
    /// queue.run_batch(|batch| {
    ///     for chunk in data.chunks_mut(100) {
    ///         batch.submit(move || chunk.iter_mut().for_each(|x| *x *= 2));
    ///     }
    /// });
    /// assert!(data.iter().all(|&x| x == 2));
    /// ```
    pub fn run_batch<'env, F>(&mut self, build: F)
    where
        F: FnOnce(&mut Batch<'_, 'env>),
    {
        self.reset();
        let mut batch = Batch {
            queue: self,
            _env: PhantomData,
        };
        build(&mut batch);
        // Dropping the batch drains, also while unwinding out of `build`.
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.wake.notify_all();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("Worker thread exited with a panic");
            }
        }
    }
}

/// Submission handle for [`WorkQueue::run_batch`].
///
/// Jobs may borrow anything that outlives the `run_batch` call.
pub struct Batch<'q, 'env> {
    queue: &'q mut WorkQueue,
    // Invariant in 'env.
    _env: PhantomData<&'env mut &'env ()>,
}

impl<'q, 'env> Batch<'q, 'env> {
    pub fn submit(&mut self, job: impl Job + 'env) {
        let job: Box<dyn Job + 'env> = Box::new(job);
        // SAFETY: the batch drains the queue when dropped and `run_batch`
        // owns the batch, so every job has run and been dropped before
        // 'env can end.
        let job: Box<dyn Job + 'static> = unsafe { std::mem::transmute(job) };
        self.queue.push(job);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Drop for Batch<'_, '_> {
    fn drop(&mut self) {
        self.queue.drain();
    }
}
