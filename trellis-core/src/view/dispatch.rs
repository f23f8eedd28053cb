//! Main-thread dispatch
//!
//! Cores may only be touched from one designated main thread. Property
//! writes can happen anywhere, so core work that originates on another
//! thread is handed to a [`Dispatcher`] and runs later on the main thread.
//!
//! Two dispatchers ship with the crate:
//!
//! - [`QueueDispatcher`]: a plain queue the host pumps by calling
//!   [`run_pending`](QueueDispatcher::run_pending) from its own loop.
//! - [`TokioDispatcher`]: a tokio channel drained by a [`DispatchLoop`]
//!   task. Delayed tasks sleep on the tokio timer.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::DispatchError;

/// A unit of main-thread work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Schedules work onto the main thread.
pub trait Dispatcher: Send + Sync {
    /// Run `task` on the main thread as soon as possible.
    fn enqueue(&self, task: Task) -> Result<(), DispatchError>;

    /// Run `task` on the main thread once `delay` has elapsed.
    fn enqueue_delayed(&self, delay: Duration, task: Task) -> Result<(), DispatchError>;

    /// Whether the calling thread is the main thread.
    fn is_main_thread(&self) -> bool;
}

// ----------------------------------------------------------------------------
// QueueDispatcher
// ----------------------------------------------------------------------------

struct Delayed {
    deadline: Instant,
    seq: u64,
    task: Task,
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Delayed {}

impl PartialOrd for Delayed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Delayed {
    // Reversed so the heap pops the earliest deadline first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<Task>,
    delayed: BinaryHeap<Delayed>,
    next_seq: u64,
    closed: bool,
}

/// A dispatcher pumped manually by the host's main loop.
///
/// The thread that creates the dispatcher is the main thread.
pub struct QueueDispatcher {
    main_thread: ThreadId,
    state: Mutex<QueueState>,
}

impl QueueDispatcher {
    /// Create a dispatcher whose main thread is the calling thread.
    pub fn new() -> Self {
        Self {
            main_thread: thread::current().id(),
            state: Mutex::new(QueueState::default()),
        }
    }

    /// Run every ready task and every delayed task whose deadline has passed.
    ///
    /// Tasks enqueued while running are run too. Returns the number of tasks
    /// run.
    pub fn run_pending(&self) -> usize {
        debug_assert!(self.is_main_thread(), "run_pending called off the main thread");

        let mut ran = 0;
        loop {
            let batch: Vec<Task> = {
                let mut state = self.state.lock();
                let now = Instant::now();
                while state.delayed.peek().is_some_and(|delayed| delayed.deadline <= now) {
                    if let Some(delayed) = state.delayed.pop() {
                        state.ready.push_back(delayed.task);
                    }
                }
                state.ready.drain(..).collect()
            };

            if batch.is_empty() {
                break;
            }

            for task in batch {
                task();
                ran += 1;
            }
        }

        if ran > 0 {
            tracing::trace!(ran, "dispatcher pumped");
        }
        ran
    }

    /// Number of tasks waiting, delayed ones included.
    pub fn pending(&self) -> usize {
        let state = self.state.lock();
        state.ready.len() + state.delayed.len()
    }

    /// Deadline of the earliest delayed task.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.state.lock().delayed.peek().map(|delayed| delayed.deadline)
    }

    /// Refuse further tasks and drop the ones still queued.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.ready.clear();
        state.delayed.clear();
    }

    fn push(&self, deadline: Option<Instant>, task: Task) -> Result<(), DispatchError> {
        let mut state = self.state.lock();
        if state.closed {
            tracing::warn!("task enqueued on a closed dispatcher");
            return Err(DispatchError::Closed);
        }

        match deadline {
            None => state.ready.push_back(task),
            Some(deadline) => {
                let seq = state.next_seq;
                state.next_seq += 1;
                state.delayed.push(Delayed { deadline, seq, task });
            }
        }
        Ok(())
    }
}

impl Default for QueueDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for QueueDispatcher {
    fn enqueue(&self, task: Task) -> Result<(), DispatchError> {
        self.push(None, task)
    }

    fn enqueue_delayed(&self, delay: Duration, task: Task) -> Result<(), DispatchError> {
        self.push(Some(Instant::now() + delay), task)
    }

    fn is_main_thread(&self) -> bool {
        thread::current().id() == self.main_thread
    }
}

impl fmt::Debug for QueueDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueDispatcher")
            .field("main_thread", &self.main_thread)
            .field("pending", &self.pending())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// TokioDispatcher
// ----------------------------------------------------------------------------

/// A dispatcher backed by a tokio channel.
///
/// Tasks are run by the paired [`DispatchLoop`]; the thread running the loop
/// is the main thread.
#[derive(Clone)]
pub struct TokioDispatcher {
    tx: mpsc::UnboundedSender<Task>,
    runtime: Handle,
    main_thread: Arc<OnceLock<ThreadId>>,
}

/// Receiving half of a [`TokioDispatcher`].
pub struct DispatchLoop {
    rx: mpsc::UnboundedReceiver<Task>,
    main_thread: Arc<OnceLock<ThreadId>>,
}

impl TokioDispatcher {
    /// Create a dispatcher and its loop. Delayed tasks sleep on `runtime`.
    pub fn new(runtime: Handle) -> (Self, DispatchLoop) {
        let (tx, rx) = mpsc::unbounded_channel();
        let main_thread = Arc::new(OnceLock::new());

        let dispatcher = Self {
            tx,
            runtime,
            main_thread: Arc::clone(&main_thread),
        };
        (dispatcher, DispatchLoop { rx, main_thread })
    }

    /// Whether the loop has shut down.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Dispatcher for TokioDispatcher {
    fn enqueue(&self, task: Task) -> Result<(), DispatchError> {
        self.tx.send(task).map_err(|_| {
            tracing::warn!("task enqueued on a closed dispatcher");
            DispatchError::Closed
        })
    }

    fn enqueue_delayed(&self, delay: Duration, task: Task) -> Result<(), DispatchError> {
        if self.tx.is_closed() {
            tracing::warn!("delayed task enqueued on a closed dispatcher");
            return Err(DispatchError::Closed);
        }

        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(task).is_err() {
                tracing::warn!("dispatcher closed before delayed task was due");
            }
        });
        Ok(())
    }

    fn is_main_thread(&self) -> bool {
        self.main_thread.get() == Some(&thread::current().id())
    }
}

impl fmt::Debug for TokioDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioDispatcher")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl DispatchLoop {
    /// Run tasks until every dispatcher handle (and pending delayed task) is
    /// gone. The thread running the loop becomes the main thread.
    ///
    /// The future must stay on one thread: drive it with `block_on` on a
    /// current-thread runtime or inside a `LocalSet`. A work-stealing runtime
    /// may move it between workers, which trips a debug assertion before the
    /// next task runs.
    pub async fn run(mut self) {
        self.claim_thread();
        tracing::debug!("dispatch loop started");

        while let Some(task) = self.rx.recv().await {
            self.claim_thread();
            task();
        }

        tracing::debug!("dispatch loop finished");
    }

    /// Run the tasks that are already queued without waiting for more.
    pub fn run_pending(&mut self) -> usize {
        self.claim_thread();

        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    fn claim_thread(&self) {
        let current = thread::current().id();
        let owner = *self.main_thread.get_or_init(|| current);
        debug_assert_eq!(owner, current, "dispatch loop moved to another thread");
    }
}

impl fmt::Debug for DispatchLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchLoop")
            .field("main_thread", &self.main_thread.get())
            .finish()
    }
}
