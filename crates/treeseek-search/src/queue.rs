//! Task queue with drain detection.
//!
//! Pending directories travel over an unbounded channel. A second channel
//! carries no messages at all: its sender is dropped to stop the run, which
//! wakes every worker blocked in [`TaskQueue::pop`] at once. A third, timer
//! channel fires when the optional deadline passes.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam_channel::{self as channel, Receiver, Sender, select};
use parking_lot::Mutex;

use treeseek_core::Task;

/// Outcome of a blocking pop.
#[derive(Debug, PartialEq, Eq)]
pub enum Pop {
    /// A directory to process.
    Task(Task),
    /// The run is over; the worker should exit.
    Stop,
    /// The deadline elapsed; the run should be cancelled.
    Expired,
}

/// Statistics for the task queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total tasks pushed
    pub pushed: AtomicU64,

    /// Total tasks popped
    pub popped: AtomicU64,

    /// Tasks dropped because the run was cancelled
    pub abandoned: AtomicU64,
}

impl QueueStats {
    /// Get number of tasks pushed
    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    /// Get number of tasks popped
    pub fn popped(&self) -> u64 {
        self.popped.load(Ordering::Relaxed)
    }

    /// Get number of abandoned tasks
    pub fn abandoned(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }
}

/// Concurrency-safe FIFO of pending directories.
pub struct TaskQueue {
    sender: Sender<Task>,
    receiver: Receiver<Task>,

    /// Dropped (set to `None`) to broadcast stop.
    shutdown_tx: Mutex<Option<Sender<()>>>,
    shutdown_rx: Receiver<()>,
    closed: AtomicBool,

    deadline: Receiver<Instant>,

    /// Tasks pushed but not yet fully processed.
    in_flight: AtomicUsize,

    stats: QueueStats,
}

impl TaskQueue {
    /// Create a queue without a deadline.
    pub fn new() -> Self {
        Self::with_deadline(None)
    }

    /// Create a queue whose pops report [`Pop::Expired`] once `deadline` passes.
    pub fn with_deadline(deadline: Option<Instant>) -> Self {
        let (sender, receiver) = channel::unbounded();
        let (shutdown_tx, shutdown_rx) = channel::bounded(0);
        let deadline = match deadline {
            Some(at) => channel::at(at),
            None => channel::never(),
        };

        Self {
            sender,
            receiver,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            shutdown_rx,
            closed: AtomicBool::new(false),
            deadline,
            in_flight: AtomicUsize::new(0),
            stats: QueueStats::default(),
        }
    }

    /// Push a task. Never blocks.
    ///
    /// The in-flight count is raised before the task becomes visible, so a
    /// parent task cannot be completed ahead of the children it pushed.
    pub fn push(&self, task: Task) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.stats.pushed.fetch_add(1, Ordering::Relaxed);
        // Cannot fail: the queue holds its own receiver.
        let _ = self.sender.send(task);
    }

    /// Block until a task is available, the queue is closed, or the deadline passes.
    pub fn pop(&self) -> Pop {
        if self.is_closed() {
            return Pop::Stop;
        }
        // An elapsed deadline wins over pending tasks
        if self.deadline.try_recv().is_ok() {
            return Pop::Expired;
        }

        select! {
            recv(self.receiver) -> task => match task {
                Ok(task) => {
                    self.stats.popped.fetch_add(1, Ordering::Relaxed);
                    Pop::Task(task)
                }
                Err(_) => Pop::Stop,
            },
            recv(self.shutdown_rx) -> _ => Pop::Stop,
            recv(self.deadline) -> _ => Pop::Expired,
        }
    }

    /// Mark one popped task as fully processed.
    ///
    /// Returns `true` if this was the last in-flight task, in which case the
    /// queue is closed and every waiting worker is released.
    pub fn complete(&self) -> bool {
        let drained = self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1;
        if drained {
            self.close();
        }
        drained
    }

    /// Mark one popped task as dropped without processing.
    pub fn abandon(&self) {
        self.stats.abandoned.fetch_add(1, Ordering::Relaxed);
        self.complete();
    }

    /// Release all workers blocked in `pop`. Idempotent.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.shutdown_tx.lock().take();
    }

    /// Check if the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Drop every task still waiting, counting them as abandoned.
    pub fn drain_abandoned(&self) -> u64 {
        let mut count = 0;
        while self.receiver.try_recv().is_ok() {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            count += 1;
        }
        self.stats.abandoned.fetch_add(count, Ordering::Relaxed);
        count
    }

    /// Tasks pushed but not yet fully processed.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Tasks waiting to be popped.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Check if no task is waiting.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Get queue statistics
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
