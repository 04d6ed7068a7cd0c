//! Throttled FIFO task queue
//!
//! Dispatches at most one task per interval, strictly in submission order.
//! A task that is still waiting can be withdrawn through its
//! [`CancellationToken`]; once dispatched it runs to completion and the token
//! is ignored.
//!
//! The interval is measured between dispatch *starts*. A dispatched task keeps
//! running on its own tokio task while the queue moves on, so `processing`
//! describes the dispatcher, not the work it started.

use crate::error::QueueError;
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Spacing used by [`ThrottledQueue::default`]
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Stand-in for intervals too large to add to an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Pluggable queue used by the client to pace outbound requests
///
/// Implementations must not run `job` if `signal` is cancelled before the job
/// starts, and must let a started job finish regardless of `signal`.
pub trait TimeQueue<T: Send + 'static>: Send + Sync {
    fn enqueue_job(
        &self,
        job: BoxFuture<'static, T>,
        signal: CancellationToken,
    ) -> BoxFuture<'static, Result<T, QueueError>>;
}

/// Lifecycle of a submitted task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Running,
    Done,
    Aborted,
}

struct Pending {
    seq: u64,
    signal: Option<CancellationToken>,
    state: Arc<Mutex<TaskState>>,
    run: Box<dyn FnOnce() + Send>,
}

struct QueueState {
    pending: VecDeque<Pending>,
    next_seq: u64,
}

struct Inner {
    interval: Duration,
    state: Mutex<QueueState>,
    /// Single source of truth for the `processing` flag
    busy: watch::Sender<bool>,
}

/// FIFO scheduler enforcing a minimum spacing between dispatch starts
#[derive(Clone)]
pub struct ThrottledQueue {
    inner: Arc<Inner>,
}

impl Default for ThrottledQueue {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl std::fmt::Debug for ThrottledQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottledQueue")
            .field("interval", &self.inner.interval)
            .field("processing", &self.processing())
            .field("queued", &self.len())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // No code path panics while holding these locks; recover the data anyway.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ThrottledQueue {
    /// Create a queue dispatching at most one task per `interval`
    pub fn new(interval: Duration) -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                interval,
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    next_seq: 0,
                }),
                busy,
            }),
        }
    }

    /// Configured spacing between dispatch starts
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// True from the first dispatch until an interval elapses with nothing queued
    pub fn processing(&self) -> bool {
        *self.inner.busy.borrow()
    }

    /// Number of tasks still waiting for their slot
    pub fn len(&self) -> usize {
        lock(&self.inner.state).pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Submit `task` and wait for its output.
    ///
    /// Registration happens when this method is called, not when the returned
    /// future is first polled, so call order is dispatch order. Must be called
    /// from within a tokio runtime.
    pub fn enqueue<F, Fut, T>(
        &self,
        task: F,
        signal: Option<CancellationToken>,
    ) -> impl Future<Output = Result<T, QueueError>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let registered = self.register(task, signal);
        async move { registered?.outcome().await }
    }

    /// Wait until the dispatcher goes idle.
    ///
    /// Resolves immediately on an idle queue. With a timeout, fails with
    /// [`QueueError::StillProcessing`] if the queue is still busy when it
    /// elapses; nothing is cancelled either way.
    pub async fn done_processing(&self, timeout: Option<Duration>) -> Result<(), QueueError> {
        let mut busy = self.inner.busy.subscribe();
        let idle = async move {
            // The sender lives as long as `self`, so this cannot observe a close.
            let _ = busy.wait_for(|processing| !*processing).await;
        };

        match timeout {
            None => {
                idle.await;
                Ok(())
            }
            Some(limit) => tokio::time::timeout(limit, idle)
                .await
                .map_err(|_| QueueError::StillProcessing(limit)),
        }
    }

    fn register<F, Fut, T>(
        &self,
        task: F,
        signal: Option<CancellationToken>,
    ) -> Result<Registration<T>, QueueError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if signal.as_ref().is_some_and(|s| s.is_cancelled()) {
            log::debug!("Rejecting task: signal already cancelled");
            return Err(QueueError::CancelledBeforeEnqueue);
        }

        let (tx, rx) = oneshot::channel();
        let task_state = Arc::new(Mutex::new(TaskState::Queued));
        let run: Box<dyn FnOnce() + Send> = Box::new(move || {
            tokio::spawn(async move {
                let output = task().await;
                let _ = tx.send(output);
            });
        });

        let mut state = lock(&self.inner.state);
        let seq = state.next_seq;
        state.next_seq += 1;
        state.pending.push_back(Pending {
            seq,
            signal: signal.clone(),
            state: Arc::clone(&task_state),
            run,
        });

        // Idle check and loop start happen under the same lock as the append,
        // so two dispatch loops can never run at once.
        if !*self.inner.busy.borrow() {
            self.inner.busy.send_replace(true);
            tokio::spawn(dispatch_loop(Arc::clone(&self.inner)));
        }
        drop(state);

        log::trace!("Enqueued task #{}", seq);
        Ok(Registration {
            ticket: Ticket {
                inner: Arc::clone(&self.inner),
                seq,
                state: task_state,
            },
            signal,
            rx,
        })
    }
}

impl<T: Send + 'static> TimeQueue<T> for ThrottledQueue {
    fn enqueue_job(
        &self,
        job: BoxFuture<'static, T>,
        signal: CancellationToken,
    ) -> BoxFuture<'static, Result<T, QueueError>> {
        Box::pin(self.enqueue(move || job, Some(signal)))
    }
}

/// Caller-side handle of a queued task
struct Registration<T> {
    ticket: Ticket,
    signal: Option<CancellationToken>,
    rx: oneshot::Receiver<T>,
}

struct Ticket {
    inner: Arc<Inner>,
    seq: u64,
    state: Arc<Mutex<TaskState>>,
}

impl<T> Registration<T> {
    async fn outcome(self) -> Result<T, QueueError> {
        let Registration {
            ticket,
            signal,
            mut rx,
        } = self;

        if let Some(signal) = signal {
            tokio::select! {
                biased;
                received = &mut rx => return ticket.finish(received),
                _ = signal.cancelled() => {
                    if ticket.withdraw() {
                        return Err(QueueError::CancelledWhileQueued);
                    }
                }
            }
        }

        let received = rx.await;
        ticket.finish(received)
    }
}

impl Ticket {
    /// Remove this task from the FIFO if it has not been dispatched yet.
    fn withdraw(&self) -> bool {
        let mut queue = lock(&self.inner.state);
        let mut task_state = lock(&self.state);
        match *task_state {
            TaskState::Queued => {
                queue.pending.retain(|p| p.seq != self.seq);
                *task_state = TaskState::Aborted;
                log::debug!("Task #{} withdrawn while queued", self.seq);
                true
            }
            TaskState::Aborted => true,
            TaskState::Running | TaskState::Done => false,
        }
    }

    fn finish<T>(&self, received: Result<T, oneshot::error::RecvError>) -> Result<T, QueueError> {
        let mut task_state = lock(&self.state);
        match received {
            Ok(output) => {
                *task_state = TaskState::Done;
                Ok(output)
            }
            Err(_) if *task_state == TaskState::Aborted => Err(QueueError::CancelledWhileQueued),
            Err(_) => Err(QueueError::TaskDropped),
        }
    }
}

/// Pop and start one task per interval until the FIFO stays empty.
async fn dispatch_loop(inner: Arc<Inner>) {
    loop {
        let started = Instant::now();
        let next = {
            let mut queue = lock(&inner.state);
            let next = next_runnable(&mut queue);
            if next.is_none() {
                inner.busy.send_replace(false);
            }
            next
        };

        match next {
            Some((seq, run)) => {
                log::trace!("Dispatching task #{}", seq);
                run();
            }
            None => return,
        }

        tokio::time::sleep_until(next_dispatch_at(started, inner.interval)).await;
    }
}

/// Earliest start of the next dispatch; saturates instead of overflowing
fn next_dispatch_at(started: Instant, interval: Duration) -> Instant {
    started
        .checked_add(interval)
        .unwrap_or_else(|| started + FAR_FUTURE)
}

/// Skip tasks whose signal fired before their owner could withdraw them.
fn next_runnable(queue: &mut QueueState) -> Option<(u64, Box<dyn FnOnce() + Send>)> {
    while let Some(pending) = queue.pending.pop_front() {
        let cancelled = pending.signal.as_ref().is_some_and(|s| s.is_cancelled());
        let runnable = {
            let mut task_state = lock(&pending.state);
            if *task_state != TaskState::Queued || cancelled {
                *task_state = TaskState::Aborted;
                false
            } else {
                *task_state = TaskState::Running;
                true
            }
        };
        if runnable {
            return Some((pending.seq, pending.run));
        }
    }
    None
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
