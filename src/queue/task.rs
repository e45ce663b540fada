//! Task Module
//!
//! A unit of deferred work plus the single-resolution channel its submitter awaits.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{QueueError, Result};

// == Task Id ==
/// Opaque identifier assigned at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TaskId(Uuid);

impl TaskId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// == Task Options ==
/// Per-task overrides. Unset fields fall back to the queue's config.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOptions {
    /// Higher runs sooner
    pub priority: i32,
    pub timeout: Option<Duration>,
    pub retry_attempts: Option<u32>,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            priority: 1,
            timeout: None,
            retry_attempts: None,
        }
    }
}

impl TaskOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = Some(retry_attempts);
        self
    }
}

/// Delivers a successful value to the submitter.
pub(crate) type Resolve = Box<dyn FnOnce() + Send>;

type Attempt = Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<Resolve>> + Send + Sync>;
type Reject = Box<dyn FnOnce(QueueError) + Send>;

/// Sending half of a task's outcome; only the first settle takes effect.
struct Outcome<T>(Arc<Mutex<Option<oneshot::Sender<Result<T>>>>>);

impl<T> Clone for Outcome<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Outcome<T> {
    fn settle(&self, result: Result<T>) {
        if let Some(sender) = self.0.lock().take() {
            // The submitter may have dropped its handle
            let _ = sender.send(result);
        }
    }
}

// == Task ==
/// A queued unit of work, owned by exactly one queue.
pub(crate) struct Task {
    pub(crate) id: TaskId,
    pub(crate) priority: i32,
    pub(crate) timeout: Duration,
    pub(crate) max_retries: u32,
    pub(crate) attempts: u32,
    pub(crate) created_at: Instant,
    /// First time the task moved to running
    pub(crate) started_at: Option<Instant>,
    /// Clear generation of the owning queue at admission
    pub(crate) epoch: u64,
    attempt: Attempt,
    reject: Reject,
}

impl Task {
    /// Wraps `work` into a type-erased task and returns the typed handle
    /// its result will be delivered to.
    pub(crate) fn new<T, F, Fut>(
        work: F,
        priority: i32,
        timeout: Duration,
        max_retries: u32,
        epoch: u64,
    ) -> (Self, TaskHandle<T>)
    where
        T: Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let id = TaskId::new();
        let (sender, receiver) = oneshot::channel();
        let outcome = Outcome(Arc::new(Mutex::new(Some(sender))));

        let work = Arc::new(work);
        let on_success = outcome.clone();
        let attempt: Attempt = Box::new(move || {
            let outcome = on_success.clone();
            let work = Arc::clone(&work);
            async move {
                // A panicking attempt fails like any other error
                let value = AssertUnwindSafe(async move { (*work)().await })
                    .catch_unwind()
                    .await
                    .map_err(|panic| {
                        anyhow::anyhow!("task panicked: {}", panic_message(&*panic))
                    })??;
                Ok::<Resolve, anyhow::Error>(Box::new(move || outcome.settle(Ok(value))))
            }
            .boxed()
        });
        let reject: Reject = Box::new(move |err| outcome.settle(Err(err)));

        let task = Self {
            id,
            priority,
            timeout,
            max_retries,
            attempts: 0,
            created_at: Instant::now(),
            started_at: None,
            epoch,
            attempt,
            reject,
        };
        (task, TaskHandle { id, receiver })
    }

    /// Starts one execution attempt. The returned future yields a resolver
    /// that must only be called once the attempt is accepted as the outcome.
    pub(crate) fn run_attempt(&self) -> BoxFuture<'static, anyhow::Result<Resolve>> {
        (self.attempt)()
    }

    /// Settles the task with a terminal error.
    pub(crate) fn reject(self, err: QueueError) {
        (self.reject)(err)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload")
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

// == Task Handle ==
/// Resolves with the work's value, or the terminal error once retries are spent.
pub struct TaskHandle<T> {
    id: TaskId,
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T> TaskHandle<T> {
    pub fn id(&self) -> TaskId {
        self.id
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(QueueError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").field("id", &self.id).finish()
    }
}
