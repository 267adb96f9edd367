//! Handle returned by `Scheduler::submit`

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::TaskError;
use crate::scheduler::TaskId;

/// Resolves to the outcome of a submitted task.
///
/// Dropping the handle does not cancel the task; it still runs to completion
/// and keeps its place in the queue.
#[derive(Debug)]
pub struct TaskHandle<T, E> {
    id: TaskId,
    receiver: oneshot::Receiver<Result<T, TaskError<E>>>,
}

impl<T, E> TaskHandle<T, E> {
    pub(crate) fn new(id: TaskId, receiver: oneshot::Receiver<Result<T, TaskError<E>>>) -> Self {
        Self { id, receiver }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }
}

impl<T, E> Unpin for TaskHandle<T, E> {}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = Result<T, TaskError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the task unwound before reporting
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TaskError::Panicked)))
    }
}
