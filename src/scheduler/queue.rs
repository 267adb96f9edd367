//! Queue types for the scheduler

use std::collections::VecDeque;
use std::fmt;

use crate::BoxFuture;

/// A task's body, resolving to whether the task succeeded.
pub(crate) type Job = BoxFuture<bool>;

// == Task Id ==
/// Identifier assigned to each submitted task, in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    /// Returns the raw sequence number.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// A task admitted to the scheduler but not yet started.
pub(crate) struct PendingTask {
    pub id: TaskId,
    pub job: Job,
}

impl fmt::Debug for PendingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTask").field("id", &self.id).finish()
    }
}

// == Pending Queue ==
/// FIFO of tasks waiting for a free slot.
#[derive(Debug, Default)]
pub(crate) struct PendingQueue {
    tasks: VecDeque<PendingTask>,
}

impl PendingQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a task behind every task already waiting.
    pub fn push(&mut self, task: PendingTask) {
        self.tasks.push_back(task);
    }

    /// Removes the oldest waiting task.
    pub fn pop(&mut self) -> Option<PendingTask> {
        self.tasks.pop_front()
    }

    /// Removes every waiting task, oldest first.
    pub fn drain(&mut self) -> Vec<PendingTask> {
        self.tasks.drain(..).collect()
    }

    /// Number of waiting tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[cfg(test)]
    pub fn ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|task| task.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(id: u64) -> PendingTask {
        PendingTask {
            id: TaskId(id),
            job: Box::pin(async { true }),
        }
    }

    #[test]
    fn test_queue_is_fifo() {
        let mut queue = PendingQueue::new();
        queue.push(pending(3));
        queue.push(pending(1));
        queue.push(pending(2));

        assert_eq!(queue.ids(), vec![TaskId(3), TaskId(1), TaskId(2)]);
        assert_eq!(queue.pop().map(|t| t.id), Some(TaskId(3)));
        assert_eq!(queue.pop().map(|t| t.id), Some(TaskId(1)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_drain_empties_in_order() {
        let mut queue = PendingQueue::new();
        queue.push(pending(1));
        queue.push(pending(2));

        let drained: Vec<_> = queue.drain().into_iter().map(|t| t.id).collect();
        assert_eq!(drained, vec![TaskId(1), TaskId(2)]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_empty_queue_pops_none() {
        let mut queue = PendingQueue::new();
        assert!(queue.pop().is_none());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_task_id_display() {
        assert_eq!(TaskId(7).to_string(), "task-7");
        assert_eq!(TaskId(7).as_u64(), 7);
    }
}
