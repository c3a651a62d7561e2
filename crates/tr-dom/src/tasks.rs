use core::fmt;
use std::collections::VecDeque;

/// Handle returned by `Document::queue_task`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

type Task = Box<dyn FnOnce()>;

/// FIFO of deferred work; one "turn" runs everything queued before it began.
#[derive(Default)]
pub(crate) struct TaskQueue {
    queue: VecDeque<(TaskId, Task)>,
    next_id: u64,
}

impl TaskQueue {
    pub(crate) fn push(&mut self, task: Task) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.queue.push_back((id, task));
        id
    }

    pub(crate) fn cancel(&mut self, id: TaskId) -> bool {
        match self.queue.iter().position(|(queued, _)| *queued == id) {
            Some(position) => self.queue.remove(position).is_some(),
            None => false,
        }
    }

    pub(crate) fn horizon(&self) -> TaskId {
        TaskId(self.next_id)
    }

    /// Pops the oldest task if it was queued before `horizon`.
    pub(crate) fn pop_due(&mut self, horizon: TaskId) -> Option<(TaskId, Task)> {
        match self.queue.front() {
            Some((id, _)) if *id < horizon => self.queue.pop_front(),
            _ => None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.queue.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
