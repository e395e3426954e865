//! Priority run-queue executor.

use super::{Priority, Task, TaskId};
use alloc::{collections::BTreeMap, sync::Arc};
use core::task::{Context, Poll, Waker};
use crossbeam_queue::ArrayQueue;
use ember_common::{EcError, EcResult};
use ember_hal::InterruptController;
use futures_util::task::ArcWake;
use log::{debug, warn};

/// Capacity of each run queue.
const QUEUE_DEPTH: usize = 32;

/// Runs spawned tasks, highest priority first, until they complete.
pub struct Executor {
    tasks: BTreeMap<TaskId, Task>,
    task_queues: [Arc<ArrayQueue<TaskId>>; Priority::COUNT],
    waker_cache: BTreeMap<TaskId, Waker>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    /// Create an executor with empty run queues.
    pub fn new() -> Self {
        Executor {
            tasks: BTreeMap::new(),
            task_queues: core::array::from_fn(|_| Arc::new(ArrayQueue::new(QUEUE_DEPTH))),
            waker_cache: BTreeMap::new(),
        }
    }

    /// Spawn a task. It is polled for the first time on the next pass.
    pub fn spawn(&mut self, task: Task) -> EcResult<TaskId> {
        let task_id = task.id;
        let priority = task.priority as usize;
        if self.tasks.contains_key(&task_id) {
            return Err(EcError::AlreadyInitialized);
        }
        self.task_queues[priority]
            .push(task_id)
            .map_err(|_| EcError::BufferFull)?;
        debug!("spawned task '{}' ({:?})", task.name, task.priority);
        self.tasks.insert(task_id, task);
        Ok(task_id)
    }

    /// Number of tasks that have not completed.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if any task is queued to run.
    pub fn has_ready_tasks(&self) -> bool {
        self.task_queues.iter().any(|q| !q.is_empty())
    }

    /// Poll every task that was ready when the pass started, higher
    /// priorities first. A task woken while it is being polled runs on the
    /// next pass, so a busy high-priority task cannot starve the rest.
    pub fn run_ready_tasks(&mut self) {
        for priority in (0..Priority::COUNT).rev() {
            let queue = &self.task_queues[priority];

            for _ in 0..queue.len() {
                let Some(task_id) = queue.pop() else {
                    break;
                };
                let task = match self.tasks.get_mut(&task_id) {
                    Some(task) => task,
                    None => continue, // task already finished
                };

                let waker = self
                    .waker_cache
                    .entry(task_id)
                    .or_insert_with(|| TaskWaker::new(task_id, queue.clone()));

                let mut context = Context::from_waker(waker);
                if let Poll::Ready(()) = task.poll(&mut context) {
                    debug!("task '{}' finished", task.name);
                    self.tasks.remove(&task_id);
                    self.waker_cache.remove(&task_id);
                }
            }
        }
    }

    /// Run forever, halting the CPU whenever nothing is ready.
    pub fn run(&mut self, irq: &mut impl InterruptController) -> ! {
        loop {
            self.run_ready_tasks();
            self.sleep_if_idle(irq);
        }
    }

    /// Interrupts are masked around the emptiness check so a wake landing
    /// between the check and the halt is not slept through.
    fn sleep_if_idle(&self, irq: &mut impl InterruptController) {
        irq.disable();
        if self.has_ready_tasks() {
            irq.enable();
        } else {
            irq.enable_and_wait();
        }
    }
}

struct TaskWaker {
    task_id: TaskId,
    task_queue: Arc<ArrayQueue<TaskId>>,
}

impl TaskWaker {
    #[allow(clippy::new_ret_no_self)]
    fn new(task_id: TaskId, task_queue: Arc<ArrayQueue<TaskId>>) -> Waker {
        futures_util::task::waker(Arc::new(TaskWaker {
            task_id,
            task_queue,
        }))
    }
}

impl ArcWake for TaskWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        if arc_self.task_queue.push(arc_self.task_id).is_err() {
            warn!("run queue full, dropping wake for {:?}", arc_self.task_id);
        }
    }
}
