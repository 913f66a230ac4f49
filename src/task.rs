//! Static task table and tick accumulator.
//!
//! A task is an immutable period plus a nullary foreground callable,
//! identified by its handler. The tick accumulator lives alongside the
//! table because it is the only thing that mutates `TaskStatus`, and
//! mutates nothing else.

use crate::config::TASKS_MAX;

/// A nullary foreground callable invoked periodically.
pub type TaskHandler = fn();

/// An immutable task: period plus handler.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Task {
    pub period_ms: u16,
    pub handler: TaskHandler,
}

/// Per-task runtime record, mutated only by the tick ISR and by
/// `create_task`/`delete_task` under a critical section.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TaskStatus {
    pub ms_remaining: u16,
    pub pending: bool,
}

impl TaskStatus {
    const fn new(period_ms: u16) -> Self {
        Self {
            ms_remaining: period_ms,
            pending: false,
        }
    }
}

/// The static task table: up to [`TASKS_MAX`] tasks, dense indices
/// `[0, task_count)`, unstable across deletions.
pub struct TaskTable {
    tasks: [Option<Task>; TASKS_MAX],
    statuses: [TaskStatus; TASKS_MAX],
    count: u8,
}

impl TaskTable {
    pub const fn new() -> Self {
        Self {
            tasks: [None; TASKS_MAX],
            statuses: [TaskStatus::new(0); TASKS_MAX],
            count: 0,
        }
    }

    /// Number of currently registered tasks.
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Creates or reprograms a task.
    ///
    /// Rejects silently if `period_ms == 0`. If `handler` is already
    /// registered, its period is updated in place, `pending` is cleared,
    /// and `ms_remaining` is reset to the new period — `task_count` is
    /// unchanged. Otherwise appends a new task, or returns `Err` if the
    /// table is already full.
    pub fn create_task(&mut self, period_ms: u16, handler: TaskHandler) -> Result<(), ()> {
        if period_ms == 0 {
            return Ok(());
        }

        let count = self.count as usize;
        for i in 0..count {
            if self.tasks[i].map(|t| t.handler) == Some(handler) {
                self.tasks[i] = Some(Task { period_ms, handler });
                self.statuses[i] = TaskStatus::new(period_ms);
                return Ok(());
            }
        }

        if count >= TASKS_MAX {
            return Err(());
        }

        self.tasks[count] = Some(Task { period_ms, handler });
        self.statuses[count] = TaskStatus::new(period_ms);
        self.count += 1;
        Ok(())
    }

    /// Removes the task registered under `handler`, if any, shifting
    /// survivors down by one to preserve relative order. A no-op, not an
    /// error, if `handler` is not registered.
    pub fn delete_task(&mut self, handler: TaskHandler) {
        let count = self.count as usize;
        let found = (0..count).find(|&i| self.tasks[i].map(|t| t.handler) == Some(handler));
        let Some(pos) = found else { return };

        for i in pos..count - 1 {
            self.tasks[i] = self.tasks[i + 1];
            self.statuses[i] = self.statuses[i + 1];
        }
        self.tasks[count - 1] = None;
        self.statuses[count - 1] = TaskStatus::new(0);
        self.count -= 1;
    }

    /// Period of the task at `id`, or 0 if `id` is out of range.
    pub fn period(&self, id: u8) -> u16 {
        let id = id as usize;
        if id < self.count as usize {
            self.tasks[id].map_or(0, |t| t.period_ms)
        } else {
            0
        }
    }

    /// Whether the task at `id` has a run pending.
    pub fn is_pending(&self, id: usize) -> bool {
        id < self.count as usize && self.statuses[id].pending
    }

    /// Clears the pending flag for the task at `id`.
    pub fn clear_pending(&mut self, id: usize) {
        if id < self.count as usize {
            self.statuses[id].pending = false;
        }
    }

    /// The handler at `id`, if `id` names a registered task.
    pub fn handler(&self, id: usize) -> Option<TaskHandler> {
        if id < self.count as usize {
            self.tasks[id].map(|t| t.handler)
        } else {
            None
        }
    }

    /// Invokes the handler at `id` if it names a registered task;
    /// otherwise a no-op.
    pub fn run_task(&self, id: usize) {
        if let Some(handler) = self.handler(id) {
            handler();
        }
    }

    /// Advances every task's countdown by `tick_ms`. Tasks whose countdown
    /// elapses are reloaded to their period (never a leftover remainder)
    /// and marked pending. Returns `true` if any task became pending,
    /// signalling the caller should raise the wake flag.
    pub fn tick(&mut self, tick_ms: u16) -> bool {
        let count = self.count as usize;
        let mut woke = false;
        for i in 0..count {
            let period = self.tasks[i].map_or(0, |t| t.period_ms);
            let status = &mut self.statuses[i];
            if status.ms_remaining > tick_ms {
                status.ms_remaining -= tick_ms;
            } else {
                status.ms_remaining = period;
                status.pending = true;
                woke = true;
            }
        }
        woke
    }
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new()
    }
}
