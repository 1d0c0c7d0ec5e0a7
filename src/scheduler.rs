//! Cooperative, time-budgeted task execution on the world's thread.
//!
//! Long operations (capture, paste, verification) are split into chunk-sized
//! increments. The host calls [`TaskScheduler::run_tick`] once per game tick;
//! each due task gets one increment bounded by a [`TaskBudget`].

use crate::config::TaskOptions;
use crate::world::WorldAccess;
use log::{debug, warn};
use std::time::{Duration, Instant};

/// Outcome of one increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Continue,
    Done,
    Failed(String),
}

impl Progress {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Progress::Continue)
    }
}

/// Limits for a single increment. A task always processes at least one unit
/// of work per increment so that it keeps making progress.
#[derive(Debug, Clone, Copy)]
pub struct TaskBudget {
    pub deadline: Instant,
    pub max_chunks: usize,
}

impl TaskBudget {
    pub fn new(time: Duration, max_chunks: usize) -> Self {
        TaskBudget {
            deadline: Instant::now() + time,
            max_chunks: max_chunks.max(1),
        }
    }

    pub fn from_options(options: &TaskOptions) -> Self {
        TaskBudget::new(options.time_budget(), options.max_chunks_per_tick)
    }

    /// No time or chunk limit beyond one full run.
    pub fn unlimited() -> Self {
        TaskBudget {
            deadline: Instant::now() + Duration::from_secs(3600),
            max_chunks: usize::MAX,
        }
    }

    pub fn exhausted(&self, chunks_done: usize) -> bool {
        chunks_done > 0 && (chunks_done >= self.max_chunks || Instant::now() >= self.deadline)
    }
}

/// A long-running operation advanced in increments.
///
/// `world` is `None` when the world went away; a task that needs it should
/// report `Failed` so the scheduler drops it.
pub trait Task {
    fn name(&self) -> &str;

    fn advance(&mut self, world: Option<&mut dyn WorldAccess>, budget: &TaskBudget) -> Progress;
}

pub type TaskId = u64;

type CompletionListener = Box<dyn FnMut(TaskId, &str, &Progress)>;

struct ScheduledTask {
    id: TaskId,
    task: Box<dyn Task>,
    interval: u32,
    next_run: u64,
}

/// Runs registered tasks in registration order. Owned by the host, not global.
pub struct TaskScheduler {
    options: TaskOptions,
    tasks: Vec<ScheduledTask>,
    next_id: TaskId,
    tick: u64,
    listeners: Vec<CompletionListener>,
}

impl TaskScheduler {
    pub fn new(options: TaskOptions) -> Self {
        TaskScheduler {
            options,
            tasks: Vec::new(),
            next_id: 1,
            tick: 0,
            listeners: Vec::new(),
        }
    }

    pub fn add_task(&mut self, task: Box<dyn Task>) -> TaskId {
        let interval = self.options.tick_interval;
        self.add_task_with_interval(task, interval)
    }

    /// Registers a task that runs every `interval` ticks, starting with the next one.
    pub fn add_task_with_interval(&mut self, task: Box<dyn Task>, interval: u32) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        debug!("Scheduling task {} ({}) every {} ticks", id, task.name(), interval);
        self.tasks.push(ScheduledTask {
            id,
            task,
            interval: interval.max(1),
            next_run: self.tick + 1,
        });
        id
    }

    /// Drops a task without completing it. Returns false for an unknown id.
    pub fn remove_task(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    pub fn has_task(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Called with the id, name and final progress of every task that finishes.
    pub fn add_completion_listener<F>(&mut self, listener: F)
    where
        F: FnMut(TaskId, &str, &Progress) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Advances every due task by one increment and returns how many finished.
    pub fn run_tick(&mut self, mut world: Option<&mut dyn WorldAccess>) -> usize {
        self.tick += 1;
        let mut finished = Vec::new();

        for scheduled in self.tasks.iter_mut() {
            if scheduled.next_run > self.tick {
                continue;
            }
            scheduled.next_run = self.tick + scheduled.interval as u64;
            let budget = TaskBudget::from_options(&self.options);
            // fresh reborrow per task; the object lifetime shortens through the cast
            let reborrowed = world.as_mut().map(|w| &mut **w as &mut dyn WorldAccess);
            let progress = scheduled.task.advance(reborrowed, &budget);
            if let Progress::Failed(reason) = &progress {
                warn!("Task {} ({}) failed: {}", scheduled.id, scheduled.task.name(), reason);
            }
            if progress.is_finished() {
                finished.push((scheduled.id, progress));
            }
        }

        for (id, progress) in &finished {
            if let Some(index) = self.tasks.iter().position(|t| t.id == *id) {
                let done = self.tasks.remove(index);
                debug!("Task {} ({}) finished", id, done.task.name());
                for listener in self.listeners.iter_mut() {
                    listener(*id, done.task.name(), progress);
                }
            }
        }
        finished.len()
    }

    /// Runs ticks until no task remains or `max_ticks` is reached.
    pub fn run_to_completion(&mut self, world: &mut dyn WorldAccess, max_ticks: usize) -> bool {
        for _ in 0..max_ticks {
            if self.is_empty() {
                return true;
            }
            self.run_tick(Some(&mut *world));
        }
        self.is_empty()
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        TaskScheduler::new(TaskOptions::default())
    }
}
