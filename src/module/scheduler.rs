//! Periodic task scheduling for the station loop.
//!
//! The live preview and the button poll run on independent periods from a
//! single thread. The scheduler only says which task is due next; the station
//! runs it to completion before asking again, so tasks never overlap.

use std::time::{Duration, Instant};

/// Monotonic time source.
pub trait Clock {
    /// Time elapsed since the clock was created.
    fn now(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `Instant` and `thread::sleep`.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Recurring work items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    RefreshPreview,
    PollButtons,
}

#[derive(Debug, Clone)]
struct Entry {
    task: Task,
    period: Duration,
    due: Duration,
}

/// Fixed-period scheduler.
#[derive(Debug)]
pub struct Scheduler<C: Clock> {
    clock: C,
    entries: Vec<Entry>,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            entries: Vec::new(),
        }
    }

    /// Registers `task` to run every `period`, first after one period.
    pub fn every(mut self, task: Task, period: Duration) -> Self {
        let due = self.clock.now() + period;
        self.entries.push(Entry { task, period, due });
        self
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Sleeps until the earliest task is due and returns it.
    ///
    /// Ties go to the task registered first. A task that ran late is
    /// rescheduled one period after now, so missed ticks are not replayed.
    pub fn next(&mut self) -> Option<Task> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .min_by_key(|(i, e)| (e.due, *i))
            .map(|(i, _)| i)?;
        let now = self.clock.now();
        let entry = &mut self.entries[idx];
        if entry.due > now {
            self.clock.sleep(entry.due - now);
        }
        entry.due = entry.due.max(self.clock.now()) + entry.period;
        Some(entry.task)
    }
}

/// Clock advanced by hand, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ManualClock {
    now: std::cell::Cell<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
