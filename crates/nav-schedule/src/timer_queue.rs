//! `TimerQueue`: sparse tick-ordered queue of repeating-task firings.
//!
//! Repeating tasks register the tick at which they next fire.  Each executor
//! tick drains only the entries that are due, so idle tasks cost nothing.
//! `BTreeMap` gives O(log W) insert and pop where W is the number of distinct
//! future fire ticks.

use std::collections::BTreeMap;

use nav_core::{TaskId, Tick};

#[derive(Default, Debug)]
pub struct TimerQueue {
    inner: BTreeMap<Tick, Vec<TaskId>>,
    /// Cached entry count for O(1) `len()`.
    total: usize,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `task` at `tick`.
    pub fn push(&mut self, tick: Tick, task: TaskId) {
        self.inner.entry(tick).or_default().push(task);
        self.total += 1;
    }

    /// Remove and return every task due at or before `now`, earliest tick
    /// first and in insertion order within a tick.
    pub fn drain_due(&mut self, now: Tick) -> Vec<TaskId> {
        let mut due = Vec::new();
        while let Some(entry) = self.inner.first_entry() {
            if *entry.key() > now {
                break;
            }
            let tasks = entry.remove();
            self.total -= tasks.len();
            due.extend(tasks);
        }
        due
    }

    /// Drop every pending firing of `task`.  Returns `true` if any existed.
    pub fn remove(&mut self, task: TaskId) -> bool {
        let mut removed = 0;
        self.inner.retain(|_, tasks| {
            let before = tasks.len();
            tasks.retain(|&t| t != task);
            removed += before - tasks.len();
            !tasks.is_empty()
        });
        self.total -= removed;
        removed > 0
    }

    /// The earliest tick with at least one queued task.
    pub fn next_tick(&self) -> Option<Tick> {
        self.inner.keys().next().copied()
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of distinct future ticks with at least one queued task.
    pub fn tick_count(&self) -> usize {
        self.inner.len()
    }
}
