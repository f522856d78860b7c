#![forbid(unsafe_code)]

//! One-tick deferral queue.
//!
//! Work scheduled during turn `N` becomes runnable at turn `N + 1`. Work
//! scheduled while turn `N + 1` runs waits for turn `N + 2`, so a single
//! [`TaskQueue::take_turn`] never drains tasks it produced itself.

use std::collections::VecDeque;

/// FIFO of deferred tasks with a turn counter.
#[derive(Debug, Clone)]
pub struct TaskQueue<T> {
    tasks: VecDeque<T>,
    turn: u64,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self {
            tasks: VecDeque::new(),
            turn: 0,
        }
    }
}

impl<T> TaskQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defer `task` to the next turn.
    pub fn schedule(&mut self, task: T) {
        self.tasks.push_back(task);
    }

    /// Advance the turn and hand back everything scheduled before it.
    pub fn take_turn(&mut self) -> Vec<T> {
        self.turn += 1;
        self.tasks.drain(..).collect()
    }

    /// Number of completed turns.
    #[must_use]
    pub const fn turn(&self) -> u64 {
        self.turn
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drop scheduled tasks matching `pred`.
    pub fn cancel(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !pred(t));
        before - self.tasks.len()
    }
}
