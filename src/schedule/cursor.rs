//! Bounded navigation over the current list of candidate schedules.
//!
//! The cursor never wraps around: stepping past either end is a no-op.
//! Each change is published on a `watch` channel, so a render loop that
//! falls behind only ever sees the latest position.

use tokio::sync::watch;

use crate::error::{PlannerError, Result};

/// Step used by the jump-forward / jump-back actions
pub const JUMP_STEP: isize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPosition {
    /// No candidate schedules are loaded
    Unset,
    At { current: usize, total: usize },
}

#[derive(Debug)]
pub struct ScheduleCursor {
    position: CursorPosition,
    revision: u64,
    notifier: watch::Sender<CursorPosition>,
}

impl Default for ScheduleCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleCursor {
    pub fn new() -> Self {
        let (notifier, _) = watch::channel(CursorPosition::Unset);
        Self {
            position: CursorPosition::Unset,
            revision: 0,
            notifier,
        }
    }

    /// Receiver notified once per state change
    pub fn subscribe(&self) -> watch::Receiver<CursorPosition> {
        self.notifier.subscribe()
    }

    /// Number of notifications emitted so far
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn position(&self) -> CursorPosition {
        self.position
    }

    pub fn total(&self) -> usize {
        match self.position {
            CursorPosition::Unset => 0,
            CursorPosition::At { total, .. } => total,
        }
    }

    pub fn current(&self) -> Result<usize> {
        match self.position {
            CursorPosition::Unset => Err(PlannerError::NoCurrentSchedule),
            CursorPosition::At { current, .. } => Ok(current),
        }
    }

    /// Resets the bounds for a new result list. Always notifies.
    pub fn set_total(&mut self, total: usize) {
        let position = if total == 0 {
            CursorPosition::Unset
        } else {
            CursorPosition::At { current: 0, total }
        };
        self.publish(position);
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        self.step(1)
    }

    pub fn prev(&mut self) -> bool {
        self.step(-1)
    }

    /// Moves by `delta`, clamped to the list bounds
    pub fn jump(&mut self, delta: isize) -> bool {
        self.step(delta)
    }

    pub fn jump_forward(&mut self) -> bool {
        self.step(JUMP_STEP)
    }

    pub fn jump_back(&mut self) -> bool {
        self.step(-JUMP_STEP)
    }

    /// Moves to an absolute index, clamped to the last schedule
    pub fn set(&mut self, index: usize) -> Result<bool> {
        let total = match self.position {
            CursorPosition::Unset => return Err(PlannerError::NoCurrentSchedule),
            CursorPosition::At { total, .. } => total,
        };
        Ok(self.move_to(index.min(total - 1)))
    }

    fn step(&mut self, delta: isize) -> bool {
        let CursorPosition::At { current, total } = self.position else {
            return false;
        };
        let last = total - 1;
        let target = if delta.is_negative() {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            current.saturating_add(delta.unsigned_abs()).min(last)
        };
        self.move_to(target)
    }

    fn move_to(&mut self, target: usize) -> bool {
        match self.position {
            CursorPosition::At { current, total } if current != target => {
                self.publish(CursorPosition::At { current: target, total });
                true
            }
            _ => false,
        }
    }

    fn publish(&mut self, position: CursorPosition) {
        self.position = position;
        self.revision += 1;
        self.notifier.send_replace(position);
    }
}
