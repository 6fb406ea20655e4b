//! Per-shape move debouncing.
//!
//! Moves are recorded with a deadline; a later move of the same shape
//! replaces the pending deadline instead of queueing a second reroute. The
//! debouncer owns no timer: callers drive it with [`MoveDebouncer::drain_due`].

use std::time::{Duration, Instant};

use erkit_core::ShapeId;

#[derive(Debug, Clone)]
pub struct MoveDebouncer {
    delay: Duration,
    /// Pending shapes in first-scheduled order.
    pending: Vec<(ShapeId, Instant)>,
}

impl MoveDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Vec::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules `shape` for `now + delay`, superseding any pending deadline.
    ///
    /// Returns `true` when an earlier request was superseded.
    pub fn schedule(&mut self, shape: ShapeId, now: Instant) -> bool {
        let deadline = now + self.delay;
        if let Some(entry) = self.pending.iter_mut().find(|(id, _)| *id == shape) {
            entry.1 = deadline;
            return true;
        }
        self.pending.push((shape, deadline));
        false
    }

    /// Removes and returns every shape whose deadline is at or before `now`.
    pub fn drain_due(&mut self, now: Instant) -> Vec<ShapeId> {
        let mut due = Vec::new();
        self.pending.retain(|(id, deadline)| {
            if *deadline <= now {
                due.push(*id);
                false
            } else {
                true
            }
        });
        due
    }

    /// Removes and returns every pending shape regardless of deadline.
    pub fn drain_all(&mut self) -> Vec<ShapeId> {
        self.pending.drain(..).map(|(id, _)| id).collect()
    }

    pub fn cancel(&mut self, shape: ShapeId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(id, _)| *id != shape);
        self.pending.len() != before
    }

    pub fn is_pending(&self, shape: ShapeId) -> bool {
        self.pending.iter().any(|(id, _)| *id == shape)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Earliest pending deadline, for hosts that arm a single timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|(_, deadline)| *deadline).min()
    }
}

impl Default for MoveDebouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}
