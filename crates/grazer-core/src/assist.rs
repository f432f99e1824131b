//! Operator intent shared with the input-hook thread.
//!
//! The hook is the only writer and the tick thread the only reader. Values are
//! current intent rather than a command queue, so last writer wins.

use crate::geometry::Vec2;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
pub struct OperatorControls {
    movement_enabled: AtomicBool,
    assist_enabled: AtomicBool,
    /// Game-space target; the hook converts from screen coordinates before writing.
    assist_point: Mutex<Option<Vec2>>,
}

/// What the tick thread sees at the top of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSnapshot {
    pub movement_enabled: bool,
    /// Present only when assist mode is on and a point has been set.
    pub assist_target: Option<Vec2>,
}

impl OperatorControls {
    pub fn new(movement_enabled: bool) -> Self {
        Self {
            movement_enabled: AtomicBool::new(movement_enabled),
            assist_enabled: AtomicBool::new(false),
            assist_point: Mutex::new(None),
        }
    }

    pub fn set_movement(&self, enabled: bool) {
        self.movement_enabled.store(enabled, Ordering::Release);
    }

    /// Flips the movement toggle and returns the new value.
    pub fn toggle_movement(&self) -> bool {
        !self.movement_enabled.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn set_assist(&self, enabled: bool) {
        self.assist_enabled.store(enabled, Ordering::Release);
    }

    pub fn toggle_assist(&self) -> bool {
        !self.assist_enabled.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn set_assist_point(&self, point: Option<Vec2>) {
        let mut slot = self.assist_point.lock().unwrap_or_else(|e| e.into_inner());
        *slot = point;
    }

    pub fn snapshot(&self) -> ControlSnapshot {
        let assist_target = if self.assist_enabled.load(Ordering::Acquire) {
            *self.assist_point.lock().unwrap_or_else(|e| e.into_inner())
        } else {
            None
        };
        ControlSnapshot {
            movement_enabled: self.movement_enabled.load(Ordering::Acquire),
            assist_target,
        }
    }
}

impl Default for OperatorControls {
    fn default() -> Self {
        Self::new(true)
    }
}
