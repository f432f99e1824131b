use super::keys::{Key, KeySink};
use crate::geometry::Vec2;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Axis force magnitude at or below which both keys of that axis are released.
    pub dead_zone: f64,
    /// Axis force magnitude above which the bomb is thrown.
    pub panic_threshold: f64,
    /// Pause between the steps of the bomb sequence.
    pub panic_delay_ms: u64,
    /// Extra margin below `dead_zone` a held axis must drop under before release.
    /// Zero keeps the single-threshold behaviour.
    pub release_band: f64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            dead_zone: 0.05,
            panic_threshold: 3000.0,
            panic_delay_ms: 20,
            release_band: 0.0,
        }
    }
}

impl MovementConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.dead_zone >= 0.0, "dead_zone must be non-negative");
        anyhow::ensure!(
            self.release_band >= 0.0 && self.release_band <= self.dead_zone,
            "release_band must lie in [0, dead_zone]"
        );
        anyhow::ensure!(
            self.panic_threshold > self.dead_zone,
            "panic_threshold must exceed dead_zone"
        );
        Ok(())
    }
}

/// Key state of one movement axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisState {
    #[default]
    Released,
    Negative,
    Positive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementReport {
    pub horizontal: AxisState,
    pub vertical: AxisState,
    pub panicked: bool,
}

/// Converts a force into held direction keys, always holding fire.
///
/// Commands are resent every tick rather than on change, so a dropped event
/// heals on the next tick.
#[derive(Debug, Clone)]
pub struct MovementController {
    config: MovementConfig,
    horizontal: AxisState,
    vertical: AxisState,
    panics: u64,
}

impl MovementController {
    pub fn new(config: MovementConfig) -> Self {
        Self {
            config,
            horizontal: AxisState::Released,
            vertical: AxisState::Released,
            panics: 0,
        }
    }

    pub fn horizontal(&self) -> AxisState {
        self.horizontal
    }

    pub fn vertical(&self) -> AxisState {
        self.vertical
    }

    pub fn panics(&self) -> u64 {
        self.panics
    }

    pub fn is_panic(&self, force: Vec2) -> bool {
        force.x.abs() > self.config.panic_threshold || force.y.abs() > self.config.panic_threshold
    }

    /// One tick of movement: bomb if needed, hold fire, then drive both axes.
    pub fn steer<K: KeySink + ?Sized>(&mut self, force: Vec2, sink: &mut K) -> MovementReport {
        let panicked = self.is_panic(force);
        if panicked {
            warn!(%force, "force above panic threshold, bombing");
            self.panic_maneuver(sink);
        }

        sink.press(Key::Shoot);

        self.horizontal = self.next_state(self.horizontal, force.x);
        apply_axis(sink, self.horizontal, Key::Left, Key::Right);

        // Screen y grows downward, so negative y is up.
        self.vertical = self.next_state(self.vertical, force.y);
        apply_axis(sink, self.vertical, Key::Up, Key::Down);

        MovementReport {
            horizontal: self.horizontal,
            vertical: self.vertical,
            panicked,
        }
    }

    fn next_state(&self, current: AxisState, value: f64) -> AxisState {
        let threshold = if current == AxisState::Released {
            self.config.dead_zone
        } else {
            self.config.dead_zone - self.config.release_band
        };

        // NaN compares false and releases the axis.
        if !(value.abs() > threshold) {
            AxisState::Released
        } else if value < 0.0 {
            AxisState::Negative
        } else {
            AxisState::Positive
        }
    }

    /// Releases movement and fire, then taps bomb. Blocks for two panic delays.
    pub fn panic_maneuver<K: KeySink + ?Sized>(&mut self, sink: &mut K) {
        for key in [Key::Left, Key::Right, Key::Up, Key::Down, Key::Shoot] {
            sink.release(key);
        }
        self.horizontal = AxisState::Released;
        self.vertical = AxisState::Released;

        self.pause();
        sink.press(Key::Bomb);
        self.pause();
        sink.release(Key::Bomb);

        self.panics += 1;
    }

    /// Lets go of every key. Called on stop and when movement is switched off.
    pub fn release_all<K: KeySink + ?Sized>(&mut self, sink: &mut K) {
        for key in Key::ALL {
            sink.release(key);
        }
        self.horizontal = AxisState::Released;
        self.vertical = AxisState::Released;
        debug!("released all keys");
    }

    fn pause(&self) {
        if self.config.panic_delay_ms > 0 {
            thread::sleep(Duration::from_millis(self.config.panic_delay_ms));
        }
    }
}

fn apply_axis<K: KeySink + ?Sized>(sink: &mut K, state: AxisState, negative: Key, positive: Key) {
    match state {
        AxisState::Released => {
            sink.release(positive);
            sink.release(negative);
        }
        AxisState::Negative => {
            sink.press(negative);
            sink.release(positive);
        }
        AxisState::Positive => {
            sink.press(positive);
            sink.release(negative);
        }
    }
}
